use async_trait::async_trait;
use tracing::{debug, warn};

use super::{
    ClassificationError, ClassificationMethod, ClassificationResult, LexicalTopicClassifier,
    ServiceBackedTopicClassifier, TopicClassifier,
};
use crate::config::HybridSettings;

/// Lexical pass as a cheap filter, then service scoring of its candidates.
///
/// When the service is unavailable the lexical result is returned as is, so
/// an outage never erases signal the keyword pass already found.
pub struct HybridTopicClassifier {
    lexical: LexicalTopicClassifier,
    service: ServiceBackedTopicClassifier,
    settings: HybridSettings,
}

impl HybridTopicClassifier {
    #[must_use]
    pub fn new(
        lexical: LexicalTopicClassifier,
        service: ServiceBackedTopicClassifier,
        settings: HybridSettings,
    ) -> Self {
        Self {
            lexical,
            service,
            settings,
        }
    }
}

#[async_trait]
impl TopicClassifier for HybridTopicClassifier {
    async fn classify(&self, text: &str) -> Result<ClassificationResult, ClassificationError> {
        let lexical = self
            .lexical
            .classify_with_threshold(text, self.settings.keyword_threshold);
        if lexical.topics.is_empty() {
            debug!("no lexical candidates, skipping service refinement");
            return Ok(lexical);
        }

        match self
            .service
            .classify_candidates(text, &lexical.topics, self.settings.llm_threshold)
            .await
        {
            Ok(mut refined) => {
                refined.method = ClassificationMethod::Hybrid;
                refined.matched_signals = lexical.matched_signals;
                Ok(refined)
            }
            Err(err) if err.is_unavailable() => {
                warn!(error = %err, "service refinement unavailable, keeping lexical result");
                Ok(lexical)
            }
            Err(err) => Err(err),
        }
    }

    fn method(&self) -> ClassificationMethod {
        ClassificationMethod::Hybrid
    }
}
