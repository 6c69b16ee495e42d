//! Topic classification.
//!
//! Three interchangeable strategies implement [`TopicClassifier`]:
//! [`LexicalTopicClassifier`] scans a keyword lexicon locally,
//! [`ServiceBackedTopicClassifier`] delegates scoring to an external
//! text-understanding service and [`HybridTopicClassifier`] narrows the
//! service call to the topics the lexical pass already found.

use std::{
    collections::BTreeMap,
    fmt::{self, Display, Formatter},
    sync::Arc,
};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    config::{AiSettings, ClassifierSettings, ScoringBackend},
    topics::{Topic, TopicSeedTable},
};

pub mod hybrid;
pub mod infrastructure;
pub mod lexical;
pub mod service;
pub mod text;

pub use hybrid::HybridTopicClassifier;
pub use lexical::LexicalTopicClassifier;
pub use service::{
    ScoringRequest, ScoringResponse, ScoringServiceError, ServiceBackedTopicClassifier,
    TopicCandidate, TopicScoringService,
};

/// Tag identifying the strategy that produced a result.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClassificationMethod {
    #[default]
    Keyword,
    Llm,
    Hybrid,
}

impl ClassificationMethod {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Keyword => "keyword",
            Self::Llm => "llm",
            Self::Hybrid => "hybrid",
        }
    }
}

impl Display for ClassificationMethod {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A keyword that fired and how often.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignalHit {
    pub keyword: String,
    pub count: usize,
}

/// Outcome of classifying one document.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    /// Topics at or above the threshold, highest score first.
    pub topics: Vec<Topic>,
    /// Confidence in `[0, 1]` for every scored topic.
    pub scores: BTreeMap<Topic, f64>,
    pub matched_signals: BTreeMap<Topic, Vec<SignalHit>>,
    pub method: ClassificationMethod,
}

impl ClassificationResult {
    /// Builds a result, selecting topics whose score reaches `threshold`.
    ///
    /// Scores are clamped to `[0, 1]`; non-finite scores count as zero.
    #[must_use]
    pub fn from_scores(
        scores: BTreeMap<Topic, f64>,
        matched_signals: BTreeMap<Topic, Vec<SignalHit>>,
        threshold: f64,
        method: ClassificationMethod,
    ) -> Self {
        let scores: BTreeMap<Topic, f64> = scores
            .into_iter()
            .map(|(topic, score)| {
                let score = if score.is_finite() {
                    score.clamp(0.0, 1.0)
                } else {
                    0.0
                };
                (topic, score)
            })
            .collect();

        let mut topics: Vec<Topic> = scores
            .iter()
            .filter(|(_, score)| **score > 0.0 && **score >= threshold)
            .map(|(topic, _)| *topic)
            .collect();
        topics.sort_by(|a, b| scores[b].total_cmp(&scores[a]).then(a.cmp(b)));

        Self {
            topics,
            scores,
            matched_signals,
            method,
        }
    }

    /// Score of `topic`, zero when it was not scored.
    #[must_use]
    pub fn score(&self, topic: Topic) -> f64 {
        self.scores.get(&topic).copied().unwrap_or_default()
    }

    #[must_use]
    pub fn contains(&self, topic: Topic) -> bool {
        self.topics.contains(&topic)
    }
}

/// Errors surfaced by classifiers.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ClassificationError {
    /// The scoring service could not be reached or refused the call.
    #[error("classification service unavailable: {reason}")]
    Unavailable { reason: String },
    /// The service answered with something that is not a score mapping.
    #[error("classification service returned an invalid response: {0}")]
    InvalidResponse(String),
    #[error("invalid classifier configuration: {0}")]
    Configuration(String),
}

impl ClassificationError {
    /// Whether a caller may recover by retrying or falling back.
    #[must_use]
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::Unavailable { .. })
    }
}

/// Factory error raised when building classifiers from configuration.
#[derive(Debug, Error)]
pub enum ClassifierInitError {
    /// A service-backed method was selected without a scoring backend.
    #[error("classifier method `{0}` requires `ai.scorer` to be configured")]
    MissingBackend(ClassificationMethod),
    #[error("invalid classifier configuration: {0}")]
    InvalidConfiguration(String),
    #[error("keyword `{keyword}` of topic `{topic}` has an invalid pattern: {source}")]
    Pattern {
        topic: Topic,
        keyword: String,
        source: regex::Error,
    },
}

/// Shared capability of every classification strategy.
#[async_trait]
pub trait TopicClassifier: Send + Sync {
    /// Classifies a single document. Plain text or HTML is accepted.
    async fn classify(&self, text: &str) -> Result<ClassificationResult, ClassificationError>;

    /// Method tag of successful results.
    fn method(&self) -> ClassificationMethod;
}

/// Builds the scoring service adapter from configuration, when configured.
///
/// # Errors
///
/// Propagates adapter construction failures.
pub fn build_scoring_service(
    settings: &AiSettings,
) -> Result<Option<Arc<dyn TopicScoringService>>, ClassifierInitError> {
    let Some(backend) = settings.scorer.as_ref() else {
        return Ok(None);
    };

    match backend {
        ScoringBackend::OpenAi(cfg) => {
            let adapter = infrastructure::openai::OpenAiTopicScorer::try_new(cfg)?;
            Ok(Some(Arc::new(adapter)))
        }
    }
}

/// Builds the classifier selected by `settings.method`.
///
/// # Errors
///
/// Fails when the lexicon does not compile or a service-backed method is
/// selected without a configured scorer.
pub fn build_classifier(
    settings: &ClassifierSettings,
    ai: &AiSettings,
    table: Arc<TopicSeedTable>,
) -> Result<Arc<dyn TopicClassifier>, ClassifierInitError> {
    let lexical = || {
        LexicalTopicClassifier::new(&table, settings.lexical, settings.min_confidence)
    };
    match settings.method {
        ClassificationMethod::Keyword => Ok(Arc::new(lexical()?)),
        ClassificationMethod::Llm => {
            let service = build_scoring_service(ai)?
                .ok_or(ClassifierInitError::MissingBackend(settings.method))?;
            Ok(Arc::new(ServiceBackedTopicClassifier::new(
                service,
                table.clone(),
                settings.service,
            )))
        }
        ClassificationMethod::Hybrid => {
            let service = build_scoring_service(ai)?
                .ok_or(ClassifierInitError::MissingBackend(settings.method))?;
            let service =
                ServiceBackedTopicClassifier::new(service, table.clone(), settings.service);
            Ok(Arc::new(HybridTopicClassifier::new(
                lexical()?,
                service,
                settings.hybrid,
            )))
        }
    }
}
