use std::{
    collections::BTreeMap,
    sync::{Arc, OnceLock},
    time::Duration,
};

use async_trait::async_trait;
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use super::{
    text, ClassificationError, ClassificationMethod, ClassificationResult, TopicClassifier,
};
use crate::{
    config::ServiceSettings,
    topics::{Topic, TopicSeedTable},
};

/// A topic the service is asked to score.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TopicCandidate {
    pub topic: Topic,
    pub description: String,
}

/// Request sent to a [`TopicScoringService`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScoringRequest {
    /// Prepared, truncated document text.
    pub text: String,
    pub candidates: Vec<TopicCandidate>,
}

impl ScoringRequest {
    /// Renders the request as a single instruction for a chat model.
    #[must_use]
    pub fn prompt_text(&self) -> String {
        let names: Vec<&str> = self.candidates.iter().map(|c| c.topic.as_str()).collect();
        let mut prompt = format!(
            "Classify this article by identifying which of these topics are relevant:\n{}\n\n\
             For each relevant topic, provide a confidence score from 0.0 to 1.0.\n\nTopics:\n",
            names.join(", ")
        );
        for candidate in &self.candidates {
            prompt.push_str(&format!("- {}: {}\n", candidate.topic, candidate.description));
        }
        prompt.push_str(
            "\nReturn ONLY a JSON object with this format:\n\
             {\n  \"topics\": [\"topic1\", \"topic2\"],\n  \"confidence\": {\"topic1\": 0.9, \"topic2\": 0.7}\n}\n\n\
             Article:\n",
        );
        prompt.push_str(&self.text);
        prompt
    }
}

/// Score mapping answered by the service.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoringResponse {
    #[serde(default)]
    pub topics: Vec<String>,
    #[serde(default)]
    pub confidence: BTreeMap<String, f64>,
}

impl ScoringResponse {
    /// Extracts the first JSON object embedded in a model reply, tolerating
    /// surrounding prose or code fences.
    ///
    /// # Errors
    ///
    /// Returns [`ScoringServiceError::InvalidResponse`] when no JSON object is
    /// present or it does not have the expected shape.
    pub fn parse(raw: &str) -> Result<Self, ScoringServiceError> {
        let object = json_object_pattern()
            .find(raw)
            .ok_or_else(|| {
                ScoringServiceError::InvalidResponse(format!("no JSON object in `{raw}`"))
            })?;
        serde_json::from_str(object.as_str())
            .map_err(|err| ScoringServiceError::InvalidResponse(err.to_string()))
    }
}

/// Outermost `{...}` span, across lines.
fn json_object_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(?s)\{.*\}").expect("literal pattern compiles"))
}

/// Errors reported by scoring adapters.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ScoringServiceError {
    #[error("transport failure: {0}")]
    Transport(String),
    #[error("quota exceeded: {0}")]
    Quota(String),
    #[error("failed to compose request: {0}")]
    Request(String),
    #[error("unexpected response: {0}")]
    InvalidResponse(String),
}

impl ScoringServiceError {
    /// Transport and quota failures may succeed on a later attempt.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::Quota(_))
    }
}

impl From<ScoringServiceError> for ClassificationError {
    fn from(err: ScoringServiceError) -> Self {
        match err {
            ScoringServiceError::Transport(_) | ScoringServiceError::Quota(_) => {
                Self::Unavailable {
                    reason: err.to_string(),
                }
            }
            ScoringServiceError::InvalidResponse(message) => Self::InvalidResponse(message),
            ScoringServiceError::Request(message) => Self::Configuration(message),
        }
    }
}

/// External text-understanding capability scoring candidate topics.
#[async_trait]
pub trait TopicScoringService: Send + Sync {
    async fn score(&self, request: &ScoringRequest) -> Result<ScoringResponse, ScoringServiceError>;
}

/// Classifier delegating scoring to a [`TopicScoringService`].
pub struct ServiceBackedTopicClassifier {
    service: Arc<dyn TopicScoringService>,
    table: Arc<TopicSeedTable>,
    settings: ServiceSettings,
}

impl ServiceBackedTopicClassifier {
    #[must_use]
    pub fn new(
        service: Arc<dyn TopicScoringService>,
        table: Arc<TopicSeedTable>,
        settings: ServiceSettings,
    ) -> Self {
        Self {
            service,
            table,
            settings,
        }
    }

    #[must_use]
    pub fn settings(&self) -> &ServiceSettings {
        &self.settings
    }

    /// Scores only `candidates`, selecting those at or above `threshold`.
    ///
    /// Empty text or an empty candidate list returns a zero result without
    /// calling the service.
    ///
    /// # Errors
    ///
    /// [`ClassificationError::Unavailable`] once retries are exhausted on
    /// transport or quota failures, [`ClassificationError::InvalidResponse`]
    /// when the answer is not a score mapping.
    pub async fn classify_candidates(
        &self,
        text: &str,
        candidates: &[Topic],
        threshold: f64,
    ) -> Result<ClassificationResult, ClassificationError> {
        let prepared = text::prepare(text);
        let zero: BTreeMap<Topic, f64> = candidates.iter().map(|topic| (*topic, 0.0)).collect();
        if prepared.is_empty() || candidates.is_empty() {
            return Ok(ClassificationResult::from_scores(
                zero,
                BTreeMap::new(),
                threshold,
                ClassificationMethod::Llm,
            ));
        }

        let request = ScoringRequest {
            text: text::truncate_words(&prepared, self.settings.max_words),
            candidates: candidates
                .iter()
                .map(|topic| TopicCandidate {
                    topic: *topic,
                    description: self
                        .table
                        .seed(*topic)
                        .map(|seed| seed.description.clone())
                        .unwrap_or_default(),
                })
                .collect(),
        };
        let response = self.score_with_retries(&request).await?;

        let mut scores = zero;
        for (name, confidence) in &response.confidence {
            match name.parse::<Topic>() {
                Ok(topic) if scores.contains_key(&topic) => {
                    scores.insert(topic, *confidence);
                }
                _ => debug!(topic = %name, "ignoring score for a topic that was not requested"),
            }
        }
        Ok(ClassificationResult::from_scores(
            scores,
            BTreeMap::new(),
            threshold,
            ClassificationMethod::Llm,
        ))
    }

    async fn score_with_retries(
        &self,
        request: &ScoringRequest,
    ) -> Result<ScoringResponse, ScoringServiceError> {
        let mut attempt = 0;
        loop {
            match self.service.score(request).await {
                Ok(response) => return Ok(response),
                Err(err) if err.is_retryable() && attempt < self.settings.max_retries => {
                    let delay = self
                        .settings
                        .backoff_ms
                        .saturating_mul(1_u64 << attempt.min(16));
                    warn!(
                        attempt = attempt + 1,
                        delay_ms = delay,
                        error = %err,
                        "scoring service call failed, retrying"
                    );
                    tokio::time::sleep(Duration::from_millis(delay)).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

#[async_trait]
impl TopicClassifier for ServiceBackedTopicClassifier {
    async fn classify(&self, text: &str) -> Result<ClassificationResult, ClassificationError> {
        let candidates: Vec<Topic> = self.table.topics().collect();
        self.classify_candidates(text, &candidates, self.settings.min_confidence)
            .await
    }

    fn method(&self) -> ClassificationMethod {
        ClassificationMethod::Llm
    }
}
