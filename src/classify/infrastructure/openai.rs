use std::time::Duration;

use async_openai::{
    config::OpenAIConfig,
    error::{ApiError, OpenAIError},
    types::{
        ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
        ChatCompletionRequestUserMessageArgs, ChatCompletionRequestUserMessageContent,
        CreateChatCompletionRequestArgs,
    },
    Client,
};
use async_trait::async_trait;
use backoff::ExponentialBackoffBuilder;
use tracing::debug;

use crate::{
    classify::{
        ClassifierInitError, ScoringRequest, ScoringResponse, ScoringServiceError,
        TopicScoringService,
    },
    config::OpenAiSettings,
};

/// Provider error types that signal throttling or an exhausted quota.
const RATE_LIMIT_TYPES: &[&str] = &[
    "insufficient_quota",
    "requests",
    "tokens",
    "rate_limit_error",
    "rate_limit_exceeded",
];

/// Provider error types and codes that no retry can fix.
const REQUEST_ERROR_TYPES: &[&str] = &[
    "invalid_request_error",
    "authentication_error",
    "permission_error",
    "not_found_error",
    "invalid_api_key",
    "model_not_found",
    "context_length_exceeded",
];

/// Topic scorer backed by OpenAI chat completions.
///
/// The client never retries on its own; attempts are governed by
/// `classifier.service.max_retries` in [`crate::classify::ServiceBackedTopicClassifier`].
pub struct OpenAiTopicScorer {
    client: Client<OpenAIConfig>,
    model: String,
    temperature: Option<f32>,
    max_tokens: Option<u32>,
    system_prompt: Option<String>,
}

impl OpenAiTopicScorer {
    /// Instantiates a new scorer using the provided configuration.
    ///
    /// # Errors
    ///
    /// Rejects an empty API key or model name.
    pub fn try_new(settings: &OpenAiSettings) -> Result<Self, ClassifierInitError> {
        if settings.api_key.trim().is_empty() {
            return Err(ClassifierInitError::InvalidConfiguration(
                "`ai.scorer.api_key` must be provided".to_string(),
            ));
        }
        if settings.model.trim().is_empty() {
            return Err(ClassifierInitError::InvalidConfiguration(
                "`ai.scorer.model` must be provided".to_string(),
            ));
        }

        let mut config = OpenAIConfig::new().with_api_key(settings.api_key.clone());
        if let Some(base) = &settings.api_base {
            config = config.with_api_base(base.clone());
        }
        let no_retries = ExponentialBackoffBuilder::new()
            .with_max_elapsed_time(Some(Duration::ZERO))
            .build();
        let client = Client::with_config(config).with_backoff(no_retries);

        Ok(Self {
            client,
            model: settings.model.clone(),
            temperature: settings.temperature,
            max_tokens: settings.max_tokens,
            system_prompt: settings.system_prompt.clone(),
        })
    }

    fn build_messages(
        &self,
        request: &ScoringRequest,
    ) -> Result<Vec<ChatCompletionRequestMessage>, ScoringServiceError> {
        let mut messages = Vec::new();
        if let Some(system_prompt) = &self.system_prompt {
            let system = ChatCompletionRequestSystemMessageArgs::default()
                .content(system_prompt.clone())
                .build()
                .map_err(|err| ScoringServiceError::Request(err.to_string()))?;
            messages.push(ChatCompletionRequestMessage::System(system));
        }

        let user = ChatCompletionRequestUserMessageArgs::default()
            .content(ChatCompletionRequestUserMessageContent::Text(
                request.prompt_text(),
            ))
            .build()
            .map_err(|err| ScoringServiceError::Request(err.to_string()))?;
        messages.push(ChatCompletionRequestMessage::User(user));
        Ok(messages)
    }
}

/// Maps provider failures onto retryable and terminal categories.
///
/// Error statuses whose body is not JSON (gateway pages) surface as
/// `JSONDeserialize` and count as transport failures.
fn classify_error(err: OpenAIError) -> ScoringServiceError {
    match err {
        OpenAIError::Reqwest(err) => ScoringServiceError::Transport(err.to_string()),
        OpenAIError::ApiError(api) => classify_api_error(api),
        OpenAIError::JSONDeserialize(err) => {
            ScoringServiceError::Transport(format!("unreadable provider response: {err}"))
        }
        OpenAIError::InvalidArgument(message) => ScoringServiceError::Request(message),
        other => ScoringServiceError::Transport(other.to_string()),
    }
}

/// Only request and credential problems are terminal; server errors and
/// unknown provider failures are treated as outages.
fn classify_api_error(api: ApiError) -> ScoringServiceError {
    let is_one_of = |kinds: &[&str]| {
        [api.r#type.as_deref(), api.code.as_deref()]
            .into_iter()
            .flatten()
            .any(|kind| kinds.iter().any(|known| *known == kind))
    };
    let message = api.message.to_lowercase();

    if is_one_of(RATE_LIMIT_TYPES) || message.contains("rate limit") || message.contains("quota") {
        ScoringServiceError::Quota(api.to_string())
    } else if is_one_of(REQUEST_ERROR_TYPES) {
        ScoringServiceError::Request(api.to_string())
    } else {
        ScoringServiceError::Transport(api.to_string())
    }
}

#[async_trait]
impl TopicScoringService for OpenAiTopicScorer {
    async fn score(&self, request: &ScoringRequest) -> Result<ScoringResponse, ScoringServiceError> {
        let messages = self.build_messages(request)?;
        let mut builder = CreateChatCompletionRequestArgs::default();
        builder.model(self.model.clone());
        builder.messages(messages);
        if let Some(max_tokens) = self.max_tokens {
            builder.max_tokens(max_tokens);
        }
        if let Some(temperature) = self.temperature {
            builder.temperature(temperature);
        }
        let payload = builder
            .build()
            .map_err(|err| ScoringServiceError::Request(err.to_string()))?;

        let response = self
            .client
            .chat()
            .create(payload)
            .await
            .map_err(classify_error)?;

        let message = response
            .choices
            .into_iter()
            .find_map(|choice| choice.message.content)
            .ok_or_else(|| ScoringServiceError::InvalidResponse("empty completion".to_string()))?;
        debug!(model = %self.model, "scoring response received");

        ScoringResponse::parse(&message)
    }
}
