//! Application configuration.
//!
//! Configuration is a YAML document rendered through `tera` before it is
//! deserialized, so values may be pulled from the environment:
//!
//! ```yaml
//! ai:
//!   scorer:
//!     kind: openai
//!     api_key: {{ get_env(name="OPENAI_API_KEY", default="") }}
//!     model: gpt-4o-mini
//! ```
//!
//! Every section has defaults; an empty document is a valid keyword-only
//! configuration over the built-in topic table.

use std::{
    fmt,
    fs,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};

use crate::{
    classify::ClassificationMethod,
    ontology::{GIST_NAMESPACE, GIST_PREFIX},
    subset::{SubsetOptions, DEFAULT_MAX_DEFINITION_LEN},
};

/// Folder searched by [`Config::new`].
pub const DEFAULT_FOLDER: &str = "config";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read configuration `{path}`: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to render configuration template: {0}")]
    Template(#[from] tera::Error),
    #[error("failed to parse configuration: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub logger: Logger,
    #[serde(default)]
    pub ontology: OntologySettings,
    #[serde(default)]
    pub subset: SubsetSettings,
    #[serde(default)]
    pub classifier: ClassifierSettings,
    #[serde(default)]
    pub ai: AiSettings,
    /// YAML topic table replacing the built-in one.
    #[serde(default)]
    pub topics: Option<PathBuf>,
}

impl Config {
    /// Loads `config/<env>.yaml` relative to the working directory.
    ///
    /// # Errors
    ///
    /// See [`Config::load`].
    pub fn new(env: &str) -> Result<Self, ConfigError> {
        Self::from_folder(env, Path::new(DEFAULT_FOLDER))
    }

    /// Loads `<folder>/<env>.yaml`.
    ///
    /// # Errors
    ///
    /// See [`Config::load`].
    pub fn from_folder(env: &str, folder: &Path) -> Result<Self, ConfigError> {
        Self::load(folder.join(format!("{env}.yaml")))
    }

    /// Reads, renders, parses and validates a configuration file.
    ///
    /// # Errors
    ///
    /// Fails when the file is unreadable, the template does not render, the
    /// YAML does not match the expected shape or validation fails.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&text)
    }

    /// Renders and parses an in-memory configuration document.
    ///
    /// # Errors
    ///
    /// See [`Config::load`].
    pub fn from_yaml(text: &str) -> Result<Self, ConfigError> {
        let rendered = tera::Tera::one_off(text, &tera::Context::new(), false)?;
        let config: Self = if rendered.trim().is_empty() {
            Self::default()
        } else {
            serde_yaml::from_str(&rendered)?
        };
        config.validate()?;
        Ok(config)
    }

    /// Checks value ranges that serde cannot express.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the offending key.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.subset.max_definition_len == 0 {
            return Err(ConfigError::Invalid(
                "`subset.max_definition_len` must be greater than zero".to_string(),
            ));
        }
        let thresholds = [
            ("classifier.min_confidence", self.classifier.min_confidence),
            (
                "classifier.hybrid.keyword_threshold",
                self.classifier.hybrid.keyword_threshold,
            ),
            (
                "classifier.hybrid.llm_threshold",
                self.classifier.hybrid.llm_threshold,
            ),
            (
                "classifier.service.min_confidence",
                self.classifier.service.min_confidence,
            ),
        ];
        for (key, value) in thresholds {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::Invalid(format!(
                    "`{key}` must be within [0, 1], got {value}"
                )));
            }
        }
        if self.classifier.lexical.normalizer <= 0.0 {
            return Err(ConfigError::Invalid(
                "`classifier.lexical.normalizer` must be positive".to_string(),
            ));
        }
        if self.classifier.service.max_words == 0 {
            return Err(ConfigError::Invalid(
                "`classifier.service.max_words` must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Logger {
    #[serde(default = "default_true")]
    pub enable: bool,
    #[serde(default)]
    pub level: LogLevel,
    #[serde(default)]
    pub format: LogFormat,
    /// Full `EnvFilter` directive replacing the level, e.g.
    /// `gist_topics=debug,tera=warn`.
    #[serde(default)]
    pub override_filter: Option<String>,
}

impl Default for Logger {
    fn default() -> Self {
        Self {
            enable: true,
            level: LogLevel::default(),
            format: LogFormat::default(),
            override_filter: None,
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Off,
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Off => "off",
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        })
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Compact,
    Pretty,
    Json,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct OntologySettings {
    /// Turtle document to load; the CLI requires it for subsetting.
    #[serde(default)]
    pub path: Option<PathBuf>,
    #[serde(default = "default_namespace")]
    pub namespace: String,
    #[serde(default = "default_prefix")]
    pub prefix: String,
}

impl Default for OntologySettings {
    fn default() -> Self {
        Self {
            path: None,
            namespace: default_namespace(),
            prefix: default_prefix(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct SubsetSettings {
    #[serde(default = "default_true")]
    pub include_descendants: bool,
    #[serde(default = "default_descendant_depth")]
    pub descendant_depth: usize,
    #[serde(default = "default_max_definition_len")]
    pub max_definition_len: usize,
    #[serde(default)]
    pub cache: CacheSettings,
}

impl SubsetSettings {
    #[must_use]
    pub fn options(&self) -> SubsetOptions {
        SubsetOptions {
            include_descendants: self.include_descendants,
            descendant_depth: self.descendant_depth,
        }
    }
}

impl Default for SubsetSettings {
    fn default() -> Self {
        Self {
            include_descendants: true,
            descendant_depth: default_descendant_depth(),
            max_definition_len: default_max_definition_len(),
            cache: CacheSettings::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct CacheSettings {
    #[serde(default = "default_true")]
    pub enable: bool,
    #[serde(default = "default_cache_capacity")]
    pub max_capacity: u64,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            enable: true,
            max_capacity: default_cache_capacity(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ClassifierSettings {
    #[serde(default)]
    pub method: ClassificationMethod,
    /// Threshold applied by the keyword classifier.
    #[serde(default = "default_min_confidence")]
    pub min_confidence: f64,
    #[serde(default)]
    pub lexical: LexicalSettings,
    #[serde(default)]
    pub hybrid: HybridSettings,
    #[serde(default)]
    pub service: ServiceSettings,
}

impl Default for ClassifierSettings {
    fn default() -> Self {
        Self {
            method: ClassificationMethod::default(),
            min_confidence: default_min_confidence(),
            lexical: LexicalSettings::default(),
            hybrid: HybridSettings::default(),
            service: ServiceSettings::default(),
        }
    }
}

/// Saturation of lexical scores: `min(1, Σ weight · min(count, match_cap) / normalizer)`.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct LexicalSettings {
    #[serde(default = "default_normalizer")]
    pub normalizer: f64,
    #[serde(default = "default_match_cap")]
    pub match_cap: usize,
}

impl Default for LexicalSettings {
    fn default() -> Self {
        Self {
            normalizer: default_normalizer(),
            match_cap: default_match_cap(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct HybridSettings {
    #[serde(default = "default_keyword_threshold")]
    pub keyword_threshold: f64,
    #[serde(default = "default_llm_threshold")]
    pub llm_threshold: f64,
}

impl Default for HybridSettings {
    fn default() -> Self {
        Self {
            keyword_threshold: default_keyword_threshold(),
            llm_threshold: default_llm_threshold(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct ServiceSettings {
    #[serde(default = "default_llm_threshold")]
    pub min_confidence: f64,
    /// Documents are cut to this many words before scoring.
    #[serde(default = "default_max_words")]
    pub max_words: usize,
    /// Extra attempts after a transport or quota failure.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Base delay, doubled on every retry.
    #[serde(default = "default_backoff_ms")]
    pub backoff_ms: u64,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            min_confidence: default_llm_threshold(),
            max_words: default_max_words(),
            max_retries: default_max_retries(),
            backoff_ms: default_backoff_ms(),
        }
    }
}

/// Settings of the external scoring service.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct AiSettings {
    #[serde(default)]
    pub scorer: Option<ScoringBackend>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ScoringBackend {
    #[serde(rename = "openai")]
    OpenAi(OpenAiSettings),
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct OpenAiSettings {
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub api_base: Option<String>,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_temperature")]
    pub temperature: Option<f32>,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: Option<u32>,
    #[serde(default)]
    pub system_prompt: Option<String>,
}

fn default_true() -> bool {
    true
}

fn default_namespace() -> String {
    GIST_NAMESPACE.to_string()
}

fn default_prefix() -> String {
    GIST_PREFIX.to_string()
}

fn default_descendant_depth() -> usize {
    SubsetOptions::default().descendant_depth
}

fn default_max_definition_len() -> usize {
    DEFAULT_MAX_DEFINITION_LEN
}

fn default_cache_capacity() -> u64 {
    256
}

fn default_min_confidence() -> f64 {
    0.1
}

fn default_normalizer() -> f64 {
    3.0
}

fn default_match_cap() -> usize {
    3
}

fn default_keyword_threshold() -> f64 {
    0.05
}

fn default_llm_threshold() -> f64 {
    0.5
}

fn default_max_words() -> usize {
    400
}

fn default_max_retries() -> u32 {
    2
}

fn default_backoff_ms() -> u64 {
    500
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

#[allow(clippy::unnecessary_wraps)]
fn default_temperature() -> Option<f32> {
    Some(0.0)
}

#[allow(clippy::unnecessary_wraps)]
fn default_max_tokens() -> Option<u32> {
    Some(500)
}

#[cfg(test)]
mod tests {
    use super::{Config, ConfigError, LogFormat, LogLevel, ScoringBackend};
    use crate::{classify::ClassificationMethod, ontology::GIST_NAMESPACE};

    #[test]
    fn empty_document_uses_defaults() {
        let config = Config::from_yaml("").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.ontology.namespace, GIST_NAMESPACE);
        assert_eq!(config.subset.descendant_depth, 2);
        assert_eq!(config.subset.max_definition_len, 120);
        assert_eq!(config.classifier.method, ClassificationMethod::Keyword);
        assert!((config.classifier.min_confidence - 0.1).abs() < f64::EPSILON);
        assert!(config.ai.scorer.is_none());
    }

    #[test]
    fn parses_full_document_with_env_template() {
        let config = Config::from_yaml(
            r#"
logger:
  level: debug
  format: json
ontology:
  path: data/gistCore.ttl
subset:
  descendant_depth: 1
  cache:
    enable: false
classifier:
  method: hybrid
  hybrid:
    llm_threshold: 0.6
ai:
  scorer:
    kind: openai
    api_key: {{ get_env(name="GIST_TOPICS_UNSET_TEST_KEY", default="sk-test") }}
    model: gpt-4o-mini
"#,
        )
        .unwrap();
        assert_eq!(config.logger.level, LogLevel::Debug);
        assert_eq!(config.logger.format, LogFormat::Json);
        assert_eq!(config.subset.descendant_depth, 1);
        assert!(!config.subset.cache.enable);
        assert_eq!(config.classifier.method, ClassificationMethod::Hybrid);
        assert!((config.classifier.hybrid.keyword_threshold - 0.05).abs() < f64::EPSILON);
        let Some(ScoringBackend::OpenAi(openai)) = config.ai.scorer else {
            panic!("scorer expected");
        };
        assert_eq!(openai.api_key, "sk-test");
        assert_eq!(openai.max_tokens, Some(500));
    }

    #[test]
    fn rejects_out_of_range_values() {
        let err = Config::from_yaml("subset:\n  max_definition_len: 0\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(msg) if msg.contains("max_definition_len")));

        let err = Config::from_yaml("classifier:\n  min_confidence: 1.5\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(msg) if msg.contains("classifier.min_confidence")));
    }
}
