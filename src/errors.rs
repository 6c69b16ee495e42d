//! Crate-level error type used by the application layer and the CLI.
//!
//! Each subsystem keeps its own narrow error; this enum only aggregates them
//! so callers composing several subsystems can use `?` throughout.

use crate::{
    classify::{ClassificationError, ClassifierInitError},
    config::ConfigError,
    ontology::{OntologyError, SchemaLoadError},
    subset::SubsetError,
    topics::{TopicTableError, UnknownTopic},
};

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("{0}")]
    Message(String),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    SchemaLoad(#[from] SchemaLoadError),

    #[error(transparent)]
    Ontology(#[from] OntologyError),

    #[error(transparent)]
    TopicTable(#[from] TopicTableError),

    #[error(transparent)]
    UnknownTopic(#[from] UnknownTopic),

    #[error(transparent)]
    Subset(#[from] SubsetError),

    #[error(transparent)]
    ClassifierInit(#[from] ClassifierInitError),

    #[error(transparent)]
    Classification(#[from] ClassificationError),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    IO(#[from] std::io::Error),

    #[error(transparent)]
    Any(#[from] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
    pub fn wrap(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Any(Box::new(err))
    }

    #[must_use]
    pub fn string(s: &str) -> Self {
        Self::Message(s.to_string())
    }
}
