//! Ontology domain: classes, properties and the immutable store that indexes
//! them.
//!
//! The store is loaded once from a Turtle document (or assembled in memory
//! through [`OntologyStore::builder`]) and is read-only afterwards, so it can
//! be shared behind an [`std::sync::Arc`] by every subset computation.

pub mod entities;
pub mod store;
pub mod turtle;
pub mod value_objects;

pub use entities::{
    is_literal_type, OntologyClass, OntologyError, OntologyProperty, PropertyKind,
};
pub use store::{OntologyStore, OntologyStoreBuilder, SchemaLoadError, DEFAULT_DESCENDANT_DEPTH};
pub use value_objects::{local_name, Iri, IriError};

/// Namespace of the gist upper ontology.
pub const GIST_NAMESPACE: &str = "https://w3id.org/semanticarts/ns/ontology/gist/";

/// Display prefix used for gist terms.
pub const GIST_PREFIX: &str = "gist";
