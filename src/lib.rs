#![doc = include_str!("../README.md")]

pub use self::errors::Error;

pub mod app;
pub mod classify;
#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod errors;
pub mod logger;
pub mod ontology;
pub mod record;
pub mod subset;
pub mod topics;

/// Application results options list
pub type Result<T, E = Error> = std::result::Result<T, E>;
