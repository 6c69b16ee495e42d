//! Adapters for external scoring services.

pub mod openai;
