//! Worksheet engine: turns a client name and an ordered list of document requests
//! into a paginated, fillable PDF. Everything below `handlers` is synchronous and
//! performs no I/O; the HTTP layer runs builds inside tokio::task::spawn_blocking.

pub mod assembler;
pub mod config;
pub mod font_metrics;
pub mod geometry;
pub mod handlers;
pub mod logo;
pub mod pdf;
pub mod render;
pub mod row;
pub mod text;

#[cfg(test)]
pub(crate) mod test_support;

use thiserror::Error;

// Re-export the public API consumed by the handlers and startup code.
pub use assembler::{build_from_documents, build_worksheet, WorksheetJob};
pub use config::WorksheetConfig;
pub use logo::load_logo;

/// A fatal worksheet build failure. A build either returns a complete document or
/// exactly one of these; partial output is never handed back.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("Invalid worksheet configuration: {0}")]
    Config(String),

    #[error(
        "Insufficient space for note field column: {available:.1}pt available, {required:.1}pt required"
    )]
    InsufficientSpace { available: f32, required: f32 },

    #[error("No items to render")]
    NoItems,

    #[error("Failed to serialize worksheet PDF: {0}")]
    Serialize(String),
}

impl BuildError {
    pub(crate) fn config(message: impl Into<String>) -> Self {
        BuildError::Config(message.into())
    }
}
