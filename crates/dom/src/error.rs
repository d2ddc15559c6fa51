//! Error types for DOM operations
//!
//! Simple, flat error hierarchy. No over-engineering.
//!
//! Comparison and normalization are total and never produce these; only arena
//! lookups and report output do.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, DomError>;

#[derive(Debug, Error)]
pub enum DomError {
    #[error("Node not found: {0}")]
    NodeNotFound(u32),

    #[error("Report serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}
