//! Error types for the network-facing sources.
//!
//! Orchestration code works in `anyhow::Result`; these typed errors exist
//! where a caller needs to fold the failure into a [`FailureReason`].

use thiserror::Error;

use crate::models::{FailureReason, SourceName};

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("HTTP {0}")]
    Status(u16),

    #[error("cancelled")]
    Cancelled,

    #[error("invalid URL '{0}'")]
    InvalidUrl(String),
}

impl FetchError {
    pub fn reason(&self) -> FailureReason {
        match self {
            FetchError::Request(_) | FetchError::InvalidUrl(_) => FailureReason::Network,
            FetchError::Status(code) => FailureReason::HttpStatus(*code),
            FetchError::Cancelled => FailureReason::Cancelled,
        }
    }
}

#[derive(Debug, Error)]
pub enum AggregateError {
    /// No attempted source produced usable text.
    #[error("nothing analyzable: every requested source failed ({})", list(.failed))]
    NothingAnalyzable { failed: Vec<SourceName> },
}

fn list(names: &[SourceName]) -> String {
    if names.is_empty() {
        return "none requested".to_string();
    }
    names
        .iter()
        .map(|n| n.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}
