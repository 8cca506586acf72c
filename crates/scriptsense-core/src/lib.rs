use std::fmt;

use thiserror::Error;

pub mod api;
pub mod config;
pub mod guard;
pub mod histogram;
pub mod job;
pub mod languages;
pub mod poller;
pub mod results;
pub mod session;
pub mod upload;

// Re-export for convenience
pub use api::{ApiClient, JobApi, TextReprocessor, TokenVerifier};
pub use config::Config;
pub use guard::{Access, DenyReason, SessionGuard};
pub use histogram::ConfidenceHistogram;
pub use job::{JobId, JobMetrics, JobPhase, JobResult};
pub use languages::Language;
pub use poller::{JobHooks, JobPoller, JobWatcher, PollConfig, PollHandle, PollSnapshot};
pub use session::{Session, SessionStore};

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("HTTP request error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("could not decode response: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("not authorized ({status}): {message}")]
    Unauthorized { status: u16, message: String },
    #[error("backend error ({status}): {message}")]
    Backend { status: u16, message: String },
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ApiError {
    /// Whether the failure happened before or during transport, as opposed to
    /// a reply the backend actually produced.
    pub fn is_transport(&self) -> bool {
        matches!(self, ApiError::Transport(_) | ApiError::Decode(_))
    }
}

/// A required piece of user input that was not provided.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissingField {
    File,
    SourceLanguage,
    TargetLanguage,
}

impl fmt::Display for MissingField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MissingField::File => write!(f, "file"),
            MissingField::SourceLanguage => write!(f, "source language"),
            MissingField::TargetLanguage => write!(f, "target language"),
        }
    }
}

/// User input rejected before any request is issued.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("missing {}", join_fields(.0))]
    Missing(Vec<MissingField>),
    #[error("unsupported file type '{0}' (expected jpg, jpeg, png, pdf, doc or docx)")]
    UnsupportedFile(String),
    #[error("feedback text is empty")]
    EmptyFeedback,
    #[error("text to reprocess is empty")]
    EmptyText,
}

fn join_fields(fields: &[MissingField]) -> String {
    fields
        .iter()
        .map(|f| f.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
