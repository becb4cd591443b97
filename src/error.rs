// src/error.rs

use serde_json::Error as SerdeError;
use std::io;
use thiserror::Error;

/// Field missing from a captured queue settings snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissingField {
    Mode,
    Codec,
    Container,
    Format,
}

impl MissingField {
    /// Human-readable detail used in "Queue item N is missing ..." messages
    pub fn detail(&self) -> &'static str {
        match self {
            MissingField::Mode => "audio/video mode",
            MissingField::Codec => "a codec choice",
            MissingField::Container => "a container choice",
            MissingField::Format => "a format choice",
        }
    }
}

/// Custom error types for the orchestration layer
#[derive(Error, Debug)]
pub enum AppError {
    /// Metadata fetch failed (network or extraction); recovered locally by
    /// resetting fetch state so the next debounce cycle retries
    #[error("Fetch error: {0}")]
    Fetch(String),

    /// The fetched metadata carried no formats at all. Distinct from a
    /// failed fetch: the request itself succeeded.
    #[error("No formats found for URL")]
    NoFormatsFound,

    /// A queue item failed validation before any network activity
    #[error("Queue item {index} is missing {}", field.detail())]
    QueueValidation { index: usize, field: MissingField },

    /// Error during a single queue item's download
    #[error("Download error: {0}")]
    ItemDownload(String),

    /// A required resource could not be prepared (e.g. output directory)
    #[error("Resource error: {0}")]
    Resource(String),

    /// Error for invalid input validation
    #[error("Validation error: {0}")]
    Validation(String),

    /// I/O related errors
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// JSON parsing errors
    #[error("JSON parsing error: {0}")]
    Json(#[from] SerdeError),

    /// General application errors
    #[error("Application error: {0}")]
    General(String),
}

/// Convert a string error to AppError::General
impl From<String> for AppError {
    fn from(error: String) -> Self {
        AppError::General(error)
    }
}

/// Convert a &str error to AppError::General
impl From<&str> for AppError {
    fn from(error: &str) -> Self {
        AppError::General(error.to_string())
    }
}
