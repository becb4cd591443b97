// src/lib.rs
// Orchestration layer for media-download jobs: resolves loose user intent
// into concrete download requests, coordinates debounced metadata fetches
// without races, and sequences a queue of jobs with cooperative
// cancellation and per-item failure isolation.

pub mod cache;
pub mod cli;
pub mod controller;
pub mod coordinator;
pub mod engine;
pub mod error;
pub mod formats;
pub mod history;
pub mod metadata;
pub mod options;
pub mod playlist;
pub mod progress;
pub mod queue;
pub mod request;
pub mod selection;

pub use controller::{Controller, OrchestratorEvent, SessionSettings};
pub use engine::{CancelToken, DownloadEngine, DownloadOutcome, MetadataFetcher};
pub use error::{AppError, MissingField};
pub use progress::ProgressEvent;
pub use request::DownloadRequest;
