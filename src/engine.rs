// src/engine.rs
// Seams to the external collaborators: metadata fetching and the download
// engine itself. The orchestration layer only ever talks to these traits.

use crate::error::AppError;
use crate::metadata::RawInfo;
use crate::progress::ProgressEvent;
use crate::request::DownloadRequest;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Terminal outcome of one download job. Expected cancellation is a value,
/// never an error escaping to the orchestration layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DownloadOutcome {
    Success,
    Error,
    Cancelled,
}

/// Cooperative cancellation handle. The control thread requests, workers
/// poll at their own check points; no thread is force-terminated.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// Fetches the raw info document for a URL. May fail on network or
/// extraction errors.
pub trait MetadataFetcher: Send + Sync {
    fn fetch(&self, url: &str) -> Result<RawInfo, AppError>;
}

/// Runs one fully-resolved download request, streaming progress events,
/// reporting produced files and observing the cancel token at its own pace.
/// Returns the terminal outcome; raises only for truly unexpected
/// conditions.
pub trait DownloadEngine: Send + Sync {
    fn run(
        &self,
        request: &DownloadRequest,
        cancel: &CancelToken,
        on_progress: &mut dyn FnMut(ProgressEvent),
        on_output: &mut dyn FnMut(&Path),
    ) -> Result<DownloadOutcome, AppError>;
}
