// src/queue.rs
// The queue state machine: validation, start, blank-item skipping,
// per-item failure accounting and cancellation latching. Pure state; the
// controller owns threads and I/O.

use crate::error::{AppError, MissingField};
use crate::options::QueueSettings;

/// One queued job: a URL plus the settings snapshot captured when the user
/// added it. Never auto-mutated.
#[derive(Debug, Clone, PartialEq)]
pub struct QueueItem {
    pub url: String,
    pub settings: QueueSettings,
}

/// Why an add-to-queue attempt was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueAddIssue {
    MissingUrl,
    PlaylistUrl,
    FormatsNotLoaded,
    Missing(MissingField),
}

impl QueueAddIssue {
    pub fn status_text(&self) -> &'static str {
        match self {
            QueueAddIssue::MissingUrl => "Queue add failed: missing URL",
            QueueAddIssue::PlaylistUrl => "Queue add failed: playlists not allowed",
            QueueAddIssue::FormatsNotLoaded => "Queue add failed: formats not loaded",
            QueueAddIssue::Missing(MissingField::Mode) => {
                "Queue add failed: choose audio or video mode first"
            }
            QueueAddIssue::Missing(MissingField::Codec) => "Queue add failed: choose a codec first",
            QueueAddIssue::Missing(MissingField::Container) => {
                "Queue add failed: choose a container first"
            }
            QueueAddIssue::Missing(MissingField::Format) => {
                "Queue add failed: choose a format first"
            }
        }
    }

    pub fn log_text(&self) -> &'static str {
        match self {
            QueueAddIssue::MissingUrl => "[queue] missing URL",
            QueueAddIssue::PlaylistUrl => "[queue] playlists cannot be added (use single video URLs)",
            QueueAddIssue::FormatsNotLoaded => "[queue] formats not loaded",
            QueueAddIssue::Missing(MissingField::Mode) => "[queue] missing mode (audio/video)",
            QueueAddIssue::Missing(MissingField::Codec) => "[queue] missing codec",
            QueueAddIssue::Missing(MissingField::Container) => "[queue] missing container",
            QueueAddIssue::Missing(MissingField::Format) => "[queue] missing format",
        }
    }
}

/// Terminal classification for one queue run; cancellation outranks
/// failure, failure outranks success.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueOutcome {
    Success,
    Failed(usize),
    Cancelled,
}

/// The item the engine wants run next.
#[derive(Debug, Clone, PartialEq)]
pub struct QueueRunItem {
    pub index: usize,
    /// 1-based position for display/logging
    pub display_index: usize,
    pub total: usize,
    pub url: String,
    pub settings: QueueSettings,
}

/// What to do after an item completes.
#[derive(Debug, Clone, PartialEq)]
pub enum QueueAdvance {
    Next(QueueRunItem),
    Finished(QueueOutcome),
    /// Completion signal arrived while idle; ignore
    Idle,
}

/// Missing-field check for one captured snapshot, in reporting order.
pub fn settings_issue(settings: &QueueSettings) -> Option<MissingField> {
    if settings.mode != "audio" && settings.mode != "video" {
        return Some(MissingField::Mode);
    }
    if settings.mode == "video" && settings.codec.is_empty() {
        return Some(MissingField::Codec);
    }
    if settings.container.is_empty() {
        return Some(MissingField::Container);
    }
    if settings.format_label.is_empty() {
        return Some(MissingField::Format);
    }
    None
}

/// Add-time validation: everything start-time validation checks, plus the
/// URL itself and the fetch state around it.
pub fn add_issue(
    url: &str,
    playlist_mode: bool,
    formats_loaded: bool,
    settings: &QueueSettings,
) -> Option<QueueAddIssue> {
    if url.trim().is_empty() {
        return Some(QueueAddIssue::MissingUrl);
    }
    if playlist_mode {
        return Some(QueueAddIssue::PlaylistUrl);
    }
    if !formats_loaded {
        return Some(QueueAddIssue::FormatsNotLoaded);
    }
    settings_issue(settings).map(QueueAddIssue::Missing)
}

/// Ordered queue of jobs plus the run state. While a run is active the item
/// list is immutable to external edits.
#[derive(Debug, Default)]
pub struct QueueEngine {
    items: Vec<QueueItem>,
    active: bool,
    index: usize,
    failed_items: usize,
    cancel_requested: bool,
}

impl QueueEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn items(&self) -> &[QueueItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn current_index(&self) -> Option<usize> {
        if self.active {
            Some(self.index)
        } else {
            None
        }
    }

    pub fn failed_items(&self) -> usize {
        self.failed_items
    }

    /// Latch cancellation; the run halts after the in-flight item reports.
    pub fn request_cancel(&mut self) {
        if self.active {
            self.cancel_requested = true;
        }
    }

    fn reject_while_active(&self) -> Result<(), AppError> {
        if self.active {
            return Err(AppError::Validation(
                "queue cannot be edited while a run is active".to_string(),
            ));
        }
        Ok(())
    }

    pub fn add(&mut self, item: QueueItem) -> Result<(), AppError> {
        self.reject_while_active()?;
        self.items.push(item);
        Ok(())
    }

    pub fn remove(&mut self, index: usize) -> Result<(), AppError> {
        self.reject_while_active()?;
        if index >= self.items.len() {
            return Err(AppError::Validation("queue index out of range".to_string()));
        }
        self.items.remove(index);
        Ok(())
    }

    pub fn move_up(&mut self, index: usize) -> Result<(), AppError> {
        self.reject_while_active()?;
        if index == 0 || index >= self.items.len() {
            return Err(AppError::Validation("queue index out of range".to_string()));
        }
        self.items.swap(index - 1, index);
        Ok(())
    }

    pub fn move_down(&mut self, index: usize) -> Result<(), AppError> {
        self.reject_while_active()?;
        if index + 1 >= self.items.len() {
            return Err(AppError::Validation("queue index out of range".to_string()));
        }
        self.items.swap(index, index + 1);
        Ok(())
    }

    pub fn clear(&mut self) -> Result<(), AppError> {
        self.reject_while_active()?;
        self.items.clear();
        Ok(())
    }

    /// First invalid item as (1-based index, missing field), or None.
    pub fn first_invalid(&self) -> Option<(usize, MissingField)> {
        self.items
            .iter()
            .enumerate()
            .find_map(|(idx, item)| settings_issue(&item.settings).map(|field| (idx + 1, field)))
    }

    /// Begin a run. No-op (Ok(false)) when already active or empty; fails
    /// with the first offending item before any network activity.
    pub fn start(&mut self) -> Result<bool, AppError> {
        if self.active || self.items.is_empty() {
            return Ok(false);
        }
        if let Some((index, field)) = self.first_invalid() {
            return Err(AppError::QueueValidation { index, field });
        }
        self.active = true;
        self.index = 0;
        self.failed_items = 0;
        self.cancel_requested = false;
        Ok(true)
    }

    /// The next runnable item from the current index, skipping blank URLs
    /// without counting them as failures. None when nothing remains.
    pub fn next_run_item(&mut self) -> Option<QueueRunItem> {
        if !self.active {
            return None;
        }
        while self.index < self.items.len() {
            let item = &self.items[self.index];
            if !item.url.trim().is_empty() {
                return Some(QueueRunItem {
                    index: self.index,
                    display_index: self.index + 1,
                    total: self.items.len(),
                    url: item.url.trim().to_string(),
                    settings: item.settings.clone(),
                });
            }
            self.index += 1;
        }
        None
    }

    /// Record an item's terminal signal and decide the next step. A latched
    /// cancellation finishes the run immediately; the next item never starts.
    pub fn on_item_done(&mut self, had_error: bool, cancelled: bool) -> QueueAdvance {
        if !self.active {
            return QueueAdvance::Idle;
        }
        if had_error {
            self.failed_items += 1;
        }
        if cancelled {
            self.cancel_requested = true;
        }
        if self.cancel_requested {
            return QueueAdvance::Finished(self.finish(true));
        }
        self.index += 1;
        match self.next_run_item() {
            Some(item) => QueueAdvance::Next(item),
            None => QueueAdvance::Finished(self.finish(false)),
        }
    }

    /// Reset to idle and classify the run.
    pub fn finish(&mut self, cancelled: bool) -> QueueOutcome {
        let failed = self.failed_items;
        self.active = false;
        self.index = 0;
        self.failed_items = 0;
        self.cancel_requested = false;
        if cancelled {
            QueueOutcome::Cancelled
        } else if failed > 0 {
            QueueOutcome::Failed(failed)
        } else {
            QueueOutcome::Success
        }
    }
}
