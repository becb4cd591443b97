// src/progress.rs
// Progress events forwarded from the download collaborator to the UI layer,
// plus the throttling and display formatting around them.

use crate::playlist::PlaylistRangeSet;
use humansize::{format_size, BINARY};
use std::time::{Duration, Instant};

/// Minimum interval between forwarded `Downloading` events.
pub const PROGRESS_MIN_INTERVAL: Duration = Duration::from_millis(800);

/// A progress report, forwarded unchanged except for throttling.
#[derive(Debug, Clone, PartialEq)]
pub enum ProgressEvent {
    Downloading {
        percent: Option<f64>,
        speed: String,
        eta: String,
    },
    /// Which playlist/queue item is being processed, e.g. "2/6 Some title"
    Item { label: String },
    Finished,
    Cancelled,
}

/// Rate limiter for the high-frequency downloading variant. Item and
/// terminal events always pass.
#[derive(Debug, Default)]
pub struct ProgressThrottle {
    last_emit: Option<Instant>,
}

impl ProgressThrottle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether this event should be forwarded now.
    pub fn admit(&mut self, event: &ProgressEvent, now: Instant) -> bool {
        match event {
            ProgressEvent::Downloading { .. } => match self.last_emit {
                Some(last) if now.duration_since(last) < PROGRESS_MIN_INTERVAL => false,
                _ => {
                    self.last_emit = Some(now);
                    true
                }
            },
            _ => true,
        }
    }

    pub fn reset(&mut self) {
        self.last_emit = None;
    }
}

/// Human download speed, binary units ("1.21 MiB/s").
pub fn format_speed(bytes_per_sec: f64) -> String {
    if bytes_per_sec <= 0.0 {
        return "—".to_string();
    }
    format!("{}/s", format_size(bytes_per_sec as u64, BINARY))
}

/// Human ETA: "m:ss", or "h:mm:ss" past the hour.
pub fn format_eta(seconds: Option<u64>) -> String {
    let Some(total) = seconds else {
        return "—".to_string();
    };
    let (minutes, secs) = (total / 60, total % 60);
    let (hours, minutes) = (minutes / 60, minutes % 60);
    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, minutes, secs)
    } else {
        format!("{}:{:02}", minutes, secs)
    }
}

/// "k of N" position text for an absolute playlist index against the
/// selected ranges. None when the index is outside the selection.
pub fn playlist_position_text(ranges: &PlaylistRangeSet, index: u64) -> Option<String> {
    let position = ranges.position_of(index)?;
    match ranges.total_count() {
        Some(total) => Some(format!("{} of {}", position, total)),
        None => Some(format!("{} of ?", position)),
    }
}
