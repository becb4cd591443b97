// src/coordinator.rs
// Debounced metadata fetching with request sequencing, staleness rejection
// and a bounded recency cache. Workers post results into a single-consumer
// mailbox; the owning control thread drains it on its tick.

use crate::cache::{CachedFormats, FormatCache};
use crate::engine::MetadataFetcher;
use crate::formats::FormatCatalog;
use log::{debug, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Quiescence window between the last URL edit and the fetch.
pub const FETCH_DEBOUNCE: Duration = Duration::from_millis(600);

/// Upper bound on mailbox messages handled per tick, so a burst of worker
/// completions cannot starve the control thread.
pub const DRAIN_BATCH: usize = 8;

static URL_WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid regex"));

/// Remove all whitespace from a pasted/typed URL.
pub fn strip_url_whitespace(url: &str) -> String {
    URL_WHITESPACE.replace_all(url, "").into_owned()
}

/// What one worker posts back: the sequence number it was issued with, the
/// URL it fetched, and the result.
struct FetchReply {
    request_id: u64,
    url: String,
    outcome: Result<CachedFormats, String>,
}

/// Status changes surfaced to the caller after a tick.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchEvent {
    Started,
    /// Formats applied to visible state
    Loaded { from_cache: bool },
    /// Fetch succeeded but nothing selectable came back
    NoFormats,
    Failed(String),
}

/// Owns debounce timing, the fetch sequence counter and the format cache.
/// Only ever mutated by the control thread that owns it.
pub struct FetchCoordinator {
    fetcher: Arc<dyn MetadataFetcher>,
    reply_tx: Sender<FetchReply>,
    reply_rx: Receiver<FetchReply>,
    request_seq: u64,
    active_request_id: u64,
    debounce_deadline: Option<Instant>,
    is_fetching: bool,
    last_fetch_failed: bool,
    /// Fetching is paused while a download holds the single worker slot
    suspended: bool,
    current_url: String,
    visible: Option<CachedFormats>,
    pub cache: FormatCache,
}

impl FetchCoordinator {
    pub fn new(fetcher: Arc<dyn MetadataFetcher>) -> Self {
        let (reply_tx, reply_rx) = channel();
        Self {
            fetcher,
            reply_tx,
            reply_rx,
            request_seq: 0,
            active_request_id: 0,
            debounce_deadline: None,
            is_fetching: false,
            last_fetch_failed: false,
            suspended: false,
            current_url: String::new(),
            visible: None,
            cache: FormatCache::default(),
        }
    }

    pub fn current_url(&self) -> &str {
        &self.current_url
    }

    pub fn is_fetching(&self) -> bool {
        self.is_fetching
    }

    pub fn last_fetch_failed(&self) -> bool {
        self.last_fetch_failed
    }

    /// The catalog currently applied to visible selection state.
    pub fn visible(&self) -> Option<&CachedFormats> {
        self.visible.as_ref()
    }

    pub fn debounce_pending(&self) -> bool {
        self.debounce_deadline.is_some()
    }

    /// Pause/resume fetch activity (a running download owns the bandwidth).
    pub fn set_suspended(&mut self, suspended: bool) {
        self.suspended = suspended;
        if suspended {
            self.debounce_deadline = None;
        }
    }

    /// The URL field changed: cancel the pending debounce, clear the
    /// visible selection and re-arm the window. An in-flight request stays
    /// active; its reply is handled by the URL-mismatch check on delivery.
    /// Returns the normalized URL.
    pub fn on_url_changed(&mut self, url: &str, now: Instant) -> String {
        let normalized = strip_url_whitespace(url);
        self.debounce_deadline = None;
        self.is_fetching = false;
        self.visible = None;
        self.current_url = normalized.clone();
        if !normalized.is_empty() && !self.suspended {
            self.debounce_deadline = Some(now + FETCH_DEBOUNCE);
        }
        normalized
    }

    /// Bypass the debounce window (paste action, explicit refresh).
    pub fn force_fetch(&mut self, _now: Instant) -> Vec<FetchEvent> {
        self.debounce_deadline = None;
        let mut events = Vec::new();
        self.start_fetch(&mut events);
        events
    }

    /// One control-thread tick: fire a due debounce and drain a bounded
    /// batch of worker replies.
    pub fn tick(&mut self, now: Instant) -> Vec<FetchEvent> {
        let mut events = Vec::new();
        if let Some(deadline) = self.debounce_deadline {
            if now >= deadline {
                self.debounce_deadline = None;
                self.start_fetch(&mut events);
            }
        }
        for _ in 0..DRAIN_BATCH {
            match self.reply_rx.try_recv() {
                Ok(reply) => self.handle_reply(reply, now, &mut events),
                Err(_) => break,
            }
        }
        events
    }

    fn start_fetch(&mut self, events: &mut Vec<FetchEvent>) {
        if self.suspended || self.current_url.is_empty() {
            return;
        }
        // Cache hit: apply synchronously and promote, no worker.
        if let Some(entry) = self.cache.get(&self.current_url) {
            debug!("format cache hit for {}", self.current_url);
            let empty = entry.catalog.is_empty();
            self.visible = Some(entry);
            self.last_fetch_failed = false;
            events.push(if empty {
                FetchEvent::NoFormats
            } else {
                FetchEvent::Loaded { from_cache: true }
            });
            return;
        }

        self.request_seq += 1;
        let request_id = self.request_seq;
        self.active_request_id = request_id;
        self.is_fetching = true;
        events.push(FetchEvent::Started);

        let fetcher = Arc::clone(&self.fetcher);
        let url = self.current_url.clone();
        let tx = self.reply_tx.clone();
        thread::spawn(move || {
            let outcome = match fetcher.fetch(&url) {
                Ok(info) => Ok(CachedFormats {
                    catalog: FormatCatalog::from_info(&info),
                    is_playlist: info.is_playlist(),
                }),
                Err(err) => Err(err.to_string()),
            };
            // Receiver gone means the coordinator was dropped; nothing to do.
            let _ = tx.send(FetchReply {
                request_id,
                url,
                outcome,
            });
        });
    }

    fn handle_reply(&mut self, reply: FetchReply, now: Instant, events: &mut Vec<FetchEvent>) {
        if reply.request_id != self.active_request_id {
            // Superseded worker ran to completion; its result is inert.
            debug!("discarding stale fetch reply for {}", reply.url);
            return;
        }
        if reply.url != self.current_url {
            // The user kept typing during the fetch. Keep the result in the
            // cache (it is labeled with the URL it belongs to) but do not
            // touch visible state; re-arm the debounce for what is shown now.
            self.is_fetching = false;
            if let Ok(entry) = reply.outcome {
                self.cache.insert(&reply.url, entry);
            }
            if !self.current_url.is_empty() && !self.suspended {
                self.debounce_deadline = Some(now + FETCH_DEBOUNCE);
            }
            return;
        }

        self.is_fetching = false;
        match reply.outcome {
            Ok(entry) => {
                self.last_fetch_failed = false;
                self.cache.insert(&reply.url, entry.clone());
                let empty = entry.catalog.is_empty();
                self.visible = Some(entry);
                events.push(if empty {
                    FetchEvent::NoFormats
                } else {
                    FetchEvent::Loaded { from_cache: false }
                });
            }
            Err(message) => {
                warn!("format fetch failed for {}: {}", reply.url, message);
                self.last_fetch_failed = true;
                self.visible = None;
                events.push(FetchEvent::Failed(message));
            }
        }
    }
}
