// src/controller.rs
// The orchestration facade: owns the fetch coordinator, the queue engine,
// the live session settings and the single-flight download state. A single
// control thread drives everything through tick(); download workers report
// back through the shared mailbox.

use crate::coordinator::{FetchCoordinator, FetchEvent};
use crate::engine::{CancelToken, DownloadEngine, DownloadOutcome, MetadataFetcher};
use crate::error::AppError;
use crate::formats::humanize_bytes;
use crate::history::HistoryStore;
use crate::options::{self, DownloadOptions};
use crate::progress::{ProgressEvent, ProgressThrottle};
use crate::queue::{self, QueueAdvance, QueueEngine, QueueItem, QueueOutcome, QueueRunItem};
use crate::request::{self, DownloadRequest};
use crate::selection::{resolve_format, select_mode_formats, ModeSelection};
use log::{info, warn};
use std::fs;
use std::path::PathBuf;
use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::Arc;
use std::thread;
use std::time::Instant;

/// Upper bound on download-side mailbox messages handled per tick.
const DRAIN_BATCH: usize = 16;

/// Live values of the settings surface; the UI layer writes these directly.
#[derive(Debug, Clone, Default)]
pub struct SessionSettings {
    pub mode: String,
    pub container: String,
    pub codec: String,
    pub convert_to_mp4: bool,
    pub format_label: String,
    pub output_dir: String,
    pub playlist_items: String,
    pub network_timeout_raw: String,
    pub network_retries_raw: String,
    pub retry_backoff_raw: String,
    pub subtitle_languages_raw: String,
    pub write_subtitles: bool,
    pub embed_subtitles: bool,
    pub audio_language: String,
    pub custom_filename: String,
}

/// Everything the UI layer needs to hear about, in the order it happened.
#[derive(Debug, Clone, PartialEq)]
pub enum OrchestratorEvent {
    Status(String),
    Log(String),
    Progress(ProgressEvent),
    FormatsLoaded { from_cache: bool },
    NoFormats,
    FetchFailed(String),
    SingleDone(DownloadOutcome),
    QueueDone(QueueOutcome),
}

/// Worker-to-control-thread messages.
enum ControlMessage {
    Progress(ProgressEvent),
    Log(String),
    DownloadDone(DownloadOutcome),
    QueueItemDone { had_error: bool, cancelled: bool },
    RecordOutput { path: PathBuf, source_url: String },
}

/// Rough playlist-URL detection used to keep playlists out of the queue.
pub fn is_playlist_url(url: &str) -> bool {
    url.contains("list=") || url.contains("/playlist")
}

pub struct Controller {
    coordinator: FetchCoordinator,
    queue: QueueEngine,
    fetcher: Arc<dyn MetadataFetcher>,
    downloader: Arc<dyn DownloadEngine>,
    msg_tx: Sender<ControlMessage>,
    msg_rx: Receiver<ControlMessage>,
    pub session: SessionSettings,
    selection: ModeSelection,
    history: HistoryStore,
    throttle: ProgressThrottle,
    is_downloading: bool,
    cancel_requested: bool,
    cancel_token: Option<CancelToken>,
}

impl Controller {
    pub fn new(
        fetcher: Arc<dyn MetadataFetcher>,
        downloader: Arc<dyn DownloadEngine>,
        history: HistoryStore,
    ) -> Self {
        let (msg_tx, msg_rx) = channel();
        Self {
            coordinator: FetchCoordinator::new(Arc::clone(&fetcher)),
            queue: QueueEngine::new(),
            fetcher,
            downloader,
            msg_tx,
            msg_rx,
            session: SessionSettings::default(),
            selection: ModeSelection::default(),
            history,
            throttle: ProgressThrottle::new(),
            is_downloading: false,
            cancel_requested: false,
            cancel_token: None,
        }
    }

    pub fn coordinator(&self) -> &FetchCoordinator {
        &self.coordinator
    }

    pub fn queue(&self) -> &QueueEngine {
        &self.queue
    }

    pub fn queue_mut(&mut self) -> &mut QueueEngine {
        &mut self.queue
    }

    pub fn history(&self) -> &HistoryStore {
        &self.history
    }

    pub fn selection(&self) -> &ModeSelection {
        &self.selection
    }

    pub fn is_downloading(&self) -> bool {
        self.is_downloading
    }

    /// The URL field changed. Clears visible selection and re-arms the
    /// debounce window.
    pub fn on_url_changed(&mut self, url: &str) -> String {
        let normalized = self.coordinator.on_url_changed(url, Instant::now());
        self.selection = ModeSelection::default();
        self.session.format_label.clear();
        normalized
    }

    /// Fetch formats for the current URL, bypassing the debounce window
    /// when forced (paste action, explicit refresh).
    pub fn fetch_formats(&mut self, force: bool) -> Vec<OrchestratorEvent> {
        if force {
            let events = self.coordinator.force_fetch(Instant::now());
            self.apply_fetch_events(events)
        } else {
            Vec::new() // the armed debounce fires on a later tick
        }
    }

    /// Apply a mode/container/codec choice and recompute the filtered
    /// label set. The previously chosen label survives when still present.
    pub fn apply_mode_formats(&mut self, mode: &str, container: &str, codec: &str) -> Vec<String> {
        self.session.mode = mode.to_string();
        self.session.container = container.to_string();
        self.session.codec = codec.to_string();
        self.recompute_selection();
        self.selection.labels()
    }

    fn recompute_selection(&mut self) {
        self.selection = match self.coordinator.visible() {
            Some(entry) => select_mode_formats(
                &self.session.mode,
                &self.session.container,
                &self.session.codec,
                &entry.catalog,
            ),
            None => ModeSelection::default(),
        };
        if !self.session.format_label.is_empty()
            && self.selection.get(&self.session.format_label).is_none()
        {
            self.session.format_label.clear();
        }
    }

    fn snapshot_options(&self) -> DownloadOptions {
        options::build_download_options(
            &self.session.network_timeout_raw,
            &self.session.network_retries_raw,
            &self.session.retry_backoff_raw,
            &self.session.subtitle_languages_raw,
            self.session.write_subtitles,
            self.session.embed_subtitles,
            self.session.mode == "video",
            &self.session.audio_language,
            &self.session.custom_filename,
        )
    }

    fn resolved_output_dir(&self) -> PathBuf {
        let configured = self.session.output_dir.trim();
        if configured.is_empty() {
            request::default_output_dir()
        } else {
            request::expand_user(configured)
        }
    }

    /// Start the single-item download path. Aborts with `Resource` before
    /// any worker starts when the output directory cannot be created.
    pub fn start_single(&mut self) -> Result<Vec<OrchestratorEvent>, AppError> {
        if self.is_downloading {
            return Ok(Vec::new());
        }
        let url = self.coordinator.current_url().to_string();
        if url.is_empty() {
            return Err(AppError::Validation(
                "paste a video URL to download".to_string(),
            ));
        }
        if self.selection.is_empty() {
            return Err(AppError::Validation(
                "formats have not been loaded yet".to_string(),
            ));
        }

        let output_dir = self.resolved_output_dir();
        fs::create_dir_all(&output_dir).map_err(|err| {
            AppError::Resource(format!(
                "could not create output folder {:?}: {}",
                output_dir, err
            ))
        })?;

        let descriptor = self
            .selection
            .get(&self.session.format_label)
            .cloned();
        let playlist_enabled = self
            .coordinator
            .visible()
            .map(|entry| entry.is_playlist)
            .unwrap_or(false);
        let options = self.snapshot_options();
        let request = request::build_single_request(
            &url,
            output_dir,
            descriptor,
            &self.session.format_label,
            &self.session.container,
            self.session.convert_to_mp4,
            playlist_enabled,
            &self.session.playlist_items,
            &options,
        );

        self.begin_download();
        self.spawn_single_worker(request);
        Ok(vec![OrchestratorEvent::Status("Downloading...".to_string())])
    }

    fn begin_download(&mut self) {
        self.is_downloading = true;
        self.cancel_requested = false;
        self.cancel_token = Some(CancelToken::new());
        self.coordinator.set_suspended(true);
        self.throttle.reset();
    }

    fn end_download(&mut self) {
        self.is_downloading = false;
        self.cancel_requested = false;
        self.cancel_token = None;
        self.coordinator.set_suspended(false);
    }

    fn spawn_single_worker(&self, request: DownloadRequest) {
        let downloader = Arc::clone(&self.downloader);
        let token = self.cancel_token.clone().unwrap_or_default();
        let tx = self.msg_tx.clone();
        thread::spawn(move || {
            let progress_tx = tx.clone();
            let output_tx = tx.clone();
            let source_url = request.url.clone();
            let result = downloader.run(
                &request,
                &token,
                &mut |event| {
                    let _ = progress_tx.send(ControlMessage::Progress(event));
                },
                &mut |path| {
                    let _ = output_tx.send(ControlMessage::RecordOutput {
                        path: path.to_path_buf(),
                        source_url: source_url.clone(),
                    });
                },
            );
            let outcome = match result {
                Ok(outcome) => outcome,
                Err(err) => {
                    let _ = tx.send(ControlMessage::Log(format!("[error] {}", err)));
                    DownloadOutcome::Error
                }
            };
            let _ = tx.send(ControlMessage::DownloadDone(outcome));
        });
    }

    /// Capture the current session as a queue settings snapshot.
    pub fn capture_queue_settings(&self) -> options::QueueSettings {
        let estimated_size = self
            .selection
            .get(&self.session.format_label)
            .map(|descriptor| humanize_bytes(descriptor.filesize))
            .unwrap_or_default();
        let opts = self.snapshot_options();
        options::build_queue_settings(
            &self.session.mode,
            &self.session.container,
            &self.session.codec,
            self.session.convert_to_mp4,
            &self.session.format_label,
            &estimated_size,
            &self.session.output_dir,
            &self.session.playlist_items,
            &opts,
        )
    }

    /// Add the current URL + settings snapshot to the queue.
    pub fn add_to_queue(&mut self) -> Vec<OrchestratorEvent> {
        if self.is_downloading {
            return Vec::new();
        }
        let url = self.coordinator.current_url().to_string();
        let playlist_mode = self
            .coordinator
            .visible()
            .map(|entry| entry.is_playlist)
            .unwrap_or(false)
            || is_playlist_url(&url);
        let settings = self.capture_queue_settings();
        if let Some(issue) = queue::add_issue(
            &url,
            playlist_mode,
            !self.selection.is_empty(),
            &settings,
        ) {
            return vec![
                OrchestratorEvent::Status(issue.status_text().to_string()),
                OrchestratorEvent::Log(issue.log_text().to_string()),
            ];
        }
        match self.queue.add(QueueItem { url, settings }) {
            Ok(()) => vec![OrchestratorEvent::Status("Added item to queue".to_string())],
            Err(err) => vec![OrchestratorEvent::Status(err.to_string())],
        }
    }

    /// Validate and start a queue run. Validation reports the first
    /// offending 1-based index before any network activity.
    pub fn start_queue(&mut self) -> Result<Vec<OrchestratorEvent>, AppError> {
        if self.is_downloading {
            return Ok(Vec::new());
        }
        if !self.queue.start()? {
            return Ok(Vec::new());
        }
        self.begin_download();
        let mut events = vec![OrchestratorEvent::Status(
            "Downloading queue...".to_string(),
        )];
        match self.queue.next_run_item() {
            Some(item) => {
                events.push(OrchestratorEvent::Log(format!(
                    "[queue] item {}/{} {}",
                    item.display_index, item.total, item.url
                )));
                self.spawn_queue_worker(item);
            }
            None => {
                // Only blank URLs queued; nothing to run.
                let outcome = self.queue.finish(false);
                self.end_download();
                events.extend(self.finish_queue_events(outcome));
            }
        }
        Ok(events)
    }

    fn spawn_queue_worker(&self, item: QueueRunItem) {
        let fetcher = Arc::clone(&self.fetcher);
        let downloader = Arc::clone(&self.downloader);
        let token = self.cancel_token.clone().unwrap_or_default();
        let tx = self.msg_tx.clone();
        let default_output_dir = self.session.output_dir.clone();
        thread::spawn(move || {
            let (had_error, cancelled) = run_queue_item(
                &*fetcher,
                &*downloader,
                &token,
                &tx,
                &item,
                &default_output_dir,
            );
            let _ = tx.send(ControlMessage::QueueItemDone {
                had_error,
                cancelled,
            });
        });
    }

    /// Request cooperative cancellation of the in-flight job.
    pub fn cancel(&mut self) -> Vec<OrchestratorEvent> {
        if !self.is_downloading || self.cancel_requested {
            return Vec::new();
        }
        self.cancel_requested = true;
        self.queue.request_cancel();
        if let Some(token) = &self.cancel_token {
            token.request();
        }
        vec![OrchestratorEvent::Status("Cancelling...".to_string())]
    }

    /// One control-thread tick: drive the fetch coordinator, then drain a
    /// bounded batch of worker messages.
    pub fn tick(&mut self) -> Vec<OrchestratorEvent> {
        let now = Instant::now();
        let fetch_events = self.coordinator.tick(now);
        let mut events = self.apply_fetch_events(fetch_events);

        for _ in 0..DRAIN_BATCH {
            match self.msg_rx.try_recv() {
                Ok(message) => self.handle_message(message, now, &mut events),
                Err(_) => break,
            }
        }
        events
    }

    fn apply_fetch_events(&mut self, fetch_events: Vec<FetchEvent>) -> Vec<OrchestratorEvent> {
        let mut events = Vec::new();
        for event in fetch_events {
            match event {
                FetchEvent::Started => {
                    events.push(OrchestratorEvent::Status("Fetching formats...".to_string()));
                }
                FetchEvent::Loaded { from_cache } => {
                    self.recompute_selection();
                    events.push(OrchestratorEvent::FormatsLoaded { from_cache });
                    events.push(OrchestratorEvent::Status("Formats loaded".to_string()));
                }
                FetchEvent::NoFormats => {
                    self.recompute_selection();
                    events.push(OrchestratorEvent::NoFormats);
                    events.push(OrchestratorEvent::Status("No formats found".to_string()));
                }
                FetchEvent::Failed(message) => {
                    self.selection = ModeSelection::default();
                    events.push(OrchestratorEvent::FetchFailed(message));
                    events.push(OrchestratorEvent::Status(
                        "Could not fetch formats".to_string(),
                    ));
                }
            }
        }
        events
    }

    fn handle_message(
        &mut self,
        message: ControlMessage,
        now: Instant,
        events: &mut Vec<OrchestratorEvent>,
    ) {
        match message {
            ControlMessage::Progress(event) => {
                if self.throttle.admit(&event, now) {
                    events.push(OrchestratorEvent::Progress(event));
                }
            }
            ControlMessage::Log(line) => {
                events.push(OrchestratorEvent::Log(line));
            }
            ControlMessage::RecordOutput { path, source_url } => {
                self.history.record(&path, &source_url);
                if let Err(err) = self.history.save() {
                    warn!("could not persist history: {}", err);
                }
            }
            ControlMessage::DownloadDone(outcome) => {
                if self.queue.is_active() {
                    return; // queue items report through QueueItemDone
                }
                self.end_download();
                events.push(OrchestratorEvent::SingleDone(outcome));
                events.push(OrchestratorEvent::Status(
                    match outcome {
                        DownloadOutcome::Success => "Download complete",
                        DownloadOutcome::Cancelled => "Cancelled",
                        DownloadOutcome::Error => "Download failed",
                    }
                    .to_string(),
                ));
            }
            ControlMessage::QueueItemDone {
                had_error,
                cancelled,
            } => match self.queue.on_item_done(had_error, cancelled) {
                QueueAdvance::Next(item) => {
                    self.throttle.reset();
                    events.push(OrchestratorEvent::Log(format!(
                        "[queue] item {}/{} {}",
                        item.display_index, item.total, item.url
                    )));
                    self.spawn_queue_worker(item);
                }
                QueueAdvance::Finished(outcome) => {
                    self.end_download();
                    events.extend(self.finish_queue_events(outcome));
                }
                QueueAdvance::Idle => {}
            },
        }
    }

    fn finish_queue_events(&self, outcome: QueueOutcome) -> Vec<OrchestratorEvent> {
        let mut events = Vec::new();
        match outcome {
            QueueOutcome::Cancelled => {
                events.push(OrchestratorEvent::Log("[queue] stopped by cancellation".to_string()));
                events.push(OrchestratorEvent::Status("Queue cancelled".to_string()));
            }
            QueueOutcome::Failed(count) => {
                events.push(OrchestratorEvent::Log(format!(
                    "[queue] finished with {} failed item(s)",
                    count
                )));
                events.push(OrchestratorEvent::Status(
                    "Queue finished with errors".to_string(),
                ));
            }
            QueueOutcome::Success => {
                events.push(OrchestratorEvent::Log("[queue] finished successfully".to_string()));
                events.push(OrchestratorEvent::Status("Queue complete".to_string()));
            }
        }
        events.push(OrchestratorEvent::QueueDone(outcome));
        events
    }
}

/// Run one queue item end to end on a worker thread: re-resolve the format
/// against fresh metadata, build the request, prepare the directory and run
/// the download. Returns (had_error, cancelled).
fn run_queue_item(
    fetcher: &dyn MetadataFetcher,
    downloader: &dyn DownloadEngine,
    token: &CancelToken,
    tx: &Sender<ControlMessage>,
    item: &QueueRunItem,
    default_output_dir: &str,
) -> (bool, bool) {
    let info = match fetcher.fetch(&item.url) {
        Ok(info) => info,
        Err(err) => {
            let _ = tx.send(ControlMessage::Log(format!("[queue] failed: {}", err)));
            return (true, false);
        }
    };

    let log_tx = tx.clone();
    let resolved = match resolve_format(&info, &item.settings, |line| {
        let _ = log_tx.send(ControlMessage::Log(line.to_string()));
    }) {
        Ok(resolved) => resolved,
        Err(err) => {
            let _ = tx.send(ControlMessage::Log(format!("[queue] failed: {}", err)));
            return (true, false);
        }
    };

    let item_text = if resolved.title.is_empty() {
        format!("{}/{} {}", item.display_index, item.total, item.url)
    } else {
        format!("{}/{} {}", item.display_index, item.total, resolved.title)
    };
    let _ = tx.send(ControlMessage::Progress(ProgressEvent::Item {
        label: item_text,
    }));

    let request = request::build_queue_request(&item.url, &item.settings, &resolved, default_output_dir);
    if let Err(err) = fs::create_dir_all(&request.output_dir) {
        let _ = tx.send(ControlMessage::Log(format!(
            "[queue] failed: could not create output folder {:?}: {}",
            request.output_dir, err
        )));
        return (true, false);
    }

    info!("queue item {}/{} starting", item.display_index, item.total);
    let progress_tx = tx.clone();
    let output_tx = tx.clone();
    let source_url = item.url.clone();
    match downloader.run(
        &request,
        token,
        &mut |event| {
            let _ = progress_tx.send(ControlMessage::Progress(event));
        },
        &mut |path| {
            let _ = output_tx.send(ControlMessage::RecordOutput {
                path: path.to_path_buf(),
                source_url: source_url.clone(),
            });
        },
    ) {
        Ok(DownloadOutcome::Success) => (false, false),
        Ok(DownloadOutcome::Error) => (true, false),
        Ok(DownloadOutcome::Cancelled) => (false, true),
        Err(err) => {
            let _ = tx.send(ControlMessage::Log(format!("[queue] failed: {}", err)));
            (true, false)
        }
    }
}
