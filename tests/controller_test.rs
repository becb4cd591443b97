// tests/controller_test.rs
use medialoader::engine::{CancelToken, DownloadEngine, DownloadOutcome, MetadataFetcher};
use medialoader::error::AppError;
use medialoader::history::HistoryStore;
use medialoader::metadata::{RawEntry, RawFormat, RawInfo};
use medialoader::progress::ProgressEvent;
use medialoader::queue::QueueOutcome;
use medialoader::request::DownloadRequest;
use medialoader::{Controller, OrchestratorEvent};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

fn video_info(title: &str) -> RawInfo {
    RawInfo {
        title: Some(title.to_string()),
        formats: Some(vec![RawFormat {
            format_id: Some("137".to_string()),
            ext: Some("mp4".to_string()),
            vcodec: Some("avc1.64".to_string()),
            acodec: Some("none".to_string()),
            height: Some(1080),
            width: Some(1920),
            tbr: Some(2500.0),
            ..Default::default()
        }]),
        ..Default::default()
    }
}

fn playlist_info(title: &str) -> RawInfo {
    RawInfo {
        kind: Some("playlist".to_string()),
        title: Some(title.to_string()),
        entries: Some(vec![RawEntry {
            title: Some("First".to_string()),
            formats: video_info("x").formats,
        }]),
        ..Default::default()
    }
}

struct MapFetcher {
    infos: HashMap<String, RawInfo>,
}

impl MapFetcher {
    fn with(urls: &[(&str, RawInfo)]) -> Arc<Self> {
        Arc::new(Self {
            infos: urls
                .iter()
                .map(|(url, info)| (url.to_string(), info.clone()))
                .collect(),
        })
    }
}

impl MetadataFetcher for MapFetcher {
    fn fetch(&self, url: &str) -> Result<RawInfo, AppError> {
        self.infos
            .get(url)
            .cloned()
            .ok_or_else(|| AppError::Fetch(format!("no metadata for {}", url)))
    }
}

/// Engine that records every request and plays back a scripted outcome per
/// URL, defaulting to success.
struct ScriptedEngine {
    outcomes: HashMap<String, DownloadOutcome>,
    runs: Mutex<Vec<DownloadRequest>>,
    /// First-URL runs block here until the cancel token fires
    block_until_cancel: Option<String>,
}

impl ScriptedEngine {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            outcomes: HashMap::new(),
            runs: Mutex::new(Vec::new()),
            block_until_cancel: None,
        })
    }

    fn failing_on(url: &str) -> Arc<Self> {
        let mut outcomes = HashMap::new();
        outcomes.insert(url.to_string(), DownloadOutcome::Error);
        Arc::new(Self {
            outcomes,
            runs: Mutex::new(Vec::new()),
            block_until_cancel: None,
        })
    }

    fn blocking_on(url: &str) -> Arc<Self> {
        Arc::new(Self {
            outcomes: HashMap::new(),
            runs: Mutex::new(Vec::new()),
            block_until_cancel: Some(url.to_string()),
        })
    }

    fn run_urls(&self) -> Vec<String> {
        self.runs.lock().unwrap().iter().map(|r| r.url.clone()).collect()
    }
}

impl DownloadEngine for ScriptedEngine {
    fn run(
        &self,
        request: &DownloadRequest,
        cancel: &CancelToken,
        on_progress: &mut dyn FnMut(ProgressEvent),
        on_output: &mut dyn FnMut(&Path),
    ) -> Result<DownloadOutcome, AppError> {
        self.runs.lock().unwrap().push(request.clone());
        on_progress(ProgressEvent::Downloading {
            percent: Some(10.0),
            speed: "1.00 MiB/s".to_string(),
            eta: "0:30".to_string(),
        });

        if self.block_until_cancel.as_deref() == Some(request.url.as_str()) {
            let deadline = Instant::now() + Duration::from_secs(5);
            while !cancel.is_cancelled() {
                if Instant::now() > deadline {
                    return Err(AppError::General("cancel never arrived".to_string()));
                }
                thread::sleep(Duration::from_millis(5));
            }
            return Ok(DownloadOutcome::Cancelled);
        }
        if cancel.is_cancelled() {
            return Ok(DownloadOutcome::Cancelled);
        }

        let outcome = self
            .outcomes
            .get(&request.url)
            .copied()
            .unwrap_or(DownloadOutcome::Success);
        if outcome == DownloadOutcome::Success {
            let output = request.output_dir.join("clip.mp4");
            on_output(&output);
            on_progress(ProgressEvent::Finished);
        }
        Ok(outcome)
    }
}

fn scratch_dir(tag: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.subsec_nanos())
        .unwrap_or(0);
    std::env::temp_dir().join(format!(
        "medialoader-test-{}-{}-{}",
        tag,
        std::process::id(),
        nanos
    ))
}

fn controller_with(
    fetcher: Arc<MapFetcher>,
    engine: Arc<ScriptedEngine>,
    tag: &str,
) -> Controller {
    let history = HistoryStore::new(scratch_dir(tag).join("history.json"));
    let mut controller = Controller::new(fetcher, engine, history);
    controller.session.output_dir = scratch_dir(tag).join("out").to_string_lossy().into_owned();
    controller
}

/// Tick the controller until an event matching the predicate shows up.
fn drive_until<P>(controller: &mut Controller, predicate: P) -> Vec<OrchestratorEvent>
where
    P: Fn(&OrchestratorEvent) -> bool,
{
    let mut seen = Vec::new();
    for _ in 0..1000 {
        let events = controller.tick();
        let done = events.iter().any(&predicate);
        seen.extend(events);
        if done {
            return seen;
        }
        thread::sleep(Duration::from_millis(5));
    }
    panic!("timed out waiting for event; saw {:?}", seen);
}

/// Fetch formats for a URL and pick the first label in video mp4/avc1 mode.
fn load_and_select(controller: &mut Controller, url: &str) {
    controller.on_url_changed(url);
    controller.fetch_formats(true);
    drive_until(controller, |event| {
        matches!(event, OrchestratorEvent::FormatsLoaded { .. })
    });
    let labels = controller.apply_mode_formats("video", "mp4", "avc1");
    assert!(!labels.is_empty());
    controller.session.format_label = labels[0].clone();
}

#[test]
fn test_single_download_happy_path() {
    let fetcher = MapFetcher::with(&[("https://v", video_info("Clip"))]);
    let engine = ScriptedEngine::new();
    let mut controller = controller_with(fetcher, engine.clone(), "single");

    load_and_select(&mut controller, "https://v");
    let events = controller.start_single().unwrap();
    assert_eq!(
        events,
        vec![OrchestratorEvent::Status("Downloading...".to_string())]
    );
    assert!(controller.is_downloading());

    let events = drive_until(&mut controller, |event| {
        matches!(event, OrchestratorEvent::SingleDone(_))
    });
    assert!(events.contains(&OrchestratorEvent::SingleDone(DownloadOutcome::Success)));
    assert!(events
        .iter()
        .any(|e| matches!(e, OrchestratorEvent::Progress(_))));
    assert!(events.contains(&OrchestratorEvent::Status("Download complete".to_string())));
    assert!(!controller.is_downloading());

    // The engine received the resolved request
    assert_eq!(engine.run_urls(), vec!["https://v"]);
    let runs = engine.runs.lock().unwrap();
    assert_eq!(
        runs[0].format.as_ref().map(|d| d.format_id.as_str()),
        Some("137")
    );
    assert_eq!(runs[0].container, "mp4");
}

#[test]
fn test_single_download_records_history() {
    let fetcher = MapFetcher::with(&[("https://v", video_info("Clip"))]);
    let engine = ScriptedEngine::new();
    let mut controller = controller_with(fetcher, engine, "history");

    load_and_select(&mut controller, "https://v");
    controller.start_single().unwrap();
    drive_until(&mut controller, |event| {
        matches!(event, OrchestratorEvent::SingleDone(_))
    });

    let records = controller.history().records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].name, "clip.mp4");
    assert_eq!(records[0].source_url, "https://v");
}

#[test]
fn test_start_single_requires_url_and_formats() {
    let fetcher = MapFetcher::with(&[("https://v", video_info("Clip"))]);
    let engine = ScriptedEngine::new();
    let mut controller = controller_with(fetcher, engine, "validation");

    // No URL at all
    assert!(matches!(
        controller.start_single(),
        Err(AppError::Validation(_))
    ));

    // URL present but formats never loaded
    controller.on_url_changed("https://v");
    assert!(matches!(
        controller.start_single(),
        Err(AppError::Validation(_))
    ));
}

#[test]
fn test_fetch_failure_surfaces() {
    let fetcher = MapFetcher::with(&[]);
    let engine = ScriptedEngine::new();
    let mut controller = controller_with(fetcher, engine, "fetchfail");

    controller.on_url_changed("https://unknown");
    controller.fetch_formats(true);
    let events = drive_until(&mut controller, |event| {
        matches!(event, OrchestratorEvent::FetchFailed(_))
    });
    assert!(events.contains(&OrchestratorEvent::Status(
        "Could not fetch formats".to_string()
    )));
    assert!(controller.selection().is_empty());
}

#[test]
fn test_url_change_clears_selection() {
    let fetcher = MapFetcher::with(&[("https://v", video_info("Clip"))]);
    let engine = ScriptedEngine::new();
    let mut controller = controller_with(fetcher, engine, "urlchange");

    load_and_select(&mut controller, "https://v");
    assert!(!controller.selection().is_empty());
    assert!(!controller.session.format_label.is_empty());

    controller.on_url_changed("https://w");
    assert!(controller.selection().is_empty());
    assert!(controller.session.format_label.is_empty());
}

#[test]
fn test_add_to_queue_rejections() {
    let fetcher = MapFetcher::with(&[("https://pl", playlist_info("Mix"))]);
    let engine = ScriptedEngine::new();
    let mut controller = controller_with(fetcher, engine, "addreject");

    // No URL
    let events = controller.add_to_queue();
    assert_eq!(
        events[0],
        OrchestratorEvent::Status("Queue add failed: missing URL".to_string())
    );

    // Playlist URL by pattern, before any fetch
    controller.on_url_changed("https://site/watch?list=abc");
    let events = controller.add_to_queue();
    assert_eq!(
        events[0],
        OrchestratorEvent::Status("Queue add failed: playlists not allowed".to_string())
    );

    // Playlist detected from fetched metadata
    controller.on_url_changed("https://pl");
    controller.fetch_formats(true);
    drive_until(&mut controller, |event| {
        matches!(event, OrchestratorEvent::FormatsLoaded { .. })
    });
    let events = controller.add_to_queue();
    assert_eq!(
        events[0],
        OrchestratorEvent::Status("Queue add failed: playlists not allowed".to_string())
    );
    assert!(controller.queue().is_empty());
}

#[test]
fn test_queue_run_to_completion() {
    let fetcher = MapFetcher::with(&[
        ("https://a", video_info("A")),
        ("https://b", video_info("B")),
    ]);
    let engine = ScriptedEngine::new();
    let mut controller = controller_with(fetcher, engine.clone(), "queuerun");

    for url in ["https://a", "https://b"] {
        load_and_select(&mut controller, url);
        let events = controller.add_to_queue();
        assert_eq!(
            events,
            vec![OrchestratorEvent::Status("Added item to queue".to_string())]
        );
    }
    assert_eq!(controller.queue().len(), 2);

    let events = controller.start_queue().unwrap();
    assert!(events.contains(&OrchestratorEvent::Status("Downloading queue...".to_string())));
    assert!(events
        .iter()
        .any(|e| matches!(e, OrchestratorEvent::Log(line) if line.contains("item 1/2"))));

    let events = drive_until(&mut controller, |event| {
        matches!(event, OrchestratorEvent::QueueDone(_))
    });
    assert!(events.contains(&OrchestratorEvent::QueueDone(QueueOutcome::Success)));
    assert!(events.contains(&OrchestratorEvent::Status("Queue complete".to_string())));
    assert!(!controller.is_downloading());
    assert!(!controller.queue().is_active());

    // Both items ran, in order
    assert_eq!(engine.run_urls(), vec!["https://a", "https://b"]);
}

#[test]
fn test_queue_failed_item_is_isolated() {
    let fetcher = MapFetcher::with(&[
        ("https://a", video_info("A")),
        ("https://b", video_info("B")),
    ]);
    let engine = ScriptedEngine::failing_on("https://a");
    let mut controller = controller_with(fetcher, engine.clone(), "queuefail");

    for url in ["https://a", "https://b"] {
        load_and_select(&mut controller, url);
        controller.add_to_queue();
    }
    controller.start_queue().unwrap();

    let events = drive_until(&mut controller, |event| {
        matches!(event, OrchestratorEvent::QueueDone(_))
    });

    // The failure did not stop item 2, but it is reported at the end
    assert_eq!(engine.run_urls(), vec!["https://a", "https://b"]);
    assert!(events.contains(&OrchestratorEvent::QueueDone(QueueOutcome::Failed(1))));
    assert!(events.contains(&OrchestratorEvent::Status(
        "Queue finished with errors".to_string()
    )));
}

#[test]
fn test_queue_cancellation_halts_run() {
    let fetcher = MapFetcher::with(&[
        ("https://a", video_info("A")),
        ("https://b", video_info("B")),
    ]);
    let engine = ScriptedEngine::blocking_on("https://a");
    let mut controller = controller_with(fetcher, engine.clone(), "queuecancel");

    for url in ["https://a", "https://b"] {
        load_and_select(&mut controller, url);
        controller.add_to_queue();
    }
    controller.start_queue().unwrap();

    let events = controller.cancel();
    assert_eq!(
        events,
        vec![OrchestratorEvent::Status("Cancelling...".to_string())]
    );
    // A second cancel request is a no-op
    assert!(controller.cancel().is_empty());

    let events = drive_until(&mut controller, |event| {
        matches!(event, OrchestratorEvent::QueueDone(_))
    });
    assert!(events.contains(&OrchestratorEvent::QueueDone(QueueOutcome::Cancelled)));
    assert!(events.contains(&OrchestratorEvent::Status("Queue cancelled".to_string())));

    // The second item never started
    assert_eq!(engine.run_urls(), vec!["https://a"]);
}

#[test]
fn test_start_queue_on_empty_queue_is_a_noop() {
    let fetcher = MapFetcher::with(&[]);
    let engine = ScriptedEngine::new();
    let mut controller = controller_with(fetcher, engine, "queueempty");

    assert!(controller.start_queue().unwrap().is_empty());
    assert!(!controller.is_downloading());
}
