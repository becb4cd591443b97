// tests/selection_test.rs
use medialoader::error::AppError;
use medialoader::formats::{FormatCatalog, BEST_AUDIO_LABEL, BEST_AVAILABLE_LABEL};
use medialoader::metadata::{RawFormat, RawInfo};
use medialoader::options::QueueSettings;
use medialoader::selection::{codec_matches_preference, resolve_format, select_mode_formats};

fn video_raw(id: &str, ext: &str, vcodec: &str, height: u32) -> RawFormat {
    RawFormat {
        format_id: Some(id.to_string()),
        ext: Some(ext.to_string()),
        vcodec: Some(vcodec.to_string()),
        acodec: Some("none".to_string()),
        height: Some(height),
        width: Some(height * 16 / 9),
        tbr: Some(height as f64 * 2.0),
        ..Default::default()
    }
}

fn audio_raw(id: &str, ext: &str, acodec: &str, abr: f64) -> RawFormat {
    RawFormat {
        format_id: Some(id.to_string()),
        ext: Some(ext.to_string()),
        vcodec: Some("none".to_string()),
        acodec: Some(acodec.to_string()),
        abr: Some(abr),
        ..Default::default()
    }
}

fn catalog_of(formats: Vec<RawFormat>) -> FormatCatalog {
    FormatCatalog::from_info(&RawInfo {
        formats: Some(formats),
        ..Default::default()
    })
}

fn video_settings(container: &str, codec: &str, label: &str) -> QueueSettings {
    QueueSettings {
        mode: "video".to_string(),
        container: container.to_string(),
        codec: codec.to_string(),
        format_label: label.to_string(),
        ..Default::default()
    }
}

#[test]
fn test_codec_matches_preference() {
    // Empty or "any" accepts everything
    assert!(codec_matches_preference("vp9", ""));
    assert!(codec_matches_preference("vp9", "any"));

    // avc1 preference also accepts h264 spellings
    assert!(codec_matches_preference("avc1.640028", "avc1"));
    assert!(codec_matches_preference("h264", "avc1"));
    assert!(!codec_matches_preference("vp9", "avc1"));

    // av01 preference also accepts av1 spellings
    assert!(codec_matches_preference("av01.0.08M.08", "av01"));
    assert!(codec_matches_preference("av1", "av01"));
    assert!(!codec_matches_preference("avc1.64", "av01"));

    // Anything else is a plain substring check, case-insensitive
    assert!(codec_matches_preference("VP9.2", "vp9"));
}

#[test]
fn test_audio_mode_returns_all_audio_labels() {
    let catalog = catalog_of(vec![
        audio_raw("140", "m4a", "mp4a.40.2", 128.0),
        audio_raw("251", "webm", "opus", 160.0),
    ]);
    let selection = select_mode_formats("audio", "", "", &catalog);

    assert!(!selection.codec_fallback_used);
    let labels = selection.labels();
    assert_eq!(labels[0], BEST_AUDIO_LABEL);
    assert_eq!(labels.len(), 3);
}

#[test]
fn test_video_mode_requires_known_container_and_codec() {
    let catalog = catalog_of(vec![video_raw("137", "mp4", "avc1.64", 1080)]);

    assert!(select_mode_formats("video", "mkv", "avc1", &catalog).is_empty());
    assert!(select_mode_formats("video", "mp4", "h265", &catalog).is_empty());
    assert!(select_mode_formats("video", "", "", &catalog).is_empty());
    // Unknown mode strings select nothing
    assert!(select_mode_formats("both", "mp4", "avc1", &catalog).is_empty());
}

#[test]
fn test_exact_container_and_codec_tier() {
    let catalog = catalog_of(vec![
        video_raw("137", "mp4", "avc1.64", 1080),
        video_raw("248", "webm", "vp9", 1080),
    ]);
    let selection = select_mode_formats("video", "mp4", "avc1", &catalog);

    assert!(!selection.codec_fallback_used);
    assert_eq!(selection.entries.len(), 1);
    assert_eq!(selection.entries[0].1.format_id, "137");
}

#[test]
fn test_codec_fallback_tier_flags_itself() {
    // mp4 exists, but only in vp9; the codec filter is dropped
    let catalog = catalog_of(vec![video_raw("299", "mp4", "vp09.2", 1080)]);
    let selection = select_mode_formats("video", "mp4", "avc1", &catalog);

    assert!(selection.codec_fallback_used);
    assert_eq!(selection.entries.len(), 1);
    assert_eq!(selection.entries[0].1.format_id, "299");
}

#[test]
fn test_synthetic_tier_when_container_missing() {
    // Nothing in webm at all: fall through to the combined-stream synthetic
    let catalog = catalog_of(vec![video_raw("137", "mp4", "avc1.64", 1080)]);
    let selection = select_mode_formats("video", "webm", "av01", &catalog);

    assert!(!selection.codec_fallback_used);
    assert_eq!(selection.labels(), vec![BEST_AVAILABLE_LABEL]);
    assert!(selection.entries[0].1.is_synthetic());
}

#[test]
fn test_selection_lookup_by_label() {
    let catalog = catalog_of(vec![video_raw("137", "mp4", "avc1.64", 1080)]);
    let selection = select_mode_formats("video", "mp4", "avc1", &catalog);
    let label = selection.labels()[0].clone();

    assert_eq!(selection.get(&label).map(|d| d.format_id.as_str()), Some("137"));
    assert!(selection.get("no such label").is_none());
}

#[test]
fn test_resolve_errors_on_zero_formats() {
    let info = RawInfo::default();
    let settings = video_settings("mp4", "avc1", "whatever");

    let result = resolve_format(&info, &settings, |_| {});
    assert!(matches!(result, Err(AppError::NoFormatsFound)));
}

#[test]
fn test_resolve_exact_label_match() {
    let info = RawInfo {
        formats: Some(vec![video_raw("137", "mp4", "avc1.64", 1080)]),
        title: Some("Clip".to_string()),
        ..Default::default()
    };
    let catalog = FormatCatalog::from_info(&info);
    let label = catalog.video[0].0.clone();
    let settings = video_settings("mp4", "avc1", &label);

    let mut lines = Vec::new();
    let resolved = resolve_format(&info, &settings, |line| lines.push(line.to_string())).unwrap();

    assert_eq!(resolved.label, label);
    assert_eq!(resolved.descriptor.format_id, "137");
    assert_eq!(resolved.container, "mp4");
    assert_eq!(resolved.title, "Clip");
    assert!(!resolved.is_playlist);
    // No substitution happened, so nothing was logged
    assert!(lines.is_empty());
}

#[test]
fn test_resolve_substitutes_missing_label() {
    let info = RawInfo {
        formats: Some(vec![video_raw("137", "mp4", "avc1.64", 1080)]),
        ..Default::default()
    };
    let settings = video_settings("mp4", "avc1", "stale captured label");

    let mut lines = Vec::new();
    let resolved = resolve_format(&info, &settings, |line| lines.push(line.to_string())).unwrap();

    assert_eq!(resolved.descriptor.format_id, "137");
    assert_eq!(lines.len(), 1);
    assert!(lines[0].contains("format 'stale captured label' missing"));
}

#[test]
fn test_resolve_codec_fallback_logs() {
    // Only vp9 in mp4: the avc1 preference cannot be met
    let info = RawInfo {
        formats: Some(vec![video_raw("299", "mp4", "vp09.2", 1080)]),
        ..Default::default()
    };
    let settings = video_settings("mp4", "avc1", "");

    let mut lines = Vec::new();
    let resolved = resolve_format(&info, &settings, |line| lines.push(line.to_string())).unwrap();

    assert_eq!(resolved.descriptor.format_id, "299");
    assert!(lines
        .iter()
        .any(|line| line.contains("chosen codec not available")));
}

#[test]
fn test_resolve_synthetic_when_nothing_fits() {
    let info = RawInfo {
        formats: Some(vec![video_raw("248", "webm", "vp9", 1080)]),
        ..Default::default()
    };
    let settings = video_settings("mp4", "avc1", "");

    let resolved = resolve_format(&info, &settings, |_| {}).unwrap();
    assert_eq!(resolved.label, BEST_AVAILABLE_LABEL);
    assert!(resolved.descriptor.is_synthetic());
}

#[test]
fn test_resolve_audio_mode() {
    let info = RawInfo {
        formats: Some(vec![audio_raw("140", "m4a", "mp4a.40.2", 128.0)]),
        ..Default::default()
    };
    let mut settings = video_settings("m4a", "", "gone label");
    settings.mode = "audio".to_string();

    let mut lines = Vec::new();
    let resolved = resolve_format(&info, &settings, |line| lines.push(line.to_string())).unwrap();

    // The first audio entry (the synthetic best-audio) substitutes
    assert_eq!(resolved.label, BEST_AUDIO_LABEL);
    assert_eq!(lines.len(), 1);
}
