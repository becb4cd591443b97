// src/selection.rs
// Mode/container/codec filtering with a deterministic fallback chain, and
// the run-time re-resolution used by the queue engine.

use crate::error::AppError;
use crate::formats::{FormatCatalog, MediaFormatDescriptor, BEST_AVAILABLE_LABEL};
use crate::metadata::RawInfo;
use crate::options::QueueSettings;
use log::info;

/// Containers a video-mode selection may target.
pub const VIDEO_CONTAINERS: [&str; 2] = ["mp4", "webm"];

/// Codec preferences a video-mode selection may target.
pub const VIDEO_CODECS: [&str; 2] = ["avc1", "av01"];

/// The filtered label set for one mode, plus which fallback tier produced it.
#[derive(Debug, Clone, Default)]
pub struct ModeSelection {
    pub entries: Vec<(String, MediaFormatDescriptor)>,
    /// True iff the codec-ignoring tier produced the result
    pub codec_fallback_used: bool,
}

impl ModeSelection {
    pub fn labels(&self) -> Vec<String> {
        self.entries.iter().map(|(label, _)| label.clone()).collect()
    }

    pub fn get(&self, label: &str) -> Option<&MediaFormatDescriptor> {
        self.entries
            .iter()
            .find(|(candidate, _)| candidate == label)
            .map(|(_, descriptor)| descriptor)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Case-insensitive codec preference check. An empty or "any" preference
/// matches everything; `avc1` also accepts h264 strings, `av01` also av1.
pub fn codec_matches_preference(vcodec_raw: &str, codec_pref: &str) -> bool {
    let vcodec = vcodec_raw.trim().to_lowercase();
    let pref = codec_pref.trim().to_lowercase();
    if pref.is_empty() || pref == "any" {
        return true;
    }
    if pref.starts_with("avc1") {
        return vcodec.contains("avc1") || vcodec.contains("h264");
    }
    if pref.starts_with("av01") {
        return vcodec.contains("av01") || vcodec.contains("av1");
    }
    vcodec.contains(&pref)
}

fn filter_video_formats(
    catalog_video: &[(String, MediaFormatDescriptor)],
    container: &str,
    codec: &str,
    allow_any_codec: bool,
) -> Vec<(String, MediaFormatDescriptor)> {
    let mut filtered = Vec::new();
    if !VIDEO_CONTAINERS.contains(&container) || (!allow_any_codec && codec.is_empty()) {
        return filtered;
    }
    for (label, descriptor) in catalog_video {
        if descriptor.is_synthetic() {
            filtered.push((label.clone(), descriptor.clone()));
            continue;
        }
        if descriptor.ext.to_lowercase() != container {
            continue;
        }
        if !allow_any_codec
            && codec.to_lowercase() != "any"
            && !codec_matches_preference(&descriptor.vcodec, codec)
        {
            continue;
        }
        filtered.push((label.clone(), descriptor.clone()));
    }
    filtered
}

/// Selection for the current mode. Audio mode returns every audio label,
/// falling back to the synthetic best-audio entry. Video mode requires both
/// a known container and codec preference, then filters with two fallback
/// tiers before synthesizing a "best available" entry.
pub fn select_mode_formats(
    mode: &str,
    container: &str,
    codec: &str,
    catalog: &FormatCatalog,
) -> ModeSelection {
    if mode == "audio" {
        let mut entries = catalog.audio.clone();
        if entries.is_empty() {
            entries.push((
                crate::formats::BEST_AUDIO_LABEL.to_string(),
                MediaFormatDescriptor::best_audio(),
            ));
        }
        return ModeSelection {
            entries,
            codec_fallback_used: false,
        };
    }

    if mode != "video" {
        return ModeSelection::default();
    }
    if !VIDEO_CONTAINERS.contains(&container) || !VIDEO_CODECS.contains(&codec) {
        return ModeSelection::default();
    }

    let mut entries = filter_video_formats(&catalog.video, container, codec, false);
    let mut codec_fallback_used = false;
    if entries.is_empty() && !codec.is_empty() {
        entries = filter_video_formats(&catalog.video, container, codec, true);
        codec_fallback_used = !entries.is_empty();
    }
    if entries.is_empty() {
        entries.push((
            BEST_AVAILABLE_LABEL.to_string(),
            MediaFormatDescriptor::best_available(),
        ));
    }

    ModeSelection {
        entries,
        codec_fallback_used,
    }
}

/// A format resolved at run time for one job.
#[derive(Debug, Clone)]
pub struct ResolvedFormat {
    pub label: String,
    pub descriptor: MediaFormatDescriptor,
    pub container: String,
    pub is_playlist: bool,
    pub title: String,
}

/// Re-resolve a captured format label against freshly fetched metadata.
/// Cached selections may be stale, so the catalog is rebuilt and the filter
/// re-applied; when the captured label is gone the first available one is
/// substituted (logged), and a synthetic fallback keeps resolution from
/// failing outright. Errors only when the metadata carried zero formats.
pub fn resolve_format<F>(
    info: &RawInfo,
    settings: &QueueSettings,
    mut log_line: F,
) -> Result<ResolvedFormat, AppError>
where
    F: FnMut(&str),
{
    if info.format_list().is_empty() {
        return Err(AppError::NoFormatsFound);
    }
    let catalog = FormatCatalog::from_info(info);
    let desired = settings.format_label.as_str();
    let container = settings.container.clone();
    let is_playlist = info.is_playlist();
    let title = info.preview_title();

    if settings.mode == "audio" {
        let (label, descriptor) = match catalog
            .audio
            .iter()
            .find(|(label, _)| label == desired)
        {
            Some((label, descriptor)) => (label.clone(), descriptor.clone()),
            None => match catalog.audio.first() {
                Some((label, descriptor)) => {
                    if !desired.is_empty() {
                        let line =
                            format!("[queue] format '{}' missing; using '{}'", desired, label);
                        info!("{}", line);
                        log_line(&line);
                    }
                    (label.clone(), descriptor.clone())
                }
                None => (
                    crate::formats::BEST_AUDIO_LABEL.to_string(),
                    MediaFormatDescriptor::best_audio(),
                ),
            },
        };
        return Ok(ResolvedFormat {
            label,
            descriptor,
            container,
            is_playlist,
            title,
        });
    }

    let mut entries = filter_video_formats(&catalog.video, &container, &settings.codec, false);
    if entries.is_empty() && VIDEO_CONTAINERS.contains(&container.as_str()) && !settings.codec.is_empty() {
        let line = "[queue] chosen codec not available; using any codec for container";
        info!("{}", line);
        log_line(line);
        entries = filter_video_formats(&catalog.video, &container, &settings.codec, true);
    }
    if entries.is_empty() {
        entries.push((
            BEST_AVAILABLE_LABEL.to_string(),
            MediaFormatDescriptor::best_available(),
        ));
    }

    let (label, descriptor) = match entries.iter().find(|(label, _)| label == desired) {
        Some((label, descriptor)) => (label.clone(), descriptor.clone()),
        None => {
            let (label, descriptor) = entries[0].clone();
            if !desired.is_empty() {
                let line = format!("[queue] format '{}' missing; using '{}'", desired, label);
                info!("{}", line);
                log_line(&line);
            }
            (label, descriptor)
        }
    };

    Ok(ResolvedFormat {
        label,
        descriptor,
        container,
        is_playlist,
        title,
    })
}
