// src/formats.rs
// Format catalog construction: split raw formats into video/audio lists,
// trim low-quality noise, collapse near-duplicates and produce stable
// human-readable labels. Pure functions, no I/O.

use crate::metadata::{RawFormat, RawInfo};
use humansize::{format_size, BINARY};

/// Label used for the synthetic best-audio fallback entry.
pub const BEST_AUDIO_LABEL: &str = "Best audio only";

/// Label used for the synthetic combined-stream fallback entry.
pub const BEST_AVAILABLE_LABEL: &str = "Best available";

/// Video entries below this height are trimmed when better ones exist.
const VIDEO_FLOOR_HEIGHT: u32 = 480;

/// Audio entries below this bitrate (kbps) are trimmed when better ones exist.
const AUDIO_FLOOR_KBPS: f64 = 128.0;

/// One selectable format, normalized from raw metadata. Immutable once built.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MediaFormatDescriptor {
    pub format_id: String,
    pub ext: String,
    pub vcodec: String,
    pub acodec: String,
    pub height: u32,
    pub width: u32,
    pub fps: f64,
    /// Bitrate estimate in kbps (audio bitrate preferred, total as fallback)
    pub bitrate: f64,
    /// Total bitrate estimate in kbps, used to pick duplicate survivors
    pub total_bitrate: f64,
    pub filesize: Option<u64>,
    pub language: String,
    pub format_note: String,
    /// Engine-side format directive for synthetic (non-catalog) entries
    pub custom_format: Option<String>,
    pub is_audio_only: bool,
}

impl MediaFormatDescriptor {
    pub fn from_raw(raw: &RawFormat) -> Self {
        let abr = raw.abr.unwrap_or(0.0);
        let tbr = raw.tbr.unwrap_or(0.0);
        Self {
            format_id: raw.format_id.clone().unwrap_or_default(),
            ext: raw.ext.clone().unwrap_or_default(),
            vcodec: raw.vcodec.clone().unwrap_or_default(),
            acodec: raw.acodec.clone().unwrap_or_default(),
            height: raw.height.unwrap_or(0),
            width: raw.width.unwrap_or(0),
            fps: raw.fps.unwrap_or(0.0),
            bitrate: if abr > 0.0 { abr } else { tbr },
            total_bitrate: if tbr > 0.0 { tbr } else { abr },
            filesize: estimate_filesize(raw),
            language: raw.language.clone().unwrap_or_default(),
            format_note: raw.format_note.clone().unwrap_or_default(),
            custom_format: None,
            is_audio_only: false,
        }
    }

    /// Synthetic "best audio" fallback, used when a source has no audio-only
    /// tracks or a captured label can no longer be resolved.
    pub fn best_audio() -> Self {
        Self {
            custom_format: Some("bestaudio/best".to_string()),
            is_audio_only: true,
            ..Self::default()
        }
    }

    /// Synthetic "best available" fallback covering both streams.
    pub fn best_available() -> Self {
        Self {
            custom_format: Some("bestvideo+bestaudio/best".to_string()),
            ..Self::default()
        }
    }

    pub fn is_synthetic(&self) -> bool {
        self.custom_format.is_some()
    }

    pub fn is_audio(&self) -> bool {
        self.is_audio_only || self.vcodec == "none"
    }

    pub fn is_video_only(&self) -> bool {
        !self.is_audio() && (self.acodec.is_empty() || self.acodec == "none")
    }
}

/// Byte-size estimate for a raw format; exact size preferred over approximate.
pub fn estimate_filesize(raw: &RawFormat) -> Option<u64> {
    let value = raw.filesize.or(raw.filesize_approx)?;
    if value <= 0 {
        return None;
    }
    Some(value as u64)
}

/// Human-readable byte count, empty for unknown sizes.
pub fn humanize_bytes(size: Option<u64>) -> String {
    match size {
        Some(bytes) if bytes > 0 => format_size(bytes, BINARY),
        _ => String::new(),
    }
}

/// Ordered label -> descriptor mappings for one fetched URL, plus the
/// detected audio language tags and a preview title.
#[derive(Debug, Clone, Default)]
pub struct FormatCatalog {
    pub video: Vec<(String, MediaFormatDescriptor)>,
    pub audio: Vec<(String, MediaFormatDescriptor)>,
    pub audio_languages: Vec<String>,
    pub preview_title: String,
}

impl FormatCatalog {
    /// Build the catalog for one info document. Deterministic: identical
    /// input always yields identical ordered output.
    pub fn from_info(info: &RawInfo) -> Self {
        let raw = info.format_list();
        let descriptors: Vec<MediaFormatDescriptor> =
            raw.iter().map(MediaFormatDescriptor::from_raw).collect();
        let (video_list, audio_list) = split_and_filter(&descriptors);

        let video = build_labeled(&video_list);
        let mut audio = build_labeled(&audio_list);
        audio.insert(
            0,
            (
                BEST_AUDIO_LABEL.to_string(),
                MediaFormatDescriptor::best_audio(),
            ),
        );

        Self {
            video,
            audio,
            audio_languages: extract_audio_languages(&descriptors),
            preview_title: info.preview_title(),
        }
    }

    pub fn video_labels(&self) -> Vec<String> {
        self.video.iter().map(|(label, _)| label.clone()).collect()
    }

    pub fn audio_labels(&self) -> Vec<String> {
        self.audio.iter().map(|(label, _)| label.clone()).collect()
    }

    /// True when the fetch produced nothing selectable beyond the synthetic
    /// audio fallback.
    pub fn is_empty(&self) -> bool {
        self.video.is_empty() && self.audio.len() <= 1
    }
}

/// Split descriptors into video and audio lists, trimming low-quality
/// entries. The floors only apply when some entry exceeds them, so
/// low-quality-only sources stay usable.
fn split_and_filter(
    descriptors: &[MediaFormatDescriptor],
) -> (Vec<MediaFormatDescriptor>, Vec<MediaFormatDescriptor>) {
    let max_height = descriptors
        .iter()
        .filter(|d| !d.is_audio())
        .map(|d| d.height)
        .max()
        .unwrap_or(0);
    let video_min_height = if max_height <= VIDEO_FLOOR_HEIGHT {
        0
    } else {
        VIDEO_FLOOR_HEIGHT
    };

    let max_audio_bitrate = descriptors
        .iter()
        .filter(|d| d.is_audio())
        .map(|d| d.bitrate)
        .fold(0.0_f64, f64::max);
    let audio_min_bitrate = if max_audio_bitrate <= AUDIO_FLOOR_KBPS {
        0.0
    } else {
        AUDIO_FLOOR_KBPS
    };

    let mut video_list = Vec::new();
    let mut audio_list = Vec::new();
    for descriptor in descriptors {
        if descriptor.is_audio() {
            if descriptor.bitrate > 0.0 && descriptor.bitrate < audio_min_bitrate {
                continue;
            }
            audio_list.push(descriptor.clone());
        } else {
            if descriptor.height > 0 && descriptor.height < video_min_height {
                continue;
            }
            video_list.push(descriptor.clone());
        }
    }
    (video_list, audio_list)
}

/// Collapse near-duplicate formats (same container/codec/resolution/fps),
/// keeping the highest-bitrate representative per signature.
fn collapse(descriptors: &[MediaFormatDescriptor]) -> Vec<MediaFormatDescriptor> {
    type Signature = (bool, String, String, u32, u64);
    let mut collapsed: Vec<(Signature, MediaFormatDescriptor)> = Vec::new();
    for descriptor in descriptors {
        let is_audio = descriptor.is_audio();
        let sig: Signature = (
            is_audio,
            descriptor.ext.clone(),
            if is_audio {
                descriptor.acodec.clone()
            } else {
                descriptor.vcodec.clone()
            },
            if is_audio { 0 } else { descriptor.height },
            if is_audio {
                0
            } else {
                (descriptor.fps * 1000.0) as u64
            },
        );
        match collapsed.iter_mut().find(|(existing, _)| *existing == sig) {
            Some((_, current)) => {
                if descriptor.total_bitrate > current.total_bitrate {
                    *current = descriptor.clone();
                }
            }
            None => collapsed.push((sig, descriptor.clone())),
        }
    }
    collapsed.into_iter().map(|(_, d)| d).collect()
}

/// Sort: video before audio, preferred container first, preferred codec
/// first, then descending height and bitrate. Stable, so collapse order
/// breaks remaining ties deterministically.
fn sort_formats(descriptors: &mut [MediaFormatDescriptor]) {
    descriptors.sort_by_key(|d| {
        (
            d.is_audio(),
            d.ext != "mp4",
            !d.vcodec.contains("avc"),
            std::cmp::Reverse(d.height),
            std::cmp::Reverse((d.bitrate * 1000.0) as i64),
        )
    });
}

/// Human-readable label for one descriptor.
fn label_format(descriptor: &MediaFormatDescriptor) -> String {
    let ext = descriptor.ext.to_uppercase();
    let size_text = humanize_bytes(descriptor.filesize);

    if descriptor.is_audio() {
        let quality = if descriptor.bitrate > 0.0 {
            format!("{}k", descriptor.bitrate as u64)
        } else {
            "Audio".to_string()
        };
        let codec = if descriptor.acodec.is_empty() {
            "audio"
        } else {
            &descriptor.acodec
        };
        let size_part = if size_text.is_empty() {
            String::new()
        } else {
            format!(" ~{}", size_text)
        };
        return format!(
            "Audio {} {} ({}){} [{}]",
            ext, quality, codec, size_part, descriptor.format_id
        );
    }

    let resolution = if descriptor.height > 0 && descriptor.width > 0 {
        format!(
            "{}p {}x{}",
            descriptor.height, descriptor.width, descriptor.height
        )
    } else if descriptor.height > 0 {
        format!("{}p", descriptor.height)
    } else {
        "Video".to_string()
    };

    let mut parts = vec![resolution, ext];
    if descriptor.fps > 0.0 {
        if descriptor.fps.fract() == 0.0 {
            parts.push(format!("{}fps", descriptor.fps as u64));
        } else {
            parts.push(format!("{}fps", descriptor.fps));
        }
    }
    if !descriptor.format_note.is_empty() {
        parts.push(format!("[{}]", descriptor.format_note));
    }
    if !size_text.is_empty() {
        parts.push(format!("~{}", size_text));
    }
    let codecs: Vec<&str> = [descriptor.vcodec.as_str(), descriptor.acodec.as_str()]
        .into_iter()
        .filter(|c| !c.is_empty() && *c != "none")
        .collect();
    if !codecs.is_empty() {
        parts.push(format!("({})", codecs.join(" + ")));
    }
    format!("{} [{}]", parts.join(" "), descriptor.format_id)
}

/// Collapse, sort and label one list. Labels are unique within the result:
/// collisions get a format-id suffix. Descriptors without an id are skipped.
fn build_labeled(descriptors: &[MediaFormatDescriptor]) -> Vec<(String, MediaFormatDescriptor)> {
    let mut ordered = collapse(descriptors);
    sort_formats(&mut ordered);

    let mut seen = std::collections::HashSet::new();
    let mut labeled = Vec::new();
    for descriptor in ordered {
        if descriptor.format_id.is_empty() {
            continue;
        }
        let mut label = label_format(&descriptor);
        if seen.contains(&label) {
            label = format!("{} ({})", label, descriptor.format_id);
        }
        seen.insert(label.clone());
        labeled.push((label, descriptor));
    }
    labeled
}

/// Normalized audio language codes from the audio tracks, sorted and deduped.
pub fn extract_audio_languages(descriptors: &[MediaFormatDescriptor]) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    let mut languages = Vec::new();
    for descriptor in descriptors {
        if !descriptor.is_audio() {
            continue;
        }
        let lang = descriptor.language.trim().to_lowercase();
        if lang.is_empty() || matches!(lang.as_str(), "none" | "und" | "unknown" | "n/a" | "na") {
            continue;
        }
        if seen.insert(lang.clone()) {
            languages.push(lang);
        }
    }
    languages.sort();
    languages
}
