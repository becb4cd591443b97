// src/options.rs
// Captured user settings and the parsing/clamping helpers around them.
// Everything here is user-typed free text, so bad input degrades to safe
// defaults instead of raising.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Default socket timeout handed to the download collaborator, seconds.
pub const DEFAULT_NETWORK_TIMEOUT_S: i64 = 30;

/// Default per-fragment retry count.
pub const DEFAULT_NETWORK_RETRIES: i64 = 3;

/// Default retry backoff, seconds.
pub const DEFAULT_RETRY_BACKOFF_S: f64 = 2.0;

/// Maximum length of a sanitized custom filename stem.
const FILENAME_MAX_LEN: usize = 160;

static WHITESPACE_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid regex"));
static ILLEGAL_FILENAME_CHARS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"[\\/:*?"<>|]+"#).expect("valid regex"));
static TRAILING_EXTENSION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\.[A-Za-z0-9]{1,5}$").expect("valid regex"));

/// Network, subtitle and filename options, clamped and normalized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DownloadOptions {
    pub network_timeout_s: i64,
    pub network_retries: i64,
    pub retry_backoff_s: f64,
    pub subtitle_languages: Vec<String>,
    pub write_subtitles: bool,
    pub embed_subtitles: bool,
    pub audio_language: String,
    pub custom_filename: String,
}

impl Default for DownloadOptions {
    fn default() -> Self {
        Self {
            network_timeout_s: DEFAULT_NETWORK_TIMEOUT_S,
            network_retries: DEFAULT_NETWORK_RETRIES,
            retry_backoff_s: DEFAULT_RETRY_BACKOFF_S,
            subtitle_languages: Vec::new(),
            write_subtitles: false,
            embed_subtitles: false,
            audio_language: String::new(),
            custom_filename: String::new(),
        }
    }
}

/// Per-item settings snapshot captured when the user adds to the queue.
/// Never auto-mutated afterwards.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueueSettings {
    pub mode: String,
    pub container: String,
    pub codec: String,
    pub convert_to_mp4: bool,
    pub format_label: String,
    pub estimated_size: String,
    pub output_dir: String,
    pub playlist_items: String,
    pub network_timeout_s: String,
    pub network_retries: String,
    pub retry_backoff_s: String,
    pub subtitle_languages: Vec<String>,
    pub write_subtitles: bool,
    pub embed_subtitles: bool,
    pub audio_language: String,
    pub custom_filename: String,
}

/// Parse an integer field, accepting float text ("30.5" -> 30); unparsable
/// input falls back to the default, in-range input is clamped.
pub fn parse_int_setting(value: &str, default: i64, minimum: i64, maximum: i64) -> i64 {
    match value.trim().parse::<f64>() {
        Ok(parsed) if parsed.is_finite() => (parsed.trunc() as i64).clamp(minimum, maximum),
        _ => default,
    }
}

/// Float twin of `parse_int_setting`.
pub fn parse_float_setting(value: &str, default: f64, minimum: f64, maximum: f64) -> f64 {
    match value.trim().parse::<f64>() {
        Ok(parsed) if parsed.is_finite() => parsed.clamp(minimum, maximum),
        _ => default,
    }
}

/// Comma-separated language list, trimmed, lowercased, deduped, ordered.
pub fn parse_subtitle_languages(value: &str) -> Vec<String> {
    let mut languages = Vec::new();
    for token in value.split(',') {
        let clean = token.trim().to_lowercase();
        if !clean.is_empty() && !languages.contains(&clean) {
            languages.push(clean);
        }
    }
    languages
}

/// Sanitize a user-typed filename stem: collapse whitespace, replace path
/// separators and shell-unsafe characters with spaces, strip a trailing
/// extension-like suffix and bound the length. Degenerate results mean
/// "use default naming".
pub fn sanitize_custom_filename(value: &str) -> String {
    let mut stem = WHITESPACE_RUN.replace_all(value.trim(), " ").into_owned();
    stem = ILLEGAL_FILENAME_CHARS.replace_all(&stem, " ").into_owned();
    stem = stem.trim().trim_matches('.').to_string();
    stem = WHITESPACE_RUN.replace_all(&stem, " ").trim().to_string();
    stem = TRAILING_EXTENSION.replace(&stem, "").trim().to_string();
    if matches!(stem.as_str(), "" | "." | "..") {
        return String::new();
    }
    stem.chars().take(FILENAME_MAX_LEN).collect()
}

/// Compose clamped options from raw field text. Subtitle writing is only
/// honored in video mode, and embedding only when writing is on.
#[allow(clippy::too_many_arguments)]
pub fn build_download_options(
    network_timeout_raw: &str,
    network_retries_raw: &str,
    retry_backoff_raw: &str,
    subtitle_languages_raw: &str,
    write_subtitles_requested: bool,
    embed_subtitles_requested: bool,
    is_video_mode: bool,
    audio_language_raw: &str,
    custom_filename_raw: &str,
) -> DownloadOptions {
    let write_subtitles = write_subtitles_requested && is_video_mode;
    DownloadOptions {
        network_timeout_s: parse_int_setting(network_timeout_raw, DEFAULT_NETWORK_TIMEOUT_S, 1, 300),
        network_retries: parse_int_setting(network_retries_raw, DEFAULT_NETWORK_RETRIES, 0, 10),
        retry_backoff_s: parse_float_setting(retry_backoff_raw, DEFAULT_RETRY_BACKOFF_S, 0.0, 30.0),
        subtitle_languages: parse_subtitle_languages(subtitle_languages_raw),
        write_subtitles,
        embed_subtitles: write_subtitles && embed_subtitles_requested,
        audio_language: audio_language_raw.trim().to_string(),
        custom_filename: sanitize_custom_filename(custom_filename_raw),
    }
}

/// Capture the full per-item snapshot for the queue.
#[allow(clippy::too_many_arguments)]
pub fn build_queue_settings(
    mode: &str,
    container: &str,
    codec: &str,
    convert_to_mp4: bool,
    format_label: &str,
    estimated_size: &str,
    output_dir: &str,
    playlist_items: &str,
    options: &DownloadOptions,
) -> QueueSettings {
    QueueSettings {
        mode: mode.to_string(),
        container: container.to_string(),
        codec: codec.to_string(),
        convert_to_mp4,
        format_label: format_label.to_string(),
        estimated_size: estimated_size.to_string(),
        output_dir: output_dir.to_string(),
        playlist_items: playlist_items.trim().to_string(),
        network_timeout_s: options.network_timeout_s.to_string(),
        network_retries: options.network_retries.to_string(),
        retry_backoff_s: options.retry_backoff_s.to_string(),
        subtitle_languages: options.subtitle_languages.clone(),
        write_subtitles: options.write_subtitles,
        embed_subtitles: options.embed_subtitles,
        audio_language: options.audio_language.clone(),
        custom_filename: options.custom_filename.clone(),
    }
}

/// Re-clamp the loosely-typed numeric fields of a captured snapshot.
pub fn options_from_queue_settings(settings: &QueueSettings) -> DownloadOptions {
    DownloadOptions {
        network_timeout_s: parse_int_setting(
            &settings.network_timeout_s,
            DEFAULT_NETWORK_TIMEOUT_S,
            1,
            300,
        ),
        network_retries: parse_int_setting(
            &settings.network_retries,
            DEFAULT_NETWORK_RETRIES,
            0,
            10,
        ),
        retry_backoff_s: parse_float_setting(
            &settings.retry_backoff_s,
            DEFAULT_RETRY_BACKOFF_S,
            0.0,
            30.0,
        ),
        subtitle_languages: settings
            .subtitle_languages
            .iter()
            .map(|token| token.trim().to_lowercase())
            .filter(|token| !token.is_empty())
            .fold(Vec::new(), |mut acc, token| {
                if !acc.contains(&token) {
                    acc.push(token);
                }
                acc
            }),
        write_subtitles: settings.write_subtitles,
        embed_subtitles: settings.embed_subtitles,
        audio_language: settings.audio_language.clone(),
        custom_filename: settings.custom_filename.clone(),
    }
}
