// src/request.rs
// Composes the fully-resolved, bounds-checked request handed to the
// download collaborator. Constructed fresh per job, never reused.

use crate::formats::MediaFormatDescriptor;
use crate::options::{self, DownloadOptions, QueueSettings};
use crate::selection::ResolvedFormat;
use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::PathBuf;

static ANY_WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid regex"));

/// The structure consumed by the external download collaborator.
#[derive(Debug, Clone)]
pub struct DownloadRequest {
    pub url: String,
    pub output_dir: PathBuf,
    /// Resolved descriptor; synthetic descriptors carry a directive instead
    /// of a catalog id
    pub format: Option<MediaFormatDescriptor>,
    pub format_label: String,
    pub container: String,
    pub convert_to_mp4: bool,
    pub playlist_enabled: bool,
    /// Whitespace-normalized range spec; None when playlist mode is off
    pub playlist_items: Option<String>,
    pub network_timeout_s: i64,
    pub network_retries: i64,
    pub retry_backoff_s: f64,
    pub subtitle_languages: Vec<String>,
    pub write_subtitles: bool,
    pub embed_subtitles: bool,
    pub audio_language: String,
    pub custom_filename: String,
}

/// Strip all whitespace from a playlist range spec. Returns the normalized
/// value (None when empty) and whether normalization changed the input.
pub fn normalize_playlist_items(value: &str) -> (Option<String>, bool) {
    let normalized = ANY_WHITESPACE.replace_all(value, "").into_owned();
    let changed = !value.is_empty() && normalized != value;
    if normalized.is_empty() {
        (None, changed)
    } else {
        (Some(normalized), changed)
    }
}

/// Expand a leading `~` against the home directory.
pub fn expand_user(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~") {
        if let Some(home) = dirs_next::home_dir() {
            let rest = rest.trim_start_matches(['/', '\\']);
            return if rest.is_empty() { home } else { home.join(rest) };
        }
    }
    PathBuf::from(path)
}

/// Default output directory when none is configured: the user's download
/// folder, else the home directory, else the current directory.
pub fn default_output_dir() -> PathBuf {
    dirs_next::download_dir()
        .or_else(dirs_next::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Build the request for the single-item path from live settings.
#[allow(clippy::too_many_arguments)]
pub fn build_single_request(
    url: &str,
    output_dir: PathBuf,
    format: Option<MediaFormatDescriptor>,
    format_label: &str,
    container: &str,
    convert_to_mp4: bool,
    playlist_enabled: bool,
    playlist_items_raw: &str,
    options: &DownloadOptions,
) -> DownloadRequest {
    let (mut playlist_items, changed) = normalize_playlist_items(playlist_items_raw);
    if changed {
        debug!("playlist range spec normalized from {:?}", playlist_items_raw);
    }
    // Playlist mode off wins over any typed range text.
    if !playlist_enabled {
        playlist_items = None;
    }
    DownloadRequest {
        url: url.to_string(),
        output_dir,
        format,
        format_label: format_label.to_string(),
        container: container.to_string(),
        convert_to_mp4,
        playlist_enabled,
        playlist_items,
        network_timeout_s: options.network_timeout_s,
        network_retries: options.network_retries,
        retry_backoff_s: options.retry_backoff_s,
        subtitle_languages: options.subtitle_languages.clone(),
        write_subtitles: options.write_subtitles,
        embed_subtitles: options.embed_subtitles,
        audio_language: options.audio_language.clone(),
        custom_filename: options.custom_filename.clone(),
    }
}

/// Build the request for one queue item from its captured snapshot and the
/// format resolved against fresh metadata.
pub fn build_queue_request(
    url: &str,
    settings: &QueueSettings,
    resolved: &ResolvedFormat,
    default_output_dir: &str,
) -> DownloadRequest {
    let parsed = options::options_from_queue_settings(settings);
    let (playlist_items, changed) = normalize_playlist_items(&settings.playlist_items);
    if changed {
        debug!(
            "playlist range spec normalized from {:?}",
            settings.playlist_items
        );
    }
    let dir_text = if settings.output_dir.trim().is_empty() {
        default_output_dir
    } else {
        settings.output_dir.as_str()
    };
    let output_dir = if dir_text.trim().is_empty() {
        self::default_output_dir()
    } else {
        expand_user(dir_text)
    };

    DownloadRequest {
        url: url.to_string(),
        output_dir,
        format: Some(resolved.descriptor.clone()),
        format_label: resolved.label.clone(),
        container: resolved.container.clone(),
        convert_to_mp4: settings.convert_to_mp4,
        playlist_enabled: resolved.is_playlist,
        playlist_items: if resolved.is_playlist {
            playlist_items
        } else {
            None
        },
        network_timeout_s: parsed.network_timeout_s,
        network_retries: parsed.network_retries,
        retry_backoff_s: parsed.retry_backoff_s,
        subtitle_languages: parsed.subtitle_languages,
        write_subtitles: parsed.write_subtitles,
        embed_subtitles: parsed.embed_subtitles,
        audio_language: parsed.audio_language,
        custom_filename: parsed.custom_filename,
    }
}
