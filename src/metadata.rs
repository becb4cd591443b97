// src/metadata.rs
// Raw metadata document model, as produced by the external metadata collaborator.

use serde::{Deserialize, Serialize};

/// One format entry as reported by the extraction backend. All fields are
/// optional because real-world metadata is sparse and inconsistent.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawFormat {
    #[serde(default)]
    pub format_id: Option<String>,
    #[serde(default)]
    pub ext: Option<String>,
    #[serde(default)]
    pub vcodec: Option<String>,
    #[serde(default)]
    pub acodec: Option<String>,
    #[serde(default)]
    pub height: Option<u32>,
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub fps: Option<f64>,
    /// Audio bitrate estimate, kbps
    #[serde(default)]
    pub abr: Option<f64>,
    /// Total bitrate estimate, kbps
    #[serde(default)]
    pub tbr: Option<f64>,
    #[serde(default)]
    pub filesize: Option<i64>,
    #[serde(default)]
    pub filesize_approx: Option<i64>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub format_note: Option<String>,
}

/// A nested playlist entry; only the pieces the orchestration layer reads.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawEntry {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub formats: Option<Vec<RawFormat>>,
}

/// The info document for one fetched URL.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawInfo {
    #[serde(rename = "_type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub entries: Option<Vec<RawEntry>>,
    #[serde(default)]
    pub formats: Option<Vec<RawFormat>>,
}

impl RawInfo {
    /// Whether this document describes a playlist rather than a single item.
    pub fn is_playlist(&self) -> bool {
        self.kind.as_deref() == Some("playlist") || self.entries.is_some()
    }

    /// The format list to build a catalog from. Playlist documents carry
    /// formats on their first entry, not at the top level.
    pub fn format_list(&self) -> Vec<RawFormat> {
        if self.kind.as_deref() == Some("playlist") {
            if let Some(entries) = &self.entries {
                if let Some(first) = entries.first() {
                    return first.formats.clone().unwrap_or_default();
                }
            }
        }
        self.formats.clone().unwrap_or_default()
    }

    /// Whitespace-normalized title, falling back to the first entry's title.
    pub fn preview_title(&self) -> String {
        let own = normalize_title(self.title.as_deref());
        if !own.is_empty() {
            return own;
        }
        if let Some(entries) = &self.entries {
            if let Some(first) = entries.first() {
                return normalize_title(first.title.as_deref());
            }
        }
        String::new()
    }
}

fn normalize_title(value: Option<&str>) -> String {
    value
        .unwrap_or("")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}
