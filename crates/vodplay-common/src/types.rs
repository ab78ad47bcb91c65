//! Video records and the catalog wire shapes they are built from.
//!
//! The catalog service serializes its entity with camelCase keys and is not
//! consistent about which id field it fills, so [`CatalogEntry`] accepts both
//! `videoId` and `id` and every descriptive field is optional.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::VideoId;

const UNTITLED: &str = "Untitled Video";
const NO_DESCRIPTION: &str = "No description available for this video.";

/// Descriptive record of one video. Immutable once fetched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoRecord {
    pub id: VideoId,
    pub title: String,
    pub description: String,
    pub duration_seconds: Option<f64>,
    pub uploaded_at: Option<DateTime<Utc>>,
}

impl VideoRecord {
    /// Title for display, with a placeholder when the record has none.
    pub fn display_title(&self) -> &str {
        if self.title.trim().is_empty() {
            UNTITLED
        } else {
            &self.title
        }
    }

    /// Description for display, with a placeholder when the record has none.
    pub fn display_description(&self) -> &str {
        if self.description.trim().is_empty() {
            NO_DESCRIPTION
        } else {
            &self.description
        }
    }
}

/// One element of the `GET /api/v1/videos` listing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogEntry {
    #[serde(default)]
    pub video_id: Option<String>,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub content_type: Option<String>,
    #[serde(default)]
    pub duration: Option<f64>,
    #[serde(default)]
    pub upload_date: Option<String>,
    #[serde(default)]
    pub thumbnail_path: Option<String>,
}

impl CatalogEntry {
    /// Whether either id-bearing field equals `id`.
    pub fn matches(&self, id: &VideoId) -> bool {
        self.video_id.as_deref() == Some(id.as_str()) || self.id.as_deref() == Some(id.as_str())
    }

    /// The entry's own identifier, preferring `videoId`.
    pub fn key(&self) -> Option<VideoId> {
        self.video_id
            .as_deref()
            .or(self.id.as_deref())
            .map(VideoId::from)
    }

    /// Convert into a [`VideoRecord`], using `fallback` when the entry
    /// carries no id of its own.
    pub fn into_record(self, fallback: &VideoId) -> VideoRecord {
        let id = self.key().unwrap_or_else(|| fallback.clone());
        let uploaded_at = self.upload_date.as_deref().and_then(parse_upload_date);

        VideoRecord {
            id,
            title: self.title.unwrap_or_default(),
            description: self.description.unwrap_or_default(),
            duration_seconds: self.duration,
            uploaded_at,
        }
    }
}

/// Status body the catalog service returns from mutating endpoints.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerMessage {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub data: Option<f64>,
    #[serde(default)]
    pub file_name: Option<String>,
}

/// Parse an upload timestamp. The service emits either RFC 3339 or a zoneless
/// local date-time, which is taken as UTC.
fn parse_upload_date(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| naive.and_utc())
}
