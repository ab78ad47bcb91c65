use std::sync::Arc;

use vodplay_common::{PlayerError, Result, VideoId, VideoRecord};

use super::VideoCatalog;

/// Resolves a video identifier to its record by scanning the catalog listing.
///
/// Nothing is cached: every call reads the listing again, so the outcome
/// tracks the backend state at the time of the call.
#[derive(Clone)]
pub struct MetadataGate {
    catalog: Arc<dyn VideoCatalog>,
}

impl MetadataGate {
    pub fn new(catalog: Arc<dyn VideoCatalog>) -> Self {
        Self { catalog }
    }

    pub async fn resolve(&self, id: &VideoId) -> Result<VideoRecord> {
        let entries = self.catalog.list_videos().await?;
        tracing::debug!(video_id = %id, entries = entries.len(), "Catalog listing fetched");

        entries
            .into_iter()
            .find(|entry| entry.matches(id))
            .map(|entry| entry.into_record(id))
            .ok_or_else(|| PlayerError::not_found(id))
    }
}
