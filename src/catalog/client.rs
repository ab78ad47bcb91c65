use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{multipart, Client, Response};
use url::Url;
use vodplay_common::{CatalogEntry, PlayerError, Result, ServerMessage, VideoId};

/// Path of the video collection below the service base URL.
const VIDEOS_PATH: [&str; 3] = ["api", "v1", "videos"];

/// The remote video catalog as the playback core sees it.
#[async_trait]
pub trait VideoCatalog: Send + Sync {
    /// Fetch the full listing.
    async fn list_videos(&self) -> Result<Vec<CatalogEntry>>;

    /// Delete a video. A refusal carries the server's message when it sent one.
    async fn delete_video(&self, id: &VideoId) -> Result<()>;

    /// Ask the service for a video's duration in seconds.
    async fn video_duration(&self, id: &VideoId) -> Result<Option<f64>>;

    /// Upload a video file with its title and description.
    async fn upload_video(
        &self,
        file: &Path,
        title: &str,
        description: &str,
    ) -> Result<CatalogEntry>;

    /// URL of the adaptive-streaming manifest for a video.
    fn manifest_url(&self, id: &VideoId) -> Result<Url>;

    /// URL of the thumbnail image for a video.
    fn thumbnail_url(&self, id: &VideoId) -> Result<Url>;
}

/// [`VideoCatalog`] over the service's HTTP API.
#[derive(Clone)]
pub struct HttpCatalog {
    client: Client,
    base_url: Url,
}

impl HttpCatalog {
    /// Fails when the HTTP client cannot be built with the request timeout.
    pub fn new(base_url: Url, timeout: Duration) -> reqwest::Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client, base_url })
    }

    /// The underlying HTTP client, shared with engines built for this catalog.
    pub fn client(&self) -> &Client {
        &self.client
    }

    fn url(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| PlayerError::fetch_failed("catalog", "base URL cannot carry a path"))?
            .pop_if_empty()
            .extend(VIDEOS_PATH)
            .extend(segments);
        Ok(url)
    }

    async fn send(&self, request: reqwest::RequestBuilder, resource: &str) -> Result<Response> {
        request
            .send()
            .await
            .map_err(|e| PlayerError::fetch_failed(resource, e))
    }
}

/// Pull the `message` out of a status body, if the body is one.
async fn read_message(response: Response) -> Option<String> {
    let text = response.text().await.ok()?;
    serde_json::from_str::<ServerMessage>(&text)
        .ok()
        .and_then(|m| m.message)
}

#[async_trait]
impl VideoCatalog for HttpCatalog {
    async fn list_videos(&self) -> Result<Vec<CatalogEntry>> {
        let response = self.send(self.client.get(self.url(&[])?), "catalog").await?;

        let status = response.status();
        if !status.is_success() {
            return Err(PlayerError::fetch_failed("catalog", format!("HTTP {}", status)));
        }

        response
            .json()
            .await
            .map_err(|e| PlayerError::fetch_failed("catalog", e))
    }

    async fn delete_video(&self, id: &VideoId) -> Result<()> {
        let url = self.url(&[id.as_str()])?;
        let response = self
            .client
            .delete(url)
            .send()
            .await
            .map_err(|e| PlayerError::DeleteFailed(e.to_string()))?;

        if response.status().is_success() {
            tracing::info!(video_id = %id, "Video deleted");
            return Ok(());
        }

        let status = response.status();
        let message = read_message(response).await;
        tracing::warn!(video_id = %id, %status, "Delete refused: {:?}", message);
        Err(PlayerError::delete_failed(message))
    }

    /// The service computes and stores the duration on first request, so this
    /// can be slow for fresh uploads.
    async fn video_duration(&self, id: &VideoId) -> Result<Option<f64>> {
        let url = self.url(&[id.as_str(), "duration"])?;
        let response = self.send(self.client.get(url), "duration").await?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(PlayerError::not_found(id));
        }
        if !response.status().is_success() {
            let message = read_message(response).await;
            tracing::debug!(video_id = %id, "Duration unavailable: {:?}", message);
            return Ok(None);
        }

        let body: ServerMessage = response
            .json()
            .await
            .map_err(|e| PlayerError::fetch_failed("duration", e))?;
        Ok(body.data)
    }

    async fn upload_video(
        &self,
        file: &Path,
        title: &str,
        description: &str,
    ) -> Result<CatalogEntry> {
        let bytes = tokio::fs::read(file)
            .await
            .map_err(|e| PlayerError::UploadFailed(format!("Failed to read {:?}: {}", file, e)))?;

        let file_name = file
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "upload".to_string());
        let mime = mime_guess::from_path(file).first_or_octet_stream();

        let part = multipart::Part::bytes(bytes)
            .file_name(file_name.clone())
            .mime_str(mime.essence_str())
            .map_err(|e| PlayerError::UploadFailed(e.to_string()))?;
        let form = multipart::Form::new()
            .part("file", part)
            .text("title", title.to_string())
            .text("description", description.to_string());

        tracing::info!(file = %file_name, mime = %mime, "Uploading video");
        let response = self
            .send(self.client.post(self.url(&[])?).multipart(form), "upload")
            .await?;

        if !response.status().is_success() {
            let message = read_message(response).await;
            return Err(PlayerError::UploadFailed(
                message.unwrap_or_else(|| "Video not uploaded".to_string()),
            ));
        }

        response
            .json()
            .await
            .map_err(|e| PlayerError::UploadFailed(format!("Unexpected upload response: {}", e)))
    }

    fn manifest_url(&self, id: &VideoId) -> Result<Url> {
        self.url(&[id.as_str(), "master.m3u8"])
    }

    fn thumbnail_url(&self, id: &VideoId) -> Result<Url> {
        self.url(&[id.as_str(), "thumbnail"])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog(base: &str) -> HttpCatalog {
        HttpCatalog::new(Url::parse(base).unwrap(), Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn test_manifest_url() {
        let url = catalog("http://localhost:8080")
            .manifest_url(&VideoId::from("v1"))
            .unwrap();
        assert_eq!(url.as_str(), "http://localhost:8080/api/v1/videos/v1/master.m3u8");
    }

    #[test]
    fn test_urls_respect_base_path() {
        let catalog = catalog("http://media.local/stream/");
        let url = catalog.thumbnail_url(&VideoId::from("abc")).unwrap();
        assert_eq!(url.as_str(), "http://media.local/stream/api/v1/videos/abc/thumbnail");
    }

    #[test]
    fn test_ids_are_path_escaped() {
        let url = catalog("http://localhost:8080")
            .manifest_url(&VideoId::from("a/b"))
            .unwrap();
        assert_eq!(url.as_str(), "http://localhost:8080/api/v1/videos/a%2Fb/master.m3u8");
    }
}
