//! HTTP catalog client against a mocked video service.

use std::sync::Arc;
use std::time::Duration;

use assert_matches::assert_matches;
use serde_json::json;
use url::Url;
use vodplay::catalog::{HttpCatalog, MetadataGate, VideoCatalog};
use vodplay_common::{PlayerError, VideoId};
use wiremock::matchers::{body_string_contains, header_exists, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn catalog_for(server: &MockServer) -> HttpCatalog {
    HttpCatalog::new(Url::parse(&server.uri()).unwrap(), Duration::from_secs(5)).unwrap()
}

fn listing() -> serde_json::Value {
    json!([
        {
            "videoId": "v1",
            "title": "Mountain timelapse",
            "description": "Clouds over the ridge",
            "contentType": "video/mp4",
            "duration": 125.5,
            "uploadDate": "2024-03-01T12:30:00.123",
            "thumbnailPath": "thumbnails/v1.jpg"
        },
        {
            "id": "v2",
            "title": "",
            "uploadDate": "2024-03-02T08:00:00Z"
        }
    ])
}

#[tokio::test]
async fn list_videos_parses_listing() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/videos"))
        .respond_with(ResponseTemplate::new(200).set_body_json(listing()))
        .expect(1)
        .mount(&server)
        .await;

    let entries = catalog_for(&server).list_videos().await.unwrap();

    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].video_id.as_deref(), Some("v1"));
    assert_eq!(entries[0].duration, Some(125.5));
    assert_eq!(entries[1].key(), Some(VideoId::from("v2")));
}

#[tokio::test]
async fn list_videos_non_2xx_is_fetch_failed() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/videos"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let err = catalog_for(&server).list_videos().await.unwrap_err();

    assert_matches!(err, PlayerError::FetchFailed { ref resource, .. } if resource == "catalog");
    assert!(err.is_retryable());
}

#[tokio::test]
async fn gate_resolves_record_by_either_id() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/videos"))
        .respond_with(ResponseTemplate::new(200).set_body_json(listing()))
        .expect(3)
        .mount(&server)
        .await;

    let gate = MetadataGate::new(Arc::new(catalog_for(&server)));

    let first = gate.resolve(&VideoId::from("v1")).await.unwrap();
    assert_eq!(first.title, "Mountain timelapse");
    assert_eq!(first.duration_seconds, Some(125.5));
    assert!(first.uploaded_at.is_some());

    let second = gate.resolve(&VideoId::from("v2")).await.unwrap();
    assert_eq!(second.display_title(), "Untitled Video");

    let missing = gate.resolve(&VideoId::from("v9")).await;
    assert_eq!(missing, Err(PlayerError::NotFound("v9".into())));
}

#[tokio::test]
async fn delete_success() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/api/v1/videos/v1"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"message": "Video deleted successfully", "success": true})),
        )
        .expect(1)
        .mount(&server)
        .await;

    assert_eq!(catalog_for(&server).delete_video(&VideoId::from("v1")).await, Ok(()));
}

#[tokio::test]
async fn delete_refusal_surfaces_server_message() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/api/v1/videos/v1"))
        .respond_with(
            ResponseTemplate::new(409).set_body_json(json!({"message": "locked", "success": false})),
        )
        .mount(&server)
        .await;

    let err = catalog_for(&server)
        .delete_video(&VideoId::from("v1"))
        .await
        .unwrap_err();

    assert_eq!(err, PlayerError::DeleteFailed("locked".into()));
    assert_eq!(err.to_string(), "locked");
}

#[tokio::test]
async fn delete_refusal_without_body_uses_default_message() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/api/v1/videos/v1"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let err = catalog_for(&server)
        .delete_video(&VideoId::from("v1"))
        .await
        .unwrap_err();

    assert_eq!(err.to_string(), "Failed to delete video");
}

#[tokio::test]
async fn video_duration_reads_data_field() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/videos/v1/duration"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"message": "ok", "success": true, "data": 42.0})),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/videos/v2/duration"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let catalog: Arc<dyn VideoCatalog> = Arc::new(catalog_for(&server));

    assert_eq!(catalog.video_duration(&VideoId::from("v1")).await, Ok(Some(42.0)));
    assert_eq!(
        catalog.video_duration(&VideoId::from("v2")).await,
        Err(PlayerError::NotFound("v2".into()))
    );
}

#[tokio::test]
async fn upload_sends_multipart_form() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/videos"))
        .and(header_exists("content-type"))
        .and(body_string_contains("name=\"title\""))
        .and(body_string_contains("Harbour at dusk"))
        .and(body_string_contains("filename=\"clip.mp4\""))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"videoId": "new1", "title": "Harbour at dusk"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("clip.mp4");
    std::fs::write(&file, b"not really a video").unwrap();

    let catalog: Arc<dyn VideoCatalog> = Arc::new(catalog_for(&server));
    let entry = catalog
        .upload_video(&file, "Harbour at dusk", "Boats coming in")
        .await
        .unwrap();

    assert_eq!(entry.key(), Some(VideoId::from("new1")));
}

#[tokio::test]
async fn upload_refusal_is_upload_failed() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/videos"))
        .respond_with(
            ResponseTemplate::new(400)
                .set_body_json(json!({"message": "Only video files are allowed", "success": false})),
        )
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("notes.txt");
    std::fs::write(&file, b"hello").unwrap();

    let err = catalog_for(&server)
        .upload_video(&file, "Notes", "")
        .await
        .unwrap_err();

    assert_eq!(err, PlayerError::UploadFailed("Only video files are allowed".into()));
}

#[tokio::test]
async fn request_timeout_is_applied() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/videos"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(listing())
                .set_delay(Duration::from_secs(2)),
        )
        .mount(&server)
        .await;

    let catalog =
        HttpCatalog::new(Url::parse(&server.uri()).unwrap(), Duration::from_millis(100)).unwrap();
    let err = catalog.list_videos().await.unwrap_err();

    assert_matches!(err, PlayerError::FetchFailed { ref resource, .. } if resource == "catalog");
}
