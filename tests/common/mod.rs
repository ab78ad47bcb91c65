//! Shared fakes for integration tests.
//!
//! [`FakeCatalog`] serves a fixed listing and a configurable delete outcome.
//! [`FakeEngines`] records every engine call in one ordered log and either
//! answers manifest loads immediately or holds the session handle so a test
//! can deliver the answer late.

#![allow(dead_code)]

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use url::Url;
use vodplay::catalog::VideoCatalog;
use vodplay::orchestrator::SessionOrchestrator;
use vodplay::player::{
    EngineEvent, EngineFactory, HeadlessSink, MediaSink, SessionEvents, SessionOptions,
    StreamingEngine,
};
use vodplay_common::{CatalogEntry, PlayerError, Result, VideoId};
use vodplay_hls::{EngineLevel, ManifestLevel};

pub const WAIT: Duration = Duration::from_secs(2);

pub fn entry(id: &str, title: &str) -> CatalogEntry {
    CatalogEntry {
        video_id: Some(id.to_string()),
        title: Some(title.to_string()),
        description: Some(format!("About {title}")),
        duration: Some(95.0),
        upload_date: Some("2024-03-01T12:00:00".to_string()),
        ..Default::default()
    }
}

pub fn levels(heights: &[u32]) -> Vec<ManifestLevel> {
    heights
        .iter()
        .enumerate()
        .map(|(i, h)| ManifestLevel::with_height(i, *h))
        .collect()
}

pub struct FakeCatalog {
    entries: Mutex<Result<Vec<CatalogEntry>>>,
    delete_result: Mutex<Result<()>>,
    pub deletes: Mutex<Vec<VideoId>>,
    pub uploads: Mutex<Vec<String>>,
    pub listings: Mutex<usize>,
}

impl FakeCatalog {
    pub fn new(entries: Vec<CatalogEntry>) -> Arc<Self> {
        Arc::new(Self {
            entries: Mutex::new(Ok(entries)),
            delete_result: Mutex::new(Ok(())),
            deletes: Mutex::new(Vec::new()),
            uploads: Mutex::new(Vec::new()),
            listings: Mutex::new(0),
        })
    }

    pub fn set_listing(&self, result: Result<Vec<CatalogEntry>>) {
        *self.entries.lock() = result;
    }

    pub fn fail_deletes(&self, error: PlayerError) {
        *self.delete_result.lock() = Err(error);
    }
}

#[async_trait]
impl VideoCatalog for FakeCatalog {
    async fn list_videos(&self) -> Result<Vec<CatalogEntry>> {
        *self.listings.lock() += 1;
        self.entries.lock().clone()
    }

    async fn delete_video(&self, id: &VideoId) -> Result<()> {
        self.deletes.lock().push(id.clone());
        self.delete_result.lock().clone()
    }

    async fn video_duration(&self, id: &VideoId) -> Result<Option<f64>> {
        self.entries
            .lock()
            .clone()?
            .into_iter()
            .find(|e| e.matches(id))
            .map(|e| e.duration)
            .ok_or_else(|| PlayerError::not_found(id))
    }

    async fn upload_video(
        &self,
        file: &Path,
        title: &str,
        _description: &str,
    ) -> Result<CatalogEntry> {
        let mut uploads = self.uploads.lock();
        uploads.push(file.display().to_string());
        Ok(entry(&format!("up{}", uploads.len()), title))
    }

    fn manifest_url(&self, id: &VideoId) -> Result<Url> {
        Url::parse(&format!("http://cdn.test/api/v1/videos/{id}/master.m3u8"))
            .map_err(|e| PlayerError::manifest(e.to_string()))
    }

    fn thumbnail_url(&self, id: &VideoId) -> Result<Url> {
        Url::parse(&format!("http://cdn.test/api/v1/videos/{id}/thumbnail"))
            .map_err(|e| PlayerError::manifest(e.to_string()))
    }
}

/// Ordered record of engine calls, e.g. `load v1`, `level v1 1`, `destroy v1`.
pub type EngineLog = Arc<Mutex<Vec<String>>>;

pub struct FakeEngines {
    supported: bool,
    answer: Option<Vec<ManifestLevel>>,
    pub log: EngineLog,
    pub held: Arc<Mutex<Vec<SessionEvents>>>,
}

impl FakeEngines {
    /// Engines that answer every manifest load with these levels.
    pub fn answering(levels: Vec<ManifestLevel>) -> Arc<Self> {
        Arc::new(Self {
            supported: true,
            answer: Some(levels),
            log: EngineLog::default(),
            held: Arc::default(),
        })
    }

    /// Engines that never answer on their own.
    pub fn silent() -> Arc<Self> {
        Arc::new(Self {
            supported: true,
            answer: None,
            log: EngineLog::default(),
            held: Arc::default(),
        })
    }

    /// A runtime without adaptive engine support.
    pub fn unsupported() -> Arc<Self> {
        Arc::new(Self {
            supported: false,
            answer: None,
            log: EngineLog::default(),
            held: Arc::default(),
        })
    }

    pub fn entries(&self) -> Vec<String> {
        self.log.lock().clone()
    }

    pub fn position(&self, entry: &str) -> Option<usize> {
        self.log.lock().iter().position(|e| e == entry)
    }

    pub fn count(&self, prefix: &str) -> usize {
        self.log.lock().iter().filter(|e| e.starts_with(prefix)).count()
    }

    /// Deliver a manifest answer through the session handle of the n-th load.
    pub fn answer_late(&self, nth: usize, levels: Vec<ManifestLevel>) -> bool {
        let events = self.held.lock()[nth].clone();
        events.engine(EngineEvent::ManifestParsed(levels))
    }
}

impl EngineFactory for FakeEngines {
    fn is_supported(&self) -> bool {
        self.supported
    }

    fn create(&self) -> Box<dyn StreamingEngine> {
        Box::new(FakeEngine {
            video: String::new(),
            manifest: None,
            answer: self.answer.clone(),
            level: EngineLevel::Auto,
            log: Arc::clone(&self.log),
            held: Arc::clone(&self.held),
            destroyed: false,
        })
    }
}

struct FakeEngine {
    video: String,
    manifest: Option<Url>,
    answer: Option<Vec<ManifestLevel>>,
    level: EngineLevel,
    log: EngineLog,
    held: Arc<Mutex<Vec<SessionEvents>>>,
    destroyed: bool,
}

impl StreamingEngine for FakeEngine {
    fn load_source(&mut self, url: Url, events: SessionEvents) {
        self.video = events.token().video_id().to_string();
        self.log.lock().push(format!("load {}", self.video));
        self.manifest = Some(url);
        if let Some(levels) = self.answer.clone() {
            events.engine(EngineEvent::ManifestParsed(levels));
        }
        self.held.lock().push(events);
    }

    fn attach_media(&mut self, sink: Arc<dyn MediaSink>) {
        self.log.lock().push(format!("attach {}", self.video));
        if let Some(url) = &self.manifest {
            sink.set_source(url);
        }
    }

    fn set_current_level(&mut self, level: EngineLevel) {
        self.log.lock().push(format!("level {} {}", self.video, level.raw()));
        self.level = level;
    }

    fn current_level(&self) -> EngineLevel {
        self.level
    }

    fn destroy(&mut self) {
        if !self.destroyed {
            self.destroyed = true;
            self.log.lock().push(format!("destroy {}", self.video));
        }
    }
}

/// Orchestrator over the fakes with autoplay on and a headless sink attached.
pub fn orchestrator(
    catalog: &Arc<FakeCatalog>,
    engines: &Arc<FakeEngines>,
    sink: &HeadlessSink,
) -> SessionOrchestrator {
    let options = SessionOptions {
        autoplay: true,
        ..Default::default()
    };
    let mut orchestrator = SessionOrchestrator::new(catalog.clone(), engines.clone(), options)
        .with_settle(Duration::from_millis(50));
    orchestrator.attach_sink(Arc::new(sink.clone()));
    orchestrator
}
