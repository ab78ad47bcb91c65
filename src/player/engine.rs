//! Adaptive-bitrate engine seam and the reference HLS engine.
//!
//! An engine instance is scoped to one manifest URL and is exclusively owned
//! by the [`PlaybackSession`](super::PlaybackSession) that created it. It is
//! never reused: a new video means a new engine.

use std::sync::Arc;

use parking_lot::Mutex;
use reqwest::Client;
use tokio::task::JoinHandle;
use url::Url;
use vodplay_common::PlayerError;
use vodplay_hls::{parse_master, EngineLevel, ManifestLevel};

use super::events::{EngineEvent, SessionEvents};
use super::sink::MediaSink;

/// A manifest-driven adaptive streaming engine.
pub trait StreamingEngine: Send {
    /// Start fetching the manifest. Completion is reported through `events`
    /// as [`EngineEvent::ManifestParsed`] or [`EngineEvent::Error`].
    fn load_source(&mut self, url: Url, events: SessionEvents);

    /// Bind the engine to the sink it feeds.
    fn attach_media(&mut self, sink: Arc<dyn MediaSink>);

    /// Switch to a level, or back to automatic selection.
    fn set_current_level(&mut self, level: EngineLevel);

    /// The level last requested with [`StreamingEngine::set_current_level`].
    fn current_level(&self) -> EngineLevel;

    /// Release timers, sockets and the sink. Must be idempotent.
    fn destroy(&mut self);
}

/// Creates engines and reports whether the runtime supports them at all.
pub trait EngineFactory: Send + Sync {
    fn is_supported(&self) -> bool;

    fn create(&self) -> Box<dyn StreamingEngine>;
}

/// Pick the level automatic mode plays: the highest bandwidth at or below
/// the estimate, or the cheapest level when none fits.
pub fn select_auto_level(levels: &[ManifestLevel], estimate_bps: u64) -> usize {
    let bandwidth = |l: &&ManifestLevel| l.bandwidth.unwrap_or(0);
    levels
        .iter()
        .filter(|l| bandwidth(l) <= estimate_bps)
        .max_by_key(bandwidth)
        .or_else(|| levels.iter().min_by_key(bandwidth))
        .map_or(0, |l| l.index)
}

#[derive(Default)]
struct EngineShared {
    manifest_url: Option<Url>,
    levels: Vec<ManifestLevel>,
    requested: EngineLevel,
    active: Option<(usize, Url)>,
    sink: Option<Arc<dyn MediaSink>>,
}

impl EngineShared {
    /// Point the sink at the variant the current request resolves to.
    /// Called with the engine lock held so a concurrent destroy cannot
    /// interleave with the source change.
    fn route(&mut self, estimate_bps: u64) {
        let (Some(sink), Some(base)) = (self.sink.as_ref(), self.manifest_url.as_ref()) else {
            return;
        };
        if self.levels.is_empty() {
            return;
        }

        let index = match self.requested {
            EngineLevel::Index(i) if i < self.levels.len() => i,
            _ => select_auto_level(&self.levels, estimate_bps),
        };
        let uri = &self.levels[index].uri;
        let target = if uri.is_empty() {
            Ok(base.clone())
        } else {
            base.join(uri)
        };

        match target {
            Ok(url) => {
                if self.active.as_ref().map(|(_, u)| u) != Some(&url) {
                    tracing::debug!(level = index, variant = %url, "Switching variant");
                    sink.set_source(&url);
                    self.active = Some((index, url));
                }
            }
            Err(e) => tracing::warn!(level = index, uri = %uri, "Unresolvable variant URI: {}", e),
        }
    }
}

/// Reference HLS engine.
///
/// Fetches and parses the master manifest, then feeds the chosen variant's
/// media playlist URL to the attached sink. Segment download is the sink's
/// business.
pub struct HlsEngine {
    client: Client,
    bandwidth_estimate_bps: u64,
    shared: Arc<Mutex<EngineShared>>,
    task: Option<JoinHandle<()>>,
    destroyed: bool,
}

impl HlsEngine {
    pub fn new(client: Client, bandwidth_estimate_bps: u64) -> Self {
        Self {
            client,
            bandwidth_estimate_bps,
            shared: Arc::new(Mutex::new(EngineShared::default())),
            task: None,
            destroyed: false,
        }
    }

    /// Index of the variant currently fed to the sink.
    pub fn active_level(&self) -> Option<usize> {
        self.shared.lock().active.as_ref().map(|(i, _)| *i)
    }
}

async fn fetch_manifest(client: &Client, url: &Url) -> Result<Vec<ManifestLevel>, PlayerError> {
    let response = client
        .get(url.clone())
        .send()
        .await
        .map_err(|e| PlayerError::fetch_failed("manifest", e))?;

    let status = response.status();
    if !status.is_success() {
        return Err(PlayerError::fetch_failed("manifest", format!("HTTP {}", status)));
    }

    let text = response
        .text()
        .await
        .map_err(|e| PlayerError::fetch_failed("manifest", e))?;
    parse_master(&text)
}

impl StreamingEngine for HlsEngine {
    fn load_source(&mut self, url: Url, events: SessionEvents) {
        if self.destroyed {
            tracing::warn!(manifest = %url, "load_source on a destroyed engine ignored");
            return;
        }
        if let Some(previous) = self.task.take() {
            tracing::warn!("Engine already loading a manifest, replacing it");
            previous.abort();
        }

        self.shared.lock().manifest_url = Some(url.clone());

        let client = self.client.clone();
        let shared = Arc::clone(&self.shared);
        let estimate = self.bandwidth_estimate_bps;

        self.task = Some(tokio::spawn(async move {
            tracing::debug!(manifest = %url, session = %events.token(), "Fetching manifest");
            match fetch_manifest(&client, &url).await {
                Ok(levels) => {
                    {
                        let mut shared = shared.lock();
                        shared.levels = levels.clone();
                        shared.route(estimate);
                    }
                    events.engine(EngineEvent::ManifestParsed(levels));
                }
                Err(e) => {
                    tracing::warn!(manifest = %url, "Manifest load failed: {}", e);
                    events.engine(EngineEvent::Error(e));
                }
            }
        }));
    }

    fn attach_media(&mut self, sink: Arc<dyn MediaSink>) {
        let mut shared = self.shared.lock();
        shared.sink = Some(sink);
        shared.route(self.bandwidth_estimate_bps);
    }

    fn set_current_level(&mut self, level: EngineLevel) {
        let mut shared = self.shared.lock();
        shared.requested = level;
        shared.route(self.bandwidth_estimate_bps);
    }

    fn current_level(&self) -> EngineLevel {
        self.shared.lock().requested
    }

    fn destroy(&mut self) {
        if self.destroyed {
            return;
        }
        self.destroyed = true;

        if let Some(task) = self.task.take() {
            task.abort();
        }

        let mut shared = self.shared.lock();
        if let Some(sink) = shared.sink.take() {
            sink.clear_source();
        }
        shared.levels.clear();
        shared.active = None;
    }
}

impl Drop for HlsEngine {
    fn drop(&mut self) {
        self.destroy();
    }
}

/// Factory for [`HlsEngine`]s sharing one HTTP client.
#[derive(Clone)]
pub struct HlsEngineFactory {
    client: Client,
    bandwidth_estimate_bps: u64,
}

impl HlsEngineFactory {
    pub fn new(client: Client, bandwidth_estimate_bps: u64) -> Self {
        Self {
            client,
            bandwidth_estimate_bps,
        }
    }
}

impl EngineFactory for HlsEngineFactory {
    fn is_supported(&self) -> bool {
        true
    }

    fn create(&self) -> Box<dyn StreamingEngine> {
        Box::new(HlsEngine::new(self.client.clone(), self.bandwidth_estimate_bps))
    }
}
