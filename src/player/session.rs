//! One playback attempt for one video.
//!
//! A [`PlaybackSession`] binds a media sink, owns the engine it attaches to
//! that sink, and walks the state machine
//!
//! ```text
//! Idle -> Loading -> Ready -> Playing
//!            \-> Failed
//! (any) -> Disposed
//! ```
//!
//! Disposal is the single exit path for every resource the session holds.
//! It runs on identifier change, view teardown, explicit stop, and drop.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use url::Url;
use vodplay_common::{PlayerError, Result};
use vodplay_hls::{EngineLevel, QualityLadder, QualitySelection};

use super::engine::{EngineFactory, StreamingEngine};
use super::events::{EngineEvent, PlayerEvent, SessionEvents, SessionToken, SinkEvent};
use super::sink::{ListenerId, MediaSink};

/// Lifecycle state of a [`PlaybackSession`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackStatus {
    #[default]
    Idle,
    Loading,
    Ready,
    Playing,
    Failed,
    Disposed,
}

impl PlaybackStatus {
    /// Whether the session still counts as live.
    pub fn is_live(self) -> bool {
        self != Self::Disposed
    }
}

impl fmt::Display for PlaybackStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Idle => "idle",
            Self::Loading => "loading",
            Self::Ready => "ready",
            Self::Playing => "playing",
            Self::Failed => "failed",
            Self::Disposed => "disposed",
        };
        f.write_str(s)
    }
}

/// How the session feeds the sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackPath {
    /// An adaptive engine parses the manifest and drives the sink.
    Engine,
    /// The sink plays the manifest URL itself; no per-level control.
    Native,
}

/// Knobs a session reads when it starts.
#[derive(Debug, Clone, Default)]
pub struct SessionOptions {
    /// Issue a play request as soon as the session is ready.
    pub autoplay: bool,
    /// Use the sink's native path even when an engine is available.
    pub prefer_native: bool,
    /// Selection applied right after the ladder is derived.
    pub initial_quality: Option<String>,
}

/// The playback attempt for one video on one sink.
pub struct PlaybackSession {
    token: SessionToken,
    manifest_url: Url,
    sink: Arc<dyn MediaSink>,
    engine: Option<Box<dyn StreamingEngine>>,
    listener: Option<ListenerId>,
    path: Option<PlaybackPath>,
    status: PlaybackStatus,
    ladder: Option<QualityLadder>,
    selected: QualitySelection,
    options: SessionOptions,
}

impl PlaybackSession {
    pub fn new(
        token: SessionToken,
        manifest_url: Url,
        sink: Arc<dyn MediaSink>,
        options: SessionOptions,
    ) -> Self {
        Self {
            token,
            manifest_url,
            sink,
            engine: None,
            listener: None,
            path: None,
            status: PlaybackStatus::Idle,
            ladder: None,
            selected: QualitySelection::Auto,
            options,
        }
    }

    pub fn token(&self) -> &SessionToken {
        &self.token
    }

    pub fn status(&self) -> PlaybackStatus {
        self.status
    }

    pub fn path(&self) -> Option<PlaybackPath> {
        self.path
    }

    pub fn manifest_url(&self) -> &Url {
        &self.manifest_url
    }

    /// The ladder, once the manifest has been parsed on the engine path.
    pub fn ladder(&self) -> Option<&QualityLadder> {
        self.ladder.as_ref()
    }

    pub fn selected_quality(&self) -> QualitySelection {
        self.selected
    }

    pub fn has_engine(&self) -> bool {
        self.engine.is_some()
    }

    /// Idle -> Loading.
    ///
    /// Attaches a fresh engine to the sink and requests the manifest, or
    /// falls back to the sink's native path when the engine is unsupported.
    /// With neither available the session fails with
    /// [`PlayerError::UnsupportedPlayback`].
    pub fn start(&mut self, engines: &dyn EngineFactory, events: SessionEvents) -> Result<()> {
        if self.status != PlaybackStatus::Idle {
            tracing::warn!(session = %self.token, status = %self.status, "start ignored, session not idle");
            return Ok(());
        }

        let use_engine = engines.is_supported()
            && !(self.options.prefer_native && self.sink.can_play_native_hls());

        if use_engine {
            self.status = PlaybackStatus::Loading;
            self.path = Some(PlaybackPath::Engine);
            self.listener = Some(self.sink.add_listener(events.clone()));

            let mut engine = engines.create();
            engine.load_source(self.manifest_url.clone(), events);
            engine.attach_media(Arc::clone(&self.sink));
            self.engine = Some(engine);

            tracing::info!(session = %self.token, manifest = %self.manifest_url, "Engine attached, loading manifest");
            Ok(())
        } else if self.sink.can_play_native_hls() {
            self.status = PlaybackStatus::Loading;
            self.path = Some(PlaybackPath::Native);
            self.listener = Some(self.sink.add_listener(events));
            self.sink.set_source(&self.manifest_url);

            tracing::info!(session = %self.token, manifest = %self.manifest_url, "Native playback path");
            Ok(())
        } else {
            self.status = PlaybackStatus::Failed;
            tracing::warn!(session = %self.token, "No adaptive engine and no native HLS support");
            Err(PlayerError::UnsupportedPlayback)
        }
    }

    /// Apply an engine or sink event addressed to this session.
    ///
    /// Returns the error that failed the session, if this event did.
    pub fn handle_event(&mut self, event: &PlayerEvent) -> Result<()> {
        if self.status == PlaybackStatus::Disposed {
            tracing::debug!(session = %self.token, "Event for disposed session dropped");
            return Ok(());
        }

        match event {
            PlayerEvent::Engine(EngineEvent::ManifestParsed(levels)) => {
                if self.status != PlaybackStatus::Loading || self.path != Some(PlaybackPath::Engine) {
                    tracing::debug!(session = %self.token, status = %self.status, "Manifest parse outside loading ignored");
                    return Ok(());
                }
                if self.ladder.is_some() {
                    tracing::debug!(session = %self.token, "Ladder already derived, keeping it");
                } else {
                    self.ladder = Some(QualityLadder::derive_from(levels));
                }
                self.apply_initial_quality();
                self.status = PlaybackStatus::Ready;
                tracing::info!(session = %self.token, levels = levels.len(), "Manifest parsed");
                self.request_play();
                Ok(())
            }
            PlayerEvent::Engine(EngineEvent::Error(e)) => {
                if self.status == PlaybackStatus::Loading {
                    self.status = PlaybackStatus::Failed;
                    tracing::warn!(session = %self.token, "Session failed: {}", e);
                    Err(e.clone())
                } else {
                    tracing::warn!(session = %self.token, status = %self.status, "Engine error after load: {}", e);
                    Ok(())
                }
            }
            PlayerEvent::Sink(SinkEvent::CanPlay) => {
                if self.status == PlaybackStatus::Loading && self.path == Some(PlaybackPath::Native) {
                    self.status = PlaybackStatus::Ready;
                    self.request_play();
                }
                Ok(())
            }
            PlayerEvent::Sink(SinkEvent::Playing) => {
                if matches!(self.status, PlaybackStatus::Ready | PlaybackStatus::Playing) {
                    if self.status != PlaybackStatus::Playing {
                        tracing::info!(session = %self.token, "Playing");
                    }
                    self.status = PlaybackStatus::Playing;
                }
                Ok(())
            }
            PlayerEvent::Sink(SinkEvent::Error(msg)) => {
                if self.status == PlaybackStatus::Loading && self.path == Some(PlaybackPath::Native) {
                    self.status = PlaybackStatus::Failed;
                    tracing::warn!(session = %self.token, "Native playback failed: {}", msg);
                    Err(PlayerError::manifest(msg.clone()))
                } else {
                    tracing::warn!(session = %self.token, status = %self.status, "Media error: {}", msg);
                    Ok(())
                }
            }
            PlayerEvent::Metadata(_) | PlayerEvent::Deleted(_) => Ok(()),
        }
    }

    /// Switch the live engine to another level. Not a state transition.
    pub fn select_quality(&mut self, selection: QualitySelection) -> Result<EngineLevel> {
        let Some(engine) = self.engine.as_mut() else {
            return Err(PlayerError::NoEngine);
        };
        let Some(ladder) = self.ladder.as_ref() else {
            return Err(PlayerError::unknown_quality(selection.key()));
        };

        let level = ladder.resolve(selection)?;
        engine.set_current_level(level);
        self.selected = selection;
        tracing::info!(session = %self.token, quality = %selection, level = level.raw(), "Quality selected");
        Ok(level)
    }

    /// Release the engine and detach from the sink. Safe from any state and
    /// safe to call twice.
    pub fn dispose(&mut self) {
        if self.status == PlaybackStatus::Disposed {
            return;
        }

        if let Some(listener) = self.listener.take() {
            self.sink.remove_listener(listener);
        }
        if let Some(mut engine) = self.engine.take() {
            engine.destroy();
        }
        if self.path.is_some() {
            self.sink.clear_source();
        }

        tracing::debug!(session = %self.token, from = %self.status, "Session disposed");
        self.status = PlaybackStatus::Disposed;
    }

    fn apply_initial_quality(&mut self) {
        let Some(wanted) = self.options.initial_quality.clone() else {
            return;
        };
        let Some(ladder) = self.ladder.as_ref() else {
            return;
        };
        match ladder.selection_for(&wanted) {
            Ok(QualitySelection::Auto) => {}
            Ok(selection) => {
                if let Err(e) = self.select_quality(selection) {
                    tracing::warn!(session = %self.token, "Initial quality not applied: {}", e);
                }
            }
            Err(e) => {
                tracing::warn!(session = %self.token, quality = %wanted, "Initial quality not in ladder: {}", e)
            }
        }
    }

    fn request_play(&mut self) {
        if !self.options.autoplay {
            return;
        }
        // A refused play is not a session failure; the view can retry it.
        if let Err(e) = self.sink.play() {
            tracing::warn!(session = %self.token, "Play request refused: {}", e);
        }
    }
}

impl Drop for PlaybackSession {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl fmt::Debug for PlaybackSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlaybackSession")
            .field("token", &self.token)
            .field("status", &self.status)
            .field("path", &self.path)
            .field("has_engine", &self.engine.is_some())
            .field("selected", &self.selected)
            .finish()
    }
}
