//! Event plumbing between asynchronous work and the orchestrator.
//!
//! Every completion (metadata, manifest, sink, delete) is delivered as an
//! [`Envelope`] carrying the [`SessionToken`] of the activation that started
//! the work. The orchestrator compares that token with its current one and
//! drops anything older, so a slow response can never touch the state of a
//! session that has since been disposed.

use std::fmt;

use tokio::sync::mpsc;
use vodplay_common::{PlayerError, VideoId, VideoRecord};
use vodplay_hls::ManifestLevel;

/// Identifies one activation of the orchestrator for one video.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionToken {
    generation: u64,
    video_id: VideoId,
}

impl SessionToken {
    pub fn new(generation: u64, video_id: VideoId) -> Self {
        Self {
            generation,
            video_id,
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn video_id(&self) -> &VideoId {
        &self.video_id
    }
}

impl fmt::Display for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.video_id, self.generation)
    }
}

/// Notifications raised by an adaptive engine.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    /// The manifest was fetched and parsed; levels are in manifest order.
    ManifestParsed(Vec<ManifestLevel>),
    /// Fetching or parsing the manifest failed.
    Error(PlayerError),
}

/// Notifications raised by a media sink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SinkEvent {
    /// Enough media is available to start playback.
    CanPlay,
    /// Playback has begun.
    Playing,
    /// The sink could not load or decode its source.
    Error(String),
}

/// Anything that can complete while the orchestrator is waiting.
#[derive(Debug, Clone, PartialEq)]
pub enum PlayerEvent {
    Metadata(Result<VideoRecord, PlayerError>),
    Engine(EngineEvent),
    Sink(SinkEvent),
    Deleted(Result<(), PlayerError>),
}

/// A tagged event as it travels through the channel.
#[derive(Debug, Clone)]
pub struct Envelope {
    pub token: SessionToken,
    pub event: PlayerEvent,
}

/// Cloneable sender bound to one [`SessionToken`].
///
/// Engines and sinks receive one of these instead of a raw channel, so they
/// cannot forget to tag what they emit.
#[derive(Debug, Clone)]
pub struct SessionEvents {
    token: SessionToken,
    tx: mpsc::UnboundedSender<Envelope>,
}

impl SessionEvents {
    pub fn new(token: SessionToken, tx: mpsc::UnboundedSender<Envelope>) -> Self {
        Self { token, tx }
    }

    pub fn token(&self) -> &SessionToken {
        &self.token
    }

    /// Send an event. Returns `false` once the receiving side is gone.
    pub fn emit(&self, event: PlayerEvent) -> bool {
        self.tx
            .send(Envelope {
                token: self.token.clone(),
                event,
            })
            .is_ok()
    }

    pub fn engine(&self, event: EngineEvent) -> bool {
        self.emit(PlayerEvent::Engine(event))
    }

    pub fn sink(&self, event: SinkEvent) -> bool {
        self.emit(PlayerEvent::Sink(event))
    }
}
