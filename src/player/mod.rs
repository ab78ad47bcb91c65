//! Playback core: the session state machine and the seams it drives.

mod engine;
mod events;
mod session;
mod sink;

pub use engine::{select_auto_level, EngineFactory, HlsEngine, HlsEngineFactory, StreamingEngine};
pub use events::{EngineEvent, Envelope, PlayerEvent, SessionEvents, SessionToken, SinkEvent};
pub use session::{PlaybackPath, PlaybackSession, PlaybackStatus, SessionOptions};
pub use sink::{HeadlessSink, ListenerId, MediaSink, SinkError};
