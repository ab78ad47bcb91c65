//! Media sink seam.
//!
//! A sink is the surface that decodes and presents media. It is owned by the
//! view; a [`PlaybackSession`](super::PlaybackSession) binds to it for the
//! duration of one playback attempt and must remove its listener and clear
//! the source when it is disposed.

use std::sync::Arc;

use parking_lot::Mutex;
use url::Url;

use super::events::{SessionEvents, SinkEvent};

/// Handle for a registered sink listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(pub u64);

/// Errors a sink can return synchronously.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SinkError {
    #[error("no source loaded")]
    NoSource,
    #[error("{0}")]
    Media(String),
}

/// A renderable media surface.
///
/// Methods take `&self`; implementations hold their mutable state behind
/// interior mutability so one sink can be shared between the view and the
/// live session.
pub trait MediaSink: Send + Sync {
    /// Whether the sink can play an HLS manifest URL directly.
    fn can_play_native_hls(&self) -> bool;

    /// Point the sink at a media URL.
    fn set_source(&self, url: &Url);

    /// Drop the current source and stop presenting.
    fn clear_source(&self);

    /// Request playback. Completion is reported as [`SinkEvent::Playing`].
    fn play(&self) -> Result<(), SinkError>;

    /// Register for [`SinkEvent`]s.
    fn add_listener(&self, events: SessionEvents) -> ListenerId;

    /// Unregister a listener. Unknown ids are ignored.
    fn remove_listener(&self, id: ListenerId);
}

#[derive(Default)]
struct HeadlessState {
    source: Option<Url>,
    playing: bool,
    listeners: Vec<(ListenerId, SessionEvents)>,
    next_listener: u64,
}

/// Sink without a rendering surface.
///
/// Reports [`SinkEvent::CanPlay`] as soon as a source is set and
/// [`SinkEvent::Playing`] as soon as play is requested. Swapping the source
/// of a playing sink keeps it playing, the way a level switch behaves. Used
/// by the command line player and wherever no real surface exists.
#[derive(Clone, Default)]
pub struct HeadlessSink {
    native_hls: bool,
    state: Arc<Mutex<HeadlessState>>,
}

impl HeadlessSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// A headless sink that also claims native HLS support.
    pub fn with_native_hls() -> Self {
        Self {
            native_hls: true,
            ..Self::default()
        }
    }

    pub fn source(&self) -> Option<Url> {
        self.state.lock().source.clone()
    }

    pub fn is_playing(&self) -> bool {
        self.state.lock().playing
    }

    pub fn listener_count(&self) -> usize {
        self.state.lock().listeners.len()
    }

    fn notify(&self, event: SinkEvent) {
        let listeners: Vec<SessionEvents> = self
            .state
            .lock()
            .listeners
            .iter()
            .map(|(_, events)| events.clone())
            .collect();
        for events in listeners {
            events.sink(event.clone());
        }
    }
}

impl MediaSink for HeadlessSink {
    fn can_play_native_hls(&self) -> bool {
        self.native_hls
    }

    fn set_source(&self, url: &Url) {
        self.state.lock().source = Some(url.clone());
        tracing::debug!(source = %url, "Headless sink source set");
        self.notify(SinkEvent::CanPlay);
    }

    fn clear_source(&self) {
        let mut state = self.state.lock();
        state.source = None;
        state.playing = false;
    }

    fn play(&self) -> Result<(), SinkError> {
        {
            let mut state = self.state.lock();
            if state.source.is_none() {
                return Err(SinkError::NoSource);
            }
            state.playing = true;
        }
        self.notify(SinkEvent::Playing);
        Ok(())
    }

    fn add_listener(&self, events: SessionEvents) -> ListenerId {
        let mut state = self.state.lock();
        state.next_listener += 1;
        let id = ListenerId(state.next_listener);
        state.listeners.push((id, events));
        id
    }

    fn remove_listener(&self, id: ListenerId) {
        self.state.lock().listeners.retain(|(lid, _)| *lid != id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::player::events::{PlayerEvent, SessionToken};
    use tokio::sync::mpsc;
    use vodplay_common::VideoId;

    fn url() -> Url {
        Url::parse("http://localhost:8080/api/v1/videos/v1/720p/playlist.m3u8").unwrap()
    }

    #[test]
    fn test_play_without_source_fails() {
        let sink = HeadlessSink::new();
        assert_eq!(sink.play(), Err(SinkError::NoSource));
        assert!(!sink.is_playing());
    }

    #[test]
    fn test_listener_receives_can_play_and_playing() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let events = SessionEvents::new(SessionToken::new(1, VideoId::from("v1")), tx);
        let sink = HeadlessSink::new();
        sink.add_listener(events);

        sink.set_source(&url());
        sink.play().unwrap();

        assert_eq!(
            rx.try_recv().unwrap().event,
            PlayerEvent::Sink(SinkEvent::CanPlay)
        );
        assert_eq!(
            rx.try_recv().unwrap().event,
            PlayerEvent::Sink(SinkEvent::Playing)
        );
        assert!(sink.is_playing());
    }

    #[test]
    fn test_removed_listener_is_silent() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let events = SessionEvents::new(SessionToken::new(1, VideoId::from("v1")), tx);
        let sink = HeadlessSink::new();
        let id = sink.add_listener(events);

        sink.remove_listener(id);
        sink.set_source(&url());

        assert_eq!(sink.listener_count(), 0);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_clear_source_stops_playback() {
        let sink = HeadlessSink::with_native_hls();
        sink.set_source(&url());
        sink.play().unwrap();

        sink.clear_source();

        assert!(sink.source().is_none());
        assert!(!sink.is_playing());
        assert!(sink.can_play_native_hls());
    }
}
