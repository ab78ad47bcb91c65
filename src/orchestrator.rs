//! Top-level playback state machine used by a view.
//!
//! The orchestrator sequences metadata resolution and the playback session
//! for the identifier the view currently shows. It owns the single event
//! channel every asynchronous completion arrives on and the generation
//! counter that keys the stale-response guard: any path that disposes a
//! session or abandons outstanding work bumps the generation, after which
//! envelopes tagged with an older token are dropped unapplied.
//!
//! A delete request is keyed separately by its ticket. Rebinding the sink or
//! stopping playback does not abandon it; only a change of identifier does.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::time::Instant;
use vodplay_common::{PlayerError, Result, VideoId, VideoRecord};
use vodplay_hls::{EngineLevel, QualityLevel, QualitySelection};

use crate::catalog::{MetadataGate, VideoCatalog};
use crate::player::{
    EngineFactory, Envelope, MediaSink, PlaybackSession, PlaybackStatus, PlayerEvent,
    SessionEvents, SessionOptions, SessionToken,
};

/// Quiet period after which [`SessionOrchestrator::run_until_settled`] returns.
pub const DEFAULT_SETTLE: Duration = Duration::from_millis(200);

/// Where the view should be.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Route {
    #[default]
    Player,
    /// Back to the catalog, after the shown video was deleted.
    Catalog,
}

/// Snapshot of everything a view renders.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ViewState {
    pub video_id: Option<VideoId>,
    pub record: Option<VideoRecord>,
    pub playback_status: PlaybackStatus,
    pub quality_levels: Vec<QualityLevel>,
    pub selected_quality: QualitySelection,
    pub error: Option<PlayerError>,
    /// Metadata resolution is outstanding.
    pub loading: bool,
    /// A delete request is outstanding.
    pub deleting: bool,
    pub route: Route,
}

impl ViewState {
    /// The error slot as display text.
    pub fn error_message(&self) -> Option<String> {
        self.error.as_ref().map(ToString::to_string)
    }
}

pub struct SessionOrchestrator {
    catalog: Arc<dyn VideoCatalog>,
    gate: MetadataGate,
    engines: Arc<dyn EngineFactory>,
    options: SessionOptions,
    settle: Duration,

    sink: Option<Arc<dyn MediaSink>>,
    generation: u64,
    token: Option<SessionToken>,
    record: Option<VideoRecord>,
    session: Option<PlaybackSession>,
    error: Option<PlayerError>,
    loading: bool,
    /// Generation the outstanding delete was issued under.
    delete_ticket: Option<u64>,
    route: Route,

    tx: mpsc::UnboundedSender<Envelope>,
    rx: mpsc::UnboundedReceiver<Envelope>,
    state: watch::Sender<ViewState>,
}

impl SessionOrchestrator {
    pub fn new(
        catalog: Arc<dyn VideoCatalog>,
        engines: Arc<dyn EngineFactory>,
        options: SessionOptions,
    ) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let (state, _) = watch::channel(ViewState::default());

        Self {
            gate: MetadataGate::new(Arc::clone(&catalog)),
            catalog,
            engines,
            options,
            settle: DEFAULT_SETTLE,
            sink: None,
            generation: 0,
            token: None,
            record: None,
            session: None,
            error: None,
            loading: false,
            delete_ticket: None,
            route: Route::Player,
            tx,
            rx,
            state,
        }
    }

    /// Override the quiet period used by [`Self::run_until_settled`].
    pub fn with_settle(mut self, settle: Duration) -> Self {
        self.settle = settle;
        self
    }

    /// Current view snapshot.
    pub fn view(&self) -> ViewState {
        self.state.borrow().clone()
    }

    /// Watch view snapshots as they are published.
    pub fn subscribe(&self) -> watch::Receiver<ViewState> {
        self.state.subscribe()
    }

    /// Generation of the live activation.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// The current session, which may already be disposed.
    pub fn session(&self) -> Option<&PlaybackSession> {
        self.session.as_ref()
    }

    /// Bind the view's media sink. A session already bound to another sink is
    /// disposed and rebuilt on the new one.
    pub fn attach_sink(&mut self, sink: Arc<dyn MediaSink>) {
        if self.has_live_session() {
            self.dispose_session();
            self.advance_generation();
        }
        self.sink = Some(sink);
        tracing::debug!(generation = self.generation, "Sink attached");

        self.maybe_start_session();
        self.publish();
    }

    /// View teardown: dispose the session and release the sink.
    pub fn detach_sink(&mut self) {
        if self.session.is_some() {
            self.dispose_session();
            self.advance_generation();
        }
        if self.sink.take().is_some() {
            tracing::debug!(generation = self.generation, "Sink detached");
        }
        self.publish();
    }

    /// Show another video.
    ///
    /// The live session is disposed before anything else happens, then the
    /// new identifier is resolved. Its session starts only once metadata has
    /// arrived. Navigating to the identifier already shown is a no-op; use
    /// [`Self::retry`] to re-enter.
    pub fn navigate(&mut self, id: impl Into<VideoId>) {
        let id = id.into();
        if self.token.as_ref().map(SessionToken::video_id) == Some(&id) {
            tracing::debug!(video_id = %id, "Already showing video");
            return;
        }
        self.activate(id);
    }

    /// Re-enter metadata resolution for the current identifier. Used after a
    /// failure; there is no automatic retry.
    pub fn retry(&mut self) {
        let Some(id) = self.token.as_ref().map(|t| t.video_id().clone()) else {
            tracing::debug!("Nothing to retry");
            return;
        };
        tracing::info!(video_id = %id, "Retrying");
        self.activate(id);
    }

    /// Explicit stop. Outstanding metadata or manifest work is abandoned.
    pub fn stop(&mut self) {
        self.dispose_session();
        self.advance_generation();
        self.loading = false;
        self.publish();
    }

    /// Stop and release the sink; the view is going away.
    pub fn shutdown(&mut self) {
        self.dispose_session();
        self.advance_generation();
        self.sink = None;
        self.loading = false;
        self.delete_ticket = None;
        self.rx.close();
        self.publish();
        tracing::debug!("Orchestrator shut down");
    }

    /// Switch the live engine's quality level without restarting playback.
    ///
    /// Failure is reported to the caller and does not touch the error slot
    /// or the session state.
    pub fn select_quality(&mut self, selection: QualitySelection) -> Result<EngineLevel> {
        let result = match self.session.as_mut().filter(|s| s.status().is_live()) {
            Some(session) => session.select_quality(selection),
            None => Err(PlayerError::NoEngine),
        };
        match &result {
            Ok(_) => self.publish(),
            Err(e) => tracing::warn!(quality = %selection, "Quality selection rejected: {}", e),
        }
        result
    }

    /// Like [`Self::select_quality`], taking menu or command line input such
    /// as `auto`, `level-1` or `720p`.
    pub fn select_quality_named(&mut self, input: &str) -> Result<EngineLevel> {
        let selection = match self.session.as_ref().and_then(PlaybackSession::ladder) {
            Some(ladder) => ladder.selection_for(input)?,
            None => input.parse()?,
        };
        self.select_quality(selection)
    }

    /// Delete the shown video once the user has confirmed.
    ///
    /// Returns whether a request was issued. The result arrives as an event:
    /// success disposes the session and routes back to the catalog, failure
    /// fills the error slot and leaves playback alone.
    pub fn request_delete(&mut self, confirmed: bool) -> bool {
        if !confirmed {
            tracing::debug!("Delete not confirmed");
            return false;
        }
        let Some(token) = self.token.clone() else {
            return false;
        };
        if self.delete_ticket.is_some() {
            tracing::debug!(video_id = %token.video_id(), "Delete already in flight");
            return false;
        }

        self.delete_ticket = Some(token.generation());
        self.publish();

        let catalog = Arc::clone(&self.catalog);
        let events = SessionEvents::new(token, self.tx.clone());
        tokio::spawn(async move {
            let result = catalog.delete_video(events.token().video_id()).await;
            if !events.emit(PlayerEvent::Deleted(result)) {
                tracing::debug!(session = %events.token(), "Delete result had no receiver");
            }
        });
        true
    }

    /// Wait for one event and apply it. Returns `false` for a stale event or
    /// a closed channel.
    pub async fn pump(&mut self) -> bool {
        match self.rx.recv().await {
            Some(envelope) => self.apply(envelope),
            None => false,
        }
    }

    /// Pump events until `done` holds for the view or `timeout` elapses.
    pub async fn pump_until<F>(&mut self, timeout: Duration, done: F) -> bool
    where
        F: Fn(&ViewState) -> bool,
    {
        let deadline = Instant::now() + timeout;
        loop {
            if done(&*self.state.borrow()) {
                return true;
            }
            match tokio::time::timeout_at(deadline, self.rx.recv()).await {
                Ok(Some(envelope)) => {
                    self.apply(envelope);
                }
                Ok(None) | Err(_) => return done(&*self.state.borrow()),
            }
        }
    }

    /// Apply events until none arrive for the settle period.
    pub async fn run_until_settled(&mut self) {
        while let Ok(Some(envelope)) = tokio::time::timeout(self.settle, self.rx.recv()).await {
            self.apply(envelope);
        }
    }

    fn activate(&mut self, id: VideoId) {
        self.dispose_session();
        self.session = None;
        self.advance_generation();

        let token = SessionToken::new(self.generation, id);
        self.token = Some(token.clone());
        self.record = None;
        self.error = None;
        self.loading = true;
        self.delete_ticket = None;
        self.route = Route::Player;
        tracing::info!(video_id = %token.video_id(), generation = token.generation(), "Resolving video");

        let gate = self.gate.clone();
        let events = SessionEvents::new(token, self.tx.clone());
        tokio::spawn(async move {
            let result = gate.resolve(events.token().video_id()).await;
            if !events.emit(PlayerEvent::Metadata(result)) {
                tracing::debug!(session = %events.token(), "Metadata result had no receiver");
            }
        });

        self.publish();
    }

    fn apply(&mut self, envelope: Envelope) -> bool {
        let current = match &envelope.event {
            PlayerEvent::Deleted(_) => self.delete_ticket == Some(envelope.token.generation()),
            _ => envelope.token.generation() == self.generation,
        };
        if !current {
            tracing::debug!(
                stale = %envelope.token,
                generation = self.generation,
                "Dropping stale event"
            );
            return false;
        }

        match envelope.event {
            PlayerEvent::Metadata(result) => self.on_metadata(result),
            PlayerEvent::Deleted(result) => self.on_deleted(result),
            event => {
                if let Some(session) = self.session.as_mut() {
                    if let Err(e) = session.handle_event(&event) {
                        self.error = Some(e);
                    }
                }
            }
        }

        self.publish();
        true
    }

    fn on_metadata(&mut self, result: Result<VideoRecord>) {
        self.loading = false;
        match result {
            Ok(record) => {
                tracing::debug!(video_id = %record.id, title = %record.display_title(), "Metadata resolved");
                self.record = Some(record);
                self.maybe_start_session();
            }
            Err(e) => {
                tracing::warn!(generation = self.generation, "Metadata resolution failed: {}", e);
                self.error = Some(e);
            }
        }
    }

    fn on_deleted(&mut self, result: Result<()>) {
        self.delete_ticket = None;
        match result {
            Ok(()) => {
                tracing::info!(generation = self.generation, "Video deleted, leaving player");
                self.dispose_session();
                self.advance_generation();
                self.token = None;
                self.record = None;
                self.error = None;
                self.route = Route::Catalog;
            }
            Err(e) => {
                tracing::warn!(generation = self.generation, "Delete failed: {}", e);
                self.error = Some(e);
            }
        }
    }

    /// Start a session when metadata is in, a sink is bound, and no live
    /// session exists for this activation.
    fn maybe_start_session(&mut self) {
        if self.record.is_none() || self.has_live_session() {
            return;
        }
        let (Some(sink), Some(token)) = (self.sink.clone(), self.token.clone()) else {
            return;
        };

        let manifest_url = match self.catalog.manifest_url(token.video_id()) {
            Ok(url) => url,
            Err(e) => {
                self.error = Some(e);
                return;
            }
        };

        let mut session =
            PlaybackSession::new(token.clone(), manifest_url, sink, self.options.clone());
        let events = SessionEvents::new(token, self.tx.clone());
        if let Err(e) = session.start(self.engines.as_ref(), events) {
            self.error = Some(e);
        }
        self.session = Some(session);
    }

    fn has_live_session(&self) -> bool {
        self.session.as_ref().is_some_and(|s| s.status().is_live())
    }

    fn dispose_session(&mut self) {
        if let Some(session) = self.session.as_mut() {
            session.dispose();
        }
    }

    /// Invalidate every outstanding completion and rebind the token.
    fn advance_generation(&mut self) {
        self.generation += 1;
        if let Some(token) = self.token.as_mut() {
            *token = SessionToken::new(self.generation, token.video_id().clone());
        }
    }

    fn publish(&self) {
        let (playback_status, quality_levels, selected_quality) = match self.session.as_ref() {
            Some(session) => (
                session.status(),
                session
                    .ladder()
                    .map(|l| l.levels().to_vec())
                    .unwrap_or_default(),
                session.selected_quality(),
            ),
            None => (PlaybackStatus::Idle, Vec::new(), QualitySelection::Auto),
        };

        self.state.send_replace(ViewState {
            video_id: self.token.as_ref().map(|t| t.video_id().clone()),
            record: self.record.clone(),
            playback_status,
            quality_levels,
            selected_quality,
            error: self.error.clone(),
            loading: self.loading,
            deleting: self.delete_ticket.is_some(),
            route: self.route,
        });
    }
}

impl Drop for SessionOrchestrator {
    fn drop(&mut self) {
        self.dispose_session();
    }
}
