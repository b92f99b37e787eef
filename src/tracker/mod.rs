//! Session tracker - maps each "now playing" song to a server analytics
//! session.
//!
//! - `api`: transport seam and the production `reqwest` client
//!
//! The tracker guarantees at most one active session. The only sequenced
//! call is [`SessionTracker::track_play_start`], which must end the prior
//! session before starting the next one; every other call is
//! fire-and-forget. Failures are logged and never reach the playback path.

pub mod api;

use std::sync::Arc;
use std::sync::Mutex as SyncMutex;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use crate::model::PlayContext;
use api::{
    CompleteRequest, EndReason, EndRequest, EventRequest, SessionApi, SessionEventType,
    StartRequest,
};

/// The server-side session currently open for the listener.
struct ActiveSession {
    id: String,
    sha_id: String,
    started_at: DateTime<Utc>,
}

pub struct SessionTracker<A: SessionApi> {
    api: Arc<A>,
    /// Holding this lock across the end-then-start sequence serializes rapid
    /// successive play starts, so two sessions never appear concurrently
    /// server-side.
    session: Arc<Mutex<Option<ActiveSession>>>,
    /// Directly-mutated mirror of the active session id, readable from the
    /// synchronous close path without touching the async state layer.
    session_mirror: Arc<SyncMutex<Option<String>>>,
    /// Last position reported by the audio element, for ending a superseded
    /// session at a meaningful offset.
    last_position_ms: Arc<AtomicU64>,
}

impl<A: SessionApi> Clone for SessionTracker<A> {
    fn clone(&self) -> Self {
        Self {
            api: self.api.clone(),
            session: self.session.clone(),
            session_mirror: self.session_mirror.clone(),
            last_position_ms: self.last_position_ms.clone(),
        }
    }
}

impl<A: SessionApi> SessionTracker<A> {
    pub fn new(api: A) -> Self {
        Self {
            api: Arc::new(api),
            session: Arc::new(Mutex::new(None)),
            session_mirror: Arc::new(SyncMutex::new(None)),
            last_position_ms: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Record the latest playback position. Called on every time tick.
    pub fn note_position(&self, position_ms: u64) {
        self.last_position_ms.store(position_ms, Ordering::Relaxed);
    }

    /// Currently active session id, if any.
    pub async fn active_session_id(&self) -> Option<String> {
        self.session.lock().await.as_ref().map(|s| s.id.clone())
    }

    /// Open a session for a song that just started playing.
    ///
    /// If a session is already active, its end request is awaited before the
    /// new start request is issued. On start failure no session is recorded;
    /// playback proceeds untracked.
    pub async fn track_play_start(
        &self,
        sha_id: &str,
        context: Option<&PlayContext>,
        position_ms: u64,
    ) {
        let mut session = self.session.lock().await;

        if let Some(prev) = session.take() {
            self.set_mirror(None);
            let final_position_ms = self.last_position_ms.load(Ordering::Relaxed);
            let req = EndRequest {
                session_id: prev.id.clone(),
                final_position_ms,
                reason: EndReason::NextSong,
            };
            match self.api.end(req).await {
                Ok(()) => tracing::debug!(
                    session_id = %prev.id,
                    sha_id = %prev.sha_id,
                    "Ended superseded session"
                ),
                Err(e) => tracing::warn!(
                    session_id = %prev.id,
                    error = %e,
                    "Failed to end superseded session"
                ),
            }
        }

        let req = StartRequest {
            sha_id: sha_id.to_string(),
            context_type: context.map(|c| c.kind.as_str().to_string()),
            context_id: context.map(|c| c.id.clone()),
            position_ms,
        };

        match self.api.start(req).await {
            Ok(response) => {
                tracing::info!(
                    session_id = %response.session_id,
                    sha_id = %sha_id,
                    "Session started"
                );
                self.set_mirror(Some(response.session_id.clone()));
                *session = Some(ActiveSession {
                    id: response.session_id,
                    sha_id: sha_id.to_string(),
                    started_at: Utc::now(),
                });
            }
            Err(e) => {
                tracing::warn!(sha_id = %sha_id, error = %e, "Failed to start session");
            }
        }
    }

    pub async fn track_pause(&self, position_ms: u64) {
        self.track_event(SessionEventType::Pause, position_ms).await;
    }

    pub async fn track_resume(&self, position_ms: u64) {
        self.track_event(SessionEventType::Resume, position_ms).await;
    }

    pub async fn track_seek(&self, position_ms: u64) {
        self.track_event(SessionEventType::Seek, position_ms).await;
    }

    async fn track_event(&self, event_type: SessionEventType, position_ms: u64) {
        self.note_position(position_ms);

        let Some(session_id) = self.active_session_id().await else {
            tracing::debug!(?event_type, "No active session, dropping event");
            return;
        };

        let req = EventRequest {
            session_id: session_id.clone(),
            event_type,
            position_ms,
        };
        if let Err(e) = self.api.event(req).await {
            tracing::warn!(session_id = %session_id, ?event_type, error = %e, "Failed to post session event");
        }
    }

    /// The track played to its natural end. Distinct from
    /// [`track_song_end`](Self::track_song_end): "completed" and "ended
    /// early" are different analytics facts.
    pub async fn track_song_complete(&self, position_ms: u64) {
        let Some(prev) = self.session.lock().await.take() else {
            return;
        };
        self.set_mirror(None);

        let listened = Utc::now() - prev.started_at;
        tracing::info!(
            session_id = %prev.id,
            sha_id = %prev.sha_id,
            listened_secs = listened.num_seconds(),
            "Session completed"
        );

        let req = CompleteRequest {
            session_id: prev.id.clone(),
            final_position_ms: position_ms,
        };
        if let Err(e) = self.api.complete(req).await {
            tracing::warn!(session_id = %prev.id, error = %e, "Failed to post session completion");
        }
    }

    /// The session ended before natural completion.
    pub async fn track_song_end(&self, position_ms: u64, reason: EndReason) {
        let Some(prev) = self.session.lock().await.take() else {
            return;
        };
        self.set_mirror(None);

        tracing::info!(session_id = %prev.id, ?reason, "Session ended");

        let req = EndRequest {
            session_id: prev.id.clone(),
            final_position_ms: position_ms,
            reason,
        };
        if let Err(e) = self.api.end(req).await {
            tracing::warn!(session_id = %prev.id, error = %e, "Failed to post session end");
        }
    }

    /// Best-effort flush for the page-close path.
    ///
    /// Synchronous: reads the session-id mirror directly and fires a
    /// detached end request without blocking teardown. The exact playback
    /// position is not synchronously available here, so it is reported as 0;
    /// a known approximation, kept deliberately.
    pub fn flush_on_close(&self) {
        let Some(session_id) = self.take_mirror() else {
            return;
        };

        tracing::info!(session_id = %session_id, "Flushing session on close");

        let req = EndRequest {
            session_id,
            final_position_ms: 0,
            reason: EndReason::PageClose,
        };

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                let api = self.api.clone();
                let session = self.session.clone();
                handle.spawn(async move {
                    if let Ok(mut guard) = session.try_lock() {
                        guard.take();
                    }
                    if let Err(e) = api.end(req).await {
                        tracing::warn!(error = %e, "Close-flush end request failed");
                    }
                });
            }
            Err(_) => {
                tracing::warn!("No async runtime available for close flush");
            }
        }
    }

    fn set_mirror(&self, id: Option<String>) {
        if let Ok(mut mirror) = self.session_mirror.lock() {
            *mirror = id;
        }
    }

    fn take_mirror(&self) -> Option<String> {
        self.session_mirror.lock().ok().and_then(|mut m| m.take())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::PlayContextKind;
    use api::{StartResponse, TrackerError};
    use std::future::Future;
    use std::sync::atomic::AtomicUsize;

    /// Recorded transport call, in arrival order.
    #[derive(Debug, Clone, PartialEq)]
    enum Call {
        Start(StartRequest),
        Event(EventRequest),
        Complete(CompleteRequest),
        End(EndRequest),
    }

    #[derive(Default)]
    struct RecordingApi {
        calls: SyncMutex<Vec<Call>>,
        start_counter: AtomicUsize,
        fail_start: bool,
    }

    impl RecordingApi {
        fn new() -> Self {
            Self::default()
        }

        fn failing_start() -> Self {
            Self {
                fail_start: true,
                ..Self::default()
            }
        }

        fn calls(&self) -> Vec<Call> {
            self.calls.lock().unwrap().clone()
        }

        fn record(&self, call: Call) {
            self.calls.lock().unwrap().push(call);
        }
    }

    impl SessionApi for Arc<RecordingApi> {
        fn start(
            &self,
            req: StartRequest,
        ) -> impl Future<Output = Result<StartResponse, TrackerError>> + Send {
            async move {
                self.record(Call::Start(req));
                if self.fail_start {
                    return Err(TrackerError::Network("connection refused".to_string()));
                }
                let n = self.start_counter.fetch_add(1, Ordering::SeqCst) + 1;
                Ok(StartResponse {
                    session_id: format!("session-{n}"),
                })
            }
        }

        fn event(&self, req: EventRequest) -> impl Future<Output = Result<(), TrackerError>> + Send {
            async move {
                self.record(Call::Event(req));
                Ok(())
            }
        }

        fn complete(
            &self,
            req: CompleteRequest,
        ) -> impl Future<Output = Result<(), TrackerError>> + Send {
            async move {
                self.record(Call::Complete(req));
                Ok(())
            }
        }

        fn end(&self, req: EndRequest) -> impl Future<Output = Result<(), TrackerError>> + Send {
            async move {
                self.record(Call::End(req));
                Ok(())
            }
        }
    }

    fn tracker_with_api() -> (SessionTracker<Arc<RecordingApi>>, Arc<RecordingApi>) {
        let api = Arc::new(RecordingApi::new());
        (SessionTracker::new(api.clone()), api)
    }

    #[tokio::test]
    async fn play_start_stores_server_session_id() {
        let (tracker, api) = tracker_with_api();

        tracker.track_play_start("sha-a", None, 0).await;

        assert_eq!(tracker.active_session_id().await.as_deref(), Some("session-1"));
        assert_eq!(api.calls().len(), 1);
    }

    #[tokio::test]
    async fn play_start_ends_prior_session_before_starting_new_one() {
        let (tracker, api) = tracker_with_api();

        tracker.track_play_start("sha-a", None, 0).await;
        tracker.note_position(42_000);
        tracker.track_play_start("sha-b", None, 0).await;

        let calls = api.calls();
        assert_eq!(calls.len(), 3);
        assert!(matches!(calls[0], Call::Start(_)));
        match &calls[1] {
            Call::End(req) => {
                assert_eq!(req.session_id, "session-1");
                assert_eq!(req.reason, EndReason::NextSong);
                assert_eq!(req.final_position_ms, 42_000);
            }
            other => panic!("expected end before second start, got {other:?}"),
        }
        assert!(matches!(calls[2], Call::Start(_)));

        // The new server id wins, never the prior one.
        assert_eq!(tracker.active_session_id().await.as_deref(), Some("session-2"));
    }

    #[tokio::test]
    async fn play_start_attaches_context_attribution() {
        let (tracker, api) = tracker_with_api();
        let context = PlayContext::new(PlayContextKind::Playlist, "pl-9").with_name("Focus");

        tracker.track_play_start("sha-a", Some(&context), 1500).await;

        match &api.calls()[0] {
            Call::Start(req) => {
                assert_eq!(req.context_type.as_deref(), Some("playlist"));
                assert_eq!(req.context_id.as_deref(), Some("pl-9"));
                assert_eq!(req.position_ms, 1500);
            }
            other => panic!("expected start, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn failed_start_leaves_no_active_session() {
        let api = Arc::new(RecordingApi::failing_start());
        let tracker = SessionTracker::new(api.clone());

        tracker.track_play_start("sha-a", None, 0).await;

        assert_eq!(tracker.active_session_id().await, None);
        // Pause without a session is a silent no-op.
        tracker.track_pause(10).await;
        assert_eq!(api.calls().len(), 1);
    }

    #[tokio::test]
    async fn lifecycle_events_carry_the_session_id() {
        let (tracker, api) = tracker_with_api();

        tracker.track_play_start("sha-a", None, 0).await;
        tracker.track_pause(5_000).await;
        tracker.track_resume(5_000).await;
        tracker.track_seek(60_000).await;

        let calls = api.calls();
        assert_eq!(calls.len(), 4);
        for call in &calls[1..] {
            match call {
                Call::Event(req) => assert_eq!(req.session_id, "session-1"),
                other => panic!("expected event, got {other:?}"),
            }
        }
    }

    #[tokio::test]
    async fn complete_clears_the_session() {
        let (tracker, api) = tracker_with_api();

        tracker.track_play_start("sha-a", None, 0).await;
        tracker.track_song_complete(215_000).await;

        assert_eq!(tracker.active_session_id().await, None);
        match api.calls().last().unwrap() {
            Call::Complete(req) => {
                assert_eq!(req.session_id, "session-1");
                assert_eq!(req.final_position_ms, 215_000);
            }
            other => panic!("expected complete, got {other:?}"),
        }

        // Further lifecycle events are dropped.
        tracker.track_seek(0).await;
        assert_eq!(api.calls().len(), 2);
    }

    #[tokio::test]
    async fn explicit_end_posts_reason_and_clears() {
        let (tracker, api) = tracker_with_api();

        tracker.track_play_start("sha-a", None, 0).await;
        tracker.track_song_end(12_000, EndReason::UserSkip).await;

        assert_eq!(tracker.active_session_id().await, None);
        match api.calls().last().unwrap() {
            Call::End(req) => {
                assert_eq!(req.reason, EndReason::UserSkip);
                assert_eq!(req.final_position_ms, 12_000);
            }
            other => panic!("expected end, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn close_flush_sends_page_close_beacon_from_mirror() {
        let (tracker, api) = tracker_with_api();

        tracker.track_play_start("sha-a", None, 0).await;
        tracker.note_position(90_000);

        tracker.flush_on_close();
        // The flush is detached; give the spawned request a chance to land.
        tokio::task::yield_now().await;

        let calls = api.calls();
        match calls.last().unwrap() {
            Call::End(req) => {
                assert_eq!(req.session_id, "session-1");
                assert_eq!(req.reason, EndReason::PageClose);
                // Position is not synchronously available at close time.
                assert_eq!(req.final_position_ms, 0);
            }
            other => panic!("expected end, got {other:?}"),
        }

        // Mirror is drained; a second flush is a no-op.
        tracker.flush_on_close();
        tokio::task::yield_now().await;
        assert_eq!(api.calls().len(), calls.len());
    }

    #[tokio::test]
    async fn close_flush_without_session_is_a_noop() {
        let (tracker, api) = tracker_with_api();
        tracker.flush_on_close();
        tokio::task::yield_now().await;
        assert!(api.calls().is_empty());
    }
}
