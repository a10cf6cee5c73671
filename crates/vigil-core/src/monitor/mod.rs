//! Focus Monitor - runtime that drives one focus session
//!
//! A session runs as a single tokio task that polls three futures:
//! - the frame loop: camera frame -> landmarks -> classifier -> alerts
//! - the timer loop: one countdown tick per period
//! - the end request from [`FocusMonitor::end`]
//!
//! Whichever resolves first decides the [`EndReason`]. The other futures are
//! dropped with the `select!`, and the task then runs the one teardown path:
//! release the camera, reset the classifier and alert arming, and clear the
//! attention state.

use crate::alert::{AlertDispatcher, AudioOutput};
use crate::camera::{CameraManager, VideoStream};
use crate::classifier::{AlertKind, AttentionState, EyeStateClassifier};
use crate::config::{MonitorConfig, SessionConfig};
use crate::error::MonitorError;
use crate::landmarks::{FrameSample, LandmarkProvider};
use crate::session::{Session, SessionController, TickOutcome};
use crate::status::StatusReporter;
use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use uuid::Uuid;

#[cfg(test)]
mod tests;

/// Notice shown when camera access is refused
pub const PERMISSION_NOTICE: &str = "Camera permission required";
/// Notice shown when the camera stream dies mid-session
pub const CAMERA_LOST_NOTICE: &str = "Camera disconnected";

/// State shared between the session task and readers.
///
/// Each entity has its own lock. Guards are never held across an await.
pub struct MonitorState {
    attention: RwLock<AttentionState>,
    session: Mutex<SessionController>,
    notice: RwLock<Option<String>>,
}

impl MonitorState {
    #[must_use]
    pub fn new(config: &SessionConfig) -> Self {
        Self {
            attention: RwLock::new(AttentionState::Unknown),
            session: Mutex::new(SessionController::new(config)),
            notice: RwLock::new(None),
        }
    }

    #[must_use]
    pub fn attention(&self) -> AttentionState {
        *self
            .attention
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    }

    pub fn set_attention(&self, state: AttentionState) {
        *self
            .attention
            .write()
            .unwrap_or_else(PoisonError::into_inner) = state;
    }

    /// Lock the session controller
    pub fn session(&self) -> MutexGuard<'_, SessionController> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }

    #[must_use]
    pub fn session_snapshot(&self) -> Session {
        self.session().session().clone()
    }

    #[must_use]
    pub fn notice(&self) -> Option<String> {
        self.notice
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn set_notice(&self, notice: Option<String>) {
        *self.notice.write().unwrap_or_else(PoisonError::into_inner) = notice;
    }
}

/// Why a session stopped
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EndReason {
    /// Countdown reached zero
    Expired,
    /// Explicit end command
    UserEnded,
    /// Camera stream closed or failed
    CameraLost(String),
}

/// Per-session counters
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SessionStats {
    pub frames_processed: u64,
    pub duplicate_frames: u64,
    pub inference_failures: u64,
    pub focused_frames: u64,
    pub eyes_closed_frames: u64,
    pub no_face_frames: u64,
    pub eyes_closed_alerts: u32,
    pub no_face_alerts: u32,
    /// Alerts that could not be played
    pub dropped_alerts: u32,
}

impl SessionStats {
    fn record_state(&mut self, state: AttentionState) {
        self.frames_processed += 1;
        match state {
            AttentionState::Focused => self.focused_frames += 1,
            AttentionState::EyesClosed => self.eyes_closed_frames += 1,
            AttentionState::NoFace => self.no_face_frames += 1,
            AttentionState::Unknown => {}
        }
    }

    fn record_alert(&mut self, kind: AlertKind, delivered: bool) {
        match kind {
            AlertKind::EyesClosed => self.eyes_closed_alerts += 1,
            AlertKind::NoFace => self.no_face_alerts += 1,
        }
        if !delivered {
            self.dropped_alerts += 1;
        }
    }

    /// Share of classified frames that were focused, in `0.0..=1.0`
    #[must_use]
    pub fn focus_ratio(&self) -> f64 {
        if self.frames_processed == 0 {
            return 0.0;
        }
        #[allow(clippy::cast_precision_loss)]
        let ratio = self.focused_frames as f64 / self.frames_processed as f64;
        ratio
    }
}

/// Summary returned once a session has been torn down
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionReport {
    pub session_id: Uuid,
    pub reason: EndReason,
    pub stats: SessionStats,
}

struct ActiveSession {
    end_tx: oneshot::Sender<()>,
    task: JoinHandle<SessionReport>,
}

/// Everything the session task needs, moved into it at start
struct SessionContext {
    session_id: Uuid,
    config: MonitorConfig,
    camera: Arc<dyn CameraManager>,
    detector: Arc<dyn LandmarkProvider>,
    audio: Arc<dyn AudioOutput>,
    state: Arc<MonitorState>,
}

/// Front door for the presentation layer
pub struct FocusMonitor {
    config: MonitorConfig,
    camera: Arc<dyn CameraManager>,
    detector: Arc<dyn LandmarkProvider>,
    audio: Arc<dyn AudioOutput>,
    state: Arc<MonitorState>,
    active: Option<ActiveSession>,
}

impl FocusMonitor {
    #[must_use]
    pub fn new(
        config: MonitorConfig,
        camera: Arc<dyn CameraManager>,
        detector: Arc<dyn LandmarkProvider>,
        audio: Arc<dyn AudioOutput>,
    ) -> Self {
        let state = Arc::new(MonitorState::new(&config.session));
        Self {
            config,
            camera,
            detector,
            audio,
            state,
            active: None,
        }
    }

    #[must_use]
    pub fn reporter(&self) -> StatusReporter {
        StatusReporter::new(self.state.clone())
    }

    #[must_use]
    pub const fn config(&self) -> &MonitorConfig {
        &self.config
    }

    /// Set the countdown length in seconds. Only applies before a session starts.
    pub fn configure(&self, duration_seconds: u32) -> bool {
        self.prepare_idle();
        self.state.session().configure(duration_seconds)
    }

    /// Pick a preset in minutes. Only applies before a session starts.
    pub fn configure_minutes(&self, minutes: u32) -> bool {
        self.prepare_idle();
        self.state.session().configure_minutes(minutes)
    }

    /// A finished session goes back to idle once the user starts preparing
    /// the next one.
    fn prepare_idle(&self) {
        if !self.is_running() {
            self.state.session().reopen();
        }
    }

    pub fn pause(&self) -> bool {
        self.state.session().pause()
    }

    pub fn resume(&self) -> bool {
        self.state.session().resume()
    }

    pub fn toggle_pause(&self) -> bool {
        self.state.session().toggle_pause()
    }

    /// Whether a session task is still running
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.active
            .as_ref()
            .is_some_and(|active| !active.task.is_finished())
    }

    /// Acquire the camera and start a session.
    ///
    /// On a refused camera the monitor stays idle and shows
    /// [`PERMISSION_NOTICE`].
    ///
    /// # Errors
    ///
    /// Returns [`MonitorError::SessionActive`] if a session is still running,
    /// or the camera error if the stream could not be opened.
    pub async fn start(&mut self) -> Result<Uuid, MonitorError> {
        if self.is_running() {
            return Err(MonitorError::SessionActive);
        }
        if let Some(finished) = self.active.take() {
            Self::join(finished.task).await;
        }
        self.state.session().reopen();

        let stream = match self.camera.acquire().await {
            Ok(stream) => stream,
            Err(e) => {
                let notice = if matches!(e, MonitorError::PermissionDenied) {
                    PERMISSION_NOTICE.to_string()
                } else {
                    e.to_string()
                };
                log::warn!("Camera acquisition failed: {e}");
                self.state.set_notice(Some(notice));
                return Err(e);
            }
        };
        log::info!("Camera acquired: {}", stream.label());

        let started = self.state.session().start();
        let Some(session_id) = started else {
            self.camera.release(stream).await;
            return Err(MonitorError::SessionActive);
        };
        self.state.set_notice(None);
        self.state.set_attention(AttentionState::Unknown);

        let ctx = SessionContext {
            session_id,
            config: self.config.clone(),
            camera: self.camera.clone(),
            detector: self.detector.clone(),
            audio: self.audio.clone(),
            state: self.state.clone(),
        };
        let (end_tx, end_rx) = oneshot::channel();
        let task = tokio::spawn(run_session(ctx, stream, end_rx));
        self.active = Some(ActiveSession { end_tx, task });

        Ok(session_id)
    }

    /// End the session and wait for teardown.
    ///
    /// Also resets the durations to the default preset when the countdown
    /// already expired. Returns the report of the torn-down session, if any.
    pub async fn end(&mut self) -> Option<SessionReport> {
        self.state.session().end();

        let active = self.active.take()?;
        // The task may already be gone after expiry or camera loss
        let _ = active.end_tx.send(());
        Self::join(active.task).await
    }

    async fn join(task: JoinHandle<SessionReport>) -> Option<SessionReport> {
        match task.await {
            Ok(report) => Some(report),
            Err(e) => {
                log::error!("Focus session task failed: {e}");
                None
            }
        }
    }
}

async fn run_session(
    ctx: SessionContext,
    mut stream: Box<dyn VideoStream>,
    end_rx: oneshot::Receiver<()>,
) -> SessionReport {
    let mut classifier = EyeStateClassifier::new(ctx.config.classifier.clone());
    let mut alerts = AlertDispatcher::new(ctx.audio.clone(), ctx.config.alert.clone());
    let mut stats = SessionStats::default();

    let reason = tokio::select! {
        reason = frame_loop(
            stream.as_mut(),
            ctx.detector.as_ref(),
            &mut classifier,
            &mut alerts,
            &mut stats,
            &ctx.state,
        ) => reason,
        reason = timer_loop(&ctx.state, ctx.config.session.tick_interval()) => reason,
        _ = end_rx => EndReason::UserEnded,
    };

    // Teardown: runs once, whatever ended the session
    ctx.camera.release(stream).await;
    classifier.reset();
    alerts.reset();
    ctx.state.set_attention(AttentionState::Unknown);

    if let EndReason::CameraLost(detail) = &reason {
        log::warn!("Camera stream lost: {detail}");
        ctx.state.session().end();
        ctx.state.set_notice(Some(CAMERA_LOST_NOTICE.to_string()));
    }

    log::info!(
        "Focus session {} torn down ({:?}): {} frames, {} alerts",
        ctx.session_id,
        reason,
        stats.frames_processed,
        stats.eyes_closed_alerts + stats.no_face_alerts
    );

    SessionReport {
        session_id: ctx.session_id,
        reason,
        stats,
    }
}

/// Process frames one at a time until the camera gives out
async fn frame_loop(
    stream: &mut dyn VideoStream,
    detector: &dyn LandmarkProvider,
    classifier: &mut EyeStateClassifier,
    alerts: &mut AlertDispatcher,
    stats: &mut SessionStats,
    state: &MonitorState,
) -> EndReason {
    loop {
        let frame = match stream.next_frame().await {
            Ok(Some(frame)) => frame,
            Ok(None) => return EndReason::CameraLost("stream closed".to_string()),
            Err(e) => return EndReason::CameraLost(e.to_string()),
        };

        if !classifier.is_fresh(frame.timestamp) {
            stats.duplicate_frames += 1;
            continue;
        }

        let landmarks = match detector.detect(&frame).await {
            Ok(landmarks) => landmarks.unwrap_or_default(),
            Err(e) => {
                log::warn!("Skipping frame at {:?}: {e}", frame.timestamp);
                stats.inference_failures += 1;
                continue;
            }
        };

        let sample = FrameSample::new(frame.timestamp, landmarks);
        let Some(outcome) = classifier.process(&sample) else {
            stats.duplicate_frames += 1;
            continue;
        };

        state.set_attention(outcome.state);
        stats.record_state(outcome.state);
        if let Some(event) = alerts.observe(&outcome) {
            stats.record_alert(event.kind, event.delivered);
        }
    }
}

/// Tick the countdown until it expires
async fn timer_loop(state: &MonitorState, period: Duration) -> EndReason {
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;
        let outcome = state.session().tick();
        if outcome == TickOutcome::Expired {
            return EndReason::Expired;
        }
    }
}
