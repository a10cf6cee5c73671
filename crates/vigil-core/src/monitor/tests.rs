use super::*;
use crate::session::Lifecycle;
use crate::test_support::{
    ms, shared, AfterScript, RecordingAudio, ScriptedCamera, ScriptedDetector,
};
use std::sync::atomic::Ordering;
use tokio::time::sleep;

struct Harness {
    monitor: FocusMonitor,
    camera: Arc<ScriptedCamera>,
    detector: Arc<ScriptedDetector>,
    audio: Arc<RecordingAudio>,
}

fn harness(camera: ScriptedCamera, detector: ScriptedDetector, audio: RecordingAudio) -> Harness {
    let camera = shared(camera);
    let detector = shared(detector);
    let audio = shared(audio);
    let monitor = FocusMonitor::new(
        MonitorConfig::default(),
        camera.clone(),
        detector.clone(),
        audio.clone(),
    );
    Harness {
        monitor,
        camera,
        detector,
        audio,
    }
}

fn idle_camera() -> ScriptedCamera {
    ScriptedCamera::new(Vec::new(), AfterScript::Hang)
}

fn frames(timestamps: &[u64]) -> ScriptedCamera {
    ScriptedCamera::new(timestamps.iter().copied().map(ms).collect(), AfterScript::Hang)
}

// ============================================================================
// Countdown
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_countdown_ticks_once_per_second() {
    let mut h = harness(idle_camera(), ScriptedDetector::default(), RecordingAudio::default());
    assert!(h.monitor.configure(1500));
    h.monitor.start().await.unwrap();

    let reporter = h.monitor.reporter();
    assert_eq!(reporter.snapshot().remaining_seconds, 1500);
    assert_eq!(reporter.snapshot().lifecycle, Lifecycle::Running);

    sleep(Duration::from_millis(10_500)).await;
    assert_eq!(reporter.snapshot().remaining_seconds, 1490);

    h.monitor.end().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_pause_freezes_runtime_countdown() {
    let mut h = harness(idle_camera(), ScriptedDetector::default(), RecordingAudio::default());
    h.monitor.configure(100);
    h.monitor.start().await.unwrap();
    let reporter = h.monitor.reporter();

    sleep(Duration::from_millis(2_500)).await;
    assert_eq!(reporter.snapshot().remaining_seconds, 98);

    assert!(h.monitor.pause());
    sleep(Duration::from_secs(5)).await;
    assert_eq!(reporter.snapshot().remaining_seconds, 98);
    assert_eq!(reporter.snapshot().lifecycle, Lifecycle::Paused);

    assert!(h.monitor.resume());
    sleep(Duration::from_secs(5)).await;
    assert_eq!(reporter.snapshot().remaining_seconds, 93);

    h.monitor.end().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_expiry_tears_down_once() {
    let mut h = harness(idle_camera(), ScriptedDetector::default(), RecordingAudio::default());
    h.monitor.configure(3);
    h.monitor.start().await.unwrap();
    let reporter = h.monitor.reporter();

    sleep(Duration::from_secs(5)).await;
    let status = reporter.snapshot();
    assert_eq!(status.lifecycle, Lifecycle::Ended);
    assert_eq!(status.remaining_seconds, 0);
    assert_eq!(status.attention, AttentionState::Unknown);
    assert_eq!(h.camera.released_count(), 1);
    assert!(!h.monitor.is_running());

    let report = h.monitor.end().await.unwrap();
    assert_eq!(report.reason, EndReason::Expired);
    assert_eq!(h.camera.released_count(), 1);

    // Explicit end after expiry restores the preset
    let status = reporter.snapshot();
    assert_eq!(status.configured_duration_seconds, 1500);
    assert_eq!(status.remaining_seconds, 1500);
}

// ============================================================================
// Frames and alerts
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_missing_face_beeps_once() {
    let detector = ScriptedDetector::default()
        .with_no_face(0)
        .with_no_face(33)
        .with_no_face(66);
    let mut h = harness(frames(&[0, 33, 66]), detector, RecordingAudio::default());
    h.monitor.start().await.unwrap();

    sleep(Duration::from_millis(100)).await;
    assert_eq!(h.monitor.reporter().snapshot().attention, AttentionState::NoFace);
    assert_eq!(h.monitor.reporter().snapshot().label(), "No Face Detected");
    assert_eq!(h.audio.beep_count(), 1);

    let report = h.monitor.end().await.unwrap();
    assert_eq!(report.reason, EndReason::UserEnded);
    assert_eq!(report.stats.frames_processed, 3);
    assert_eq!(report.stats.no_face_frames, 3);
    assert_eq!(report.stats.no_face_alerts, 1);
    assert_eq!(h.camera.released_count(), 1);
    assert_eq!(h.monitor.reporter().snapshot().attention, AttentionState::Unknown);
}

#[tokio::test(start_paused = true)]
async fn test_closed_eyes_rearm_after_focus() {
    // Smoothed: 0.2 x5, 0.28, 0.36, 0.44, 0.40, 0.36, 0.24
    let mut detector = ScriptedDetector::default();
    let mut timestamps = Vec::new();
    let ears = [0.2, 0.2, 0.2, 0.2, 0.2, 0.6, 0.6, 0.6, 0.0, 0.0, 0.0];
    for (i, ear) in ears.iter().enumerate() {
        let t = i as u64 * 33;
        detector = detector.with_face(t, *ear);
        timestamps.push(t);
    }
    let mut h = harness(frames(&timestamps), detector, RecordingAudio::default());
    h.monitor.start().await.unwrap();

    sleep(Duration::from_millis(500)).await;
    assert_eq!(h.audio.beep_count(), 2);
    assert_eq!(h.monitor.reporter().snapshot().attention, AttentionState::EyesClosed);

    let report = h.monitor.end().await.unwrap();
    assert_eq!(report.stats.eyes_closed_alerts, 2);
    assert_eq!(report.stats.focused_frames, 4);
    assert_eq!(report.stats.eyes_closed_frames, 7);
}

#[tokio::test(start_paused = true)]
async fn test_attention_holds_between_frames() {
    let detector = ScriptedDetector::default().with_no_face(0);
    let mut h = harness(frames(&[0]), detector, RecordingAudio::default());
    h.monitor.configure(100);
    h.monitor.start().await.unwrap();
    let reporter = h.monitor.reporter();

    sleep(Duration::from_millis(50)).await;
    assert_eq!(reporter.snapshot().attention, AttentionState::NoFace);
    assert_eq!(h.audio.beep_count(), 1);

    // Several ticks pass with no new frame
    sleep(Duration::from_secs(5)).await;
    let status = reporter.snapshot();
    assert_eq!(status.remaining_seconds, 95);
    assert_eq!(status.attention, AttentionState::NoFace);
    assert_eq!(h.audio.beep_count(), 1);

    assert!(h.monitor.pause());
    sleep(Duration::from_secs(3)).await;
    assert!(h.monitor.resume());
    sleep(Duration::from_secs(3)).await;

    let status = reporter.snapshot();
    assert_eq!(status.remaining_seconds, 92);
    assert_eq!(status.attention, AttentionState::NoFace);
    assert_eq!(h.audio.beep_count(), 1);

    let report = h.monitor.end().await.unwrap();
    assert_eq!(report.stats.frames_processed, 1);
    assert_eq!(report.stats.no_face_alerts, 1);
}

#[tokio::test(start_paused = true)]
async fn test_muted_audio_counts_dropped_alert() {
    let detector = ScriptedDetector::default().with_no_face(0);
    let mut h = harness(frames(&[0]), detector, RecordingAudio::muted());
    h.monitor.start().await.unwrap();

    sleep(Duration::from_millis(50)).await;
    let report = h.monitor.end().await.unwrap();

    assert_eq!(h.audio.beep_count(), 0);
    assert_eq!(report.stats.no_face_alerts, 1);
    assert_eq!(report.stats.dropped_alerts, 1);
}

#[tokio::test(start_paused = true)]
async fn test_inference_failure_skips_frame() {
    let detector = ScriptedDetector::default().with_failure(0).with_face(33, 0.4);
    let mut h = harness(frames(&[0, 33]), detector, RecordingAudio::default());
    h.monitor.start().await.unwrap();

    sleep(Duration::from_millis(50)).await;
    assert_eq!(h.monitor.reporter().snapshot().attention, AttentionState::Focused);

    let report = h.monitor.end().await.unwrap();
    assert_eq!(report.stats.inference_failures, 1);
    assert_eq!(report.stats.frames_processed, 1);
    assert_eq!(report.reason, EndReason::UserEnded);
}

#[tokio::test(start_paused = true)]
async fn test_duplicate_frames_skip_inference() {
    let detector = ScriptedDetector::default().with_face(0, 0.4).with_face(33, 0.4);
    let mut h = harness(frames(&[0, 0, 33]), detector, RecordingAudio::default());
    h.monitor.start().await.unwrap();

    sleep(Duration::from_millis(50)).await;
    let report = h.monitor.end().await.unwrap();

    assert_eq!(h.detector.calls.load(Ordering::SeqCst), 2);
    assert_eq!(report.stats.duplicate_frames, 1);
    assert_eq!(report.stats.frames_processed, 2);
}

// ============================================================================
// Camera lifecycle
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_permission_denied_keeps_monitor_idle() {
    let mut h = harness(
        ScriptedCamera::denied(),
        ScriptedDetector::default(),
        RecordingAudio::default(),
    );

    let err = h.monitor.start().await.unwrap_err();
    assert!(matches!(err, MonitorError::PermissionDenied));

    let status = h.monitor.reporter().snapshot();
    assert_eq!(status.lifecycle, Lifecycle::Idle);
    assert_eq!(status.label(), PERMISSION_NOTICE);
    assert!(!h.monitor.is_running());
    assert!(h.monitor.end().await.is_none());
}

#[tokio::test(start_paused = true)]
async fn test_closed_stream_ends_session() {
    let camera = ScriptedCamera::new(vec![ms(0)], AfterScript::Close);
    let detector = ScriptedDetector::default().with_face(0, 0.4);
    let mut h = harness(camera, detector, RecordingAudio::default());
    h.monitor.start().await.unwrap();

    sleep(Duration::from_millis(50)).await;
    let status = h.monitor.reporter().snapshot();
    assert_eq!(status.lifecycle, Lifecycle::Ended);
    assert_eq!(status.notice.as_deref(), Some(CAMERA_LOST_NOTICE));
    assert_eq!(status.attention, AttentionState::Unknown);
    assert_eq!(h.camera.released_count(), 1);

    let report = h.monitor.end().await.unwrap();
    assert!(matches!(report.reason, EndReason::CameraLost(_)));
    assert_eq!(h.camera.released_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_second_start_while_running_is_rejected() {
    let mut h = harness(idle_camera(), ScriptedDetector::default(), RecordingAudio::default());
    h.monitor.start().await.unwrap();

    assert!(matches!(
        h.monitor.start().await,
        Err(MonitorError::SessionActive)
    ));
    assert_eq!(h.camera.acquired.load(Ordering::SeqCst), 1);

    h.monitor.end().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_restart_after_end_opens_new_session() {
    let mut h = harness(idle_camera(), ScriptedDetector::default(), RecordingAudio::default());
    h.monitor.configure_minutes(50);
    let first = h.monitor.start().await.unwrap();
    let report = h.monitor.end().await.unwrap();
    assert_eq!(report.session_id, first);

    // End restored the default preset
    assert_eq!(h.monitor.reporter().snapshot().configured_duration_seconds, 1500);

    let second = h.monitor.start().await.unwrap();
    assert_ne!(first, second);
    let status = h.monitor.reporter().snapshot();
    assert_eq!(status.lifecycle, Lifecycle::Running);
    assert_eq!(status.remaining_seconds, 1500);

    h.monitor.end().await.unwrap();
    assert_eq!(h.camera.acquired.load(Ordering::SeqCst), 2);
    assert_eq!(h.camera.released_count(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_zero_length_session_is_rejected() {
    let mut h = harness(idle_camera(), ScriptedDetector::default(), RecordingAudio::default());
    assert!(!h.monitor.configure(0));
    assert!(!h.monitor.configure_minutes(0));

    h.monitor.start().await.unwrap();
    sleep(Duration::from_millis(1_500)).await;

    let status = h.monitor.reporter().snapshot();
    assert_eq!(status.lifecycle, Lifecycle::Running);
    assert_eq!(status.remaining_seconds, 1499);

    let report = h.monitor.end().await.unwrap();
    assert_eq!(report.reason, EndReason::UserEnded);
}

#[tokio::test(start_paused = true)]
async fn test_configure_rejected_while_running() {
    let mut h = harness(idle_camera(), ScriptedDetector::default(), RecordingAudio::default());
    h.monitor.start().await.unwrap();

    assert!(!h.monitor.configure(60));
    assert_eq!(h.monitor.reporter().snapshot().configured_duration_seconds, 1500);

    h.monitor.end().await.unwrap();
}

#[test]
fn test_focus_ratio() {
    let stats = SessionStats {
        frames_processed: 4,
        focused_frames: 3,
        ..SessionStats::default()
    };
    assert!((stats.focus_ratio() - 0.75).abs() < f64::EPSILON);
    assert!(SessionStats::default().focus_ratio().abs() < f64::EPSILON);
}
