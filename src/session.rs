// Session orchestration: load -> preview -> instructions -> capture + playback -> upload -> notify.
// The session is sans-IO: the host feeds events, the session answers with ordered effects.
// Every path except a failed trajectory load ends in exactly one host notification.
// See DESIGN.md: Session Orchestrator

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::capture::{
    AcquireFailure, AcquireRequest, CaptureController, CaptureState, FinalizeOutcome,
};
use crate::error::EngineError;
use crate::notify::{CompletionMessage, HostNotifier, NotifierSet};
use crate::render::{DrawList, Renderer};
use crate::scheduler::{AnimationScheduler, FrameOutcome, PlaybackState};
use crate::trajectory::{self, TrajectoryStore};
use crate::transport::{self, FetchRequest, UploadForm};
use crate::types::*;

/// Host -> session notifications.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum SessionEvent {
    /// Raw body of a successful trajectory fetch.
    TrajectoryLoaded(String),
    TrajectoryFailed(String),
    TimerFired(Timer),
    CameraAcquired(StreamHandle),
    CameraFailed(AcquireFailure),
    /// The host could not construct a recorder for the stream.
    RecorderUnavailable,
    RecorderData(Vec<u8>),
    RecorderStopped,
    RecorderFailed(String),
    AnimationFrame(FrameTime),
    /// Raw body of the upload response.
    UploadFinished(String),
    UploadFailed(String),
    Resized(SurfaceGeometry),
}

/// Session -> host requests, performed in order.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum Effect {
    FetchTrajectory(FetchRequest),
    Draw(DrawList),
    ShowInstructions,
    HideInstructions,
    StartTimer { timer: Timer, delay_ms: u32 },
    AcquireCamera(AcquireRequest),
    StartRecorder { stream: StreamHandle },
    StopRecorder,
    ReleaseCamera { stream: StreamHandle },
    RequestFrame,
    CancelFrame,
    Upload(UploadForm),
    ShowError(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Created,
    Loading,
    Instructions,
    Acquiring,
    Playing,
    /// Playback done; waiting for the recorder to stop.
    Finishing,
    Uploading,
    Settling(SessionOutcome),
    Complete(SessionOutcome),
    /// Trajectory load failed or the host tore the session down.
    /// Terminal, no notification.
    Aborted,
}

pub struct Session {
    config: SessionConfig,
    token: Option<String>,
    geometry: SurfaceGeometry,
    store: TrajectoryStore,
    renderer: Renderer,
    scheduler: AnimationScheduler,
    capture: CaptureController,
    notifiers: NotifierSet,
    phase: Phase,
    capture_failed: bool,
    frame_pending: bool,
}

impl Session {
    pub fn new(config: SessionConfig, notifiers: NotifierSet) -> Result<Self, EngineError> {
        if !(config.playback_duration_ms.is_finite() && config.playback_duration_ms > 0.0) {
            return Err(EngineError::InvalidConfig(format!(
                "playback_duration_ms must be positive, got {}",
                config.playback_duration_ms
            )));
        }

        let token = transport::resolve_token(
            config.host_token.as_deref(),
            config.launch_token.as_deref(),
        );

        Ok(Session {
            token,
            geometry: config.geometry,
            store: TrajectoryStore::new(),
            renderer: Renderer::new(config.style.clone()),
            scheduler: AnimationScheduler::new(),
            capture: CaptureController::new(
                config.capture_strategies.clone(),
                config.recording_mime_type.clone(),
            ),
            notifiers,
            phase: Phase::Created,
            capture_failed: false,
            frame_pending: false,
            config,
        })
    }

    pub fn add_notifier(&mut self, sink: Box<dyn HostNotifier>) {
        self.notifiers.add(sink);
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Terminal outcome, once the host has been notified.
    pub fn outcome(&self) -> Option<SessionOutcome> {
        match self.phase {
            Phase::Complete(outcome) => Some(outcome),
            _ => None,
        }
    }

    pub fn capture_state(&self) -> CaptureState {
        self.capture.state()
    }

    /// Kick off the trajectory fetch.
    pub fn start(&mut self) -> Vec<Effect> {
        if self.phase != Phase::Created {
            debug!(phase = ?self.phase, "session already started");
            return Vec::new();
        }
        self.phase = Phase::Loading;
        info!(authenticated = self.token.is_some(), "session started");

        vec![Effect::FetchTrajectory(FetchRequest::new(
            &self.config.api_base,
            self.config.trajectory_request.clone(),
            self.token.clone(),
        ))]
    }

    /// Consume one host event and return the effects it triggers.
    pub fn handle(&mut self, event: SessionEvent) -> Vec<Effect> {
        let mut effects = Vec::new();

        match (self.phase, event) {
            (Phase::Loading, SessionEvent::TrajectoryLoaded(body)) => {
                self.on_trajectory(&body, &mut effects)
            }
            (Phase::Loading, SessionEvent::TrajectoryFailed(reason)) => {
                self.abort(EngineError::FatalLoad(reason), &mut effects)
            }
            (Phase::Instructions, SessionEvent::TimerFired(Timer::InstructionDwell)) => {
                self.begin_capture(&mut effects)
            }
            (Phase::Acquiring, SessionEvent::CameraAcquired(stream)) => {
                self.on_camera(stream, &mut effects)
            }
            (Phase::Acquiring, SessionEvent::CameraFailed(failure)) => {
                self.on_camera_failed(failure, &mut effects)
            }
            (Phase::Playing | Phase::Finishing, SessionEvent::RecorderUnavailable) => {
                self.on_recorder_lost("recorder unavailable", &mut effects)
            }
            (Phase::Playing | Phase::Finishing, SessionEvent::RecorderFailed(reason)) => {
                self.on_recorder_lost(&reason, &mut effects)
            }
            (_, SessionEvent::RecorderData(chunk)) => {
                self.capture.on_data(chunk);
            }
            (Phase::Playing, SessionEvent::AnimationFrame(ts)) => self.on_frame(ts, &mut effects),
            (Phase::Playing, SessionEvent::RecorderStopped) => {
                self.on_recorder_stopped_early(&mut effects)
            }
            (Phase::Finishing, SessionEvent::RecorderStopped) => {
                self.on_recorder_stopped(&mut effects)
            }
            (Phase::Uploading, SessionEvent::UploadFinished(body)) => {
                match transport::check_upload_response(&body) {
                    Ok(()) => {
                        info!("recording uploaded");
                        self.settle(SessionOutcome::Uploaded, &mut effects);
                    }
                    Err(err) => {
                        warn!(error = %err, "upload rejected");
                        self.settle(SessionOutcome::UploadFailed, &mut effects);
                    }
                }
            }
            (Phase::Uploading, SessionEvent::UploadFailed(reason)) => {
                warn!(%reason, "upload failed");
                self.settle(SessionOutcome::UploadFailed, &mut effects);
            }
            (Phase::Settling(outcome), SessionEvent::TimerFired(Timer::CompletionGrace)) => {
                self.complete(outcome)
            }
            (_, SessionEvent::Resized(geometry)) => self.on_resize(geometry, &mut effects),
            (phase, event) => debug!(?phase, ?event, "event ignored"),
        }

        effects
    }

    /// Host teardown (page unload). Stops playback and capture without notifying.
    /// A session that already completed keeps its outcome.
    pub fn teardown(&mut self) -> Vec<Effect> {
        let mut effects = Vec::new();
        if matches!(self.phase, Phase::Complete(_) | Phase::Aborted) {
            debug!(phase = ?self.phase, "teardown after terminal phase ignored");
            return effects;
        }
        if self.scheduler.cancel() && self.frame_pending {
            self.frame_pending = false;
            effects.push(Effect::CancelFrame);
        }
        if self.capture.state() == CaptureState::Recording {
            effects.push(Effect::StopRecorder);
        }
        if let Some(stream) = self.capture.release() {
            effects.push(Effect::ReleaseCamera { stream });
        }
        self.phase = Phase::Aborted;
        effects
    }

    fn on_trajectory(&mut self, body: &str, effects: &mut Vec<Effect>) {
        let trajectory = match trajectory::parse_response(body) {
            Ok(trajectory) => trajectory,
            Err(err) => return self.abort(err, effects),
        };
        info!(samples = trajectory.len(), "trajectory loaded");
        self.store.load(trajectory);

        // Preview goes up before the overlay so the surface is never blank.
        if let Some(list) = self.redraw() {
            effects.push(Effect::Draw(list));
        }
        effects.push(Effect::ShowInstructions);
        effects.push(Effect::StartTimer {
            timer: Timer::InstructionDwell,
            delay_ms: self.config.instruction_dwell_ms,
        });
        self.phase = Phase::Instructions;
    }

    fn abort(&mut self, err: EngineError, effects: &mut Vec<Effect>) {
        error!(error = %err, "session aborted");
        self.phase = Phase::Aborted;
        effects.push(Effect::ShowError(err.to_string()));
    }

    fn begin_capture(&mut self, effects: &mut Vec<Effect>) {
        effects.push(Effect::HideInstructions);
        self.phase = Phase::Acquiring;
        match self.capture.acquire() {
            Ok(request) => effects.push(Effect::AcquireCamera(request)),
            Err(err) => self.continue_without_capture(err.into(), effects),
        }
    }

    fn on_camera(&mut self, stream: StreamHandle, effects: &mut Vec<Effect>) {
        debug_assert_eq!(self.capture.state(), CaptureState::Acquiring);
        let started = self
            .capture
            .on_acquired(stream)
            .and_then(|()| self.capture.start_recording());

        match started {
            Ok(stream) => {
                // Recorder first: captured frames must cover the whole motion.
                effects.push(Effect::StartRecorder { stream });
                self.start_playback(effects);
            }
            // Unreachable while the phase is Acquiring; kept so a desync still
            // releases the stream and finishes the pass.
            Err(err) => {
                if let Some(stream) = self.capture.fail() {
                    effects.push(Effect::ReleaseCamera { stream });
                }
                self.continue_without_capture(err.into(), effects);
            }
        }
    }

    fn on_camera_failed(&mut self, failure: AcquireFailure, effects: &mut Vec<Effect>) {
        match self.capture.on_acquire_failed(failure) {
            Ok(retry) => {
                debug!(strategy = ?retry.strategy, "retrying camera acquisition");
                effects.push(Effect::AcquireCamera(retry));
            }
            Err(err) => self.continue_without_capture(err.into(), effects),
        }
    }

    fn continue_without_capture(&mut self, err: EngineError, effects: &mut Vec<Effect>) {
        warn!(error = %err, "continuing playback without recording");
        self.capture_failed = true;
        self.start_playback(effects);
    }

    fn start_playback(&mut self, effects: &mut Vec<Effect>) {
        self.phase = Phase::Playing;
        let outcome = self
            .scheduler
            .start(self.config.playback_duration_ms, self.store.is_playable());
        self.after_frame(outcome, effects);
    }

    fn on_frame(&mut self, ts: FrameTime, effects: &mut Vec<Effect>) {
        self.frame_pending = false;
        let Some(trajectory) = self.store.trajectory() else {
            return;
        };

        let mut list = DrawList::new();
        let renderer = &self.renderer;
        let geometry = &self.geometry;
        let outcome = self.scheduler.on_frame(ts, |progress| {
            renderer.draw_frame(&mut list, trajectory, geometry, progress)
        });

        if !list.ops().is_empty() {
            effects.push(Effect::Draw(list));
        }
        self.after_frame(outcome, effects);
    }

    fn after_frame(&mut self, outcome: FrameOutcome, effects: &mut Vec<Effect>) {
        match outcome {
            FrameOutcome::RequestFrame => {
                self.frame_pending = true;
                effects.push(Effect::RequestFrame);
            }
            FrameOutcome::Completed => self.on_playback_complete(effects),
            FrameOutcome::Ignored => {}
        }
    }

    fn on_playback_complete(&mut self, effects: &mut Vec<Effect>) {
        info!("playback complete");
        if self.capture.state() == CaptureState::Stopping {
            // Recorder already stopped on its own during the pass.
            return self.on_recorder_stopped(effects);
        }
        if self.capture.stop_recording().is_ok() {
            self.phase = Phase::Finishing;
            effects.push(Effect::StopRecorder);
            return;
        }

        let outcome = if self.capture_failed {
            SessionOutcome::CaptureFailed
        } else {
            SessionOutcome::NoRecording
        };
        self.settle(outcome, effects);
    }

    fn on_recorder_lost(&mut self, reason: &str, effects: &mut Vec<Effect>) {
        if self.capture_failed {
            return;
        }
        warn!(%reason, "recorder lost");
        self.capture_failed = true;
        if let Some(stream) = self.capture.fail() {
            effects.push(Effect::ReleaseCamera { stream });
        }
        if self.phase == Phase::Finishing {
            self.settle(SessionOutcome::CaptureFailed, effects);
        }
    }

    /// Recorder went inactive mid-pass (e.g. the camera track ended).
    /// Buffered segments are kept and finalized once playback completes.
    fn on_recorder_stopped_early(&mut self, effects: &mut Vec<Effect>) {
        if self.capture.stop_recording().is_err() {
            debug!(state = ?self.capture.state(), "recorder stop ignored");
            return;
        }
        warn!("recorder stopped before playback finished");
        if let Some(stream) = self.capture.on_stopped() {
            effects.push(Effect::ReleaseCamera { stream });
        }
    }

    fn on_recorder_stopped(&mut self, effects: &mut Vec<Effect>) {
        // Release before finalizing, whatever finalization yields.
        if let Some(stream) = self.capture.on_stopped() {
            effects.push(Effect::ReleaseCamera { stream });
        }

        match self.capture.finalize() {
            Ok(FinalizeOutcome::Artifact(artifact)) => {
                let trajectory = self.store.trajectory().cloned().unwrap_or_default();
                match UploadForm::new(
                    &self.config.api_base,
                    artifact,
                    &trajectory,
                    self.token.clone(),
                ) {
                    Ok(form) => {
                        info!(bytes = form.video.size, "uploading recording");
                        self.phase = Phase::Uploading;
                        effects.push(Effect::Upload(form));
                    }
                    Err(err) => {
                        warn!(error = %err, "could not build upload");
                        self.settle(SessionOutcome::UploadFailed, effects);
                    }
                }
            }
            Ok(FinalizeOutcome::Empty) => {
                info!("recorder produced no data; skipping upload");
                self.settle(SessionOutcome::NoRecording, effects);
            }
            Err(err) => {
                warn!(error = %err, "finalize failed");
                self.settle(SessionOutcome::CaptureFailed, effects);
            }
        }
    }

    fn settle(&mut self, outcome: SessionOutcome, effects: &mut Vec<Effect>) {
        if let Some(stream) = self.capture.release() {
            effects.push(Effect::ReleaseCamera { stream });
        }
        let delay_ms = if outcome.is_failure() {
            self.config.failure_grace_ms
        } else {
            self.config.success_grace_ms
        };
        self.phase = Phase::Settling(outcome);
        effects.push(Effect::StartTimer {
            timer: Timer::CompletionGrace,
            delay_ms,
        });
    }

    fn complete(&mut self, outcome: SessionOutcome) {
        self.phase = Phase::Complete(outcome);
        let delivered = self.notifiers.notify_all(&CompletionMessage { outcome });
        info!(?outcome, delivered, "session complete");
    }

    fn on_resize(&mut self, geometry: SurfaceGeometry, effects: &mut Vec<Effect>) {
        self.geometry = geometry;
        // While playing, the next frame picks the new geometry up.
        if self.scheduler.is_running() {
            return;
        }
        if let Some(list) = self.redraw() {
            effects.push(Effect::Draw(list));
        }
    }

    /// Idle rendering: preview before playback, final frame after it.
    fn redraw(&self) -> Option<DrawList> {
        let trajectory = self.store.trajectory()?;
        let mut list = DrawList::new();
        if self.scheduler.state() == PlaybackState::Completed {
            self.renderer
                .draw_frame(&mut list, trajectory, &self.geometry, 1.0);
        } else {
            self.renderer
                .draw_preview(&mut list, trajectory, &self.geometry);
        }
        Some(list)
    }
}
