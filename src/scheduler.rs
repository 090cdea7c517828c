// Time-bounded playback pass driven by display-refresh callbacks.
// Converts elapsed frame time into normalized progress and signals completion once.
// See DESIGN.md: Animation Scheduler

use tracing::debug;

use crate::types::FrameTime;

/// Scheduler lifecycle. No return to `Running` once `Completed`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PlaybackState {
    Idle,
    Running {
        /// Set by the first frame callback, not by `start`.
        start: Option<FrameTime>,
        last_progress: f64,
    },
    Completed,
}

/// What the caller must do after `start` or a frame callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOutcome {
    /// Arm the next display-refresh callback.
    RequestFrame,
    /// Pass finished. Reported exactly once per scheduler.
    Completed,
    /// Nothing to do (stale callback or not running).
    Ignored,
}

pub struct AnimationScheduler {
    state: PlaybackState,
    duration_ms: f64,
}

impl AnimationScheduler {
    pub fn new() -> Self {
        AnimationScheduler {
            state: PlaybackState::Idle,
            duration_ms: 0.0,
        }
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        matches!(self.state, PlaybackState::Running { .. })
    }

    /// Begin a pass. With nothing to play the pass completes immediately
    /// without arming any frame.
    pub fn start(&mut self, duration_ms: f64, has_samples: bool) -> FrameOutcome {
        if self.state != PlaybackState::Idle {
            debug!(state = ?self.state, "scheduler start ignored");
            return FrameOutcome::Ignored;
        }

        if !has_samples {
            self.state = PlaybackState::Completed;
            return FrameOutcome::Completed;
        }

        self.duration_ms = duration_ms;
        self.state = PlaybackState::Running {
            start: None,
            last_progress: 0.0,
        };
        FrameOutcome::RequestFrame
    }

    /// Handle one refresh callback. `render` receives the progress to draw,
    /// clamped to exactly 1.0 on the final frame.
    pub fn on_frame<F: FnMut(f64)>(&mut self, ts: FrameTime, mut render: F) -> FrameOutcome {
        let PlaybackState::Running { start, .. } = self.state else {
            return FrameOutcome::Ignored;
        };

        let start = start.unwrap_or(ts);
        let progress = if self.duration_ms > 0.0 {
            ts.since(start) / self.duration_ms
        } else {
            1.0
        };

        if progress < 1.0 {
            render(progress);
            self.state = PlaybackState::Running {
                start: Some(start),
                last_progress: progress,
            };
            FrameOutcome::RequestFrame
        } else {
            render(1.0);
            self.state = PlaybackState::Completed;
            FrameOutcome::Completed
        }
    }

    /// Teardown only: stop without a final frame or completion.
    /// Returns true if a pending callback must be descheduled.
    pub fn cancel(&mut self) -> bool {
        let was_running = self.is_running();
        if was_running {
            self.state = PlaybackState::Completed;
        }
        was_running
    }
}

impl Default for AnimationScheduler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(v: f64) -> FrameTime {
        FrameTime::from_millis(v)
    }

    #[test]
    fn first_callback_defines_time_zero() {
        let mut scheduler = AnimationScheduler::new();
        assert_eq!(scheduler.start(5000.0, true), FrameOutcome::RequestFrame);

        let mut drawn = Vec::new();
        // Scheduling latency before the first callback must not count.
        scheduler.on_frame(ms(10_000.0), |p| drawn.push(p));
        scheduler.on_frame(ms(12_500.0), |p| drawn.push(p));

        assert_eq!(drawn, vec![0.0, 0.5]);
        assert_eq!(
            scheduler.state(),
            PlaybackState::Running {
                start: Some(ms(10_000.0)),
                last_progress: 0.5
            }
        );
    }

    #[test]
    fn final_frame_is_clamped_and_completes_once() {
        let mut scheduler = AnimationScheduler::new();
        scheduler.start(1000.0, true);
        scheduler.on_frame(ms(0.0), |_| {});

        let mut last = None;
        assert_eq!(
            scheduler.on_frame(ms(1234.0), |p| last = Some(p)),
            FrameOutcome::Completed
        );
        assert_eq!(last, Some(1.0));

        let mut redrawn = false;
        assert_eq!(
            scheduler.on_frame(ms(1300.0), |_| redrawn = true),
            FrameOutcome::Ignored
        );
        assert!(!redrawn);
        assert_eq!(scheduler.start(1000.0, true), FrameOutcome::Ignored);
    }

    #[test]
    fn empty_pass_completes_without_frames() {
        let mut scheduler = AnimationScheduler::new();
        assert_eq!(scheduler.start(5000.0, false), FrameOutcome::Completed);
        assert_eq!(scheduler.state(), PlaybackState::Completed);
        assert_eq!(scheduler.on_frame(ms(1.0), |_| {}), FrameOutcome::Ignored);
    }

    #[test]
    fn cancel_skips_final_frame() {
        let mut scheduler = AnimationScheduler::new();
        scheduler.start(1000.0, true);
        scheduler.on_frame(ms(0.0), |_| {});

        assert!(scheduler.cancel());
        assert!(!scheduler.cancel());

        let mut drawn = false;
        assert_eq!(
            scheduler.on_frame(ms(2000.0), |_| drawn = true),
            FrameOutcome::Ignored
        );
        assert!(!drawn);
    }

    #[test]
    fn frames_before_start_are_ignored() {
        let mut scheduler = AnimationScheduler::new();
        assert_eq!(scheduler.on_frame(ms(5.0), |_| {}), FrameOutcome::Ignored);
        assert_eq!(scheduler.state(), PlaybackState::Idle);
    }
}
