// Camera acquisition and recording session state machine.
// Idle -> Acquiring -> Recording -> Stopping -> Finalized, with Failed absorbing.
// The camera stream is released exactly once, whatever path the session takes.
// See DESIGN.md: Capture Controller

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::CaptureError;
use crate::types::{CaptureConstraints, CaptureStrategy, StreamHandle};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CaptureState {
    Idle,
    Acquiring,
    Recording,
    Stopping,
    Finalized,
    Failed,
}

impl CaptureState {
    fn name(&self) -> &'static str {
        match self {
            CaptureState::Idle => "idle",
            CaptureState::Acquiring => "acquiring",
            CaptureState::Recording => "recording",
            CaptureState::Stopping => "stopping",
            CaptureState::Finalized => "finalized",
            CaptureState::Failed => "failed",
        }
    }
}

/// Why a single acquisition attempt was rejected by the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "message", rename_all = "snake_case")]
pub enum AcquireFailure {
    /// The strategy's API is absent in this environment.
    Unsupported,
    PermissionDenied,
    DeviceError(String),
}

/// One acquisition attempt for the host to perform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AcquireRequest {
    pub strategy: CaptureStrategy,
    pub constraints: CaptureConstraints,
}

/// Finalized recording. Bytes stay on the Rust side of JSON boundaries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Artifact {
    #[serde(skip)]
    bytes: Vec<u8>,
    pub size: usize,
    pub mime_type: String,
}

impl Artifact {
    pub fn new(bytes: Vec<u8>, mime_type: impl Into<String>) -> Self {
        Artifact {
            size: bytes.len(),
            bytes,
            mime_type: mime_type.into(),
        }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

/// Result of finalization. An empty recording is a valid terminal state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FinalizeOutcome {
    Artifact(Artifact),
    Empty,
}

pub struct CaptureController {
    state: CaptureState,
    strategies: Vec<CaptureStrategy>,
    next_strategy: usize,
    constraints: CaptureConstraints,
    stream: Option<StreamHandle>,
    chunks: Vec<Vec<u8>>,
    mime_type: String,
}

impl CaptureController {
    pub fn new(strategies: Vec<CaptureStrategy>, mime_type: impl Into<String>) -> Self {
        CaptureController {
            state: CaptureState::Idle,
            strategies,
            next_strategy: 0,
            constraints: CaptureConstraints::default(),
            stream: None,
            chunks: Vec::new(),
            mime_type: mime_type.into(),
        }
    }

    pub fn state(&self) -> CaptureState {
        self.state
    }

    pub fn stream(&self) -> Option<StreamHandle> {
        self.stream
    }

    /// Request a front-facing, video-only stream using the first strategy.
    pub fn acquire(&mut self) -> Result<AcquireRequest, CaptureError> {
        self.require(CaptureState::Idle, "acquire")?;
        self.state = CaptureState::Acquiring;
        self.next_attempt()
    }

    pub fn on_acquired(&mut self, stream: StreamHandle) -> Result<(), CaptureError> {
        self.require(CaptureState::Acquiring, "on_acquired")?;
        info!(stream = stream.as_u32(), "camera stream acquired");
        self.stream = Some(stream);
        Ok(())
    }

    /// An attempt failed. Unsupported strategies fall through to the next one;
    /// a rejected request is terminal.
    pub fn on_acquire_failed(
        &mut self,
        failure: AcquireFailure,
    ) -> Result<AcquireRequest, CaptureError> {
        self.require(CaptureState::Acquiring, "on_acquire_failed")?;
        match failure {
            AcquireFailure::Unsupported => self.next_attempt(),
            AcquireFailure::PermissionDenied => {
                self.state = CaptureState::Failed;
                Err(CaptureError::PermissionDenied)
            }
            AcquireFailure::DeviceError(message) => {
                self.state = CaptureState::Failed;
                Err(CaptureError::DeviceError(message))
            }
        }
    }

    /// Begin buffering segments. Requires a successfully acquired stream.
    pub fn start_recording(&mut self) -> Result<StreamHandle, CaptureError> {
        self.require(CaptureState::Acquiring, "start_recording")?;
        let stream = self.stream.ok_or(CaptureError::InvalidState {
            operation: "start_recording",
            state: "acquiring without stream",
        })?;
        self.state = CaptureState::Recording;
        Ok(stream)
    }

    /// Append a segment in arrival order. Zero-length segments are dropped.
    pub fn on_data(&mut self, chunk: Vec<u8>) -> bool {
        if !matches!(self.state, CaptureState::Recording | CaptureState::Stopping) {
            debug!(state = self.state.name(), "recorder data outside recording dropped");
            return false;
        }
        if chunk.is_empty() {
            return false;
        }
        self.chunks.push(chunk);
        true
    }

    pub fn stop_recording(&mut self) -> Result<(), CaptureError> {
        self.require(CaptureState::Recording, "stop_recording")?;
        self.state = CaptureState::Stopping;
        Ok(())
    }

    /// Recorder reported stopped. Returns the stream to release.
    pub fn on_stopped(&mut self) -> Option<StreamHandle> {
        self.release()
    }

    /// Concatenate buffered segments in arrival order.
    pub fn finalize(&mut self) -> Result<FinalizeOutcome, CaptureError> {
        self.require(CaptureState::Stopping, "finalize")?;
        self.state = CaptureState::Finalized;

        let chunks = std::mem::take(&mut self.chunks);
        if chunks.is_empty() {
            return Ok(FinalizeOutcome::Empty);
        }
        Ok(FinalizeOutcome::Artifact(Artifact::new(
            chunks.concat(),
            self.mime_type.clone(),
        )))
    }

    /// Recorder absent or errored. Moves to Failed and returns the stream to release.
    pub fn fail(&mut self) -> Option<StreamHandle> {
        self.state = CaptureState::Failed;
        self.chunks.clear();
        self.release()
    }

    /// Hand back the held stream. Yields it at most once.
    pub fn release(&mut self) -> Option<StreamHandle> {
        let stream = self.stream.take();
        if let Some(stream) = stream {
            info!(stream = stream.as_u32(), "camera stream released");
        }
        stream
    }

    fn next_attempt(&mut self) -> Result<AcquireRequest, CaptureError> {
        match self.strategies.get(self.next_strategy) {
            Some(&strategy) => {
                self.next_strategy += 1;
                Ok(AcquireRequest {
                    strategy,
                    constraints: self.constraints.clone(),
                })
            }
            None => {
                self.state = CaptureState::Failed;
                Err(CaptureError::DeviceUnavailable)
            }
        }
    }

    fn require(&self, state: CaptureState, operation: &'static str) -> Result<(), CaptureError> {
        if self.state == state {
            Ok(())
        } else {
            Err(CaptureError::InvalidState {
                operation,
                state: self.state.name(),
            })
        }
    }
}
