// Typed errors with thiserror. Surface meaningful messages to JS.
// See DESIGN.md: Error Handling

use thiserror::Error;

/// Engine error types.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Trajectory load failed: {0}")]
    FatalLoad(String),

    #[error("Camera acquisition failed: {0}")]
    CaptureAcquisition(#[from] CaptureError),

    #[error("Upload failed: {0}")]
    Upload(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for EngineError {
    fn from(err: serde_json::Error) -> Self {
        EngineError::Serialization(err.to_string())
    }
}

/// Capture controller failures.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CaptureError {
    #[error("no capture capability available")]
    DeviceUnavailable,

    #[error("camera permission denied")]
    PermissionDenied,

    #[error("camera device error: {0}")]
    DeviceError(String),

    #[error("{operation} not allowed while {state}")]
    InvalidState {
        operation: &'static str,
        state: &'static str,
    },
}
