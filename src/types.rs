// Strong typing over strings. Newtypes for frame timestamps, stream handles, and pixel units.
// See DESIGN.md: Data Model

use serde::{Deserialize, Serialize};

/// Display-refresh timestamp in milliseconds. Newtype for type safety.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize, Default)]
pub struct FrameTime(f64);

impl FrameTime {
    pub fn from_millis(ms: f64) -> Self {
        FrameTime(ms)
    }

    pub fn as_millis(&self) -> f64 {
        self.0
    }

    /// Milliseconds elapsed since `earlier`. Never negative.
    pub fn since(&self, earlier: FrameTime) -> f64 {
        (self.0 - earlier.0).max(0.0)
    }
}

/// Host-side identifier of an acquired camera stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StreamHandle(u32);

impl StreamHandle {
    pub fn new(id: u32) -> Self {
        StreamHandle(id)
    }

    pub fn as_u32(&self) -> u32 {
        self.0
    }
}

/// Normalized trajectory sample: origin-centered, y-up, each axis in [-1, 1].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct TrajectoryPoint {
    pub x: f64,
    pub y: f64,
}

impl TrajectoryPoint {
    pub fn new(x: f64, y: f64) -> Self {
        TrajectoryPoint {
            x: x.clamp(-1.0, 1.0),
            y: y.clamp(-1.0, 1.0),
        }
    }

    pub fn origin() -> Self {
        TrajectoryPoint { x: 0.0, y: 0.0 }
    }
}

/// Pixel coordinate on the drawing surface (y grows downward).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct PixelCoord {
    pub x: f64,
    pub y: f64,
}

impl PixelCoord {
    pub fn new(x: f64, y: f64) -> Self {
        PixelCoord { x, y }
    }
}

/// Current drawing-surface size. Recomputed by the host on resize.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SurfaceGeometry {
    pub width: f64,
    pub height: f64,
    #[serde(default = "default_margin_px")]
    pub margin_px: f64,
}

impl SurfaceGeometry {
    pub fn new(width: f64, height: f64, margin_px: f64) -> Self {
        SurfaceGeometry {
            width,
            height,
            margin_px,
        }
    }

    pub fn center(&self) -> PixelCoord {
        PixelCoord::new(self.width / 2.0, self.height / 2.0)
    }

    /// Pixel distance that a normalized ±1 reaches on each axis.
    pub fn half_extent(&self) -> (f64, f64) {
        (
            (self.width / 2.0 - self.margin_px).max(0.0),
            (self.height / 2.0 - self.margin_px).max(0.0),
        )
    }
}

impl Default for SurfaceGeometry {
    fn default() -> Self {
        SurfaceGeometry {
            width: 800.0,
            height: 600.0,
            margin_px: default_margin_px(),
        }
    }
}

fn default_margin_px() -> f64 {
    40.0
}

/// Ordered camera acquisition strategies, tried until one succeeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaptureStrategy {
    /// `navigator.mediaDevices.getUserMedia`.
    Standard,
    /// Prefixed `navigator.getUserMedia` variants.
    Legacy,
}

/// Stream constraints handed to the host with every acquisition attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureConstraints {
    pub facing_mode: String,
    pub audio: bool,
}

impl Default for CaptureConstraints {
    fn default() -> Self {
        CaptureConstraints {
            facing_mode: "user".to_string(),
            audio: false,
        }
    }
}

/// Host timers the session arms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Timer {
    /// Instruction overlay dwell before playback.
    InstructionDwell,
    /// Settling delay before host notification.
    CompletionGrace,
}

/// Terminal result of a session, reported to host notifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionOutcome {
    /// Recording uploaded and acknowledged.
    Uploaded,
    /// Capture ran but produced no media.
    NoRecording,
    /// Camera or recorder unavailable; playback ran without capture.
    CaptureFailed,
    /// Upload rejected or failed in transit.
    UploadFailed,
}

impl SessionOutcome {
    /// Failure outcomes settle on the longer grace delay.
    pub fn is_failure(&self) -> bool {
        matches!(self, SessionOutcome::CaptureFailed | SessionOutcome::UploadFailed)
    }
}

/// One harmonic term of the remote path generator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Coefficient {
    pub amplitude: f64,
    pub frequency: f64,
    pub phase: f64,
}

/// Options forwarded to the trajectory service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrajectoryRequest {
    #[serde(default = "default_num_points")]
    pub num_points: u32,
    #[serde(default = "default_time_range")]
    pub time_range: f64,
    #[serde(default = "default_num_coefficients")]
    pub num_coefficients: u32,
    #[serde(default = "default_base_amplitude")]
    pub base_amplitude: f64,
    #[serde(default)]
    pub coefficients: Vec<Coefficient>,
}

impl Default for TrajectoryRequest {
    fn default() -> Self {
        TrajectoryRequest {
            num_points: default_num_points(),
            time_range: default_time_range(),
            num_coefficients: default_num_coefficients(),
            base_amplitude: default_base_amplitude(),
            coefficients: Vec::new(),
        }
    }
}

fn default_num_points() -> u32 {
    100
}

fn default_time_range() -> f64 {
    std::f64::consts::TAU
}

fn default_num_coefficients() -> u32 {
    5
}

fn default_base_amplitude() -> f64 {
    1.0
}

/// Canvas styling for the path and marker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderStyle {
    #[serde(default = "default_background")]
    pub background: String,
    #[serde(default = "default_path_color")]
    pub path_color: String,
    #[serde(default = "default_path_width")]
    pub path_width: f64,
    #[serde(default = "default_marker_color")]
    pub marker_color: String,
    #[serde(default = "default_marker_radius")]
    pub marker_radius: f64,
}

impl Default for RenderStyle {
    fn default() -> Self {
        RenderStyle {
            background: default_background(),
            path_color: default_path_color(),
            path_width: default_path_width(),
            marker_color: default_marker_color(),
            marker_radius: default_marker_radius(),
        }
    }
}

fn default_background() -> String {
    "#ffffff".to_string()
}

fn default_path_color() -> String {
    "rgba(0, 0, 0, 0.15)".to_string()
}

fn default_path_width() -> f64 {
    2.0
}

fn default_marker_color() -> String {
    "#e53935".to_string()
}

fn default_marker_radius() -> f64 {
    12.0
}

/// Session configuration passed from JS.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Prefix for the trajectory and upload endpoints.
    #[serde(default)]
    pub api_base: String,
    /// Token injected by the embedding host page.
    #[serde(default)]
    pub host_token: Option<String>,
    /// Token taken from the session's launch parameters.
    #[serde(default)]
    pub launch_token: Option<String>,
    #[serde(default = "default_playback_duration")]
    pub playback_duration_ms: f64,
    #[serde(default = "default_instruction_dwell")]
    pub instruction_dwell_ms: u32,
    #[serde(default = "default_success_grace")]
    pub success_grace_ms: u32,
    #[serde(default = "default_failure_grace")]
    pub failure_grace_ms: u32,
    #[serde(default)]
    pub geometry: SurfaceGeometry,
    #[serde(default)]
    pub style: RenderStyle,
    #[serde(default = "default_mime_type")]
    pub recording_mime_type: String,
    #[serde(default = "default_strategies")]
    pub capture_strategies: Vec<CaptureStrategy>,
    #[serde(default)]
    pub trajectory_request: TrajectoryRequest,
}

impl Default for SessionConfig {
    fn default() -> Self {
        SessionConfig {
            api_base: String::new(),
            host_token: None,
            launch_token: None,
            playback_duration_ms: default_playback_duration(),
            instruction_dwell_ms: default_instruction_dwell(),
            success_grace_ms: default_success_grace(),
            failure_grace_ms: default_failure_grace(),
            geometry: SurfaceGeometry::default(),
            style: RenderStyle::default(),
            recording_mime_type: default_mime_type(),
            capture_strategies: default_strategies(),
            trajectory_request: TrajectoryRequest::default(),
        }
    }
}

fn default_playback_duration() -> f64 {
    5000.0
}

fn default_instruction_dwell() -> u32 {
    3000
}

fn default_success_grace() -> u32 {
    500
}

fn default_failure_grace() -> u32 {
    2000
}

fn default_mime_type() -> String {
    "video/webm".to_string()
}

fn default_strategies() -> Vec<CaptureStrategy> {
    vec![CaptureStrategy::Standard, CaptureStrategy::Legacy]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_time_since_never_negative() {
        let start = FrameTime::from_millis(1000.0);
        assert_eq!(FrameTime::from_millis(3500.0).since(start), 2500.0);
        assert_eq!(FrameTime::from_millis(900.0).since(start), 0.0);
    }

    #[test]
    fn trajectory_point_clamps() {
        let p = TrajectoryPoint::new(1.5, -2.0);
        assert_eq!(p.x, 1.0);
        assert_eq!(p.y, -1.0);
    }

    #[test]
    fn half_extent_subtracts_margin() {
        let g = SurfaceGeometry::new(800.0, 600.0, 40.0);
        assert_eq!(g.half_extent(), (360.0, 260.0));
        let tiny = SurfaceGeometry::new(50.0, 50.0, 40.0);
        assert_eq!(tiny.half_extent(), (0.0, 0.0));
    }

    #[test]
    fn empty_config_uses_defaults() {
        let config: SessionConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.playback_duration_ms, 5000.0);
        assert_eq!(config.trajectory_request.num_points, 100);
        assert_eq!(
            config.capture_strategies,
            vec![CaptureStrategy::Standard, CaptureStrategy::Legacy]
        );
        assert!(config.host_token.is_none());
    }

    #[test]
    fn outcome_serializes_snake_case() {
        let json = serde_json::to_string(&SessionOutcome::NoRecording).unwrap();
        assert_eq!(json, "\"no_recording\"");
        assert!(SessionOutcome::UploadFailed.is_failure());
        assert!(!SessionOutcome::Uploaded.is_failure());
    }
}
