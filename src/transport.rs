// Request/response shapes for the trajectory service and the recording upload.
// The host performs the HTTP calls; this module only builds and checks payloads.
// See DESIGN.md: External Interfaces

use serde::{Deserialize, Serialize};

use crate::capture::Artifact;
use crate::error::EngineError;
use crate::trajectory::Trajectory;
use crate::types::TrajectoryRequest;

pub const TRAJECTORY_ENDPOINT: &str = "/api/get_trajectory";
pub const UPLOAD_ENDPOINT: &str = "/api/analyze";

/// Multipart field names expected by the analysis endpoint.
pub const VIDEO_FIELD: &str = "video";
pub const TRAJECTORY_FIELD: &str = "trajectory";
pub const TOKEN_FIELD: &str = "token";

const RECORDING_LABEL: &str = "trajectory_recording";

/// Trajectory fetch: POST `body` as JSON to `url`, with `token` as a query parameter when set.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FetchRequest {
    pub url: String,
    pub body: TrajectoryRequest,
    pub token: Option<String>,
}

impl FetchRequest {
    pub fn new(api_base: &str, body: TrajectoryRequest, token: Option<String>) -> Self {
        FetchRequest {
            url: endpoint(api_base, TRAJECTORY_ENDPOINT),
            body,
            token,
        }
    }
}

/// Multipart upload of the recording plus the trajectory that was shown.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UploadForm {
    pub url: String,
    pub video: Artifact,
    pub filename: String,
    pub trajectory: String,
    pub token: Option<String>,
}

impl UploadForm {
    pub fn new(
        api_base: &str,
        video: Artifact,
        trajectory: &Trajectory,
        token: Option<String>,
    ) -> Result<Self, EngineError> {
        Ok(UploadForm {
            url: endpoint(api_base, UPLOAD_ENDPOINT),
            filename: recording_filename(&video.mime_type),
            video,
            trajectory: trajectory.to_json()?,
            token,
        })
    }
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    status: String,
}

/// Accept only a JSON body reporting `"status": "success"`.
pub fn check_upload_response(body: &str) -> Result<(), EngineError> {
    let response: UploadResponse = serde_json::from_str(body)
        .map_err(|e| EngineError::Upload(format!("unreadable response: {}", e)))?;
    if response.status == "success" {
        Ok(())
    } else {
        Err(EngineError::Upload(format!(
            "server reported status {:?}",
            response.status
        )))
    }
}

/// Host-injected token wins over the launch parameter. Empty means absent.
pub fn resolve_token(host_token: Option<&str>, launch_token: Option<&str>) -> Option<String> {
    [host_token, launch_token]
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|t| !t.is_empty())
        .map(str::to_string)
}

fn endpoint(api_base: &str, path: &str) -> String {
    format!("{}{}", api_base.trim_end_matches('/'), path)
}

fn recording_filename(mime_type: &str) -> String {
    let extension = mime_type
        .split('/')
        .nth(1)
        .and_then(|subtype| subtype.split(';').next())
        .map(str::trim)
        .filter(|ext| !ext.is_empty())
        .unwrap_or("webm");
    format!("{}.{}", RECORDING_LABEL, extension)
}
