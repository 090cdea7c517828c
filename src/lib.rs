// pursuit_core: trajectory playback + front-camera capture engine.
// All timing and failure decisions live here; JS performs the effects it is handed.
// See DESIGN.md for the module map.

mod capture;
mod error;
mod interpolate;
mod mapper;
mod notify;
mod render;
mod scheduler;
mod session;
mod trajectory;
mod transport;
mod types;

use wasm_bindgen::prelude::*;

pub use capture::{
    AcquireFailure, AcquireRequest, Artifact, CaptureController, CaptureState, FinalizeOutcome,
};
pub use error::{CaptureError, EngineError};
pub use interpolate::position_at;
pub use mapper::map;
pub use notify::{CompletionMessage, HostNotifier, NotifierSet};
pub use render::{DrawList, DrawOp, DrawSurface, Renderer};
pub use scheduler::{AnimationScheduler, FrameOutcome, PlaybackState};
pub use session::{Effect, Phase, Session, SessionEvent};
pub use trajectory::{parse_response, Trajectory, TrajectoryStore};
pub use transport::{check_upload_response, resolve_token, FetchRequest, UploadForm};
pub use types::*;

/// Initialize panic hook for better error messages in browser console.
#[wasm_bindgen(start)]
pub fn init() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
}

/// Host notification channel backed by a JS callback.
/// The callback receives the completion message as a JSON string.
struct JsNotifier {
    name: String,
    callback: js_sys::Function,
}

impl HostNotifier for JsNotifier {
    fn name(&self) -> &str {
        &self.name
    }

    fn notify(&self, message: &CompletionMessage) -> Result<(), String> {
        self.callback
            .call1(&JsValue::NULL, &JsValue::from_str(&message.to_json()))
            .map(|_| ())
            .map_err(|e| e.as_string().unwrap_or_else(|| "callback threw".to_string()))
    }
}

/// Session interface exposed to JavaScript.
/// Events go in as JSON, effects come back as a JSON array.
#[wasm_bindgen]
pub struct WasmSession {
    inner: Session,
    artifact: Option<Vec<u8>>,
}

#[wasm_bindgen]
impl WasmSession {
    #[wasm_bindgen(constructor)]
    pub fn new(config_json: &str) -> Result<WasmSession, JsValue> {
        let config: SessionConfig = serde_json::from_str(config_json)
            .map_err(|e| JsValue::from_str(&format!("Invalid config: {}", e)))?;
        let inner = Session::new(config, NotifierSet::new())
            .map_err(|e| JsValue::from_str(&e.to_string()))?;

        Ok(WasmSession {
            inner,
            artifact: None,
        })
    }

    /// Register a host bridge (e.g. a webview message handler).
    pub fn add_host_notifier(&mut self, name: &str, callback: js_sys::Function) {
        self.inner.add_notifier(Box::new(JsNotifier {
            name: name.to_string(),
            callback,
        }));
    }

    pub fn start(&mut self) -> Result<String, JsValue> {
        let effects = self.inner.start();
        self.encode(effects)
    }

    /// Feed one event, e.g. `{"type":"animation_frame","data":16.7}`.
    pub fn handle_event(&mut self, event_json: &str) -> Result<String, JsValue> {
        let event: SessionEvent = serde_json::from_str(event_json)
            .map_err(|e| JsValue::from_str(&format!("Invalid event: {}", e)))?;
        let effects = self.inner.handle(event);
        self.encode(effects)
    }

    /// Binary recorder segment, delivered without a JSON round-trip.
    pub fn push_recorder_chunk(&mut self, chunk: Vec<u8>) -> Result<String, JsValue> {
        let effects = self.inner.handle(SessionEvent::RecorderData(chunk));
        self.encode(effects)
    }

    /// Recording bytes for the pending `upload` effect.
    pub fn take_artifact(&mut self) -> Option<Vec<u8>> {
        self.artifact.take()
    }

    pub fn teardown(&mut self) -> Result<String, JsValue> {
        let effects = self.inner.teardown();
        self.encode(effects)
    }

    /// Terminal outcome name once the session has completed.
    pub fn outcome(&self) -> Option<String> {
        self.inner
            .outcome()
            .and_then(|o| serde_json::to_value(o).ok())
            .and_then(|v| v.as_str().map(str::to_string))
    }

    fn encode(&mut self, effects: Vec<Effect>) -> Result<String, JsValue> {
        for effect in &effects {
            if let Effect::Upload(form) = effect {
                self.artifact = Some(form.video.bytes().to_vec());
            }
        }
        serde_json::to_string(&effects)
            .map_err(|e| JsValue::from_str(&format!("Serialization error: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(session: &mut WasmSession, json: &str) -> serde_json::Value {
        let out = session.handle_event(json).unwrap();
        serde_json::from_str(&out).unwrap()
    }

    #[test]
    fn session_creation_works() {
        let session = WasmSession::new(r#"{"playback_duration_ms":2000}"#);
        assert!(session.is_ok());
    }

    #[test]
    fn effects_round_trip_through_json() {
        let mut session = WasmSession::new("{}").unwrap();
        let started: serde_json::Value = serde_json::from_str(&session.start().unwrap()).unwrap();
        assert_eq!(started[0]["type"], "fetch_trajectory");
        assert_eq!(started[0]["data"]["url"], "/api/get_trajectory");

        let loaded = event(
            &mut session,
            r#"{"type":"trajectory_loaded","data":"{\"trajectory\":[{\"x\":0,\"y\":0},{\"x\":1,\"y\":1}]}"}"#,
        );
        assert_eq!(loaded[0]["type"], "draw");
        assert_eq!(loaded[1]["type"], "show_instructions");
        assert_eq!(loaded[2]["data"]["timer"], "instruction_dwell");

        let dwell = event(&mut session, r#"{"type":"timer_fired","data":"instruction_dwell"}"#);
        assert_eq!(dwell[1]["type"], "acquire_camera");
        assert_eq!(dwell[1]["data"]["strategy"], "standard");
        assert_eq!(dwell[1]["data"]["constraints"]["audio"], false);

        let acquired = event(&mut session, r#"{"type":"camera_acquired","data":3}"#);
        assert_eq!(acquired[0]["type"], "start_recorder");
        assert_eq!(acquired[1]["type"], "request_frame");

        event(&mut session, r#"{"type":"animation_frame","data":0}"#);
        assert_eq!(session.push_recorder_chunk(vec![1, 2]).unwrap(), "[]");
        let done = event(&mut session, r#"{"type":"animation_frame","data":5000}"#);
        assert_eq!(done[1]["type"], "stop_recorder");

        let stopped = event(&mut session, r#"{"type":"recorder_stopped"}"#);
        assert_eq!(stopped[0]["type"], "release_camera");
        assert_eq!(stopped[1]["type"], "upload");
        assert_eq!(stopped[1]["data"]["video"]["size"], 2);
        assert_eq!(session.take_artifact(), Some(vec![1, 2]));
        assert_eq!(session.take_artifact(), None);

        event(&mut session, r#"{"type":"upload_finished","data":"{\"status\":\"success\"}"}"#);
        assert_eq!(session.outcome(), None);
        event(&mut session, r#"{"type":"timer_fired","data":"completion_grace"}"#);
        assert_eq!(session.outcome(), Some("uploaded".to_string()));
    }
}
