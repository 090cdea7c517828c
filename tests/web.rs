// Browser-side checks for the JS-facing session. Run with `wasm-pack test --headless --chrome`.
#![cfg(target_arch = "wasm32")]

use js_sys::{Function, Reflect};
use pursuit_core::WasmSession;
use wasm_bindgen::JsValue;
use wasm_bindgen_test::*;

wasm_bindgen_test_configure!(run_in_browser);

fn run_to_completion(session: &mut WasmSession) {
    session.start().unwrap();
    session
        .handle_event(r#"{"type":"trajectory_loaded","data":"{\"trajectory\":[]}"}"#)
        .unwrap();
    session
        .handle_event(r#"{"type":"timer_fired","data":"instruction_dwell"}"#)
        .unwrap();
    session
        .handle_event(r#"{"type":"camera_failed","data":{"kind":"permission_denied"}}"#)
        .unwrap();
    session
        .handle_event(r#"{"type":"timer_fired","data":"completion_grace"}"#)
        .unwrap();
}

#[wasm_bindgen_test]
fn host_notifier_receives_completion_json() {
    let mut session = WasmSession::new("{}").unwrap();
    let callback = Function::new_with_args("msg", "globalThis.__pursuitCompletion = msg;");
    session.add_host_notifier("bridge", callback);

    run_to_completion(&mut session);

    let delivered = Reflect::get(&js_sys::global(), &JsValue::from_str("__pursuitCompletion"))
        .unwrap()
        .as_string()
        .unwrap();
    assert_eq!(
        delivered,
        r#"{"type":"session_complete","outcome":"capture_failed"}"#
    );
    assert_eq!(session.outcome(), Some("capture_failed".to_string()));
}

#[wasm_bindgen_test]
fn throwing_notifier_is_swallowed() {
    let mut session = WasmSession::new("{}").unwrap();
    session.add_host_notifier("broken", Function::new_no_args("throw new Error('gone');"));

    run_to_completion(&mut session);

    assert_eq!(session.outcome(), Some("capture_failed".to_string()));
}

#[wasm_bindgen_test]
fn invalid_config_is_rejected() {
    assert!(WasmSession::new(r#"{"playback_duration_ms":-1}"#).is_err());
    assert!(WasmSession::new("not json").is_err());
}
