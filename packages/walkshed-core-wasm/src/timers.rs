// One-shot `setTimeout` for the debounce and playback timers. The state
// machines decide whether a fired timer still matters; nothing here cancels.
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;

pub fn set_timeout<F>(delay_ms: u32, callback: F) -> Result<i32, JsValue>
where
    F: FnOnce() + 'static,
{
    let window = web_sys::window().ok_or_else(|| JsValue::from_str("no global window"))?;
    let callback = Closure::once_into_js(callback);
    window.set_timeout_with_callback_and_timeout_and_arguments_0(
        callback.unchecked_ref(),
        delay_ms as i32,
    )
}
