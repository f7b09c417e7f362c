// Logging sink behind the console_log! / console_warn! macros.
//
// In the browser messages go straight to the devtools console. Native builds
// (tests, tooling) emit tracing events instead, so a subscriber can pick them up.

#[cfg(target_arch = "wasm32")]
mod sink {
    use wasm_bindgen::prelude::*;

    #[wasm_bindgen]
    extern "C" {
        // Use `js_namespace` to bind `console.log(..)` instead of just `log(..)`
        #[wasm_bindgen(js_namespace = console)]
        pub fn log(s: &str);

        #[wasm_bindgen(js_namespace = console)]
        pub fn warn(s: &str);
    }
}

#[cfg(not(target_arch = "wasm32"))]
mod sink {
    pub fn log(s: &str) {
        tracing::info!(target: "walkshed", "{}", s);
    }

    pub fn warn(s: &str) {
        tracing::warn!(target: "walkshed", "{}", s);
    }
}

pub use sink::{log, warn};
