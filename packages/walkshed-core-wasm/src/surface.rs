// Boundary to the map rendering library. Everything the core wants drawn goes
// through `MapSurface`; the browser build forwards to a JS object.
use serde::Serialize;
use wasm_bindgen::prelude::*;

use crate::console_warn;
use crate::feature_state::FeatureFlags;
use crate::feedback::FeedbackBlock;
use crate::models::{FeatureCollection, FeatureId};
use crate::threshold::FilterExpression;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorStyle {
    Pointer,
    Default,
}

impl CursorStyle {
    pub fn as_css(&self) -> &'static str {
        match self {
            CursorStyle::Pointer => "pointer",
            CursorStyle::Default => "",
        }
    }
}

pub trait MapSurface {
    /// Replace a source's data wholesale.
    fn set_source_data(&self, source: &str, data: &FeatureCollection);
    fn set_feature_state(&self, source: &str, id: FeatureId, flags: FeatureFlags);
    fn set_filter(&self, layer: &str, filter: &FilterExpression);
    fn set_cursor(&self, cursor: CursorStyle);
    fn show_feedback(&self, block: &FeedbackBlock);
    fn hide_feedback(&self);
}

#[wasm_bindgen]
extern "C" {
    /// Object supplied by the page that owns the map instance.
    pub type MapSurfaceHandle;

    #[wasm_bindgen(method, js_name = setSourceData)]
    fn set_source_data(this: &MapSurfaceHandle, source: &str, data: JsValue);

    #[wasm_bindgen(method, js_name = setFeatureState)]
    fn set_feature_state(this: &MapSurfaceHandle, source: &str, id: f64, state: JsValue);

    #[wasm_bindgen(method, js_name = setFilter)]
    fn set_filter(this: &MapSurfaceHandle, layer: &str, filter: JsValue);

    #[wasm_bindgen(method, js_name = setCursor)]
    fn set_cursor(this: &MapSurfaceHandle, cursor: &str);

    #[wasm_bindgen(method, js_name = showFeedback)]
    fn show_feedback(this: &MapSurfaceHandle, block: JsValue);

    #[wasm_bindgen(method, js_name = hideFeedback)]
    fn hide_feedback(this: &MapSurfaceHandle);
}

/// `MapSurface` backed by the page's handle object.
pub struct JsMapSurface {
    handle: MapSurfaceHandle,
}

impl JsMapSurface {
    pub fn new(handle: MapSurfaceHandle) -> Self {
        Self { handle }
    }

    // Maps must arrive as plain objects for the map library's style engine.
    fn to_js<T: Serialize + ?Sized>(value: &T) -> Option<JsValue> {
        let serializer = serde_wasm_bindgen::Serializer::json_compatible();
        match value.serialize(&serializer) {
            Ok(js) => Some(js),
            Err(err) => {
                console_warn!("Could not convert value for the map: {}", err);
                None
            }
        }
    }
}

impl MapSurface for JsMapSurface {
    fn set_source_data(&self, source: &str, data: &FeatureCollection) {
        if let Some(js) = Self::to_js(data) {
            self.handle.set_source_data(source, js);
        }
    }

    fn set_feature_state(&self, source: &str, id: FeatureId, flags: FeatureFlags) {
        if let Some(js) = Self::to_js(&flags) {
            self.handle.set_feature_state(source, id as f64, js);
        }
    }

    fn set_filter(&self, layer: &str, filter: &FilterExpression) {
        if let Some(js) = Self::to_js(filter) {
            self.handle.set_filter(layer, js);
        }
    }

    fn set_cursor(&self, cursor: CursorStyle) {
        self.handle.set_cursor(cursor.as_css());
    }

    fn show_feedback(&self, block: &FeedbackBlock) {
        if let Some(js) = Self::to_js(block) {
            self.handle.show_feedback(js);
        }
    }

    fn hide_feedback(&self) {
        self.handle.hide_feedback();
    }
}
