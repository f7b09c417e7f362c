use std::rc::Rc;

use js_sys::Promise;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::future_to_promise;

// Create a console module for logging
pub mod console;
pub mod error;
pub mod config;
pub mod models;
// Geometry/box intersection for sources without a spatial index
mod bbox_filter;
pub mod fgb_decoder;
pub mod feature_source;
pub mod static_layers;
pub mod feature_state;
pub mod surface;
pub mod viewport;
pub mod selection;
pub mod routes;
pub mod threshold;
pub mod feedback;
pub mod controller;
#[cfg(target_arch = "wasm32")]
mod timers;

use config::MapConfig;
use controller::MapController;
use feature_source::JsFetcher;
use feedback::ScreenPoint;
use models::{BoundingBox, FeatureId, Properties};
use selection::ClickOutcome;
use surface::{JsMapSurface, MapSurfaceHandle};

// Enable better panic messages in console during development
#[cfg(feature = "console_error_panic_hook")]
pub use console_error_panic_hook::set_once as set_panic_hook;

#[macro_export]
macro_rules! console_log {
    ($($t:tt)*) => ($crate::console::log(&format!($($t)*)))
}

#[macro_export]
macro_rules! console_warn {
    ($($t:tt)*) => ($crate::console::warn(&format!($($t)*)))
}

use std::sync::Once;
static INIT: Once = Once::new();

#[wasm_bindgen(start)]
pub fn start() {
    INIT.call_once(|| {
        #[cfg(feature = "console_error_panic_hook")]
        console_error_panic_hook::set_once();

        console_log!("walkshed core initialized");
    });
}

type JsController = MapController<JsFetcher, JsMapSurface>;

fn feature_id(id: f64) -> Result<FeatureId, JsValue> {
    if id.is_finite() && id >= 0.0 && id.fract() == 0.0 {
        Ok(id as FeatureId)
    } else {
        Err(JsValue::from_str(&format!("invalid feature id: {}", id)))
    }
}

fn properties(value: JsValue) -> Result<Properties, JsValue> {
    if value.is_undefined() || value.is_null() {
        return Ok(Properties::new());
    }
    Ok(serde_wasm_bindgen::from_value(value)?)
}

/// The interactive parcel map, driven by events from the page.
#[wasm_bindgen]
pub struct WalkshedMap {
    inner: Rc<JsController>,
}

#[wasm_bindgen]
impl WalkshedMap {
    /// `config` is a plain object (every field optional); `surface` is the
    /// page object that forwards to the map instance.
    #[wasm_bindgen(constructor)]
    pub fn new(config: JsValue, surface: MapSurfaceHandle) -> Result<WalkshedMap, JsValue> {
        start();
        let config: MapConfig = if config.is_undefined() || config.is_null() {
            MapConfig::default()
        } else {
            serde_wasm_bindgen::from_value(config)?
        };
        Ok(WalkshedMap {
            inner: Rc::new(MapController::new(
                config,
                JsFetcher,
                JsMapSurface::new(surface),
            )),
        })
    }

    #[wasm_bindgen(js_name = initialLoad)]
    pub fn initial_load(&self) -> Promise {
        let inner = self.inner.clone();
        future_to_promise(async move {
            inner.initial_load().await;
            Ok(JsValue::UNDEFINED)
        })
    }

    /// Resolves to whether the result was applied.
    #[wasm_bindgen(js_name = onViewportChange)]
    pub fn on_viewport_change(&self, west: f64, south: f64, east: f64, north: f64) -> Promise {
        let inner = self.inner.clone();
        let bbox = BoundingBox::new(west, south, east, north);
        future_to_promise(async move {
            let applied = inner.on_viewport_change(bbox).await;
            Ok(JsValue::from_bool(applied))
        })
    }

    #[wasm_bindgen(js_name = onHoverEnter)]
    pub fn on_hover_enter(
        &self,
        id: f64,
        screen_x: f64,
        screen_y: f64,
        properties: JsValue,
    ) -> Result<(), JsValue> {
        let id = feature_id(id)?;
        let properties = self::properties(properties)?;
        self.inner.on_hover_enter(
            id,
            ScreenPoint {
                x: screen_x,
                y: screen_y,
            },
            &properties,
        );
        Ok(())
    }

    #[wasm_bindgen(js_name = onHoverLeave)]
    pub fn on_hover_leave(&self) {
        self.inner.on_hover_leave();
    }

    /// Resolves to `"ignored"`, `"deselected"` or `"selected"`.
    #[wasm_bindgen(js_name = onClick)]
    pub fn on_click(&self, id: f64, properties: JsValue) -> Result<Promise, JsValue> {
        let id = feature_id(id)?;
        let properties = self::properties(properties)?;
        let inner = self.inner.clone();
        Ok(future_to_promise(async move {
            let outcome = match inner.on_click(id, &properties).await {
                ClickOutcome::Ignored => "ignored",
                ClickOutcome::Deselected { .. } => "deselected",
                ClickOutcome::Selected { .. } => "selected",
            };
            Ok(JsValue::from_str(outcome))
        }))
    }

    /// Slider drag. Applied once the slider has been quiet for the debounce
    /// interval.
    #[wasm_bindgen(js_name = onSliderInput)]
    pub fn on_slider_input(&self, value: u32) -> Result<(), JsValue> {
        let generation = self.inner.on_slider_input(value);
        let inner = self.inner.clone();
        schedule(self.inner.config().slider_debounce_ms, move || {
            inner.on_debounce_elapsed(generation);
        })
    }

    #[wasm_bindgen(js_name = setThreshold)]
    pub fn set_threshold(&self, value: u32) {
        self.inner.set_threshold(value);
    }

    /// Returns whether playback is running afterwards.
    #[wasm_bindgen(js_name = togglePlayback)]
    pub fn toggle_playback(&self) -> Result<bool, JsValue> {
        match self.inner.toggle_playback() {
            Some(generation) => {
                schedule_tick(self.inner.clone(), generation)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    #[wasm_bindgen(js_name = resizeFeedbackHost)]
    pub fn resize_feedback_host(&self, width: f64, height: f64) {
        self.inner.resize_feedback_host(width, height);
    }

    pub fn threshold(&self) -> u32 {
        self.inner.threshold()
    }

    #[wasm_bindgen(js_name = selectedId)]
    pub fn selected_id(&self) -> Option<f64> {
        self.inner.selected_id().map(|id| id as f64)
    }

    #[wasm_bindgen(js_name = hoveredId)]
    pub fn hovered_id(&self) -> Option<f64> {
        self.inner.hovered_id().map(|id| id as f64)
    }

    #[wasm_bindgen(js_name = isPlaying)]
    pub fn is_playing(&self) -> bool {
        self.inner.is_playing()
    }
}

#[cfg(target_arch = "wasm32")]
fn schedule<F: FnOnce() + 'static>(delay_ms: u32, callback: F) -> Result<(), JsValue> {
    timers::set_timeout(delay_ms, callback).map(|_| ())
}

// Timers only exist in the browser; elsewhere the callback is dropped.
#[cfg(not(target_arch = "wasm32"))]
fn schedule<F: FnOnce() + 'static>(_delay_ms: u32, _callback: F) -> Result<(), JsValue> {
    Err(JsValue::from_str("timers are only available in the browser"))
}

fn schedule_tick(inner: Rc<JsController>, generation: u64) -> Result<(), JsValue> {
    let delay = inner.config().playback_tick_ms;
    schedule(delay, move || {
        let Some(step) = inner.on_playback_tick(generation) else {
            return;
        };
        if !step.last {
            if let Err(err) = schedule_tick(inner, generation) {
                console_warn!("Playback stopped: {:?}", err);
            }
        }
    })
}

#[cfg(all(test, target_arch = "wasm32"))]
mod wasm_tests {
    use super::*;
    use wasm_bindgen_test::*;

    #[wasm_bindgen_test]
    fn config_from_plain_object() {
        let raw = js_sys::JSON::parse(r#"{"parcelsUrl":"tiles/p.fgb","feedback":{"offset":4}}"#)
            .unwrap();
        let config: MapConfig = serde_wasm_bindgen::from_value(raw).unwrap();
        assert_eq!(config.parcels_url, "tiles/p.fgb");
        assert_eq!(config.feedback.offset, 4.0);
        assert_eq!(config.walk_time_attribute, "walk_time");
    }

    #[wasm_bindgen_test]
    fn properties_from_plain_object() {
        let raw = js_sys::JSON::parse(r#"{"parcel_id":12,"walk_time":null}"#).unwrap();
        let props = properties(raw).unwrap();
        assert_eq!(props["parcel_id"], 12.0);
        assert!(properties(JsValue::UNDEFINED).unwrap().is_empty());
    }

    #[wasm_bindgen_test]
    fn rejects_fractional_ids() {
        assert!(feature_id(3.5).is_err());
        assert_eq!(feature_id(3.0).unwrap(), 3);
    }
}
