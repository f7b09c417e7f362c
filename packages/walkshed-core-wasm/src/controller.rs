// Ties the decoder, the interaction state machines and the rendering surface
// together. All handlers run on the single UI thread; async handlers never
// hold a session borrow across an await.
use std::cell::RefCell;

use crate::config::MapConfig;
use crate::feature_source::{load_features, ByteFetcher, SourceCache};
use crate::feature_state::{FeatureFlags, FeatureStateStore, FlagChange};
use crate::feedback::{
    parcel_feedback_html, FeedbackBlock, FeedbackCategory, FeedbackSlot, ScreenPoint,
};
use crate::models::{BoundingBox, FeatureCollection, FeatureId, Properties};
use crate::routes::{derive_endpoints, routes_for_parcel, EndpointColors};
use crate::selection::{ClickOutcome, SelectionMachine};
use crate::static_layers::load_static_layer;
use crate::surface::{CursorStyle, MapSurface};
use crate::threshold::{PlaybackStep, PlaybackToggle, ThresholdController};
use crate::viewport::{ViewportQueryController, ViewportTicket};
use crate::console_log;

/// All mutable interaction state of one map.
#[derive(Debug)]
pub struct InteractionSession {
    pub selection: SelectionMachine,
    pub feature_state: FeatureStateStore,
    pub viewport: ViewportQueryController,
    pub threshold: ThresholdController,
    pub feedback: FeedbackSlot,
    /// Bumped on every selection change; a route load applies only if its
    /// number is still the latest.
    route_requests: u64,
}

impl InteractionSession {
    pub fn new(config: &MapConfig) -> Self {
        Self {
            selection: SelectionMachine::new(config.parcel_key_attribute.clone()),
            feature_state: FeatureStateStore::new(),
            viewport: ViewportQueryController::default(),
            threshold: ThresholdController::new(config.walk_time_attribute.clone()),
            feedback: FeedbackSlot::new(&config.feedback),
            route_requests: 0,
        }
    }

    fn apply_flags(&mut self, source: &str, changes: Vec<FlagChange>) -> Vec<(FeatureId, FeatureFlags)> {
        changes
            .into_iter()
            .map(|change| (change.id, self.feature_state.apply(source, change)))
            .collect()
    }
}

pub struct MapController<F: ByteFetcher, S: MapSurface> {
    config: MapConfig,
    fetcher: F,
    cache: SourceCache,
    surface: S,
    session: RefCell<InteractionSession>,
}

impl<F: ByteFetcher, S: MapSurface> MapController<F, S> {
    pub fn new(config: MapConfig, fetcher: F, surface: S) -> Self {
        let session = RefCell::new(InteractionSession::new(&config));
        Self {
            config,
            fetcher,
            cache: SourceCache::new(),
            surface,
            session,
        }
    }

    pub fn config(&self) -> &MapConfig {
        &self.config
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    /// Unbounded parcel load plus the static layers, so the map is usable
    /// before the first viewport event.
    pub async fn initial_load(&self) {
        self.surface
            .set_source_data(&self.config.routes_source, &FeatureCollection::empty());
        self.surface
            .set_source_data(&self.config.endpoints_source, &FeatureCollection::empty());

        self.query_parcels(None).await;

        let static_layers = [
            (&self.config.areas_url, &self.config.areas_source),
            (&self.config.boundary_url, &self.config.boundary_source),
        ];
        for (url, source) in static_layers {
            if let Some(url) = url {
                let layer = load_static_layer(&self.fetcher, url).await;
                self.surface.set_source_data(source, &layer);
            }
        }
    }

    /// Re-query parcels for the visible extent. Returns whether the result
    /// was applied; a response overtaken by a newer one is dropped.
    pub async fn on_viewport_change(&self, bbox: BoundingBox) -> bool {
        self.query_parcels(Some(bbox)).await
    }

    async fn query_parcels(&self, bbox: Option<BoundingBox>) -> bool {
        let ticket = self.session.borrow_mut().viewport.begin(bbox);
        let parcels =
            load_features(
            &self.fetcher,
            &self.cache,
            &self.config.parcels_url,
            ticket.bbox.as_ref(),
        )
        .await;
        self.apply_parcels(&ticket, &parcels)
    }

    fn apply_parcels(&self, ticket: &ViewportTicket, parcels: &FeatureCollection) -> bool {
        let accepted = self.session.borrow_mut().viewport.accept(ticket);
        if !accepted {
            console_log!("Dropping stale viewport result #{}", ticket.sequence);
            return false;
        }
        self.surface
            .set_source_data(&self.config.parcels_source, parcels);
        true
    }

    fn publish_flags(&self, flags: Vec<(FeatureId, FeatureFlags)>) {
        for (id, flags) in flags {
            self.surface
                .set_feature_state(&self.config.parcels_source, id, flags);
        }
    }

    /// Pointer is over parcel `id`. Called again as the pointer moves so the
    /// feedback block follows it.
    pub fn on_hover_enter(&self, id: FeatureId, pointer: ScreenPoint, properties: &Properties) {
        let (flags, block) = {
            let mut session = self.session.borrow_mut();
            let changes = session.selection.hover_enter(id);
            let flags = session.apply_flags(&self.config.parcels_source, changes);
            let html = parcel_feedback_html(
                properties,
                &self.config.parcel_key_attribute,
                &self.config.walk_time_attribute,
            );
            let block = session
                .feedback
                .show(pointer, html, FeedbackCategory::Parcel)
                .clone();
            (flags, block)
        };

        self.publish_flags(flags);
        self.surface.set_cursor(CursorStyle::Pointer);
        self.surface.show_feedback(&block);
    }

    pub fn on_hover_leave(&self) {
        let (flags, hidden) = {
            let mut session = self.session.borrow_mut();
            let changes = session.selection.hover_leave();
            let flags = session.apply_flags(&self.config.parcels_source, changes);
            (flags, session.feedback.hide())
        };

        self.publish_flags(flags);
        self.surface.set_cursor(CursorStyle::Default);
        if hidden {
            self.surface.hide_feedback();
        }
    }

    fn clear_routes(&self) {
        let empty = FeatureCollection::empty();
        self.surface
            .set_source_data(&self.config.routes_source, &empty);
        self.surface
            .set_source_data(&self.config.endpoints_source, &empty);
    }

    /// Click on parcel `id`.
    ///
    /// Selecting decodes the complete route source and keeps the routes
    /// linked to the parcel's key. The derived collections are published
    /// only if the parcel is still selected when the decode finishes and no
    /// newer selection change happened meanwhile.
    pub async fn on_click(&self, id: FeatureId, properties: &Properties) -> ClickOutcome {
        let (outcome, flags, request) = {
            let mut session = self.session.borrow_mut();
            let transition = session.selection.click(id, properties);
            let flags = session.apply_flags(&self.config.parcels_source, transition.changes);
            if transition.outcome != ClickOutcome::Ignored {
                session.route_requests += 1;
            }
            (transition.outcome, flags, session.route_requests)
        };

        self.publish_flags(flags);

        let key = match &outcome {
            ClickOutcome::Selected { key, .. } => key.clone(),
            ClickOutcome::Deselected { .. } => {
                self.clear_routes();
                return outcome;
            }
            ClickOutcome::Ignored => return outcome,
        };

        // the previous parcel's routes must not linger while the new ones load
        self.clear_routes();

        let routes = load_features(&self.fetcher, &self.cache, &self.config.routes_url, None).await;

        let current = {
            let session = self.session.borrow();
            session.selection.selected_id() == Some(id) && session.route_requests == request
        };
        if !current {
            console_log!("Dropping routes for parcel {}: selection changed", id);
            return outcome;
        }

        let routes = routes_for_parcel(routes, &self.config.route_link_attribute, &key);
        let colors = EndpointColors {
            start: self.config.start_color.clone(),
            end: self.config.end_color.clone(),
        };
        let endpoints = derive_endpoints(&routes, &colors);
        console_log!(
            "Parcel {}: {} routes, {} endpoints",
            id,
            routes.len(),
            endpoints.len()
        );

        self.surface
            .set_source_data(&self.config.routes_source, &routes);
        self.surface
            .set_source_data(&self.config.endpoints_source, &endpoints);
        outcome
    }

    /// Apply a threshold straight away.
    pub fn set_threshold(&self, value: u32) {
        let filter = self.session.borrow_mut().threshold.set(value);
        self.surface.set_filter(&self.config.parcels_layer, &filter);
    }

    /// Slider moved. Returns the token the debounce timer must report back
    /// through [`Self::on_debounce_elapsed`].
    pub fn on_slider_input(&self, value: u32) -> u64 {
        self.session.borrow_mut().threshold.slider_input(value)
    }

    /// Returns whether the slider value was applied.
    pub fn on_debounce_elapsed(&self, generation: u64) -> bool {
        let filter = self.session.borrow_mut().threshold.slider_settled(generation);
        match filter {
            Some(filter) => {
                self.surface.set_filter(&self.config.parcels_layer, &filter);
                true
            }
            None => false,
        }
    }

    /// Start or stop playback. On start returns the token the tick timer
    /// reports back through [`Self::on_playback_tick`].
    pub fn toggle_playback(&self) -> Option<u64> {
        let (toggle, filter) = self.session.borrow_mut().threshold.toggle_playback();
        if let Some(filter) = filter {
            self.surface.set_filter(&self.config.parcels_layer, &filter);
        }
        match toggle {
            PlaybackToggle::Started { generation, .. } => Some(generation),
            PlaybackToggle::Stopped => None,
        }
    }

    /// One playback tick. `None` means the tick was stale and nothing changed;
    /// a step with `last` set means no further tick should be scheduled.
    pub fn on_playback_tick(&self, generation: u64) -> Option<PlaybackStep> {
        let (step, filter) = self.session.borrow_mut().threshold.playback_tick(generation)?;
        self.surface.set_filter(&self.config.parcels_layer, &filter);
        Some(step)
    }

    pub fn threshold(&self) -> u32 {
        self.session.borrow().threshold.value()
    }

    pub fn is_playing(&self) -> bool {
        self.session.borrow().threshold.is_playing()
    }

    pub fn selected_id(&self) -> Option<FeatureId> {
        self.session.borrow().selection.selected_id()
    }

    pub fn hovered_id(&self) -> Option<FeatureId> {
        self.session.borrow().selection.hovered_id()
    }

    pub fn feature_flags(&self, id: FeatureId) -> FeatureFlags {
        self.session
            .borrow()
            .feature_state
            .get(&self.config.parcels_source, id)
    }

    /// The host element changed size; later feedback blocks clamp to it.
    pub fn resize_feedback_host(&self, width: f64, height: f64) {
        self.session.borrow_mut().feedback.resize_host(width, height);
    }

    pub fn feedback(&self) -> Option<FeedbackBlock> {
        self.session.borrow().feedback.current().cloned()
    }
}
