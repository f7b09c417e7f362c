// Walking-time threshold: filter predicate, slider debounce and autoplay.
use serde::{Serialize, Serializer};
use serde_json::{json, Value};

use crate::models::Properties;

pub const THRESHOLD_MIN: u32 = 1;
pub const THRESHOLD_MAX: u32 = 42;
/// Value assumed for features without a walking time.
pub const MISSING_SENTINEL: u32 = 999;
/// Playback steps by one up to here, then jumps straight to the maximum.
pub const PLAYBACK_LINEAR_CEILING: u32 = 20;

pub fn clamp_threshold(value: u32) -> u32 {
    value.clamp(THRESHOLD_MIN, THRESHOLD_MAX)
}

/// `coalesce(attribute, sentinel) <= ceiling`, in the map library's
/// expression syntax when serialized.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterExpression {
    pub attribute: String,
    pub sentinel: f64,
    pub ceiling: f64,
}

impl FilterExpression {
    pub fn at_most(attribute: impl Into<String>, ceiling: u32) -> Self {
        Self {
            attribute: attribute.into(),
            sentinel: f64::from(MISSING_SENTINEL),
            ceiling: f64::from(ceiling),
        }
    }

    /// Non-numeric values count as missing.
    pub fn admits(&self, properties: &Properties) -> bool {
        let value = properties
            .get(&self.attribute)
            .and_then(Value::as_f64)
            .unwrap_or(self.sentinel);
        value <= self.ceiling
    }

    pub fn to_json(&self) -> Value {
        json!(["<=", ["coalesce", ["get", self.attribute], self.sentinel], self.ceiling])
    }
}

impl Serialize for FilterExpression {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

/// Cancel-and-reschedule debounce. Every `schedule` supersedes the previous
/// one; only the newest generation is delivered when its timer fires.
#[derive(Debug)]
pub struct Debouncer<T> {
    pending: Option<T>,
    generation: u64,
}

impl<T> Default for Debouncer<T> {
    fn default() -> Self {
        Self {
            pending: None,
            generation: 0,
        }
    }
}

impl<T> Debouncer<T> {
    pub fn schedule(&mut self, value: T) -> u64 {
        self.generation += 1;
        self.pending = Some(value);
        self.generation
    }

    /// A timer for `generation` elapsed. Stale timers get nothing.
    pub fn fire(&mut self, generation: u64) -> Option<T> {
        if generation != self.generation {
            return None;
        }
        self.pending.take()
    }
}

/// The value that follows `current` during playback, if any.
pub fn next_playback_value(current: u32) -> Option<u32> {
    if current < PLAYBACK_LINEAR_CEILING {
        Some(current + 1)
    } else if current == PLAYBACK_LINEAR_CEILING {
        Some(THRESHOLD_MAX)
    } else {
        None
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlaybackStep {
    pub value: u32,
    /// No further ticks follow this one.
    pub last: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackToggle {
    Started { generation: u64, first: u32 },
    Stopped,
}

/// Autoplay over 1, 2, ..., 20, 42. Restarting always begins at 1; a stop
/// invalidates every tick already scheduled.
#[derive(Debug, Default)]
pub struct Playback {
    current: Option<u32>,
    generation: u64,
}

impl Playback {
    pub fn is_running(&self) -> bool {
        self.current.is_some()
    }

    pub fn start(&mut self) -> PlaybackToggle {
        self.generation += 1;
        self.current = Some(THRESHOLD_MIN);
        PlaybackToggle::Started {
            generation: self.generation,
            first: THRESHOLD_MIN,
        }
    }

    pub fn stop(&mut self) {
        self.generation += 1;
        self.current = None;
    }

    pub fn toggle(&mut self) -> PlaybackToggle {
        if self.is_running() {
            self.stop();
            PlaybackToggle::Stopped
        } else {
            self.start()
        }
    }

    /// Advance one step. Ticks from an earlier run, or after the last step,
    /// return `None`.
    pub fn tick(&mut self, generation: u64) -> Option<PlaybackStep> {
        if generation != self.generation {
            return None;
        }
        let next = self.current.and_then(next_playback_value)?;
        let last = next_playback_value(next).is_none();
        self.current = if last { None } else { Some(next) };
        Some(PlaybackStep { value: next, last })
    }
}

/// Threshold value plus the two ways of changing it.
#[derive(Debug)]
pub struct ThresholdController {
    value: u32,
    attribute: String,
    slider: Debouncer<u32>,
    playback: Playback,
}

impl ThresholdController {
    pub fn new(attribute: impl Into<String>) -> Self {
        Self {
            value: THRESHOLD_MAX,
            attribute: attribute.into(),
            slider: Debouncer::default(),
            playback: Playback::default(),
        }
    }

    pub fn value(&self) -> u32 {
        self.value
    }

    pub fn is_playing(&self) -> bool {
        self.playback.is_running()
    }

    /// Set the threshold now and return the filter to hand to the map.
    pub fn set(&mut self, value: u32) -> FilterExpression {
        self.value = clamp_threshold(value);
        FilterExpression::at_most(self.attribute.clone(), self.value)
    }

    pub fn slider_input(&mut self, value: u32) -> u64 {
        self.slider.schedule(clamp_threshold(value))
    }

    pub fn slider_settled(&mut self, generation: u64) -> Option<FilterExpression> {
        let value = self.slider.fire(generation)?;
        Some(self.set(value))
    }

    /// Start or stop playback. A start applies the first value right away.
    pub fn toggle_playback(&mut self) -> (PlaybackToggle, Option<FilterExpression>) {
        match self.playback.toggle() {
            started @ PlaybackToggle::Started { first, .. } => (started, Some(self.set(first))),
            PlaybackToggle::Stopped => (PlaybackToggle::Stopped, None),
        }
    }

    pub fn playback_tick(&mut self, generation: u64) -> Option<(PlaybackStep, FilterExpression)> {
        let step = self.playback.tick(generation)?;
        Some((step, self.set(step.value)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn props(walk_time: Option<f64>) -> Properties {
        let mut p = Properties::new();
        if let Some(t) = walk_time {
            p.insert("walk_time".into(), json!(t));
        }
        p
    }

    #[test]
    fn filter_admits_iff_attribute_at_most_threshold() {
        let filter = FilterExpression::at_most("walk_time", 10);
        assert!(filter.admits(&props(Some(10.0))));
        assert!(filter.admits(&props(Some(0.5))));
        assert!(!filter.admits(&props(Some(10.5))));
    }

    #[test]
    fn missing_attribute_is_excluded_across_the_whole_range() {
        for v in THRESHOLD_MIN..=THRESHOLD_MAX {
            assert!(!FilterExpression::at_most("walk_time", v).admits(&props(None)));
        }
        assert!(FilterExpression::at_most("walk_time", MISSING_SENTINEL).admits(&props(None)));
    }

    #[test]
    fn filter_serializes_to_map_expression() {
        let value = serde_json::to_value(FilterExpression::at_most("walk_time", 15)).unwrap();
        assert_eq!(value, json!(["<=", ["coalesce", ["get", "walk_time"], 999.0], 15.0]));
    }

    #[test]
    fn out_of_range_values_are_clamped() {
        let mut controller = ThresholdController::new("walk_time");
        assert_eq!(controller.set(0).ceiling, 1.0);
        assert_eq!(controller.set(100).ceiling, 42.0);
        assert_eq!(controller.value(), 42);
    }

    #[test]
    fn debounce_delivers_only_last_value() {
        let mut controller = ThresholdController::new("walk_time");
        let g1 = controller.slider_input(5);
        let g2 = controller.slider_input(6);
        let g3 = controller.slider_input(7);

        assert!(controller.slider_settled(g1).is_none());
        assert!(controller.slider_settled(g2).is_none());
        assert_eq!(controller.value(), THRESHOLD_MAX);

        let filter = controller.slider_settled(g3).unwrap();
        assert_eq!(filter.ceiling, 7.0);
        assert_eq!(controller.value(), 7);
        // a timer firing twice applies nothing the second time
        assert!(controller.slider_settled(g3).is_none());
    }

    #[test]
    fn playback_visits_one_to_twenty_then_forty_two() {
        let mut playback = Playback::default();
        let PlaybackToggle::Started { generation, first } = playback.start() else {
            panic!("playback did not start");
        };
        let mut visited = vec![first];
        while let Some(step) = playback.tick(generation) {
            visited.push(step.value);
            if step.last {
                break;
            }
        }
        let mut expected: Vec<u32> = (1..=20).collect();
        expected.push(42);
        assert_eq!(visited, expected);

        assert!(!playback.is_running());
        assert!(playback.tick(generation).is_none());
    }

    #[test]
    fn toggle_cancels_and_restart_begins_at_one() {
        let mut controller = ThresholdController::new("walk_time");
        let (toggle, filter) = controller.toggle_playback();
        let PlaybackToggle::Started { generation, .. } = toggle else {
            panic!("playback did not start");
        };
        assert_eq!(filter.unwrap().ceiling, 1.0);
        controller.playback_tick(generation);
        controller.playback_tick(generation);
        assert_eq!(controller.value(), 3);

        assert_eq!(controller.toggle_playback().0, PlaybackToggle::Stopped);
        // the tick already scheduled for the old run is dropped
        assert!(controller.playback_tick(generation).is_none());
        assert_eq!(controller.value(), 3);

        let (toggle, _) = controller.toggle_playback();
        let PlaybackToggle::Started { generation: restarted, first } = toggle else {
            panic!("playback did not restart");
        };
        assert_ne!(restarted, generation);
        assert_eq!(first, 1);
        assert_eq!(controller.value(), 1);
    }

    #[test]
    fn next_value_sequence() {
        assert_eq!(next_playback_value(1), Some(2));
        assert_eq!(next_playback_value(19), Some(20));
        assert_eq!(next_playback_value(20), Some(42));
        assert_eq!(next_playback_value(42), None);
    }
}
