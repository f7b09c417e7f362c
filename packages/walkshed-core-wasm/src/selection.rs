use serde_json::Value;

use crate::feature_state::{FlagChange, FlagKind};
use crate::models::{FeatureId, Properties};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionState {
    Idle,
    Selected(FeatureId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HoverState {
    None,
    Hovering(FeatureId),
}

#[derive(Debug, Clone, PartialEq)]
pub enum ClickOutcome {
    /// The feature has no route key; nothing changed.
    Ignored,
    /// The selected feature was clicked again.
    Deselected { id: FeatureId },
    /// A new feature is selected; routes keyed by `key` should be loaded.
    Selected {
        id: FeatureId,
        previous: Option<FeatureId>,
        key: Value,
    },
}

/// The result of a transition: what happened plus the flag flips, in order.
#[derive(Debug, Clone, PartialEq)]
pub struct Transition<T> {
    pub outcome: T,
    pub changes: Vec<FlagChange>,
}

/// At most one selected and at most one hovered feature; the two are
/// independent and may point at the same feature.
#[derive(Debug)]
pub struct SelectionMachine {
    selection: SelectionState,
    hover: HoverState,
    key_attribute: String,
}

impl SelectionMachine {
    pub fn new(key_attribute: impl Into<String>) -> Self {
        Self {
            selection: SelectionState::Idle,
            hover: HoverState::None,
            key_attribute: key_attribute.into(),
        }
    }

    pub fn selection(&self) -> SelectionState {
        self.selection
    }

    pub fn hover(&self) -> HoverState {
        self.hover
    }

    pub fn selected_id(&self) -> Option<FeatureId> {
        match self.selection {
            SelectionState::Selected(id) => Some(id),
            SelectionState::Idle => None,
        }
    }

    pub fn hovered_id(&self) -> Option<FeatureId> {
        match self.hover {
            HoverState::Hovering(id) => Some(id),
            HoverState::None => None,
        }
    }

    /// Pointer entered `id`. A previously hovered feature loses its flag first.
    pub fn hover_enter(&mut self, id: FeatureId) -> Vec<FlagChange> {
        let mut changes = Vec::with_capacity(2);
        match self.hover {
            HoverState::Hovering(current) if current == id => return changes,
            HoverState::Hovering(current) => {
                changes.push(FlagChange::clear(current, FlagKind::Hover))
            }
            HoverState::None => {}
        }
        changes.push(FlagChange::set(id, FlagKind::Hover));
        self.hover = HoverState::Hovering(id);
        changes
    }

    /// Pointer left the hoverable region.
    pub fn hover_leave(&mut self) -> Vec<FlagChange> {
        match std::mem::replace(&mut self.hover, HoverState::None) {
            HoverState::Hovering(id) => vec![FlagChange::clear(id, FlagKind::Hover)],
            HoverState::None => Vec::new(),
        }
    }

    pub fn click(&mut self, id: FeatureId, properties: &Properties) -> Transition<ClickOutcome> {
        let key = match properties.get(&self.key_attribute) {
            Some(v) if !v.is_null() => v.clone(),
            _ => {
                return Transition {
                    outcome: ClickOutcome::Ignored,
                    changes: Vec::new(),
                }
            }
        };

        match self.selection {
            SelectionState::Selected(current) if current == id => {
                self.selection = SelectionState::Idle;
                Transition {
                    outcome: ClickOutcome::Deselected { id },
                    changes: vec![FlagChange::clear(id, FlagKind::Selected)],
                }
            }
            previous => {
                let previous = match previous {
                    SelectionState::Selected(prev) => Some(prev),
                    SelectionState::Idle => None,
                };
                // the old flag always goes before the new one is set
                let mut changes = Vec::with_capacity(2);
                if let Some(prev) = previous {
                    changes.push(FlagChange::clear(prev, FlagKind::Selected));
                }
                changes.push(FlagChange::set(id, FlagKind::Selected));
                self.selection = SelectionState::Selected(id);
                Transition {
                    outcome: ClickOutcome::Selected { id, previous, key },
                    changes,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feature_state::FeatureStateStore;
    use serde_json::json;

    fn keyed(key: i64) -> Properties {
        let mut p = Properties::new();
        p.insert("parcel_id".into(), json!(key));
        p
    }

    #[test]
    fn click_without_key_is_ignored() {
        let mut machine = SelectionMachine::new("parcel_id");
        let mut props = Properties::new();
        props.insert("walk_time".into(), json!(3));
        let t = machine.click(1, &props);
        assert_eq!(t.outcome, ClickOutcome::Ignored);
        assert!(t.changes.is_empty());
        assert_eq!(machine.selection(), SelectionState::Idle);

        props.insert("parcel_id".into(), Value::Null);
        assert_eq!(machine.click(1, &props).outcome, ClickOutcome::Ignored);
    }

    #[test]
    fn clicking_twice_toggles_back_to_idle() {
        let mut machine = SelectionMachine::new("parcel_id");
        let first = machine.click(4, &keyed(100));
        assert!(matches!(first.outcome, ClickOutcome::Selected { id: 4, previous: None, .. }));
        assert_eq!(machine.selection(), SelectionState::Selected(4));

        let second = machine.click(4, &keyed(100));
        assert_eq!(second.outcome, ClickOutcome::Deselected { id: 4 });
        assert_eq!(second.changes, vec![FlagChange::clear(4, FlagKind::Selected)]);
        assert_eq!(machine.selection(), SelectionState::Idle);
    }

    #[test]
    fn switching_selection_clears_old_flag_first() {
        let mut machine = SelectionMachine::new("parcel_id");
        let mut store = FeatureStateStore::new();
        for change in machine.click(1, &keyed(100)).changes {
            store.apply("parcels", change);
        }

        let t = machine.click(2, &keyed(101));
        assert_eq!(
            t.outcome,
            ClickOutcome::Selected { id: 2, previous: Some(1), key: json!(101) }
        );
        assert_eq!(
            t.changes,
            vec![
                FlagChange::clear(1, FlagKind::Selected),
                FlagChange::set(2, FlagKind::Selected),
            ]
        );

        // replaying the changes in order never shows two selected features
        for change in t.changes {
            store.apply("parcels", change);
            assert!(store.flagged("parcels", FlagKind::Selected).len() <= 1);
        }
        assert_eq!(store.flagged("parcels", FlagKind::Selected), vec![2]);
    }

    #[test]
    fn hover_moves_between_features() {
        let mut machine = SelectionMachine::new("parcel_id");
        assert_eq!(machine.hover_enter(1), vec![FlagChange::set(1, FlagKind::Hover)]);
        assert!(machine.hover_enter(1).is_empty());
        assert_eq!(
            machine.hover_enter(2),
            vec![FlagChange::clear(1, FlagKind::Hover), FlagChange::set(2, FlagKind::Hover)]
        );
        assert_eq!(machine.hover_leave(), vec![FlagChange::clear(2, FlagKind::Hover)]);
        assert_eq!(machine.hover(), HoverState::None);
        assert!(machine.hover_leave().is_empty());
    }

    #[test]
    fn hover_and_selection_are_independent() {
        let mut machine = SelectionMachine::new("parcel_id");
        machine.hover_enter(7);
        machine.click(7, &keyed(1));
        assert_eq!(machine.hovered_id(), Some(7));
        assert_eq!(machine.selected_id(), Some(7));

        machine.hover_leave();
        assert_eq!(machine.selected_id(), Some(7));
    }
}
