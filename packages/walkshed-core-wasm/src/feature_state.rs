use std::collections::HashMap;

use serde::Serialize;

use crate::models::FeatureId;

/// Styling flags for one feature, consumed by the map's style expressions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FeatureFlags {
    pub hover: bool,
    pub selected: bool,
}

impl FeatureFlags {
    fn is_clear(&self) -> bool {
        !self.hover && !self.selected
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlagKind {
    Hover,
    Selected,
}

/// One flag flip, in the order it has to reach the map.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlagChange {
    pub id: FeatureId,
    pub kind: FlagKind,
    pub on: bool,
}

impl FlagChange {
    pub fn set(id: FeatureId, kind: FlagKind) -> Self {
        Self { id, kind, on: true }
    }

    pub fn clear(id: FeatureId, kind: FlagKind) -> Self {
        Self { id, kind, on: false }
    }
}

/// Flags kept beside the feature payload, addressed by (source, id).
///
/// Geometry and attributes are never touched for a style toggle; only this
/// store and the map's own feature-state table change.
#[derive(Debug, Default)]
pub struct FeatureStateStore {
    flags: HashMap<(String, FeatureId), FeatureFlags>,
}

impl FeatureStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, source: &str, id: FeatureId) -> FeatureFlags {
        self.flags
            .get(&(source.to_string(), id))
            .copied()
            .unwrap_or_default()
    }

    /// Apply one change and return the resulting flags for that feature.
    pub fn apply(&mut self, source: &str, change: FlagChange) -> FeatureFlags {
        let key = (source.to_string(), change.id);
        let mut flags = self.flags.get(&key).copied().unwrap_or_default();
        match change.kind {
            FlagKind::Hover => flags.hover = change.on,
            FlagKind::Selected => flags.selected = change.on,
        }
        if flags.is_clear() {
            self.flags.remove(&key);
        } else {
            self.flags.insert(key, flags);
        }
        flags
    }

    /// Ids in `source` that currently carry `kind`.
    pub fn flagged(&self, source: &str, kind: FlagKind) -> Vec<FeatureId> {
        let mut ids: Vec<_> = self
            .flags
            .iter()
            .filter(|((s, _), flags)| {
                s == source
                    && match kind {
                        FlagKind::Hover => flags.hover,
                        FlagKind::Selected => flags.selected,
                    }
            })
            .map(|((_, id), _)| *id)
            .collect();
        ids.sort_unstable();
        ids
    }
}
