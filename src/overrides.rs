//! Sparse per-card overrides and the diff-pruning that keeps them minimal

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::registry::CardRegistry;
use crate::types::{coerce, CardDefaults, CardId, LayoutField};

/// Fields of a card layout that differ from the card's defaults.
/// A present field means "use this instead of the default".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Override {
    #[serde(default, deserialize_with = "coerce::optional_number", skip_serializing_if = "Option::is_none")]
    pub offset_x: Option<i32>,
    #[serde(default, deserialize_with = "coerce::optional_number", skip_serializing_if = "Option::is_none")]
    pub offset_y: Option<i32>,
    #[serde(default, deserialize_with = "coerce::optional_number", skip_serializing_if = "Option::is_none")]
    pub width: Option<i32>,
    #[serde(default, deserialize_with = "coerce::optional_number", skip_serializing_if = "Option::is_none")]
    pub height: Option<i32>,
    #[serde(default, deserialize_with = "coerce::optional_number", skip_serializing_if = "Option::is_none")]
    pub order: Option<i32>,
}

impl Override {
    pub fn get(&self, field: LayoutField) -> Option<i32> {
        match field {
            LayoutField::OffsetX => self.offset_x,
            LayoutField::OffsetY => self.offset_y,
            LayoutField::Width => self.width,
            LayoutField::Height => self.height,
            LayoutField::Order => self.order,
        }
    }

    pub fn set(&mut self, field: LayoutField, value: Option<i32>) {
        let slot = match field {
            LayoutField::OffsetX => &mut self.offset_x,
            LayoutField::OffsetY => &mut self.offset_y,
            LayoutField::Width => &mut self.width,
            LayoutField::Height => &mut self.height,
            LayoutField::Order => &mut self.order,
        };
        *slot = value;
    }

    pub fn is_empty(&self) -> bool {
        LayoutField::ALL.iter().all(|field| self.get(*field).is_none())
    }

    /// Number of fields present
    pub fn len(&self) -> usize {
        LayoutField::ALL.iter().filter(|field| self.get(**field).is_some()).count()
    }

    /// Drop every field equal to its default. `None` if nothing is left.
    pub fn pruned(&self, defaults: &CardDefaults) -> Option<Override> {
        let mut cleaned = Override::default();
        for field in LayoutField::ALL {
            if let Some(value) = self.get(field)
                && defaults.get(field) != Some(value)
            {
                cleaned.set(field, Some(value));
            }
        }
        (!cleaned.is_empty()).then_some(cleaned)
    }
}

/// Working set of overrides keyed by card
pub type OverrideMap = BTreeMap<CardId, Override>;

/// Prune every entry of `overrides` against the registry
pub fn prune_map(registry: &CardRegistry, overrides: &OverrideMap) -> OverrideMap {
    overrides
        .iter()
        .filter_map(|(card, card_override)| {
            card_override
                .pruned(registry.defaults_of(*card))
                .map(|cleaned| (*card, cleaned))
        })
        .collect()
}

/// Partial update for one card.
///
/// Each entry either sets a field or clears it; fields not mentioned keep
/// their current override value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OverridePatch {
    changes: Vec<(LayoutField, Option<i32>)>,
}

impl OverridePatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, field: LayoutField, value: i32) -> Self {
        self.changes.push((field, Some(value)));
        self
    }

    pub fn clear(mut self, field: LayoutField) -> Self {
        self.changes.push((field, None));
        self
    }

    /// Set when `Some`, clear when `None`
    pub fn set_or_clear(mut self, field: LayoutField, value: Option<i32>) -> Self {
        self.changes.push((field, value));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    /// Merge onto `base`; later changes to the same field win
    pub fn apply_to(&self, base: Override) -> Override {
        let mut merged = base;
        for (field, value) in &self.changes {
            merged.set(*field, *value);
        }
        merged
    }
}

/// Shape read at startup and handed to the persistence gateway
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayoutPayload {
    #[serde(default)]
    pub overrides: OverrideMap,
}

impl LayoutPayload {
    pub fn new(overrides: OverrideMap) -> Self {
        Self { overrides }
    }
}
