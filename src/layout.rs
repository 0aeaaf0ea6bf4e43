//! Resolution of defaults + overrides + center anchor into absolute layouts

use serde::Serialize;
use std::collections::BTreeMap;

use crate::constants::spacing::CARD_SPACING;
use crate::overrides::{Override, OverrideMap};
use crate::registry::CardRegistry;
use crate::types::{CardId, Point};

/// Final layout of one card
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedLayout {
    pub card: CardId,
    pub width: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<i32>,
    pub order: i32,
    pub offset_x: i32,
    pub offset_y: i32,
    /// Absolute position: `center.x + offset_x`
    pub x: f64,
    /// Absolute position: `center.y + offset_y`
    pub y: f64,
}

/// Resolve one card. Pure: the same inputs always give the same layout.
pub fn resolve(
    registry: &CardRegistry,
    card: CardId,
    card_override: Option<&Override>,
    center: Point,
) -> ResolvedLayout {
    let defaults = registry.defaults_of(card);
    let card_override = card_override.copied().unwrap_or_default();

    let offset_x = card_override.offset_x.unwrap_or(defaults.offset_x);
    let offset_y = card_override.offset_y.unwrap_or(defaults.offset_y);

    ResolvedLayout {
        card,
        width: card_override.width.unwrap_or(defaults.width),
        height: card_override.height.or(defaults.height),
        order: card_override.order.unwrap_or(defaults.order),
        offset_x,
        offset_y,
        x: center.x + f64::from(offset_x),
        y: center.y + f64::from(offset_y),
    }
}

/// Resolve every card, sorted by render order (ties broken by card id)
pub fn resolve_all(registry: &CardRegistry, overrides: &OverrideMap, center: Point) -> Vec<ResolvedLayout> {
    let mut layouts: Vec<ResolvedLayout> = CardId::ALL
        .iter()
        .map(|card| resolve(registry, *card, overrides.get(card), center))
        .collect();
    layouts.sort_by_key(|layout| (layout.order, layout.card));
    layouts
}

/// Where the floating like button sits: right of the share card, below the music card
pub fn like_button_anchor(share: &ResolvedLayout, music: &ResolvedLayout) -> Point {
    let spacing = f64::from(CARD_SPACING);
    Point::new(
        share.x + f64::from(share.width) + spacing,
        music.y + f64::from(music.height.unwrap_or(0)) + spacing,
    )
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct CacheKey {
    center: Point,
    card_override: Option<Override>,
}

/// Single-slot memo per card.
///
/// A card is re-resolved only when its center or override changed since the
/// last call; otherwise the previous layout is returned.
#[derive(Debug, Default)]
pub struct LayoutCache {
    slots: BTreeMap<CardId, (CacheKey, ResolvedLayout)>,
    hits: u64,
    misses: u64,
}

impl LayoutCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn resolve(
        &mut self,
        registry: &CardRegistry,
        card: CardId,
        card_override: Option<&Override>,
        center: Point,
    ) -> ResolvedLayout {
        let key = CacheKey { center, card_override: card_override.copied() };
        if let Some((cached_key, layout)) = self.slots.get(&card)
            && *cached_key == key
        {
            self.hits += 1;
            return *layout;
        }

        self.misses += 1;
        let layout = resolve(registry, card, card_override, center);
        self.slots.insert(card, (key, layout));
        layout
    }

    /// Same as [`resolve_all`], through the memo
    pub fn resolve_all(&mut self, registry: &CardRegistry, overrides: &OverrideMap, center: Point) -> Vec<ResolvedLayout> {
        let mut layouts: Vec<ResolvedLayout> = CardId::ALL
            .iter()
            .map(|card| self.resolve(registry, *card, overrides.get(card), center))
            .collect();
        layouts.sort_by_key(|layout| (layout.order, layout.card));
        layouts
    }

    pub fn hits(&self) -> u64 {
        self.hits
    }

    pub fn misses(&self) -> u64 {
        self.misses
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::LayoutField;

    #[test]
    fn test_resolve_without_override_uses_defaults() {
        let registry = CardRegistry::builtin();
        let layout = resolve(&registry, CardId::ClockCard, None, Point::new(500.0, 400.0));
        assert_eq!(layout.width, 232);
        assert_eq!(layout.height, Some(132));
        assert_eq!(layout.order, 4);
        assert_eq!((layout.offset_x, layout.offset_y), (216, -224));
        assert_eq!((layout.x, layout.y), (716.0, 176.0));
    }

    #[test]
    fn test_resolve_field_fallback() {
        let registry = CardRegistry::builtin();
        let center = Point::new(10.5, -3.0);
        let overrides = [
            Override { offset_x: Some(7), ..Default::default() },
            Override { width: Some(120), height: Some(90), ..Default::default() },
            Override { order: Some(99), offset_y: Some(-40), ..Default::default() },
        ];
        for card in CardId::ALL {
            let defaults = registry.defaults_of(card);
            for card_override in overrides {
                let layout = resolve(&registry, card, Some(&card_override), center);
                let resolved_fields = [
                    (LayoutField::OffsetX, Some(layout.offset_x)),
                    (LayoutField::OffsetY, Some(layout.offset_y)),
                    (LayoutField::Width, Some(layout.width)),
                    (LayoutField::Height, layout.height),
                    (LayoutField::Order, Some(layout.order)),
                ];
                for (field, value) in resolved_fields {
                    let expected = card_override.get(field).or(defaults.get(field));
                    assert_eq!(value, expected, "card={card} field={field}");
                }
                assert_eq!(layout.x, center.x + f64::from(layout.offset_x));
                assert_eq!(layout.y, center.y + f64::from(layout.offset_y));
            }
        }
    }

    #[test]
    fn test_resolve_all_sorted_by_order() {
        let registry = CardRegistry::builtin();
        let mut overrides = OverrideMap::new();
        overrides.insert(CardId::HiCard, Override { order: Some(20), ..Default::default() });

        let layouts = resolve_all(&registry, &overrides, Point::default());
        assert_eq!(layouts.len(), CardId::COUNT);
        assert_eq!(layouts.first().map(|l| l.card), Some(CardId::NavCard));
        assert_eq!(layouts.last().map(|l| l.card), Some(CardId::HiCard));
    }

    #[test]
    fn test_like_button_anchor() {
        let registry = CardRegistry::builtin();
        let center = Point::new(100.0, 100.0);
        let share = resolve(&registry, CardId::ShareCard, None, center);
        let music = resolve(&registry, CardId::MusicCard, None, center);
        let anchor = like_button_anchor(&share, &music);
        // share.x = 100 - 135, + 200 + 36; music.y = 100 + 266, + 66 + 36
        assert_eq!(anchor, Point::new(201.0, 468.0));
    }

    #[test]
    fn test_cache_hits_until_key_changes() {
        let registry = CardRegistry::builtin();
        let mut cache = LayoutCache::new();
        let center = Point::new(0.0, 0.0);
        let first_override = Override { width: Some(250), ..Default::default() };

        let first = cache.resolve(&registry, CardId::MusicCard, Some(&first_override), center);
        let second = cache.resolve(&registry, CardId::MusicCard, Some(&first_override), center);
        assert_eq!(first, second);
        assert_eq!((cache.hits(), cache.misses()), (1, 1));

        let moved = cache.resolve(&registry, CardId::MusicCard, Some(&first_override), Point::new(1.0, 0.0));
        assert_eq!(moved.x, first.x + 1.0);
        assert_eq!(cache.misses(), 2);

        let cleared = cache.resolve(&registry, CardId::MusicCard, None, Point::new(1.0, 0.0));
        assert_eq!(cleared.width, 293);
        assert_eq!(cache.misses(), 3);
    }

    #[test]
    fn test_cache_resolve_all_matches_uncached() {
        let registry = CardRegistry::builtin();
        let mut overrides = OverrideMap::new();
        overrides.insert(CardId::ArtCard, Override { offset_y: Some(-300), ..Default::default() });
        let center = Point::new(640.0, 360.0);

        let mut cache = LayoutCache::new();
        assert_eq!(cache.resolve_all(&registry, &overrides, center), resolve_all(&registry, &overrides, center));
        assert_eq!(cache.resolve_all(&registry, &overrides, center), resolve_all(&registry, &overrides, center));
        assert_eq!(cache.hits(), CardId::COUNT as u64);
    }
}
