//! Default layout table for every card

use anyhow::{bail, Context, Result};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use tracing::info;

use crate::constants::geometry::*;
use crate::constants::spacing::CARD_SPACING;
use crate::types::{CardDefaults, CardId};

/// Immutable per-card defaults, total over [`CardId`].
///
/// Built once at startup (either the built-in arrangement or an external
/// table) and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardRegistry {
    defaults: [CardDefaults; CardId::COUNT],
}

impl CardRegistry {
    /// The stock dashboard arrangement around the hero card
    pub fn builtin() -> Self {
        let mut defaults = [CardDefaults::new(0, 0, 0, None, 0); CardId::COUNT];
        for card in CardId::ALL {
            defaults[card.index()] = builtin_defaults(card);
        }
        Self { defaults }
    }

    /// Build from an externally supplied table. Every card must be present.
    pub fn from_table(table: HashMap<CardId, CardDefaults>) -> Result<Self> {
        let missing: Vec<&str> = CardId::ALL
            .iter()
            .filter(|card| !table.contains_key(card))
            .map(|card| card.as_str())
            .collect();
        if !missing.is_empty() {
            bail!("Card registry is missing defaults for: {}", missing.join(", "));
        }

        let mut defaults = [CardDefaults::new(0, 0, 0, None, 0); CardId::COUNT];
        for (card, card_defaults) in table {
            defaults[card.index()] = card_defaults;
        }
        Ok(Self { defaults })
    }

    /// Load a registry table from a JSON file keyed by card id
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .context(format!("Failed to read card registry from {}", path.display()))?;
        let table: HashMap<CardId, CardDefaults> = serde_json::from_str(&contents)
            .context(format!("Failed to parse card registry {}", path.display()))?;
        let registry = Self::from_table(table)
            .context(format!("Invalid card registry {}", path.display()))?;
        info!(path = %path.display(), "Loaded card registry");
        Ok(registry)
    }

    pub fn defaults_of(&self, card: CardId) -> &CardDefaults {
        &self.defaults[card.index()]
    }
}

fn builtin_defaults(card: CardId) -> CardDefaults {
    match card {
        CardId::HiCard => CardDefaults::new(0, 0, HI_WIDTH, Some(HI_HEIGHT), 1),
        CardId::ArtCard => CardDefaults::new(
            0,
            -(HI_HALF_HEIGHT + 100 + CARD_SPACING),
            HI_WIDTH,
            Some(ART_HEIGHT),
            3,
        ),
        CardId::ClockCard => CardDefaults::new(
            HI_HALF_WIDTH + CARD_SPACING,
            -(CLOCK_OFFSET + CLOCK_HEIGHT),
            CLOCK_WIDTH,
            Some(CLOCK_HEIGHT),
            4,
        ),
        CardId::CalendarCard => CardDefaults::new(
            HI_HALF_WIDTH + CARD_SPACING,
            -CLOCK_OFFSET + CARD_SPACING,
            CALENDAR_WIDTH,
            Some(CALENDAR_HEIGHT),
            5,
        ),
        CardId::MusicCard => CardDefaults::new(
            HI_HALF_WIDTH + CARD_SPACING - MUSIC_SHIFT,
            -CLOCK_OFFSET + CARD_SPACING + CALENDAR_HEIGHT + CARD_SPACING,
            MUSIC_WIDTH,
            Some(MUSIC_HEIGHT),
            6,
        ),
        CardId::ShareCard => CardDefaults::new(
            HI_HALF_WIDTH - SOCIAL_WIDTH,
            HI_HALF_HEIGHT + CARD_SPACING + SOCIAL_HEIGHT + CARD_SPACING,
            SHARE_WIDTH,
            None,
            7,
        ),
        CardId::ArticleCard => CardDefaults::new(
            HI_HALF_WIDTH - SOCIAL_WIDTH - CARD_SPACING - ARTICLE_WIDTH,
            HI_HALF_HEIGHT + CARD_SPACING,
            ARTICLE_WIDTH,
            None,
            8,
        ),
        CardId::NavCard => CardDefaults::new(
            -HI_HALF_WIDTH - NAV_WIDTH - CARD_SPACING,
            HI_HALF_HEIGHT - NAV_HEIGHT,
            NAV_WIDTH,
            Some(NAV_HEIGHT),
            2,
        ),
    }
}
