//! Core layout types shared by the registry, resolver, store and drag controller

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Identifier of one of the fixed dashboard cards.
///
/// The set is closed: the wire name of every variant is its kebab-case form
/// (`music-card`), and anything else fails to parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CardId {
    HiCard,
    ArtCard,
    ClockCard,
    CalendarCard,
    MusicCard,
    ShareCard,
    ArticleCard,
    NavCard,
}

impl CardId {
    pub const COUNT: usize = 8;

    pub const ALL: [CardId; Self::COUNT] = [
        CardId::HiCard,
        CardId::ArtCard,
        CardId::ClockCard,
        CardId::CalendarCard,
        CardId::MusicCard,
        CardId::ShareCard,
        CardId::ArticleCard,
        CardId::NavCard,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            CardId::HiCard => "hi-card",
            CardId::ArtCard => "art-card",
            CardId::ClockCard => "clock-card",
            CardId::CalendarCard => "calendar-card",
            CardId::MusicCard => "music-card",
            CardId::ShareCard => "share-card",
            CardId::ArticleCard => "article-card",
            CardId::NavCard => "nav-card",
        }
    }

    /// Dense index into per-card tables
    pub(crate) fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for CardId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for CardId {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        CardId::ALL
            .into_iter()
            .find(|card| card.as_str() == s)
            .ok_or_else(|| {
                let known: Vec<&str> = CardId::ALL.iter().map(|c| c.as_str()).collect();
                anyhow!("Unknown card id '{}' (known: {})", s, known.join(", "))
            })
    }
}

/// One overridable layout field
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LayoutField {
    OffsetX,
    OffsetY,
    Width,
    Height,
    Order,
}

impl LayoutField {
    pub const ALL: [LayoutField; 5] = [
        LayoutField::OffsetX,
        LayoutField::OffsetY,
        LayoutField::Width,
        LayoutField::Height,
        LayoutField::Order,
    ];

    /// Wire name used in the persisted payload
    pub fn name(self) -> &'static str {
        match self {
            LayoutField::OffsetX => "offsetX",
            LayoutField::OffsetY => "offsetY",
            LayoutField::Width => "width",
            LayoutField::Height => "height",
            LayoutField::Order => "order",
        }
    }
}

impl fmt::Display for LayoutField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for LayoutField {
    type Err = anyhow::Error;

    /// Accepts the wire name (`offsetX`, `height`, ...)
    fn from_str(s: &str) -> Result<Self> {
        LayoutField::ALL
            .into_iter()
            .find(|field| field.name() == s)
            .ok_or_else(|| anyhow!("Unknown layout field '{}'", s))
    }
}

/// Default layout of a card, relative to the center anchor.
/// Some cards size to their content and have no fixed height.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardDefaults {
    #[serde(deserialize_with = "coerce::number")]
    pub offset_x: i32,
    #[serde(deserialize_with = "coerce::number")]
    pub offset_y: i32,
    #[serde(deserialize_with = "coerce::number")]
    pub width: i32,
    #[serde(default, deserialize_with = "coerce::optional_number", skip_serializing_if = "Option::is_none")]
    pub height: Option<i32>,
    #[serde(deserialize_with = "coerce::number")]
    pub order: i32,
}

impl CardDefaults {
    pub const fn new(offset_x: i32, offset_y: i32, width: i32, height: Option<i32>, order: i32) -> Self {
        Self { offset_x, offset_y, width, height, order }
    }

    /// Default value of `field`; `None` only for a missing height
    pub fn get(&self, field: LayoutField) -> Option<i32> {
        match field {
            LayoutField::OffsetX => Some(self.offset_x),
            LayoutField::OffsetY => Some(self.offset_y),
            LayoutField::Width => Some(self.width),
            LayoutField::Height => self.height,
            LayoutField::Order => Some(self.order),
        }
    }
}

/// A point in viewport space (center anchor, pointer position)
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

impl FromStr for Point {
    type Err = anyhow::Error;

    /// Parses `X,Y`
    fn from_str(s: &str) -> Result<Self> {
        let (x, y) = s
            .split_once(',')
            .ok_or_else(|| anyhow!("Expected 'X,Y', got '{}'", s))?;
        let x = x.trim().parse::<f64>().map_err(|e| anyhow!("Invalid x '{}': {}", x, e))?;
        let y = y.trim().parse::<f64>().map_err(|e| anyhow!("Invalid y '{}': {}", y, e))?;
        Ok(Point::new(x, y))
    }
}

/// Rounds half-way values toward positive infinity (`-2.5` → `-2`, `2.5` → `3`).
///
/// Layout values written by earlier versions of the dashboard were rounded
/// this way, so drag results must match it to avoid off-by-one diffs.
pub fn round_half_up(value: f64) -> i32 {
    (value + 0.5).floor() as i32
}

/// Serde helpers that accept integer or float JSON numbers for pixel fields
pub(crate) mod coerce {
    use serde::{Deserialize, Deserializer};

    use super::round_half_up;

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum IntOrFloat {
        Int(i64),
        Float(f64),
    }

    impl IntOrFloat {
        fn into_pixels(self) -> i32 {
            match self {
                IntOrFloat::Int(i) => i.clamp(i32::MIN as i64, i32::MAX as i64) as i32,
                IntOrFloat::Float(f) => round_half_up(f),
            }
        }
    }

    pub fn number<'de, D>(deserializer: D) -> Result<i32, D::Error>
    where
        D: Deserializer<'de>,
    {
        IntOrFloat::deserialize(deserializer).map(IntOrFloat::into_pixels)
    }

    /// Like [`number`], with `null` meaning absent
    pub fn optional_number<'de, D>(deserializer: D) -> Result<Option<i32>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(Option::<IntOrFloat>::deserialize(deserializer)?.map(IntOrFloat::into_pixels))
    }
}
