//! Application-wide constants
//!
//! Layout geometry, resize clamps and file locations live here so the
//! registry, drag controller and config loader agree on the same numbers.

/// Spacing between neighbouring cards in the default arrangement
pub mod spacing {
    /// Gap in pixels between adjacent cards
    pub const CARD_SPACING: i32 = 36;
}

/// Geometry the built-in card defaults are derived from
pub mod geometry {
    pub const HI_WIDTH: i32 = 360;
    pub const HI_HEIGHT: i32 = 288;
    pub const HI_HALF_WIDTH: i32 = HI_WIDTH / 2;
    pub const HI_HALF_HEIGHT: i32 = HI_HEIGHT / 2;

    pub const ART_HEIGHT: i32 = 200;

    pub const CLOCK_WIDTH: i32 = 232;
    pub const CLOCK_HEIGHT: i32 = 132;
    /// Vertical distance from the hero card's center to the clock's bottom edge
    pub const CLOCK_OFFSET: i32 = 92;

    pub const CALENDAR_WIDTH: i32 = 350;
    pub const CALENDAR_HEIGHT: i32 = 286;

    pub const MUSIC_WIDTH: i32 = 293;
    pub const MUSIC_HEIGHT: i32 = 66;
    /// Music card sits left-shifted under the calendar
    pub const MUSIC_SHIFT: i32 = 120;

    pub const SOCIAL_WIDTH: i32 = 315;
    pub const SOCIAL_HEIGHT: i32 = 48;

    pub const SHARE_WIDTH: i32 = 200;
    pub const ARTICLE_WIDTH: i32 = 266;

    pub const NAV_WIDTH: i32 = 280;
    pub const NAV_HEIGHT: i32 = 434;
}

/// Resize clamps applied by the drag controller
pub mod resize {
    /// Smallest width a resize gesture may produce
    pub const MIN_WIDTH: f64 = 80.0;

    /// Smallest height a resize gesture may produce
    pub const MIN_HEIGHT: f64 = 60.0;
}

/// Config file locations
pub mod config {
    /// Directory under the platform config dir
    pub const APP_DIR: &str = "card-layout";

    /// Settings file name
    pub const SETTINGS_FILENAME: &str = "settings.json";

    /// Persisted override payload file name
    pub const LAYOUT_FILENAME: &str = "layout-config.json";
}
