//! LibreLinkUp trend arrows
//!
//! The service reports direction as an integer code, 1 (falling fast)
//! through 4 (stable) to 7 (rising fast).

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trend {
    FallingFast,
    Falling,
    FallingSlowly,
    Stable,
    RisingSlowly,
    Rising,
    RisingFast,
}

impl Trend {
    /// Map a service trend code; codes outside 1..=7 have no trend
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            1 => Some(Trend::FallingFast),
            2 => Some(Trend::Falling),
            3 => Some(Trend::FallingSlowly),
            4 => Some(Trend::Stable),
            5 => Some(Trend::RisingSlowly),
            6 => Some(Trend::Rising),
            7 => Some(Trend::RisingFast),
            _ => None,
        }
    }

    pub fn glyph(self) -> &'static str {
        match self {
            Trend::FallingFast => "⇊",
            Trend::Falling => "↓",
            Trend::FallingSlowly => "↘",
            Trend::Stable => "→",
            Trend::RisingSlowly => "↗",
            Trend::Rising => "↑",
            Trend::RisingFast => "⇈",
        }
    }
}

/// Arrow glyph for an optional trend code, empty when unknown
pub fn arrow_for(code: Option<i64>) -> &'static str {
    code.and_then(Trend::from_code).map_or("", Trend::glyph)
}
