//! Glucose unit types, conversion and level classification
//!
//! The service reports values in mg/dL. Thresholds are configured in mmol/L,
//! so every classification converts first and compares in mmol/L whatever
//! the display unit is.

use serde::{Deserialize, Serialize};

/// mg/dL per mmol/L of glucose
pub const MGDL_PER_MMOL: f64 = 18.0182;

/// Glucose value in mg/dL (milligrams per deciliter)
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct MgDl(pub f64);

/// Glucose value in mmol/L (millimoles per liter)
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct MmolL(pub f64);

impl MgDl {
    /// Convert to mmol/L at full precision
    pub fn to_mmol(self) -> MmolL {
        MmolL(self.0 / MGDL_PER_MMOL)
    }

    /// Format as a rounded integer without unit suffix
    pub fn format_value(self) -> String {
        format!("{}", self.0.round() as i64)
    }
}

impl MmolL {
    /// Format with one decimal place without unit suffix
    pub fn format_value(self) -> String {
        format!("{:.1}", self.0)
    }
}

impl From<f64> for MgDl {
    fn from(value: f64) -> Self {
        MgDl(value)
    }
}

/// User's preferred display unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum GlucoseUnit {
    #[serde(rename = "mg/dL")]
    MgDl,
    #[serde(rename = "mmol/L")]
    #[default]
    MmolL,
}

impl GlucoseUnit {
    /// Format a reading without unit suffix in this unit
    pub fn format_value(self, value: MgDl) -> String {
        match self {
            GlucoseUnit::MgDl => value.format_value(),
            GlucoseUnit::MmolL => value.to_mmol().format_value(),
        }
    }

    /// Get the unit label
    pub fn label(self) -> &'static str {
        match self {
            GlucoseUnit::MgDl => "mg/dL",
            GlucoseUnit::MmolL => "mmol/L",
        }
    }
}

/// Low/high alert thresholds, always in mmol/L
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Thresholds {
    pub low_mmol: f64,
    pub high_mmol: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            low_mmol: 4.0,
            high_mmol: 10.0,
        }
    }
}

impl Thresholds {
    pub fn new(low_mmol: f64, high_mmol: f64) -> Self {
        Self { low_mmol, high_mmol }
    }

    /// Classify a reading. Low wins when the thresholds are inverted.
    pub fn classify(&self, value: MmolL) -> GlucoseLevel {
        if value.0 < self.low_mmol {
            GlucoseLevel::Low
        } else if value.0 > self.high_mmol {
            GlucoseLevel::High
        } else {
            GlucoseLevel::Normal
        }
    }
}

/// Classification of a glucose value against the configured thresholds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GlucoseLevel {
    Low,
    Normal,
    High,
}

impl GlucoseLevel {
    /// Short status text; empty for in-range readings
    pub fn label(self) -> &'static str {
        match self {
            GlucoseLevel::Low => "LOW",
            GlucoseLevel::Normal => "",
            GlucoseLevel::High => "HIGH",
        }
    }

    /// Display color as RGB hex
    pub fn color(self) -> &'static str {
        match self {
            GlucoseLevel::Low => "#E53935",
            GlucoseLevel::Normal => "#43A047",
            GlucoseLevel::High => "#FB8C00",
        }
    }
}
