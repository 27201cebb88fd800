//! Derived health metrics
//!
//! Body-mass index and its categorical verdict are pure functions of height
//! and weight. They are computed whenever a record is viewed and are never
//! persisted.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Lower bound of the `Normal` band.
pub const NORMAL_LOWER: f64 = 18.5;
/// Lower bound of the `Overweight` band.
pub const OVERWEIGHT_LOWER: f64 = 25.0;
/// Lower bound of the `Obese` band.
pub const OBESE_LOWER: f64 = 30.0;

/// Categorical BMI classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Verdict {
    Underweight,
    Normal,
    Overweight,
    #[serde(rename = "obese")]
    Obese,
}

impl Verdict {
    /// Classify a (rounded) BMI value using half-open bands.
    pub fn from_bmi(bmi: f64) -> Self {
        if bmi < NORMAL_LOWER {
            Verdict::Underweight
        } else if bmi < OVERWEIGHT_LOWER {
            Verdict::Normal
        } else if bmi < OBESE_LOWER {
            Verdict::Overweight
        } else {
            Verdict::Obese
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Verdict::Underweight => "Underweight",
            Verdict::Normal => "Normal",
            Verdict::Overweight => "Overweight",
            Verdict::Obese => "obese",
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// weight / height², rounded to two decimals (half away from zero).
///
/// Callers guarantee `height > 0`; validation rejects anything else before a
/// record reaches this point.
pub fn bmi(height: f64, weight: f64) -> f64 {
    round2(weight / (height * height))
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
