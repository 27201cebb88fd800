//! Patient record model
//!
//! This module contains the stored patient record, the create and sparse
//! update payloads, and the read model carrying the derived metrics.

pub mod metrics;
pub mod payload;
pub mod validation;

pub use metrics::{bmi, Verdict};
pub use payload::{PatientPayload, PatientUpdatePayload};
pub use validation::{validate, FieldViolation, ValidationError};

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum Gender {
    Male,
    Female,
    Others,
}

impl Gender {
    pub fn as_str(self) -> &'static str {
        match self {
            Gender::Male => "male",
            Gender::Female => "female",
            Gender::Others => "others",
        }
    }
}

impl FromStr for Gender {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "male" => Ok(Gender::Male),
            "female" => Ok(Gender::Female),
            "others" => Ok(Gender::Others),
            _ => Err(ValidationError::field(
                "gender",
                format!("must be one of male, female, others (got '{}')", s),
            )),
        }
    }
}

impl TryFrom<String> for Gender {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A patient as persisted: keyed externally by identifier, no derived fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatientRecord {
    pub name: String,
    pub city: String,
    pub age: i64,
    pub gender: Gender,
    /// Metres
    pub height: f64,
    /// Kilograms
    pub weight: f64,
}

impl PatientRecord {
    pub fn bmi(&self) -> f64 {
        bmi(self.height, self.weight)
    }

    pub fn verdict(&self) -> Verdict {
        Verdict::from_bmi(self.bmi())
    }

    /// Overlay the fields present in `update` and re-validate the whole result.
    ///
    /// `self` is left untouched; on failure nothing has changed.
    pub fn merge(&self, update: &PatientUpdate) -> Result<PatientRecord, ValidationError> {
        let mut merged = self.clone();

        if let Some(name) = &update.name {
            merged.name = name.clone();
        }
        if let Some(city) = &update.city {
            merged.city = city.clone();
        }
        if let Some(age) = update.age {
            merged.age = age;
        }
        if let Some(gender) = update.gender {
            merged.gender = gender;
        }
        if let Some(height) = update.height {
            merged.height = height;
        }
        if let Some(weight) = update.weight {
            merged.weight = weight;
        }

        validate(&merged)?;
        Ok(merged)
    }
}

/// A checked create request: the identifier plus a full record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Patient {
    pub id: String,
    #[serde(flatten)]
    pub record: PatientRecord,
}

/// Sparse update. `None` leaves the stored value untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PatientUpdate {
    pub name: Option<String>,
    pub city: Option<String>,
    pub age: Option<i64>,
    pub gender: Option<Gender>,
    pub height: Option<f64>,
    pub weight: Option<f64>,
}

/// Read model with metrics computed from the current height and weight.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PatientView {
    pub id: String,
    #[serde(flatten)]
    pub record: PatientRecord,
    pub bmi: f64,
    pub verdict: Verdict,
}

impl PatientView {
    pub fn new(id: impl Into<String>, record: PatientRecord) -> Self {
        let bmi = record.bmi();
        PatientView {
            id: id.into(),
            bmi,
            verdict: Verdict::from_bmi(bmi),
            record,
        }
    }
}
