//! Request bodies as they arrive on the wire
//!
//! Gender and age are kept loose here so that a bad value becomes a field
//! violation instead of an opaque deserialization failure.

use serde::Deserialize;
use serde_json::Number;

use super::{FieldViolation, Gender, Patient, PatientRecord, PatientUpdate, ValidationError};

#[derive(Debug, Clone, Deserialize)]
pub struct PatientPayload {
    pub id: String,
    pub name: String,
    pub city: String,
    pub age: Number,
    pub gender: String,
    pub height: f64,
    pub weight: f64,
}

/// Absent or null keys stay `None`; an `id` key is never read.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PatientUpdatePayload {
    pub name: Option<String>,
    pub city: Option<String>,
    pub age: Option<Number>,
    pub gender: Option<String>,
    pub height: Option<f64>,
    pub weight: Option<f64>,
}

impl TryFrom<PatientPayload> for Patient {
    type Error = ValidationError;

    fn try_from(payload: PatientPayload) -> Result<Self, Self::Error> {
        let age = whole_number("age", &payload.age);
        let gender = parse_gender(&payload.gender);

        match (age, gender) {
            (Ok(age), Ok(gender)) => Ok(Patient {
                id: payload.id,
                record: PatientRecord {
                    name: payload.name,
                    city: payload.city,
                    age,
                    gender,
                    height: payload.height,
                    weight: payload.weight,
                },
            }),
            (age, gender) => Err(ValidationError::Fields(
                age.err().into_iter().chain(gender.err()).collect(),
            )),
        }
    }
}

impl TryFrom<PatientUpdatePayload> for PatientUpdate {
    type Error = ValidationError;

    fn try_from(payload: PatientUpdatePayload) -> Result<Self, Self::Error> {
        let age = payload.age.as_ref().map(|n| whole_number("age", n)).transpose();
        let gender = payload.gender.as_deref().map(parse_gender).transpose();

        match (age, gender) {
            (Ok(age), Ok(gender)) => Ok(PatientUpdate {
                name: payload.name,
                city: payload.city,
                age,
                gender,
                height: payload.height,
                weight: payload.weight,
            }),
            (age, gender) => Err(ValidationError::Fields(
                age.err().into_iter().chain(gender.err()).collect(),
            )),
        }
    }
}

fn parse_gender(raw: &str) -> Result<Gender, FieldViolation> {
    raw.parse::<Gender>().map_err(|e| {
        e.violations()
            .first()
            .cloned()
            .unwrap_or_else(|| FieldViolation::new("gender", "must be one of male, female, others"))
    })
}

/// Integers pass through; floats are accepted only when whole-valued.
fn whole_number(field: &str, value: &Number) -> Result<i64, FieldViolation> {
    if let Some(n) = value.as_i64() {
        return Ok(n);
    }
    match value.as_f64() {
        // out-of-range values saturate and then fail the range check
        Some(f) if f.is_finite() && f.fract() == 0.0 => Ok(f as i64),
        _ => Err(FieldViolation::new(field, "must be a whole number")),
    }
}
