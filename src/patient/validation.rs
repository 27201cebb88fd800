use serde::Serialize;
use std::fmt;
use thiserror::Error;

use super::metrics::bmi;
use super::PatientRecord;

/// Exclusive lower bound on age, in years.
pub const MIN_AGE_EXCLUSIVE: i64 = 0;
/// Exclusive upper bound on age, in years.
pub const MAX_AGE_EXCLUSIVE: i64 = 120;

/// A single failed field constraint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldViolation {
    pub field: String,
    pub constraint: String,
}

impl FieldViolation {
    pub fn new(field: impl Into<String>, constraint: impl Into<String>) -> Self {
        FieldViolation {
            field: field.into(),
            constraint: constraint.into(),
        }
    }
}

impl fmt::Display for FieldViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.constraint)
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("invalid record: {}", join(.0))]
    Fields(Vec<FieldViolation>),
    #[error("malformed record: {0}")]
    Malformed(String),
}

impl ValidationError {
    pub fn field(field: impl Into<String>, constraint: impl Into<String>) -> Self {
        ValidationError::Fields(vec![FieldViolation::new(field, constraint)])
    }

    pub fn violations(&self) -> &[FieldViolation] {
        match self {
            ValidationError::Fields(violations) => violations,
            ValidationError::Malformed(_) => &[],
        }
    }
}

fn join(violations: &[FieldViolation]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Check every field constraint on a full record.
///
/// All violations are reported together. Gender is enforced by its type, so
/// a record that deserialized at all already carries an allowed value.
pub fn validate(record: &PatientRecord) -> Result<(), ValidationError> {
    let mut violations = Vec::new();

    if record.age <= MIN_AGE_EXCLUSIVE || record.age >= MAX_AGE_EXCLUSIVE {
        violations.push(FieldViolation::new(
            "age",
            format!(
                "must be greater than {} and less than {}",
                MIN_AGE_EXCLUSIVE, MAX_AGE_EXCLUSIVE
            ),
        ));
    }
    // written as !(x > 0) so NaN fails too
    if !(record.height > 0.0) {
        violations.push(FieldViolation::new("height", "must be greater than 0"));
    }
    if !(record.weight > 0.0) {
        violations.push(FieldViolation::new("weight", "must be greater than 0"));
    }
    if violations.is_empty() && !bmi(record.height, record.weight).is_finite() {
        // height² underflows to zero or weight overflows the rounding step
        let field = if (record.height * record.height).is_normal() {
            "weight"
        } else {
            "height"
        };
        violations.push(FieldViolation::new(field, "out of range for computing bmi"));
    }

    if violations.is_empty() {
        Ok(())
    } else {
        Err(ValidationError::Fields(violations))
    }
}
