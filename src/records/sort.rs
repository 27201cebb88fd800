use std::str::FromStr;

use crate::error::RecordError;
use crate::patient::PatientView;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortField {
    Height,
    Weight,
    Bmi,
}

impl SortField {
    fn key(self, view: &PatientView) -> f64 {
        match self {
            SortField::Height => view.record.height,
            SortField::Weight => view.record.weight,
            SortField::Bmi => view.bmi,
        }
    }
}

impl FromStr for SortField {
    type Err = RecordError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "height" => Ok(SortField::Height),
            "weight" => Ok(SortField::Weight),
            "bmi" => Ok(SortField::Bmi),
            _ => Err(RecordError::InvalidArgument(format!(
                "invalid sort field '{}', select from ['height', 'weight', 'bmi']",
                s
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl FromStr for SortOrder {
    type Err = RecordError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "asc" => Ok(SortOrder::Asc),
            "desc" => Ok(SortOrder::Desc),
            _ => Err(RecordError::InvalidArgument(format!(
                "invalid sort order '{}', select from ['asc', 'desc']",
                s
            ))),
        }
    }
}

/// Stable sort: equal keys keep their input order in both directions.
pub fn sort_views(mut views: Vec<PatientView>, field: SortField, order: SortOrder) -> Vec<PatientView> {
    match order {
        SortOrder::Asc => views.sort_by(|a, b| field.key(a).total_cmp(&field.key(b))),
        SortOrder::Desc => views.sort_by(|a, b| field.key(b).total_cmp(&field.key(a))),
    }
    views
}
