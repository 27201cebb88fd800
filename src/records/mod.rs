//! Record operations
//!
//! `RecordService` maps each create/read/update/delete/sort request onto a
//! single load (and, for writes, save) of the patient store.

pub mod sort;
pub use sort::{sort_views, SortField, SortOrder};

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::error::RecordError;
use crate::patient::{validate, Patient, PatientUpdate, PatientView};
use crate::storage::{Collection, PatientStore};

pub struct RecordService {
    store: Arc<PatientStore>,
}

impl RecordService {
    pub fn new(store: Arc<PatientStore>) -> Self {
        RecordService { store }
    }

    /// Every record with its derived metrics, keyed by identifier.
    pub fn list(&self) -> Result<BTreeMap<String, PatientView>, RecordError> {
        let views: BTreeMap<String, PatientView> = self.store.read(|collection| {
            collection
                .iter()
                .map(|(id, record)| (id.clone(), PatientView::new(id.as_str(), record.clone())))
                .collect()
        })?;
        Ok(views)
    }

    pub fn get(&self, id: &str) -> Result<PatientView, RecordError> {
        self.store
            .read(|collection| collection.get(id).cloned())?
            .map(|record| PatientView::new(id, record))
            .ok_or_else(|| RecordError::NotFound(id.to_string()))
    }

    /// All records ordered by `sort_by` (height, weight or bmi).
    pub fn sorted(&self, sort_by: &str, order: &str) -> Result<Vec<PatientView>, RecordError> {
        let field: SortField = sort_by.parse()?;
        let order: SortOrder = order.parse()?;

        let views = self.store.read(all_views)?;
        Ok(sort_views(views, field, order))
    }

    pub fn create(&self, patient: Patient) -> Result<PatientView, RecordError> {
        validate(&patient.record)?;

        self.store.update(|collection| -> Result<PatientView, RecordError> {
            if collection.contains_key(&patient.id) {
                return Err(RecordError::AlreadyExists(patient.id.clone()));
            }
            collection.insert(patient.id.clone(), patient.record.clone());
            log::info!("Created patient {}", patient.id);
            Ok(PatientView::new(patient.id.as_str(), patient.record.clone()))
        })
    }

    pub fn update(&self, id: &str, update: &PatientUpdate) -> Result<PatientView, RecordError> {
        self.store.update(|collection| -> Result<PatientView, RecordError> {
            let existing = collection
                .get_mut(id)
                .ok_or_else(|| RecordError::NotFound(id.to_string()))?;

            let merged = existing.merge(update)?;
            *existing = merged.clone();
            log::info!("Updated patient {}", id);
            Ok(PatientView::new(id, merged))
        })
    }

    pub fn delete(&self, id: &str) -> Result<(), RecordError> {
        self.store.update(|collection| -> Result<(), RecordError> {
            collection
                .remove(id)
                .ok_or_else(|| RecordError::NotFound(id.to_string()))?;
            log::info!("Deleted patient {}", id);
            Ok(())
        })
    }
}

fn all_views(collection: &Collection) -> Vec<PatientView> {
    collection
        .iter()
        .map(|(id, record)| PatientView::new(id.as_str(), record.clone()))
        .collect()
}
