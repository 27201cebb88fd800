//! PatientDB: a small patient record service
//!
//! Patient records are kept in a single JSON document keyed by identifier.
//! Body-mass index and its verdict are derived from height and weight on
//! every read and never stored.

pub mod api;
pub mod config;
pub mod error;
pub mod patient;
pub mod records;
pub mod storage;

pub use error::RecordError;
pub use patient::{Gender, Patient, PatientRecord, PatientUpdate, PatientView, Verdict};
pub use records::RecordService;
pub use storage::PatientStore;
