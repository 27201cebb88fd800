//! HTTP surface

pub mod rest;

pub use rest::{ApiResponse, RestApi};
