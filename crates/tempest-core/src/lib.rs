//! Core data types, observation storage, and derived analytics
//!
//! This crate provides the shared in-memory observation store plus the
//! pure meteorological computations (sea-level pressure, trend/forecast
//! classification, rainfall accounting) and the chart history reducer.

pub mod analytics;
pub mod reduce;
pub mod store;
pub mod types;

pub use analytics::*;
pub use reduce::*;
pub use store::*;
pub use types::*;
