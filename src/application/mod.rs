//! Application Layer - Analysis orchestration
//!
//! Coordinates signal collection, the advisory model and the domain scoring
//! services into recommendations, risk assessments and reports.

pub mod errors;
pub mod services;


pub use errors::*;
pub use services::*;
