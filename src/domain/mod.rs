//! Domain Layer - Core business logic and entities
//!
//! This module contains the entities, value objects and domain services that
//! turn collected signals into risk scores and upgrade recommendations.

pub mod entities;
pub mod errors;
pub mod services;
pub mod value_objects;

pub use entities::*;
pub use errors::*;
pub use services::*;
pub use value_objects::*;
