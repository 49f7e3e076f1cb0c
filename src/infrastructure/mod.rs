//! Infrastructure Layer - External concerns and implementations
//!
//! This module talks to the outside world: the code-hosting provider, the
//! vulnerability database and the advisory model.

pub mod advisory;
pub mod api_clients;
pub mod repository_source;
pub mod resilience;

// Re-export specific items to avoid ambiguous glob conflicts
pub use advisory::{AdvisoryModel, GeminiAdvisoryModel, GenerationOptions, ResponseParser};
pub use api_clients::{OsvClient, VulnerabilitySource};
pub use repository_source::*;
pub use resilience::*;
