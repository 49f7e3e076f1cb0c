//! Dependency Advisor - dependency upgrade risk scoring and recommendations
//!
//! Combines repository health signals, known vulnerabilities and the opinion of
//! an advisory language model into bounded scores, a risk level and an upgrade
//! recommendation. Laid out in domain, application, infrastructure and
//! presentation layers.

pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod logging;
pub mod presentation;

pub use config::Config;
pub use logging::init_tracing;
