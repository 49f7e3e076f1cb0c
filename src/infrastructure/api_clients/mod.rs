//! API clients for external vulnerability databases

pub mod osv;
pub mod traits;

pub use osv::*;
pub use traits::*;
