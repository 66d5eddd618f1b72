//! Input/output helpers.
//!
//! - feed CSV parsing and reshaping (`ingest`)
//! - tidy slice CSV export (`export`)

pub mod export;
pub mod ingest;

pub use export::*;
pub use ingest::*;
