//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - metric/mode enums and the `(country, Metric)` column key (`types`)
//! - the wide per-country table produced by ingestion (`table`)
//! - the tidy long-form slice produced by the reshaper (`tidy`)

pub mod table;
pub mod tidy;
pub mod types;

pub use table::*;
pub use tidy::*;
pub use types::*;
