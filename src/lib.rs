//! `covid-dash` library crate.
//!
//! The binary (`covid`) is a thin wrapper around this library so that:
//!
//! - the ingestion job and the dashboard share one codebase
//! - core logic is testable without spawning processes or touching the network

pub mod app;
pub mod cli;
pub mod dashboard;
pub mod data;
pub mod domain;
pub mod error;
pub mod io;
pub mod plot;
pub mod report;
pub mod reshape;
pub mod store;
