//! Exports the complete TAF accreditation register as CSV.
//!
//! The pipeline pages through the list endpoint, drops duplicate identifiers,
//! fetches per-record details with bounded concurrency, flattens list and
//! detail fields into one row per record, and serializes the rows as CSV.
//! See [`scraper::run_export`] for the end-to-end entry point.

pub mod config;
pub mod csv_export;
pub mod delivery;
pub mod error;
pub mod merge;
pub mod models;
pub mod progress;
pub mod routes;
pub mod scraper;
pub mod taf_api;
pub mod task_runner;
