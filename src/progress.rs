//! Progress and diagnostics reporting.
//!
//! The pipeline never logs progress directly; it reports [`ProgressEvent`]s to a
//! [`ProgressSink`]. [`TracingProgress`] is the sink used by the binary and the
//! HTTP handlers. Tests substitute a recording sink.

use std::time::Duration;

#[derive(Debug, Clone, PartialEq)]
pub enum ProgressEvent {
    ListStarted { page_size: u32 },
    ListDiscovered { query_count: u64, page_count: u32 },
    PageFetched { page: u32, page_count: u32, received: usize, total: usize },
    Deduplicated { unique: usize },
    DetailsStarted { count: usize },
    DetailFailed { uuid: String, message: String },
    Completed { rows: usize, filename: String, elapsed: Duration },
}

pub trait ProgressSink: Send + Sync {
    fn report(&self, event: ProgressEvent);
}

/// Writes every observation to the `tracing` subscriber.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingProgress;

impl ProgressSink for TracingProgress {
    fn report(&self, event: ProgressEvent) {
        match event {
            ProgressEvent::ListStarted { page_size } => {
                tracing::info!(page_size, "[TAF] Reading page 1 ({} per page)...", page_size);
            }
            ProgressEvent::ListDiscovered { query_count, page_count } => {
                tracing::info!(query_count, page_count, "[TAF] About {} records over {} pages.", query_count, page_count);
            }
            ProgressEvent::PageFetched { page, page_count, received, total } => {
                tracing::info!(page, page_count, received, total, "[TAF] Page {}/{} -> {} items, {} so far", page, page_count, received, total);
            }
            ProgressEvent::Deduplicated { unique } => {
                tracing::info!(unique, "[TAF] {} unique records after de-duplication", unique);
            }
            ProgressEvent::DetailsStarted { count } => {
                tracing::info!(count, "[TAF] Fetching details and merging fields...");
            }
            ProgressEvent::DetailFailed { uuid, message } => {
                tracing::warn!(uuid = %uuid, error = %message, "[TAF] Detail fetch failed: {} {}", uuid, message);
            }
            ProgressEvent::Completed { rows, filename, elapsed } => {
                tracing::info!(rows, filename = %filename, elapsed_ms = elapsed.as_millis() as u64, "[TAF] Done, {} rows -> {}", rows, filename);
            }
        }
    }
}
