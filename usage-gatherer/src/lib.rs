//! # NiFi Usage Gatherer
//!
//! Measures how often each processor in an Apache NiFi process group actually runs, so that
//! unused and rarely used processors can be found and pruned.
//!
//! ## Features
//!
//! - **Recursive enumeration**: every processor in a process group and all nested groups
//! - **Windowed counts**: events per processor over the last N days from provenance searches
//! - **Cumulative counts**: all-time invocation counters from group status snapshots
//! - **Classification**: `UNUSED` (0), `LOW` (1..9) and `ACTIVE` (10 or more), with failed lookups
//!   kept apart as `NO_DATA`
//! - **Batch mode**: many flows in one run, one failing flow does not stop the rest
//! - **Exports**: per-group CSV, combined time-stamped batch CSV and a chart series as JSON
//!
//! ## Architecture
//!
//! - **`client`**: authenticated REST session and the `NifiApi` seam
//! - **`metrics`**: data structures for descriptors, counts and reports
//! - **`collectors`**: enumeration, the two count retrievers, aggregation and orchestration
//! - **`export`** / **`display`**: file outputs and terminal tables

#[macro_use]
extern crate tracing;

pub mod client;
pub mod collectors;
pub mod display;
pub mod error;
pub mod export;
pub mod metrics;

#[cfg(test)]
pub(crate) mod testing;

pub use client::{
    Credentials,
    NifiApi,
    Session,
    SessionOptions,
};
pub use collectors::*;
pub use error::{
    NifiError,
    Result,
};
pub use metrics::*;
