//! # Collectors Module
//!
//! Turns a process group id into classified per-processor execution counts.
//!
//! ## Architecture
//!
//! - **`ProcessorEnumerator`**: walks a process group tree and lists every processor in it
//! - **`CountRetriever` trait**: interface for the two ways of counting executions
//! - **`ProvenanceCounter`**: windowed counts from asynchronous provenance searches
//! - **`StatusCounter`**: all-time counts from group status snapshots
//! - **`aggregator`**: joins processors with counts, classifies and sorts them
//! - **`UsageOrchestrator`**: runs the pipeline for one group or a batch of groups

pub mod aggregator;
pub mod counter;
pub mod enumerator;
pub mod orchestrator;
pub mod provenance_counter;
pub mod status_counter;

// Re-export the main types for easy access
pub use counter::{
    CountMap,
    CountRetriever,
};
pub use enumerator::{
    short_type,
    ChildGroup,
    EnumeratedGroup,
    ProcessorEnumerator,
};
pub use orchestrator::{
    BatchReport,
    GroupOutcome,
    RunSummary,
    UsageOrchestrator,
};
pub use provenance_counter::{
    ProvenanceCounter,
    ProvenanceOptions,
    DEFAULT_MAX_RESULTS,
    MIN_MAX_RESULTS,
};
pub use status_counter::StatusCounter;
