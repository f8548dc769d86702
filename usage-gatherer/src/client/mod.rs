//! # Client Module
//!
//! Authenticated access to the NiFi REST API.
//!
//! - **`Session`**: a reqwest-backed, authenticated session (bearer token or basic credentials)
//! - **`NifiApi`**: the calls the enumerator and the count retrievers need, one method per effect
//! - **`model`**: serde types for the request and response bodies

pub mod model;
mod session;

pub use session::{
    normalize_base_url,
    Credentials,
    Session,
    SessionOptions,
};

use crate::error::Result;
use model::{
    ProcessGroupFlowEntity,
    ProcessGroupStatusEntity,
    ProvenanceEntity,
    ProvenanceRequest,
};
use std::{
    future::Future,
    pin::Pin,
};

pub type ApiFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + Send + 'a>>;

/// Read-only view of a NiFi server.
///
/// Implementations must not retry on their own; retry and timeout policy for the one operation that
/// needs it (provenance polling) lives in [`crate::ProvenanceCounter`].
pub trait NifiApi: Send + Sync {
    /// Processors and direct child groups of a process group. `"root"` addresses the top-level
    /// group.
    fn process_group_flow<'a>(&'a self, group_id: &'a str) -> ApiFuture<'a, ProcessGroupFlowEntity>;

    /// Live status snapshot of a process group, including per-processor invocation counters.
    fn process_group_status<'a>(&'a self, group_id: &'a str) -> ApiFuture<'a, ProcessGroupStatusEntity>;

    /// Submit an asynchronous provenance search. The returned handle is usually not finished yet.
    fn submit_provenance<'a>(&'a self, request: &'a ProvenanceRequest) -> ApiFuture<'a, ProvenanceEntity>;

    /// Current state of a previously submitted provenance search.
    fn provenance_status<'a>(&'a self, query_id: &'a str) -> ApiFuture<'a, ProvenanceEntity>;

    /// Drop a provenance search this client submitted.
    fn discard_provenance<'a>(&'a self, query_id: &'a str) -> ApiFuture<'a, ()>;
}
