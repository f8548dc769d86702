use crate::{
    client::NifiApi,
    error::Result,
    metrics::{
        ExecutionCount,
        ProcessorDescriptor,
        TimeWindow,
    },
};
use std::{
    collections::BTreeMap,
    future::Future,
    pin::Pin,
};

/// Counts keyed by processor id.
pub type CountMap = BTreeMap<String, ExecutionCount>;

/// Trait for turning a list of processors into execution counts
pub trait CountRetriever: Send + Sync {
    /// Fetch one count per processor. Per-processor failures are reported as unknown counts; only
    /// errors that make the whole run pointless (credentials, TLS) come back as `Err`.
    fn fetch_counts<'a>(
        &'a self,
        api: &'a dyn NifiApi,
        processors: &'a [ProcessorDescriptor],
    ) -> Pin<Box<dyn Future<Output = Result<CountMap>> + Send + 'a>>;

    /// The period the counts refer to, `None` for all-time counters.
    fn window(&self) -> Option<TimeWindow>;

    /// Get the name of this retriever
    fn name(&self) -> &'static str;
}
