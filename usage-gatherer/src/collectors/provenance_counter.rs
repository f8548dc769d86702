use crate::{
    client::{
        model::{
            Provenance,
            ProvenanceRequest,
        },
        NifiApi,
    },
    collectors::{
        CountMap,
        CountRetriever,
    },
    error::Result,
    metrics::{
        Completeness,
        ExecutionCount,
        ProcessorDescriptor,
        TimeWindow,
    },
};
use futures::{
    stream,
    StreamExt,
    TryStreamExt,
};
use std::{
    future::Future,
    pin::Pin,
    time::Duration,
};
use tokio::time::{
    sleep_until,
    timeout_at,
    Instant,
};

/// The server misbehaves for result caps below this value.
pub const MIN_MAX_RESULTS: u32 = 200;
pub const DEFAULT_MAX_RESULTS: u32 = 1000;
/// Longest budget a single search can be given.
pub const MAX_QUERY_TIMEOUT: Duration = Duration::from_secs(24 * 60 * 60);

#[derive(Debug, Clone)]
pub struct ProvenanceOptions {
    pub window: TimeWindow,
    pub max_results: u32,
    pub poll_interval: Duration,
    /// Overall budget for one processor's search, submit included.
    pub query_timeout: Duration,
    /// Searches in flight at the same time.
    pub concurrency: usize,
}

impl ProvenanceOptions {
    pub fn new(window: TimeWindow) -> Self {
        Self {
            window,
            max_results: DEFAULT_MAX_RESULTS,
            poll_interval: Duration::from_secs(1),
            query_timeout: Duration::from_secs(30),
            concurrency: 4,
        }
    }

    /// Cap sent to the server. Counts are still clamped to `max_results` afterwards.
    pub fn request_max_results(&self) -> u32 {
        self.max_results.max(MIN_MAX_RESULTS)
    }

    /// `query_timeout`, bounded by [`MAX_QUERY_TIMEOUT`].
    pub fn effective_query_timeout(&self) -> Duration {
        self.query_timeout.min(MAX_QUERY_TIMEOUT)
    }
}

enum PollOutcome {
    Finished(Provenance),
    TimedOut(Provenance),
}

/// Counts events per processor over a time window with asynchronous provenance searches.
///
/// Each search is submitted, polled until the server reports it finished or the deadline passes,
/// and then discarded.
#[derive(Debug, Clone)]
pub struct ProvenanceCounter {
    options: ProvenanceOptions,
}

impl ProvenanceCounter {
    pub fn new(options: ProvenanceOptions) -> Self {
        if options.max_results < MIN_MAX_RESULTS {
            debug!(
                cap = options.max_results,
                requested = MIN_MAX_RESULTS,
                "Result cap below the provenance endpoint minimum, clamping counts locally"
            );
        }
        if options.query_timeout > MAX_QUERY_TIMEOUT {
            warn!(
                requested = ?options.query_timeout,
                used = ?MAX_QUERY_TIMEOUT,
                "Provenance query timeout too long, capping it"
            );
        }
        Self { options }
    }

    pub fn options(&self) -> &ProvenanceOptions {
        &self.options
    }

    #[instrument(skip_all, fields(processor = %processor.id))]
    async fn count_one(&self, api: &dyn NifiApi, processor: &ProcessorDescriptor) -> Result<ExecutionCount> {
        let window = self.options.window;
        let cap = u64::from(self.options.max_results);
        let deadline = Instant::now() + self.options.effective_query_timeout();
        let request = ProvenanceRequest::for_component(&processor.id, &window, self.options.request_max_results());

        let submitted = match timeout_at(deadline, api.submit_provenance(&request)).await {
            Ok(Ok(entity)) => entity.provenance,
            Ok(Err(err)) if err.is_fatal_for_run() => return Err(err),
            Ok(Err(err)) => {
                warn!(error = %err, "Provenance search could not be submitted");
                return Ok(ExecutionCount::unknown(&processor.id, err, Some(window)));
            }
            Err(_) => {
                warn!("Provenance search submission timed out");
                return Ok(ExecutionCount::unknown(
                    &processor.id,
                    "provenance search submission timed out",
                    Some(window),
                ));
            }
        };

        let query_id = submitted.id.clone();
        let outcome = self.poll(api, submitted, deadline).await;

        if let Err(err) = api.discard_provenance(&query_id).await {
            debug!(query_id = %query_id, error = %err, "Could not discard provenance search");
        }

        let count = match outcome {
            Ok(PollOutcome::Finished(provenance)) => match provenance.total_count() {
                Some(total) if total >= cap => {
                    ExecutionCount::windowed(&processor.id, cap, window, Completeness::Capped)
                }
                Some(total) => ExecutionCount::windowed(&processor.id, total, window, Completeness::Complete),
                None => ExecutionCount::unknown(&processor.id, "finished search reported no total", Some(window)),
            },
            Ok(PollOutcome::TimedOut(provenance)) => {
                warn!(timeout = ?self.options.query_timeout, "Provenance search did not finish in time");
                match provenance.total_count() {
                    Some(total) => ExecutionCount::windowed(
                        &processor.id,
                        total.min(cap),
                        window,
                        Completeness::TimedOut,
                    ),
                    None => ExecutionCount::unknown(
                        &processor.id,
                        "provenance search timed out before reporting results",
                        Some(window),
                    ),
                }
            }
            Err(err) if err.is_fatal_for_run() => return Err(err),
            Err(err) => {
                warn!(error = %err, "Provenance search failed while polling");
                ExecutionCount::unknown(&processor.id, err, Some(window))
            }
        };
        trace!(?count, "Provenance count settled");
        Ok(count)
    }

    async fn poll(&self, api: &dyn NifiApi, mut current: Provenance, deadline: Instant) -> Result<PollOutcome> {
        loop {
            if current.finished {
                return Ok(PollOutcome::Finished(current));
            }
            let now = Instant::now();
            if now >= deadline {
                return Ok(PollOutcome::TimedOut(current));
            }
            let next = now.checked_add(self.options.poll_interval).map_or(deadline, |next| next.min(deadline));
            sleep_until(next).await;

            match timeout_at(deadline, api.provenance_status(&current.id)).await {
                Ok(Ok(entity)) => {
                    trace!(
                        query_id = %entity.provenance.id,
                        percent = ?entity.provenance.percent_completed,
                        "Provenance search progress"
                    );
                    current = entity.provenance;
                }
                Ok(Err(err)) => return Err(err),
                Err(_) => return Ok(PollOutcome::TimedOut(current)),
            }
        }
    }
}

impl CountRetriever for ProvenanceCounter {
    fn fetch_counts<'a>(
        &'a self,
        api: &'a dyn NifiApi,
        processors: &'a [ProcessorDescriptor],
    ) -> Pin<Box<dyn Future<Output = Result<CountMap>> + Send + 'a>> {
        Box::pin(async move {
            let pending: Vec<_> = processors
                .iter()
                .map(|processor| self.count_one(api, processor))
                .collect();
            let counts: Vec<ExecutionCount> = stream::iter(pending)
                .buffer_unordered(self.options.concurrency.max(1))
                .try_collect()
                .await?;

            Ok(counts
                .into_iter()
                .map(|count| (count.processor_id.clone(), count))
                .collect())
        })
    }

    fn window(&self) -> Option<TimeWindow> {
        Some(self.options.window)
    }

    fn name(&self) -> &'static str {
        "provenance"
    }
}
