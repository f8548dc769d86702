use crate::{
    client::NifiApi,
    collectors::{
        CountMap,
        CountRetriever,
    },
    error::Result,
    metrics::{
        ExecutionCount,
        ProcessorDescriptor,
        TimeWindow,
    },
};
use std::{
    collections::{
        BTreeMap,
        HashMap,
    },
    future::Future,
    pin::Pin,
};

/// Reads the all-time invocation counters from each owning group's status snapshot.
///
/// One status call per distinct group, no matter how many processors it holds.
#[derive(Debug, Clone, Default)]
pub struct StatusCounter;

impl StatusCounter {
    pub fn new() -> Self {
        Self
    }

    async fn count_group(
        &self,
        api: &dyn NifiApi,
        group_id: &str,
        processors: &[&ProcessorDescriptor],
        counts: &mut CountMap,
    ) -> Result<()> {
        let status = match api.process_group_status(group_id).await {
            Ok(status) => status,
            Err(err) if err.is_fatal_for_run() => return Err(err),
            Err(err) => {
                warn!(group_id, error = %err, "Status snapshot unavailable, counts for this group are unknown");
                for processor in processors {
                    counts.insert(
                        processor.id.clone(),
                        ExecutionCount::unknown(&processor.id, format!("status unavailable: {err}"), None),
                    );
                }
                return Ok(());
            }
        };

        let invocations: HashMap<String, Option<u64>> = status
            .process_group_status
            .aggregate_snapshot
            .processor_status_snapshots
            .into_iter()
            .map(|entity| (entity.id, entity.processor_status_snapshot.invocations))
            .collect();

        for processor in processors {
            let count = match invocations.get(&processor.id) {
                Some(Some(count)) => ExecutionCount::cumulative(&processor.id, *count),
                Some(None) => ExecutionCount::unknown(&processor.id, "status snapshot has no invocation counter", None),
                None => ExecutionCount::unknown(&processor.id, "processor missing from status snapshot", None),
            };
            counts.insert(processor.id.clone(), count);
        }
        Ok(())
    }
}

impl CountRetriever for StatusCounter {
    fn fetch_counts<'a>(
        &'a self,
        api: &'a dyn NifiApi,
        processors: &'a [ProcessorDescriptor],
    ) -> Pin<Box<dyn Future<Output = Result<CountMap>> + Send + 'a>> {
        Box::pin(async move {
            let mut by_group: BTreeMap<&str, Vec<&ProcessorDescriptor>> = BTreeMap::new();
            for processor in processors {
                by_group.entry(processor.group_id.as_str()).or_default().push(processor);
            }

            let mut counts = CountMap::new();
            for (group_id, members) in &by_group {
                debug!(group_id, processors = members.len(), "Reading status snapshot");
                self.count_group(api, group_id, members, &mut counts).await?;
            }
            Ok(counts)
        })
    }

    fn window(&self) -> Option<TimeWindow> {
        None
    }

    fn name(&self) -> &'static str {
        "status"
    }
}
