use crate::{
    client::NifiApi,
    collectors::{
        aggregator,
        CountRetriever,
        EnumeratedGroup,
        ProcessorEnumerator,
    },
    error::{
        NifiError,
        Result,
    },
    metrics::{
        BatchRow,
        GroupReport,
        GroupTarget,
        ReportQuality,
    },
};
use chrono::{
    DateTime,
    Utc,
};

/// What happened to one group of a batch.
#[derive(Debug)]
pub struct GroupOutcome {
    pub target: GroupTarget,
    pub result: std::result::Result<GroupReport, NifiError>,
}

/// Tally of a batch run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub full: usize,
    pub partial: usize,
    pub failed: usize,
}

impl RunSummary {
    pub fn total(&self) -> usize {
        self.full + self.partial + self.failed
    }

    /// True when at least one group was requested and none of them produced a report.
    pub fn all_failed(&self) -> bool {
        self.failed > 0 && self.full == 0 && self.partial == 0
    }
}

#[derive(Debug)]
pub struct BatchReport {
    /// Captured once when the batch starts; shared by every row.
    pub snapshot: DateTime<Utc>,
    pub groups: Vec<GroupOutcome>,
}

impl BatchReport {
    /// Combined rows over every successful group, in group order then report order.
    pub fn rows(&self) -> Vec<BatchRow> {
        self.groups
            .iter()
            .filter_map(|outcome| Some((&outcome.target, outcome.result.as_ref().ok()?)))
            .flat_map(|(target, report)| {
                report.rows.iter().map(move |row| BatchRow {
                    snapshot_timestamp: self.snapshot,
                    flow_name: target.label.clone(),
                    process_group_id: report.group_id.clone(),
                    processor_id: row.processor_id.clone(),
                    processor_name: row.name.clone(),
                    processor_type: row.processor_type.clone(),
                    invocations: row.count.count(),
                })
            })
            .collect()
    }

    pub fn reports(&self) -> impl Iterator<Item = (&GroupTarget, &GroupReport)> {
        self.groups
            .iter()
            .filter_map(|outcome| Some((&outcome.target, outcome.result.as_ref().ok()?)))
    }

    pub fn failures(&self) -> impl Iterator<Item = (&GroupTarget, &NifiError)> {
        self.groups
            .iter()
            .filter_map(|outcome| Some((&outcome.target, outcome.result.as_ref().err()?)))
    }

    pub fn summary(&self) -> RunSummary {
        self.groups
            .iter()
            .fold(RunSummary::default(), |mut summary, outcome| {
                match &outcome.result {
                    Ok(report) if report.quality() == ReportQuality::Full => summary.full += 1,
                    Ok(_) => summary.partial += 1,
                    Err(_) => summary.failed += 1,
                }
                summary
            })
    }
}

/// Runs enumeration, count retrieval and aggregation for one or many process groups.
pub struct UsageOrchestrator<'a> {
    api: &'a dyn NifiApi,
    retriever: &'a dyn CountRetriever,
}

impl<'a> UsageOrchestrator<'a> {
    pub fn new(api: &'a dyn NifiApi, retriever: &'a dyn CountRetriever) -> Self {
        Self { api, retriever }
    }

    /// Report for a single group. Any enumeration failure fails the whole group: a report built
    /// from a partial processor list would pass for a complete one.
    #[instrument(skip_all, fields(group = %target.label, strategy = self.retriever.name()))]
    pub async fn analyze_group(&self, target: &GroupTarget) -> Result<GroupReport> {
        let generated_at = Utc::now();
        let enumerator = ProcessorEnumerator::new(self.api);

        let EnumeratedGroup { group_id, processors } = enumerator.enumerate(&target.id).await?;
        info!(processors = processors.len(), "Enumerated process group");

        let counts = self.retriever.fetch_counts(self.api, &processors).await?;
        let rows = aggregator::build_rows(&processors, &counts, self.retriever.window());
        let summary = aggregator::summarize(&rows);

        info!(
            total = summary.total_processors,
            unused = summary.unused,
            low = summary.low,
            active = summary.active,
            no_data = summary.no_data,
            "Group analyzed"
        );

        Ok(GroupReport {
            group_id,
            label: target.label.clone(),
            generated_at,
            window: self.retriever.window(),
            rows,
            summary,
        })
    }

    /// Analyzes every target in order. A failing group is recorded and the batch moves on; only
    /// credential and TLS failures stop the batch, since every following group would fail the same
    /// way.
    pub async fn run_batch(&self, targets: &[GroupTarget]) -> Result<BatchReport> {
        let snapshot = Utc::now();
        let mut groups = Vec::with_capacity(targets.len());

        for (index, target) in targets.iter().enumerate() {
            info!(
                "Analyzing flow {}/{}: {} ({})",
                index + 1,
                targets.len(),
                target.label,
                target.id
            );
            let result = match self.analyze_group(target).await {
                Err(err) if err.is_fatal_for_run() => return Err(err),
                Err(err) => {
                    error!(flow = %target.label, error = %err, "Flow failed, continuing with the next one");
                    Err(err)
                }
                Ok(report) => Ok(report),
            };
            groups.push(GroupOutcome {
                target: target.clone(),
                result,
            });
        }

        Ok(BatchReport { snapshot, groups })
    }
}
