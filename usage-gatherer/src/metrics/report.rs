use super::processor::{
    Completeness,
    CountValue,
    TimeWindow,
};
use chrono::{
    DateTime,
    Utc,
};
use serde::{
    Deserialize,
    Serialize,
};
use strum::{
    Display,
    EnumIter,
};

/// Smallest count that is no longer `UNUSED`.
pub const LOW_ACTIVITY_THRESHOLD: u64 = 1;
/// Smallest count that is `ACTIVE`.
pub const ACTIVE_THRESHOLD: u64 = 10;

/// Label used wherever a processor's count could not be obtained.
pub const NO_DATA: &str = "NO_DATA";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum ActivityTier {
    Unused,
    Low,
    Active,
}

impl ActivityTier {
    pub fn classify(count: u64) -> Self {
        if count < LOW_ACTIVITY_THRESHOLD {
            ActivityTier::Unused
        } else if count < ACTIVE_THRESHOLD {
            ActivityTier::Low
        } else {
            ActivityTier::Active
        }
    }
}

/// A terminal report row: one per enumerated processor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessorReport {
    pub processor_id: String,
    pub name: String,
    pub processor_type: String,
    pub group_id: String,
    pub count: CountValue,
    /// `None` when the count is not windowed or unknown; never a fabricated zero.
    pub events_per_day: Option<f64>,
    /// `None` exactly when the count is unknown.
    pub tier: Option<ActivityTier>,
    pub completeness: Option<Completeness>,
}

impl ProcessorReport {
    pub fn is_no_data(&self) -> bool {
        !self.count.is_known()
    }

    pub fn is_lower_bound(&self) -> bool {
        matches!(
            self.completeness,
            Some(Completeness::Capped) | Some(Completeness::TimedOut)
        )
    }

    /// `UNUSED`, `LOW`, `ACTIVE` or `NO_DATA`.
    pub fn status_label(&self) -> String {
        self.tier.map(|t| t.to_string()).unwrap_or_else(|| NO_DATA.to_string())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportSummary {
    pub total_processors: usize,
    /// Sum over known counts only.
    pub total_count: u64,
    pub unused: usize,
    pub low: usize,
    pub active: usize,
    pub no_data: usize,
    /// Rows whose count is a lower bound.
    pub incomplete: usize,
}

/// How trustworthy a group's report is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ReportQuality {
    /// Every count is known and complete.
    Full,
    /// Some rows are `NO_DATA` or lower bounds.
    Partial,
}

/// The full result for one process group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupReport {
    /// Resolved group id (never the `root` alias).
    pub group_id: String,
    pub label: String,
    pub generated_at: DateTime<Utc>,
    pub window: Option<TimeWindow>,
    pub rows: Vec<ProcessorReport>,
    pub summary: ReportSummary,
}

impl GroupReport {
    pub fn quality(&self) -> ReportQuality {
        if self.summary.no_data == 0 && self.summary.incomplete == 0 {
            ReportQuality::Full
        } else {
            ReportQuality::Partial
        }
    }

    pub fn rows_in_tier(&self, tier: ActivityTier) -> impl Iterator<Item = &ProcessorReport> {
        self.rows.iter().filter(move |row| row.tier == Some(tier))
    }

    pub fn no_data_rows(&self) -> impl Iterator<Item = &ProcessorReport> {
        self.rows.iter().filter(|row| row.is_no_data())
    }

    /// Numeric series for an external chart renderer, in report order.
    pub fn chart_series(&self) -> ChartSeries {
        let points = self
            .rows
            .iter()
            .filter_map(|row| {
                Some(ChartPoint {
                    label: row.name.clone(),
                    value: row.count.count()?,
                    tier: row.tier?,
                })
            })
            .collect();

        ChartSeries {
            title: format!("Processor executions: {}", self.label),
            windowed: self.window.is_some(),
            thresholds: ChartThresholds::default(),
            points,
            no_data: self.no_data_rows().map(|row| row.name.clone()).collect(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChartThresholds {
    pub low: u64,
    pub active: u64,
}

impl Default for ChartThresholds {
    fn default() -> Self {
        Self {
            low: LOW_ACTIVITY_THRESHOLD,
            active: ACTIVE_THRESHOLD,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChartPoint {
    pub label: String,
    pub value: u64,
    pub tier: ActivityTier,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChartSeries {
    pub title: String,
    pub windowed: bool,
    pub thresholds: ChartThresholds,
    pub points: Vec<ChartPoint>,
    /// Processors left out of `points` because their count is unknown.
    pub no_data: Vec<String>,
}

/// A process group to analyze together with the label it is reported under.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupTarget {
    pub id: String,
    pub label: String,
}

impl GroupTarget {
    pub fn new(id: impl ToString, label: impl ToString) -> Self {
        Self {
            id: id.to_string(),
            label: label.to_string(),
        }
    }

    /// Labels a group by the first eight characters of its id.
    pub fn unlabeled(id: impl ToString) -> Self {
        let id = id.to_string();
        let label = id.chars().take(8).collect::<String>();
        Self { id, label }
    }
}

/// One row of the combined batch export, meant for append-only ingestion into a time series store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchRow {
    pub snapshot_timestamp: DateTime<Utc>,
    pub flow_name: String,
    pub process_group_id: String,
    pub processor_id: String,
    pub processor_name: String,
    pub processor_type: String,
    /// Empty when the count is unknown.
    pub invocations: Option<u64>,
}
