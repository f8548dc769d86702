use chrono::{
    DateTime,
    Duration,
    Utc,
};
use serde::{
    Deserialize,
    Serialize,
};
use strum::Display;

/// A processor as found while walking a process group tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessorDescriptor {
    pub id: String,
    pub name: String,
    /// Short type name, e.g. `LogMessage` rather than the fully qualified class.
    pub processor_type: String,
    /// Process group that directly contains the processor.
    pub group_id: String,
}

/// Closed time interval a windowed count refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    /// The `days` days leading up to `end`.
    pub fn last_days(end: DateTime<Utc>, days: u32) -> Self {
        Self {
            start: end - Duration::days(i64::from(days)),
            end,
        }
    }

    pub fn length_days(&self) -> f64 {
        (self.end - self.start).num_milliseconds() as f64 / Duration::days(1).num_milliseconds() as f64
    }
}

/// An execution count that was either confirmed by the server or could not be obtained.
///
/// Zero means "confirmed never executed"; a failed lookup is `Unknown` and must stay distinguishable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum CountValue {
    Known { count: u64 },
    Unknown { reason: String },
}

impl CountValue {
    pub fn known(count: u64) -> Self {
        CountValue::Known { count }
    }

    pub fn unknown(reason: impl ToString) -> Self {
        CountValue::Unknown {
            reason: reason.to_string(),
        }
    }

    pub fn count(&self) -> Option<u64> {
        match self {
            CountValue::Known { count } => Some(*count),
            CountValue::Unknown { .. } => None,
        }
    }

    pub fn is_known(&self) -> bool {
        matches!(self, CountValue::Known { .. })
    }
}

/// Whether a windowed count covers every matching event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Completeness {
    Complete,
    /// The search hit its result cap; the count is a lower bound.
    Capped,
    /// The search did not finish in time; the count is what the server had found so far.
    TimedOut,
}

/// One processor's count as produced by a retriever. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionCount {
    pub processor_id: String,
    pub value: CountValue,
    /// Present only for windowed (provenance) counts.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub window: Option<TimeWindow>,
    /// Present only for windowed (provenance) counts.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completeness: Option<Completeness>,
}

impl ExecutionCount {
    /// All-time counter read from a status snapshot.
    pub fn cumulative(processor_id: impl ToString, count: u64) -> Self {
        Self {
            processor_id: processor_id.to_string(),
            value: CountValue::known(count),
            window: None,
            completeness: None,
        }
    }

    pub fn windowed(processor_id: impl ToString, count: u64, window: TimeWindow, completeness: Completeness) -> Self {
        Self {
            processor_id: processor_id.to_string(),
            value: CountValue::known(count),
            window: Some(window),
            completeness: Some(completeness),
        }
    }

    pub fn unknown(processor_id: impl ToString, reason: impl ToString, window: Option<TimeWindow>) -> Self {
        Self {
            processor_id: processor_id.to_string(),
            value: CountValue::unknown(reason),
            window,
            completeness: None,
        }
    }

    /// False when the count is only a lower bound.
    pub fn is_complete(&self) -> bool {
        !matches!(
            self.completeness,
            Some(Completeness::Capped) | Some(Completeness::TimedOut)
        )
    }
}
