//! Wire types for the subset of the NiFi REST API this tool reads.
//!
//! Only the fields that are actually consumed are modelled; everything else in the server's
//! (large) responses is ignored by serde.

use crate::metrics::TimeWindow;
use serde::{
    Deserialize,
    Serialize,
};

/// Date format expected by the provenance search endpoint.
pub const PROVENANCE_DATE_FORMAT: &str = "%m/%d/%Y %H:%M:%S UTC";

// -=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-
// GET /flow/process-groups/{id}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessGroupFlowEntity {
    pub process_group_flow: ProcessGroupFlow,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessGroupFlow {
    pub id: String,
    #[serde(default)]
    pub flow: FlowContents,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlowContents {
    #[serde(default)]
    pub processors: Vec<ProcessorEntity>,
    #[serde(default)]
    pub process_groups: Vec<ProcessGroupEntity>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessorEntity {
    pub id: String,
    pub component: ProcessorComponent,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessorComponent {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_group_id: Option<String>,
}

/// Child group as listed inside its parent's flow. Depending on the server version and the
/// caller's permissions the id shows up at the top level, inside `component`, or both.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProcessGroupEntity {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub component: Option<ProcessGroupComponent>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProcessGroupComponent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl ProcessGroupEntity {
    pub fn id(&self) -> Option<&str> {
        self.id
            .as_deref()
            .or_else(|| self.component.as_ref().and_then(|c| c.id.as_deref()))
    }

    pub fn name(&self) -> Option<&str> {
        self.component.as_ref().and_then(|c| c.name.as_deref())
    }
}

// -=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-
// GET /flow/process-groups/{id}/status

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessGroupStatusEntity {
    pub process_group_status: ProcessGroupStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessGroupStatus {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub aggregate_snapshot: ProcessGroupStatusSnapshot,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessGroupStatusSnapshot {
    #[serde(default)]
    pub processor_status_snapshots: Vec<ProcessorStatusSnapshotEntity>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessorStatusSnapshotEntity {
    pub id: String,
    pub processor_status_snapshot: ProcessorStatusSnapshot,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessorStatusSnapshot {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Total invocations since the processor was created. Absent when the caller lacks read
    /// permission on the component.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub invocations: Option<u64>,
}

// -=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-
// POST /provenance, GET|DELETE /provenance/{id}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProvenanceQueryEntity {
    pub provenance: ProvenanceQuery,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProvenanceQuery {
    pub request: ProvenanceRequest,
}

/// Search parameters. Dates and component id go directly on the request; the server ignores
/// them inside `searchTerms` for this purpose.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProvenanceRequest {
    pub max_results: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub component_id: Option<String>,
}

impl ProvenanceRequest {
    pub fn for_component(component_id: impl ToString, window: &TimeWindow, max_results: u32) -> Self {
        Self {
            max_results,
            start_date: Some(window.start.format(PROVENANCE_DATE_FORMAT).to_string()),
            end_date: Some(window.end.format(PROVENANCE_DATE_FORMAT).to_string()),
            component_id: Some(component_id.to_string()),
        }
    }

    pub fn into_entity(self) -> ProvenanceQueryEntity {
        ProvenanceQueryEntity {
            provenance: ProvenanceQuery { request: self },
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProvenanceEntity {
    pub provenance: Provenance,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Provenance {
    pub id: String,
    #[serde(default)]
    pub finished: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub percent_completed: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub results: Option<ProvenanceResults>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProvenanceResults {
    /// Total number of matching events, which may exceed the number of events returned.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_count: Option<u64>,
}

impl Provenance {
    pub fn total_count(&self) -> Option<u64> {
        self.results.as_ref().and_then(|r| r.total_count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{
        TimeZone,
        Utc,
    };
    use pretty_assertions::assert_eq;

    #[test]
    fn child_group_id_falls_back_to_component() {
        let nested: ProcessGroupEntity = serde_json::from_value(serde_json::json!({
            "component": { "id": "child-1", "name": "Ingest" }
        }))
        .unwrap();
        assert_eq!(nested.id(), Some("child-1"));
        assert_eq!(nested.name(), Some("Ingest"));

        let top_level: ProcessGroupEntity = serde_json::from_value(serde_json::json!({
            "id": "child-2",
            "component": { "id": "ignored" }
        }))
        .unwrap();
        assert_eq!(top_level.id(), Some("child-2"));
    }

    #[test]
    fn provenance_request_puts_filters_on_the_request() {
        let window = TimeWindow {
            start: Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap(),
            end: Utc.with_ymd_and_hms(2025, 1, 31, 12, 30, 5).unwrap(),
        };
        let body = serde_json::to_value(ProvenanceRequest::for_component("proc-1", &window, 1000).into_entity()).unwrap();
        assert_eq!(
            body,
            serde_json::json!({
                "provenance": {
                    "request": {
                        "maxResults": 1000,
                        "startDate": "01/01/2025 00:00:00 UTC",
                        "endDate": "01/31/2025 12:30:05 UTC",
                        "componentId": "proc-1"
                    }
                }
            })
        );
    }

    #[test]
    fn status_snapshot_tolerates_missing_counters() {
        let status: ProcessGroupStatusEntity = serde_json::from_value(serde_json::json!({
            "processGroupStatus": {
                "id": "pg",
                "aggregateSnapshot": {
                    "processorStatusSnapshots": [
                        { "id": "a", "processorStatusSnapshot": { "id": "a", "name": "A", "invocations": 7 } },
                        { "id": "b", "processorStatusSnapshot": { "id": "b" } }
                    ]
                }
            }
        }))
        .unwrap();
        let counts: Vec<_> = status
            .process_group_status
            .aggregate_snapshot
            .processor_status_snapshots
            .iter()
            .map(|s| s.processor_status_snapshot.invocations)
            .collect();
        assert_eq!(counts, vec![Some(7), None]);
    }
}
