//! In-memory stand-in for a NiFi server, used by the unit tests.

use crate::{
    client::{
        model::*,
        ApiFuture,
        NifiApi,
    },
    error::NifiError,
};
use reqwest::StatusCode;
use std::{
    collections::HashMap,
    sync::Mutex,
};

#[derive(Debug, Clone, Copy)]
pub(crate) enum Failure {
    NotFound,
    Unavailable,
    Unauthorized,
}

impl Failure {
    fn error(self, url: &str) -> NifiError {
        match self {
            Failure::NotFound => NifiError::Status {
                method: "GET".to_string(),
                url: url.to_string(),
                status: StatusCode::NOT_FOUND,
                body: "not found".to_string(),
            },
            Failure::Unavailable => NifiError::Connectivity {
                url: url.to_string(),
                reason: "connection reset by peer".to_string(),
            },
            Failure::Unauthorized => NifiError::Authentication {
                url: url.to_string(),
                status: StatusCode::UNAUTHORIZED,
            },
        }
    }
}

#[derive(Debug, Clone)]
struct FakeProvenance {
    total: u64,
    /// Reported while the query is still running.
    partial: u64,
    /// `None` never finishes.
    polls_until_finished: Option<u32>,
}

pub(crate) struct FakeNifi {
    root_id: String,
    flows: HashMap<String, FlowContents>,
    flow_failures: HashMap<String, Failure>,
    status: HashMap<String, Vec<(String, Option<u64>)>>,
    status_failures: HashMap<String, Failure>,
    provenance: HashMap<String, FakeProvenance>,
    provenance_failures: HashMap<String, Failure>,
    running: Mutex<HashMap<String, (String, u32)>>,
    pub(crate) submitted: Mutex<Vec<ProvenanceRequest>>,
    pub(crate) discarded: Mutex<Vec<String>>,
    pub(crate) status_calls: Mutex<Vec<String>>,
    pub(crate) flow_calls: Mutex<Vec<String>>,
}

impl FakeNifi {
    pub(crate) fn new(root_id: &str) -> Self {
        Self {
            root_id: root_id.to_string(),
            flows: HashMap::from([(root_id.to_string(), FlowContents::default())]),
            flow_failures: HashMap::new(),
            status: HashMap::new(),
            status_failures: HashMap::new(),
            provenance: HashMap::new(),
            provenance_failures: HashMap::new(),
            running: Mutex::new(HashMap::new()),
            submitted: Mutex::new(Vec::new()),
            discarded: Mutex::new(Vec::new()),
            status_calls: Mutex::new(Vec::new()),
            flow_calls: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn group(mut self, parent: &str, id: &str, name: &str) -> Self {
        self.flows.entry(id.to_string()).or_default();
        self.flows
            .entry(parent.to_string())
            .or_default()
            .process_groups
            .push(ProcessGroupEntity {
                id: Some(id.to_string()),
                component: Some(ProcessGroupComponent {
                    id: Some(id.to_string()),
                    name: Some(name.to_string()),
                }),
            });
        self
    }

    pub(crate) fn processor(mut self, group: &str, id: &str, name: &str, kind: &str) -> Self {
        self.flows
            .entry(group.to_string())
            .or_default()
            .processors
            .push(ProcessorEntity {
                id: id.to_string(),
                component: ProcessorComponent {
                    name: name.to_string(),
                    kind: kind.to_string(),
                    parent_group_id: Some(group.to_string()),
                },
            });
        self
    }

    pub(crate) fn invocations(mut self, group: &str, processor: &str, count: Option<u64>) -> Self {
        self.status
            .entry(group.to_string())
            .or_default()
            .push((processor.to_string(), count));
        self
    }

    pub(crate) fn fail_flow(mut self, group: &str, failure: Failure) -> Self {
        self.flow_failures.insert(group.to_string(), failure);
        self
    }

    pub(crate) fn fail_status(mut self, group: &str, failure: Failure) -> Self {
        self.status_failures.insert(group.to_string(), failure);
        self
    }

    pub(crate) fn provenance(mut self, processor: &str, total: u64, polls_until_finished: Option<u32>) -> Self {
        self.provenance.insert(
            processor.to_string(),
            FakeProvenance {
                total,
                partial: total / 2,
                polls_until_finished,
            },
        );
        self
    }

    pub(crate) fn fail_provenance(mut self, processor: &str, failure: Failure) -> Self {
        self.provenance_failures.insert(processor.to_string(), failure);
        self
    }

    fn resolve<'a>(&'a self, group_id: &'a str) -> &'a str {
        if group_id == "root" {
            &self.root_id
        } else {
            group_id
        }
    }

    fn provenance_entity(&self, query_id: &str, component: &str, polls: u32) -> ProvenanceEntity {
        let spec = self.provenance.get(component).cloned().unwrap_or(FakeProvenance {
            total: 0,
            partial: 0,
            polls_until_finished: Some(0),
        });
        let finished = spec.polls_until_finished.is_some_and(|needed| polls >= needed);
        ProvenanceEntity {
            provenance: Provenance {
                id: query_id.to_string(),
                finished,
                percent_completed: Some(if finished { 100 } else { 50 }),
                results: Some(ProvenanceResults {
                    total_count: Some(if finished { spec.total } else { spec.partial }),
                }),
            },
        }
    }
}

impl NifiApi for FakeNifi {
    fn process_group_flow<'a>(&'a self, group_id: &'a str) -> ApiFuture<'a, ProcessGroupFlowEntity> {
        Box::pin(async move {
            self.flow_calls.lock().unwrap().push(group_id.to_string());
            let id = self.resolve(group_id);
            let url = format!("flow/process-groups/{group_id}");
            if let Some(failure) = self.flow_failures.get(id) {
                return Err(failure.error(&url));
            }
            let flow = self.flows.get(id).cloned().ok_or_else(|| Failure::NotFound.error(&url))?;
            Ok(ProcessGroupFlowEntity {
                process_group_flow: ProcessGroupFlow { id: id.to_string(), flow },
            })
        })
    }

    fn process_group_status<'a>(&'a self, group_id: &'a str) -> ApiFuture<'a, ProcessGroupStatusEntity> {
        Box::pin(async move {
            self.status_calls.lock().unwrap().push(group_id.to_string());
            let url = format!("flow/process-groups/{group_id}/status");
            if let Some(failure) = self.status_failures.get(group_id) {
                return Err(failure.error(&url));
            }
            let snapshots = self
                .status
                .get(group_id)
                .cloned()
                .unwrap_or_default()
                .into_iter()
                .map(|(id, invocations)| ProcessorStatusSnapshotEntity {
                    id: id.clone(),
                    processor_status_snapshot: ProcessorStatusSnapshot {
                        id,
                        name: None,
                        invocations,
                    },
                })
                .collect();
            Ok(ProcessGroupStatusEntity {
                process_group_status: ProcessGroupStatus {
                    id: group_id.to_string(),
                    name: None,
                    aggregate_snapshot: ProcessGroupStatusSnapshot {
                        processor_status_snapshots: snapshots,
                    },
                },
            })
        })
    }

    fn submit_provenance<'a>(&'a self, request: &'a ProvenanceRequest) -> ApiFuture<'a, ProvenanceEntity> {
        Box::pin(async move {
            self.submitted.lock().unwrap().push(request.clone());
            let component = request.component_id.clone().unwrap_or_default();
            if let Some(failure) = self.provenance_failures.get(&component) {
                return Err(failure.error("provenance"));
            }
            let query_id = format!("query-{component}");
            self.running
                .lock()
                .unwrap()
                .insert(query_id.clone(), (component.clone(), 0));
            Ok(self.provenance_entity(&query_id, &component, 0))
        })
    }

    fn provenance_status<'a>(&'a self, query_id: &'a str) -> ApiFuture<'a, ProvenanceEntity> {
        Box::pin(async move {
            let (component, polls) = {
                let mut running = self.running.lock().unwrap();
                let entry = running
                    .get_mut(query_id)
                    .ok_or_else(|| Failure::NotFound.error(query_id))?;
                entry.1 += 1;
                entry.clone()
            };
            Ok(self.provenance_entity(query_id, &component, polls))
        })
    }

    fn discard_provenance<'a>(&'a self, query_id: &'a str) -> ApiFuture<'a, ()> {
        Box::pin(async move {
            self.running.lock().unwrap().remove(query_id);
            self.discarded.lock().unwrap().push(query_id.to_string());
            Ok(())
        })
    }
}
