use crate::{
    client::{
        model::ProcessGroupFlow,
        NifiApi,
    },
    error::{
        NifiError,
        Result,
    },
    metrics::ProcessorDescriptor,
};
use std::collections::HashSet;

/// A direct child of a process group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChildGroup {
    pub id: String,
    pub name: String,
}

/// The processors below a group, together with the group's real id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumeratedGroup {
    /// `root` and similar aliases are replaced by the id the server reports.
    pub group_id: String,
    pub processors: Vec<ProcessorDescriptor>,
}

/// Walks a process group and all of its descendants.
pub struct ProcessorEnumerator<'a> {
    api: &'a dyn NifiApi,
}

impl<'a> ProcessorEnumerator<'a> {
    pub fn new(api: &'a dyn NifiApi) -> Self {
        Self { api }
    }

    /// Every processor in `group_id` and its descendant groups, each exactly once.
    pub async fn list_processors(&self, group_id: &str) -> Result<Vec<ProcessorDescriptor>> {
        Ok(self.enumerate(group_id).await?.processors)
    }

    /// Like [`Self::list_processors`], also reporting the resolved id of `group_id`.
    ///
    /// Processors appear in discovery order (depth first). A group reachable along more than one
    /// path is visited once, and a processor listed under several groups is kept where it was
    /// first seen.
    #[instrument(skip(self))]
    pub async fn enumerate(&self, group_id: &str) -> Result<EnumeratedGroup> {
        let root = self.fetch_root(group_id).await?;
        let resolved_id = root.id.clone();

        let mut visited = HashSet::from([root.id.clone()]);
        let mut seen_processors = HashSet::new();
        let mut processors = Vec::new();
        let mut pending = vec![root];

        while let Some(flow) = pending.pop() {
            let group_id = flow.id;
            for entity in flow.flow.processors {
                if !seen_processors.insert(entity.id.clone()) {
                    continue;
                }
                processors.push(ProcessorDescriptor {
                    processor_type: short_type(&entity.component.kind).to_string(),
                    group_id: entity.component.parent_group_id.unwrap_or_else(|| group_id.clone()),
                    name: entity.component.name,
                    id: entity.id,
                });
            }

            // Push in reverse so children are visited in listing order.
            for child in flow.flow.process_groups.iter().rev() {
                let child_id = child.id().ok_or_else(|| NifiError::DescendantLookup {
                    group_id: group_id.clone(),
                    source: Box::new(NifiError::Decode {
                        url: format!("flow/process-groups/{group_id}"),
                        reason: "child process group without an id".to_string(),
                    }),
                })?;
                if !visited.insert(child_id.to_string()) {
                    debug!(group_id = child_id, "Process group already visited, skipping");
                    continue;
                }
                pending.push(self.fetch_descendant(child_id).await?);
            }
        }

        debug!(group_id = %resolved_id, count = processors.len(), "Enumerated processors");
        Ok(EnumeratedGroup {
            group_id: resolved_id,
            processors,
        })
    }

    /// Direct children of `group_id`, in the order the server lists them.
    pub async fn list_child_groups(&self, group_id: &str) -> Result<Vec<ChildGroup>> {
        let root = self.fetch_root(group_id).await?;
        root.flow
            .process_groups
            .iter()
            .map(|child| {
                let id = child.id().ok_or_else(|| NifiError::Decode {
                    url: format!("flow/process-groups/{}", root.id),
                    reason: "child process group without an id".to_string(),
                })?;
                Ok(ChildGroup {
                    id: id.to_string(),
                    name: child.name().unwrap_or(id).to_string(),
                })
            })
            .collect()
    }

    async fn fetch_root(&self, group_id: &str) -> Result<ProcessGroupFlow> {
        match self.api.process_group_flow(group_id).await {
            Ok(entity) => Ok(entity.process_group_flow),
            Err(err) if err.is_not_found() => Err(NifiError::GroupNotFound(group_id.to_string())),
            Err(err) => Err(err),
        }
    }

    async fn fetch_descendant(&self, group_id: &str) -> Result<ProcessGroupFlow> {
        match self.api.process_group_flow(group_id).await {
            Ok(entity) => Ok(entity.process_group_flow),
            Err(err) if err.is_fatal_for_run() => Err(err),
            Err(err) => Err(NifiError::DescendantLookup {
                group_id: group_id.to_string(),
                source: Box::new(err),
            }),
        }
    }
}

/// `org.apache.nifi.processors.standard.LogMessage` becomes `LogMessage`.
pub fn short_type(kind: &str) -> &str {
    kind.rsplit('.').next().unwrap_or(kind)
}
