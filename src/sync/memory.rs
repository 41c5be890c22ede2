//! In-memory server used by the CLI and by tests

use std::collections::{BTreeMap, VecDeque};

use serde::Serialize;
use serde_json::json;
use tracing::debug;

use super::api::{
    Api, ApiError, Call, DataTarget, GroupRecord, ItemRecord, NodeRecord, Reply, Request,
    RequestToken,
};
use crate::layout::CollectionId;

/// One call as the server saw it
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LoggedCall {
    pub token: RequestToken,
    pub csrf: Option<String>,
    pub call: Call,
    pub ok: bool,
}

/// Server state kept in memory, with scripted failures
#[derive(Debug, Clone, Default)]
pub struct MemoryApi {
    groups: BTreeMap<u64, GroupRecord>,
    dashboard: Vec<ItemRecord>,
    next_id: u64,
    next_node: u64,
    failures: VecDeque<ApiError>,
    required_csrf: Option<String>,
    log: Vec<LoggedCall>,
}

impl MemoryApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_group(mut self, group: GroupRecord) -> Self {
        self.bump_ids(group.events.iter().map(|e| e.id));
        for node in &group.nodes {
            self.next_node = self.next_node.max(node.id);
        }
        self.groups.insert(group.id, group);
        self
    }

    pub fn with_dashboard(mut self, panels: Vec<ItemRecord>) -> Self {
        self.bump_ids(panels.iter().map(|p| p.id));
        self.dashboard = panels;
        self
    }

    /// Reject mutating calls that don't carry this token
    pub fn with_required_csrf(mut self, token: impl Into<String>) -> Self {
        self.required_csrf = Some(token.into());
        self
    }

    /// Make the next call fail with `error`
    pub fn fail_next(&mut self, error: ApiError) {
        self.failures.push_back(error);
    }

    pub fn log(&self) -> &[LoggedCall] {
        &self.log
    }

    /// Number of logged calls with the given operation name
    pub fn count(&self, name: &str) -> usize {
        self.log.iter().filter(|c| c.call.name() == name).count()
    }

    /// Item ids in server order
    pub fn order_of(&self, collection: CollectionId) -> Vec<u64> {
        self.records(collection)
            .map(|records| records.iter().map(|r| r.id).collect())
            .unwrap_or_default()
    }

    pub fn group(&self, id: u64) -> Option<&GroupRecord> {
        self.groups.get(&id)
    }

    pub fn groups(&self) -> Vec<GroupRecord> {
        self.groups.values().cloned().collect()
    }

    fn bump_ids(&mut self, ids: impl Iterator<Item = u64>) {
        for id in ids {
            self.next_id = self.next_id.max(id);
        }
    }

    fn records(&self, collection: CollectionId) -> Option<&Vec<ItemRecord>> {
        match collection {
            CollectionId::Dashboard => Some(&self.dashboard),
            CollectionId::Group(id) => self.groups.get(&id).map(|g| &g.events),
        }
    }

    fn records_mut(&mut self, collection: CollectionId) -> Result<&mut Vec<ItemRecord>, ApiError> {
        match collection {
            CollectionId::Dashboard => Ok(&mut self.dashboard),
            CollectionId::Group(id) => self
                .groups
                .get_mut(&id)
                .map(|g| &mut g.events)
                .ok_or_else(|| ApiError::NotFound(format!("group {id}"))),
        }
    }

    fn group_mut(&mut self, id: u64) -> Result<&mut GroupRecord, ApiError> {
        self.groups
            .get_mut(&id)
            .ok_or_else(|| ApiError::NotFound(format!("group {id}")))
    }

    fn handle(&mut self, call: &Call) -> Result<Reply, ApiError> {
        match call {
            Call::ListGroups => Ok(Reply::Groups {
                groups: self.groups(),
            }),
            Call::CreateItem {
                collection,
                kind,
                title,
                position,
                node_id,
                configuration,
            } => {
                self.next_id += 1;
                let record = ItemRecord {
                    id: self.next_id,
                    kind: kind.clone(),
                    title: title.clone(),
                    x: position.x,
                    y: position.y,
                    node_id: node_id.map(|n| n.0),
                    configuration: configuration.clone(),
                };
                self.records_mut(*collection)?.push(record.clone());
                Ok(Reply::Created { item: record })
            }
            Call::DeleteItem { collection, id } => {
                let records = self.records_mut(*collection)?;
                let index = records
                    .iter()
                    .position(|r| r.id == *id)
                    .ok_or_else(|| ApiError::NotFound(format!("item {id}")))?;
                records.remove(index);
                Ok(Reply::Deleted)
            }
            Call::SetOrder { collection, ids } => {
                let records = self.records_mut(*collection)?;
                if let Some(missing) = ids.iter().find(|id| !records.iter().any(|r| r.id == **id)) {
                    return Err(ApiError::status(400, format!("unknown item {missing} in order")));
                }
                records.sort_by_key(|r| ids.iter().position(|id| *id == r.id).unwrap_or(usize::MAX));
                Ok(Reply::OrderSet)
            }
            Call::UpdateItem {
                collection,
                id,
                patch,
            } => {
                let record = self
                    .records_mut(*collection)?
                    .iter_mut()
                    .find(|r| r.id == *id)
                    .ok_or_else(|| ApiError::NotFound(format!("item {id}")))?;
                if let Some(node) = patch.node_id {
                    record.node_id = node.map(|n| n.0);
                }
                if let Some(position) = patch.position {
                    record.x = position.x;
                    record.y = position.y;
                }
                if let Some(configuration) = &patch.configuration {
                    record.configuration = configuration.clone();
                }
                Ok(Reply::Updated {
                    item: record.clone(),
                })
            }
            Call::MoveNode {
                group,
                node,
                position,
            } => {
                let record = self
                    .groups
                    .get_mut(group)
                    .and_then(|g| g.nodes.iter_mut().find(|n| n.id == node.0))
                    .ok_or_else(|| ApiError::NotFound(format!("{node}")))?;
                record.x = position.x;
                record.y = position.y;
                Ok(Reply::NodeMoved)
            }
            Call::CreateNode {
                group,
                label,
                position,
            } => {
                let id = self.next_node + 1;
                let node = NodeRecord {
                    id,
                    label: label.clone(),
                    x: position.x,
                    y: position.y,
                };
                self.group_mut(*group)?.nodes.push(node.clone());
                self.next_node = id;
                Ok(Reply::NodeCreated { node })
            }
            Call::DeleteNode { group, node } => {
                let record = self.group_mut(*group)?;
                let index = record
                    .nodes
                    .iter()
                    .position(|n| n.id == node.0)
                    .ok_or_else(|| ApiError::NotFound(format!("{node}")))?;
                record.nodes.remove(index);
                record.events.retain(|e| e.node_id != Some(node.0));
                Ok(Reply::NodeDeleted)
            }
            Call::FetchItemData { target, .. } => {
                let payload = match target {
                    DataTarget::Template(name) => json!({
                        "template": name,
                        "preview": format!("{} example", name.replace('-', " ")),
                    }),
                    DataTarget::Item(id) => json!({ "item": id, "rows": [] }),
                };
                Ok(Reply::Data { payload })
            }
        }
    }
}

impl Api for MemoryApi {
    fn call(&mut self, request: &Request) -> Result<Reply, ApiError> {
        let result = if let Some(error) = self.failures.pop_front() {
            Err(error)
        } else if request.call.is_mutating()
            && self.required_csrf.is_some()
            && request.csrf != self.required_csrf
        {
            Err(ApiError::status(403, "missing anti-forgery token"))
        } else {
            self.handle(&request.call)
        };

        debug!(token = %request.token, op = request.call.name(), ok = result.is_ok(), "server call");
        self.log.push(LoggedCall {
            token: request.token,
            csrf: request.csrf.clone(),
            call: request.call.clone(),
            ok: result.is_ok(),
        });
        result
    }
}
