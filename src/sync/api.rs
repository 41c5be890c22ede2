//! Collaborator interface: the server calls the client depends on
//!
//! Calls and replies are plain data so they can be queued, logged and
//! serialized to JSON. Transport is up to the [`Api`] implementation.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::layout::{CollectionId, Item, ItemId, ItemKind, NodeId, Point, Size};

/// Monotonic id of one issued call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct RequestToken(pub u64);

impl fmt::Display for RequestToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Server failures as seen by the client
#[derive(Debug, Clone, Error, PartialEq, Serialize)]
pub enum ApiError {
    #[error("server responded {status}: {message}")]
    Status { status: u16, message: String },

    #[error("network failure: {0}")]
    Network(String),

    #[error("malformed response: {0}")]
    Malformed(String),

    #[error("{0} not found")]
    NotFound(String),
}

impl ApiError {
    pub fn status(status: u16, message: impl Into<String>) -> Self {
        Self::Status {
            status,
            message: message.into(),
        }
    }
}

/// What a fetch-item-data call targets
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DataTarget {
    Item(u64),
    /// A palette template's preview
    Template(String),
}

/// Partial update of an item
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct ItemPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub node_id: Option<Option<NodeId>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<Point>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub configuration: Option<serde_json::Value>,
}

impl ItemPatch {
    /// Patch carrying an item's placement on the canvas
    pub fn placement(item: &Item) -> Self {
        Self {
            node_id: Some(item.snapped_to),
            position: Some(item.position),
            configuration: None,
        }
    }
}

/// One server operation
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Call {
    ListGroups,
    CreateItem {
        collection: CollectionId,
        kind: ItemKind,
        title: String,
        position: Point,
        node_id: Option<NodeId>,
        configuration: serde_json::Value,
    },
    DeleteItem {
        collection: CollectionId,
        id: u64,
    },
    SetOrder {
        collection: CollectionId,
        ids: Vec<u64>,
    },
    UpdateItem {
        collection: CollectionId,
        id: u64,
        patch: ItemPatch,
    },
    MoveNode {
        group: u64,
        node: NodeId,
        position: Point,
    },
    CreateNode {
        group: u64,
        label: String,
        position: Point,
    },
    /// Removes the node and every event snapped to it
    DeleteNode {
        group: u64,
        node: NodeId,
    },
    FetchItemData {
        collection: CollectionId,
        target: DataTarget,
        filters: serde_json::Value,
    },
}

impl Call {
    /// Mutating calls carry the anti-forgery token
    pub fn is_mutating(&self) -> bool {
        !matches!(self, Call::ListGroups | Call::FetchItemData { .. })
    }

    pub fn name(&self) -> &'static str {
        match self {
            Call::ListGroups => "list_groups",
            Call::CreateItem { .. } => "create_item",
            Call::DeleteItem { .. } => "delete_item",
            Call::SetOrder { .. } => "set_order",
            Call::UpdateItem { .. } => "update_item",
            Call::MoveNode { .. } => "move_node",
            Call::CreateNode { .. } => "create_node",
            Call::DeleteNode { .. } => "delete_node",
            Call::FetchItemData { .. } => "fetch_item_data",
        }
    }
}

/// A call ready to send
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Request {
    pub token: RequestToken,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub csrf: Option<String>,
    pub call: Call,
}

/// Item as the server reports it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemRecord {
    pub id: u64,
    #[serde(flatten)]
    pub kind: ItemKind,
    pub title: String,
    #[serde(default)]
    pub x: f64,
    #[serde(default)]
    pub y: f64,
    #[serde(default)]
    pub node_id: Option<u64>,
    #[serde(default)]
    pub configuration: serde_json::Value,
}

impl ItemRecord {
    pub fn into_item(self, size: Size) -> Item {
        let mut item = Item::new(ItemId::Persisted(self.id), self.kind, self.title, size)
            .with_position(Point::new(self.x, self.y));
        item.snapped_to = self.node_id.map(NodeId);
        item.configuration = self.configuration;
        item
    }
}

/// Node as the server reports it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeRecord {
    pub id: u64,
    pub label: String,
    pub x: f64,
    pub y: f64,
}

/// Group with its nested nodes and events
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupRecord {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub nodes: Vec<NodeRecord>,
    #[serde(default)]
    pub events: Vec<ItemRecord>,
}

/// Successful reply to a [`Call`]
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "reply", rename_all = "snake_case")]
pub enum Reply {
    Groups { groups: Vec<GroupRecord> },
    Created { item: ItemRecord },
    Deleted,
    OrderSet,
    Updated { item: ItemRecord },
    NodeMoved,
    NodeCreated { node: NodeRecord },
    NodeDeleted,
    Data { payload: serde_json::Value },
}

/// The server, from the client's side
pub trait Api {
    fn call(&mut self, request: &Request) -> Result<Reply, ApiError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reads_are_not_mutating() {
        assert!(!Call::ListGroups.is_mutating());
        assert!(Call::DeleteItem {
            collection: CollectionId::Dashboard,
            id: 1
        }
        .is_mutating());
    }

    #[test]
    fn test_call_serializes_with_op_tag() {
        let call = Call::SetOrder {
            collection: CollectionId::Group(3),
            ids: vec![2, 1],
        };
        let json = serde_json::to_value(&call).unwrap();
        assert_eq!(json["op"], "set_order");
        assert_eq!(json["ids"], serde_json::json!([2, 1]));
    }

    #[test]
    fn test_node_calls_named() {
        let call = Call::DeleteNode {
            group: 2,
            node: NodeId(5),
        };
        assert_eq!(call.name(), "delete_node");
        assert!(call.is_mutating());
        let json = serde_json::to_value(&call).unwrap();
        assert_eq!(json["op"], "delete_node");
        assert_eq!(json["node"], 5);
    }

    #[test]
    fn test_record_into_item() {
        let record = ItemRecord {
            id: 7,
            kind: ItemKind::Event,
            title: "Picnic".into(),
            x: 10.0,
            y: 20.0,
            node_id: Some(3),
            configuration: serde_json::Value::Null,
        };
        let item = record.into_item(Size::new(100.0, 60.0));
        assert_eq!(item.id, ItemId::Persisted(7));
        assert_eq!(item.snapped_to, Some(NodeId(3)));
        assert!(!item.unsaved);
    }
}
