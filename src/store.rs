//! Owned store of item collections.
//!
//! One [`Collection`] per group canvas plus one for the dashboard. Item order
//! within a collection is display order (left-to-right, top-to-bottom).
//!
//! Write discipline:
//! - drag hosts move items and nodes, and insert or remove items
//! - only the reconciler in [`crate::sync`] writes the confirmed order and
//!   promotes transient ids

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::debug;

use crate::layout::{CollectionId, Item, ItemId, LayoutError, Node, NodeId, Point};

/// Where a set of items sat, and optionally the full item order, at one
/// moment. Restoring it undoes a drop that rearranged more than one card.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Placements {
    order: Option<Vec<ItemId>>,
    items: Vec<(ItemId, Point, Option<NodeId>)>,
}

impl Placements {
    /// A single item's position and snap, without order
    pub fn of_item(id: ItemId, position: Point, snapped_to: Option<NodeId>) -> Self {
        Self {
            order: None,
            items: vec![(id, position, snapped_to)],
        }
    }

    /// Whether restoring this also restores display order
    pub fn has_order(&self) -> bool {
        self.order.is_some()
    }

    pub fn get(&self, id: ItemId) -> Option<(Point, Option<NodeId>)> {
        self.items
            .iter()
            .find(|(saved, ..)| *saved == id)
            .map(|(_, position, snapped_to)| (*position, *snapped_to))
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// A node taken out of a collection along with its snapped items
#[derive(Debug, Clone)]
pub struct RemovedNode {
    pub index: usize,
    pub node: Node,
    /// Items with the indices they occupied, ascending
    pub items: Vec<(usize, Item)>,
}

/// Items and nodes of one canvas or of the dashboard
#[derive(Debug, Clone, Serialize)]
pub struct Collection {
    pub id: CollectionId,
    pub name: String,
    items: Vec<Item>,
    nodes: Vec<Node>,
    /// Persisted ids in the order the server last confirmed
    confirmed_order: Vec<u64>,
}

impl Collection {
    pub fn new(id: CollectionId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            items: Vec::new(),
            nodes: Vec::new(),
            confirmed_order: Vec::new(),
        }
    }

    /// Build a collection whose current order is already confirmed
    pub fn with_contents(
        id: CollectionId,
        name: impl Into<String>,
        items: Vec<Item>,
        nodes: Vec<Node>,
    ) -> Self {
        let mut collection = Self::new(id, name);
        collection.items = items;
        collection.nodes = nodes;
        collection.confirmed_order = collection.persisted_order();
        collection
    }

    pub fn items(&self) -> &[Item] {
        &self.items
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn index_of(&self, id: ItemId) -> Option<usize> {
        self.items.iter().position(|item| item.id == id)
    }

    pub fn item(&self, id: ItemId) -> Option<&Item> {
        self.items.iter().find(|item| item.id == id)
    }

    pub fn item_mut(&mut self, id: ItemId) -> Option<&mut Item> {
        self.items.iter_mut().find(|item| item.id == id)
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.iter().find(|node| node.id == id)
    }

    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.iter_mut().find(|node| node.id == id)
    }

    /// Server ids of persisted items in display order; transient items are skipped
    pub fn persisted_order(&self) -> Vec<u64> {
        self.items.iter().filter_map(|item| item.id.server_id()).collect()
    }

    pub fn confirmed_order(&self) -> &[u64] {
        &self.confirmed_order
    }

    /// Items snapped to `node`, in display order
    pub fn snapped_to(&self, node: NodeId) -> Vec<ItemId> {
        self.items
            .iter()
            .filter(|item| item.snapped_to == Some(node))
            .map(|item| item.id)
            .collect()
    }

    /// Insert an item at `index` (clamped to the end)
    pub fn insert(&mut self, index: usize, item: Item) {
        let index = index.min(self.items.len());
        self.items.insert(index, item);
    }

    /// Remove an item, returning it with the index it occupied
    pub fn remove(&mut self, id: ItemId) -> Option<(usize, Item)> {
        let index = self.index_of(id)?;
        Some((index, self.items.remove(index)))
    }

    /// Move an item to `to`, counted among the other items. Returns the old index.
    pub fn move_to(&mut self, id: ItemId, to: usize) -> Option<usize> {
        let from = self.index_of(id)?;
        crate::layout::grid::move_to_index(&mut self.items, from, to);
        Some(from)
    }

    /// Reorder persisted items to follow `order`. Transient items keep their
    /// slots; persisted items missing from `order` keep their relative order
    /// after those listed.
    pub fn restore_order(&mut self, order: &[u64]) {
        let rank = |item: &Item| {
            item.id
                .server_id()
                .and_then(|id| order.iter().position(|o| *o == id))
                .unwrap_or(usize::MAX)
        };

        let mut persisted: Vec<Item> = self
            .items
            .iter()
            .filter(|item| item.id.is_persisted())
            .cloned()
            .collect();
        persisted.sort_by_key(rank);

        let mut persisted = persisted.into_iter();
        for slot in self.items.iter_mut() {
            if slot.id.is_persisted() {
                if let Some(next) = persisted.next() {
                    *slot = next;
                }
            }
        }
    }

    pub(crate) fn set_confirmed_order(&mut self, order: Vec<u64>) {
        self.confirmed_order = order;
    }

    pub(crate) fn replace_contents(&mut self, items: Vec<Item>, nodes: Vec<Node>) {
        self.items = items;
        self.nodes = nodes;
        self.confirmed_order = self.persisted_order();
    }

    pub fn push_node(&mut self, node: Node) {
        self.nodes.push(node);
    }

    /// Snapshot the placement of `ids` together with the current order.
    /// Unknown ids and repeats are skipped.
    pub fn placements(&self, ids: impl IntoIterator<Item = ItemId>) -> Placements {
        let mut items: Vec<(ItemId, Point, Option<NodeId>)> = Vec::new();
        for id in ids {
            if items.iter().any(|(seen, ..)| *seen == id) {
                continue;
            }
            if let Some(item) = self.item(id) {
                items.push((id, item.position, item.snapped_to));
            }
        }
        Placements {
            order: Some(self.items.iter().map(|item| item.id).collect()),
            items,
        }
    }

    /// Put items back where `saved` found them. With a saved order, items
    /// added since the snapshot follow the snapshotted ones in their
    /// current relative order.
    pub fn restore_placements(&mut self, saved: &Placements) {
        if let Some(order) = &saved.order {
            self.items.sort_by_key(|item| {
                order
                    .iter()
                    .position(|id| *id == item.id)
                    .unwrap_or(usize::MAX)
            });
        }
        for (id, position, snapped_to) in &saved.items {
            if let Some(item) = self.item_mut(*id) {
                item.position = *position;
                item.snapped_to = *snapped_to;
            }
        }
    }

    /// Remove a node and every item snapped to it
    pub fn remove_node(&mut self, id: NodeId) -> Option<RemovedNode> {
        let index = self.nodes.iter().position(|node| node.id == id)?;
        let node = self.nodes.remove(index);

        let mut items = Vec::new();
        for (i, item) in std::mem::take(&mut self.items).into_iter().enumerate() {
            if item.snapped_to == Some(id) {
                items.push((i, item));
            } else {
                self.items.push(item);
            }
        }
        debug!(node = %id, items = items.len(), "removed node");
        Some(RemovedNode { index, node, items })
    }

    /// Undo [`Collection::remove_node`]
    pub fn restore_node(&mut self, removed: RemovedNode) {
        let index = removed.index.min(self.nodes.len());
        self.nodes.insert(index, removed.node);
        for (i, item) in removed.items {
            if self.item(item.id).is_none() {
                self.insert(i, item);
            }
        }
    }
}

/// All collections the client currently knows about
#[derive(Debug, Clone, Default)]
pub struct Store {
    collections: BTreeMap<CollectionId, Collection>,
    next_transient: u64,
}

impl Store {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a collection
    pub fn insert_collection(&mut self, collection: Collection) {
        self.collections.insert(collection.id, collection);
    }

    pub fn collection(&self, id: CollectionId) -> Result<&Collection, LayoutError> {
        self.collections
            .get(&id)
            .ok_or(LayoutError::UnknownCollection(id))
    }

    pub fn collection_mut(&mut self, id: CollectionId) -> Result<&mut Collection, LayoutError> {
        self.collections
            .get_mut(&id)
            .ok_or(LayoutError::UnknownCollection(id))
    }

    pub fn collections(&self) -> impl Iterator<Item = &Collection> {
        self.collections.values()
    }

    pub fn item(&self, collection: CollectionId, id: ItemId) -> Result<&Item, LayoutError> {
        self.collection(collection)?
            .item(id)
            .ok_or(LayoutError::UnknownItem(id))
    }

    pub fn item_mut(
        &mut self,
        collection: CollectionId,
        id: ItemId,
    ) -> Result<&mut Item, LayoutError> {
        self.collection_mut(collection)?
            .item_mut(id)
            .ok_or(LayoutError::UnknownItem(id))
    }

    pub fn node(&self, collection: CollectionId, id: NodeId) -> Result<&Node, LayoutError> {
        self.collection(collection)?
            .node(id)
            .ok_or(LayoutError::UnknownNode(id))
    }

    /// Move a node to a new world position
    pub fn move_node(
        &mut self,
        collection: CollectionId,
        id: NodeId,
        position: Point,
    ) -> Result<(), LayoutError> {
        let node = self
            .collection_mut(collection)?
            .node_mut(id)
            .ok_or(LayoutError::UnknownNode(id))?;
        node.position = position;
        Ok(())
    }

    /// Which collection holds an item, if any
    pub fn locate(&self, id: ItemId) -> Option<CollectionId> {
        self.collections
            .values()
            .find(|c| c.item(id).is_some())
            .map(|c| c.id)
    }

    /// Allocate a fresh client-only id
    pub fn next_transient_id(&mut self) -> ItemId {
        self.next_transient += 1;
        ItemId::Transient(self.next_transient)
    }

    /// Swap a transient id for the server-assigned one. Returns `false` if the
    /// transient item no longer exists.
    pub(crate) fn promote(&mut self, collection: CollectionId, transient: ItemId, server_id: u64) -> bool {
        let Ok(item) = self.item_mut(collection, transient) else {
            return false;
        };
        item.id = ItemId::Persisted(server_id);
        item.unsaved = false;
        debug!(%transient, server_id, "promoted item");
        true
    }
}
