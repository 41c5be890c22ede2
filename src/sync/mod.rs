//! Persistence reconciler
//!
//! Local structural changes (create, delete, reorder, placement, node moves,
//! node creation and removal) are applied to the [`Store`] first and then turned into server calls. The
//! reconciler never talks to the network itself: calls wait in an outbox as
//! [`Request`]s, and whoever delivers them reports back through
//! [`Reconciler::complete`]. [`run_blocking`] does both for a synchronous
//! [`Api`].
//!
//! Each call is keyed by its subject (an item, a node, a collection's order).
//! A newer call for the same subject supersedes the older one, whose
//! completion is then ignored: neither its result nor its rollback is applied.
//!
//! Order is persisted as a full replacement. After any change the current
//! persisted order is compared with the last confirmed one and a single
//! set-order call is issued only if they differ.

pub mod api;
pub mod memory;

use std::collections::{HashMap, VecDeque};
use std::fmt;

use serde::Serialize;
use tracing::{debug, info, warn};

pub use api::{
    Api, ApiError, Call, DataTarget, GroupRecord, ItemPatch, ItemRecord, NodeRecord, Reply,
    Request, RequestToken,
};
pub use memory::MemoryApi;

use crate::layout::{
    CollectionId, Item, ItemId, LayoutError, Node, NodeId, Point, Size,
};
use crate::store::{Collection, Placements, RemovedNode, Store};

/// What a call is about; at most one call per subject is live
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Subject {
    Item(CollectionId, ItemId),
    Node(CollectionId, NodeId),
    /// A node the server has yet to create, keyed by its request number
    NewNode(CollectionId, u64),
    Order(CollectionId),
    Preview,
    Groups,
}

/// A user-visible failure message
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Notice {
    pub token: RequestToken,
    pub message: String,
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

/// Result of completing one request
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// The reply was applied to the store
    Applied,
    /// A newer call for the same subject was issued; nothing was applied
    Superseded,
    /// No such request is pending
    Unknown,
    /// The call failed and local state was rolled back
    Failed(Notice),
    /// Preview payload for a palette drag session
    Preview {
        session: u64,
        payload: serde_json::Value,
    },
}

/// Local state needed to apply or roll back a reply
#[derive(Debug, Clone)]
enum Pending {
    Create {
        collection: CollectionId,
        transient: ItemId,
    },
    Delete {
        collection: CollectionId,
        server_id: u64,
        restore: Option<(usize, Item)>,
        /// Neighbours rearranged by the removal
        undo: Option<Placements>,
    },
    Order {
        collection: CollectionId,
        ids: Vec<u64>,
    },
    Update {
        collection: CollectionId,
        id: ItemId,
        previous: Option<Placements>,
    },
    MoveNode {
        collection: CollectionId,
        node: NodeId,
        previous: Point,
    },
    CreateNode {
        collection: CollectionId,
    },
    DeleteNode {
        collection: CollectionId,
        removed: RemovedNode,
    },
    Preview {
        session: u64,
    },
    Groups,
}

impl Pending {
    fn accepts(&self, reply: &Reply) -> bool {
        matches!(
            (self, reply),
            (Pending::Create { .. }, Reply::Created { .. })
                | (Pending::Delete { .. }, Reply::Deleted)
                | (Pending::Order { .. }, Reply::OrderSet)
                | (Pending::Update { .. }, Reply::Updated { .. })
                | (Pending::MoveNode { .. }, Reply::NodeMoved)
                | (Pending::CreateNode { .. }, Reply::NodeCreated { .. })
                | (Pending::DeleteNode { .. }, Reply::NodeDeleted)
                | (Pending::Preview { .. }, Reply::Data { .. })
                | (Pending::Groups, Reply::Groups { .. })
        )
    }
}

/// Turns local changes into server calls and applies their results
#[derive(Debug, Clone)]
pub struct Reconciler {
    csrf: Option<String>,
    event_size: Size,
    node_radius: f64,
    next_token: u64,
    outbox: VecDeque<Request>,
    pending: HashMap<RequestToken, (Subject, Pending)>,
    latest: HashMap<Subject, RequestToken>,
}

impl Default for Reconciler {
    fn default() -> Self {
        Self {
            csrf: None,
            event_size: Size::new(160.0, 100.0),
            node_radius: 30.0,
            next_token: 0,
            outbox: VecDeque::new(),
            pending: HashMap::new(),
            latest: HashMap::new(),
        }
    }
}

impl Reconciler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Anti-forgery token attached to mutating calls
    pub fn with_csrf(mut self, token: impl Into<String>) -> Self {
        self.csrf = Some(token.into());
        self
    }

    /// Sizes used when rebuilding collections from a group listing
    pub fn with_sizes(mut self, event_size: Size, node_radius: f64) -> Self {
        self.event_size = event_size;
        self.node_radius = node_radius;
        self
    }

    /// Take the next queued request
    pub fn next_request(&mut self) -> Option<Request> {
        self.outbox.pop_front()
    }

    /// Take every queued request
    pub fn drain(&mut self) -> Vec<Request> {
        self.outbox.drain(..).collect()
    }

    pub fn queued(&self) -> usize {
        self.outbox.len()
    }

    /// Requests issued but not yet completed
    pub fn in_flight(&self) -> usize {
        self.pending.len()
    }

    fn issue(&mut self, subject: Subject, call: Call, pending: Pending) -> RequestToken {
        self.next_token += 1;
        let token = RequestToken(self.next_token);

        if let Some(previous) = self.latest.insert(subject, token) {
            debug!(%previous, %token, ?subject, "superseding call");
        }
        let csrf = if call.is_mutating() {
            self.csrf.clone()
        } else {
            None
        };

        info!(%token, op = call.name(), "queued call");
        self.outbox.push_back(Request { token, csrf, call });
        self.pending.insert(token, (subject, pending));
        token
    }

    /// Queue creation of a transient item already present in the store
    pub fn create_item(
        &mut self,
        store: &Store,
        collection: CollectionId,
        transient: ItemId,
    ) -> Result<RequestToken, LayoutError> {
        let item = store.item(collection, transient)?;
        let call = Call::CreateItem {
            collection,
            kind: item.kind.clone(),
            title: item.title.clone(),
            position: item.position,
            node_id: item.snapped_to,
            configuration: item.configuration.clone(),
        };
        Ok(self.issue(
            Subject::Item(collection, transient),
            call,
            Pending::Create {
                collection,
                transient,
            },
        ))
    }

    /// Remove an item locally and, if it is persisted, queue its deletion.
    pub fn delete_item(
        &mut self,
        store: &mut Store,
        collection: CollectionId,
        id: ItemId,
    ) -> Result<Option<RequestToken>, LayoutError> {
        self.delete(store, collection, id, None)
    }

    /// Like [`Reconciler::delete_item`], for a removal that also rearranged
    /// other items. A failed delete puts the item back and restores `before`.
    pub fn delete_dropped(
        &mut self,
        store: &mut Store,
        collection: CollectionId,
        id: ItemId,
        before: Placements,
    ) -> Result<Option<RequestToken>, LayoutError> {
        self.delete(store, collection, id, Some(before))
    }

    fn delete(
        &mut self,
        store: &mut Store,
        collection: CollectionId,
        id: ItemId,
        undo: Option<Placements>,
    ) -> Result<Option<RequestToken>, LayoutError> {
        let (index, item) = store
            .collection_mut(collection)?
            .remove(id)
            .ok_or(LayoutError::UnknownItem(id))?;

        let Some(server_id) = id.server_id() else {
            debug!(%id, "discarded unsaved item");
            return Ok(None);
        };

        Ok(Some(self.issue(
            Subject::Item(collection, id),
            Call::DeleteItem {
                collection,
                id: server_id,
            },
            Pending::Delete {
                collection,
                server_id,
                restore: Some((index, item)),
                undo,
            },
        )))
    }

    /// Queue a set-order call if the persisted order differs from the one the
    /// server will hold: the order in flight if there is one, else the last
    /// confirmed one. Ids with a delete in flight are not expected in either.
    pub fn persist_order(
        &mut self,
        store: &Store,
        collection: CollectionId,
    ) -> Result<Option<RequestToken>, LayoutError> {
        let c = store.collection(collection)?;
        let deleting: Vec<u64> = self
            .pending
            .values()
            .flat_map(|(_, p)| match p {
                Pending::Delete {
                    collection: pc,
                    server_id,
                    ..
                } if *pc == collection => vec![*server_id],
                Pending::DeleteNode {
                    collection: pc,
                    removed,
                } if *pc == collection => removed
                    .items
                    .iter()
                    .filter_map(|(_, item)| item.id.server_id())
                    .collect(),
                _ => Vec::new(),
            })
            .collect();

        let confirmed: Vec<u64> = c
            .confirmed_order()
            .iter()
            .filter(|id| !deleting.contains(id))
            .copied()
            .collect();
        let current = c.persisted_order();

        let settled = match self.order_in_flight(collection) {
            Some(ids) => *ids == current,
            None => current == confirmed,
        };
        if settled {
            return Ok(None);
        }

        Ok(Some(self.issue(
            Subject::Order(collection),
            Call::SetOrder {
                collection,
                ids: current.clone(),
            },
            Pending::Order {
                collection,
                ids: current,
            },
        )))
    }

    fn order_in_flight(&self, collection: CollectionId) -> Option<&Vec<u64>> {
        let token = self.latest.get(&Subject::Order(collection))?;
        match self.pending.get(token) {
            Some((_, Pending::Order { ids, .. })) => Some(ids),
            _ => None,
        }
    }

    /// Queue an update of an item's canvas placement. `previous` is restored
    /// if the call fails. Unsaved items are skipped; their create carries
    /// the placement.
    pub fn save_placement(
        &mut self,
        store: &Store,
        collection: CollectionId,
        id: ItemId,
        previous: (Point, Option<NodeId>),
    ) -> Result<Option<RequestToken>, LayoutError> {
        let (position, snapped_to) = previous;
        self.save_drop(store, collection, id, Placements::of_item(id, position, snapped_to))
    }

    /// Queue an update of a dropped item's placement. On failure every
    /// placement in `before` is restored, along with its order if it has one,
    /// so cards laid out around the drop go back too.
    pub fn save_drop(
        &mut self,
        store: &Store,
        collection: CollectionId,
        id: ItemId,
        before: Placements,
    ) -> Result<Option<RequestToken>, LayoutError> {
        let item = store.item(collection, id)?;
        let Some(server_id) = id.server_id() else {
            return Ok(None);
        };
        Ok(Some(self.issue(
            Subject::Item(collection, id),
            Call::UpdateItem {
                collection,
                id: server_id,
                patch: ItemPatch::placement(item),
            },
            Pending::Update {
                collection,
                id,
                previous: Some(before),
            },
        )))
    }

    /// Queue a configuration change, such as a filter update on a panel.
    /// The server may recompute the item's title.
    pub fn update_configuration(
        &mut self,
        store: &mut Store,
        collection: CollectionId,
        id: ItemId,
        configuration: serde_json::Value,
    ) -> Result<Option<RequestToken>, LayoutError> {
        let item = store.item_mut(collection, id)?;
        item.configuration = configuration.clone();
        let Some(server_id) = id.server_id() else {
            return Ok(None);
        };
        Ok(Some(self.issue(
            Subject::Item(collection, id),
            Call::UpdateItem {
                collection,
                id: server_id,
                patch: ItemPatch {
                    configuration: Some(configuration),
                    ..Default::default()
                },
            },
            Pending::Update {
                collection,
                id,
                previous: None,
            },
        )))
    }

    /// Queue persistence of a node's new position
    pub fn move_node(
        &mut self,
        store: &Store,
        collection: CollectionId,
        node: NodeId,
        previous: Point,
    ) -> Result<RequestToken, LayoutError> {
        let CollectionId::Group(group) = collection else {
            return Err(LayoutError::UnknownNode(node));
        };
        let position = store.node(collection, node)?.position;
        Ok(self.issue(
            Subject::Node(collection, node),
            Call::MoveNode {
                group,
                node,
                position,
            },
            Pending::MoveNode {
                collection,
                node,
                previous,
            },
        ))
    }

    /// Ask the server for a new node. Nothing changes locally until it
    /// answers with the node's id.
    pub fn create_node(
        &mut self,
        store: &Store,
        collection: CollectionId,
        label: impl Into<String>,
        position: Point,
    ) -> Result<RequestToken, LayoutError> {
        store.collection(collection)?;
        let CollectionId::Group(group) = collection else {
            return Err(LayoutError::UnknownCollection(collection));
        };
        let number = self.next_token + 1;
        Ok(self.issue(
            Subject::NewNode(collection, number),
            Call::CreateNode {
                group,
                label: label.into(),
                position,
            },
            Pending::CreateNode { collection },
        ))
    }

    /// Remove a node and its snapped items locally and queue the deletion.
    /// A failure puts all of them back where they were.
    pub fn delete_node(
        &mut self,
        store: &mut Store,
        collection: CollectionId,
        node: NodeId,
    ) -> Result<RequestToken, LayoutError> {
        let CollectionId::Group(group) = collection else {
            return Err(LayoutError::UnknownNode(node));
        };
        let removed = store
            .collection_mut(collection)?
            .remove_node(node)
            .ok_or(LayoutError::UnknownNode(node))?;
        Ok(self.issue(
            Subject::Node(collection, node),
            Call::DeleteNode { group, node },
            Pending::DeleteNode {
                collection,
                removed,
            },
        ))
    }

    /// Queue a preview fetch for a palette drag session
    pub fn fetch_preview(&mut self, collection: CollectionId, template: &str, session: u64) -> RequestToken {
        self.issue(
            Subject::Preview,
            Call::FetchItemData {
                collection,
                target: DataTarget::Template(template.to_string()),
                filters: serde_json::Value::Null,
            },
            Pending::Preview { session },
        )
    }

    /// Queue a reload of all groups and their events
    pub fn refresh_groups(&mut self) -> RequestToken {
        self.issue(Subject::Groups, Call::ListGroups, Pending::Groups)
    }

    /// Apply the result of a request
    pub fn complete(
        &mut self,
        store: &mut Store,
        token: RequestToken,
        result: Result<Reply, ApiError>,
    ) -> Outcome {
        let Some((subject, pending)) = self.pending.remove(&token) else {
            warn!(%token, "completion for unknown request");
            return Outcome::Unknown;
        };
        if self.latest.get(&subject) != Some(&token) {
            debug!(%token, ?subject, "ignoring superseded completion");
            return Outcome::Superseded;
        }
        self.latest.remove(&subject);

        let result = result.and_then(|reply| {
            if pending.accepts(&reply) {
                Ok(reply)
            } else {
                Err(ApiError::Malformed(format!("unexpected reply to {token}")))
            }
        });

        match result {
            Ok(reply) => self.apply(store, pending, reply),
            Err(error) => {
                warn!(%token, %error, "server call failed");
                let message = self.roll_back(store, pending, &error);
                Outcome::Failed(Notice { token, message })
            }
        }
    }

    fn apply(&mut self, store: &mut Store, pending: Pending, reply: Reply) -> Outcome {
        match (pending, reply) {
            (
                Pending::Create {
                    collection,
                    transient,
                },
                Reply::Created { item },
            ) => {
                if store.promote(collection, transient, item.id) {
                    info!(%transient, id = item.id, "item created");
                    if let Err(error) = self.persist_order(store, collection) {
                        warn!(%error, "could not compare order after create");
                    }
                } else {
                    // Removed locally while the create was in flight
                    let id = ItemId::Persisted(item.id);
                    self.issue(
                        Subject::Item(collection, id),
                        Call::DeleteItem {
                            collection,
                            id: item.id,
                        },
                        Pending::Delete {
                            collection,
                            server_id: item.id,
                            restore: None,
                            undo: None,
                        },
                    );
                }
                Outcome::Applied
            }
            (
                Pending::Delete {
                    collection,
                    server_id,
                    ..
                },
                Reply::Deleted,
            ) => {
                if let Ok(c) = store.collection_mut(collection) {
                    let order = c
                        .confirmed_order()
                        .iter()
                        .copied()
                        .filter(|id| *id != server_id)
                        .collect();
                    c.set_confirmed_order(order);
                }
                info!(server_id, "item deleted");
                if let Err(error) = self.persist_order(store, collection) {
                    warn!(%error, "could not compare order after delete");
                }
                Outcome::Applied
            }
            (Pending::Order { collection, ids }, Reply::OrderSet) => {
                if let Ok(c) = store.collection_mut(collection) {
                    info!(%collection, ?ids, "order confirmed");
                    c.set_confirmed_order(ids);
                }
                Outcome::Applied
            }
            (Pending::Update { collection, id, .. }, Reply::Updated { item }) => {
                if let Ok(local) = store.item_mut(collection, id) {
                    local.title = item.title;
                    local.unsaved = false;
                }
                Outcome::Applied
            }
            (Pending::CreateNode { collection }, Reply::NodeCreated { node }) => {
                if let Ok(c) = store.collection_mut(collection) {
                    info!(node = node.id, "node created");
                    c.push_node(Node::new(
                        NodeId(node.id),
                        node.label,
                        Point::new(node.x, node.y),
                        self.node_radius,
                    ));
                }
                Outcome::Applied
            }
            (
                Pending::DeleteNode {
                    collection,
                    removed,
                },
                Reply::NodeDeleted,
            ) => {
                let gone: Vec<u64> = removed
                    .items
                    .iter()
                    .filter_map(|(_, item)| item.id.server_id())
                    .collect();
                if let Ok(c) = store.collection_mut(collection) {
                    let order = c
                        .confirmed_order()
                        .iter()
                        .copied()
                        .filter(|id| !gone.contains(id))
                        .collect();
                    c.set_confirmed_order(order);
                }
                info!(node = %removed.node.id, items = gone.len(), "node deleted");
                if let Err(error) = self.persist_order(store, collection) {
                    warn!(%error, "could not compare order after node delete");
                }
                Outcome::Applied
            }
            (Pending::Preview { session }, Reply::Data { payload }) => {
                Outcome::Preview { session, payload }
            }
            (Pending::Groups, Reply::Groups { groups }) => {
                self.repopulate(store, groups);
                Outcome::Applied
            }
            _ => Outcome::Applied,
        }
    }

    fn roll_back(&mut self, store: &mut Store, pending: Pending, error: &ApiError) -> String {
        match pending {
            Pending::Create {
                collection,
                transient,
            } => {
                if let Ok(c) = store.collection_mut(collection) {
                    c.remove(transient);
                }
                format!("Could not add item: {error}")
            }
            Pending::Delete {
                collection,
                restore,
                undo,
                ..
            } => {
                if let (Ok(c), Some((index, item))) = (store.collection_mut(collection), restore) {
                    if c.item(item.id).is_none() {
                        c.insert(index, item);
                    }
                }
                if let Some(before) = undo {
                    self.restore(store, collection, &before);
                }
                format!("Could not remove item: {error}")
            }
            Pending::Order { collection, .. } => {
                if let Ok(c) = store.collection_mut(collection) {
                    let confirmed = c.confirmed_order().to_vec();
                    c.restore_order(&confirmed);
                }
                format!("Could not save order: {error}")
            }
            Pending::Update {
                collection,
                id,
                previous,
            } => {
                if let Some(before) = previous {
                    debug!(%id, items = before.len(), "restoring placement");
                    self.restore(store, collection, &before);
                }
                format!("Could not save item: {error}")
            }
            Pending::MoveNode {
                collection,
                node,
                previous,
            } => {
                if let Err(e) = store.move_node(collection, node, previous) {
                    warn!(%e, "could not restore node");
                }
                format!("Could not move node: {error}")
            }
            Pending::CreateNode { .. } => format!("Could not add node: {error}"),
            Pending::DeleteNode {
                collection,
                removed,
            } => {
                if let Ok(c) = store.collection_mut(collection) {
                    c.restore_node(removed);
                }
                format!("Could not remove node: {error}")
            }
            Pending::Preview { .. } => format!("Could not load preview: {error}"),
            Pending::Groups => format!("Could not load groups: {error}"),
        }
    }

    /// Put saved placements back. A restored order may differ from what is
    /// in flight, so it is compared again.
    fn restore(&mut self, store: &mut Store, collection: CollectionId, before: &Placements) {
        let Ok(c) = store.collection_mut(collection) else {
            return;
        };
        c.restore_placements(before);
        if before.has_order() {
            if let Err(error) = self.persist_order(store, collection) {
                warn!(%error, "could not compare order after rollback");
            }
        }
    }

    fn repopulate(&self, store: &mut Store, groups: Vec<GroupRecord>) {
        for group in groups {
            let fresh = group_collection(group, self.event_size, self.node_radius);
            match store.collection_mut(fresh.id) {
                Ok(c) => c.replace_contents(fresh.items().to_vec(), fresh.nodes().to_vec()),
                Err(_) => store.insert_collection(fresh),
            }
        }
        info!("groups reloaded");
    }
}

/// Build a confirmed collection from a group listing
pub fn group_collection(group: GroupRecord, event_size: Size, node_radius: f64) -> Collection {
    let items: Vec<Item> = group
        .events
        .into_iter()
        .map(|record| record.into_item(event_size))
        .collect();
    let nodes: Vec<Node> = group
        .nodes
        .into_iter()
        .map(|n| Node::new(NodeId(n.id), n.label, Point::new(n.x, n.y), node_radius))
        .collect();
    Collection::with_contents(CollectionId::Group(group.id), group.name, items, nodes)
}

/// Deliver every queued request to `api` in order, including requests
/// queued by completions, and collect the outcomes.
pub fn run_blocking<A: Api + ?Sized>(
    api: &mut A,
    reconciler: &mut Reconciler,
    store: &mut Store,
) -> Vec<Outcome> {
    let mut outcomes = Vec::new();
    while let Some(request) = reconciler.next_request() {
        let result = api.call(&request);
        outcomes.push(reconciler.complete(store, request.token, result));
    }
    outcomes
}
