//! Event-collage canvas host
//!
//! A pannable, zoomable canvas of nodes with event cards snapped around
//! them. Supports item drags (snap to a node or delete), node drags, background
//! pans, wheel zoom and scroll parallax, plus adding cards and nodes and
//! removing nodes.

use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{debug, warn};

use super::{
    Candidate, DragConfig, DragController, DragSession, DropKind, GestureRejected, Ghost, Origin,
    Press, PressTarget, SessionId, Transitions,
};
use crate::layout::orbit::{self, Circle};
use crate::layout::parallax::{self, Parallax};
use crate::layout::repel;
use crate::layout::{
    BoundingBox, CollectionId, FocusConfig, Item, ItemId, ItemKind, LayoutError, NodeId,
    NodeIndex, OrbitConfig, ParallaxConfig, Point, RepelConfig, Size, ViewCache, Viewport,
    ViewportConfig, ZoomDirection,
};
use crate::store::{Placements, Store};
use crate::sync::{Reconciler, RequestToken};

/// Offset used to break exact overlaps before repelling
const JITTER: f64 = 2.0;

/// How an item dropped on a node is placed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SnapMode {
    /// Re-lay out the node's items on rings
    #[default]
    Orbit,
    /// Keep the drop point and repel neighbours
    Free,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CanvasConfig {
    pub snap_mode: SnapMode,
    pub viewport: ViewportConfig,
    pub repel: RepelConfig,
    pub orbit: OrbitConfig,
    pub focus: FocusConfig,
    pub drag: DragConfig,
    pub parallax: ParallaxConfig,
    /// Screen-space drop zone that deletes items
    pub delete_zone: Option<BoundingBox>,
    pub viewport_size: Size,
    /// Size of cards added on the canvas
    pub card_size: Size,
    /// Seed for jitter and parallax sway
    pub seed: u64,
}

impl Default for CanvasConfig {
    fn default() -> Self {
        Self {
            snap_mode: SnapMode::default(),
            viewport: ViewportConfig::default(),
            repel: RepelConfig::default(),
            orbit: OrbitConfig::default(),
            focus: FocusConfig::default(),
            drag: DragConfig::default(),
            parallax: ParallaxConfig::default(),
            delete_zone: Some(BoundingBox::new(1168.0, 688.0, 96.0, 96.0)),
            viewport_size: Size::new(1280.0, 800.0),
            card_size: Size::new(160.0, 100.0),
            seed: 0,
        }
    }
}

impl CanvasConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_snap_mode(mut self, mode: SnapMode) -> Self {
        self.snap_mode = mode;
        self
    }

    pub fn with_delete_zone(mut self, zone: Option<BoundingBox>) -> Self {
        self.delete_zone = zone;
        self
    }

    pub fn with_viewport_size(mut self, size: Size) -> Self {
        self.viewport_size = size;
        self
    }

    pub fn with_card_size(mut self, size: Size) -> Self {
        self.card_size = size;
        self
    }

    pub fn with_orbit(mut self, orbit: OrbitConfig) -> Self {
        self.orbit = orbit;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }
}

#[derive(Debug, Clone)]
struct ParallaxState {
    ids: Vec<ItemId>,
    parallax: Parallax,
}

/// Canvas of one group at a time
#[derive(Debug, Clone)]
pub struct Canvas {
    config: CanvasConfig,
    viewport: Viewport,
    collection: CollectionId,
    views: ViewCache,
    controller: DragController,
    transitions: Transitions,
    parallax: Option<ParallaxState>,
    rng: StdRng,
}

impl Canvas {
    pub fn new(config: CanvasConfig, collection: CollectionId) -> Self {
        Self {
            viewport: Viewport::new(config.viewport.clone()),
            controller: DragController::new(config.drag.clone()),
            rng: StdRng::seed_from_u64(config.seed),
            collection,
            views: ViewCache::new(),
            transitions: Transitions::new(),
            parallax: None,
            config,
        }
    }

    pub fn config(&self) -> &CanvasConfig {
        &self.config
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn viewport_mut(&mut self) -> &mut Viewport {
        &mut self.viewport
    }

    pub fn collection(&self) -> CollectionId {
        self.collection
    }

    pub fn is_dragging(&self) -> bool {
        self.controller.is_dragging()
    }

    pub fn session(&self) -> Option<&DragSession> {
        self.controller.session()
    }

    pub fn transitions(&self) -> &Transitions {
        &self.transitions
    }

    /// Show another group, keeping each group's pan and zoom. Refused while
    /// a gesture is open.
    pub fn switch_group(&mut self, store: &mut Store, to: CollectionId) -> bool {
        if self.is_dragging() {
            warn!(%to, "cannot switch groups while dragging");
            return false;
        }
        self.clear_parallax(store);
        self.views.switch(&mut self.viewport, Some(self.collection), to);
        self.collection = to;
        true
    }

    pub fn resize(&mut self, store: &mut Store, size: Size) {
        self.config.viewport_size = size;
        if !parallax::enabled(size.width, &self.config.parallax) {
            self.clear_parallax(store);
        }
    }

    /// Start a gesture from a pointer press
    pub fn press(&mut self, store: &Store, press: Press) -> Result<SessionId, GestureRejected> {
        self.controller.check(&press)?;
        let scale = self.viewport.scale();
        let collection = store
            .collection(self.collection)
            .map_err(|e| GestureRejected::NotDraggable(e.to_string()))?;

        let (origin, proxy) = match &press.target {
            PressTarget::Item(id) => {
                let index = collection
                    .index_of(*id)
                    .ok_or_else(|| GestureRejected::NotDraggable(id.to_string()))?;
                let item = &collection.items()[index];
                self.transitions.cancel(*id);
                let screen = self.viewport.world_to_screen(item.position);
                let size = Size::new(item.size.width * scale, item.size.height * scale);
                (
                    Origin::Item {
                        id: *id,
                        index,
                        start: item.position,
                        snapped_to: item.snapped_to,
                    },
                    Ghost::new(BoundingBox::at(screen, size)),
                )
            }
            PressTarget::Node(id) => {
                let node = collection
                    .node(*id)
                    .ok_or_else(|| GestureRejected::NotDraggable(id.to_string()))?;
                let r = node.radius * scale;
                let center = self.viewport.world_to_screen(node.position);
                (
                    Origin::Node {
                        id: *id,
                        start: node.position,
                    },
                    Ghost::new(BoundingBox::new(center.x - r, center.y - r, 2.0 * r, 2.0 * r)),
                )
            }
            PressTarget::Background => (Origin::Pan, Ghost::new(BoundingBox::zero())),
            PressTarget::Template(name) => {
                return Err(GestureRejected::NotDraggable(format!("template {name}")))
            }
            PressTarget::Control => return Err(GestureRejected::Excluded),
        };

        self.controller.begin(&press, origin, proxy, None)
    }

    pub fn pointer_move(&mut self, screen: Point) -> bool {
        self.controller.pointer_move(screen)
    }

    /// Process one animation frame of the open gesture
    pub fn frame(&mut self, store: &mut Store) -> Result<(), LayoutError> {
        let Some(origin) = self.controller.session().map(|s| s.origin().clone()) else {
            return Ok(());
        };

        if let Some(screen) = self.controller.take_frame() {
            let (dx, dy) = self.controller.advance(screen);
            match origin {
                Origin::Pan => self.viewport.pan(dx, dy),
                Origin::Node { id, .. } => self.drag_node(store, id, dx, dy)?,
                Origin::Item { .. } | Origin::Template { .. } => {}
            }
        }

        if let Origin::Item { .. } = origin {
            let pointer = self.controller.session().map(|s| s.last()).unwrap_or_default();
            let (vx, vy) = self
                .config
                .drag
                .autoscroll()
                .velocity(pointer, self.config.viewport_size);
            if vx != 0.0 || vy != 0.0 {
                self.viewport.pan(-vx, -vy);
            }
            let candidate = self.candidate_at(store, pointer)?;
            self.controller.update_candidate(candidate);
        }
        Ok(())
    }

    fn drag_node(&mut self, store: &mut Store, id: NodeId, dx: f64, dy: f64) -> Result<(), LayoutError> {
        let (wx, wy) = self.viewport.screen_delta_to_world(dx, dy);
        let position = store.node(self.collection, id)?.position.translate(wx, wy);
        store.move_node(self.collection, id, position)?;

        match self.config.snap_mode {
            SnapMode::Orbit => self.relayout(store, id),
            SnapMode::Free => {
                let collection = store.collection_mut(self.collection)?;
                for item_id in collection.snapped_to(id) {
                    if let Some(item) = collection.item_mut(item_id) {
                        item.position = item.position.translate(wx, wy);
                    }
                }
                Ok(())
            }
        }
    }

    /// Drop target under a screen point: the delete zone first, then the
    /// nearest node within the snap radius.
    pub fn candidate_at(&self, store: &Store, screen: Point) -> Result<Candidate, LayoutError> {
        if self.config.delete_zone.is_some_and(|zone| zone.contains(screen)) {
            return Ok(Candidate::Delete);
        }
        let world = self.viewport.screen_to_world(screen);
        let index = NodeIndex::new(store.collection(self.collection)?.nodes());
        Ok(index
            .snap_target(world, self.config.repel.snap_radius)
            .map_or(Candidate::None, |hit| Candidate::Node(hit.node)))
    }

    /// End the gesture and apply the drop
    pub fn release(
        &mut self,
        store: &mut Store,
        reconciler: &mut Reconciler,
    ) -> Result<Option<DropKind>, LayoutError> {
        if self.controller.has_pending_frame() {
            self.frame(store)?;
        }
        let Some((session, kind)) = self.controller.finish() else {
            return Ok(None);
        };
        let c = self.collection;

        match session.origin().clone() {
            Origin::Pan | Origin::Template { .. } => {}
            Origin::Node { id, start } => {
                if store.node(c, id)?.position != start {
                    reconciler.move_node(store, c, id, start)?;
                }
            }
            Origin::Item { id, snapped_to, .. } => {
                match session.candidate() {
                    Candidate::Delete => {
                        debug!(%id, "dropped on delete zone");
                        let before = self.before_drop(store, id, &[snapped_to])?;
                        reconciler.delete_dropped(store, c, id, before)?;
                        if let Some(node) = snapped_to {
                            self.relayout(store, node)?;
                        }
                    }
                    Candidate::Node(node) => {
                        debug!(%id, %node, "dropped on node");
                        let before = self.before_drop(store, id, &[Some(node), snapped_to])?;
                        let center = self.viewport.screen_to_world(session.proxy().bounds.center());
                        self.place_on_node(store, reconciler, id, node, center)?;
                        if let Some(previous) = snapped_to.filter(|n| *n != node) {
                            self.relayout(store, previous)?;
                        }
                        reconciler.save_drop(store, c, id, before)?;
                    }
                    Candidate::None | Candidate::Slot(_) => {
                        debug!(%id, "drag cancelled");
                    }
                }
                self.transitions.start(id, self.config.repel.transition_ms);
                reconciler.persist_order(store, c)?;
            }
        }
        Ok(Some(kind))
    }

    /// Placements a drop of `id` may change. In orbit mode that is every
    /// item on the touched nodes plus the order; free mode only moves `id`,
    /// and neighbours it displaces are saved on their own.
    fn before_drop(
        &self,
        store: &Store,
        id: ItemId,
        nodes: &[Option<NodeId>],
    ) -> Result<Placements, LayoutError> {
        let collection = store.collection(self.collection)?;
        if self.config.snap_mode == SnapMode::Free {
            let item = collection.item(id).ok_or(LayoutError::UnknownItem(id))?;
            return Ok(Placements::of_item(id, item.position, item.snapped_to));
        }
        let neighbours = nodes
            .iter()
            .flatten()
            .flat_map(|node| collection.snapped_to(*node));
        Ok(collection.placements(std::iter::once(id).chain(neighbours)))
    }

    fn place_on_node(
        &mut self,
        store: &mut Store,
        reconciler: &mut Reconciler,
        id: ItemId,
        node: NodeId,
        center: Point,
    ) -> Result<(), LayoutError> {
        let c = self.collection;
        let others: Vec<ItemId> = store
            .collection(c)?
            .snapped_to(node)
            .into_iter()
            .filter(|other| *other != id)
            .collect();

        match self.config.snap_mode {
            SnapMode::Orbit => {
                let index = self.insertion_index(store, id, node, &others, center)?;
                let collection = store.collection_mut(c)?;
                collection.move_to(id, index);
                if let Some(item) = collection.item_mut(id) {
                    item.snapped_to = Some(node);
                }
                self.relayout(store, node)
            }
            SnapMode::Free => {
                let collection = store.collection(c)?;
                let neighbours: Vec<(ItemId, Point)> = others
                    .iter()
                    .filter_map(|other| collection.item(*other).map(|i| (*other, i.center())))
                    .collect();

                let mut resolution = repel::resolve(center, &neighbours, &self.config.repel);
                if !resolution.exact_overlaps.is_empty() {
                    let (jx, jy) = repel::jitter(&mut self.rng, JITTER);
                    resolution = repel::resolve(center.translate(jx, jy), &neighbours, &self.config.repel);
                }

                let item = store.item_mut(c, id)?;
                item.center_on(resolution.placed);
                item.snapped_to = Some(node);

                for (other, new_center) in resolution.displaced {
                    let item = store.item_mut(c, other)?;
                    let previous = (item.position, item.snapped_to);
                    item.center_on(new_center);
                    self.transitions.start(other, self.config.repel.transition_ms);
                    reconciler.save_placement(store, c, other, previous)?;
                }
                Ok(())
            }
        }
    }

    /// Where among the collection's other items the dropped item goes, so
    /// that it takes the orbit position nearest to `center`.
    fn insertion_index(
        &self,
        store: &Store,
        id: ItemId,
        node: NodeId,
        others: &[ItemId],
        center: Point,
    ) -> Result<usize, LayoutError> {
        let collection = store.collection(self.collection)?;
        let target = collection.node(node).ok_or(LayoutError::UnknownNode(node))?;
        let mut sizes: Vec<Size> = others
            .iter()
            .filter_map(|other| collection.item(*other).map(|i| i.size))
            .collect();
        sizes.push(collection.item(id).ok_or(LayoutError::UnknownItem(id))?.size);

        let ring_slot = match orbit::layout(target.position, target.radius, &sizes, &self.config.orbit) {
            Ok(layout) => layout
                .placements
                .iter()
                .enumerate()
                .min_by(|(_, a), (_, b)| {
                    a.center
                        .distance_squared_to(center)
                        .total_cmp(&b.center.distance_squared_to(center))
                })
                .map_or(others.len(), |(i, _)| i),
            Err(_) => others.len(),
        };

        let rest: Vec<ItemId> = collection
            .items()
            .iter()
            .map(|i| i.id)
            .filter(|other| *other != id)
            .collect();
        let position_of = |other: ItemId| rest.iter().position(|r| *r == other);

        let index = match (others.get(ring_slot), others.last()) {
            (Some(before), _) => position_of(*before),
            (None, Some(last)) => position_of(*last).map(|p| p + 1),
            (None, None) => collection.index_of(id),
        };
        Ok(index.unwrap_or(rest.len()))
    }

    /// Place every item snapped to `node` on its orbit. When the rings run
    /// out, the items that did get a ring position are moved and the rest
    /// stay where they were.
    pub fn relayout(&mut self, store: &mut Store, node: NodeId) -> Result<(), LayoutError> {
        if self.config.snap_mode != SnapMode::Orbit {
            return Ok(());
        }
        let c = self.collection;
        let collection = store.collection(c)?;
        let target = collection.node(node).ok_or(LayoutError::UnknownNode(node))?;
        let ids = collection.snapped_to(node);
        let sizes: Vec<Size> = ids
            .iter()
            .filter_map(|id| collection.item(*id).map(|i| i.size))
            .collect();

        let positions = match orbit::layout(target.position, target.radius, &sizes, &self.config.orbit) {
            Ok(layout) => layout.positions(),
            Err(error) => {
                warn!(%node, %error, "partial orbit layout");
                error.partial_placements().map(<[Point]>::to_vec).unwrap_or_default()
            }
        };

        let collection = store.collection_mut(c)?;
        for (id, position) in ids.into_iter().zip(positions) {
            if let Some(item) = collection.item_mut(id) {
                item.position = position;
            }
        }
        Ok(())
    }

    /// Add a card on `node`. It takes the next free orbit slot (or the slot
    /// above the node in free mode) and keeps a transient id until the
    /// server confirms it.
    pub fn create_event(
        &mut self,
        store: &mut Store,
        reconciler: &mut Reconciler,
        node: NodeId,
        title: impl Into<String>,
    ) -> Result<ItemId, LayoutError> {
        let c = self.collection;
        let collection = store.collection(c)?;
        let target = collection.node(node).ok_or(LayoutError::UnknownNode(node))?;
        let above = target.position.translate(0.0, -(target.radius + self.config.orbit.base_gap));
        let index = collection
            .snapped_to(node)
            .last()
            .and_then(|last| collection.index_of(*last))
            .map_or(collection.len(), |i| i + 1);

        let id = store.next_transient_id();
        let mut item = Item::new(id, ItemKind::Event, title, self.config.card_size).with_snap(node);
        item.center_on(above);
        store.collection_mut(c)?.insert(index, item);
        debug!(%id, %node, index, "added card");

        match self.config.snap_mode {
            SnapMode::Orbit => self.relayout(store, node)?,
            SnapMode::Free => self.place_on_node(store, reconciler, id, node, above)?,
        }
        self.transitions.start(id, self.config.repel.transition_ms);
        reconciler.create_item(store, c, id)?;
        Ok(id)
    }

    /// Ask for a new node under a screen point. It appears once the server
    /// answers.
    pub fn create_node_at(
        &self,
        store: &Store,
        reconciler: &mut Reconciler,
        screen: Point,
        label: impl Into<String>,
    ) -> Result<RequestToken, LayoutError> {
        let world = self.viewport.screen_to_world(screen);
        reconciler.create_node(store, self.collection, label, world)
    }

    /// Remove a node and every card snapped to it. Refused while a gesture
    /// is open.
    pub fn delete_node(
        &mut self,
        store: &mut Store,
        reconciler: &mut Reconciler,
        node: NodeId,
    ) -> Result<Option<RequestToken>, LayoutError> {
        if self.is_dragging() {
            warn!(%node, "cannot remove a node while dragging");
            return Ok(None);
        }
        for id in store.collection(self.collection)?.snapped_to(node) {
            self.transitions.cancel(id);
        }
        reconciler.delete_node(store, self.collection, node).map(Some)
    }

    /// Re-lay out every node of the active group
    pub fn relayout_all(&mut self, store: &mut Store) -> Result<(), LayoutError> {
        let nodes: Vec<NodeId> = store
            .collection(self.collection)?
            .nodes()
            .iter()
            .map(|n| n.id)
            .collect();
        for node in nodes {
            self.relayout(store, node)?;
        }
        Ok(())
    }

    /// Centers of a node's items with `hovered` spread out around it.
    /// Nothing is written to the store.
    pub fn focus(
        &self,
        store: &Store,
        node: NodeId,
        hovered: Option<ItemId>,
    ) -> Result<Vec<(ItemId, Point)>, LayoutError> {
        let collection = store.collection(self.collection)?;
        let target = collection.node(node).ok_or(LayoutError::UnknownNode(node))?;
        let items: Vec<_> = collection
            .snapped_to(node)
            .into_iter()
            .filter_map(|id| collection.item(id))
            .collect();
        let circles: Vec<Circle> = items
            .iter()
            .map(|item| Circle {
                center: item.center(),
                radius: item.size.width.max(item.size.height) / 2.0,
            })
            .collect();
        let focused = hovered.and_then(|h| items.iter().position(|i| i.id == h));

        let centers = orbit::relax_focus(
            target.position,
            target.radius,
            &circles,
            focused,
            &self.config.focus,
        );
        Ok(items.iter().map(|i| i.id).zip(centers).collect())
    }

    /// Zoom at the cursor; negative deltas zoom in
    pub fn wheel(&mut self, screen: Point, delta: f64) -> bool {
        if delta == 0.0 || !delta.is_finite() {
            return false;
        }
        self.viewport
            .zoom_at(screen.x, screen.y, ZoomDirection::from_wheel(delta))
    }

    /// Animate the view onto a node and its items
    pub fn fit_node(&mut self, store: &Store, node: NodeId, padding: f64) -> Result<bool, LayoutError> {
        let collection = store.collection(self.collection)?;
        let target = collection.node(node).ok_or(LayoutError::UnknownNode(node))?;
        let r = target.radius;
        let rect = collection
            .snapped_to(node)
            .into_iter()
            .filter_map(|id| collection.item(id))
            .fold(
                BoundingBox::new(target.position.x - r, target.position.y - r, 2.0 * r, 2.0 * r),
                |rect, item| rect.union(&item.bounds()),
            );
        Ok(self.viewport.fit_rect(rect, self.config.viewport_size, padding))
    }

    pub fn reset_zoom(&mut self) {
        self.viewport.reset_zoom();
    }

    /// Advance view animation and placement transitions. Returns items whose
    /// transition ended.
    pub fn tick(&mut self, elapsed_ms: f64) -> Vec<ItemId> {
        self.viewport.tick(elapsed_ms);
        self.transitions.tick(elapsed_ms)
    }

    /// Apply parallax for a scroll offset. Returns `false` when parallax is
    /// disabled at the current width.
    pub fn scroll(&mut self, store: &mut Store, offset: f64) -> Result<bool, LayoutError> {
        let ids: Vec<ItemId> = store
            .collection(self.collection)?
            .items()
            .iter()
            .map(|i| i.id)
            .collect();
        if self.parallax.as_ref().is_some_and(|p| p.ids != ids) {
            self.clear_parallax(store);
        }

        if self.parallax.is_none() {
            let bases: Vec<_> = store
                .collection(self.collection)?
                .items()
                .iter()
                .map(|i| i.transform)
                .collect();
            let Some(parallax) = Parallax::setup(
                &bases,
                self.config.viewport_size.width,
                &self.config.parallax,
                &mut self.rng,
            ) else {
                return Ok(false);
            };
            self.parallax = Some(ParallaxState { ids, parallax });
        }

        if let Some(state) = &self.parallax {
            let collection = store.collection_mut(self.collection)?;
            for (id, transform) in state.ids.iter().zip(state.parallax.at_scroll(offset)) {
                if let Some(item) = collection.item_mut(*id) {
                    item.transform = transform;
                }
            }
        }
        Ok(true)
    }

    fn clear_parallax(&mut self, store: &mut Store) {
        let Some(state) = self.parallax.take() else {
            return;
        };
        if let Ok(collection) = store.collection_mut(self.collection) {
            for (id, transform) in state.ids.iter().zip(state.parallax.restore()) {
                if let Some(item) = collection.item_mut(*id) {
                    item.transform = transform;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::layout::{Item, ItemKind, Node};
    use crate::store::Collection;
    use crate::sync::{run_blocking, MemoryApi};

    use super::*;

    const GROUP: CollectionId = CollectionId::Group(1);

    fn event(id: u64, at: Point) -> Item {
        Item::new(ItemId::Persisted(id), ItemKind::Event, format!("event {id}"), Size::new(40.0, 40.0))
            .with_position(at)
    }

    fn store() -> Store {
        let mut store = Store::new();
        store.insert_collection(Collection::with_contents(
            GROUP,
            "Hikers",
            vec![
                event(1, Point::new(0.0, 0.0)),
                event(2, Point::new(500.0, 500.0)),
            ],
            vec![
                Node::new(NodeId(1), "Trailhead", Point::new(300.0, 300.0), 30.0),
                Node::new(NodeId(2), "Summit", Point::new(800.0, 300.0), 30.0),
            ],
        ));
        store
    }

    fn canvas(mode: SnapMode) -> Canvas {
        Canvas::new(CanvasConfig::default().with_snap_mode(mode), GROUP)
    }

    fn drag(canvas: &mut Canvas, store: &mut Store, target: PressTarget, from: Point, to: Point) {
        canvas.press(store, Press::primary(from, target)).unwrap();
        canvas.pointer_move(to);
        canvas.frame(store).unwrap();
    }

    #[test]
    fn test_background_pan() {
        let mut store = store();
        let mut canvas = canvas(SnapMode::Orbit);
        let mut reconciler = Reconciler::new();
        drag(&mut canvas, &mut store, PressTarget::Background, Point::new(600.0, 400.0), Point::new(650.0, 380.0));
        canvas.release(&mut store, &mut reconciler).unwrap();
        assert_eq!(canvas.viewport().state().pan_x, 50.0);
        assert_eq!(canvas.viewport().state().pan_y, -20.0);
        assert_eq!(reconciler.queued(), 0);
    }

    #[test]
    fn test_snap_to_node_in_orbit() {
        let mut store = store();
        let mut canvas = canvas(SnapMode::Orbit);
        let mut reconciler = Reconciler::new();

        drag(&mut canvas, &mut store, PressTarget::Item(ItemId::Persisted(1)), Point::new(20.0, 20.0), Point::new(310.0, 250.0));
        assert_eq!(canvas.session().unwrap().candidate(), Candidate::Node(NodeId(1)));

        let kind = canvas.release(&mut store, &mut reconciler).unwrap();
        assert_eq!(kind, Some(DropKind::Target));
        let item = store.item(GROUP, ItemId::Persisted(1)).unwrap();
        assert_eq!(item.snapped_to, Some(NodeId(1)));
        // Single item sits at the top of ring 0
        let expected_radius = 30.0 + canvas.config().orbit.base_gap;
        assert!((item.center().distance_to(Point::new(300.0, 300.0)) - expected_radius).abs() < 1e-9);

        let requests = reconciler.drain();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].call.name(), "update_item");
    }

    #[test]
    fn test_release_far_from_nodes_cancels() {
        let mut store = store();
        let mut canvas = canvas(SnapMode::Orbit);
        let mut reconciler = Reconciler::new();
        drag(&mut canvas, &mut store, PressTarget::Item(ItemId::Persisted(1)), Point::new(20.0, 20.0), Point::new(40.0, 700.0));
        let kind = canvas.release(&mut store, &mut reconciler).unwrap();

        assert_eq!(kind, Some(DropKind::Cancel));
        assert_eq!(store.item(GROUP, ItemId::Persisted(1)).unwrap().position, Point::new(0.0, 0.0));
        assert_eq!(reconciler.queued(), 0);
        assert!(canvas.transitions().active(ItemId::Persisted(1)).is_some());
    }

    #[test]
    fn test_drop_on_delete_zone() {
        let mut store = store();
        let mut canvas = canvas(SnapMode::Orbit);
        let mut reconciler = Reconciler::new();
        drag(&mut canvas, &mut store, PressTarget::Item(ItemId::Persisted(2)), Point::new(510.0, 510.0), Point::new(1200.0, 720.0));
        canvas.release(&mut store, &mut reconciler).unwrap();

        assert!(store.locate(ItemId::Persisted(2)).is_none());
        let requests = reconciler.drain();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].call.name(), "delete_item");
    }

    #[test]
    fn test_free_mode_repels_neighbour() {
        let mut store = store();
        store
            .collection_mut(GROUP)
            .unwrap()
            .item_mut(ItemId::Persisted(2))
            .unwrap()
            .snapped_to = Some(NodeId(1));
        store
            .item_mut(GROUP, ItemId::Persisted(2))
            .unwrap()
            .center_on(Point::new(330.0, 300.0));

        let mut canvas = canvas(SnapMode::Free);
        let mut reconciler = Reconciler::new();
        // Grab the card at its center and release it on the node center
        drag(&mut canvas, &mut store, PressTarget::Item(ItemId::Persisted(1)), Point::new(20.0, 20.0), Point::new(300.0, 300.0));
        canvas.release(&mut store, &mut reconciler).unwrap();

        let placed = store.item(GROUP, ItemId::Persisted(1)).unwrap().center();
        let pushed = store.item(GROUP, ItemId::Persisted(2)).unwrap().center();
        assert!((placed.x - 264.0).abs() < 1e-9);
        assert!((pushed.x - 340.8).abs() < 1e-9);
        assert!(placed.distance_to(pushed) > 30.0);
        assert!(canvas.transitions().active(ItemId::Persisted(2)).is_some());
    }

    #[test]
    fn test_node_drag_moves_items_and_persists() {
        let mut store = store();
        let mut canvas = canvas(SnapMode::Orbit);
        let mut reconciler = Reconciler::new();
        let mut api = MemoryApi::new();
        store.item_mut(GROUP, ItemId::Persisted(1)).unwrap().snapped_to = Some(NodeId(1));

        drag(&mut canvas, &mut store, PressTarget::Node(NodeId(1)), Point::new(300.0, 300.0), Point::new(340.0, 320.0));
        assert_eq!(store.node(GROUP, NodeId(1)).unwrap().position, Point::new(340.0, 320.0));
        let center = store.item(GROUP, ItemId::Persisted(1)).unwrap().center();
        assert!((center.distance_to(Point::new(340.0, 320.0)) - 40.0).abs() < 1e-9);

        canvas.release(&mut store, &mut reconciler).unwrap();
        // No group on the server: the move fails and the node snaps back
        let outcomes = run_blocking(&mut api, &mut reconciler, &mut store);
        assert_eq!(outcomes.len(), 1);
        assert_eq!(store.node(GROUP, NodeId(1)).unwrap().position, Point::new(300.0, 300.0));
    }

    #[test]
    fn test_wheel_zooms_in() {
        let mut canvas = canvas(SnapMode::Orbit);
        assert!(canvas.wheel(Point::new(400.0, 300.0), -120.0));
        assert!((canvas.viewport().scale() - 1.1).abs() < 1e-9);
        assert!(!canvas.wheel(Point::new(400.0, 300.0), 0.0));
    }

    #[test]
    fn test_template_press_rejected() {
        let store = store();
        let mut canvas = canvas(SnapMode::Orbit);
        let err = canvas
            .press(&store, Press::primary(Point::origin(), PressTarget::Template("x".into())))
            .unwrap_err();
        assert!(matches!(err, GestureRejected::NotDraggable(_)));
    }

    #[test]
    fn test_scroll_parallax_and_restore() {
        let mut store = store();
        store.item_mut(GROUP, ItemId::Persisted(1)).unwrap().transform.translate_z = 100.0;
        let mut canvas = canvas(SnapMode::Orbit);

        assert!(canvas.scroll(&mut store, 100.0).unwrap());
        let moved = store.item(GROUP, ItemId::Persisted(1)).unwrap().transform;
        // factor_y = 1.5, so translate_y = -100 * -0.5 * 0.1
        assert!((moved.translate_y - 5.0).abs() < 1e-9);
        assert_eq!(moved.translate_z, 100.0);

        canvas.resize(&mut store, Size::new(600.0, 800.0));
        let restored = store.item(GROUP, ItemId::Persisted(1)).unwrap().transform;
        assert_eq!(restored.translate_y, 0.0);
        assert!(!canvas.scroll(&mut store, 100.0).unwrap());
    }

    #[test]
    fn test_switch_group_keeps_views() {
        let mut store = store();
        store.insert_collection(Collection::new(CollectionId::Group(2), "Cyclists"));
        let mut canvas = canvas(SnapMode::Orbit);
        canvas.viewport_mut().pan(30.0, 10.0);

        assert!(canvas.switch_group(&mut store, CollectionId::Group(2)));
        assert_eq!(canvas.viewport().state().pan_x, 0.0);
        assert!(canvas.switch_group(&mut store, GROUP));
        assert_eq!(canvas.viewport().state().pan_x, 30.0);
    }

    #[test]
    fn test_focus_keeps_hovered_in_place() {
        let mut store = store();
        for id in [1, 2] {
            store.item_mut(GROUP, ItemId::Persisted(id)).unwrap().snapped_to = Some(NodeId(1));
        }
        let mut canvas = canvas(SnapMode::Orbit);
        canvas.relayout(&mut store, NodeId(1)).unwrap();

        let before = store.item(GROUP, ItemId::Persisted(1)).unwrap().center();
        let focus = canvas.focus(&store, NodeId(1), Some(ItemId::Persisted(1))).unwrap();
        assert_eq!(focus[0], (ItemId::Persisted(1), before));
    }
}
