//! Analytics dashboard host
//!
//! Panels sit in a responsive grid inside a vertically scrolling container.
//! Panels can be reordered or dropped on the delete zone, and palette
//! templates can be dragged in to create new panels. While a drag hovers a
//! slot, the panel sitting there is shifted aside.

use tracing::debug;

use super::{
    Candidate, DragConfig, DragController, DragSession, DropKind, GestureRejected, Ghost, Origin,
    Press, PressTarget, SessionId,
};
use crate::layout::{
    BoundingBox, CollectionId, GridConfig, GridLayout, Item, ItemId, ItemKind, LayoutError, Point,
    Size,
};
use crate::store::Store;
use crate::sync::Reconciler;

/// A palette entry that creates a panel when dropped on the grid
#[derive(Debug, Clone, PartialEq)]
pub struct Template {
    pub name: String,
    pub title: String,
    pub analysis_type: String,
}

impl Template {
    pub fn new(
        name: impl Into<String>,
        title: impl Into<String>,
        analysis_type: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            title: title.into(),
            analysis_type: analysis_type.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DashboardConfig {
    pub grid: GridConfig,
    pub drag: DragConfig,
    /// Screen rectangle of the scrolling grid container
    pub container: BoundingBox,
    /// Screen-space drop zone that deletes panels
    pub delete_zone: Option<BoundingBox>,
    /// Where a palette proxy is grabbed, as a fraction of the cell size
    pub template_grab: f64,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            grid: GridConfig::default(),
            drag: DragConfig::default(),
            container: BoundingBox::new(240.0, 80.0, 1000.0, 700.0),
            delete_zone: Some(BoundingBox::new(24.0, 640.0, 192.0, 120.0)),
            template_grab: 0.15,
        }
    }
}

impl DashboardConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_container(mut self, container: BoundingBox) -> Self {
        self.container = container;
        self
    }

    pub fn with_delete_zone(mut self, zone: Option<BoundingBox>) -> Self {
        self.delete_zone = zone;
        self
    }
}

/// The dashboard grid and its palette
#[derive(Debug, Clone)]
pub struct Dashboard {
    config: DashboardConfig,
    templates: Vec<Template>,
    controller: DragController,
    grid: GridLayout,
    /// Panel ids by slot when the open gesture started
    occupants: Vec<ItemId>,
    scroll_top: f64,
}

impl Dashboard {
    pub const COLLECTION: CollectionId = CollectionId::Dashboard;

    pub fn new(config: DashboardConfig, templates: Vec<Template>) -> Self {
        Self {
            grid: GridLayout::compute(config.container.width, 0, &config.grid),
            controller: DragController::new(config.drag.clone()),
            templates,
            occupants: Vec::new(),
            scroll_top: 0.0,
            config,
        }
    }

    pub fn config(&self) -> &DashboardConfig {
        &self.config
    }

    pub fn templates(&self) -> &[Template] {
        &self.templates
    }

    /// Current slot layout; frozen sessions keep their own snapshot
    pub fn grid(&self) -> &GridLayout {
        &self.grid
    }

    pub fn scroll_top(&self) -> f64 {
        self.scroll_top
    }

    pub fn is_dragging(&self) -> bool {
        self.controller.is_dragging()
    }

    pub fn session(&self) -> Option<&DragSession> {
        self.controller.session()
    }

    /// Panel currently moved aside for the hovered slot
    pub fn shifted(&self) -> Option<ItemId> {
        self.controller.session().and_then(DragSession::shifted)
    }

    /// Recompute the grid and move every panel into its slot
    pub fn refresh(&mut self, store: &mut Store) -> Result<(), LayoutError> {
        let collection = store.collection_mut(Self::COLLECTION)?;
        self.grid = GridLayout::compute(self.config.container.width, collection.len(), &self.config.grid);
        let cell = self.grid.cell_size();
        let ids: Vec<ItemId> = collection.items().iter().map(|i| i.id).collect();
        for (index, id) in ids.into_iter().enumerate() {
            if let (Some(slot), Some(item)) = (self.grid.slot(index), collection.item_mut(id)) {
                item.position = slot.origin();
                item.size = cell;
            }
        }
        self.clamp_scroll();
        Ok(())
    }

    /// Resize the container. The layout of an open gesture is left alone
    /// and catches up on release.
    pub fn resize(&mut self, store: &mut Store, size: Size) -> Result<(), LayoutError> {
        self.config.container.width = size.width;
        self.config.container.height = size.height;
        if self.is_dragging() {
            debug!("resize deferred until drop");
            return Ok(());
        }
        self.refresh(store)
    }

    fn to_local(&self, screen: Point) -> Point {
        let c = self.config.container;
        Point::new(screen.x - c.x, screen.y - c.y + self.scroll_top)
    }

    fn to_screen(&self, local: Point) -> Point {
        let c = self.config.container;
        Point::new(local.x + c.x, local.y + c.y - self.scroll_top)
    }

    fn clamp_scroll(&mut self) {
        let max = (self.grid.bounds().bottom() - self.config.container.height).max(0.0);
        self.scroll_top = self.scroll_top.clamp(0.0, max);
    }

    /// Start a gesture from a pointer press. Palette drags queue a preview
    /// fetch for the template.
    pub fn press(
        &mut self,
        store: &Store,
        reconciler: &mut Reconciler,
        press: Press,
    ) -> Result<SessionId, GestureRejected> {
        self.controller.check(&press)?;
        let collection = store
            .collection(Self::COLLECTION)
            .map_err(|e| GestureRejected::NotDraggable(e.to_string()))?;
        let slots = GridLayout::compute(self.config.container.width, collection.len(), &self.config.grid);

        let (origin, proxy) = match &press.target {
            PressTarget::Item(id) => {
                let index = collection
                    .index_of(*id)
                    .ok_or_else(|| GestureRejected::NotDraggable(id.to_string()))?;
                let item = &collection.items()[index];
                let slot = slots.slot(index).copied().unwrap_or_else(|| item.bounds());
                let screen = self.to_screen(slot.origin());
                (
                    Origin::Item {
                        id: *id,
                        index,
                        start: item.position,
                        snapped_to: None,
                    },
                    Ghost::new(BoundingBox::new(screen.x, screen.y, slot.width, slot.height)),
                )
            }
            PressTarget::Template(name) => {
                if !self.templates.iter().any(|t| &t.name == name) {
                    return Err(GestureRejected::NotDraggable(format!("template {name}")));
                }
                let cell = slots.cell_size();
                let grab = self.config.template_grab;
                (
                    Origin::Template { name: name.clone() },
                    Ghost::new(BoundingBox::new(
                        press.screen.x - cell.width * grab,
                        press.screen.y - cell.height * grab,
                        cell.width,
                        cell.height,
                    )),
                )
            }
            PressTarget::Control => return Err(GestureRejected::Excluded),
            other => {
                return Err(GestureRejected::NotDraggable(format!("{other:?}").to_lowercase()))
            }
        };

        let template = match &origin {
            Origin::Template { name } => Some(name.clone()),
            _ => None,
        };
        let occupants = collection.items().iter().map(|i| i.id).collect();
        let session = self.controller.begin(&press, origin, proxy, Some(slots))?;
        self.occupants = occupants;
        if let Some(name) = template {
            reconciler.fetch_preview(Self::COLLECTION, &name, session.0);
        }
        Ok(session)
    }

    pub fn pointer_move(&mut self, screen: Point) -> bool {
        self.controller.pointer_move(screen)
    }

    /// Process one animation frame of the open gesture
    pub fn frame(&mut self) {
        if !self.controller.is_dragging() {
            return;
        }
        if let Some(screen) = self.controller.take_frame() {
            self.controller.advance(screen);
        }

        let pointer = self.controller.session().map(|s| s.last()).unwrap_or_default();
        let c = self.config.container;
        let (_, vy) = self.config.drag.autoscroll().velocity(
            Point::new(pointer.x - c.x, pointer.y - c.y),
            Size::new(c.width, c.height),
        );
        if vy != 0.0 {
            let extent = self
                .controller
                .session()
                .and_then(|s| s.slots())
                .map_or(0.0, |slots| slots.bounds().bottom());
            let max = (extent - c.height).max(0.0);
            self.scroll_top = (self.scroll_top + vy).clamp(0.0, max);
        }

        let candidate = self.candidate_at(pointer);
        if self.controller.update_candidate(candidate) {
            self.shift_aside(candidate);
        }
    }

    /// Move the panel under the candidate slot out of the way, putting the
    /// previously shifted one back
    fn shift_aside(&mut self, candidate: Candidate) {
        let dragged = match self.controller.session().map(DragSession::origin) {
            Some(Origin::Item { id, .. }) => Some(*id),
            _ => None,
        };
        let shifted = match candidate {
            Candidate::Slot(index) => self
                .occupants
                .get(index)
                .copied()
                .filter(|occupant| Some(*occupant) != dragged),
            _ => None,
        };
        if let Some(back) = self.controller.set_shifted(shifted).filter(|b| Some(*b) != shifted) {
            debug!(%back, "panel back in its slot");
        }
    }

    /// Drop target under a screen point: the delete zone first, then the
    /// nearest slot of the session's snapshot when over the container.
    pub fn candidate_at(&self, screen: Point) -> Candidate {
        if self.config.delete_zone.is_some_and(|zone| zone.contains(screen)) {
            return Candidate::Delete;
        }
        if !self.config.container.contains(screen) {
            return Candidate::None;
        }
        let local = self.to_local(screen);
        match self.controller.session().and_then(|s| s.slots()) {
            Some(slots) => Candidate::Slot(slots.nearest_slot(local)),
            None => Candidate::Slot(self.grid.nearest_slot(local)),
        }
    }

    /// Attach a fetched preview to the palette proxy. Returns `false` when
    /// the session it was fetched for is no longer open.
    pub fn attach_preview(&mut self, session: u64, payload: serde_json::Value) -> bool {
        match self.controller.session_mut() {
            Some(open) if open.id() == SessionId(session) => {
                open.proxy_mut().preview = Some(payload);
                true
            }
            _ => {
                debug!(session, "dropping stale preview");
                false
            }
        }
    }

    /// End the gesture and apply the drop
    pub fn release(
        &mut self,
        store: &mut Store,
        reconciler: &mut Reconciler,
    ) -> Result<Option<DropKind>, LayoutError> {
        if self.controller.has_pending_frame() {
            self.frame();
        }
        let Some((session, kind)) = self.controller.finish() else {
            return Ok(None);
        };
        let c = Self::COLLECTION;

        match (session.origin(), session.candidate()) {
            (Origin::Template { name }, Candidate::Slot(index)) => {
                let template = self
                    .templates
                    .iter()
                    .find(|t| &t.name == name)
                    .cloned()
                    .ok_or_else(|| LayoutError::invalid_config("template", format!("unknown template {name}")))?;
                let id = store.next_transient_id();
                let item = Item::new(
                    id,
                    ItemKind::Panel {
                        analysis_type: template.analysis_type,
                    },
                    template.title,
                    self.grid.cell_size(),
                );
                store.collection_mut(c)?.insert(index, item);
                debug!(%id, index, template = %name, "palette drop");
                reconciler.create_item(store, c, id)?;
            }
            (Origin::Template { name }, _) => {
                debug!(template = %name, "palette drag discarded");
            }
            (Origin::Item { id, .. }, Candidate::Slot(index)) => {
                debug!(%id, index, "panel moved");
                store.collection_mut(c)?.move_to(*id, index);
            }
            (Origin::Item { id, .. }, Candidate::Delete) => {
                debug!(%id, "panel dropped on delete zone");
                reconciler.delete_item(store, c, *id)?;
            }
            _ => {}
        }

        reconciler.persist_order(store, c)?;
        self.refresh(store)?;
        Ok(Some(kind))
    }

    /// Remove a panel outside of a drag
    pub fn remove(
        &mut self,
        store: &mut Store,
        reconciler: &mut Reconciler,
        id: ItemId,
    ) -> Result<(), LayoutError> {
        reconciler.delete_item(store, Self::COLLECTION, id)?;
        reconciler.persist_order(store, Self::COLLECTION)?;
        self.refresh(store)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use crate::store::Collection;
    use crate::sync::{run_blocking, Api, ItemRecord, MemoryApi, Outcome};

    use super::*;

    fn panel(id: u64) -> Item {
        Item::new(
            ItemId::Persisted(id),
            ItemKind::Panel {
                analysis_type: "busy-periods".into(),
            },
            format!("panel {id}"),
            Size::new(100.0, 100.0),
        )
    }

    fn record(id: u64) -> ItemRecord {
        ItemRecord {
            id,
            kind: ItemKind::Panel {
                analysis_type: "busy-periods".into(),
            },
            title: format!("panel {id}"),
            x: 0.0,
            y: 0.0,
            node_id: None,
            configuration: serde_json::Value::Null,
        }
    }

    fn setup(ids: &[u64]) -> (Dashboard, Store) {
        let mut store = Store::new();
        store.insert_collection(Collection::with_contents(
            CollectionId::Dashboard,
            "Insights",
            ids.iter().map(|id| panel(*id)).collect(),
            vec![],
        ));
        let config = DashboardConfig::new()
            .with_container(BoundingBox::new(0.0, 0.0, 625.0, 2000.0))
            .with_delete_zone(Some(BoundingBox::new(700.0, 0.0, 100.0, 100.0)));
        let mut dashboard = Dashboard::new(
            config,
            vec![Template::new("rsvp", "RSVP breakdown", "rsvp-distribution")],
        );
        dashboard.refresh(&mut store).unwrap();
        (dashboard, store)
    }

    fn order(store: &Store) -> Vec<u64> {
        store
            .collection(CollectionId::Dashboard)
            .unwrap()
            .persisted_order()
    }

    #[test]
    fn test_refresh_places_panels_in_slots() {
        let (dashboard, store) = setup(&[1, 2, 3]);
        let items = store.collection(CollectionId::Dashboard).unwrap().items().to_vec();
        assert_eq!(dashboard.grid().columns(), 2);
        assert_eq!(items[1].position, Point::new(325.0, 0.0));
        assert_eq!(items[2].position.x, 0.0);
        assert_eq!(items[0].size, dashboard.grid().cell_size());
    }

    #[test]
    fn test_reorder_to_front() {
        let (mut dashboard, mut store) = setup(&[1, 2, 3, 4, 5]);
        let mut reconciler = Reconciler::new();
        let a = dashboard.grid().slot(2).unwrap().center();

        dashboard
            .press(&store, &mut reconciler, Press::primary(a, PressTarget::Item(ItemId::Persisted(3))))
            .unwrap();
        dashboard.pointer_move(Point::new(20.0, 20.0));
        dashboard.frame();
        assert_eq!(dashboard.session().unwrap().candidate(), Candidate::Slot(0));

        dashboard.release(&mut store, &mut reconciler).unwrap();
        assert_eq!(order(&store), vec![3, 1, 2, 4, 5]);

        let requests = reconciler.drain();
        assert_eq!(requests.len(), 1);
        assert_eq!(
            requests[0].call,
            crate::sync::Call::SetOrder {
                collection: CollectionId::Dashboard,
                ids: vec![3, 1, 2, 4, 5],
            }
        );
    }

    #[test]
    fn test_shifted_panel_follows_candidate() {
        let (mut dashboard, store) = setup(&[1, 2, 3, 4]);
        let mut reconciler = Reconciler::new();
        let slot = |i: usize| dashboard.grid().slot(i).unwrap().center();
        let (first, second, own) = (slot(0), slot(1), slot(3));

        dashboard
            .press(&store, &mut reconciler, Press::primary(own, PressTarget::Item(ItemId::Persisted(4))))
            .unwrap();
        assert_eq!(dashboard.shifted(), None);

        let hover = |dashboard: &mut Dashboard, at: Point| {
            dashboard.pointer_move(at);
            dashboard.frame();
            dashboard.shifted()
        };
        assert_eq!(hover(&mut dashboard, first), Some(ItemId::Persisted(1)));
        assert_eq!(hover(&mut dashboard, second), Some(ItemId::Persisted(2)));
        // Back over its own slot nothing needs to move
        assert_eq!(hover(&mut dashboard, own), None);
        assert_eq!(hover(&mut dashboard, second), Some(ItemId::Persisted(2)));
        assert_eq!(hover(&mut dashboard, Point::new(650.0, 300.0)), None);
    }

    #[test]
    fn test_release_outside_returns_panel() {
        let (mut dashboard, mut store) = setup(&[1, 2]);
        let mut reconciler = Reconciler::new();
        let start = dashboard.grid().slot(0).unwrap().center();
        dashboard
            .press(&store, &mut reconciler, Press::primary(start, PressTarget::Item(ItemId::Persisted(1))))
            .unwrap();
        dashboard.pointer_move(Point::new(650.0, 300.0));
        let kind = dashboard.release(&mut store, &mut reconciler).unwrap();

        assert_eq!(kind, Some(DropKind::Cancel));
        assert_eq!(order(&store), vec![1, 2]);
        assert_eq!(reconciler.queued(), 0);
    }

    #[test]
    fn test_palette_drop_creates_then_orders() {
        let (mut dashboard, mut store) = setup(&[1, 2]);
        let mut reconciler = Reconciler::new();
        let mut api = MemoryApi::new().with_dashboard(vec![record(1), record(2)]);

        let session = dashboard
            .press(&store, &mut reconciler, Press::primary(Point::new(700.0, 500.0), PressTarget::Template("rsvp".into())))
            .unwrap();
        // The preview fetch is answered while the drag is open
        let preview = reconciler.next_request().unwrap();
        assert_eq!(preview.call.name(), "fetch_item_data");
        match reconciler.complete(&mut store, preview.token, api.call(&preview)) {
            Outcome::Preview { session: s, payload } => assert!(dashboard.attach_preview(s, payload)),
            other => panic!("unexpected outcome {other:?}"),
        }
        assert!(dashboard.session().unwrap().proxy().preview.is_some());
        assert_eq!(dashboard.session().unwrap().id(), session);

        dashboard.pointer_move(dashboard.grid().slot(0).unwrap().center());
        dashboard.release(&mut store, &mut reconciler).unwrap();
        assert_eq!(store.collection(CollectionId::Dashboard).unwrap().len(), 3);

        run_blocking(&mut api, &mut reconciler, &mut store);
        assert_eq!(api.count("create_item"), 1);
        assert_eq!(api.count("set_order"), 1);
        assert_eq!(api.count("delete_item"), 0);
        assert_eq!(api.order_of(CollectionId::Dashboard), vec![3, 1, 2]);
        assert_eq!(order(&store), vec![3, 1, 2]);
    }

    #[test]
    fn test_palette_drop_on_delete_zone_is_discarded() {
        let (mut dashboard, mut store) = setup(&[1]);
        let mut reconciler = Reconciler::new();
        dashboard
            .press(&store, &mut reconciler, Press::primary(Point::new(700.0, 500.0), PressTarget::Template("rsvp".into())))
            .unwrap();
        reconciler.drain();
        dashboard.pointer_move(Point::new(750.0, 50.0));
        let kind = dashboard.release(&mut store, &mut reconciler).unwrap();

        assert_eq!(kind, Some(DropKind::Delete));
        assert_eq!(order(&store), vec![1]);
        assert_eq!(reconciler.queued(), 0);
    }

    #[test]
    fn test_stale_preview_is_dropped() {
        let (mut dashboard, _) = setup(&[1]);
        assert!(!dashboard.attach_preview(9, serde_json::json!({})));
    }

    #[test]
    fn test_resize_during_drag_keeps_snapshot() {
        let (mut dashboard, mut store) = setup(&[1, 2, 3]);
        let mut reconciler = Reconciler::new();
        let start = dashboard.grid().slot(0).unwrap().center();
        dashboard
            .press(&store, &mut reconciler, Press::primary(start, PressTarget::Item(ItemId::Persisted(1))))
            .unwrap();
        dashboard.resize(&mut store, Size::new(500.0, 2000.0)).unwrap();

        assert_eq!(dashboard.grid().columns(), 2);
        assert_eq!(dashboard.session().unwrap().slots().unwrap().columns(), 2);
        dashboard.release(&mut store, &mut reconciler).unwrap();
        assert_eq!(dashboard.grid().columns(), 1);
    }

    #[test]
    fn test_node_press_rejected() {
        let (mut dashboard, store) = setup(&[1]);
        let mut reconciler = Reconciler::new();
        let err = dashboard
            .press(&store, &mut reconciler, Press::primary(Point::origin(), PressTarget::Background))
            .unwrap_err();
        assert_eq!(err, GestureRejected::NotDraggable("background".into()));
    }
}
