//! Script replay
//!
//! A [`Session`] owns everything a browser tab would: the store, both drag
//! hosts, the reconciler and (standing in for the server) a [`MemoryApi`].
//! Statements of a gesture script are executed one at a time against it.
//!
//! Server calls are only delivered on `sync`, so a script controls exactly
//! which local changes are still in flight when the next gesture starts.

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::drag::{Canvas, Dashboard, Press, PressTarget};
use crate::layout::{CollectionId, ItemId, LayoutError, NodeId, Point, Size, ViewState};
use crate::parser::ast::{Script, Span, Statement, Target, ViewTarget};
use crate::renderer::{render_svg, SvgConfig};
use crate::scene::Scene;
use crate::settings::Settings;
use crate::store::{Collection, Store};
use crate::sync::memory::LoggedCall;
use crate::sync::{run_blocking, ApiError, MemoryApi, Notice, Outcome, Reconciler};

/// Fit padding used when a script doesn't name one
const DEFAULT_FIT_PADDING: f64 = 40.0;

/// Status used by `fail next` without an explicit one
const DEFAULT_FAILURE_STATUS: u16 = 500;

const DEFAULT_EVENT_TITLE: &str = "New Event";
const DEFAULT_NODE_LABEL: &str = "New Node";

/// A statement that could not be executed
#[derive(Debug, Error)]
#[error("`{keyword}` at {span:?}: {source}")]
pub struct StepError {
    pub keyword: &'static str,
    pub span: Span,
    #[source]
    pub source: LayoutError,
}

/// Which host receives pointer input
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ActiveView {
    Dashboard,
    Group(u64),
}

impl ActiveView {
    pub fn collection(&self) -> CollectionId {
        match self {
            ActiveView::Dashboard => CollectionId::Dashboard,
            ActiveView::Group(id) => CollectionId::Group(*id),
        }
    }
}

/// Final state of a replay, as written by the CLI
#[derive(Debug, Serialize)]
pub struct Report<'a> {
    pub view: ActiveView,
    pub viewport: ViewState,
    pub collections: Vec<&'a Collection>,
    pub calls: &'a [LoggedCall],
    pub notices: &'a [Notice],
    /// Gestures and commands the hosts refused
    pub rejected: &'a [String],
}

/// Everything a script runs against
pub struct Session {
    store: Store,
    api: MemoryApi,
    reconciler: Reconciler,
    canvas: Canvas,
    dashboard: Dashboard,
    active: ActiveView,
    notices: Vec<Notice>,
    rejected: Vec<String>,
    svg: SvgConfig,
}

impl Session {
    /// Start on the first group of the scene, or on the dashboard if there
    /// are no groups
    pub fn new(scene: &Scene, settings: &Settings) -> Result<Self, LayoutError> {
        let active = scene
            .groups
            .first()
            .map_or(ActiveView::Dashboard, |g| ActiveView::Group(g.id));

        let mut session = Self {
            store: scene.store(settings),
            api: scene.server(),
            reconciler: settings.reconciler(),
            canvas: Canvas::new(settings.canvas.clone(), active.collection()),
            dashboard: Dashboard::new(settings.dashboard.clone(), scene.templates.clone()),
            active,
            notices: Vec::new(),
            rejected: Vec::new(),
            svg: settings.svg.clone(),
        };

        session.dashboard.refresh(&mut session.store)?;
        if let ActiveView::Group(_) = active {
            session.canvas.relayout_all(&mut session.store)?;
        }
        Ok(session)
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn api(&self) -> &MemoryApi {
        &self.api
    }

    pub fn canvas(&self) -> &Canvas {
        &self.canvas
    }

    pub fn dashboard(&self) -> &Dashboard {
        &self.dashboard
    }

    pub fn active(&self) -> ActiveView {
        self.active
    }

    pub fn notices(&self) -> &[Notice] {
        &self.notices
    }

    pub fn rejected(&self) -> &[String] {
        &self.rejected
    }

    /// Execute every statement in order, stopping at the first that fails
    pub fn run(&mut self, script: &Script) -> Result<(), StepError> {
        for statement in &script.statements {
            self.execute(&statement.node).map_err(|source| StepError {
                keyword: statement.node.keyword(),
                span: statement.span.clone(),
                source,
            })?;
        }
        info!(
            statements = script.statements.len(),
            calls = self.api.log().len(),
            notices = self.notices.len(),
            "replay finished"
        );
        Ok(())
    }

    /// Execute one statement. Refused gestures are recorded, not returned
    /// as errors.
    pub fn execute(&mut self, statement: &Statement) -> Result<(), LayoutError> {
        debug!(keyword = statement.keyword(), "executing");
        match statement {
            Statement::View(target) => self.view(*target)?,
            Statement::Resize { width, height } => {
                let size = Size::new(*width, *height);
                match self.active {
                    ActiveView::Dashboard => self.dashboard.resize(&mut self.store, size)?,
                    ActiveView::Group(_) => self.canvas.resize(&mut self.store, size),
                }
            }
            Statement::Press {
                x,
                y,
                button,
                target,
            } => self.press(Point::new(*x, *y), *button, target),
            Statement::Move { x, y } => {
                let screen = Point::new(*x, *y);
                match self.active {
                    ActiveView::Dashboard => self.dashboard.pointer_move(screen),
                    ActiveView::Group(_) => self.canvas.pointer_move(screen),
                };
            }
            Statement::Frame { count } => {
                for _ in 0..*count {
                    match self.active {
                        ActiveView::Dashboard => self.dashboard.frame(),
                        ActiveView::Group(_) => self.canvas.frame(&mut self.store)?,
                    }
                }
            }
            Statement::Release => {
                let dropped = match self.active {
                    ActiveView::Dashboard => {
                        self.dashboard.release(&mut self.store, &mut self.reconciler)?
                    }
                    ActiveView::Group(_) => {
                        self.canvas.release(&mut self.store, &mut self.reconciler)?
                    }
                };
                if dropped.is_none() {
                    self.reject("release: no gesture in progress");
                }
            }
            Statement::Wheel { x, y, delta } => {
                if self.require_canvas("wheel") {
                    self.canvas.wheel(Point::new(*x, *y), *delta);
                }
            }
            Statement::Zoom { direction, x, y } => {
                if self.require_canvas("zoom") {
                    self.canvas.viewport_mut().zoom_at(*x, *y, *direction);
                }
            }
            Statement::Pan { dx, dy } => {
                if self.require_canvas("pan") {
                    self.canvas.viewport_mut().pan(*dx, *dy);
                }
            }
            Statement::Fit { node, padding } => {
                if self.require_canvas("fit") {
                    let padding = padding.unwrap_or(DEFAULT_FIT_PADDING);
                    self.canvas.fit_node(&self.store, NodeId(*node), padding)?;
                }
            }
            Statement::ResetZoom => {
                if self.require_canvas("reset zoom") {
                    self.canvas.reset_zoom();
                }
            }
            Statement::Tick { ms } => {
                self.canvas.tick(*ms);
            }
            Statement::Remove { item } => self.remove(ItemId::Persisted(*item))?,
            Statement::RemoveNode { node } => {
                if self.require_canvas("remove node")
                    && self
                        .canvas
                        .delete_node(&mut self.store, &mut self.reconciler, NodeId(*node))?
                        .is_none()
                {
                    self.reject("remove node: a gesture is in progress");
                }
            }
            Statement::AddEvent { node, title } => {
                if self.require_canvas("add event") {
                    let title = title.as_deref().unwrap_or(DEFAULT_EVENT_TITLE);
                    let id = self.canvas.create_event(
                        &mut self.store,
                        &mut self.reconciler,
                        NodeId(*node),
                        title,
                    )?;
                    debug!(%id, "event added");
                }
            }
            Statement::AddNode { x, y, label } => {
                if self.require_canvas("add node") {
                    let label = label.as_deref().unwrap_or(DEFAULT_NODE_LABEL);
                    self.canvas.create_node_at(
                        &self.store,
                        &mut self.reconciler,
                        Point::new(*x, *y),
                        label,
                    )?;
                }
            }
            Statement::FailNext { status } => {
                let status = status.unwrap_or(DEFAULT_FAILURE_STATUS);
                self.api
                    .fail_next(ApiError::status(status, "injected failure"));
            }
            Statement::Sync => self.sync()?,
            Statement::Scroll { offset } => {
                if self.require_canvas("scroll")
                    && !self.canvas.scroll(&mut self.store, *offset)?
                {
                    self.reject("scroll: parallax is off at this width");
                }
            }
        }
        Ok(())
    }

    fn reject(&mut self, message: impl Into<String>) {
        let message = message.into();
        warn!(%message, "rejected");
        self.rejected.push(message);
    }

    fn require_canvas(&mut self, keyword: &str) -> bool {
        match self.active {
            ActiveView::Group(_) => true,
            ActiveView::Dashboard => {
                self.reject(format!("{keyword}: needs a group view"));
                false
            }
        }
    }

    fn view(&mut self, target: ViewTarget) -> Result<(), LayoutError> {
        if self.canvas.is_dragging() || self.dashboard.is_dragging() {
            self.reject("view: a gesture is in progress");
            return Ok(());
        }
        match target {
            ViewTarget::Dashboard => {
                self.active = ActiveView::Dashboard;
                self.dashboard.refresh(&mut self.store)?;
            }
            ViewTarget::Group(id) => {
                let collection = CollectionId::Group(id);
                self.store.collection(collection)?;
                if self.canvas.collection() != collection {
                    self.canvas.switch_group(&mut self.store, collection);
                }
                self.active = ActiveView::Group(id);
                self.canvas.relayout_all(&mut self.store)?;
            }
        }
        Ok(())
    }

    fn press(&mut self, screen: Point, button: u8, target: &Target) {
        let target = match target {
            Target::Item(id) => PressTarget::Item(ItemId::Persisted(*id)),
            Target::Node(id) => PressTarget::Node(NodeId(*id)),
            Target::Template(name) => PressTarget::Template(name.clone()),
            Target::Control => PressTarget::Control,
            Target::Background => PressTarget::Background,
        };
        let press = Press {
            screen,
            button,
            target,
        };

        let started = match self.active {
            ActiveView::Dashboard => {
                self.dashboard
                    .press(&self.store, &mut self.reconciler, press)
            }
            ActiveView::Group(_) => self.canvas.press(&self.store, press),
        };
        match started {
            Ok(session) => debug!(%session, "gesture started"),
            Err(error) => self.reject(format!("press: {error}")),
        }
    }

    fn remove(&mut self, id: ItemId) -> Result<(), LayoutError> {
        match self.active {
            ActiveView::Dashboard => {
                self.dashboard
                    .remove(&mut self.store, &mut self.reconciler, id)
            }
            ActiveView::Group(_) => {
                let c = self.canvas.collection();
                let node = self.store.item(c, id)?.snapped_to;
                self.reconciler.delete_item(&mut self.store, c, id)?;
                self.reconciler.persist_order(&self.store, c)?;
                if let Some(node) = node {
                    self.canvas.relayout(&mut self.store, node)?;
                }
                Ok(())
            }
        }
    }

    /// Deliver every queued call and apply the results
    pub fn sync(&mut self) -> Result<(), LayoutError> {
        let outcomes = run_blocking(&mut self.api, &mut self.reconciler, &mut self.store);
        for outcome in outcomes {
            match outcome {
                Outcome::Failed(notice) => {
                    warn!(%notice, "server call failed");
                    self.notices.push(notice);
                }
                Outcome::Preview { session, payload } => {
                    self.dashboard.attach_preview(session, payload);
                }
                Outcome::Applied | Outcome::Superseded | Outcome::Unknown => {}
            }
        }
        if !self.dashboard.is_dragging() {
            self.dashboard.refresh(&mut self.store)?;
        }
        Ok(())
    }

    pub fn report(&self) -> Report<'_> {
        Report {
            view: self.active,
            viewport: self.canvas.viewport().state(),
            collections: self.store.collections().collect(),
            calls: self.api.log(),
            notices: &self.notices,
            rejected: &self.rejected,
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&self.report())
    }

    /// SVG snapshot of the active view's collection
    pub fn to_svg(&self) -> Result<String, LayoutError> {
        let collection = self.store.collection(self.active.collection())?;
        Ok(render_svg(collection, &self.svg))
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::parser::parse;

    const SCENE: &str = r#"
[[groups]]
id = 1
name = "Climbing club"

[[groups.nodes]]
id = 1
label = "Saturday"
x = 400.0
y = 300.0

[[groups.events]]
id = 10
title = "Bouldering"
x = 900.0
y = 600.0

[[panels]]
id = 20
title = "RSVPs"
analysis_type = "rsvp-distribution"

[[panels]]
id = 21
title = "Hosts"
analysis_type = "top-hosts"
"#;

    fn session() -> Session {
        let scene = Scene::from_str(SCENE).unwrap();
        Session::new(&scene, &Settings::default()).unwrap()
    }

    fn run(session: &mut Session, source: &str) {
        session.run(&parse(source).unwrap()).unwrap();
    }

    #[test]
    fn test_starts_on_first_group() {
        let session = session();
        assert_eq!(session.active(), ActiveView::Group(1));
    }

    #[test]
    fn test_snap_event_to_node() {
        let mut session = session();
        run(
            &mut session,
            "press 980 650 on item 10\nmove 420 320\nframe\nrelease\nsync",
        );

        let item = session
            .store()
            .item(CollectionId::Group(1), ItemId::Persisted(10))
            .unwrap();
        assert_eq!(item.snapped_to, Some(NodeId(1)));
        assert_eq!(session.api().count("update_item"), 1);
        assert!(session.notices().is_empty());
    }

    #[test]
    fn test_failed_sync_produces_notice() {
        let mut session = session();
        run(&mut session, "view dashboard\nremove item 20\nfail next 503\nsync");

        assert_eq!(session.notices().len(), 1);
        assert!(session.notices()[0].message.starts_with("Could not remove item"));
        let dashboard = session.store().collection(CollectionId::Dashboard).unwrap();
        assert_eq!(dashboard.persisted_order(), vec![20, 21]);
    }

    #[test]
    fn test_canvas_commands_need_group_view() {
        let mut session = session();
        run(&mut session, "view dashboard\nzoom in at 10 10");
        assert_eq!(session.rejected(), &["zoom: needs a group view".to_string()]);
    }

    #[test]
    fn test_view_switch_refused_mid_gesture() {
        let mut session = session();
        run(&mut session, "press 10 10 on background\nview dashboard");
        assert_eq!(session.active(), ActiveView::Group(1));
        assert_eq!(session.rejected().len(), 1);
    }

    #[test]
    fn test_unknown_group_is_an_error() {
        let mut session = session();
        let err = session.run(&parse("sync\nview group 9").unwrap()).unwrap_err();
        assert_eq!(err.keyword, "view");
        assert_eq!(err.span, 5..17);
    }

    #[test]
    fn test_add_and_remove_on_canvas() {
        let mut session = session();
        run(
            &mut session,
            "add node at 700 300\nsync\nadd event on node 2 \"Ropes\"\nsync\nremove node 1\nsync",
        );

        let group = session.store().collection(CollectionId::Group(1)).unwrap();
        assert_eq!(group.nodes().len(), 1);
        assert_eq!(group.nodes()[0].label, "New Node");
        let ropes = group.items().iter().find(|i| i.title == "Ropes").unwrap();
        assert_eq!(ropes.snapped_to, Some(NodeId(2)));
        assert!(!ropes.unsaved);
        assert!(session.notices().is_empty());
        assert_eq!(session.api().count("delete_node"), 1);
    }

    #[test]
    fn test_report_serializes() {
        let session = session();
        let json = session.to_json().unwrap();
        assert!(json.contains("\"view\""));
        assert!(json.contains("Climbing club"));
        assert!(session.to_svg().unwrap().contains("Bouldering"));
    }
}
