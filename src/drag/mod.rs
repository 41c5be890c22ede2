//! Drag controller
//!
//! One [`DragController`] per host tracks at most one open gesture. The
//! lifecycle is `idle → dragging → (target | delete | cancel) → idle`:
//!
//! - [`DragController::begin`] opens a session from a primary-button press
//!   and swaps the dragged element for a proxy [`DragSurface`] (a [`Ghost`]
//!   unless the host renders something else)
//! - raw pointer moves go through a [`FrameGate`]; the host processes at
//!   most one per frame with [`DragController::take_frame`] and
//!   [`DragController::advance`]
//! - the host resolves a [`Candidate`] each frame through its spatial index
//! - [`DragController::finish`] closes the session and reports how it ended
//!
//! The controller owns no layout. The hosts in [`canvas`] and [`dashboard`]
//! decide what a drop means for their collection.

pub mod canvas;
pub mod dashboard;
pub mod frame;
pub mod surface;

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, trace};

pub use canvas::{Canvas, CanvasConfig, SnapMode};
pub use dashboard::{Dashboard, DashboardConfig, Template};
pub use frame::{AutoScroll, FrameGate, Transitions};
pub use surface::{DragSurface, Ghost};

use crate::layout::{GridLayout, ItemId, NodeId, Point};

/// Drag tunables shared by both hosts
#[derive(Debug, Clone, PartialEq)]
pub struct DragConfig {
    /// Distance from a viewport edge at which auto-scroll starts
    pub autoscroll_margin: f64,
    /// Auto-scroll speed in px per frame at the very edge
    pub autoscroll_max_speed: f64,
    /// Stacking order of the proxy while dragging
    pub drag_z: i32,
}

impl Default for DragConfig {
    fn default() -> Self {
        Self {
            autoscroll_margin: 48.0,
            autoscroll_max_speed: 18.0,
            drag_z: 1000,
        }
    }
}

impl DragConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_autoscroll(mut self, margin: f64, max_speed: f64) -> Self {
        self.autoscroll_margin = margin;
        self.autoscroll_max_speed = max_speed;
        self
    }

    pub fn with_drag_z(mut self, z: i32) -> Self {
        self.drag_z = z;
        self
    }

    pub fn autoscroll(&self) -> AutoScroll {
        AutoScroll::new(self.autoscroll_margin, self.autoscroll_max_speed)
    }
}

/// What a pointer press landed on
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PressTarget {
    Item(ItemId),
    Node(NodeId),
    /// A palette entry on the dashboard
    Template(String),
    /// A button, input or slider inside an element
    Control,
    Background,
}

/// A pointer-down event
#[derive(Debug, Clone, PartialEq)]
pub struct Press {
    pub screen: Point,
    pub button: u8,
    pub target: PressTarget,
}

impl Press {
    pub fn primary(screen: Point, target: PressTarget) -> Self {
        Self {
            screen,
            button: 0,
            target,
        }
    }
}

/// Current drop target of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Candidate {
    #[default]
    None,
    /// Insertion index in a grid
    Slot(usize),
    Node(NodeId),
    Delete,
}

/// What the gesture started from
#[derive(Debug, Clone, PartialEq)]
pub enum Origin {
    Item {
        id: ItemId,
        index: usize,
        /// World top-left before the drag
        start: Point,
        snapped_to: Option<NodeId>,
    },
    Node {
        id: NodeId,
        /// World center before the drag
        start: Point,
    },
    Template {
        name: String,
    },
    /// Background press panning the canvas
    Pan,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct SessionId(pub u64);

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "drag-{}", self.0)
    }
}

/// Why a press did not open a gesture
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GestureRejected {
    #[error("button {0} does not start a drag")]
    NotPrimary(u8),

    #[error("a drag is already in progress")]
    AlreadyDragging,

    #[error("press landed on a control")]
    Excluded,

    #[error("{0} cannot be dragged here")]
    NotDraggable(String),
}

/// How a session ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DropKind {
    Target,
    Delete,
    Cancel,
}

impl DropKind {
    pub fn of(candidate: Candidate) -> Self {
        match candidate {
            Candidate::None => DropKind::Cancel,
            Candidate::Delete => DropKind::Delete,
            Candidate::Slot(_) | Candidate::Node(_) => DropKind::Target,
        }
    }
}

/// State of one open gesture
#[derive(Debug, Clone)]
pub struct DragSession<S = Ghost> {
    id: SessionId,
    origin: Origin,
    start: Point,
    last: Point,
    grab: Point,
    candidate: Candidate,
    slots: Option<GridLayout>,
    /// Item moved out of the way of the current candidate slot
    shifted: Option<ItemId>,
    proxy: S,
    frames: FrameGate<Point>,
}

impl<S> DragSession<S> {
    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn origin(&self) -> &Origin {
        &self.origin
    }

    /// Screen position of the press
    pub fn start(&self) -> Point {
        self.start
    }

    /// Last processed screen position of the pointer
    pub fn last(&self) -> Point {
        self.last
    }

    /// Pointer offset from the proxy's top-left corner, in screen px
    pub fn grab(&self) -> Point {
        self.grab
    }

    pub fn candidate(&self) -> Candidate {
        self.candidate
    }

    /// Grid snapshot taken when the gesture started
    pub fn slots(&self) -> Option<&GridLayout> {
        self.slots.as_ref()
    }

    pub fn shifted(&self) -> Option<ItemId> {
        self.shifted
    }

    pub fn proxy(&self) -> &S {
        &self.proxy
    }

    pub fn proxy_mut(&mut self) -> &mut S {
        &mut self.proxy
    }

    /// Pointer events dropped by frame coalescing
    pub fn dropped_events(&self) -> usize {
        self.frames.dropped()
    }
}

/// Per-host gesture state machine, generic over the proxy element
#[derive(Debug, Clone)]
pub struct DragController<S = Ghost> {
    config: DragConfig,
    session: Option<DragSession<S>>,
    next_session: u64,
}

impl<S> Default for DragController<S> {
    fn default() -> Self {
        Self::new(DragConfig::default())
    }
}

impl<S> DragController<S> {
    pub fn new(config: DragConfig) -> Self {
        Self {
            config,
            session: None,
            next_session: 0,
        }
    }

    pub fn config(&self) -> &DragConfig {
        &self.config
    }

    pub fn is_dragging(&self) -> bool {
        self.session.is_some()
    }

    pub fn session(&self) -> Option<&DragSession<S>> {
        self.session.as_ref()
    }

    pub fn session_mut(&mut self) -> Option<&mut DragSession<S>> {
        self.session.as_mut()
    }

    /// Entry conditions that don't depend on what was pressed
    pub fn check(&self, press: &Press) -> Result<(), GestureRejected> {
        if press.button != 0 {
            return Err(GestureRejected::NotPrimary(press.button));
        }
        if self.session.is_some() {
            return Err(GestureRejected::AlreadyDragging);
        }
        if press.target == PressTarget::Control {
            return Err(GestureRejected::Excluded);
        }
        Ok(())
    }

    /// Queue a pointer position for the next frame. Returns `false` when idle.
    pub fn pointer_move(&mut self, screen: Point) -> bool {
        match self.session.as_mut() {
            Some(session) => {
                session.frames.push(screen);
                true
            }
            None => false,
        }
    }

    pub fn has_pending_frame(&self) -> bool {
        self.session.as_ref().is_some_and(|s| s.frames.is_pending())
    }

    /// Pointer position to process this frame
    pub fn take_frame(&mut self) -> Option<Point> {
        self.session.as_mut()?.frames.take()
    }

    /// Record which item stepped aside for the candidate slot. Returns the
    /// one it replaces, which goes back to its own slot.
    pub fn set_shifted(&mut self, shifted: Option<ItemId>) -> Option<ItemId> {
        let session = self.session.as_mut()?;
        if session.shifted != shifted {
            debug!(session = %session.id, ?shifted, "shifted item changed");
        }
        std::mem::replace(&mut session.shifted, shifted)
    }

    /// Close the session
    pub fn finish(&mut self) -> Option<(DragSession<S>, DropKind)> {
        let session = self.session.take()?;
        let kind = DropKind::of(session.candidate);
        debug!(session = %session.id, ?kind, "drag finished");
        Some((session, kind))
    }
}

impl<S: DragSurface> DragController<S> {
    /// Open a session. `proxy` stands in for the dragged element until the
    /// gesture ends; `slots` is the grid snapshot for grid hosts.
    pub fn begin(
        &mut self,
        press: &Press,
        origin: Origin,
        mut proxy: S,
        slots: Option<GridLayout>,
    ) -> Result<SessionId, GestureRejected> {
        self.check(press)?;

        self.next_session += 1;
        let id = SessionId(self.next_session);
        let top_left = proxy.bounding_box().origin();
        proxy.set_z(self.config.drag_z);
        proxy.set_transition(None);

        debug!(session = %id, ?origin, "drag started");
        self.session = Some(DragSession {
            id,
            origin,
            start: press.screen,
            last: press.screen,
            grab: Point::new(press.screen.x - top_left.x, press.screen.y - top_left.y),
            candidate: Candidate::None,
            slots,
            shifted: None,
            proxy,
            frames: FrameGate::new(),
        });
        Ok(id)
    }

    /// Move the proxy under the pointer and return the screen delta since the
    /// last processed frame.
    pub fn advance(&mut self, screen: Point) -> (f64, f64) {
        let Some(session) = self.session.as_mut() else {
            return (0.0, 0.0);
        };
        let delta = (screen.x - session.last.x, screen.y - session.last.y);
        session.last = screen;
        if session.origin != Origin::Pan {
            let grab = session.grab;
            session
                .proxy
                .set_position(Point::new(screen.x - grab.x, screen.y - grab.y));
        }
        trace!(x = screen.x, y = screen.y, "drag frame");
        delta
    }

    /// Record the current drop target. Returns `true` when it changed, in
    /// which case the proxy's candidate affordance is toggled.
    pub fn update_candidate(&mut self, candidate: Candidate) -> bool {
        let Some(session) = self.session.as_mut() else {
            return false;
        };
        if session.candidate == candidate {
            return false;
        }
        debug!(session = %session.id, ?candidate, "candidate changed");
        session.candidate = candidate;
        session
            .proxy
            .set_candidate(!matches!(candidate, Candidate::None));
        true
    }
}
