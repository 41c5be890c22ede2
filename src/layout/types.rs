//! Geometry, identities and the item/node records shared by every host

use std::fmt;

use serde::{Deserialize, Serialize};

/// World or screen coordinates, depending on context
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn origin() -> Self {
        Self::new(0.0, 0.0)
    }

    /// Euclidean distance to another point
    pub fn distance_to(&self, other: Point) -> f64 {
        self.distance_squared_to(other).sqrt()
    }

    /// Squared distance, for comparisons that don't need the root
    pub fn distance_squared_to(&self, other: Point) -> f64 {
        let dx = other.x - self.x;
        let dy = other.y - self.y;
        dx * dx + dy * dy
    }

    /// Return this point shifted by a delta
    pub fn translate(&self, dx: f64, dy: f64) -> Point {
        Point::new(self.x + dx, self.y + dy)
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

/// Width and height of an element
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

/// Axis-aligned rectangle, top-left anchored
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl BoundingBox {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn zero() -> Self {
        Self::default()
    }

    /// Box with its top-left corner at `origin`
    pub fn at(origin: Point, size: Size) -> Self {
        Self::new(origin.x, origin.y, size.width, size.height)
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    /// Top-left corner
    pub fn origin(&self) -> Point {
        Point::new(self.x, self.y)
    }

    pub fn center(&self) -> Point {
        Point::new(self.x + 0.5 * self.width, self.y + 0.5 * self.height)
    }

    /// Edges count as inside
    pub fn contains(&self, p: Point) -> bool {
        (self.x..=self.right()).contains(&p.x) && (self.y..=self.bottom()).contains(&p.y)
    }

    /// Overlap with positive area; touching edges don't count
    pub fn intersects(&self, other: &BoundingBox) -> bool {
        let overlap_x = self.right().min(other.right()) - self.x.max(other.x);
        let overlap_y = self.bottom().min(other.bottom()) - self.y.max(other.y);
        overlap_x > 0.0 && overlap_y > 0.0
    }

    /// Smallest box covering both
    pub fn union(&self, other: &BoundingBox) -> BoundingBox {
        let (left, top) = (self.x.min(other.x), self.y.min(other.y));
        BoundingBox::new(
            left,
            top,
            self.right().max(other.right()) - left,
            self.bottom().max(other.bottom()) - top,
        )
    }
}

impl Default for BoundingBox {
    fn default() -> Self {
        Self::new(0.0, 0.0, 0.0, 0.0)
    }
}

/// Identity of an item.
///
/// Items created locally carry a transient id until the server confirms them;
/// the transient id is discarded once a persisted id is assigned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemId {
    Persisted(u64),
    Transient(u64),
}

impl ItemId {
    pub fn is_persisted(&self) -> bool {
        matches!(self, ItemId::Persisted(_))
    }

    /// Server-assigned id, if any
    pub fn server_id(&self) -> Option<u64> {
        match self {
            ItemId::Persisted(id) => Some(*id),
            ItemId::Transient(_) => None,
        }
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ItemId::Persisted(id) => write!(f, "{}", id),
            ItemId::Transient(id) => write!(f, "tmp-{}", id),
        }
    }
}

/// Identity of a snap node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub u64);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node-{}", self.0)
    }
}

/// A logical collection of items: one group's canvas, or the dashboard
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollectionId {
    Group(u64),
    Dashboard,
}

impl fmt::Display for CollectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CollectionId::Group(id) => write!(f, "group-{}", id),
            CollectionId::Dashboard => write!(f, "dashboard"),
        }
    }
}

/// What an item represents
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ItemKind {
    /// An event card on a group canvas
    Event,
    /// An analytics panel on the dashboard
    Panel { analysis_type: String },
}

/// Explicit transform carried alongside an item.
///
/// Emitted to CSS with [`TransformRecord::to_css`]; never parsed back.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct TransformRecord {
    pub translate_x: f64,
    pub translate_y: f64,
    pub rotate_deg: f64,
    pub translate_z: f64,
}

impl TransformRecord {
    pub fn new(translate_x: f64, translate_y: f64, rotate_deg: f64, translate_z: f64) -> Self {
        Self {
            translate_x,
            translate_y,
            rotate_deg,
            translate_z,
        }
    }

    /// Same rotation and depth, different translation
    pub fn with_translation(&self, translate_x: f64, translate_y: f64) -> Self {
        Self {
            translate_x,
            translate_y,
            ..*self
        }
    }

    pub fn to_css(&self) -> String {
        format!(
            "translateY({:.2}px) translateX({:.2}px) rotate({}deg) translateZ({}px)",
            self.translate_y, self.translate_x, self.rotate_deg, self.translate_z
        )
    }
}

/// A draggable visual entity: an event card or an analytics panel
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Item {
    pub id: ItemId,
    #[serde(flatten)]
    pub kind: ItemKind,
    pub title: String,
    /// Top-left corner in world coordinates
    pub position: Point,
    pub size: Size,
    pub snapped_to: Option<NodeId>,
    /// Set while a local change has not been confirmed by the server
    pub unsaved: bool,
    pub transform: TransformRecord,
    pub configuration: serde_json::Value,
}

impl Item {
    pub fn new(id: ItemId, kind: ItemKind, title: impl Into<String>, size: Size) -> Self {
        Self {
            id,
            kind,
            title: title.into(),
            position: Point::origin(),
            size,
            snapped_to: None,
            unsaved: !id.is_persisted(),
            transform: TransformRecord::default(),
            configuration: serde_json::Value::Null,
        }
    }

    pub fn with_position(mut self, position: Point) -> Self {
        self.position = position;
        self
    }

    pub fn with_snap(mut self, node: NodeId) -> Self {
        self.snapped_to = Some(node);
        self
    }

    pub fn bounds(&self) -> BoundingBox {
        BoundingBox::at(self.position, self.size)
    }

    pub fn center(&self) -> Point {
        self.bounds().center()
    }

    /// Move so that the item's center lands on `center`
    pub fn center_on(&mut self, center: Point) {
        self.position = Point::new(
            center.x - self.size.width / 2.0,
            center.y - self.size.height / 2.0,
        );
    }
}

/// An anchor point items can snap to
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Node {
    pub id: NodeId,
    pub label: String,
    /// Center in world coordinates
    pub position: Point,
    pub radius: f64,
}

impl Node {
    pub fn new(id: NodeId, label: impl Into<String>, position: Point, radius: f64) -> Self {
        Self {
            id,
            label: label.into(),
            position,
            radius,
        }
    }
}
