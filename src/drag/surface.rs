//! Headless element interface
//!
//! The drag controller only needs a handful of things from the element it
//! moves around. Hosts implement [`DragSurface`] over whatever they render
//! into; [`Ghost`] is the plain in-memory version used by the CLI and tests.

use serde::Serialize;

use crate::layout::{BoundingBox, Point};

pub trait DragSurface {
    /// Current screen-space box of the element
    fn bounding_box(&self) -> BoundingBox;

    /// Move the element's top-left corner to a screen position
    fn set_position(&mut self, screen: Point);

    fn set_z(&mut self, z: i32);

    /// Animate the next moves over `ms`, or move instantly with `None`
    fn set_transition(&mut self, _ms: Option<f64>) {}

    /// Toggle the "valid drop target" affordance
    fn set_candidate(&mut self, _highlighted: bool) {}
}

/// Proxy element that records what was done to it
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Ghost {
    pub bounds: BoundingBox,
    pub z: i32,
    pub transition: Option<f64>,
    pub highlighted: bool,
    /// Number of position writes, at most one per processed frame
    pub moves: usize,
    /// Preview content loaded for palette drags
    pub preview: Option<serde_json::Value>,
}

impl Ghost {
    pub fn new(bounds: BoundingBox) -> Self {
        Self {
            bounds,
            z: 0,
            transition: None,
            highlighted: false,
            moves: 0,
            preview: None,
        }
    }
}

impl DragSurface for Ghost {
    fn bounding_box(&self) -> BoundingBox {
        self.bounds
    }

    fn set_position(&mut self, screen: Point) {
        self.bounds.x = screen.x;
        self.bounds.y = screen.y;
        self.moves += 1;
    }

    fn set_z(&mut self, z: i32) {
        self.z = z;
    }

    fn set_transition(&mut self, ms: Option<f64>) {
        self.transition = ms;
    }

    fn set_candidate(&mut self, highlighted: bool) {
        self.highlighted = highlighted;
    }
}
