//! Frame pacing helpers for drag sessions

use std::collections::BTreeMap;

use crate::layout::{ItemId, Point, Size};

/// Coalesces raw pointer events into at most one update per frame.
///
/// Only the newest value survives until the frame is processed.
#[derive(Debug, Clone)]
pub struct FrameGate<T> {
    pending: Option<T>,
    dropped: usize,
}

impl<T> Default for FrameGate<T> {
    fn default() -> Self {
        Self {
            pending: None,
            dropped: 0,
        }
    }
}

impl<T> FrameGate<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, value: T) {
        if self.pending.replace(value).is_some() {
            self.dropped += 1;
        }
    }

    /// Value to process this frame, if any arrived since the last one
    pub fn take(&mut self) -> Option<T> {
        self.pending.take()
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Events overwritten before their frame ran
    pub fn dropped(&self) -> usize {
        self.dropped
    }
}

/// Edge auto-scroll while dragging
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AutoScroll {
    pub margin: f64,
    pub max_speed: f64,
}

impl Default for AutoScroll {
    fn default() -> Self {
        Self {
            margin: 48.0,
            max_speed: 18.0,
        }
    }
}

impl AutoScroll {
    pub fn new(margin: f64, max_speed: f64) -> Self {
        Self { margin, max_speed }
    }

    /// Scroll velocity in px per frame for a pointer at `pointer` inside a
    /// viewport of `viewport` size. Speed grows linearly with how far the
    /// pointer has entered the margin and is capped at `max_speed`.
    pub fn velocity(&self, pointer: Point, viewport: Size) -> (f64, f64) {
        (
            self.axis(pointer.x, viewport.width),
            self.axis(pointer.y, viewport.height),
        )
    }

    fn axis(&self, position: f64, extent: f64) -> f64 {
        if self.margin <= 0.0 || !position.is_finite() || extent <= 2.0 * self.margin {
            return 0.0;
        }
        let speed = |depth: f64| (depth / self.margin).min(1.0) * self.max_speed;
        if position < self.margin {
            -speed(self.margin - position)
        } else if position > extent - self.margin {
            speed(position - (extent - self.margin))
        } else {
            0.0
        }
    }
}

/// Animated placement transitions that clear themselves once elapsed
#[derive(Debug, Clone, Default)]
pub struct Transitions {
    remaining: BTreeMap<ItemId, f64>,
}

impl Transitions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn start(&mut self, id: ItemId, duration_ms: f64) {
        if duration_ms > 0.0 {
            self.remaining.insert(id, duration_ms);
        }
    }

    /// Drop an item's transition so its next move is instant
    pub fn cancel(&mut self, id: ItemId) {
        self.remaining.remove(&id);
    }

    /// Remaining time of an item's transition
    pub fn active(&self, id: ItemId) -> Option<f64> {
        self.remaining.get(&id).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.remaining.is_empty()
    }

    /// Advance all transitions and return the ids whose transition ended
    pub fn tick(&mut self, elapsed_ms: f64) -> Vec<ItemId> {
        let mut finished = Vec::new();
        self.remaining.retain(|id, left| {
            *left -= elapsed_ms;
            if *left <= 0.0 {
                finished.push(*id);
                false
            } else {
                true
            }
        });
        finished
    }
}
