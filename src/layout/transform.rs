//! Pan/zoom state for a scrollable, zoomable canvas.
//!
//! The canvas container is drawn with `translate(pan) scale(s)` and a
//! transform origin of `0 0`, so a world point `w` lands on screen at
//! `pan + w * s`. Everything here is a pure function of that relation:
//!
//! - `screen_to_world` and `world_to_screen` convert between the two spaces
//! - `zoom_at` rescales while keeping the world point under the cursor fixed
//! - `animate_to` interpolates towards a target state and is advanced by `tick`
//!
//! A [`ViewCache`] keeps one [`ViewState`] per collection so switching away
//! and back restores the user's pan and zoom.

use std::collections::HashMap;

use serde::Serialize;
use tracing::{debug, trace};

use super::config::ViewportConfig;
use super::types::{BoundingBox, CollectionId, Point, Size};

/// Pan offset and scale of a canvas
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ViewState {
    pub pan_x: f64,
    pub pan_y: f64,
    pub scale: f64,
}

impl ViewState {
    pub fn new(pan_x: f64, pan_y: f64, scale: f64) -> Self {
        Self {
            pan_x,
            pan_y,
            scale,
        }
    }

    /// No pan, unit scale
    pub fn identity() -> Self {
        Self::new(0.0, 0.0, 1.0)
    }

    /// Interpolate linearly between two states
    fn lerp(&self, other: &ViewState, t: f64) -> ViewState {
        ViewState::new(
            self.pan_x + (other.pan_x - self.pan_x) * t,
            self.pan_y + (other.pan_y - self.pan_y) * t,
            self.scale + (other.scale - self.scale) * t,
        )
    }

    /// Whether two states are visually indistinguishable
    fn approx_eq(&self, other: &ViewState) -> bool {
        (self.pan_x - other.pan_x).abs() < 0.1
            && (self.pan_y - other.pan_y).abs() < 0.1
            && (self.scale - other.scale).abs() < 0.001
    }
}

impl Default for ViewState {
    fn default() -> Self {
        Self::identity()
    }
}

/// Direction of a single zoom notch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZoomDirection {
    In,
    Out,
}

impl ZoomDirection {
    /// Wheel convention: scrolling up (negative delta) zooms in
    pub fn from_wheel(delta: f64) -> Self {
        if delta < 0.0 {
            ZoomDirection::In
        } else {
            ZoomDirection::Out
        }
    }

    fn sign(self) -> f64 {
        match self {
            ZoomDirection::In => 1.0,
            ZoomDirection::Out => -1.0,
        }
    }
}

#[derive(Debug, Clone)]
struct Animation {
    from: ViewState,
    to: ViewState,
    elapsed: f64,
    duration: f64,
}

/// Pan and zoom of a single canvas
#[derive(Debug, Clone)]
pub struct Viewport {
    state: ViewState,
    config: ViewportConfig,
    animation: Option<Animation>,
    before_fit: Option<ViewState>,
}

impl Viewport {
    pub fn new(config: ViewportConfig) -> Self {
        Self {
            state: ViewState::identity(),
            config,
            animation: None,
            before_fit: None,
        }
    }

    pub fn state(&self) -> ViewState {
        self.state
    }

    pub fn scale(&self) -> f64 {
        self.state.scale
    }

    pub fn config(&self) -> &ViewportConfig {
        &self.config
    }

    pub fn is_animating(&self) -> bool {
        self.animation.is_some()
    }

    /// Convert a point relative to the viewport element into world space
    pub fn screen_to_world(&self, screen: Point) -> Point {
        Point::new(
            (screen.x - self.state.pan_x) / self.state.scale,
            (screen.y - self.state.pan_y) / self.state.scale,
        )
    }

    /// Convert a world point into viewport-relative screen space
    pub fn world_to_screen(&self, world: Point) -> Point {
        Point::new(
            world.x * self.state.scale + self.state.pan_x,
            world.y * self.state.scale + self.state.pan_y,
        )
    }

    /// Convert a screen-space delta into a world-space delta
    pub fn screen_delta_to_world(&self, dx: f64, dy: f64) -> (f64, f64) {
        (dx / self.state.scale, dy / self.state.scale)
    }

    /// Shift the pan by a screen-space delta. Free panning, no bounds.
    pub fn pan(&mut self, dx: f64, dy: f64) {
        self.cancel_animation();
        self.state.pan_x += dx;
        self.state.pan_y += dy;
        trace!(pan_x = self.state.pan_x, pan_y = self.state.pan_y, "pan");
    }

    /// Zoom one notch around a screen point.
    ///
    /// Returns `false` when the clamped scale did not change, in which case
    /// the pan is left untouched.
    pub fn zoom_at(&mut self, screen_x: f64, screen_y: f64, direction: ZoomDirection) -> bool {
        self.cancel_animation();

        let world = self.screen_to_world(Point::new(screen_x, screen_y));
        let factor = 1.0 + direction.sign() * self.config.zoom_step;
        let new_scale = self.config.clamp_scale(self.state.scale * factor);
        if new_scale == self.state.scale {
            return false;
        }

        self.state.pan_x = screen_x - world.x * new_scale;
        self.state.pan_y = screen_y - world.y * new_scale;
        self.state.scale = new_scale;
        trace!(scale = new_scale, "zoom");
        true
    }

    /// Jump straight to a state. The scale is clamped.
    pub fn set(&mut self, state: ViewState) {
        self.cancel_animation();
        self.state = ViewState {
            scale: self.config.clamp_scale(state.scale),
            ..state
        };
    }

    /// Start a smooth transition towards `target`, advanced by [`tick`](Self::tick).
    ///
    /// A zero duration, or a target indistinguishable from the current state,
    /// completes immediately.
    pub fn animate_to(&mut self, target: ViewState, duration_ms: f64) {
        let target = ViewState {
            scale: self.config.clamp_scale(target.scale),
            ..target
        };
        self.animation = None;

        if duration_ms <= 0.0 || self.state.approx_eq(&target) {
            self.state = target;
            return;
        }

        self.animation = Some(Animation {
            from: self.state,
            to: target,
            elapsed: 0.0,
            duration: duration_ms,
        });
    }

    /// Advance a running animation. Returns `true` while it is still running.
    pub fn tick(&mut self, elapsed_ms: f64) -> bool {
        let Some(animation) = self.animation.as_mut() else {
            return false;
        };

        animation.elapsed += elapsed_ms.max(0.0);
        let progress = (animation.elapsed / animation.duration).min(1.0);
        let eased = progress * (2.0 - progress);

        if progress >= 1.0 {
            self.state = animation.to;
            self.animation = None;
            false
        } else {
            self.state = animation.from.lerp(&animation.to, eased);
            true
        }
    }

    /// Animate so that `rect` (world space) fills the viewport minus `padding`.
    ///
    /// Rects with a non-positive size leave the view unchanged and return `false`.
    /// The state before the first fit is remembered for [`reset_zoom`](Self::reset_zoom).
    pub fn fit_rect(&mut self, rect: BoundingBox, viewport: Size, padding: f64) -> bool {
        if !(rect.width > 0.0 && rect.height > 0.0) {
            debug!(?rect, "ignoring fit to an empty rect");
            return false;
        }

        if self.before_fit.is_none() {
            self.before_fit = Some(self.state);
        }

        let scale_x = (viewport.width - 2.0 * padding) / rect.width;
        let scale_y = (viewport.height - 2.0 * padding) / rect.height;
        let scale = self.config.clamp_scale(scale_x.min(scale_y));
        let center = rect.center();
        let target = ViewState::new(
            viewport.width / 2.0 - center.x * scale,
            viewport.height / 2.0 - center.y * scale,
            scale,
        );

        debug!(scale, "fit view to rect");
        self.animate_to(target, self.config.animation_ms);
        true
    }

    /// Animate back to the state saved by the first fit, or to identity.
    pub fn reset_zoom(&mut self) {
        let target = self.before_fit.take().unwrap_or_else(ViewState::identity);
        debug!(?target, "reset zoom");
        self.animate_to(target, self.config.animation_ms);
    }

    /// CSS transform for the canvas container
    pub fn css_transform(&self) -> String {
        format!(
            "translate({}px, {}px) scale({})",
            self.state.pan_x, self.state.pan_y, self.state.scale
        )
    }

    fn cancel_animation(&mut self) {
        if self.animation.take().is_some() {
            trace!("view animation cancelled");
        }
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new(ViewportConfig::default())
    }
}

/// Remembered view per collection
#[derive(Debug, Clone, Default)]
pub struct ViewCache {
    states: HashMap<CollectionId, ViewState>,
}

impl ViewCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn save(&mut self, collection: CollectionId, state: ViewState) {
        self.states.insert(collection, state);
    }

    /// Cached state for a collection, or identity when none was saved
    pub fn restore(&self, collection: CollectionId) -> ViewState {
        self.states
            .get(&collection)
            .copied()
            .unwrap_or_else(ViewState::identity)
    }

    /// Save the outgoing collection's view and load the incoming one's
    pub fn switch(
        &mut self,
        viewport: &mut Viewport,
        from: Option<CollectionId>,
        to: CollectionId,
    ) {
        if let Some(from) = from {
            self.save(from, viewport.state());
        }
        viewport.set(self.restore(to));
        debug!(%to, "restored view");
    }
}
