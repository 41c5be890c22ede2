//! Orbit layout: concentric rings of items around a node.
//!
//! Rings are filled from the inside out. Ring `k` has radius
//! `node_radius + base_gap + k * ring_step` and holds
//! `floor(2πr / arc_spacing)` items (at least one), spaced evenly by angle
//! from the top of the node. Odd rings start half a step later so items
//! don't line up radially with the ring inside them.
//!
//! The layout is a pure function of its inputs, so re-running it after a
//! resize or reorder gives the same placements.
//!
//! [`relax_focus`] separately spreads a laid-out orbit when one item is
//! enlarged under the pointer.

use std::f64::consts::{FRAC_PI_2, TAU};

use serde::Serialize;
use tracing::warn;

use super::config::{FocusConfig, OrbitConfig};
use super::error::LayoutError;
use super::types::{Point, Size};

/// Where one item landed
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Placement {
    /// Top-left corner of the item
    pub position: Point,
    /// Center of the item, on the ring
    pub center: Point,
    pub ring: usize,
    pub angle: f64,
}

/// Placements for one node, in input order
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct OrbitLayout {
    pub placements: Vec<Placement>,
    pub rings: usize,
}

impl OrbitLayout {
    /// Index of the placement whose center is nearest to `point`
    pub fn nearest_index(&self, point: Point) -> Option<usize> {
        self.placements
            .iter()
            .enumerate()
            .min_by(|(_, a), (_, b)| {
                a.center
                    .distance_squared_to(point)
                    .total_cmp(&b.center.distance_squared_to(point))
            })
            .map(|(index, _)| index)
    }

    pub fn positions(&self) -> Vec<Point> {
        self.placements.iter().map(|p| p.position).collect()
    }
}

/// Radius of ring `ring`
pub fn ring_radius(node_radius: f64, ring: usize, config: &OrbitConfig) -> f64 {
    node_radius + config.base_gap + ring as f64 * config.ring_step
}

/// Number of items ring `ring` holds, or `None` if the ring geometry is unusable
pub fn ring_capacity(node_radius: f64, ring: usize, config: &OrbitConfig) -> Option<usize> {
    let radius = ring_radius(node_radius, ring, config);
    let slots = (TAU * radius / config.arc_spacing).floor();
    if !slots.is_finite() || radius <= 0.0 {
        return None;
    }
    Some((slots as usize).max(1))
}

/// Place `sizes.len()` items on rings around `center`.
///
/// Fails with [`LayoutError::OrbitExhausted`] when a ring's capacity cannot be
/// computed or the ring cap is reached with items still queued. The error
/// carries the placements made so far; the remaining items are meant to keep
/// their previous positions.
pub fn layout(
    center: Point,
    node_radius: f64,
    sizes: &[Size],
    config: &OrbitConfig,
) -> Result<OrbitLayout, LayoutError> {
    let mut placements = Vec::with_capacity(sizes.len());
    let mut queue = sizes.iter();
    let mut remaining = sizes.len();
    let mut ring = 0;

    while remaining > 0 {
        let capacity = match ring_capacity(node_radius, ring, config) {
            Some(c) if ring < config.max_rings => c,
            _ => {
                warn!(ring, remaining, "orbit layout exhausted");
                return Err(LayoutError::OrbitExhausted {
                    ring,
                    placed: placements.iter().map(|p: &Placement| p.position).collect(),
                    remaining,
                });
            }
        };

        let radius = ring_radius(node_radius, ring, config);
        let step = TAU / capacity as f64;
        let start = if ring % 2 == 1 {
            -FRAC_PI_2 + step / 2.0
        } else {
            -FRAC_PI_2
        };

        for (slot, size) in queue.by_ref().take(capacity).enumerate() {
            let angle = start + slot as f64 * step;
            let on_ring = Point::new(
                center.x + radius * angle.cos(),
                center.y + radius * angle.sin(),
            );
            placements.push(Placement {
                position: Point::new(on_ring.x - size.width / 2.0, on_ring.y - size.height / 2.0),
                center: on_ring,
                ring,
                angle,
            });
            remaining -= 1;
        }
        ring += 1;
    }

    Ok(OrbitLayout {
        placements,
        rings: ring,
    })
}

/// A placed item treated as a circle for focus relaxation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Circle {
    pub center: Point,
    pub radius: f64,
}

/// Spread an orbit around a focused (hovered) item.
///
/// The focused circle grows by `hover_scale` and stays at its home position.
/// Each iteration pushes overlapping pairs apart and pushes circles off the
/// central node, after which unfocused circles drift back towards home.
/// Returns the new centers in input order.
pub fn relax_focus(
    node_center: Point,
    node_radius: f64,
    circles: &[Circle],
    focused: Option<usize>,
    config: &FocusConfig,
) -> Vec<Point> {
    let mut targets: Vec<Point> = circles.iter().map(|c| c.center).collect();
    if circles.is_empty() || config.iterations == 0 {
        return targets;
    }

    let is_focused = |i: usize| focused == Some(i);
    let radius_of = |i: usize| {
        if is_focused(i) {
            circles[i].radius * config.hover_scale
        } else {
            circles[i].radius
        }
    };

    for _ in 0..config.iterations {
        for i in 0..circles.len() {
            for j in (i + 1)..circles.len() {
                let (a, b) = (targets[i], targets[j]);
                let distance = a.distance_to(b);
                let required = radius_of(i) + radius_of(j) + config.padding;
                if distance >= required || distance <= 0.01 {
                    continue;
                }

                let push_a = if is_focused(i) {
                    0.0
                } else if is_focused(j) {
                    1.0
                } else {
                    config.push_factor
                };
                let push_b = if is_focused(j) {
                    0.0
                } else if is_focused(i) {
                    1.0
                } else {
                    config.push_factor
                };
                let total = push_a + push_b;
                if total <= 0.0 {
                    continue;
                }

                let overlap = (required - distance) / total;
                let (ux, uy) = ((b.x - a.x) / distance, (b.y - a.y) / distance);
                targets[i] = a.translate(-ux * overlap * push_a, -uy * overlap * push_a);
                targets[j] = b.translate(ux * overlap * push_b, uy * overlap * push_b);
            }
        }

        for (i, target) in targets.iter_mut().enumerate() {
            if is_focused(i) {
                continue;
            }
            let distance = node_center.distance_to(*target);
            let required = node_radius + radius_of(i) + config.padding;
            if distance >= required || distance <= 0.01 {
                continue;
            }
            let overlap = required - distance;
            let (ux, uy) = (
                (target.x - node_center.x) / distance,
                (target.y - node_center.y) / distance,
            );
            *target = target.translate(ux * overlap, uy * overlap);
        }
    }

    for (i, target) in targets.iter_mut().enumerate() {
        if !is_focused(i) {
            let home = circles[i].center;
            *target = Point::new(
                target.x + (home.x - target.x) * config.nudge,
                target.y + (home.y - target.y) * config.nudge,
            );
        }
    }

    targets
}
