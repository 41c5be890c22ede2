//! Collision resolver for items sharing a node.
//!
//! A single pass over the neighbours of a freshly placed item. Each neighbour
//! closer than the repel distance pushes the placed item away by a share of
//! the overlap, and receives a smaller counter-push. Distances are measured
//! from the provisional position, so a displacement can introduce a new
//! overlap that this pass does not revisit.

use rand::Rng;
use tracing::debug;

use super::config::RepelConfig;
use super::types::{ItemId, Point};

/// Distances below this count as an exact overlap
const EXACT_OVERLAP: f64 = 1e-6;

/// Outcome of one resolution pass
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    /// Final center of the placed item
    pub placed: Point,
    /// New centers for neighbours that were pushed
    pub displaced: Vec<(ItemId, Point)>,
    /// Neighbours sitting exactly on the provisional position
    pub exact_overlaps: Vec<ItemId>,
}

impl Resolution {
    pub fn is_noop(&self, provisional: Point) -> bool {
        self.displaced.is_empty() && self.placed == provisional
    }
}

/// Resolve overlaps between `provisional` and the centers of its neighbours.
pub fn resolve(provisional: Point, neighbours: &[(ItemId, Point)], config: &RepelConfig) -> Resolution {
    let mut dx_total = 0.0;
    let mut dy_total = 0.0;
    let mut displaced = Vec::new();
    let mut exact_overlaps = Vec::new();

    for &(id, center) in neighbours {
        let dx = provisional.x - center.x;
        let dy = provisional.y - center.y;
        let distance = (dx * dx + dy * dy).sqrt();

        if distance < EXACT_OVERLAP {
            exact_overlaps.push(id);
            continue;
        }
        if distance >= config.distance {
            continue;
        }

        let push = (config.distance - distance) * config.strength;
        let (ux, uy) = (dx / distance, dy / distance);
        dx_total += ux * push;
        dy_total += uy * push;

        let counter = push * config.settled_share;
        displaced.push((id, center.translate(-ux * counter, -uy * counter)));
    }

    if !displaced.is_empty() {
        debug!(pushed = displaced.len(), "repelled neighbours");
    }

    Resolution {
        placed: provisional.translate(dx_total, dy_total),
        displaced,
        exact_overlaps,
    }
}

/// Small random offset used to break an exact overlap before resolving
pub fn jitter<R: Rng + ?Sized>(rng: &mut R, magnitude: f64) -> (f64, f64) {
    let magnitude = magnitude.abs().max(f64::EPSILON);
    let angle = rng.random_range(0.0..std::f64::consts::TAU);
    let length = rng.random_range(magnitude * 0.5..=magnitude);
    (angle.cos() * length, angle.sin() * length)
}

#[cfg(test)]
mod tests {
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::*;

    #[test]
    fn test_two_items_move_towards_separation() {
        let config = RepelConfig::default();
        let placed = Point::new(0.0, 0.0);
        let other = Point::new(30.0, 0.0);
        let result = resolve(placed, &[(ItemId::Persisted(1), other)], &config);

        let before = placed.distance_to(other);
        let after = result.placed.distance_to(result.displaced[0].1);
        assert!((config.distance - after).abs() < (config.distance - before).abs());
        // Placed item moves fully, settled one by the smaller share
        assert_eq!(result.placed, Point::new(-36.0, 0.0));
        assert!((result.displaced[0].1.x - 40.8).abs() < 1e-9);
    }

    #[test]
    fn test_far_neighbours_untouched() {
        let config = RepelConfig::default();
        let provisional = Point::new(0.0, 0.0);
        let result = resolve(provisional, &[(ItemId::Persisted(1), Point::new(200.0, 0.0))], &config);
        assert!(result.is_noop(provisional));
    }

    #[test]
    fn test_exact_overlap_is_skipped() {
        let config = RepelConfig::default();
        let provisional = Point::new(5.0, 5.0);
        let result = resolve(provisional, &[(ItemId::Persisted(3), provisional)], &config);
        assert_eq!(result.placed, provisional);
        assert_eq!(result.exact_overlaps, vec![ItemId::Persisted(3)]);
        assert!(result.placed.is_finite());
    }

    #[test]
    fn test_jitter_is_bounded() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..100 {
            let (dx, dy) = jitter(&mut rng, 2.0);
            let len = (dx * dx + dy * dy).sqrt();
            assert!(len >= 1.0 - 1e-9 && len <= 2.0 + 1e-9);
        }
    }
}
