//! Orbit layout and repulsion properties

use collage_layout::layout::orbit::{self, Circle};
use collage_layout::layout::{
    repel, FocusConfig, ItemId, LayoutError, OrbitConfig, Point, RepelConfig, Size,
};
use pretty_assertions::assert_eq;

const NODE: Point = Point { x: 400.0, y: 300.0 };

fn sizes(n: usize) -> Vec<Size> {
    vec![Size::new(80.0, 50.0); n]
}

#[test]
fn test_rings_fill_inside_out() {
    let config = OrbitConfig::default();
    let layout = orbit::layout(NODE, 30.0, &sizes(10), &config).unwrap();

    // Ring 0: radius 40 holds 3; ring 1: radius 110 holds 8
    assert_eq!(layout.rings, 2);
    let per_ring: Vec<usize> = (0..2)
        .map(|r| layout.placements.iter().filter(|p| p.ring == r).count())
        .collect();
    assert_eq!(per_ring, vec![3, 7]);

    for placement in &layout.placements {
        let radius = orbit::ring_radius(30.0, placement.ring, &config);
        assert!((placement.center.distance_to(NODE) - radius).abs() < 1e-9);
    }

    let first = layout.placements[0];
    assert!((first.center.x - 400.0).abs() < 1e-9);
    assert!((first.center.y - 260.0).abs() < 1e-9);
    assert_eq!(first.position, Point::new(first.center.x - 40.0, 235.0));
}

#[test]
fn test_layout_is_deterministic() {
    let config = OrbitConfig::default();
    let a = orbit::layout(NODE, 30.0, &sizes(25), &config).unwrap();
    let b = orbit::layout(NODE, 30.0, &sizes(25), &config).unwrap();
    assert_eq!(a, b);
}

#[test]
fn test_no_two_items_share_a_slot() {
    let layout = orbit::layout(NODE, 30.0, &sizes(40), &OrbitConfig::default()).unwrap();
    for (i, a) in layout.placements.iter().enumerate() {
        for b in &layout.placements[i + 1..] {
            assert!(a.center.distance_to(b.center) > 1.0);
        }
    }
}

#[test]
fn test_exhaustion_returns_partial_placements() {
    let config = OrbitConfig::default().with_max_rings(1);
    let err = orbit::layout(NODE, 30.0, &sizes(5), &config).unwrap_err();

    assert!(matches!(
        err,
        LayoutError::OrbitExhausted {
            ring: 1,
            remaining: 2,
            ..
        }
    ));
    assert_eq!(err.partial_placements().map(<[Point]>::len), Some(3));
}

#[test]
fn test_empty_orbit() {
    let layout = orbit::layout(NODE, 30.0, &[], &OrbitConfig::default()).unwrap();
    assert!(layout.placements.is_empty());
    assert_eq!(layout.rings, 0);
}

#[test]
fn test_repel_pushes_apart() {
    let config = RepelConfig::default();
    let neighbour = Point::new(0.0, 0.0);
    let provisional = Point::new(30.0, 0.0);

    let resolution = repel::resolve(provisional, &[(ItemId::Persisted(1), neighbour)], &config);

    // push = (90 - 30) * 0.6, counter-push = push * 0.3
    assert!((resolution.placed.x - 66.0).abs() < 1e-9);
    let (_, moved) = resolution.displaced[0];
    assert!((moved.x + 10.8).abs() < 1e-9);
    assert!(resolution.placed.distance_to(moved) > provisional.distance_to(neighbour));
}

#[test]
fn test_repel_improves_every_close_pair() {
    let config = RepelConfig::default();
    let neighbours = vec![
        (ItemId::Persisted(1), Point::new(0.0, 0.0)),
        (ItemId::Persisted(2), Point::new(60.0, 40.0)),
        (ItemId::Persisted(3), Point::new(500.0, 500.0)),
    ];
    let provisional = Point::new(20.0, 30.0);

    let resolution = repel::resolve(provisional, &neighbours, &config);
    assert_eq!(resolution.displaced.len(), 2);
    for (id, moved) in &resolution.displaced {
        let (_, before) = neighbours.iter().find(|(n, _)| n == id).unwrap();
        assert!(resolution.placed.distance_to(*moved) > provisional.distance_to(*before));
    }
}

#[test]
fn test_repel_reports_exact_overlap() {
    let point = Point::new(5.0, 5.0);
    let resolution = repel::resolve(point, &[(ItemId::Persisted(9), point)], &RepelConfig::default());
    assert_eq!(resolution.exact_overlaps, vec![ItemId::Persisted(9)]);
    assert!(resolution.is_noop(point));
}

#[test]
fn test_focus_keeps_hovered_item_home() {
    let layout = orbit::layout(NODE, 30.0, &sizes(6), &OrbitConfig::default()).unwrap();
    let circles: Vec<Circle> = layout
        .placements
        .iter()
        .map(|p| Circle {
            center: p.center,
            radius: 40.0,
        })
        .collect();

    let config = FocusConfig::default();
    let relaxed = orbit::relax_focus(NODE, 30.0, &circles, Some(2), &config);
    assert_eq!(relaxed[2], circles[2].center);
    assert_eq!(relaxed, orbit::relax_focus(NODE, 30.0, &circles, Some(2), &config));
    assert!(relaxed
        .iter()
        .zip(&circles)
        .enumerate()
        .any(|(i, (r, c))| i != 2 && *r != c.center));
}
