//! Grid-slot spatial index for the dashboard.
//!
//! Slots are laid out row-major from the container's top-left. The layout
//! always holds enough rows for every visible item plus one insertion slot
//! and one spare row, so "after the last item" is always a valid target.

use tracing::warn;

use super::config::GridConfig;
use super::types::{BoundingBox, Point, Size};

/// Slot rectangles for one container width and item count
#[derive(Debug, Clone, PartialEq)]
pub struct GridLayout {
    slots: Vec<BoundingBox>,
    columns: usize,
    item_count: usize,
}

impl GridLayout {
    /// Lay out slots for `item_count` items in a container `width` wide.
    ///
    /// Degenerate widths produce a single column of zero-width slots rather
    /// than failing.
    pub fn compute(width: f64, item_count: usize, config: &GridConfig) -> Self {
        let width = if width.is_finite() { width } else { 0.0 };
        let columns = config.columns_for(width);
        if width <= 0.0 {
            warn!(width, "grid container has no width");
        }

        let gap = config.gap.max(0.0);
        let cell_width = ((width - (columns as f64 - 1.0) * gap) / columns as f64).max(0.0);
        let cell_height = match config.cell_height {
            Some(h) if h > 0.0 => h,
            _ => cell_width * config.aspect,
        };

        let rows = ((item_count + 1).div_ceil(columns) + 1).max(1);
        let mut slots = Vec::with_capacity(rows * columns);
        for row in 0..rows {
            for col in 0..columns {
                slots.push(BoundingBox::new(
                    col as f64 * (cell_width + gap),
                    row as f64 * (cell_height + gap),
                    cell_width,
                    cell_height,
                ));
            }
        }

        Self {
            slots,
            columns,
            item_count,
        }
    }

    pub fn columns(&self) -> usize {
        self.columns
    }

    pub fn item_count(&self) -> usize {
        self.item_count
    }

    pub fn slots(&self) -> &[BoundingBox] {
        &self.slots
    }

    pub fn slot(&self, index: usize) -> Option<&BoundingBox> {
        self.slots.get(index)
    }

    /// Size of one cell
    pub fn cell_size(&self) -> Size {
        self.slots
            .first()
            .map(|s| Size::new(s.width, s.height))
            .unwrap_or_default()
    }

    /// Index of the slot whose center is nearest to `point`, clamped to
    /// `[0, item_count]`. Ties go to the lower index.
    pub fn nearest_slot(&self, point: Point) -> usize {
        let mut best = 0;
        let mut best_dist = f64::INFINITY;
        for (index, slot) in self.slots.iter().enumerate() {
            let dist = slot.center().distance_squared_to(point);
            if dist < best_dist {
                best_dist = dist;
                best = index;
            }
        }
        best.min(self.item_count)
    }

    /// Total extent of the slot area
    pub fn bounds(&self) -> BoundingBox {
        self.slots
            .iter()
            .copied()
            .reduce(|acc, slot| acc.union(&slot))
            .unwrap_or_default()
    }
}

/// Move the element at `from` so it ends up at `to`, where `to` counts
/// positions among the other elements.
pub fn move_to_index<T>(order: &mut Vec<T>, from: usize, to: usize) {
    if from >= order.len() {
        return;
    }
    let element = order.remove(from);
    let to = to.min(order.len());
    order.insert(to, element);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_two_column_layout() {
        let layout = GridLayout::compute(625.0, 3, &GridConfig::default());
        assert_eq!(layout.columns(), 2);
        // (625 - 25) / 2 = 300 wide, 255 tall
        assert_eq!(layout.cell_size(), Size::new(300.0, 255.0));
        // ceil(4 / 2) + 1 = 3 rows
        assert_eq!(layout.slots().len(), 6);
        assert_eq!(layout.slot(3), Some(&BoundingBox::new(325.0, 280.0, 300.0, 255.0)));
    }

    #[test]
    fn test_narrow_container_uses_one_column() {
        let layout = GridLayout::compute(400.0, 2, &GridConfig::default());
        assert_eq!(layout.columns(), 1);
        assert_eq!(layout.cell_size().width, 400.0);
    }

    #[test]
    fn test_nearest_slot_clamps_to_item_count() {
        let layout = GridLayout::compute(625.0, 3, &GridConfig::default());
        let far_bottom_right = Point::new(10_000.0, 10_000.0);
        assert_eq!(layout.nearest_slot(far_bottom_right), 3);
        assert_eq!(layout.nearest_slot(Point::new(-50.0, -50.0)), 0);
    }

    #[test]
    fn test_nearest_slot_is_deterministic() {
        let layout = GridLayout::compute(625.0, 5, &GridConfig::default());
        let p = Point::new(470.0, 390.0);
        assert_eq!(layout.nearest_slot(p), layout.nearest_slot(p));
        assert_eq!(layout.nearest_slot(p), 3);
    }

    #[test]
    fn test_zero_width_degrades() {
        let layout = GridLayout::compute(0.0, 0, &GridConfig::default());
        assert_eq!(layout.columns(), 1);
        assert!(!layout.slots().is_empty());
        assert_eq!(layout.nearest_slot(Point::new(5.0, 5.0)), 0);
    }

    #[test]
    fn test_fixed_cell_height() {
        let config = GridConfig::default().with_cell_height(100.0);
        let layout = GridLayout::compute(625.0, 0, &config);
        assert_eq!(layout.cell_size().height, 100.0);
    }

    #[test]
    fn test_move_to_index() {
        let mut order = vec!['B', 'C', 'A', 'D', 'E'];
        move_to_index(&mut order, 2, 0);
        assert_eq!(order, vec!['A', 'B', 'C', 'D', 'E']);

        move_to_index(&mut order, 0, 10);
        assert_eq!(order, vec!['B', 'C', 'D', 'E', 'A']);
    }
}
