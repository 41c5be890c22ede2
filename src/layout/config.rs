//! Tunables for each layout concern, all with working defaults

/// Pan and zoom limits for a [`Viewport`](super::transform::Viewport)
#[derive(Debug, Clone, PartialEq)]
pub struct ViewportConfig {
    /// Smallest allowed scale factor
    pub min_scale: f64,

    /// Largest allowed scale factor
    pub max_scale: f64,

    /// Multiplicative step applied per zoom notch (`1 ± zoom_step`)
    pub zoom_step: f64,

    /// Duration of smooth view transitions, in milliseconds
    pub animation_ms: f64,
}

impl Default for ViewportConfig {
    fn default() -> Self {
        Self {
            min_scale: 0.3,
            max_scale: 2.5,
            zoom_step: 0.1,
            animation_ms: 300.0,
        }
    }
}

impl ViewportConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the allowed scale range
    pub fn with_scale_range(mut self, min: f64, max: f64) -> Self {
        self.min_scale = min;
        self.max_scale = max;
        self
    }

    pub fn with_zoom_step(mut self, step: f64) -> Self {
        self.zoom_step = step;
        self
    }

    pub fn with_animation_ms(mut self, ms: f64) -> Self {
        self.animation_ms = ms;
        self
    }

    /// Clamp a scale into the configured range
    pub fn clamp_scale(&self, scale: f64) -> f64 {
        scale.clamp(self.min_scale, self.max_scale)
    }
}

/// Responsive grid used by the dashboard
#[derive(Debug, Clone, PartialEq)]
pub struct GridConfig {
    /// Column count above the breakpoint
    pub columns: usize,

    /// Container widths below this use a single column
    pub single_column_below: f64,

    /// Gap between cells, both axes
    pub gap: f64,

    /// Fixed cell height; `None` derives it from the cell width
    pub cell_height: Option<f64>,

    /// Cell height as a fraction of cell width when `cell_height` is unset
    pub aspect: f64,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            columns: 2,
            single_column_below: 600.0,
            gap: 25.0,
            cell_height: None,
            aspect: 0.85,
        }
    }
}

impl GridConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_columns(mut self, columns: usize) -> Self {
        self.columns = columns;
        self
    }

    pub fn with_breakpoint(mut self, width: f64) -> Self {
        self.single_column_below = width;
        self
    }

    pub fn with_gap(mut self, gap: f64) -> Self {
        self.gap = gap;
        self
    }

    pub fn with_cell_height(mut self, height: f64) -> Self {
        self.cell_height = Some(height);
        self
    }

    /// Column count for a container width; never less than one
    pub fn columns_for(&self, width: f64) -> usize {
        if width < self.single_column_below {
            1
        } else {
            self.columns.max(1)
        }
    }
}

/// Ring-packing parameters for the orbit layout
#[derive(Debug, Clone, PartialEq)]
pub struct OrbitConfig {
    /// Gap between the node edge and the first ring
    pub base_gap: f64,

    /// Radial distance between consecutive rings
    pub ring_step: f64,

    /// Target arc length between neighbouring items on a ring
    pub arc_spacing: f64,

    /// Hard cap on rings per layout pass
    pub max_rings: usize,
}

impl Default for OrbitConfig {
    fn default() -> Self {
        Self {
            base_gap: 10.0,
            ring_step: 70.0,
            arc_spacing: 80.0,
            max_rings: 64,
        }
    }
}

impl OrbitConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_base_gap(mut self, gap: f64) -> Self {
        self.base_gap = gap;
        self
    }

    pub fn with_ring_step(mut self, step: f64) -> Self {
        self.ring_step = step;
        self
    }

    pub fn with_arc_spacing(mut self, spacing: f64) -> Self {
        self.arc_spacing = spacing;
        self
    }

    pub fn with_max_rings(mut self, rings: usize) -> Self {
        self.max_rings = rings;
        self
    }
}

/// Snap and repulsion parameters for free placement
#[derive(Debug, Clone, PartialEq)]
pub struct RepelConfig {
    /// Items released farther than this from every node do not snap
    pub snap_radius: f64,

    /// Minimum separation between items sharing a node
    pub distance: f64,

    /// Fraction of the overlap applied to the placed item
    pub strength: f64,

    /// Share of the placed item's displacement applied to settled items
    pub settled_share: f64,

    /// Duration of the settle transition, in milliseconds
    pub transition_ms: f64,
}

impl Default for RepelConfig {
    fn default() -> Self {
        Self {
            snap_radius: 120.0,
            distance: 90.0,
            strength: 0.6,
            settled_share: 0.3,
            transition_ms: 250.0,
        }
    }
}

impl RepelConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_snap_radius(mut self, radius: f64) -> Self {
        self.snap_radius = radius;
        self
    }

    pub fn with_distance(mut self, distance: f64) -> Self {
        self.distance = distance;
        self
    }

    pub fn with_strength(mut self, strength: f64) -> Self {
        self.strength = strength;
        self
    }

    pub fn with_settled_share(mut self, share: f64) -> Self {
        self.settled_share = share;
        self
    }
}

/// Hover relaxation of an orbit
#[derive(Debug, Clone, PartialEq)]
pub struct FocusConfig {
    /// Radius multiplier for the focused item
    pub hover_scale: f64,

    /// Extra clearance kept between circles
    pub padding: f64,

    pub iterations: usize,

    /// Fraction of the way back home per iteration
    pub nudge: f64,

    /// Push applied to the non-focused member of a pair
    pub push_factor: f64,
}

impl Default for FocusConfig {
    fn default() -> Self {
        Self {
            hover_scale: 3.0,
            padding: 4.0,
            iterations: 5,
            nudge: 0.02,
            push_factor: 0.5,
        }
    }
}

impl FocusConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_hover_scale(mut self, scale: f64) -> Self {
        self.hover_scale = scale;
        self
    }

    pub fn with_iterations(mut self, iterations: usize) -> Self {
        self.iterations = iterations;
        self
    }
}

/// Scroll-driven parallax
#[derive(Debug, Clone, PartialEq)]
pub struct ParallaxConfig {
    /// Parallax is off for viewport widths at or below this
    pub min_width: f64,

    /// Largest horizontal sway, in pixels, either side
    pub max_sway: f64,
}

impl Default for ParallaxConfig {
    fn default() -> Self {
        Self {
            min_width: 768.0,
            max_sway: 10.0,
        }
    }
}

impl ParallaxConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_min_width(mut self, width: f64) -> Self {
        self.min_width = width;
        self
    }

    pub fn with_max_sway(mut self, sway: f64) -> Self {
        self.max_sway = sway;
        self
    }
}
