//! Scroll-driven parallax for event cards.
//!
//! Each card's depth (`translate_z`) fixes two factors when parallax is set
//! up. Scrolling then rewrites the card's translation from those factors,
//! leaving its rotation and depth as they were.

use rand::Rng;

use super::config::ParallaxConfig;
use super::types::TransformRecord;

/// Per-card parallax parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParallaxLayer {
    pub base: TransformRecord,
    pub factor_x: f64,
    pub factor_y: f64,
    /// Horizontal sway amplitude; signed
    pub sway: f64,
}

impl ParallaxLayer {
    pub fn new(base: TransformRecord, sway: f64) -> Self {
        let z = base.translate_z;
        Self {
            base,
            factor_y: 1.0 + z / 200.0,
            factor_x: (z / 50.0).sin(),
            sway,
        }
    }

    /// Transform at a given scroll offset
    pub fn at_scroll(&self, scroll: f64) -> TransformRecord {
        let translate_y = -scroll * (1.0 - self.factor_y) * 0.1;
        let translate_x = (scroll * 0.01 + self.factor_x).sin() * self.sway;
        self.base.with_translation(translate_x, translate_y)
    }
}

/// Parallax state for a set of cards
#[derive(Debug, Clone, Default)]
pub struct Parallax {
    layers: Vec<ParallaxLayer>,
}

impl Parallax {
    /// Set up parallax for `bases`, or `None` when the viewport is too narrow.
    pub fn setup<R: Rng + ?Sized>(
        bases: &[TransformRecord],
        viewport_width: f64,
        config: &ParallaxConfig,
        rng: &mut R,
    ) -> Option<Self> {
        if !enabled(viewport_width, config) {
            return None;
        }
        let max = config.max_sway.abs();
        let layers = bases
            .iter()
            .map(|base| {
                let sway = if max > 0.0 {
                    rng.random_range(-max..=max)
                } else {
                    0.0
                };
                ParallaxLayer::new(*base, sway)
            })
            .collect();
        Some(Self { layers })
    }

    pub fn layers(&self) -> &[ParallaxLayer] {
        &self.layers
    }

    /// Transforms for every card at a scroll offset
    pub fn at_scroll(&self, scroll: f64) -> Vec<TransformRecord> {
        self.layers.iter().map(|l| l.at_scroll(scroll)).collect()
    }

    /// Original transforms, for tearing parallax down
    pub fn restore(&self) -> Vec<TransformRecord> {
        self.layers.iter().map(|l| l.base).collect()
    }
}

/// Parallax runs only on viewports wider than the configured minimum
pub fn enabled(viewport_width: f64, config: &ParallaxConfig) -> bool {
    viewport_width > config.min_width
}
