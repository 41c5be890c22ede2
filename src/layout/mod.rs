//! Layout engine: geometry, spatial indexes and placement algorithms
//!
//! Nothing in this module touches the store or the network. Every function
//! is a pure computation over world-space geometry, so the drag hosts can
//! call them freely every frame.

pub mod config;
pub mod error;
pub mod grid;
pub mod nodes;
pub mod orbit;
pub mod parallax;
pub mod repel;
pub mod transform;
pub mod types;

pub use config::{
    FocusConfig, GridConfig, OrbitConfig, ParallaxConfig, RepelConfig, ViewportConfig,
};
pub use error::LayoutError;
pub use grid::GridLayout;
pub use nodes::{NodeHit, NodeIndex};
pub use orbit::{OrbitLayout, Placement};
pub use transform::{ViewCache, ViewState, Viewport, ZoomDirection};
pub use types::*;
