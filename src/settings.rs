//! Settings file support
//!
//! Every tunable of the layout engine, both drag hosts, the reconciler and the
//! SVG snapshot can be overridden from one TOML file. Sections are optional and
//! so is every key inside them; anything not named keeps its built-in default.
//!
//! ```toml
//! [repel]
//! strength = 0.5
//!
//! [canvas]
//! snap_mode = "free"
//! delete_zone = []   # no delete zone
//! ```

use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

use crate::drag::{CanvasConfig, DashboardConfig, DragConfig, SnapMode};
use crate::layout::{
    BoundingBox, FocusConfig, GridConfig, LayoutError, OrbitConfig, ParallaxConfig, RepelConfig,
    Size, ViewportConfig,
};
use crate::renderer::SvgConfig;
use crate::sync::Reconciler;

/// Errors that can occur when loading or validating settings
#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("Failed to read settings file: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Failed to parse settings TOML: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("Invalid settings: {0}")]
    Invalid(#[from] LayoutError),
}

/// Reconciler options
#[derive(Debug, Clone, PartialEq)]
pub struct SyncSettings {
    /// Anti-forgery token attached to mutating calls
    pub csrf: Option<String>,
    /// Size given to events rebuilt from a group listing
    pub event_size: Size,
    pub node_radius: f64,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            csrf: None,
            event_size: Size::new(160.0, 100.0),
            node_radius: 30.0,
        }
    }
}

/// Every tunable, grouped by the component that reads it
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub canvas: CanvasConfig,
    pub dashboard: DashboardConfig,
    pub sync: SyncSettings,
    pub svg: SvgConfig,
}

/// Built-in settings. Also serves as the reference for the file format.
const DEFAULT_SETTINGS: &str = r##"
[viewport]
min_scale = 0.3
max_scale = 2.5
zoom_step = 0.1
animation_ms = 300.0

[grid]
columns = 2
single_column_below = 600.0
gap = 25.0
aspect = 0.85
# cell_height = 240.0

[orbit]
base_gap = 10.0
ring_step = 70.0
arc_spacing = 80.0
max_rings = 64

[repel]
snap_radius = 120.0
distance = 90.0
strength = 0.6
settled_share = 0.3
transition_ms = 250.0

[focus]
hover_scale = 3.0
padding = 4.0
iterations = 5
nudge = 0.02
push_factor = 0.5

[parallax]
min_width = 768.0
max_sway = 10.0

[drag]
autoscroll_margin = 48.0
autoscroll_max_speed = 18.0
drag_z = 1000

[canvas]
snap_mode = "orbit"
width = 1280.0
height = 800.0
delete_zone = [1168.0, 688.0, 96.0, 96.0]
seed = 0

[dashboard]
container = [240.0, 80.0, 1000.0, 700.0]
delete_zone = [24.0, 640.0, 192.0, 120.0]
template_grab = 0.15

[sync]
event_width = 160.0
event_height = 100.0
node_radius = 30.0

[svg]
padding = 60.0
indent = 2
class_prefix = "cl-"

[svg.palette]
background = "#f5f5f5"
node = "#2196f3"
node_label = "#ffffff"
item = "#ffffff"
item_border = "#666666"
unsaved = "#ff9800"
"##;

/// TOML structure for deserializing settings
#[derive(Deserialize, Default)]
#[serde(default, deny_unknown_fields)]
struct TomlSettings {
    viewport: TomlViewport,
    grid: TomlGrid,
    orbit: TomlOrbit,
    repel: TomlRepel,
    focus: TomlFocus,
    parallax: TomlParallax,
    drag: TomlDrag,
    canvas: TomlCanvas,
    dashboard: TomlDashboard,
    sync: TomlSync,
    svg: TomlSvg,
}

#[derive(Deserialize, Default)]
#[serde(default, deny_unknown_fields)]
struct TomlViewport {
    min_scale: Option<f64>,
    max_scale: Option<f64>,
    zoom_step: Option<f64>,
    animation_ms: Option<f64>,
}

#[derive(Deserialize, Default)]
#[serde(default, deny_unknown_fields)]
struct TomlGrid {
    columns: Option<usize>,
    single_column_below: Option<f64>,
    gap: Option<f64>,
    cell_height: Option<f64>,
    aspect: Option<f64>,
}

#[derive(Deserialize, Default)]
#[serde(default, deny_unknown_fields)]
struct TomlOrbit {
    base_gap: Option<f64>,
    ring_step: Option<f64>,
    arc_spacing: Option<f64>,
    max_rings: Option<usize>,
}

#[derive(Deserialize, Default)]
#[serde(default, deny_unknown_fields)]
struct TomlRepel {
    snap_radius: Option<f64>,
    distance: Option<f64>,
    strength: Option<f64>,
    settled_share: Option<f64>,
    transition_ms: Option<f64>,
}

#[derive(Deserialize, Default)]
#[serde(default, deny_unknown_fields)]
struct TomlFocus {
    hover_scale: Option<f64>,
    padding: Option<f64>,
    iterations: Option<usize>,
    nudge: Option<f64>,
    push_factor: Option<f64>,
}

#[derive(Deserialize, Default)]
#[serde(default, deny_unknown_fields)]
struct TomlParallax {
    min_width: Option<f64>,
    max_sway: Option<f64>,
}

#[derive(Deserialize, Default)]
#[serde(default, deny_unknown_fields)]
struct TomlDrag {
    autoscroll_margin: Option<f64>,
    autoscroll_max_speed: Option<f64>,
    drag_z: Option<i32>,
}

#[derive(Deserialize, Clone, Copy)]
#[serde(rename_all = "lowercase")]
enum TomlSnapMode {
    Orbit,
    Free,
}

#[derive(Deserialize, Default)]
#[serde(default, deny_unknown_fields)]
struct TomlCanvas {
    snap_mode: Option<TomlSnapMode>,
    width: Option<f64>,
    height: Option<f64>,
    /// `[x, y, width, height]`, or `[]` for none
    delete_zone: Option<Vec<f64>>,
    seed: Option<u64>,
}

#[derive(Deserialize, Default)]
#[serde(default, deny_unknown_fields)]
struct TomlDashboard {
    container: Option<Vec<f64>>,
    delete_zone: Option<Vec<f64>>,
    template_grab: Option<f64>,
}

#[derive(Deserialize, Default)]
#[serde(default, deny_unknown_fields)]
struct TomlSync {
    csrf: Option<String>,
    event_width: Option<f64>,
    event_height: Option<f64>,
    node_radius: Option<f64>,
}

#[derive(Deserialize, Default)]
#[serde(default, deny_unknown_fields)]
struct TomlSvg {
    padding: Option<f64>,
    xml_declaration: Option<bool>,
    /// 0 writes compact output
    indent: Option<usize>,
    /// Empty string disables the prefix
    class_prefix: Option<String>,
    palette: TomlPalette,
}

#[derive(Deserialize, Default)]
#[serde(default, deny_unknown_fields)]
struct TomlPalette {
    background: Option<String>,
    node: Option<String>,
    node_label: Option<String>,
    item: Option<String>,
    item_border: Option<String>,
    unsaved: Option<String>,
}

fn set<T>(target: &mut T, value: Option<T>) {
    if let Some(value) = value {
        *target = value;
    }
}

fn rect(field: &str, values: &[f64]) -> Result<BoundingBox, LayoutError> {
    match values {
        [x, y, width, height] if *width > 0.0 && *height > 0.0 => {
            Ok(BoundingBox::new(*x, *y, *width, *height))
        }
        [_, _, _, _] => Err(LayoutError::invalid_config(
            field,
            "width and height must be positive",
        )),
        _ => Err(LayoutError::invalid_config(
            field,
            "expected [x, y, width, height]",
        )),
    }
}

fn zone(field: &str, values: &[f64]) -> Result<Option<BoundingBox>, LayoutError> {
    if values.is_empty() {
        Ok(None)
    } else {
        rect(field, values).map(Some)
    }
}

impl Settings {
    /// Load settings from a TOML file
    pub fn from_file(path: &Path) -> Result<Self, SettingsError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_str(&content)
    }

    /// Load settings from a TOML string, on top of the built-in defaults
    pub fn from_str(content: &str) -> Result<Self, SettingsError> {
        let parsed: TomlSettings = toml::from_str(content)?;
        let settings = Self::builtin().merge(parsed)?;
        settings.validate()?;
        Ok(settings)
    }

    fn builtin() -> Self {
        Self {
            canvas: CanvasConfig::default(),
            dashboard: DashboardConfig::default(),
            sync: SyncSettings::default(),
            svg: SvgConfig::default(),
        }
    }

    fn merge(mut self, toml: TomlSettings) -> Result<Self, LayoutError> {
        let viewport = &mut self.canvas.viewport;
        set(&mut viewport.min_scale, toml.viewport.min_scale);
        set(&mut viewport.max_scale, toml.viewport.max_scale);
        set(&mut viewport.zoom_step, toml.viewport.zoom_step);
        set(&mut viewport.animation_ms, toml.viewport.animation_ms);

        let grid = &mut self.dashboard.grid;
        set(&mut grid.columns, toml.grid.columns);
        set(&mut grid.single_column_below, toml.grid.single_column_below);
        set(&mut grid.gap, toml.grid.gap);
        set(&mut grid.aspect, toml.grid.aspect);
        if toml.grid.cell_height.is_some() {
            grid.cell_height = toml.grid.cell_height;
        }

        let orbit = &mut self.canvas.orbit;
        set(&mut orbit.base_gap, toml.orbit.base_gap);
        set(&mut orbit.ring_step, toml.orbit.ring_step);
        set(&mut orbit.arc_spacing, toml.orbit.arc_spacing);
        set(&mut orbit.max_rings, toml.orbit.max_rings);

        let repel = &mut self.canvas.repel;
        set(&mut repel.snap_radius, toml.repel.snap_radius);
        set(&mut repel.distance, toml.repel.distance);
        set(&mut repel.strength, toml.repel.strength);
        set(&mut repel.settled_share, toml.repel.settled_share);
        set(&mut repel.transition_ms, toml.repel.transition_ms);

        let focus = &mut self.canvas.focus;
        set(&mut focus.hover_scale, toml.focus.hover_scale);
        set(&mut focus.padding, toml.focus.padding);
        set(&mut focus.iterations, toml.focus.iterations);
        set(&mut focus.nudge, toml.focus.nudge);
        set(&mut focus.push_factor, toml.focus.push_factor);

        let parallax = &mut self.canvas.parallax;
        set(&mut parallax.min_width, toml.parallax.min_width);
        set(&mut parallax.max_sway, toml.parallax.max_sway);

        let drag = &mut self.canvas.drag;
        set(&mut drag.autoscroll_margin, toml.drag.autoscroll_margin);
        set(&mut drag.autoscroll_max_speed, toml.drag.autoscroll_max_speed);
        set(&mut drag.drag_z, toml.drag.drag_z);
        self.dashboard.drag = drag.clone();

        let canvas = toml.canvas;
        if let Some(mode) = canvas.snap_mode {
            self.canvas.snap_mode = match mode {
                TomlSnapMode::Orbit => SnapMode::Orbit,
                TomlSnapMode::Free => SnapMode::Free,
            };
        }
        set(&mut self.canvas.viewport_size.width, canvas.width);
        set(&mut self.canvas.viewport_size.height, canvas.height);
        if let Some(values) = canvas.delete_zone {
            self.canvas.delete_zone = zone("canvas.delete_zone", &values)?;
        }
        set(&mut self.canvas.seed, canvas.seed);

        let dashboard = toml.dashboard;
        if let Some(values) = dashboard.container {
            self.dashboard.container = rect("dashboard.container", &values)?;
        }
        if let Some(values) = dashboard.delete_zone {
            self.dashboard.delete_zone = zone("dashboard.delete_zone", &values)?;
        }
        set(&mut self.dashboard.template_grab, dashboard.template_grab);

        if toml.sync.csrf.is_some() {
            self.sync.csrf = toml.sync.csrf;
        }
        set(&mut self.sync.event_size.width, toml.sync.event_width);
        set(&mut self.sync.event_size.height, toml.sync.event_height);
        self.canvas.card_size = self.sync.event_size;
        set(&mut self.sync.node_radius, toml.sync.node_radius);

        let svg = &mut self.svg;
        set(&mut svg.padding, toml.svg.padding);
        set(&mut svg.xml_declaration, toml.svg.xml_declaration);
        if let Some(width) = toml.svg.indent {
            svg.indent = (width > 0).then_some(width);
        }
        if let Some(prefix) = toml.svg.class_prefix {
            svg.class_prefix = (!prefix.is_empty()).then_some(prefix);
        }
        let (palette, colours) = (&mut svg.palette, toml.svg.palette);
        set(&mut palette.background, colours.background);
        set(&mut palette.node, colours.node);
        set(&mut palette.node_label, colours.node_label);
        set(&mut palette.item, colours.item);
        set(&mut palette.item_border, colours.item_border);
        set(&mut palette.unsaved, colours.unsaved);

        Ok(self)
    }

    /// Reject values that would break layout invariants
    pub fn validate(&self) -> Result<(), LayoutError> {
        let viewport = &self.canvas.viewport;
        if !(viewport.min_scale > 0.0) {
            return Err(LayoutError::invalid_config(
                "viewport.min_scale",
                "must be positive",
            ));
        }
        if viewport.min_scale > viewport.max_scale {
            return Err(LayoutError::invalid_config(
                "viewport.min_scale",
                format!(
                    "{} exceeds max_scale {}",
                    viewport.min_scale, viewport.max_scale
                ),
            ));
        }
        if !(viewport.zoom_step > 0.0 && viewport.zoom_step < 1.0) {
            return Err(LayoutError::invalid_config(
                "viewport.zoom_step",
                "must be in (0, 1)",
            ));
        }

        if !(self.canvas.orbit.arc_spacing > 0.0) {
            return Err(LayoutError::invalid_config(
                "orbit.arc_spacing",
                "must be positive",
            ));
        }
        if !(self.canvas.orbit.ring_step > 0.0) {
            return Err(LayoutError::invalid_config(
                "orbit.ring_step",
                "must be positive",
            ));
        }

        let repel = &self.canvas.repel;
        if !(repel.strength > 0.0 && repel.strength <= 1.0) {
            return Err(LayoutError::invalid_config(
                "repel.strength",
                "must be in (0, 1]",
            ));
        }
        if !(repel.settled_share >= 0.0) {
            return Err(LayoutError::invalid_config(
                "repel.settled_share",
                "must not be negative",
            ));
        }
        if repel.strength * (1.0 + repel.settled_share) >= 2.0 {
            return Err(LayoutError::invalid_config(
                "repel.settled_share",
                "strength * (1 + settled_share) must stay below 2",
            ));
        }

        if self.dashboard.grid.columns == 0 {
            return Err(LayoutError::invalid_config(
                "grid.columns",
                "must be at least 1",
            ));
        }

        Ok(())
    }

    /// Reconciler configured from the `[sync]` section
    pub fn reconciler(&self) -> Reconciler {
        let reconciler = Reconciler::new().with_sizes(self.sync.event_size, self.sync.node_radius);
        match &self.sync.csrf {
            Some(token) => reconciler.with_csrf(token.clone()),
            None => reconciler,
        }
    }

    pub fn viewport(&self) -> &ViewportConfig {
        &self.canvas.viewport
    }

    pub fn grid(&self) -> &GridConfig {
        &self.dashboard.grid
    }

    pub fn orbit(&self) -> &OrbitConfig {
        &self.canvas.orbit
    }

    pub fn repel(&self) -> &RepelConfig {
        &self.canvas.repel
    }

    pub fn focus(&self) -> &FocusConfig {
        &self.canvas.focus
    }

    pub fn parallax(&self) -> &ParallaxConfig {
        &self.canvas.parallax
    }

    pub fn drag(&self) -> &DragConfig {
        &self.canvas.drag
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self::from_str(DEFAULT_SETTINGS).expect("Default settings should be valid")
    }
}
