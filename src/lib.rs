//! Collage Layout - spatial layout and drag-drop engine for event collages
//!
//! This library provides the geometry behind a group's event canvas and an
//! analytics dashboard: pan/zoom transforms, drag sessions, grid and node
//! spatial indexes, repulsion, orbit layout, and a reconciler that keeps the
//! server in step with local changes.
//!
//! # Example
//!
//! ```rust
//! use collage_layout::{run_script, Scene, Settings};
//!
//! let scene = Scene::from_str(r#"
//!     [[groups]]
//!     id = 1
//!     name = "Book club"
//! "#).unwrap();
//!
//! let session = run_script(&scene, "zoom in at 400 300", &Settings::default()).unwrap();
//! assert!(session.canvas().viewport().scale() > 1.0);
//! ```

pub mod drag;
pub mod error;
pub mod layout;
pub mod parser;
pub mod renderer;
pub mod replay;
pub mod scene;
pub mod settings;
pub mod store;
pub mod sync;

pub use error::{ParseError, ParseErrorKind};
pub use layout::{LayoutError, Viewport, ViewportConfig};
pub use parser::{parse, Script};
pub use renderer::{render_svg, Palette, SvgConfig};
pub use replay::{Session, StepError};
pub use scene::{Scene, SceneError};
pub use settings::{Settings, SettingsError};
pub use store::Store;
pub use sync::{Reconciler, MemoryApi};

use thiserror::Error;

/// Errors that can occur while replaying a script
#[derive(Debug, Error)]
pub enum ReplayError {
    #[error("script has {} syntax error(s): {}", .0.len(), joined(.0))]
    Parse(Vec<ParseError>),

    #[error(transparent)]
    Settings(#[from] SettingsError),

    #[error(transparent)]
    Scene(#[from] SceneError),

    #[error("could not build the session: {0}")]
    Layout(#[from] LayoutError),

    /// A statement that could not be executed
    #[error("replay failed: {0}")]
    Step(#[from] StepError),
}

impl From<Vec<ParseError>> for ReplayError {
    fn from(errors: Vec<ParseError>) -> Self {
        ReplayError::Parse(errors)
    }
}

fn joined(errors: &[ParseError]) -> String {
    let messages: Vec<String> = errors.iter().map(ToString::to_string).collect();
    messages.join("; ")
}

/// Parse a gesture script and run it against a fresh session for `scene`
pub fn run_script(scene: &Scene, source: &str, settings: &Settings) -> Result<Session, ReplayError> {
    let script = parse(source)?;
    let mut session = Session::new(scene, settings)?;
    session.run(&script)?;
    Ok(session)
}
