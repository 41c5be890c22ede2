//! Scene files: the starting state for a replay
//!
//! A scene lists groups (with their nodes and events), the dashboard's panels
//! and the palette templates. The same data seeds both the client [`Store`]
//! and the in-memory server, so the two start out agreeing.
//!
//! ```toml
//! csrf = "s3cret"
//!
//! [[groups]]
//! id = 1
//! name = "Climbing club"
//!
//! [[groups.nodes]]
//! id = 1
//! label = "Saturday"
//! x = 0.0
//! y = 0.0
//!
//! [[groups.events]]
//! id = 10
//! title = "Bouldering"
//! node = 1
//!
//! [[panels]]
//! id = 20
//! title = "RSVPs"
//! analysis_type = "rsvp-distribution"
//!
//! [[templates]]
//! name = "busy-periods"
//! title = "Busy periods"
//! ```

use std::collections::HashSet;
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

use crate::drag::Template;
use crate::layout::{CollectionId, ItemKind};
use crate::settings::Settings;
use crate::store::{Collection, Store};
use crate::sync::{group_collection, GroupRecord, ItemRecord, MemoryApi, NodeRecord};

/// Errors that can occur when loading a scene
#[derive(Error, Debug)]
pub enum SceneError {
    #[error("Failed to read scene file: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Failed to parse scene TOML: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("Invalid scene: {0}")]
    Invalid(String),
}

/// Groups, panels and templates a replay starts from
#[derive(Debug, Clone, PartialEq)]
pub struct Scene {
    /// Token the server requires on mutating calls
    pub csrf: Option<String>,
    pub dashboard_name: String,
    pub groups: Vec<GroupRecord>,
    pub panels: Vec<ItemRecord>,
    pub templates: Vec<Template>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct TomlScene {
    csrf: Option<String>,
    dashboard_name: Option<String>,
    #[serde(default)]
    groups: Vec<TomlGroup>,
    #[serde(default)]
    panels: Vec<TomlPanel>,
    #[serde(default)]
    templates: Vec<TomlTemplate>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct TomlGroup {
    id: u64,
    name: String,
    #[serde(default)]
    nodes: Vec<NodeRecord>,
    #[serde(default)]
    events: Vec<TomlEvent>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct TomlEvent {
    id: u64,
    title: String,
    #[serde(default)]
    x: f64,
    #[serde(default)]
    y: f64,
    node: Option<u64>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct TomlPanel {
    id: u64,
    title: String,
    analysis_type: String,
    configuration: Option<toml::Value>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct TomlTemplate {
    name: String,
    title: Option<String>,
    analysis_type: Option<String>,
}

impl Scene {
    /// Load a scene from a TOML file
    pub fn from_file(path: &Path) -> Result<Self, SceneError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_str(&content)
    }

    /// Load a scene from a TOML string
    pub fn from_str(content: &str) -> Result<Self, SceneError> {
        let parsed: TomlScene = toml::from_str(content)?;

        let groups = parsed
            .groups
            .into_iter()
            .map(|g| GroupRecord {
                id: g.id,
                name: g.name,
                nodes: g.nodes,
                events: g
                    .events
                    .into_iter()
                    .map(|e| ItemRecord {
                        id: e.id,
                        kind: ItemKind::Event,
                        title: e.title,
                        x: e.x,
                        y: e.y,
                        node_id: e.node,
                        configuration: serde_json::Value::Null,
                    })
                    .collect(),
            })
            .collect();

        let panels = parsed
            .panels
            .into_iter()
            .map(|p| {
                let configuration = match p.configuration {
                    Some(value) => serde_json::to_value(value)
                        .map_err(|e| SceneError::Invalid(format!("panel {}: {e}", p.id)))?,
                    None => serde_json::Value::Null,
                };
                Ok(ItemRecord {
                    id: p.id,
                    kind: ItemKind::Panel {
                        analysis_type: p.analysis_type,
                    },
                    title: p.title,
                    x: 0.0,
                    y: 0.0,
                    node_id: None,
                    configuration,
                })
            })
            .collect::<Result<Vec<_>, SceneError>>()?;

        let templates = parsed
            .templates
            .into_iter()
            .map(|t| {
                let title = t.title.unwrap_or_else(|| t.name.clone());
                let analysis_type = t.analysis_type.unwrap_or_else(|| t.name.clone());
                Template::new(t.name, title, analysis_type)
            })
            .collect();

        let scene = Scene {
            csrf: parsed.csrf,
            dashboard_name: parsed.dashboard_name.unwrap_or_else(|| "Insights".to_string()),
            groups,
            panels,
            templates,
        };
        scene.validate()?;
        Ok(scene)
    }

    /// Check that ids are unique and that snapped events name a real node
    pub fn validate(&self) -> Result<(), SceneError> {
        let mut groups = HashSet::new();
        let mut items = HashSet::new();

        for group in &self.groups {
            if !groups.insert(group.id) {
                return Err(SceneError::Invalid(format!("duplicate group {}", group.id)));
            }

            let mut nodes = HashSet::new();
            for node in &group.nodes {
                if !nodes.insert(node.id) {
                    return Err(SceneError::Invalid(format!(
                        "duplicate node {} in group {}",
                        node.id, group.id
                    )));
                }
            }

            for event in &group.events {
                if !items.insert(event.id) {
                    return Err(SceneError::Invalid(format!("duplicate item {}", event.id)));
                }
                if let Some(node) = event.node_id {
                    if !nodes.contains(&node) {
                        return Err(SceneError::Invalid(format!(
                            "event {} snapped to unknown node {} in group {}",
                            event.id, node, group.id
                        )));
                    }
                }
            }
        }

        for panel in &self.panels {
            if !items.insert(panel.id) {
                return Err(SceneError::Invalid(format!("duplicate item {}", panel.id)));
            }
        }

        let mut templates = HashSet::new();
        for template in &self.templates {
            if !templates.insert(template.name.as_str()) {
                return Err(SceneError::Invalid(format!(
                    "duplicate template \"{}\"",
                    template.name
                )));
            }
        }

        Ok(())
    }

    /// Client-side collections, already confirmed
    pub fn store(&self, settings: &Settings) -> Store {
        let mut store = Store::new();
        for group in &self.groups {
            store.insert_collection(group_collection(
                group.clone(),
                settings.sync.event_size,
                settings.sync.node_radius,
            ));
        }

        let panels = self
            .panels
            .iter()
            .cloned()
            .map(|record| record.into_item(settings.sync.event_size))
            .collect();
        store.insert_collection(Collection::with_contents(
            CollectionId::Dashboard,
            self.dashboard_name.clone(),
            panels,
            Vec::new(),
        ));
        store
    }

    /// Server holding the same data as [`Scene::store`]
    pub fn server(&self) -> MemoryApi {
        let api = self
            .groups
            .iter()
            .cloned()
            .fold(MemoryApi::new(), MemoryApi::with_group)
            .with_dashboard(self.panels.clone());
        match &self.csrf {
            Some(token) => api.with_required_csrf(token.clone()),
            None => api,
        }
    }
}
