//! Snapshot output options

/// Fill and stroke colours used by the snapshot stylesheet
#[derive(Debug, Clone, PartialEq)]
pub struct Palette {
    pub background: String,
    pub node: String,
    pub node_label: String,
    pub item: String,
    pub item_border: String,
    /// Border of items the server has not confirmed yet
    pub unsaved: String,
}

impl Default for Palette {
    fn default() -> Self {
        Self {
            background: "#f5f5f5".into(),
            node: "#2196f3".into(),
            node_label: "#ffffff".into(),
            item: "#ffffff".into(),
            item_border: "#666666".into(),
            unsaved: "#ff9800".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SvgConfig {
    /// Space kept around the content inside the viewBox
    pub padding: f64,

    /// Emit the `<?xml ...?>` prolog
    pub xml_declaration: bool,

    /// Spaces per nesting level; `None` writes everything on one line
    pub indent: Option<usize>,

    /// Prepended to every class name, e.g. `cl-` gives `cl-item`
    pub class_prefix: Option<String>,

    pub palette: Palette,
}

impl Default for SvgConfig {
    fn default() -> Self {
        Self {
            padding: 60.0,
            xml_declaration: true,
            indent: Some(2),
            class_prefix: Some("cl-".into()),
            palette: Palette::default(),
        }
    }
}

impl SvgConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_padding(mut self, padding: f64) -> Self {
        self.padding = padding;
        self
    }

    /// Drop the XML prolog, for embedding in another document
    pub fn embedded(mut self) -> Self {
        self.xml_declaration = false;
        self
    }

    /// One-line output
    pub fn compact(mut self) -> Self {
        self.indent = None;
        self
    }

    pub fn with_class_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.class_prefix = Some(prefix.into());
        self
    }

    pub fn without_class_prefix(mut self) -> Self {
        self.class_prefix = None;
        self
    }

    pub fn with_palette(mut self, palette: Palette) -> Self {
        self.palette = palette;
        self
    }

    /// `name` with the configured prefix
    pub fn class(&self, name: &str) -> String {
        match &self.class_prefix {
            Some(prefix) => format!("{prefix}{name}"),
            None => name.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SvgConfig::default();
        assert_eq!(config.padding, 60.0);
        assert_eq!(config.indent, Some(2));
        assert_eq!(config.class("node"), "cl-node");
        assert_eq!(config.palette.unsaved, "#ff9800");
    }

    #[test]
    fn test_setters_chain() {
        let config = SvgConfig::new()
            .with_padding(10.0)
            .embedded()
            .compact()
            .without_class_prefix()
            .with_palette(Palette {
                item_border: "#111".into(),
                ..Palette::default()
            });

        assert!(!config.xml_declaration);
        assert_eq!(config.indent, None);
        assert_eq!(config.class("item"), "item");
        assert_eq!(config.palette.item_border, "#111");
    }
}
