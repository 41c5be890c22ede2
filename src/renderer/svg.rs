//! SVG snapshot of a collection
//!
//! The document is assembled as a small element tree and serialised in one
//! pass, so nesting and indentation can't drift apart.

use std::fmt::Write as _;

use crate::layout::{BoundingBox, Item, Node};
use crate::store::Collection;

use super::SvgConfig;

#[derive(Debug, Clone, PartialEq)]
enum Body {
    Empty,
    /// Escaped on output
    Text(String),
    /// Written verbatim (stylesheet rules)
    Raw(Vec<String>),
    Children(Vec<Element>),
}

#[derive(Debug, Clone, PartialEq)]
struct Element {
    name: &'static str,
    attrs: Vec<(&'static str, String)>,
    body: Body,
}

impl Element {
    fn new(name: &'static str) -> Self {
        Self {
            name,
            attrs: Vec::new(),
            body: Body::Empty,
        }
    }

    fn attr(mut self, key: &'static str, value: impl ToString) -> Self {
        self.attrs.push((key, value.to_string()));
        self
    }

    fn text(mut self, text: impl Into<String>) -> Self {
        self.body = Body::Text(text.into());
        self
    }

    fn children(mut self, children: Vec<Element>) -> Self {
        self.body = Body::Children(children);
        self
    }

    fn write(&self, out: &mut String, depth: usize, config: &SvgConfig) {
        let (pad, nl) = match config.indent {
            Some(width) => (" ".repeat(width * depth), "\n"),
            None => (String::new(), ""),
        };

        let _ = write!(out, "{pad}<{}", self.name);
        for (key, value) in &self.attrs {
            let _ = write!(out, r#" {key}="{}""#, escape(value));
        }

        match &self.body {
            Body::Empty => {
                let _ = write!(out, "/>{nl}");
            }
            Body::Text(text) => {
                let _ = write!(out, ">{}</{}>{nl}", escape(text), self.name);
            }
            Body::Raw(lines) => {
                let _ = write!(out, ">{nl}");
                let inner = config.indent.map_or(String::new(), |w| " ".repeat(w * (depth + 1)));
                for line in lines {
                    let _ = write!(out, "{inner}{line}{nl}");
                }
                let _ = write!(out, "{pad}</{}>{nl}", self.name);
            }
            Body::Children(children) => {
                let _ = write!(out, ">{nl}");
                for child in children {
                    child.write(out, depth + 1, config);
                }
                let _ = write!(out, "{pad}</{}>{nl}", self.name);
            }
        }
    }
}

fn stylesheet(config: &SvgConfig) -> Element {
    let p = &config.palette;
    let rule = |class: &str, body: String| format!(".{} {{ {} }}", config.class(class), body);
    let rules = vec![
        rule("background", format!("fill: {};", p.background)),
        rule("node", format!("fill: {};", p.node)),
        rule(
            "node-label",
            format!("fill: {}; text-anchor: middle; dominant-baseline: central;", p.node_label),
        ),
        rule("item", format!("fill: {}; stroke: {};", p.item, p.item_border)),
        rule("unsaved", format!("stroke: {}; stroke-dasharray: 4 2;", p.unsaved)),
    ];
    Element {
        body: Body::Raw(rules),
        ..Element::new("style")
    }
}

fn node_element(node: &Node, config: &SvgConfig) -> Element {
    let (x, y) = (node.position.x, node.position.y);
    Element::new("g")
        .attr("id", node.id)
        .attr("class", config.class("node-group"))
        .children(vec![
            Element::new("circle")
                .attr("class", config.class("node"))
                .attr("cx", x)
                .attr("cy", y)
                .attr("r", node.radius),
            Element::new("text")
                .attr("class", config.class("node-label"))
                .attr("x", x)
                .attr("y", y)
                .text(node.label.as_str()),
        ])
}

fn item_element(item: &Item, config: &SvgConfig) -> Element {
    let bounds = item.bounds();
    let center = item.center();
    let mut classes = config.class("item");
    if item.unsaved {
        classes.push(' ');
        classes.push_str(&config.class("unsaved"));
    }

    Element::new("g")
        .attr("id", format!("item-{}", item.id))
        .attr("class", config.class("item-group"))
        .attr("style", format!("transform: {}", item.transform.to_css()))
        .children(vec![
            Element::new("rect")
                .attr("class", classes)
                .attr("x", bounds.x)
                .attr("y", bounds.y)
                .attr("width", bounds.width)
                .attr("height", bounds.height),
            Element::new("text")
                .attr("class", config.class("item-title"))
                .attr("x", center.x)
                .attr("y", center.y)
                .text(item.title.as_str()),
        ])
}

/// Union of node circles and item rectangles
fn content_bounds(nodes: &[Node], items: &[Item]) -> BoundingBox {
    let circles = nodes.iter().map(|n| {
        BoundingBox::new(
            n.position.x - n.radius,
            n.position.y - n.radius,
            2.0 * n.radius,
            2.0 * n.radius,
        )
    });

    circles
        .chain(items.iter().map(Item::bounds))
        .reduce(|acc, b| acc.union(&b))
        .unwrap_or_else(BoundingBox::zero)
}

/// Render a collection's nodes and items in world coordinates
pub fn render_svg(collection: &Collection, config: &SvgConfig) -> String {
    let bounds = content_bounds(collection.nodes(), collection.items());
    let pad = config.padding;
    let view = BoundingBox::new(
        bounds.x - pad,
        bounds.y - pad,
        bounds.width + 2.0 * pad,
        bounds.height + 2.0 * pad,
    );

    let shapes: Vec<Element> = collection
        .nodes()
        .iter()
        .map(|n| node_element(n, config))
        .chain(collection.items().iter().map(|i| item_element(i, config)))
        .collect();

    let root = Element::new("svg")
        .attr("xmlns", "http://www.w3.org/2000/svg")
        .attr("viewBox", format!("{} {} {} {}", view.x, view.y, view.width, view.height))
        .children(vec![
            stylesheet(config),
            Element::new("rect")
                .attr("class", config.class("background"))
                .attr("x", view.x)
                .attr("y", view.y)
                .attr("width", view.width)
                .attr("height", view.height),
            Element::new("g")
                .attr("id", collection.id)
                .attr("class", config.class("collection"))
                .children(shapes),
        ]);

    let mut out = String::new();
    if config.xml_declaration {
        out.push_str(r#"<?xml version="1.0" encoding="UTF-8"?>"#);
        if config.indent.is_some() {
            out.push('\n');
        }
    }
    root.write(&mut out, 0, config);
    out.truncate(out.trim_end().len());
    out
}

fn escape(s: &str) -> String {
    let mut escaped = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
