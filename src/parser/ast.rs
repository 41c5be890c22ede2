//! Abstract Syntax Tree types for gesture scripts

use crate::layout::ZoomDirection;

/// Byte range in source text
pub type Span = std::ops::Range<usize>;

/// AST node with source location
#[derive(Debug, Clone, PartialEq)]
pub struct Spanned<T> {
    pub node: T,
    pub span: Span,
}

impl<T> Spanned<T> {
    pub fn new(node: T, span: Span) -> Self {
        Self { node, span }
    }
}

/// Root AST node - a complete script
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Script {
    pub statements: Vec<Spanned<Statement>>,
}

/// Which view the script drives
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewTarget {
    Dashboard,
    Group(u64),
}

/// What a press lands on. Item and node ids are server ids.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    Item(u64),
    Node(u64),
    Template(String),
    Control,
    Background,
}

/// One script statement
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    /// `view dashboard` or `view group 3`
    View(ViewTarget),
    /// `resize 1024 768`
    Resize { width: f64, height: f64 },
    /// `press 10 20 [button 1] on item 3`
    Press {
        x: f64,
        y: f64,
        button: u8,
        target: Target,
    },
    /// `move 40 60`: a raw pointer event, processed on the next frame
    Move { x: f64, y: f64 },
    /// `frame [n]`
    Frame { count: u64 },
    Release,
    /// `wheel 400 300 -120`
    Wheel { x: f64, y: f64, delta: f64 },
    /// `zoom in at 400 300`
    Zoom {
        direction: ZoomDirection,
        x: f64,
        y: f64,
    },
    /// `pan 10 -5`
    Pan { dx: f64, dy: f64 },
    /// `fit node 2 [padding 40]`
    Fit { node: u64, padding: Option<f64> },
    /// `reset zoom`
    ResetZoom,
    /// `tick 16`
    Tick { ms: f64 },
    /// `remove item 4`
    Remove { item: u64 },
    /// `remove node 2`: the node and every event on it
    RemoveNode { node: u64 },
    /// `add event on node 2 ["title"]`
    AddEvent { node: u64, title: Option<String> },
    /// `add node at 400 300 ["label"]`, in screen coordinates
    AddNode {
        x: f64,
        y: f64,
        label: Option<String>,
    },
    /// `fail next [500]`
    FailNext { status: Option<u16> },
    /// Deliver queued server calls
    Sync,
    /// `scroll 120`
    Scroll { offset: f64 },
}

impl Statement {
    /// Keyword the statement starts with
    pub fn keyword(&self) -> &'static str {
        match self {
            Statement::View(_) => "view",
            Statement::Resize { .. } => "resize",
            Statement::Press { .. } => "press",
            Statement::Move { .. } => "move",
            Statement::Frame { .. } => "frame",
            Statement::Release => "release",
            Statement::Wheel { .. } => "wheel",
            Statement::Zoom { .. } => "zoom",
            Statement::Pan { .. } => "pan",
            Statement::Fit { .. } => "fit",
            Statement::ResetZoom => "reset",
            Statement::Tick { .. } => "tick",
            Statement::Remove { .. } | Statement::RemoveNode { .. } => "remove",
            Statement::AddEvent { .. } | Statement::AddNode { .. } => "add",
            Statement::FailNext { .. } => "fail",
            Statement::Sync => "sync",
            Statement::Scroll { .. } => "scroll",
        }
    }
}
