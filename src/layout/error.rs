//! Error types for the layout engine

use thiserror::Error;

use super::types::{CollectionId, ItemId, NodeId, Point};

/// Errors that can occur during layout computation
#[derive(Debug, Error, PartialEq)]
pub enum LayoutError {
    /// A tunable that would break a layout invariant
    #[error("invalid {field}: {reason}")]
    InvalidConfig { field: String, reason: String },

    /// A ring offered no usable slots while items were still queued.
    /// `placed` holds the positions computed before the pass stopped.
    #[error("orbit layout exhausted at ring {ring}: {remaining} item(s) left unplaced")]
    OrbitExhausted {
        ring: usize,
        placed: Vec<Point>,
        remaining: usize,
    },

    #[error("unknown item {0}")]
    UnknownItem(ItemId),

    #[error("unknown node {0}")]
    UnknownNode(NodeId),

    #[error("unknown collection {0}")]
    UnknownCollection(CollectionId),
}

impl LayoutError {
    /// Create an invalid configuration error
    pub fn invalid_config(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Positions that were placed before the error, if any
    pub fn partial_placements(&self) -> Option<&[Point]> {
        match self {
            Self::OrbitExhausted { placed, .. } => Some(placed),
            _ => None,
        }
    }
}
