//! Transition-related types for workflow graphs

use crate::node::NodeId;
use serde::{Deserialize, Serialize};

/// A directed edge between two workflow nodes
///
/// Edges leaving a decision node carry the choice label in `condition`;
/// unconditioned edges are followed automatically on advance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transition {
    /// Source node ID
    pub from: NodeId,
    /// Target node ID
    pub to: NodeId,
    /// Choice label, present only on conditioned edges
    pub condition: Option<String>,
}

impl Transition {
    /// Create an unconditioned (auto-advance) transition
    pub fn unconditioned(from: impl Into<NodeId>, to: impl Into<NodeId>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            condition: None,
        }
    }

    /// Create a conditioned transition carrying a choice label
    pub fn conditioned(
        from: impl Into<NodeId>,
        to: impl Into<NodeId>,
        condition: impl Into<String>,
    ) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            condition: Some(condition.into()),
        }
    }

    /// Whether this transition requires a caller-supplied choice
    pub fn is_conditioned(&self) -> bool {
        self.condition.is_some()
    }
}
