//! Node-related types for workflow graphs

use crate::actions::ActionDescriptor;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Kinds of workflow nodes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum NodeKind {
    /// Plain node: auto-advances along its single unconditioned edge
    #[default]
    Task,
    /// Decision node: requires an externally supplied choice to advance
    Decision,
}

impl NodeKind {
    /// Get the string representation of the node kind
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeKind::Task => "Task",
            NodeKind::Decision => "Decision",
        }
    }
}

/// Errors that can occur when creating node-related types
#[derive(Debug, Error)]
pub enum NodeError {
    /// Node ID cannot be empty or whitespace only
    #[error("Node ID cannot be empty or whitespace only")]
    EmptyNodeId,
}

/// Result type for node operations
pub type NodeResult<T> = Result<T, NodeError>;

/// Unique identifier for workflow nodes
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeId(String);

impl NodeId {
    /// Create a new node ID
    ///
    /// # Panics
    /// Panics if the ID is empty or whitespace only. For non-panicking creation,
    /// use `try_new` instead.
    pub fn new(id: impl Into<String>) -> Self {
        Self::try_new(id).expect("Node ID cannot be empty or whitespace only")
    }

    /// Create a new node ID, returning an error for invalid input
    pub fn try_new(id: impl Into<String>) -> NodeResult<Self> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(NodeError::EmptyNodeId);
        }
        Ok(Self(id))
    }

    /// Get the inner string value
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for NodeId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for NodeId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A node in the workflow graph, immutable once parsed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowNode {
    /// Unique identifier within the definition
    pub id: NodeId,
    /// Human-readable name, case preserved verbatim from the diagram
    pub label: String,
    /// Kind of node (task or decision)
    pub kind: NodeKind,
    /// Raw note text attached to the node, if any
    pub annotation: Option<String>,
    /// Structured action descriptor extracted from the note, if it parsed
    pub metadata: Option<ActionDescriptor>,
}

impl WorkflowNode {
    /// Create a plain task node with no annotation
    pub fn task(id: impl Into<NodeId>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            kind: NodeKind::Task,
            annotation: None,
            metadata: None,
        }
    }

    /// Create a decision node with no annotation
    pub fn decision(id: impl Into<NodeId>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            kind: NodeKind::Decision,
            annotation: None,
            metadata: None,
        }
    }

    /// Whether this node carries a parsed action descriptor
    pub fn has_action(&self) -> bool {
        self.metadata.is_some()
    }
}
