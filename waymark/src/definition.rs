//! Workflow definition: the immutable parsed graph

use crate::node::{NodeId, NodeKind, WorkflowNode};
use crate::transition::Transition;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;
use ulid::Ulid;

/// Errors that can occur when building a workflow definition
#[derive(Debug, Error)]
pub enum DefinitionError {
    /// Workflow name cannot be empty or whitespace only
    #[error("Workflow name cannot be empty or whitespace only")]
    EmptyWorkflowName,

    /// Workflow ID cannot be empty or whitespace only
    #[error("Workflow ID cannot be empty or whitespace only")]
    EmptyWorkflowId,

    /// Two nodes declared with the same ID
    #[error("Duplicate node ID: '{0}'")]
    DuplicateNode(NodeId),

    /// A transition or start point references a node that does not exist
    #[error("{context} references unknown node: '{id}'")]
    UnknownNode {
        /// The missing node ID
        id: NodeId,
        /// Which construct held the reference
        context: String,
    },

    /// A definition must declare at least one start point
    #[error("Workflow has no start point")]
    NoStartPoint,

    /// A node may have at most one unconditioned outgoing edge
    #[error("Node '{0}' has more than one unconditioned outgoing transition")]
    AmbiguousAutoAdvance(NodeId),
}

/// Result type for definition operations
pub type DefinitionResult<T> = Result<T, DefinitionError>;

/// Unique identifier for workflows
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WorkflowId(String);

impl WorkflowId {
    /// Create a new workflow ID
    ///
    /// # Panics
    /// Panics if the ID is empty or whitespace only. For non-panicking creation,
    /// use `try_new` instead.
    pub fn new(id: impl Into<String>) -> Self {
        Self::try_new(id).expect("Workflow ID cannot be empty or whitespace only")
    }

    /// Create a new workflow ID, returning an error for invalid input
    pub fn try_new(id: impl Into<String>) -> DefinitionResult<Self> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(DefinitionError::EmptyWorkflowId);
        }
        Ok(Self(id))
    }

    /// Mint a fresh random workflow ID
    pub fn generate() -> Self {
        Self(Ulid::new().to_string())
    }

    /// Get the inner string value
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for WorkflowId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for WorkflowId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl std::fmt::Display for WorkflowId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Human-readable workflow name
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WorkflowName(String);

impl WorkflowName {
    /// Create a new workflow name
    ///
    /// # Panics
    /// Panics if the name is empty or whitespace only. For non-panicking creation,
    /// use `try_new` instead.
    pub fn new(name: impl Into<String>) -> Self {
        Self::try_new(name).expect("Workflow name cannot be empty or whitespace only")
    }

    /// Create a new workflow name, returning an error for invalid input
    pub fn try_new(name: impl Into<String>) -> DefinitionResult<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(DefinitionError::EmptyWorkflowName);
        }
        Ok(Self(name))
    }

    /// Get the inner string value
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for WorkflowName {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for WorkflowName {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl std::fmt::Display for WorkflowName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The raw parts of a definition, used for serialization and construction
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefinitionParts {
    /// Workflow ID
    pub id: WorkflowId,
    /// Workflow name
    pub name: WorkflowName,
    /// Nodes in declaration order
    pub nodes: Vec<WorkflowNode>,
    /// Transitions in declaration order
    pub transitions: Vec<Transition>,
    /// Start points in declaration order
    pub start_points: Vec<NodeId>,
}

/// The immutable parsed workflow graph
///
/// Construction validates the whole structure, so a value of this type always
/// satisfies the graph invariants: unique node ids, no dangling references,
/// at least one start point, at most one unconditioned outgoing edge per node.
/// Cycles are legal. Nodes are held in a flat arena addressed through an
/// id-to-index map built once here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "DefinitionParts", into = "DefinitionParts")]
pub struct WorkflowDefinition {
    id: WorkflowId,
    name: WorkflowName,
    nodes: Vec<WorkflowNode>,
    transitions: Vec<Transition>,
    start_points: Vec<NodeId>,
    node_index: HashMap<NodeId, usize>,
}

impl WorkflowDefinition {
    /// Build a definition from its parts, validating the graph structure
    pub fn new(
        id: WorkflowId,
        name: WorkflowName,
        nodes: Vec<WorkflowNode>,
        transitions: Vec<Transition>,
        start_points: Vec<NodeId>,
    ) -> DefinitionResult<Self> {
        let mut node_index = HashMap::with_capacity(nodes.len());
        for (idx, node) in nodes.iter().enumerate() {
            if node_index.insert(node.id.clone(), idx).is_some() {
                return Err(DefinitionError::DuplicateNode(node.id.clone()));
            }
        }

        for transition in &transitions {
            if !node_index.contains_key(&transition.from) {
                return Err(DefinitionError::UnknownNode {
                    id: transition.from.clone(),
                    context: "Transition source".to_string(),
                });
            }
            if !node_index.contains_key(&transition.to) {
                return Err(DefinitionError::UnknownNode {
                    id: transition.to.clone(),
                    context: "Transition target".to_string(),
                });
            }
        }

        if start_points.is_empty() {
            return Err(DefinitionError::NoStartPoint);
        }
        for start in &start_points {
            if !node_index.contains_key(start) {
                return Err(DefinitionError::UnknownNode {
                    id: start.clone(),
                    context: "Start point".to_string(),
                });
            }
        }

        for node in &nodes {
            let unconditioned = transitions
                .iter()
                .filter(|t| t.from == node.id && !t.is_conditioned())
                .count();
            if unconditioned > 1 {
                return Err(DefinitionError::AmbiguousAutoAdvance(node.id.clone()));
            }
        }

        Ok(Self {
            id,
            name,
            nodes,
            transitions,
            start_points,
            node_index,
        })
    }

    /// Workflow ID
    pub fn id(&self) -> &WorkflowId {
        &self.id
    }

    /// Workflow name
    pub fn name(&self) -> &WorkflowName {
        &self.name
    }

    /// All nodes in declaration order
    pub fn nodes(&self) -> &[WorkflowNode] {
        &self.nodes
    }

    /// All transitions in declaration order
    pub fn transitions(&self) -> &[Transition] {
        &self.transitions
    }

    /// All start points in declaration order
    pub fn start_points(&self) -> &[NodeId] {
        &self.start_points
    }

    /// The authoritative start point: first declared wins
    pub fn primary_start(&self) -> &NodeId {
        // Construction guarantees at least one start point
        &self.start_points[0]
    }

    /// Look up a node by ID
    pub fn node(&self, id: &NodeId) -> Option<&WorkflowNode> {
        self.node_index.get(id).map(|idx| &self.nodes[*idx])
    }

    /// Look up a node by label, case-insensitively
    pub fn node_by_label(&self, label: &str) -> Option<&WorkflowNode> {
        self.nodes
            .iter()
            .find(|n| n.label.eq_ignore_ascii_case(label))
    }

    /// All transitions leaving a node, in declaration order
    pub fn outgoing<'a>(&'a self, id: &NodeId) -> impl Iterator<Item = &'a Transition> + 'a {
        let id = id.clone();
        self.transitions.iter().filter(move |t| t.from == id)
    }

    /// Conditioned transitions leaving a node, in declaration order
    pub fn choices_from(&self, id: &NodeId) -> Vec<&Transition> {
        self.outgoing(id).filter(|t| t.is_conditioned()).collect()
    }

    /// The single unconditioned transition target for a node, if any
    pub fn auto_advance_target(&self, id: &NodeId) -> Option<&NodeId> {
        self.outgoing(id)
            .find(|t| !t.is_conditioned())
            .map(|t| &t.to)
    }

    /// Whether a node has no outgoing transitions at all
    pub fn is_terminal(&self, id: &NodeId) -> bool {
        self.outgoing(id).next().is_none()
    }

    /// Whether a node is a decision point with at least one choice
    pub fn is_choice(&self, id: &NodeId) -> bool {
        !self.choices_from(id).is_empty()
    }
}

impl TryFrom<DefinitionParts> for WorkflowDefinition {
    type Error = DefinitionError;

    fn try_from(parts: DefinitionParts) -> DefinitionResult<Self> {
        Self::new(
            parts.id,
            parts.name,
            parts.nodes,
            parts.transitions,
            parts.start_points,
        )
    }
}

impl From<WorkflowDefinition> for DefinitionParts {
    fn from(definition: WorkflowDefinition) -> Self {
        Self {
            id: definition.id,
            name: definition.name,
            nodes: definition.nodes,
            transitions: definition.transitions,
            start_points: definition.start_points,
        }
    }
}
