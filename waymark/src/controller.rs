//! Workflow controller: the state machine driver
//!
//! Composes the graph model, the action handler registry, and the instance
//! state store. Concurrent callers are not serialized here; correctness under
//! racing advances is delegated to the store's optimistic concurrency, so an
//! advance may lose its race and report `false`.

use crate::actions::{
    ActionContext, ActionRegistry, STATUS_CANCELLED, STATUS_ERROR, STATUS_KEY,
};
use crate::definition::{WorkflowDefinition, WorkflowId};
use crate::node::{NodeId, WorkflowNode};
use crate::store::{StoreError, StoredWorkflow, WorkflowStore};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

/// Errors that can occur while driving a workflow instance
#[derive(Debug, Error)]
pub enum EngineError {
    /// The store rejected or failed the operation
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Start or restart lost every optimistic write attempt
    #[error("Could not persist instance position for workflow '{0}' under contention")]
    Contention(WorkflowId),

    /// Persisted current node no longer exists in the definition
    #[error("Workflow '{workflow}' is positioned at unknown node '{node}'")]
    UnknownPosition {
        /// The workflow instance
        workflow: WorkflowId,
        /// The dangling node ID
        node: NodeId,
    },
}

/// Result type for controller operations
pub type EngineResult<T> = Result<T, EngineError>;

/// Where a workflow instance currently is
///
/// `NotStarted` is structurally distinct from being at a node, so an
/// unstarted instance can never be confused with accidental null propagation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum InstancePosition {
    /// No position persisted yet
    NotStarted,
    /// Instance is at the given node
    AtNode(NodeId),
}

/// One selectable branch out of a decision node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChoiceOption {
    /// The choice label shown to the caller
    pub display_text: String,
    /// The node the choice leads to; this is the value `advance` expects
    pub target_node_id: NodeId,
}

/// Externally visible read model of an instance's current state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowStatePayload {
    /// Label of the current node
    pub node_label: String,
    /// Whether the current node exposes choices
    pub is_choice: bool,
    /// Available choices in declaration order; empty unless `is_choice`
    pub choices: Vec<ChoiceOption>,
}

/// Drives workflow instances through their parsed graphs
pub struct WorkflowController {
    store: Arc<dyn WorkflowStore>,
    registry: Arc<ActionRegistry>,
}

impl WorkflowController {
    /// Create a controller over a store and a handler registry
    pub fn new(store: Arc<dyn WorkflowStore>, registry: Arc<ActionRegistry>) -> Self {
        Self { store, registry }
    }

    /// The instance state store this controller persists through
    pub fn store(&self) -> &Arc<dyn WorkflowStore> {
        &self.store
    }

    /// Start an instance, resuming any previously persisted position
    ///
    /// Starting is idempotent: an instance mid-workflow keeps its progress.
    /// Returns the node the instance is at after the call.
    pub async fn start_instance(
        &self,
        id: &WorkflowId,
        cancel: &CancellationToken,
    ) -> EngineResult<NodeId> {
        let record = self.store.get(id, cancel).await?;
        if let Some(current) = record.current_node {
            tracing::debug!(workflow = %id, node = %current, "instance already started, resuming");
            return Ok(current);
        }

        let start = record.definition.primary_start().clone();
        let committed = self
            .store
            .update_current_node(id, Some(start.clone()), cancel)
            .await?;
        if !committed {
            return Err(EngineError::Contention(id.clone()));
        }
        tracing::info!(workflow = %id, node = %start, "instance started");
        Ok(start)
    }

    /// Reset an instance to the primary start point, discarding progress
    pub async fn restart_instance(
        &self,
        id: &WorkflowId,
        cancel: &CancellationToken,
    ) -> EngineResult<NodeId> {
        let record = self.store.get(id, cancel).await?;
        let start = record.definition.primary_start().clone();
        let committed = self
            .store
            .update_current_node(id, Some(start.clone()), cancel)
            .await?;
        if !committed {
            return Err(EngineError::Contention(id.clone()));
        }
        tracing::info!(workflow = %id, node = %start, "instance restarted");
        Ok(start)
    }

    /// Raw persisted position, without start-point resolution
    pub async fn position(
        &self,
        id: &WorkflowId,
        cancel: &CancellationToken,
    ) -> EngineResult<InstancePosition> {
        let record = self.store.get(id, cancel).await?;
        Ok(match record.current_node {
            Some(node) => InstancePosition::AtNode(node),
            None => InstancePosition::NotStarted,
        })
    }

    /// Resolved current node: an unstarted instance reads as the start point
    ///
    /// Pure read, no side effects.
    pub async fn current_node_id(
        &self,
        id: &WorkflowId,
        cancel: &CancellationToken,
    ) -> EngineResult<NodeId> {
        let record = self.store.get(id, cancel).await?;
        Ok(resolve_current(&record))
    }

    /// Read model of the instance's current state
    pub async fn state_payload(
        &self,
        id: &WorkflowId,
        cancel: &CancellationToken,
    ) -> EngineResult<WorkflowStatePayload> {
        let record = self.store.get(id, cancel).await?;
        let current_id = resolve_current(&record);
        let current = self.resolve_node(id, &record.definition, &current_id)?;

        let choices: Vec<ChoiceOption> = record
            .definition
            .choices_from(&current_id)
            .into_iter()
            .map(|t| ChoiceOption {
                display_text: t.condition.clone().unwrap_or_default(),
                target_node_id: t.to.clone(),
            })
            .collect();

        Ok(WorkflowStatePayload {
            node_label: current.label.clone(),
            is_choice: !choices.is_empty(),
            choices,
        })
    }

    /// Advance the instance by one transition
    ///
    /// At a choice node, `choice` must equal one of the current choices'
    /// target node ids; anything else returns `Ok(false)` with no state
    /// change. At a plain node the single unconditioned edge is followed and
    /// `choice` is ignored. A terminal node always returns `Ok(false)`; that
    /// is how callers detect completion. The current node's action handler,
    /// if any, runs before the transition commits; only a `cancelled` status
    /// suppresses the move.
    pub async fn advance(
        &self,
        id: &WorkflowId,
        choice: Option<&str>,
        cancel: &CancellationToken,
    ) -> EngineResult<bool> {
        let record = self.store.get(id, cancel).await?;
        let current_id = resolve_current(&record);
        let current = self.resolve_node(id, &record.definition, &current_id)?;

        let choices = record.definition.choices_from(&current_id);
        let next = if !choices.is_empty() {
            match choice.and_then(|value| choices.iter().find(|t| t.to.as_str() == value)) {
                Some(transition) => transition.to.clone(),
                None => {
                    tracing::debug!(
                        workflow = %id,
                        node = %current_id,
                        choice = choice.unwrap_or(""),
                        "choice does not match any available target"
                    );
                    return Ok(false);
                }
            }
        } else {
            match record.definition.auto_advance_target(&current_id) {
                Some(target) => target.clone(),
                None => {
                    tracing::debug!(workflow = %id, node = %current_id, "terminal node reached");
                    return Ok(false);
                }
            }
        };

        if let Some(descriptor) = &current.metadata {
            if let Some(result) = self
                .invoke_handler(id, current, &record.definition, cancel)
                .await
            {
                if result.get(STATUS_KEY).map(String::as_str) == Some(STATUS_CANCELLED) {
                    tracing::info!(
                        workflow = %id,
                        node = %current_id,
                        action = descriptor.name,
                        "handler cancelled, staying at current node"
                    );
                    return Ok(false);
                }
            }
        }

        let committed = self
            .store
            .update_current_node(id, Some(next.clone()), cancel)
            .await?;
        if committed {
            tracing::info!(workflow = %id, from = %current_id, to = %next, "instance advanced");
        }
        Ok(committed)
    }

    /// Run the current node's handler, mapping failures into the result map
    ///
    /// An unregistered handler name makes the node a pass-through: no side
    /// effects, no result, the transition proceeds.
    async fn invoke_handler(
        &self,
        id: &WorkflowId,
        node: &WorkflowNode,
        definition: &WorkflowDefinition,
        cancel: &CancellationToken,
    ) -> Option<HashMap<String, String>> {
        let descriptor = node.metadata.as_ref()?;
        let handler = match self.registry.get(&descriptor.name) {
            Some(handler) => handler,
            None => {
                tracing::debug!(
                    workflow = %id,
                    node = %node.id,
                    action = descriptor.name,
                    "no handler registered, passing through"
                );
                return None;
            }
        };

        let context = ActionContext::new(id, node, definition, self);
        let result = match handler.handle(&context, &descriptor.params, cancel).await {
            Ok(result) => result,
            Err(error) => {
                let mut result = HashMap::new();
                result.insert(STATUS_KEY.to_string(), STATUS_ERROR.to_string());
                result.insert("message".to_string(), error.to_string());
                result
            }
        };

        match result.get(STATUS_KEY).map(String::as_str) {
            Some(STATUS_ERROR) => tracing::warn!(
                workflow = %id,
                node = %node.id,
                action = descriptor.name,
                ?result,
                "handler reported failure; advancing anyway"
            ),
            status => tracing::debug!(
                workflow = %id,
                node = %node.id,
                action = descriptor.name,
                status = status.unwrap_or("none"),
                "handler finished"
            ),
        }
        Some(result)
    }

    fn resolve_node<'a>(
        &self,
        id: &WorkflowId,
        definition: &'a WorkflowDefinition,
        node_id: &NodeId,
    ) -> EngineResult<&'a WorkflowNode> {
        definition
            .node(node_id)
            .ok_or_else(|| EngineError::UnknownPosition {
                workflow: id.clone(),
                node: node_id.clone(),
            })
    }
}

fn resolve_current(record: &StoredWorkflow) -> NodeId {
    record
        .current_node
        .clone()
        .unwrap_or_else(|| record.definition.primary_start().clone())
}
