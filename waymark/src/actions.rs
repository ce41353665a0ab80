//! Action handler plugin contract, registry, and built-in handlers
//!
//! Action nodes carry a structured descriptor naming a handler; the controller
//! resolves it through an explicitly populated registry and invokes it before
//! committing the transition.

use crate::controller::WorkflowController;
use crate::definition::{WorkflowDefinition, WorkflowId};
use crate::node::WorkflowNode;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

/// Result map key carrying the handler outcome
pub const STATUS_KEY: &str = "status";
/// Handler completed normally
pub const STATUS_SUCCESS: &str = "success";
/// Handler failed; the transition still proceeds
pub const STATUS_ERROR: &str = "error";
/// Handler was cancelled; the transition is suppressed
pub const STATUS_CANCELLED: &str = "cancelled";

/// Structured action descriptor embedded in a node's note
///
/// The wire form is `{"action": "<name>", "params": {...}}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionDescriptor {
    /// Handler name, matched case-sensitively against the registry
    #[serde(rename = "action")]
    pub name: String,
    /// String parameters passed to the handler
    #[serde(default)]
    pub params: HashMap<String, String>,
}

impl ActionDescriptor {
    /// Create a descriptor with no parameters
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            params: HashMap::new(),
        }
    }

    /// Add a parameter
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }
}

/// Errors that can occur during action execution
#[derive(Debug, Error)]
pub enum ActionError {
    /// Generic action execution error
    #[error("Action execution failed: {0}")]
    ExecutionFailed(String),

    /// Action execution timed out
    #[error("Action execution timed out after {timeout:?}")]
    Timeout {
        /// The timeout duration that was exceeded
        timeout: Duration,
    },

    /// A required parameter was missing or malformed
    #[error("Invalid action parameter '{name}': {reason}")]
    InvalidParameter {
        /// Parameter name
        name: String,
        /// Why the value was rejected
        reason: String,
    },

    /// IO error during action execution
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for action operations
pub type ActionResult<T> = Result<T, ActionError>;

/// Read-only bundle passed to a handler
///
/// A handler may query other instance state through the controller, but never
/// mutates persistence directly; committing the transition stays with the
/// controller.
pub struct ActionContext<'a> {
    workflow_id: &'a WorkflowId,
    node: &'a WorkflowNode,
    definition: &'a WorkflowDefinition,
    controller: &'a WorkflowController,
}

impl<'a> ActionContext<'a> {
    pub(crate) fn new(
        workflow_id: &'a WorkflowId,
        node: &'a WorkflowNode,
        definition: &'a WorkflowDefinition,
        controller: &'a WorkflowController,
    ) -> Self {
        Self {
            workflow_id,
            node,
            definition,
            controller,
        }
    }

    /// ID of the workflow being advanced
    pub fn workflow_id(&self) -> &WorkflowId {
        self.workflow_id
    }

    /// The node the instance is advancing away from
    pub fn node(&self) -> &WorkflowNode {
        self.node
    }

    /// The full parsed definition
    pub fn definition(&self) -> &WorkflowDefinition {
        self.definition
    }

    /// Query-only access back into the controller
    pub fn controller(&self) -> &WorkflowController {
        self.controller
    }
}

/// Trait for all workflow action handlers
///
/// Handlers are stateless strategies; an advance may be retried, so they must
/// be safe to invoke more than once. Every handler returns a `status` key from
/// the closed vocabulary (`success`, `error`, `cancelled`, or a
/// handler-specific denial reason); other keys pass through to the caller
/// uninterpreted.
#[async_trait::async_trait]
pub trait ActionHandler: Send + Sync {
    /// Unique handler name, matched case-sensitively against descriptors
    fn name(&self) -> &str;

    /// Execute the handler with the given context and parameters
    ///
    /// A cancellation request must yield a `status: cancelled` result rather
    /// than an error, so the controller leaves the instance where it was.
    async fn handle(
        &self,
        context: &ActionContext<'_>,
        params: &HashMap<String, String>,
        cancel: &CancellationToken,
    ) -> ActionResult<HashMap<String, String>>;
}

/// Name-to-handler lookup, populated by explicit registration at startup
#[derive(Default)]
pub struct ActionRegistry {
    handlers: HashMap<String, Arc<dyn ActionHandler>>,
}

impl ActionRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry preloaded with the built-in handlers
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(LogHandler));
        registry.register(Arc::new(WaitHandler));
        registry
    }

    /// Register a handler under its own name, replacing any previous entry
    pub fn register(&mut self, handler: Arc<dyn ActionHandler>) {
        self.handlers.insert(handler.name().to_string(), handler);
    }

    /// Resolve a handler strictly by exact name
    pub fn get(&self, name: &str) -> Option<Arc<dyn ActionHandler>> {
        self.handlers.get(name).cloned()
    }

    /// Registered handler names
    pub fn names(&self) -> Vec<&str> {
        self.handlers.keys().map(|k| k.as_str()).collect()
    }

    /// Number of registered handlers
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    /// Whether the registry is empty
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

fn status_result(status: &str) -> HashMap<String, String> {
    let mut result = HashMap::new();
    result.insert(STATUS_KEY.to_string(), status.to_string());
    result
}

/// Built-in handler that emits a log event
///
/// Parameters: `message` (required), `level` (`info`, `warn`, or `error`,
/// defaults to `info`).
pub struct LogHandler;

#[async_trait::async_trait]
impl ActionHandler for LogHandler {
    fn name(&self) -> &str {
        "log"
    }

    async fn handle(
        &self,
        context: &ActionContext<'_>,
        params: &HashMap<String, String>,
        cancel: &CancellationToken,
    ) -> ActionResult<HashMap<String, String>> {
        if cancel.is_cancelled() {
            return Ok(status_result(STATUS_CANCELLED));
        }

        let message = params.get("message").cloned().unwrap_or_default();
        let workflow = context.workflow_id().as_str();
        let node = context.node().id.as_str();
        match params.get("level").map(String::as_str) {
            Some("error") => tracing::error!(workflow, node, "{}", message),
            Some("warn") => tracing::warn!(workflow, node, "{}", message),
            _ => tracing::info!(workflow, node, "{}", message),
        }

        Ok(status_result(STATUS_SUCCESS))
    }
}

/// Built-in handler that waits for a duration, respecting cancellation
///
/// Parameters: `seconds` (required, non-negative integer).
pub struct WaitHandler;

#[async_trait::async_trait]
impl ActionHandler for WaitHandler {
    fn name(&self) -> &str {
        "wait"
    }

    async fn handle(
        &self,
        _context: &ActionContext<'_>,
        params: &HashMap<String, String>,
        cancel: &CancellationToken,
    ) -> ActionResult<HashMap<String, String>> {
        if cancel.is_cancelled() {
            return Ok(status_result(STATUS_CANCELLED));
        }

        let seconds: u64 = params
            .get("seconds")
            .ok_or_else(|| ActionError::InvalidParameter {
                name: "seconds".to_string(),
                reason: "missing".to_string(),
            })?
            .parse()
            .map_err(|_| ActionError::InvalidParameter {
                name: "seconds".to_string(),
                reason: "not a non-negative integer".to_string(),
            })?;

        tokio::select! {
            _ = cancel.cancelled() => Ok(status_result(STATUS_CANCELLED)),
            _ = tokio::time::sleep(Duration::from_secs(seconds)) => {
                Ok(status_result(STATUS_SUCCESS))
            }
        }
    }
}
