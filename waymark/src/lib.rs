//! # Waymark
//!
//! A workflow definition and execution engine driven by state diagram text.
//!
//! ## Features
//!
//! - **Diagram Parsing**: Mermaid-style state diagrams become immutable
//!   workflow definitions, with notes carrying structured action descriptors
//! - **State Machine Driver**: auto-advance through plain nodes, caller-supplied
//!   choices at decision nodes, pluggable action handlers in between
//! - **Optimistic Persistence**: version-token concurrency with bounded retry,
//!   in memory or on disk
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use tokio_util::sync::CancellationToken;
//! use waymark::{
//!     ActionRegistry, DiagramParser, MemoryWorkflowStore, WorkflowController, WorkflowId,
//!     WorkflowStore,
//! };
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let diagram = r#"
//!     [*] --> welcome
//!     welcome --> tour
//!     tour --> [*]
//! "#;
//!
//! let definition = DiagramParser::new().parse(diagram, WorkflowId::generate(), "museum visit")?;
//! let id = definition.id().clone();
//!
//! let store = Arc::new(MemoryWorkflowStore::new());
//! let controller = WorkflowController::new(store.clone(), Arc::new(ActionRegistry::with_builtins()));
//!
//! let cancel = CancellationToken::new();
//! store.create(definition, &cancel).await?;
//! controller.start_instance(&id, &cancel).await?;
//!
//! while controller.advance(&id, None, &cancel).await? {
//!     let payload = controller.state_payload(&id, &cancel).await?;
//!     println!("now at {}", payload.node_label);
//! }
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

/// Action handler plugin contract, registry, and built-in handlers
pub mod actions;

/// Workflow controller: the state machine driver
pub mod controller;

/// Workflow definition: the immutable parsed graph
pub mod definition;

/// Node-related types for workflow graphs
pub mod node;

/// State diagram parser for workflow definitions
pub mod parser;

/// Bounded retry with backoff for optimistic write paths
pub mod retry;

/// Storage abstractions and implementations for workflow instance state
pub mod store;

/// Transition-related types for workflow graphs
pub mod transition;

pub use actions::{
    ActionContext, ActionDescriptor, ActionError, ActionHandler, ActionRegistry, ActionResult,
    LogHandler, WaitHandler, STATUS_CANCELLED, STATUS_ERROR, STATUS_KEY, STATUS_SUCCESS,
};
pub use controller::{
    ChoiceOption, EngineError, EngineResult, InstancePosition, WorkflowController,
    WorkflowStatePayload,
};
pub use definition::{
    DefinitionError, DefinitionParts, DefinitionResult, WorkflowDefinition, WorkflowId,
    WorkflowName,
};
pub use node::{NodeError, NodeId, NodeKind, NodeResult, WorkflowNode};
pub use parser::{DiagramParser, ParseError, ParseResult};
pub use retry::{backoff_100ms_linear, retry, RetryError};
pub use store::{
    FsWorkflowStore, MemoryWorkflowStore, StoreError, StoreResult, StoredWorkflow, WorkflowStore,
    MAX_WRITE_ATTEMPTS,
};
pub use transition::Transition;
