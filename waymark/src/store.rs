//! Storage abstractions and implementations for workflow instance state
//!
//! The store is the only boundary the engine crosses to reach durable state.
//! Both write paths use optimistic concurrency: a write carries the version
//! token read at load time, a conflict reloads fresh state and reapplies the
//! intended change, backoff grows linearly, and after three attempts `update`
//! surfaces a hard failure while `update_current_node` degrades to `false`.

use crate::definition::{WorkflowDefinition, WorkflowId};
use crate::node::NodeId;
use crate::retry::{backoff_100ms_linear, retry, RetryError};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio_util::sync::CancellationToken;

/// Maximum write attempts before an optimistic write gives up
pub const MAX_WRITE_ATTEMPTS: u32 = 3;

/// Errors that can occur in the instance state store
#[derive(Debug, Error)]
pub enum StoreError {
    /// No workflow persisted under the given ID
    #[error("Workflow not found: '{0}'")]
    NotFound(WorkflowId),

    /// Create called for an ID that already exists; use update instead
    #[error("Workflow already exists: '{0}' (use update to replace it)")]
    DuplicateWorkflow(WorkflowId),

    /// A single optimistic write lost its version check
    #[error("Version conflict on workflow '{workflow}': expected {expected}, found {found}")]
    Conflict {
        /// The workflow being written
        workflow: WorkflowId,
        /// Version the writer loaded
        expected: u64,
        /// Version found at commit time
        found: u64,
    },

    /// Optimistic retries exhausted on a full definition update
    #[error("Concurrent updates exceeded {attempts} attempts")]
    ConcurrencyExceeded {
        /// How many attempts were made
        attempts: u32,
    },

    /// The operation was cancelled before committing
    #[error("Store operation cancelled")]
    Cancelled,

    /// IO failure in a durable backend
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Persisted record could not be encoded or decoded
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// A persisted workflow: the definition plus the instance's current position
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredWorkflow {
    /// The immutable parsed graph
    pub definition: WorkflowDefinition,
    /// Current node, `None` until the instance starts
    pub current_node: Option<NodeId>,
    /// Opaque concurrency token, bumped on every committed write
    pub version: u64,
    /// When the workflow was first persisted
    pub created_at: DateTime<Utc>,
    /// When the record last changed
    pub updated_at: DateTime<Utc>,
}

impl StoredWorkflow {
    fn fresh(definition: WorkflowDefinition) -> Self {
        let now = Utc::now();
        Self {
            definition,
            current_node: None,
            version: 0,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Trait for workflow instance state storage backends
///
/// All operations are async and take a cancellation token; a cancelled call
/// either fully commits or leaves the record untouched.
#[async_trait::async_trait]
pub trait WorkflowStore: Send + Sync {
    /// Persist a new workflow; fails if the ID already exists
    async fn create(
        &self,
        definition: WorkflowDefinition,
        cancel: &CancellationToken,
    ) -> StoreResult<()>;

    /// Load a workflow record by ID
    async fn get(&self, id: &WorkflowId, cancel: &CancellationToken) -> StoreResult<StoredWorkflow>;

    /// All persisted workflow records
    async fn list(&self, cancel: &CancellationToken) -> StoreResult<Vec<StoredWorkflow>>;

    /// Replace the full definition in place, keeping instance progress
    ///
    /// Surfaces [`StoreError::ConcurrencyExceeded`] after
    /// [`MAX_WRITE_ATTEMPTS`] failed attempts.
    async fn update(
        &self,
        definition: WorkflowDefinition,
        cancel: &CancellationToken,
    ) -> StoreResult<()>;

    /// Remove a workflow and its instance state
    async fn delete(&self, id: &WorkflowId, cancel: &CancellationToken) -> StoreResult<()>;

    /// Lightweight write of the current node, used on every advance
    ///
    /// Returns `false` instead of failing when optimistic retries run out,
    /// so polling callers can try again on their next tick.
    async fn update_current_node(
        &self,
        id: &WorkflowId,
        node: Option<NodeId>,
        cancel: &CancellationToken,
    ) -> StoreResult<bool>;

    /// Find workflows whose name contains `pattern`, created at or after
    /// `since`, newest first
    async fn find_by_name(
        &self,
        pattern: &str,
        since: DateTime<Utc>,
        cancel: &CancellationToken,
    ) -> StoreResult<Vec<StoredWorkflow>>;
}

fn is_conflict(error: &StoreError) -> bool {
    matches!(error, StoreError::Conflict { .. })
}

/// Replace a record's definition, resetting the position only when the
/// current node no longer exists in the new graph
fn apply_definition(record: &mut StoredWorkflow, definition: WorkflowDefinition) {
    if let Some(current) = &record.current_node {
        if definition.node(current).is_none() {
            record.current_node = None;
        }
    }
    record.definition = definition;
}

/// In-memory workflow store
///
/// Writes are genuine compare-and-swap: the version is snapshotted in one
/// step and checked in another, so racing writers conflict and retry just as
/// they would against a relational backend.
#[derive(Default)]
pub struct MemoryWorkflowStore {
    records: DashMap<WorkflowId, StoredWorkflow>,
}

impl MemoryWorkflowStore {
    /// Create an empty in-memory store
    pub fn new() -> Self {
        Self::default()
    }

    fn snapshot(&self, id: &WorkflowId) -> StoreResult<StoredWorkflow> {
        self.records
            .get(id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| StoreError::NotFound(id.clone()))
    }

    fn commit(
        &self,
        id: &WorkflowId,
        expected_version: u64,
        mutate: impl FnOnce(&mut StoredWorkflow),
    ) -> StoreResult<()> {
        let mut entry = self
            .records
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(id.clone()))?;
        if entry.version != expected_version {
            return Err(StoreError::Conflict {
                workflow: id.clone(),
                expected: expected_version,
                found: entry.version,
            });
        }
        mutate(&mut entry);
        entry.version += 1;
        entry.updated_at = Utc::now();
        Ok(())
    }
}

#[async_trait::async_trait]
impl WorkflowStore for MemoryWorkflowStore {
    async fn create(
        &self,
        definition: WorkflowDefinition,
        cancel: &CancellationToken,
    ) -> StoreResult<()> {
        if cancel.is_cancelled() {
            return Err(StoreError::Cancelled);
        }
        let id = definition.id().clone();
        match self.records.entry(id.clone()) {
            dashmap::mapref::entry::Entry::Occupied(_) => {
                Err(StoreError::DuplicateWorkflow(id))
            }
            dashmap::mapref::entry::Entry::Vacant(vacant) => {
                vacant.insert(StoredWorkflow::fresh(definition));
                Ok(())
            }
        }
    }

    async fn get(&self, id: &WorkflowId, cancel: &CancellationToken) -> StoreResult<StoredWorkflow> {
        if cancel.is_cancelled() {
            return Err(StoreError::Cancelled);
        }
        self.snapshot(id)
    }

    async fn list(&self, cancel: &CancellationToken) -> StoreResult<Vec<StoredWorkflow>> {
        if cancel.is_cancelled() {
            return Err(StoreError::Cancelled);
        }
        Ok(self.records.iter().map(|entry| entry.value().clone()).collect())
    }

    async fn update(
        &self,
        definition: WorkflowDefinition,
        cancel: &CancellationToken,
    ) -> StoreResult<()> {
        let id = definition.id().clone();
        let result = retry(
            MAX_WRITE_ATTEMPTS,
            backoff_100ms_linear,
            is_conflict,
            || {
                let definition = definition.clone();
                let id = id.clone();
                async move {
                    if cancel.is_cancelled() {
                        return Err(StoreError::Cancelled);
                    }
                    let loaded = self.snapshot(&id)?;
                    if cancel.is_cancelled() {
                        return Err(StoreError::Cancelled);
                    }
                    self.commit(&id, loaded.version, |record| {
                        apply_definition(record, definition)
                    })
                }
            },
        )
        .await;

        match result {
            Ok(()) => Ok(()),
            Err(RetryError::Exhausted { attempts, .. }) => {
                tracing::warn!(workflow = %id, attempts, "definition update lost all retries");
                Err(StoreError::ConcurrencyExceeded { attempts })
            }
            Err(RetryError::Fatal(error)) => Err(error),
        }
    }

    async fn delete(&self, id: &WorkflowId, cancel: &CancellationToken) -> StoreResult<()> {
        if cancel.is_cancelled() {
            return Err(StoreError::Cancelled);
        }
        self.records
            .remove(id)
            .ok_or_else(|| StoreError::NotFound(id.clone()))?;
        Ok(())
    }

    async fn update_current_node(
        &self,
        id: &WorkflowId,
        node: Option<NodeId>,
        cancel: &CancellationToken,
    ) -> StoreResult<bool> {
        let result = retry(
            MAX_WRITE_ATTEMPTS,
            backoff_100ms_linear,
            is_conflict,
            || {
                let node = node.clone();
                async move {
                    if cancel.is_cancelled() {
                        return Err(StoreError::Cancelled);
                    }
                    let loaded = self.snapshot(id)?;
                    if cancel.is_cancelled() {
                        return Err(StoreError::Cancelled);
                    }
                    self.commit(id, loaded.version, |record| {
                        record.current_node = node;
                    })
                }
            },
        )
        .await;

        match result {
            Ok(()) => Ok(true),
            Err(RetryError::Exhausted { attempts, .. }) => {
                tracing::debug!(workflow = %id, attempts, "current-node update lost all retries");
                Ok(false)
            }
            Err(RetryError::Fatal(error)) => Err(error),
        }
    }

    async fn find_by_name(
        &self,
        pattern: &str,
        since: DateTime<Utc>,
        cancel: &CancellationToken,
    ) -> StoreResult<Vec<StoredWorkflow>> {
        if cancel.is_cancelled() {
            return Err(StoreError::Cancelled);
        }
        let mut matches: Vec<StoredWorkflow> = self
            .records
            .iter()
            .filter(|entry| {
                let record = entry.value();
                record.definition.name().as_str().contains(pattern) && record.created_at >= since
            })
            .map(|entry| entry.value().clone())
            .collect();
        matches.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(matches)
    }
}

/// File-backed workflow store: one JSON file per workflow
///
/// Writers are serialized by an internal async mutex; the version check still
/// rejects stale callers, and commits go through a temp file plus rename so a
/// cancelled or failed write never leaves a partial record.
pub struct FsWorkflowStore {
    directory: PathBuf,
    write_lock: tokio::sync::Mutex<()>,
}

impl FsWorkflowStore {
    /// Open a store rooted at the given directory, creating it if needed
    pub fn new(directory: impl Into<PathBuf>) -> StoreResult<Self> {
        let directory = directory.into();
        std::fs::create_dir_all(&directory)?;
        Ok(Self {
            directory,
            write_lock: tokio::sync::Mutex::new(()),
        })
    }

    fn record_path(&self, id: &WorkflowId) -> PathBuf {
        self.directory.join(format!("{}.json", id.as_str()))
    }

    fn load(&self, id: &WorkflowId) -> StoreResult<StoredWorkflow> {
        let path = self.record_path(id);
        if !path.exists() {
            return Err(StoreError::NotFound(id.clone()));
        }
        let content = std::fs::read_to_string(&path)?;
        Ok(serde_json::from_str(&content)?)
    }

    fn write(&self, path: &Path, record: &StoredWorkflow) -> StoreResult<()> {
        let content = serde_json::to_string_pretty(record)?;
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, content)?;
        std::fs::rename(&tmp, path)?;
        Ok(())
    }

    fn commit(
        &self,
        id: &WorkflowId,
        expected_version: u64,
        mutate: impl FnOnce(&mut StoredWorkflow),
    ) -> StoreResult<()> {
        let mut record = self.load(id)?;
        if record.version != expected_version {
            return Err(StoreError::Conflict {
                workflow: id.clone(),
                expected: expected_version,
                found: record.version,
            });
        }
        mutate(&mut record);
        record.version += 1;
        record.updated_at = Utc::now();
        self.write(&self.record_path(id), &record)
    }
}

#[async_trait::async_trait]
impl WorkflowStore for FsWorkflowStore {
    async fn create(
        &self,
        definition: WorkflowDefinition,
        cancel: &CancellationToken,
    ) -> StoreResult<()> {
        let _guard = self.write_lock.lock().await;
        if cancel.is_cancelled() {
            return Err(StoreError::Cancelled);
        }
        let id = definition.id().clone();
        let path = self.record_path(&id);
        if path.exists() {
            return Err(StoreError::DuplicateWorkflow(id));
        }
        self.write(&path, &StoredWorkflow::fresh(definition))
    }

    async fn get(&self, id: &WorkflowId, cancel: &CancellationToken) -> StoreResult<StoredWorkflow> {
        if cancel.is_cancelled() {
            return Err(StoreError::Cancelled);
        }
        self.load(id)
    }

    async fn list(&self, cancel: &CancellationToken) -> StoreResult<Vec<StoredWorkflow>> {
        if cancel.is_cancelled() {
            return Err(StoreError::Cancelled);
        }
        let mut records = Vec::new();
        for entry in std::fs::read_dir(&self.directory)? {
            let path = entry?.path();
            if path.extension().and_then(|s| s.to_str()) == Some("json") {
                let content = std::fs::read_to_string(&path)?;
                records.push(serde_json::from_str(&content)?);
            }
        }
        Ok(records)
    }

    async fn update(
        &self,
        definition: WorkflowDefinition,
        cancel: &CancellationToken,
    ) -> StoreResult<()> {
        let id = definition.id().clone();
        let result = retry(
            MAX_WRITE_ATTEMPTS,
            backoff_100ms_linear,
            is_conflict,
            || {
                let definition = definition.clone();
                let id = id.clone();
                async move {
                    let _guard = self.write_lock.lock().await;
                    if cancel.is_cancelled() {
                        return Err(StoreError::Cancelled);
                    }
                    let loaded = self.load(&id)?;
                    self.commit(&id, loaded.version, |record| {
                        apply_definition(record, definition)
                    })
                }
            },
        )
        .await;

        match result {
            Ok(()) => Ok(()),
            Err(RetryError::Exhausted { attempts, .. }) => {
                Err(StoreError::ConcurrencyExceeded { attempts })
            }
            Err(RetryError::Fatal(error)) => Err(error),
        }
    }

    async fn delete(&self, id: &WorkflowId, cancel: &CancellationToken) -> StoreResult<()> {
        let _guard = self.write_lock.lock().await;
        if cancel.is_cancelled() {
            return Err(StoreError::Cancelled);
        }
        let path = self.record_path(id);
        if !path.exists() {
            return Err(StoreError::NotFound(id.clone()));
        }
        std::fs::remove_file(path)?;
        Ok(())
    }

    async fn update_current_node(
        &self,
        id: &WorkflowId,
        node: Option<NodeId>,
        cancel: &CancellationToken,
    ) -> StoreResult<bool> {
        let result = retry(
            MAX_WRITE_ATTEMPTS,
            backoff_100ms_linear,
            is_conflict,
            || {
                let node = node.clone();
                async move {
                    let _guard = self.write_lock.lock().await;
                    if cancel.is_cancelled() {
                        return Err(StoreError::Cancelled);
                    }
                    let loaded = self.load(id)?;
                    self.commit(id, loaded.version, |record| {
                        record.current_node = node;
                    })
                }
            },
        )
        .await;

        match result {
            Ok(()) => Ok(true),
            Err(RetryError::Exhausted { .. }) => Ok(false),
            Err(RetryError::Fatal(error)) => Err(error),
        }
    }

    async fn find_by_name(
        &self,
        pattern: &str,
        since: DateTime<Utc>,
        cancel: &CancellationToken,
    ) -> StoreResult<Vec<StoredWorkflow>> {
        let mut matches: Vec<StoredWorkflow> = self
            .list(cancel)
            .await?
            .into_iter()
            .filter(|record| {
                record.definition.name().as_str().contains(pattern) && record.created_at >= since
            })
            .collect();
        matches.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(matches)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definition::WorkflowName;
    use crate::node::WorkflowNode;
    use crate::transition::Transition;
    use std::sync::Arc;

    fn definition(id: &str, name: &str) -> WorkflowDefinition {
        WorkflowDefinition::new(
            WorkflowId::new(id),
            WorkflowName::new(name),
            vec![
                WorkflowNode::task("a", "A"),
                WorkflowNode::task("b", "B"),
                WorkflowNode::task("c", "C"),
            ],
            vec![
                Transition::unconditioned("a", "b"),
                Transition::unconditioned("b", "c"),
            ],
            vec![NodeId::new("a")],
        )
        .unwrap()
    }

    fn token() -> CancellationToken {
        CancellationToken::new()
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let store = MemoryWorkflowStore::new();
        store.create(definition("wf-1", "One"), &token()).await.unwrap();

        let record = store.get(&WorkflowId::new("wf-1"), &token()).await.unwrap();
        assert_eq!(record.definition.name().as_str(), "One");
        assert_eq!(record.current_node, None);
        assert_eq!(record.version, 0);
    }

    #[tokio::test]
    async fn test_create_duplicate_fails_and_update_succeeds() {
        let store = MemoryWorkflowStore::new();
        store.create(definition("wf-1", "One"), &token()).await.unwrap();

        let result = store.create(definition("wf-1", "One again"), &token()).await;
        assert!(matches!(result, Err(StoreError::DuplicateWorkflow(_))));

        store.update(definition("wf-1", "Replaced"), &token()).await.unwrap();
        let record = store.get(&WorkflowId::new("wf-1"), &token()).await.unwrap();
        assert_eq!(record.definition.name().as_str(), "Replaced");
        assert_eq!(record.version, 1);
    }

    #[tokio::test]
    async fn test_get_missing_fails() {
        let store = MemoryWorkflowStore::new();
        let result = store.get(&WorkflowId::new("ghost"), &token()).await;
        assert!(matches!(result, Err(StoreError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_update_missing_fails() {
        let store = MemoryWorkflowStore::new();
        let result = store.update(definition("ghost", "Ghost"), &token()).await;
        assert!(matches!(result, Err(StoreError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_update_current_node() {
        let store = MemoryWorkflowStore::new();
        let id = WorkflowId::new("wf-1");
        store.create(definition("wf-1", "One"), &token()).await.unwrap();

        let committed = store
            .update_current_node(&id, Some(NodeId::new("b")), &token())
            .await
            .unwrap();
        assert!(committed);

        let record = store.get(&id, &token()).await.unwrap();
        assert_eq!(record.current_node, Some(NodeId::new("b")));
        assert_eq!(record.version, 1);
    }

    #[tokio::test]
    async fn test_update_current_node_missing_workflow_fails() {
        let store = MemoryWorkflowStore::new();
        let result = store
            .update_current_node(&WorkflowId::new("ghost"), Some(NodeId::new("a")), &token())
            .await;
        assert!(matches!(result, Err(StoreError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_update_resets_position_when_node_vanishes() {
        let store = MemoryWorkflowStore::new();
        let id = WorkflowId::new("wf-1");
        store.create(definition("wf-1", "One"), &token()).await.unwrap();
        store
            .update_current_node(&id, Some(NodeId::new("c")), &token())
            .await
            .unwrap();

        // Replacement graph drops node "c"
        let replacement = WorkflowDefinition::new(
            id.clone(),
            WorkflowName::new("One v2"),
            vec![WorkflowNode::task("a", "A"), WorkflowNode::task("b", "B")],
            vec![Transition::unconditioned("a", "b")],
            vec![NodeId::new("a")],
        )
        .unwrap();
        store.update(replacement, &token()).await.unwrap();

        let record = store.get(&id, &token()).await.unwrap();
        assert_eq!(record.current_node, None);
    }

    #[tokio::test]
    async fn test_update_keeps_position_when_node_survives() {
        let store = MemoryWorkflowStore::new();
        let id = WorkflowId::new("wf-1");
        store.create(definition("wf-1", "One"), &token()).await.unwrap();
        store
            .update_current_node(&id, Some(NodeId::new("b")), &token())
            .await
            .unwrap();

        store.update(definition("wf-1", "One v2"), &token()).await.unwrap();
        let record = store.get(&id, &token()).await.unwrap();
        assert_eq!(record.current_node, Some(NodeId::new("b")));
    }

    #[tokio::test]
    async fn test_delete() {
        let store = MemoryWorkflowStore::new();
        let id = WorkflowId::new("wf-1");
        store.create(definition("wf-1", "One"), &token()).await.unwrap();
        store.delete(&id, &token()).await.unwrap();
        assert!(matches!(
            store.get(&id, &token()).await,
            Err(StoreError::NotFound(_))
        ));
        assert!(matches!(
            store.delete(&id, &token()).await,
            Err(StoreError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_find_by_name_filters_and_orders() {
        let store = MemoryWorkflowStore::new();
        store
            .create(definition("wf-1", "visit: museum"), &token())
            .await
            .unwrap();
        store
            .create(definition("wf-2", "visit: harbor"), &token())
            .await
            .unwrap();
        store
            .create(definition("wf-3", "checkout"), &token())
            .await
            .unwrap();

        let since = Utc::now() - chrono::Duration::hours(24);
        let found = store.find_by_name("visit", since, &token()).await.unwrap();
        assert_eq!(found.len(), 2);
        assert!(found[0].created_at >= found[1].created_at);

        let future = Utc::now() + chrono::Duration::hours(1);
        let none = store.find_by_name("visit", future, &token()).await.unwrap();
        assert!(none.is_empty());
    }

    #[tokio::test]
    async fn test_cancelled_token_rejects_writes() {
        let store = MemoryWorkflowStore::new();
        let cancelled = CancellationToken::new();
        cancelled.cancel();

        let result = store.create(definition("wf-1", "One"), &cancelled).await;
        assert!(matches!(result, Err(StoreError::Cancelled)));

        store.create(definition("wf-1", "One"), &token()).await.unwrap();
        let result = store
            .update_current_node(&WorkflowId::new("wf-1"), Some(NodeId::new("b")), &cancelled)
            .await;
        assert!(matches!(result, Err(StoreError::Cancelled)));

        // Nothing was partially written
        let record = store.get(&WorkflowId::new("wf-1"), &token()).await.unwrap();
        assert_eq!(record.current_node, None);
        assert_eq!(record.version, 0);
    }

    #[tokio::test]
    async fn test_racing_current_node_updates_never_throw() {
        let store = Arc::new(MemoryWorkflowStore::new());
        let id = WorkflowId::new("wf-race");
        store.create(definition("wf-race", "Race"), &token()).await.unwrap();

        let targets = ["a", "b", "c"];
        let mut handles = Vec::new();
        for target in targets {
            let store = store.clone();
            let id = id.clone();
            handles.push(tokio::spawn(async move {
                store
                    .update_current_node(&id, Some(NodeId::new(target)), &CancellationToken::new())
                    .await
            }));
        }

        let mut committed = 0;
        for handle in handles {
            // Each call returns a bool; none may surface a conflict error
            let outcome = handle.await.unwrap().unwrap();
            if outcome {
                committed += 1;
            }
        }
        assert!(committed >= 1);

        let record = store.get(&id, &token()).await.unwrap();
        let final_node = record.current_node.unwrap();
        assert!(targets.contains(&final_node.as_str()));
        assert_eq!(record.version, committed as u64);
    }

    #[tokio::test]
    async fn test_fs_store_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsWorkflowStore::new(dir.path()).unwrap();
        let id = WorkflowId::new("wf-fs");
        store.create(definition("wf-fs", "Durable"), &token()).await.unwrap();

        assert!(matches!(
            store.create(definition("wf-fs", "Durable"), &token()).await,
            Err(StoreError::DuplicateWorkflow(_))
        ));

        store
            .update_current_node(&id, Some(NodeId::new("b")), &token())
            .await
            .unwrap();

        // A second store over the same directory sees the committed state
        let reopened = FsWorkflowStore::new(dir.path()).unwrap();
        let record = reopened.get(&id, &token()).await.unwrap();
        assert_eq!(record.definition.name().as_str(), "Durable");
        assert_eq!(record.current_node, Some(NodeId::new("b")));
        assert_eq!(record.version, 1);

        reopened.delete(&id, &token()).await.unwrap();
        assert!(matches!(
            store.get(&id, &token()).await,
            Err(StoreError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_fs_store_list_and_find() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsWorkflowStore::new(dir.path()).unwrap();
        store.create(definition("wf-1", "visit: museum"), &token()).await.unwrap();
        store.create(definition("wf-2", "checkout"), &token()).await.unwrap();

        assert_eq!(store.list(&token()).await.unwrap().len(), 2);

        let since = Utc::now() - chrono::Duration::hours(1);
        let found = store.find_by_name("visit", since, &token()).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].definition.id().as_str(), "wf-1");
    }
}
