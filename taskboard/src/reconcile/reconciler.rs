//! Applies reference-write plans against an [`EntityStore`].

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use futures_util::future::join_all;
use taskboard_proto::{Assignment, TaskId, UserId};

use super::failures::{FailureLog, PartialReconciliationFailure};
use super::plan::{self, ReferenceWrite};
use super::{TaskMutation, UserMutation};
use crate::store::{EntityStore, StoreError, TaskFilter};

/// Outcome of reconciling one mutation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    /// Number of secondary writes planned.
    pub planned: usize,
    /// Number of documents those writes actually changed.
    pub changed: usize,
    /// Writes that still failed after the immediate retry.
    pub failures: Vec<PartialReconciliationFailure>,
}

impl ReconcileReport {
    /// Returns `true` if every planned write was applied.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Keeps `Task.assignedUser` and `User.pendingTasks` consistent.
///
/// Shared by all request handlers; holds no per-request state and takes no
/// locks of its own, relying on the store's per-document atomicity.
pub struct Reconciler<S> {
    pub(super) store: Arc<S>,
    pub(super) failures: FailureLog,
}

impl<S: EntityStore> Reconciler<S> {
    /// Creates a reconciler with the default failure log capacity.
    #[must_use]
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            failures: FailureLog::default(),
        }
    }

    /// Creates a reconciler retaining at most `capacity` failures.
    #[must_use]
    pub fn with_failure_capacity(store: Arc<S>, capacity: usize) -> Self {
        Self {
            store,
            failures: FailureLog::with_capacity(capacity),
        }
    }

    /// The underlying store, for primary reads and writes.
    #[must_use]
    pub const fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Outstanding partial failures, oldest first.
    #[must_use]
    pub fn failures(&self) -> Vec<PartialReconciliationFailure> {
        self.failures.snapshot()
    }

    /// Resolves a requested assignee against the live user collection.
    ///
    /// A reference to a user that does not exist is normalised to
    /// unassigned rather than rejected. The cached name always comes from
    /// the user record.
    ///
    /// # Errors
    ///
    /// Propagates store failures; nothing has been written at this point.
    pub async fn resolve_assignment(
        &self,
        requested: Option<&UserId>,
    ) -> Result<Assignment, StoreError> {
        let Some(user_id) = requested else {
            return Ok(Assignment::unassigned());
        };
        match self.store.get_user(user_id).await? {
            Some(user) => Ok(Assignment::assigned_to(user.id, user.name)),
            None => {
                tracing::debug!(user_id = %user_id, "assignment to unknown user dropped");
                Ok(Assignment::unassigned())
            }
        }
    }

    /// Filters a claimed task list down to distinct ids of tasks that exist
    /// and are incomplete, preserving order.
    ///
    /// # Errors
    ///
    /// Propagates store failures; nothing has been written at this point.
    pub async fn normalize_pending_tasks(
        &self,
        requested: &[TaskId],
    ) -> Result<Vec<TaskId>, StoreError> {
        if requested.is_empty() {
            return Ok(Vec::new());
        }
        let open: HashSet<TaskId> = self
            .store
            .find_tasks(&TaskFilter::Ids(requested.to_vec()))
            .await?
            .into_iter()
            .filter(|t| !t.completed)
            .map(|t| t.id)
            .collect();

        let mut seen = HashSet::new();
        let kept: Vec<TaskId> = requested
            .iter()
            .filter(|id| open.contains(*id) && seen.insert(*id))
            .cloned()
            .collect();
        if kept.len() != requested.len() {
            tracing::debug!(
                requested = requested.len(),
                kept = kept.len(),
                "dropped unknown, completed or duplicate task ids from pending list"
            );
        }
        Ok(kept)
    }

    /// Brings `pendingTasks` in line with a committed task mutation.
    ///
    /// Never fails: writes that cannot be applied are logged and recorded
    /// for the sweep to repair.
    pub async fn reconcile_task_mutation(&self, mutation: TaskMutation<'_>) -> ReconcileReport {
        let writes = plan::plan_task_mutation(&mutation);
        self.apply_plan(&mutation.to_string(), &writes).await
    }

    /// Brings task assignments in line with a committed user mutation.
    ///
    /// Never fails: writes that cannot be applied are logged and recorded
    /// for the sweep to repair.
    pub async fn reconcile_user_mutation(&self, mutation: UserMutation<'_>) -> ReconcileReport {
        let context = mutation.to_string();
        let claimed = plan::claimed_task_ids(&mutation);

        let mut lookup_failure = None;
        let prior_owners = if claimed.is_empty() {
            HashMap::new()
        } else {
            match self.prior_owners(&claimed).await {
                Ok(owners) => owners,
                Err(e) => {
                    lookup_failure = Some(self.record_failure(
                        &context,
                        "evict claimed tasks from their previous owners",
                        &e,
                    ));
                    HashMap::new()
                }
            }
        };

        let writes = plan::plan_user_mutation(&mutation, &prior_owners);
        let mut report = self.apply_plan(&context, &writes).await;
        report.failures.extend(lookup_failure);
        report
    }

    async fn prior_owners(&self, claimed: &[TaskId]) -> Result<HashMap<TaskId, UserId>, StoreError> {
        let tasks = self
            .store
            .find_tasks(&TaskFilter::Ids(claimed.to_vec()))
            .await?;
        Ok(tasks
            .into_iter()
            .filter_map(|t| t.assigned_user.map(|owner| (t.id, owner)))
            .collect())
    }

    /// Issues every write of a plan concurrently. Writes in one plan target
    /// disjoint constraints, so their relative order does not matter.
    async fn apply_plan(&self, context: &str, writes: &[ReferenceWrite]) -> ReconcileReport {
        if writes.is_empty() {
            return ReconcileReport::default();
        }
        tracing::debug!(mutation = %context, writes = writes.len(), "applying reference writes");

        let outcomes = join_all(writes.iter().map(|w| self.apply_with_retry(w))).await;

        let mut report = ReconcileReport {
            planned: writes.len(),
            ..ReconcileReport::default()
        };
        for (write, outcome) in writes.iter().zip(outcomes) {
            match outcome {
                Ok(changed) => report.changed += changed,
                Err(e) => report
                    .failures
                    .push(self.record_failure(context, &write.to_string(), &e)),
            }
        }
        report
    }

    async fn apply_with_retry(&self, write: &ReferenceWrite) -> Result<usize, StoreError> {
        match self.apply(write).await {
            Ok(changed) => Ok(changed),
            Err(e) => {
                tracing::debug!(write = %write, error = %e, "reference write failed, retrying once");
                self.apply(write).await
            }
        }
    }

    pub(super) async fn apply(&self, write: &ReferenceWrite) -> Result<usize, StoreError> {
        match write {
            ReferenceWrite::AddPending { user, task } => {
                Ok(usize::from(self.store.add_pending_task(user, task).await?))
            }
            ReferenceWrite::RemovePending { user, task } => {
                Ok(usize::from(self.store.remove_pending_task(user, task).await?))
            }
            ReferenceWrite::AssignTasks { tasks, assignment } => {
                self.store
                    .update_tasks(&TaskFilter::Ids(tasks.clone()), assignment)
                    .await
            }
            ReferenceWrite::ReleaseTasks { tasks, from } => {
                let guarded = TaskFilter::IdsAssignedTo {
                    ids: tasks.clone(),
                    assignee: Some(from.clone()),
                };
                self.store
                    .update_tasks(&guarded, &Assignment::unassigned())
                    .await
            }
            ReferenceWrite::RenameAssignments { user, name } => {
                self.store
                    .update_tasks(
                        &TaskFilter::AssignedTo(user.clone()),
                        &Assignment::assigned_to(user.clone(), name.clone()),
                    )
                    .await
            }
            ReferenceWrite::ReleaseAllTasks { user } => {
                self.store
                    .update_tasks(
                        &TaskFilter::AssignedTo(user.clone()),
                        &Assignment::unassigned(),
                    )
                    .await
            }
        }
    }

    fn record_failure(
        &self,
        context: &str,
        operation: &str,
        error: &StoreError,
    ) -> PartialReconciliationFailure {
        let failure = self.failures.record(context, operation, error);
        tracing::warn!(
            mutation = %context,
            operation = %operation,
            error = %error,
            sequence = failure.sequence,
            "reference write failed; left for consistency sweep"
        );
        failure
    }
}
