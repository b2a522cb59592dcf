//! Application-layer operations on tasks and users.
//!
//! [`Board`] is what request handlers call. Each mutating operation follows
//! the same order: validate, read the prior state, perform the primary
//! write, then reconcile. Validation and not-found errors abort before any
//! write; once the primary write has committed the operation succeeds even
//! if reconciliation is incomplete.

use std::sync::Arc;

use taskboard_proto::{Task, TaskDraft, TaskId, User, UserDraft, UserId, ValidationError};

use crate::reconcile::{ReconcileReport, Reconciler, SweepReport, TaskMutation, UserMutation};
use crate::store::{EntityStore, StoreError, TaskFields, TaskFilter, UserFields};

/// The two document kinds, for error messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entity {
    /// A task document.
    Task,
    /// A user document.
    User,
}

impl std::fmt::Display for Entity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Task => write!(f, "Task"),
            Self::User => write!(f, "User"),
        }
    }
}

/// Errors surfaced to callers of [`Board`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BoardError {
    /// The request body is missing or has malformed required fields.
    #[error(transparent)]
    Validation(#[from] ValidationError),
    /// The id does not resolve to a document.
    #[error("{0} not found")]
    NotFound(Entity),
    /// Another user already has this email.
    #[error("A user with this email already exists")]
    DuplicateEmail,
    /// The store failed.
    #[error(transparent)]
    Store(StoreError),
}

impl From<StoreError> for BoardError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::DuplicateEmail => Self::DuplicateEmail,
            other => Self::Store(other),
        }
    }
}

/// Task and user operations with reference reconciliation built in.
pub struct Board<S> {
    reconciler: Reconciler<S>,
}

impl<S: EntityStore> Board<S> {
    /// Creates a board over `store`.
    #[must_use]
    pub fn new(store: Arc<S>) -> Self {
        Self {
            reconciler: Reconciler::new(store),
        }
    }

    /// Creates a board whose failure log keeps at most `capacity` entries.
    #[must_use]
    pub fn with_failure_capacity(store: Arc<S>, capacity: usize) -> Self {
        Self {
            reconciler: Reconciler::with_failure_capacity(store, capacity),
        }
    }

    /// The reconciler, for failure inspection and sweeps.
    #[must_use]
    pub const fn reconciler(&self) -> &Reconciler<S> {
        &self.reconciler
    }

    fn store(&self) -> &S {
        self.reconciler.store()
    }

    /// All tasks, oldest first.
    ///
    /// # Errors
    ///
    /// Returns [`BoardError::Store`] if the store fails.
    pub async fn list_tasks(&self) -> Result<Vec<Task>, BoardError> {
        Ok(self.store().find_tasks(&TaskFilter::All).await?)
    }

    /// Number of tasks.
    ///
    /// # Errors
    ///
    /// Returns [`BoardError::Store`] if the store fails.
    pub async fn count_tasks(&self) -> Result<usize, BoardError> {
        Ok(self.store().count_tasks(&TaskFilter::All).await?)
    }

    /// Fetches one task.
    ///
    /// # Errors
    ///
    /// Returns [`BoardError::NotFound`] for an unknown id.
    pub async fn get_task(&self, id: &TaskId) -> Result<Task, BoardError> {
        self.store()
            .get_task(id)
            .await?
            .ok_or(BoardError::NotFound(Entity::Task))
    }

    /// Creates a task. An assignee that does not exist is dropped.
    ///
    /// # Errors
    ///
    /// Returns [`BoardError::Validation`] for a bad draft.
    pub async fn create_task(&self, draft: TaskDraft) -> Result<Task, BoardError> {
        let task = draft.validate()?;
        let assignment = self
            .reconciler
            .resolve_assignment(task.assigned_user.as_ref())
            .await?;
        let created = self
            .store()
            .create_task(TaskFields::new(task, assignment))
            .await?;
        tracing::info!(task_id = %created.id, "task created");

        let report = self
            .reconciler
            .reconcile_task_mutation(TaskMutation::Created(&created))
            .await;
        log_reconciled(Entity::Task, &created.id, &report);
        Ok(created)
    }

    /// Replaces every client-controlled field of a task.
    ///
    /// # Errors
    ///
    /// Returns [`BoardError::Validation`] for a bad draft and
    /// [`BoardError::NotFound`] for an unknown id.
    pub async fn replace_task(&self, id: &TaskId, draft: TaskDraft) -> Result<Task, BoardError> {
        let task = draft.validate()?;
        let previous = self.get_task(id).await?;
        let assignment = self
            .reconciler
            .resolve_assignment(task.assigned_user.as_ref())
            .await?;
        let next = self
            .store()
            .update_task(id, TaskFields::new(task, assignment))
            .await?
            .ok_or(BoardError::NotFound(Entity::Task))?;
        tracing::info!(task_id = %id, "task updated");

        let report = self
            .reconciler
            .reconcile_task_mutation(TaskMutation::Updated {
                previous: &previous,
                next: &next,
            })
            .await;
        log_reconciled(Entity::Task, id, &report);
        Ok(next)
    }

    /// Deletes a task and returns it.
    ///
    /// # Errors
    ///
    /// Returns [`BoardError::NotFound`] for an unknown id.
    pub async fn delete_task(&self, id: &TaskId) -> Result<Task, BoardError> {
        let removed = self
            .store()
            .delete_task(id)
            .await?
            .ok_or(BoardError::NotFound(Entity::Task))?;
        tracing::info!(task_id = %id, "task deleted");

        let report = self
            .reconciler
            .reconcile_task_mutation(TaskMutation::Deleted(&removed))
            .await;
        log_reconciled(Entity::Task, id, &report);
        Ok(removed)
    }

    /// All users, oldest first.
    ///
    /// # Errors
    ///
    /// Returns [`BoardError::Store`] if the store fails.
    pub async fn list_users(&self) -> Result<Vec<User>, BoardError> {
        Ok(self.store().find_users().await?)
    }

    /// Number of users.
    ///
    /// # Errors
    ///
    /// Returns [`BoardError::Store`] if the store fails.
    pub async fn count_users(&self) -> Result<usize, BoardError> {
        Ok(self.store().count_users().await?)
    }

    /// Fetches one user.
    ///
    /// # Errors
    ///
    /// Returns [`BoardError::NotFound`] for an unknown id.
    pub async fn get_user(&self, id: &UserId) -> Result<User, BoardError> {
        self.store()
            .get_user(id)
            .await?
            .ok_or(BoardError::NotFound(Entity::User))
    }

    /// Creates a user, claiming the listed tasks.
    ///
    /// # Errors
    ///
    /// Returns [`BoardError::Validation`] for a bad draft and
    /// [`BoardError::DuplicateEmail`] if the email is taken.
    pub async fn create_user(&self, draft: UserDraft) -> Result<User, BoardError> {
        let user = draft.validate()?;
        let pending = self
            .reconciler
            .normalize_pending_tasks(&user.pending_tasks)
            .await?;
        let created = self
            .store()
            .create_user(UserFields::new(user, pending))
            .await?;
        tracing::info!(user_id = %created.id, "user created");

        let report = self
            .reconciler
            .reconcile_user_mutation(UserMutation::Created(&created))
            .await;
        log_reconciled(Entity::User, &created.id, &report);
        Ok(created)
    }

    /// Replaces every client-controlled field of a user.
    ///
    /// # Errors
    ///
    /// Returns [`BoardError::Validation`] for a bad draft,
    /// [`BoardError::NotFound`] for an unknown id and
    /// [`BoardError::DuplicateEmail`] if another user has the email.
    pub async fn replace_user(&self, id: &UserId, draft: UserDraft) -> Result<User, BoardError> {
        let user = draft.validate()?;
        let previous = self.get_user(id).await?;
        let pending = self
            .reconciler
            .normalize_pending_tasks(&user.pending_tasks)
            .await?;
        let next = self
            .store()
            .update_user(id, UserFields::new(user, pending))
            .await?
            .ok_or(BoardError::NotFound(Entity::User))?;
        tracing::info!(user_id = %id, "user updated");

        let report = self
            .reconciler
            .reconcile_user_mutation(UserMutation::Updated {
                previous: &previous,
                next: &next,
            })
            .await;
        log_reconciled(Entity::User, id, &report);
        Ok(next)
    }

    /// Deletes a user and returns it. Every task it held becomes unassigned.
    ///
    /// # Errors
    ///
    /// Returns [`BoardError::NotFound`] for an unknown id.
    pub async fn delete_user(&self, id: &UserId) -> Result<User, BoardError> {
        let removed = self
            .store()
            .delete_user(id)
            .await?
            .ok_or(BoardError::NotFound(Entity::User))?;
        tracing::info!(user_id = %id, "user deleted");

        let report = self
            .reconciler
            .reconcile_user_mutation(UserMutation::Deleted(&removed))
            .await;
        log_reconciled(Entity::User, id, &report);
        Ok(removed)
    }

    /// Runs the consistency sweep now.
    ///
    /// # Errors
    ///
    /// Returns [`BoardError::Store`] if the sweep is cut short.
    pub async fn run_consistency_sweep(&self) -> Result<SweepReport, BoardError> {
        Ok(self.reconciler.run_consistency_sweep().await?)
    }
}

fn log_reconciled(entity: Entity, id: &dyn std::fmt::Display, report: &ReconcileReport) {
    tracing::debug!(
        entity = %entity,
        id = %id,
        planned = report.planned,
        changed = report.changed,
        failed = report.failures.len(),
        "references reconciled"
    );
}
