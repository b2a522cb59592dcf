//! Bidirectional reference consistency between `Task.assignedUser` and
//! `User.pendingTasks`.
//!
//! A mutating request writes its primary document first and then hands the
//! before/after states to the [`Reconciler`], which plans the secondary
//! writes ([`plan`]) and applies them. Secondary writes are single
//! per-document set or field operations and are safe to repeat. If one
//! still fails after an immediate retry, the request succeeds anyway and
//! the gap is recorded as a [`PartialReconciliationFailure`] until the next
//! [`Reconciler::run_consistency_sweep`] closes it.

mod failures;
pub mod plan;
mod reconciler;
mod sweep;

use taskboard_proto::{Task, User};

pub use failures::{DEFAULT_FAILURE_LOG_CAPACITY, FailureLog, PartialReconciliationFailure};
pub use plan::ReferenceWrite;
pub use reconciler::{ReconcileReport, Reconciler};
pub use sweep::SweepReport;

/// A task mutation whose primary write has already committed.
#[derive(Debug, Clone, Copy)]
pub enum TaskMutation<'a> {
    /// A task was created in this state.
    Created(&'a Task),
    /// A task moved from `previous` to `next`.
    Updated {
        /// State read before the primary write.
        previous: &'a Task,
        /// State returned by the primary write.
        next: &'a Task,
    },
    /// A task was deleted; this is the removed document.
    Deleted(&'a Task),
}

/// A user mutation whose primary write has already committed.
#[derive(Debug, Clone, Copy)]
pub enum UserMutation<'a> {
    /// A user was created in this state.
    Created(&'a User),
    /// A user moved from `previous` to `next`.
    Updated {
        /// State read before the primary write.
        previous: &'a User,
        /// State returned by the primary write.
        next: &'a User,
    },
    /// A user was deleted; this is the removed document.
    Deleted(&'a User),
}

impl std::fmt::Display for TaskMutation<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Created(task) => write!(f, "create of task {}", task.id),
            Self::Updated { next, .. } => write!(f, "update of task {}", next.id),
            Self::Deleted(task) => write!(f, "delete of task {}", task.id),
        }
    }
}

impl std::fmt::Display for UserMutation<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Created(user) => write!(f, "create of user {}", user.id),
            Self::Updated { next, .. } => write!(f, "update of user {}", next.id),
            Self::Deleted(user) => write!(f, "delete of user {}", user.id),
        }
    }
}
