//! Persistence contract for task and user documents.
//!
//! Every method is a single operation that is atomic with respect to the
//! document it touches. There are no multi-document transactions; callers
//! that need two documents to agree go through the
//! [`Reconciler`](crate::reconcile::Reconciler).

pub mod memory;

use std::future::Future;

use taskboard_proto::{Assignment, Task, TaskId, User, UserId, ValidatedTask, ValidatedUser};

pub use memory::MemoryStore;

/// Errors surfaced by an [`EntityStore`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// Another user already has this (normalised) email.
    #[error("a user with this email already exists")]
    DuplicateEmail,
    /// The backing store could not complete the operation.
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Selects task documents for reads and bulk updates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskFilter {
    /// Every task.
    All,
    /// Tasks whose `assignedUser` is the given user, complete or not.
    AssignedTo(UserId),
    /// Tasks with one of the given ids.
    Ids(Vec<TaskId>),
    /// Tasks with one of the given ids whose current assignee is exactly
    /// `assignee` (`None` = unassigned). Used to avoid clobbering a
    /// reassignment that landed in between.
    IdsAssignedTo {
        /// Candidate ids.
        ids: Vec<TaskId>,
        /// Required current assignee.
        assignee: Option<UserId>,
    },
    /// The single task `id`, only while its assignee and cached assignee
    /// name are still exactly the observed values.
    AssignmentUnchanged {
        /// Task id.
        id: TaskId,
        /// Observed `assignedUser`.
        assignee: Option<UserId>,
        /// Observed `assignedUserName`.
        assignee_name: String,
    },
}

impl TaskFilter {
    /// Returns `true` if `task` is selected by this filter.
    #[must_use]
    pub fn matches(&self, task: &Task) -> bool {
        match self {
            Self::All => true,
            Self::AssignedTo(user) => task.assigned_user.as_ref() == Some(user),
            Self::Ids(ids) => ids.contains(&task.id),
            Self::IdsAssignedTo { ids, assignee } => {
                ids.contains(&task.id) && task.assigned_user == *assignee
            }
            Self::AssignmentUnchanged {
                id,
                assignee,
                assignee_name,
            } => {
                task.id == *id
                    && task.assigned_user == *assignee
                    && task.assigned_user_name == *assignee_name
            }
        }
    }
}

/// Client-controlled fields of a task, ready to be written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskFields {
    /// Name.
    pub name: String,
    /// Description.
    pub description: String,
    /// Deadline.
    pub deadline: chrono::DateTime<chrono::Utc>,
    /// Completion flag.
    pub completed: bool,
    /// Resolved assignee and cached name.
    pub assignment: Assignment,
}

impl TaskFields {
    /// Combines a validated draft with an assignment resolved against the
    /// live user collection. The draft's own `assigned_user` is superseded.
    #[must_use]
    pub fn new(task: ValidatedTask, assignment: Assignment) -> Self {
        Self {
            name: task.name,
            description: task.description,
            deadline: task.deadline,
            completed: task.completed,
            assignment,
        }
    }
}

/// Client-controlled fields of a user, ready to be written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserFields {
    /// Name.
    pub name: String,
    /// Normalised email.
    pub email: String,
    /// Claimed task ids, already filtered to incomplete existing tasks.
    pub pending_tasks: Vec<TaskId>,
}

impl UserFields {
    /// Combines a validated draft with its normalised pending list.
    #[must_use]
    pub fn new(user: ValidatedUser, pending_tasks: Vec<TaskId>) -> Self {
        Self {
            name: user.name,
            email: user.email,
            pending_tasks,
        }
    }
}

/// Document store holding the `tasks` and `users` collections.
///
/// Implementations must make each call atomic for the document(s) it
/// writes. `add_pending_task` and `remove_pending_task` are set operations
/// and must be idempotent; both return whether the set actually changed.
pub trait EntityStore: Send + Sync {
    /// Point lookup of a task.
    fn get_task(&self, id: &TaskId)
    -> impl Future<Output = Result<Option<Task>, StoreError>> + Send;

    /// Point lookup of a user.
    fn get_user(&self, id: &UserId)
    -> impl Future<Output = Result<Option<User>, StoreError>> + Send;

    /// Tasks matching `filter`, oldest first.
    fn find_tasks(
        &self,
        filter: &TaskFilter,
    ) -> impl Future<Output = Result<Vec<Task>, StoreError>> + Send;

    /// All users, oldest first.
    fn find_users(&self) -> impl Future<Output = Result<Vec<User>, StoreError>> + Send;

    /// Number of tasks matching `filter`.
    fn count_tasks(
        &self,
        filter: &TaskFilter,
    ) -> impl Future<Output = Result<usize, StoreError>> + Send;

    /// Number of users.
    fn count_users(&self) -> impl Future<Output = Result<usize, StoreError>> + Send;

    /// Inserts a new task, assigning its id and creation time.
    fn create_task(
        &self,
        fields: TaskFields,
    ) -> impl Future<Output = Result<Task, StoreError>> + Send;

    /// Inserts a new user. Fails with [`StoreError::DuplicateEmail`] if the
    /// email is taken.
    fn create_user(
        &self,
        fields: UserFields,
    ) -> impl Future<Output = Result<User, StoreError>> + Send;

    /// Replaces a task's client-controlled fields. `None` if it does not exist.
    fn update_task(
        &self,
        id: &TaskId,
        fields: TaskFields,
    ) -> impl Future<Output = Result<Option<Task>, StoreError>> + Send;

    /// Replaces a user's client-controlled fields. `None` if it does not
    /// exist; [`StoreError::DuplicateEmail`] if another user has the email.
    fn update_user(
        &self,
        id: &UserId,
        fields: UserFields,
    ) -> impl Future<Output = Result<Option<User>, StoreError>> + Send;

    /// Adds `task` to `user`'s pending set. `false` if already present or
    /// the user does not exist.
    fn add_pending_task(
        &self,
        user: &UserId,
        task: &TaskId,
    ) -> impl Future<Output = Result<bool, StoreError>> + Send;

    /// Removes `task` from `user`'s pending set. `false` if absent or the
    /// user does not exist.
    fn remove_pending_task(
        &self,
        user: &UserId,
        task: &TaskId,
    ) -> impl Future<Output = Result<bool, StoreError>> + Send;

    /// Sets the assignment of every task matching `filter`, returning how
    /// many documents changed.
    fn update_tasks(
        &self,
        filter: &TaskFilter,
        assignment: &Assignment,
    ) -> impl Future<Output = Result<usize, StoreError>> + Send;

    /// Deletes a task, returning the removed document.
    fn delete_task(&self, id: &TaskId)
    -> impl Future<Output = Result<Option<Task>, StoreError>> + Send;

    /// Deletes a user, returning the removed document.
    fn delete_user(&self, id: &UserId)
    -> impl Future<Output = Result<Option<User>, StoreError>> + Send;
}
