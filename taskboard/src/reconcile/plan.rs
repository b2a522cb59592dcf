//! Pure planning of secondary reference writes.
//!
//! Nothing here touches the store. Given the before/after states of a
//! mutation, these functions return the per-document writes that bring the
//! other side of the relationship back in line. Every write is idempotent,
//! so replaying a plan is harmless.

use std::collections::{HashMap, HashSet};

use taskboard_proto::{Assignment, Task, TaskId, User, UserId};

use super::{TaskMutation, UserMutation};

/// One idempotent, per-document (or per-filter) secondary write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReferenceWrite {
    /// Set-add `task` to `user.pendingTasks`.
    AddPending {
        /// Target user.
        user: UserId,
        /// Task id to add.
        task: TaskId,
    },
    /// Set-remove `task` from `user.pendingTasks`.
    RemovePending {
        /// Target user.
        user: UserId,
        /// Task id to remove.
        task: TaskId,
    },
    /// Point `tasks` at the assignee in `assignment` (last writer wins).
    AssignTasks {
        /// Tasks being claimed.
        tasks: Vec<TaskId>,
        /// The claiming user and their current name.
        assignment: Assignment,
    },
    /// Unassign `tasks`, but only those still assigned to `from`.
    ReleaseTasks {
        /// Tasks dropped from the user's pending list.
        tasks: Vec<TaskId>,
        /// The user releasing them.
        from: UserId,
    },
    /// Refresh `assignedUserName` on every task assigned to `user`.
    RenameAssignments {
        /// The renamed user.
        user: UserId,
        /// Their new name.
        name: String,
    },
    /// Unassign every task assigned to `user`, complete or not.
    ReleaseAllTasks {
        /// The deleted user.
        user: UserId,
    },
}

impl std::fmt::Display for ReferenceWrite {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AddPending { user, task } => write!(f, "add task {task} to pending of user {user}"),
            Self::RemovePending { user, task } => {
                write!(f, "remove task {task} from pending of user {user}")
            }
            Self::AssignTasks { tasks, assignment } => match &assignment.user {
                Some(user) => write!(f, "assign {} task(s) to user {user}", tasks.len()),
                None => write!(f, "unassign {} task(s)", tasks.len()),
            },
            Self::ReleaseTasks { tasks, from } => {
                write!(f, "release {} task(s) held by user {from}", tasks.len())
            }
            Self::RenameAssignments { user, name } => {
                write!(f, "rename assignments of user {user} to {name:?}")
            }
            Self::ReleaseAllTasks { user } => write!(f, "release all tasks of user {user}"),
        }
    }
}

/// Plans the `pendingTasks` changes implied by a task mutation.
///
/// - create: add to the assignee if the task is incomplete
/// - update: leave the old assignee on reassignment, join the new one if
///   incomplete; on a completion flip with the same assignee, remove or
///   re-add
/// - delete: remove from the assignee if the task was still pending
#[must_use]
pub fn plan_task_mutation(mutation: &TaskMutation<'_>) -> Vec<ReferenceWrite> {
    match *mutation {
        TaskMutation::Created(task) => add_to_owner(task),
        TaskMutation::Updated { previous, next } => plan_task_update(previous, next),
        TaskMutation::Deleted(task) => task
            .pending_owner()
            .map(|user| ReferenceWrite::RemovePending {
                user: user.clone(),
                task: task.id.clone(),
            })
            .into_iter()
            .collect(),
    }
}

fn add_to_owner(task: &Task) -> Vec<ReferenceWrite> {
    task.pending_owner()
        .map(|user| ReferenceWrite::AddPending {
            user: user.clone(),
            task: task.id.clone(),
        })
        .into_iter()
        .collect()
}

fn plan_task_update(previous: &Task, next: &Task) -> Vec<ReferenceWrite> {
    let task = &next.id;

    if previous.assigned_user != next.assigned_user {
        let mut writes: Vec<ReferenceWrite> = previous
            .assigned_user
            .iter()
            .map(|old| ReferenceWrite::RemovePending {
                user: old.clone(),
                task: task.clone(),
            })
            .collect();
        writes.extend(add_to_owner(next));
        return writes;
    }

    let Some(user) = &next.assigned_user else {
        return Vec::new();
    };
    match (previous.completed, next.completed) {
        (false, true) => vec![ReferenceWrite::RemovePending {
            user: user.clone(),
            task: task.clone(),
        }],
        (true, false) => vec![ReferenceWrite::AddPending {
            user: user.clone(),
            task: task.clone(),
        }],
        _ => Vec::new(),
    }
}

/// Plans the task-side changes implied by a user mutation.
///
/// `prior_owners` maps each newly claimed task id to the user it was
/// assigned to just before this mutation. Claimed tasks are taken over
/// (last writer wins) and dropped from their previous owner's pending list;
/// released tasks are unassigned only if still held by this user; a rename
/// is pushed to every task that caches the name; a delete unassigns
/// everything the user held.
#[must_use]
pub fn plan_user_mutation<S: std::hash::BuildHasher>(
    mutation: &UserMutation<'_>,
    prior_owners: &HashMap<TaskId, UserId, S>,
) -> Vec<ReferenceWrite> {
    match *mutation {
        UserMutation::Created(user) => claim(user, &user.pending_tasks, prior_owners),
        UserMutation::Updated { previous, next } => {
            let before: HashSet<&TaskId> = previous.pending_tasks.iter().collect();
            let after: HashSet<&TaskId> = next.pending_tasks.iter().collect();

            let released: Vec<TaskId> = previous
                .pending_tasks
                .iter()
                .filter(|id| !after.contains(id))
                .cloned()
                .collect();
            let claimed: Vec<TaskId> = next
                .pending_tasks
                .iter()
                .filter(|id| !before.contains(id))
                .cloned()
                .collect();

            let mut writes = Vec::new();
            if !released.is_empty() {
                writes.push(ReferenceWrite::ReleaseTasks {
                    tasks: released,
                    from: next.id.clone(),
                });
            }
            writes.extend(claim(next, &claimed, prior_owners));
            if previous.name != next.name {
                writes.push(ReferenceWrite::RenameAssignments {
                    user: next.id.clone(),
                    name: next.name.clone(),
                });
            }
            writes
        }
        UserMutation::Deleted(user) => vec![ReferenceWrite::ReleaseAllTasks {
            user: user.id.clone(),
        }],
    }
}

/// Ids that a user mutation takes over from other users, i.e. the ones whose
/// prior owners the caller must look up before planning.
#[must_use]
pub fn claimed_task_ids(mutation: &UserMutation<'_>) -> Vec<TaskId> {
    match *mutation {
        UserMutation::Created(user) => user.pending_tasks.clone(),
        UserMutation::Updated { previous, next } => next
            .pending_tasks
            .iter()
            .filter(|id| !previous.has_pending(id))
            .cloned()
            .collect(),
        UserMutation::Deleted(_) => Vec::new(),
    }
}

fn claim<S: std::hash::BuildHasher>(
    user: &User,
    tasks: &[TaskId],
    prior_owners: &HashMap<TaskId, UserId, S>,
) -> Vec<ReferenceWrite> {
    if tasks.is_empty() {
        return Vec::new();
    }
    let mut writes = vec![ReferenceWrite::AssignTasks {
        tasks: tasks.to_vec(),
        assignment: Assignment::assigned_to(user.id.clone(), user.name.clone()),
    }];
    writes.extend(tasks.iter().filter_map(|task| {
        prior_owners
            .get(task)
            .filter(|owner| **owner != user.id)
            .map(|owner| ReferenceWrite::RemovePending {
                user: owner.clone(),
                task: task.clone(),
            })
    }));
    writes
}
