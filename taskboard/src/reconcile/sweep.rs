//! Self-healing consistency sweep.
//!
//! Scans every task, derives what each user's `pendingTasks` should be, and
//! repairs the difference with the same idempotent per-document writes the
//! reconciler uses. Each repair re-reads the task it is about to act on, so
//! a sweep running alongside live traffic only ever moves state toward the
//! invariant.

use std::collections::{HashMap, HashSet};

use serde::Serialize;
use taskboard_proto::{Assignment, Task, TaskId, UNASSIGNED, UserId};

use super::Reconciler;
use crate::store::{EntityStore, StoreError, TaskFilter};

/// Summary of one sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SweepReport {
    /// Documents changed to restore consistency.
    pub repairs: usize,
    /// Tasks examined.
    pub tasks_scanned: usize,
    /// Users examined.
    pub users_scanned: usize,
}

impl<S: EntityStore> Reconciler<S> {
    /// Scans all tasks and users and repairs every broken reference.
    ///
    /// Repairs, in order:
    /// - tasks pointing at a user that no longer exists are unassigned
    /// - stale `assignedUserName` caches are refreshed
    /// - incomplete assigned tasks missing from their user's pending list
    ///   are added
    /// - pending entries naming a task that is gone, completed, or assigned
    ///   elsewhere are removed
    ///
    /// Failure-log entries recorded before the sweep started are cleared
    /// once it finishes. Running it twice with no traffic in between makes
    /// zero repairs the second time.
    ///
    /// # Errors
    ///
    /// Stops at the first store failure. Repairs made up to that point stay
    /// in place; the next sweep picks up the rest.
    pub async fn run_consistency_sweep(&self) -> Result<SweepReport, StoreError> {
        let watermark = self.failures.last_sequence();
        // Tasks first: every assignee in this snapshot existed before the
        // user snapshot below was taken, so a miss there is a real delete.
        let tasks = self.store.find_tasks(&TaskFilter::All).await?;
        let users = self.store.find_users().await?;
        let names: HashMap<&UserId, &str> =
            users.iter().map(|u| (&u.id, u.name.as_str())).collect();

        let mut repairs = 0;
        let mut expected: HashMap<&UserId, HashSet<&TaskId>> = HashMap::new();

        for task in &tasks {
            match &task.assigned_user {
                None if task.assigned_user_name == UNASSIGNED => continue,
                None => {}
                Some(user) => {
                    if let Some(name) = names.get(user) {
                        if !task.completed {
                            expected.entry(user).or_default().insert(&task.id);
                        }
                        if task.assigned_user_name == *name {
                            continue;
                        }
                    }
                }
            }
            repairs += self.repair_assignment(task).await?;
        }

        for user in &users {
            let wanted = expected.get(&user.id);
            let held: HashSet<&TaskId> = user.pending_tasks.iter().collect();

            let missing = wanted
                .into_iter()
                .flatten()
                .filter(|id| !held.contains(**id));
            for task_id in missing {
                if self.still_pending_for(task_id, &user.id).await?
                    && self.store.add_pending_task(&user.id, task_id).await?
                {
                    tracing::debug!(task_id = %task_id, user_id = %user.id, "restored pending entry");
                    repairs += 1;
                }
            }

            let stale = user
                .pending_tasks
                .iter()
                .filter(|id| wanted.is_none_or(|w| !w.contains(id)));
            for task_id in stale {
                if !self.still_pending_for(task_id, &user.id).await?
                    && self.store.remove_pending_task(&user.id, task_id).await?
                {
                    tracing::debug!(task_id = %task_id, user_id = %user.id, "removed stale pending entry");
                    repairs += 1;
                }
            }
        }

        self.failures.clear_through(watermark);

        let report = SweepReport {
            repairs,
            tasks_scanned: tasks.len(),
            users_scanned: users.len(),
        };
        if repairs > 0 {
            tracing::info!(
                repairs,
                tasks = report.tasks_scanned,
                users = report.users_scanned,
                "consistency sweep repaired references"
            );
        } else {
            tracing::debug!(
                tasks = report.tasks_scanned,
                users = report.users_scanned,
                "consistency sweep found nothing to repair"
            );
        }
        Ok(report)
    }

    /// Rewrites a task's assignment from the live user record. The write
    /// only lands if the task still carries the assignment observed in the
    /// snapshot, so a concurrent reassignment or rename wins.
    async fn repair_assignment(&self, task: &Task) -> Result<usize, StoreError> {
        let live = match &task.assigned_user {
            Some(user) => self.store.get_user(user).await?,
            None => None,
        };
        let wanted = live.map_or_else(Assignment::unassigned, |user| {
            Assignment::assigned_to(user.id, user.name)
        });
        if wanted.user == task.assigned_user && wanted.user_name == task.assigned_user_name {
            return Ok(0);
        }
        if wanted.user.is_none() {
            tracing::debug!(task_id = %task.id, "clearing dangling assignment");
        } else {
            tracing::debug!(task_id = %task.id, name = %wanted.user_name, "refreshing assignee name");
        }

        let guarded = TaskFilter::AssignmentUnchanged {
            id: task.id.clone(),
            assignee: task.assigned_user.clone(),
            assignee_name: task.assigned_user_name.clone(),
        };
        self.store.update_tasks(&guarded, &wanted).await
    }

    async fn still_pending_for(&self, task: &TaskId, user: &UserId) -> Result<bool, StoreError> {
        Ok(self
            .store
            .get_task(task)
            .await?
            .is_some_and(|t| t.is_pending_for(user)))
    }
}
