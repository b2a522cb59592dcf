//! Integration tests for reconciliation under store failures.
//!
//! A [`FlakyStore`] wraps the in-memory store and fails secondary
//! (reference) writes on demand. Primary writes must still succeed, the
//! failures must be recorded, and the consistency sweep must repair them.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use taskboard::{
    Board, EntityStore, MemoryStore, StoreError, TaskFields, TaskFilter, UserFields,
};
use taskboard_proto::validate::DeadlineInput;
use taskboard_proto::{Assignment, Task, TaskDraft, TaskId, UNASSIGNED, User, UserDraft, UserId};

// ---------------------------------------------------------------------------
// Fault-injecting store
// ---------------------------------------------------------------------------

/// Delegates to a [`MemoryStore`], failing the next `n` reference writes.
#[derive(Default)]
struct FlakyStore {
    inner: MemoryStore,
    failures_left: AtomicUsize,
    reference_calls: AtomicUsize,
}

impl FlakyStore {
    fn fail_next(&self, n: usize) {
        self.failures_left.store(n, Ordering::SeqCst);
    }

    fn heal(&self) {
        self.failures_left.store(0, Ordering::SeqCst);
    }

    fn reference_calls(&self) -> usize {
        self.reference_calls.load(Ordering::SeqCst)
    }

    fn trip(&self) -> Result<(), StoreError> {
        self.reference_calls.fetch_add(1, Ordering::SeqCst);
        let tripped = self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if tripped {
            Err(StoreError::Unavailable("injected fault".to_string()))
        } else {
            Ok(())
        }
    }
}

impl EntityStore for FlakyStore {
    async fn get_task(&self, id: &TaskId) -> Result<Option<Task>, StoreError> {
        self.inner.get_task(id).await
    }

    async fn get_user(&self, id: &UserId) -> Result<Option<User>, StoreError> {
        self.inner.get_user(id).await
    }

    async fn find_tasks(&self, filter: &TaskFilter) -> Result<Vec<Task>, StoreError> {
        self.inner.find_tasks(filter).await
    }

    async fn find_users(&self) -> Result<Vec<User>, StoreError> {
        self.inner.find_users().await
    }

    async fn count_tasks(&self, filter: &TaskFilter) -> Result<usize, StoreError> {
        self.inner.count_tasks(filter).await
    }

    async fn count_users(&self) -> Result<usize, StoreError> {
        self.inner.count_users().await
    }

    async fn create_task(&self, fields: TaskFields) -> Result<Task, StoreError> {
        self.inner.create_task(fields).await
    }

    async fn create_user(&self, fields: UserFields) -> Result<User, StoreError> {
        self.inner.create_user(fields).await
    }

    async fn update_task(
        &self,
        id: &TaskId,
        fields: TaskFields,
    ) -> Result<Option<Task>, StoreError> {
        self.inner.update_task(id, fields).await
    }

    async fn update_user(
        &self,
        id: &UserId,
        fields: UserFields,
    ) -> Result<Option<User>, StoreError> {
        self.inner.update_user(id, fields).await
    }

    async fn add_pending_task(&self, user: &UserId, task: &TaskId) -> Result<bool, StoreError> {
        self.trip()?;
        self.inner.add_pending_task(user, task).await
    }

    async fn remove_pending_task(
        &self,
        user: &UserId,
        task: &TaskId,
    ) -> Result<bool, StoreError> {
        self.trip()?;
        self.inner.remove_pending_task(user, task).await
    }

    async fn update_tasks(
        &self,
        filter: &TaskFilter,
        assignment: &Assignment,
    ) -> Result<usize, StoreError> {
        self.trip()?;
        self.inner.update_tasks(filter, assignment).await
    }

    async fn delete_task(&self, id: &TaskId) -> Result<Option<Task>, StoreError> {
        self.inner.delete_task(id).await
    }

    async fn delete_user(&self, id: &UserId) -> Result<Option<User>, StoreError> {
        self.inner.delete_user(id).await
    }
}

// ---------------------------------------------------------------------------
// Helper functions
// ---------------------------------------------------------------------------

fn new_board() -> (Arc<FlakyStore>, Board<FlakyStore>) {
    let store = Arc::new(FlakyStore::default());
    (Arc::clone(&store), Board::new(store))
}

fn task_draft(name: &str, assignee: Option<&UserId>) -> TaskDraft {
    TaskDraft {
        name: Some(name.to_string()),
        deadline: Some(DeadlineInput::Millis(1_800_000_000_000)),
        assigned_user: assignee.cloned(),
        ..TaskDraft::default()
    }
}

async fn create_user(board: &Board<FlakyStore>, name: &str) -> User {
    board
        .create_user(UserDraft {
            name: Some(name.to_string()),
            email: Some(format!("{name}@example.org")),
            pending_tasks: None,
        })
        .await
        .unwrap()
}

async fn pending_of(store: &FlakyStore, user: &UserId) -> Vec<TaskId> {
    store.get_user(user).await.unwrap().unwrap().pending_tasks
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[tokio::test]
async fn primary_write_survives_failed_reference_write() {
    let (store, board) = new_board();
    let u1 = create_user(&board, "ada").await;

    // Both the first attempt and the retry fail.
    store.fail_next(2);
    let t1 = board
        .create_task(task_draft("T1", Some(&u1.id)))
        .await
        .unwrap();

    assert_eq!(t1.assigned_user, Some(u1.id.clone()));
    assert!(store.get_task(&t1.id).await.unwrap().is_some());
    assert!(pending_of(&store, &u1.id).await.is_empty());

    let failures = board.reconciler().failures();
    assert_eq!(failures.len(), 1);
    assert!(failures[0].mutation.contains(t1.id.as_str()));
    assert!(failures[0].to_string().contains("injected fault"));
}

#[tokio::test]
async fn transient_failure_is_absorbed_by_retry() {
    let (store, board) = new_board();
    let u1 = create_user(&board, "ada").await;

    store.fail_next(1);
    let t1 = board
        .create_task(task_draft("T1", Some(&u1.id)))
        .await
        .unwrap();

    assert_eq!(pending_of(&store, &u1.id).await, vec![t1.id]);
    assert!(board.reconciler().failures().is_empty());
    assert_eq!(store.reference_calls(), 2);
}

#[tokio::test]
async fn sweep_repairs_missed_pending_entry_and_clears_log() {
    let (store, board) = new_board();
    let u1 = create_user(&board, "ada").await;

    store.fail_next(2);
    let t1 = board
        .create_task(task_draft("T1", Some(&u1.id)))
        .await
        .unwrap();
    assert_eq!(board.reconciler().failures().len(), 1);

    store.heal();
    let report = board.run_consistency_sweep().await.unwrap();

    assert_eq!(report.repairs, 1);
    assert_eq!(pending_of(&store, &u1.id).await, vec![t1.id]);
    assert!(board.reconciler().failures().is_empty());
}

#[tokio::test]
async fn failed_user_delete_leaves_dangling_reference_for_sweep() {
    let (store, board) = new_board();
    let u1 = create_user(&board, "ada").await;
    let t1 = board
        .create_task(task_draft("T1", Some(&u1.id)))
        .await
        .unwrap();

    store.fail_next(2);
    board.delete_user(&u1.id).await.unwrap();
    assert!(board.get_user(&u1.id).await.is_err());
    let dangling = store.get_task(&t1.id).await.unwrap().unwrap();
    assert_eq!(dangling.assigned_user, Some(u1.id.clone()));

    store.heal();
    let report = board.run_consistency_sweep().await.unwrap();
    assert_eq!(report.repairs, 1);

    let repaired = store.get_task(&t1.id).await.unwrap().unwrap();
    assert_eq!(repaired.assigned_user, None);
    assert_eq!(repaired.assigned_user_name, UNASSIGNED);
}

#[tokio::test]
async fn one_failed_write_does_not_block_the_others() {
    let (store, board) = new_board();
    let u1 = create_user(&board, "ada").await;
    let u2 = create_user(&board, "bea").await;
    let t1 = board
        .create_task(task_draft("T1", Some(&u1.id)))
        .await
        .unwrap();

    // Reassignment plans a remove and an add. Fail one of them twice; the
    // other must still land.
    store.fail_next(2);
    board
        .replace_task(&t1.id, task_draft("T1", Some(&u2.id)))
        .await
        .unwrap();

    let u1_pending = pending_of(&store, &u1.id).await;
    let u2_pending = pending_of(&store, &u2.id).await;
    let landed = usize::from(u1_pending.is_empty()) + usize::from(!u2_pending.is_empty());
    assert!(landed >= 1, "at least one reference write must land");
    assert!(!board.reconciler().failures().is_empty());

    store.heal();
    board.run_consistency_sweep().await.unwrap();
    assert!(pending_of(&store, &u1.id).await.is_empty());
    assert_eq!(pending_of(&store, &u2.id).await, vec![t1.id]);
    assert!(board.reconciler().failures().is_empty());
}

#[tokio::test]
async fn failure_log_is_bounded() {
    let store = Arc::new(FlakyStore::default());
    let board = Board::with_failure_capacity(Arc::clone(&store), 2);
    let u1 = create_user(&board, "ada").await;

    store.fail_next(usize::MAX);
    for i in 0..5 {
        board
            .create_task(task_draft(&format!("T{i}"), Some(&u1.id)))
            .await
            .unwrap();
    }

    let failures = board.reconciler().failures();
    assert_eq!(failures.len(), 2);
    assert!(failures[0].sequence < failures[1].sequence);
    assert_eq!(failures[1].sequence, 5);
}
