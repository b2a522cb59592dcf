//! Taskboard core: the entity store contract and the reference reconciler.
//!
//! Tasks point at their assignee through `assignedUser`; users list their
//! incomplete tasks in `pendingTasks`. The two collections are written
//! independently with no multi-document transactions, so every mutation is
//! followed by a set of idempotent, per-document secondary writes computed
//! by [`reconcile`], and a periodic sweep repairs whatever a failed
//! secondary write left behind.

pub mod board;
pub mod reconcile;
pub mod store;

pub use board::{Board, BoardError, Entity};
pub use reconcile::{
    PartialReconciliationFailure, ReconcileReport, Reconciler, ReferenceWrite, SweepReport,
    TaskMutation, UserMutation,
};
pub use store::{EntityStore, MemoryStore, StoreError, TaskFields, TaskFilter, UserFields};
