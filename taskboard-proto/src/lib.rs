//! Shared data model and wire definitions for the taskboard API.
//!
//! Both the core library and the HTTP server speak in these types. The JSON
//! representation uses camelCase field names (`assignedUser`,
//! `pendingTasks`, ...) so existing API clients keep working.

pub mod envelope;
pub mod ids;
pub mod task;
pub mod user;
pub mod validate;

pub use ids::{TaskId, UserId};
pub use task::{Assignment, Task, TaskDraft, UNASSIGNED, ValidatedTask};
pub use user::{User, UserDraft, ValidatedUser};
pub use validate::ValidationError;
