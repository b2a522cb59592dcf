//! Task documents and the request body used to create or replace them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{TaskId, UserId};
use crate::validate::{DeadlineInput, ValidationError};

/// Value of `assignedUserName` when a task has no assignee.
pub const UNASSIGNED: &str = "unassigned";

/// A task document as stored and returned by the API.
///
/// `assigned_user` and `completed` are authoritative; the assignee's
/// `pendingTasks` list is an index derived from them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    /// Store-assigned identifier.
    pub id: TaskId,
    /// Non-empty display name.
    pub name: String,
    /// Free-form description (may be empty).
    #[serde(default)]
    pub description: String,
    /// When the task is due.
    pub deadline: DateTime<Utc>,
    /// Whether the task is done. Completed tasks are never pending.
    #[serde(default)]
    pub completed: bool,
    /// The assignee, serialised as `""` when unassigned.
    #[serde(default, with = "assignee_field")]
    pub assigned_user: Option<UserId>,
    /// Cached copy of the assignee's name, or [`UNASSIGNED`].
    pub assigned_user_name: String,
    /// Creation time.
    pub date_created: DateTime<Utc>,
}

impl Task {
    /// Returns the user whose `pendingTasks` must contain this task, if any.
    #[must_use]
    pub const fn pending_owner(&self) -> Option<&UserId> {
        if self.completed {
            None
        } else {
            self.assigned_user.as_ref()
        }
    }

    /// Returns `true` if this task belongs in `user`'s pending list.
    #[must_use]
    pub fn is_pending_for(&self, user: &UserId) -> bool {
        self.pending_owner() == Some(user)
    }
}

/// Who a task is assigned to, together with the cached display name.
///
/// Always built from a live user record (or as unassigned), never from
/// client-supplied names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assignment {
    /// The assignee, or `None` for unassigned.
    pub user: Option<UserId>,
    /// The assignee's current name, or [`UNASSIGNED`].
    pub user_name: String,
}

impl Assignment {
    /// The unassigned state.
    #[must_use]
    pub fn unassigned() -> Self {
        Self {
            user: None,
            user_name: UNASSIGNED.to_string(),
        }
    }

    /// An assignment to `user`, caching `name`.
    #[must_use]
    pub fn assigned_to(user: UserId, name: impl Into<String>) -> Self {
        Self {
            user: Some(user),
            user_name: name.into(),
        }
    }
}

/// Body of `POST /api/tasks` and `PUT /api/tasks/{id}`.
///
/// Every field is optional on the wire so that missing required fields turn
/// into a [`ValidationError`] rather than a deserialisation failure.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskDraft {
    /// Required.
    #[serde(default)]
    pub name: Option<String>,
    /// Defaults to empty.
    #[serde(default)]
    pub description: Option<String>,
    /// Required.
    #[serde(default)]
    pub deadline: Option<DeadlineInput>,
    /// Defaults to `false`.
    #[serde(default)]
    pub completed: Option<bool>,
    /// Requested assignee; `""` or absent means unassigned.
    #[serde(default, with = "assignee_field")]
    pub assigned_user: Option<UserId>,
    /// Accepted for compatibility and ignored: the name is always taken
    /// from the live user record.
    #[serde(default)]
    pub assigned_user_name: Option<String>,
}

/// A task draft that passed validation, with defaults filled in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedTask {
    /// Trimmed, non-empty name.
    pub name: String,
    /// Description.
    pub description: String,
    /// Deadline.
    pub deadline: DateTime<Utc>,
    /// Completion flag.
    pub completed: bool,
    /// Requested assignee, not yet checked for existence.
    pub assigned_user: Option<UserId>,
}

impl TaskDraft {
    /// Checks required fields and applies defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::TaskFieldsMissing`] when the name is empty
    /// or the deadline is absent, and [`ValidationError::InvalidDeadline`]
    /// when the deadline cannot be parsed.
    pub fn validate(self) -> Result<ValidatedTask, ValidationError> {
        let name = self
            .name
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty());
        let (Some(name), Some(deadline)) = (name, self.deadline) else {
            return Err(ValidationError::TaskFieldsMissing);
        };

        Ok(ValidatedTask {
            name,
            description: self.description.unwrap_or_default(),
            deadline: deadline.to_datetime()?,
            completed: self.completed.unwrap_or(false),
            assigned_user: self.assigned_user,
        })
    }
}

/// Serde adapter mapping `Option<UserId>` to the API's `""`-means-none form.
mod assignee_field {
    use serde::{Deserialize, Deserializer, Serializer};

    use crate::ids::UserId;

    pub fn serialize<S: Serializer>(value: &Option<UserId>, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(value.as_ref().map_or("", UserId::as_str))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<UserId>, D::Error> {
        let raw = Option::<String>::deserialize(d)?;
        Ok(raw
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .map(UserId::from))
    }
}
