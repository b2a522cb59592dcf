//! User documents and the request body used to create or replace them.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{TaskId, UserId};
use crate::validate::{ValidationError, is_valid_email, normalize_email};

/// A user document as stored and returned by the API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Store-assigned identifier.
    pub id: UserId,
    /// Non-empty display name, copied into `assignedUserName` of tasks.
    pub name: String,
    /// Trimmed, lowercased, unique across users.
    pub email: String,
    /// Ids of the incomplete tasks assigned to this user. A set: no
    /// duplicates, order carries no meaning.
    #[serde(default)]
    pub pending_tasks: Vec<TaskId>,
    /// Creation time.
    pub date_created: DateTime<Utc>,
}

impl User {
    /// Returns `true` if `task` is listed in `pending_tasks`.
    #[must_use]
    pub fn has_pending(&self, task: &TaskId) -> bool {
        self.pending_tasks.contains(task)
    }
}

/// Body of `POST /api/users` and `PUT /api/users/{id}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserDraft {
    /// Required.
    #[serde(default)]
    pub name: Option<String>,
    /// Required; normalised before storage.
    #[serde(default)]
    pub email: Option<String>,
    /// Tasks this user claims. Defaults to none.
    #[serde(default)]
    pub pending_tasks: Option<Vec<TaskId>>,
}

/// A user draft that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedUser {
    /// Trimmed, non-empty name.
    pub name: String,
    /// Normalised email.
    pub email: String,
    /// Claimed task ids with duplicates collapsed, first occurrence kept.
    pub pending_tasks: Vec<TaskId>,
}

impl UserDraft {
    /// Checks required fields, normalises the email and dedups the claimed
    /// task list.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::UserFieldsMissing`] when name or email is
    /// empty and [`ValidationError::InvalidEmail`] for a malformed email.
    pub fn validate(self) -> Result<ValidatedUser, ValidationError> {
        let name = self
            .name
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty());
        let email = self
            .email
            .map(|e| normalize_email(&e))
            .filter(|e| !e.is_empty());
        let (Some(name), Some(email)) = (name, email) else {
            return Err(ValidationError::UserFieldsMissing);
        };
        if !is_valid_email(&email) {
            return Err(ValidationError::InvalidEmail);
        }

        Ok(ValidatedUser {
            name,
            email,
            pending_tasks: dedup_task_ids(self.pending_tasks.unwrap_or_default()),
        })
    }
}

/// Collapses duplicate ids, keeping the first occurrence of each.
#[must_use]
pub fn dedup_task_ids(ids: Vec<TaskId>) -> Vec<TaskId> {
    let mut seen = HashSet::with_capacity(ids.len());
    ids.into_iter().filter(|id| seen.insert(id.clone())).collect()
}
