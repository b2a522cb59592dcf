//! Response envelope and list query parameters.
//!
//! Every response body has the shape `{ "message": ..., "data": ... }`.
//! Errors carry `data: null`.

use serde::{Deserialize, Serialize};

/// The JSON body of every API response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope<T> {
    /// Short human-readable status (`OK`, `Created`, or the error text).
    pub message: String,
    /// Payload, `null` on error.
    pub data: Option<T>,
}

impl<T> Envelope<T> {
    /// A successful read or update.
    pub fn ok(data: T) -> Self {
        Self::with_message("OK", data)
    }

    /// A successful create.
    pub fn created(data: T) -> Self {
        Self::with_message("Created", data)
    }

    /// A successful delete, echoing the removed document.
    pub fn deleted(data: T) -> Self {
        Self::with_message("Deleted", data)
    }

    /// A success with a custom message.
    pub fn with_message(message: impl Into<String>, data: T) -> Self {
        Self {
            message: message.into(),
            data: Some(data),
        }
    }

    /// An error envelope.
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            data: None,
        }
    }
}

/// Query string accepted by the list endpoints.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ListQuery {
    /// `count=true` (any case) returns the number of documents instead.
    #[serde(default)]
    pub count: Option<String>,
}

impl ListQuery {
    /// Returns `true` if the caller asked for a count.
    #[must_use]
    pub fn wants_count(&self) -> bool {
        self.count
            .as_deref()
            .is_some_and(|c| c.trim().eq_ignore_ascii_case("true"))
    }
}
