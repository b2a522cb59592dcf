//! Request validation shared by the task and user drafts.

use std::sync::LazyLock;

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Rejection of a request body before anything is written.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// A task is missing its name or deadline.
    #[error("Task must include name and deadline")]
    TaskFieldsMissing,
    /// A user is missing its name or email.
    #[error("User must include name and email")]
    UserFieldsMissing,
    /// The email does not look like `local@domain.tld`.
    #[error("Email is invalid")]
    InvalidEmail,
    /// The deadline could not be interpreted as a point in time.
    #[error("Deadline is invalid")]
    InvalidDeadline,
}

static EMAIL_PATTERN: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^\S+@\S+\.\S+$").ok());

/// Trims and lowercases an email address.
///
/// Stored emails are always in this form, which is what makes the unique
/// constraint case-insensitive.
#[must_use]
pub fn normalize_email(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// Returns `true` if an (already normalised) email has a plausible shape.
#[must_use]
pub fn is_valid_email(email: &str) -> bool {
    EMAIL_PATTERN
        .as_ref()
        .is_some_and(|pattern| pattern.is_match(email))
}

/// A deadline as clients send it: RFC 3339 text, a bare `YYYY-MM-DD` date
/// (midnight UTC), or epoch milliseconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DeadlineInput {
    /// Milliseconds since the Unix epoch.
    Millis(i64),
    /// An RFC 3339 timestamp such as `2026-01-31T12:00:00Z`, or a date
    /// such as `2026-01-31`.
    Text(String),
}

impl DeadlineInput {
    /// Interprets the input as a UTC timestamp.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidDeadline`] for unparseable text or
    /// out-of-range millisecond values.
    pub fn to_datetime(&self) -> Result<DateTime<Utc>, ValidationError> {
        match self {
            Self::Millis(ms) => Utc
                .timestamp_millis_opt(*ms)
                .single()
                .ok_or(ValidationError::InvalidDeadline),
            Self::Text(text) => parse_deadline_text(text.trim()),
        }
    }
}

fn parse_deadline_text(text: &str) -> Result<DateTime<Utc>, ValidationError> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Ok(dt.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|midnight| midnight.and_utc())
        .ok_or(ValidationError::InvalidDeadline)
}
