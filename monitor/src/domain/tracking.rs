//! Tracking subscriptions and their identifiers.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Validation errors returned by the identifier constructors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainValidationError {
    /// User identifiers must be strictly positive.
    #[error("user id must be a positive integer, got {value}")]
    NonPositiveUserId {
        /// Rejected raw value.
        value: i64,
    },
    /// User identifiers supplied as text must parse as integers.
    #[error("user id must be a positive integer, got '{value}'")]
    InvalidUserId {
        /// Rejected raw text.
        value: String,
    },
    /// Course identifiers must contain non-whitespace characters.
    #[error("course id must not be empty")]
    EmptyCourseId,
}

/// Stable identifier of a user subscribing to course alerts.
///
/// ## Invariants
/// - The wrapped value is strictly positive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct UserId(i64);

impl UserId {
    /// Validate and construct a [`UserId`].
    ///
    /// # Errors
    ///
    /// Returns [`DomainValidationError::NonPositiveUserId`] for zero or
    /// negative values.
    ///
    /// # Examples
    /// ```
    /// use seat_monitor::domain::UserId;
    ///
    /// assert!(UserId::new(7).is_ok());
    /// assert!(UserId::new(0).is_err());
    /// ```
    pub fn new(value: i64) -> Result<Self, DomainValidationError> {
        if value <= 0 {
            return Err(DomainValidationError::NonPositiveUserId { value });
        }
        Ok(Self(value))
    }

    /// Parse a user identifier from command-line text.
    ///
    /// # Errors
    ///
    /// Returns [`DomainValidationError::InvalidUserId`] when the trimmed text
    /// is not an integer, and [`DomainValidationError::NonPositiveUserId`]
    /// when it is not positive.
    pub fn parse(raw: &str) -> Result<Self, DomainValidationError> {
        let value = raw
            .trim()
            .parse::<i64>()
            .map_err(|_| DomainValidationError::InvalidUserId {
                value: raw.to_owned(),
            })?;
        Self::new(value)
    }

    /// Access the raw integer value.
    #[must_use]
    pub const fn get(self) -> i64 {
        self.0
    }
}

impl TryFrom<i64> for UserId {
    type Error = DomainValidationError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<UserId> for i64 {
    fn from(value: UserId) -> Self {
        value.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Upstream key of a course section (the "cart id").
///
/// ## Invariants
/// - Stored trimmed and non-empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CourseId(String);

impl CourseId {
    /// Trim and validate a course identifier.
    ///
    /// # Errors
    ///
    /// Returns [`DomainValidationError::EmptyCourseId`] for blank input.
    ///
    /// # Examples
    /// ```
    /// use seat_monitor::domain::CourseId;
    ///
    /// let id = CourseId::new("  ABC123 ").expect("valid id");
    /// assert_eq!(id.as_str(), "ABC123");
    /// assert!(CourseId::new("   ").is_err());
    /// ```
    pub fn new(raw: impl AsRef<str>) -> Result<Self, DomainValidationError> {
        let trimmed = raw.as_ref().trim();
        if trimmed.is_empty() {
            return Err(DomainValidationError::EmptyCourseId);
        }
        Ok(Self(trimmed.to_owned()))
    }

    /// Borrow the identifier text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl TryFrom<String> for CourseId {
    type Error = DomainValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<CourseId> for String {
    fn from(value: CourseId) -> Self {
        value.0
    }
}

impl AsRef<str> for CourseId {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl fmt::Display for CourseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier of one tracked (user, course) subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TrackedTargetId(Uuid);

impl TrackedTargetId {
    /// Generate a fresh random identifier.
    #[must_use]
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }

    /// Wrap an existing UUID.
    #[must_use]
    pub const fn from_uuid(value: Uuid) -> Self {
        Self(value)
    }

    /// Access the underlying UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for TrackedTargetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One subscription awaiting an open seat.
///
/// Stores keep at most one target per `(user_id, course_id)` pair. A target is
/// removed once the monitor has notified its subscriber.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackedTarget {
    /// Target identifier.
    pub id: TrackedTargetId,
    /// Owning user.
    pub user_id: UserId,
    /// Course being watched.
    pub course_id: CourseId,
    /// Subscriber address for the course-open notice.
    pub email: String,
    /// When the subscription was created.
    pub created_at: DateTime<Utc>,
}
