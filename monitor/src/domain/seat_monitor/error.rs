//! Failures surfaced by monitor operations.

use thiserror::Error;

use crate::domain::ports::{AvailabilitySourceError, MonitorStoreError, SeatNotifierError};
use crate::domain::{CourseId, PayloadParseError};

/// Errors raised while evaluating targets or running a cycle.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MonitorError {
    /// The payload did not contain a seat count for the course.
    #[error(transparent)]
    PayloadParse(#[from] PayloadParseError),
    /// The availability source offered no candidates.
    #[error("no availability payload available for course {course_id}")]
    NoPayloadAvailable {
        /// Course that was requested.
        course_id: CourseId,
    },
    /// The availability source failed.
    #[error(transparent)]
    Source(#[from] AvailabilitySourceError),
    /// The store failed.
    #[error(transparent)]
    Store(#[from] MonitorStoreError),
    /// A notification could not be delivered.
    #[error(transparent)]
    Notifier(#[from] SeatNotifierError),
}

impl MonitorError {
    /// Return whether the failure concerns the shared upstream session.
    ///
    /// Session failures affect every target, so scans stop early on them.
    #[must_use]
    pub const fn is_session_failure(&self) -> bool {
        match self {
            Self::Source(error) => error.is_session(),
            _ => false,
        }
    }
}
