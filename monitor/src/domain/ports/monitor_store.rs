//! Driven port for monitor persistence.
//!
//! The store owns the singleton shared-session and cached-payload records
//! alongside tracked targets and course facts. The monitor engine reads
//! every piece of state through this port on each call.

use async_trait::async_trait;
use chrono::Duration;

use super::define_port_error;
use crate::domain::{
    CachedPayload, CourseId, SharedSession, TrackedTarget, TrackedTargetId, UserId,
};

define_port_error! {
    /// Errors raised by monitor store adapters.
    pub enum MonitorStoreError {
        /// Backing storage could not be reached.
        Connection { message: String } =>
            "monitor store connection failed: {message}",
        /// Read or write failed during execution.
        Query { message: String } =>
            "monitor store query failed: {message}",
    }
}

/// Result of marking the shared session expired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionExpiry {
    /// True when the stored state was already `Expired` before the call.
    pub was_already_expired: bool,
}

/// Port for the state the seat monitor reads and writes.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MonitorStore: Send + Sync {
    /// Load the shared session record, if one exists.
    async fn shared_session(&self) -> Result<Option<SharedSession>, MonitorStoreError>;

    /// Record the shared session as expired with `reason`.
    ///
    /// Repeated calls while already expired report `was_already_expired`.
    async fn mark_shared_session_expired(
        &self,
        reason: &str,
    ) -> Result<SessionExpiry, MonitorStoreError>;

    /// Record the shared session as healthy for `session_duration` from now.
    async fn mark_shared_session_ok(
        &self,
        session_duration: Duration,
    ) -> Result<(), MonitorStoreError>;

    /// List every tracked target in creation order.
    async fn list_tracked_targets(&self) -> Result<Vec<TrackedTarget>, MonitorStoreError>;

    /// Find the target for one `(user, course)` pair.
    async fn find_tracked_target(
        &self,
        user_id: UserId,
        course_id: &CourseId,
    ) -> Result<Option<TrackedTarget>, MonitorStoreError>;

    /// Load the cached payload record, if one exists.
    async fn cached_payload(&self) -> Result<Option<CachedPayload>, MonitorStoreError>;

    /// Overwrite the cached payload record.
    async fn save_cached_payload(&self, payload: &CachedPayload) -> Result<(), MonitorStoreError>;

    /// Insert or refresh the course fact for `course_id`.
    async fn upsert_course(
        &self,
        course_id: &CourseId,
        display_name: &str,
        open_seats: i64,
    ) -> Result<(), MonitorStoreError>;

    /// Remove a tracked target; removing an absent target is not an error.
    async fn remove_tracked_target(
        &self,
        target_id: TrackedTargetId,
    ) -> Result<(), MonitorStoreError>;
}
