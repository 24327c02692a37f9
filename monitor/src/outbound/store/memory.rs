//! In-process monitor store.

use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::Duration;
use mockable::Clock;

use super::state::{MonitorState, session_expiry};
use crate::domain::ports::{MonitorStore, MonitorStoreError, SessionExpiry};
use crate::domain::{
    CachedPayload, Course, CourseId, SharedSession, TrackedTarget, TrackedTargetId, UserId,
};

/// [`MonitorStore`] backed by a mutex-guarded [`MonitorState`].
pub struct InMemoryMonitorStore {
    state: Mutex<MonitorState>,
    clock: Arc<dyn Clock>,
}

impl InMemoryMonitorStore {
    /// Start with empty state.
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self::with_state(clock, MonitorState::default())
    }

    /// Start from existing state.
    #[must_use]
    pub fn with_state(clock: Arc<dyn Clock>, state: MonitorState) -> Self {
        Self {
            state: Mutex::new(state),
            clock,
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, MonitorState>, MonitorStoreError> {
        self.state
            .lock()
            .map_err(|_| MonitorStoreError::query("monitor state lock poisoned"))
    }

    /// Track `course_id` for `user_id`; `None` when already tracked.
    ///
    /// # Errors
    ///
    /// Returns [`MonitorStoreError::Query`] when the state lock is poisoned.
    pub fn track_course(
        &self,
        user_id: UserId,
        course_id: CourseId,
        email: impl Into<String>,
    ) -> Result<Option<TrackedTarget>, MonitorStoreError> {
        let now = self.clock.utc();
        Ok(self.lock()?.track(user_id, course_id, email.into(), now))
    }

    /// Stop tracking; returns whether a target was removed.
    ///
    /// # Errors
    ///
    /// Returns [`MonitorStoreError::Query`] when the state lock is poisoned.
    pub fn untrack_course(
        &self,
        user_id: UserId,
        course_id: &CourseId,
    ) -> Result<bool, MonitorStoreError> {
        Ok(self.lock()?.untrack(user_id, course_id))
    }

    /// Course fact recorded for `course_id`.
    ///
    /// # Errors
    ///
    /// Returns [`MonitorStoreError::Query`] when the state lock is poisoned.
    pub fn course(&self, course_id: &CourseId) -> Result<Option<Course>, MonitorStoreError> {
        Ok(self.lock()?.courses.get(course_id).cloned())
    }

    /// Copy of the whole state.
    ///
    /// # Errors
    ///
    /// Returns [`MonitorStoreError::Query`] when the state lock is poisoned.
    pub fn snapshot(&self) -> Result<MonitorState, MonitorStoreError> {
        Ok(self.lock()?.clone())
    }
}

#[async_trait]
impl MonitorStore for InMemoryMonitorStore {
    async fn shared_session(&self) -> Result<Option<SharedSession>, MonitorStoreError> {
        Ok(self.lock()?.shared_session.clone())
    }

    async fn mark_shared_session_expired(
        &self,
        reason: &str,
    ) -> Result<SessionExpiry, MonitorStoreError> {
        let now = self.clock.utc();
        Ok(self.lock()?.mark_expired(reason, now))
    }

    async fn mark_shared_session_ok(
        &self,
        session_duration: Duration,
    ) -> Result<(), MonitorStoreError> {
        let now = self.clock.utc();
        let expires_at = session_expiry(now, session_duration)?;
        self.lock()?.mark_ok(expires_at, now);
        Ok(())
    }

    async fn list_tracked_targets(&self) -> Result<Vec<TrackedTarget>, MonitorStoreError> {
        Ok(self.lock()?.tracked_targets.clone())
    }

    async fn find_tracked_target(
        &self,
        user_id: UserId,
        course_id: &CourseId,
    ) -> Result<Option<TrackedTarget>, MonitorStoreError> {
        Ok(self.lock()?.find_target(user_id, course_id).cloned())
    }

    async fn cached_payload(&self) -> Result<Option<CachedPayload>, MonitorStoreError> {
        Ok(self.lock()?.cached_payload.clone())
    }

    async fn save_cached_payload(&self, payload: &CachedPayload) -> Result<(), MonitorStoreError> {
        self.lock()?.cached_payload = Some(payload.clone());
        Ok(())
    }

    async fn upsert_course(
        &self,
        course_id: &CourseId,
        display_name: &str,
        open_seats: i64,
    ) -> Result<(), MonitorStoreError> {
        let now = self.clock.utc();
        self.lock()?
            .upsert_course(course_id, display_name, open_seats, now);
        Ok(())
    }

    async fn remove_tracked_target(
        &self,
        target_id: TrackedTargetId,
    ) -> Result<(), MonitorStoreError> {
        self.lock()?.remove_target(target_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    //! Port behaviour of the in-memory store.

    use super::*;
    use crate::domain::SessionState;
    use crate::test_support::{MutableClock, reference_time};
    use rstest::{fixture, rstest};

    #[fixture]
    fn clock() -> Arc<MutableClock> {
        Arc::new(MutableClock::new(reference_time()))
    }

    #[rstest]
    #[tokio::test]
    async fn session_expiry_is_idempotent(clock: Arc<MutableClock>) {
        let store = InMemoryMonitorStore::new(clock);
        store
            .mark_shared_session_ok(Duration::minutes(90))
            .await
            .expect("mark ok");

        let first = store
            .mark_shared_session_expired("lapsed")
            .await
            .expect("first expiry");
        let second = store
            .mark_shared_session_expired("lapsed")
            .await
            .expect("second expiry");

        assert!(!first.was_already_expired);
        assert!(second.was_already_expired);
    }

    #[rstest]
    #[tokio::test]
    async fn targets_list_in_creation_order(clock: Arc<MutableClock>) {
        let store = InMemoryMonitorStore::new(clock.clone());
        let user = UserId::new(1).expect("user");
        for raw in ["B2", "A1", "C3"] {
            clock.advance_minutes(1);
            store
                .track_course(user, CourseId::new(raw).expect("course"), "u@example.com")
                .expect("track")
                .expect("new target");
        }

        let listed: Vec<String> = store
            .list_tracked_targets()
            .await
            .expect("list")
            .into_iter()
            .map(|target| target.course_id.to_string())
            .collect();
        assert_eq!(listed, ["B2", "A1", "C3"]);
    }

    #[rstest]
    #[tokio::test]
    async fn course_upsert_overwrites_fact(clock: Arc<MutableClock>) {
        let store = InMemoryMonitorStore::new(clock.clone());
        let course = CourseId::new("ABC123").expect("course");
        store.upsert_course(&course, "CS 101", 0).await.expect("first");
        clock.advance_minutes(5);
        store.upsert_course(&course, "CS 101", 3).await.expect("second");

        let fact = store.course(&course).expect("read").expect("fact");
        assert_eq!(fact.open_seats, 3);
        assert_eq!(fact.updated_at, reference_time() + Duration::minutes(5));
    }

    #[rstest]
    #[tokio::test]
    async fn overflowing_session_duration_is_rejected(clock: Arc<MutableClock>) {
        let store = InMemoryMonitorStore::new(clock);
        store
            .mark_shared_session_expired("lapsed")
            .await
            .expect("expire");

        let error = store
            .mark_shared_session_ok(Duration::MAX)
            .await
            .expect_err("duration overflows");

        assert!(matches!(error, MonitorStoreError::Query { .. }));
        let session = store
            .snapshot()
            .expect("snapshot")
            .shared_session
            .expect("session recorded");
        assert_eq!(session.state, SessionState::Expired);
    }
}
