//! Persisted monitor state shared by the in-memory and file stores.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::ports::{MonitorStoreError, SessionExpiry};
use crate::domain::{
    CachedPayload, Course, CourseId, SessionState, SharedSession, TrackedTarget, TrackedTargetId,
    UserId,
};

/// Expiry of a session validated at `now` and trusted for `duration`.
pub(super) fn session_expiry(
    now: DateTime<Utc>,
    duration: Duration,
) -> Result<DateTime<Utc>, MonitorStoreError> {
    now.checked_add_signed(duration).ok_or_else(|| {
        MonitorStoreError::query(format!("session duration {duration} overflows the clock"))
    })
}

/// Everything a monitor store keeps.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorState {
    /// Singleton shared session record.
    pub shared_session: Option<SharedSession>,
    /// Singleton cached payload record.
    pub cached_payload: Option<CachedPayload>,
    /// Tracked targets in creation order.
    pub tracked_targets: Vec<TrackedTarget>,
    /// Course facts keyed by course id.
    pub courses: BTreeMap<CourseId, Course>,
}

impl MonitorState {
    pub(super) fn mark_expired(&mut self, reason: &str, now: DateTime<Utc>) -> SessionExpiry {
        let was_already_expired = self
            .shared_session
            .as_ref()
            .is_some_and(|session| session.state == SessionState::Expired);
        self.shared_session = Some(SharedSession::expired(reason, now));
        SessionExpiry {
            was_already_expired,
        }
    }

    pub(super) fn mark_ok(&mut self, expires_at: DateTime<Utc>, now: DateTime<Utc>) {
        self.shared_session = Some(SharedSession::ok(expires_at, now));
    }

    pub(super) fn find_target(&self, user_id: UserId, course_id: &CourseId) -> Option<&TrackedTarget> {
        self.tracked_targets
            .iter()
            .find(|target| target.user_id == user_id && &target.course_id == course_id)
    }

    /// Add a target unless the `(user, course)` pair is already tracked.
    pub(super) fn track(
        &mut self,
        user_id: UserId,
        course_id: CourseId,
        email: String,
        now: DateTime<Utc>,
    ) -> Option<TrackedTarget> {
        if self.find_target(user_id, &course_id).is_some() {
            return None;
        }
        let target = TrackedTarget {
            id: TrackedTargetId::random(),
            user_id,
            course_id,
            email,
            created_at: now,
        };
        self.tracked_targets.push(target.clone());
        Some(target)
    }

    pub(super) fn untrack(&mut self, user_id: UserId, course_id: &CourseId) -> bool {
        let before = self.tracked_targets.len();
        self.tracked_targets
            .retain(|target| !(target.user_id == user_id && &target.course_id == course_id));
        self.tracked_targets.len() != before
    }

    pub(super) fn remove_target(&mut self, target_id: TrackedTargetId) {
        self.tracked_targets.retain(|target| target.id != target_id);
    }

    pub(super) fn upsert_course(
        &mut self,
        course_id: &CourseId,
        display_name: &str,
        open_seats: i64,
        now: DateTime<Utc>,
    ) {
        self.courses.insert(
            course_id.clone(),
            Course {
                course_id: course_id.clone(),
                display_name: display_name.to_owned(),
                open_seats,
                updated_at: now,
            },
        );
    }
}
