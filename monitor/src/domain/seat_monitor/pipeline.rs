//! Per-target pipeline shared by scans and immediate checks.

use tracing::{debug, info, warn};

use super::{MonitorError, SeatMonitor, TargetOutcome};
use crate::domain::ports::{CandidateRequest, CourseOpenNotice};
use crate::domain::{
    CachedPayload, PayloadCandidate, TrackedTarget, parse_seat_reading, select_latest_candidate,
};

impl SeatMonitor {
    /// Refresh, parse, record, and notify for one target.
    ///
    /// A target newer than the cached payload always forces a refresh so it
    /// is never judged against data captured before it existed.
    pub(super) async fn evaluate_target(
        &self,
        target: &TrackedTarget,
        force_refresh: bool,
    ) -> Result<TargetOutcome, MonitorError> {
        let cached = self.store.cached_payload().await?;
        let refresh = force_refresh
            || cached
                .as_ref()
                .is_none_or(|payload| target.created_at > payload.generated_at);

        let mut payload = self.load_latest(target, refresh).await?;
        let reading = match parse_seat_reading(&payload.raw_payload, &target.course_id) {
            Ok(reading) => reading,
            Err(parse_error) if !refresh => {
                debug!(
                    course_id = %target.course_id,
                    error = %parse_error,
                    "parse failed on cached payload; forcing refresh"
                );
                payload = self.load_latest(target, true).await?;
                parse_seat_reading(&payload.raw_payload, &target.course_id)?
            }
            Err(parse_error) => return Err(parse_error.into()),
        };

        self.store
            .upsert_course(&target.course_id, &reading.display_name, reading.open_seats)
            .await?;

        if !reading.is_open() {
            debug!(
                course_id = %target.course_id,
                open_seats = reading.open_seats,
                "course still closed"
            );
            return Ok(TargetOutcome::StillClosed(reading));
        }

        self.notifier
            .notify_course_open(&CourseOpenNotice {
                to_email: target.email.clone(),
                course_id: target.course_id.clone(),
                display_name: reading.display_name.clone(),
                open_seats: reading.open_seats,
            })
            .await?;
        self.store.remove_tracked_target(target.id).await?;
        info!(
            target_id = %target.id,
            user_id = %target.user_id,
            course_id = %target.course_id,
            open_seats = reading.open_seats,
            "course open; subscriber notified and tracking stopped"
        );
        Ok(TargetOutcome::NotifiedAndStopped(reading))
    }

    /// Collect candidates, keep the newest, and persist it as the cache.
    ///
    /// Only a live capture proves the session works; replayed payloads leave
    /// the session record alone.
    async fn load_latest(
        &self,
        target: &TrackedTarget,
        refresh: bool,
    ) -> Result<PayloadCandidate, MonitorError> {
        let request = CandidateRequest {
            course_id: target.course_id.clone(),
            force_refresh: refresh,
        };
        let batch = self.source.collect_candidates(&request).await?;
        if batch.captured {
            self.mark_session_ok().await;
        }

        let latest = select_latest_candidate(batch.candidates).ok_or_else(|| {
            MonitorError::NoPayloadAvailable {
                course_id: target.course_id.clone(),
            }
        })?;
        self.store
            .save_cached_payload(&CachedPayload::from_candidate(latest.clone()))
            .await?;
        Ok(latest)
    }

    pub(super) async fn mark_session_ok(&self) {
        if let Err(store_error) = self
            .store
            .mark_shared_session_ok(self.config.session_duration)
            .await
        {
            warn!(error = %store_error, "failed to record healthy shared session");
        }
    }
}
