//! Shared-session checks, recovery, and owner escalation.

use tracing::{info, warn};

use super::{MonitorError, SeatMonitor, TargetOutcome};
use crate::domain::ports::{RecoveryOutcome, SessionExpiredNotice};
use crate::domain::{SessionState, SharedSession, TrackedTarget};

const CLOCK_EXPIRED_REASON: &str = "Shared session timed out by expiry timestamp.";
const INACTIVE_REASON: &str = "Shared session is not active.";
const OPERATOR_REASON: &str = "Operator requested a session refresh.";

/// How a target evaluation ended once session recovery was applied.
pub(super) enum Evaluation {
    Completed(TargetOutcome),
    Failed(MonitorError),
    /// Recovery failed or the retry hit the session again; already escalated.
    SessionLost,
}

impl SeatMonitor {
    /// Re-establish the shared session on operator request.
    ///
    /// A successful attempt marks the session healthy for the configured
    /// duration. Failures leave the stored state untouched.
    pub async fn restore_session(&self) -> RecoveryOutcome {
        let outcome = self.source.try_auto_recover(OPERATOR_REASON).await;
        if outcome.ok {
            info!("shared session restored by operator");
            self.mark_session_ok().await;
        } else {
            warn!(
                detail = outcome.reason.as_deref().unwrap_or_default(),
                "operator session restore failed"
            );
        }
        outcome
    }

    /// Reason the stored session cannot be used right now, if any.
    pub(super) async fn session_problem(&self) -> Result<Option<&'static str>, MonitorError> {
        let now = self.clock.utc();
        let session = self.store.shared_session().await?;
        if session.as_ref().is_some_and(|stored| stored.is_clock_expired(now)) {
            return Ok(Some(CLOCK_EXPIRED_REASON));
        }
        match SharedSession::effective_state_of(session.as_ref(), now) {
            SessionState::Ok => Ok(None),
            SessionState::Expired => Ok(Some(INACTIVE_REASON)),
        }
    }

    /// Attempt one recovery; on success the session is marked healthy.
    pub(super) async fn recover(&self, reason: &str) -> bool {
        let outcome = self.source.try_auto_recover(reason).await;
        if !outcome.ok {
            info!(
                reason,
                detail = outcome.reason.as_deref().unwrap_or_default(),
                "shared session recovery failed"
            );
            return false;
        }
        info!(reason, "shared session recovered");
        self.mark_session_ok().await;
        true
    }

    /// Mark the session expired and alert the owner on the first lapse only.
    pub(super) async fn escalate_session_failure(&self, reason: &str) {
        let expiry = match self.store.mark_shared_session_expired(reason).await {
            Ok(expiry) => expiry,
            Err(store_error) => {
                warn!(error = %store_error, "failed to record expired shared session");
                return;
            }
        };
        if expiry.was_already_expired {
            info!(reason, "shared session already expired; owner alert suppressed");
            return;
        }
        let Some(owner) = self.config.owner_alert_email.as_deref() else {
            warn!(reason, "shared session expired and no owner address is configured");
            return;
        };
        let notice = SessionExpiredNotice {
            to_email: owner.to_owned(),
            reason: reason.to_owned(),
        };
        if let Err(delivery_error) = self.notifier.notify_session_expired(&notice).await {
            warn!(error = %delivery_error, "failed to alert owner about shared session");
        }
    }

    /// Evaluate a target, recovering the session and retrying once if needed.
    pub(super) async fn evaluate_with_recovery(
        &self,
        target: &TrackedTarget,
        force_refresh: bool,
    ) -> Evaluation {
        let session_error = match self.evaluate_target(target, force_refresh).await {
            Ok(outcome) => return Evaluation::Completed(outcome),
            Err(failure) if failure.is_session_failure() => failure,
            Err(failure) => return Evaluation::Failed(failure),
        };

        let reason = session_error.to_string();
        warn!(
            target_id = %target.id,
            course_id = %target.course_id,
            error = %reason,
            "session failure while evaluating target"
        );
        if !self.recover(&reason).await {
            self.escalate_session_failure(&reason).await;
            return Evaluation::SessionLost;
        }

        match self.evaluate_target(target, true).await {
            Ok(outcome) => Evaluation::Completed(outcome),
            Err(retry_error) if retry_error.is_session_failure() => {
                self.escalate_session_failure(&retry_error.to_string()).await;
                Evaluation::SessionLost
            }
            Err(retry_error) => Evaluation::Failed(retry_error),
        }
    }
}
