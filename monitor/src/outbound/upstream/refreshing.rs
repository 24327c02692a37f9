//! Freshness-window decorator around a live payload capture.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Duration;
use mockable::Clock;
use tracing::{debug, info};

use crate::domain::ports::{
    AvailabilitySource, AvailabilitySourceError, CandidateBatch, CandidateRequest, MonitorStore,
    RecoveryOutcome,
};
use crate::domain::{CourseId, PayloadCandidate};

/// Live capture of availability payloads from upstream.
#[async_trait]
pub trait PayloadCapture: Send + Sync {
    /// Capture fresh payloads for `course_id`.
    async fn capture(
        &self,
        course_id: &CourseId,
    ) -> Result<Vec<PayloadCandidate>, AvailabilitySourceError>;

    /// Try to restore the upstream session. Unsupported by default.
    async fn recover(&self, reason: &str) -> RecoveryOutcome {
        RecoveryOutcome::failed(format!("capture cannot recover sessions ({reason})"))
    }
}

/// [`AvailabilitySource`] reusing the stored payload while it is fresh.
///
/// Without a forced refresh, a stored payload generated less than
/// `refresh_window` ago is returned as-is and nothing is captured. An empty
/// capture falls back to the stored payload when one exists. Only non-empty
/// captures are reported as live.
pub struct RefreshingPayloadSource<C> {
    capture: C,
    store: Arc<dyn MonitorStore>,
    clock: Arc<dyn Clock>,
    refresh_window: Duration,
}

impl<C: PayloadCapture> RefreshingPayloadSource<C> {
    /// Wrap `capture` with a freshness window over the stored payload.
    #[must_use]
    pub fn new(
        capture: C,
        store: Arc<dyn MonitorStore>,
        clock: Arc<dyn Clock>,
        refresh_window: Duration,
    ) -> Self {
        Self {
            capture,
            store,
            clock,
            refresh_window,
        }
    }

    /// Borrow the wrapped capture.
    #[must_use]
    pub const fn capture(&self) -> &C {
        &self.capture
    }
}

#[async_trait]
impl<C: PayloadCapture> AvailabilitySource for RefreshingPayloadSource<C> {
    async fn collect_candidates(
        &self,
        request: &CandidateRequest,
    ) -> Result<CandidateBatch, AvailabilitySourceError> {
        let stored = self
            .store
            .cached_payload()
            .await
            .map_err(|error| AvailabilitySourceError::transport(error.to_string()))?
            .map(|payload| payload.to_candidate());

        let now = self.clock.utc();
        let fresh = stored
            .as_ref()
            .filter(|payload| now - payload.generated_at < self.refresh_window);
        if let Some(payload) = fresh.filter(|_| !request.force_refresh) {
            debug!(course_id = %request.course_id, "stored payload is fresh; skipping capture");
            return Ok(CandidateBatch::replayed(vec![payload.clone()]));
        }

        let captured = self.capture.capture(&request.course_id).await?;
        if !captured.is_empty() {
            info!(
                course_id = %request.course_id,
                count = captured.len(),
                "captured upstream payloads"
            );
            return Ok(CandidateBatch::live(captured));
        }

        debug!(course_id = %request.course_id, "capture was empty; replaying stored payload");
        stored.map(|payload| CandidateBatch::replayed(vec![payload])).ok_or_else(|| {
            AvailabilitySourceError::payload("no availability payload captured from upstream")
        })
    }

    async fn try_auto_recover(&self, reason: &str) -> RecoveryOutcome {
        self.capture.recover(reason).await
    }
}
