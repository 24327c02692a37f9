//! Seat monitor orchestration: scan cycles, immediate checks, polling loop.
//!
//! The monitor is stateless between calls. Every operation reads the shared
//! session, cached payload, and tracked targets through [`MonitorStore`], so
//! several entry points (loop, CLI check) can share one store safely.
//! Targets are processed strictly one at a time because they share a single
//! upstream session.
//!
//! [`MonitorStore`]: crate::domain::ports::MonitorStore

use std::sync::Arc;

use chrono::Duration;
use mockable::Clock;
use tracing::{debug, error, info, warn};

use crate::domain::ports::{AvailabilitySource, MonitorStore, SeatNotifier};
use crate::domain::{CourseId, UserId};

mod error;
mod outcome;
mod pipeline;
mod recovery;
mod runtime;

pub use error::MonitorError;
pub use outcome::{ImmediateCheckOutcome, ScanSummary, TargetOutcome};
use recovery::Evaluation;
pub use runtime::{
    IntervalJitter, LoopRuntime, LoopSchedule, MIN_POLL_DELAY, MonitorSleeper,
    RandomIntervalJitter, SeatMonitorPorts, TokioSleeper,
};

/// Monitor configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeatMonitorConfig {
    /// How long a refreshed or recovered session is trusted.
    pub session_duration: Duration,
    /// Address alerted when the shared session lapses.
    pub owner_alert_email: Option<String>,
}

impl Default for SeatMonitorConfig {
    fn default() -> Self {
        Self {
            session_duration: Duration::minutes(90),
            owner_alert_email: None,
        }
    }
}

/// Domain-owned seat monitor.
pub struct SeatMonitor {
    store: Arc<dyn MonitorStore>,
    source: Arc<dyn AvailabilitySource>,
    notifier: Arc<dyn SeatNotifier>,
    clock: Arc<dyn Clock>,
    config: SeatMonitorConfig,
}

impl SeatMonitor {
    /// Build a monitor over the given ports.
    #[must_use]
    pub fn new(ports: SeatMonitorPorts, clock: Arc<dyn Clock>, config: SeatMonitorConfig) -> Self {
        Self {
            store: ports.store,
            source: ports.source,
            notifier: ports.notifier,
            clock,
            config,
        }
    }

    /// Run one scan over every tracked target.
    ///
    /// When the shared session is unusable and cannot be recovered, the owner
    /// is alerted (once per lapse) and no targets are scanned.
    ///
    /// # Errors
    ///
    /// Returns [`MonitorError::Store`] when the session record or the target
    /// list cannot be read. Failures inside a target are counted instead.
    pub async fn run_scan_cycle(&self) -> Result<ScanSummary, MonitorError> {
        let mut summary = ScanSummary::default();

        if let Some(reason) = self.session_problem().await? {
            info!(reason, "shared session unusable at scan start");
            if !self.recover(reason).await {
                self.escalate_session_failure(reason).await;
                return Ok(summary);
            }
        }

        let targets = self.store.list_tracked_targets().await?;
        debug!(count = targets.len(), "scanning tracked targets");

        for (index, target) in targets.iter().enumerate() {
            summary.scanned += 1;
            match self.evaluate_with_recovery(target, false).await {
                Evaluation::Completed(outcome) => summary.record(&outcome),
                Evaluation::Failed(failure) => {
                    summary.failures += 1;
                    warn!(
                        target_id = %target.id,
                        course_id = %target.course_id,
                        error = %failure,
                        "target evaluation failed"
                    );
                }
                Evaluation::SessionLost => {
                    summary.failures += 1;
                    warn!(
                        target_id = %target.id,
                        remaining = targets.len().saturating_sub(index + 1),
                        "shared session lost; deferring remaining targets"
                    );
                    break;
                }
            }
        }

        Ok(summary)
    }

    /// Evaluate one subscription immediately, always forcing a refresh.
    ///
    /// # Errors
    ///
    /// Propagates every failure that is not a session failure.
    pub async fn run_immediate_check(
        &self,
        user_id: UserId,
        course_id: &CourseId,
    ) -> Result<ImmediateCheckOutcome, MonitorError> {
        let Some(target) = self.store.find_tracked_target(user_id, course_id).await? else {
            return Ok(ImmediateCheckOutcome::NotTracking);
        };

        match self.evaluate_with_recovery(&target, true).await {
            Evaluation::Completed(outcome) => Ok(ImmediateCheckOutcome::Checked(outcome)),
            Evaluation::Failed(failure) => Err(failure),
            Evaluation::SessionLost => Ok(ImmediateCheckOutcome::SessionFailed),
        }
    }

    /// Run one loop iteration: a scan cycle followed by the jittered sleep.
    ///
    /// Cycle failures are logged and returned; they never skip the sleep.
    ///
    /// # Errors
    ///
    /// Returns the cycle's [`MonitorError`] after sleeping.
    pub async fn run_iteration(
        &self,
        schedule: &LoopSchedule,
        runtime: &LoopRuntime,
    ) -> Result<ScanSummary, MonitorError> {
        let result = self.run_scan_cycle().await;
        match &result {
            Ok(summary) => info!(
                scanned = summary.scanned,
                notified = summary.notified,
                stopped = summary.stopped,
                failures = summary.failures,
                "scan cycle complete"
            ),
            Err(failure) => error!(error = %failure, "scan cycle failed"),
        }

        let delay = schedule.next_delay(runtime.jitter.as_ref());
        debug!(delay_ms = delay.as_millis(), "sleeping until next cycle");
        runtime.sleeper.sleep(delay).await;
        result
    }

    /// Poll forever.
    pub async fn run_forever(&self, schedule: &LoopSchedule, runtime: &LoopRuntime) {
        info!(
            interval_secs = schedule.interval.as_secs(),
            jitter_secs = schedule.jitter.as_secs(),
            "seat monitor loop started"
        );
        loop {
            // Errors are already logged by the iteration.
            let _summary = self.run_iteration(schedule, runtime).await;
        }
    }
}
