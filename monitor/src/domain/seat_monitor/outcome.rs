//! Result values reported by scans and immediate checks.

use serde::Serialize;

use crate::domain::SeatReading;

/// Result of evaluating one tracked target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TargetOutcome {
    /// Seats were open; the subscriber was notified and the target removed.
    NotifiedAndStopped(SeatReading),
    /// No seats were open; the target stays tracked.
    StillClosed(SeatReading),
}

impl TargetOutcome {
    /// Reading the outcome was decided on.
    #[must_use]
    pub const fn reading(&self) -> &SeatReading {
        match self {
            Self::NotifiedAndStopped(reading) | Self::StillClosed(reading) => reading,
        }
    }
}

/// Counters describing one scan cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ScanSummary {
    /// Targets the cycle attempted.
    pub scanned: u32,
    /// Subscribers notified of an open course.
    pub notified: u32,
    /// Targets removed after notification.
    pub stopped: u32,
    /// Targets whose evaluation ended in error.
    pub failures: u32,
}

impl ScanSummary {
    pub(super) const fn record(&mut self, outcome: &TargetOutcome) {
        if matches!(outcome, TargetOutcome::NotifiedAndStopped(_)) {
            self.notified += 1;
            self.stopped += 1;
        }
    }
}

/// Result of an on-demand check for a single subscription.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "result", rename_all = "snake_case")]
pub enum ImmediateCheckOutcome {
    /// The target was evaluated.
    Checked(TargetOutcome),
    /// No subscription exists for the user and course.
    NotTracking,
    /// The shared session could not be restored; the owner was alerted.
    SessionFailed,
}
