//! Port and runtime bundles plus the polling schedule.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;

use crate::domain::ports::{AvailabilitySource, MonitorStore, SeatNotifier};

/// Shortest delay the polling loop will ever sleep.
pub const MIN_POLL_DELAY: Duration = Duration::from_secs(5);

/// Port bundle required by the seat monitor.
pub struct SeatMonitorPorts {
    /// Persistence for targets, the shared session, and cached payloads.
    pub store: Arc<dyn MonitorStore>,
    /// Supplier of raw availability payloads.
    pub source: Arc<dyn AvailabilitySource>,
    /// Delivery of subscriber and owner notices.
    pub notifier: Arc<dyn SeatNotifier>,
}

impl SeatMonitorPorts {
    /// Bundle the monitor's collaborators.
    #[must_use]
    pub fn new(
        store: Arc<dyn MonitorStore>,
        source: Arc<dyn AvailabilitySource>,
        notifier: Arc<dyn SeatNotifier>,
    ) -> Self {
        Self {
            store,
            source,
            notifier,
        }
    }
}

/// Async sleeping abstraction for the polling loop.
#[async_trait]
pub trait MonitorSleeper: Send + Sync {
    /// Suspend execution for `duration`.
    async fn sleep(&self, duration: Duration);
}

/// Random offset applied to each polling interval.
pub trait IntervalJitter: Send + Sync {
    /// Return an offset in `-max_millis..=max_millis`.
    fn offset_millis(&self, max_millis: i64) -> i64;
}

/// Runtime helpers used by the polling loop.
pub struct LoopRuntime {
    /// Async sleep implementation.
    pub sleeper: Arc<dyn MonitorSleeper>,
    /// Jitter strategy for poll delays.
    pub jitter: Arc<dyn IntervalJitter>,
}

impl Default for LoopRuntime {
    fn default() -> Self {
        Self {
            sleeper: Arc::new(TokioSleeper),
            jitter: Arc::new(RandomIntervalJitter),
        }
    }
}

/// Tokio-based sleeper implementation.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl MonitorSleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Uniform jitter drawn from the thread-local generator.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomIntervalJitter;

impl IntervalJitter for RandomIntervalJitter {
    fn offset_millis(&self, max_millis: i64) -> i64 {
        if max_millis <= 0 {
            return 0;
        }
        rand::thread_rng().gen_range(-max_millis..=max_millis)
    }
}

/// Interval between scan cycles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoopSchedule {
    /// Nominal delay between cycles.
    pub interval: Duration,
    /// Maximum deviation either side of `interval`.
    pub jitter: Duration,
}

impl LoopSchedule {
    /// Build a schedule from whole seconds.
    #[must_use]
    pub const fn from_secs(interval_seconds: u64, jitter_seconds: u64) -> Self {
        Self {
            interval: Duration::from_secs(interval_seconds),
            jitter: Duration::from_secs(jitter_seconds),
        }
    }

    /// Delay before the next cycle: interval plus jitter, never under
    /// [`MIN_POLL_DELAY`].
    ///
    /// # Examples
    /// ```
    /// use seat_monitor::domain::{LoopSchedule, RandomIntervalJitter};
    /// use std::time::Duration;
    ///
    /// let schedule = LoopSchedule::from_secs(1, 0);
    /// assert_eq!(schedule.next_delay(&RandomIntervalJitter), Duration::from_secs(5));
    /// ```
    #[must_use]
    pub fn next_delay(&self, jitter: &dyn IntervalJitter) -> Duration {
        let interval_ms = i64::try_from(self.interval.as_millis()).unwrap_or(i64::MAX);
        let jitter_ms = i64::try_from(self.jitter.as_millis()).unwrap_or(i64::MAX);
        let offset = jitter.offset_millis(jitter_ms).clamp(-jitter_ms, jitter_ms);
        let delay_ms = u64::try_from(interval_ms.saturating_add(offset)).unwrap_or(0);
        Duration::from_millis(delay_ms).max(MIN_POLL_DELAY)
    }
}
