//! Test utilities for the seat monitor crate.
//!
//! Shared by unit tests (in `src/`) and integration tests (in `tests/`).
//! Compiled for tests and under the `test-support` feature.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use cap_std::ambient_authority;
use cap_std::fs::Dir;
use chrono::{DateTime, Local, TimeDelta, TimeZone, Utc};
use mockable::Clock;
use tempfile::TempDir;

use crate::domain::ports::{
    AvailabilitySource, AvailabilitySourceError, CandidateBatch, CandidateRequest,
    CourseOpenNotice, RecoveryOutcome, SeatNotifier, SeatNotifierError, SessionExpiredNotice,
};
use crate::domain::{IntervalJitter, MonitorSleeper, PayloadCandidate};

fn lock<'a, T>(mutex: &'a Mutex<T>, name: &str) -> MutexGuard<'a, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(_) => panic!("{name} mutex poisoned"),
    }
}

/// Fixed reference instant used across tests: 2026-09-01 09:00 UTC.
///
/// # Panics
///
/// Never in practice; the instant is unambiguous in UTC.
#[must_use]
pub fn reference_time() -> DateTime<Utc> {
    match Utc.with_ymd_and_hms(2026, 9, 1, 9, 0, 0).single() {
        Some(at) => at,
        None => panic!("reference time is unambiguous"),
    }
}

/// Clock whose time only moves when a test advances it.
pub struct MutableClock(Mutex<DateTime<Utc>>);

impl MutableClock {
    /// Start the clock at `now`.
    #[must_use]
    pub const fn new(now: DateTime<Utc>) -> Self {
        Self(Mutex::new(now))
    }

    /// Move the clock forward by `minutes`.
    pub fn advance_minutes(&self, minutes: i64) {
        *lock(&self.0, "clock") += TimeDelta::minutes(minutes);
    }

    /// Move the clock forward by a std duration.
    ///
    /// # Panics
    ///
    /// Panics when `delta` does not fit a [`TimeDelta`].
    pub fn advance(&self, delta: Duration) {
        let step = match TimeDelta::from_std(delta) {
            Ok(step) => step,
            Err(error) => panic!("failed to convert {delta:?} to TimeDelta: {error}"),
        };
        *lock(&self.0, "clock") += step;
    }
}

impl Clock for MutableClock {
    fn local(&self) -> DateTime<Local> {
        self.utc().with_timezone(&Local)
    }

    fn utc(&self) -> DateTime<Utc> {
        *lock(&self.0, "clock")
    }
}

/// Sleeper that records requested delays and returns immediately.
#[derive(Default)]
pub struct RecordingSleeper(Mutex<Vec<Duration>>);

impl RecordingSleeper {
    /// Delays requested so far.
    #[must_use]
    pub fn recorded(&self) -> Vec<Duration> {
        lock(&self.0, "sleeper").clone()
    }
}

#[async_trait]
impl MonitorSleeper for RecordingSleeper {
    async fn sleep(&self, duration: Duration) {
        lock(&self.0, "sleeper").push(duration);
    }
}

/// Jitter returning a constant offset.
#[derive(Debug, Clone, Copy, Default)]
pub struct FixedJitter(pub i64);

impl IntervalJitter for FixedJitter {
    fn offset_millis(&self, _max_millis: i64) -> i64 {
        self.0
    }
}

/// Notifier that records every notice it receives.
#[derive(Default)]
pub struct RecordingNotifier {
    course_open: Mutex<Vec<CourseOpenNotice>>,
    session_expired: Mutex<Vec<SessionExpiredNotice>>,
}

impl RecordingNotifier {
    /// Course-open notices received so far.
    #[must_use]
    pub fn course_open(&self) -> Vec<CourseOpenNotice> {
        lock(&self.course_open, "course open").clone()
    }

    /// Session-expired notices received so far.
    #[must_use]
    pub fn session_expired(&self) -> Vec<SessionExpiredNotice> {
        lock(&self.session_expired, "session expired").clone()
    }
}

#[async_trait]
impl SeatNotifier for RecordingNotifier {
    async fn notify_course_open(&self, notice: &CourseOpenNotice) -> Result<(), SeatNotifierError> {
        lock(&self.course_open, "course open").push(notice.clone());
        Ok(())
    }

    async fn notify_session_expired(
        &self,
        notice: &SessionExpiredNotice,
    ) -> Result<(), SeatNotifierError> {
        lock(&self.session_expired, "session expired").push(notice.clone());
        Ok(())
    }
}

type CollectResult = Result<Vec<PayloadCandidate>, AvailabilitySourceError>;

/// Availability source replaying scripted responses.
///
/// Once the collect script runs out every call returns `fallback`. Recovery
/// replays its own script and then reports failure. Forced requests behave
/// like a live capture; other requests are reported as replays.
pub struct ScriptedSource {
    collect_script: Mutex<VecDeque<CollectResult>>,
    fallback: CollectResult,
    recovery_script: Mutex<VecDeque<RecoveryOutcome>>,
    requests: Mutex<Vec<CandidateRequest>>,
    recovery_reasons: Mutex<Vec<String>>,
}

impl ScriptedSource {
    /// Always answer with `candidates`.
    #[must_use]
    pub fn always(candidates: Vec<PayloadCandidate>) -> Self {
        Self::scripted(Vec::new(), Ok(candidates))
    }

    /// Replay `script`, then answer with `fallback`.
    #[must_use]
    pub fn scripted(script: Vec<CollectResult>, fallback: CollectResult) -> Self {
        Self {
            collect_script: Mutex::new(script.into()),
            fallback,
            recovery_script: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
            recovery_reasons: Mutex::new(Vec::new()),
        }
    }

    /// Queue recovery outcomes.
    #[must_use]
    pub fn with_recoveries(self, outcomes: Vec<RecoveryOutcome>) -> Self {
        *lock(&self.recovery_script, "recovery script") = outcomes.into();
        self
    }

    /// Requests received by `collect_candidates`.
    #[must_use]
    pub fn requests(&self) -> Vec<CandidateRequest> {
        lock(&self.requests, "requests").clone()
    }

    /// Number of requests that asked for a forced refresh.
    #[must_use]
    pub fn forced_requests(&self) -> usize {
        lock(&self.requests, "requests")
            .iter()
            .filter(|request| request.force_refresh)
            .count()
    }

    /// Reasons passed to `try_auto_recover`.
    #[must_use]
    pub fn recovery_reasons(&self) -> Vec<String> {
        lock(&self.recovery_reasons, "recovery reasons").clone()
    }
}

#[async_trait]
impl AvailabilitySource for ScriptedSource {
    async fn collect_candidates(
        &self,
        request: &CandidateRequest,
    ) -> Result<CandidateBatch, AvailabilitySourceError> {
        lock(&self.requests, "requests").push(request.clone());
        let candidates = lock(&self.collect_script, "collect script")
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone())?;
        Ok(CandidateBatch {
            candidates,
            captured: request.force_refresh,
        })
    }

    async fn try_auto_recover(&self, reason: &str) -> RecoveryOutcome {
        lock(&self.recovery_reasons, "recovery reasons").push(reason.to_owned());
        lock(&self.recovery_script, "recovery script")
            .pop_front()
            .unwrap_or_else(|| RecoveryOutcome::failed("recovery script exhausted"))
    }
}

/// Build a candidate generated at `generated_at`.
#[must_use]
pub fn candidate(raw_payload: &str, generated_at: DateTime<Utc>) -> PayloadCandidate {
    PayloadCandidate {
        raw_payload: raw_payload.to_owned(),
        generated_at,
        source_path: Some("/captures/getClassData.jsp".to_owned()),
    }
}

/// Write `contents` to `path` through `cap_std`, replacing any file.
///
/// # Panics
///
/// Panics when the file cannot be written.
pub fn write_file(path: &Path, contents: &str) {
    let (Some(parent), Some(name)) = (path.parent(), path.file_name()) else {
        panic!("{} must name a file inside a directory", path.display());
    };
    let written = Dir::create_ambient_dir_all(parent, ambient_authority())
        .and_then(|()| Dir::open_ambient_dir(parent, ambient_authority()))
        .and_then(|dir| dir.write(name, contents));
    if let Err(error) = written {
        panic!("failed to write {}: {error}", path.display());
    }
}

/// Temporary directory plus a state file path inside it.
///
/// Keep the returned [`TempDir`] alive for as long as the path is used.
///
/// # Panics
///
/// Panics when the temporary directory cannot be created.
#[must_use]
pub fn temp_state_path() -> (TempDir, PathBuf) {
    let dir = match tempfile::tempdir() {
        Ok(dir) => dir,
        Err(error) => panic!("failed to create temporary directory: {error}"),
    };
    let path = dir.path().join("state").join("seat-monitor.json");
    (dir, path)
}
