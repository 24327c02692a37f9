//! Domain primitives, the payload parser, and the monitor engine.
//!
//! Purpose: keep every seat-monitoring rule transport agnostic. Adapters reach
//! the domain only through the traits in [`ports`].
//!
//! Public surface:
//! - `TrackedTarget`, `UserId`, `CourseId`, `TrackedTargetId` — subscriptions.
//! - `SharedSession`, `SessionState` — health of the shared upstream session.
//! - `PayloadCandidate`, `CachedPayload`, `Course` — captured data and facts.
//! - `parse_seat_reading` — cascading payload parser.
//! - `SeatMonitor` — scan cycles, immediate checks, and the polling loop.

pub mod payload;
pub mod payload_parser;
pub mod ports;
pub mod seat_monitor;
pub mod session;
pub mod tracking;

pub use self::payload::{CachedPayload, Course, PayloadCandidate, select_latest_candidate};
pub use self::payload_parser::{PayloadParseError, SeatReading, UNKNOWN_COURSE, parse_seat_reading};
pub use self::seat_monitor::{
    ImmediateCheckOutcome, IntervalJitter, LoopRuntime, LoopSchedule, MonitorError, MonitorSleeper,
    RandomIntervalJitter, ScanSummary, SeatMonitor, SeatMonitorConfig, SeatMonitorPorts,
    TargetOutcome, TokioSleeper,
};
pub use self::session::{SessionState, SharedSession};
pub use self::tracking::{
    CourseId, DomainValidationError, TrackedTarget, TrackedTargetId, UserId,
};
