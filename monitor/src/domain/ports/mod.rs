//! Driven ports between the seat monitor and its collaborators.

mod macros;
pub(crate) use macros::define_port_error;

mod availability_source;
mod monitor_store;
mod seat_notifier;

#[cfg(test)]
pub use availability_source::MockAvailabilitySource;
pub use availability_source::{
    AvailabilitySource, AvailabilitySourceError, CandidateBatch, CandidateRequest, RecoveryOutcome,
};
#[cfg(test)]
pub use monitor_store::MockMonitorStore;
pub use monitor_store::{MonitorStore, MonitorStoreError, SessionExpiry};
#[cfg(test)]
pub use seat_notifier::MockSeatNotifier;
pub use seat_notifier::{
    CourseOpenNotice, SeatNotifier, SeatNotifierError, SessionExpiredNotice,
};
