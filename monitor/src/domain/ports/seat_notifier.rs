//! Driven port for subscriber and owner notifications.

use async_trait::async_trait;

use super::define_port_error;
use crate::domain::CourseId;

/// Event sent to a subscriber when their course opens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CourseOpenNotice {
    /// Subscriber address.
    pub to_email: String,
    /// Course that opened.
    pub course_id: CourseId,
    /// Display name read from the payload.
    pub display_name: String,
    /// Seats available at detection time.
    pub open_seats: i64,
}

/// Event sent to the owner when the shared session lapses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionExpiredNotice {
    /// Owner address.
    pub to_email: String,
    /// Why the session is considered expired.
    pub reason: String,
}

define_port_error! {
    /// Errors raised by notifier adapters.
    pub enum SeatNotifierError {
        /// The notice could not be delivered.
        Delivery { message: String } =>
            "notification delivery failed: {message}",
    }
}

/// Port delivering monitor events.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SeatNotifier: Send + Sync {
    /// Tell a subscriber that their course has open seats.
    async fn notify_course_open(&self, notice: &CourseOpenNotice) -> Result<(), SeatNotifierError>;

    /// Tell the owner that the shared session needs attention.
    async fn notify_session_expired(
        &self,
        notice: &SessionExpiredNotice,
    ) -> Result<(), SeatNotifierError>;
}
