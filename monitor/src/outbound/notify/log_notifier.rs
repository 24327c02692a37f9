//! Notifier that records notices as structured log events.

use async_trait::async_trait;
use tracing::{info, warn};

use crate::domain::ports::{
    CourseOpenNotice, SeatNotifier, SeatNotifierError, SessionExpiredNotice,
};

/// [`SeatNotifier`] emitting `tracing` events instead of sending mail.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

#[async_trait]
impl SeatNotifier for TracingNotifier {
    async fn notify_course_open(&self, notice: &CourseOpenNotice) -> Result<(), SeatNotifierError> {
        info!(
            to_email = %notice.to_email,
            course_id = %notice.course_id,
            display_name = %notice.display_name,
            open_seats = notice.open_seats,
            "course open notice"
        );
        Ok(())
    }

    async fn notify_session_expired(
        &self,
        notice: &SessionExpiredNotice,
    ) -> Result<(), SeatNotifierError> {
        warn!(
            to_email = %notice.to_email,
            reason = %notice.reason,
            "shared session expired notice"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    //! Smoke coverage for the logging notifier.

    use super::*;
    use crate::domain::CourseId;
    use rstest::rstest;

    #[rstest]
    #[tokio::test]
    async fn notices_always_succeed() {
        let notifier = TracingNotifier;
        notifier
            .notify_course_open(&CourseOpenNotice {
                to_email: "student@example.com".to_owned(),
                course_id: CourseId::new("ABC123").expect("course"),
                display_name: "CS 101".to_owned(),
                open_seats: 2,
            })
            .await
            .expect("course open");
        notifier
            .notify_session_expired(&SessionExpiredNotice {
                to_email: "owner@example.com".to_owned(),
                reason: "lapsed".to_owned(),
            })
            .await
            .expect("session expired");
    }
}
