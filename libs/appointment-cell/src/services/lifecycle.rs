use tracing::{debug, warn};

use crate::models::{AppointmentError, AppointmentStatus};

/// Fixed transition table for appointment statuses. Completed, cancelled
/// and no-show are terminal.
pub struct AppointmentLifecycle;

impl AppointmentLifecycle {
    pub fn valid_transitions(current: AppointmentStatus) -> &'static [AppointmentStatus] {
        use AppointmentStatus::*;
        match current {
            Scheduled => &[Confirmed, Cancelled, NoShow],
            Confirmed => &[CheckedIn, Cancelled, NoShow],
            CheckedIn => &[InProgress, Cancelled],
            InProgress => &[Completed],
            Completed => &[],
            Cancelled => &[],
            NoShow => &[],
        }
    }

    pub fn can_transition(from: AppointmentStatus, to: AppointmentStatus) -> bool {
        Self::valid_transitions(from).contains(&to)
    }

    pub fn validate_transition(
        from: AppointmentStatus,
        to: AppointmentStatus,
    ) -> Result<(), AppointmentError> {
        debug!("Validating appointment transition {} -> {}", from, to);

        if !Self::can_transition(from, to) {
            warn!("Invalid appointment transition attempted: {} -> {}", from, to);
            return Err(AppointmentError::InvalidStatusTransition { from, to });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use AppointmentStatus::*;

    #[test]
    fn terminal_statuses_have_no_exits() {
        for status in [Completed, Cancelled, NoShow] {
            assert!(AppointmentLifecycle::valid_transitions(status).is_empty());
        }
    }

    #[test]
    fn happy_path_walks_the_table() {
        assert!(AppointmentLifecycle::can_transition(Scheduled, Confirmed));
        assert!(AppointmentLifecycle::can_transition(Confirmed, CheckedIn));
        assert!(AppointmentLifecycle::can_transition(CheckedIn, InProgress));
        assert!(AppointmentLifecycle::can_transition(InProgress, Completed));
    }

    #[test]
    fn skipping_steps_is_rejected() {
        assert!(!AppointmentLifecycle::can_transition(Scheduled, InProgress));
        assert!(!AppointmentLifecycle::can_transition(Scheduled, Completed));
        assert!(!AppointmentLifecycle::can_transition(Completed, Scheduled));
    }
}
