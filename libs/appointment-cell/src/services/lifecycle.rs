// libs/appointment-cell/src/services/lifecycle.rs
use tracing::{debug, warn};

use shared_config::TransitionPolicy;

use crate::models::{AppointmentError, AppointmentStatus};

pub struct AppointmentLifecycleService {
    policy: TransitionPolicy,
}

impl Default for AppointmentLifecycleService {
    fn default() -> Self {
        Self::new(TransitionPolicy::default())
    }
}

impl AppointmentLifecycleService {
    pub fn new(policy: TransitionPolicy) -> Self {
        Self { policy }
    }

    /// Status a new appointment starts in.
    pub fn initial_status(&self, requested: Option<AppointmentStatus>) -> AppointmentStatus {
        requested.unwrap_or_default()
    }

    /// Validate that a status transition is allowed under the configured policy.
    pub fn validate_status_transition(
        &self,
        current_status: AppointmentStatus,
        new_status: AppointmentStatus,
    ) -> Result<(), AppointmentError> {
        debug!("Validating status transition from {} to {}", current_status, new_status);

        if current_status == new_status {
            return Ok(());
        }

        if !self.get_valid_transitions(current_status).contains(&new_status) {
            warn!("Invalid status transition attempted: {} -> {}", current_status, new_status);
            return Err(AppointmentError::InvalidStatusTransition {
                from: current_status,
                to: new_status,
            });
        }

        Ok(())
    }

    /// All statuses reachable from `current_status`.
    pub fn get_valid_transitions(&self, current_status: AppointmentStatus) -> Vec<AppointmentStatus> {
        match self.policy {
            TransitionPolicy::Unrestricted => AppointmentStatus::ALL
                .iter()
                .copied()
                .filter(|status| *status != current_status)
                .collect(),
            TransitionPolicy::Restricted => restricted_transitions(current_status).to_vec(),
        }
    }

    /// True when the change makes the appointment occupy the doctor's slot again.
    pub fn activates(&self, current_status: AppointmentStatus, new_status: AppointmentStatus) -> bool {
        !current_status.is_active() && new_status.is_active()
    }
}

fn restricted_transitions(status: AppointmentStatus) -> &'static [AppointmentStatus] {
    use AppointmentStatus::*;

    match status {
        Scheduled => &[Confirmed, Attended, Cancelled, NoShow, Rescheduled],
        Confirmed => &[Scheduled, Attended, Cancelled, NoShow, Rescheduled],
        Rescheduled => &[Scheduled, Confirmed, Cancelled],
        NoShow => &[Rescheduled],
        // Terminal
        Attended | Cancelled => &[],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use AppointmentStatus::*;

    #[test]
    fn unrestricted_allows_any_change() {
        let service = AppointmentLifecycleService::default();
        for from in AppointmentStatus::ALL {
            for to in AppointmentStatus::ALL {
                assert!(service.validate_status_transition(from, to).is_ok());
            }
        }
        assert_eq!(service.get_valid_transitions(Cancelled).len(), 5);
    }

    #[test]
    fn restricted_blocks_reviving_cancelled() {
        let service = AppointmentLifecycleService::new(TransitionPolicy::Restricted);
        assert_eq!(
            service.validate_status_transition(Cancelled, Scheduled),
            Err(AppointmentError::InvalidStatusTransition { from: Cancelled, to: Scheduled })
        );
        assert!(service.validate_status_transition(Scheduled, Confirmed).is_ok());
        assert!(service.validate_status_transition(NoShow, Rescheduled).is_ok());
        assert!(service.validate_status_transition(Attended, Attended).is_ok());
    }

    #[test]
    fn activation_only_from_inactive() {
        let service = AppointmentLifecycleService::default();
        assert!(service.activates(Cancelled, Scheduled));
        assert!(service.activates(Rescheduled, Confirmed));
        assert!(!service.activates(Scheduled, Confirmed));
        assert!(!service.activates(Scheduled, Cancelled));
    }

    #[test]
    fn new_appointments_default_to_scheduled() {
        let service = AppointmentLifecycleService::default();
        assert_eq!(service.initial_status(None), Scheduled);
        assert_eq!(service.initial_status(Some(Confirmed)), Confirmed);
    }
}
