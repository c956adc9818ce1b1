use std::sync::Arc;

use tracing::{debug, error, instrument, warn};
use uuid::Uuid;

use shared_config::ConflictPolicy;

use crate::models::{BookedSlot, ConflictCandidate, ConflictResult, TimeInterval};
use crate::services::store::AppointmentStore;

/// Decides whether a candidate slot collides with the doctor's active appointments.
pub struct ConflictDetectionService {
    store: Arc<dyn AppointmentStore>,
    policy: ConflictPolicy,
}

impl ConflictDetectionService {
    pub fn new(store: Arc<dyn AppointmentStore>, policy: ConflictPolicy) -> Self {
        Self { store, policy }
    }

    pub fn policy(&self) -> ConflictPolicy {
        self.policy
    }

    /// Check a candidate against the doctor's same-day active appointments.
    ///
    /// Incomplete candidates, and candidates whose end falls off the
    /// calendar, are not checked. Store failures are logged and
    /// reported as `Unverified`; whether that blocks submission depends on
    /// the configured policy. The reported appointment is the first overlap
    /// in fetch order.
    #[instrument(skip(self), fields(doctor_id = ?candidate.doctor_id))]
    pub async fn check_conflict(&self, candidate: &ConflictCandidate) -> ConflictResult {
        let (Some(doctor_id), Some(interval), Some((day_start, day_end))) =
            (candidate.doctor_id, candidate.interval(), candidate.day_bounds())
        else {
            debug!("Candidate incomplete or out of range, skipping conflict check");
            return ConflictResult::NotChecked;
        };

        let existing = match self.store
            .find_active_for_doctor(doctor_id, day_start, day_end, candidate.exclude_id)
            .await
        {
            Ok(existing) => existing,
            Err(e) => {
                error!("Conflict check failed for doctor {}: {:#}", doctor_id, e);
                return self.unverified();
            }
        };

        debug!("Comparing {} against {} booked slots", interval.display_range(), existing.len());

        match find_first_overlap(&interval, existing, candidate.exclude_id) {
            Some(slot) => {
                let message = conflict_message(&slot);
                warn!("Conflict detected for doctor {}: {}", doctor_id, message);
                ConflictResult::Conflict {
                    appointment: slot,
                    message,
                }
            }
            None => ConflictResult::Clear,
        }
    }

    fn unverified(&self) -> ConflictResult {
        ConflictResult::Unverified {
            message: "Could not verify the doctor's availability, try again".to_string(),
            blocks_submission: self.policy == ConflictPolicy::FailClosed,
        }
    }
}

/// First active slot (in the given order) that overlaps `candidate`.
pub fn find_first_overlap(
    candidate: &TimeInterval,
    existing: Vec<BookedSlot>,
    exclude_id: Option<Uuid>,
) -> Option<BookedSlot> {
    existing.into_iter().find(|slot| {
        slot.status.is_active()
            && Some(slot.id) != exclude_id
            && slot
                .interval()
                // A stored end past the calendar limit runs to the end of time.
                .map_or(candidate.end > slot.appointment_date, |booked| candidate.overlaps(&booked))
    })
}

pub fn conflict_message(slot: &BookedSlot) -> String {
    format!(
        "The doctor already has an appointment with {} from {}",
        slot.patient_name,
        slot.interval()
            .map(|booked| booked.display_range())
            .unwrap_or_else(|| slot.appointment_date.format("%H:%M").to_string())
    )
}
