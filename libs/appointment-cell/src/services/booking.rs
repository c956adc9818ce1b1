// libs/appointment-cell/src/services/booking.rs
use std::sync::Arc;

use tokio::sync::OwnedMutexGuard;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use shared_config::AppConfig;

use crate::models::{
    Appointment, AppointmentError, AppointmentInput, AppointmentQuery, AppointmentRecord,
    AppointmentStatus, ConflictCandidate, ConflictResult,
};
use crate::services::conflict::ConflictDetectionService;
use crate::services::consistency::SchedulingGuard;
use crate::services::lifecycle::AppointmentLifecycleService;
use crate::services::store::AppointmentStore;

/// Appointment writes, each re-validated against the doctor's agenda on the server.
pub struct AppointmentBookingService {
    store: Arc<dyn AppointmentStore>,
    conflict_service: ConflictDetectionService,
    lifecycle_service: AppointmentLifecycleService,
    guard: Arc<SchedulingGuard>,
}

fn db_error(e: anyhow::Error) -> AppointmentError {
    AppointmentError::DatabaseError(e.to_string())
}

impl AppointmentBookingService {
    pub fn new(config: &AppConfig, store: Arc<dyn AppointmentStore>, guard: Arc<SchedulingGuard>) -> Self {
        Self {
            conflict_service: ConflictDetectionService::new(Arc::clone(&store), config.conflict_policy),
            lifecycle_service: AppointmentLifecycleService::new(config.transition_policy),
            store,
            guard,
        }
    }

    pub fn conflict_service(&self) -> &ConflictDetectionService {
        &self.conflict_service
    }

    pub fn lifecycle_service(&self) -> &AppointmentLifecycleService {
        &self.lifecycle_service
    }

    pub async fn get_appointment(&self, appointment_id: Uuid) -> Result<Appointment, AppointmentError> {
        self.store
            .get(appointment_id)
            .await
            .map_err(db_error)?
            .ok_or(AppointmentError::NotFound)
    }

    pub async fn list_appointments(&self, query: &AppointmentQuery) -> Result<Vec<Appointment>, AppointmentError> {
        self.store.list(query).await.map_err(db_error)
    }

    #[instrument(skip(self, input), fields(doctor_id = %input.doctor_id))]
    pub async fn create_appointment(&self, input: AppointmentInput) -> Result<Appointment, AppointmentError> {
        input.validate()?;
        let status = self.lifecycle_service.initial_status(input.status);
        let record = AppointmentRecord::from_input(input, status);

        let _lock = self.guard.lock_doctor(record.doctor_id).await;

        if status.is_active() {
            let candidate = ConflictCandidate::for_slot(
                record.doctor_id,
                record.appointment_date,
                record.duration_minutes,
            );
            self.ensure_bookable(&candidate).await?;
        }

        let appointment = self.store.insert(&record).await.map_err(db_error)?;
        info!("Appointment {} created for doctor {}", appointment.id, appointment.doctor_id);
        Ok(appointment)
    }

    /// Replace an appointment's fields. The appointment never conflicts with itself.
    #[instrument(skip(self, input))]
    pub async fn update_appointment(
        &self,
        appointment_id: Uuid,
        input: AppointmentInput,
    ) -> Result<Appointment, AppointmentError> {
        input.validate()?;

        // Moving to another doctor touches both agendas.
        let (current, _locks) = self.read_locked(appointment_id, Some(input.doctor_id)).await?;

        let status = input.status.unwrap_or(current.status);
        self.lifecycle_service.validate_status_transition(current.status, status)?;
        let record = AppointmentRecord::from_input(input, status);

        if status.is_active() {
            let candidate = ConflictCandidate::for_slot(
                record.doctor_id,
                record.appointment_date,
                record.duration_minutes,
            )
            .excluding(appointment_id);
            self.ensure_bookable(&candidate).await?;
        }

        let appointment = self.store.update(appointment_id, &record).await.map_err(db_error)?;
        info!("Appointment {} updated", appointment_id);
        Ok(appointment)
    }

    #[instrument(skip(self))]
    pub async fn update_status(
        &self,
        appointment_id: Uuid,
        new_status: AppointmentStatus,
    ) -> Result<Appointment, AppointmentError> {
        let (current, _locks) = self.read_locked(appointment_id, None).await?;
        self.lifecycle_service.validate_status_transition(current.status, new_status)?;

        if current.status == new_status {
            debug!("Appointment {} already {}", appointment_id, new_status);
            return Ok(current);
        }

        if self.lifecycle_service.activates(current.status, new_status) {
            let candidate = ConflictCandidate::for_slot(
                current.doctor_id,
                current.appointment_date,
                current.duration_minutes,
            )
            .excluding(appointment_id);
            self.ensure_bookable(&candidate).await?;
        }

        let appointment = self.store
            .update_status(appointment_id, new_status)
            .await
            .map_err(db_error)?;
        info!("Appointment {} moved {} -> {}", appointment_id, current.status, new_status);
        Ok(appointment)
    }

    pub async fn delete_appointment(&self, appointment_id: Uuid) -> Result<(), AppointmentError> {
        self.get_appointment(appointment_id).await?;
        self.store.delete(appointment_id).await.map_err(db_error)?;
        info!("Appointment {} deleted", appointment_id);
        Ok(())
    }

    /// Reads the appointment while holding its doctor's lock (and `other`'s, if given).
    /// Reads again when a concurrent edit moved it to another doctor before the lock was taken.
    async fn read_locked(
        &self,
        appointment_id: Uuid,
        other: Option<Uuid>,
    ) -> Result<(Appointment, Vec<OwnedMutexGuard<()>>), AppointmentError> {
        let mut doctor_id = self.get_appointment(appointment_id).await?.doctor_id;
        loop {
            let locks = self.guard.lock_doctors(doctor_id, other.unwrap_or(doctor_id)).await;
            let current = self.get_appointment(appointment_id).await?;
            if current.doctor_id == doctor_id {
                return Ok((current, locks));
            }
            debug!("Appointment {} changed doctor while waiting for the lock", appointment_id);
            doctor_id = current.doctor_id;
        }
    }

    async fn ensure_bookable(&self, candidate: &ConflictCandidate) -> Result<(), AppointmentError> {
        match self.conflict_service.check_conflict(candidate).await {
            ConflictResult::Conflict { message, .. } => Err(AppointmentError::ConflictDetected(message)),
            ConflictResult::Unverified { message, blocks_submission: true } => {
                Err(AppointmentError::ConflictUnverified(message))
            }
            ConflictResult::Unverified { .. } => {
                warn!("Booking without a verified conflict check");
                Ok(())
            }
            ConflictResult::Clear | ConflictResult::NotChecked => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use assert_matches::assert_matches;
    use chrono::{DateTime, TimeZone, Utc};
    use mockall::Sequence;
    use shared_config::{ConflictPolicy, TransitionPolicy};

    use crate::models::BookedSlot;
    use crate::services::store::MockAppointmentStore;

    fn at(hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 10, hour, minute, 0).unwrap()
    }

    fn input(doctor_id: Uuid, start: DateTime<Utc>, minutes: i32) -> AppointmentInput {
        AppointmentInput {
            patient_id: Uuid::new_v4(),
            doctor_id,
            treatment_id: None,
            appointment_date: start,
            duration_minutes: minutes,
            reason: "Control".to_string(),
            notes: None,
            status: None,
        }
    }

    fn stored(id: Uuid, record: &AppointmentRecord) -> Appointment {
        Appointment {
            id,
            patient_id: record.patient_id,
            doctor_id: record.doctor_id,
            treatment_id: record.treatment_id,
            appointment_date: record.appointment_date,
            duration_minutes: record.duration_minutes,
            status: record.status,
            reason: record.reason.clone(),
            notes: record.notes.clone(),
            created_at: None,
            updated_at: None,
        }
    }

    fn booked(start: DateTime<Utc>, minutes: i32) -> BookedSlot {
        BookedSlot {
            id: Uuid::new_v4(),
            appointment_date: start,
            duration_minutes: minutes,
            status: AppointmentStatus::Scheduled,
            patient_name: "Luis Pérez".to_string(),
        }
    }

    fn service(store: MockAppointmentStore, config: AppConfig) -> AppointmentBookingService {
        AppointmentBookingService::new(&config, Arc::new(store), Arc::new(SchedulingGuard::new()))
    }

    #[tokio::test]
    async fn create_rejects_overlap_without_inserting() {
        let mut store = MockAppointmentStore::new();
        store
            .expect_find_active_for_doctor()
            .returning(|_, _, _, _| Ok(vec![booked(at(10, 0), 30)]));
        store.expect_insert().never();

        let service = service(store, AppConfig::default());
        let result = service.create_appointment(input(Uuid::new_v4(), at(10, 15), 30)).await;

        assert_matches!(result, Err(AppointmentError::ConflictDetected(msg)) if msg.contains("Luis Pérez"));
    }

    #[tokio::test]
    async fn create_inserts_back_to_back_slot() {
        let mut store = MockAppointmentStore::new();
        store
            .expect_find_active_for_doctor()
            .returning(|_, _, _, _| Ok(vec![booked(at(10, 0), 30)]));
        store
            .expect_insert()
            .times(1)
            .returning(|record| Ok(stored(Uuid::new_v4(), record)));

        let service = service(store, AppConfig::default());
        let appointment = service
            .create_appointment(input(Uuid::new_v4(), at(10, 30), 30))
            .await
            .unwrap();

        assert_eq!(appointment.status, AppointmentStatus::Scheduled);
    }

    #[tokio::test]
    async fn create_validates_duration_before_querying() {
        let mut store = MockAppointmentStore::new();
        store.expect_find_active_for_doctor().never();
        store.expect_insert().never();

        let service = service(store, AppConfig::default());
        let result = service.create_appointment(input(Uuid::new_v4(), at(10, 0), 20)).await;

        assert_eq!(result, Err(AppointmentError::InvalidDuration(20)));
    }

    #[tokio::test]
    async fn fail_closed_blocks_create_when_store_is_down() {
        let mut store = MockAppointmentStore::new();
        store
            .expect_find_active_for_doctor()
            .returning(|_, _, _, _| Err(anyhow!("unreachable")));
        store.expect_insert().never();

        let config = AppConfig {
            conflict_policy: ConflictPolicy::FailClosed,
            ..AppConfig::default()
        };
        let result = service(store, config)
            .create_appointment(input(Uuid::new_v4(), at(10, 0), 30))
            .await;

        assert_matches!(result, Err(AppointmentError::ConflictUnverified(_)));
    }

    #[tokio::test]
    async fn reactivating_cancelled_appointment_rechecks() {
        let id = Uuid::new_v4();
        let doctor_id = Uuid::new_v4();
        let current = stored(id, &AppointmentRecord::from_input(
            input(doctor_id, at(10, 0), 30),
            AppointmentStatus::Cancelled,
        ));

        let mut store = MockAppointmentStore::new();
        store.expect_get().returning(move |_| Ok(Some(current.clone())));
        store
            .expect_find_active_for_doctor()
            .times(1)
            .returning(|_, _, _, _| Ok(vec![booked(at(10, 15), 15)]));
        store.expect_update_status().never();

        let result = service(store, AppConfig::default())
            .update_status(id, AppointmentStatus::Scheduled)
            .await;

        assert_matches!(result, Err(AppointmentError::ConflictDetected(_)));
    }

    #[tokio::test]
    async fn cancelling_skips_conflict_check() {
        let id = Uuid::new_v4();
        let record = AppointmentRecord::from_input(
            input(Uuid::new_v4(), at(10, 0), 30),
            AppointmentStatus::Scheduled,
        );
        let current = stored(id, &record);

        let mut store = MockAppointmentStore::new();
        store.expect_get().returning(move |_| Ok(Some(current.clone())));
        store.expect_find_active_for_doctor().never();
        store
            .expect_update_status()
            .times(1)
            .returning(move |_, status| Ok(Appointment { status, ..stored(id, &record) }));

        let updated = service(store, AppConfig::default())
            .update_status(id, AppointmentStatus::Cancelled)
            .await
            .unwrap();

        assert_eq!(updated.status, AppointmentStatus::Cancelled);
    }

    #[tokio::test]
    async fn restricted_policy_rejects_terminal_change() {
        let id = Uuid::new_v4();
        let record = AppointmentRecord::from_input(
            input(Uuid::new_v4(), at(10, 0), 30),
            AppointmentStatus::Attended,
        );
        let current = stored(id, &record);

        let mut store = MockAppointmentStore::new();
        store.expect_get().returning(move |_| Ok(Some(current.clone())));
        store.expect_update_status().never();

        let config = AppConfig {
            transition_policy: TransitionPolicy::Restricted,
            ..AppConfig::default()
        };
        let result = service(store, config)
            .update_status(id, AppointmentStatus::Scheduled)
            .await;

        assert_matches!(result, Err(AppointmentError::InvalidStatusTransition { .. }));
    }

    #[tokio::test]
    async fn update_excludes_itself_from_the_check() {
        let id = Uuid::new_v4();
        let doctor_id = Uuid::new_v4();
        let record = AppointmentRecord::from_input(
            input(doctor_id, at(10, 0), 30),
            AppointmentStatus::Scheduled,
        );
        let current = stored(id, &record);

        let mut store = MockAppointmentStore::new();
        store.expect_get().returning(move |_| Ok(Some(current.clone())));
        store
            .expect_find_active_for_doctor()
            .withf(move |doctor, _, _, exclude| *doctor == doctor_id && *exclude == Some(id))
            .times(1)
            .returning(|_, _, _, _| Ok(vec![]));
        store
            .expect_update()
            .times(1)
            .returning(move |id, record| Ok(stored(id, record)));

        let mut edit = input(doctor_id, at(10, 0), 30);
        edit.notes = Some("Bring lab results".to_string());

        let updated = service(store, AppConfig::default())
            .update_appointment(id, edit)
            .await
            .unwrap();

        assert_eq!(updated.notes.as_deref(), Some("Bring lab results"));
    }

    #[tokio::test]
    async fn status_change_uses_state_read_under_the_lock() {
        let id = Uuid::new_v4();
        let doctor_id = Uuid::new_v4();
        let scheduled = stored(id, &AppointmentRecord::from_input(
            input(doctor_id, at(10, 0), 30),
            AppointmentStatus::Scheduled,
        ));
        // Cancelled by another request between the first read and the lock.
        let cancelled = Appointment { status: AppointmentStatus::Cancelled, ..scheduled.clone() };

        let mut seq = Sequence::new();
        let mut store = MockAppointmentStore::new();
        store
            .expect_get()
            .times(1)
            .in_sequence(&mut seq)
            .returning(move |_| Ok(Some(scheduled.clone())));
        store
            .expect_get()
            .times(1)
            .in_sequence(&mut seq)
            .returning(move |_| Ok(Some(cancelled.clone())));
        store
            .expect_find_active_for_doctor()
            .times(1)
            .returning(|_, _, _, _| Ok(vec![booked(at(10, 15), 15)]));
        store.expect_update_status().never();

        let result = service(store, AppConfig::default())
            .update_status(id, AppointmentStatus::Scheduled)
            .await;

        assert_matches!(result, Err(AppointmentError::ConflictDetected(_)));
    }

    #[tokio::test]
    async fn update_follows_appointment_moved_to_another_doctor() {
        let id = Uuid::new_v4();
        let first_doctor = Uuid::new_v4();
        let second_doctor = Uuid::new_v4();
        let before = stored(id, &AppointmentRecord::from_input(
            input(first_doctor, at(10, 0), 30),
            AppointmentStatus::Scheduled,
        ));
        let moved = Appointment { doctor_id: second_doctor, ..before.clone() };
        let moved_again = moved.clone();

        let mut seq = Sequence::new();
        let mut store = MockAppointmentStore::new();
        store
            .expect_get()
            .times(1)
            .in_sequence(&mut seq)
            .returning(move |_| Ok(Some(before.clone())));
        store
            .expect_get()
            .times(2)
            .in_sequence(&mut seq)
            .returning(move |_| Ok(Some(moved_again.clone())));
        store
            .expect_find_active_for_doctor()
            .times(1)
            .returning(|_, _, _, _| Ok(vec![]));
        store
            .expect_update()
            .times(1)
            .returning(move |id, record| Ok(stored(id, record)));

        let updated = service(store, AppConfig::default())
            .update_appointment(id, input(second_doctor, at(11, 0), 30))
            .await
            .unwrap();

        assert_eq!(updated.doctor_id, moved.doctor_id);
    }

    #[tokio::test]
    async fn delete_missing_appointment_is_not_found() {
        let mut store = MockAppointmentStore::new();
        store.expect_get().returning(|_| Ok(None));
        store.expect_delete().never();

        let result = service(store, AppConfig::default())
            .delete_appointment(Uuid::new_v4())
            .await;

        assert_eq!(result, Err(AppointmentError::NotFound));
    }
}
