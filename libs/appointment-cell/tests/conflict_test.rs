mod common;

use std::sync::Arc;

use assert_matches::assert_matches;
use chrono::{NaiveDate, NaiveTime};
use uuid::Uuid;

use appointment_cell::models::{AppointmentStatus, ConflictCandidate, ConflictResult};
use appointment_cell::services::conflict::ConflictDetectionService;
use shared_config::ConflictPolicy;

use common::{at, slot, FakeStore, Reply};

fn checker(store: Arc<FakeStore>) -> ConflictDetectionService {
    ConflictDetectionService::new(store, ConflictPolicy::FailOpen)
}

#[tokio::test]
async fn doctor_with_ten_oclock_booking() {
    let store = FakeStore::with_slots(vec![slot(at(10, 0), 30, AppointmentStatus::Scheduled, "María García")]);
    let service = checker(Arc::clone(&store));
    let doctor = Uuid::new_v4();

    let cases = [
        (at(10, 15), true),
        (at(10, 30), false),
        (at(9, 30), false),
        (at(9, 45), true),
    ];

    for (start, expected) in cases {
        let result = service
            .check_conflict(&ConflictCandidate::for_slot(doctor, start, 30))
            .await;
        assert_eq!(result.has_conflict(), expected, "candidate starting {}", start);
    }

    assert_eq!(store.call_count(), 4);
}

#[tokio::test]
async fn conflict_message_names_patient_and_range() {
    let store = FakeStore::with_slots(vec![slot(at(10, 0), 30, AppointmentStatus::Confirmed, "María García")]);
    let result = checker(store)
        .check_conflict(&ConflictCandidate::for_slot(Uuid::new_v4(), at(10, 15), 30))
        .await;

    assert_matches!(result, ConflictResult::Conflict { ref message, .. }
        if message == "The doctor already has an appointment with María García from 10:00 - 10:30");
}

#[tokio::test]
async fn editing_without_moving_never_conflicts_with_itself() {
    let own = slot(at(10, 0), 30, AppointmentStatus::Scheduled, "María García");
    let own_id = own.id;
    let store = FakeStore::with_slots(vec![own]);

    let candidate = ConflictCandidate::for_slot(Uuid::new_v4(), at(10, 0), 30).excluding(own_id);
    let result = checker(Arc::clone(&store)).check_conflict(&candidate).await;

    assert_eq!(result, ConflictResult::Clear);
    assert_eq!(store.last_call().unwrap().exclude_id, Some(own_id));
}

#[tokio::test]
async fn cancelled_and_attended_slots_do_not_block() {
    let store = FakeStore::with_slots(vec![
        slot(at(10, 0), 30, AppointmentStatus::Cancelled, "A"),
        slot(at(10, 0), 30, AppointmentStatus::Attended, "B"),
        slot(at(10, 0), 30, AppointmentStatus::NoShow, "C"),
    ]);

    let result = checker(store)
        .check_conflict(&ConflictCandidate::for_slot(Uuid::new_v4(), at(10, 0), 30))
        .await;

    assert_eq!(result, ConflictResult::Clear);
}

#[tokio::test]
async fn query_covers_the_whole_calendar_day() {
    let store = FakeStore::with_slots(vec![]);
    let candidate = ConflictCandidate {
        doctor_id: Some(Uuid::new_v4()),
        date: NaiveDate::from_ymd_opt(2025, 3, 10),
        time: NaiveTime::from_hms_opt(16, 45, 0),
        duration_minutes: Some(45),
        exclude_id: None,
    };

    checker(Arc::clone(&store)).check_conflict(&candidate).await;

    let call = store.last_call().unwrap();
    assert_eq!(call.day_start, at(0, 0));
    assert_eq!(call.day_end.to_rfc3339(), "2025-03-10T23:59:59.999+00:00");
}

#[tokio::test]
async fn missing_fields_are_not_checked() {
    let store = FakeStore::with_slots(vec![]);
    let candidate = ConflictCandidate {
        doctor_id: Some(Uuid::new_v4()),
        date: NaiveDate::from_ymd_opt(2025, 3, 10),
        time: None,
        duration_minutes: Some(30),
        exclude_id: None,
    };

    let result = checker(Arc::clone(&store)).check_conflict(&candidate).await;

    assert_eq!(result, ConflictResult::NotChecked);
    assert_eq!(store.call_count(), 0);
}

#[tokio::test]
async fn store_failure_is_swallowed_by_default() {
    let store = FakeStore::with_slots(vec![]);
    store.script(Reply::Fail);

    let result = checker(store)
        .check_conflict(&ConflictCandidate::for_slot(Uuid::new_v4(), at(10, 0), 30))
        .await;

    assert_matches!(result, ConflictResult::Unverified { blocks_submission: false, .. });
    assert!(!result.has_conflict());
}
