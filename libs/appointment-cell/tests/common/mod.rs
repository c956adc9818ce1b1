#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use uuid::Uuid;

use appointment_cell::models::{
    Appointment, AppointmentQuery, AppointmentRecord, AppointmentStatus, BookedSlot,
};
use appointment_cell::services::scheduling_form::ConflictListener;
use appointment_cell::services::store::AppointmentStore;

pub fn at(hour: u32, minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 10, hour, minute, 0).unwrap()
}

pub fn slot(start: DateTime<Utc>, minutes: i32, status: AppointmentStatus, patient: &str) -> BookedSlot {
    BookedSlot {
        id: Uuid::new_v4(),
        appointment_date: start,
        duration_minutes: minutes,
        status,
        patient_name: patient.to_string(),
    }
}

/// One scripted answer for the conflict query.
pub enum Reply {
    After(Duration, Vec<BookedSlot>),
    Fail,
}

#[derive(Debug, Clone)]
pub struct QueryCall {
    pub doctor_id: Uuid,
    pub day_start: DateTime<Utc>,
    pub day_end: DateTime<Utc>,
    pub exclude_id: Option<Uuid>,
}

/// In-memory store: the conflict query answers from `slots` unless a scripted reply is queued.
#[derive(Default)]
pub struct FakeStore {
    pub slots: Mutex<Vec<BookedSlot>>,
    pub replies: Mutex<VecDeque<Reply>>,
    pub calls: Mutex<Vec<QueryCall>>,
}

impl FakeStore {
    pub fn with_slots(slots: Vec<BookedSlot>) -> Arc<Self> {
        Arc::new(Self {
            slots: Mutex::new(slots),
            ..Self::default()
        })
    }

    pub fn script(&self, reply: Reply) {
        self.replies.lock().unwrap().push_back(reply);
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn last_call(&self) -> Option<QueryCall> {
        self.calls.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl AppointmentStore for FakeStore {
    async fn find_active_for_doctor(
        &self,
        doctor_id: Uuid,
        day_start: DateTime<Utc>,
        day_end: DateTime<Utc>,
        exclude_id: Option<Uuid>,
    ) -> Result<Vec<BookedSlot>> {
        self.calls.lock().unwrap().push(QueryCall { doctor_id, day_start, day_end, exclude_id });

        let scripted = self.replies.lock().unwrap().pop_front();
        match scripted {
            Some(Reply::After(delay, slots)) => {
                tokio::time::sleep(delay).await;
                Ok(slots)
            }
            Some(Reply::Fail) => Err(anyhow!("store unavailable")),
            None => Ok(self
                .slots
                .lock()
                .unwrap()
                .iter()
                .filter(|s| s.status.is_active() && Some(s.id) != exclude_id)
                .cloned()
                .collect()),
        }
    }

    async fn get(&self, _id: Uuid) -> Result<Option<Appointment>> {
        Ok(None)
    }

    async fn list(&self, _query: &AppointmentQuery) -> Result<Vec<Appointment>> {
        Ok(Vec::new())
    }

    async fn insert(&self, _record: &AppointmentRecord) -> Result<Appointment> {
        Err(anyhow!("not used"))
    }

    async fn update(&self, _id: Uuid, _record: &AppointmentRecord) -> Result<Appointment> {
        Err(anyhow!("not used"))
    }

    async fn update_status(&self, _id: Uuid, _status: AppointmentStatus) -> Result<Appointment> {
        Err(anyhow!("not used"))
    }

    async fn delete(&self, _id: Uuid) -> Result<()> {
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Conflict(bool, Option<String>),
    Checking(bool),
}

#[derive(Default)]
pub struct RecordingListener {
    pub events: Mutex<Vec<Event>>,
}

impl RecordingListener {
    pub fn events(&self) -> Vec<Event> {
        self.events.lock().unwrap().clone()
    }

    pub fn conflict_events(&self) -> Vec<Event> {
        self.events()
            .into_iter()
            .filter(|e| matches!(e, Event::Conflict(..)))
            .collect()
    }
}

impl ConflictListener for RecordingListener {
    fn on_conflict_change(&self, has_conflict: bool, message: Option<String>) {
        self.events.lock().unwrap().push(Event::Conflict(has_conflict, message));
    }

    fn on_checking_change(&self, is_checking: bool) {
        self.events.lock().unwrap().push(Event::Checking(is_checking));
    }
}
