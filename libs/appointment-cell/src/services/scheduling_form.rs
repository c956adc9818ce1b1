//! Debounced conflict checking for an appointment form.
//!
//! Every edit of doctor, date, time or duration restarts a quiet-period timer;
//! when it elapses one conflict check runs with the latest values. Checks are
//! tagged with a generation number and only the newest generation may update
//! the form, so a slow superseded check can never overwrite a newer answer.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::{NaiveDate, NaiveTime};
use tokio::task::JoinHandle;
use tracing::debug;
use uuid::Uuid;

use shared_config::AppConfig;

use crate::models::{ConflictCandidate, ConflictResult};
use crate::services::conflict::ConflictDetectionService;
use crate::services::store::AppointmentStore;

pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(500);

/// Receives form-level conflict state changes.
pub trait ConflictListener: Send + Sync {
    fn on_conflict_change(&self, has_conflict: bool, message: Option<String>);
    fn on_checking_change(&self, is_checking: bool);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormPhase {
    Idle,
    /// Debounce timer running.
    Pending,
    /// Store query in flight.
    Checking,
}

struct FormState {
    fields: ConflictCandidate,
    phase: FormPhase,
    generation: u64,
    has_conflict: bool,
    message: Option<String>,
    is_checking: bool,
    last_result: Option<ConflictResult>,
    pending: Option<JoinHandle<()>>,
    disposed: bool,
}

struct Inner {
    checker: Arc<ConflictDetectionService>,
    listener: Arc<dyn ConflictListener>,
    debounce: Duration,
    state: Mutex<FormState>,
}

/// Notifications collected under the lock and delivered after releasing it.
#[derive(Default)]
struct Outbox {
    checking: Option<bool>,
    conflict: Option<(bool, Option<String>)>,
}

impl Outbox {
    fn deliver(self, listener: &dyn ConflictListener) {
        if let Some((has_conflict, message)) = self.conflict {
            listener.on_conflict_change(has_conflict, message);
        }
        if let Some(is_checking) = self.checking {
            listener.on_checking_change(is_checking);
        }
    }
}

impl Inner {
    fn lock(&self) -> MutexGuard<'_, FormState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn run_check(self: Arc<Self>, generation: u64) {
        let candidate = {
            let mut state = self.lock();
            if state.disposed || state.generation != generation {
                return;
            }
            state.phase = FormPhase::Checking;
            state.fields.clone()
        };

        let result = self.checker.check_conflict(&candidate).await;

        let outbox = {
            let mut state = self.lock();
            if state.disposed || state.generation != generation {
                debug!("Discarding stale conflict result for generation {}", generation);
                return;
            }

            let mut outbox = Outbox::default();
            let has_conflict = result.has_conflict();
            let message = result.message().map(str::to_string);
            if has_conflict != state.has_conflict || message != state.message {
                outbox.conflict = Some((has_conflict, message.clone()));
            }
            if state.is_checking {
                outbox.checking = Some(false);
            }

            state.phase = FormPhase::Idle;
            state.has_conflict = has_conflict;
            state.message = message;
            state.is_checking = false;
            state.last_result = Some(result);
            state.pending = None;
            outbox
        };

        outbox.deliver(self.listener.as_ref());
    }
}

/// Conflict-checking state of one appointment form.
///
/// Must be used from inside a tokio runtime: field edits spawn the debounce
/// timer. Dropping the controller cancels any pending timer.
pub struct SchedulingFormController {
    inner: Arc<Inner>,
}

impl SchedulingFormController {
    pub fn new(
        checker: Arc<ConflictDetectionService>,
        listener: Arc<dyn ConflictListener>,
        debounce: Duration,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                checker,
                listener,
                debounce,
                state: Mutex::new(FormState {
                    fields: ConflictCandidate::default(),
                    phase: FormPhase::Idle,
                    generation: 0,
                    has_conflict: false,
                    message: None,
                    is_checking: false,
                    last_result: None,
                    pending: None,
                    disposed: false,
                }),
            }),
        }
    }

    /// Quiet period and store-failure policy taken from `CONFLICT_DEBOUNCE_MS`
    /// and `CONFLICT_CHECK_POLICY`.
    pub fn from_config(
        config: &AppConfig,
        store: Arc<dyn AppointmentStore>,
        listener: Arc<dyn ConflictListener>,
    ) -> Self {
        let checker = Arc::new(ConflictDetectionService::new(store, config.conflict_policy));
        Self::new(checker, listener, Duration::from_millis(config.conflict_debounce_ms))
    }

    pub fn debounce(&self) -> Duration {
        self.inner.debounce
    }

    /// Controller for editing an existing appointment: it never conflicts with itself.
    pub fn for_existing(
        checker: Arc<ConflictDetectionService>,
        listener: Arc<dyn ConflictListener>,
        debounce: Duration,
        appointment_id: Uuid,
    ) -> Self {
        let controller = Self::new(checker, listener, debounce);
        controller.inner.lock().fields.exclude_id = Some(appointment_id);
        controller
    }

    pub fn set_doctor(&self, doctor_id: Option<Uuid>) {
        self.edit(|fields| fields.doctor_id = doctor_id);
    }

    pub fn set_date(&self, date: Option<NaiveDate>) {
        self.edit(|fields| fields.date = date);
    }

    pub fn set_time(&self, time: Option<NaiveTime>) {
        self.edit(|fields| fields.time = time);
    }

    pub fn set_duration(&self, duration_minutes: Option<i32>) {
        self.edit(|fields| fields.duration_minutes = duration_minutes);
    }

    /// Replace all four fields at once (e.g. when the form is loaded).
    pub fn load(&self, candidate: ConflictCandidate) {
        self.edit(|fields| {
            let exclude_id = fields.exclude_id;
            *fields = candidate;
            if fields.exclude_id.is_none() {
                fields.exclude_id = exclude_id;
            }
        });
    }

    fn edit<F>(&self, apply: F)
    where
        F: FnOnce(&mut ConflictCandidate),
    {
        let outbox = {
            let mut state = self.inner.lock();
            if state.disposed {
                return;
            }

            let before = state.fields.clone();
            apply(&mut state.fields);
            if state.fields == before {
                return;
            }

            state.generation += 1;
            let generation = state.generation;

            // A running timer is cancelled; an in-flight query is left to finish
            // and its result is dropped by the generation check.
            if let Some(handle) = state.pending.take() {
                if state.phase == FormPhase::Pending {
                    handle.abort();
                }
            }

            let mut outbox = Outbox::default();

            if !state.fields.is_complete() {
                state.phase = FormPhase::Idle;
                if state.is_checking {
                    state.is_checking = false;
                    outbox.checking = Some(false);
                }
                if state.has_conflict {
                    outbox.conflict = Some((false, None));
                }
                state.has_conflict = false;
                state.message = None;
                state.last_result = Some(ConflictResult::NotChecked);
            } else {
                state.phase = FormPhase::Pending;
                if !state.is_checking {
                    state.is_checking = true;
                    outbox.checking = Some(true);
                }

                let inner = Arc::clone(&self.inner);
                let debounce = self.inner.debounce;
                state.pending = Some(tokio::spawn(async move {
                    tokio::time::sleep(debounce).await;
                    inner.run_check(generation).await;
                }));
            }

            outbox
        };

        outbox.deliver(self.inner.listener.as_ref());
    }

    /// Stop all pending work; later edits are ignored.
    pub fn dispose(&self) {
        let outbox = {
            let mut state = self.inner.lock();
            if state.disposed {
                return;
            }
            state.disposed = true;
            state.generation += 1;
            if let Some(handle) = state.pending.take() {
                handle.abort();
            }
            state.phase = FormPhase::Idle;

            let mut outbox = Outbox::default();
            if state.is_checking {
                state.is_checking = false;
                outbox.checking = Some(false);
            }
            outbox
        };

        outbox.deliver(self.inner.listener.as_ref());
    }

    /// Submission is blocked while a conflict is flagged or a check is scheduled or running.
    pub fn can_submit(&self) -> bool {
        let state = self.inner.lock();
        !state.has_conflict && !state.is_checking
    }

    pub fn has_conflict(&self) -> bool {
        self.inner.lock().has_conflict
    }

    pub fn conflict_message(&self) -> Option<String> {
        self.inner.lock().message.clone()
    }

    pub fn is_checking(&self) -> bool {
        self.inner.lock().is_checking
    }

    pub fn phase(&self) -> FormPhase {
        self.inner.lock().phase
    }

    pub fn last_result(&self) -> Option<ConflictResult> {
        self.inner.lock().last_result.clone()
    }

    pub fn fields(&self) -> ConflictCandidate {
        self.inner.lock().fields.clone()
    }
}

impl Drop for SchedulingFormController {
    fn drop(&mut self) {
        let mut state = self.inner.lock();
        state.disposed = true;
        if let Some(handle) = state.pending.take() {
            handle.abort();
        }
    }
}
