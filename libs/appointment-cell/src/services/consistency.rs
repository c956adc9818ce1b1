// libs/appointment-cell/src/services/consistency.rs
//
// Serializes check-then-write per doctor so two requests in this process
// cannot both pass the conflict check for overlapping slots.
//

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tracing::debug;
use uuid::Uuid;

#[derive(Default)]
pub struct SchedulingGuard {
    locks: Mutex<HashMap<Uuid, Arc<AsyncMutex<()>>>>,
}

impl SchedulingGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hold the returned guard for the whole check-and-write sequence.
    pub async fn lock_doctor(&self, doctor_id: Uuid) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
            // Drop entries nobody is waiting on.
            locks.retain(|_, lock| Arc::strong_count(lock) > 1);
            Arc::clone(locks.entry(doctor_id).or_default())
        };

        debug!("Acquiring scheduling lock for doctor {}", doctor_id);
        lock.lock_owned().await
    }

    /// Two doctors at once, always acquired in id order.
    pub async fn lock_doctors(&self, first: Uuid, second: Uuid) -> Vec<OwnedMutexGuard<()>> {
        if first == second {
            return vec![self.lock_doctor(first).await];
        }
        let (low, high) = if first < second { (first, second) } else { (second, first) };
        let low_guard = self.lock_doctor(low).await;
        let high_guard = self.lock_doctor(high).await;
        vec![low_guard, high_guard]
    }

    /// Doctors whose lock is currently held or awaited.
    pub fn tracked_doctors(&self) -> usize {
        self.locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .filter(|lock| Arc::strong_count(lock) > 1)
            .count()
    }
}
