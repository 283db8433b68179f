//! Per-case serialization of state-changing operations.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use anyhow::Result;
use tokio::sync::OwnedMutexGuard;

/// Hands out one async mutex per case id.
///
/// Operations on the same case queue behind each other; different cases never
/// contend. An entry lives while a guard or a waiter holds it and is dropped
/// from the table on a later `acquire`.
#[derive(Default)]
pub struct CaseLocks {
    locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl CaseLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to a case. Access is released when the guard
    /// is dropped.
    pub async fn acquire(&self, case_id: &str) -> Result<OwnedMutexGuard<()>> {
        let lock = {
            let mut locks = self
                .locks
                .lock()
                .map_err(|_| anyhow::anyhow!("Case lock table poisoned"))?;
            // Only the table still references these: no guard, no waiter.
            locks.retain(|_, lock| Arc::strong_count(lock) > 1);
            locks.entry(case_id.to_string()).or_default().clone()
        };
        Ok(lock.lock_owned().await)
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.locks.lock().map(|locks| locks.len()).unwrap_or_default()
    }
}
