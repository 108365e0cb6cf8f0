//! Per-session transition locks

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::debug;

use crate::domain::SessionId;

/// Registry handing out one async mutex per session
///
/// A transition holds the owned guard for its whole duration. Tokio mutexes are fair, so waiting
/// transitions run in arrival order.
#[derive(Debug, Default)]
pub struct SessionLocks {
    locks: Mutex<HashMap<SessionId, Arc<Mutex<()>>>>,
}

impl SessionLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to a session
    pub async fn acquire(&self, id: &SessionId) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().await;
            locks.entry(id.clone()).or_default().clone()
        };
        debug!(session_id = %id, "SessionLocks::acquire: waiting");
        lock.lock_owned().await
    }

    /// Drop the lock for a session that no longer exists
    pub async fn remove(&self, id: &SessionId) {
        self.locks.lock().await.remove(id);
    }

    pub async fn len(&self) -> usize {
        self.locks.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.locks.lock().await.is_empty()
    }
}
