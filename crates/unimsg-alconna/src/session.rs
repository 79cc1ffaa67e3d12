//! Per-conversation mutual exclusion.
//!
//! At most one parse (including any completion rounds it starts) runs per
//! session id. Later events for the same id wait in arrival order; other
//! conversations are never blocked.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tracing::trace;

type LockTable = HashMap<String, Arc<AsyncMutex<()>>>;

/// Session id to lock table. Cloning shares the table.
#[derive(Clone, Default)]
pub struct SessionLocks {
    table: Arc<Mutex<LockTable>>,
}

impl SessionLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits until no other holder of `session_id` remains.
    ///
    /// Waiters are served first-come first-served. The lock is released when
    /// the returned guard is dropped, including when the owning task is
    /// cancelled.
    pub async fn acquire(&self, session_id: &str) -> SessionGuard {
        let lock = {
            let mut table = self.table.lock();
            Arc::clone(table.entry(session_id.to_string()).or_default())
        };
        trace!(session = %session_id, "waiting for session lock");
        let guard = lock.lock_owned().await;
        trace!(session = %session_id, "session lock acquired");
        SessionGuard {
            table: Arc::clone(&self.table),
            session_id: session_id.to_string(),
            guard: Some(guard),
        }
    }

    /// Returns `true` if a parse currently holds `session_id`.
    pub fn is_busy(&self, session_id: &str) -> bool {
        self.table
            .lock()
            .get(session_id)
            .is_some_and(|lock| lock.try_lock().is_err())
    }

    /// Number of session ids with a holder or waiters.
    pub fn active(&self) -> usize {
        self.table.lock().len()
    }
}

impl std::fmt::Debug for SessionLocks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionLocks")
            .field("active", &self.active())
            .finish()
    }
}

/// Holds a session until dropped.
pub struct SessionGuard {
    table: Arc<Mutex<LockTable>>,
    session_id: String,
    guard: Option<OwnedMutexGuard<()>>,
}

impl std::fmt::Debug for SessionGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionGuard")
            .field("session_id", &self.session_id)
            .finish_non_exhaustive()
    }
}

impl SessionGuard {
    pub fn session_id(&self) -> &str {
        &self.session_id
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        let mut table = self.table.lock();
        drop(self.guard.take());
        // Waiters hold their own reference, so a count of one means idle.
        if table
            .get(&self.session_id)
            .is_some_and(|lock| Arc::strong_count(lock) == 1)
        {
            table.remove(&self.session_id);
        }
        trace!(session = %self.session_id, "session lock released");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_entries_reclaimed() {
        let locks = SessionLocks::new();
        let guard = locks.acquire("a").await;
        assert!(locks.is_busy("a"));
        assert_eq!(locks.active(), 1);
        drop(guard);
        assert!(!locks.is_busy("a"));
        assert_eq!(locks.active(), 0);
    }

    #[tokio::test]
    async fn test_independent_sessions_do_not_block() {
        let locks = SessionLocks::new();
        let _a = locks.acquire("a").await;
        let b = tokio::time::timeout(Duration::from_millis(50), locks.acquire("b")).await;
        assert!(b.is_ok());
    }

    #[test]
    fn test_waiter_woken_on_release() {
        let locks = SessionLocks::new();
        let first = tokio_test::block_on(locks.acquire("a"));
        let mut waiter = tokio_test::task::spawn(locks.acquire("a"));
        tokio_test::assert_pending!(waiter.poll());

        drop(first);
        assert!(waiter.is_woken());
        let guard = tokio_test::assert_ready!(waiter.poll());
        assert_eq!(guard.session_id(), "a");
    }

    #[tokio::test(start_paused = true)]
    async fn test_same_session_waits() {
        let locks = SessionLocks::new();
        let first = locks.acquire("a").await;

        let waiter = {
            let locks = locks.clone();
            tokio::spawn(async move {
                let _guard = locks.acquire("a").await;
            })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(!waiter.is_finished());
        assert_eq!(locks.active(), 1);

        drop(first);
        waiter.await.unwrap();
        assert_eq!(locks.active(), 0);
    }
}
