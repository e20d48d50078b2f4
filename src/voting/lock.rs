//! Per-(user, poll) voting locks
//!
//! Serialises concurrent vote submissions by the same user on the same poll so
//! that the "has voted?" check and the insert behave as one step:
//! 1. A submission acquires the lock for its (user, poll) key
//! 2. Other submissions for that key wait until the holder releases
//! 3. Submissions for any other key proceed independently
//! 4. Entries are dropped once nobody holds or waits on them

use crate::{Error, Result};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tokio::sync::OwnedMutexGuard;

type LockTable = HashMap<String, Arc<tokio::sync::Mutex<()>>>;

/// Generate the lock key for a user and poll
pub fn lock_key(user_id: &str, poll_id: &str) -> String {
    format!("vote_lock:{user_id}:{poll_id}")
}

/// Hands out per-(user, poll) locks
#[derive(Clone, Default)]
pub struct PollLockService {
    locks: Arc<Mutex<LockTable>>,
}

impl PollLockService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for and take the lock for this user and poll
    pub async fn acquire(&self, user_id: &str, poll_id: &str) -> Result<PollVoteGuard> {
        let key = lock_key(user_id, poll_id);

        let entry = {
            let mut locks = self
                .locks
                .lock()
                .map_err(|_| Error::internal("Lock service write error"))?;
            locks.entry(key.clone()).or_default().clone()
        };

        let guard = entry.lock_owned().await;

        tracing::debug!(lock = %key, "Voting lock acquired");

        Ok(PollVoteGuard {
            key,
            acquired_at: Instant::now(),
            guard: Some(guard),
            locks: self.locks.clone(),
        })
    }

    /// Number of keys currently held or waited on
    pub fn active_locks(&self) -> Result<usize> {
        let locks = self
            .locks
            .lock()
            .map_err(|_| Error::internal("Lock service read error"))?;
        Ok(locks.len())
    }
}

/// Held while a submission checks and writes its vote. Dropping releases it.
pub struct PollVoteGuard {
    key: String,
    acquired_at: Instant,
    guard: Option<OwnedMutexGuard<()>>,
    locks: Arc<Mutex<LockTable>>,
}

impl PollVoteGuard {
    pub fn key(&self) -> &str {
        &self.key
    }
}

impl Drop for PollVoteGuard {
    fn drop(&mut self) {
        // Release first so the table's Arc is the only one left when nobody waits.
        self.guard.take();

        if let Ok(mut locks) = self.locks.lock() {
            if locks
                .get(&self.key)
                .is_some_and(|entry| Arc::strong_count(entry) == 1)
            {
                locks.remove(&self.key);
            }
        }

        tracing::debug!(
            lock = %self.key,
            held_us = self.acquired_at.elapsed().as_micros() as u64,
            "Voting lock released"
        );
    }
}
