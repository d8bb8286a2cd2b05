//! Sharded in-memory verification store.
//!
//! Subjects are routed to one of N independently locked shards, so requests
//! for different subjects rarely contend while every operation on the same
//! subject is serialized by its shard lock. A poisoned shard is reported as
//! [`LodgeError::StoreUnavailable`], never as a missing entry.

use chrono::{DateTime, Utc};
use lodge_common::LodgeError;
use std::collections::HashMap;
use std::hash::{BuildHasher, RandomState};
use std::sync::{Mutex, MutexGuard};

use super::VerificationEntry;

type Shard = HashMap<String, VerificationEntry>;

/// What to do with an entry after [`VerificationStore::inspect`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryAction {
    Keep,
    Remove,
}

/// Concurrency-safe map from subject key to its pending code
pub struct VerificationStore {
    shards: Box<[Mutex<Shard>]>,
    hasher: RandomState,
}

impl VerificationStore {
    /// Create a store with `shard_count` shards (at least one)
    pub fn new(shard_count: usize) -> Self {
        let shards = (0..shard_count.max(1))
            .map(|_| Mutex::new(Shard::new()))
            .collect();

        Self {
            shards,
            hasher: RandomState::new(),
        }
    }

    pub fn shard_count(&self) -> usize {
        self.shards.len()
    }

    fn shard_index(&self, subject: &str) -> usize {
        (self.hasher.hash_one(subject) % self.shards.len() as u64) as usize
    }

    fn lock_shard(&self, index: usize) -> Result<MutexGuard<'_, Shard>, LodgeError> {
        self.shards[index].lock().map_err(|_| {
            tracing::error!(shard = index, "Verification store shard lock poisoned");
            LodgeError::StoreUnavailable(format!("shard {index} lock poisoned"))
        })
    }

    fn shard_for(&self, subject: &str) -> Result<MutexGuard<'_, Shard>, LodgeError> {
        self.lock_shard(self.shard_index(subject))
    }

    /// Store an entry, replacing any pending entry for the same subject.
    ///
    /// Returns the replaced entry, if there was one.
    pub fn put(&self, entry: VerificationEntry) -> Result<Option<VerificationEntry>, LodgeError> {
        let mut shard = self.shard_for(&entry.subject_key)?;
        Ok(shard.insert(entry.subject_key.clone(), entry))
    }

    pub fn get(&self, subject: &str) -> Result<Option<VerificationEntry>, LodgeError> {
        let shard = self.shard_for(subject)?;
        Ok(shard.get(subject).cloned())
    }

    /// Remove a subject's entry. Removing an absent subject is a no-op.
    ///
    /// Returns whether an entry was removed.
    pub fn delete(&self, subject: &str) -> Result<bool, LodgeError> {
        let mut shard = self.shard_for(subject)?;
        Ok(shard.remove(subject).is_some())
    }

    /// Read and conditionally remove a subject's entry as one atomic step.
    ///
    /// `decide` runs while the subject's shard lock is held.
    pub fn inspect<R>(
        &self,
        subject: &str,
        decide: impl FnOnce(Option<&VerificationEntry>) -> (R, EntryAction),
    ) -> Result<R, LodgeError> {
        let mut shard = self.shard_for(subject)?;
        let (result, action) = decide(shard.get(subject));

        if action == EntryAction::Remove {
            shard.remove(subject);
        }

        Ok(result)
    }

    /// Remove every entry with `expires_at < now`.
    ///
    /// Shards are locked one at a time. Returns the number removed.
    pub fn sweep_expired(&self, now: DateTime<Utc>) -> Result<usize, LodgeError> {
        let mut removed = 0;

        for index in 0..self.shards.len() {
            let mut shard = self.lock_shard(index)?;
            let before = shard.len();
            shard.retain(|_, entry| entry.expires_at >= now);
            removed += before - shard.len();
        }

        Ok(removed)
    }

    /// Number of pending entries
    pub fn len(&self) -> Result<usize, LodgeError> {
        let mut total = 0;
        for index in 0..self.shards.len() {
            total += self.lock_shard(index)?.len();
        }
        Ok(total)
    }
}
