//! Sharded in-memory store holding at most one record per identity.

use dashmap::{mapref::entry::Entry, DashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use super::models::{ConsumeOutcome, OtpRecord, RecordState};

#[derive(Debug, Default)]
pub struct OtpStore {
    records: DashMap<String, OtpRecord>,
    next_generation: AtomicU64,
}

impl OtpStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `record`, replacing (and thereby invalidating) any previous one.
    /// Returns the generation assigned to the new record.
    pub fn put(&self, identity: &str, mut record: OtpRecord) -> u64 {
        let generation = self.next_generation.fetch_add(1, Ordering::Relaxed) + 1;
        record.set_generation(generation);
        self.records.insert(identity.to_string(), record);
        generation
    }

    /// Current live record. Expired records are purged on the way out.
    pub fn get(&self, identity: &str, now: Instant) -> Option<OtpRecord> {
        let live = self
            .records
            .get(identity)
            .and_then(|record| record.is_live(now).then(|| record.clone()));
        if live.is_none() {
            self.records.remove_if(identity, |_, record| record.is_expired(now));
        }
        live
    }

    /// Generation of the record held for `identity`, whatever its state.
    pub fn generation(&self, identity: &str) -> Option<u64> {
        self.records.get(identity).map(|record| record.generation())
    }

    /// Check and consume `supplied` against record `generation`.
    ///
    /// Runs under the shard lock for `identity`, so two concurrent calls with
    /// the right code can never both see `Verified`. A record re-issued since
    /// the attempt was admitted reads as `Mismatched` and is left untouched.
    /// With `final_attempt` set, a mismatch invalidates the record under the
    /// same lock and reads as `Exhausted`.
    pub fn consume(
        &self,
        identity: &str,
        generation: u64,
        supplied: &str,
        now: Instant,
        final_attempt: bool,
    ) -> ConsumeOutcome {
        let Entry::Occupied(mut entry) = self.records.entry(identity.to_string()) else {
            return ConsumeOutcome::NotFound;
        };

        if entry.get().is_consumed() {
            return ConsumeOutcome::NotFound;
        }
        if entry.get().generation() != generation {
            return ConsumeOutcome::Mismatched;
        }
        if entry.get().is_expired(now) {
            entry.remove();
            return ConsumeOutcome::Expired;
        }

        let record = entry.get_mut();
        record.record_attempt();
        if record.code().matches(supplied) {
            record.mark(RecordState::Verified);
            ConsumeOutcome::Verified
        } else if final_attempt {
            record.mark(RecordState::Invalidated);
            ConsumeOutcome::Exhausted
        } else {
            ConsumeOutcome::Mismatched
        }
    }

    /// Retire record `generation` if it is still the pending one. Returns true
    /// when a pending record was invalidated.
    pub fn invalidate(&self, identity: &str, generation: u64) -> bool {
        self.records.get_mut(identity).is_some_and(|mut record| {
            if record.generation() != generation || record.state() != RecordState::Pending {
                return false;
            }
            record.mark(RecordState::Invalidated);
            true
        })
    }

    /// Remove expired and terminal records. Returns how many were removed.
    pub fn sweep(&self, now: Instant) -> usize {
        let before = self.records.len();
        self.records.retain(|_, record| record.is_live(now));
        before.saturating_sub(self.records.len())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
