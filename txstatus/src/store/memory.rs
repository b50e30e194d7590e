use super::TransactionStore;
use crate::{primitive::Index, Error, Result, Timestamp, TransactionStatus};
use std::collections::HashMap;

/// An in-memory [`TransactionStore`].
///
/// Nothing is persisted, so this is only suitable for tests and benchmarks,
/// or for a process that owns every transaction it resolves.
#[derive(Default)]
pub struct MemoryStore {
    statuses: Index<Timestamp, TransactionStatus>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Default::default()
    }

    /// Records that the transaction committed at `commit_ts`.
    ///
    /// Fails with [`Error::KeyAlreadyExists`] if the transaction already has
    /// a status, e.g. because a reader aborted it first.
    pub fn commit(&self, start_ts: Timestamp, commit_ts: Timestamp) -> Result<()> {
        self.put_unless_exists(start_ts, TransactionStatus::Committed(commit_ts))
    }

    /// Records that the transaction aborted.
    pub fn abort(&self, start_ts: Timestamp) -> Result<()> {
        self.put_unless_exists(start_ts, TransactionStatus::Aborted)
    }

    /// Returns the number of recorded statuses.
    pub fn len(&self) -> usize {
        self.statuses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl TransactionStore for MemoryStore {
    fn get(&self, start_ts: Timestamp) -> Result<Option<TransactionStatus>> {
        Ok(self.statuses.get(&start_ts))
    }

    fn put_unless_exists(&self, start_ts: Timestamp, status: TransactionStatus) -> Result<()> {
        self.statuses
            .try_insert(start_ts, status)
            .map_err(|_| Error::KeyAlreadyExists(start_ts))
    }

    fn get_batch(&self, start_ts: &[Timestamp]) -> Result<HashMap<Timestamp, TransactionStatus>> {
        Ok(start_ts
            .iter()
            .filter_map(|&ts| self.statuses.get(&ts).map(|status| (ts, status)))
            .collect())
    }
}
