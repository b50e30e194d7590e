#![allow(dead_code)]

use parking_lot::Mutex;
use std::collections::HashMap;
use txstatus::{Error, MemoryStore, Result, Timestamp, TransactionStatus, TransactionStore};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Get(Timestamp),
    PutUnlessExists(Timestamp, TransactionStatus),
    GetBatch(Vec<Timestamp>),
}

/// A [`MemoryStore`] that records every request made to it.
#[derive(Default)]
pub struct RecordingStore {
    pub inner: MemoryStore,
    calls: Mutex<Vec<Call>>,
}

impl RecordingStore {
    /// Creates a store where every transaction in `start_ts` committed at
    /// its own start timestamp.
    pub fn with_identity_commits(start_ts: impl IntoIterator<Item = u64>) -> Self {
        let store = Self::default();
        for ts in start_ts {
            store.inner.commit(Timestamp(ts), Timestamp(ts)).unwrap();
        }
        store
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }

    pub fn take_calls(&self) -> Vec<Call> {
        std::mem::take(&mut *self.calls.lock())
    }

    /// The timestamps requested by each `get_batch` call, in call order.
    pub fn batches(&self) -> Vec<Vec<Timestamp>> {
        self.calls
            .lock()
            .iter()
            .filter_map(|call| match call {
                Call::GetBatch(batch) => Some(batch.clone()),
                _ => None,
            })
            .collect()
    }
}

impl TransactionStore for RecordingStore {
    fn get(&self, start_ts: Timestamp) -> Result<Option<TransactionStatus>> {
        self.calls.lock().push(Call::Get(start_ts));
        self.inner.get(start_ts)
    }

    fn put_unless_exists(&self, start_ts: Timestamp, status: TransactionStatus) -> Result<()> {
        self.calls
            .lock()
            .push(Call::PutUnlessExists(start_ts, status));
        self.inner.put_unless_exists(start_ts, status)
    }

    fn get_batch(&self, start_ts: &[Timestamp]) -> Result<HashMap<Timestamp, TransactionStatus>> {
        self.calls.lock().push(Call::GetBatch(start_ts.to_vec()));
        self.inner.get_batch(start_ts)
    }
}

/// A store whose every request fails.
pub struct UnavailableStore;

impl TransactionStore for UnavailableStore {
    fn get(&self, _: Timestamp) -> Result<Option<TransactionStatus>> {
        Err(Error::unavailable("connection refused"))
    }

    fn put_unless_exists(&self, _: Timestamp, _: TransactionStatus) -> Result<()> {
        Err(Error::unavailable("connection refused"))
    }

    fn get_batch(&self, _: &[Timestamp]) -> Result<HashMap<Timestamp, TransactionStatus>> {
        Err(Error::unavailable("connection refused"))
    }
}

pub fn timestamps(range: std::ops::Range<u64>) -> impl Iterator<Item = Timestamp> {
    range.map(Timestamp)
}
