mod memory;

pub use memory::MemoryStore;

use crate::{Result, Timestamp, TransactionStatus};
use std::{collections::HashMap, sync::Arc};

/// A durable mapping from start timestamps to transaction statuses.
///
/// Statuses are write-once: once a status is recorded for a start timestamp,
/// it never changes.
pub trait TransactionStore: Send + Sync {
    /// Returns the status recorded for the transaction.
    ///
    /// Returns `None` if the transaction has no recorded status, i.e. it is
    /// still running, crashed, or never started.
    fn get(&self, start_ts: Timestamp) -> Result<Option<TransactionStatus>>;

    /// Atomically records `status` for the transaction unless a status is
    /// already recorded.
    ///
    /// Implementations must fail with [`Error::KeyAlreadyExists`] if a status
    /// is already recorded, and must not emulate this with a read followed by
    /// a write.
    ///
    /// [`Error::KeyAlreadyExists`]: crate::Error::KeyAlreadyExists
    fn put_unless_exists(&self, start_ts: Timestamp, status: TransactionStatus) -> Result<()>;

    /// Returns the statuses recorded for the given transactions.
    ///
    /// Transactions without a recorded status are absent from the result.
    fn get_batch(&self, start_ts: &[Timestamp]) -> Result<HashMap<Timestamp, TransactionStatus>>;
}

impl<S: TransactionStore + ?Sized> TransactionStore for &S {
    fn get(&self, start_ts: Timestamp) -> Result<Option<TransactionStatus>> {
        (**self).get(start_ts)
    }

    fn put_unless_exists(&self, start_ts: Timestamp, status: TransactionStatus) -> Result<()> {
        (**self).put_unless_exists(start_ts, status)
    }

    fn get_batch(&self, start_ts: &[Timestamp]) -> Result<HashMap<Timestamp, TransactionStatus>> {
        (**self).get_batch(start_ts)
    }
}

impl<S: TransactionStore + ?Sized> TransactionStore for Arc<S> {
    fn get(&self, start_ts: Timestamp) -> Result<Option<TransactionStatus>> {
        (**self).get(start_ts)
    }

    fn put_unless_exists(&self, start_ts: Timestamp, status: TransactionStatus) -> Result<()> {
        (**self).put_unless_exists(start_ts, status)
    }

    fn get_batch(&self, start_ts: &[Timestamp]) -> Result<HashMap<Timestamp, TransactionStatus>> {
        (**self).get_batch(start_ts)
    }
}
