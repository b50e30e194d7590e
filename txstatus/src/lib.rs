//! Resolution and caching of transaction statuses.
//!
//! A reader that encounters a value written by a transaction needs to know
//! whether that transaction committed, and when. [`CommitTsCache`] answers
//! this from an in-process cache, falling back to a [`TransactionStore`] and
//! aborting transactions that have no recorded status.

mod cache;
mod primitive;
mod status;
mod store;

pub use cache::CommitTsCache;
pub use status::{Timestamp, TransactionStatus, ABORTED_RAW};
pub use store::{MemoryStore, TransactionStore};

/// The default maximum number of transactions requested from the store in a
/// single batch.
pub const DEFAULT_BATCH_LIMIT: usize = 10_000;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The transaction already has a recorded status.
    ///
    /// Returned by [`TransactionStore::put_unless_exists`].
    #[error("transaction {0} already has a recorded status")]
    KeyAlreadyExists(Timestamp),

    /// The transaction store could not serve the request.
    #[error("transaction store is unavailable")]
    Unavailable(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Two different statuses were observed for the same transaction.
    #[error("status of transaction {start_ts} changed from {cached} to {loaded}")]
    InconsistentStatus {
        start_ts: Timestamp,
        cached: TransactionStatus,
        loaded: TransactionStatus,
    },

    /// The store rejected a write because of an existing status, but then
    /// returned no status.
    #[error("transaction {0} has no status after a conflicting write")]
    MissingAfterConflict(Timestamp),

    /// A raw status read from the store is neither a commit timestamp nor
    /// the abort marker.
    #[error("invalid raw transaction status {0}")]
    InvalidRawStatus(i64),

    /// A commit timestamp is too large to be stored as a raw status.
    #[error("timestamp {0} is out of range")]
    TimestampOutOfRange(Timestamp),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Wraps an error from the underlying store client.
    pub fn unavailable<E>(err: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        Self::Unavailable(err.into())
    }

    /// Whether the error indicates that the store holds inconsistent or
    /// undecodable data.
    pub const fn is_corruption(&self) -> bool {
        matches!(
            self,
            Self::InconsistentStatus { .. }
                | Self::MissingAfterConflict(_)
                | Self::InvalidRawStatus(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;

pub struct CacheOptions {
    batch_limit: usize,
}

impl Default for CacheOptions {
    fn default() -> Self {
        Self {
            batch_limit: DEFAULT_BATCH_LIMIT,
        }
    }
}

impl CacheOptions {
    pub fn new() -> Self {
        Default::default()
    }

    /// Creates a cache backed by `store`.
    pub fn open<S: TransactionStore>(self, store: S) -> CommitTsCache<S> {
        CommitTsCache::with_batch_limit(store, self.batch_limit)
    }

    /// The maximum number of transactions requested from the store in
    /// a single batch by [`CommitTsCache::load_batch`].
    /// Defaults to [`DEFAULT_BATCH_LIMIT`]. Values below 1 are treated as 1.
    pub const fn batch_limit(mut self, n: usize) -> Self {
        self.batch_limit = n;
        self
    }
}

static_assertions::assert_impl_all!(CommitTsCache<MemoryStore>: Send, Sync);
static_assertions::assert_impl_all!(MemoryStore: Send, Sync);
