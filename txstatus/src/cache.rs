use crate::{primitive::Index, Error, Result, Timestamp, TransactionStatus, TransactionStore};

/// A cache of transaction statuses backed by a [`TransactionStore`].
///
/// Because statuses in the store are write-once, a cached status is valid
/// forever. Entries are never evicted.
///
/// A transaction that has no recorded status when it is first resolved is
/// aborted on its behalf, so that readers never wait on a transaction that
/// crashed before committing.
pub struct CommitTsCache<S> {
    store: S,
    statuses: Index<Timestamp, TransactionStatus>,
    batch_limit: usize,
}

impl<S: TransactionStore> CommitTsCache<S> {
    /// Creates a cache with the default options.
    pub fn new(store: S) -> Self {
        crate::CacheOptions::new().open(store)
    }

    pub(crate) fn with_batch_limit(store: S, batch_limit: usize) -> Self {
        Self {
            store,
            statuses: Default::default(),
            batch_limit: batch_limit.max(1),
        }
    }

    /// Returns the final status of the transaction that started at
    /// `start_ts`.
    ///
    /// If the transaction has no recorded status, it is aborted: the abort is
    /// recorded in the store before `Aborted` is returned. If the transaction
    /// commits (or another reader aborts it) concurrently, the status that
    /// made it into the store first is returned.
    ///
    /// Issues no store requests if the status is cached, and at most three
    /// (read, conditional write, and read) otherwise.
    pub fn resolve(&self, start_ts: Timestamp) -> Result<TransactionStatus> {
        if let Some(status) = self.statuses.get(&start_ts) {
            return Ok(status);
        }
        let status = match self.store.get(start_ts)? {
            Some(status) => status,
            None => self.abort_unresolved(start_ts)?,
        };
        self.insert(start_ts, status)
    }

    /// Loads the statuses of the given transactions into the cache.
    ///
    /// Only transactions that are not cached yet are requested from the
    /// store, in batches of at most `batch_limit` transactions.
    ///
    /// Unlike [`resolve`], transactions without a recorded status are left
    /// alone and stay uncached. Callers that need a definitive status for
    /// such a transaction must [`resolve`] it.
    ///
    /// [`resolve`]: #method.resolve
    pub fn load_batch<I>(&self, start_ts: I) -> Result<()>
    where
        I: IntoIterator<Item = Timestamp>,
    {
        let mut uncached: Vec<_> = start_ts
            .into_iter()
            .filter(|ts| !self.statuses.contains(ts))
            .collect();
        uncached.sort_unstable();
        uncached.dedup();

        for chunk in uncached.chunks(self.batch_limit) {
            let statuses = self.store.get_batch(chunk)?;
            tracing::debug!(
                requested = chunk.len(),
                loaded = statuses.len(),
                "loaded transaction statuses"
            );
            for (ts, status) in statuses {
                self.insert(ts, status)?;
            }
        }
        Ok(())
    }

    /// Returns the cached status of the transaction without accessing the
    /// store.
    pub fn peek(&self, start_ts: Timestamp) -> Option<TransactionStatus> {
        self.statuses.get(&start_ts)
    }

    /// Returns the number of cached statuses.
    pub fn len(&self) -> usize {
        self.statuses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The maximum number of transactions requested in a single batch.
    pub const fn batch_limit(&self) -> usize {
        self.batch_limit
    }

    pub const fn store(&self) -> &S {
        &self.store
    }

    fn abort_unresolved(&self, start_ts: Timestamp) -> Result<TransactionStatus> {
        match self
            .store
            .put_unless_exists(start_ts, TransactionStatus::Aborted)
        {
            Ok(()) => {
                tracing::debug!(%start_ts, "aborted unresolved transaction");
                Ok(TransactionStatus::Aborted)
            }
            Err(Error::KeyAlreadyExists(_)) => {
                // Either the transaction committed or another reader aborted
                // it in the meantime.
                let Some(status) = self.store.get(start_ts)? else {
                    tracing::error!(%start_ts, "status vanished after a conflicting write");
                    return Err(Error::MissingAfterConflict(start_ts));
                };
                tracing::debug!(%start_ts, %status, "lost race to resolve transaction");
                Ok(status)
            }
            Err(e) => Err(e),
        }
    }

    fn insert(&self, start_ts: Timestamp, status: TransactionStatus) -> Result<TransactionStatus> {
        match self.statuses.try_insert(start_ts, status) {
            Ok(()) => Ok(status),
            Err(cached) if cached == status => Ok(status),
            Err(cached) => {
                tracing::error!(%start_ts, %cached, loaded = %status, "transaction status changed");
                Err(Error::InconsistentStatus {
                    start_ts,
                    cached,
                    loaded: status,
                })
            }
        }
    }
}
