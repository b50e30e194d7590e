use itertools::Itertools;
use std::collections::HashMap;
use txstatus::{
    CommitTsCache, Error, MemoryStore, Result, Timestamp, TransactionStatus, TransactionStore,
};

#[cfg(shuttle)]
use shuttle::{
    sync::{
        atomic::{AtomicUsize, Ordering::SeqCst},
        Arc,
    },
    thread,
};

#[cfg(not(shuttle))]
use std::{
    sync::{
        atomic::{AtomicUsize, Ordering::SeqCst},
        Arc,
    },
    thread,
};

const NUM_READERS: usize = 4;
const NUM_ITERATIONS: usize = 100;
const START_TS: Timestamp = Timestamp(100);
const COMMIT_TS: Timestamp = Timestamp(200);

/// A [`MemoryStore`] that counts successful conditional writes.
#[derive(Default)]
struct CountingStore {
    inner: MemoryStore,
    successful_puts: AtomicUsize,
}

impl TransactionStore for CountingStore {
    fn get(&self, start_ts: Timestamp) -> Result<Option<TransactionStatus>> {
        self.inner.get(start_ts)
    }

    fn put_unless_exists(&self, start_ts: Timestamp, status: TransactionStatus) -> Result<()> {
        self.inner.put_unless_exists(start_ts, status)?;
        self.successful_puts.fetch_add(1, SeqCst);
        Ok(())
    }

    fn get_batch(&self, start_ts: &[Timestamp]) -> Result<HashMap<Timestamp, TransactionStatus>> {
        self.inner.get_batch(start_ts)
    }
}

fn check<F>(f: F)
where
    F: Fn() + Send + Sync + 'static,
{
    #[cfg(shuttle)]
    shuttle::check_random(f, NUM_ITERATIONS);

    #[cfg(not(shuttle))]
    for _ in 0..NUM_ITERATIONS {
        f();
    }
}

fn spawn_readers(
    cache: &Arc<CommitTsCache<Arc<CountingStore>>>,
) -> Vec<thread::JoinHandle<Result<TransactionStatus>>> {
    (0..NUM_READERS)
        .map(|_| {
            let cache = cache.clone();
            thread::spawn(move || cache.resolve(START_TS))
        })
        .collect()
}

#[test]
fn concurrent_resolve_of_unresolved_transaction() {
    check(|| {
        let store = Arc::new(CountingStore::default());
        let cache = Arc::new(CommitTsCache::new(store.clone()));

        let statuses: Vec<_> = spawn_readers(&cache)
            .into_iter()
            .map(|handle| handle.join().unwrap().unwrap())
            .collect();

        assert!(statuses
            .iter()
            .all(|&status| status == TransactionStatus::Aborted));
        assert_eq!(store.successful_puts.load(SeqCst), 1);
        assert_eq!(
            store.get(START_TS).unwrap(),
            Some(TransactionStatus::Aborted)
        );
    });
}

#[test]
fn concurrent_resolve_racing_commit() {
    check(|| {
        let store = Arc::new(CountingStore::default());
        let cache = Arc::new(CommitTsCache::new(store.clone()));

        let committer = {
            let store = store.clone();
            thread::spawn(move || {
                store.put_unless_exists(START_TS, TransactionStatus::Committed(COMMIT_TS))
            })
        };
        let readers = spawn_readers(&cache);

        let commit_result = committer.join().unwrap();
        let statuses: Vec<_> = readers
            .into_iter()
            .map(|handle| handle.join().unwrap().unwrap())
            .collect();

        assert!(statuses.iter().all_equal());
        assert_eq!(store.successful_puts.load(SeqCst), 1);

        let expected = match commit_result {
            Ok(()) => TransactionStatus::Committed(COMMIT_TS),
            Err(Error::KeyAlreadyExists(_)) => TransactionStatus::Aborted,
            Err(e) => panic!("unexpected error: {e:?}"),
        };
        assert_eq!(statuses[0], expected);
        assert_eq!(store.get(START_TS).unwrap(), Some(expected));
        assert_eq!(cache.peek(START_TS), Some(expected));
    });
}

#[test]
fn concurrent_load_batch_and_resolve() {
    check(|| {
        let store = Arc::new(CountingStore::default());
        for ts in 0..8 {
            store.inner.commit(Timestamp(ts), Timestamp(ts + 1)).unwrap();
        }
        let cache = Arc::new(CommitTsCache::new(store.clone()));

        let loaders: Vec<_> = (0..2)
            .map(|_| {
                let cache = cache.clone();
                thread::spawn(move || cache.load_batch((0..16).map(Timestamp)))
            })
            .collect();
        let resolvers: Vec<_> = (0..2)
            .map(|i| {
                let cache = cache.clone();
                thread::spawn(move || cache.resolve(Timestamp(6 + i * 4)))
            })
            .collect();

        for handle in loaders {
            handle.join().unwrap().unwrap();
        }
        let statuses: Vec<_> = resolvers
            .into_iter()
            .map(|handle| handle.join().unwrap().unwrap())
            .collect();

        assert_eq!(
            statuses,
            vec![
                TransactionStatus::Committed(Timestamp(7)),
                TransactionStatus::Aborted
            ]
        );
        assert_eq!(store.successful_puts.load(SeqCst), 1);
        for ts in 0..8 {
            assert_eq!(
                cache.peek(Timestamp(ts)),
                Some(TransactionStatus::Committed(Timestamp(ts + 1)))
            );
        }
        assert_eq!(cache.peek(Timestamp(10)), Some(TransactionStatus::Aborted));
        assert_eq!(cache.len(), 9);
    });
}
