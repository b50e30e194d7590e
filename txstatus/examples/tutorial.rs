use anyhow::Result;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use txstatus::{CacheOptions, MemoryStore, Timestamp, TransactionStatus};

fn main() -> Result<()> {
    // Set RUST_LOG=debug to see forced aborts and batch loads.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    // In a real deployment, the store is a client of the durable transaction
    // table. MemoryStore keeps everything in memory.
    let store = Arc::new(MemoryStore::new());

    // The write path records commits in the store.
    store.commit(Timestamp(100), Timestamp(200))?;
    store.commit(Timestamp(110), Timestamp(130))?;

    // One cache is shared by all readers in the process.
    let cache = CacheOptions::new().batch_limit(1000).open(store.clone());

    // A transaction that committed resolves to its commit timestamp.
    assert_eq!(
        cache.resolve(Timestamp(100))?,
        TransactionStatus::Committed(Timestamp(200))
    );

    // A transaction without a recorded status is aborted on its behalf, so
    // it can never commit afterwards.
    assert_eq!(cache.resolve(Timestamp(150))?, TransactionStatus::Aborted);
    assert!(store.commit(Timestamp(150), Timestamp(160)).is_err());

    // Scans load the statuses of many transactions at once before resolving
    // them one by one. Transactions that are still running are not aborted
    // by load_batch, so they still need to be resolved individually.
    let start_timestamps = (100..120).map(Timestamp);
    cache.load_batch(start_timestamps.clone())?;
    assert_eq!(
        cache.peek(Timestamp(110)),
        Some(TransactionStatus::Committed(Timestamp(130)))
    );
    assert_eq!(cache.peek(Timestamp(111)), None);

    for start_ts in start_timestamps {
        match cache.resolve(start_ts)? {
            TransactionStatus::Committed(commit_ts) => {
                println!("{start_ts}: committed at {commit_ts}");
            }
            TransactionStatus::Aborted => println!("{start_ts}: aborted"),
        }
    }

    Ok(())
}
