use clap::{arg, Parser, ValueEnum};
use rand::{distributions::Uniform, prelude::Distribution, Rng, SeedableRng};
use serde::Serialize;
use std::{
    collections::HashMap,
    io::Write,
    sync::{
        atomic::{AtomicBool, AtomicU64, Ordering},
        Arc, Barrier,
    },
    time::{Duration, Instant},
};
use tracing_subscriber::EnvFilter;
use txstatus::{
    CacheOptions, CommitTsCache, MemoryStore, Timestamp, TransactionStatus, TransactionStore,
    DEFAULT_BATCH_LIMIT,
};

#[cfg(all(feature = "jemalloc", not(target_env = "msvc")))]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

#[derive(Parser)]
struct Cli {
    #[arg(long, default_value_t = 8)]
    threads: usize,

    /// Number of distinct start timestamps.
    #[arg(long, default_value_t = 1_000_000)]
    transactions: u64,

    /// Fraction of transactions that have committed before the benchmark
    /// starts. The rest are resolved to aborted by readers.
    #[arg(long, default_value_t = 0.9)]
    commit_ratio: f64,

    /// Duration of the benchmark in milliseconds.
    #[arg(long, default_value_t = 2000)]
    duration: u64,

    /// Number of consecutive transactions resolved by a single scan.
    #[arg(long, default_value_t = 1000)]
    scan_size: u64,

    #[arg(long, default_value_t = DEFAULT_BATCH_LIMIT)]
    batch_limit: usize,

    /// Simulated latency of a single store request in microseconds.
    #[arg(long, default_value_t = 0)]
    latency: u64,

    #[arg(long, value_enum, default_value_t = WorkloadKind::Scan)]
    workload: WorkloadKind,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum WorkloadKind {
    /// Resolves uniformly random transactions one at a time.
    Point,

    /// Loads a range of transactions in batches, then resolves each of them.
    Scan,
}

/// A [`MemoryStore`] that behaves like a remote store.
struct SimulatedStore {
    inner: MemoryStore,
    latency: Duration,
    requests: AtomicU64,
}

impl SimulatedStore {
    fn round_trip(&self) {
        self.requests.fetch_add(1, Ordering::Relaxed);
        if !self.latency.is_zero() {
            std::thread::sleep(self.latency);
        }
    }
}

impl TransactionStore for SimulatedStore {
    fn get(&self, start_ts: Timestamp) -> txstatus::Result<Option<TransactionStatus>> {
        self.round_trip();
        self.inner.get(start_ts)
    }

    fn put_unless_exists(
        &self,
        start_ts: Timestamp,
        status: TransactionStatus,
    ) -> txstatus::Result<()> {
        self.round_trip();
        self.inner.put_unless_exists(start_ts, status)
    }

    fn get_batch(
        &self,
        start_ts: &[Timestamp],
    ) -> txstatus::Result<HashMap<Timestamp, TransactionStatus>> {
        self.round_trip();
        self.inner.get_batch(start_ts)
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    anyhow::ensure!(
        cli.transactions > cli.scan_size,
        "--transactions must be larger than --scan-size"
    );
    anyhow::ensure!(
        (0.0..=1.0).contains(&cli.commit_ratio),
        "--commit-ratio must be between 0 and 1"
    );

    let store = Arc::new(SimulatedStore {
        inner: MemoryStore::new(),
        latency: Duration::from_micros(cli.latency),
        requests: 0.into(),
    });
    populate(&store.inner, cli.transactions, cli.commit_ratio);

    struct State {
        cache: CommitTsCache<Arc<SimulatedStore>>,
        barrier: Barrier,
        is_running: AtomicBool,
    }
    let state = Arc::new(State {
        cache: CacheOptions::new()
            .batch_limit(cli.batch_limit)
            .open(store.clone()),
        barrier: Barrier::new(cli.threads + 1),
        is_running: true.into(),
    });

    #[derive(Default)]
    struct Statistics {
        num_committed: u64,
        num_aborted: u64,
    }

    #[cfg(feature = "affinity")]
    let core_ids = core_affinity::get_core_ids().unwrap();
    #[cfg(feature = "affinity")]
    assert!(core_ids.len() >= cli.threads);

    tracing::info!(threads = cli.threads, "spawning worker threads");
    let workload = cli.workload;
    let transactions = cli.transactions;
    let scan_size = cli.scan_size;
    let clients: Vec<_> = (0..cli.threads)
        .map(|#[allow(unused)] i| {
            #[cfg(feature = "affinity")]
            let core_id = core_ids[i];
            let state = state.clone();
            std::thread::spawn(move || -> txstatus::Result<Statistics> {
                #[cfg(feature = "affinity")]
                assert!(core_affinity::set_for_current(core_id));
                let mut rng = rand::rngs::SmallRng::from_entropy();
                let mut stats = Statistics::default();
                let mut record = |status: TransactionStatus| match status {
                    TransactionStatus::Committed(_) => stats.num_committed += 1,
                    TransactionStatus::Aborted => stats.num_aborted += 1,
                };

                state.barrier.wait();
                match workload {
                    WorkloadKind::Point => {
                        let dist = Uniform::new(0, transactions);
                        while state.is_running.load(Ordering::Relaxed) {
                            let start_ts = Timestamp(dist.sample(&mut rng));
                            record(state.cache.resolve(start_ts)?);
                        }
                    }
                    WorkloadKind::Scan => {
                        let dist = Uniform::new(0, transactions - scan_size);
                        while state.is_running.load(Ordering::Relaxed) {
                            let from = dist.sample(&mut rng);
                            let range = (from..from + scan_size).map(Timestamp);
                            state.cache.load_batch(range.clone())?;
                            for start_ts in range {
                                record(state.cache.resolve(start_ts)?);
                            }
                        }
                    }
                }
                Ok(stats)
            })
        })
        .collect();

    tracing::info!("start");
    state.barrier.wait();

    let start = Instant::now();
    std::thread::sleep(Duration::from_millis(cli.duration));
    state.is_running.store(false, Ordering::SeqCst);
    let elapsed = start.elapsed();

    let mut stats = Statistics::default();
    for client in clients {
        let s = client.join().unwrap()?;
        stats.num_committed += s.num_committed;
        stats.num_aborted += s.num_aborted;
    }
    let resolves = stats.num_committed + stats.num_aborted;
    let store_requests = store.requests.load(Ordering::SeqCst);

    tracing::info!("finished");
    eprintln!("Elapsed\t{:.3?}", elapsed);
    eprintln!("Resolves\t{}", resolves);
    eprintln!("Committed\t{}", stats.num_committed);
    eprintln!("Aborted\t{}", stats.num_aborted);
    eprintln!("Store requests\t{}", store_requests);
    eprintln!("Cached\t{}", state.cache.len());
    let rps = (resolves as f64 / elapsed.as_secs_f64()) as u64;
    eprintln!("Resolves/s\t{}", rps);

    #[derive(Serialize)]
    struct Summary {
        etime: u64,
        resolves: u64,
        committed: u64,
        aborted: u64,
        rps: u64,
        store_requests: u64,
        cached: usize,
        workload: String,
        threads: usize,
        batch_limit: usize,
        latency: u64,
    }
    let mut stdout = std::io::stdout().lock();
    serde_json::ser::to_writer_pretty(
        &mut stdout,
        &Summary {
            etime: elapsed.as_millis() as u64,
            resolves,
            committed: stats.num_committed,
            aborted: stats.num_aborted,
            rps,
            store_requests,
            cached: state.cache.len(),
            workload: format!("{:?}", cli.workload),
            threads: cli.threads,
            batch_limit: state.cache.batch_limit(),
            latency: cli.latency,
        },
    )?;
    stdout.write_all(b"\n")?;
    Ok(())
}

/// Records commits for a `commit_ratio` fraction of `0..transactions`, using
/// all available cores.
fn populate(store: &MemoryStore, transactions: u64, commit_ratio: f64) {
    let num_threads = match std::thread::available_parallelism() {
        Ok(n) => n.get() as u64,
        Err(_) => 1,
    };
    tracing::info!(transactions, commit_ratio, "populating transaction store");
    std::thread::scope(|s| {
        for thread_index in 0..num_threads {
            let from = transactions * thread_index / num_threads;
            let to = transactions * (thread_index + 1) / num_threads;
            s.spawn(move || {
                let mut rng = rand::rngs::SmallRng::from_entropy();
                for start_ts in from..to {
                    if rng.gen_bool(commit_ratio) {
                        let commit_ts = start_ts + rng.gen_range(1..=100);
                        store
                            .commit(Timestamp(start_ts), Timestamp(commit_ts))
                            .unwrap();
                    }
                }
            });
        }
    });
}
