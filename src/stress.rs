//! Concurrent writers and readers sharing one published map.
use std::{
    fmt::Debug,
    hash::{Hash, Hasher},
    sync::atomic::{AtomicBool, AtomicUsize, Ordering},
    time::{Duration, Instant},
};

use anyhow::{bail, Context};
use parking_lot::Mutex;
use phm::HashMap;
use rand::{rngs::StdRng, Rng, SeedableRng};

pub type Oracle<K> = hashbrown::HashMap<K, u64>;

/// A key type the driver can generate from a plain id.
pub trait StressKey: Hash + Eq + Copy + Send + Sync + Debug + 'static {
    const NAME: &'static str;
    fn from_id(id: u64) -> Self;
}

impl StressKey for u64 {
    const NAME: &'static str = "u64";

    fn from_id(id: u64) -> u64 {
        id
    }
}

/// Pairs of ids share a hash, so half the map lives in collision nodes.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Paired(u64);

impl Hash for Paired {
    fn hash<H: Hasher>(&self, state: &mut H) {
        (self.0 / 2).hash(state)
    }
}

impl StressKey for Paired {
    const NAME: &'static str = "paired";

    fn from_id(id: u64) -> Paired {
        Paired(id)
    }
}

#[derive(Clone, Debug)]
pub struct Config {
    pub ops: usize,
    pub writers: usize,
    pub readers: usize,
    pub key_range: u64,
    pub seed: u64,
}

#[derive(Default, Debug)]
pub struct Report {
    pub final_len: usize,
    pub retries: usize,
    pub snapshots: usize,
    pub elapsed: Duration,
}

struct Shared<K> {
    current: Mutex<HashMap<K, u64>>,
    writers_left: AtomicUsize,
    failed: AtomicBool,
    errors: Mutex<Vec<anyhow::Error>>,
}

impl<K> Shared<K> {
    fn fail(&self, err: anyhow::Error) {
        self.failed.store(true, Ordering::Relaxed);
        self.errors.lock().push(err);
    }
}

/// Run `config.writers` writers and `config.readers` readers against one
/// shared map, then compare the final map against what the writers expect.
///
/// Writer `w` owns the ids congruent to `w` modulo the writer count, so the
/// final contents are determined even though the interleaving is not.
/// Returns the last published map along with the run's statistics.
pub fn run<K: StressKey>(config: &Config) -> anyhow::Result<(HashMap<K, u64>, Report)> {
    let shared = Shared {
        current: Mutex::new(HashMap::<K, u64>::new()),
        writers_left: AtomicUsize::new(config.writers),
        failed: AtomicBool::new(false),
        errors: Mutex::new(Vec::new()),
    };
    let oracles = Mutex::new(Vec::with_capacity(config.writers));
    let retries = AtomicUsize::new(0);
    let snapshots = AtomicUsize::new(0);

    // Readers spin until the writers finish, so every task needs its own
    // thread.
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(config.writers + config.readers)
        .build()
        .context("building the worker pool")?;

    let start = Instant::now();
    pool.scope(|s| {
        for w in 0..config.writers {
            let (shared, oracles, retries) = (&shared, &oracles, &retries);
            s.spawn(move |_| {
                let (oracle, r) = write::<K>(shared, config, w);
                log::debug!("writer {w} finished with {r} retries");
                retries.fetch_add(r, Ordering::Relaxed);
                oracles.lock().push(oracle);
                shared.writers_left.fetch_sub(1, Ordering::Release);
            });
        }
        for r in 0..config.readers {
            let (shared, snapshots) = (&shared, &snapshots);
            s.spawn(move |_| match read::<K>(shared) {
                Ok(n) => {
                    log::debug!("reader {r} checked {n} snapshots");
                    snapshots.fetch_add(n, Ordering::Relaxed);
                }
                Err(err) => shared.fail(err.context(format!("reader {r}"))),
            });
        }
    });
    let elapsed = start.elapsed();

    if let Some(err) = shared.errors.lock().pop() {
        return Err(err);
    }

    let expected: Oracle<K> = oracles.into_inner().into_iter().flatten().collect();
    let last = shared.current.into_inner();
    last.validate().context("final map")?;
    compare(&last, &expected)?;

    let report = Report {
        final_len: last.len(),
        retries: retries.into_inner(),
        snapshots: snapshots.into_inner(),
        elapsed,
    };
    Ok((last, report))
}

/// Apply this writer's share of the operations, publishing each new map
/// only if nobody else published since it was derived. Returns the
/// expected contents of the writer's partition and the number of lost
/// races.
fn write<K: StressKey>(shared: &Shared<K>, config: &Config, w: usize) -> (Oracle<K>, usize) {
    let writers = config.writers as u64;
    let slots = config.key_range.div_ceil(writers).max(1);
    let mut rng = StdRng::seed_from_u64(config.seed.wrapping_add(w as u64));
    let mut oracle = Oracle::default();
    let mut retries = 0;

    for i in 0..config.ops / config.writers {
        if shared.failed.load(Ordering::Relaxed) {
            break;
        }
        let id = rng.gen_range(0..slots) * writers + w as u64;
        let key = K::from_id(id);
        let insert = rng.gen_bool(0.7);
        let value = ((w as u64) << 32) | i as u64;

        let mut base = shared.current.lock().clone();
        loop {
            let next = if insert {
                base.set(key, value)
            } else {
                base.unset(&key)
            };
            let mut current = shared.current.lock();
            if current.ptr_eq(&base) {
                *current = next;
                break;
            }
            retries += 1;
            base = current.clone();
        }

        if insert {
            oracle.insert(key, value);
        } else {
            oracle.remove(&key);
        }
    }
    (oracle, retries)
}

/// Snapshot the published map until every writer is done, checking each
/// snapshot's structure and that it still reads the same after the writers
/// have moved on.
fn read<K: StressKey>(shared: &Shared<K>) -> anyhow::Result<usize> {
    let mut checked = 0;
    let mut first: Option<(HashMap<K, u64>, Oracle<K>)> = None;
    while shared.writers_left.load(Ordering::Acquire) > 0 && !shared.failed.load(Ordering::Relaxed)
    {
        let snapshot = shared.current.lock().clone();
        snapshot
            .validate()
            .with_context(|| format!("snapshot {checked}"))?;
        let mut visited = 0;
        snapshot.visit(|_, k, v| {
            visited += 1;
            snapshot.try_find(k) == Some(v)
        });
        if visited != snapshot.len() {
            bail!(
                "snapshot {checked} visited {visited} entries but holds {}",
                snapshot.len()
            );
        }
        if first.is_none() && !snapshot.is_empty() {
            let contents: Oracle<K> = snapshot.iter().map(|(k, v)| (*k, *v)).collect();
            first = Some((snapshot, contents));
        }
        checked += 1;
    }
    if let Some((snapshot, contents)) = first {
        compare(&snapshot, &contents).context("first snapshot changed")?;
    }
    Ok(checked)
}

fn compare<K: StressKey>(map: &HashMap<K, u64>, expected: &Oracle<K>) -> anyhow::Result<()> {
    if map.len() != expected.len() {
        bail!("map holds {} entries, expected {}", map.len(), expected.len());
    }
    for (k, v) in expected {
        match map.get(k) {
            Some(found) if found == v => {}
            found => bail!("key {k:?}: found {found:?}, expected {v}"),
        }
    }
    Ok(())
}
