mod stress;

use anyhow::bail;

use crate::stress::{Config, Paired, Report, StressKey};

const HELP: &str = "\
phm-stress: hammer a persistent hash map from several threads

USAGE:
  phm-stress [OPTIONS]

OPTIONS:
  --ops N          total number of updates across all writers [default: 200000]
  --writers N      threads publishing new versions [default: 4]
  --readers N      threads validating snapshots [default: 2]
  --key-range N    number of distinct keys [default: 4096]
  --collide        use keys that share hashes in pairs
  --seed N         seed for the writers' operation streams [default: random]
  -h, --help       print this message
";

struct Args {
    config: Config,
    collide: bool,
}

fn parse_args() -> anyhow::Result<Args> {
    let mut pargs = pico_args::Arguments::from_env();
    if pargs.contains(["-h", "--help"]) {
        print!("{HELP}");
        std::process::exit(0);
    }

    let config = Config {
        ops: pargs.opt_value_from_str("--ops")?.unwrap_or(200_000),
        writers: pargs.opt_value_from_str("--writers")?.unwrap_or(4),
        readers: pargs.opt_value_from_str("--readers")?.unwrap_or(2),
        key_range: pargs.opt_value_from_str("--key-range")?.unwrap_or(4096),
        seed: pargs
            .opt_value_from_str("--seed")?
            .unwrap_or_else(rand::random),
    };
    let collide = pargs.contains("--collide");

    let rest = pargs.finish();
    if !rest.is_empty() {
        bail!("unexpected arguments: {rest:?}");
    }
    if config.writers == 0 {
        bail!("--writers must be at least 1");
    }
    if config.key_range == 0 {
        bail!("--key-range must be at least 1");
    }
    Ok(Args { config, collide })
}

fn run<K: StressKey>(config: &Config) -> anyhow::Result<Report> {
    log::info!(
        "Starting {} writers and {} readers over {} {} keys (seed {})",
        config.writers,
        config.readers,
        config.key_range,
        K::NAME,
        config.seed
    );
    let (_, report) = stress::run::<K>(config)?;
    log::info!(
        "{} retries, {} snapshots validated in {:?}",
        report.retries,
        report.snapshots,
        report.elapsed
    );
    Ok(report)
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let Args { config, collide } = parse_args()?;

    let (keys, report) = if collide {
        (Paired::NAME, run::<Paired>(&config)?)
    } else {
        (u64::NAME, run::<u64>(&config)?)
    };

    println!("keys, ops, writers, readers, entries, retries, snapshots, time (us)");
    println!(
        "{keys:6}\t {ops:8}\t {w:3}\t {r:3}\t {len:8}\t {retries:6}\t {snaps:6}\t {us:8}",
        ops = config.ops,
        w = config.writers,
        r = config.readers,
        len = report.final_len,
        retries = report.retries,
        snaps = report.snapshots,
        us = report.elapsed.as_micros(),
    );
    Ok(())
}
