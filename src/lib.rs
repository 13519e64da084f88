#![warn(unreachable_pub)]
#![deny(unused_must_use, rust_2018_idioms)]

//! Parallel vanity-address search for Solana: find an Ed25519 keypair whose
//! Base58-encoded public key starts with a chosen prefix.
//!
//! The prefix is compiled once into a set of inclusive 32-byte ranges so
//! that per-candidate testing is a handful of `memcmp`s instead of a Base58
//! encode. CPU workers walk random cosets of the scalar space; an optional
//! OpenCL worker burns through 24-bit batches of a random root. Confirmed
//! matches funnel through one channel into the coordinator, which owns all
//! printing and the stop decision.

use std::io::{self, Write as _};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use console::Term;
use crossbeam_channel::unbounded;
use separator::Separatable;

pub mod cpu;
pub mod derive;
pub mod error;
pub mod estimate;
pub mod gpu;
pub mod matcher;

pub use error::Error;

use estimate::ConfidenceEstimates;
use matcher::Matcher;

/// Refresh interval of the progress line.
const PROGRESS_INTERVAL: Duration = Duration::from_millis(250);

/// Fully resolved search parameters. Built by the CLI layer; defaults and
/// validation (thread floor, prefix alphabet, clamped integers) happen
/// there so this struct is always runnable as-is.
#[derive(Clone, Debug)]
pub struct Config {
    pub prefix: String,
    pub threads: usize,
    pub gpu: bool,
    /// Stop after this many matches; 0 means run until killed.
    pub limit: u64,
    pub gpu_threads: usize,
    pub gpu_local_work_size: Option<usize>,
    pub gpu_global_work_size: Option<usize>,
    pub gpu_platform: usize,
    pub gpu_device: usize,
    pub no_progress: bool,
    pub simple_output: bool,
}

impl Config {
    /// The kernel global work size: the explicit override when given,
    /// otherwise `--gpu-threads`.
    pub fn global_work_size(&self) -> usize {
        self.gpu_global_work_size.unwrap_or(self.gpu_threads)
    }
}

/// A confirmed match: the 32-byte private seed and the address it derives
/// to. Re-derivable by anyone from the seed alone.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FoundKey {
    pub seed: [u8; 32],
    pub address: String,
}

/// Counters and the stop flag shared by every worker.
///
/// Both counters are observational: workers only `fetch_add` and readers
/// only `load`, nothing synchronizes through them, so relaxed ordering is
/// enough everywhere.
pub struct SearchShared {
    pub attempts: AtomicU64,
    pub found: AtomicU64,
    pub stop: AtomicBool,
    /// CPU workers skip the per-attempt counter bump when nobody reports
    /// progress.
    pub count_attempts: bool,
}

impl SearchShared {
    pub fn new(count_attempts: bool) -> Self {
        Self {
            attempts: AtomicU64::new(0),
            found: AtomicU64::new(0),
            stop: AtomicBool::new(false),
            count_attempts,
        }
    }
}

/// Run the whole search: compile the prefix, print the plan, spawn the
/// workers and the progress reporter, drain matches until the limit is
/// reached, then stop and join everything.
pub fn run(config: Config) -> Result<(), Error> {
    let matcher = Arc::new(Matcher::compile(&config.prefix)?);
    let estimates = ConfidenceEstimates::for_ranges(matcher.ranges());

    if !config.simple_output {
        print_search_plan(&config, &matcher, &estimates);
    }

    let shared = Arc::new(SearchShared::new(!config.no_progress));
    let (sender, receiver) = unbounded();
    let mut handles = Vec::with_capacity(config.threads + 2);

    if !config.no_progress {
        let shared = Arc::clone(&shared);
        handles.push(
            thread::Builder::new()
                .name("progress".into())
                .spawn(move || progress_loop(&shared))
                .expect("failed to spawn progress thread"),
        );
    }

    for index in 0..config.threads {
        let matcher = Arc::clone(&matcher);
        let shared = Arc::clone(&shared);
        let sink = sender.clone();
        handles.push(
            thread::Builder::new()
                .name(format!("cpu-{index}"))
                .spawn(move || cpu::worker_loop(&matcher, &shared, &sink))
                .expect("failed to spawn CPU worker"),
        );
    }

    if config.gpu {
        // GPU is an accelerator, not a requirement
        match gpu::GpuSearcher::init(&config, &matcher) {
            Ok(searcher) => {
                let shared = Arc::clone(&shared);
                let sink = sender.clone();
                handles.push(
                    thread::Builder::new()
                        .name("gpu".into())
                        .spawn(move || searcher.run(&shared, &sink))
                        .expect("failed to spawn GPU worker"),
                );
            }
            Err(err) => log::warn!("continuing with CPU only: {err}"),
        }
    }
    drop(sender);

    for found in receiver.iter() {
        emit_match(&config, &found);
        let committed = shared.found.fetch_add(1, Ordering::Relaxed) + 1;
        if config.limit != 0 && committed >= config.limit {
            break;
        }
    }

    shared.stop.store(true, Ordering::Relaxed);
    drop(receiver);
    for handle in handles {
        let _ = handle.join();
    }
    Ok(())
}

/// Write one match record in a single burst so records from a busy search
/// never interleave mid-line.
fn emit_match(config: &Config, found: &FoundKey) {
    let key_hex = hex::encode_upper(found.seed);
    if config.simple_output {
        let stdout = io::stdout();
        let mut out = stdout.lock();
        let _ = writeln!(out, "{key_hex} {}", found.address);
        let _ = out.flush();
    } else {
        let stderr = io::stderr();
        let mut out = stderr.lock();
        let _ = write!(
            out,
            "\nFound matching account!\nPrivate key: {key_hex}\nAddress:     {}\n",
            found.address
        );
        let _ = out.flush();
    }
}

/// The verbose-mode preamble: what is being searched, the compiled ranges
/// rendered back as addresses, and how long it is expected to take.
fn print_search_plan(config: &Config, matcher: &Matcher, estimates: &ConfidenceEstimates) {
    let stderr = io::stderr();
    let mut out = stderr.lock();
    let _ = writeln!(
        out,
        "Searching for addresses starting with {:?} using {} CPU thread(s){}",
        matcher.prefix(),
        config.threads,
        if config.gpu { " and the GPU" } else { "" }
    );
    let _ = writeln!(out, "{} candidate range(s):", matcher.ranges().len());
    for range in matcher.ranges() {
        let _ = writeln!(
            out,
            "  {} .. {}",
            bs58::encode(range.min).into_string(),
            bs58::encode(range.max).into_string()
        );
    }
    let _ = writeln!(
        out,
        "Estimated attempts: {} (p50), {} (p90), {} (p99)",
        estimates.p50.separated_string(),
        estimates.p90.separated_string(),
        estimates.p99.separated_string()
    );
    let _ = out.flush();
}

/// Repaint `\rTried N keys (R keys/s)` on stderr every 250 ms until the
/// search stops.
fn progress_loop(shared: &SearchShared) {
    let term = Term::stderr();
    let mut last_instant = Instant::now();
    let mut last_count = 0u64;
    while !shared.stop.load(Ordering::Relaxed) {
        thread::sleep(PROGRESS_INTERVAL);
        let count = shared.attempts.load(Ordering::Relaxed);
        let elapsed = last_instant.elapsed().as_secs_f64();
        let rate = if elapsed > 0.0 {
            (count - last_count) as f64 / elapsed
        } else {
            0.0
        };
        last_instant = Instant::now();
        last_count = count;
        let _ = term.write_str(&format!("\rTried {count} keys ({rate:.1} keys/s)"));
    }
    let _ = term.write_str("\n");
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_config() -> Config {
        Config {
            prefix: "C".into(),
            threads: 1,
            gpu: false,
            limit: 1,
            gpu_threads: 1 << 20,
            gpu_local_work_size: None,
            gpu_global_work_size: None,
            gpu_platform: 0,
            gpu_device: 0,
            no_progress: true,
            simple_output: true,
        }
    }

    #[test]
    fn global_work_size_falls_back_to_gpu_threads() {
        let mut config = base_config();
        assert_eq!(config.global_work_size(), 1 << 20);
        config.gpu_global_work_size = Some(4096);
        assert_eq!(config.global_work_size(), 4096);
    }

    #[test]
    fn run_stops_after_the_limit() {
        // single-character prefix: a few hundred derivations at worst
        run(base_config()).unwrap();
    }

    #[test]
    fn run_rejects_an_uncompilable_prefix() {
        let mut config = base_config();
        config.prefix = "0".into();
        assert!(matches!(run(config), Err(Error::InvalidPrefix(_))));
    }
}
