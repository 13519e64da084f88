use std::process;

use clap::error::ErrorKind;
use clap::Parser;

use svanity::matcher::{ALPHABET, MAX_ADDRESS_LEN};
use svanity::Config;

/// Search for a Solana keypair whose Base58 address starts with PREFIX.
#[derive(Parser, Debug)]
#[command(name = "svanity", version, about)]
struct Cli {
    /// Base58 prefix the address must start with
    #[arg(value_parser = parse_prefix)]
    prefix: String,

    /// Number of CPU worker threads
    #[arg(short, long, default_value_t = default_threads())]
    threads: usize,

    /// Enable the OpenCL GPU worker
    #[arg(short, long)]
    gpu: bool,

    /// Stop after N matches; 0 keeps searching forever
    #[arg(short, long, default_value_t = 1)]
    limit: u64,

    /// GPU work items per launch when no explicit global work size is given
    #[arg(long, default_value_t = 1 << 20)]
    gpu_threads: usize,

    /// Kernel local work size (default: let the driver choose)
    #[arg(long)]
    gpu_local_work_size: Option<usize>,

    /// Kernel global work size (default: --gpu-threads)
    #[arg(long)]
    gpu_global_work_size: Option<usize>,

    /// OpenCL platform index
    #[arg(long, default_value_t = 0)]
    gpu_platform: usize,

    /// OpenCL device index
    #[arg(long, default_value_t = 0)]
    gpu_device: usize,

    /// Suppress the progress line
    #[arg(long)]
    no_progress: bool,

    /// Emit only "HEX_KEY ADDRESS" per match on stdout
    #[arg(long)]
    simple_output: bool,
}

fn default_threads() -> usize {
    num_cpus::get().saturating_sub(1).max(1)
}

/// Reject prefixes the range compiler could never satisfy before spinning
/// anything up: empty, too long, or containing a non-alphabet character.
fn parse_prefix(s: &str) -> Result<String, String> {
    if s.is_empty() {
        return Err("prefix must not be empty".into());
    }
    if s.len() > MAX_ADDRESS_LEN {
        return Err(format!(
            "prefix is {} characters but addresses are at most {MAX_ADDRESS_LEN}",
            s.len()
        ));
    }
    if let Some(c) = s
        .chars()
        .find(|c| !c.is_ascii() || !ALPHABET.contains(&(*c as u8)))
    {
        return Err(format!("character {c:?} is not in the Base58 alphabet"));
    }
    Ok(s.to_string())
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            let code = match err.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => 0,
                _ => 1,
            };
            let _ = err.print();
            process::exit(code);
        }
    };

    let config = Config {
        prefix: cli.prefix,
        threads: cli.threads.max(1),
        gpu: cli.gpu,
        limit: cli.limit,
        gpu_threads: cli.gpu_threads,
        gpu_local_work_size: cli.gpu_local_work_size,
        gpu_global_work_size: cli.gpu_global_work_size,
        gpu_platform: cli.gpu_platform,
        gpu_device: cli.gpu_device,
        no_progress: cli.no_progress,
        simple_output: cli.simple_output,
    };

    if let Err(err) = svanity::run(config) {
        eprintln!("svanity: {err}");
        process::exit(1);
    }
}
