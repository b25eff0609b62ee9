//! Component G: the CLI harness.
//!
//! ```text
//! fib [-6] <route_file> [<lookup_file>|all]
//! ```
//! Omitting the third positional runs a performance benchmark; `all` runs
//! an exhaustive IPv4 correctness sweep against the oracle; anything else
//! is treated as a lookup file.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use log::{error, info};
use rand::Rng;

use fib_store::af::{Address, Family};
use fib_store::errors::FibError;
use fib_store::fib::Fib;
use fib_store::nexthop::NexthopTable;
use fib_store::oracle::Oracle;
use fib_store::parse::{load_lookups, load_routes};
use fib_store::rebuild::rebuild;
use fib_store::rib::RibTree;

/// The default stride used by the CLI; the library supports any of
/// 1, 2, 4 or 8, exercised directly by the test suite.
const DEFAULT_STRIDE: u8 = 8;

const BENCHMARK_TRIALS: u64 = 1_000_000;

#[derive(Parser)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Treat inputs as IPv6 (default: IPv4).
    #[arg(short = '6', long = "ipv6", default_value_t = false)]
    ipv6: bool,

    /// File of "<cidr> <nexthop>" lines.
    route_file: PathBuf,

    /// Lookup file, or the literal "all" for an exhaustive sweep. Omit for
    /// a performance benchmark.
    mode: Option<String>,
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();
    let family = if cli.ipv6 { Family::Inet6 } else { Family::Inet };
    let mut fib = Fib::new(DEFAULT_STRIDE);

    println!("configuration:");
    println!("  IP version: {family}");
    println!("  route file: {}", cli.route_file.display());
    println!("  stride: {} bits ({} children per node)", fib.stride(), 1u32 << fib.stride());
    match &cli.mode {
        Some(mode) if mode == "all" => println!("  mode: full inspection sweep"),
        Some(file) => println!("  lookup file: {file}"),
        None => println!("  mode: performance test"),
    }
    println!();

    let run_oracle = cli.mode.as_deref() == Some("all");

    let mut table = NexthopTable::new();
    let mut rib = RibTree::new(family);
    let mut oracle = run_oracle.then(Oracle::new);

    let added = match load_routes(
        &cli.route_file,
        family,
        &mut table,
        &mut rib,
        oracle.as_mut(),
    ) {
        Ok(n) => n,
        Err(e) => {
            error!("failed to load routes from {}: {e}", cli.route_file.display());
            return ExitCode::FAILURE;
        }
    };
    println!("Total {added} routes added");

    if let Err(e) = rebuild(&rib, &mut fib) {
        error!("failed to build FIB from RIB: {e}");
        return ExitCode::FAILURE;
    }

    let result = match cli.mode.as_deref() {
        None => {
            println!("running performance test...");
            run_benchmark(&fib, family)
        }
        Some("all") => {
            println!("full inspection lookup test ...");
            run_oracle_sweep(&fib, oracle.as_ref().expect("built above"))
        }
        Some(path) => {
            println!("running basic test with lookup file {path}...");
            run_basic(&fib, &table, PathBuf::from(path), family)
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("test failed: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run_benchmark(fib: &Fib, family: Family) -> Result<(), FibError> {
    let mut rng = rand::rng();
    let start = std::time::Instant::now();
    let mut sink = 0u64;
    for _ in 0..BENCHMARK_TRIALS {
        let addr = random_address(&mut rng, family);
        if fib.lookup(addr).is_some() {
            sink += 1;
        }
    }
    let elapsed = start.elapsed().as_secs_f64();
    let qps = if elapsed > 0.0 {
        BENCHMARK_TRIALS as f64 / elapsed
    } else {
        0.0
    };
    println!("Elapsed time: {elapsed:.6} sec for {BENCHMARK_TRIALS} lookups");
    println!("Lookup per second: {:.6}M lookups/sec", qps / 1e6);
    info!("benchmark matched {sink} of {BENCHMARK_TRIALS} random lookups");
    Ok(())
}

fn random_address(rng: &mut impl Rng, family: Family) -> Address {
    let mut buf = [0u8; 16];
    let width = if family == Family::Inet { 4 } else { 16 };
    rng.fill(&mut buf[..width]);
    Address(buf)
}

fn run_basic(
    fib: &Fib,
    table: &NexthopTable,
    lookup_file: PathBuf,
    family: Family,
) -> Result<(), FibError> {
    println!("============================================");
    println!("Lookup test with file: {}", lookup_file.display());
    for addr in load_lookups(&lookup_file, family)? {
        match fib.lookup(addr) {
            Some(node) => {
                let idx = node.route_idx()[0].expect("leaf always has a route");
                let nexthop = table
                    .get(idx)
                    .map(|(_, nh, _)| nh.to_ipaddr(family).to_string())
                    .unwrap_or_else(|| "?".to_string());
                println!("+ Found route for {}: {nexthop}", addr.to_ipaddr(family));
            }
            None => println!("- No route for {}", addr.to_ipaddr(family)),
        }
    }
    Ok(())
}

/// The full IPv4 address space, checked one host-order `u32` at a time.
const TOTAL_IPV4_ADDRESSES: u64 = 1u64 << 32;
const PROGRESS_INTERVAL: u64 = 16_000_000;

fn run_oracle_sweep(fib: &Fib, oracle: &Oracle) -> Result<(), FibError> {
    println!("============================================");
    println!("starting full IPv4 address space lookup test with the oracle as ground truth");
    println!("testing 2^32 = {TOTAL_IPV4_ADDRESSES} addresses");
    println!("progress will be shown every 16M lookups\n");

    let start = std::time::Instant::now();
    let mut mismatches = 0u64;
    let mut checked = 0u64;

    for host in 0u32..=u32::MAX {
        let mut buf = [0u8; 16];
        buf[..4].copy_from_slice(&host.to_be_bytes());
        let addr = Address(buf);

        let got = fib.lookup(addr).map(|n| n.keylen());
        let want = oracle.search(addr).map(|(_, len, _)| len);
        if got != want {
            mismatches += 1;
            if mismatches <= 10 {
                println!(
                    "ERROR [MISMATCH] at {}: expected {want:?}, got {got:?}",
                    addr.to_ipaddr(Family::Inet)
                );
            }
        }

        checked += 1;
        if checked % PROGRESS_INTERVAL == 0 {
            let elapsed = start.elapsed().as_secs_f64();
            println!(
                "progress: {checked} / {TOTAL_IPV4_ADDRESSES} lookups, {mismatches} mismatches so far ({elapsed:.1}s elapsed)"
            );
        }
    }

    let elapsed = start.elapsed().as_secs_f64();
    println!(
        "Checked all {checked} addresses in {elapsed:.1}s, {mismatches} mismatches"
    );
    if mismatches > 0 {
        return Err(FibError::NotFound);
    }
    Ok(())
}
