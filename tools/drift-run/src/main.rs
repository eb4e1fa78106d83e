//! drift-run: run a seadrift configuration and print the run summary.
//!
//! Usage:
//!   drift-run run --config scenario.json [--threads 4] [--seed 7] [--archive tracks.json]
//!   drift-run check --config scenario.json

use std::path::PathBuf;
use std::process;

use tracing::info;
use tracing_subscriber::EnvFilter;

use seadrift_core::config::RunConfig;
use seadrift_sim::{MemoryArchive, Tracker, WorkerPool};

fn main() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .try_init();

    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 {
        print_usage();
        process::exit(1);
    }

    match args[1].as_str() {
        "run" => cmd_run(&args[2..]),
        "check" => cmd_check(&args[2..]),
        "help" | "--help" | "-h" => print_usage(),
        other => {
            eprintln!("Unknown command: {other}");
            print_usage();
            process::exit(1);
        }
    }
}

fn print_usage() {
    eprintln!(
        "drift-run: seadrift Monte Carlo drift runner\n\
         \n\
         Commands:\n\
         \n\
         run       Drift every scenario and print the run summary as JSON\n\
         \n\
           --config <path>    Run configuration (JSON)\n\
           --threads <N>      Worker threads besides the caller (default: from config)\n\
           --seed <N>         Override the run seed\n\
           --archive <path>   Also write every particle track as JSON\n\
         \n\
         check     Load and validate a configuration without running it\n\
         \n\
           --config <path>    Run configuration (JSON)\n\
         \n\
         Set RUST_LOG=info (or debug) for progress output on stderr.\n"
    );
}

fn flag_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.windows(2)
        .find(|pair| pair[0] == flag)
        .map(|pair| pair[1].as_str())
}

fn parse_number<T: std::str::FromStr>(args: &[String], flag: &str) -> Option<T> {
    let raw = flag_value(args, flag)?;
    match raw.parse() {
        Ok(n) => Some(n),
        Err(_) => {
            eprintln!("Error: {flag} expects a number, got {raw}");
            process::exit(1);
        }
    }
}

fn load_config(args: &[String]) -> RunConfig {
    let path = match flag_value(args, "--config") {
        Some(p) => PathBuf::from(p),
        None => {
            eprintln!("Error: --config <path> is required");
            process::exit(1);
        }
    };
    match RunConfig::from_path(&path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error loading {}: {e}", path.display());
            process::exit(1);
        }
    }
}

// --- Check command ---

fn cmd_check(args: &[String]) {
    let config = load_config(args);
    eprintln!(
        "OK: {} scenario(s), {} object type(s), {} particles per scenario, {} step(s) of {}s",
        config.scenarios.len(),
        config.object_types.len(),
        config.particles_per_scenario,
        config.steps,
        config.step_secs,
    );
}

// --- Run command ---

fn cmd_run(args: &[String]) {
    let mut config = load_config(args);
    if let Some(seed) = parse_number::<u64>(args, "--seed") {
        config.seed = seed;
    }
    if let Some(threads) = parse_number::<usize>(args, "--threads") {
        config.worker_threads = threads;
    }
    let archive_path = flag_value(args, "--archive").map(PathBuf::from);

    let pool = match WorkerPool::new(config.worker_threads) {
        Ok(pool) => pool,
        Err(e) => {
            eprintln!("Error starting workers: {e}");
            process::exit(1);
        }
    };
    let archive = MemoryArchive::for_run(&config);
    let mut tracker = match Tracker::new(config, &archive, &pool) {
        Ok(tracker) => tracker,
        Err(e) => {
            eprintln!("Error preparing run: {e}");
            process::exit(1);
        }
    };

    let summary = match tracker.run() {
        Ok(summary) => summary,
        Err(e) => {
            eprintln!("Error during run: {e}");
            process::exit(1);
        }
    };

    if let Some(path) = archive_path {
        let written = serde_json::to_string(&archive.snapshot())
            .map_err(|e| e.to_string())
            .and_then(|json| std::fs::write(&path, json).map_err(|e| e.to_string()));
        match written {
            Ok(()) => info!(path = %path.display(), "archive written"),
            Err(e) => {
                eprintln!("Error writing {}: {e}", path.display());
                process::exit(1);
            }
        }
    }

    match serde_json::to_string_pretty(&summary) {
        Ok(json) => println!("{json}"),
        Err(e) => {
            eprintln!("Error encoding summary: {e}");
            process::exit(1);
        }
    }
}
