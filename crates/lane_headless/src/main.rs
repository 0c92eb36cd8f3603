//! Headless lane battle runner.
//!
//! This binary runs a match without graphics, controlled via JSON on
//! stdin/stdout. Designed for scripted controllers, CI testing and balance
//! runs.
//!
//! # Usage
//!
//! ```bash
//! # Interactive mode - read commands from stdin
//! cargo run -p lane_headless
//!
//! # Play a match file at 10 ticks per second
//! cargo run -p lane_headless -- run --scenario assets/data/skirmish.ron --tick-rate 10
//!
//! # Run a batch of autopiloted matches
//! cargo run -p lane_headless -- batch --count 500 --output results/
//!
//! # Verify that a seed replays identically
//! cargo run -p lane_headless -- verify --seed 7 --runs 8
//! ```
//!
//! # Protocol
//!
//! Input (stdin): JSON commands, one per line
//! Output (stdout): JSON responses, one per line
//! Logs (stderr): Debug information

use std::io;
use std::path::PathBuf;
use std::time::Instant;

use clap::{Parser, Subcommand};
use lane_core::config::MatchConfig;
use lane_core::math::Fixed;
use lane_core::simulation::Simulation;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use lane_headless::{
    batch::{run_batch, verify_determinism, BatchConfig},
    runner::{run_session, HeadlessConfig, Session, DEFAULT_TICK_RATE},
    scenario::{resolve, BUILTIN_SKIRMISH},
};

#[derive(Parser)]
#[command(name = "lane_headless")]
#[command(about = "Headless lane battle runner for scripted play and CI")]
#[command(version)]
struct Cli {
    /// Enable verbose logging to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a single interactive match
    Run {
        /// Match file to load (default: built-in skirmish)
        #[arg(short, long)]
        scenario: Option<String>,

        /// Ticks per simulated second
        #[arg(long, default_value = "4")]
        tick_rate: u32,

        /// Output state after every tick command
        #[arg(long)]
        auto_state: bool,
    },

    /// Run a batch of autopiloted matches for balance testing
    Batch {
        /// Match file to load (default: built-in skirmish)
        #[arg(short, long)]
        scenario: Option<String>,

        /// Number of matches to run
        #[arg(short, long, default_value = "100")]
        count: u32,

        /// Starting random seed
        #[arg(long, default_value = "0")]
        seed: u64,

        /// Tick limit per match
        #[arg(long, default_value = "2400")]
        max_ticks: u64,

        /// Output directory for results
        #[arg(short, long, default_value = "results")]
        output: PathBuf,
    },

    /// Verify determinism by running the same seed multiple times
    Verify {
        /// Match file to load (default: built-in skirmish)
        #[arg(short, long)]
        scenario: Option<String>,

        /// Seed to verify
        #[arg(long, default_value = "12345")]
        seed: u64,

        /// Number of verification runs
        #[arg(short, long, default_value = "5")]
        runs: u32,

        /// Ticks per run
        #[arg(short, long, default_value = "2400")]
        ticks: u64,
    },
}

fn main() {
    let cli = Cli::parse();

    // Initialize logging to stderr (stdout is for protocol)
    let log_level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(true),
        )
        .with(tracing_subscriber::filter::LevelFilter::from_level(
            log_level,
        ))
        .init();

    match cli.command {
        Some(Commands::Run {
            scenario,
            tick_rate,
            auto_state,
        }) => {
            cmd_run(scenario, tick_rate, auto_state);
        }
        Some(Commands::Batch {
            scenario,
            count,
            seed,
            max_ticks,
            output,
        }) => {
            cmd_batch(scenario, count, seed, max_ticks, output);
        }
        Some(Commands::Verify {
            scenario,
            seed,
            runs,
            ticks,
        }) => {
            cmd_verify(scenario, seed, runs, ticks);
        }
        None => {
            // Default: interactive mode
            cmd_run(None, DEFAULT_TICK_RATE, false);
        }
    }
}

fn load_or_exit(scenario: Option<&str>) -> MatchConfig {
    match resolve(scenario) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "Failed to load scenario");
            eprintln!("FATAL: {e}");
            std::process::exit(1);
        }
    }
}

/// Run a single interactive match
fn cmd_run(scenario: Option<String>, tick_rate: u32, auto_state: bool) {
    let config = load_or_exit(scenario.as_deref());
    tracing::info!(name = %config.name, tick_rate, "Starting interactive session");

    let session = Simulation::new(config).and_then(|sim| {
        Session::new(
            sim,
            &HeadlessConfig {
                tick_rate,
                auto_state_output: auto_state,
            },
        )
    });
    let mut session = match session {
        Ok(session) => session,
        Err(e) => {
            eprintln!("FATAL: {e}");
            std::process::exit(1);
        }
    };

    let stdin = io::stdin();
    let stdout = io::stdout();
    if let Err(e) = run_session(&mut session, stdin.lock(), stdout.lock()) {
        tracing::error!(error = %e, "Session I/O failed");
        std::process::exit(1);
    }
}

/// Run a batch of matches for balance testing
fn cmd_batch(scenario: Option<String>, count: u32, seed: u64, max_ticks: u64, output: PathBuf) {
    let base = load_or_exit(scenario.as_deref());
    let name = scenario.unwrap_or_else(|| BUILTIN_SKIRMISH.to_string());

    tracing::info!(
        scenario = %name,
        count = count,
        seed = seed,
        max_ticks = max_ticks,
        output = %output.display(),
        "Batch configuration"
    );

    let config = BatchConfig::new(&name, count)
        .with_seed(seed)
        .with_max_ticks(max_ticks)
        .with_output(output.clone());
    let results = run_batch(&base, config);

    let results_path = output.join("batch_results.json");
    if let Err(e) = results.save(&results_path) {
        tracing::error!(error = %e, path = %results_path.display(), "Failed to save results");
        eprintln!("FATAL: Failed to save results: {e}");
        std::process::exit(1);
    }

    eprintln!("\n{}", "=".repeat(50));
    eprintln!("BATCH COMPLETE");
    eprintln!("{}", "=".repeat(50));
    eprintln!("Games played: {}", results.games.len());
    if !results.errors.is_empty() {
        eprintln!("Games FAILED: {}", results.errors.len());
    }
    eprintln!("Draws: {}", results.summary.draws);
    eprintln!("Duration: {:.1}s", results.duration_seconds);
    eprintln!("\nWin Rates:");
    for (faction, rate) in &results.summary.win_rates {
        eprintln!("  {}: {:.1}%", faction, rate * 100.0);
    }
    for error in results.errors.iter().take(10) {
        eprintln!(
            "  Game {} (seed {}): {}",
            error.game_index, error.seed, error.message
        );
    }
    eprintln!("\nResults saved to: {}", results_path.display());
}

/// Verify determinism
fn cmd_verify(scenario: Option<String>, seed: u64, runs: u32, ticks: u64) {
    let base = load_or_exit(scenario.as_deref());
    tracing::info!(seed, runs, ticks, "Verifying determinism");

    let start = Instant::now();
    let dt = Fixed::ONE / Fixed::from_num(DEFAULT_TICK_RATE);
    let report = match verify_determinism(&base, seed, runs, ticks, dt) {
        Ok(report) => report,
        Err(e) => {
            eprintln!("FATAL: {e}");
            std::process::exit(1);
        }
    };

    if report.is_deterministic() {
        eprintln!(
            "PASS: All {} runs produced identical results (hash {:016x}, {:.1}s)",
            runs,
            report.hashes.first().copied().unwrap_or_default(),
            start.elapsed().as_secs_f64()
        );
    } else {
        eprintln!("FAIL: Non-determinism detected!");
        for (run, hash) in report.hashes.iter().enumerate() {
            eprintln!("  run {run}: {hash:016x}");
        }
        std::process::exit(1);
    }
}
