//! Batch match runner for balance testing.
//!
//! Runs many autopiloted matches in parallel using rayon. Each match stays
//! single-threaded; only independent seeds run side by side.

use std::path::{Path, PathBuf};
use std::time::Instant;

use lane_core::config::MatchConfig;
use lane_core::math::Fixed;
use lane_core::simulation::Simulation;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::metrics::{BatchSummary, GameMetrics, MetricsCollector};
use crate::scenario::with_autopilot;

/// Configuration for a batch run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchConfig {
    /// Scenario name or path, for reporting.
    pub scenario: String,
    /// Number of matches to run.
    pub game_count: u32,
    /// Starting seed; match `i` uses `seed_start + i`.
    pub seed_start: u64,
    /// Maximum ticks per match.
    pub max_ticks: u64,
    /// Ticks per simulated second.
    pub tick_rate: u32,
    /// Output directory for results.
    pub output_dir: PathBuf,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            scenario: crate::scenario::BUILTIN_SKIRMISH.to_string(),
            game_count: 100,
            seed_start: 0,
            max_ticks: 2400, // 10 minutes at 4 tps
            tick_rate: crate::runner::DEFAULT_TICK_RATE,
            output_dir: PathBuf::from("results"),
        }
    }
}

impl BatchConfig {
    /// Create config for a specific scenario.
    pub fn new(scenario: &str, game_count: u32) -> Self {
        Self {
            scenario: scenario.to_string(),
            game_count,
            ..Default::default()
        }
    }

    /// Set output directory.
    #[must_use]
    pub fn with_output(mut self, dir: PathBuf) -> Self {
        self.output_dir = dir;
        self
    }

    /// Set seed start.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed_start = seed;
        self
    }

    /// Set the tick limit.
    #[must_use]
    pub fn with_max_ticks(mut self, max_ticks: u64) -> Self {
        self.max_ticks = max_ticks;
        self
    }

    fn dt(&self) -> Fixed {
        Fixed::ONE / Fixed::from_num(self.tick_rate.max(1))
    }
}

/// Results from a batch run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchResults {
    /// Configuration used.
    pub config: BatchConfig,
    /// Individual match metrics.
    pub games: Vec<GameMetrics>,
    /// Aggregate summary.
    pub summary: BatchSummary,
    /// Total wall-clock runtime.
    pub duration_seconds: f64,
    /// Matches that failed.
    pub errors: Vec<BatchError>,
}

impl BatchResults {
    /// Save results to a JSON file.
    ///
    /// # Errors
    ///
    /// Fails on I/O or encoding errors.
    pub fn save(&self, path: &Path) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;
        std::fs::write(path, json)
    }

    /// Load results from a JSON file.
    ///
    /// # Errors
    ///
    /// Fails on I/O or decoding errors.
    pub fn load(path: &Path) -> std::io::Result<Self> {
        let json = std::fs::read_to_string(path)?;
        serde_json::from_str(&json).map_err(std::io::Error::other)
    }
}

/// A match that could not be run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchError {
    /// Match index.
    pub game_index: u32,
    /// Seed used.
    pub seed: u64,
    /// Error message.
    pub message: String,
}

/// Run one autopiloted match to completion or the tick limit.
///
/// # Errors
///
/// Returns the simulation error as text.
pub fn run_single_game(
    base: &MatchConfig,
    seed: u64,
    max_ticks: u64,
    dt: Fixed,
) -> Result<GameMetrics, String> {
    let mut config = with_autopilot(base.clone());
    config.seed = seed;

    let mut sim = Simulation::new(config).map_err(|e| e.to_string())?;
    let mut collector = MetricsCollector::new(&format!("game_{seed}"), &sim);

    for _ in 0..max_ticks {
        let step = sim.tick(dt).map_err(|e| e.to_string())?;
        collector.record(&step, &sim);
        if step.match_outcome().is_some() {
            break;
        }
    }

    Ok(collector.finish(&sim))
}

/// Run a batch of matches in parallel.
#[allow(clippy::cast_precision_loss)]
pub fn run_batch(base: &MatchConfig, config: BatchConfig) -> BatchResults {
    let start = Instant::now();
    let dt = config.dt();

    info!(
        "Starting batch run: {} games of '{}'",
        config.game_count, config.scenario
    );

    let results: Vec<Result<GameMetrics, BatchError>> = (0..config.game_count)
        .into_par_iter()
        .map(|i| {
            let seed = config.seed_start.wrapping_add(u64::from(i));
            match run_single_game(base, seed, config.max_ticks, dt) {
                Ok(metrics) => {
                    debug!(game = i, seed, winner = ?metrics.winner, "Game finished");
                    Ok(metrics)
                }
                Err(message) => {
                    warn!("Game {} failed: {}", i, message);
                    Err(BatchError {
                        game_index: i,
                        seed,
                        message,
                    })
                }
            }
        })
        .collect();

    let (games, errors): (Vec<_>, Vec<_>) = results.into_iter().partition(Result::is_ok);
    let games: Vec<GameMetrics> = games.into_iter().filter_map(Result::ok).collect();
    let errors: Vec<BatchError> = errors.into_iter().filter_map(Result::err).collect();

    let summary = BatchSummary::from_games(&games);
    let duration_seconds = start.elapsed().as_secs_f64();

    info!(
        "Batch complete: {} games in {:.1}s ({:.1} games/sec)",
        games.len(),
        duration_seconds,
        games.len() as f64 / duration_seconds.max(0.001)
    );

    BatchResults {
        config,
        games,
        summary,
        duration_seconds,
        errors,
    }
}

/// Outcome of a determinism verification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifyReport {
    /// Seed verified.
    pub seed: u64,
    /// Ticks per run.
    pub ticks: u64,
    /// Final state hash of each run.
    pub hashes: Vec<u64>,
}

impl VerifyReport {
    /// Whether every run ended on the same hash.
    #[must_use]
    pub fn is_deterministic(&self) -> bool {
        self.hashes.windows(2).all(|w| w[0] == w[1])
    }
}

/// Run the same seed `runs` times in parallel and compare final hashes.
///
/// # Errors
///
/// Returns the first simulation error as text.
pub fn verify_determinism(
    base: &MatchConfig,
    seed: u64,
    runs: u32,
    ticks: u64,
    dt: Fixed,
) -> Result<VerifyReport, String> {
    let hashes = (0..runs)
        .into_par_iter()
        .map(|_| {
            let mut config = with_autopilot(base.clone());
            config.seed = seed;
            let mut sim = Simulation::new(config).map_err(|e| e.to_string())?;
            for _ in 0..ticks {
                sim.tick(dt).map_err(|e| e.to_string())?;
            }
            Ok(sim.state_hash())
        })
        .collect::<Result<Vec<u64>, String>>()?;

    Ok(VerifyReport {
        seed,
        ticks,
        hashes,
    })
}
