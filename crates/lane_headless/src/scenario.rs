//! Scenario loading.
//!
//! A scenario is either the built-in `skirmish` or a path to a RON
//! [`MatchData`] file.

use std::path::Path;

use lane_core::config::{MatchConfig, SpawnerMode};
use lane_core::data::MatchData;
use lane_core::error::GameError;
use lane_core::factions::Faction;
use lane_core::math::Fixed;
use thiserror::Error;

/// Name of the built-in scenario.
pub const BUILTIN_SKIRMISH: &str = "skirmish";

/// Seconds between autopilot spawns when the opponent is not automatic.
const AUTOPILOT_INTERVAL: i32 = 5;

/// Error type for scenario operations.
#[derive(Error, Debug)]
pub enum ScenarioError {
    /// File not found.
    #[error("Scenario file not found: {0}")]
    FileNotFound(String),
    /// Failed to read file.
    #[error("Failed to read scenario file: {0}")]
    ReadError(#[from] std::io::Error),
    /// Parsing or validation failed.
    #[error("Invalid scenario: {0}")]
    Invalid(#[from] GameError),
}

/// Load a match definition from a RON file.
///
/// # Errors
///
/// Fails if the file is missing, unreadable, malformed or invalid.
pub fn load_match<P: AsRef<Path>>(path: P) -> Result<MatchConfig, ScenarioError> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(ScenarioError::FileNotFound(path.display().to_string()));
    }
    let contents = std::fs::read_to_string(path)?;
    let data = MatchData::from_ron_str(&contents, &path.display().to_string())?;
    let config = data.into_config()?;
    tracing::debug!(path = %path.display(), name = %config.name, "Loaded scenario");
    Ok(config)
}

/// Resolve a scenario argument: the built-in name or a file path.
///
/// # Errors
///
/// See [`load_match`].
pub fn resolve(scenario: Option<&str>) -> Result<MatchConfig, ScenarioError> {
    match scenario {
        None | Some(BUILTIN_SKIRMISH) => Ok(MatchConfig::skirmish()),
        Some(path) => load_match(path),
    }
}

/// Make every manual faction spawn on its own.
///
/// Manual sides copy the opponent's automatic interval and field the whole
/// template list. Used by batch runs, where nobody sends spawn commands.
pub fn with_autopilot(mut config: MatchConfig) -> MatchConfig {
    let roster: Vec<_> = config.templates.iter().map(|t| t.id).collect();
    if roster.is_empty() {
        return config;
    }
    for faction in Faction::ALL {
        if config.faction(faction).spawner != SpawnerMode::Manual {
            continue;
        }
        let (interval, lane_jitter) = match &config.faction(faction.opponent()).spawner {
            SpawnerMode::Automatic {
                interval,
                lane_jitter,
                ..
            } => (*interval, *lane_jitter),
            SpawnerMode::Manual => (Fixed::from_num(AUTOPILOT_INTERVAL), Fixed::ZERO),
        };
        config.faction_mut(faction).spawner = SpawnerMode::Automatic {
            interval,
            roster: roster.clone(),
            lane_jitter,
        };
    }
    config
}
