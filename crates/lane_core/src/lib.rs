//! # Lane Core
//!
//! Deterministic simulation core for a lane battle game.
//!
//! This crate contains **only** deterministic logic:
//! - No rendering
//! - No IO
//! - No system randomness (spawn jitter uses a seeded generator)
//! - No floating-point math in the simulation (uses fixed-point)
//!
//! Presentation layers consume the [`events::SimEvent`] stream returned by
//! [`simulation::Simulation::tick`] and never reach into simulation state
//! directly.
//!
//! ## Crate Structure
//!
//! - [`registry`] - Entity storage and spatial queries
//! - [`components`] - Health, unit stats and unit states
//! - [`combat`] - The damage capability shared by units and bases
//! - [`behavior`] - Per-unit state machine
//! - [`economy`] / [`spawner`] - Money, cooldowns and unit creation
//! - [`match_state`] - Victory/defeat detection and restart gating
//! - [`simulation`] - Core tick loop
//! - [`data`] - RON-facing match and unit definitions
//! - [`math`] - Fixed-point math utilities

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod behavior;
pub mod combat;
pub mod components;
pub mod config;
pub mod data;
pub mod economy;
pub mod error;
pub mod events;
pub mod factions;
pub mod match_state;
pub mod math;
pub mod registry;
pub mod simulation;
pub mod spawner;
pub mod templates;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::combat::{DamageOutcome, Damageable};
    pub use crate::components::{EntityId, Health, UnitState, UnitStats};
    pub use crate::config::{BaseSetup, FactionSetup, MatchConfig, SpawnerMode};
    pub use crate::error::{ErrorKind, GameError, Result};
    pub use crate::events::{SimEvent, TickEvents};
    pub use crate::factions::Faction;
    pub use crate::match_state::MatchState;
    pub use crate::math::{Fixed, Vec2Fixed};
    pub use crate::registry::{Base, Entity, EntityKind, EntityRegistry, FactionFilter, Unit};
    pub use crate::simulation::Simulation;
    pub use crate::spawner::SpawnResult;
    pub use crate::templates::{TemplateId, TemplateRegistry, UnitTemplate};
}
