//! JSON protocol for headless match control.
//!
//! The runner speaks JSON lines (one JSON object per line):
//!
//! **Input (stdin):** Commands from the controller
//! **Output (stdout):** Events, state and responses
//!
//! # Protocol Flow
//!
//! 1. Runner starts, outputs `{"type":"ready",...}`
//! 2. Controller sends commands as JSON lines
//! 3. Each `tick` answers with the events it produced
//! 4. When the match ends, outputs `{"type":"game_over","result":"won"|"lost"}`
//!
//! # Example Session
//!
//! ```text
//! <- {"type":"ready","version":"1.0","tick":0,"scenario":"Skirmish"}
//! -> {"cmd":"spawn","faction":"player","unit":"basic_cat"}
//! <- {"type":"spawn_result","result":"success","entity_id":3}
//! -> {"cmd":"tick","count":4}
//! <- {"type":"events","tick":4,"events":[{"event":"spawned","tick":1,...}]}
//! -> {"cmd":"hash"}
//! <- {"type":"state_hash","tick":4,"hash":1234567890}
//! ```

use std::collections::BTreeMap;

use lane_core::error::GameError;
use lane_core::events::SimEvent;
use lane_core::math::Fixed;
use lane_core::registry::Entity;
use lane_core::simulation::Simulation;
use lane_core::spawner::SpawnResult;
use serde::{Deserialize, Serialize};

/// Protocol version reported in `ready`.
pub const PROTOCOL_VERSION: &str = "1.0";

// ============================================================================
// Input Commands (Controller -> Runner)
// ============================================================================

/// Commands accepted by the headless runner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "cmd", rename_all = "snake_case")]
pub enum Command {
    /// Advance the simulation by N ticks (default: 1).
    Tick {
        /// Number of ticks.
        #[serde(default = "default_tick_count")]
        count: u32,
        /// Seconds per tick; the runner's tick rate applies when absent.
        #[serde(default)]
        dt: Option<f64>,
    },

    /// Request a paid spawn.
    Spawn {
        /// `player` or `enemy`.
        faction: String,
        /// Unit key, e.g. `basic_cat`.
        unit: String,
    },

    /// Restart a finished match.
    Restart,

    /// Apply damage to an entity.
    Damage {
        /// Target entity.
        entity_id: u64,
        /// Damage amount.
        amount: f64,
    },

    /// Query current state without advancing time.
    Query,

    /// Report the state hash (for determinism verification).
    Hash,

    /// End the session.
    Quit,
}

fn default_tick_count() -> u32 {
    1
}

impl Command {
    /// Wire name of this command.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Tick { .. } => "tick",
            Self::Spawn { .. } => "spawn",
            Self::Restart => "restart",
            Self::Damage { .. } => "damage",
            Self::Query => "query",
            Self::Hash => "hash",
            Self::Quit => "quit",
        }
    }

    /// Parse a command from one JSON line.
    ///
    /// # Errors
    ///
    /// Returns the `serde_json` error for malformed input.
    pub fn from_json(line: &str) -> serde_json::Result<Self> {
        serde_json::from_str(line.trim())
    }
}

// ============================================================================
// Output Responses (Runner -> Controller)
// ============================================================================

/// Responses written by the headless runner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Response {
    /// Runner is ready to accept commands.
    Ready {
        /// Protocol version.
        version: String,
        /// Current tick.
        tick: u64,
        /// Loaded match name.
        scenario: String,
    },

    /// Events produced by a `tick` command.
    Events {
        /// Tick after the last step.
        tick: u64,
        /// Events in emission order.
        events: Vec<EventOutput>,
    },

    /// Outcome of a `spawn` command.
    SpawnResult {
        /// `success`, `insufficient_funds` or `on_cooldown`.
        result: String,
        /// New entity on success.
        #[serde(skip_serializing_if = "Option::is_none")]
        entity_id: Option<u64>,
    },

    /// Current match state.
    State(StateOutput),

    /// Acknowledgment of a command.
    Ack {
        /// Command name.
        cmd: String,
    },

    /// Error processing a command. The session continues.
    Error {
        /// Human-readable description.
        message: String,
        /// Error category, when the core reported one.
        #[serde(skip_serializing_if = "Option::is_none")]
        kind: Option<String>,
        /// Command that failed, if it parsed.
        #[serde(skip_serializing_if = "Option::is_none")]
        cmd: Option<String>,
    },

    /// State hash for determinism verification.
    StateHash {
        /// Current tick.
        tick: u64,
        /// Hash of the simulation state.
        hash: u64,
    },

    /// The match has ended.
    GameOver {
        /// `won` or `lost`, from the observer's perspective.
        result: String,
        /// Tick the match ended on.
        tick: u64,
    },

    /// Goodbye message before shutdown.
    Bye,
}

impl Response {
    /// Encode as one JSON line without the trailing newline.
    #[must_use]
    pub fn to_json_line(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|e| {
            format!(r#"{{"type":"error","message":"failed to encode response: {e}"}}"#)
        })
    }

    /// Create a ready response.
    #[must_use]
    pub fn ready(tick: u64, scenario: &str) -> Self {
        Self::Ready {
            version: PROTOCOL_VERSION.to_string(),
            tick,
            scenario: scenario.to_string(),
        }
    }

    /// Create an ack response.
    #[must_use]
    pub fn ack(cmd: &str) -> Self {
        Self::Ack {
            cmd: cmd.to_string(),
        }
    }

    /// Create an error response.
    #[must_use]
    pub fn error(message: impl Into<String>, cmd: Option<&str>) -> Self {
        Self::Error {
            message: message.into(),
            kind: None,
            cmd: cmd.map(String::from),
        }
    }

    /// Create an error response from a simulation error.
    #[must_use]
    pub fn from_game_error(err: &GameError, cmd: &str) -> Self {
        Self::Error {
            message: err.to_string(),
            kind: Some(err.kind().as_str().to_string()),
            cmd: Some(cmd.to_string()),
        }
    }

    /// Build a `spawn_result` response.
    #[must_use]
    pub fn from_spawn(result: SpawnResult) -> Self {
        let (name, entity_id) = match result {
            SpawnResult::Success(id) => ("success", Some(id)),
            SpawnResult::InsufficientFunds => ("insufficient_funds", None),
            SpawnResult::OnCooldown => ("on_cooldown", None),
        };
        Self::SpawnResult {
            result: name.to_string(),
            entity_id,
        }
    }
}

// ============================================================================
// State Types
// ============================================================================

/// A simulation event in wire form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum EventOutput {
    /// A unit entered the lane.
    Spawned {
        /// Tick the event belongs to.
        tick: u64,
        /// New entity.
        entity_id: u64,
        /// Owning faction.
        faction: String,
        /// Template key.
        unit: String,
    },
    /// Non-lethal damage.
    Damaged {
        /// Tick the event belongs to.
        tick: u64,
        /// Damaged entity.
        entity_id: u64,
        /// Damage applied.
        amount: f64,
        /// Health left.
        remaining: f64,
    },
    /// An entity died.
    Death {
        /// Tick the event belongs to.
        tick: u64,
        /// Dead entity.
        entity_id: u64,
    },
    /// A base was destroyed.
    BaseDestroyed {
        /// Tick the event belongs to.
        tick: u64,
        /// Faction that lost its base.
        faction: String,
    },
    /// The match ended.
    MatchEnded {
        /// Tick the event belongs to.
        tick: u64,
        /// `won` or `lost`.
        outcome: String,
    },
    /// A unit changed behavior state.
    StateChanged {
        /// Tick the event belongs to.
        tick: u64,
        /// Unit.
        entity_id: u64,
        /// Previous state.
        from: String,
        /// New state.
        to: String,
    },
    /// The match was restarted.
    MatchRestarted {
        /// Tick the event belongs to.
        tick: u64,
    },
}

impl EventOutput {
    /// Convert a core event, resolving template keys through `sim`.
    #[must_use]
    pub fn from_event(tick: u64, event: &SimEvent, sim: &Simulation) -> Self {
        match event {
            SimEvent::Spawned {
                id,
                faction,
                template,
            } => Self::Spawned {
                tick,
                entity_id: *id,
                faction: faction.short_name().to_string(),
                unit: sim
                    .templates()
                    .get(*template)
                    .map_or_else(|| format!("#{}", template.0), |t| t.key.clone()),
            },
            SimEvent::Damaged {
                id,
                amount,
                remaining,
            } => Self::Damaged {
                tick,
                entity_id: *id,
                amount: to_f64(*amount),
                remaining: to_f64(*remaining),
            },
            SimEvent::Death { id } => Self::Death {
                tick,
                entity_id: *id,
            },
            SimEvent::BaseDestroyed { faction } => Self::BaseDestroyed {
                tick,
                faction: faction.short_name().to_string(),
            },
            SimEvent::MatchEnded { outcome } => Self::MatchEnded {
                tick,
                outcome: outcome.as_str().to_string(),
            },
            SimEvent::UnitStateChanged { id, from, to } => Self::StateChanged {
                tick,
                entity_id: *id,
                from: from.as_str().to_string(),
                to: to.as_str().to_string(),
            },
            SimEvent::MatchRestarted => Self::MatchRestarted { tick },
        }
    }
}

/// Snapshot of the match for `query`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateOutput {
    /// Current tick.
    pub tick: u64,
    /// Simulated seconds since match start.
    pub clock: f64,
    /// `active`, `won` or `lost`.
    pub match_state: String,
    /// Seconds until restart is accepted, once the match has ended.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub restart_in: Option<f64>,
    /// Money per faction.
    pub money: BTreeMap<String, i32>,
    /// Live entities in id order.
    pub entities: Vec<EntityState>,
    /// State hash.
    pub hash: u64,
}

impl StateOutput {
    /// Capture the current state of `sim`.
    #[must_use]
    pub fn capture(sim: &Simulation) -> Self {
        let registry = sim.registry();
        let entities = registry
            .sorted_ids()
            .into_iter()
            .filter_map(|id| registry.get(id))
            .map(EntityState::from_entity)
            .collect();
        let money = lane_core::factions::Faction::ALL
            .iter()
            .map(|&faction| (faction.short_name().to_string(), sim.money(faction)))
            .collect();

        Self {
            tick: sim.get_tick(),
            clock: to_f64(sim.clock()),
            match_state: sim.match_state().as_str().to_string(),
            restart_in: sim.restart_remaining().map(to_f64),
            money,
            entities,
            hash: sim.state_hash(),
        }
    }
}

/// State of a single entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityState {
    /// Entity id.
    pub id: u64,
    /// `unit` or `base`.
    pub kind: String,
    /// Owning faction.
    pub faction: String,
    /// Lane position.
    pub x: f64,
    /// Cross-lane offset.
    pub y: f64,
    /// Current health.
    pub health: f64,
    /// Maximum health.
    pub max_health: f64,
    /// Behavior state, for units.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    /// Combat target, for units.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<u64>,
}

impl EntityState {
    /// Convert a registry entity.
    #[must_use]
    pub fn from_entity(entity: &Entity) -> Self {
        let unit = entity.as_unit();
        let health = entity.health();
        Self {
            id: entity.id,
            kind: if entity.is_base() { "base" } else { "unit" }.to_string(),
            faction: entity.faction.short_name().to_string(),
            x: to_f64(entity.position.x),
            y: to_f64(entity.position.y),
            health: to_f64(health.current),
            max_health: to_f64(health.max),
            state: unit.map(|u| u.state.as_str().to_string()),
            target: unit.and_then(|u| u.combat_target),
        }
    }
}

/// Fixed-point to wire float.
#[must_use]
pub fn to_f64(value: Fixed) -> f64 {
    value.to_num()
}

/// Wire float to fixed-point, rejecting values that do not fit.
#[must_use]
pub fn from_f64(value: f64) -> Option<Fixed> {
    if value.is_finite() {
        Fixed::checked_from_num(value)
    } else {
        None
    }
}
