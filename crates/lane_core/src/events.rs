//! Events emitted by the simulation.
//!
//! Events are fire-and-forget: the simulation never waits on a consumer.
//! Presentation layers use them for spawn visuals, damage flashes and HUD
//! updates.

use serde::{Deserialize, Serialize};

use crate::components::{EntityId, UnitState};
use crate::factions::Faction;
use crate::match_state::MatchState;
use crate::math::{fixed_serde, Fixed};
use crate::templates::TemplateId;

/// A single observable change in the simulation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SimEvent {
    /// A unit entered the lane.
    Spawned {
        /// New entity.
        id: EntityId,
        /// Owning faction.
        faction: Faction,
        /// Template it was built from.
        template: TemplateId,
    },
    /// An entity took non-lethal damage.
    Damaged {
        /// Damaged entity.
        id: EntityId,
        /// Damage applied.
        #[serde(with = "fixed_serde")]
        amount: Fixed,
        /// Health left.
        #[serde(with = "fixed_serde")]
        remaining: Fixed,
    },
    /// An entity's health reached zero. Emitted once per entity.
    Death {
        /// Dead entity.
        id: EntityId,
    },
    /// A faction's base was destroyed.
    BaseDestroyed {
        /// Faction that lost its base.
        faction: Faction,
    },
    /// The match left the `Active` state.
    MatchEnded {
        /// Final state from the observer's perspective.
        outcome: MatchState,
    },
    /// A unit changed behavior state.
    UnitStateChanged {
        /// Unit.
        id: EntityId,
        /// Previous state.
        from: UnitState,
        /// New state.
        to: UnitState,
    },
    /// The match was reset to its starting configuration.
    MatchRestarted,
}

/// Events produced by one call to [`crate::simulation::Simulation::tick`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickEvents {
    /// Tick number after this step.
    pub tick: u64,
    /// Events in emission order.
    pub events: Vec<SimEvent>,
}

impl TickEvents {
    /// Ids of entities that died this tick.
    #[must_use]
    pub fn deaths(&self) -> Vec<EntityId> {
        self.events
            .iter()
            .filter_map(|event| match event {
                SimEvent::Death { id } => Some(*id),
                _ => None,
            })
            .collect()
    }

    /// Ids of entities spawned this tick.
    #[must_use]
    pub fn spawned(&self) -> Vec<EntityId> {
        self.events
            .iter()
            .filter_map(|event| match event {
                SimEvent::Spawned { id, .. } => Some(*id),
                _ => None,
            })
            .collect()
    }

    /// Match outcome, if the match ended this tick.
    #[must_use]
    pub fn match_outcome(&self) -> Option<MatchState> {
        self.events.iter().find_map(|event| match event {
            SimEvent::MatchEnded { outcome } => Some(*outcome),
            _ => None,
        })
    }

    /// Whether nothing happened.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}
