//! Damage capability shared by every attackable entity.
//!
//! Units and bases both implement [`Damageable`], so an attacker never needs
//! to know which kind of entity it is hitting.

use serde::{Deserialize, Serialize};

use crate::components::{EntityId, Health};
use crate::error::Result;
use crate::math::{fixed_serde, Fixed};

/// Result of a single damage application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DamageOutcome {
    /// Target was already dead; nothing changed.
    Ignored,
    /// Target survived with this much health left.
    Damaged {
        /// Health after the hit.
        #[serde(with = "fixed_serde")]
        remaining: Fixed,
    },
    /// This hit took the target to zero.
    Killed,
}

/// Anything that can take damage.
pub trait Damageable {
    /// Read access to the health pool.
    fn health(&self) -> &Health;

    /// Write access to the health pool.
    fn health_mut(&mut self) -> &mut Health;

    /// Apply `amount` damage.
    ///
    /// # Errors
    ///
    /// Fails when `amount` is negative.
    fn take_damage(&mut self, amount: Fixed) -> Result<DamageOutcome> {
        self.health_mut().apply_damage(amount)
    }

    /// Whether health is above zero.
    fn is_alive(&self) -> bool {
        self.health().is_alive()
    }
}

/// An attack resolved by the unit state machine, applied by the simulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttackIntent {
    /// Attacking unit.
    pub attacker: EntityId,
    /// Entity being hit.
    pub target: EntityId,
    /// Damage to apply.
    pub damage: Fixed,
}
