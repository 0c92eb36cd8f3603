//! Component data carried by lane entities.

use serde::{Deserialize, Serialize};

use crate::combat::DamageOutcome;
use crate::error::{GameError, Result};
use crate::math::{fixed_serde, Fixed};

/// Unique identifier for entities.
pub type EntityId = u64;

/// Health component for damageable entities.
///
/// Health never drops below zero; reaching zero is reported exactly once
/// through [`DamageOutcome::Killed`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Health {
    /// Current health points.
    #[serde(with = "fixed_serde")]
    pub current: Fixed,
    /// Maximum health points.
    #[serde(with = "fixed_serde")]
    pub max: Fixed,
}

impl Health {
    /// Create new health component at full health.
    #[must_use]
    pub const fn new(max: Fixed) -> Self {
        Self { current: max, max }
    }

    /// Check if entity is dead (health at or below zero).
    #[must_use]
    pub fn is_dead(&self) -> bool {
        self.current <= Fixed::ZERO
    }

    /// Check if entity is still alive.
    #[must_use]
    pub fn is_alive(&self) -> bool {
        !self.is_dead()
    }

    /// Apply damage.
    ///
    /// Damage to an already-dead entity is ignored. The killing blow clamps
    /// health to zero.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::InvalidArgument`] when `amount` is negative.
    pub fn apply_damage(&mut self, amount: Fixed) -> Result<DamageOutcome> {
        if amount < Fixed::ZERO {
            return Err(GameError::InvalidArgument(format!(
                "damage amount must be non-negative, got {amount}"
            )));
        }
        if self.is_dead() {
            return Ok(DamageOutcome::Ignored);
        }

        let remaining = self.current - amount;
        if remaining <= Fixed::ZERO {
            self.current = Fixed::ZERO;
            Ok(DamageOutcome::Killed)
        } else {
            self.current = remaining;
            Ok(DamageOutcome::Damaged { remaining })
        }
    }
}

/// Behavioral state of a unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum UnitState {
    /// Marching along the lane toward the opposing base.
    #[default]
    MovingToBase,
    /// Engaged with a hostile unit.
    InCombat,
    /// In range of the opposing base and attacking it.
    AttackingBase,
    /// No opposing base to march on.
    Idle,
}

impl UnitState {
    /// Snake-case name used in logs and protocol output.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::MovingToBase => "moving_to_base",
            Self::InCombat => "in_combat",
            Self::AttackingBase => "attacking_base",
            Self::Idle => "idle",
        }
    }
}

/// Combat and movement tuning for a unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitStats {
    /// Maximum health points.
    #[serde(with = "fixed_serde")]
    pub max_health: Fixed,
    /// Distance covered per simulated second.
    #[serde(with = "fixed_serde")]
    pub move_speed: Fixed,
    /// Damage dealt per attack.
    #[serde(with = "fixed_serde")]
    pub attack_damage: Fixed,
    /// Maximum distance at which an attack lands.
    #[serde(with = "fixed_serde")]
    pub attack_range: Fixed,
    /// Minimum simulated seconds between two attacks.
    #[serde(with = "fixed_serde")]
    pub attack_cooldown: Fixed,
    /// Radius within which hostiles are engaged.
    #[serde(with = "fixed_serde")]
    pub detection_range: Fixed,
}

impl Default for UnitStats {
    fn default() -> Self {
        Self {
            max_health: Fixed::from_num(3),
            move_speed: Fixed::from_num(2),
            attack_damage: Fixed::ONE,
            attack_range: Fixed::ONE,
            attack_cooldown: Fixed::ONE,
            detection_range: Fixed::from_num(1.5),
        }
    }
}
