//! Unit data structures for data-driven unit definitions.

use serde::{Deserialize, Serialize};

use super::to_fixed;
use crate::components::UnitStats;
use crate::error::Result;
use crate::templates::{TemplateId, UnitTemplate};

fn default_attack_range() -> f32 {
    1.0
}

fn default_attack_cooldown() -> f32 {
    1.0
}

fn default_detection_range() -> f32 {
    1.5
}

/// Data-driven unit definition.
///
/// # Example RON
///
/// ```ron
/// UnitData(
///     key: "basic_cat",
///     name: "Basic Cat",
///     cost: 75,
///     spawn_cooldown: 2.0,
///     health: 10.0,
///     move_speed: 3.0,
///     attack_damage: 10.0,
/// )
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitData {
    /// Unique string identifier, referenced by spawner rosters and callers.
    pub key: String,

    /// Display name.
    pub name: String,

    /// Money cost of a manual spawn.
    pub cost: i32,

    /// Seconds between two spawns of this unit.
    pub spawn_cooldown: f32,

    /// Maximum health points.
    pub health: f32,

    /// Distance covered per second.
    pub move_speed: f32,

    /// Damage per attack.
    pub attack_damage: f32,

    /// Attack range.
    #[serde(default = "default_attack_range")]
    pub attack_range: f32,

    /// Seconds between attacks.
    #[serde(default = "default_attack_cooldown")]
    pub attack_cooldown: f32,

    /// Radius within which hostiles are engaged.
    #[serde(default = "default_detection_range")]
    pub detection_range: f32,
}

impl UnitData {
    /// Convert into a template with the given id.
    ///
    /// # Errors
    ///
    /// Fails when a decimal is not representable in fixed-point.
    pub fn to_template(&self, id: TemplateId) -> Result<UnitTemplate> {
        let field = |name: &str| format!("units.{}.{name}", self.key);
        Ok(UnitTemplate {
            id,
            key: self.key.clone(),
            name: self.name.clone(),
            cost: self.cost,
            spawn_cooldown: to_fixed(&field("spawn_cooldown"), self.spawn_cooldown)?,
            stats: UnitStats {
                max_health: to_fixed(&field("health"), self.health)?,
                move_speed: to_fixed(&field("move_speed"), self.move_speed)?,
                attack_damage: to_fixed(&field("attack_damage"), self.attack_damage)?,
                attack_range: to_fixed(&field("attack_range"), self.attack_range)?,
                attack_cooldown: to_fixed(&field("attack_cooldown"), self.attack_cooldown)?,
                detection_range: to_fixed(&field("detection_range"), self.detection_range)?,
            },
        })
    }
}
