//! Validated, fixed-point match configuration.
//!
//! [`MatchConfig`] is what the simulation is built from and rebuilt from on
//! restart. Data files are parsed into [`crate::data::MatchData`] first and
//! converted here.

use serde::{Deserialize, Serialize};

use crate::components::UnitStats;
use crate::error::{GameError, Result};
use crate::factions::Faction;
use crate::math::{fixed_serde, Fixed, Vec2Fixed};
use crate::templates::{TemplateId, UnitTemplate};

/// Default simulated seconds between match end and an accepted restart.
pub const DEFAULT_RESTART_DELAY: i32 = 3;

/// Largest accepted absolute coordinate for bases and spawn points.
///
/// Keeps every in-match distance well inside [`Fixed`] range.
pub const MAX_COORDINATE: i32 = 10_000;

/// Largest accepted range, speed or lane jitter.
pub const MAX_RANGE: i32 = 10_000;

/// Base placement for one faction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BaseSetup {
    /// Base position.
    pub position: Vec2Fixed,
    /// Starting and maximum health.
    #[serde(with = "fixed_serde")]
    pub max_health: Fixed,
}

/// How a faction's spawner produces units.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SpawnerMode {
    /// Only on external `spawn_request` calls.
    Manual,
    /// On a fixed interval, independent of money.
    Automatic {
        /// Simulated seconds between automatic spawns.
        #[serde(with = "fixed_serde")]
        interval: Fixed,
        /// Templates picked from uniformly.
        roster: Vec<TemplateId>,
        /// Maximum y offset applied to each spawn, in either direction.
        #[serde(with = "fixed_serde")]
        lane_jitter: Fixed,
    },
}

/// Everything one faction starts a match with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FactionSetup {
    /// The faction's base, if it has one.
    pub base: Option<BaseSetup>,
    /// Where new units appear.
    pub spawn_point: Vec2Fixed,
    /// Money at match start.
    pub starting_money: i32,
    /// Money gained per whole simulated second.
    pub income_per_second: i32,
    /// Spawning behavior.
    pub spawner: SpawnerMode,
}

/// Complete description of a match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchConfig {
    /// Human-readable name.
    pub name: String,
    /// Faction whose perspective `Won`/`Lost` is reported from.
    pub observer: Faction,
    /// Simulated seconds after match end before restart is accepted.
    #[serde(with = "fixed_serde")]
    pub restart_delay: Fixed,
    /// Restrict combat pursuit to the lane axis, like base-seeking movement.
    pub axis_locked_combat: bool,
    /// Seed for automatic spawner choices.
    pub seed: u64,
    /// Player-side setup.
    pub player: FactionSetup,
    /// Enemy-side setup.
    pub enemy: FactionSetup,
    /// Spawnable unit definitions.
    pub templates: Vec<UnitTemplate>,
}

impl MatchConfig {
    /// Setup for one faction.
    #[must_use]
    pub fn faction(&self, faction: Faction) -> &FactionSetup {
        match faction {
            Faction::Player => &self.player,
            Faction::Enemy => &self.enemy,
        }
    }

    /// Mutable setup for one faction.
    pub fn faction_mut(&mut self, faction: Faction) -> &mut FactionSetup {
        match faction {
            Faction::Player => &mut self.player,
            Faction::Enemy => &mut self.enemy,
        }
    }

    /// Check every value the simulation relies on.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::InvalidConfig`] describing the first problem.
    pub fn validate(&self) -> Result<()> {
        if self.restart_delay < Fixed::ZERO {
            return Err(invalid("restart_delay must be non-negative"));
        }

        for template in &self.templates {
            validate_template(template)?;
        }

        for faction in Faction::ALL {
            let setup = self.faction(faction);
            if let Some(base) = &setup.base {
                if base.max_health <= Fixed::ZERO {
                    return Err(invalid(&format!("{faction} base health must be positive")));
                }
                check_position(&format!("{faction} base"), base.position)?;
            }
            check_position(&format!("{faction} spawn point"), setup.spawn_point)?;
            if setup.starting_money < 0 || setup.income_per_second < 0 {
                return Err(invalid(&format!("{faction} money values must be non-negative")));
            }
            if let SpawnerMode::Automatic {
                interval,
                roster,
                lane_jitter,
            } = &setup.spawner
            {
                if *interval <= Fixed::ZERO {
                    return Err(invalid(&format!("{faction} spawn interval must be positive")));
                }
                if *lane_jitter < Fixed::ZERO || *lane_jitter > Fixed::from_num(MAX_RANGE) {
                    return Err(invalid(&format!(
                        "{faction} lane jitter must be in 0..={MAX_RANGE}"
                    )));
                }
                if roster.is_empty() {
                    return Err(invalid(&format!("{faction} automatic roster is empty")));
                }
                if let Some(missing) = roster
                    .iter()
                    .find(|id| !self.templates.iter().any(|t| t.id == **id))
                {
                    return Err(GameError::UnknownTemplate(format!(
                        "#{} in {faction} roster",
                        missing.0
                    )));
                }
            }
        }
        Ok(())
    }

    /// The built-in two-base skirmish.
    ///
    /// The player spawns manually from a purse; the enemy spawns a random
    /// cat every five seconds.
    #[must_use]
    pub fn skirmish() -> Self {
        let basic = UnitTemplate {
            id: TemplateId(0),
            key: "basic_cat".to_string(),
            name: "Basic Cat".to_string(),
            cost: 75,
            spawn_cooldown: Fixed::from_num(2),
            stats: UnitStats {
                max_health: Fixed::from_num(10),
                move_speed: Fixed::from_num(3),
                attack_damage: Fixed::from_num(10),
                ..UnitStats::default()
            },
        };
        let tank = UnitTemplate {
            id: TemplateId(1),
            key: "tank_cat".to_string(),
            name: "Tank Cat".to_string(),
            cost: 150,
            spawn_cooldown: Fixed::from_num(5),
            stats: UnitStats {
                max_health: Fixed::from_num(30),
                move_speed: Fixed::from_num(1.5),
                attack_damage: Fixed::from_num(5),
                ..UnitStats::default()
            },
        };

        let lane_end = Fixed::from_num(12);
        Self {
            name: "Skirmish".to_string(),
            observer: Faction::Player,
            restart_delay: Fixed::from_num(DEFAULT_RESTART_DELAY),
            axis_locked_combat: false,
            seed: 0,
            player: FactionSetup {
                base: Some(BaseSetup {
                    position: Vec2Fixed::new(-lane_end, Fixed::ZERO),
                    max_health: Fixed::from_num(10),
                }),
                spawn_point: Vec2Fixed::new(-lane_end + Fixed::ONE, Fixed::ZERO),
                starting_money: 1000,
                income_per_second: 50,
                spawner: SpawnerMode::Manual,
            },
            enemy: FactionSetup {
                base: Some(BaseSetup {
                    position: Vec2Fixed::new(lane_end, Fixed::ZERO),
                    max_health: Fixed::from_num(10),
                }),
                spawn_point: Vec2Fixed::new(lane_end - Fixed::ONE, Fixed::ZERO),
                starting_money: 0,
                income_per_second: 0,
                spawner: SpawnerMode::Automatic {
                    interval: Fixed::from_num(5),
                    roster: vec![basic.id, tank.id],
                    lane_jitter: Fixed::from_num(0.5),
                },
            },
            templates: vec![basic, tank],
        }
    }
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self::skirmish()
    }
}

fn invalid(message: &str) -> GameError {
    GameError::InvalidConfig(message.to_string())
}

fn validate_template(template: &UnitTemplate) -> Result<()> {
    let stats = &template.stats;
    let key = &template.key;
    if template.cost < 0 {
        return Err(invalid(&format!("template '{key}' has negative cost")));
    }
    if template.spawn_cooldown < Fixed::ZERO {
        return Err(invalid(&format!("template '{key}' has negative spawn cooldown")));
    }
    if stats.max_health <= Fixed::ZERO {
        return Err(invalid(&format!("template '{key}' needs positive health")));
    }
    let non_negative = [
        ("move_speed", stats.move_speed),
        ("attack_damage", stats.attack_damage),
        ("attack_range", stats.attack_range),
        ("attack_cooldown", stats.attack_cooldown),
        ("detection_range", stats.detection_range),
    ];
    if let Some((field, _)) = non_negative.iter().find(|(_, v)| *v < Fixed::ZERO) {
        return Err(invalid(&format!("template '{key}' has negative {field}")));
    }
    let bounded = [
        ("move_speed", stats.move_speed),
        ("attack_range", stats.attack_range),
        ("detection_range", stats.detection_range),
    ];
    if let Some((field, _)) = bounded
        .iter()
        .find(|(_, v)| *v > Fixed::from_num(MAX_RANGE))
    {
        return Err(invalid(&format!(
            "template '{key}' {field} exceeds {MAX_RANGE}"
        )));
    }
    Ok(())
}

fn check_position(what: &str, position: Vec2Fixed) -> Result<()> {
    let limit = Fixed::from_num(MAX_COORDINATE);
    if position.x.abs() > limit || position.y.abs() > limit {
        return Err(invalid(&format!(
            "{what} at ({}, {}) lies outside ±{MAX_COORDINATE}",
            position.x, position.y
        )));
    }
    Ok(())
}
