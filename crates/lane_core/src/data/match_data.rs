//! Match definition files.

use serde::{Deserialize, Serialize};

use super::{to_fixed, UnitData};
use crate::config::{BaseSetup, FactionSetup, MatchConfig, SpawnerMode, DEFAULT_RESTART_DELAY};
use crate::error::{GameError, Result};
use crate::factions::Faction;
use crate::math::Vec2Fixed;
use crate::templates::{TemplateId, UnitTemplate};

fn default_observer() -> Faction {
    Faction::Player
}

fn default_restart_delay() -> f32 {
    DEFAULT_RESTART_DELAY as f32
}

fn default_base_health() -> f32 {
    10.0
}

/// Base placement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BaseData {
    /// Lane position.
    pub x: f32,
    /// Cross-lane offset.
    #[serde(default)]
    pub y: f32,
    /// Starting and maximum health.
    #[serde(default = "default_base_health")]
    pub health: f32,
}

/// Spawner behavior for one faction.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub enum SpawnerData {
    /// Spawn only on request.
    #[default]
    Manual,
    /// Spawn a random roster entry every `interval` seconds.
    Automatic {
        /// Seconds between spawns.
        interval: f32,
        /// Unit keys to pick from.
        roster: Vec<String>,
        /// Maximum cross-lane offset of each spawn.
        #[serde(default)]
        lane_jitter: f32,
    },
}

/// One side of a match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactionData {
    /// Base, if the faction has one.
    #[serde(default)]
    pub base: Option<BaseData>,
    /// Where units appear, as `(x, y)`.
    pub spawn_point: (f32, f32),
    /// Money at match start.
    #[serde(default)]
    pub starting_money: i32,
    /// Money gained per whole second.
    #[serde(default)]
    pub income_per_second: i32,
    /// Spawner behavior.
    #[serde(default)]
    pub spawner: SpawnerData,
}

/// A complete match definition.
///
/// # Example RON
///
/// ```ron
/// MatchData(
///     name: "Duel",
///     seed: 7,
///     player: FactionData(
///         base: Some(BaseData(x: -10.0)),
///         spawn_point: (-9.0, 0.0),
///         starting_money: 1000,
///         income_per_second: 50,
///     ),
///     enemy: FactionData(
///         base: Some(BaseData(x: 10.0)),
///         spawn_point: (9.0, 0.0),
///         spawner: Automatic(interval: 5.0, roster: ["basic_cat"], lane_jitter: 0.5),
///     ),
///     units: [ /* UnitData entries */ ],
/// )
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchData {
    /// Human-readable name.
    pub name: String,
    /// Faction outcomes are reported for.
    #[serde(default = "default_observer")]
    pub observer: Faction,
    /// Seconds after match end before restart is accepted.
    #[serde(default = "default_restart_delay")]
    pub restart_delay: f32,
    /// Pursue combat targets along the lane axis only.
    #[serde(default)]
    pub axis_locked_combat: bool,
    /// Seed for automatic spawner choices.
    #[serde(default)]
    pub seed: u64,
    /// Player side.
    pub player: FactionData,
    /// Enemy side.
    pub enemy: FactionData,
    /// Unit definitions, assigned template ids in list order.
    pub units: Vec<UnitData>,
}

impl MatchData {
    /// Parse a match definition from RON text.
    ///
    /// `origin` names the source in error messages.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::DataParseError`] on malformed input.
    pub fn from_ron_str(source: &str, origin: &str) -> Result<Self> {
        ron::from_str(source).map_err(|e| GameError::DataParseError {
            path: origin.to_string(),
            message: e.to_string(),
        })
    }

    /// Convert to a validated fixed-point configuration.
    ///
    /// # Errors
    ///
    /// Fails on unrepresentable decimals, unknown roster keys or any
    /// [`MatchConfig::validate`] failure.
    pub fn into_config(&self) -> Result<MatchConfig> {
        let templates = self
            .units
            .iter()
            .enumerate()
            .map(|(index, unit)| {
                let id = u32::try_from(index)
                    .map_err(|_| GameError::InvalidConfig("too many unit definitions".into()))?;
                unit.to_template(TemplateId(id))
            })
            .collect::<Result<Vec<_>>>()?;

        let config = MatchConfig {
            name: self.name.clone(),
            observer: self.observer,
            restart_delay: to_fixed("restart_delay", self.restart_delay)?,
            axis_locked_combat: self.axis_locked_combat,
            seed: self.seed,
            player: faction_setup(Faction::Player, &self.player, &templates)?,
            enemy: faction_setup(Faction::Enemy, &self.enemy, &templates)?,
            templates,
        };
        config.validate()?;
        Ok(config)
    }
}

fn faction_setup(
    faction: Faction,
    data: &FactionData,
    templates: &[UnitTemplate],
) -> Result<FactionSetup> {
    let prefix = faction.short_name();
    let base = data
        .base
        .as_ref()
        .map(|base| -> Result<BaseSetup> {
            Ok(BaseSetup {
                position: Vec2Fixed::new(
                    to_fixed(&format!("{prefix}.base.x"), base.x)?,
                    to_fixed(&format!("{prefix}.base.y"), base.y)?,
                ),
                max_health: to_fixed(&format!("{prefix}.base.health"), base.health)?,
            })
        })
        .transpose()?;

    let spawner = match &data.spawner {
        SpawnerData::Manual => SpawnerMode::Manual,
        SpawnerData::Automatic {
            interval,
            roster,
            lane_jitter,
        } => SpawnerMode::Automatic {
            interval: to_fixed(&format!("{prefix}.spawner.interval"), *interval)?,
            roster: roster
                .iter()
                .map(|key| {
                    templates
                        .iter()
                        .find(|template| &template.key == key)
                        .map(|template| template.id)
                        .ok_or_else(|| GameError::UnknownTemplate(key.clone()))
                })
                .collect::<Result<Vec<_>>>()?,
            lane_jitter: to_fixed(&format!("{prefix}.spawner.lane_jitter"), *lane_jitter)?,
        },
    };

    Ok(FactionSetup {
        base,
        spawn_point: Vec2Fixed::new(
            to_fixed(&format!("{prefix}.spawn_point.x"), data.spawn_point.0)?,
            to_fixed(&format!("{prefix}.spawn_point.y"), data.spawn_point.1)?,
        ),
        starting_money: data.starting_money,
        income_per_second: data.income_per_second,
        spawner,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::Fixed;

    const DUEL: &str = r#"MatchData(
        name: "Duel",
        seed: 7,
        player: FactionData(
            base: Some(BaseData(x: -10.0)),
            spawn_point: (-9.0, 0.0),
            starting_money: 1000,
            income_per_second: 50,
        ),
        enemy: FactionData(
            base: Some(BaseData(x: 10.0, health: 20.0)),
            spawn_point: (9.0, 0.0),
            spawner: Automatic(interval: 5.0, roster: ["basic_cat"], lane_jitter: 0.5),
        ),
        units: [
            UnitData(
                key: "basic_cat",
                name: "Basic Cat",
                cost: 75,
                spawn_cooldown: 2.0,
                health: 10.0,
                move_speed: 3.0,
                attack_damage: 10.0,
            ),
        ],
    )"#;

    #[test]
    fn test_parse_and_convert() {
        let data = MatchData::from_ron_str(DUEL, "duel.ron").unwrap();
        assert_eq!(data.observer, Faction::Player);
        assert_eq!(data.restart_delay, 3.0);

        let config = data.into_config().unwrap();
        assert_eq!(config.seed, 7);
        assert_eq!(config.player.starting_money, 1000);
        assert_eq!(config.enemy.base.unwrap().max_health, Fixed::from_num(20));
        assert_eq!(config.player.base.unwrap().max_health, Fixed::from_num(10));
        assert_eq!(
            config.enemy.spawner,
            SpawnerMode::Automatic {
                interval: Fixed::from_num(5),
                roster: vec![TemplateId(0)],
                lane_jitter: Fixed::from_num(0.5),
            }
        );
    }

    #[test]
    fn test_unknown_roster_key() {
        let source = DUEL.replace(r#"roster: ["basic_cat"]"#, r#"roster: ["dog"]"#);
        let data = MatchData::from_ron_str(&source, "duel.ron").unwrap();
        assert!(matches!(
            data.into_config(),
            Err(GameError::UnknownTemplate(key)) if key == "dog"
        ));
    }

    #[test]
    fn test_bundled_skirmish_matches_builtin() {
        let source = include_str!("../../../../assets/data/skirmish.ron");
        let data = MatchData::from_ron_str(source, "skirmish.ron").unwrap();
        assert_eq!(data.into_config().unwrap(), MatchConfig::skirmish());
    }

    #[test]
    fn test_malformed_input() {
        let err = MatchData::from_ron_str("MatchData(", "broken.ron").unwrap_err();
        assert!(matches!(err, GameError::DataParseError { ref path, .. } if path == "broken.ron"));
    }
}
