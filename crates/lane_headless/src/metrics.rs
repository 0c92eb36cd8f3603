//! Match metrics collection.
//!
//! [`MetricsCollector`] folds each tick's events into per-faction counters;
//! [`BatchSummary`] aggregates finished matches.

use std::collections::{BTreeMap, HashMap, HashSet};

use lane_core::components::{EntityId, UnitState};
use lane_core::events::{SimEvent, TickEvents};
use lane_core::factions::Faction;
use lane_core::match_state::MatchState;
use lane_core::simulation::Simulation;
use serde::{Deserialize, Serialize};

use crate::protocol::to_f64;

/// Metrics for a single match.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GameMetrics {
    /// Unique game identifier.
    pub game_id: String,
    /// Match name.
    pub scenario: String,
    /// Random seed used.
    pub seed: u64,
    /// Ticks simulated.
    pub duration_ticks: u64,
    /// Simulated seconds.
    pub duration_seconds: f64,
    /// Winning faction, `None` if the match hit the tick limit.
    pub winner: Option<String>,
    /// How the match ended: `base_destroyed`, `elimination` or `timeout`.
    pub win_condition: String,
    /// Final state hash.
    pub final_state_hash: u64,
    /// Per-faction metrics, keyed by faction short name.
    pub factions: BTreeMap<String, FactionMetrics>,
}

impl GameMetrics {
    /// Create empty metrics for a match.
    pub fn new(game_id: impl Into<String>, scenario: impl Into<String>, seed: u64) -> Self {
        Self {
            game_id: game_id.into(),
            scenario: scenario.into(),
            seed,
            ..Default::default()
        }
    }

    /// Get or create faction metrics.
    pub fn faction_mut(&mut self, faction: Faction) -> &mut FactionMetrics {
        self.factions
            .entry(faction.short_name().to_string())
            .or_default()
    }
}

/// Metrics for one faction in one match.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FactionMetrics {
    /// Units spawned, by template key.
    pub units_spawned: BTreeMap<String, u32>,
    /// Units of this faction that died.
    pub units_lost: u32,
    /// Non-lethal damage taken.
    pub damage_taken: f64,
    /// Tick this faction's first unit entered combat.
    pub first_combat_tick: Option<u64>,
    /// Whether this faction's base fell.
    pub base_destroyed: bool,
    /// Money left when the match ended.
    pub final_money: i32,
}

impl FactionMetrics {
    /// Total units spawned across templates.
    #[must_use]
    pub fn total_spawned(&self) -> u32 {
        self.units_spawned.values().sum()
    }
}

/// Summary statistics across multiple matches.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchSummary {
    /// Total matches played.
    pub total_games: u32,
    /// Matches won by each faction.
    pub wins_by_faction: HashMap<String, u32>,
    /// Win rates by faction.
    pub win_rates: HashMap<String, f64>,
    /// Matches that hit the tick limit.
    pub draws: u32,
    /// Average match length in ticks.
    pub avg_duration_ticks: f64,
    /// Shortest match.
    pub min_duration_ticks: u64,
    /// Longest match.
    pub max_duration_ticks: u64,
    /// Average units spawned per match by faction.
    pub avg_units_spawned: HashMap<String, f64>,
    /// Average units lost per match by faction.
    pub avg_units_lost: HashMap<String, f64>,
}

impl BatchSummary {
    /// Calculate summary from a list of match metrics.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn from_games(games: &[GameMetrics]) -> Self {
        if games.is_empty() {
            return Self::default();
        }

        let total = games.len() as f64;
        let mut summary = Self {
            total_games: u32::try_from(games.len()).unwrap_or(u32::MAX),
            min_duration_ticks: u64::MAX,
            ..Default::default()
        };

        let mut duration_sum = 0u64;
        let mut spawned: HashMap<String, u64> = HashMap::new();
        let mut lost: HashMap<String, u64> = HashMap::new();

        for game in games {
            duration_sum += game.duration_ticks;
            summary.min_duration_ticks = summary.min_duration_ticks.min(game.duration_ticks);
            summary.max_duration_ticks = summary.max_duration_ticks.max(game.duration_ticks);

            match &game.winner {
                Some(winner) => *summary.wins_by_faction.entry(winner.clone()).or_default() += 1,
                None => summary.draws += 1,
            }

            for (faction, metrics) in &game.factions {
                *spawned.entry(faction.clone()).or_default() += u64::from(metrics.total_spawned());
                *lost.entry(faction.clone()).or_default() += u64::from(metrics.units_lost);
            }
        }

        summary.avg_duration_ticks = duration_sum as f64 / total;
        for (faction, wins) in &summary.wins_by_faction {
            summary
                .win_rates
                .insert(faction.clone(), f64::from(*wins) / total);
        }
        summary.avg_units_spawned = spawned
            .into_iter()
            .map(|(faction, sum)| (faction, sum as f64 / total))
            .collect();
        summary.avg_units_lost = lost
            .into_iter()
            .map(|(faction, sum)| (faction, sum as f64 / total))
            .collect();

        summary
    }

    /// Check if every win rate is within `threshold` of 0.5.
    #[must_use]
    pub fn is_balanced(&self, threshold: f64) -> bool {
        self.win_rates
            .values()
            .all(|rate| (rate - 0.5).abs() <= threshold)
    }

    /// Get the dominant faction (if any).
    #[must_use]
    pub fn dominant_faction(&self, threshold: f64) -> Option<&String> {
        self.win_rates
            .iter()
            .find(|(_, rate)| **rate > 0.5 + threshold)
            .map(|(faction, _)| faction)
    }
}

/// Tracks events during a match.
#[derive(Debug, Default)]
pub struct MetricsCollector {
    /// Current match metrics.
    metrics: GameMetrics,
    /// Owner of every entity seen so far.
    owners: HashMap<EntityId, Faction>,
    /// Base entities, which do not count as lost units.
    bases: HashSet<EntityId>,
}

impl MetricsCollector {
    /// Create a collector for a freshly built simulation.
    #[must_use]
    pub fn new(game_id: &str, sim: &Simulation) -> Self {
        let mut collector = Self {
            metrics: GameMetrics::new(game_id, sim.config().name.as_str(), sim.config().seed),
            owners: HashMap::new(),
            bases: HashSet::new(),
        };
        for entity in sim.registry().iter_live() {
            collector.owners.insert(entity.id, entity.faction);
            if entity.is_base() {
                collector.bases.insert(entity.id);
            }
        }
        for faction in Faction::ALL {
            collector.metrics.faction_mut(faction);
        }
        collector
    }

    /// Fold one tick's events in.
    pub fn record(&mut self, step: &TickEvents, sim: &Simulation) {
        for event in &step.events {
            match event {
                SimEvent::Spawned {
                    id,
                    faction,
                    template,
                } => {
                    self.owners.insert(*id, *faction);
                    let key = sim
                        .templates()
                        .get(*template)
                        .map_or_else(|| format!("#{}", template.0), |t| t.key.clone());
                    *self
                        .metrics
                        .faction_mut(*faction)
                        .units_spawned
                        .entry(key)
                        .or_default() += 1;
                }
                SimEvent::Damaged { id, amount, .. } => {
                    if let Some(faction) = self.owners.get(id).copied() {
                        self.metrics.faction_mut(faction).damage_taken += to_f64(*amount);
                    }
                }
                SimEvent::Death { id } => {
                    if self.bases.contains(id) {
                        continue;
                    }
                    if let Some(faction) = self.owners.get(id).copied() {
                        self.metrics.faction_mut(faction).units_lost += 1;
                    }
                }
                SimEvent::BaseDestroyed { faction } => {
                    self.metrics.faction_mut(*faction).base_destroyed = true;
                }
                SimEvent::UnitStateChanged {
                    id,
                    to: UnitState::InCombat,
                    ..
                } => {
                    if let Some(faction) = self.owners.get(id).copied() {
                        self.metrics
                            .faction_mut(faction)
                            .first_combat_tick
                            .get_or_insert(step.tick);
                    }
                }
                SimEvent::UnitStateChanged { .. }
                | SimEvent::MatchEnded { .. }
                | SimEvent::MatchRestarted => {}
            }
        }
    }

    /// Close out the match and return the metrics.
    #[must_use]
    pub fn finish(mut self, sim: &Simulation) -> GameMetrics {
        let observer = sim.config().observer;
        let winner = match sim.match_state() {
            MatchState::Active => None,
            MatchState::Won => Some(observer),
            MatchState::Lost => Some(observer.opponent()),
        };

        self.metrics.win_condition = match winner {
            None => "timeout",
            Some(winner) => {
                let loser = winner.opponent().short_name();
                if self.metrics.factions.get(loser).is_some_and(|m| m.base_destroyed) {
                    "base_destroyed"
                } else {
                    "elimination"
                }
            }
        }
        .to_string();
        self.metrics.winner = winner.map(|f| f.short_name().to_string());
        self.metrics.duration_ticks = sim.get_tick();
        self.metrics.duration_seconds = to_f64(sim.clock());
        self.metrics.final_state_hash = sim.state_hash();
        for faction in Faction::ALL {
            self.metrics.faction_mut(faction).final_money = sim.money(faction);
        }
        self.metrics
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lane_core::math::Fixed;
    use lane_core::templates::TemplateId;
    use lane_test_utils::fixtures::{build, duel_config, fixed, fixed_f};

    #[test]
    fn test_collects_spawns_and_outcome() {
        let mut sim = build(duel_config());
        let mut collector = MetricsCollector::new("game_0", &sim);

        sim.spawn_request(Faction::Player, TemplateId(0)).unwrap();
        for _ in 0..200 {
            let step = sim.tick(fixed_f(0.5)).unwrap();
            collector.record(&step, &sim);
            if step.match_outcome().is_some() {
                break;
            }
        }

        let metrics = collector.finish(&sim);
        assert_eq!(metrics.winner.as_deref(), Some("player"));
        assert_eq!(metrics.win_condition, "base_destroyed");
        assert_eq!(metrics.factions["player"].total_spawned(), 1);
        assert!(metrics.factions["enemy"].base_destroyed);
        assert_eq!(metrics.factions["enemy"].units_lost, 0);
        assert!(metrics.factions["enemy"].damage_taken > 0.0);
    }

    #[test]
    fn test_timeout_has_no_winner() {
        let mut sim = build(duel_config());
        let mut collector = MetricsCollector::new("game_1", &sim);
        for _ in 0..4 {
            let step = sim.tick(fixed(1)).unwrap();
            collector.record(&step, &sim);
        }
        let metrics = collector.finish(&sim);
        assert_eq!(metrics.winner, None);
        assert_eq!(metrics.win_condition, "timeout");
        assert_eq!(metrics.duration_seconds, 4.0);
    }

    #[test]
    fn test_unit_death_counted_for_owner() {
        let mut sim = build(duel_config());
        let mut collector = MetricsCollector::new("game_2", &sim);
        let id = match sim.spawn_request(Faction::Enemy, TemplateId(0)).unwrap() {
            lane_core::spawner::SpawnResult::Success(id) => id,
            other => panic!("spawn failed: {other:?}"),
        };
        sim.apply_damage(id, Fixed::from_num(100)).unwrap();
        let step = sim.tick(fixed(1)).unwrap();
        collector.record(&step, &sim);
        let metrics = collector.finish(&sim);
        assert_eq!(metrics.factions["enemy"].units_lost, 1);
        assert_eq!(metrics.factions["enemy"].total_spawned(), 1);
    }

    #[test]
    fn test_summary_win_rates() {
        let mut a = GameMetrics::new("a", "Duel", 0);
        a.winner = Some("player".to_string());
        a.duration_ticks = 10;
        let mut b = GameMetrics::new("b", "Duel", 1);
        b.winner = Some("enemy".to_string());
        b.duration_ticks = 30;
        let c = GameMetrics {
            duration_ticks: 20,
            ..GameMetrics::new("c", "Duel", 2)
        };

        let summary = BatchSummary::from_games(&[a, b, c]);
        assert_eq!(summary.total_games, 3);
        assert_eq!(summary.draws, 1);
        assert_eq!(summary.min_duration_ticks, 10);
        assert_eq!(summary.max_duration_ticks, 30);
        assert!((summary.avg_duration_ticks - 20.0).abs() < 1e-9);
        assert!(summary.is_balanced(0.2));
        assert_eq!(summary.dominant_faction(0.2), None);
    }

    #[test]
    fn test_empty_summary() {
        let summary = BatchSummary::from_games(&[]);
        assert_eq!(summary.total_games, 0);
        assert!(summary.win_rates.is_empty());
    }
}
