//! Test fixtures and helpers.
//!
//! Pre-built match configurations and unit templates for consistent
//! testing.

use fixed::types::I32F32;
use lane_core::components::UnitStats;
use lane_core::config::{BaseSetup, FactionSetup, MatchConfig, SpawnerMode};
use lane_core::factions::Faction;
use lane_core::match_state::MatchState;
use lane_core::math::Vec2Fixed;
use lane_core::simulation::Simulation;
use lane_core::templates::{TemplateId, UnitTemplate};

/// Create a fixed-point number from an integer.
#[must_use]
pub fn fixed(n: i32) -> I32F32 {
    I32F32::from_num(n)
}

/// Create a fixed-point number from a float (for tests only).
///
/// Note: In real simulation code, never use floats.
/// This is only for convenient test setup.
#[must_use]
pub fn fixed_f(n: f64) -> I32F32 {
    I32F32::from_num(n)
}

/// A position on the lane.
#[must_use]
pub fn lane_pos(x: f64, y: f64) -> Vec2Fixed {
    Vec2Fixed::new(fixed_f(x), fixed_f(y))
}

/// A cheap, cooldown-free template with default stats.
#[must_use]
pub fn grunt_template(id: u32) -> UnitTemplate {
    UnitTemplate {
        id: TemplateId(id),
        key: format!("grunt_{id}"),
        name: format!("Grunt {id}"),
        cost: 0,
        spawn_cooldown: I32F32::ZERO,
        stats: UnitStats::default(),
    }
}

/// A template with explicit combat tuning.
#[must_use]
pub fn template_with(id: u32, cost: i32, cooldown: f64, stats: UnitStats) -> UnitTemplate {
    UnitTemplate {
        cost,
        spawn_cooldown: fixed_f(cooldown),
        stats,
        ..grunt_template(id)
    }
}

fn manual_side(base_x: f64, spawn_x: f64, money: i32, income: i32) -> FactionSetup {
    FactionSetup {
        base: Some(BaseSetup {
            position: lane_pos(base_x, 0.0),
            max_health: fixed(10),
        }),
        spawn_point: lane_pos(spawn_x, 0.0),
        starting_money: money,
        income_per_second: income,
        spawner: SpawnerMode::Manual,
    }
}

/// Two manual factions with bases at x = -10 and x = 10, no income and
/// plenty of money. Template 0 is a [`grunt_template`].
#[must_use]
pub fn duel_config() -> MatchConfig {
    MatchConfig {
        name: "Duel".to_string(),
        observer: Faction::Player,
        restart_delay: fixed(3),
        axis_locked_combat: false,
        seed: 1,
        player: manual_side(-10.0, -9.0, 10_000, 0),
        enemy: manual_side(10.0, 9.0, 10_000, 0),
        templates: vec![grunt_template(0)],
    }
}

/// The built-in skirmish with both sides spawning automatically.
#[must_use]
pub fn ai_vs_ai_config(seed: u64) -> MatchConfig {
    let mut config = MatchConfig::skirmish();
    config.seed = seed;
    let roster: Vec<TemplateId> = config.templates.iter().map(|t| t.id).collect();
    config.player.spawner = SpawnerMode::Automatic {
        interval: fixed(5),
        roster,
        lane_jitter: fixed_f(0.5),
    };
    config
}

/// Build a simulation, panicking on invalid configuration.
#[must_use]
pub fn build(config: MatchConfig) -> Simulation {
    Simulation::new(config).expect("fixture configuration must be valid")
}

/// Tick until the match ends or `max_ticks` elapse. Returns ticks run.
pub fn run_until_over(sim: &mut Simulation, dt: I32F32, max_ticks: u64) -> u64 {
    let mut ticks = 0;
    while sim.match_state() == MatchState::Active && ticks < max_ticks {
        sim.tick(dt).expect("tick with non-negative dt");
        ticks += 1;
    }
    ticks
}
