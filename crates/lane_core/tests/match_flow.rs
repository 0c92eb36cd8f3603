//! End-to-end match scenarios driven through the public simulation API.

use lane_core::combat::DamageOutcome;
use lane_core::components::{UnitState, UnitStats};
use lane_core::config::MatchConfig;
use lane_core::error::{ErrorKind, GameError};
use lane_core::events::SimEvent;
use lane_core::factions::Faction;
use lane_core::match_state::MatchState;
use lane_core::spawner::SpawnResult;
use lane_core::templates::TemplateId;
use lane_test_utils::fixtures::{
    build, duel_config, fixed, fixed_f, lane_pos, run_until_over, template_with,
};

fn spawn_ok(sim: &mut lane_core::simulation::Simulation, faction: Faction) -> u64 {
    match sim.spawn_request(faction, TemplateId(0)).unwrap() {
        SpawnResult::Success(id) => id,
        other => panic!("expected successful spawn, got {other:?}"),
    }
}

#[test]
fn test_income_after_three_seconds() {
    let mut config = duel_config();
    config.player.starting_money = 100;
    config.player.income_per_second = 50;
    let mut sim = build(config);

    for _ in 0..12 {
        sim.tick(fixed_f(0.25)).unwrap();
    }
    assert_eq!(sim.money(Faction::Player), 250);
}

#[test]
fn test_insufficient_funds_keeps_money() {
    let mut config = duel_config();
    config.player.starting_money = 50;
    config.templates = vec![template_with(0, 75, 2.0, UnitStats::default())];
    let mut sim = build(config);

    let result = sim.spawn_request(Faction::Player, TemplateId(0)).unwrap();
    assert_eq!(result, SpawnResult::InsufficientFunds);
    assert_eq!(sim.money(Faction::Player), 50);
    assert!(sim.tick(fixed(1)).unwrap().spawned().is_empty());
}

#[test]
fn test_spawn_within_cooldown() {
    let mut config = duel_config();
    config.templates = vec![template_with(0, 10, 2.0, UnitStats::default())];
    let mut sim = build(config);

    spawn_ok(&mut sim, Faction::Player);
    sim.tick(fixed(1)).unwrap();
    assert_eq!(
        sim.spawn_request(Faction::Player, TemplateId(0)).unwrap(),
        SpawnResult::OnCooldown
    );
    sim.tick(fixed(1)).unwrap();
    spawn_ok(&mut sim, Faction::Player);
    assert_eq!(sim.money(Faction::Player), 10_000 - 20);
}

#[test]
fn test_opposing_units_engage_on_same_tick() {
    let mut config = duel_config();
    config.player.spawn_point = lane_pos(0.0, 0.0);
    config.enemy.spawn_point = lane_pos(0.0, 0.0);
    let mut sim = build(config);

    let player = spawn_ok(&mut sim, Faction::Player);
    let enemy = spawn_ok(&mut sim, Faction::Enemy);
    let events = sim.tick(fixed_f(0.5)).unwrap();

    for id in [player, enemy] {
        let unit = sim.registry().get(id).unwrap().as_unit().unwrap();
        assert_eq!(unit.state, UnitState::InCombat);
        assert!(events.events.contains(&SimEvent::UnitStateChanged {
            id,
            from: UnitState::MovingToBase,
            to: UnitState::InCombat,
        }));
    }
}

#[test]
fn test_base_takes_three_hits() {
    let mut sim = build(duel_config());
    let base = sim.registry().base_of(Faction::Enemy).unwrap();

    assert_eq!(
        sim.apply_damage(base, fixed(4)).unwrap(),
        DamageOutcome::Damaged {
            remaining: fixed(6)
        }
    );
    assert_eq!(
        sim.apply_damage(base, fixed(4)).unwrap(),
        DamageOutcome::Damaged {
            remaining: fixed(2)
        }
    );
    assert_eq!(sim.apply_damage(base, fixed(4)).unwrap(), DamageOutcome::Killed);
    assert_eq!(sim.apply_damage(base, fixed(4)).unwrap(), DamageOutcome::Ignored);

    let events = sim.tick(fixed_f(0.5)).unwrap();
    let destroyed = events
        .events
        .iter()
        .filter(|e| matches!(e, SimEvent::BaseDestroyed { .. }))
        .count();
    assert_eq!(destroyed, 1);
    assert_eq!(events.deaths(), vec![base]);
    assert!(events.events.contains(&SimEvent::BaseDestroyed {
        faction: Faction::Enemy
    }));
    assert_eq!(events.match_outcome(), Some(MatchState::Won));
    assert!(sim.registry().get(base).is_none());
}

#[test]
fn test_losing_own_base_is_defeat() {
    let mut sim = build(duel_config());
    let base = sim.registry().base_of(Faction::Player).unwrap();
    sim.apply_damage(base, fixed(10)).unwrap();
    let events = sim.tick(fixed(1)).unwrap();
    assert_eq!(events.match_outcome(), Some(MatchState::Lost));
    assert_eq!(sim.match_state(), MatchState::Lost);
}

#[test]
fn test_world_frozen_after_match_end() {
    let mut sim = build(duel_config());
    let unit = spawn_ok(&mut sim, Faction::Player);
    sim.tick(fixed_f(0.5)).unwrap();

    let base = sim.registry().base_of(Faction::Enemy).unwrap();
    sim.apply_damage(base, fixed(10)).unwrap();
    sim.tick(fixed_f(0.5)).unwrap();
    assert_eq!(sim.match_state(), MatchState::Won);

    let frozen = sim.registry().get(unit).cloned().unwrap();
    let money = sim.money(Faction::Player);
    for _ in 0..10 {
        let events = sim.tick(fixed(1)).unwrap();
        assert!(events.is_empty());
    }
    assert_eq!(sim.registry().get(unit), Some(&frozen));
    assert_eq!(sim.money(Faction::Player), money);

    let err = sim.spawn_request(Faction::Player, TemplateId(0)).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::AlreadyTerminal);
}

#[test]
fn test_lone_unit_destroys_enemy_base() {
    let mut sim = build(duel_config());
    spawn_ok(&mut sim, Faction::Player);

    let ticks = run_until_over(&mut sim, fixed_f(0.5), 100);
    assert!(ticks < 100, "match should end");
    assert_eq!(sim.match_state(), MatchState::Won);
    assert!(sim.registry().base_of(Faction::Enemy).is_none());
}

#[test]
fn test_elimination_without_bases() {
    let mut config = duel_config();
    config.player.base = None;
    config.enemy.base = None;
    config.player.spawn_point = lane_pos(-0.5, 0.0);
    config.enemy.spawn_point = lane_pos(0.5, 0.0);
    let mut sim = build(config);

    let player = spawn_ok(&mut sim, Faction::Player);
    let enemy = spawn_ok(&mut sim, Faction::Enemy);

    let mut deaths = Vec::new();
    let mut outcome = None;
    for _ in 0..20 {
        let events = sim.tick(fixed_f(0.5)).unwrap();
        deaths.extend(events.deaths());
        if let Some(end) = events.match_outcome() {
            outcome = Some(end);
            break;
        }
    }

    // Lower id strikes first each tick, so the enemy falls first and never
    // lands its final blow.
    assert_eq!(deaths, vec![enemy]);
    assert_eq!(outcome, Some(MatchState::Won));
    let survivor = sim.registry().get(player).unwrap();
    assert_eq!(survivor.health().current, fixed(1));
}

#[test]
fn test_death_reported_once_in_prolonged_fight() {
    let mut config = duel_config();
    config.player.spawn_point = lane_pos(-0.5, 0.0);
    config.enemy.spawn_point = lane_pos(0.5, 0.0);
    let mut sim = build(config);

    for _ in 0..3 {
        spawn_ok(&mut sim, Faction::Player);
        spawn_ok(&mut sim, Faction::Enemy);
    }

    let mut deaths = Vec::new();
    for _ in 0..200 {
        let events = sim.tick(fixed_f(0.25)).unwrap();
        deaths.extend(events.deaths());
        for id in events.deaths() {
            assert!(
                !sim.registry().contains(id),
                "dead entity {id} must be removed at end of tick"
            );
        }
    }
    let mut unique = deaths.clone();
    unique.sort_unstable();
    unique.dedup();
    assert_eq!(unique.len(), deaths.len(), "duplicate death events: {deaths:?}");
}

#[test]
fn test_restart_rebuilds_from_config() {
    let mut sim = build(duel_config());
    spawn_ok(&mut sim, Faction::Player);
    let base = sim.registry().base_of(Faction::Player).unwrap();
    sim.apply_damage(base, fixed(10)).unwrap();
    sim.tick(fixed(1)).unwrap();

    assert!(matches!(sim.restart(), Err(GameError::RestartPending { .. })));
    sim.tick(fixed(3)).unwrap();
    sim.restart().unwrap();

    assert_eq!(sim.match_state(), MatchState::Active);
    assert_eq!(sim.registry().len(), 2);
    assert_eq!(sim.money(Faction::Player), 10_000);
    let events = sim.tick(fixed(1)).unwrap();
    assert_eq!(events.events, vec![SimEvent::MatchRestarted]);
}

#[test]
fn test_skirmish_enemy_spawns_on_interval() {
    let mut sim = build(MatchConfig::skirmish());
    let mut spawn_ticks = Vec::new();
    for _ in 0..44 {
        let events = sim.tick(fixed_f(0.25)).unwrap();
        if !events.spawned().is_empty() {
            spawn_ticks.push(events.tick);
        }
    }
    // 5 s interval at 0.25 s per tick
    assert_eq!(spawn_ticks, vec![20, 40]);
}

#[test]
fn test_oversized_world_is_rejected_up_front() {
    let mut long_lane = duel_config();
    if let Some(base) = long_lane.player.base.as_mut() {
        base.position = lane_pos(-60_000.0, 0.0);
    }
    if let Some(base) = long_lane.enemy.base.as_mut() {
        base.position = lane_pos(60_000.0, 0.0);
    }
    let err = lane_core::simulation::Simulation::new(long_lane).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Data);

    let mut far_sight = duel_config();
    far_sight.templates[0].stats.detection_range = fixed(100_000);
    let err = lane_core::simulation::Simulation::new(far_sight).unwrap_err();
    assert!(matches!(err, GameError::InvalidConfig(_)));
}

#[test]
fn test_registered_far_base_ticks_without_overflow() {
    let mut sim = build(duel_config());
    sim.register_base(Faction::Enemy, lane_pos(60_000.0, 0.0), fixed(10));
    spawn_ok(&mut sim, Faction::Player);
    spawn_ok(&mut sim, Faction::Enemy);
    for _ in 0..4 {
        sim.tick(fixed_f(0.25)).unwrap();
    }
    assert_eq!(sim.match_state(), MatchState::Active);
}
