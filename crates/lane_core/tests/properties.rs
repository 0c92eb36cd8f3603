//! Property tests for combat and economy invariants.

use lane_core::behavior::{step_unit, BehaviorContext};
use lane_core::components::{Health, UnitStats};
use lane_core::economy::Purse;
use lane_core::events::SimEvent;
use lane_core::factions::Faction;
use lane_core::math::Fixed;
use lane_core::registry::{Entity, EntityRegistry, Unit};
use lane_core::templates::TemplateId;
use lane_test_utils::determinism::strategies::{
    arb_damage_sequence, arb_dt, arb_health, arb_lane_position,
};
use lane_test_utils::fixtures::{build, duel_config, fixed, lane_pos};
use lane_test_utils::proptest::prelude::*;

proptest! {
    #[test]
    fn prop_health_never_negative_and_dies_once(
        max in arb_health(),
        hits in arb_damage_sequence(32),
    ) {
        let mut health = Health::new(max);
        let mut kills = 0;
        let mut total = Fixed::ZERO;
        for hit in &hits {
            total += *hit;
            if health.apply_damage(*hit).unwrap() == lane_core::combat::DamageOutcome::Killed {
                kills += 1;
            }
            prop_assert!(health.current >= Fixed::ZERO);
        }
        prop_assert!(kills <= 1);
        prop_assert_eq!(kills == 1, total >= max);
    }

    #[test]
    fn prop_base_death_event_emitted_once(
        max in arb_health(),
        hits in arb_damage_sequence(16),
    ) {
        let mut sim = build(duel_config());
        let base = sim.register_base(Faction::Enemy, lane_pos(5.0, 0.0), max);
        for hit in &hits {
            sim.apply_damage(base, *hit).unwrap();
        }
        let events = sim.tick(fixed(1)).unwrap();
        let deaths = events.deaths().iter().filter(|id| **id == base).count();
        let destroyed = events
            .events
            .iter()
            .filter(|e| matches!(e, SimEvent::BaseDestroyed { .. }))
            .count();
        let total: Fixed = hits.iter().copied().fold(Fixed::ZERO, |a, b| a + b);
        prop_assert_eq!(deaths, usize::from(total >= max));
        prop_assert_eq!(destroyed, deaths);
    }

    #[test]
    fn prop_attacks_only_within_range(
        attacker_at in arb_lane_position(),
        target_at in arb_lane_position(),
        dt in arb_dt(),
    ) {
        let mut registry = EntityRegistry::new();
        let stats = UnitStats::default();
        let attacker = registry.register(Entity::unit(
            Faction::Player,
            attacker_at,
            Unit::new(TemplateId(0), stats),
        ));
        registry.register(Entity::base(Faction::Enemy, lane_pos(10.0, 0.0), fixed(10)));
        registry.register(Entity::unit(
            Faction::Enemy,
            target_at,
            Unit::new(TemplateId(0), stats),
        ));

        let mut now = Fixed::ZERO;
        for _ in 0..40 {
            now += dt;
            let ctx = BehaviorContext { now, dt, axis_locked_combat: false };
            let mut entity = registry.get(attacker).cloned().unwrap();
            let intent = step_unit(&mut entity, &registry, &ctx);
            let from = entity.position;
            *registry.get_mut(attacker).unwrap() = entity;

            if let Some(intent) = intent {
                let target = registry.get(intent.target).unwrap();
                prop_assert!(
                    from.within(target.position, stats.attack_range),
                    "attack from {:?} on {:?} beyond range",
                    from,
                    target.position
                );
            }
        }
    }

    #[test]
    fn prop_income_pays_whole_seconds(
        steps in proptest::collection::vec(arb_dt(), 1..64),
        rate in 0i32..200,
    ) {
        let mut purse = Purse::new(0, rate);
        let mut elapsed = Fixed::ZERO;
        for dt in &steps {
            purse.advance(*dt);
            elapsed += *dt;
        }
        let whole: i32 = elapsed.int().to_num();
        prop_assert_eq!(purse.money, whole * rate);
    }
}
