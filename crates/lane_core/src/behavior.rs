//! Per-unit behavior state machine.
//!
//! [`step_unit`] advances a single unit by one tick against a read-only view
//! of the registry. It may move the unit and change its state, and it
//! returns the attack the unit makes this tick, if any. The caller applies
//! that attack.
//!
//! ```text
//! MovingToBase --hostile in detection--> InCombat
//! MovingToBase --base in attack range--> AttackingBase
//! MovingToBase --no opposing base------> Idle
//! InCombat --target gone / out of detection--> MovingToBase
//! AttackingBase --hostile in detection--> InCombat
//! AttackingBase --no opposing base------> Idle
//! AttackingBase --base out of range-----> MovingToBase
//! Idle --opposing base exists--> MovingToBase
//! ```

use crate::combat::AttackIntent;
use crate::components::{EntityId, UnitState};
use crate::factions::Faction;
use crate::math::{Fixed, Vec2Fixed};
use crate::registry::{Entity, EntityKind, EntityRegistry, Unit};

/// Per-tick inputs shared by every unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BehaviorContext {
    /// Simulated time after this tick's clock advance.
    pub now: Fixed,
    /// Length of this tick in simulated seconds.
    pub dt: Fixed,
    /// Pursue combat targets along the lane axis only.
    pub axis_locked_combat: bool,
}

struct Actor<'a> {
    id: EntityId,
    faction: Faction,
    position: &'a mut Vec2Fixed,
    unit: &'a mut Unit,
}

/// Advance one unit by one tick.
///
/// Bases and dead units are left untouched.
pub fn step_unit(
    entity: &mut Entity,
    registry: &EntityRegistry,
    ctx: &BehaviorContext,
) -> Option<AttackIntent> {
    let Entity {
        id,
        faction,
        position,
        kind,
    } = entity;
    let EntityKind::Unit(unit) = kind else {
        return None;
    };
    if unit.health.is_dead() {
        return None;
    }

    let mut actor = Actor {
        id: *id,
        faction: *faction,
        position,
        unit,
    };
    match actor.unit.state {
        UnitState::MovingToBase => moving_to_base(&mut actor, registry, ctx),
        UnitState::InCombat => in_combat(&mut actor, registry, ctx),
        UnitState::AttackingBase => attacking_base(&mut actor, registry, ctx),
        UnitState::Idle => {
            if registry.base_of(actor.faction.opponent()).is_some() {
                actor.unit.state = UnitState::MovingToBase;
            }
            None
        }
    }
}

fn moving_to_base(
    actor: &mut Actor<'_>,
    registry: &EntityRegistry,
    ctx: &BehaviorContext,
) -> Option<AttackIntent> {
    if engage_nearest(actor, registry) {
        return None;
    }

    let Some(base) = registry
        .base_of(actor.faction.opponent())
        .and_then(|id| registry.get(id))
    else {
        actor.unit.state = UnitState::Idle;
        return None;
    };

    let stats = actor.unit.stats;
    if actor.position.within(base.position, stats.attack_range) {
        actor.unit.state = UnitState::AttackingBase;
        return None;
    }

    *actor.position = actor
        .position
        .move_towards_x(base.position.x, stats.move_speed.saturating_mul(ctx.dt));
    None
}

fn in_combat(
    actor: &mut Actor<'_>,
    registry: &EntityRegistry,
    ctx: &BehaviorContext,
) -> Option<AttackIntent> {
    let Some(target) = actor
        .unit
        .combat_target
        .and_then(|target| registry.get_live(target))
    else {
        disengage(actor.unit);
        return None;
    };

    let stats = actor.unit.stats;
    if !actor.position.within(target.position, stats.detection_range) {
        disengage(actor.unit);
        return None;
    }

    if actor.position.within(target.position, stats.attack_range) {
        return try_attack(actor, target.id, ctx);
    }

    let step = stats.move_speed.saturating_mul(ctx.dt);
    *actor.position = if ctx.axis_locked_combat {
        actor.position.move_towards_x(target.position.x, step)
    } else {
        actor.position.move_towards(target.position, step)
    };
    None
}

/// Assault the opposing base.
///
/// If the lowest-id opposing base is out of range, which happens once an
/// extra base from [`crate::simulation::Simulation::register_base`] takes
/// over as the target, the unit walks toward it again.
fn attacking_base(
    actor: &mut Actor<'_>,
    registry: &EntityRegistry,
    ctx: &BehaviorContext,
) -> Option<AttackIntent> {
    if engage_nearest(actor, registry) {
        return None;
    }

    let Some(base) = registry
        .base_of(actor.faction.opponent())
        .and_then(|id| registry.get(id))
    else {
        actor.unit.state = UnitState::Idle;
        return None;
    };

    if !actor.position.within(base.position, actor.unit.stats.attack_range) {
        actor.unit.state = UnitState::MovingToBase;
        return None;
    }
    try_attack(actor, base.id, ctx)
}

/// Enter combat with the nearest hostile unit in detection range.
fn engage_nearest(actor: &mut Actor<'_>, registry: &EntityRegistry) -> bool {
    let Some(hostile) = registry.nearest_hostile_unit(
        *actor.position,
        actor.unit.stats.detection_range,
        actor.faction,
    ) else {
        return false;
    };
    actor.unit.state = UnitState::InCombat;
    actor.unit.combat_target = Some(hostile);
    true
}

fn disengage(unit: &mut Unit) {
    unit.combat_target = None;
    unit.state = UnitState::MovingToBase;
}

fn try_attack(
    actor: &mut Actor<'_>,
    target: EntityId,
    ctx: &BehaviorContext,
) -> Option<AttackIntent> {
    if !actor.unit.attack_ready(ctx.now) {
        return None;
    }
    actor.unit.last_attack = Some(ctx.now);
    Some(AttackIntent {
        attacker: actor.id,
        target,
        damage: actor.unit.stats.attack_damage,
    })
}
