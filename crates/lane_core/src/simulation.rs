//! Core simulation loop.
//!
//! [`Simulation`] owns the registry, both spawners and the match controller,
//! and advances them together by a caller-supplied `dt`.
//!
//! # Tick Order
//!
//! 1. **Clock** - advance simulated time
//! 2. **Spawners** - pay income, fire automatic spawners
//! 3. **Units** - run the state machine for every live unit in id order,
//!    applying each attack before the next unit moves
//! 4. **Removal** - drop entities killed or unregistered this tick
//! 5. **Match** - evaluate victory and defeat
//!
//! Once the match leaves `Active`, ticks only advance the clock.
//!
//! # Determinism
//!
//! - No floating-point math (uses fixed-point via [`Fixed`])
//! - Automatic spawns use a seeded generator
//! - Consistent iteration order (sorted entity IDs)
//!
//! # Example
//!
//! ```
//! use lane_core::config::MatchConfig;
//! use lane_core::factions::Faction;
//! use lane_core::math::Fixed;
//! use lane_core::simulation::Simulation;
//! use lane_core::spawner::SpawnResult;
//! use lane_core::templates::TemplateId;
//!
//! let mut sim = Simulation::new(MatchConfig::skirmish()).unwrap();
//! let result = sim.spawn_request(Faction::Player, TemplateId(0)).unwrap();
//! assert!(matches!(result, SpawnResult::Success(_)));
//!
//! let events = sim.tick(Fixed::from_num(0.5)).unwrap();
//! assert_eq!(events.spawned().len(), 1);
//! ```

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use crate::behavior::{step_unit, BehaviorContext};
use crate::combat::{DamageOutcome, Damageable};
use crate::components::EntityId;
use crate::config::MatchConfig;
use crate::error::{GameError, Result};
use crate::events::{SimEvent, TickEvents};
use crate::factions::Faction;
use crate::match_state::{MatchController, MatchState};
use crate::math::{fixed_serde, Fixed, Vec2Fixed};
use crate::registry::{Entity, EntityKind, EntityRegistry};
use crate::spawner::{SpawnResult, Spawner};
use crate::templates::{TemplateId, TemplateRegistry};

/// The lane battle simulation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Simulation {
    /// Ticks completed.
    tick: u64,
    /// Simulated seconds since match start.
    #[serde(with = "fixed_serde")]
    clock: Fixed,
    /// Configuration the match was built from.
    config: MatchConfig,
    /// Spawnable templates.
    templates: TemplateRegistry,
    /// All live entities.
    registry: EntityRegistry,
    /// One spawner per faction, in [`Faction::ALL`] order.
    spawners: Vec<Spawner>,
    /// Outcome tracking.
    match_controller: MatchController,
    /// Events raised between ticks, delivered with the next tick.
    pending_events: Vec<SimEvent>,
}

impl Simulation {
    /// Build a simulation from a match configuration.
    ///
    /// # Errors
    ///
    /// Fails if the configuration does not validate.
    pub fn new(config: MatchConfig) -> Result<Self> {
        config.validate()?;
        let templates = TemplateRegistry::from_templates(config.templates.iter().cloned())?;

        let mut registry = EntityRegistry::new();
        for faction in Faction::ALL {
            if let Some(base) = &config.faction(faction).base {
                registry.register(Entity::base(faction, base.position, base.max_health));
            }
        }

        let spawners = Faction::ALL
            .iter()
            .map(|&faction| Spawner::new(faction, config.faction(faction), config.seed))
            .collect();

        tracing::debug!(name = %config.name, seed = config.seed, "Simulation created");
        Ok(Self {
            tick: 0,
            clock: Fixed::ZERO,
            match_controller: MatchController::new(config.observer, config.restart_delay),
            templates,
            registry,
            spawners,
            pending_events: Vec::new(),
            config,
        })
    }

    /// Current tick number.
    #[must_use]
    pub const fn get_tick(&self) -> u64 {
        self.tick
    }

    /// Simulated seconds since match start.
    #[must_use]
    pub const fn clock(&self) -> Fixed {
        self.clock
    }

    /// Get a reference to the entity registry.
    #[must_use]
    pub fn registry(&self) -> &EntityRegistry {
        &self.registry
    }

    /// Spawnable templates.
    #[must_use]
    pub fn templates(&self) -> &TemplateRegistry {
        &self.templates
    }

    /// Configuration the match was built from.
    #[must_use]
    pub fn config(&self) -> &MatchConfig {
        &self.config
    }

    /// Current match state.
    #[must_use]
    pub const fn match_state(&self) -> MatchState {
        self.match_controller.state()
    }

    /// Seconds left before restart is accepted, once the match has ended.
    #[must_use]
    pub fn restart_remaining(&self) -> Option<Fixed> {
        self.match_controller.restart_remaining(self.clock)
    }

    /// Money held by a faction.
    #[must_use]
    pub fn money(&self, faction: Faction) -> i32 {
        self.spawner(faction).purse().money
    }

    fn spawner(&self, faction: Faction) -> &Spawner {
        &self.spawners[faction.index()]
    }

    /// Advance the simulation by `dt` simulated seconds.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::InvalidArgument`] for a negative `dt`, or one
    /// that would push the clock past [`Fixed::MAX`]. The simulation is left
    /// untouched in both cases.
    pub fn tick(&mut self, dt: Fixed) -> Result<TickEvents> {
        if dt < Fixed::ZERO {
            return Err(GameError::InvalidArgument(format!(
                "tick dt must be non-negative, got {dt}"
            )));
        }
        let clock = self.clock.checked_add(dt).ok_or_else(|| {
            GameError::InvalidArgument(format!(
                "tick dt {dt} overflows the clock at {}",
                self.clock
            ))
        })?;

        let mut events = std::mem::take(&mut self.pending_events);
        self.clock = clock;

        if self.match_controller.is_active() {
            self.run_spawner_phase(dt, &mut events);
            self.run_unit_phase(dt, &mut events);
            self.registry.flush_removals();
            if let Some(outcome) = self.match_controller.evaluate(&self.registry, self.clock) {
                events.push(SimEvent::MatchEnded { outcome });
            }
        }

        self.tick += 1;

        #[cfg(debug_assertions)]
        {
            let hash = self.state_hash();
            tracing::trace!(tick = self.tick, state_hash = hash, "Simulation state hash");
        }

        Ok(TickEvents {
            tick: self.tick,
            events,
        })
    }

    fn run_spawner_phase(&mut self, dt: Fixed, events: &mut Vec<SimEvent>) {
        for spawner in &mut self.spawners {
            spawner.advance(dt);
            if let Some((id, template)) =
                spawner.auto_spawn(&self.templates, self.clock, &mut self.registry)
            {
                events.push(SimEvent::Spawned {
                    id,
                    faction: spawner.faction(),
                    template,
                });
            }
        }
    }

    fn run_unit_phase(&mut self, dt: Fixed, events: &mut Vec<SimEvent>) {
        let ctx = BehaviorContext {
            now: self.clock,
            dt,
            axis_locked_combat: self.config.axis_locked_combat,
        };

        for id in self.registry.sorted_ids() {
            // Units killed earlier this tick are skipped.
            let Some(mut entity) = self
                .registry
                .get_live(id)
                .filter(|entity| !entity.is_base())
                .cloned()
            else {
                continue;
            };
            let before = entity.as_unit().map(|unit| unit.state);

            let intent = step_unit(&mut entity, &self.registry, &ctx);

            let after = entity.as_unit().map(|unit| unit.state);
            if let (Some(from), Some(to)) = (before, after) {
                if from != to {
                    tracing::debug!(entity = id, from = from.as_str(), to = to.as_str(), "Unit state changed");
                    events.push(SimEvent::UnitStateChanged { id, from, to });
                }
            }
            if let Some(slot) = self.registry.get_mut(id) {
                *slot = entity;
            }

            if let Some(intent) = intent {
                if let Err(err) = self.resolve_damage(intent.target, intent.damage, events) {
                    tracing::warn!(attacker = intent.attacker, target = intent.target, %err, "Attack dropped");
                }
            }
        }
    }

    /// Apply damage to an entity, recording the resulting events.
    fn resolve_damage(
        &mut self,
        target: EntityId,
        amount: Fixed,
        events: &mut Vec<SimEvent>,
    ) -> Result<DamageOutcome> {
        let entity = self
            .registry
            .get_mut(target)
            .ok_or(GameError::EntityNotFound(target))?;
        let outcome = entity.kind.take_damage(amount)?;
        let faction = entity.faction;
        let is_base = matches!(entity.kind, EntityKind::Base(_));

        match outcome {
            DamageOutcome::Ignored => {}
            DamageOutcome::Damaged { remaining } => {
                tracing::trace!(entity = target, amount = %amount, remaining = %remaining, "Damaged");
                events.push(SimEvent::Damaged {
                    id: target,
                    amount,
                    remaining,
                });
            }
            DamageOutcome::Killed => {
                tracing::debug!(entity = target, faction = %faction, "Entity died");
                events.push(SimEvent::Death { id: target });
                if is_base {
                    tracing::info!(faction = %faction, "Base destroyed");
                    events.push(SimEvent::BaseDestroyed { faction });
                    self.match_controller.on_base_destroyed(faction);
                }
                self.registry.unregister(target)?;
            }
        }
        Ok(outcome)
    }

    /// Apply damage to an entity from outside the tick loop.
    ///
    /// Resulting events are delivered with the next tick.
    ///
    /// # Errors
    ///
    /// Fails for a negative amount or an unknown entity, and with
    /// [`GameError::AlreadyTerminal`] once the match has ended.
    pub fn apply_damage(&mut self, target: EntityId, amount: Fixed) -> Result<DamageOutcome> {
        if !self.match_controller.is_active() {
            return Err(GameError::AlreadyTerminal(format!(
                "damage applied after the match ended ({})",
                self.match_state().as_str()
            )));
        }
        let mut events = std::mem::take(&mut self.pending_events);
        let result = self.resolve_damage(target, amount, &mut events);
        self.pending_events = events;
        result
    }

    /// Request a paid spawn for `faction`.
    ///
    /// The `Spawned` event is delivered with the next tick.
    ///
    /// # Errors
    ///
    /// [`GameError::AlreadyTerminal`] once the match has ended,
    /// [`GameError::UnknownTemplate`] for an unregistered template.
    pub fn spawn_request(&mut self, faction: Faction, template: TemplateId) -> Result<SpawnResult> {
        if !self.match_controller.is_active() {
            return Err(GameError::AlreadyTerminal(format!(
                "spawn requested after the match ended ({})",
                self.match_state().as_str()
            )));
        }
        let template = self.templates.require(template)?;
        let spawner = &mut self.spawners[faction.index()];
        let result = spawner.try_spawn(template, self.clock, &mut self.registry);
        if let SpawnResult::Success(id) = result {
            self.pending_events.push(SimEvent::Spawned {
                id,
                faction,
                template: template.id,
            });
        }
        Ok(result)
    }

    /// Look a template up by key and request a spawn of it.
    ///
    /// # Errors
    ///
    /// See [`Self::spawn_request`]; unknown keys give
    /// [`GameError::UnknownTemplate`].
    pub fn spawn_request_by_key(&mut self, faction: Faction, key: &str) -> Result<SpawnResult> {
        let id = self
            .templates
            .find_by_key(key)
            .map(|template| template.id)
            .ok_or_else(|| GameError::UnknownTemplate(key.to_string()))?;
        self.spawn_request(faction, id)
    }

    /// Place an additional base for `faction`.
    pub fn register_base(
        &mut self,
        faction: Faction,
        position: Vec2Fixed,
        max_health: Fixed,
    ) -> EntityId {
        self.registry
            .register(Entity::base(faction, position, max_health))
    }

    /// Reset the match to its starting configuration.
    ///
    /// # Errors
    ///
    /// [`GameError::AlreadyTerminal`] while the match is active,
    /// [`GameError::RestartPending`] before the restart delay has elapsed.
    pub fn restart(&mut self) -> Result<()> {
        self.match_controller.check_restart(self.clock)?;
        let mut fresh = Self::new(self.config.clone())?;
        fresh.pending_events.push(SimEvent::MatchRestarted);
        *self = fresh;
        tracing::info!(name = %self.config.name, "Match restarted");
        Ok(())
    }

    /// Compute a hash of the current simulation state.
    ///
    /// Two simulations fed identical inputs report identical hashes.
    #[must_use]
    pub fn state_hash(&self) -> u64 {
        let mut hasher = DefaultHasher::new();

        self.tick.hash(&mut hasher);
        self.clock.to_bits().hash(&mut hasher);
        self.match_controller.state().hash(&mut hasher);

        for spawner in &self.spawners {
            spawner.purse().money.hash(&mut hasher);
        }

        let ids = self.registry.sorted_ids();
        ids.len().hash(&mut hasher);
        for id in ids {
            let Some(entity) = self.registry.get(id) else {
                continue;
            };
            id.hash(&mut hasher);
            entity.faction.hash(&mut hasher);
            entity.position.hash(&mut hasher);
            entity.health().current.to_bits().hash(&mut hasher);
            if let Some(unit) = entity.as_unit() {
                unit.state.hash(&mut hasher);
                unit.combat_target.hash(&mut hasher);
                unit.last_attack.map(Fixed::to_bits).hash(&mut hasher);
            }
        }

        hasher.finish()
    }

    /// Serialize simulation state to bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn serialize(&self) -> Result<Vec<u8>> {
        bincode::serialize(self)
            .map_err(|e| GameError::InvalidState(format!("Failed to serialize simulation: {e}")))
    }

    /// Deserialize simulation state from bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if deserialization fails.
    pub fn deserialize(data: &[u8]) -> Result<Self> {
        bincode::deserialize(data).map_err(|e| {
            GameError::InvalidState(format!("Failed to deserialize simulation: {e}"))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::UnitState;
    use crate::config::SpawnerMode;

    fn fx(value: f64) -> Fixed {
        Fixed::from_num(value)
    }

    fn manual_config() -> MatchConfig {
        let mut config = MatchConfig::skirmish();
        config.enemy.spawner = SpawnerMode::Manual;
        config.enemy.starting_money = 1000;
        config
    }

    #[test]
    fn test_new_places_bases() {
        let sim = Simulation::new(MatchConfig::skirmish()).unwrap();
        assert_eq!(sim.registry().len(), 2);
        assert!(sim.registry().base_of(Faction::Player).is_some());
        assert!(sim.registry().base_of(Faction::Enemy).is_some());
        assert_eq!(sim.match_state(), MatchState::Active);
    }

    #[test]
    fn test_negative_dt_rejected() {
        let mut sim = Simulation::new(MatchConfig::skirmish()).unwrap();
        assert!(matches!(
            sim.tick(fx(-0.5)),
            Err(GameError::InvalidArgument(_))
        ));
        assert_eq!(sim.get_tick(), 0);
    }

    #[test]
    fn test_clock_overflow_rejected() {
        let mut sim = Simulation::new(manual_config()).unwrap();
        sim.spawn_request(Faction::Player, TemplateId(0)).unwrap();
        let huge = fx(2_000_000_000.0);
        sim.tick(huge).unwrap();
        let before = sim.state_hash();

        assert!(matches!(sim.tick(huge), Err(GameError::InvalidArgument(_))));
        assert_eq!(sim.get_tick(), 1);
        assert_eq!(sim.clock(), huge);
        assert_eq!(sim.state_hash(), before);

        sim.tick(fx(0.25)).unwrap();
        assert_eq!(sim.get_tick(), 2);
    }

    #[test]
    fn test_damage_rejected_after_match_end() {
        let mut sim = Simulation::new(manual_config()).unwrap();
        let player_base = sim.registry().base_of(Faction::Player).unwrap();
        let enemy_base = sim.registry().base_of(Faction::Enemy).unwrap();
        sim.apply_damage(enemy_base, fx(10.0)).unwrap();
        sim.tick(fx(0.5)).unwrap();
        assert_eq!(sim.match_state(), MatchState::Won);

        assert!(matches!(
            sim.apply_damage(player_base, fx(10.0)),
            Err(GameError::AlreadyTerminal(_))
        ));
        assert_eq!(
            sim.registry().get(player_base).unwrap().health().current,
            fx(10.0)
        );
        assert!(sim.tick(fx(0.5)).unwrap().events.is_empty());
    }

    #[test]
    fn test_spawn_event_delivered_next_tick() {
        let mut sim = Simulation::new(manual_config()).unwrap();
        let SpawnResult::Success(id) = sim.spawn_request(Faction::Player, TemplateId(0)).unwrap()
        else {
            panic!("spawn failed");
        };
        let events = sim.tick(fx(0.5)).unwrap();
        assert_eq!(events.spawned(), vec![id]);
        assert_eq!(sim.money(Faction::Player), 925);
    }

    #[test]
    fn test_unknown_template_rejected() {
        let mut sim = Simulation::new(manual_config()).unwrap();
        assert!(matches!(
            sim.spawn_request(Faction::Player, TemplateId(99)),
            Err(GameError::UnknownTemplate(_))
        ));
        assert!(matches!(
            sim.spawn_request_by_key(Faction::Player, "dog"),
            Err(GameError::UnknownTemplate(_))
        ));
    }

    #[test]
    fn test_apply_damage_unknown_and_negative() {
        let mut sim = Simulation::new(manual_config()).unwrap();
        assert!(matches!(
            sim.apply_damage(999, fx(1.0)),
            Err(GameError::EntityNotFound(999))
        ));
        let base = sim.registry().base_of(Faction::Enemy).unwrap();
        assert!(matches!(
            sim.apply_damage(base, fx(-1.0)),
            Err(GameError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_units_march_toward_enemy_base() {
        let mut sim = Simulation::new(manual_config()).unwrap();
        let SpawnResult::Success(id) = sim.spawn_request(Faction::Player, TemplateId(0)).unwrap()
        else {
            panic!("spawn failed");
        };
        let start = sim.registry().get(id).unwrap().position;
        sim.tick(fx(0.5)).unwrap();
        let after = sim.registry().get(id).unwrap().position;
        // basic cat speed 3
        assert_eq!(after.x - start.x, fx(1.5));
        assert_eq!(after.y, start.y);
    }

    #[test]
    fn test_restart_requires_terminal_state() {
        let mut sim = Simulation::new(manual_config()).unwrap();
        assert!(matches!(sim.restart(), Err(GameError::AlreadyTerminal(_))));
    }

    #[test]
    fn test_restart_after_delay_resets_match() {
        let mut sim = Simulation::new(manual_config()).unwrap();
        sim.spawn_request(Faction::Player, TemplateId(0)).unwrap();
        let base = sim.registry().base_of(Faction::Enemy).unwrap();
        sim.apply_damage(base, fx(10.0)).unwrap();
        let events = sim.tick(fx(1.0)).unwrap();
        assert_eq!(events.match_outcome(), Some(MatchState::Won));

        sim.tick(fx(1.0)).unwrap();
        assert!(matches!(
            sim.restart(),
            Err(GameError::RestartPending { .. })
        ));
        sim.tick(fx(2.0)).unwrap();
        sim.restart().unwrap();

        assert_eq!(sim.match_state(), MatchState::Active);
        assert_eq!(sim.get_tick(), 0);
        assert_eq!(sim.money(Faction::Player), 1000);
        assert_eq!(sim.registry().len(), 2);
        let events = sim.tick(fx(0.5)).unwrap();
        assert_eq!(events.events.first(), Some(&SimEvent::MatchRestarted));
    }

    #[test]
    fn test_state_change_events() {
        let mut sim = Simulation::new(manual_config()).unwrap();
        sim.spawn_request(Faction::Player, TemplateId(0)).unwrap();
        let player_base = sim.registry().base_of(Faction::Player).unwrap();
        // Remove the enemy base: the unit has nothing to march on.
        let enemy_base = sim.registry().base_of(Faction::Enemy).unwrap();
        sim.apply_damage(enemy_base, fx(10.0)).unwrap();
        let events = sim.tick(fx(0.5)).unwrap();

        assert!(events.events.iter().any(|event| matches!(
            event,
            SimEvent::UnitStateChanged {
                to: UnitState::Idle,
                ..
            }
        )));
        assert!(sim.registry().get(player_base).is_some());
    }

    #[test]
    fn test_snapshot_round_trip_preserves_hash() {
        let mut sim = Simulation::new(MatchConfig::skirmish()).unwrap();
        sim.spawn_request(Faction::Player, TemplateId(1)).unwrap();
        for _ in 0..30 {
            sim.tick(fx(0.25)).unwrap();
        }
        let bytes = sim.serialize().unwrap();
        let mut restored = Simulation::deserialize(&bytes).unwrap();
        assert_eq!(sim.state_hash(), restored.state_hash());

        sim.tick(fx(0.25)).unwrap();
        restored.tick(fx(0.25)).unwrap();
        assert_eq!(sim.state_hash(), restored.state_hash());
    }
}
