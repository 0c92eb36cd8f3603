//! Unit spawning with cost and cooldown gating.
//!
//! Each faction owns one [`Spawner`]. Manual spawns are gated by the
//! faction's [`Purse`] and by a per-template cooldown, checked in that order.
//! Automatic spawners additionally fire on a fixed interval without paying,
//! picking from their roster with a seeded generator.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::components::EntityId;
use crate::config::{FactionSetup, SpawnerMode};
use crate::economy::Purse;
use crate::factions::Faction;
use crate::math::{fixed_serde, Fixed, Vec2Fixed};
use crate::registry::{Entity, EntityRegistry, Unit};
use crate::templates::{TemplateId, TemplateRegistry, UnitTemplate};

/// Outcome of a spawn attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SpawnResult {
    /// The unit was created with this id.
    Success(EntityId),
    /// The purse does not cover the template cost.
    InsufficientFunds,
    /// The template was spawned too recently.
    OnCooldown,
}

/// Deterministic generator for automatic spawn choices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpawnRng {
    state: u64,
}

impl SpawnRng {
    /// Create a generator from a seed.
    #[must_use]
    pub const fn new(seed: u64) -> Self {
        Self {
            state: seed.wrapping_add(0x9E37_79B9_7F4A_7C15),
        }
    }

    fn next(&mut self) -> u64 {
        self.state = self.state.wrapping_mul(0x5_DEEC_E66D).wrapping_add(11);
        self.state
    }

    /// Uniform index in `0..len`. Returns 0 for an empty range.
    pub fn next_index(&mut self, len: usize) -> usize {
        if len == 0 {
            return 0;
        }
        // Low LCG bits have short periods; use the high ones.
        let high = self.next() >> 33;
        usize::try_from(high % len as u64).unwrap_or(0)
    }

    /// Uniform value in `[-1, 1)`.
    pub fn next_signed_unit(&mut self) -> Fixed {
        let bits = i64::try_from(self.next() >> 32).unwrap_or(0);
        let unit = Fixed::from_bits(bits);
        unit * Fixed::from_num(2) - Fixed::ONE
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
struct SpawnStamp(#[serde(with = "fixed_serde")] Fixed);

/// Spawner for one faction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Spawner {
    faction: Faction,
    spawn_point: Vec2Fixed,
    purse: Purse,
    mode: SpawnerMode,
    last_spawn: BTreeMap<TemplateId, SpawnStamp>,
    #[serde(with = "fixed_serde")]
    last_auto_spawn: Fixed,
    rng: SpawnRng,
}

impl Spawner {
    /// Create a spawner from a faction's match setup.
    #[must_use]
    pub fn new(faction: Faction, setup: &FactionSetup, seed: u64) -> Self {
        let salt = (faction.index() as u64).wrapping_mul(0xA076_1D64_78BD_642F);
        Self {
            faction,
            spawn_point: setup.spawn_point,
            purse: Purse::new(setup.starting_money, setup.income_per_second),
            mode: setup.spawner.clone(),
            last_spawn: BTreeMap::new(),
            last_auto_spawn: Fixed::ZERO,
            rng: SpawnRng::new(seed ^ salt),
        }
    }

    /// Faction this spawner creates units for.
    #[must_use]
    pub const fn faction(&self) -> Faction {
        self.faction
    }

    /// The faction's purse.
    #[must_use]
    pub const fn purse(&self) -> &Purse {
        &self.purse
    }

    /// Whether this spawner fires on its own.
    #[must_use]
    pub fn is_automatic(&self) -> bool {
        matches!(self.mode, SpawnerMode::Automatic { .. })
    }

    /// Pay income for `dt` simulated seconds.
    pub fn advance(&mut self, dt: Fixed) -> i32 {
        self.purse.advance(dt)
    }

    /// Whether `template` is still cooling down at `now`.
    #[must_use]
    pub fn on_cooldown(&self, template: &UnitTemplate, now: Fixed) -> bool {
        self.last_spawn
            .get(&template.id)
            .is_some_and(|last| now - last.0 < template.spawn_cooldown)
    }

    /// Attempt a paid spawn of `template` at simulated time `now`.
    ///
    /// Funds are checked before cooldown; a failed attempt changes nothing.
    pub fn try_spawn(
        &mut self,
        template: &UnitTemplate,
        now: Fixed,
        registry: &mut EntityRegistry,
    ) -> SpawnResult {
        if !self.purse.can_afford(template.cost) {
            return SpawnResult::InsufficientFunds;
        }
        if self.on_cooldown(template, now) {
            return SpawnResult::OnCooldown;
        }

        self.purse.spend(template.cost);
        self.last_spawn.insert(template.id, SpawnStamp(now));
        let id = self.place(template, self.spawn_point, registry);
        tracing::debug!(
            faction = %self.faction,
            template = %template.key,
            entity = id,
            money = self.purse.money,
            "Spawned unit"
        );
        SpawnResult::Success(id)
    }

    /// Fire the automatic spawner if its interval has elapsed at `now`.
    ///
    /// Returns the new entity and its template, or `None` when nothing was
    /// spawned (manual mode, interval not elapsed, or empty roster).
    pub fn auto_spawn(
        &mut self,
        templates: &TemplateRegistry,
        now: Fixed,
        registry: &mut EntityRegistry,
    ) -> Option<(EntityId, TemplateId)> {
        let SpawnerMode::Automatic {
            interval,
            roster,
            lane_jitter,
        } = &self.mode
        else {
            return None;
        };
        if now - self.last_auto_spawn < *interval || roster.is_empty() {
            return None;
        }
        self.last_auto_spawn = now;

        let pick = roster[self.rng.next_index(roster.len())];
        let offset = self.rng.next_signed_unit() * *lane_jitter;
        let Some(template) = templates.get(pick) else {
            tracing::warn!(faction = %self.faction, template = pick.0, "Roster names an unknown template");
            return None;
        };
        let position = self.spawn_point + Vec2Fixed::new(Fixed::ZERO, offset);
        let id = self.place(template, position, registry);
        tracing::debug!(
            faction = %self.faction,
            template = %template.key,
            entity = id,
            "Automatic spawn"
        );
        Some((id, template.id))
    }

    fn place(
        &self,
        template: &UnitTemplate,
        position: Vec2Fixed,
        registry: &mut EntityRegistry,
    ) -> EntityId {
        let unit = Unit::new(template.id, template.stats);
        registry.register(Entity::unit(self.faction, position, unit))
    }
}
