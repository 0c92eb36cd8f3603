//! Entity registry and spatial queries.
//!
//! The registry owns every unit and base in the match. Other components hold
//! entity ids, never references. Removal is deferred: [`EntityRegistry::unregister`]
//! only marks an entity, and [`EntityRegistry::flush_removals`] drops marked
//! entities at the end of a tick so id snapshots taken earlier stay valid.
//!
//! # Determinism
//!
//! Storage is a `HashMap`, but every ordered view (`sorted_ids`,
//! `query_nearby`, `base_of`) sorts by id before returning.

use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

use crate::combat::Damageable;
use crate::components::{EntityId, Health, UnitState, UnitStats};
use crate::error::{GameError, Result};
use crate::factions::Faction;
use crate::math::{option_fixed_serde, Fixed, Vec2Fixed};
use crate::templates::TemplateId;

/// A mobile combat unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Unit {
    /// Template the unit was spawned from.
    pub template: TemplateId,
    /// Combat and movement tuning.
    pub stats: UnitStats,
    /// Hit points.
    pub health: Health,
    /// Current behavior state.
    pub state: UnitState,
    /// Hostile unit being fought, only set while `InCombat`.
    pub combat_target: Option<EntityId>,
    /// Simulated time of the last attack, `None` before the first one.
    #[serde(with = "option_fixed_serde")]
    pub last_attack: Option<Fixed>,
}

impl Unit {
    /// Create a unit at full health in the initial `MovingToBase` state.
    #[must_use]
    pub fn new(template: TemplateId, stats: UnitStats) -> Self {
        Self {
            template,
            stats,
            health: Health::new(stats.max_health),
            state: UnitState::MovingToBase,
            combat_target: None,
            last_attack: None,
        }
    }

    /// Whether the attack cooldown has elapsed at simulated time `now`.
    #[must_use]
    pub fn attack_ready(&self, now: Fixed) -> bool {
        self.last_attack
            .map_or(true, |last| now - last >= self.stats.attack_cooldown)
    }
}

impl Damageable for Unit {
    fn health(&self) -> &Health {
        &self.health
    }

    fn health_mut(&mut self) -> &mut Health {
        &mut self.health
    }
}

/// A stationary faction base.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Base {
    /// Hit points.
    pub health: Health,
}

impl Base {
    /// Create a base at full health.
    #[must_use]
    pub const fn new(max_health: Fixed) -> Self {
        Self {
            health: Health::new(max_health),
        }
    }
}

impl Damageable for Base {
    fn health(&self) -> &Health {
        &self.health
    }

    fn health_mut(&mut self) -> &mut Health {
        &mut self.health
    }
}

/// What an entity is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntityKind {
    /// A mobile unit.
    Unit(Unit),
    /// A base.
    Base(Base),
}

impl Damageable for EntityKind {
    fn health(&self) -> &Health {
        match self {
            Self::Unit(unit) => unit.health(),
            Self::Base(base) => base.health(),
        }
    }

    fn health_mut(&mut self) -> &mut Health {
        match self {
            Self::Unit(unit) => unit.health_mut(),
            Self::Base(base) => base.health_mut(),
        }
    }
}

/// A registered combat entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entity {
    /// Unique identifier, assigned by the registry.
    pub id: EntityId,
    /// Owning side. Never changes.
    pub faction: Faction,
    /// World position.
    pub position: Vec2Fixed,
    /// Unit or base data.
    pub kind: EntityKind,
}

impl Entity {
    /// Build an unregistered unit entity. The id is assigned on registration.
    #[must_use]
    pub fn unit(faction: Faction, position: Vec2Fixed, unit: Unit) -> Self {
        Self {
            id: 0,
            faction,
            position,
            kind: EntityKind::Unit(unit),
        }
    }

    /// Build an unregistered base entity. The id is assigned on registration.
    #[must_use]
    pub fn base(faction: Faction, position: Vec2Fixed, max_health: Fixed) -> Self {
        Self {
            id: 0,
            faction,
            position,
            kind: EntityKind::Base(Base::new(max_health)),
        }
    }

    /// Whether health is above zero.
    #[must_use]
    pub fn is_alive(&self) -> bool {
        self.kind.is_alive()
    }

    /// Current health.
    #[must_use]
    pub fn health(&self) -> &Health {
        self.kind.health()
    }

    /// Unit data, if this is a unit.
    #[must_use]
    pub fn as_unit(&self) -> Option<&Unit> {
        match &self.kind {
            EntityKind::Unit(unit) => Some(unit),
            EntityKind::Base(_) => None,
        }
    }

    /// Mutable unit data, if this is a unit.
    pub fn as_unit_mut(&mut self) -> Option<&mut Unit> {
        match &mut self.kind {
            EntityKind::Unit(unit) => Some(unit),
            EntityKind::Base(_) => None,
        }
    }

    /// Whether this is a base.
    #[must_use]
    pub fn is_base(&self) -> bool {
        matches!(self.kind, EntityKind::Base(_))
    }
}

/// Which factions a spatial query should return.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FactionFilter {
    /// Entities of every faction.
    Any,
    /// Entities of exactly this faction.
    Only(Faction),
}

impl FactionFilter {
    /// Entities hostile to `faction`.
    #[must_use]
    pub const fn hostile_to(faction: Faction) -> Self {
        Self::Only(faction.opponent())
    }

    fn matches(self, faction: Faction) -> bool {
        match self {
            Self::Any => true,
            Self::Only(wanted) => wanted == faction,
        }
    }
}

/// Storage for all entities in the match.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityRegistry {
    /// Map of entity ID to entity data.
    entities: HashMap<EntityId, Entity>,
    /// Next entity ID to assign.
    next_id: EntityId,
    /// Entities marked for removal at end of tick.
    pending_removal: BTreeSet<EntityId>,
}

impl EntityRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entities: HashMap::new(),
            next_id: 1,
            pending_removal: BTreeSet::new(),
        }
    }

    /// Register an entity and return its newly assigned ID.
    pub fn register(&mut self, mut entity: Entity) -> EntityId {
        let id = self.next_id;
        self.next_id += 1;
        entity.id = id;
        self.entities.insert(id, entity);
        id
    }

    /// Mark an entity for removal at the end of the current tick.
    ///
    /// Marking the same entity twice is harmless.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::EntityNotFound`] for an unknown id.
    pub fn unregister(&mut self, id: EntityId) -> Result<()> {
        if !self.entities.contains_key(&id) {
            return Err(GameError::EntityNotFound(id));
        }
        self.pending_removal.insert(id);
        Ok(())
    }

    /// Physically remove every entity marked by [`Self::unregister`].
    ///
    /// Returns removed ids in ascending order.
    pub fn flush_removals(&mut self) -> Vec<EntityId> {
        let removed: Vec<EntityId> = std::mem::take(&mut self.pending_removal)
            .into_iter()
            .collect();
        for id in &removed {
            self.entities.remove(id);
        }
        removed
    }

    /// Get an entity by ID, including entities pending removal.
    #[must_use]
    pub fn get(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(&id)
    }

    /// Get a mutable reference to an entity by ID.
    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.entities.get_mut(&id)
    }

    /// Check if an entity is stored (pending removal included).
    #[must_use]
    pub fn contains(&self, id: EntityId) -> bool {
        self.entities.contains_key(&id)
    }

    /// Whether an entity is stored and not marked for removal.
    #[must_use]
    pub fn is_registered(&self, id: EntityId) -> bool {
        self.contains(id) && !self.pending_removal.contains(&id)
    }

    /// Get a registered, living entity.
    #[must_use]
    pub fn get_live(&self, id: EntityId) -> Option<&Entity> {
        self.get(id)
            .filter(|entity| entity.is_alive() && !self.pending_removal.contains(&id))
    }

    /// Get the number of stored entities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Check if the registry is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Get sorted entity IDs for deterministic iteration.
    #[must_use]
    pub fn sorted_ids(&self) -> Vec<EntityId> {
        let mut ids: Vec<_> = self.entities.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Iterate living, registered entities in ascending id order.
    pub fn iter_live(&self) -> impl Iterator<Item = &Entity> + '_ {
        self.sorted_ids()
            .into_iter()
            .filter_map(move |id| self.get_live(id))
    }

    /// Live entities within `radius` of `position` matching `filter`.
    ///
    /// Ordered by ascending distance; equal distances fall back to ascending
    /// id, which is registration order.
    #[must_use]
    pub fn query_nearby(
        &self,
        position: Vec2Fixed,
        radius: Fixed,
        filter: FactionFilter,
    ) -> Vec<EntityId> {
        if radius < Fixed::ZERO {
            return Vec::new();
        }
        let mut hits: Vec<(Fixed, EntityId)> = self
            .iter_live()
            .filter(|entity| filter.matches(entity.faction))
            .filter(|entity| position.within(entity.position, radius))
            .map(|entity| (position.distance_squared(entity.position), entity.id))
            .collect();
        hits.sort_unstable();
        hits.into_iter().map(|(_, id)| id).collect()
    }

    /// The nearest live hostile unit within `radius`.
    ///
    /// Bases are not engaged as combat targets; units reach them through
    /// the base assault state instead.
    #[must_use]
    pub fn nearest_hostile_unit(
        &self,
        position: Vec2Fixed,
        radius: Fixed,
        faction: Faction,
    ) -> Option<EntityId> {
        self.query_nearby(position, radius, FactionFilter::hostile_to(faction))
            .into_iter()
            .find(|id| self.get(*id).is_some_and(|e| !e.is_base()))
    }

    /// The live base of `faction` with the lowest id, if any.
    #[must_use]
    pub fn base_of(&self, faction: Faction) -> Option<EntityId> {
        self.iter_live()
            .find(|entity| entity.faction == faction && entity.is_base())
            .map(|entity| entity.id)
    }

    /// Number of live, registered entities belonging to `faction`.
    #[must_use]
    pub fn live_count(&self, faction: Faction) -> usize {
        self.iter_live()
            .filter(|entity| entity.faction == faction)
            .count()
    }
}

impl Default for EntityRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pos(x: i32, y: i32) -> Vec2Fixed {
        Vec2Fixed::new(Fixed::from_num(x), Fixed::from_num(y))
    }

    fn unit_at(faction: Faction, x: i32) -> Entity {
        Entity::unit(faction, pos(x, 0), Unit::new(TemplateId(0), UnitStats::default()))
    }

    #[test]
    fn test_register_assigns_unique_ids() {
        let mut registry = EntityRegistry::new();
        let a = registry.register(unit_at(Faction::Player, 0));
        let b = registry.register(unit_at(Faction::Player, 0));
        assert_ne!(a, b);
        assert_eq!(registry.get(a).unwrap().id, a);
        assert_eq!(registry.sorted_ids(), vec![a, b]);
    }

    #[test]
    fn test_unregister_is_deferred() {
        let mut registry = EntityRegistry::new();
        let id = registry.register(unit_at(Faction::Enemy, 0));
        registry.unregister(id).unwrap();

        assert!(registry.contains(id));
        assert!(!registry.is_registered(id));
        assert!(registry
            .query_nearby(pos(0, 0), Fixed::from_num(5), FactionFilter::Any)
            .is_empty());

        assert_eq!(registry.flush_removals(), vec![id]);
        assert!(registry.get(id).is_none());
        assert!(registry.flush_removals().is_empty());
    }

    #[test]
    fn test_unregister_unknown_id() {
        let mut registry = EntityRegistry::new();
        assert!(matches!(
            registry.unregister(42),
            Err(GameError::EntityNotFound(42))
        ));
    }

    #[test]
    fn test_query_nearby_orders_by_distance_then_id() {
        let mut registry = EntityRegistry::new();
        let far = registry.register(unit_at(Faction::Enemy, 3));
        let near_a = registry.register(unit_at(Faction::Enemy, 1));
        let near_b = registry.register(unit_at(Faction::Enemy, -1));
        let _friendly = registry.register(unit_at(Faction::Player, 0));

        let hits = registry.query_nearby(
            pos(0, 0),
            Fixed::from_num(5),
            FactionFilter::Only(Faction::Enemy),
        );
        assert_eq!(hits, vec![near_a, near_b, far]);
    }

    #[test]
    fn test_query_nearby_radius_is_inclusive() {
        let mut registry = EntityRegistry::new();
        let edge = registry.register(unit_at(Faction::Enemy, 2));
        let _outside = registry.register(unit_at(Faction::Enemy, 3));

        let hits = registry.query_nearby(pos(0, 0), Fixed::from_num(2), FactionFilter::Any);
        assert_eq!(hits, vec![edge]);
    }

    #[test]
    fn test_query_nearby_huge_radius() {
        let mut registry = EntityRegistry::new();
        let near = registry.register(unit_at(Faction::Enemy, 1));
        let far = registry.register(unit_at(Faction::Enemy, 50_000));

        let hits = registry.query_nearby(pos(0, 0), Fixed::from_num(100_000), FactionFilter::Any);
        assert_eq!(hits, vec![near, far]);
        let hits = registry.query_nearby(pos(-50_000, 0), Fixed::from_num(10), FactionFilter::Any);
        assert!(hits.is_empty());
    }

    #[test]
    fn test_query_skips_dead() {
        let mut registry = EntityRegistry::new();
        let id = registry.register(unit_at(Faction::Enemy, 0));
        registry
            .get_mut(id)
            .unwrap()
            .kind
            .take_damage(Fixed::from_num(100))
            .unwrap();
        assert!(registry
            .nearest_hostile_unit(pos(0, 0), Fixed::ONE, Faction::Player)
            .is_none());
        assert_eq!(registry.live_count(Faction::Enemy), 0);
    }

    #[test]
    fn test_base_of_and_live_count() {
        let mut registry = EntityRegistry::new();
        assert!(registry.base_of(Faction::Enemy).is_none());

        let base = registry.register(Entity::base(Faction::Enemy, pos(10, 0), Fixed::from_num(10)));
        registry.register(unit_at(Faction::Enemy, 9));
        registry.register(unit_at(Faction::Player, 0));

        assert_eq!(registry.base_of(Faction::Enemy), Some(base));
        assert_eq!(registry.base_of(Faction::Player), None);
        assert_eq!(registry.live_count(Faction::Enemy), 2);
        assert_eq!(registry.live_count(Faction::Player), 1);
    }

    #[test]
    fn test_nearest_hostile_unit_skips_bases() {
        let mut registry = EntityRegistry::new();
        registry.register(Entity::base(Faction::Enemy, pos(0, 0), Fixed::from_num(10)));
        let unit = registry.register(unit_at(Faction::Enemy, 1));
        assert_eq!(
            registry.nearest_hostile_unit(pos(0, 0), Fixed::from_num(2), Faction::Player),
            Some(unit)
        );
    }

    #[test]
    fn test_attack_ready_first_attack_immediate() {
        let mut unit = Unit::new(TemplateId(0), UnitStats::default());
        assert!(unit.attack_ready(Fixed::ZERO));
        unit.last_attack = Some(Fixed::from_num(2));
        assert!(!unit.attack_ready(Fixed::from_num(2.5)));
        assert!(unit.attack_ready(Fixed::from_num(3)));
    }
}
