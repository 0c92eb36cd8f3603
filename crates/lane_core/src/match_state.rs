//! Victory and defeat detection.
//!
//! A faction loses when its base is destroyed or when it is eliminated: it
//! fielded at least one entity this match and has none left. Outcomes are
//! reported from the observer's perspective. If both sides lose in the same
//! evaluation, the observer's loss takes precedence.

use serde::{Deserialize, Serialize};

use crate::error::{GameError, Result};
use crate::factions::Faction;
use crate::math::{fixed_serde, option_fixed_serde, Fixed};
use crate::registry::EntityRegistry;

/// State of the match from the observer's perspective.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum MatchState {
    /// Match in progress.
    #[default]
    Active,
    /// The observer won.
    Won,
    /// The observer lost.
    Lost,
}

impl MatchState {
    /// Whether the match has finished.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        !matches!(self, Self::Active)
    }

    /// Snake-case name used in logs and protocol output.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Won => "won",
            Self::Lost => "lost",
        }
    }
}

/// Tracks the match outcome and gates restart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchController {
    observer: Faction,
    state: MatchState,
    #[serde(with = "fixed_serde")]
    restart_delay: Fixed,
    #[serde(with = "option_fixed_serde")]
    ended_at: Option<Fixed>,
    destroyed_bases: [bool; 2],
    fielded: [bool; 2],
}

impl MatchController {
    /// Create an active controller.
    #[must_use]
    pub const fn new(observer: Faction, restart_delay: Fixed) -> Self {
        Self {
            observer,
            state: MatchState::Active,
            restart_delay,
            ended_at: None,
            destroyed_bases: [false; 2],
            fielded: [false; 2],
        }
    }

    /// Current state.
    #[must_use]
    pub const fn state(&self) -> MatchState {
        self.state
    }

    /// Whether per-unit updates should run.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        matches!(self.state, MatchState::Active)
    }

    /// Faction outcomes are reported for.
    #[must_use]
    pub const fn observer(&self) -> Faction {
        self.observer
    }

    /// Record that `faction`'s base was destroyed.
    pub fn on_base_destroyed(&mut self, faction: Faction) {
        self.destroyed_bases[faction.index()] = true;
    }

    /// Decide whether the match ended.
    ///
    /// Returns the new terminal state on the evaluation that ends the match
    /// and `None` otherwise, so the end is reported once.
    pub fn evaluate(&mut self, registry: &EntityRegistry, now: Fixed) -> Option<MatchState> {
        if !self.is_active() {
            return None;
        }

        let mut defeated = [false; 2];
        for faction in Faction::ALL {
            let idx = faction.index();
            let live = registry.live_count(faction);
            if live > 0 {
                self.fielded[idx] = true;
            }
            let eliminated = self.fielded[idx] && live == 0;
            defeated[idx] = self.destroyed_bases[idx] || eliminated;
        }

        let outcome = if defeated[self.observer.index()] {
            MatchState::Lost
        } else if defeated[self.observer.opponent().index()] {
            MatchState::Won
        } else {
            return None;
        };

        self.state = outcome;
        self.ended_at = Some(now);
        tracing::info!(outcome = outcome.as_str(), at = %now, "Match ended");
        Some(outcome)
    }

    /// Seconds left before restart is accepted, if the match has ended.
    #[must_use]
    pub fn restart_remaining(&self, now: Fixed) -> Option<Fixed> {
        self.ended_at
            .map(|ended| (self.restart_delay - (now - ended)).max(Fixed::ZERO))
    }

    /// Check whether a restart may happen at `now`.
    ///
    /// # Errors
    ///
    /// [`GameError::AlreadyTerminal`] while the match is still active,
    /// [`GameError::RestartPending`] before the restart delay has elapsed.
    pub fn check_restart(&self, now: Fixed) -> Result<()> {
        match self.restart_remaining(now) {
            None => Err(GameError::AlreadyTerminal(
                "restart requested while the match is active".to_string(),
            )),
            Some(remaining) if remaining > Fixed::ZERO => {
                Err(GameError::RestartPending { remaining })
            }
            Some(_) => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::Vec2Fixed;
    use crate::registry::Entity;

    fn registry_with_bases() -> EntityRegistry {
        let mut registry = EntityRegistry::new();
        for faction in Faction::ALL {
            registry.register(Entity::base(faction, Vec2Fixed::ZERO, Fixed::from_num(10)));
        }
        registry
    }

    #[test]
    fn test_active_while_both_bases_stand() {
        let registry = registry_with_bases();
        let mut controller = MatchController::new(Faction::Player, Fixed::from_num(3));
        assert_eq!(controller.evaluate(&registry, Fixed::ZERO), None);
        assert!(controller.is_active());
    }

    #[test]
    fn test_enemy_base_destroyed_wins() {
        let registry = registry_with_bases();
        let mut controller = MatchController::new(Faction::Player, Fixed::from_num(3));
        controller.on_base_destroyed(Faction::Enemy);
        assert_eq!(controller.evaluate(&registry, Fixed::ONE), Some(MatchState::Won));
        assert_eq!(controller.evaluate(&registry, Fixed::ONE), None);
        assert_eq!(controller.state(), MatchState::Won);
    }

    #[test]
    fn test_simultaneous_loss_prefers_defeat() {
        let registry = registry_with_bases();
        let mut controller = MatchController::new(Faction::Player, Fixed::from_num(3));
        controller.on_base_destroyed(Faction::Enemy);
        controller.on_base_destroyed(Faction::Player);
        assert_eq!(controller.evaluate(&registry, Fixed::ONE), Some(MatchState::Lost));
    }

    #[test]
    fn test_elimination_requires_fielding() {
        let mut registry = EntityRegistry::new();
        let mut controller = MatchController::new(Faction::Player, Fixed::from_num(3));
        assert_eq!(controller.evaluate(&registry, Fixed::ZERO), None);

        let enemy = registry.register(Entity::base(Faction::Enemy, Vec2Fixed::ZERO, Fixed::ONE));
        registry.register(Entity::base(Faction::Player, Vec2Fixed::ZERO, Fixed::ONE));
        assert_eq!(controller.evaluate(&registry, Fixed::ZERO), None);

        registry.unregister(enemy).unwrap();
        registry.flush_removals();
        assert_eq!(controller.evaluate(&registry, Fixed::ONE), Some(MatchState::Won));
    }

    #[test]
    fn test_restart_gating() {
        let registry = registry_with_bases();
        let mut controller = MatchController::new(Faction::Player, Fixed::from_num(3));
        assert!(matches!(
            controller.check_restart(Fixed::ZERO),
            Err(GameError::AlreadyTerminal(_))
        ));

        controller.on_base_destroyed(Faction::Player);
        controller.evaluate(&registry, Fixed::from_num(10));
        match controller.check_restart(Fixed::from_num(11)) {
            Err(GameError::RestartPending { remaining }) => {
                assert_eq!(remaining, Fixed::from_num(2));
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(controller.check_restart(Fixed::from_num(13)).is_ok());
    }
}
