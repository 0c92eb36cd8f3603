//! Faction identifiers.

use serde::{Deserialize, Serialize};

/// The two sides of a lane battle.
///
/// Any live entity of the other faction is hostile. An entity's faction is
/// fixed for its whole lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Faction {
    /// The human-controlled side.
    Player,
    /// The automated opposing side.
    Enemy,
}

impl Faction {
    /// Both factions in a stable order.
    pub const ALL: [Self; 2] = [Self::Player, Self::Enemy];

    /// The faction this one fights against.
    #[must_use]
    pub const fn opponent(self) -> Self {
        match self {
            Self::Player => Self::Enemy,
            Self::Enemy => Self::Player,
        }
    }

    /// Get the short name for this faction.
    #[must_use]
    pub const fn short_name(self) -> &'static str {
        match self {
            Self::Player => "player",
            Self::Enemy => "enemy",
        }
    }

    /// Parse a short name as produced by [`Faction::short_name`].
    #[must_use]
    pub fn from_short_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "player" => Some(Self::Player),
            "enemy" => Some(Self::Enemy),
            _ => None,
        }
    }

    /// Stable index into per-faction arrays.
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::Player => 0,
            Self::Enemy => 1,
        }
    }
}

impl std::fmt::Display for Faction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.short_name())
    }
}
