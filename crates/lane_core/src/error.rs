//! Error types for the lane simulation.

use thiserror::Error;

use crate::math::Fixed;

/// Result type alias using [`GameError`].
pub type Result<T> = std::result::Result<T, GameError>;

/// Top-level error type for all simulation errors.
#[derive(Debug, Error)]
pub enum GameError {
    /// An argument was out of its valid domain (negative damage, negative dt).
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Invalid entity reference.
    #[error("Entity not found: {0}")]
    EntityNotFound(u64),

    /// A spawn referenced a template that was never registered.
    #[error("Unknown unit template: {0}")]
    UnknownTemplate(String),

    /// The operation is not allowed in the current match state.
    #[error("Match already terminal: {0}")]
    AlreadyTerminal(String),

    /// Restart was requested before the restart delay elapsed.
    #[error("Restart not yet available: {remaining} seconds remaining")]
    RestartPending {
        /// Simulated seconds left until restart is accepted.
        remaining: Fixed,
    },

    /// Data file parsing error.
    #[error("Failed to parse data file '{path}': {message}")]
    DataParseError {
        /// Path to the file that failed to parse.
        path: String,
        /// Error message.
        message: String,
    },

    /// Match configuration failed validation.
    #[error("Invalid match configuration: {0}")]
    InvalidConfig(String),

    /// Invalid simulation state.
    #[error("Invalid game state: {0}")]
    InvalidState(String),
}

/// Coarse error categories exposed to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad input: negative amounts, unknown ids or templates.
    InvalidArgument,
    /// The match has left (or not yet left) the state the operation needs.
    AlreadyTerminal,
    /// Configuration or data file problems.
    Data,
    /// Snapshot or internal state problems.
    State,
}

impl ErrorKind {
    /// Snake-case name used in protocol output.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::InvalidArgument => "invalid_argument",
            Self::AlreadyTerminal => "already_terminal",
            Self::Data => "data",
            Self::State => "state",
        }
    }
}

impl GameError {
    /// Category of this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidArgument(_) | Self::EntityNotFound(_) | Self::UnknownTemplate(_) => {
                ErrorKind::InvalidArgument
            }
            Self::AlreadyTerminal(_) | Self::RestartPending { .. } => ErrorKind::AlreadyTerminal,
            Self::DataParseError { .. } | Self::InvalidConfig(_) => ErrorKind::Data,
            Self::InvalidState(_) => ErrorKind::State,
        }
    }
}
