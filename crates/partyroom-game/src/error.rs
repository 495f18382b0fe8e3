//! Error types for game state machines.

/// A game action that was refused. The game state is untouched.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GameError {
    /// Blank or malformed input (empty answer, unknown nominee, ...).
    #[error("invalid input: {0}")]
    Validation(String),

    /// The player is not allowed to take this action.
    #[error("not allowed: {0}")]
    Forbidden(String),

    /// The action is not valid in the current phase.
    #[error("{0}")]
    StateConflict(String),
}

impl GameError {
    pub(crate) fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub(crate) fn forbidden(msg: impl Into<String>) -> Self {
        Self::Forbidden(msg.into())
    }

    pub(crate) fn conflict(msg: impl Into<String>) -> Self {
        Self::StateConflict(msg.into())
    }
}
