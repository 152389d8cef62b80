//! Error types for the world core.

use thiserror::Error;

use crate::entity::{CollisionLayer, Handle};
use crate::faction::FactionId;

/// Result type alias using [`GameError`].
pub type Result<T> = std::result::Result<T, GameError>;

/// Top-level error type for all world core errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum GameError {
    /// Invalid entity reference.
    #[error("Entity not found: {0}")]
    EntityNotFound(Handle),

    /// The entity already died and cannot be moved or killed again.
    #[error("Entity {0} is dead")]
    EntityDead(Handle),

    /// A tile coordinate outside the world.
    #[error("Tile ({x}, {y}) is out of bounds")]
    OutOfBounds {
        /// Column.
        x: i32,
        /// Row.
        y: i32,
    },

    /// Placement onto a tile that is blocked or taken.
    #[error("Tile ({x}, {y}) is not free on the {layer:?} layer")]
    CellOccupied {
        /// Column.
        x: i32,
        /// Row.
        y: i32,
        /// Collision layer that was checked.
        layer: CollisionLayer,
    },

    /// `update` was called from inside an entity behavior.
    #[error("EntityManager::update called while an update is already running")]
    ReentrantUpdate,

    /// Unknown faction.
    #[error("Faction not found: {0}")]
    FactionNotFound(FactionId),

    /// Configuration text failed to parse.
    #[error("Failed to parse config '{path}': {message}")]
    ConfigParseError {
        /// Source the text came from.
        path: String,
        /// Error message.
        message: String,
    },

    /// Snapshot encoding or decoding failed.
    #[error("Serialization failed: {0}")]
    Serialization(String),

    /// Invalid world state.
    #[error("Invalid world state: {0}")]
    InvalidState(String),
}
