//! Unified error kinds for the runtime.
//!
//! Every failure a command can surface to a player maps to one variant here.
//! Each variant carries a short display message and a stable machine code
//! (`code()`) that is sent in `action_response` payloads, so clients can
//! branch on errors without parsing prose.

use serde_json::Value;
use thiserror::Error;

/// Unified error type for game operations.
#[derive(Debug, Error, Clone)]
pub enum GameError {
    /// The experience's config.json failed to parse or validate.
    #[error("Experience configuration is invalid: {0}")]
    ConfigInvalid(String),

    /// A referenced document or entity does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// The player has no view for this experience yet.
    #[error("Player '{player}' is not initialized for experience '{experience}'")]
    NotInitialized { player: String, experience: String },

    /// The session is not allowed to perform this action.
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// A destructive action needs an explicit CONFIRM. Carries the preview
    /// payload so clients can show it and re-submit.
    #[error("Confirmation required")]
    ConfirmationRequired { preview: Value },

    /// Optimistic version retries were exhausted.
    #[error("The world changed too quickly, please retry: {0}")]
    Conflict(String),

    /// A document lock could not be acquired within the configured timeout.
    #[error("Timed out waiting for a state lock: {0}")]
    LockTimeout(String),

    /// A stored document could not be parsed and was quarantined.
    #[error("Stored state is corrupt: {0}")]
    Corrupt(String),

    #[error("Unknown destination: {0}")]
    UnknownDestination(String),

    #[error("You can't get there from here: {0}")]
    NotReachable(String),

    #[error("That isn't here: {0}")]
    NotAtLocation(String),

    #[error("That can't be picked up: {0}")]
    NotCollectible(String),

    #[error("That isn't in your inventory: {0}")]
    NotInInventory(String),

    /// Message is the full player-facing sentence; handlers know the item
    /// and NPC names.
    #[error("{0}")]
    NotUsable(String),

    /// A concurrent writer collected the item first.
    #[error("Someone already picked that up: {0}")]
    AlreadyCollected(String),

    #[error("No such character: {0}")]
    NpcNotFound(String),

    #[error("They aren't here: {0}")]
    NotAtNpc(String),

    #[error("Unknown command: {0}")]
    UnknownCommand(String),

    #[error("Malformed input: {0}")]
    MalformedInput(String),

    /// An LLM-returned state update referenced a bad path, wrong type, or
    /// protected key. The whole command is rejected.
    #[error("Invalid state update: {0}")]
    InvalidStateUpdate(String),

    /// Transient: the LLM provider could not be reached.
    #[error("The storyteller is unavailable right now: {0}")]
    LlmUnavailable(String),

    /// The LLM replied with something that doesn't match the contract.
    #[error("The storyteller gave a garbled answer: {0}")]
    MalformedResponse(String),

    /// Transient transport failure (socket, serialization of frames).
    #[error("Transport error: {0}")]
    TransportError(String),

    /// Unexpected internal failure (I/O and friends).
    #[error("Internal error: {0}")]
    Internal(String),
}

impl GameError {
    /// Stable machine-readable code for wire payloads.
    pub fn code(&self) -> &'static str {
        match self {
            Self::ConfigInvalid(_) => "ConfigInvalid",
            Self::NotFound(_) => "NotFound",
            Self::NotInitialized { .. } => "NotInitialized",
            Self::PermissionDenied(_) => "PermissionDenied",
            Self::ConfirmationRequired { .. } => "ConfirmationRequired",
            Self::Conflict(_) => "Conflict",
            Self::LockTimeout(_) => "LockTimeout",
            Self::Corrupt(_) => "Corrupt",
            Self::UnknownDestination(_) => "UnknownDestination",
            Self::NotReachable(_) => "NotReachable",
            Self::NotAtLocation(_) => "NotAtLocation",
            Self::NotCollectible(_) => "NotCollectible",
            Self::NotInInventory(_) => "NotInInventory",
            Self::NotUsable(_) => "NotUsable",
            Self::AlreadyCollected(_) => "AlreadyCollected",
            Self::NpcNotFound(_) => "NpcNotFound",
            Self::NotAtNpc(_) => "NotAtNpc",
            Self::UnknownCommand(_) => "UnknownCommand",
            Self::MalformedInput(_) => "MalformedInput",
            Self::InvalidStateUpdate(_) => "InvalidStateUpdate",
            Self::LlmUnavailable(_) => "LlmUnavailable",
            Self::MalformedResponse(_) => "MalformedResponse",
            Self::TransportError(_) => "TransportError",
            Self::Internal(_) => "Internal",
        }
    }

    /// True for failures the client should simply retry later.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Conflict(_) | Self::LockTimeout(_) | Self::LlmUnavailable(_) | Self::TransportError(_)
        )
    }

    /// Create a not-found error.
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    /// Create a not-initialized error.
    pub fn not_initialized(player: impl Into<String>, experience: impl Into<String>) -> Self {
        Self::NotInitialized {
            player: player.into(),
            experience: experience.into(),
        }
    }

    /// Create a config-invalid error.
    pub fn config_invalid(msg: impl Into<String>) -> Self {
        Self::ConfigInvalid(msg.into())
    }

    /// Create an internal error.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}
