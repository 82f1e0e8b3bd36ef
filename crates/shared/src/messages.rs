//! WebSocket protocol messages (Engine ↔ Client).
//!
//! This module defines the wire-format DTOs for the streaming session plane:
//! `ClientMessage`, `ServerMessage`, and their supporting structs. It is
//! intentionally free of business logic so the transport layer stays thin.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use wayfarer_domain::{ExperienceId, WorldUpdate};

/// Messages from client to server.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Perform a game action. Anything past `action` rides in `payload`.
    Action {
        action: String,
        #[serde(flatten)]
        payload: serde_json::Map<String, Value>,
    },
    /// Switch (or first select) the current experience.
    SelectExperience { experience: ExperienceId },
    /// Heartbeat ping.
    Heartbeat,
}

/// The uniform result of one action, fast path or markdown path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionResponse {
    pub success: bool,
    pub message: String,
    #[serde(default)]
    pub metadata: serde_json::Map<String, Value>,
    /// Stable machine code, present on failure (`AlreadyCollected`, ...).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

/// Messages from server to client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Sent once after connect + initialization.
    Welcome {
        experience: Option<ExperienceId>,
        world: Option<Value>,
        view: Option<Value>,
        version: u64,
        #[serde(default)]
        metadata: serde_json::Map<String, Value>,
    },
    /// Reply to one `Action`.
    ActionResponse {
        action: String,
        #[serde(flatten)]
        response: ActionResponse,
    },
    /// A versioned world delta. Receivers must ignore versions at or below
    /// their last applied version.
    WorldUpdate {
        #[serde(flatten)]
        update: WorldUpdate,
    },
    /// Protocol-level failure outside any action.
    Error { code: String, message: String },
    /// Heartbeat reply.
    Pong,
}
