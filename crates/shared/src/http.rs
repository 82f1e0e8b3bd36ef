//! Request/response bodies for the non-streaming HTTP interaction endpoint.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use wayfarer_domain::{ExperienceId, StateUpdateOp};

/// `POST /experience/interact`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InteractRequest {
    pub message: String,
    /// Overrides the profile's current experience for this request.
    #[serde(default)]
    pub experience: Option<ExperienceId>,
    /// When true, the request fails instead of falling back to the
    /// profile's current experience.
    #[serde(default)]
    pub force_experience_selection: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InteractResponse {
    pub success: bool,
    pub narrative: String,
    pub experience: Option<ExperienceId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state_updates: Option<Vec<StateUpdateOp>>,
    #[serde(default)]
    pub available_actions: Vec<String>,
    #[serde(default)]
    pub metadata: serde_json::Map<String, Value>,
}
