//! Experience configuration.
//!
//! One `config.json` per experience selects the state model and the
//! bootstrap shape for new players. The record is closed: unknown top-level
//! fields are rejected so a typo'd config fails loudly at load time instead
//! of silently changing behavior. Configs are immutable for the process
//! lifetime except through the explicit reload hook.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::GameError;
use crate::ids::ExperienceId;
use crate::world::ItemInstance;

/// Whether all players share one authoritative world or each player gets a
/// private copy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StateModel {
    Shared,
    Isolated,
}

impl fmt::Display for StateModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StateModel::Shared => write!(f, "shared"),
            StateModel::Isolated => write!(f, "isolated"),
        }
    }
}

impl FromStr for StateModel {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "shared" => Ok(StateModel::Shared),
            "isolated" => Ok(StateModel::Isolated),
            _ => Err(()),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_lock_timeout_ms() -> u64 {
    5_000
}

/// State handling knobs for one experience.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StateConfig {
    pub model: StateModel,
    #[serde(default = "default_true")]
    pub locking_enabled: bool,
    #[serde(default = "default_true")]
    pub optimistic_versioning: bool,
    #[serde(default = "default_lock_timeout_ms")]
    pub lock_timeout_ms: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MultiplayerConfig {
    #[serde(default)]
    pub enabled: bool,
}

/// Where new players start.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StartingPosition {
    pub location: String,
    pub area: String,
    #[serde(default)]
    pub spot: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BootstrapConfig {
    pub player_starting_location: StartingPosition,
    #[serde(default)]
    pub player_starting_inventory: Vec<ItemInstance>,
    #[serde(default)]
    pub copy_template_for_isolated: bool,
}

fn default_version() -> String {
    "1".to_string()
}

/// Parsed and validated `config.json` for one experience.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExperienceConfig {
    pub id: ExperienceId,
    pub name: String,
    #[serde(default = "default_version")]
    pub version: String,
    pub state: StateConfig,
    #[serde(default)]
    pub multiplayer: MultiplayerConfig,
    pub bootstrap: BootstrapConfig,
    /// Free-form capability flags (gps_based, ar_enabled, ...).
    #[serde(default)]
    pub capabilities: BTreeMap<String, serde_json::Value>,
}

impl ExperienceConfig {
    /// Cross-field validation. An experience whose config fails here is
    /// refused entirely; other experiences remain serviceable.
    pub fn validate(&self) -> Result<(), GameError> {
        if self.id.is_empty() {
            return Err(GameError::config_invalid("id must not be empty"));
        }
        if self.name.trim().is_empty() {
            return Err(GameError::config_invalid("name must not be empty"));
        }
        match (self.state.model, self.multiplayer.enabled) {
            (StateModel::Shared, false) => Err(GameError::config_invalid(
                "state.model=shared requires multiplayer.enabled=true",
            )),
            (StateModel::Isolated, true) => Err(GameError::config_invalid(
                "state.model=isolated requires multiplayer.enabled=false",
            )),
            _ => Ok(()),
        }
    }

    pub fn lock_timeout(&self) -> Duration {
        Duration::from_millis(self.state.lock_timeout_ms)
    }

    /// Shared worlds serialize mutations through the document lock by
    /// default; isolated worlds are single-writer and skip it.
    pub fn use_locking_default(&self) -> bool {
        self.state.locking_enabled && self.state.model == StateModel::Shared
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shared_config_json() -> serde_json::Value {
        serde_json::json!({
            "id": "wylding-woods",
            "name": "Wylding Woods",
            "state": { "model": "shared" },
            "multiplayer": { "enabled": true },
            "bootstrap": {
                "player_starting_location": {
                    "location": "woander_store",
                    "area": "main_room"
                }
            }
        })
    }

    #[test]
    fn test_parse_with_defaults() {
        let config: ExperienceConfig =
            serde_json::from_value(shared_config_json()).expect("parse");
        assert_eq!(config.state.model, StateModel::Shared);
        assert!(config.state.locking_enabled);
        assert!(config.state.optimistic_versioning);
        assert_eq!(config.state.lock_timeout_ms, 5_000);
        assert!(config.bootstrap.player_starting_inventory.is_empty());
        assert!(config.validate().is_ok());
        assert!(config.use_locking_default());
    }

    #[test]
    fn test_shared_requires_multiplayer() {
        let mut raw = shared_config_json();
        raw["multiplayer"]["enabled"] = serde_json::json!(false);
        let config: ExperienceConfig = serde_json::from_value(raw).expect("parse");
        let err = config.validate().expect_err("must fail");
        assert_eq!(err.code(), "ConfigInvalid");
    }

    #[test]
    fn test_isolated_rejects_multiplayer() {
        let mut raw = shared_config_json();
        raw["state"]["model"] = serde_json::json!("isolated");
        let config: ExperienceConfig = serde_json::from_value(raw).expect("parse");
        assert!(config.validate().is_err());

        raw = shared_config_json();
        raw["state"]["model"] = serde_json::json!("isolated");
        raw["multiplayer"]["enabled"] = serde_json::json!(false);
        let config: ExperienceConfig = serde_json::from_value(raw).expect("parse");
        assert!(config.validate().is_ok());
        assert!(!config.use_locking_default());
    }

    #[test]
    fn test_unknown_fields_rejected() {
        let mut raw = shared_config_json();
        raw["surprise"] = serde_json::json!(1);
        assert!(serde_json::from_value::<ExperienceConfig>(raw).is_err());
    }

    #[test]
    fn test_state_model_round_trip() {
        assert_eq!("shared".parse::<StateModel>(), Ok(StateModel::Shared));
        assert_eq!("Isolated".parse::<StateModel>(), Ok(StateModel::Isolated));
        assert!("both".parse::<StateModel>().is_err());
        assert_eq!(StateModel::Shared.to_string(), "shared");
    }
}
