//! Versioned state deltas.
//!
//! Every accepted mutation produces one `WorldUpdate` carrying the delta and
//! the post-write world version. The same `WorldChange` shape is used for
//! handler-produced deltas, admin edits, and validated LLM state updates.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::GameError;
use crate::ids::{ExperienceId, PlayerId};
use crate::path;

/// One atomic change inside a `WorldUpdate`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum WorldChange {
    Set { path: String, value: Value },
    Append { path: String, item: Value },
    Remove { path: String, item_id: String },
}

impl WorldChange {
    pub fn path(&self) -> &str {
        match self {
            Self::Set { path, .. } | Self::Append { path, .. } | Self::Remove { path, .. } => path,
        }
    }

    /// Re-root the change path (used to mark view-scoped changes `view.…`).
    pub fn prefixed(self, prefix: &str) -> Self {
        let rework = |path: String| format!("{prefix}.{path}");
        match self {
            Self::Set { path, value } => Self::Set {
                path: rework(path),
                value,
            },
            Self::Append { path, item } => Self::Append {
                path: rework(path),
                item,
            },
            Self::Remove { path, item_id } => Self::Remove {
                path: rework(path),
                item_id,
            },
        }
    }

    /// Apply this change to a raw document value through the path resolver.
    pub fn apply(&self, root: &mut Value) -> Result<(), GameError> {
        match self {
            Self::Set { path: p, value } => path::set(root, p, value.clone()),
            Self::Append { path: p, item } => path::append(root, p, item.clone()),
            Self::Remove { path: p, item_id } => {
                path::remove_by_id(root, p, item_id).map(|_| ())
            }
        }
    }
}

/// The event broadcast to every subscriber of an experience channel after a
/// successful mutation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorldUpdate {
    pub experience: ExperienceId,
    /// Equals the world document's post-write `_version`.
    pub version: u64,
    pub changes: Vec<WorldChange>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin_player: Option<PlayerId>,
    pub timestamp: DateTime<Utc>,
}

/// Which document an LLM state update targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateScope {
    World,
    View,
}

/// Path roots that address the player view rather than the world.
const VIEW_ROOTS: &[&str] = &["player", "progress", "session", "npc_relationships"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdateOperation {
    Set,
    Append,
    Remove,
}

/// A structured state update as returned by the markdown/LLM path, before
/// validation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateUpdateOp {
    pub path: String,
    pub operation: UpdateOperation,
    #[serde(default)]
    pub value: Option<Value>,
    #[serde(default)]
    pub item: Option<Value>,
    #[serde(default)]
    pub item_id: Option<String>,
}

impl StateUpdateOp {
    /// Which document this op addresses, by path root.
    pub fn scope(&self) -> StateScope {
        let root = self.path.split('.').next().unwrap_or_default();
        if VIEW_ROOTS.contains(&root) {
            StateScope::View
        } else {
            StateScope::World
        }
    }

    /// Validate the payload-vs-operation pairing and convert to a change.
    pub fn into_change(self) -> Result<WorldChange, GameError> {
        match self.operation {
            UpdateOperation::Set => {
                let value = self.value.ok_or_else(|| {
                    GameError::InvalidStateUpdate(format!("set '{}' is missing value", self.path))
                })?;
                Ok(WorldChange::Set {
                    path: self.path,
                    value,
                })
            }
            UpdateOperation::Append => {
                let item = self.item.ok_or_else(|| {
                    GameError::InvalidStateUpdate(format!("append '{}' is missing item", self.path))
                })?;
                Ok(WorldChange::Append {
                    path: self.path,
                    item,
                })
            }
            UpdateOperation::Remove => {
                let item_id = self.item_id.ok_or_else(|| {
                    GameError::InvalidStateUpdate(format!(
                        "remove '{}' is missing item_id",
                        self.path
                    ))
                })?;
                Ok(WorldChange::Remove {
                    path: self.path,
                    item_id,
                })
            }
        }
    }
}
