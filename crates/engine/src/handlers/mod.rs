//! Fast-path handlers.
//!
//! Reserved structured actions executed entirely in code, one use case per
//! file. Every mutating handler runs its writes through the state manager,
//! so locking, optimistic versioning, and broadcast behave identically
//! across the fast path, the admin path, and the markdown path.
//!
//! Failure contract: a handler error never writes and never emits a
//! `WorldUpdate`. Success always carries exactly one update for mutating
//! handlers and none for read-only ones.

pub mod admin;
pub mod collect_item;
pub mod drop_item;
pub mod examine;
pub mod give_item;
pub mod go;
pub mod inventory;
pub mod use_item;

pub use admin::AdminHandlers;
pub use collect_item::CollectItem;
pub use drop_item::DropItem;
pub use examine::Examine;
pub use give_item::GiveItem;
pub use go::Go;
pub use inventory::Inventory;
pub use use_item::UseItem;

use chrono::Utc;

use wayfarer_domain::{
    ExperienceId, JsonMap, PlayerId, StateUpdateOp, WorldChange, WorldUpdate,
};

/// Reserved structured action names served by the fast path.
pub const RESERVED_ACTIONS: &[&str] = &[
    "collect_item",
    "drop_item",
    "use_item",
    "give_item",
    "go",
    "examine",
    "inventory",
];

pub fn is_reserved_action(action: &str) -> bool {
    RESERVED_ACTIONS.contains(&action)
}

/// Identity and authorization of the acting session.
#[derive(Debug, Clone)]
pub struct ActionContext {
    pub experience: ExperienceId,
    pub player: PlayerId,
    pub admin: bool,
}

/// Uniform handler outcome.
#[derive(Debug, Clone)]
pub struct ActionOutcome {
    pub success: bool,
    pub message: String,
    pub metadata: JsonMap,
    /// Present for mutating outcomes; read-only handlers emit none.
    pub update: Option<WorldUpdate>,
    /// Ops applied by the markdown path, surfaced on the HTTP endpoint.
    pub state_updates: Option<Vec<StateUpdateOp>>,
    pub available_actions: Vec<String>,
}

impl ActionOutcome {
    pub fn read_only(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            metadata: JsonMap::new(),
            update: None,
            state_updates: None,
            available_actions: Vec::new(),
        }
    }

    pub fn mutated(message: impl Into<String>, update: WorldUpdate) -> Self {
        Self {
            success: true,
            message: message.into(),
            metadata: JsonMap::new(),
            update: Some(update),
            state_updates: None,
            available_actions: Vec::new(),
        }
    }

    pub fn narrative_failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            metadata: JsonMap::new(),
            update: None,
            state_updates: None,
            available_actions: Vec::new(),
        }
    }

    pub fn with_metadata(mut self, key: &str, value: serde_json::Value) -> Self {
        self.metadata.insert(key.to_string(), value);
        self
    }
}

/// Assemble the single `WorldUpdate` for one accepted mutation: world-scoped
/// changes as-is, view-scoped changes re-rooted under `view.`, version from
/// the post-write world document.
pub fn build_update(
    ctx: &ActionContext,
    version: u64,
    world_changes: Vec<WorldChange>,
    view_changes: Vec<WorldChange>,
) -> WorldUpdate {
    let mut changes = world_changes;
    changes.extend(view_changes.into_iter().map(|c| c.prefixed("view")));
    WorldUpdate {
        experience: ctx.experience.clone(),
        version,
        changes,
        origin_player: Some(ctx.player.clone()),
        timestamp: Utc::now(),
    }
}
