//! Core domain types for the Wayfarer experience runtime.
//!
//! Everything in this crate is pure data + logic: the closed-record document
//! schemas (experience config, world, player view, player profile), the
//! command frontmatter model, versioned update deltas, and the dotted-path
//! resolver that admin edits and LLM state updates flow through. No I/O.

pub mod command;
pub mod config;
pub mod error;
pub mod gift;
pub mod ids;
pub mod path;
pub mod profile;
pub mod update;
pub mod view;
pub mod world;

pub use command::{parse_command_markdown, CommandDefinition, ParsedCommand};
pub use config::{
    BootstrapConfig, ExperienceConfig, MultiplayerConfig, StateConfig, StateModel,
    StartingPosition,
};
pub use error::GameError;
pub use gift::{apply_gift, GiftCompletion, GiftOutcome, GiftRule};
pub use ids::{ExperienceId, PlayerId};
pub use profile::{GlobalStats, PlayerProfile};
pub use update::{StateScope, StateUpdateOp, UpdateOperation, WorldChange, WorldUpdate};
pub use view::{
    ConversationEntry, NpcRelationship, PlayerState, PlayerView, Progress, SessionInfo,
    MAX_CONVERSATION_HISTORY,
};
pub use world::{
    Area, DocMetadata, ItemInstance, JsonMap, Location, Npc, Position, Spot, WorldDocument,
};
