//! Per-player per-experience state.
//!
//! The view owns everything private to one player: position, inventory,
//! stats, progress, and relationship data with NPCs. Relationship data
//! deliberately lives here and never in the shared NPC record, so shared
//! experiences keep per-player privacy.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::ExperienceConfig;
use crate::world::{DocMetadata, ItemInstance, JsonMap, Position};

/// Upper bound on retained conversation turns per NPC relationship.
pub const MAX_CONVERSATION_HISTORY: usize = 20;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerState {
    pub current_location: String,
    pub current_area: String,
    #[serde(default)]
    pub current_sublocation: Option<String>,
    /// Full item instances, so a drop can put the exact item back into the
    /// world. The wire minimum is `{instance_id, template_id,
    /// semantic_name}`; the rest takes serde defaults.
    #[serde(default)]
    pub inventory: Vec<ItemInstance>,
    /// Free-form stats (health, status effects, ...).
    #[serde(default)]
    pub stats: JsonMap,
}

impl PlayerState {
    pub fn position(&self) -> Position {
        Position {
            location: self.current_location.clone(),
            area: self.current_area.clone(),
            spot: self.current_sublocation.clone(),
        }
    }

    pub fn move_to(&mut self, position: &Position) {
        self.current_location = position.location.clone();
        self.current_area = position.area.clone();
        self.current_sublocation = position.spot.clone();
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Progress {
    #[serde(default)]
    pub visited_locations: BTreeSet<String>,
    #[serde(default)]
    pub quest_states: BTreeMap<String, serde_json::Value>,
    #[serde(default)]
    pub achievements: BTreeSet<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionInfo {
    pub started_at: DateTime<Utc>,
    pub last_active: DateTime<Utc>,
    #[serde(default)]
    pub turns_taken: u64,
}

/// One remembered exchange with an NPC.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationEntry {
    pub speaker: String,
    pub text: String,
}

fn default_trust() -> u8 {
    50
}

/// Private relationship state between one player and one NPC.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NpcRelationship {
    /// 0..=100.
    #[serde(default = "default_trust")]
    pub trust: u8,
    #[serde(default)]
    pub conversation_history: Vec<ConversationEntry>,
    #[serde(default)]
    pub dialogue_state: JsonMap,
}

impl Default for NpcRelationship {
    fn default() -> Self {
        Self {
            trust: default_trust(),
            conversation_history: Vec::new(),
            dialogue_state: JsonMap::new(),
        }
    }
}

impl NpcRelationship {
    /// Append a turn, evicting the oldest beyond the retention bound.
    pub fn record_turn(&mut self, entry: ConversationEntry) {
        self.conversation_history.push(entry);
        if self.conversation_history.len() > MAX_CONVERSATION_HISTORY {
            let excess = self.conversation_history.len() - MAX_CONVERSATION_HISTORY;
            self.conversation_history.drain(..excess);
        }
    }

    pub fn adjust_trust(&mut self, delta: i16) {
        let adjusted = i16::from(self.trust) + delta;
        self.trust = adjusted.clamp(0, 100) as u8;
    }
}

/// Per-player per-experience document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerView {
    pub player: PlayerState,
    #[serde(default)]
    pub progress: Progress,
    #[serde(default)]
    pub npc_relationships: BTreeMap<String, NpcRelationship>,
    pub session: SessionInfo,
    pub metadata: DocMetadata,
}

impl PlayerView {
    /// The view a freshly initialized player gets, derived from experience
    /// bootstrap config.
    pub fn bootstrap(config: &ExperienceConfig, now: DateTime<Utc>) -> Self {
        let start = &config.bootstrap.player_starting_location;
        let mut progress = Progress::default();
        progress.visited_locations.insert(start.location.clone());
        Self {
            player: PlayerState {
                current_location: start.location.clone(),
                current_area: start.area.clone(),
                current_sublocation: start.spot.clone(),
                inventory: config.bootstrap.player_starting_inventory.clone(),
                stats: JsonMap::new(),
            },
            progress,
            npc_relationships: BTreeMap::new(),
            session: SessionInfo {
                started_at: now,
                last_active: now,
                turns_taken: 0,
            },
            metadata: DocMetadata::new(now),
        }
    }

    pub fn has_item(&self, instance_id: &str) -> bool {
        self.player
            .inventory
            .iter()
            .any(|i| i.instance_id == instance_id)
    }

    pub fn find_item(&self, instance_id: &str) -> Option<&ItemInstance> {
        self.player
            .inventory
            .iter()
            .find(|i| i.instance_id == instance_id)
    }

    pub fn remove_item(&mut self, instance_id: &str) -> Option<ItemInstance> {
        let index = self
            .player
            .inventory
            .iter()
            .position(|i| i.instance_id == instance_id)?;
        Some(self.player.inventory.remove(index))
    }

    /// Inventory grouped by template with counts, in first-seen order.
    pub fn inventory_grouped(&self) -> Vec<(String, String, usize)> {
        let mut groups: Vec<(String, String, usize)> = Vec::new();
        for item in &self.player.inventory {
            match groups.iter_mut().find(|(t, _, _)| t == &item.template_id) {
                Some((_, _, count)) => *count += 1,
                None => groups.push((item.template_id.clone(), item.semantic_name.clone(), 1)),
            }
        }
        groups
    }

    /// Record one processed turn.
    pub fn touch_session(&mut self, now: DateTime<Utc>) {
        self.session.last_active = now;
        self.session.turns_taken += 1;
    }
}
