//! The cross-experience player profile.
//!
//! One per player, shared by every experience. Survives experience resets
//! untouched.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::ExperienceId;
use crate::world::{DocMetadata, JsonMap};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GlobalStats {
    #[serde(default)]
    pub experiences_played: BTreeSet<ExperienceId>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerProfile {
    /// The experience the player is currently in, if any. When set, it names
    /// an experience whose config loads successfully.
    #[serde(default)]
    pub current_experience: Option<ExperienceId>,
    #[serde(default)]
    pub preferences: JsonMap,
    #[serde(default)]
    pub global_stats: GlobalStats,
    pub metadata: DocMetadata,
}

impl PlayerProfile {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            current_experience: None,
            preferences: JsonMap::new(),
            global_stats: GlobalStats::default(),
            metadata: DocMetadata::new(now),
        }
    }

    /// Remember that the player has entered an experience. Returns true when
    /// this is the first time.
    pub fn record_experience(&mut self, experience: &ExperienceId) -> bool {
        self.global_stats
            .experiences_played
            .insert(experience.clone())
    }

    pub fn select_experience(&mut self, experience: Option<ExperienceId>) {
        self.current_experience = experience;
    }
}
