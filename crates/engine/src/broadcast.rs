//! Update broadcaster.
//!
//! One broadcast channel per subject. Shared experiences fan out on
//! `exp:<id>`; isolated experiences scope the subject to the owning player,
//! so only that player's connections receive updates. Publishing never
//! blocks: a subscriber that falls behind the channel capacity observes
//! `RecvError::Lagged`, which the gateway treats as desync and answers with
//! a forced re-sync on the next interaction. Receivers must ignore any
//! update at or below their last applied version.

use dashmap::DashMap;
use tokio::sync::broadcast;

use wayfarer_domain::{ExperienceId, PlayerId, StateModel, WorldUpdate};

/// The broadcast subject for one experience (and, when isolated, player).
pub fn subject(model: StateModel, experience: &ExperienceId, player: Option<&PlayerId>) -> String {
    match (model, player) {
        (StateModel::Isolated, Some(player)) => format!("exp:{experience}:player:{player}"),
        _ => format!("exp:{experience}"),
    }
}

pub struct UpdateBroadcaster {
    capacity: usize,
    channels: DashMap<String, broadcast::Sender<WorldUpdate>>,
}

impl UpdateBroadcaster {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            channels: DashMap::new(),
        }
    }

    fn sender(&self, subject: &str) -> broadcast::Sender<WorldUpdate> {
        self.channels
            .entry(subject.to_string())
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .clone()
    }

    pub fn subscribe(&self, subject: &str) -> broadcast::Receiver<WorldUpdate> {
        self.sender(subject).subscribe()
    }

    /// Publish an update. Returns the number of subscribers it reached.
    pub fn publish(&self, subject: &str, update: WorldUpdate) -> usize {
        match self.sender(subject).send(update) {
            Ok(receivers) => receivers,
            Err(_) => 0,
        }
    }

    /// Drop every channel (used by tests and full reloads).
    pub fn clear(&self) {
        self.channels.clear();
    }
}
