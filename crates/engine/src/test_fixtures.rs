//! Canned experiences materialized into a tempdir for integration-style
//! tests. Mirrors the reference document layout exactly.

use std::sync::Arc;

use tempfile::TempDir;

use crate::experiences::ExperienceCatalog;
use crate::infrastructure::FileStore;
use crate::state::{paths, StateManager};
use wayfarer_domain::ExperienceId;

pub struct Fixture {
    pub dir: TempDir,
    pub store: Arc<FileStore>,
    pub experience: ExperienceId,
}

impl Fixture {
    /// A shared-model experience: two locations, a spot with collectible
    /// dream bottles, a gift-collecting NPC, and markdown commands.
    pub async fn shared() -> Self {
        let fixture = Self::empty("wylding-woods");
        fixture
            .write_json(
                &paths::config_path(&fixture.experience),
                serde_json::json!({
                    "id": "wylding-woods",
                    "name": "Wylding Woods",
                    "version": "3",
                    "state": { "model": "shared", "lock_timeout_ms": 2000 },
                    "multiplayer": { "enabled": true },
                    "bootstrap": {
                        "player_starting_location": {
                            "location": "woander_store",
                            "area": "main_room"
                        }
                    },
                    "capabilities": { "gps_based": true, "ar_enabled": true }
                }),
            )
            .await;
        fixture
            .write_json(
                &paths::world_template_path(&fixture.experience),
                woods_template(),
            )
            .await;
        fixture
            .write_markdown(
                &format!("{}/examine.md", paths::game_logic_dir(&fixture.experience)),
                EXAMINE_MD,
            )
            .await;
        fixture
            .write_markdown(
                &format!("{}/whisper.md", paths::game_logic_dir(&fixture.experience)),
                WHISPER_MD,
            )
            .await;
        fixture
            .write_markdown(
                &format!("{}/spawn.md", paths::admin_logic_dir(&fixture.experience)),
                SPAWN_MD,
            )
            .await;
        fixture
    }

    /// An isolated-model experience with template copy-on-bootstrap.
    pub async fn isolated() -> Self {
        let fixture = Self::empty("west-of-house");
        fixture
            .write_json(
                &paths::config_path(&fixture.experience),
                serde_json::json!({
                    "id": "west-of-house",
                    "name": "West of House",
                    "state": { "model": "isolated" },
                    "multiplayer": { "enabled": false },
                    "bootstrap": {
                        "player_starting_location": {
                            "location": "white_house",
                            "area": "front_yard"
                        },
                        "player_starting_inventory": [
                            {
                                "instance_id": "leaflet_1",
                                "template_id": "leaflet",
                                "semantic_name": "small leaflet"
                            }
                        ],
                        "copy_template_for_isolated": true
                    }
                }),
            )
            .await;
        fixture
            .write_json(
                &paths::world_template_path(&fixture.experience),
                serde_json::json!({
                    "locations": {
                        "white_house": {
                            "name": "White House",
                            "areas": {
                                "front_yard": {
                                    "description": "An open field west of a white house.",
                                    "items": [
                                        {
                                            "instance_id": "mailbox_1",
                                            "template_id": "mailbox",
                                            "semantic_name": "small mailbox",
                                            "collectible": false
                                        }
                                    ],
                                    "connects_to": ["behind_house"]
                                },
                                "behind_house": {}
                            }
                        }
                    },
                    "npcs": {},
                    "global_state": {},
                    "metadata": {
                        "_version": 0,
                        "_created_at": "2026-01-01T00:00:00Z",
                        "last_modified": "2026-01-01T00:00:00Z"
                    }
                }),
            )
            .await;
        fixture
    }

    fn empty(experience: &str) -> Self {
        let dir = TempDir::new().expect("tempdir");
        let store = Arc::new(FileStore::new(dir.path()));
        Self {
            dir,
            store,
            experience: ExperienceId::new(experience),
        }
    }

    pub fn catalog(&self) -> Arc<ExperienceCatalog> {
        Arc::new(ExperienceCatalog::new(self.store.clone()))
    }

    pub fn state_manager(&self) -> StateManager {
        StateManager::new(self.store.clone(), self.catalog())
    }

    pub async fn write_json(&self, rel: &str, value: serde_json::Value) {
        self.store.write(rel, &value, None).await.expect("write fixture");
    }

    pub async fn write_markdown(&self, rel: &str, text: &str) {
        let path = self.store.root().join(rel);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await.expect("mkdir");
        }
        tokio::fs::write(&path, text).await.expect("write markdown");
    }
}

fn woods_template() -> serde_json::Value {
    let bottle = |instance_id: &str, name: &str| {
        serde_json::json!({
            "instance_id": instance_id,
            "template_id": "dream_bottle",
            "semantic_name": name,
            "collectible": true
        })
    };
    serde_json::json!({
        "locations": {
            "woander_store": {
                "name": "Woander Store",
                "default_area": "main_room",
                "exits": ["fairy_door_main"],
                "areas": {
                    "main_room": {
                        "description": "Shelves of curiosities.",
                        "items": [
                            {
                                "instance_id": "berry_1",
                                "template_id": "sun_berry",
                                "semantic_name": "sun berry",
                                "collectible": true,
                                "consumable": true,
                                "effects": { "restore_health": 10 }
                            },
                            {
                                "instance_id": "hidden_key",
                                "template_id": "brass_key",
                                "semantic_name": "brass key",
                                "visible": false,
                                "collectible": true
                            }
                        ],
                        "spots": {
                            "spot_5": {
                                "description": "a dusty shelf",
                                "items": [
                                    bottle("bottle_mystery", "bottle of mystery"),
                                    bottle("bottle_energy", "bottle of energy"),
                                    bottle("bottle_joy", "bottle of joy"),
                                    bottle("bottle_nature", "bottle of nature")
                                ]
                            }
                        },
                        "connects_to": ["back_room"]
                    },
                    "back_room": {
                        "connects_to": ["main_room"]
                    }
                }
            },
            "fairy_door_main": {
                "name": "Fairy Door",
                "default_area": "clearing",
                "exits": ["woander_store"],
                "areas": { "clearing": { "description": "A mossy clearing." } }
            }
        },
        "npcs": {
            "louisa": {
                "template_id": "fairy",
                "name": "Louisa",
                "location": "fairy_door_main",
                "area": "clearing",
                "personality": "wistful, collects dreams",
                "dialogue_topics": ["dreams", "the woods"],
                "gift_rules": [
                    {
                        "accepts": ["dream_bottle"],
                        "counter": "bottles_collected",
                        "global_counter": "dream_bottles_found",
                        "complete_at": 4,
                        "dialogue": "Another dream for the hoard!",
                        "completion": {
                            "quest_id": "dream_bottles",
                            "set_state": { "quest_active": false },
                            "dialogue": "The dreams are whole again. Thank you."
                        }
                    }
                ],
                "state": { "quest_active": true, "mood": "wistful" }
            }
        },
        "global_state": {},
        "metadata": {
            "_version": 0,
            "_created_at": "2026-01-01T00:00:00Z",
            "last_modified": "2026-01-01T00:00:00Z"
        }
    })
}

const EXAMINE_MD: &str = r#"---
command: examine
aliases:
  - inspect
  - "look at"
description: Inspect an object closely
requires_location: true
requires_target: true
---

# Examine

Describe the named object in sensory detail. Respond with JSON:
`{"success": true, "narrative": "...", "state_updates": null,
"available_actions": [], "metadata": {}}`.
Never invent objects that are not present in the provided world state.
"#;

const WHISPER_MD: &str = r#"---
command: whisper
aliases:
  - murmur
description: Whisper to the woods and see what answers
---

# Whisper

The woods may answer. When the whisper moves the world, return
`state_updates` entries shaped `{"path": ..., "operation": "set",
"value": ...}`; otherwise return `state_updates: null`.
"#;

const SPAWN_MD: &str = r#"---
command: spawn
description: Conjure an item into the current area
requires_admin: true
---

# Spawn

Admin-only. Append the described item to the current area's item list via
an `append` state update.
"#;
