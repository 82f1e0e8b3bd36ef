//! The world document.
//!
//! One per experience (shared model) or one per player (isolated model).
//! The spatial tree is `locations → areas → spots`; items and NPCs hang off
//! areas and spots. Top-level structure is a closed record; per-entity
//! `state` and `global_state` stay free-form JSON maps so content authors
//! can invent keys without schema changes.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::GameError;
use crate::gift::GiftRule;

pub type JsonMap = serde_json::Map<String, serde_json::Value>;

/// Versioning metadata carried by every persisted document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocMetadata {
    /// Monotonic document version. Bumped exactly once per accepted mutation.
    #[serde(rename = "_version")]
    pub version: u64,
    #[serde(rename = "_created_at")]
    pub created_at: DateTime<Utc>,
    pub last_modified: DateTime<Utc>,
}

impl DocMetadata {
    /// Fresh metadata at version 0; the first accepted mutation moves it to 1.
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            version: 0,
            created_at: now,
            last_modified: now,
        }
    }

    /// Record one accepted mutation.
    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.version += 1;
        self.last_modified = now;
    }
}

/// A live item placed in the world or held in an inventory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemInstance {
    pub instance_id: String,
    pub template_id: String,
    pub semantic_name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default = "default_visible")]
    pub visible: bool,
    #[serde(default)]
    pub collectible: bool,
    #[serde(default)]
    pub consumable: bool,
    /// Declarative use-effects (restore_health, apply_status, set, unset).
    #[serde(default)]
    pub effects: Option<JsonMap>,
    /// Free-form instance state.
    #[serde(default)]
    pub state: JsonMap,
}

fn default_visible() -> bool {
    true
}

impl ItemInstance {
    /// Minimal constructor for bootstrap inventories and tests; everything
    /// else takes serde defaults.
    pub fn new(
        instance_id: impl Into<String>,
        template_id: impl Into<String>,
        semantic_name: impl Into<String>,
    ) -> Self {
        Self {
            instance_id: instance_id.into(),
            template_id: template_id.into(),
            semantic_name: semantic_name.into(),
            description: None,
            visible: true,
            collectible: false,
            consumable: false,
            effects: None,
            state: JsonMap::new(),
        }
    }

    pub fn has_effects(&self) -> bool {
        self.effects.as_ref().is_some_and(|e| !e.is_empty())
    }
}

/// The finest spatial container. Items only.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Spot {
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub items: Vec<ItemInstance>,
}

/// A walkable area inside a location.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Area {
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub items: Vec<ItemInstance>,
    #[serde(default)]
    pub spots: BTreeMap<String, Spot>,
    /// Explicit sideways links to other areas of the same location.
    #[serde(default)]
    pub connects_to: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Location {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub areas: BTreeMap<String, Area>,
    /// Locations reachable in a single hop.
    #[serde(default)]
    pub exits: Vec<String>,
    /// Arrival area when a player enters this location. Falls back to the
    /// first area in key order.
    #[serde(default)]
    pub default_area: Option<String>,
}

impl Location {
    pub fn arrival_area(&self) -> Option<&str> {
        if let Some(area) = self.default_area.as_deref() {
            if self.areas.contains_key(area) {
                return Some(area);
            }
        }
        self.areas.keys().next().map(String::as_str)
    }
}

/// An NPC living in the world document. The read-only template half
/// (personality, topics, gift rules) and the mutable instance half
/// (`location`, `area`, `state`) share one record; admin edits and gift
/// hooks only ever touch the instance half.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Npc {
    #[serde(default)]
    pub template_id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    pub location: String,
    #[serde(default)]
    pub area: Option<String>,
    #[serde(default)]
    pub personality: Option<String>,
    #[serde(default)]
    pub dialogue_topics: Vec<String>,
    #[serde(default)]
    pub gift_rules: Vec<GiftRule>,
    /// Mutable instance state (mood, counters, quest flags).
    #[serde(default)]
    pub state: JsonMap,
}

impl Npc {
    /// Whether the NPC is present at the given position. An NPC without an
    /// `area` is considered present anywhere in its location.
    pub fn is_at(&self, position: &Position) -> bool {
        self.location == position.location
            && self
                .area
                .as_deref()
                .map(|a| a == position.area)
                .unwrap_or(true)
    }
}

/// A player's position in the spatial tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub location: String,
    pub area: String,
    #[serde(default)]
    pub spot: Option<String>,
}

impl Position {
    pub fn new(location: impl Into<String>, area: impl Into<String>) -> Self {
        Self {
            location: location.into(),
            area: area.into(),
            spot: None,
        }
    }

    pub fn with_spot(mut self, spot: impl Into<String>) -> Self {
        self.spot = Some(spot.into());
        self
    }

    pub fn describe(&self) -> String {
        match &self.spot {
            Some(spot) => format!("{}/{}/{}", self.location, self.area, spot),
            None => format!("{}/{}", self.location, self.area),
        }
    }
}

/// The authoritative world document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorldDocument {
    #[serde(default)]
    pub locations: BTreeMap<String, Location>,
    #[serde(default)]
    pub npcs: BTreeMap<String, Npc>,
    #[serde(default)]
    pub global_state: JsonMap,
    pub metadata: DocMetadata,
}

impl WorldDocument {
    /// A world freshly instantiated from template contents: same content,
    /// reset metadata.
    pub fn from_template(template: &WorldDocument, now: DateTime<Utc>) -> Self {
        let mut world = template.clone();
        world.metadata = DocMetadata::new(now);
        world
    }

    pub fn location(&self, id: &str) -> Option<&Location> {
        self.locations.get(id)
    }

    pub fn area(&self, location: &str, area: &str) -> Option<&Area> {
        self.locations.get(location)?.areas.get(area)
    }

    pub fn area_mut(&mut self, location: &str, area: &str) -> Option<&mut Area> {
        self.locations.get_mut(location)?.areas.get_mut(area)
    }

    /// Items at a position: the spot's items when a spot is given, else the
    /// area's own items.
    pub fn items_at(&self, position: &Position) -> Option<&Vec<ItemInstance>> {
        let area = self.area(&position.location, &position.area)?;
        match &position.spot {
            Some(spot) => area.spots.get(spot).map(|s| &s.items),
            None => Some(&area.items),
        }
    }

    fn items_at_mut(&mut self, position: &Position) -> Option<&mut Vec<ItemInstance>> {
        let area = self.area_mut(&position.location, &position.area)?;
        match &position.spot {
            Some(spot) => area.spots.get_mut(spot).map(|s| &mut s.items),
            None => Some(&mut area.items),
        }
    }

    pub fn find_item_at(&self, position: &Position, instance_id: &str) -> Option<&ItemInstance> {
        self.items_at(position)?
            .iter()
            .find(|i| i.instance_id == instance_id)
    }

    /// Search the whole current area, spots included. `examine` uses this so
    /// a player can inspect anything in the room without naming the spot.
    pub fn find_item_in_area(&self, position: &Position, instance_id: &str) -> Option<&ItemInstance> {
        let area = self.area(&position.location, &position.area)?;
        area.items
            .iter()
            .chain(area.spots.values().flat_map(|s| s.items.iter()))
            .find(|i| i.instance_id == instance_id)
    }

    /// Remove an item from the container at `position`. Returns the removed
    /// instance, or `None` when it is no longer there (a concurrent writer
    /// won the race).
    pub fn take_item_at(
        &mut self,
        position: &Position,
        instance_id: &str,
    ) -> Option<ItemInstance> {
        let items = self.items_at_mut(position)?;
        let index = items.iter().position(|i| i.instance_id == instance_id)?;
        Some(items.remove(index))
    }

    /// Place an item into the container at `position` (spot when given,
    /// area otherwise).
    pub fn place_item_at(
        &mut self,
        position: &Position,
        item: ItemInstance,
    ) -> Result<(), GameError> {
        let items = self
            .items_at_mut(position)
            .ok_or_else(|| GameError::not_found(position.describe()))?;
        items.push(item);
        Ok(())
    }

    /// Dotted path of the item container at `position`, for change deltas.
    pub fn item_container_path(position: &Position) -> String {
        match &position.spot {
            Some(spot) => format!(
                "locations.{}.areas.{}.spots.{}.items",
                position.location, position.area, spot
            ),
            None => format!(
                "locations.{}.areas.{}.items",
                position.location, position.area
            ),
        }
    }

    /// Resolve a structured destination token to a concrete position,
    /// honoring single-hop reachability. Resolution order: spots in the
    /// current location, then areas of the current location, then sibling
    /// locations via explicit exits.
    pub fn resolve_destination(
        &self,
        from: &Position,
        destination: &str,
    ) -> Result<Position, GameError> {
        let current_location = self
            .location(&from.location)
            .ok_or_else(|| GameError::not_found(from.location.clone()))?;

        // Spots anywhere in the current location...
        for (area_id, area) in &current_location.areas {
            if area.spots.contains_key(destination) {
                // ...but only the current area's spots are one hop away.
                if area_id == &from.area {
                    return Ok(Position::new(from.location.clone(), from.area.clone())
                        .with_spot(destination));
                }
                return Err(GameError::NotReachable(destination.to_string()));
            }
        }

        // Areas of the current location. Stepping out of a spot back into the
        // enclosing area is structural; a sibling area needs an explicit
        // connects_to link.
        if current_location.areas.contains_key(destination) {
            if destination == from.area {
                return Ok(Position::new(from.location.clone(), destination));
            }
            let connected = current_location
                .areas
                .get(&from.area)
                .map(|a| a.connects_to.iter().any(|c| c == destination))
                .unwrap_or(false);
            if connected {
                return Ok(Position::new(from.location.clone(), destination));
            }
            return Err(GameError::NotReachable(destination.to_string()));
        }

        // Sibling locations via exits.
        if let Some(target) = self.locations.get(destination) {
            let has_exit = current_location.exits.iter().any(|e| e == destination);
            if !has_exit {
                return Err(GameError::NotReachable(destination.to_string()));
            }
            let area = target
                .arrival_area()
                .ok_or_else(|| GameError::NotReachable(destination.to_string()))?;
            return Ok(Position::new(destination, area));
        }

        Err(GameError::UnknownDestination(destination.to_string()))
    }

    /// NPCs present at a position.
    pub fn npcs_at<'a>(&'a self, position: &'a Position) -> impl Iterator<Item = (&'a String, &'a Npc)> {
        self.npcs.iter().filter(move |(_, npc)| npc.is_at(position))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_world() -> WorldDocument {
        let now = Utc::now();
        let mut world = WorldDocument {
            locations: BTreeMap::new(),
            npcs: BTreeMap::new(),
            global_state: JsonMap::new(),
            metadata: DocMetadata::new(now),
        };

        let mut main_room = Area::default();
        main_room.spots.insert(
            "spot_5".to_string(),
            Spot {
                description: Some("a dusty shelf".to_string()),
                items: vec![ItemInstance {
                    instance_id: "bottle_mystery".to_string(),
                    template_id: "dream_bottle".to_string(),
                    semantic_name: "mysterious bottle".to_string(),
                    description: None,
                    visible: true,
                    collectible: true,
                    consumable: false,
                    effects: None,
                    state: JsonMap::new(),
                }],
            },
        );
        main_room.connects_to.push("back_room".to_string());

        let mut store = Location {
            name: Some("Woander Store".to_string()),
            description: None,
            areas: BTreeMap::new(),
            exits: vec!["fairy_door_main".to_string()],
            default_area: Some("main_room".to_string()),
        };
        store.areas.insert("main_room".to_string(), main_room);
        store.areas.insert("back_room".to_string(), Area::default());
        world.locations.insert("woander_store".to_string(), store);

        let mut fairy_door = Location::default();
        fairy_door
            .areas
            .insert("clearing".to_string(), Area::default());
        world
            .locations
            .insert("fairy_door_main".to_string(), fairy_door);

        world.npcs.insert(
            "louisa".to_string(),
            Npc {
                template_id: Some("fairy".to_string()),
                name: Some("Louisa".to_string()),
                location: "fairy_door_main".to_string(),
                area: Some("clearing".to_string()),
                personality: None,
                dialogue_topics: vec![],
                gift_rules: vec![],
                state: JsonMap::new(),
            },
        );

        world
    }

    fn spot_position() -> Position {
        Position::new("woander_store", "main_room").with_spot("spot_5")
    }

    #[test]
    fn test_take_and_place_item() {
        let mut world = test_world();
        let pos = spot_position();

        let taken = world.take_item_at(&pos, "bottle_mystery").expect("item");
        assert_eq!(taken.template_id, "dream_bottle");
        assert!(world.find_item_at(&pos, "bottle_mystery").is_none());
        // Second take loses the race.
        assert!(world.take_item_at(&pos, "bottle_mystery").is_none());

        world.place_item_at(&pos, taken).expect("place");
        assert!(world.find_item_at(&pos, "bottle_mystery").is_some());
    }

    #[test]
    fn test_find_item_in_area_searches_spots() {
        let world = test_world();
        let area_pos = Position::new("woander_store", "main_room");
        assert!(world.find_item_at(&area_pos, "bottle_mystery").is_none());
        assert!(world.find_item_in_area(&area_pos, "bottle_mystery").is_some());
    }

    #[test]
    fn test_resolve_destination_spot() {
        let world = test_world();
        let from = Position::new("woander_store", "main_room");
        let resolved = world.resolve_destination(&from, "spot_5").expect("spot");
        assert_eq!(resolved.spot.as_deref(), Some("spot_5"));

        // Same spot from another area of the location: known but two hops.
        let from_back = Position::new("woander_store", "back_room");
        let err = world
            .resolve_destination(&from_back, "spot_5")
            .expect_err("unreachable");
        assert_eq!(err.code(), "NotReachable");
    }

    #[test]
    fn test_resolve_destination_area_and_location() {
        let world = test_world();
        let from = spot_position();

        let area = world.resolve_destination(&from, "back_room").expect("area");
        assert_eq!(area, Position::new("woander_store", "back_room"));

        // back_room declares no link back, so the reverse hop is refused.
        let reverse = world
            .resolve_destination(&area, "main_room")
            .expect_err("unlinked sibling");
        assert_eq!(reverse.code(), "NotReachable");

        let location = world
            .resolve_destination(&from, "fairy_door_main")
            .expect("location");
        assert_eq!(location, Position::new("fairy_door_main", "clearing"));
    }

    #[test]
    fn test_resolve_destination_unknown_vs_unreachable() {
        let world = test_world();
        let from = Position::new("fairy_door_main", "clearing");

        let unknown = world
            .resolve_destination(&from, "the_moon")
            .expect_err("unknown");
        assert_eq!(unknown.code(), "UnknownDestination");

        // woander_store exists but fairy_door_main declares no exit to it.
        let unreachable = world
            .resolve_destination(&from, "woander_store")
            .expect_err("unreachable");
        assert_eq!(unreachable.code(), "NotReachable");
    }

    #[test]
    fn test_npc_presence() {
        let world = test_world();
        let at_npc = Position::new("fairy_door_main", "clearing");
        assert_eq!(world.npcs_at(&at_npc).count(), 1);
        let elsewhere = Position::new("woander_store", "main_room");
        assert_eq!(world.npcs_at(&elsewhere).count(), 0);
    }

    #[test]
    fn test_from_template_resets_metadata() {
        let mut template = test_world();
        template.metadata.version = 17;
        let now = Utc::now();
        let fresh = WorldDocument::from_template(&template, now);
        assert_eq!(fresh.metadata.version, 0);
        assert_eq!(fresh.metadata.created_at, now);
        assert_eq!(fresh.locations.len(), template.locations.len());
    }

    #[test]
    fn test_metadata_touch() {
        let mut meta = DocMetadata::new(Utc::now());
        assert_eq!(meta.version, 0);
        meta.touch(Utc::now());
        meta.touch(Utc::now());
        assert_eq!(meta.version, 2);
    }

    #[test]
    fn test_item_container_path() {
        assert_eq!(
            WorldDocument::item_container_path(&spot_position()),
            "locations.woander_store.areas.main_room.spots.spot_5.items"
        );
        assert_eq!(
            WorldDocument::item_container_path(&Position::new("woander_store", "main_room")),
            "locations.woander_store.areas.main_room.items"
        );
    }
}
