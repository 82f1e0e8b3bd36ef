//! Admin fast-path handlers.
//!
//! Accepted only on admin-flagged sessions. Mutations run through the same
//! state-manager pipeline as player commands, so versioning and broadcast
//! behave identically.

use std::sync::Arc;

use serde_json::Value;

use crate::state::{ResetSummary, StateManager};
use wayfarer_domain::{path, GameError, WorldChange, WorldDocument, WorldUpdate};

use super::{build_update, ActionContext, ActionOutcome};

pub struct AdminHandlers {
    state: Arc<StateManager>,
}

/// Dotted path of a world object addressed as `<object_type> <object_id>`.
fn object_path(
    world: &WorldDocument,
    object_type: &str,
    object_id: &str,
) -> Result<String, GameError> {
    match object_type {
        "npc" => {
            if world.npcs.contains_key(object_id) {
                Ok(format!("npcs.{object_id}"))
            } else {
                Err(GameError::NpcNotFound(object_id.to_string()))
            }
        }
        "location" => {
            if world.locations.contains_key(object_id) {
                Ok(format!("locations.{object_id}"))
            } else {
                Err(GameError::not_found(object_id))
            }
        }
        "area" => {
            for (location_id, location) in &world.locations {
                if location.areas.contains_key(object_id) {
                    return Ok(format!("locations.{location_id}.areas.{object_id}"));
                }
            }
            Err(GameError::not_found(object_id))
        }
        "item" => {
            for (location_id, location) in &world.locations {
                for (area_id, area) in &location.areas {
                    if area.items.iter().any(|i| i.instance_id == object_id) {
                        return Ok(format!(
                            "locations.{location_id}.areas.{area_id}.items.{object_id}"
                        ));
                    }
                    for (spot_id, spot) in &area.spots {
                        if spot.items.iter().any(|i| i.instance_id == object_id) {
                            return Ok(format!(
                                "locations.{location_id}.areas.{area_id}.spots.{spot_id}.items.{object_id}"
                            ));
                        }
                    }
                }
            }
            Err(GameError::not_found(object_id))
        }
        "global" | "global_state" => Ok("global_state".to_string()),
        other => Err(GameError::MalformedInput(format!(
            "unknown object type '{other}' (expected item, npc, location, area, global)"
        ))),
    }
}

fn require_admin(ctx: &ActionContext) -> Result<(), GameError> {
    if ctx.admin {
        Ok(())
    } else {
        Err(GameError::PermissionDenied(
            "admin commands require an admin session".to_string(),
        ))
    }
}

impl AdminHandlers {
    pub fn new(state: Arc<StateManager>) -> Self {
        Self { state }
    }

    /// `@edit <object_type> <object_id> <path> <value>` — set a property
    /// inside a world object, with scalar type inference on the value.
    pub async fn edit(
        &self,
        ctx: &ActionContext,
        object_type: &str,
        object_id: &str,
        property_path: &str,
        raw_value: &str,
    ) -> Result<ActionOutcome, GameError> {
        require_admin(ctx)?;
        let value = path::parse_scalar(raw_value);

        let applied = value.clone();
        let object_type = object_type.to_string();
        let object_id = object_id.to_string();
        let property_path = property_path.to_string();
        let mutation = self
            .state
            .update_world_state(&ctx.experience, Some(&ctx.player), None, |world| {
                let base = object_path(world, &object_type, &object_id)?;
                let full_path = format!("{base}.{property_path}");

                let mut raw = serde_json::to_value(&*world)
                    .map_err(|e| GameError::internal(e.to_string()))?;
                path::set(&mut raw, &full_path, applied.clone())?;
                // Round-trip through the typed document rejects edits that
                // break the schema (wrong type on a closed field).
                *world = serde_json::from_value(raw)
                    .map_err(|e| GameError::InvalidStateUpdate(e.to_string()))?;

                Ok(vec![WorldChange::Set {
                    path: full_path,
                    value: applied.clone(),
                }])
            })
            .await?;

        let change_path = mutation.changes[0].path().to_string();
        let update = build_update(ctx, mutation.world.metadata.version, mutation.changes, vec![]);
        Ok(ActionOutcome::mutated(
            format!("Set {change_path} = {value}"),
            update,
        )
        .with_metadata("path", Value::from(change_path))
        .with_metadata("value", value))
    }

    /// `@examine <object_type> <object_id>` — full JSON of the object plus
    /// its editable scalar properties. Read-only.
    pub async fn examine_object(
        &self,
        ctx: &ActionContext,
        object_type: &str,
        object_id: &str,
    ) -> Result<ActionOutcome, GameError> {
        require_admin(ctx)?;
        let world = self
            .state
            .get_world_state(&ctx.experience, Some(&ctx.player))
            .await?;
        let base = object_path(&world, object_type, object_id)?;

        let raw = serde_json::to_value(&world).map_err(|e| GameError::internal(e.to_string()))?;
        let object = path::get(&raw, &base)
            .cloned()
            .ok_or_else(|| GameError::not_found(object_id))?;

        let editable: Vec<Value> = path::editable_properties(&object)
            .into_iter()
            .map(|(p, kind)| serde_json::json!({ "path": p, "type": kind }))
            .collect();

        Ok(
            ActionOutcome::read_only(format!("{object_type} {object_id}"))
                .with_metadata("object", object)
                .with_metadata("editable", Value::Array(editable)),
        )
    }

    /// `@where` — current position, every item in the area including hidden
    /// and non-collectible ones, and sibling areas. Read-only.
    pub async fn where_am_i(&self, ctx: &ActionContext) -> Result<ActionOutcome, GameError> {
        require_admin(ctx)?;
        let view = self
            .state
            .get_player_view(&ctx.experience, &ctx.player)
            .await?;
        let position = view.player.position();
        let world = self
            .state
            .get_world_state(&ctx.experience, Some(&ctx.player))
            .await?;

        let area = world
            .area(&position.location, &position.area)
            .ok_or_else(|| GameError::not_found(position.describe()))?;

        let mut items: Vec<Value> = Vec::new();
        let mut push_item = |container: &str, item: &wayfarer_domain::ItemInstance| {
            items.push(serde_json::json!({
                "instance_id": item.instance_id,
                "semantic_name": item.semantic_name,
                "visible": item.visible,
                "collectible": item.collectible,
                "container": container,
            }));
        };
        for item in &area.items {
            push_item("area", item);
        }
        for (spot_id, spot) in &area.spots {
            for item in &spot.items {
                push_item(spot_id, item);
            }
        }

        let sibling_areas: Vec<String> = world
            .location(&position.location)
            .map(|l| l.areas.keys().cloned().collect())
            .unwrap_or_default();
        let npcs: Vec<String> = world.npcs_at(&position).map(|(id, _)| id.clone()).collect();

        Ok(ActionOutcome::read_only(format!(
            "You are at {}.",
            position.describe()
        ))
        .with_metadata("position", serde_json::to_value(&position).unwrap_or(Value::Null))
        .with_metadata("items", Value::Array(items))
        .with_metadata(
            "areas",
            Value::Array(sibling_areas.into_iter().map(Value::from).collect()),
        )
        .with_metadata(
            "npcs",
            Value::Array(npcs.into_iter().map(Value::from).collect()),
        ))
    }

    /// `@reset [experience] [CONFIRM]`. Without CONFIRM this fails with
    /// `ConfirmationRequired` carrying the preview; with CONFIRM it resets
    /// and broadcasts the restored world.
    pub async fn reset(
        &self,
        ctx: &ActionContext,
        experience: Option<&str>,
        confirm: bool,
    ) -> Result<ActionOutcome, GameError> {
        require_admin(ctx)?;
        let target = experience
            .map(wayfarer_domain::ExperienceId::new)
            .unwrap_or_else(|| ctx.experience.clone());

        if !confirm {
            let preview = self.state.reset_experience(&target, true).await?;
            return Err(GameError::ConfirmationRequired {
                preview: serde_json::to_value(&preview)
                    .map_err(|e| GameError::internal(e.to_string()))?,
            });
        }

        let summary: ResetSummary = self.state.reset_experience(&target, false).await?;

        // Broadcast the fully restored world to shared subscribers.
        let config = self.state.load_config(&target).await?;
        let update = if config.state.model == wayfarer_domain::StateModel::Shared {
            let world = self.state.get_world_state(&target, None).await?;
            let raw =
                serde_json::to_value(&world).map_err(|e| GameError::internal(e.to_string()))?;
            let changes = ["locations", "npcs", "global_state"]
                .into_iter()
                .map(|section| WorldChange::Set {
                    path: section.to_string(),
                    value: raw.get(section).cloned().unwrap_or(Value::Null),
                })
                .collect();
            Some(WorldUpdate {
                experience: target.clone(),
                version: world.metadata.version,
                changes,
                origin_player: Some(ctx.player.clone()),
                timestamp: chrono::Utc::now(),
            })
        } else {
            None
        };

        let mut outcome = match update {
            Some(update) => ActionOutcome::mutated(
                format!(
                    "Reset {target}: {} player views deleted.",
                    summary.player_views.len()
                ),
                update,
            ),
            None => ActionOutcome::read_only(format!(
                "Reset {target}: {} player views deleted.",
                summary.player_views.len()
            )),
        };
        outcome = outcome.with_metadata(
            "reset",
            serde_json::to_value(&summary).map_err(|e| GameError::internal(e.to_string()))?,
        );
        Ok(outcome)
    }
}
