//! Use item use case.
//!
//! Applies an inventory item's declarative effects block to the player's
//! view. Recognized effect keys: `restore_health`, `apply_status`, `set`,
//! `unset`. Consumable items leave the inventory after application.

use std::sync::Arc;

use serde_json::Value;

use crate::state::StateManager;
use wayfarer_domain::{path, GameError, ItemInstance, JsonMap, PlayerView, WorldChange};

use super::{build_update, ActionContext, ActionOutcome};

const DEFAULT_MAX_HEALTH: i64 = 100;

pub struct UseItem {
    state: Arc<StateManager>,
}

/// Path roots an item effect may write to.
fn view_scoped(p: &str) -> bool {
    p.starts_with("player.") || p.starts_with("progress.")
}

/// Apply one item's effects to the view, returning the change deltas.
fn apply_effects(
    view: &mut PlayerView,
    effects: &JsonMap,
) -> Result<Vec<WorldChange>, GameError> {
    let mut changes = Vec::new();

    if let Some(amount) = effects.get("restore_health").and_then(Value::as_i64) {
        let max_health = view
            .player
            .stats
            .get("max_health")
            .and_then(Value::as_i64)
            .unwrap_or(DEFAULT_MAX_HEALTH);
        let health = view
            .player
            .stats
            .get("health")
            .and_then(Value::as_i64)
            .unwrap_or(max_health);
        let restored = (health + amount).min(max_health);
        view.player
            .stats
            .insert("health".to_string(), Value::from(restored));
        changes.push(WorldChange::Set {
            path: "player.stats.health".to_string(),
            value: Value::from(restored),
        });
    }

    if let Some(status) = effects.get("apply_status").and_then(Value::as_object) {
        let name = status
            .get("name")
            .and_then(Value::as_str)
            .ok_or_else(|| GameError::InvalidStateUpdate("apply_status needs a name".into()))?;
        let duration = status.get("duration").cloned().unwrap_or(Value::Null);
        let statuses = view
            .player
            .stats
            .entry("status".to_string())
            .or_insert_with(|| Value::Object(JsonMap::new()));
        match statuses.as_object_mut() {
            Some(map) => {
                map.insert(name.to_string(), duration.clone());
            }
            None => {
                return Err(GameError::InvalidStateUpdate(
                    "stats.status is not an object".into(),
                ))
            }
        }
        changes.push(WorldChange::Set {
            path: format!("player.stats.status.{name}"),
            value: duration,
        });
    }

    // set/unset are generic but stay scoped to the view document.
    if let Some(set) = effects.get("set").and_then(Value::as_object) {
        let target = set
            .get("path")
            .and_then(Value::as_str)
            .ok_or_else(|| GameError::InvalidStateUpdate("set effect needs a path".into()))?;
        if !view_scoped(target) {
            return Err(GameError::InvalidStateUpdate(format!(
                "item effect path '{target}' is not view-scoped"
            )));
        }
        let value = set.get("value").cloned().unwrap_or(Value::Null);
        let mut raw = serde_json::to_value(&*view)
            .map_err(|e| GameError::internal(e.to_string()))?;
        path::set(&mut raw, target, value.clone())?;
        *view = serde_json::from_value(raw)
            .map_err(|e| GameError::InvalidStateUpdate(e.to_string()))?;
        changes.push(WorldChange::Set {
            path: target.to_string(),
            value,
        });
    }

    if let Some(unset) = effects.get("unset").and_then(Value::as_object) {
        let target = unset
            .get("path")
            .and_then(Value::as_str)
            .ok_or_else(|| GameError::InvalidStateUpdate("unset effect needs a path".into()))?;
        if !view_scoped(target) {
            return Err(GameError::InvalidStateUpdate(format!(
                "item effect path '{target}' is not view-scoped"
            )));
        }
        let mut raw = serde_json::to_value(&*view)
            .map_err(|e| GameError::internal(e.to_string()))?;
        path::unset(&mut raw, target)?;
        *view = serde_json::from_value(raw)
            .map_err(|e| GameError::InvalidStateUpdate(e.to_string()))?;
        changes.push(WorldChange::Set {
            path: target.to_string(),
            value: Value::Null,
        });
    }

    Ok(changes)
}

impl UseItem {
    pub fn new(state: Arc<StateManager>) -> Self {
        Self { state }
    }

    pub async fn execute(
        &self,
        ctx: &ActionContext,
        instance_id: &str,
    ) -> Result<ActionOutcome, GameError> {
        let view = self
            .state
            .get_player_view(&ctx.experience, &ctx.player)
            .await?;
        let item: ItemInstance = view
            .find_item(instance_id)
            .ok_or_else(|| GameError::NotInInventory(instance_id.to_string()))?
            .clone();
        let effects = item.effects.clone().filter(|e| !e.is_empty()).ok_or_else(|| {
            GameError::NotUsable(format!("The {} has no obvious use.", item.semantic_name))
        })?;

        // Validate against a scratch copy first, so a bad effects block
        // fails before any version is spent.
        {
            let mut scratch = view.clone();
            apply_effects(&mut scratch, &effects)?;
        }

        // The world document itself is untouched, but the mutation still
        // counts: accepted commands are totally ordered by world version.
        let mutation = self
            .state
            .update_world_state(&ctx.experience, Some(&ctx.player), None, |_world| Ok(vec![]))
            .await?;

        let consumable = item.consumable;
        let view_mutation = self
            .state
            .update_player_view(&ctx.experience, &ctx.player, |view| {
                let mut changes = apply_effects(view, &effects)?;
                if consumable {
                    view.remove_item(instance_id);
                    changes.push(WorldChange::Remove {
                        path: "player.inventory".to_string(),
                        item_id: instance_id.to_string(),
                    });
                }
                view.touch_session(chrono::Utc::now());
                Ok(changes)
            })
            .await?;

        let update = build_update(
            ctx,
            mutation.world.metadata.version,
            vec![],
            view_mutation.changes,
        );
        Ok(
            ActionOutcome::mutated(format!("You use the {}.", item.semantic_name), update)
                .with_metadata("instance_id", serde_json::json!(item.instance_id))
                .with_metadata("consumed", serde_json::json!(consumable)),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_fixtures::Fixture;
    use serde_json::json;
    use wayfarer_domain::PlayerId;

    async fn setup_with_item(effects: Value, consumable: bool) -> (Fixture, Arc<StateManager>, ActionContext) {
        let fixture = Fixture::shared().await;
        let state = Arc::new(fixture.state_manager());
        let ctx = ActionContext {
            experience: fixture.experience.clone(),
            player: PlayerId::new("alice"),
            admin: false,
        };
        state
            .ensure_player_initialized(&ctx.experience, &ctx.player)
            .await
            .expect("init");
        state
            .update_player_view(&ctx.experience, &ctx.player, |view| {
                let mut item = ItemInstance::new("tonic_1", "tonic", "herbal tonic");
                item.consumable = consumable;
                item.effects = effects.as_object().cloned();
                view.player.inventory.push(item);
                Ok(vec![])
            })
            .await
            .expect("seed");
        (fixture, state, ctx)
    }

    #[tokio::test]
    async fn test_restore_health_clamps_to_max() {
        let (_fixture, state, ctx) =
            setup_with_item(json!({ "restore_health": 30 }), true).await;
        state
            .update_player_view(&ctx.experience, &ctx.player, |view| {
                view.player.stats.insert("health".to_string(), json!(80));
                Ok(vec![])
            })
            .await
            .expect("hurt");

        let outcome = UseItem::new(state.clone())
            .execute(&ctx, "tonic_1")
            .await
            .expect("use");

        let view = state
            .get_player_view(&ctx.experience, &ctx.player)
            .await
            .expect("view");
        assert_eq!(view.player.stats.get("health"), Some(&json!(100)));
        // Consumed.
        assert!(!view.has_item("tonic_1"));

        let update = outcome.update.expect("update");
        assert!(update
            .changes
            .iter()
            .any(|c| c.path() == "view.player.stats.health"));
        assert!(update
            .changes
            .iter()
            .any(|c| matches!(c, WorldChange::Remove { .. })));
        // View-only mutation still bumps the world version.
        assert_eq!(update.version, 1);
    }

    #[tokio::test]
    async fn test_apply_status_and_set() {
        let (_fixture, state, ctx) = setup_with_item(
            json!({
                "apply_status": { "name": "glowing", "duration": 3 },
                "set": { "path": "progress.quest_states.tonic_tasted", "value": "done" }
            }),
            false,
        )
        .await;

        UseItem::new(state.clone())
            .execute(&ctx, "tonic_1")
            .await
            .expect("use");

        let view = state
            .get_player_view(&ctx.experience, &ctx.player)
            .await
            .expect("view");
        assert_eq!(
            view.player.stats.get("status"),
            Some(&json!({ "glowing": 3 }))
        );
        assert_eq!(
            view.progress.quest_states.get("tonic_tasted"),
            Some(&json!("done"))
        );
        // Not consumable: still held.
        assert!(view.has_item("tonic_1"));
    }

    #[tokio::test]
    async fn test_not_usable_without_effects() {
        let (_fixture, state, ctx) = setup_with_item(json!({}), false).await;
        let err = UseItem::new(state.clone())
            .execute(&ctx, "tonic_1")
            .await
            .expect_err("no effects");
        assert_eq!(err.code(), "NotUsable");

        let err = UseItem::new(state)
            .execute(&ctx, "ghost_item")
            .await
            .expect_err("not held");
        assert_eq!(err.code(), "NotInInventory");
    }

    #[tokio::test]
    async fn test_world_scoped_effect_rejected_without_writes() {
        let (_fixture, state, ctx) = setup_with_item(
            json!({ "set": { "path": "npcs.louisa.state.mood", "value": "hexed" } }),
            true,
        )
        .await;

        let err = UseItem::new(state.clone())
            .execute(&ctx, "tonic_1")
            .await
            .expect_err("world-scoped");
        assert_eq!(err.code(), "InvalidStateUpdate");

        // Validation happened before any version was spent.
        let world = state
            .get_world_state(&ctx.experience, None)
            .await
            .expect("world");
        assert_eq!(world.metadata.version, 0);
        let view = state
            .get_player_view(&ctx.experience, &ctx.player)
            .await
            .expect("view");
        assert!(view.has_item("tonic_1"));
    }
}
