//! Examine use case (read-only).
//!
//! Looks an item up in the player's current area (spots included) or in
//! their inventory. Never writes, never emits a `WorldUpdate`.

use std::sync::Arc;

use serde_json::Value;

use crate::state::StateManager;
use wayfarer_domain::{GameError, ItemInstance};

use super::{ActionContext, ActionOutcome};

pub struct Examine {
    state: Arc<StateManager>,
}

impl Examine {
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
        let position = view.player.position();
        let world = self
            .state
            .get_world_state(&ctx.experience, Some(&ctx.player))
            .await?;

        let in_inventory = view.find_item(instance_id).is_some();
        let item: ItemInstance = match view.find_item(instance_id) {
            Some(item) => item.clone(),
            None => world
                .find_item_in_area(&position, instance_id)
                .filter(|i| i.visible || ctx.admin)
                .cloned()
                .ok_or_else(|| GameError::not_found(instance_id))?,
        };

        let description = item
            .description
            .clone()
            .unwrap_or_else(|| format!("A {}.", item.semantic_name));

        let mut outcome = ActionOutcome::read_only(description)
            .with_metadata("instance_id", Value::from(item.instance_id.clone()))
            .with_metadata("template_id", Value::from(item.template_id.clone()))
            .with_metadata("collectible", Value::from(item.collectible))
            .with_metadata("consumable", Value::from(item.consumable))
            .with_metadata("in_inventory", Value::from(in_inventory));

        // Effects are revealed to admins and to whoever holds the item.
        if in_inventory || ctx.admin {
            if let Some(effects) = &item.effects {
                outcome = outcome.with_metadata("effects", Value::Object(effects.clone()));
            }
        }
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::collect_item::CollectItem;
    use crate::test_fixtures::Fixture;
    use serde_json::json;
    use wayfarer_domain::PlayerId;

    async fn setup() -> (Fixture, Arc<StateManager>, ActionContext) {
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
        (fixture, state, ctx)
    }

    #[tokio::test]
    async fn test_examines_area_and_spot_items_without_writing() {
        let (_fixture, state, ctx) = setup().await;
        let examine = Examine::new(state.clone());

        // berry_1 sits in the area, bottle_mystery inside a spot; both are
        // inspectable from the area.
        for id in ["berry_1", "bottle_mystery"] {
            let outcome = examine.execute(&ctx, id).await.expect("examine");
            assert!(outcome.success);
            assert!(outcome.update.is_none());
        }

        // Effects hidden until the item is held.
        let outcome = examine.execute(&ctx, "berry_1").await.expect("examine");
        assert!(outcome.metadata.get("effects").is_none());

        let world = state
            .get_world_state(&ctx.experience, None)
            .await
            .expect("world");
        assert_eq!(world.metadata.version, 0);
        let view = state
            .get_player_view(&ctx.experience, &ctx.player)
            .await
            .expect("view");
        assert_eq!(view.metadata.version, 0);
    }

    #[tokio::test]
    async fn test_held_item_reveals_effects() {
        let (_fixture, state, ctx) = setup().await;
        CollectItem::new(state.clone())
            .execute(&ctx, "berry_1")
            .await
            .expect("collect");

        let outcome = Examine::new(state.clone())
            .execute(&ctx, "berry_1")
            .await
            .expect("examine");
        assert_eq!(outcome.metadata.get("in_inventory"), Some(&json!(true)));
        assert_eq!(
            outcome.metadata.get("effects"),
            Some(&json!({ "restore_health": 10 }))
        );
    }

    #[tokio::test]
    async fn test_hidden_items_need_admin() {
        let (_fixture, state, ctx) = setup().await;
        let examine = Examine::new(state.clone());

        let err = examine.execute(&ctx, "hidden_key").await.expect_err("hidden");
        assert_eq!(err.code(), "NotFound");

        let admin_ctx = ActionContext {
            admin: true,
            ..ctx.clone()
        };
        let outcome = examine
            .execute(&admin_ctx, "hidden_key")
            .await
            .expect("admin sees");
        assert_eq!(outcome.metadata.get("template_id"), Some(&json!("brass_key")));
    }
}
