//! Collect item use case.
//!
//! Moves an item from the player's current spot (or area) into their
//! inventory. In the shared model the world lock plus the version check
//! serialize concurrent collectors; the losing attempt reports
//! `AlreadyCollected` without mutating anything.

use std::sync::Arc;

use crate::state::StateManager;
use wayfarer_domain::{GameError, ItemInstance, Position, WorldChange, WorldDocument};

use super::{build_update, ActionContext, ActionOutcome};

pub struct CollectItem {
    state: Arc<StateManager>,
}

/// Where an item currently sits in the world, if anywhere.
fn locate_anywhere(world: &WorldDocument, instance_id: &str) -> Option<Position> {
    for (location_id, location) in &world.locations {
        for (area_id, area) in &location.areas {
            if area.items.iter().any(|i| i.instance_id == instance_id) {
                return Some(Position::new(location_id.clone(), area_id.clone()));
            }
            for (spot_id, spot) in &area.spots {
                if spot.items.iter().any(|i| i.instance_id == instance_id) {
                    return Some(
                        Position::new(location_id.clone(), area_id.clone()).with_spot(spot_id.clone()),
                    );
                }
            }
        }
    }
    None
}

impl CollectItem {
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

        // Template knowledge distinguishes "never existed" from "a
        // concurrent writer collected it first".
        let template = self.state.get_world_template(&ctx.experience).await?;
        let admin = ctx.admin;

        let mut taken: Option<ItemInstance> = None;
        let mutation = self
            .state
            .update_world_state(&ctx.experience, Some(&ctx.player), None, |world| {
                taken = None;
                let Some(item) = world.find_item_at(&position, instance_id) else {
                    if locate_anywhere(world, instance_id).is_some() {
                        return Err(GameError::NotAtLocation(instance_id.to_string()));
                    }
                    if locate_anywhere(&template, instance_id).is_some() {
                        return Err(GameError::AlreadyCollected(instance_id.to_string()));
                    }
                    return Err(GameError::not_found(instance_id));
                };
                if !item.visible && !admin {
                    return Err(GameError::not_found(instance_id));
                }
                if !item.collectible {
                    return Err(GameError::NotCollectible(item.semantic_name.clone()));
                }

                let item = world
                    .take_item_at(&position, instance_id)
                    .ok_or_else(|| GameError::internal("item vanished mid-mutation"))?;
                let change = WorldChange::Remove {
                    path: WorldDocument::item_container_path(&position),
                    item_id: item.instance_id.clone(),
                };
                taken = Some(item);
                Ok(vec![change])
            })
            .await?;

        let item = taken.ok_or_else(|| GameError::internal("collected item missing"))?;
        let snapshot = serde_json::json!({
            "instance_id": item.instance_id,
            "template_id": item.template_id,
            "semantic_name": item.semantic_name,
        });

        let stored = item.clone();
        let view_mutation = self
            .state
            .update_player_view(&ctx.experience, &ctx.player, |view| {
                if !view.has_item(&stored.instance_id) {
                    view.player.inventory.push(stored.clone());
                }
                view.touch_session(chrono::Utc::now());
                Ok(vec![WorldChange::Append {
                    path: "player.inventory".to_string(),
                    item: snapshot.clone(),
                }])
            })
            .await?;

        let update = build_update(
            ctx,
            mutation.world.metadata.version,
            mutation.changes,
            view_mutation.changes,
        );
        Ok(
            ActionOutcome::mutated(format!("You pick up the {}.", item.semantic_name), update)
                .with_metadata("instance_id", serde_json::json!(item.instance_id))
                .with_metadata("template_id", serde_json::json!(item.template_id)),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_fixtures::Fixture;
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

    async fn move_to_spot(state: &StateManager, ctx: &ActionContext) {
        state
            .update_player_view(&ctx.experience, &ctx.player, |view| {
                view.player.current_sublocation = Some("spot_5".to_string());
                Ok(vec![])
            })
            .await
            .expect("move");
    }

    #[tokio::test]
    async fn test_collect_moves_item_to_inventory() {
        let (_fixture, state, ctx) = setup().await;
        move_to_spot(&state, &ctx).await;

        let outcome = CollectItem::new(state.clone())
            .execute(&ctx, "bottle_mystery")
            .await
            .expect("collect");
        assert!(outcome.success);
        let update = outcome.update.expect("update");
        assert_eq!(update.version, 1);
        assert!(matches!(
            &update.changes[0],
            WorldChange::Remove { item_id, .. } if item_id == "bottle_mystery"
        ));
        assert!(update.changes[1].path().starts_with("view.player.inventory"));

        let view = state
            .get_player_view(&ctx.experience, &ctx.player)
            .await
            .expect("view");
        assert!(view.has_item("bottle_mystery"));

        let world = state
            .get_world_state(&ctx.experience, None)
            .await
            .expect("world");
        let spot = Position::new("woander_store", "main_room").with_spot("spot_5");
        assert!(world.find_item_at(&spot, "bottle_mystery").is_none());
    }

    #[tokio::test]
    async fn test_second_collect_is_already_collected() {
        let (_fixture, state, ctx) = setup().await;
        move_to_spot(&state, &ctx).await;
        let handler = CollectItem::new(state.clone());

        handler.execute(&ctx, "bottle_mystery").await.expect("first");

        let other = ActionContext {
            player: PlayerId::new("bob"),
            ..ctx.clone()
        };
        state
            .ensure_player_initialized(&other.experience, &other.player)
            .await
            .expect("init bob");
        move_to_spot(&state, &other).await;

        let err = handler
            .execute(&other, "bottle_mystery")
            .await
            .expect_err("raced");
        assert_eq!(err.code(), "AlreadyCollected");

        // The loser's inventory was never touched.
        let view = state
            .get_player_view(&other.experience, &other.player)
            .await
            .expect("view");
        assert!(!view.has_item("bottle_mystery"));
    }

    #[tokio::test]
    async fn test_concurrent_collect_race_single_winner() {
        let (_fixture, state, ctx) = setup().await;
        move_to_spot(&state, &ctx).await;

        let bob = ActionContext {
            player: PlayerId::new("bob"),
            ..ctx.clone()
        };
        state
            .ensure_player_initialized(&bob.experience, &bob.player)
            .await
            .expect("init bob");
        move_to_spot(&state, &bob).await;

        let task_a = {
            let state = state.clone();
            let ctx = ctx.clone();
            tokio::spawn(async move {
                CollectItem::new(state).execute(&ctx, "bottle_mystery").await
            })
        };
        let task_b = {
            let state = state.clone();
            let ctx = bob.clone();
            tokio::spawn(async move {
                CollectItem::new(state).execute(&ctx, "bottle_mystery").await
            })
        };

        let results = [task_a.await.expect("join"), task_b.await.expect("join")];
        let winners = results.iter().filter(|r| r.is_ok()).count();
        assert_eq!(winners, 1);
        let loser = results
            .iter()
            .find_map(|r| r.as_ref().err())
            .expect("one loser");
        assert_eq!(loser.code(), "AlreadyCollected");

        // Exactly one inventory holds the item.
        let mut holders = 0;
        for player in [&ctx.player, &bob.player] {
            let view = state
                .get_player_view(&ctx.experience, player)
                .await
                .expect("view");
            if view.has_item("bottle_mystery") {
                holders += 1;
            }
        }
        assert_eq!(holders, 1);
    }

    #[tokio::test]
    async fn test_preconditions() {
        let (_fixture, state, ctx) = setup().await;
        let handler = CollectItem::new(state.clone());

        // Bottle is at spot_5, player is in the area: one container off.
        let err = handler
            .execute(&ctx, "bottle_mystery")
            .await
            .expect_err("wrong container");
        assert_eq!(err.code(), "NotAtLocation");

        // Mailbox-style fixed item is not collectible.
        move_to_spot(&state, &ctx).await;
        let err = handler.execute(&ctx, "nonexistent").await.expect_err("unknown");
        assert_eq!(err.code(), "NotFound");

        // Hidden item is invisible to non-admins but collectable by admins.
        state
            .update_player_view(&ctx.experience, &ctx.player, |view| {
                view.player.current_sublocation = None;
                Ok(vec![])
            })
            .await
            .expect("back to area");
        let err = handler.execute(&ctx, "hidden_key").await.expect_err("hidden");
        assert_eq!(err.code(), "NotFound");

        let admin_ctx = ActionContext {
            admin: true,
            ..ctx.clone()
        };
        handler
            .execute(&admin_ctx, "hidden_key")
            .await
            .expect("admin collects hidden");
    }

    #[tokio::test]
    async fn test_failed_collect_does_not_bump_version() {
        let (_fixture, state, ctx) = setup().await;
        let handler = CollectItem::new(state.clone());

        let _ = handler.execute(&ctx, "nonexistent").await.expect_err("fail");
        let world = state
            .get_world_state(&ctx.experience, None)
            .await
            .expect("world");
        assert_eq!(world.metadata.version, 0);
    }
}
