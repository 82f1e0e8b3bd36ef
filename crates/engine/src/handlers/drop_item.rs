//! Drop item use case.
//!
//! Moves an item from the player's inventory back into the world at the
//! player's current spot, or the current area when no spot is entered.

use std::sync::Arc;

use crate::state::StateManager;
use wayfarer_domain::{GameError, WorldChange, WorldDocument};

use super::{build_update, ActionContext, ActionOutcome};

pub struct DropItem {
    state: Arc<StateManager>,
}

impl DropItem {
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
        let item = view
            .find_item(instance_id)
            .ok_or_else(|| GameError::NotInInventory(instance_id.to_string()))?
            .clone();
        let position = view.player.position();

        let container_path = WorldDocument::item_container_path(&position);
        let placed = item.clone();
        let mutation = self
            .state
            .update_world_state(&ctx.experience, Some(&ctx.player), None, |world| {
                world.place_item_at(&position, placed.clone())?;
                Ok(vec![WorldChange::Append {
                    path: container_path.clone(),
                    item: serde_json::to_value(&placed)
                        .map_err(|e| GameError::internal(e.to_string()))?,
                }])
            })
            .await?;

        let view_mutation = self
            .state
            .update_player_view(&ctx.experience, &ctx.player, |view| {
                view.remove_item(instance_id);
                view.touch_session(chrono::Utc::now());
                Ok(vec![WorldChange::Remove {
                    path: "player.inventory".to_string(),
                    item_id: instance_id.to_string(),
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
            ActionOutcome::mutated(format!("You set down the {}.", item.semantic_name), update)
                .with_metadata("instance_id", serde_json::json!(item.instance_id)),
        )
    }
}
