//! Give item use case.
//!
//! Hands an inventory item to an NPC at the player's current location and
//! area, then evaluates the NPC's declarative gift hook. The hook mutates
//! NPC state and `global_state` under the world lock; relationship effects
//! land in the giver's private view.

use std::sync::Arc;

use serde_json::Value;

use crate::state::StateManager;
use wayfarer_domain::{apply_gift, ConversationEntry, GameError, GiftOutcome, WorldChange};

use super::{build_update, ActionContext, ActionOutcome};

/// Trust gained with an NPC per accepted gift.
const GIFT_TRUST_BONUS: i16 = 5;

pub struct GiveItem {
    state: Arc<StateManager>,
}

impl GiveItem {
    pub fn new(state: Arc<StateManager>) -> Self {
        Self { state }
    }

    pub async fn execute(
        &self,
        ctx: &ActionContext,
        instance_id: &str,
        target_npc_id: &str,
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

        let gift_item = item.clone();
        let mut hook: Option<GiftOutcome> = None;
        let mutation = self
            .state
            .update_world_state(&ctx.experience, Some(&ctx.player), None, |world| {
                hook = None;
                let npc = world
                    .npcs
                    .get(target_npc_id)
                    .ok_or_else(|| GameError::NpcNotFound(target_npc_id.to_string()))?;
                if !npc.is_at(&position) {
                    let name = npc.name.clone().unwrap_or_else(|| target_npc_id.to_string());
                    return Err(GameError::NotAtNpc(name));
                }

                let mut npc = world
                    .npcs
                    .get(target_npc_id)
                    .cloned()
                    .ok_or_else(|| GameError::NpcNotFound(target_npc_id.to_string()))?;
                let outcome = apply_gift(
                    target_npc_id,
                    &mut npc,
                    &mut world.global_state,
                    &gift_item,
                );
                if !outcome.accepted {
                    let name = npc.name.clone().unwrap_or_else(|| target_npc_id.to_string());
                    return Err(GameError::NotUsable(
                        outcome.dialogue_text.unwrap_or_else(|| {
                            format!("{name} has no use for the {}.", gift_item.semantic_name)
                        }),
                    ));
                }
                world.npcs.insert(target_npc_id.to_string(), npc);
                let changes = outcome.world_changes.clone();
                hook = Some(outcome);
                Ok(changes)
            })
            .await?;

        let hook = hook.ok_or_else(|| GameError::internal("gift hook result missing"))?;
        let dialogue = hook.dialogue_text.clone();
        let npc_id = target_npc_id.to_string();
        let quest_updates = hook.quest_updates.clone();
        let view_gift_changes = hook.view_changes.clone();

        let view_mutation = self
            .state
            .update_player_view(&ctx.experience, &ctx.player, |view| {
                let mut changes = vec![WorldChange::Remove {
                    path: "player.inventory".to_string(),
                    item_id: instance_id.to_string(),
                }];
                view.remove_item(instance_id);

                for change in &view_gift_changes {
                    if let WorldChange::Set { path, value } = change {
                        if let Some(quest_id) = path.strip_prefix("progress.quest_states.") {
                            view.progress
                                .quest_states
                                .insert(quest_id.to_string(), value.clone());
                        }
                    }
                }
                changes.extend(view_gift_changes.clone());

                let relationship = view.npc_relationships.entry(npc_id.clone()).or_default();
                relationship.adjust_trust(GIFT_TRUST_BONUS);
                if let Some(text) = &dialogue {
                    relationship.record_turn(ConversationEntry {
                        speaker: npc_id.clone(),
                        text: text.clone(),
                    });
                }
                view.touch_session(chrono::Utc::now());
                Ok(changes)
            })
            .await?;

        let message = hook
            .dialogue_text
            .clone()
            .unwrap_or_else(|| format!("You hand over the {}.", item.semantic_name));

        let update = build_update(
            ctx,
            mutation.world.metadata.version,
            mutation.changes,
            view_mutation.changes,
        );
        let hook_result = serde_json::json!({
            "accepted": true,
            "dialogue": hook.dialogue_text,
            "quest_updates": Value::Object(quest_updates),
        });
        Ok(ActionOutcome::mutated(message, update)
            .with_metadata("instance_id", serde_json::json!(item.instance_id))
            .with_metadata("npc", serde_json::json!(target_npc_id))
            .with_metadata("hook_result", hook_result))
    }
}
