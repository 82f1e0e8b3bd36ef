//! Inventory listing (read-only).
//!
//! Groups the player's inventory by template with counts and summarizes
//! known effects.

use std::sync::Arc;

use serde_json::Value;

use crate::state::StateManager;
use wayfarer_domain::GameError;

use super::{ActionContext, ActionOutcome};

pub struct Inventory {
    state: Arc<StateManager>,
}

impl Inventory {
    pub fn new(state: Arc<StateManager>) -> Self {
        Self { state }
    }

    pub async fn execute(&self, ctx: &ActionContext) -> Result<ActionOutcome, GameError> {
        let view = self
            .state
            .get_player_view(&ctx.experience, &ctx.player)
            .await?;

        let grouped = view.inventory_grouped();
        let message = if grouped.is_empty() {
            "You aren't carrying anything.".to_string()
        } else {
            let listing: Vec<String> = grouped
                .iter()
                .map(|(_, name, count)| {
                    if *count > 1 {
                        format!("{name} x{count}")
                    } else {
                        name.clone()
                    }
                })
                .collect();
            format!("You are carrying: {}.", listing.join(", "))
        };

        let items: Vec<Value> = grouped
            .iter()
            .map(|(template_id, name, count)| {
                let effects: Vec<String> = view
                    .player
                    .inventory
                    .iter()
                    .filter(|i| &i.template_id == template_id)
                    .filter_map(|i| i.effects.as_ref())
                    .flat_map(|e| e.keys().cloned())
                    .collect();
                serde_json::json!({
                    "template_id": template_id,
                    "semantic_name": name,
                    "count": count,
                    "known_effects": effects,
                })
            })
            .collect();

        Ok(ActionOutcome::read_only(message)
            .with_metadata("items", Value::Array(items))
            .with_metadata("total", Value::from(view.player.inventory.len())))
    }
}
