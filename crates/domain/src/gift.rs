//! Declarative NPC gift hooks.
//!
//! An NPC template may declare a rule table describing what it accepts and
//! what happens as gifts accumulate ("each dream_bottle increments
//! `bottles_collected`; at 4, the quest completes"). Rules are plain data
//! evaluated in code; the LLM never participates.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::update::WorldChange;
use crate::world::{ItemInstance, JsonMap, Npc};

/// What happens once a gift rule's counter reaches its threshold.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GiftCompletion {
    #[serde(default)]
    pub quest_id: Option<String>,
    /// NPC state keys to set on completion (e.g. `quest_active: false`).
    #[serde(default)]
    pub set_state: BTreeMap<String, Value>,
    #[serde(default)]
    pub dialogue: Option<String>,
}

/// One declarative gift rule.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GiftRule {
    /// Template ids this rule accepts.
    pub accepts: Vec<String>,
    /// NPC state counter to increment per accepted gift.
    #[serde(default)]
    pub counter: Option<String>,
    /// `global_state` counter to increment per accepted gift.
    #[serde(default)]
    pub global_counter: Option<String>,
    /// Counter value at which the completion fires.
    #[serde(default)]
    pub complete_at: Option<u64>,
    /// Dialogue for an accepted (non-completing) gift.
    #[serde(default)]
    pub dialogue: Option<String>,
    #[serde(default)]
    pub completion: Option<GiftCompletion>,
}

impl GiftRule {
    pub fn accepts_template(&self, template_id: &str) -> bool {
        self.accepts.iter().any(|t| t == template_id)
    }
}

/// The evaluated result of handing one item to an NPC.
#[derive(Debug, Clone, Default)]
pub struct GiftOutcome {
    pub accepted: bool,
    pub dialogue_text: Option<String>,
    /// World deltas beyond the inventory removal itself.
    pub world_changes: Vec<WorldChange>,
    /// View deltas (quest state updates).
    pub view_changes: Vec<WorldChange>,
    /// Surfaced in `action_response.metadata.hook_result.quest_updates`.
    pub quest_updates: JsonMap,
}

fn bump_counter(state: &mut JsonMap, key: &str) -> u64 {
    let next = state.get(key).and_then(Value::as_u64).unwrap_or(0) + 1;
    state.insert(key.to_string(), Value::from(next));
    next
}

/// Evaluate an NPC's gift hook for one given item, mutating the NPC state
/// and `global_state` in place and returning the deltas to record.
pub fn apply_gift(
    npc_id: &str,
    npc: &mut Npc,
    global_state: &mut JsonMap,
    item: &ItemInstance,
) -> GiftOutcome {
    let Some(rule) = npc
        .gift_rules
        .iter()
        .find(|r| r.accepts_template(&item.template_id))
        .cloned()
    else {
        let name = npc.name.clone().unwrap_or_else(|| npc_id.to_string());
        return GiftOutcome {
            accepted: false,
            dialogue_text: Some(format!("{name} politely declines the {}.", item.semantic_name)),
            ..GiftOutcome::default()
        };
    };

    let mut outcome = GiftOutcome {
        accepted: true,
        dialogue_text: rule.dialogue.clone(),
        ..GiftOutcome::default()
    };

    let mut counter_value = None;
    if let Some(counter) = &rule.counter {
        let value = bump_counter(&mut npc.state, counter);
        counter_value = Some(value);
        outcome.world_changes.push(WorldChange::Set {
            path: format!("npcs.{npc_id}.state.{counter}"),
            value: Value::from(value),
        });
    }

    if let Some(global_counter) = &rule.global_counter {
        let value = bump_counter(global_state, global_counter);
        outcome.world_changes.push(WorldChange::Set {
            path: format!("global_state.{global_counter}"),
            value: Value::from(value),
        });
    }

    let completed = match (rule.complete_at, counter_value) {
        (Some(threshold), Some(value)) => value >= threshold,
        _ => false,
    };

    if completed {
        if let Some(completion) = &rule.completion {
            for (key, value) in &completion.set_state {
                npc.state.insert(key.clone(), value.clone());
                outcome.world_changes.push(WorldChange::Set {
                    path: format!("npcs.{npc_id}.state.{key}"),
                    value: value.clone(),
                });
            }
            if let Some(quest_id) = &completion.quest_id {
                outcome.view_changes.push(WorldChange::Set {
                    path: format!("progress.quest_states.{quest_id}"),
                    value: Value::from("complete"),
                });
                outcome
                    .quest_updates
                    .insert("quest_id".to_string(), Value::from(quest_id.clone()));
            }
            if completion.dialogue.is_some() {
                outcome.dialogue_text = completion.dialogue.clone();
            }
        }
        outcome
            .quest_updates
            .insert("quest_complete".to_string(), Value::Bool(true));
    }

    outcome
}
