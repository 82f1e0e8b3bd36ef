//! Markdown command runner.
//!
//! For invocations that resolve to a markdown command, the runner assembles
//! a prompt from the command body, the world subtree around the player, and
//! the raw message, asks the LLM for low-temperature structural output, and
//! applies the returned `state_updates` through the normal state-manager
//! discipline. The LLM call always completes before any lock is taken; if
//! validation of any update fails, the whole command fails and nothing is
//! written.

use std::sync::Arc;

use serde::Deserialize;
use serde_json::Value;

use crate::commands::registry::CommandRecord;
use crate::handlers::{build_update, ActionContext, ActionOutcome};
use crate::infrastructure::{ChatMessage, ChatRequest, LlmPort, MessageRole};
use crate::state::StateManager;
use wayfarer_domain::{
    GameError, JsonMap, PlayerView, StateScope, StateUpdateOp, WorldChange, WorldDocument,
};

/// The response contract appended to every command prompt.
const RESPONSE_CONTRACT: &str = r#"Respond with a single JSON object:
{
  "success": true | false,
  "narrative": "prose shown to the player",
  "state_updates": null | [{"path": "...", "operation": "set" | "append" | "remove", "value": ..., "item": ..., "item_id": "..."}],
  "available_actions": ["..."],
  "metadata": {}
}
Paths rooted at player., progress., session., or npc_relationships. address
the player's private view; all other paths address the world document.
Return state_updates: null for purely narrative outcomes."#;

/// The parsed LLM reply.
#[derive(Debug, Deserialize)]
struct LlmCommandResponse {
    success: bool,
    #[serde(default)]
    narrative: String,
    #[serde(default)]
    state_updates: Option<Vec<StateUpdateOp>>,
    #[serde(default)]
    available_actions: Vec<String>,
    #[serde(default)]
    metadata: JsonMap,
}

pub struct MarkdownCommandRunner {
    llm: Arc<dyn LlmPort>,
    structural_temperature: f32,
}

/// Strip optional markdown code fences around a JSON payload.
fn strip_fences(content: &str) -> &str {
    let trimmed = content.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.trim_start_matches(['\r', '\n'])
        .strip_suffix("```")
        .unwrap_or(rest)
        .trim()
}

/// The world subtree relevant to the player: their location, its exits, and
/// the NPCs present.
fn world_subtree(world: &WorldDocument, view: &PlayerView) -> Value {
    let position = view.player.position();
    let location = world.location(&position.location);
    let npcs: JsonMap = world
        .npcs_at(&position)
        .map(|(id, npc)| {
            (
                id.clone(),
                serde_json::to_value(npc).unwrap_or(Value::Null),
            )
        })
        .collect();
    serde_json::json!({
        "position": position,
        "location": location.map(|l| serde_json::to_value(l).unwrap_or(Value::Null)),
        "exits": location.map(|l| l.exits.clone()).unwrap_or_default(),
        "npcs_present": npcs,
        "global_state": world.global_state,
    })
}

impl MarkdownCommandRunner {
    pub fn new(llm: Arc<dyn LlmPort>, structural_temperature: f32) -> Self {
        Self {
            llm,
            structural_temperature,
        }
    }

    pub async fn run(
        &self,
        state: &StateManager,
        ctx: &ActionContext,
        record: &CommandRecord,
        raw_message: &str,
    ) -> Result<ActionOutcome, GameError> {
        let view = state.get_player_view(&ctx.experience, &ctx.player).await?;
        let world = state
            .get_world_state(&ctx.experience, Some(&ctx.player))
            .await?;

        let context = serde_json::json!({
            "world": world_subtree(&world, &view),
            "view": {
                "player": view.player,
                "progress": view.progress,
            },
            "message": raw_message,
        });
        let system_prompt = format!("{}\n\n{}", record.body, RESPONSE_CONTRACT);

        // LLM first, locks later: the call must never suspend while a
        // document lock is held.
        let reply = self
            .llm
            .chat(ChatRequest {
                system_prompt: Some(system_prompt),
                messages: vec![ChatMessage {
                    role: MessageRole::User,
                    content: context.to_string(),
                }],
                temperature: Some(self.structural_temperature),
                max_tokens: None,
            })
            .await
            .map_err(GameError::from)?;

        let parsed: LlmCommandResponse = serde_json::from_str(strip_fences(&reply.content))
            .map_err(|e| GameError::MalformedResponse(e.to_string()))?;

        if !parsed.success {
            let mut outcome = ActionOutcome::narrative_failure(parsed.narrative);
            outcome.metadata = parsed.metadata;
            outcome.available_actions = parsed.available_actions;
            return Ok(outcome);
        }

        let ops = parsed.state_updates.unwrap_or_default();
        if ops.is_empty() {
            let mut outcome = ActionOutcome::read_only(parsed.narrative);
            outcome.metadata = parsed.metadata;
            outcome.available_actions = parsed.available_actions;
            outcome.state_updates = Some(Vec::new());
            return Ok(outcome);
        }

        // Validate every op up front; one bad op fails the whole command.
        let mut world_changes: Vec<WorldChange> = Vec::new();
        let mut view_changes: Vec<WorldChange> = Vec::new();
        for op in &ops {
            let scope = op.scope();
            let change = op.clone().into_change()?;
            match scope {
                StateScope::World => world_changes.push(change),
                StateScope::View => view_changes.push(change),
            }
        }

        let world_ops = world_changes.clone();
        let mutation = state
            .update_world_state(&ctx.experience, Some(&ctx.player), None, |world| {
                let mut raw = serde_json::to_value(&*world)
                    .map_err(|e| GameError::internal(e.to_string()))?;
                for change in &world_ops {
                    change.apply(&mut raw)?;
                }
                *world = serde_json::from_value(raw)
                    .map_err(|e| GameError::InvalidStateUpdate(e.to_string()))?;
                Ok(world_ops.clone())
            })
            .await?;

        let view_ops = view_changes.clone();
        let view_mutation = state
            .update_player_view(&ctx.experience, &ctx.player, |view| {
                let mut raw = serde_json::to_value(&*view)
                    .map_err(|e| GameError::internal(e.to_string()))?;
                for change in &view_ops {
                    change.apply(&mut raw)?;
                }
                *view = serde_json::from_value(raw)
                    .map_err(|e| GameError::InvalidStateUpdate(e.to_string()))?;
                view.touch_session(chrono::Utc::now());
                Ok(view_ops.clone())
            })
            .await?;

        let update = build_update(
            ctx,
            mutation.world.metadata.version,
            mutation.changes,
            view_mutation.changes,
        );
        let mut outcome = ActionOutcome::mutated(parsed.narrative, update);
        outcome.metadata = parsed.metadata;
        outcome.available_actions = parsed.available_actions;
        outcome.state_updates = Some(ops);
        Ok(outcome)
    }
}
