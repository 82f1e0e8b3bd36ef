//! Command dispatch.
//!
//! Classifies each incoming action per the routing rules: `@`-prefixed
//! invocations go to the admin fast path (admin sessions only), reserved
//! structured names go to the code fast path, anything the registry
//! resolves goes to the markdown runner, and the rest is `UnknownCommand`.
//! The dispatcher owns publishing: exactly one `WorldUpdate` per accepted
//! mutation, none on failure.

use std::sync::Arc;

use serde_json::Value;

use crate::broadcast::{subject, UpdateBroadcaster};
use crate::commands::registry::CommandRegistry;
use crate::commands::runner::MarkdownCommandRunner;
use crate::handlers::{
    is_reserved_action, ActionContext, ActionOutcome, AdminHandlers, CollectItem, DropItem,
    Examine, GiveItem, Go, Inventory, UseItem,
};
use crate::state::StateManager;
use wayfarer_shared::ActionResponse;
use wayfarer_domain::{GameError, JsonMap, StateUpdateOp, WorldUpdate};

/// One classified action ready to dispatch.
#[derive(Debug, Clone)]
pub struct ActionRequest {
    pub ctx: ActionContext,
    pub action: String,
    pub payload: JsonMap,
}

/// What the gateway sends back, plus the already-published update for
/// callers that track versions.
#[derive(Debug, Clone)]
pub struct DispatchResult {
    pub response: ActionResponse,
    pub update: Option<WorldUpdate>,
    pub state_updates: Option<Vec<StateUpdateOp>>,
    pub available_actions: Vec<String>,
}

pub struct CommandDispatcher {
    state: Arc<StateManager>,
    registry: Arc<CommandRegistry>,
    runner: Arc<MarkdownCommandRunner>,
    broadcaster: Arc<UpdateBroadcaster>,
    collect_item: CollectItem,
    drop_item: DropItem,
    use_item: UseItem,
    give_item: GiveItem,
    go: Go,
    examine: Examine,
    inventory: Inventory,
    admin: AdminHandlers,
}

/// Split a free-text invocation into an action token and a structured
/// payload. Reserved and admin commands take positional arguments; anything
/// else is passed through whole for registry resolution.
pub fn parse_invocation(text: &str) -> (String, JsonMap) {
    let trimmed = text.trim();
    let mut payload = JsonMap::new();
    let mut tokens = trimmed.split_whitespace();
    let Some(head) = tokens.next() else {
        return (String::new(), payload);
    };
    let rest: Vec<&str> = tokens.collect();

    match head {
        "@edit" => {
            if rest.len() >= 4 {
                payload.insert("object_type".into(), Value::from(rest[0]));
                payload.insert("object_id".into(), Value::from(rest[1]));
                payload.insert("path".into(), Value::from(rest[2]));
                payload.insert("value".into(), Value::from(rest[3..].join(" ")));
            }
            (head.to_string(), payload)
        }
        "@examine" => {
            if rest.len() >= 2 {
                payload.insert("object_type".into(), Value::from(rest[0]));
                payload.insert("object_id".into(), Value::from(rest[1]));
            }
            (head.to_string(), payload)
        }
        "@where" => (head.to_string(), payload),
        "@reset" => {
            let confirm = rest.iter().any(|t| *t == "CONFIRM");
            if let Some(experience) = rest.iter().find(|t| **t != "CONFIRM") {
                payload.insert("experience".into(), Value::from(*experience));
            }
            payload.insert("confirm".into(), Value::Bool(confirm));
            (head.to_string(), payload)
        }
        "collect_item" | "drop_item" | "use_item" | "examine" if !rest.is_empty() => {
            payload.insert("instance_id".into(), Value::from(rest.join(" ")));
            (head.to_string(), payload)
        }
        "give_item" if rest.len() >= 2 => {
            payload.insert("instance_id".into(), Value::from(rest[0]));
            payload.insert("target_npc_id".into(), Value::from(rest[1]));
            (head.to_string(), payload)
        }
        "go" if !rest.is_empty() => {
            payload.insert("destination".into(), Value::from(rest.join(" ")));
            (head.to_string(), payload)
        }
        "inventory" if rest.is_empty() => (head.to_string(), payload),
        _ => (trimmed.to_string(), payload),
    }
}

fn required_str<'a>(payload: &'a JsonMap, key: &str) -> Result<&'a str, GameError> {
    payload
        .get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| GameError::MalformedInput(format!("missing '{key}'")))
}

impl CommandDispatcher {
    pub fn new(
        state: Arc<StateManager>,
        registry: Arc<CommandRegistry>,
        runner: Arc<MarkdownCommandRunner>,
        broadcaster: Arc<UpdateBroadcaster>,
    ) -> Self {
        Self {
            collect_item: CollectItem::new(state.clone()),
            drop_item: DropItem::new(state.clone()),
            use_item: UseItem::new(state.clone()),
            give_item: GiveItem::new(state.clone()),
            go: Go::new(state.clone()),
            examine: Examine::new(state.clone()),
            inventory: Inventory::new(state.clone()),
            admin: AdminHandlers::new(state.clone()),
            state,
            registry,
            runner,
            broadcaster,
        }
    }

    async fn route(&self, request: &ActionRequest) -> Result<ActionOutcome, GameError> {
        let ctx = &request.ctx;
        let action = request.action.as_str();
        let payload = &request.payload;

        if let Some(admin_action) = action.strip_prefix('@') {
            if !ctx.admin {
                return Err(GameError::PermissionDenied(
                    "admin commands require an admin session".to_string(),
                ));
            }
            return match admin_action {
                "edit" => {
                    self.admin
                        .edit(
                            ctx,
                            required_str(payload, "object_type")?,
                            required_str(payload, "object_id")?,
                            required_str(payload, "path")?,
                            required_str(payload, "value")?,
                        )
                        .await
                }
                "examine" => {
                    self.admin
                        .examine_object(
                            ctx,
                            required_str(payload, "object_type")?,
                            required_str(payload, "object_id")?,
                        )
                        .await
                }
                "where" => self.admin.where_am_i(ctx).await,
                "reset" => {
                    let confirm = payload
                        .get("confirm")
                        .and_then(Value::as_bool)
                        .unwrap_or(false);
                    let experience = payload.get("experience").and_then(Value::as_str);
                    self.admin.reset(ctx, experience, confirm).await
                }
                other => Err(GameError::UnknownCommand(format!("@{other}"))),
            };
        }

        if is_reserved_action(action) {
            return match action {
                "collect_item" => {
                    self.collect_item
                        .execute(ctx, required_str(payload, "instance_id")?)
                        .await
                }
                "drop_item" => {
                    self.drop_item
                        .execute(ctx, required_str(payload, "instance_id")?)
                        .await
                }
                "use_item" => {
                    self.use_item
                        .execute(ctx, required_str(payload, "instance_id")?)
                        .await
                }
                "give_item" => {
                    self.give_item
                        .execute(
                            ctx,
                            required_str(payload, "instance_id")?,
                            required_str(payload, "target_npc_id")?,
                        )
                        .await
                }
                "go" => {
                    self.go
                        .execute(ctx, required_str(payload, "destination")?)
                        .await
                }
                "examine" => {
                    self.examine
                        .execute(ctx, required_str(payload, "instance_id")?)
                        .await
                }
                "inventory" => self.inventory.execute(ctx).await,
                other => Err(GameError::UnknownCommand(other.to_string())),
            };
        }

        // Markdown path.
        let config = self.state.load_config(&ctx.experience).await?;
        match self.registry.resolve(&ctx.experience, action).await? {
            Some(record) => {
                if record.definition.requires_admin && !ctx.admin {
                    return Err(GameError::PermissionDenied(format!(
                        "'{}' requires an admin session",
                        record.definition.command
                    )));
                }
                if !record.definition.supports(config.state.model) {
                    return Err(GameError::UnknownCommand(format!(
                        "'{}' is not available in this experience",
                        record.definition.command
                    )));
                }
                self.runner.run(&self.state, ctx, &record, action).await
            }
            None => Err(GameError::UnknownCommand(action.to_string())),
        }
    }

    /// Dispatch one action. Failures never publish; successes with an
    /// update publish exactly once on the experience's subject.
    pub async fn dispatch(&self, request: ActionRequest) -> DispatchResult {
        let outcome = self.route(&request).await;
        match outcome {
            Ok(outcome) => {
                if let Some(update) = &outcome.update {
                    let config = self.state.load_config(&request.ctx.experience).await.ok();
                    if let Some(config) = config {
                        let key = subject(
                            config.state.model,
                            &request.ctx.experience,
                            Some(&request.ctx.player),
                        );
                        let reached = self.broadcaster.publish(&key, update.clone());
                        tracing::debug!(
                            "Published v{} on {} to {} subscribers",
                            update.version,
                            key,
                            reached
                        );
                    }
                }
                DispatchResult {
                    response: ActionResponse {
                        success: outcome.success,
                        message: outcome.message.clone(),
                        metadata: outcome.metadata.clone(),
                        code: None,
                    },
                    update: outcome.update,
                    state_updates: outcome.state_updates,
                    available_actions: outcome.available_actions,
                }
            }
            Err(err) => {
                let mut metadata = JsonMap::new();
                if let GameError::ConfirmationRequired { preview } = &err {
                    metadata.insert("preview".to_string(), preview.clone());
                }
                if err.is_transient() {
                    metadata.insert("transient".to_string(), Value::Bool(true));
                }
                tracing::debug!("Action '{}' failed: {}", request.action, err);
                DispatchResult {
                    response: ActionResponse {
                        success: false,
                        message: err.to_string(),
                        metadata,
                        code: Some(err.code().to_string()),
                    },
                    update: None,
                    state_updates: None,
                    available_actions: Vec::new(),
                }
            }
        }
    }
}
