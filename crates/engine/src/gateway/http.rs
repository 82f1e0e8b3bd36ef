//! Non-streaming HTTP interaction endpoint.
//!
//! `POST /experience/interact` is the chat-service integration surface:
//! one natural-language message in, one narrative response out, with the
//! same dispatch pipeline (and therefore versioning and broadcast) as the
//! WebSocket plane.

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    Json,
};

use crate::app::SharedApp;
use crate::commands::dispatch::{parse_invocation, ActionRequest};
use crate::handlers::{ActionContext, RESERVED_ACTIONS};
use crate::infrastructure::AuthClaims;
use wayfarer_shared::{InteractRequest, InteractResponse};

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(axum::http::header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}

async fn authenticate(
    app: &SharedApp,
    headers: &HeaderMap,
) -> Result<AuthClaims, (StatusCode, String)> {
    let token = bearer_token(headers)
        .ok_or((StatusCode::UNAUTHORIZED, "missing bearer token".to_string()))?;
    app.verifier
        .verify(token)
        .await
        .map_err(|err| (StatusCode::UNAUTHORIZED, err.to_string()))
}

pub async fn interact(
    State(app): State<SharedApp>,
    headers: HeaderMap,
    Json(request): Json<InteractRequest>,
) -> Result<Json<InteractResponse>, (StatusCode, String)> {
    let claims = authenticate(&app, &headers).await?;

    // Explicit experience wins; otherwise fall back to the profile unless
    // the caller forces an explicit selection.
    let experience = match (&request.experience, request.force_experience_selection) {
        (Some(experience), _) => Some(experience.clone()),
        (None, true) => None,
        (None, false) => app
            .state
            .get_current_experience(&claims.player_id)
            .await
            .map_err(|err| (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()))?,
    };

    let Some(experience) = experience else {
        let available = app.state.list_experiences().await.unwrap_or_default();
        let mut metadata = serde_json::Map::new();
        metadata.insert(
            "available_experiences".to_string(),
            serde_json::to_value(&available).unwrap_or(serde_json::Value::Null),
        );
        return Ok(Json(InteractResponse {
            success: false,
            narrative: "Which experience would you like to enter?".to_string(),
            experience: None,
            state_updates: None,
            available_actions: available.iter().map(|e| format!("enter {e}")).collect(),
            metadata,
        }));
    };

    if let Err(err) = app
        .state
        .ensure_player_initialized(&experience, &claims.player_id)
        .await
    {
        return Ok(Json(failure_response(Some(experience), err)));
    }
    if let Err(err) = app
        .state
        .set_current_experience(&claims.player_id, Some(experience.clone()))
        .await
    {
        return Ok(Json(failure_response(Some(experience), err)));
    }

    let (action, payload) = parse_invocation(&request.message);
    let result = app
        .dispatcher
        .dispatch(ActionRequest {
            ctx: ActionContext {
                experience: experience.clone(),
                player: claims.player_id.clone(),
                admin: claims.admin,
            },
            action,
            payload,
        })
        .await;

    let mut metadata = result.response.metadata;
    if let Some(code) = &result.response.code {
        metadata.insert(
            "code".to_string(),
            serde_json::Value::String(code.clone()),
        );
    }

    let available_actions = if result.available_actions.is_empty() {
        default_actions(&app, &experience).await
    } else {
        result.available_actions
    };

    Ok(Json(InteractResponse {
        success: result.response.success,
        narrative: result.response.message,
        experience: Some(experience),
        state_updates: result.state_updates,
        available_actions,
        metadata,
    }))
}

fn failure_response(
    experience: Option<wayfarer_domain::ExperienceId>,
    err: wayfarer_domain::GameError,
) -> InteractResponse {
    let mut metadata = serde_json::Map::new();
    metadata.insert(
        "code".to_string(),
        serde_json::Value::String(err.code().to_string()),
    );
    InteractResponse {
        success: false,
        narrative: err.to_string(),
        experience,
        state_updates: None,
        available_actions: Vec::new(),
        metadata,
    }
}

/// Reserved actions plus the experience's discovered player commands.
async fn default_actions(app: &SharedApp, experience: &wayfarer_domain::ExperienceId) -> Vec<String> {
    let mut actions: Vec<String> = RESERVED_ACTIONS.iter().map(|a| a.to_string()).collect();
    if let Ok(records) = app.registry.list(experience).await {
        actions.extend(
            records
                .iter()
                .filter(|r| !r.definition.requires_admin)
                .map(|r| r.definition.command.clone()),
        );
    }
    actions
}
