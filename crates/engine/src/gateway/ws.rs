//! WebSocket handler for player connections.
//!
//! Per connection: verify the token, load or create the profile,
//! initialize the player for their experience, subscribe to the
//! experience's broadcast subject, send `welcome`, then process actions
//! strictly in order, one at a time. A subscriber that lags the
//! broadcast channel is marked desynced and receives a full re-sync after
//! its next action.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    http::StatusCode,
    response::IntoResponse,
};
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::mpsc;

use crate::app::SharedApp;
use crate::broadcast::subject;
use crate::commands::dispatch::{parse_invocation, ActionRequest};
use crate::handlers::ActionContext;
use crate::infrastructure::AuthClaims;
use wayfarer_domain::{ExperienceId, GameError};
use wayfarer_shared::{ClientMessage, ServerMessage};

#[derive(Debug, Deserialize)]
pub struct WsQuery {
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub experience: Option<String>,
}

/// WebSocket upgrade handler. The token is verified before the upgrade.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(query): Query<WsQuery>,
    State(app): State<SharedApp>,
) -> impl IntoResponse {
    let token = query.token.clone().unwrap_or_default();
    match app.verifier.verify(&token).await {
        Ok(claims) => ws
            .on_upgrade(move |socket| handle_socket(socket, app, claims, query.experience))
            .into_response(),
        Err(err) => (StatusCode::UNAUTHORIZED, err.to_string()).into_response(),
    }
}

/// Mutable per-connection state.
struct Connection {
    experience: Option<ExperienceId>,
    last_applied_version: Arc<AtomicU64>,
    desynced: Arc<AtomicBool>,
    subscription: Option<tokio::task::JoinHandle<()>>,
}

impl Connection {
    fn new() -> Self {
        Self {
            experience: None,
            last_applied_version: Arc::new(AtomicU64::new(0)),
            desynced: Arc::new(AtomicBool::new(false)),
            subscription: None,
        }
    }
}

async fn handle_socket(
    socket: WebSocket,
    app: SharedApp,
    claims: AuthClaims,
    experience_param: Option<String>,
) {
    let (mut ws_sender, mut ws_receiver) = socket.split();
    let client_id = uuid::Uuid::new_v4();

    let (tx, mut rx) = mpsc::unbounded_channel::<ServerMessage>();

    tracing::info!(
        "WebSocket connected: {} (player {}, admin: {})",
        client_id,
        claims.player_id,
        claims.admin
    );

    // Forward outgoing messages from the channel to the socket.
    let send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if let Ok(json) = serde_json::to_string(&msg) {
                if ws_sender.send(Message::Text(json.into())).await.is_err() {
                    break;
                }
            }
        }
    });

    let mut conn = Connection::new();

    // Pick the experience: explicit query param, else the profile's current.
    let initial_experience = match experience_param.map(ExperienceId::new) {
        Some(explicit) => Some(explicit),
        None => match app.state.get_player_profile(&claims.player_id).await {
            Ok(profile) => profile.current_experience,
            Err(err) => {
                tracing::error!("Failed to load profile for {}: {}", claims.player_id, err);
                None
            }
        },
    };

    match initial_experience {
        Some(experience) => {
            if let Err(err) = enter_experience(&app, &claims, &experience, &tx, &mut conn).await {
                let _ = tx.send(ServerMessage::Error {
                    code: err.code().to_string(),
                    message: err.to_string(),
                });
            }
        }
        None => {
            let available = app.state.list_experiences().await.unwrap_or_default();
            let mut metadata = serde_json::Map::new();
            metadata.insert(
                "available_experiences".to_string(),
                serde_json::to_value(&available).unwrap_or(serde_json::Value::Null),
            );
            let _ = tx.send(ServerMessage::Welcome {
                experience: None,
                world: None,
                view: None,
                version: 0,
                metadata,
            });
        }
    }

    // Actions are processed in arrival order; a new action is not read
    // until the previous one finishes.
    while let Some(result) = ws_receiver.next().await {
        match result {
            Ok(Message::Text(text)) => match serde_json::from_str::<ClientMessage>(&text) {
                Ok(ClientMessage::Heartbeat) => {
                    let _ = tx.send(ServerMessage::Pong);
                }
                Ok(ClientMessage::SelectExperience { experience }) => {
                    if let Some(task) = conn.subscription.take() {
                        task.abort();
                    }
                    match enter_experience(&app, &claims, &experience, &tx, &mut conn).await {
                        Ok(()) => {}
                        Err(err) => {
                            let _ = tx.send(ServerMessage::Error {
                                code: err.code().to_string(),
                                message: err.to_string(),
                            });
                        }
                    }
                }
                Ok(ClientMessage::Action { action, payload }) => {
                    let Some(experience) = conn.experience.clone() else {
                        let _ = tx.send(ServerMessage::Error {
                            code: "NotInitialized".to_string(),
                            message: "Select an experience before acting".to_string(),
                        });
                        continue;
                    };

                    let (action_token, parsed_payload) = if payload.is_empty() {
                        parse_invocation(&action)
                    } else {
                        (action.clone(), payload)
                    };

                    let result = app
                        .dispatcher
                        .dispatch(ActionRequest {
                            ctx: ActionContext {
                                experience: experience.clone(),
                                player: claims.player_id.clone(),
                                admin: claims.admin,
                            },
                            action: action_token,
                            payload: parsed_payload,
                        })
                        .await;
                    let _ = tx.send(ServerMessage::ActionResponse {
                        action,
                        response: result.response,
                    });

                    // A lagged subscriber gets a full re-sync once it acts.
                    if conn.desynced.swap(false, Ordering::SeqCst) {
                        tracing::info!(
                            "Client {} desynced on {}, forcing re-sync",
                            client_id,
                            experience
                        );
                        if let Err(err) =
                            send_welcome(&app, &claims, &experience, &tx, &conn).await
                        {
                            let _ = tx.send(ServerMessage::Error {
                                code: err.code().to_string(),
                                message: err.to_string(),
                            });
                        }
                    }
                }
                Err(err) => {
                    let _ = tx.send(ServerMessage::Error {
                        code: "MalformedInput".to_string(),
                        message: format!("Invalid message format: {err}"),
                    });
                }
            },
            Ok(Message::Close(_)) => {
                tracing::info!("WebSocket closed by client: {}", client_id);
                break;
            }
            Ok(Message::Ping(_)) => {
                let _ = tx.send(ServerMessage::Pong);
            }
            Err(err) => {
                tracing::warn!("WebSocket error for {}: {}", client_id, err);
                break;
            }
            _ => {}
        }
    }

    if let Some(task) = conn.subscription.take() {
        task.abort();
    }
    send_task.abort();
    tracing::info!("WebSocket terminated: {}", client_id);
}

/// Initialize the player in an experience, subscribe to its subject, and
/// send `welcome`.
async fn enter_experience(
    app: &SharedApp,
    claims: &AuthClaims,
    experience: &ExperienceId,
    tx: &mpsc::UnboundedSender<ServerMessage>,
    conn: &mut Connection,
) -> Result<(), GameError> {
    let config = app.state.load_config(experience).await?;
    app.state
        .ensure_player_initialized(experience, &claims.player_id)
        .await?;
    app.state
        .set_current_experience(&claims.player_id, Some(experience.clone()))
        .await?;

    conn.experience = Some(experience.clone());
    conn.desynced.store(false, Ordering::SeqCst);

    // Subscription task: filter stale versions, flag lag as desync.
    let key = subject(config.state.model, experience, Some(&claims.player_id));
    let mut receiver = app.broadcaster.subscribe(&key);
    let last_applied = conn.last_applied_version.clone();
    let desynced = conn.desynced.clone();
    let update_tx = tx.clone();
    conn.subscription = Some(tokio::spawn(async move {
        loop {
            match receiver.recv().await {
                Ok(update) => {
                    if update.version <= last_applied.load(Ordering::SeqCst) {
                        continue;
                    }
                    last_applied.store(update.version, Ordering::SeqCst);
                    if update_tx.send(ServerMessage::WorldUpdate { update }).is_err() {
                        break;
                    }
                }
                Err(tokio::sync::broadcast::error::RecvError::Lagged(missed)) => {
                    tracing::warn!("Subscriber lagged by {} updates", missed);
                    desynced.store(true, Ordering::SeqCst);
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            }
        }
    }));

    send_welcome(app, claims, experience, tx, conn).await
}

/// Send the current world + view snapshot (also the re-sync payload).
async fn send_welcome(
    app: &SharedApp,
    claims: &AuthClaims,
    experience: &ExperienceId,
    tx: &mpsc::UnboundedSender<ServerMessage>,
    conn: &Connection,
) -> Result<(), GameError> {
    let world = app
        .state
        .get_world_state(experience, Some(&claims.player_id))
        .await?;
    let view = app
        .state
        .get_player_view(experience, &claims.player_id)
        .await?;
    let version = world.metadata.version;
    conn.last_applied_version.store(version, Ordering::SeqCst);

    let mut metadata = serde_json::Map::new();
    metadata.insert(
        "position".to_string(),
        serde_json::to_value(view.player.position()).unwrap_or(serde_json::Value::Null),
    );

    let _ = tx.send(ServerMessage::Welcome {
        experience: Some(experience.clone()),
        world: serde_json::to_value(&world).ok(),
        view: serde_json::to_value(&view).ok(),
        version,
        metadata,
    });
    Ok(())
}
