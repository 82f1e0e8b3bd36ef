//! Movement use case (fast path).
//!
//! Destination is a structured identifier: a spot, an area, or a location.
//! Resolution and single-hop reachability live on the world document.

use std::sync::Arc;

use serde_json::Value;

use crate::state::StateManager;
use wayfarer_domain::{GameError, Position, WorldChange};

use super::{build_update, ActionContext, ActionOutcome};

pub struct Go {
    state: Arc<StateManager>,
}

impl Go {
    pub fn new(state: Arc<StateManager>) -> Self {
        Self { state }
    }

    pub async fn execute(
        &self,
        ctx: &ActionContext,
        destination: &str,
    ) -> Result<ActionOutcome, GameError> {
        let view = self
            .state
            .get_player_view(&ctx.experience, &ctx.player)
            .await?;
        let from = view.player.position();

        let world = self
            .state
            .get_world_state(&ctx.experience, Some(&ctx.player))
            .await?;
        let target = world.resolve_destination(&from, destination)?;

        // Movement itself is view-scoped; the accepted command still takes
        // its slot in the world's total order.
        let mutation = self
            .state
            .update_world_state(&ctx.experience, Some(&ctx.player), None, |_world| Ok(vec![]))
            .await?;

        let target_for_view = target.clone();
        let view_mutation = self
            .state
            .update_player_view(&ctx.experience, &ctx.player, |view| {
                let mut changes = vec![
                    WorldChange::Set {
                        path: "player.current_location".to_string(),
                        value: Value::from(target_for_view.location.clone()),
                    },
                    WorldChange::Set {
                        path: "player.current_area".to_string(),
                        value: Value::from(target_for_view.area.clone()),
                    },
                    WorldChange::Set {
                        path: "player.current_sublocation".to_string(),
                        value: target_for_view
                            .spot
                            .clone()
                            .map(Value::from)
                            .unwrap_or(Value::Null),
                    },
                ];
                view.player.move_to(&target_for_view);
                if view
                    .progress
                    .visited_locations
                    .insert(target_for_view.location.clone())
                {
                    changes.push(WorldChange::Append {
                        path: "progress.visited_locations".to_string(),
                        item: Value::from(target_for_view.location.clone()),
                    });
                }
                view.touch_session(chrono::Utc::now());
                Ok(changes)
            })
            .await?;

        let description = describe_arrival(&world, &target);
        let update = build_update(
            ctx,
            mutation.world.metadata.version,
            vec![],
            view_mutation.changes,
        );
        Ok(ActionOutcome::mutated(description, update)
            .with_metadata("position", serde_json::to_value(&target).unwrap_or(Value::Null)))
    }
}

fn describe_arrival(world: &wayfarer_domain::WorldDocument, position: &Position) -> String {
    if let Some(spot) = &position.spot {
        let detail = world
            .area(&position.location, &position.area)
            .and_then(|a| a.spots.get(spot))
            .and_then(|s| s.description.clone());
        return match detail {
            Some(detail) => format!("You approach {detail}."),
            None => format!("You approach {spot}."),
        };
    }
    let detail = world
        .area(&position.location, &position.area)
        .and_then(|a| a.description.clone());
    match detail {
        Some(detail) => detail,
        None => format!("You arrive at {}.", position.describe()),
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

    #[tokio::test]
    async fn test_go_spot_area_location() {
        let (_fixture, state, ctx) = setup().await;
        let go = Go::new(state.clone());

        go.execute(&ctx, "spot_5").await.expect("to spot");
        let view = state
            .get_player_view(&ctx.experience, &ctx.player)
            .await
            .expect("view");
        assert_eq!(view.player.current_sublocation.as_deref(), Some("spot_5"));

        go.execute(&ctx, "back_room").await.expect("to area");
        let view = state
            .get_player_view(&ctx.experience, &ctx.player)
            .await
            .expect("view");
        assert_eq!(view.player.current_area, "back_room");
        assert!(view.player.current_sublocation.is_none());

        go.execute(&ctx, "main_room").await.expect("back");
        let outcome = go.execute(&ctx, "fairy_door_main").await.expect("to location");
        let view = state
            .get_player_view(&ctx.experience, &ctx.player)
            .await
            .expect("view");
        assert_eq!(view.player.current_location, "fairy_door_main");
        assert_eq!(view.player.current_area, "clearing");
        assert!(view.progress.visited_locations.contains("fairy_door_main"));

        let update = outcome.update.expect("update");
        assert!(update
            .changes
            .iter()
            .any(|c| c.path() == "view.progress.visited_locations"));
    }

    #[tokio::test]
    async fn test_go_failures_leave_state_alone() {
        let (_fixture, state, ctx) = setup().await;
        let go = Go::new(state.clone());

        let err = go.execute(&ctx, "narnia").await.expect_err("unknown");
        assert_eq!(err.code(), "UnknownDestination");

        // Known location, but no exit from the store area to itself.
        let err = go.execute(&ctx, "woander_store").await.expect_err("self");
        assert_eq!(err.code(), "NotReachable");

        let world = state
            .get_world_state(&ctx.experience, None)
            .await
            .expect("world");
        assert_eq!(world.metadata.version, 0);
    }
}
