//! Unified state manager.
//!
//! Central authority over world documents, player views, and profiles.
//! Mutations follow one discipline everywhere: read, apply a mutator, bump
//! `_version`, write with an expected-version check, retry on conflict with
//! a fresh read. Shared worlds additionally serialize writers through the
//! document's advisory lock.
//!
//! `ensure_player_initialized` is the single initialization entry point;
//! every other view method assumes the view exists and fails with
//! `NotInitialized` otherwise.

pub mod paths;

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;

use crate::experiences::{ExperienceCatalog, ExperienceInfo};
use crate::infrastructure::{FileStore, StoreError};
use wayfarer_domain::{
    ExperienceConfig, ExperienceId, GameError, PlayerId, PlayerProfile, PlayerView, StateModel,
    WorldChange, WorldDocument,
};

/// Bounded retries for optimistic version conflicts.
const VERSION_RETRY_LIMIT: u32 = 3;

/// Result of one accepted world mutation.
#[derive(Debug, Clone)]
pub struct WorldMutation {
    pub world: WorldDocument,
    pub changes: Vec<WorldChange>,
}

/// Result of one accepted view mutation.
#[derive(Debug, Clone)]
pub struct ViewMutation {
    pub view: PlayerView,
    pub changes: Vec<WorldChange>,
}

/// Summary returned by `reset_experience`, also used as the preview payload
/// in `ConfirmationRequired`.
#[derive(Debug, Clone, Serialize)]
pub struct ResetSummary {
    pub experience: ExperienceId,
    pub preview: bool,
    pub player_views: Vec<PlayerId>,
    pub isolated_worlds: usize,
    /// Live world version at enumeration time (shared model).
    pub world_version: u64,
    pub backup_path: Option<String>,
}

pub struct StateManager {
    store: Arc<FileStore>,
    catalog: Arc<ExperienceCatalog>,
}

impl StateManager {
    pub fn new(store: Arc<FileStore>, catalog: Arc<ExperienceCatalog>) -> Self {
        Self { store, catalog }
    }

    pub async fn load_config(
        &self,
        experience: &ExperienceId,
    ) -> Result<Arc<ExperienceConfig>, GameError> {
        self.catalog.load_config(experience).await
    }

    pub async fn list_experiences(&self) -> Result<Vec<ExperienceId>, GameError> {
        self.catalog.list().await
    }

    pub async fn get_experience_info(
        &self,
        experience: &ExperienceId,
    ) -> Result<ExperienceInfo, GameError> {
        self.catalog.info(experience).await
    }

    /// Reload hook for content changes.
    pub fn invalidate_config(&self, experience: &ExperienceId) {
        self.catalog.invalidate(experience);
    }

    // =========================================================================
    // World state
    // =========================================================================

    fn world_path(
        &self,
        config: &ExperienceConfig,
        player: Option<&PlayerId>,
    ) -> Result<String, GameError> {
        match config.state.model {
            StateModel::Shared => Ok(paths::shared_world_path(&config.id)),
            StateModel::Isolated => {
                let player = player.ok_or_else(|| {
                    GameError::MalformedInput(format!(
                        "experience {} is isolated and requires a player id",
                        config.id
                    ))
                })?;
                Ok(paths::isolated_world_path(&config.id, player))
            }
        }
    }

    /// The pristine template world for an experience.
    pub async fn get_world_template(
        &self,
        experience: &ExperienceId,
    ) -> Result<WorldDocument, GameError> {
        let rel = paths::world_template_path(experience);
        match self.store.read(&rel).await {
            Ok(world) => Ok(world),
            Err(StoreError::NotFound(_)) => Err(GameError::not_found(format!(
                "world template for {experience}"
            ))),
            Err(err) => Err(err.into()),
        }
    }

    async fn read_world_at(
        &self,
        config: &ExperienceConfig,
        rel: &str,
        player: Option<&PlayerId>,
    ) -> Result<WorldDocument, GameError> {
        match self.store.read(rel).await {
            Ok(world) => Ok(world),
            Err(StoreError::NotFound(_)) => match config.state.model {
                // Shared live world instantiates lazily from the template.
                StateModel::Shared => {
                    let template = self.get_world_template(&config.id).await?;
                    Ok(WorldDocument::from_template(&template, Utc::now()))
                }
                StateModel::Isolated => {
                    let player = player.map(|p| p.as_str().to_string()).unwrap_or_default();
                    Err(GameError::not_initialized(player, config.id.as_str()))
                }
            },
            Err(err) => Err(err.into()),
        }
    }

    /// Current world. Shared model ignores `player`; isolated requires it
    /// and returns the player's private world.
    pub async fn get_world_state(
        &self,
        experience: &ExperienceId,
        player: Option<&PlayerId>,
    ) -> Result<WorldDocument, GameError> {
        let config = self.load_config(experience).await?;
        let rel = self.world_path(&config, player)?;
        self.read_world_at(&config, &rel, player).await
    }

    /// Read → mutate → bump version → write with expected-version check.
    /// Retries with a fresh read on `VersionConflict`; surfaces `Conflict`
    /// after exhaustion. `use_locking` defaults to the config
    /// (lock shared worlds, skip single-writer isolated worlds).
    pub async fn update_world_state<F>(
        &self,
        experience: &ExperienceId,
        player: Option<&PlayerId>,
        use_locking: Option<bool>,
        mut mutator: F,
    ) -> Result<WorldMutation, GameError>
    where
        F: FnMut(&mut WorldDocument) -> Result<Vec<WorldChange>, GameError>,
    {
        let config = self.load_config(experience).await?;
        let rel = self.world_path(&config, player)?;

        let locking = use_locking.unwrap_or_else(|| config.use_locking_default());
        let _lock = if locking {
            Some(
                self.store
                    .with_lock(&rel, config.lock_timeout())
                    .await
                    .map_err(GameError::from)?,
            )
        } else {
            None
        };

        for attempt in 1..=VERSION_RETRY_LIMIT {
            let mut world = self.read_world_at(&config, &rel, player).await?;
            let read_version = world.metadata.version;

            let changes = mutator(&mut world)?;
            world.metadata.touch(Utc::now());

            let expected = config
                .state
                .optimistic_versioning
                .then_some(read_version);
            match self.store.write(&rel, &world, expected).await {
                Ok(()) => return Ok(WorldMutation { world, changes }),
                Err(StoreError::VersionConflict { .. }) => {
                    tracing::debug!(
                        "Version conflict on {} (attempt {}/{})",
                        rel,
                        attempt,
                        VERSION_RETRY_LIMIT
                    );
                    continue;
                }
                Err(err) => return Err(err.into()),
            }
        }
        Err(GameError::Conflict(rel))
    }

    // =========================================================================
    // Player views
    // =========================================================================

    /// The player's view. Does not auto-create; `ensure_player_initialized`
    /// is the only initialization path.
    pub async fn get_player_view(
        &self,
        experience: &ExperienceId,
        player: &PlayerId,
    ) -> Result<PlayerView, GameError> {
        let rel = paths::view_path(player, experience);
        match self.store.read(&rel).await {
            Ok(view) => Ok(view),
            Err(StoreError::NotFound(_)) => Err(GameError::not_initialized(
                player.as_str(),
                experience.as_str(),
            )),
            Err(err) => Err(err.into()),
        }
    }

    /// Same read-mutate-write discipline as the world, scoped to the view
    /// document. Assumes the view exists.
    pub async fn update_player_view<F>(
        &self,
        experience: &ExperienceId,
        player: &PlayerId,
        mut mutator: F,
    ) -> Result<ViewMutation, GameError>
    where
        F: FnMut(&mut PlayerView) -> Result<Vec<WorldChange>, GameError>,
    {
        let config = self.load_config(experience).await?;
        let rel = paths::view_path(player, experience);

        // Views are single-writer, but bootstrap/reset can overlap briefly.
        let _lock = self
            .store
            .with_lock(&rel, config.lock_timeout())
            .await
            .map_err(GameError::from)?;

        for _ in 0..VERSION_RETRY_LIMIT {
            let mut view = match self.store.read::<PlayerView>(&rel).await {
                Ok(view) => view,
                Err(StoreError::NotFound(_)) => {
                    return Err(GameError::not_initialized(
                        player.as_str(),
                        experience.as_str(),
                    ))
                }
                Err(err) => return Err(err.into()),
            };
            let read_version = view.metadata.version;

            let changes = mutator(&mut view)?;
            view.metadata.touch(Utc::now());

            let expected = config
                .state
                .optimistic_versioning
                .then_some(read_version);
            match self.store.write(&rel, &view, expected).await {
                Ok(()) => return Ok(ViewMutation { view, changes }),
                Err(StoreError::VersionConflict { .. }) => continue,
                Err(err) => return Err(err.into()),
            }
        }
        Err(GameError::Conflict(rel))
    }

    /// Idempotent bootstrap. Creates the view (and, for isolated
    /// experiences with `copy_template_for_isolated`, the private world),
    /// then records the experience in the player's profile.
    pub async fn ensure_player_initialized(
        &self,
        experience: &ExperienceId,
        player: &PlayerId,
    ) -> Result<PlayerView, GameError> {
        let config = self.load_config(experience).await?;
        let rel = paths::view_path(player, experience);

        let _lock = self
            .store
            .with_lock(&rel, config.lock_timeout())
            .await
            .map_err(GameError::from)?;

        match self.store.read::<PlayerView>(&rel).await {
            Ok(view) => return Ok(view),
            Err(StoreError::NotFound(_)) => {}
            Err(err) => return Err(err.into()),
        }

        let now = Utc::now();

        // The configured start must exist in the world, or every view this
        // experience creates would dangle.
        let template = self.get_world_template(experience).await?;
        let start = &config.bootstrap.player_starting_location;
        if template.area(&start.location, &start.area).is_none() {
            return Err(GameError::config_invalid(format!(
                "{experience}: bootstrap start {}/{} does not exist in the world template",
                start.location, start.area
            )));
        }

        if config.state.model == StateModel::Isolated && config.bootstrap.copy_template_for_isolated
        {
            let world_rel = paths::isolated_world_path(experience, player);
            if !self.store.exists(&world_rel).await {
                let world = WorldDocument::from_template(&template, now);
                self.store
                    .write(&world_rel, &world, None)
                    .await
                    .map_err(GameError::from)?;
                tracing::info!(
                    "Created isolated world for {} in {}",
                    player,
                    experience
                );
            }
        }

        let view = PlayerView::bootstrap(&config, now);
        self.store
            .write(&rel, &view, None)
            .await
            .map_err(GameError::from)?;
        tracing::info!("Initialized player {} for {}", player, experience);

        self.update_player_profile(player, |profile| {
            profile.record_experience(experience);
            Ok(())
        })
        .await?;

        Ok(view)
    }

    // =========================================================================
    // Profiles
    // =========================================================================

    /// The player's cross-experience profile, created on first reference.
    pub async fn get_player_profile(&self, player: &PlayerId) -> Result<PlayerProfile, GameError> {
        let rel = paths::profile_path(player);
        match self.store.read(&rel).await {
            Ok(profile) => Ok(profile),
            Err(StoreError::NotFound(_)) => {
                let _lock = self
                    .store
                    .with_lock(&rel, std::time::Duration::from_millis(5_000))
                    .await
                    .map_err(GameError::from)?;
                // Re-check under the lock.
                match self.store.read(&rel).await {
                    Ok(profile) => return Ok(profile),
                    Err(StoreError::NotFound(_)) => {}
                    Err(err) => return Err(err.into()),
                }
                let profile = PlayerProfile::new(Utc::now());
                self.store
                    .write(&rel, &profile, None)
                    .await
                    .map_err(GameError::from)?;
                Ok(profile)
            }
            Err(err) => Err(err.into()),
        }
    }

    pub async fn update_player_profile<F>(
        &self,
        player: &PlayerId,
        mut mutator: F,
    ) -> Result<PlayerProfile, GameError>
    where
        F: FnMut(&mut PlayerProfile) -> Result<(), GameError>,
    {
        let rel = paths::profile_path(player);
        let _lock = self
            .store
            .with_lock(&rel, std::time::Duration::from_millis(5_000))
            .await
            .map_err(GameError::from)?;

        for _ in 0..VERSION_RETRY_LIMIT {
            let mut profile = match self.store.read::<PlayerProfile>(&rel).await {
                Ok(profile) => profile,
                Err(StoreError::NotFound(_)) => PlayerProfile::new(Utc::now()),
                Err(err) => return Err(err.into()),
            };
            let read_version = profile.metadata.version;

            mutator(&mut profile)?;
            profile.metadata.touch(Utc::now());

            let expected = self
                .store
                .exists(&rel)
                .await
                .then_some(read_version);
            match self.store.write(&rel, &profile, expected).await {
                Ok(()) => return Ok(profile),
                Err(StoreError::VersionConflict { .. }) => continue,
                Err(err) => return Err(err.into()),
            }
        }
        Err(GameError::Conflict(rel))
    }

    /// Select the player's current experience. A non-null target must name
    /// an experience whose config loads.
    pub async fn set_current_experience(
        &self,
        player: &PlayerId,
        experience: Option<ExperienceId>,
    ) -> Result<PlayerProfile, GameError> {
        if let Some(experience) = &experience {
            self.load_config(experience).await?;
        }
        self.update_player_profile(player, |profile| {
            profile.select_experience(experience.clone());
            Ok(())
        })
        .await
    }

    pub async fn get_current_experience(
        &self,
        player: &PlayerId,
    ) -> Result<Option<ExperienceId>, GameError> {
        Ok(self.get_player_profile(player).await?.current_experience)
    }

    // =========================================================================
    // Reset
    // =========================================================================

    async fn enumerate_views(
        &self,
        experience: &ExperienceId,
    ) -> Result<Vec<PlayerId>, GameError> {
        let mut players = Vec::new();
        for name in self.store.list(paths::PLAYERS_ROOT).await? {
            let player = PlayerId::new(&name);
            if self.store.exists(&paths::view_path(&player, experience)).await {
                players.push(player);
            }
        }
        Ok(players)
    }

    /// Enumerate (preview) or perform an experience-wide reset: delete all
    /// player views, restore the world from its template behind a
    /// timestamped backup, and bump the version once more. Player profiles
    /// are never touched.
    pub async fn reset_experience(
        &self,
        experience: &ExperienceId,
        preview: bool,
    ) -> Result<ResetSummary, GameError> {
        let config = self.load_config(experience).await?;
        let player_views = self.enumerate_views(experience).await?;

        let isolated_worlds = if config.state.model == StateModel::Isolated {
            let mut count = 0;
            for name in self.store.list(&paths::isolated_players_dir(experience)).await? {
                let player = PlayerId::new(&name);
                if self
                    .store
                    .exists(&paths::isolated_world_path(experience, &player))
                    .await
                {
                    count += 1;
                }
            }
            count
        } else {
            0
        };

        let world_rel = paths::shared_world_path(experience);
        let world_version = self
            .store
            .current_version(&world_rel)
            .await
            .map_err(GameError::from)?
            .unwrap_or(0);

        let timestamp = Utc::now().timestamp();
        let summary = ResetSummary {
            experience: experience.clone(),
            preview,
            player_views: player_views.clone(),
            isolated_worlds,
            world_version,
            backup_path: Some(paths::backup_dir(experience, timestamp)),
        };

        if preview {
            return Ok(summary);
        }

        // All relevant locks first; any timeout aborts with no deletions.
        let mut locks = Vec::new();
        locks.push(
            self.store
                .with_lock(&world_rel, config.lock_timeout())
                .await
                .map_err(GameError::from)?,
        );
        for player in &player_views {
            locks.push(
                self.store
                    .with_lock(&paths::view_path(player, experience), config.lock_timeout())
                    .await
                    .map_err(GameError::from)?,
            );
        }

        // Backup live state before destroying anything.
        if self.store.exists(&world_rel).await {
            self.store
                .copy(&world_rel, &paths::backup_world_path(experience, timestamp))
                .await
                .map_err(GameError::from)?;
        }
        if config.state.model == StateModel::Isolated {
            for name in self.store.list(&paths::isolated_players_dir(experience)).await? {
                let player = PlayerId::new(&name);
                let rel = paths::isolated_world_path(experience, &player);
                if self.store.exists(&rel).await {
                    let backup = format!(
                        "{}/players/{name}/world.json",
                        paths::backup_dir(experience, timestamp)
                    );
                    self.store.copy(&rel, &backup).await.map_err(GameError::from)?;
                }
            }
        }

        for player in &player_views {
            self.store
                .delete(&paths::view_path(player, experience))
                .await
                .map_err(GameError::from)?;
        }
        self.store
            .delete_tree(&paths::isolated_players_dir(experience))
            .await
            .map_err(GameError::from)?;

        if config.state.model == StateModel::Shared {
            let template = self.get_world_template(experience).await?;
            let mut world = WorldDocument::from_template(&template, Utc::now());
            // Versions only ever move forward, reset included.
            world.metadata.version = world_version + 1;
            self.store
                .write(&world_rel, &world, None)
                .await
                .map_err(GameError::from)?;
        }

        tracing::info!(
            "Reset experience {}: {} views deleted, {} isolated worlds, backup at {:?}",
            experience,
            summary.player_views.len(),
            summary.isolated_worlds,
            summary.backup_path
        );

        Ok(ResetSummary {
            preview: false,
            ..summary
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_fixtures::Fixture;
    use serde_json::json;

    #[tokio::test]
    async fn test_world_version_counts_mutations() {
        let fixture = Fixture::shared().await;
        let state = fixture.state_manager();

        let initial = state
            .get_world_state(&fixture.experience, None)
            .await
            .expect("world");
        assert_eq!(initial.metadata.version, 0);

        for expected in 1..=3u64 {
            let mutation = state
                .update_world_state(&fixture.experience, None, None, |world| {
                    world
                        .global_state
                        .insert("tick".to_string(), json!(expected));
                    Ok(vec![])
                })
                .await
                .expect("mutate");
            assert_eq!(mutation.world.metadata.version, expected);
        }
    }

    #[tokio::test]
    async fn test_concurrent_world_mutations_serialize() {
        let fixture = Fixture::shared().await;
        let state = Arc::new(fixture.state_manager());

        let a = {
            let state = state.clone();
            let exp = fixture.experience.clone();
            tokio::spawn(async move {
                state
                    .update_world_state(&exp, None, None, |world| {
                        let count = world
                            .global_state
                            .get("count")
                            .and_then(serde_json::Value::as_u64)
                            .unwrap_or(0);
                        world
                            .global_state
                            .insert("count".to_string(), json!(count + 1));
                        Ok(vec![])
                    })
                    .await
            })
        };
        let b = {
            let state = state.clone();
            let exp = fixture.experience.clone();
            tokio::spawn(async move {
                state
                    .update_world_state(&exp, None, None, |world| {
                        let count = world
                            .global_state
                            .get("count")
                            .and_then(serde_json::Value::as_u64)
                            .unwrap_or(0);
                        world
                            .global_state
                            .insert("count".to_string(), json!(count + 1));
                        Ok(vec![])
                    })
                    .await
            })
        };

        a.await.expect("join").expect("mutation a");
        b.await.expect("join").expect("mutation b");

        let world = state
            .get_world_state(&fixture.experience, None)
            .await
            .expect("world");
        assert_eq!(world.metadata.version, 2);
        assert_eq!(world.global_state.get("count"), Some(&json!(2)));
    }

    #[tokio::test]
    async fn test_view_requires_initialization() {
        let fixture = Fixture::shared().await;
        let state = fixture.state_manager();
        let player = PlayerId::new("alice");

        let err = state
            .get_player_view(&fixture.experience, &player)
            .await
            .expect_err("uninitialized");
        assert_eq!(err.code(), "NotInitialized");

        let err = state
            .update_player_view(&fixture.experience, &player, |_| Ok(vec![]))
            .await
            .expect_err("uninitialized");
        assert_eq!(err.code(), "NotInitialized");
    }

    #[tokio::test]
    async fn test_ensure_player_initialized_idempotent() {
        let fixture = Fixture::shared().await;
        let state = fixture.state_manager();
        let player = PlayerId::new("alice");

        let first = state
            .ensure_player_initialized(&fixture.experience, &player)
            .await
            .expect("init");
        assert_eq!(first.player.current_location, "woander_store");

        // Mutate, then re-ensure: the mutation must survive.
        state
            .update_player_view(&fixture.experience, &player, |view| {
                view.player.stats.insert("health".to_string(), json!(80));
                Ok(vec![])
            })
            .await
            .expect("mutate");

        let again = state
            .ensure_player_initialized(&fixture.experience, &player)
            .await
            .expect("re-init");
        assert_eq!(again.player.stats.get("health"), Some(&json!(80)));

        let profile = state.get_player_profile(&player).await.expect("profile");
        assert!(profile
            .global_stats
            .experiences_played
            .contains(&fixture.experience));
    }

    #[tokio::test]
    async fn test_isolated_bootstrap_copies_template_per_player() {
        let fixture = Fixture::isolated().await;
        let state = fixture.state_manager();
        let c = PlayerId::new("player-c");
        let d = PlayerId::new("player-d");

        state
            .ensure_player_initialized(&fixture.experience, &c)
            .await
            .expect("init c");
        state
            .ensure_player_initialized(&fixture.experience, &d)
            .await
            .expect("init d");

        // C mutates their private world; D's stays pristine.
        state
            .update_world_state(&fixture.experience, Some(&c), None, |world| {
                world.global_state.insert("door_open".to_string(), json!(true));
                Ok(vec![])
            })
            .await
            .expect("mutate c");

        let world_c = state
            .get_world_state(&fixture.experience, Some(&c))
            .await
            .expect("world c");
        let world_d = state
            .get_world_state(&fixture.experience, Some(&d))
            .await
            .expect("world d");
        assert_eq!(world_c.global_state.get("door_open"), Some(&json!(true)));
        assert_eq!(world_d.global_state.get("door_open"), None);
        assert_eq!(world_c.metadata.version, 1);
        assert_eq!(world_d.metadata.version, 0);
    }

    #[tokio::test]
    async fn test_isolated_world_requires_player() {
        let fixture = Fixture::isolated().await;
        let state = fixture.state_manager();
        let err = state
            .get_world_state(&fixture.experience, None)
            .await
            .expect_err("player required");
        assert_eq!(err.code(), "MalformedInput");
    }

    #[tokio::test]
    async fn test_profile_lifecycle() {
        let fixture = Fixture::shared().await;
        let state = fixture.state_manager();
        let player = PlayerId::new("alice");

        let profile = state.get_player_profile(&player).await.expect("create");
        assert!(profile.current_experience.is_none());

        let updated = state
            .set_current_experience(&player, Some(fixture.experience.clone()))
            .await
            .expect("select");
        assert_eq!(updated.current_experience, Some(fixture.experience.clone()));
        assert_eq!(
            state.get_current_experience(&player).await.expect("get"),
            Some(fixture.experience.clone())
        );

        // Selecting an experience whose config does not load is refused.
        let err = state
            .set_current_experience(&player, Some(ExperienceId::new("ghost")))
            .await
            .expect_err("unknown experience");
        assert_eq!(err.code(), "NotFound");
    }

    #[tokio::test]
    async fn test_reset_preview_then_confirm() {
        let fixture = Fixture::shared().await;
        let state = fixture.state_manager();
        let alice = PlayerId::new("alice");
        let bob = PlayerId::new("bob");

        state
            .ensure_player_initialized(&fixture.experience, &alice)
            .await
            .expect("init");
        state
            .ensure_player_initialized(&fixture.experience, &bob)
            .await
            .expect("init");
        state
            .set_current_experience(&alice, Some(fixture.experience.clone()))
            .await
            .expect("select");
        state
            .update_world_state(&fixture.experience, None, None, |world| {
                world.global_state.insert("mutated".to_string(), json!(true));
                Ok(vec![])
            })
            .await
            .expect("mutate");

        let preview = state
            .reset_experience(&fixture.experience, true)
            .await
            .expect("preview");
        assert!(preview.preview);
        assert_eq!(preview.player_views.len(), 2);
        assert_eq!(preview.world_version, 1);
        // Preview changes nothing.
        assert!(state.get_player_view(&fixture.experience, &alice).await.is_ok());

        let summary = state
            .reset_experience(&fixture.experience, false)
            .await
            .expect("confirm");
        assert!(!summary.preview);

        // Views are gone, world restored from template with a bumped version.
        let err = state
            .get_player_view(&fixture.experience, &alice)
            .await
            .expect_err("deleted");
        assert_eq!(err.code(), "NotInitialized");

        let world = state
            .get_world_state(&fixture.experience, None)
            .await
            .expect("world");
        assert_eq!(world.metadata.version, 2);
        assert_eq!(world.global_state.get("mutated"), None);

        // A readable backup exists under the backup path.
        let backup = summary.backup_path.expect("backup path");
        let backed_up: serde_json::Value = fixture
            .store
            .read(&format!("{backup}/world.json"))
            .await
            .expect("backup world");
        assert_eq!(backed_up["global_state"]["mutated"], json!(true));

        // Profiles survive untouched.
        let profile = state.get_player_profile(&alice).await.expect("profile");
        assert_eq!(profile.current_experience, Some(fixture.experience.clone()));
        assert!(profile
            .global_stats
            .experiences_played
            .contains(&fixture.experience));
    }
}
