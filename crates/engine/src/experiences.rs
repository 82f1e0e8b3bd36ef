//! Experience catalog: config loading, validation, and caching.
//!
//! A config is parsed and validated on first reference and cached for the
//! process lifetime. An invalid config refuses that one experience; the
//! rest of the catalog stays serviceable. `invalidate` is the force-reload
//! hook.

use std::sync::Arc;

use dashmap::DashMap;
use serde::Serialize;

use crate::infrastructure::{FileStore, StoreError};
use crate::state::paths;
use wayfarer_domain::{ExperienceConfig, ExperienceId, GameError, StateModel};

/// Summary returned by `get_experience_info`.
#[derive(Debug, Clone, Serialize)]
pub struct ExperienceInfo {
    pub id: ExperienceId,
    pub name: String,
    pub version: String,
    pub state_model: StateModel,
    pub multiplayer: bool,
    pub capabilities: Vec<String>,
}

pub struct ExperienceCatalog {
    store: Arc<FileStore>,
    cache: DashMap<ExperienceId, Arc<ExperienceConfig>>,
}

impl ExperienceCatalog {
    pub fn new(store: Arc<FileStore>) -> Self {
        Self {
            store,
            cache: DashMap::new(),
        }
    }

    /// Load (or fetch from cache) the validated config for an experience.
    pub async fn load_config(
        &self,
        experience: &ExperienceId,
    ) -> Result<Arc<ExperienceConfig>, GameError> {
        if let Some(cached) = self.cache.get(experience) {
            return Ok(cached.clone());
        }

        let rel = paths::config_path(experience);
        let config: ExperienceConfig = match self.store.read(&rel).await {
            Ok(config) => config,
            Err(StoreError::NotFound(_)) => {
                return Err(GameError::not_found(format!("experience {experience}")))
            }
            Err(StoreError::Serialization { message, .. }) => {
                return Err(GameError::config_invalid(format!("{experience}: {message}")))
            }
            Err(err) => return Err(err.into()),
        };

        if config.id != *experience {
            return Err(GameError::config_invalid(format!(
                "config id '{}' does not match directory '{}'",
                config.id, experience
            )));
        }
        config.validate()?;

        let config = Arc::new(config);
        self.cache.insert(experience.clone(), config.clone());
        tracing::debug!("Loaded experience config: {}", experience);
        Ok(config)
    }

    /// Force-reload hook: the next `load_config` re-reads from disk.
    pub fn invalidate(&self, experience: &ExperienceId) {
        self.cache.remove(experience);
    }

    pub fn invalidate_all(&self) {
        self.cache.clear();
    }

    /// Ids of experiences that have a config.json on disk (valid or not).
    pub async fn list(&self) -> Result<Vec<ExperienceId>, GameError> {
        let mut ids = Vec::new();
        for name in self.store.list(paths::EXPERIENCES_ROOT).await? {
            let id = ExperienceId::new(&name);
            if self.store.exists(&paths::config_path(&id)).await {
                ids.push(id);
            }
        }
        Ok(ids)
    }

    pub async fn info(&self, experience: &ExperienceId) -> Result<ExperienceInfo, GameError> {
        let config = self.load_config(experience).await?;
        Ok(ExperienceInfo {
            id: config.id.clone(),
            name: config.name.clone(),
            version: config.version.clone(),
            state_model: config.state.model,
            multiplayer: config.multiplayer.enabled,
            capabilities: config
                .capabilities
                .iter()
                .filter(|(_, v)| v.as_bool().unwrap_or(true))
                .map(|(k, _)| k.clone())
                .collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_fixtures::Fixture;

    #[tokio::test]
    async fn test_load_validate_and_cache() {
        let fixture = Fixture::shared().await;
        let catalog = ExperienceCatalog::new(fixture.store.clone());

        let config = catalog.load_config(&fixture.experience).await.expect("load");
        assert_eq!(config.state.model, StateModel::Shared);

        // Second load hits the cache even if the file disappears.
        fixture
            .store
            .delete(&paths::config_path(&fixture.experience))
            .await
            .expect("delete");
        assert!(catalog.load_config(&fixture.experience).await.is_ok());

        // Invalidate forces a re-read, which now fails.
        catalog.invalidate(&fixture.experience);
        let err = catalog
            .load_config(&fixture.experience)
            .await
            .expect_err("gone");
        assert_eq!(err.code(), "NotFound");
    }

    #[tokio::test]
    async fn test_invalid_config_refused() {
        let fixture = Fixture::shared().await;
        let catalog = ExperienceCatalog::new(fixture.store.clone());

        // Break the cross-field rule: shared without multiplayer.
        let broken = ExperienceId::new("broken");
        fixture
            .write_json(
                &paths::config_path(&broken),
                serde_json::json!({
                    "id": "broken",
                    "name": "Broken",
                    "state": { "model": "shared" },
                    "multiplayer": { "enabled": false },
                    "bootstrap": {
                        "player_starting_location": { "location": "a", "area": "b" }
                    }
                }),
            )
            .await;

        let err = catalog.load_config(&broken).await.expect_err("invalid");
        assert_eq!(err.code(), "ConfigInvalid");

        // The valid experience still loads.
        assert!(catalog.load_config(&fixture.experience).await.is_ok());
    }

    #[tokio::test]
    async fn test_list_and_info() {
        let fixture = Fixture::shared().await;
        let catalog = ExperienceCatalog::new(fixture.store.clone());

        let listed = catalog.list().await.expect("list");
        assert_eq!(listed, vec![fixture.experience.clone()]);

        let info = catalog.info(&fixture.experience).await.expect("info");
        assert_eq!(info.id, fixture.experience);
        assert!(info.multiplayer);
    }
}
