//! Command registry.
//!
//! Discovers markdown commands under an experience's `game-logic/` and
//! `admin-logic/` directories, parses their frontmatter, and exposes a
//! dispatch table keyed by canonical name and every alias. The name+alias
//! space must be a unique mapping within one experience; a collision
//! refuses the experience's command set.

use std::collections::HashMap;
use std::sync::Arc;

use dashmap::DashMap;

use crate::infrastructure::FileStore;
use crate::state::paths;
use wayfarer_domain::{parse_command_markdown, CommandDefinition, ExperienceId, GameError};

/// One discovered command: frontmatter plus the markdown body the LLM
/// interprets.
#[derive(Debug, Clone)]
pub struct CommandRecord {
    pub definition: CommandDefinition,
    pub body: String,
    /// Discovered under `admin-logic/`.
    pub admin_source: bool,
}

struct CommandSet {
    by_name: HashMap<String, Arc<CommandRecord>>,
    records: Vec<Arc<CommandRecord>>,
}

pub struct CommandRegistry {
    store: Arc<FileStore>,
    cache: DashMap<ExperienceId, Arc<CommandSet>>,
}

impl CommandRegistry {
    pub fn new(store: Arc<FileStore>) -> Self {
        Self {
            store,
            cache: DashMap::new(),
        }
    }

    async fn scan_dir(
        &self,
        dir: &str,
        admin_source: bool,
        set: &mut CommandSet,
    ) -> Result<(), GameError> {
        for name in self.store.list(dir).await? {
            if !name.ends_with(".md") {
                continue;
            }
            let path = self.store.root().join(dir).join(&name);
            let text = tokio::fs::read_to_string(&path)
                .await
                .map_err(|e| GameError::internal(format!("{dir}/{name}: {e}")))?;
            let parsed = match parse_command_markdown(&text) {
                Ok(parsed) => parsed,
                Err(err) => {
                    return Err(GameError::config_invalid(format!("{dir}/{name}: {err}")))
                }
            };
            let record = Arc::new(CommandRecord {
                definition: parsed.definition,
                body: parsed.body,
                admin_source,
            });
            for alias in record.definition.all_names() {
                let key = alias.to_ascii_lowercase();
                if set.by_name.insert(key.clone(), record.clone()).is_some() {
                    return Err(GameError::config_invalid(format!(
                        "duplicate command name or alias '{key}' in {dir}/{name}"
                    )));
                }
            }
            set.records.push(record);
        }
        Ok(())
    }

    async fn load(&self, experience: &ExperienceId) -> Result<Arc<CommandSet>, GameError> {
        if let Some(cached) = self.cache.get(experience) {
            return Ok(cached.clone());
        }

        let mut set = CommandSet {
            by_name: HashMap::new(),
            records: Vec::new(),
        };
        self.scan_dir(&paths::game_logic_dir(experience), false, &mut set)
            .await?;
        self.scan_dir(&paths::admin_logic_dir(experience), true, &mut set)
            .await?;
        tracing::debug!(
            "Discovered {} commands for {}",
            set.records.len(),
            experience
        );

        let set = Arc::new(set);
        self.cache.insert(experience.clone(), set.clone());
        Ok(set)
    }

    /// Resolve an invocation to a command record. Tries an exact match on
    /// the whole invocation, then the first token, then any name/alias
    /// whose words appear contiguously in the invocation (so "I want to
    /// carefully inspect the fountain" resolves to `examine` via the
    /// `inspect` alias). Longest match wins.
    pub async fn resolve(
        &self,
        experience: &ExperienceId,
        invocation: &str,
    ) -> Result<Option<Arc<CommandRecord>>, GameError> {
        let set = self.load(experience).await?;
        let normalized = invocation.trim().to_ascii_lowercase();
        if normalized.is_empty() {
            return Ok(None);
        }

        if let Some(record) = set.by_name.get(&normalized) {
            return Ok(Some(record.clone()));
        }

        let words: Vec<&str> = normalized
            .split(|c: char| !c.is_ascii_alphanumeric() && c != '_' && c != '-')
            .filter(|w| !w.is_empty())
            .collect();
        if let Some(first) = words.first() {
            if let Some(record) = set.by_name.get(*first) {
                return Ok(Some(record.clone()));
            }
        }

        let mut best: Option<(usize, Arc<CommandRecord>)> = None;
        for (name, record) in &set.by_name {
            let name_words: Vec<&str> = name.split_whitespace().collect();
            if name_words.is_empty() {
                continue;
            }
            let matched = words
                .windows(name_words.len())
                .any(|window| window == name_words.as_slice());
            if matched {
                let length = name_words.len();
                if best.as_ref().map(|(len, _)| length > *len).unwrap_or(true) {
                    best = Some((length, record.clone()));
                }
            }
        }
        Ok(best.map(|(_, record)| record))
    }

    pub async fn list(
        &self,
        experience: &ExperienceId,
    ) -> Result<Vec<Arc<CommandRecord>>, GameError> {
        Ok(self.load(experience).await?.records.clone())
    }

    /// Invalidate the cached command set; the next reference rescans.
    pub fn reload(&self, experience: &ExperienceId) {
        self.cache.remove(experience);
    }
}
