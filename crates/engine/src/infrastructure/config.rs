//! Engine configuration from the environment.

use std::path::PathBuf;

/// Process-level settings. Experience-level settings live in each
/// experience's config.json.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Root of the document tree (`experiences/`, `players/`).
    pub data_root: PathBuf,
    pub server_port: u16,
    pub llm_base_url: String,
    pub llm_model: String,
    pub llm_timeout_secs: u64,
    /// Low temperature for structural (state-update) decoding.
    pub llm_structural_temperature: f32,
    /// Higher temperature for narrative prose.
    pub llm_narrative_temperature: f32,
    /// Per-subject broadcast channel capacity.
    pub broadcast_capacity: usize,
}

pub const DEFAULT_LLM_BASE_URL: &str = "http://localhost:11434";
pub const DEFAULT_LLM_MODEL: &str = "mlx-community/gpt-oss-20b-MXFP4-Q8";

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> anyhow::Result<T> {
    match std::env::var(key) {
        Ok(raw) => raw
            .parse()
            .map_err(|_| anyhow::anyhow!("invalid value for {key}: {raw}")),
        Err(_) => Ok(default),
    }
}

impl EngineConfig {
    /// Load configuration from environment variables, failing fast on
    /// malformed values.
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Self {
            data_root: std::env::var("WAYFARER_DATA_ROOT")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("./data")),
            server_port: env_parse("SERVER_PORT", 8787)?,
            llm_base_url: std::env::var("LLM_BASE_URL")
                .unwrap_or_else(|_| DEFAULT_LLM_BASE_URL.to_string()),
            llm_model: std::env::var("LLM_MODEL")
                .unwrap_or_else(|_| DEFAULT_LLM_MODEL.to_string()),
            llm_timeout_secs: env_parse("LLM_TIMEOUT_SECS", 60)?,
            llm_structural_temperature: env_parse("LLM_STRUCTURAL_TEMPERATURE", 0.1)?,
            llm_narrative_temperature: env_parse("LLM_NARRATIVE_TEMPERATURE", 0.8)?,
            broadcast_capacity: env_parse("BROADCAST_CAPACITY", 64)?,
        })
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            data_root: PathBuf::from("./data"),
            server_port: 8787,
            llm_base_url: DEFAULT_LLM_BASE_URL.to_string(),
            llm_model: DEFAULT_LLM_MODEL.to_string(),
            llm_timeout_secs: 60,
            llm_structural_temperature: 0.1,
            llm_narrative_temperature: 0.8,
            broadcast_capacity: 64,
        }
    }
}
