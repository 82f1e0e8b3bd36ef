//! Application composition.

use std::sync::Arc;

use crate::broadcast::UpdateBroadcaster;
use crate::commands::{CommandDispatcher, CommandRegistry, MarkdownCommandRunner};
use crate::experiences::ExperienceCatalog;
use crate::infrastructure::{EngineConfig, FileStore, LlmPort, TokenVerifier};
use crate::state::StateManager;

/// Main application state, passed to HTTP/WebSocket handlers via axum.
pub struct App {
    pub config: EngineConfig,
    pub store: Arc<FileStore>,
    pub state: Arc<StateManager>,
    pub registry: Arc<CommandRegistry>,
    pub broadcaster: Arc<UpdateBroadcaster>,
    pub dispatcher: Arc<CommandDispatcher>,
    pub verifier: Arc<dyn TokenVerifier>,
}

pub type SharedApp = Arc<App>;

impl App {
    /// Wire up all dependencies. The LLM client and token verifier are the
    /// two injected collaborator seams.
    pub fn new(
        config: EngineConfig,
        llm: Arc<dyn LlmPort>,
        verifier: Arc<dyn TokenVerifier>,
    ) -> Self {
        let store = Arc::new(FileStore::new(config.data_root.clone()));
        let catalog = Arc::new(ExperienceCatalog::new(store.clone()));
        let state = Arc::new(StateManager::new(store.clone(), catalog));
        let registry = Arc::new(CommandRegistry::new(store.clone()));
        let runner = Arc::new(MarkdownCommandRunner::new(
            llm,
            config.llm_structural_temperature,
        ));
        let broadcaster = Arc::new(UpdateBroadcaster::new(config.broadcast_capacity));
        let dispatcher = Arc::new(CommandDispatcher::new(
            state.clone(),
            registry.clone(),
            runner,
            broadcaster.clone(),
        ));

        Self {
            config,
            store,
            state,
            registry,
            broadcaster,
            dispatcher,
            verifier,
        }
    }
}
