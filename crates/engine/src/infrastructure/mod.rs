//! Infrastructure: engine settings, the document store, and the external
//! collaborator seams (LLM provider, token verification).

pub mod auth;
pub mod config;
pub mod document_store;
pub mod llm;

pub use auth::{AuthClaims, AuthError, TokenVerifier, TrustedTokenVerifier};
pub use config::EngineConfig;
pub use document_store::{DocLock, FileStore, StoreError};
pub use llm::{ChatMessage, ChatRequest, ChatResponse, LlmError, LlmPort, MessageRole, OpenAiCompatClient};
