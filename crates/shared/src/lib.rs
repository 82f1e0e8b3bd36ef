//! Wire protocol DTOs shared between the engine and its clients.

pub mod http;
pub mod messages;

pub use http::{InteractRequest, InteractResponse};
pub use messages::{ActionResponse, ClientMessage, ServerMessage};
