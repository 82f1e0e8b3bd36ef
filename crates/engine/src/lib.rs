//! Wayfarer Engine - the experience runtime server.
//!
//! The engine serves location-based text/AR experiences described entirely
//! by content files: a world template, per-experience config selecting the
//! state model (shared vs isolated), and markdown command definitions.
//! Structured actions run on a code-only fast path; everything else goes
//! through the markdown/LLM path. Every accepted mutation is versioned,
//! persisted atomically, and broadcast to the experience's subscribers.

pub mod app;
pub mod broadcast;
pub mod commands;
pub mod experiences;
pub mod gateway;
pub mod handlers;
pub mod infrastructure;
pub mod state;

#[cfg(test)]
pub mod test_fixtures;
