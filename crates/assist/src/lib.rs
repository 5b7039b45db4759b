//! Text-completion collaborator for the general responder: one bounded
//! attempt against an OpenAI-compatible endpoint, a rolling per-client
//! history window, and a static fallback on any failure.

pub mod client;
pub mod history;
pub mod prompt;

pub use {client::AssistClient, history::HistoryBuffer};
