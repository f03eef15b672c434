//! Typed wrappers over the backend's REST resources.

mod auth;
mod chat;
mod client;
mod documents;
mod insights;
mod voice;

pub use auth::AuthClient;
pub use chat::ChatClient;
pub use client::{cancellable, normalize_error, ApiClient};
pub use documents::DocumentsClient;
pub use insights::InsightsClient;
pub use voice::VoiceClient;
