pub mod api;
pub mod audio;
pub mod chat;
pub mod config;
pub mod error;
pub mod models;
pub mod panels;
pub mod provider;
pub mod session;
pub mod state;
pub mod token_store;

// Re-export main types for convenience
pub use api::{ApiClient, AuthClient, ChatClient, DocumentsClient, InsightsClient, VoiceClient};
pub use audio::{AudioCapture, AudioPayload, CaptureError, CaptureState, CommandMicrophone, Microphone};
pub use chat::{ChatSynchronizer, ExchangeOutcome, PendingExchange, Submission};
pub use config::Config;
pub use error::{ApiError, ApiResult};
pub use models::{Document, KnowledgeGraph, ModelUsage, ProfileUpdate, Registration, SharedAnswer, User};
pub use panels::{GraphPanel, PanelBody, SummaryPanel};
pub use provider::{format_model_name, LlmModel, PromptStyle};
pub use session::{AuthManager, Session, SessionHandle, SessionStore};
pub use state::{ChatMessage, ChatRole, DocumentScope, Notice, NoticeLevel};
pub use token_store::{FileTokenStore, MemoryTokenStore, TokenStore};
