//! Application state and request identity types.

use std::sync::Arc;

use crate::db::DbPool;
use crate::llm::CompletionProvider;
use crate::session::ChatSessions;
use crate::srs::SrsSettings;

/// Application state passed to all handlers
#[derive(Clone)]
pub struct AppState {
    /// Document store (metrics, sessions, progress, courses)
    pub db: DbPool,

    /// Completion backend used by every generation endpoint
    pub llm: Arc<dyn CompletionProvider>,

    /// Scheduler selection and retention target
    pub srs: SrsSettings,

    /// Pending exam questions of the course assistant
    pub chat_sessions: Arc<ChatSessions>,
}

impl AppState {
    pub fn new(db: DbPool, llm: Arc<dyn CompletionProvider>, srs: SrsSettings) -> Self {
        Self {
            db,
            llm,
            srs,
            chat_sessions: Arc::new(ChatSessions::new()),
        }
    }
}

/// Identity of the calling learner (extracted from the request)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserContext {
    pub user_id: String,
}
