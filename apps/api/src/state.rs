use std::sync::Arc;

use crate::config::Config;
use crate::llm_client::CompletionModel;
use crate::users::UserStore;

/// Shared application state injected into all route handlers via Axum extractors.
///
/// Both clients are built once in `main` and shared; nothing here is mutable.
#[derive(Clone)]
pub struct AppState {
    pub users: Arc<dyn UserStore>,
    /// Completion backend. Default: the Groq `LlmClient`.
    pub llm: Arc<dyn CompletionModel>,
    pub config: Config,
}
