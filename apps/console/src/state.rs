use crate::api_client::ApiClient;
use crate::notify::Notifier;
use crate::session::ResumeSelection;

/// Shared application state handed to every page orchestrator by the shell.
#[derive(Debug, Clone)]
pub struct AppState {
    pub api: ApiClient,
    /// The one "selected resume" slot for this session.
    pub selection: ResumeSelection,
    pub notifier: Notifier,
}

impl AppState {
    pub fn new(api: ApiClient) -> Self {
        Self {
            api,
            selection: ResumeSelection::new(),
            notifier: Notifier::new(),
        }
    }
}
