use crate::api::ApiClient;
use crate::gate::AuthGate;
use std::sync::Arc;

pub(crate) type AppGate = AuthGate<ApiClient, ApiClient>;

#[derive(Clone)]
pub(crate) struct AppState {
    /// One client serves both auth and the notes table.
    pub api_client: Arc<ApiClient>,
    pub gate: AppGate,
}

impl AppState {
    pub fn new() -> Self {
        Self::with_client(ApiClient::load())
    }

    pub fn with_client(client: ApiClient) -> Self {
        let api_client = Arc::new(client);
        let gate = AuthGate::new(Arc::clone(&api_client), Arc::clone(&api_client));
        Self { api_client, gate }
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Clone)]
pub(crate) struct AppContext(pub AppState);
