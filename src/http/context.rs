//! Application state shared across request handlers.

use std::sync::Arc;

use crate::config::Config;
use crate::oauth::{AuthorizationFlow, DeviceFlow, ProviderRegistry};
use crate::storage::traits::AuthStorage;

#[derive(Clone)]
pub struct AppState {
    pub http_client: reqwest::Client,
    pub config: Arc<Config>,
    /// Static provider descriptions, validated at startup
    pub providers: Arc<ProviderRegistry>,
    /// Session, user, and counter storage
    pub storage: Arc<dyn AuthStorage>,
    /// Authorization-code flow engine
    pub authorization_flow: Arc<AuthorizationFlow>,
    /// Device-authorization flow engine
    pub device_flow: Arc<DeviceFlow>,
}

impl AppState {
    pub fn new(
        http_client: reqwest::Client,
        config: Arc<Config>,
        providers: Arc<ProviderRegistry>,
        storage: Arc<dyn AuthStorage>,
    ) -> Self {
        let authorization_flow = Arc::new(AuthorizationFlow::new(
            http_client.clone(),
            storage.clone(),
            *config.session_lifetime.as_ref(),
        ));
        let device_flow = Arc::new(DeviceFlow::new(http_client.clone()));

        Self {
            http_client,
            config,
            providers,
            storage,
            authorization_flow,
            device_flow,
        }
    }
}
