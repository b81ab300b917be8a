//! HTTP surface of the report assistant backend.
//!
//! Providers are injected at construction time (no package-level globals) so
//! the whole router can be exercised in tests with a fake provider.

use std::collections::HashMap;
use std::sync::Arc;

use domain::{Provider, ProviderKind, StateManager};
use log::*;
use service::config::Config;

pub mod error;
pub mod router;

pub(crate) mod controller;
pub(crate) mod extractors;
pub(crate) mod middleware;
pub(crate) mod params;

pub use error::Error;

/// Web-level state passed into the Router.
///
/// Carries the static config, the injected identity providers, and the CSRF
/// state store shared by the login and exchange endpoints.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    providers: HashMap<ProviderKind, Arc<dyn Provider>>,
    pub states: StateManager,
}

impl AppState {
    pub fn new(app_config: Config, providers: Vec<Arc<dyn Provider>>) -> Self {
        let providers = providers
            .into_iter()
            .map(|provider| (provider.provider(), provider))
            .collect();

        Self {
            config: app_config,
            providers,
            states: StateManager::new(),
        }
    }

    /// Look up an injected provider by kind.
    pub fn provider(&self, kind: ProviderKind) -> Option<&Arc<dyn Provider>> {
        self.providers.get(&kind)
    }
}

/// Bind the configured interface/port and serve the router until shutdown.
pub async fn init_server(app_state: AppState) -> Result<(), std::io::Error> {
    let interface = app_state
        .config
        .interface
        .clone()
        .unwrap_or_else(|| "127.0.0.1".to_string());
    let port = app_state.config.port;

    let listener = tokio::net::TcpListener::bind(format!("{interface}:{port}")).await?;
    info!("Server starting... listening on {interface}:{port}");

    axum::serve(listener, router::define_routes(app_state)).await
}
