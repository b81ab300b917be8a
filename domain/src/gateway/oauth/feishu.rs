//! Feishu OAuth client.
//!
//! Provides a configured Feishu OAuth provider for domain controllers.

use messenger_auth::oauth::providers::feishu::{Endpoints, Provider as FeishuProvider};
use service::config::Config;

use crate::error::{DomainErrorKind, Error, InternalErrorKind};

/// Create a new Feishu OAuth provider from config.
///
/// Fails with a config error when the application credentials or redirect
/// URI are not set.
pub fn new_provider(config: &Config) -> Result<FeishuProvider, Error> {
    let client_id = config.feishu_app_id().ok_or_else(|| Error {
        source: None,
        error_kind: DomainErrorKind::Internal(InternalErrorKind::Config),
    })?;

    let client_secret = config.feishu_app_secret().ok_or_else(|| Error {
        source: None,
        error_kind: DomainErrorKind::Internal(InternalErrorKind::Config),
    })?;

    let redirect_uri = config.feishu_redirect_uri().ok_or_else(|| Error {
        source: None,
        error_kind: DomainErrorKind::Internal(InternalErrorKind::Config),
    })?;

    let endpoints = Endpoints::new(config.feishu_base_url());

    FeishuProvider::new(client_id, client_secret, redirect_uri, endpoints).map_err(Error::from)
}
