//! DingTalk OAuth client.
//!
//! Provides a configured DingTalk OAuth provider for domain controllers.

use messenger_auth::oauth::providers::dingtalk::{Endpoints, Provider as DingTalkProvider};
use service::config::Config;

use crate::error::{DomainErrorKind, Error, InternalErrorKind};

/// Create a new DingTalk OAuth provider from config.
///
/// Fails with a config error when the application credentials, redirect URI,
/// or corp id are not set.
pub fn new_provider(config: &Config) -> Result<DingTalkProvider, Error> {
    let client_id = config.dingtalk_app_key().ok_or_else(|| Error {
        source: None,
        error_kind: DomainErrorKind::Internal(InternalErrorKind::Config),
    })?;

    let client_secret = config.dingtalk_app_secret().ok_or_else(|| Error {
        source: None,
        error_kind: DomainErrorKind::Internal(InternalErrorKind::Config),
    })?;

    let redirect_uri = config.dingtalk_redirect_uri().ok_or_else(|| Error {
        source: None,
        error_kind: DomainErrorKind::Internal(InternalErrorKind::Config),
    })?;

    let corp_id = config.dingtalk_corp_id().ok_or_else(|| Error {
        source: None,
        error_kind: DomainErrorKind::Internal(InternalErrorKind::Config),
    })?;

    let endpoints = Endpoints::new(
        config.dingtalk_api_base_url(),
        config.dingtalk_oapi_base_url(),
    );

    DingTalkProvider::new(client_id, client_secret, redirect_uri, corp_id, endpoints)
        .map_err(Error::from)
}
