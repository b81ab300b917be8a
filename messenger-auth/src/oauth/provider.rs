//! OAuth provider trait and shared exchange flow.

use async_trait::async_trait;
use secrecy::SecretString;
use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Known messaging-platform providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    Feishu,
    DingTalk,
}

impl ProviderKind {
    /// Get the provider identifier string.
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::Feishu => "feishu",
            ProviderKind::DingTalk => "dingtalk",
        }
    }

    /// Parse a provider identifier as it appears in request paths.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "feishu" => Some(ProviderKind::Feishu),
            "dingtalk" => Some(ProviderKind::DingTalk),
            _ => None,
        }
    }
}

/// Authorization request with URL and CSRF state.
#[derive(Debug, Clone)]
pub struct AuthorizationRequest {
    /// Authorization URL to redirect the user to.
    pub url: String,
    /// CSRF state parameter round-tripped through the callback.
    pub state: String,
}

/// Normalized user identity retrieved from an OAuth provider.
///
/// `open_id` is always present and is the primary correlation key for
/// downstream report calls. The remaining fields may be empty when the
/// provider omits them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Identity {
    pub open_id: String,
    pub union_id: String,
    #[serde(rename = "userid")]
    pub user_id: String,
    pub name: String,
    pub avatar_url: String,
    pub email: String,
    pub mobile: String,
    pub provider: ProviderKind,
}

/// Trait for the platform OAuth flows.
///
/// Implementations handle provider-specific details:
/// - Authorization URL generation with CSRF state
/// - Authorization code exchange for a user access token
/// - Identity retrieval with the user access token
/// - Optional resolution of the provider-internal user id from a union id
///   (two-hop providers only)
#[async_trait]
pub trait Provider: Send + Sync {
    /// Get the provider kind.
    fn provider(&self) -> ProviderKind;

    /// Generate the consent-redirect URL embedding the given CSRF state.
    ///
    /// Pure string construction; reserved characters in embedded values are
    /// percent-encoded.
    fn authorization_url(&self, state: &str) -> AuthorizationRequest;

    /// Exchange an authorization code for a user access token.
    ///
    /// Codes are single-use and expire quickly, so this call is never
    /// retried.
    async fn exchange_code(&self, code: &str) -> Result<SecretString, Error>;

    /// Fetch the user's identity using a user access token.
    async fn fetch_identity(&self, access_token: &SecretString) -> Result<Identity, Error>;

    /// Resolve the provider-internal user id from a union id.
    ///
    /// Single-hop providers carry the user id inline in the identity payload
    /// and keep this default. Two-hop providers override it with the extra
    /// lookup; a failure there must propagate rather than fall back to an
    /// empty id.
    async fn resolve_user_id(&self, _union_id: &str) -> Result<Option<String>, Error> {
        Ok(None)
    }
}

/// Run the full code-for-identity exchange against a provider.
///
/// Drives the hops in order: code -> access token -> identity -> (optional)
/// user id resolution. Terminal on the first failed hop.
pub async fn exchange_identity(provider: &dyn Provider, code: &str) -> Result<Identity, Error> {
    let access_token = provider.exchange_code(code).await?;
    let mut identity = provider.fetch_identity(&access_token).await?;

    if let Some(user_id) = provider.resolve_user_id(&identity.union_id).await? {
        identity.user_id = user_id;
    }

    Ok(identity)
}
