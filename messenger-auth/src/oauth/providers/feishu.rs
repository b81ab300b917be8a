//! Feishu OAuth provider implementation.
//!
//! Single-hop identity: the user-info payload already carries the
//! provider-internal user id, so no secondary lookup is needed.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::{oauth_error, Error, OAuthErrorKind};
use crate::oauth::{AuthorizationRequest, Identity, ProviderKind};

/// Per-request timeout for upstream calls.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Feishu endpoint set.
///
/// The consent page lives on `accounts.feishu.cn` while the token and
/// user-info APIs live on the open-platform base URL. Kept as a struct so
/// tests can point every call at a mock server.
#[derive(Debug, Clone)]
pub struct Endpoints {
    pub authorize_url: String,
    pub token_url: String,
    pub user_info_url: String,
}

impl Endpoints {
    /// Production endpoints for the given open-platform base URL.
    pub fn new(base_url: &str) -> Self {
        Self {
            authorize_url: "https://accounts.feishu.cn/open-apis/authen/v1/authorize".to_string(),
            token_url: format!("{base_url}/open-apis/authen/v2/oauth/token"),
            user_info_url: format!("{base_url}/open-apis/authen/v1/user_info"),
        }
    }
}

/// Request to exchange an authorization code for a user access token.
/// The token endpoint takes OAuth2 standard parameters as a JSON body.
#[derive(Debug, Serialize)]
struct TokenExchangeRequest {
    grant_type: String,
    client_id: String,
    client_secret: String,
    code: String,
    redirect_uri: String,
}

/// OAuth token response from Feishu.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    #[serde(default)]
    access_token: String,
}

/// Envelope around the user-info payload; a nonzero `code` is a failure
/// even on HTTP 200.
#[derive(Debug, Deserialize)]
struct UserInfoResponse {
    code: i64,
    #[serde(default)]
    msg: String,
    data: Option<FeishuUser>,
}

/// User info from Feishu.
#[derive(Debug, Deserialize)]
struct FeishuUser {
    #[serde(default)]
    open_id: String,
    #[serde(default)]
    union_id: String,
    #[serde(default)]
    user_id: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    avatar_url: String,
    #[serde(default)]
    email: String,
    #[serde(default)]
    mobile: String,
}

/// Feishu OAuth provider.
pub struct Provider {
    client_id: String,
    client_secret: String,
    redirect_uri: String,
    endpoints: Endpoints,
    http_client: reqwest::Client,
}

impl Provider {
    /// Create a new Feishu OAuth provider.
    pub fn new(
        client_id: String,
        client_secret: String,
        redirect_uri: String,
        endpoints: Endpoints,
    ) -> Result<Self, Error> {
        let http_client = reqwest::Client::builder()
            .use_rustls_tls()
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            client_id,
            client_secret,
            redirect_uri,
            endpoints,
            http_client,
        })
    }
}

#[async_trait]
impl crate::oauth::Provider for Provider {
    fn provider(&self) -> ProviderKind {
        ProviderKind::Feishu
    }

    fn authorization_url(&self, state: &str) -> AuthorizationRequest {
        let url = format!(
            "{}?client_id={}&redirect_uri={}&response_type=code&state={}",
            self.endpoints.authorize_url,
            urlencoding::encode(&self.client_id),
            urlencoding::encode(&self.redirect_uri),
            urlencoding::encode(state)
        );

        AuthorizationRequest {
            url,
            state: state.to_string(),
        }
    }

    async fn exchange_code(&self, code: &str) -> Result<SecretString, Error> {
        let request = TokenExchangeRequest {
            grant_type: "authorization_code".to_string(),
            client_id: self.client_id.clone(),
            client_secret: self.client_secret.clone(),
            code: code.to_string(),
            redirect_uri: self.redirect_uri.clone(),
        };

        debug!("Exchanging Feishu authorization code for a user access token");

        let response = self
            .http_client
            .post(&self.endpoints.token_url)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                warn!("Failed to reach Feishu token endpoint: {:?}", e);
                oauth_error(OAuthErrorKind::Network, "token endpoint unreachable")
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!("Feishu token exchange failed with status {status}: {body}");
            return Err(oauth_error(
                OAuthErrorKind::TokenExchangeFailed,
                &format!("token endpoint returned {status}"),
            ));
        }

        let token: TokenResponse = response.json().await.map_err(|e| {
            warn!("Failed to decode Feishu token response: {:?}", e);
            oauth_error(
                OAuthErrorKind::TokenExchangeFailed,
                "undecodable token response",
            )
        })?;

        if token.access_token.is_empty() {
            warn!("Feishu token response carried an empty access token");
            return Err(oauth_error(
                OAuthErrorKind::TokenExchangeFailed,
                "empty access token",
            ));
        }

        Ok(SecretString::from(token.access_token))
    }

    async fn fetch_identity(&self, access_token: &SecretString) -> Result<Identity, Error> {
        let response = self
            .http_client
            .get(&self.endpoints.user_info_url)
            .bearer_auth(access_token.expose_secret())
            .send()
            .await
            .map_err(|e| {
                warn!("Failed to reach Feishu user-info endpoint: {:?}", e);
                oauth_error(OAuthErrorKind::Network, "user-info endpoint unreachable")
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!("Feishu user-info request failed with status {status}: {body}");
            return Err(oauth_error(
                OAuthErrorKind::IdentityFetchFailed,
                &format!("user-info endpoint returned {status}"),
            ));
        }

        let user_info: UserInfoResponse = response.json().await.map_err(|e| {
            warn!("Failed to decode Feishu user-info response: {:?}", e);
            oauth_error(
                OAuthErrorKind::IdentityFetchFailed,
                "undecodable user-info response",
            )
        })?;

        if user_info.code != 0 {
            warn!(
                "Feishu API error when getting user info: {} (code: {})",
                user_info.msg, user_info.code
            );
            return Err(oauth_error(
                OAuthErrorKind::IdentityFetchFailed,
                &format!("provider status {}", user_info.code),
            ));
        }

        let user = user_info.data.ok_or_else(|| {
            oauth_error(OAuthErrorKind::InvalidResponse, "user-info payload missing")
        })?;

        Ok(Identity {
            open_id: user.open_id,
            union_id: user.union_id,
            user_id: user.user_id,
            name: user.name,
            avatar_url: user.avatar_url,
            email: user.email,
            mobile: user.mobile,
            provider: ProviderKind::Feishu,
        })
    }
}
