//! DingTalk OAuth provider implementation.
//!
//! Two-hop identity: the contact API only returns the user's open id and
//! union id, so the provider-internal user id is resolved through a second
//! lookup keyed by the union id, authenticated with a service-level access
//! token. Report queries are scoped by that internal id, so a failed
//! resolution is a hard error, never an empty default.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::{oauth_error, Error, OAuthErrorKind};
use crate::oauth::{AuthorizationRequest, Identity, ProviderKind};

/// Per-request timeout for upstream calls.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// DingTalk endpoint set.
///
/// The user-facing OAuth2 API lives on `api.dingtalk.com` while the
/// service-token and union-id lookup APIs live on the legacy
/// `oapi.dingtalk.com` host. Kept as a struct so tests can point every call
/// at a mock server.
#[derive(Debug, Clone)]
pub struct Endpoints {
    pub authorize_url: String,
    pub token_url: String,
    pub user_info_url: String,
    pub service_token_url: String,
    pub user_by_union_id_url: String,
}

impl Endpoints {
    /// Production endpoints for the given API and legacy base URLs.
    pub fn new(api_base_url: &str, oapi_base_url: &str) -> Self {
        Self {
            authorize_url: "https://login.dingtalk.com/oauth2/auth".to_string(),
            token_url: format!("{api_base_url}/v1.0/oauth2/userAccessToken"),
            user_info_url: format!("{api_base_url}/v1.0/contact/users/me"),
            service_token_url: format!("{oapi_base_url}/gettoken"),
            user_by_union_id_url: format!("{oapi_base_url}/topapi/user/getbyunionid"),
        }
    }
}

/// Request to exchange an authorization code for a user access token.
/// DingTalk's endpoint takes camelCase JSON parameters.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct TokenExchangeRequest {
    client_id: String,
    client_secret: String,
    code: String,
    grant_type: String,
}

/// OAuth token response from DingTalk.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    #[serde(rename = "accessToken", default)]
    access_token: String,
}

/// User info from the DingTalk contact API.
#[derive(Debug, Deserialize)]
struct DingTalkUser {
    #[serde(rename = "openId", default)]
    open_id: String,
    #[serde(rename = "unionId", default)]
    union_id: String,
    #[serde(default)]
    nick: String,
    #[serde(rename = "avatarUrl", default)]
    avatar_url: String,
    #[serde(default)]
    email: String,
    #[serde(default)]
    mobile: String,
}

/// Service-level access token response; carries an inline status code.
#[derive(Debug, Deserialize)]
struct ServiceTokenResponse {
    errcode: i64,
    #[serde(default)]
    errmsg: String,
    #[serde(default)]
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct UserByUnionIdResponse {
    errcode: i64,
    #[serde(default)]
    errmsg: String,
    result: Option<UserByUnionIdResult>,
}

#[derive(Debug, Deserialize)]
struct UserByUnionIdResult {
    #[serde(default)]
    userid: String,
}

/// DingTalk OAuth provider.
pub struct Provider {
    client_id: String,
    client_secret: String,
    redirect_uri: String,
    corp_id: String,
    endpoints: Endpoints,
    http_client: reqwest::Client,
}

impl Provider {
    /// Create a new DingTalk OAuth provider.
    ///
    /// `client_id`/`client_secret` are the application's app key and app
    /// secret; `corp_id` is the corporate tenant embedded in the consent URL.
    pub fn new(
        client_id: String,
        client_secret: String,
        redirect_uri: String,
        corp_id: String,
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
            corp_id,
            endpoints,
            http_client,
        })
    }

    /// Obtain a service-level access token for the union-id lookup.
    async fn service_access_token(&self) -> Result<SecretString, Error> {
        let response = self
            .http_client
            .get(&self.endpoints.service_token_url)
            .query(&[
                ("appkey", self.client_id.as_str()),
                ("appsecret", self.client_secret.as_str()),
            ])
            .send()
            .await
            .map_err(|e| {
                warn!("Failed to reach DingTalk service-token endpoint: {:?}", e);
                oauth_error(
                    OAuthErrorKind::UserIdResolutionFailed,
                    "service-token endpoint unreachable",
                )
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!("DingTalk service-token request failed with status {status}: {body}");
            return Err(oauth_error(
                OAuthErrorKind::UserIdResolutionFailed,
                &format!("service-token endpoint returned {status}"),
            ));
        }

        let token: ServiceTokenResponse = response.json().await.map_err(|e| {
            warn!("Failed to decode DingTalk service-token response: {:?}", e);
            oauth_error(
                OAuthErrorKind::UserIdResolutionFailed,
                "undecodable service-token response",
            )
        })?;

        if token.errcode != 0 {
            warn!(
                "DingTalk service-token error: {} (errcode: {})",
                token.errmsg, token.errcode
            );
            return Err(oauth_error(
                OAuthErrorKind::UserIdResolutionFailed,
                &format!("provider status {}", token.errcode),
            ));
        }

        Ok(SecretString::from(token.access_token))
    }
}

#[async_trait]
impl crate::oauth::Provider for Provider {
    fn provider(&self) -> ProviderKind {
        ProviderKind::DingTalk
    }

    fn authorization_url(&self, state: &str) -> AuthorizationRequest {
        let url = format!(
            "{}?redirect_uri={}&response_type=code&client_id={}&scope={}&state={}&prompt=consent&corpId={}",
            self.endpoints.authorize_url,
            urlencoding::encode(&self.redirect_uri),
            urlencoding::encode(&self.client_id),
            urlencoding::encode("openid corpid"),
            urlencoding::encode(state),
            urlencoding::encode(&self.corp_id)
        );

        AuthorizationRequest {
            url,
            state: state.to_string(),
        }
    }

    async fn exchange_code(&self, code: &str) -> Result<SecretString, Error> {
        let request = TokenExchangeRequest {
            client_id: self.client_id.clone(),
            client_secret: self.client_secret.clone(),
            code: code.to_string(),
            grant_type: "authorization_code".to_string(),
        };

        debug!("Exchanging DingTalk authorization code for a user access token");

        let response = self
            .http_client
            .post(&self.endpoints.token_url)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                warn!("Failed to reach DingTalk token endpoint: {:?}", e);
                oauth_error(OAuthErrorKind::Network, "token endpoint unreachable")
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!("DingTalk token exchange failed with status {status}: {body}");
            return Err(oauth_error(
                OAuthErrorKind::TokenExchangeFailed,
                &format!("token endpoint returned {status}"),
            ));
        }

        let token: TokenResponse = response.json().await.map_err(|e| {
            warn!("Failed to decode DingTalk token response: {:?}", e);
            oauth_error(
                OAuthErrorKind::TokenExchangeFailed,
                "undecodable token response",
            )
        })?;

        if token.access_token.is_empty() {
            warn!("DingTalk token response carried an empty access token");
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
            .header("x-acs-dingtalk-access-token", access_token.expose_secret())
            .send()
            .await
            .map_err(|e| {
                warn!("Failed to reach DingTalk contact endpoint: {:?}", e);
                oauth_error(OAuthErrorKind::Network, "contact endpoint unreachable")
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!("DingTalk user-info request failed with status {status}: {body}");
            return Err(oauth_error(
                OAuthErrorKind::IdentityFetchFailed,
                &format!("contact endpoint returned {status}"),
            ));
        }

        let user: DingTalkUser = response.json().await.map_err(|e| {
            warn!("Failed to decode DingTalk user-info response: {:?}", e);
            oauth_error(
                OAuthErrorKind::IdentityFetchFailed,
                "undecodable user-info response",
            )
        })?;

        Ok(Identity {
            open_id: user.open_id,
            union_id: user.union_id,
            // Filled by resolve_user_id; the contact payload does not carry
            // the provider-internal id.
            user_id: String::new(),
            name: user.nick,
            avatar_url: user.avatar_url,
            email: user.email,
            mobile: user.mobile,
            provider: ProviderKind::DingTalk,
        })
    }

    async fn resolve_user_id(&self, union_id: &str) -> Result<Option<String>, Error> {
        let service_token = self.service_access_token().await?;

        let response = self
            .http_client
            .post(&self.endpoints.user_by_union_id_url)
            .query(&[("access_token", service_token.expose_secret())])
            .json(&serde_json::json!({ "unionid": union_id }))
            .send()
            .await
            .map_err(|e| {
                warn!("Failed to reach DingTalk union-id endpoint: {:?}", e);
                oauth_error(
                    OAuthErrorKind::UserIdResolutionFailed,
                    "union-id endpoint unreachable",
                )
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!("DingTalk union-id lookup failed with status {status}: {body}");
            return Err(oauth_error(
                OAuthErrorKind::UserIdResolutionFailed,
                &format!("union-id endpoint returned {status}"),
            ));
        }

        let lookup: UserByUnionIdResponse = response.json().await.map_err(|e| {
            warn!("Failed to decode DingTalk union-id response: {:?}", e);
            oauth_error(
                OAuthErrorKind::UserIdResolutionFailed,
                "undecodable union-id response",
            )
        })?;

        if lookup.errcode != 0 {
            warn!(
                "DingTalk union-id lookup error: {} (errcode: {})",
                lookup.errmsg, lookup.errcode
            );
            return Err(oauth_error(
                OAuthErrorKind::UserIdResolutionFailed,
                &format!("provider status {}", lookup.errcode),
            ));
        }

        let userid = lookup
            .result
            .map(|r| r.userid)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| {
                oauth_error(
                    OAuthErrorKind::UserIdResolutionFailed,
                    "union-id lookup returned no user id",
                )
            })?;

        Ok(Some(userid))
    }
}
