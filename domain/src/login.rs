//! Provider login orchestration.
//!
//! Drives the two halves of the OAuth round-trip on top of an injected
//! provider: issuing the consent URL with a fresh CSRF state, then (once the
//! client returns with a code) verifying the state, running the
//! code-for-identity exchange, and minting a session token.

use log::*;
use messenger_auth::oauth::{self, AuthorizationRequest, Identity, Provider, StateManager};
use service::config::Config;

use crate::error::{AuthErrorKind, DomainErrorKind, Error};
use crate::session::{self, Session};

/// Begin a login attempt: issue a single-use CSRF state and build the
/// provider consent URL around it.
pub fn begin_login(provider: &dyn Provider, states: &StateManager) -> AuthorizationRequest {
    let state = states.generate();
    let request = provider.authorization_url(&state);

    info!(
        "Redirecting user to the {} consent page",
        provider.provider().as_str()
    );
    request
}

/// Complete a login attempt.
///
/// Verifies and consumes the callback state, exchanges the authorization code
/// for a normalized identity, and issues a session token against the
/// identity's `open_id`. Any exchange failure is terminal: codes are
/// single-use, so the caller must restart the login flow.
pub async fn complete_login(
    config: &Config,
    provider: &dyn Provider,
    states: &StateManager,
    code: &str,
    state: &str,
) -> Result<(Session, Identity), Error> {
    if code.is_empty() || state.is_empty() {
        return Err(Error {
            source: None,
            error_kind: DomainErrorKind::Auth(AuthErrorKind::InvalidRequest),
        });
    }

    if !states.validate(state) {
        warn!(
            "Rejected {} login with an unknown, expired, or reused state",
            provider.provider().as_str()
        );
        return Err(Error {
            source: None,
            error_kind: DomainErrorKind::Auth(AuthErrorKind::InvalidState),
        });
    }

    let identity = oauth::exchange_identity(provider, code)
        .await
        .inspect_err(|e| {
            warn!(
                "Failed to exchange {} authorization code: {:?}",
                provider.provider().as_str(),
                e
            )
        })?;

    let session = session::issue(config.jwt_secret(), &identity.open_id, &identity.name)?;

    info!(
        "Successfully authenticated user: {} (open_id: {})",
        identity.name, identity.open_id
    );

    Ok((session, identity))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use messenger_auth::error::{oauth_error, OAuthErrorKind};
    use messenger_auth::Error as MessengerAuthError;
    use messenger_auth::oauth::ProviderKind;
    use secrecy::{ExposeSecret, SecretString};

    /// Provider double that never touches the network.
    struct FakeProvider {
        fail_exchange: bool,
    }

    #[async_trait]
    impl Provider for FakeProvider {
        fn provider(&self) -> ProviderKind {
            ProviderKind::Feishu
        }

        fn authorization_url(&self, state: &str) -> AuthorizationRequest {
            AuthorizationRequest {
                url: format!("https://consent.test/authorize?state={state}"),
                state: state.to_string(),
            }
        }

        async fn exchange_code(&self, code: &str) -> Result<SecretString, MessengerAuthError> {
            if self.fail_exchange {
                return Err(oauth_error(
                    OAuthErrorKind::TokenExchangeFailed,
                    "token endpoint returned 500",
                ));
            }
            assert_eq!(code, "code-1");
            Ok(SecretString::from("tok-1".to_string()))
        }

        async fn fetch_identity(&self, access_token: &SecretString) -> Result<Identity, MessengerAuthError> {
            assert_eq!(access_token.expose_secret(), "tok-1");
            Ok(Identity {
                open_id: "u1".to_string(),
                union_id: String::new(),
                user_id: "u1".to_string(),
                name: "Alice".to_string(),
                avatar_url: String::new(),
                email: String::new(),
                mobile: String::new(),
                provider: ProviderKind::Feishu,
            })
        }
    }

    fn test_config() -> Config {
        Config::default().set_jwt_secret("login-test-secret".to_string())
    }

    #[tokio::test]
    async fn test_full_login_round_trip() {
        let config = test_config();
        let provider = FakeProvider {
            fail_exchange: false,
        };
        let states = StateManager::new();

        let request = begin_login(&provider, &states);
        assert!(request.url.contains(&request.state));

        let (session, identity) =
            complete_login(&config, &provider, &states, "code-1", &request.state)
                .await
                .unwrap();

        assert_eq!(identity.open_id, "u1");
        let user = session::validate(config.jwt_secret(), &session.token).unwrap();
        assert_eq!(user.open_id, "u1");
        assert_eq!(user.name, "Alice");
    }

    #[tokio::test]
    async fn test_unknown_state_is_rejected() {
        let config = test_config();
        let provider = FakeProvider {
            fail_exchange: false,
        };
        let states = StateManager::new();

        let err = complete_login(&config, &provider, &states, "code-1", "forged-state")
            .await
            .unwrap_err();

        assert_eq!(
            err.error_kind,
            DomainErrorKind::Auth(AuthErrorKind::InvalidState)
        );
    }

    #[tokio::test]
    async fn test_state_cannot_be_replayed() {
        let config = test_config();
        let provider = FakeProvider {
            fail_exchange: false,
        };
        let states = StateManager::new();
        let request = begin_login(&provider, &states);

        complete_login(&config, &provider, &states, "code-1", &request.state)
            .await
            .unwrap();
        let err = complete_login(&config, &provider, &states, "code-1", &request.state)
            .await
            .unwrap_err();

        assert_eq!(
            err.error_kind,
            DomainErrorKind::Auth(AuthErrorKind::InvalidState)
        );
    }

    #[tokio::test]
    async fn test_missing_code_is_invalid_request() {
        let config = test_config();
        let provider = FakeProvider {
            fail_exchange: false,
        };
        let states = StateManager::new();
        let request = begin_login(&provider, &states);

        let err = complete_login(&config, &provider, &states, "", &request.state)
            .await
            .unwrap_err();

        assert_eq!(
            err.error_kind,
            DomainErrorKind::Auth(AuthErrorKind::InvalidRequest)
        );
    }

    #[tokio::test]
    async fn test_exchange_failure_is_terminal() {
        let config = test_config();
        let provider = FakeProvider {
            fail_exchange: true,
        };
        let states = StateManager::new();
        let request = begin_login(&provider, &states);

        let err = complete_login(&config, &provider, &states, "code-1", &request.state)
            .await
            .unwrap_err();

        assert_eq!(
            err.error_kind,
            DomainErrorKind::Auth(AuthErrorKind::ExchangeFailed)
        );
    }
}
