//! HTTP client for the backend auth API.
//!
//! The backend brokers the actual provider exchange: the client posts the
//! authorization code and PKCE verifier to `/auth/google`, refreshes via
//! `/auth/refresh`, and reads the profile from `/users/me`. Responses are
//! JSON with camelCase keys.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::Serialize;
use tracing::debug;

use crate::error::ApiError;
use crate::traits::AuthApi;
use crate::types::{AuthConfig, AuthResponse, NewUser, TokenGrant, UserProfile};

/// Explicit bound on every backend call; the observed flow left this to
/// transport defaults.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CodeExchangeRequest<'a> {
    code: &'a str,
    code_verifier: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RefreshRequest<'a> {
    refresh_token: &'a str,
}

#[derive(Serialize)]
struct LoginRequest<'a> {
    email: &'a str,
    password: &'a str,
}

/// Reqwest-backed implementation of [`AuthApi`].
#[derive(Debug, Clone)]
pub struct AuthClient {
    http: Client,
    base_url: String,
}

impl AuthClient {
    /// Build a client for the configured backend.
    ///
    /// # Errors
    ///
    /// [`ApiError::Config`] when the underlying HTTP client cannot be
    /// constructed.
    pub fn new(config: &AuthConfig) -> Result<Self, ApiError> {
        let http = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| ApiError::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { http, base_url: config.api_base_url.trim_end_matches('/').to_string() })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, ApiError> {
        let response =
            request.send().await.map_err(|e| ApiError::Network(e.to_string()))?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let message = response.text().await.unwrap_or_default();
        Err(if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            ApiError::Unauthorized(message)
        } else if status.is_server_error() {
            ApiError::Server { status: status.as_u16(), message }
        } else {
            ApiError::Rejected { status: status.as_u16(), message }
        })
    }

    async fn token_grant(&self, response: Response) -> Result<TokenGrant, ApiError> {
        let body: AuthResponse =
            response.json().await.map_err(|e| ApiError::Parse(e.to_string()))?;
        Ok(body.into())
    }
}

#[async_trait]
impl AuthApi for AuthClient {
    async fn exchange_authorization_code(
        &self,
        code: &str,
        code_verifier: &str,
    ) -> Result<TokenGrant, ApiError> {
        debug!("exchanging authorization code");
        let response = self
            .send(
                self.http
                    .post(self.url("/auth/google"))
                    .json(&CodeExchangeRequest { code, code_verifier }),
            )
            .await?;
        self.token_grant(response).await
    }

    async fn refresh_session(&self, refresh_token: &str) -> Result<TokenGrant, ApiError> {
        debug!("refreshing session");
        let response = self
            .send(self.http.post(self.url("/auth/refresh")).json(&RefreshRequest { refresh_token }))
            .await?;
        self.token_grant(response).await
    }

    async fn fetch_profile(&self, access_token: &str) -> Result<UserProfile, ApiError> {
        debug!("fetching profile");
        let response = self
            .send(self.http.get(self.url("/users/me")).bearer_auth(access_token))
            .await?;
        response.json().await.map_err(|e| ApiError::Parse(e.to_string()))
    }

    async fn login(&self, email: &str, password: &str) -> Result<TokenGrant, ApiError> {
        debug!("password login");
        let response = self
            .send(self.http.post(self.url("/auth/login")).json(&LoginRequest { email, password }))
            .await?;
        self.token_grant(response).await
    }

    async fn register(&self, new_user: &NewUser) -> Result<TokenGrant, ApiError> {
        debug!("registering account");
        let response =
            self.send(self.http.post(self.url("/auth/register")).json(new_user)).await?;
        self.token_grant(response).await
    }

    async fn logout(&self, refresh_token: &str, revoke_all: bool) -> Result<(), ApiError> {
        debug!(revoke_all, "revoking refresh credential");
        self.send(
            self.http
                .post(self.url("/auth/logout"))
                .query(&[("all", revoke_all)])
                .json(&RefreshRequest { refresh_token }),
        )
        .await?;
        Ok(())
    }

    async fn connect_mailbox(
        &self,
        access_token: &str,
        code: &str,
        code_verifier: &str,
    ) -> Result<(), ApiError> {
        debug!("connecting additional mailbox");
        self.send(
            self.http
                .post(self.url("/mailboxes/connect"))
                .bearer_auth(access_token)
                .json(&CodeExchangeRequest { code, code_verifier }),
        )
        .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    //! Wire-level tests against a mock HTTP server.
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn auth_body(access: &str, refresh: &str, user_id: i64) -> serde_json::Value {
        json!({
            "userId": user_id,
            "email": "u@x.com",
            "tokens": {
                "accessToken": access,
                "expiresIn": 3600,
                "tokenType": "Bearer"
            },
            "refreshToken": refresh
        })
    }

    async fn client_for(server: &MockServer) -> AuthClient {
        let config = AuthConfig::new(server.uri(), "client-id", "http://localhost/cb");
        AuthClient::new(&config).unwrap()
    }

    #[tokio::test]
    async fn exchange_posts_code_and_verifier() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/google"))
            .and(body_partial_json(json!({ "code": "abc", "codeVerifier": "ver" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(auth_body("a1", "r1", 7)))
            .expect(1)
            .mount(&server)
            .await;

        let grant =
            client_for(&server).await.exchange_authorization_code("abc", "ver").await.unwrap();
        assert_eq!(grant.user_id, 7);
        assert_eq!(grant.access_token, "a1");
        assert_eq!(grant.refresh_token, "r1");
        assert!(grant.expires_at.is_some());
    }

    #[tokio::test]
    async fn refresh_returns_rotated_credential() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/refresh"))
            .and(body_partial_json(json!({ "refreshToken": "r1" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(auth_body("a2", "r2", 7)))
            .mount(&server)
            .await;

        let grant = client_for(&server).await.refresh_session("r1").await.unwrap();
        assert_eq!(grant.refresh_token, "r2");
    }

    #[tokio::test]
    async fn refresh_rejection_is_unauthorized() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/refresh"))
            .respond_with(ResponseTemplate::new(401).set_body_string("revoked"))
            .mount(&server)
            .await;

        let err = client_for(&server).await.refresh_session("dead").await.unwrap_err();
        assert!(err.is_unauthorized(), "expected Unauthorized, got {err:?}");
        assert!(!err.is_transient());
    }

    #[tokio::test]
    async fn server_failure_is_transient() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/refresh"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let err = client_for(&server).await.refresh_session("r1").await.unwrap_err();
        assert!(matches!(err, ApiError::Server { status: 503, .. }));
        assert!(err.is_transient());
    }

    #[tokio::test]
    async fn unreachable_backend_is_network_error() {
        // Nothing listens on this port.
        let config =
            AuthConfig::new("http://127.0.0.1:9", "client-id", "http://localhost/cb");
        let client = AuthClient::new(&config).unwrap();

        let err = client.refresh_session("r1").await.unwrap_err();
        assert!(matches!(err, ApiError::Network(_)));
        assert!(err.is_transient());
    }

    #[tokio::test]
    async fn profile_sends_bearer_token() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/users/me"))
            .and(header("Authorization", "Bearer a1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": 7,
                "email": "u@x.com",
                "firstName": "Ada",
                "lastName": "Lovelace",
                "avatarUrl": null,
                "isEmailVerified": true
            })))
            .mount(&server)
            .await;

        let user = client_for(&server).await.fetch_profile("a1").await.unwrap();
        assert_eq!(user.id, 7);
        assert_eq!(user.email, "u@x.com");
    }

    #[tokio::test]
    async fn truncated_profile_is_a_parse_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/users/me"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": 7 })))
            .mount(&server)
            .await;

        let err = client_for(&server).await.fetch_profile("a1").await.unwrap_err();
        assert!(matches!(err, ApiError::Parse(_)));
    }

    #[tokio::test]
    async fn logout_passes_revoke_all_flag() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/logout"))
            .and(query_param("all", "true"))
            .and(body_partial_json(json!({ "refreshToken": "r1" })))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        client_for(&server).await.logout("r1", true).await.unwrap();
    }

    #[tokio::test]
    async fn connect_mailbox_requires_bearer_auth() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/mailboxes/connect"))
            .and(header("Authorization", "Bearer a1"))
            .and(body_partial_json(json!({ "code": "mb-code", "codeVerifier": "mb-ver" })))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        client_for(&server).await.connect_mailbox("a1", "mb-code", "mb-ver").await.unwrap();
    }
}
