//! Core authentication types and configuration.
//!
//! Wire types mirror the backend auth API (camelCase JSON); internal types
//! carry the derived metadata the session layer needs (absolute expiry
//! timestamps, typed authorization purpose).

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::pkce::PkceChallenge;

/// Google's OAuth 2.0 authorization endpoint.
pub const AUTHORIZATION_ENDPOINT: &str = "https://accounts.google.com/o/oauth2/v2/auth";

/// Scopes requested on every authorization. Fixed by design: identity,
/// email, profile, and the two Gmail scopes for read and read-write
/// mailbox access.
pub const OAUTH_SCOPES: [&str; 5] = [
    "openid",
    "email",
    "profile",
    "https://www.googleapis.com/auth/gmail.readonly",
    "https://www.googleapis.com/auth/gmail.modify",
];

/// Default redirect target during local development.
const DEFAULT_REDIRECT_URI: &str = "http://localhost:5173/auth/callback";

/// Client-side authentication configuration.
///
/// A missing client id is tolerated at construction and only rejected when
/// an authorization is actually initiated, so an unconfigured build can
/// still offer password login.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// Base URL of the backend API, e.g. `https://api.maildeck.app`.
    pub api_base_url: String,

    /// Google OAuth client id registered for this deployment.
    pub client_id: String,

    /// Redirect URI; must exactly match the value registered with the
    /// identity provider.
    pub redirect_uri: String,
}

impl AuthConfig {
    /// Create a new configuration.
    #[must_use]
    pub fn new(
        api_base_url: impl Into<String>,
        client_id: impl Into<String>,
        redirect_uri: impl Into<String>,
    ) -> Self {
        Self {
            api_base_url: api_base_url.into(),
            client_id: client_id.into(),
            redirect_uri: redirect_uri.into(),
        }
    }

    /// Load configuration from the environment.
    ///
    /// Reads `MAILDECK_API_BASE_URL`, `MAILDECK_GOOGLE_CLIENT_ID`, and
    /// `MAILDECK_GOOGLE_REDIRECT_URI`. Absent variables fall back to
    /// development defaults (empty client id; see [`AuthConfig`] docs).
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            api_base_url: std::env::var("MAILDECK_API_BASE_URL")
                .unwrap_or_else(|_| "http://localhost:3000".to_string()),
            client_id: std::env::var("MAILDECK_GOOGLE_CLIENT_ID").unwrap_or_default(),
            redirect_uri: std::env::var("MAILDECK_GOOGLE_REDIRECT_URI")
                .unwrap_or_else(|_| DEFAULT_REDIRECT_URI.to_string()),
        }
    }

    /// Space-separated scope string for the authorization request.
    #[must_use]
    pub fn scope_string() -> String {
        OAUTH_SCOPES.join(" ")
    }

    /// Build the provider authorization URL for one authorization attempt.
    ///
    /// Every parameter besides the client id, redirect URI, and the PKCE
    /// values is fixed: `response_type=code`, the scope set,
    /// `access_type=offline` (request a refresh credential), and
    /// `prompt=consent` (force the consent screen so a refresh credential
    /// is issued even on repeat authorizations).
    ///
    /// Building the URL has no side effects; navigating to it is the
    /// caller's responsibility.
    #[must_use]
    pub fn authorization_url(&self, pkce: &PkceChallenge) -> String {
        let scope = Self::scope_string();
        let params: [(&str, &str); 9] = [
            ("client_id", &self.client_id),
            ("redirect_uri", &self.redirect_uri),
            ("response_type", "code"),
            ("scope", &scope),
            ("access_type", "offline"),
            ("prompt", "consent"),
            ("code_challenge", &pkce.code_challenge),
            ("code_challenge_method", pkce.challenge_method()),
            ("state", &pkce.state),
        ];

        let query = params
            .iter()
            .map(|(k, v)| format!("{k}={}", urlencoding::encode(v)))
            .collect::<Vec<_>>()
            .join("&");

        format!("{AUTHORIZATION_ENDPOINT}?{query}")
    }
}

/// What an authorization attempt is for. Determines how the exchanged
/// tokens are used once the callback arrives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthPurpose {
    /// Primary sign-in: the exchanged tokens establish the session.
    Login,

    /// Attach an additional mailbox to an already-authenticated session.
    MailboxConnection,
}

/// One in-flight authorization attempt.
///
/// Created when the user initiates an authorization, held by the pending
/// store across the provider redirect, and consumed exactly once when the
/// matching callback arrives. The purpose travels on the record itself
/// rather than through a separately-stored flag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingAuthorization {
    /// CSRF-binding token, unique per attempt, single-use.
    pub state: String,

    /// PKCE code verifier bound 1:1 to `state`.
    pub code_verifier: String,

    /// What the exchanged tokens will be used for.
    pub purpose: AuthPurpose,
}

/// Token response from the backend auth endpoints.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub user_id: i64,
    #[serde(default)]
    pub email: Option<String>,
    pub tokens: BearerTokens,
    pub refresh_token: String,
}

/// Access-token envelope inside [`AuthResponse`].
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BearerTokens {
    pub access_token: String,
    pub expires_in: i64,
    pub token_type: String,
}

/// Outcome of a successful token exchange or refresh.
///
/// The access token lives only in memory; the refresh token rotates and
/// must replace any previously stored value.
#[derive(Debug, Clone)]
pub struct TokenGrant {
    /// Backend user id the grant belongs to.
    pub user_id: i64,

    /// Bearer credential for API calls. Never persisted.
    pub access_token: String,

    /// Absolute access-token expiry, derived from `expiresIn` at receipt
    /// time. `None` when the backend reported a non-positive lifetime.
    pub expires_at: Option<DateTime<Utc>>,

    /// Rotating refresh credential to persist.
    pub refresh_token: String,
}

impl From<AuthResponse> for TokenGrant {
    fn from(response: AuthResponse) -> Self {
        let expires_at = (response.tokens.expires_in > 0)
            .then(|| Utc::now() + Duration::seconds(response.tokens.expires_in));

        Self {
            user_id: response.user_id,
            access_token: response.tokens.access_token,
            expires_at,
            refresh_token: response.refresh_token,
        }
    }
}

/// Profile of the signed-in user, as served by `GET /users/me`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: i64,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub avatar_url: Option<String>,
    pub is_email_verified: bool,
}

/// Registration payload for `POST /auth/register`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewUser {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
}

/// An authenticated session.
///
/// A `Session` only exists once both the token exchange (or refresh) and
/// the profile fetch have succeeded; a refresh credential alone never
/// constitutes an authenticated session.
#[derive(Debug, Clone)]
pub struct Session {
    user: UserProfile,
    access_token: String,
    access_expires_at: Option<DateTime<Utc>>,
}

impl Session {
    /// Assemble a session from a hydrated profile and a live access token.
    #[must_use]
    pub fn new(
        user: UserProfile,
        access_token: String,
        access_expires_at: Option<DateTime<Utc>>,
    ) -> Self {
        Self { user, access_token, access_expires_at }
    }

    /// The signed-in user's profile.
    #[must_use]
    pub fn user(&self) -> &UserProfile {
        &self.user
    }

    /// Bearer credential for API calls.
    #[must_use]
    pub fn access_token(&self) -> &str {
        &self.access_token
    }

    /// Absolute access-token expiry, if the backend reported one.
    #[must_use]
    pub fn access_expires_at(&self) -> Option<DateTime<Utc>> {
        self.access_expires_at
    }

    /// Whether the access token is past (or within `threshold_seconds`
    /// of) its expiry. Tokens without a known expiry never report stale.
    #[must_use]
    pub fn access_token_is_stale(&self, threshold_seconds: i64) -> bool {
        match self.access_expires_at {
            Some(expires_at) => Utc::now() + Duration::seconds(threshold_seconds) >= expires_at,
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for types and configuration.
    use super::*;

    fn test_config() -> AuthConfig {
        AuthConfig::new(
            "http://localhost:3000",
            "client-123.apps.googleusercontent.com",
            "http://localhost:5173/auth/callback",
        )
    }

    #[test]
    fn authorization_url_contains_fixed_parameters() {
        let pkce = PkceChallenge::generate();
        let url = test_config().authorization_url(&pkce);

        assert!(url.starts_with("https://accounts.google.com/o/oauth2/v2/auth?"));
        assert!(url.contains("response_type=code"));
        assert!(url.contains("access_type=offline"));
        assert!(url.contains("prompt=consent"));
        assert!(url.contains("code_challenge_method=S256"));
        assert!(url.contains(&format!("code_challenge={}", pkce.code_challenge)));
        assert!(url.contains(&format!("state={}", pkce.state)));
        // The verifier itself must never appear in the authorization URL.
        assert!(!url.contains(&pkce.code_verifier));
    }

    #[test]
    fn authorization_url_percent_encodes_values() {
        let pkce = PkceChallenge::generate();
        let url = test_config().authorization_url(&pkce);

        assert!(url.contains("redirect_uri=http%3A%2F%2Flocalhost%3A5173%2Fauth%2Fcallback"));
        // Scopes are space-separated before encoding.
        assert!(url.contains("scope=openid%20email%20profile%20https%3A%2F%2Fwww.googleapis.com"));
        assert!(url.contains("gmail.readonly"));
        assert!(url.contains("gmail.modify"));
    }

    #[test]
    fn auth_response_converts_to_grant() {
        let json = r#"{
            "userId": 7,
            "email": "u@x.com",
            "tokens": {
                "accessToken": "a1",
                "expiresIn": 3600,
                "tokenType": "Bearer"
            },
            "refreshToken": "r1"
        }"#;

        let response: AuthResponse = serde_json::from_str(json).unwrap();
        let grant = TokenGrant::from(response);

        assert_eq!(grant.user_id, 7);
        assert_eq!(grant.access_token, "a1");
        assert_eq!(grant.refresh_token, "r1");
        let expires_at = grant.expires_at.unwrap();
        let remaining = (expires_at - Utc::now()).num_seconds();
        assert!(remaining > 3590 && remaining <= 3600);
    }

    #[test]
    fn non_positive_expiry_yields_no_deadline() {
        let response = AuthResponse {
            user_id: 1,
            email: None,
            tokens: BearerTokens {
                access_token: "a".into(),
                expires_in: 0,
                token_type: "Bearer".into(),
            },
            refresh_token: "r".into(),
        };

        assert!(TokenGrant::from(response).expires_at.is_none());
    }

    #[test]
    fn user_profile_deserializes_camel_case() {
        let json = r#"{
            "id": 7,
            "email": "u@x.com",
            "firstName": "Ada",
            "lastName": "Lovelace",
            "avatarUrl": null,
            "isEmailVerified": true
        }"#;

        let user: UserProfile = serde_json::from_str(json).unwrap();
        assert_eq!(user.id, 7);
        assert_eq!(user.first_name, "Ada");
        assert!(user.avatar_url.is_none());
        assert!(user.is_email_verified);
    }

    #[test]
    fn session_staleness() {
        let user: UserProfile = serde_json::from_str(
            r#"{"id":1,"email":"u@x.com","firstName":"A","lastName":"B","isEmailVerified":true}"#,
        )
        .unwrap();

        let fresh = Session::new(
            user.clone(),
            "a".into(),
            Some(Utc::now() + Duration::seconds(3600)),
        );
        assert!(!fresh.access_token_is_stale(300));
        assert!(fresh.access_token_is_stale(7200));

        let unknown = Session::new(user, "a".into(), None);
        assert!(!unknown.access_token_is_stale(300));
    }
}
