//! Error types for the authentication core.
//!
//! Two layers of errors exist:
//!
//! - [`ApiError`]: failures of individual backend HTTP calls, classified so
//!   callers can tell a dead credential (401) from a transient outage
//!   (5xx / transport failure).
//! - [`AuthError`]: failures of the authorization flow itself (provider
//!   denial, malformed callback, CSRF detection), composing `ApiError` for
//!   the network-backed steps.

use thiserror::Error;

/// Errors returned by the backend auth API client.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Client could not be constructed or is misconfigured.
    #[error("configuration error: {0}")]
    Config(String),

    /// 401/403: the presented credential is invalid, expired, or revoked.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// 5xx: the backend failed; the request may succeed later.
    #[error("server error ({status}): {message}")]
    Server { status: u16, message: String },

    /// Any other non-success status (4xx besides auth failures).
    #[error("request rejected ({status}): {message}")]
    Rejected { status: u16, message: String },

    /// Transport-level failure: no usable response was received.
    #[error("network error: {0}")]
    Network(String),

    /// The response body did not match the expected shape.
    #[error("malformed response: {0}")]
    Parse(String),
}

impl ApiError {
    /// Whether the failure is transient: the credential that was presented
    /// may still be valid and the call can be retried later.
    ///
    /// The bootstrap sequencer uses this to decide whether a failed refresh
    /// should destroy the stored refresh credential.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Server { .. } | Self::Network(_))
    }

    /// Whether the failure means the presented credential is dead.
    #[must_use]
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Unauthorized(_))
    }
}

/// Errors surfaced by the pending-authorization store.
///
/// `NotFound` and `Mismatch` are mapped to [`AuthError::SessionExpired`] and
/// [`AuthError::PossibleCsrf`] by the callback validator. They carry the
/// same user-facing advice but must stay distinguishable for telemetry.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum StateError {
    /// Nothing was pending: storage was cleared, or the callback is a
    /// duplicate/replay.
    #[error("no pending authorization")]
    NotFound,

    /// A pending authorization existed but its state does not equal the
    /// state echoed by the provider.
    #[error("state does not match the pending authorization")]
    Mismatch,
}

/// Errors from the durable refresh-credential store.
#[derive(Debug, Error)]
pub enum CredentialError {
    /// The platform credential store rejected the operation.
    #[error("credential storage failure: {0}")]
    Storage(String),
}

/// Errors of the authorization and session flows.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Required client configuration is absent at initiation time.
    #[error("authentication is not configured: {0} is missing")]
    NotConfigured(&'static str),

    /// The identity provider returned an error on the callback (for
    /// example the user declined consent).
    #[error("provider denied authorization: {}", .description.as_deref().unwrap_or(.error))]
    ProviderDenied {
        /// Provider error code, e.g. `access_denied`.
        error: String,
        /// Optional human-readable detail from the provider.
        description: Option<String>,
    },

    /// The redirect URL is missing `code` or `state` (and carries no
    /// provider error). The attempt cannot be recovered.
    #[error("authorization callback is missing required parameters")]
    MalformedCallback,

    /// No pending authorization matched the callback. Same user-facing
    /// advice as [`AuthError::PossibleCsrf`]; the two are distinguished in
    /// logs only.
    #[error("authorization attempt is no longer valid, please sign in again")]
    SessionExpired,

    /// The callback state did not match the pending authorization.
    #[error("authorization attempt is no longer valid, please sign in again")]
    PossibleCsrf,

    /// An operation that needs an authenticated session was invoked
    /// without one.
    #[error("not signed in")]
    NotAuthenticated,

    /// A backend call failed.
    #[error(transparent)]
    Api(#[from] ApiError),
}
