//! Traits abstracting the backend API and the credential store.
//!
//! Both seams exist for dependency injection: the session layer is generic
//! over them, production wires in [`crate::client::AuthClient`] and
//! [`crate::keychain::KeychainCredentialStore`], and tests substitute the
//! in-memory mocks from [`crate::testing`].

use async_trait::async_trait;

use crate::error::{ApiError, CredentialError};
use crate::types::{NewUser, TokenGrant, UserProfile};

/// Operations of the backend auth REST API consumed by the session layer.
#[async_trait]
pub trait AuthApi: Send + Sync {
    /// Exchange an authorization code (plus its PKCE verifier) for tokens.
    ///
    /// The code is single-use; the backend rejects a replayed code.
    ///
    /// # Errors
    ///
    /// [`ApiError`] classified by HTTP outcome.
    async fn exchange_authorization_code(
        &self,
        code: &str,
        code_verifier: &str,
    ) -> Result<TokenGrant, ApiError>;

    /// Obtain a fresh token grant from a refresh credential.
    ///
    /// The returned refresh token may differ from the input (rotation) and
    /// must replace the stored one; the old value is invalid afterwards.
    ///
    /// # Errors
    ///
    /// [`ApiError::Unauthorized`] when the credential is dead; transient
    /// variants otherwise.
    async fn refresh_session(&self, refresh_token: &str) -> Result<TokenGrant, ApiError>;

    /// Fetch the profile of the user the access token belongs to.
    ///
    /// # Errors
    ///
    /// [`ApiError`] classified by HTTP outcome.
    async fn fetch_profile(&self, access_token: &str) -> Result<UserProfile, ApiError>;

    /// Password sign-in.
    ///
    /// # Errors
    ///
    /// [`ApiError::Unauthorized`] on bad credentials.
    async fn login(&self, email: &str, password: &str) -> Result<TokenGrant, ApiError>;

    /// Create an account and sign it in.
    ///
    /// # Errors
    ///
    /// [`ApiError`] classified by HTTP outcome.
    async fn register(&self, new_user: &NewUser) -> Result<TokenGrant, ApiError>;

    /// Revoke the given refresh credential (or all of the user's
    /// credentials when `revoke_all` is set).
    ///
    /// # Errors
    ///
    /// [`ApiError`] classified by HTTP outcome.
    async fn logout(&self, refresh_token: &str, revoke_all: bool) -> Result<(), ApiError>;

    /// Attach an additional mailbox to the authenticated session by
    /// exchanging a mailbox-scoped authorization code.
    ///
    /// # Errors
    ///
    /// [`ApiError`] classified by HTTP outcome.
    async fn connect_mailbox(
        &self,
        access_token: &str,
        code: &str,
        code_verifier: &str,
    ) -> Result<(), ApiError>;
}

/// Durable storage for the single refresh credential.
///
/// Only the refresh token is ever persisted; access tokens live in memory
/// for the lifetime of the process.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Load the stored refresh credential, if any.
    ///
    /// # Errors
    ///
    /// [`CredentialError`] when the underlying store is inaccessible
    /// (a missing entry is `Ok(None)`, not an error).
    async fn load(&self) -> Result<Option<String>, CredentialError>;

    /// Persist a refresh credential, replacing any previous value.
    ///
    /// # Errors
    ///
    /// [`CredentialError`] when the underlying store rejects the write.
    async fn store(&self, refresh_token: &str) -> Result<(), CredentialError>;

    /// Remove the stored credential. Idempotent.
    ///
    /// # Errors
    ///
    /// [`CredentialError`] when the underlying store rejects the delete.
    async fn clear(&self) -> Result<(), CredentialError>;
}
