//! Session ownership and the startup bootstrap sequencer.
//!
//! [`SessionManager`] is the single owner of the in-memory [`Session`]:
//! login, the OAuth callback, silent bootstrap, and logout all mutate the
//! session through it. Bootstrap runs behind a one-shot latch so that a
//! host which triggers startup twice still performs at most one refresh
//! call; two concurrent refreshes with the same input credential would
//! each receive a different rotated token and one branch would end up
//! holding a dead credential.

use std::sync::Arc;

use tokio::sync::{OnceCell, RwLock};
use tracing::{debug, info, warn};

use crate::error::AuthError;
use crate::traits::{AuthApi, CredentialStore};
use crate::types::{Session, TokenGrant};

/// Terminal state of one bootstrap pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootstrapOutcome {
    /// A session was silently restored from the stored refresh credential.
    Authenticated,

    /// No session exists; the user must sign in. Bootstrap failures all
    /// resolve here rather than surfacing as errors.
    Unauthenticated,
}

/// Owner of the process-wide session.
pub struct SessionManager<A, S> {
    api: Arc<A>,
    credentials: Arc<S>,
    session: RwLock<Option<Session>>,
    bootstrapped: OnceCell<BootstrapOutcome>,
}

impl<A, S> SessionManager<A, S>
where
    A: AuthApi,
    S: CredentialStore,
{
    /// Create a manager over the given backend and credential store.
    pub fn new(api: Arc<A>, credentials: Arc<S>) -> Self {
        Self { api, credentials, session: RwLock::new(None), bootstrapped: OnceCell::new() }
    }

    /// The current session, if one is established.
    pub async fn current(&self) -> Option<Session> {
        self.session.read().await.clone()
    }

    /// Whether an authenticated session exists.
    pub async fn is_authenticated(&self) -> bool {
        self.session.read().await.is_some()
    }

    /// Bearer credential of the current session.
    pub async fn access_token(&self) -> Option<String> {
        self.session.read().await.as_ref().map(|s| s.access_token().to_string())
    }

    /// Attempt silent session restoration, exactly once per process.
    ///
    /// The first caller runs the sequence; concurrent and later callers
    /// await or receive the same outcome without triggering a second
    /// refresh. The sequence:
    ///
    /// 1. No stored refresh credential: resolve `Unauthenticated` with no
    ///    network traffic.
    /// 2. Refresh the session. On success persist the rotated credential,
    ///    then fetch the profile with the new access token (never
    ///    concurrently with the refresh).
    /// 3. Profile fetched: `Authenticated`. Profile failed (any reason):
    ///    clear credentials, `Unauthenticated`; a failure right after a
    ///    successful refresh is treated as session loss, not retried.
    /// 4. Refresh rejected (401): the credential is dead; clear it.
    ///    Refresh failed transiently (5xx/network): keep the credential
    ///    for the next start, but present this session as logged out.
    pub async fn bootstrap(&self) -> BootstrapOutcome {
        *self.bootstrapped.get_or_init(|| self.run_bootstrap()).await
    }

    async fn run_bootstrap(&self) -> BootstrapOutcome {
        let stored = match self.credentials.load().await {
            Ok(stored) => stored,
            Err(e) => {
                warn!(error = %e, "credential store unreadable, starting signed out");
                None
            }
        };

        let Some(refresh_token) = stored else {
            debug!("no stored refresh credential");
            return BootstrapOutcome::Unauthenticated;
        };

        let grant = match self.api.refresh_session(&refresh_token).await {
            Ok(grant) => grant,
            Err(e) if e.is_unauthorized() => {
                info!("stored refresh credential rejected, clearing it");
                self.clear_credentials().await;
                return BootstrapOutcome::Unauthenticated;
            }
            Err(e) => {
                // Transient failure: the credential may still be valid, so
                // it survives for the next start.
                warn!(error = %e, "session refresh failed transiently");
                return BootstrapOutcome::Unauthenticated;
            }
        };

        self.persist_rotated_credential(&grant).await;

        match self.api.fetch_profile(&grant.access_token).await {
            Ok(user) => {
                let session = Session::new(user, grant.access_token, grant.expires_at);
                *self.session.write().await = Some(session);
                info!(user_id = grant.user_id, "session restored");
                BootstrapOutcome::Authenticated
            }
            Err(e) => {
                warn!(error = %e, "profile fetch failed after refresh, dropping session");
                self.clear_credentials().await;
                BootstrapOutcome::Unauthenticated
            }
        }
    }

    /// Establish a session from a fresh token grant (login, registration,
    /// or OAuth code exchange).
    ///
    /// Persists the refresh credential, hydrates the profile, and
    /// publishes the session. A failed profile fetch tears the attempt
    /// down completely: stored credentials are cleared and no session
    /// exists afterwards.
    ///
    /// # Errors
    ///
    /// [`AuthError::Api`] when the profile fetch fails.
    pub async fn establish(&self, grant: TokenGrant) -> Result<Session, AuthError> {
        self.persist_rotated_credential(&grant).await;

        match self.api.fetch_profile(&grant.access_token).await {
            Ok(user) => {
                let session = Session::new(user, grant.access_token, grant.expires_at);
                *self.session.write().await = Some(session.clone());
                info!(user_id = grant.user_id, "session established");
                Ok(session)
            }
            Err(e) => {
                warn!(error = %e, "profile fetch failed, tearing down session");
                self.clear_credentials().await;
                *self.session.write().await = None;
                Err(e.into())
            }
        }
    }

    /// Drop the in-memory session without touching stored credentials.
    pub async fn clear(&self) {
        *self.session.write().await = None;
    }

    /// Sign out: best-effort server-side revocation, then remove the
    /// stored credential and the in-memory session. Local sign-out always
    /// succeeds even when revocation does not.
    pub async fn logout(&self, revoke_all: bool) {
        if let Ok(Some(refresh_token)) = self.credentials.load().await {
            if let Err(e) = self.api.logout(&refresh_token, revoke_all).await {
                warn!(error = %e, "refresh credential revocation failed");
            }
        }

        self.clear_credentials().await;
        *self.session.write().await = None;
        info!("signed out");
    }

    async fn persist_rotated_credential(&self, grant: &TokenGrant) {
        if let Err(e) = self.credentials.store(&grant.refresh_token).await {
            // The session still works for this run; the next start will
            // have to sign in again.
            warn!(error = %e, "failed to persist refresh credential");
        }
    }

    async fn clear_credentials(&self) {
        if let Err(e) = self.credentials.clear().await {
            warn!(error = %e, "failed to clear stored credentials");
        }
    }
}

impl<A, S> std::fmt::Debug for SessionManager<A, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field("bootstrapped", &self.bootstrapped.initialized())
            .finish_non_exhaustive()
    }
}
