//! High-level authentication flows.
//!
//! [`AuthService`] ties the pieces together: it issues authorization URLs
//! (PKCE triple + pending record), turns provider callbacks into sessions
//! or mailbox connections, and exposes password login, registration,
//! bootstrap, and logout. The session itself is owned by the injected
//! [`SessionManager`].

use std::sync::Arc;

use tracing::info;

use crate::callback::validate_callback;
use crate::client::AuthClient;
use crate::error::AuthError;
use crate::keychain::KeychainCredentialStore;
use crate::pending::PendingAuthStore;
use crate::pkce::PkceChallenge;
use crate::session::{BootstrapOutcome, SessionManager};
use crate::traits::{AuthApi, CredentialStore};
use crate::types::{AuthConfig, AuthPurpose, NewUser, PendingAuthorization, Session};

/// A prepared authorization attempt. Navigating to `url` is the caller's
/// responsibility; the matching pending record is already stored.
#[derive(Debug, Clone)]
pub struct AuthorizationRequest {
    /// Fully-formed provider authorization URL.
    pub url: String,

    /// State bound to this attempt (also embedded in `url`).
    pub state: String,
}

/// What a successfully handled callback produced.
#[derive(Debug)]
pub enum CallbackOutcome {
    /// A login-purpose callback established this session.
    SignedIn(Session),

    /// A mailbox-connection callback attached a mailbox to the current
    /// session.
    MailboxConnected,
}

/// Authentication flow orchestrator.
pub struct AuthService<A, S> {
    config: AuthConfig,
    api: Arc<A>,
    pending: PendingAuthStore,
    sessions: Arc<SessionManager<A, S>>,
}

impl AuthService<AuthClient, KeychainCredentialStore> {
    /// Wire up the production stack: reqwest client against the configured
    /// backend, refresh credential in the platform keychain.
    ///
    /// # Errors
    ///
    /// [`AuthError::Api`] when the HTTP client cannot be constructed.
    pub fn from_config(config: AuthConfig) -> Result<Self, AuthError> {
        let api = Arc::new(AuthClient::new(&config)?);
        let credentials = Arc::new(KeychainCredentialStore::new());
        Ok(Self::new(config, api, credentials))
    }
}

impl<A, S> AuthService<A, S>
where
    A: AuthApi,
    S: CredentialStore,
{
    /// Create a service over explicit backend and credential-store
    /// implementations.
    pub fn new(config: AuthConfig, api: Arc<A>, credentials: Arc<S>) -> Self {
        let sessions = Arc::new(SessionManager::new(api.clone(), credentials));
        Self { config, api, pending: PendingAuthStore::new(), sessions }
    }

    /// The session manager owning the current session.
    pub fn sessions(&self) -> Arc<SessionManager<A, S>> {
        self.sessions.clone()
    }

    /// Attempt silent session restoration. Safe to call more than once;
    /// see [`SessionManager::bootstrap`].
    pub async fn bootstrap(&self) -> BootstrapOutcome {
        self.sessions.bootstrap().await
    }

    /// Begin an authorization attempt for the given purpose.
    ///
    /// Generates a fresh PKCE triple, records the pending authorization,
    /// and returns the provider URL. Starting a new attempt abandons any
    /// previous pending one.
    ///
    /// # Errors
    ///
    /// [`AuthError::NotConfigured`] when no OAuth client id is configured.
    pub fn start_authorization(
        &self,
        purpose: AuthPurpose,
    ) -> Result<AuthorizationRequest, AuthError> {
        if self.config.client_id.is_empty() {
            return Err(AuthError::NotConfigured("OAuth client id"));
        }

        let pkce = PkceChallenge::generate();
        let url = self.config.authorization_url(&pkce);

        self.pending.put(PendingAuthorization {
            state: pkce.state.clone(),
            code_verifier: pkce.code_verifier,
            purpose,
        });

        info!(?purpose, "authorization attempt started");
        Ok(AuthorizationRequest { url, state: pkce.state })
    }

    /// Handle the provider redirect.
    ///
    /// Validates the callback against the pending store (consuming the
    /// pending record and its purpose), exchanges the authorization code,
    /// and dispatches on the recorded purpose: login establishes the
    /// session, mailbox connection attaches a mailbox to the current one.
    ///
    /// # Errors
    ///
    /// Parsing/validation errors from [`validate_callback`];
    /// [`AuthError::NotAuthenticated`] for a mailbox-connection callback
    /// without a session; [`AuthError::Api`] from the exchange itself.
    pub async fn handle_callback(&self, redirect_url: &str) -> Result<CallbackOutcome, AuthError> {
        let callback = validate_callback(redirect_url, &self.pending)?;

        match callback.purpose {
            AuthPurpose::Login => {
                let grant = self
                    .api
                    .exchange_authorization_code(&callback.code, &callback.code_verifier)
                    .await?;
                let session = self.sessions.establish(grant).await?;
                Ok(CallbackOutcome::SignedIn(session))
            }
            AuthPurpose::MailboxConnection => {
                let access_token =
                    self.sessions.access_token().await.ok_or(AuthError::NotAuthenticated)?;
                self.api
                    .connect_mailbox(&access_token, &callback.code, &callback.code_verifier)
                    .await?;
                info!("additional mailbox connected");
                Ok(CallbackOutcome::MailboxConnected)
            }
        }
    }

    /// Password sign-in.
    ///
    /// # Errors
    ///
    /// [`AuthError::Api`] from the login call or the profile fetch.
    pub async fn login(&self, email: &str, password: &str) -> Result<Session, AuthError> {
        let grant = self.api.login(email, password).await?;
        self.sessions.establish(grant).await
    }

    /// Create an account and sign it in.
    ///
    /// # Errors
    ///
    /// [`AuthError::Api`] from the registration call or the profile fetch.
    pub async fn register(&self, new_user: &NewUser) -> Result<Session, AuthError> {
        let grant = self.api.register(new_user).await?;
        self.sessions.establish(grant).await
    }

    /// Sign out. Also abandons any pending authorization attempt.
    pub async fn logout(&self, revoke_all: bool) {
        self.pending.clear();
        self.sessions.logout(revoke_all).await;
    }

    /// Whether an authorization attempt is awaiting its callback.
    #[must_use]
    pub fn has_pending_authorization(&self) -> bool {
        self.pending.has_pending()
    }

    /// Abandon the pending authorization attempt, if any.
    pub fn cancel_authorization(&self) {
        self.pending.clear();
    }
}

impl<A, S> std::fmt::Debug for AuthService<A, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthService").field("config", &self.config).finish_non_exhaustive()
    }
}
