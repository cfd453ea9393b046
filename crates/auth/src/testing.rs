//! In-memory test doubles for the injectable seams.
//!
//! [`MockAuthApi`] records per-operation call counts and serves
//! programmable responses; [`MemoryCredentialStore`] keeps the refresh
//! credential in a mutex-guarded slot. Both are used by the integration
//! suite and are available to downstream crates for their own tests.

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::error::{ApiError, CredentialError};
use crate::traits::{AuthApi, CredentialStore};
use crate::types::{NewUser, TokenGrant, UserProfile};

/// Failure modes a mock operation can be programmed with, mirroring the
/// classification the session layer cares about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockFailure {
    /// 401: credential dead.
    Unauthorized,
    /// 5xx: transient backend failure.
    Server,
    /// Transport failure.
    Network,
}

impl MockFailure {
    fn into_error(self) -> ApiError {
        match self {
            Self::Unauthorized => ApiError::Unauthorized("mock rejection".to_string()),
            Self::Server => ApiError::Server { status: 500, message: "mock outage".to_string() },
            Self::Network => ApiError::Network("mock connection refused".to_string()),
        }
    }
}

/// A token grant with recognizable defaults for assertions.
#[must_use]
pub fn sample_grant(access: &str, refresh: &str, user_id: i64) -> TokenGrant {
    TokenGrant {
        user_id,
        access_token: access.to_string(),
        expires_at: Some(chrono::Utc::now() + chrono::Duration::seconds(3600)),
        refresh_token: refresh.to_string(),
    }
}

/// A hydrated profile matching [`sample_grant`]'s user id by default.
#[must_use]
pub fn sample_profile(user_id: i64, email: &str) -> UserProfile {
    UserProfile {
        id: user_id,
        email: email.to_string(),
        first_name: "Ada".to_string(),
        last_name: "Lovelace".to_string(),
        avatar_url: None,
        is_email_verified: true,
    }
}

#[derive(Debug, Default)]
struct MockAuthApiState {
    exchange_calls: u32,
    refresh_calls: u32,
    profile_calls: u32,
    login_calls: u32,
    register_calls: u32,
    logout_calls: u32,
    connect_calls: u32,

    last_refresh_token: Option<String>,

    exchange_grant: Option<TokenGrant>,
    exchange_failure: Option<MockFailure>,
    refresh_grant: Option<TokenGrant>,
    refresh_failure: Option<MockFailure>,
    profile: Option<UserProfile>,
    profile_failure: Option<MockFailure>,
    login_grant: Option<TokenGrant>,
    login_failure: Option<MockFailure>,
    logout_failure: Option<MockFailure>,
    connect_failure: Option<MockFailure>,
}

/// Programmable [`AuthApi`] double with call recording.
///
/// Every operation returns a sensible default unless a response or a
/// failure has been programmed. Counters are cumulative.
#[derive(Debug, Default)]
pub struct MockAuthApi {
    state: Mutex<MockAuthApiState>,
}

impl MockAuthApi {
    /// Create a mock with default responses everywhere.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Program the grant returned by `exchange_authorization_code`.
    pub fn set_exchange_grant(&self, grant: TokenGrant) {
        self.state.lock().exchange_grant = Some(grant);
    }

    /// Make `exchange_authorization_code` fail.
    pub fn fail_exchange(&self, failure: MockFailure) {
        self.state.lock().exchange_failure = Some(failure);
    }

    /// Program the grant returned by `refresh_session`.
    pub fn set_refresh_grant(&self, grant: TokenGrant) {
        self.state.lock().refresh_grant = Some(grant);
    }

    /// Make `refresh_session` fail.
    pub fn fail_refresh(&self, failure: MockFailure) {
        self.state.lock().refresh_failure = Some(failure);
    }

    /// Program the profile returned by `fetch_profile`.
    pub fn set_profile(&self, profile: UserProfile) {
        self.state.lock().profile = Some(profile);
    }

    /// Make `fetch_profile` fail.
    pub fn fail_profile(&self, failure: MockFailure) {
        self.state.lock().profile_failure = Some(failure);
    }

    /// Program the grant returned by `login`.
    pub fn set_login_grant(&self, grant: TokenGrant) {
        self.state.lock().login_grant = Some(grant);
    }

    /// Make `login` fail.
    pub fn fail_login(&self, failure: MockFailure) {
        self.state.lock().login_failure = Some(failure);
    }

    /// Make `logout` fail.
    pub fn fail_logout(&self, failure: MockFailure) {
        self.state.lock().logout_failure = Some(failure);
    }

    /// Make `connect_mailbox` fail.
    pub fn fail_connect(&self, failure: MockFailure) {
        self.state.lock().connect_failure = Some(failure);
    }

    /// Number of `exchange_authorization_code` calls so far.
    #[must_use]
    pub fn exchange_calls(&self) -> u32 {
        self.state.lock().exchange_calls
    }

    /// Number of `refresh_session` calls so far.
    #[must_use]
    pub fn refresh_calls(&self) -> u32 {
        self.state.lock().refresh_calls
    }

    /// Number of `fetch_profile` calls so far.
    #[must_use]
    pub fn profile_calls(&self) -> u32 {
        self.state.lock().profile_calls
    }

    /// The refresh token presented on the most recent `refresh_session`
    /// call.
    #[must_use]
    pub fn last_refresh_token(&self) -> Option<String> {
        self.state.lock().last_refresh_token.clone()
    }

    /// Number of `logout` calls so far.
    #[must_use]
    pub fn logout_calls(&self) -> u32 {
        self.state.lock().logout_calls
    }

    /// Number of `connect_mailbox` calls so far.
    #[must_use]
    pub fn connect_calls(&self) -> u32 {
        self.state.lock().connect_calls
    }
}

#[async_trait]
impl AuthApi for MockAuthApi {
    async fn exchange_authorization_code(
        &self,
        _code: &str,
        _code_verifier: &str,
    ) -> Result<TokenGrant, ApiError> {
        let mut state = self.state.lock();
        state.exchange_calls += 1;
        if let Some(failure) = state.exchange_failure {
            return Err(failure.into_error());
        }
        Ok(state.exchange_grant.clone().unwrap_or_else(|| sample_grant("a-ex", "r-ex", 1)))
    }

    async fn refresh_session(&self, refresh_token: &str) -> Result<TokenGrant, ApiError> {
        let mut state = self.state.lock();
        state.refresh_calls += 1;
        state.last_refresh_token = Some(refresh_token.to_string());
        if let Some(failure) = state.refresh_failure {
            return Err(failure.into_error());
        }
        Ok(state.refresh_grant.clone().unwrap_or_else(|| sample_grant("a-rf", "r-rf", 1)))
    }

    async fn fetch_profile(&self, _access_token: &str) -> Result<UserProfile, ApiError> {
        let mut state = self.state.lock();
        state.profile_calls += 1;
        if let Some(failure) = state.profile_failure {
            return Err(failure.into_error());
        }
        Ok(state.profile.clone().unwrap_or_else(|| sample_profile(1, "u@x.com")))
    }

    async fn login(&self, _email: &str, _password: &str) -> Result<TokenGrant, ApiError> {
        let mut state = self.state.lock();
        state.login_calls += 1;
        if let Some(failure) = state.login_failure {
            return Err(failure.into_error());
        }
        Ok(state.login_grant.clone().unwrap_or_else(|| sample_grant("a-pw", "r-pw", 1)))
    }

    async fn register(&self, _new_user: &NewUser) -> Result<TokenGrant, ApiError> {
        let mut state = self.state.lock();
        state.register_calls += 1;
        Ok(sample_grant("a-rg", "r-rg", 1))
    }

    async fn logout(&self, _refresh_token: &str, _revoke_all: bool) -> Result<(), ApiError> {
        let mut state = self.state.lock();
        state.logout_calls += 1;
        match state.logout_failure {
            Some(failure) => Err(failure.into_error()),
            None => Ok(()),
        }
    }

    async fn connect_mailbox(
        &self,
        _access_token: &str,
        _code: &str,
        _code_verifier: &str,
    ) -> Result<(), ApiError> {
        let mut state = self.state.lock();
        state.connect_calls += 1;
        match state.connect_failure {
            Some(failure) => Err(failure.into_error()),
            None => Ok(()),
        }
    }
}

/// In-memory [`CredentialStore`].
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    slot: Mutex<Option<String>>,
    fail_reads: Mutex<bool>,
}

impl MemoryCredentialStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store already holding a refresh credential.
    #[must_use]
    pub fn with_token(refresh_token: &str) -> Self {
        Self { slot: Mutex::new(Some(refresh_token.to_string())), fail_reads: Mutex::new(false) }
    }

    /// Make subsequent `load` calls fail, simulating an inaccessible
    /// platform store.
    pub fn fail_reads(&self, fail: bool) {
        *self.fail_reads.lock() = fail;
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn load(&self) -> Result<Option<String>, CredentialError> {
        if *self.fail_reads.lock() {
            return Err(CredentialError::Storage("mock keychain unavailable".to_string()));
        }
        Ok(self.slot.lock().clone())
    }

    async fn store(&self, refresh_token: &str) -> Result<(), CredentialError> {
        *self.slot.lock() = Some(refresh_token.to_string());
        Ok(())
    }

    async fn clear(&self) -> Result<(), CredentialError> {
        *self.slot.lock() = None;
        Ok(())
    }
}
