//! OAuth 2.0 + PKCE authentication core for the Maildeck email client.
//!
//! Maildeck's UI talks to a backend REST API that brokers the actual
//! Google OAuth exchange. This crate owns everything between the "Sign in
//! with Google" click and an authenticated session: PKCE parameters, the
//! provider authorization URL, the pending-attempt state, callback
//! validation, the backend token calls, durable refresh-credential
//! storage, and the one-shot session bootstrap on startup.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────┐
//! │   AuthService    │  flow orchestration (login, callback, logout)
//! └────────┬─────────┘
//!          │
//!          ├──► PendingAuthStore   (state → verifier + purpose, single-use)
//!          ├──► SessionManager     (session ownership + bootstrap latch)
//!          │         │
//!          │         ├──► AuthApi           (backend REST calls)
//!          │         └──► CredentialStore   (refresh token at rest)
//!          │
//!          └──► pkce / callback    (parameter generation, URL validation)
//! ```
//!
//! `AuthApi` and `CredentialStore` are traits; production wires in the
//! reqwest-backed [`client::AuthClient`] and the platform-keychain-backed
//! [`keychain::KeychainCredentialStore`], tests inject the doubles from
//! [`testing`].
//!
//! # Flow
//!
//! ```no_run
//! use maildeck_auth::service::AuthService;
//! use maildeck_auth::session::BootstrapOutcome;
//! use maildeck_auth::types::{AuthConfig, AuthPurpose};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let service = AuthService::from_config(AuthConfig::from_env())?;
//!
//!     // On startup: silent session restoration, at most once.
//!     if service.bootstrap().await == BootstrapOutcome::Unauthenticated {
//!         // Show the login screen; on "Sign in with Google":
//!         let request = service.start_authorization(AuthPurpose::Login)?;
//!         // navigate to request.url ...
//!         // ... and when the provider redirects back:
//!         let callback_url = "https://app/auth/callback?code=..&state=..";
//!         let outcome = service.handle_callback(callback_url).await?;
//!         println!("{outcome:?}");
//!     }
//!
//!     Ok(())
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms)]

pub mod callback;
pub mod client;
pub mod error;
pub mod keychain;
pub mod pending;
pub mod pkce;
pub mod service;
pub mod session;
pub mod testing;
pub mod traits;
pub mod types;

// Re-export the types most integrations need.
pub use callback::{CallbackParams, ValidatedCallback};
pub use client::AuthClient;
pub use error::{ApiError, AuthError, CredentialError, StateError};
pub use keychain::KeychainCredentialStore;
pub use pending::PendingAuthStore;
pub use pkce::PkceChallenge;
pub use service::{AuthService, AuthorizationRequest, CallbackOutcome};
pub use session::{BootstrapOutcome, SessionManager};
pub use traits::{AuthApi, CredentialStore};
pub use types::{
    AuthConfig, AuthPurpose, NewUser, PendingAuthorization, Session, TokenGrant, UserProfile,
};
