//! Authorization callback parsing and validation.
//!
//! Turns the redirect URL delivered by the identity provider into a
//! validated `(code, verifier, purpose)` triple, or a precise failure:
//! provider denial, malformed parameters, or a state that no pending
//! authorization vouches for.

use url::Url;

use crate::error::{AuthError, StateError};
use crate::pending::PendingAuthStore;
use crate::types::AuthPurpose;

/// Raw `code`/`state` pair extracted from a callback URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallbackParams {
    pub code: String,
    pub state: String,
}

/// A callback that passed state validation and is ready for token
/// exchange.
#[derive(Debug, Clone)]
pub struct ValidatedCallback {
    /// Single-use authorization code issued by the provider.
    pub code: String,

    /// PKCE verifier bound to this attempt.
    pub code_verifier: String,

    /// Purpose recorded when the attempt was initiated.
    pub purpose: AuthPurpose,
}

/// Extract `code` and `state` from a redirect URL.
///
/// # Errors
///
/// [`AuthError::ProviderDenied`] when the provider reported an error
/// (nothing is validated in that case), [`AuthError::MalformedCallback`]
/// when the URL cannot be parsed or lacks `code`/`state`.
pub fn parse_callback(redirect_url: &str) -> Result<CallbackParams, AuthError> {
    let url = Url::parse(redirect_url).map_err(|_| AuthError::MalformedCallback)?;

    let mut code = None;
    let mut state = None;
    let mut error = None;
    let mut error_description = None;

    for (key, value) in url.query_pairs() {
        match key.as_ref() {
            "code" => code = Some(value.into_owned()),
            "state" => state = Some(value.into_owned()),
            "error" => error = Some(value.into_owned()),
            "error_description" => error_description = Some(value.into_owned()),
            _ => {}
        }
    }

    if let Some(error) = error {
        return Err(AuthError::ProviderDenied { error, description: error_description });
    }

    match (code, state) {
        (Some(code), Some(state)) => Ok(CallbackParams { code, state }),
        _ => Err(AuthError::MalformedCallback),
    }
}

/// Parse a redirect URL and validate it against the pending store.
///
/// On success the pending authorization is consumed and its verifier and
/// purpose are returned alongside the authorization code. On a provider
/// error the store is left untouched; on a state failure the pending entry
/// has already been burned by the store.
///
/// # Errors
///
/// Everything [`parse_callback`] returns, plus
/// [`AuthError::SessionExpired`] (no pending attempt) and
/// [`AuthError::PossibleCsrf`] (state mismatch).
pub fn validate_callback(
    redirect_url: &str,
    pending: &PendingAuthStore,
) -> Result<ValidatedCallback, AuthError> {
    let params = parse_callback(redirect_url)?;

    let authorization = pending.take_and_validate(&params.state).map_err(|err| match err {
        StateError::NotFound => AuthError::SessionExpired,
        StateError::Mismatch => AuthError::PossibleCsrf,
    })?;

    Ok(ValidatedCallback {
        code: params.code,
        code_verifier: authorization.code_verifier,
        purpose: authorization.purpose,
    })
}
