//! Pending-authorization store.
//!
//! Holds the single in-flight [`PendingAuthorization`] between the moment
//! the provider URL is issued and the moment the callback arrives. The
//! slot is single-use: any `take_and_validate` empties it, whatever the
//! outcome, so a state value can never be validated twice.

use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::error::StateError;
use crate::types::PendingAuthorization;

/// Process-local store for the one pending authorization attempt.
///
/// Storing a new attempt overwrites any previous one: starting a second
/// authorization abandons the first. Concurrent attempts from multiple
/// windows are an accepted limitation of this design.
#[derive(Debug, Default)]
pub struct PendingAuthStore {
    slot: Mutex<Option<PendingAuthorization>>,
}

impl PendingAuthStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a new pending authorization, replacing any previous one.
    pub fn put(&self, pending: PendingAuthorization) {
        let mut slot = self.slot.lock();
        if let Some(previous) = slot.as_ref() {
            debug!(
                abandoned_purpose = ?previous.purpose,
                "replacing pending authorization"
            );
        }
        *slot = Some(pending);
    }

    /// Consume the pending authorization matching `received_state`.
    ///
    /// The slot is emptied unconditionally before any comparison, so a
    /// replayed or mismatched callback also burns the pending attempt.
    ///
    /// # Errors
    ///
    /// [`StateError::NotFound`] when nothing was pending,
    /// [`StateError::Mismatch`] when the stored state differs from
    /// `received_state`.
    pub fn take_and_validate(
        &self,
        received_state: &str,
    ) -> Result<PendingAuthorization, StateError> {
        let taken = self.slot.lock().take();

        let Some(pending) = taken else {
            warn!("authorization callback with no pending attempt");
            return Err(StateError::NotFound);
        };

        if pending.state != received_state {
            warn!("authorization callback state mismatch, possible CSRF");
            return Err(StateError::Mismatch);
        }

        Ok(pending)
    }

    /// Whether an authorization attempt is currently pending.
    #[must_use]
    pub fn has_pending(&self) -> bool {
        self.slot.lock().is_some()
    }

    /// Abandon any pending attempt (e.g. the user cancelled the flow).
    pub fn clear(&self) {
        *self.slot.lock() = None;
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for the pending-authorization store.
    use super::*;
    use crate::types::AuthPurpose;

    fn pending(state: &str, verifier: &str) -> PendingAuthorization {
        PendingAuthorization {
            state: state.to_string(),
            code_verifier: verifier.to_string(),
            purpose: AuthPurpose::Login,
        }
    }

    #[test]
    fn take_returns_bound_verifier() {
        let store = PendingAuthStore::new();
        store.put(pending("state-a", "verifier-a"));

        let taken = store.take_and_validate("state-a").unwrap();
        assert_eq!(taken.code_verifier, "verifier-a");
        assert_eq!(taken.purpose, AuthPurpose::Login);
    }

    /// Single-use: a second take with the same state finds nothing.
    #[test]
    fn second_take_fails_with_not_found() {
        let store = PendingAuthStore::new();
        store.put(pending("state-a", "verifier-a"));

        assert!(store.take_and_validate("state-a").is_ok());
        assert_eq!(store.take_and_validate("state-a"), Err(StateError::NotFound));
    }

    #[test]
    fn empty_store_reports_not_found() {
        let store = PendingAuthStore::new();
        assert_eq!(store.take_and_validate("anything"), Err(StateError::NotFound));
    }

    /// CSRF rejection: a mismatched state fails AND burns the entry, so
    /// the legitimate state can no longer be validated either.
    #[test]
    fn mismatch_burns_the_pending_entry() {
        let store = PendingAuthStore::new();
        store.put(pending("state-a", "verifier-a"));

        assert_eq!(store.take_and_validate("state-b"), Err(StateError::Mismatch));
        assert_eq!(store.take_and_validate("state-a"), Err(StateError::NotFound));
    }

    #[test]
    fn put_overwrites_previous_attempt() {
        let store = PendingAuthStore::new();
        store.put(pending("state-a", "verifier-a"));
        store.put(pending("state-b", "verifier-b"));

        // The first attempt is gone; only the newest validates.
        assert_eq!(store.take_and_validate("state-a"), Err(StateError::Mismatch));
        assert_eq!(store.take_and_validate("state-b"), Err(StateError::NotFound));
    }

    #[test]
    fn clear_empties_the_slot() {
        let store = PendingAuthStore::new();
        store.put(pending("state-a", "verifier-a"));
        assert!(store.has_pending());

        store.clear();
        assert!(!store.has_pending());
        assert_eq!(store.take_and_validate("state-a"), Err(StateError::NotFound));
    }
}
