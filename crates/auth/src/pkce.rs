//! PKCE (Proof Key for Code Exchange) parameter generation.
//!
//! Implements RFC 7636 for OAuth authorization without a client secret.
//! Each authorization attempt gets a fresh `(code_verifier, code_challenge,
//! state)` triple; the verifier stays on the client until token exchange,
//! the challenge and state travel to the provider.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::RngCore;
use sha2::{Digest, Sha256};

/// Verifier entropy in bytes. 32 random bytes base64url-encode to 43
/// characters, the RFC 7636 minimum.
const VERIFIER_BYTES: usize = 32;

/// State entropy in bytes. The state only binds the callback to the
/// request; 16 bytes (128 bits) is plenty.
const STATE_BYTES: usize = 16;

/// Generate a cryptographically random code verifier.
///
/// Returns a URL-safe base64-encoded string of 32 random bytes
/// (43 characters). Per RFC 7636, verifiers must be 43-128 characters.
///
/// Randomness comes from the thread-local CSPRNG, which is seeded by the
/// operating system and panics rather than degrading if no secure source
/// is available.
#[must_use]
pub fn generate_code_verifier() -> String {
    URL_SAFE_NO_PAD.encode(random_bytes(VERIFIER_BYTES))
}

/// Compute the code challenge for a verifier using the S256 method:
/// `BASE64URL(SHA256(ASCII(code_verifier)))`.
#[must_use]
pub fn generate_code_challenge(verifier: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(verifier.as_bytes());
    URL_SAFE_NO_PAD.encode(hasher.finalize())
}

/// Generate a random state token for CSRF protection.
///
/// Independent of the verifier; 16 random bytes base64url-encoded
/// (22 characters).
#[must_use]
pub fn generate_state() -> String {
    URL_SAFE_NO_PAD.encode(random_bytes(STATE_BYTES))
}

fn random_bytes(n: usize) -> Vec<u8> {
    let mut bytes = vec![0u8; n];
    rand::thread_rng().fill_bytes(&mut bytes);
    bytes
}

/// PKCE parameters for one authorization attempt.
#[derive(Debug, Clone)]
pub struct PkceChallenge {
    /// Random string (43-128 chars, base64url). Kept secret until token
    /// exchange.
    pub code_verifier: String,

    /// `SHA256(code_verifier)`, base64url. Sent in the authorization
    /// request.
    pub code_challenge: String,

    /// Random CSRF-binding token echoed by the provider on callback.
    pub state: String,
}

impl PkceChallenge {
    /// Generate a fresh triple with no correlation to prior invocations.
    #[must_use]
    pub fn generate() -> Self {
        let code_verifier = generate_code_verifier();
        let code_challenge = generate_code_challenge(&code_verifier);
        let state = generate_state();

        Self { code_verifier, code_challenge, state }
    }

    /// Build a challenge from an existing verifier. Useful in tests where
    /// the verifier must be known in advance.
    #[must_use]
    pub fn from_verifier(code_verifier: impl Into<String>) -> Self {
        let code_verifier = code_verifier.into();
        let code_challenge = generate_code_challenge(&code_verifier);
        let state = generate_state();

        Self { code_verifier, code_challenge, state }
    }

    /// The challenge method, always `"S256"`.
    #[must_use]
    pub fn challenge_method(&self) -> &'static str {
        "S256"
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for PKCE generation.
    use std::collections::HashSet;

    use super::*;

    fn is_base64url(s: &str) -> bool {
        s.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    }

    /// RFC 7636 §4.1: verifier length in [43, 128], unreserved alphabet.
    #[test]
    fn verifier_length_and_alphabet() {
        for _ in 0..10 {
            let verifier = generate_code_verifier();
            assert!(verifier.len() >= 43, "verifier too short: {}", verifier.len());
            assert!(verifier.len() <= 128, "verifier too long: {}", verifier.len());
            assert!(is_base64url(&verifier), "invalid character in {verifier}");
        }
    }

    /// RFC 7636 §4.2: challenge equals BASE64URL(SHA256(verifier)),
    /// verified against an independent recomputation.
    #[test]
    fn challenge_matches_recomputation() {
        // Known vector from RFC 7636 appendix B.
        let verifier = "dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk";
        assert_eq!(
            generate_code_challenge(verifier),
            "E9Melhoa2OwvFrEMTJguCHaoeK1t8URWbuGJSstw-cM"
        );

        let pkce = PkceChallenge::generate();
        assert_eq!(pkce.code_challenge, generate_code_challenge(&pkce.code_verifier));
    }

    #[test]
    fn challenge_is_deterministic() {
        let verifier = generate_code_verifier();
        assert_eq!(generate_code_challenge(&verifier), generate_code_challenge(&verifier));
    }

    #[test]
    fn outputs_are_unpadded_base64url() {
        let pkce = PkceChallenge::generate();
        for value in [&pkce.code_verifier, &pkce.code_challenge, &pkce.state] {
            assert!(!value.contains('='));
            assert!(!value.contains('+'));
            assert!(!value.contains('/'));
        }
        // 16 state bytes encode to 22 characters.
        assert_eq!(pkce.state.len(), 22);
        assert_eq!(pkce.code_verifier.len(), 43);
    }

    /// Freshness: no collisions across many generations.
    #[test]
    fn no_collisions_across_many_generations() {
        let mut verifiers = HashSet::new();
        let mut states = HashSet::new();
        for _ in 0..10_000 {
            assert!(verifiers.insert(generate_code_verifier()), "verifier collision");
            assert!(states.insert(generate_state()), "state collision");
        }
    }

    #[test]
    fn from_verifier_keeps_verifier() {
        let pkce = PkceChallenge::from_verifier("fixed-verifier-0123456789012345678901234567890");
        assert_eq!(pkce.code_verifier, "fixed-verifier-0123456789012345678901234567890");
        assert_eq!(pkce.challenge_method(), "S256");
    }

    #[test]
    fn state_is_independent_of_verifier() {
        let a = PkceChallenge::from_verifier("same-verifier-same-verifier-same-verifier-1");
        let b = PkceChallenge::from_verifier("same-verifier-same-verifier-same-verifier-1");
        assert_eq!(a.code_challenge, b.code_challenge);
        assert_ne!(a.state, b.state);
    }
}
