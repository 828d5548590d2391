//! PKCE (Proof Key for Code Exchange) implementation.
//!
//! Implements RFC 7636 with both the `plain` and `S256` challenge methods.
//! Comparisons are constant-time so a verifier check does not leak how much
//! of the value matched.
//!
//! # Example
//!
//! ```
//! use gatehouse_auth::oauth::{PkceChallenge, PkceMethod, PkceVerifier};
//!
//! // Client generates a verifier and derives the S256 challenge
//! let verifier = PkceVerifier::generate();
//! let challenge = PkceChallenge::from_verifier(&verifier);
//!
//! // Server stores the challenge and later verifies the presented verifier
//! let stored = PkceChallenge::new(challenge.as_str().to_string()).unwrap();
//! assert!(stored.verify(&verifier, PkceMethod::S256).is_ok());
//! ```

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur during PKCE operations.
#[derive(Debug, thiserror::Error)]
pub enum PkceError {
    /// Verifier length is outside the valid range (43-128 characters).
    #[error("Invalid verifier length: must be 43-128 characters, got {0}")]
    InvalidVerifierLength(usize),

    /// Verifier contains invalid characters.
    #[error("Invalid verifier characters: must be unreserved characters ([A-Za-z0-9-._~])")]
    InvalidVerifierCharacters,

    /// Challenge format is invalid.
    #[error("Invalid challenge format")]
    InvalidChallengeFormat,

    /// Unknown challenge method.
    #[error("Unsupported challenge method: {0}")]
    UnsupportedMethod(String),

    /// PKCE verification failed (verifier doesn't match challenge).
    #[error("PKCE verification failed: verifier does not match challenge")]
    VerificationFailed,
}

impl PkceError {
    /// Get the OAuth 2.0 error code for this error.
    #[must_use]
    pub fn oauth_error_code(&self) -> &'static str {
        match self {
            Self::InvalidVerifierLength(_)
            | Self::InvalidVerifierCharacters
            | Self::InvalidChallengeFormat
            | Self::UnsupportedMethod(_) => "invalid_request",
            Self::VerificationFailed => "invalid_grant",
        }
    }
}

// =============================================================================
// PKCE Method
// =============================================================================

/// PKCE challenge method per RFC 7636 Section 4.2.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PkceMethod {
    /// Plain comparison: challenge equals verifier byte-for-byte.
    #[serde(rename = "plain")]
    Plain,
    /// SHA-256: challenge is base64url(SHA-256(verifier)).
    S256,
}

impl PkceMethod {
    /// Parses a challenge method string.
    ///
    /// # Errors
    ///
    /// Returns `PkceError::UnsupportedMethod` for anything but "plain" or "S256".
    pub fn parse(method: &str) -> Result<Self, PkceError> {
        match method {
            "plain" => Ok(Self::Plain),
            "S256" => Ok(Self::S256),
            other => Err(PkceError::UnsupportedMethod(other.to_string())),
        }
    }

    /// Returns the method as its wire string.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Plain => "plain",
            Self::S256 => "S256",
        }
    }
}

impl std::fmt::Display for PkceMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl Default for PkceMethod {
    fn default() -> Self {
        Self::S256
    }
}

// =============================================================================
// PKCE Verifier
// =============================================================================

/// PKCE code verifier.
///
/// A high-entropy random string of 43-128 unreserved characters
/// (`[A-Z] / [a-z] / [0-9] / "-" / "." / "_" / "~"`), per RFC 7636
/// Section 4.1.
#[derive(Debug, Clone)]
pub struct PkceVerifier(String);

impl PkceVerifier {
    /// Creates a verifier from a client-presented string.
    ///
    /// # Errors
    ///
    /// Returns an error if the length is outside 43-128 characters or the
    /// string contains characters outside the unreserved set.
    pub fn new(verifier: String) -> Result<Self, PkceError> {
        let len = verifier.len();

        if !(43..=128).contains(&len) {
            return Err(PkceError::InvalidVerifierLength(len));
        }

        if !verifier.chars().all(is_unreserved) {
            return Err(PkceError::InvalidVerifierCharacters);
        }

        Ok(Self(verifier))
    }

    /// Generates a cryptographically random verifier.
    ///
    /// 32 random bytes, base64url-encoded to 43 characters.
    #[must_use]
    pub fn generate() -> Self {
        let mut bytes = [0u8; 32];
        rand::Rng::fill(&mut rand::thread_rng(), &mut bytes);
        Self(URL_SAFE_NO_PAD.encode(bytes))
    }

    /// Returns the verifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the verifier and returns the inner string.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl AsRef<str> for PkceVerifier {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

fn is_unreserved(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '-' || c == '.' || c == '_' || c == '~'
}

// =============================================================================
// PKCE Challenge
// =============================================================================

/// PKCE code challenge.
///
/// For `S256` the challenge is `BASE64URL(SHA256(ASCII(code_verifier)))`;
/// for `plain` it is the verifier itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PkceChallenge(String);

impl PkceChallenge {
    /// Creates a challenge from a client-presented string.
    ///
    /// Both methods produce challenges of 43-128 unreserved characters, so
    /// one shape check covers `plain` and `S256`.
    ///
    /// # Errors
    ///
    /// Returns `PkceError::InvalidChallengeFormat` on a malformed value.
    pub fn new(challenge: String) -> Result<Self, PkceError> {
        let len = challenge.len();
        if !(43..=128).contains(&len) || !challenge.chars().all(is_unreserved) {
            return Err(PkceError::InvalidChallengeFormat);
        }
        Ok(Self(challenge))
    }

    /// Derives the S256 challenge for a verifier.
    #[must_use]
    pub fn from_verifier(verifier: &PkceVerifier) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(verifier.as_str().as_bytes());
        Self(URL_SAFE_NO_PAD.encode(hasher.finalize()))
    }

    /// Verifies a presented verifier against this challenge.
    ///
    /// `plain` compares the raw bytes; `S256` compares against
    /// base64url(SHA-256(verifier)). Both comparisons are constant-time.
    ///
    /// # Errors
    ///
    /// Returns `PkceError::VerificationFailed` if the verifier does not match.
    pub fn verify(&self, verifier: &PkceVerifier, method: PkceMethod) -> Result<(), PkceError> {
        let matches = match method {
            PkceMethod::Plain => ct_eq(self.0.as_bytes(), verifier.as_str().as_bytes()),
            PkceMethod::S256 => {
                let expected = Self::from_verifier(verifier);
                ct_eq(self.0.as_bytes(), expected.0.as_bytes())
            }
        };

        if matches {
            Ok(())
        } else {
            Err(PkceError::VerificationFailed)
        }
    }

    /// Returns the challenge as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the challenge and returns the inner string.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl AsRef<str> for PkceChallenge {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Constant-time byte comparison. Unequal lengths compare unequal without
/// short-circuiting on content.
fn ct_eq(a: &[u8], b: &[u8]) -> bool {
    a.ct_eq(b).into()
}

// =============================================================================
// Tests
// =============================================================================
