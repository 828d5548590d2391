//! JWT signing and validation.
//!
//! Signs ID tokens and (optionally) self-contained access token assertions
//! with RS256, and exports the public key as a JWKS document for resource
//! servers that validate statelessly.

use std::fmt;

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use jsonwebtoken::{
    Algorithm, DecodingKey, EncodingKey, Header, TokenData, Validation, decode, encode,
};
use rand::rngs::OsRng;
use rsa::pkcs8::{DecodePublicKey, EncodePrivateKey, EncodePublicKey, LineEnding};
use rsa::traits::PublicKeyParts;
use rsa::{RsaPrivateKey, RsaPublicKey};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

// ============================================================================
// Error Types
// ============================================================================

/// Errors that can occur during JWT operations.
#[derive(Debug, thiserror::Error)]
pub enum JwtError {
    /// Failed to encode a token.
    #[error("Failed to encode token: {message}")]
    EncodingError {
        /// Description of the encoding error.
        message: String,
    },

    /// Failed to decode a token.
    #[error("Failed to decode token: {message}")]
    DecodingError {
        /// Description of the decoding error.
        message: String,
    },

    /// The token has expired.
    #[error("Token expired")]
    Expired,

    /// The token signature is invalid.
    #[error("Invalid signature")]
    InvalidSignature,

    /// The token claims are invalid.
    #[error("Invalid claims: {message}")]
    InvalidClaims {
        /// Description of why claims are invalid.
        message: String,
    },

    /// Failed to generate a signing key.
    #[error("Key generation error: {message}")]
    KeyGenerationError {
        /// Description of the key generation error.
        message: String,
    },

    /// Invalid key format or data.
    #[error("Invalid key: {message}")]
    InvalidKey {
        /// Description of why the key is invalid.
        message: String,
    },
}

impl JwtError {
    /// Creates a new `EncodingError`.
    #[must_use]
    pub fn encoding_error(message: impl Into<String>) -> Self {
        Self::EncodingError {
            message: message.into(),
        }
    }

    /// Creates a new `DecodingError`.
    #[must_use]
    pub fn decoding_error(message: impl Into<String>) -> Self {
        Self::DecodingError {
            message: message.into(),
        }
    }

    /// Creates a new `InvalidClaims` error.
    #[must_use]
    pub fn invalid_claims(message: impl Into<String>) -> Self {
        Self::InvalidClaims {
            message: message.into(),
        }
    }

    /// Creates a new `KeyGenerationError`.
    #[must_use]
    pub fn key_generation_error(message: impl Into<String>) -> Self {
        Self::KeyGenerationError {
            message: message.into(),
        }
    }

    /// Creates a new `InvalidKey` error.
    #[must_use]
    pub fn invalid_key(message: impl Into<String>) -> Self {
        Self::InvalidKey {
            message: message.into(),
        }
    }

    /// Returns `true` if this is a validation error rather than a key or
    /// encoding problem.
    #[must_use]
    pub fn is_validation_error(&self) -> bool {
        matches!(
            self,
            Self::Expired | Self::InvalidSignature | Self::InvalidClaims { .. }
        )
    }
}

impl From<jsonwebtoken::errors::Error> for JwtError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        use jsonwebtoken::errors::ErrorKind;

        match err.kind() {
            ErrorKind::ExpiredSignature => Self::Expired,
            ErrorKind::InvalidSignature => Self::InvalidSignature,
            ErrorKind::InvalidAudience
            | ErrorKind::InvalidIssuer
            | ErrorKind::InvalidSubject
            | ErrorKind::MissingRequiredClaim(_) => Self::invalid_claims(err.to_string()),
            ErrorKind::InvalidRsaKey(_) | ErrorKind::InvalidKeyFormat => {
                Self::invalid_key(err.to_string())
            }
            _ => Self::decoding_error(err.to_string()),
        }
    }
}

// ============================================================================
// Token Claims
// ============================================================================

/// Access token claims.
///
/// Carried in signed access-token assertions and reconstructed from stored
/// records when verifying opaque tokens.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AccessClaims {
    /// Issuer (this authorization server's URL).
    pub iss: String,

    /// Subject: the resource owner, or the client id for
    /// client_credentials tokens.
    pub sub: String,

    /// Expiration time (Unix timestamp).
    pub exp: i64,

    /// Issued at (Unix timestamp).
    pub iat: i64,

    /// Token identifier; matches the stored record id.
    pub jti: String,

    /// Granted scopes (space-separated wire form).
    pub scope: String,

    /// OAuth client the token was issued to.
    pub client_id: String,
}

/// ID token claims for OpenID Connect.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IdClaims {
    /// Issuer (this authorization server's URL).
    pub iss: String,

    /// Subject (resource owner identifier).
    pub sub: String,

    /// Audience (the client id).
    pub aud: String,

    /// Expiration time (Unix timestamp).
    pub exp: i64,

    /// Issued at (Unix timestamp).
    pub iat: i64,

    /// Nonce from the authorization request.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nonce: Option<String>,
}

// ============================================================================
// JWKS Types
// ============================================================================

/// JSON Web Key Set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Jwks {
    /// The keys in this set.
    pub keys: Vec<Jwk>,
}

/// JSON Web Key (RSA signing keys only).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Jwk {
    /// Key type, always "RSA".
    pub kty: String,

    /// Key ID.
    pub kid: String,

    /// Key use, always "sig".
    #[serde(rename = "use")]
    pub use_: String,

    /// Algorithm, always "RS256".
    pub alg: String,

    /// RSA modulus (base64url encoded).
    pub n: String,

    /// RSA exponent (base64url encoded).
    pub e: String,
}

// ============================================================================
// Signing Key Pair
// ============================================================================

/// An RS256 signing key pair.
pub struct SigningKeyPair {
    /// Key ID, surfaced in JWT headers and the JWKS document.
    pub kid: String,

    /// Encoding key (private) for signing.
    encoding_key: EncodingKey,

    /// Decoding key (public) for verification.
    decoding_key: DecodingKey,

    /// Public key components for JWKS export.
    n: Vec<u8>,
    e: Vec<u8>,

    /// When the key was created.
    pub created_at: OffsetDateTime,
}

impl fmt::Debug for SigningKeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigningKeyPair")
            .field("kid", &self.kid)
            .field("created_at", &self.created_at)
            .finish_non_exhaustive()
    }
}

impl SigningKeyPair {
    /// Generates a new 2048-bit RSA key pair.
    ///
    /// # Errors
    ///
    /// Returns an error if key generation fails.
    pub fn generate() -> Result<Self, JwtError> {
        let private_key = RsaPrivateKey::new(&mut OsRng, 2048)
            .map_err(|e| JwtError::key_generation_error(e.to_string()))?;

        let public_key = private_key.to_public_key();
        let n = public_key.n().to_bytes_be();
        let e = public_key.e().to_bytes_be();

        let private_pem = private_key
            .to_pkcs8_pem(LineEnding::LF)
            .map_err(|e| JwtError::key_generation_error(e.to_string()))?;
        let encoding_key = EncodingKey::from_rsa_pem(private_pem.as_bytes())
            .map_err(|e| JwtError::key_generation_error(e.to_string()))?;

        let public_pem = public_key
            .to_public_key_pem(LineEnding::LF)
            .map_err(|e| JwtError::key_generation_error(e.to_string()))?;
        let decoding_key = DecodingKey::from_rsa_pem(public_pem.as_bytes())
            .map_err(|e| JwtError::key_generation_error(e.to_string()))?;

        Ok(Self {
            kid: uuid::Uuid::new_v4().to_string(),
            encoding_key,
            decoding_key,
            n,
            e,
            created_at: OffsetDateTime::now_utc(),
        })
    }

    /// Loads a key pair from PEM strings.
    ///
    /// # Errors
    ///
    /// Returns an error if the PEM data is invalid.
    pub fn from_pem(
        kid: impl Into<String>,
        private_pem: &str,
        public_pem: &str,
    ) -> Result<Self, JwtError> {
        let encoding_key = EncodingKey::from_rsa_pem(private_pem.as_bytes())
            .map_err(|e| JwtError::invalid_key(e.to_string()))?;
        let decoding_key = DecodingKey::from_rsa_pem(public_pem.as_bytes())
            .map_err(|e| JwtError::invalid_key(e.to_string()))?;

        let public_key = RsaPublicKey::from_public_key_pem(public_pem)
            .map_err(|e| JwtError::invalid_key(e.to_string()))?;

        Ok(Self {
            kid: kid.into(),
            encoding_key,
            decoding_key,
            n: public_key.n().to_bytes_be(),
            e: public_key.e().to_bytes_be(),
            created_at: OffsetDateTime::now_utc(),
        })
    }

    /// Exports the public key as a JWK.
    #[must_use]
    pub fn to_jwk(&self) -> Jwk {
        Jwk {
            kty: "RSA".to_string(),
            kid: self.kid.clone(),
            use_: "sig".to_string(),
            alg: "RS256".to_string(),
            n: URL_SAFE_NO_PAD.encode(&self.n),
            e: URL_SAFE_NO_PAD.encode(&self.e),
        }
    }
}

// ============================================================================
// JWT Service
// ============================================================================

/// Service for encoding and decoding JWT tokens.
///
/// Thread-safe; shared across handlers behind an `Arc`.
pub struct JwtService {
    signing_key: SigningKeyPair,
    issuer: String,
}

impl JwtService {
    /// Creates a new JWT service.
    #[must_use]
    pub fn new(signing_key: SigningKeyPair, issuer: impl Into<String>) -> Self {
        Self {
            signing_key,
            issuer: issuer.into(),
        }
    }

    /// Encodes claims into a signed JWT string.
    ///
    /// # Errors
    ///
    /// Returns an error if encoding fails.
    pub fn encode<T: Serialize>(&self, claims: &T) -> Result<String, JwtError> {
        let mut header = Header::new(Algorithm::RS256);
        header.kid = Some(self.signing_key.kid.clone());

        encode(&header, claims, &self.signing_key.encoding_key)
            .map_err(|e| JwtError::encoding_error(e.to_string()))
    }

    /// Decodes and validates a JWT string (signature, expiry, issuer).
    ///
    /// # Errors
    ///
    /// Returns an error if decoding or validation fails.
    pub fn decode<T: DeserializeOwned>(&self, token: &str) -> Result<TokenData<T>, JwtError> {
        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_issuer(&[&self.issuer]);
        validation.validate_exp = true;
        validation.validate_aud = false; // audience checked at the application layer

        decode(token, &self.signing_key.decoding_key, &validation).map_err(JwtError::from)
    }

    /// Exports the verification keys as a JWKS document.
    #[must_use]
    pub fn jwks(&self) -> Jwks {
        Jwks {
            keys: vec![self.signing_key.to_jwk()],
        }
    }

    /// Returns the current signing key ID.
    #[must_use]
    pub fn current_kid(&self) -> &str {
        &self.signing_key.kid
    }

    /// Returns the issuer URL.
    #[must_use]
    pub fn issuer(&self) -> &str {
        &self.issuer
    }
}
