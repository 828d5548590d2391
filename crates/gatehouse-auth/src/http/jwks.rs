//! JWKS endpoint handler.
//!
//! `GET /.well-known/jwks.json`: the public keys for verifying ID tokens
//! and signed access-token assertions (RFC 7517).

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::http::header;
use axum::response::IntoResponse;

use crate::token::jwt::JwtService;

/// State for the JWKS endpoint.
#[derive(Clone)]
pub struct JwksState {
    /// JWT service holding the signing keys.
    pub jwt: Arc<JwtService>,
}

impl JwksState {
    /// Creates a new JWKS state.
    #[must_use]
    pub fn new(jwt: Arc<JwtService>) -> Self {
        Self { jwt }
    }
}

/// Handler for `GET /.well-known/jwks.json`.
///
/// The document is cacheable; keys rotate rarely.
pub async fn jwks_handler(State(state): State<JwksState>) -> impl IntoResponse {
    let jwks = state.jwt.jwks();
    (
        [
            (header::CONTENT_TYPE, "application/json"),
            (header::CACHE_CONTROL, "public, max-age=3600"),
        ],
        Json(jwks),
    )
}
