//! Domain types for the authorization server.

pub mod client;
pub mod code;
pub mod scope;
pub mod token;

pub use client::{Client, ClientValidationError, GrantType};
pub use code::AuthorizationCode;
pub use scope::ScopeSet;
pub use token::{AccessToken, RefreshToken, generate_token, hash_token};
