//! Axum HTTP handlers for the OAuth/OIDC endpoints.

pub mod authorize;
pub mod discovery;
pub mod introspect;
pub mod jwks;
pub mod revoke;
pub mod token;
pub mod userinfo;

pub use authorize::{AuthorizeParams, AuthorizeState, SUBJECT_HEADER, authorize_get, authorize_post};
pub use discovery::{DiscoveryState, openid_configuration_handler};
pub use introspect::{IntrospectionForm, IntrospectionState, introspect_handler};
pub use jwks::{JwksState, jwks_handler};
pub use revoke::{RevocationForm, RevocationState, revoke_handler};
pub use token::{TokenState, token_handler};
pub use userinfo::{UserInfoResponse, UserInfoState, userinfo_handler};
