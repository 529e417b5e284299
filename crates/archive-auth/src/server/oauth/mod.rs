//! OAuth 2.0 surface of the archive API.
//!
//! ## Supported Standards
//! - RFC 6749 §4.4: Client Credentials Grant (HTTP Basic client authentication)
//! - RFC 6750: Bearer Token Usage (`Authorization` header only)
//!
//! Access tokens are stateless: nothing is stored at issuance and there is no
//! revocation. See [`crate::token`] for the token format.

mod bearer;
pub mod handlers;
mod issuer;

pub use bearer::{AuthContext, BearerGate, extract_bearer_token, require_bearer};
pub use issuer::{TokenIssuer, TokenResponse};
