//! OAuth 2.0 endpoint handlers.
//!
//! Implements:
//! - RFC 6749 §4.4: Client Credentials Grant
//! - RFC 6749 §2.3.1: HTTP Basic client authentication

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use axum_extra::headers::{Authorization, HeaderMapExt, authorization::Basic};
use serde::Deserialize;

use super::{TokenIssuer, TokenResponse};
use crate::config::oauth::GRANT_TYPE_CLIENT_CREDENTIALS;
use crate::error::OAuthError;
use crate::server::{HttpState, json_response};

const FORM_URLENCODED: &str = "application/x-www-form-urlencoded";

// ─── Token Endpoint ──────────────────────────────────────────────────────────

/// Grant request form. Unknown parameters are ignored; a repeated one is not.
#[derive(Debug, Deserialize)]
pub struct TokenRequest {
    pub grant_type: Option<String>,
}

/// `POST /private/oauth/token`
///
/// Exchange HTTP Basic client credentials for an access token.
pub async fn handle_token(
    State(state): State<Arc<HttpState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    match client_credentials_grant(&state.issuer, &headers, &body).await {
        Ok(token) => token_success(&token),
        Err(e) => e.into_response(),
    }
}

async fn client_credentials_grant(
    issuer: &TokenIssuer,
    headers: &HeaderMap,
    body: &[u8],
) -> Result<TokenResponse, OAuthError> {
    let form = parse_form(headers, body)?;

    if form.grant_type.as_deref() != Some(GRANT_TYPE_CLIENT_CREDENTIALS) {
        tracing::debug!(grant_type = ?form.grant_type, "Unsupported grant type");
        return Err(OAuthError::UnsupportedGrantType);
    }

    let Some(Authorization(basic)) = headers.typed_get::<Authorization<Basic>>() else {
        tracing::debug!("Token request without usable Basic credentials");
        return Err(OAuthError::InvalidClient);
    };

    issuer.issue(basic.username(), basic.password()).await
}

/// Parse the urlencoded body. A `Content-Type` other than a form is rejected;
/// a missing one is tolerated.
fn parse_form(headers: &HeaderMap, body: &[u8]) -> Result<TokenRequest, OAuthError> {
    if let Some(content_type) = headers.get(header::CONTENT_TYPE) {
        let is_form = content_type
            .to_str()
            .ok()
            .and_then(|v| v.split(';').next())
            .is_some_and(|mime| mime.trim().eq_ignore_ascii_case(FORM_URLENCODED));
        if !is_form {
            tracing::debug!(content_type = ?content_type, "Token request is not a form");
            return Err(OAuthError::InvalidRequest);
        }
    }

    serde_urlencoded::from_bytes(body).map_err(|e| {
        tracing::debug!(error = %e, "Unparseable token request body");
        OAuthError::InvalidRequest
    })
}

/// Build a token response with required OAuth 2.0 cache headers (RFC 6749 §5.1).
fn token_success(token: &TokenResponse) -> Response {
    let mut response = json_response(StatusCode::OK, token);

    let headers = response.headers_mut();
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
    headers.insert(header::PRAGMA, HeaderValue::from_static("no-cache"));
    response
}
