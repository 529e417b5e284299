//! Bearer token gate for protected routes.
//!
//! Two ways in, same checks:
//! - [`require_bearer`]: router middleware that rejects before the handler runs
//!   and stores the resulting [`AuthContext`] in request extensions
//! - [`AuthContext`] as an extractor: a handler that names it in its signature
//!   cannot run unauthenticated, with or without the middleware in front

use std::sync::Arc;

use axum::{
    extract::{FromRef, FromRequestParts, Request, State},
    http::{HeaderMap, header, request::Parts},
    middleware::Next,
    response::Response,
};

use crate::credentials::{ClientId, CredentialStore};
use crate::error::{OAuthError, TokenError, TokenResult};
use crate::token::TokenCodec;

/// Identity of the client that authenticated the current request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthContext {
    /// Internal id of the client (never the public id).
    pub client_id: ClientId,
}

impl<S> FromRequestParts<S> for AuthContext
where
    BearerGate: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = OAuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        if let Some(ctx) = parts.extensions.get::<Self>() {
            return Ok(*ctx);
        }
        BearerGate::from_ref(state)
            .authenticate(&parts.headers)
            .await
    }
}

/// Validates bearer tokens against the credential store.
#[derive(Clone)]
pub struct BearerGate {
    store: Arc<dyn CredentialStore>,
    codec: TokenCodec,
}

impl BearerGate {
    #[must_use]
    pub fn new(store: Arc<dyn CredentialStore>, codec: TokenCodec) -> Self {
        Self { store, codec }
    }

    /// Authenticate a request from its headers.
    ///
    /// # Errors
    ///
    /// - `MissingToken` when there is no (or an empty) `Authorization` header
    /// - `InvalidToken` for any malformed, forged, unknown-client or expired token
    /// - `Server` when the credential store fails
    pub async fn authenticate(&self, headers: &HeaderMap) -> Result<AuthContext, OAuthError> {
        let token = extract_bearer_token(headers)?;
        Ok(self.verify(token).await?)
    }

    /// Verify a raw token string.
    ///
    /// The claimed client id only selects the verification key; nothing from the
    /// payload is trusted until the MAC checks out under that client's secret.
    pub async fn verify(&self, token: &str) -> TokenResult<AuthContext> {
        let claimed = TokenCodec::peek_client_id(token)?;
        let key = self.store.lookup_secret_by_public_id(&claimed).await?;
        let claims = TokenCodec::decode_and_verify(token, &key.secret)?;

        if !claims.is_live_at(self.codec.now()) {
            return Err(TokenError::Expired {
                expires_at: claims.expires_at,
            });
        }

        Ok(AuthContext {
            client_id: key.client_id,
        })
    }
}

impl std::fmt::Debug for BearerGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BearerGate")
            .field("codec", &self.codec)
            .finish()
    }
}

/// Pull the token out of `Authorization: Bearer <token>`.
///
/// The header must be exactly two single-space-separated parts; the scheme is
/// case-insensitive. An empty header counts as absent.
///
/// # Errors
///
/// `MissingToken` if the header is absent or empty, `InvalidToken` otherwise.
pub fn extract_bearer_token(headers: &HeaderMap) -> Result<&str, OAuthError> {
    let Some(value) = headers.get(header::AUTHORIZATION).filter(|v| !v.is_empty()) else {
        return Err(OAuthError::MissingToken);
    };
    let value = value.to_str().map_err(|_| OAuthError::InvalidToken)?;

    let mut parts = value.split(' ');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(scheme), Some(token), None) if scheme.eq_ignore_ascii_case("bearer") => Ok(token),
        _ => {
            tracing::debug!("Rejected malformed Authorization header");
            Err(OAuthError::InvalidToken)
        }
    }
}

/// Middleware that admits only requests carrying a valid bearer token.
///
/// # Errors
///
/// Short-circuits with the gate's [`OAuthError`]; the inner service never runs.
pub async fn require_bearer(
    State(gate): State<BearerGate>,
    mut request: Request,
    next: Next,
) -> Result<Response, OAuthError> {
    let ctx = gate.authenticate(request.headers()).await?;
    tracing::debug!(client_id = %ctx.client_id, "Authenticated bearer request");

    request.extensions_mut().insert(ctx);
    Ok(next.run(request).await)
}
