//! Signed access tokens.
//!
//! A token is a compact JWS: `base64url(header) "." base64url(payload) "." base64url(mac)`,
//! with header `{"typ":"JWT","alg":"HS256"}` and payload
//! `{"clientId": "<public id>", "expiresAt": <unix seconds>}`.
//!
//! The MAC key is the secret of the client named in the payload, so verification is a
//! two-step affair: [`TokenCodec::peek_client_id`] reads the claimed id without
//! trusting it, the caller resolves that client's secret, and
//! [`TokenCodec::decode_and_verify`] establishes trust. Expiry is checked by the
//! caller after the signature holds.

use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::clock::Clock;
use crate::error::{TokenError, TokenResult};

const ALGORITHM: Algorithm = Algorithm::HS256;

/// Token payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Public id of the client the token was issued to.
    #[serde(rename = "clientId")]
    pub client_id: String,

    /// Absolute expiry (unix seconds).
    #[serde(rename = "expiresAt")]
    pub expires_at: i64,
}

impl TokenClaims {
    /// Whether the token is still valid at `now` (valid through `expires_at` inclusive).
    #[must_use]
    pub const fn is_live_at(&self, now: i64) -> bool {
        self.expires_at >= now
    }
}

/// Encodes and verifies HS256 access tokens.
#[derive(Debug, Clone)]
pub struct TokenCodec {
    clock: Arc<dyn Clock>,
}

impl TokenCodec {
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { clock }
    }

    /// Current time according to the codec's clock.
    #[must_use]
    pub fn now(&self) -> i64 {
        self.clock.now()
    }

    /// Mint a token for `public_id` that expires `duration_seconds` from now.
    pub fn encode(
        &self,
        public_id: &str,
        secret: &str,
        duration_seconds: i64,
    ) -> TokenResult<String> {
        let claims = TokenClaims {
            client_id: public_id.to_owned(),
            expires_at: self.clock.now().saturating_add(duration_seconds),
        };

        jsonwebtoken::encode(
            &Header::new(ALGORITHM),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .map_err(|e| TokenError::Signing(e.to_string()))
    }

    /// Read the claimed client id from an unverified token.
    ///
    /// The returned value is only fit for choosing which secret to verify with.
    pub fn peek_client_id(token: &str) -> TokenResult<String> {
        let mut parts = token.split('.');
        let (Some(_), Some(payload), Some(_), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(TokenError::malformed("token must have 3 parts separated by dots"));
        };

        let bytes = URL_SAFE_NO_PAD
            .decode(payload)
            .map_err(|e| TokenError::malformed(format!("failed to decode payload: {e}")))?;
        let claims: TokenClaims = serde_json::from_slice(&bytes)
            .map_err(|e| TokenError::malformed(format!("failed to parse payload: {e}")))?;

        if claims.client_id.is_empty() {
            return Err(TokenError::malformed("empty clientId claim"));
        }
        Ok(claims.client_id)
    }

    /// Verify the token's MAC with `secret` and return its payload.
    ///
    /// Does not check expiry.
    pub fn decode_and_verify(token: &str, secret: &str) -> TokenResult<TokenClaims> {
        let mut validation = Validation::new(ALGORITHM);
        validation.validate_exp = false;
        validation.validate_aud = false;
        validation.required_spec_claims.clear();

        let data = jsonwebtoken::decode::<TokenClaims>(
            token,
            &DecodingKey::from_secret(secret.as_bytes()),
            &validation,
        )?;
        Ok(data.claims)
    }
}
