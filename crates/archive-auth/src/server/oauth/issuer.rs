//! Access token issuance.

use std::sync::Arc;

use serde::Serialize;

use crate::config::oauth::ACCESS_TOKEN_LIFETIME;
use crate::credentials::CredentialStore;
use crate::error::{OAuthError, StoreError};
use crate::token::TokenCodec;

/// Successful token response body (RFC 6749 §5.1).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: &'static str,
    pub expires_in: i64,
}

/// Authenticates clients and mints access tokens for them.
#[derive(Clone)]
pub struct TokenIssuer {
    store: Arc<dyn CredentialStore>,
    codec: TokenCodec,
}

impl TokenIssuer {
    #[must_use]
    pub fn new(store: Arc<dyn CredentialStore>, codec: TokenCodec) -> Self {
        Self { store, codec }
    }

    /// Authenticate `(public_id, secret)` and issue a token valid for one hour.
    ///
    /// # Errors
    ///
    /// - `InvalidClient` for an unknown client or wrong secret (indistinguishable)
    /// - `Server` if the store or the signer fails
    pub async fn issue(&self, public_id: &str, secret: &str) -> Result<TokenResponse, OAuthError> {
        let client_id = match self.store.authenticate(public_id, secret).await {
            Ok(id) => id,
            Err(StoreError::NotFound) => {
                tracing::info!(public_id, "Rejected client credentials");
                return Err(OAuthError::InvalidClient);
            }
            Err(e) => {
                tracing::error!(error = %e, "Credential store failed during client authentication");
                return Err(OAuthError::Server);
            }
        };

        let signed = self.codec.encode(public_id, secret, ACCESS_TOKEN_LIFETIME);
        let access_token = signed.map_err(|e| {
            tracing::error!(error = %e, %client_id, "Failed to sign access token");
            OAuthError::Server
        })?;

        tracing::info!(%client_id, "Issued access token");

        Ok(TokenResponse {
            access_token,
            token_type: "Bearer",
            expires_in: ACCESS_TOKEN_LIFETIME,
        })
    }
}

impl std::fmt::Debug for TokenIssuer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenIssuer")
            .field("codec", &self.codec)
            .finish()
    }
}
