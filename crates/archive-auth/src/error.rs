//! Error types for the archive auth server.
//!
//! Uses `thiserror` for structured error handling with automatic `From` implementations.
//! Store and codec errors carry full detail for logs; [`OAuthError`] is the only type
//! that crosses the HTTP boundary and it never carries internal text.

use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use crate::server::json_response;

/// Errors from the credential store.
#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    /// No client row matched the lookup.
    #[error("client not found")]
    NotFound,

    /// A uniqueness constraint was violated (e.g. `public_id` collision).
    #[error("conflict: {0}")]
    Conflict(String),

    /// Storage engine failure (I/O, lock poisoning, blocking task panic, ...).
    #[error("storage error: {0}")]
    Backend(String),
}

impl StoreError {
    /// Create a backend error.
    #[must_use]
    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend(message.into())
    }

    /// Returns true if this is a lookup miss rather than an infrastructure fault.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound)
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::QueryReturnedNoRows => Self::NotFound,
            rusqlite::Error::SqliteFailure(code, _)
                if code.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                Self::Conflict(err.to_string())
            }
            _ => Self::Backend(err.to_string()),
        }
    }
}

impl From<tokio::task::JoinError> for StoreError {
    fn from(err: tokio::task::JoinError) -> Self {
        Self::Backend(format!("blocking task failed: {err}"))
    }
}

/// Errors from token encoding, decoding and verification.
#[derive(thiserror::Error, Debug)]
pub enum TokenError {
    /// The token is not a well-formed compact structure or its payload is invalid.
    #[error("malformed token: {0}")]
    Malformed(String),

    /// The signature does not match the claimed client's secret.
    #[error("invalid token signature")]
    InvalidSignature,

    /// The claimed client id does not belong to any registered client.
    #[error("unknown client")]
    UnknownClient,

    /// Correctly signed, but `expiresAt` is in the past.
    #[error("token expired at {expires_at}")]
    Expired {
        /// Expiry claim (unix seconds).
        expires_at: i64,
    },

    /// Signing failed while minting a token.
    #[error("token signing failed: {0}")]
    Signing(String),

    /// Credential store failure while resolving the signing secret.
    #[error(transparent)]
    Store(StoreError),
}

impl TokenError {
    /// Create a malformed-token error.
    #[must_use]
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::Malformed(message.into())
    }

    /// Returns true if the failure is the caller's fault (maps to `invalid_token`).
    #[must_use]
    pub const fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::Malformed(_) | Self::InvalidSignature | Self::UnknownClient | Self::Expired { .. }
        )
    }
}

impl From<StoreError> for TokenError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound => Self::UnknownClient,
            other => Self::Store(other),
        }
    }
}

impl From<jsonwebtoken::errors::Error> for TokenError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        use jsonwebtoken::errors::ErrorKind;

        match err.kind() {
            ErrorKind::InvalidSignature | ErrorKind::InvalidAlgorithm => Self::InvalidSignature,
            _ => Self::Malformed(err.to_string()),
        }
    }
}

/// Errors from the protected-resource record store.
#[derive(thiserror::Error, Debug)]
pub enum RecordError {
    /// The store refused the write for a domain reason (message is caller-safe).
    #[error("{0}")]
    Rejected(String),

    /// Storage engine failure.
    #[error("record store error: {0}")]
    Backend(String),
}

/// Client-facing OAuth errors (RFC 6749 §5.2, RFC 6750 §3.1).
///
/// `InvalidToken` covers malformed headers, bad signatures, unknown
/// clients and expiry alike, so forged and expired tokens look the same to callers.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OAuthError {
    /// Unparseable grant request.
    #[error("invalid_request")]
    InvalidRequest,

    /// `grant_type` other than `client_credentials`.
    #[error("unsupported_grant_type")]
    UnsupportedGrantType,

    /// Missing, malformed or wrong HTTP Basic client credentials.
    #[error("invalid_client")]
    InvalidClient,

    /// No `Authorization` header on a protected request.
    #[error("missing bearer token")]
    MissingToken,

    /// Bearer token rejected.
    #[error("invalid_token")]
    InvalidToken,

    /// Store or signing infrastructure failure. Detail is logged, never returned.
    #[error("server_error")]
    Server,
}

#[derive(Serialize)]
struct ErrorBody {
    error: &'static str,
}

impl OAuthError {
    /// HTTP status for this error.
    #[must_use]
    pub const fn status(self) -> StatusCode {
        match self {
            Self::InvalidRequest | Self::UnsupportedGrantType => StatusCode::BAD_REQUEST,
            Self::InvalidClient | Self::MissingToken | Self::InvalidToken => {
                StatusCode::UNAUTHORIZED
            }
            Self::Server => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Stable error code for the JSON body, or `None` for a bare challenge.
    #[must_use]
    pub const fn code(self) -> Option<&'static str> {
        match self {
            Self::InvalidRequest => Some("invalid_request"),
            Self::UnsupportedGrantType => Some("unsupported_grant_type"),
            Self::InvalidClient => Some("invalid_client"),
            Self::MissingToken => None,
            Self::InvalidToken => Some("invalid_token"),
            Self::Server => Some("server_error"),
        }
    }

    /// `WWW-Authenticate` challenge to send, if any.
    #[must_use]
    pub const fn challenge(self) -> Option<&'static str> {
        match self {
            Self::InvalidClient => Some("Basic"),
            Self::MissingToken | Self::InvalidToken => Some("Bearer"),
            _ => None,
        }
    }
}

impl IntoResponse for OAuthError {
    fn into_response(self) -> Response {
        let mut response = match self.code() {
            Some(error) => json_response(self.status(), &ErrorBody { error }),
            None => self.status().into_response(),
        };

        if let Some(challenge) = self.challenge() {
            let value = HeaderValue::from_static(challenge);
            response
                .headers_mut()
                .insert(header::WWW_AUTHENTICATE, value);
        }
        response
    }
}

impl From<TokenError> for OAuthError {
    fn from(err: TokenError) -> Self {
        if err.is_client_error() {
            tracing::debug!(error = %err, "Rejected bearer token");
            Self::InvalidToken
        } else {
            tracing::error!(error = %err, "Bearer validation failed");
            Self::Server
        }
    }
}

/// Result type alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Result type alias for token operations.
pub type TokenResult<T> = Result<T, TokenError>;
