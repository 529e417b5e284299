//! HTTP server for the archive API.
//!
//! Routes:
//! - `POST /private/oauth/token`: client_credentials grant
//! - `PUT /private/video/{id}`: bearer-protected record write
//! - `GET /health`: liveness probe
//!
//! All collaborators (credential store, clock, record store) are injected through
//! [`HttpState`]; nothing is global.

pub mod oauth;
pub mod transport;
pub mod videos;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::FromRef;
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use crate::clock::Clock;
use crate::credentials::CredentialStore;
use crate::token::TokenCodec;
use oauth::{BearerGate, TokenIssuer};
use videos::VideoRecords;

/// `Content-Type` of every JSON response.
pub const JSON_UTF8: &str = "application/json; charset=utf-8";

/// Shared state for HTTP handlers.
pub struct HttpState {
    pub issuer: TokenIssuer,
    pub gate: BearerGate,
    pub videos: Arc<dyn VideoRecords>,
}

impl HttpState {
    /// Wire the issuer and gate over one credential store and clock.
    #[must_use]
    pub fn new(
        store: Arc<dyn CredentialStore>,
        clock: Arc<dyn Clock>,
        videos: Arc<dyn VideoRecords>,
    ) -> Self {
        let codec = TokenCodec::new(clock);
        Self {
            issuer: TokenIssuer::new(Arc::clone(&store), codec.clone()),
            gate: BearerGate::new(store, codec),
            videos,
        }
    }
}

impl FromRef<Arc<HttpState>> for BearerGate {
    fn from_ref(state: &Arc<HttpState>) -> Self {
        state.gate.clone()
    }
}

impl std::fmt::Debug for HttpState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpState").finish()
    }
}

/// Archive API server.
pub struct Server {
    state: Arc<HttpState>,
}

impl Server {
    #[must_use]
    pub fn new(state: HttpState) -> Self {
        Self {
            state: Arc::new(state),
        }
    }

    /// Build the router without binding a socket.
    #[must_use]
    pub fn router(&self) -> axum::Router {
        transport::create_router(Arc::clone(&self.state))
    }

    /// Serve HTTP on `0.0.0.0:port` until Ctrl+C.
    ///
    /// # Errors
    ///
    /// Returns error on bind or server failure.
    pub async fn run_http(self, port: u16) -> anyhow::Result<()> {
        let router = self.router();
        let addr = SocketAddr::from(([0, 0, 0, 0], port));

        tracing::info!("HTTP server listening on http://{}", addr);

        let listener = tokio::net::TcpListener::bind(addr).await?;
        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        tracing::info!("HTTP server shut down");
        Ok(())
    }
}

impl std::fmt::Debug for Server {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Server").finish()
    }
}

/// Serialize `body` as a JSON response with an explicit UTF-8 charset.
pub(crate) fn json_response<T: Serialize>(status: StatusCode, body: &T) -> Response {
    match serde_json::to_vec(body) {
        Ok(bytes) => {
            let headers = [(header::CONTENT_TYPE, HeaderValue::from_static(JSON_UTF8))];
            (status, headers, bytes).into_response()
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to serialize response body");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to install CTRL+C handler");
        std::future::pending::<()>().await;
    }
    tracing::info!("Received shutdown signal");
}
