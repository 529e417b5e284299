//! Archive Auth
//!
//! A stateless OAuth 2.0 `client_credentials` authorization layer for the archive
//! API. Registered clients exchange HTTP Basic credentials for a one-hour HS256
//! bearer token signed with their own secret; protected routes verify that token
//! without any server-side session state.
//!
//! # Features
//!
//! - **Token endpoint**: `POST /private/oauth/token` (RFC 6749 §4.4)
//! - **Bearer gate**: middleware plus a typed [`AuthContext`] extractor (RFC 6750)
//! - **Durable registry**: SQLite credential store with an optional secret cache
//! - **Injectable clock**: expiry is testable without sleeping
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use archive_auth::{Config, HttpState, Server, SystemClock, credentials, server::videos};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::new("archive.db");
//!     let store = credentials::open_store(&config)?;
//!     let state = HttpState::new(
//!         store,
//!         Arc::new(SystemClock),
//!         Arc::new(videos::MemoryVideoRecords::new()),
//!     );
//!
//!     Server::new(state).run_http(config.port).await
//! }
//! ```

pub mod clock;
pub mod config;
pub mod credentials;
pub mod error;
pub mod server;
pub mod token;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::Config;
pub use credentials::{ClientCredentials, ClientId, CredentialStore};
pub use error::{OAuthError, StoreError, TokenError};
pub use server::oauth::AuthContext;
pub use server::{HttpState, Server};
pub use token::TokenCodec;
