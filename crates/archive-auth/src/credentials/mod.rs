//! Client credential registry.
//!
//! Maps a public client identifier to the private secret used both to authenticate
//! the client at the token endpoint and as the HMAC key for its access tokens.
//!
//! ## Backends
//! - [`SqliteCredentialStore`]: durable registry (the production backend)
//! - [`MemoryCredentialStore`]: process-local registry for tests and ephemeral runs
//! - [`CachedCredentialStore`]: read-through secret cache over any backend
//!
//! Credentials are created once by [`CredentialStore::register`] and never updated,
//! rotated or deleted. A compromised client is replaced by registering a new one.

mod cached;
mod memory;
mod sqlite;

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rand::RngCore;
use serde::{Deserialize, Serialize};

pub use cached::CachedCredentialStore;
pub use memory::MemoryCredentialStore;
pub use sqlite::SqliteCredentialStore;

use crate::config::Config;
use crate::config::oauth::{CLIENT_ID_BYTES, CLIENT_SECRET_BYTES};
use crate::error::StoreResult;

/// Internal (database) identifier of a registered client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClientId(pub i64);

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// A freshly generated `(public_id, secret)` pair.
///
/// Returned to the caller exactly once, at registration.
#[derive(Clone, PartialEq, Eq)]
pub struct ClientCredentials {
    pub public_id: String,
    pub secret: String,
}

impl ClientCredentials {
    /// Generate a new pair from the thread-local CSPRNG.
    ///
    /// `rand::rng()` is ChaCha12 seeded from the OS. The id carries 128 bits of
    /// entropy, the secret 256 bits; both are lowercase hex.
    #[must_use]
    pub fn generate() -> Self {
        let mut bytes = [0u8; CLIENT_ID_BYTES + CLIENT_SECRET_BYTES];
        rand::rng().fill_bytes(&mut bytes);

        Self {
            public_id: hex::encode(&bytes[..CLIENT_ID_BYTES]),
            secret: hex::encode(&bytes[CLIENT_ID_BYTES..]),
        }
    }
}

impl fmt::Debug for ClientCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientCredentials")
            .field("public_id", &self.public_id)
            .field("secret", &"<redacted>")
            .finish()
    }
}

/// The signing key of a registered client, resolved by public id.
#[derive(Clone, PartialEq, Eq)]
pub struct ClientKey {
    pub client_id: ClientId,
    pub secret: String,
}

impl fmt::Debug for ClientKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientKey")
            .field("client_id", &self.client_id)
            .field("secret", &"<redacted>")
            .finish()
    }
}

/// A registered client, without its secret.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Client {
    pub client_id: ClientId,
    pub public_id: String,
    pub created_at: DateTime<Utc>,
}

/// Persistent registry of OAuth clients.
///
/// Implementations must be safe to share across request tasks; every operation is a
/// single atomic insert or point lookup.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Persist a new client with the given credentials.
    ///
    /// Fails with `Conflict` if `public_id` is already registered.
    async fn insert(&self, credentials: &ClientCredentials) -> StoreResult<Client>;

    /// Resolve the secret (and internal id) for a public id.
    ///
    /// Fails with `NotFound` if no client has that `public_id`.
    async fn lookup_secret_by_public_id(&self, public_id: &str) -> StoreResult<ClientKey>;

    /// Authenticate a `(public_id, secret)` pair.
    ///
    /// Fails with `NotFound` both for an unknown client and for a wrong secret.
    async fn authenticate(&self, public_id: &str, secret: &str) -> StoreResult<ClientId>;

    /// Generate and persist a new client, returning its credentials.
    ///
    /// This is the only way secrets enter the system. The secret is not retrievable
    /// through any other operation afterwards.
    async fn register(&self) -> StoreResult<ClientCredentials> {
        let credentials = ClientCredentials::generate();
        let client = self.insert(&credentials).await?;
        tracing::info!(
            client_id = %client.client_id,
            public_id = %client.public_id,
            "Registered OAuth client"
        );
        Ok(credentials)
    }
}

/// Open the configured credential store, wrapped in the secret cache if enabled.
pub fn open_store(config: &Config) -> StoreResult<Arc<dyn CredentialStore>> {
    let sqlite = SqliteCredentialStore::open(&config.database_path)?;
    tracing::info!(path = %config.database_path.display(), "Opened credential store");

    if !config.secret_cache_enabled() {
        return Ok(Arc::new(sqlite));
    }
    Ok(Arc::new(CachedCredentialStore::new(
        Arc::new(sqlite),
        config.secret_cache_ttl,
        config.secret_cache_max_size,
    )))
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn test_generated_lengths_and_alphabet() {
        let creds = ClientCredentials::generate();
        assert_eq!(creds.public_id.len(), CLIENT_ID_BYTES * 2);
        assert_eq!(creds.secret.len(), CLIENT_SECRET_BYTES * 2);
        assert_eq!(creds.public_id, creds.public_id.to_ascii_lowercase());
        assert_eq!(creds.secret, creds.secret.to_ascii_lowercase());
    }

    #[test]
    fn test_generated_values_decode_to_raw_entropy() {
        let creds = ClientCredentials::generate();
        let id = hex::decode(&creds.public_id).unwrap();
        let secret = hex::decode(&creds.secret).unwrap();
        assert_eq!(id.len(), CLIENT_ID_BYTES);
        assert_eq!(secret.len(), CLIENT_SECRET_BYTES);
        assert_eq!(hex::encode(&id), creds.public_id);
    }

    #[test]
    fn test_no_collisions_across_10k_generations() {
        let mut ids = HashSet::new();
        let mut secrets = HashSet::new();
        for _ in 0..10_000 {
            let creds = ClientCredentials::generate();
            assert!(ids.insert(creds.public_id));
            assert!(secrets.insert(creds.secret));
        }
    }

    #[test]
    fn test_debug_redacts_secret() {
        let creds = ClientCredentials {
            public_id: "abc".into(),
            secret: "super-secret".into(),
        };
        let rendered = format!("{creds:?}");
        assert!(rendered.contains("abc"));
        assert!(!rendered.contains("super-secret"));

        let key = ClientKey {
            client_id: ClientId(7),
            secret: "super-secret".into(),
        };
        assert!(!format!("{key:?}").contains("super-secret"));
    }

    #[tokio::test]
    async fn test_open_store_with_and_without_cache() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clients.db");

        let cached = open_store(&Config::new(&path)).unwrap();
        let creds = cached.register().await.unwrap();

        let config = Config::new(&path).with_secret_cache_ttl(std::time::Duration::ZERO);
        assert!(!config.secret_cache_enabled());
        let uncached = open_store(&config).unwrap();
        let key = uncached
            .lookup_secret_by_public_id(&creds.public_id)
            .await
            .unwrap();
        assert_eq!(key.secret, creds.secret);
    }
}
