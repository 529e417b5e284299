//! Read-through cache of `public_id → secret` lookups.
//!
//! Purely a performance layer for the bearer gate: only successful lookups are
//! cached, misses always go to the backing store, and entries expire no later
//! than one token lifetime after they were loaded.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use moka::future::Cache;

use super::{Client, ClientCredentials, ClientId, ClientKey, CredentialStore};
use crate::config::oauth::ACCESS_TOKEN_LIFETIME;
use crate::error::StoreResult;

/// Credential store wrapper with a bounded TTL cache on secret lookups.
#[derive(Clone)]
pub struct CachedCredentialStore {
    inner: Arc<dyn CredentialStore>,
    cache: Cache<String, ClientKey>,
}

impl CachedCredentialStore {
    /// Wrap `inner`, caching up to `max_size` secrets for `ttl`.
    ///
    /// `ttl` is clamped to the access token lifetime.
    #[must_use]
    pub fn new(inner: Arc<dyn CredentialStore>, ttl: Duration, max_size: u64) -> Self {
        let max_ttl = Duration::from_secs(ACCESS_TOKEN_LIFETIME.unsigned_abs());
        let cache = Cache::builder()
            .max_capacity(max_size)
            .time_to_live(ttl.min(max_ttl))
            .build();

        Self { inner, cache }
    }
}

#[async_trait]
impl CredentialStore for CachedCredentialStore {
    async fn insert(&self, credentials: &ClientCredentials) -> StoreResult<Client> {
        self.inner.insert(credentials).await
    }

    async fn lookup_secret_by_public_id(&self, public_id: &str) -> StoreResult<ClientKey> {
        if let Some(key) = self.cache.get(public_id).await {
            return Ok(key);
        }

        let key = self.inner.lookup_secret_by_public_id(public_id).await?;
        self.cache.insert(public_id.to_owned(), key.clone()).await;
        Ok(key)
    }

    async fn authenticate(&self, public_id: &str, secret: &str) -> StoreResult<ClientId> {
        self.inner.authenticate(public_id, secret).await
    }
}

impl std::fmt::Debug for CachedCredentialStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CachedCredentialStore")
            .field("entries", &self.cache.entry_count())
            .finish()
    }
}
