//! In-memory credential store.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use subtle::ConstantTimeEq;
use tokio::sync::RwLock;

use super::{Client, ClientCredentials, ClientId, ClientKey, CredentialStore};
use crate::error::{StoreError, StoreResult};

struct StoredClient {
    client_id: ClientId,
    secret: String,
    created_at: DateTime<Utc>,
}

/// Process-local credential registry.
///
/// Clones share the same registry.
#[derive(Clone)]
pub struct MemoryCredentialStore {
    clients: Arc<RwLock<HashMap<String, StoredClient>>>,
    next_id: Arc<AtomicI64>,
}

impl MemoryCredentialStore {
    #[must_use]
    pub fn new() -> Self {
        Self {
            clients: Arc::new(RwLock::new(HashMap::new())),
            next_id: Arc::new(AtomicI64::new(1)),
        }
    }

    /// Number of registered clients.
    pub async fn client_count(&self) -> usize {
        self.clients.read().await.len()
    }

    /// List registered clients (never their secrets), oldest first.
    pub async fn list_clients(&self) -> Vec<Client> {
        let clients = self.clients.read().await;
        let mut listed: Vec<Client> = clients
            .iter()
            .map(|(public_id, c)| Client {
                client_id: c.client_id,
                public_id: public_id.clone(),
                created_at: c.created_at,
            })
            .collect();
        listed.sort_by_key(|c| c.client_id);
        listed
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn insert(&self, credentials: &ClientCredentials) -> StoreResult<Client> {
        let mut clients = self.clients.write().await;
        if clients.contains_key(&credentials.public_id) {
            return Err(StoreError::Conflict(format!(
                "public_id {} already registered",
                credentials.public_id
            )));
        }

        let client = Client {
            client_id: ClientId(self.next_id.fetch_add(1, Ordering::SeqCst)),
            public_id: credentials.public_id.clone(),
            created_at: Utc::now(),
        };

        clients.insert(
            credentials.public_id.clone(),
            StoredClient {
                client_id: client.client_id,
                secret: credentials.secret.clone(),
                created_at: client.created_at,
            },
        );

        Ok(client)
    }

    async fn lookup_secret_by_public_id(&self, public_id: &str) -> StoreResult<ClientKey> {
        let clients = self.clients.read().await;
        clients
            .get(public_id)
            .map(|c| ClientKey {
                client_id: c.client_id,
                secret: c.secret.clone(),
            })
            .ok_or(StoreError::NotFound)
    }

    async fn authenticate(&self, public_id: &str, secret: &str) -> StoreResult<ClientId> {
        let clients = self.clients.read().await;
        let stored = clients.get(public_id).ok_or(StoreError::NotFound)?;

        if bool::from(stored.secret.as_bytes().ct_eq(secret.as_bytes())) {
            Ok(stored.client_id)
        } else {
            Err(StoreError::NotFound)
        }
    }
}

impl Default for MemoryCredentialStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MemoryCredentialStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryCredentialStore").finish()
    }
}

impl std::fmt::Debug for StoredClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoredClient")
            .field("client_id", &self.client_id)
            .field("created_at", &self.created_at)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[tokio::test]
    async fn test_register_and_lookup() {
        let store = MemoryCredentialStore::new();
        let creds = store.register().await.unwrap();

        let key = store
            .lookup_secret_by_public_id(&creds.public_id)
            .await
            .unwrap();
        assert_eq!(key.secret, creds.secret);
        assert_eq!(key.client_id, ClientId(1));
    }

    #[tokio::test]
    async fn test_authenticate() {
        let store = MemoryCredentialStore::new();
        let creds = store.register().await.unwrap();

        let id = store
            .authenticate(&creds.public_id, &creds.secret)
            .await
            .unwrap();
        assert_eq!(id, ClientId(1));

        // Wrong secret and unknown client are indistinguishable
        let wrong = store
            .authenticate(&creds.public_id, "nope")
            .await
            .unwrap_err();
        let unknown = store
            .authenticate("nobody", &creds.secret)
            .await
            .unwrap_err();
        assert!(wrong.is_not_found());
        assert!(unknown.is_not_found());
    }

    #[tokio::test]
    async fn test_lookup_unknown_client() {
        let store = MemoryCredentialStore::new();
        let err = store
            .lookup_secret_by_public_id("missing")
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_duplicate_public_id_conflicts() {
        let store = MemoryCredentialStore::new();
        let creds = ClientCredentials::generate();
        store.insert(&creds).await.unwrap();

        let err = store.insert(&creds).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
        assert_eq!(store.client_count().await, 1);
    }

    #[tokio::test]
    async fn test_10k_registrations_are_distinct() {
        let store = MemoryCredentialStore::new();
        let mut ids = HashSet::new();
        let mut secrets = HashSet::new();

        for _ in 0..10_000 {
            let creds = store.register().await.unwrap();
            assert!(ids.insert(creds.public_id));
            assert!(secrets.insert(creds.secret));
        }
        assert_eq!(store.client_count().await, 10_000);
    }

    #[tokio::test]
    async fn test_list_clients_in_registration_order() {
        let store = MemoryCredentialStore::new();
        let first = store.insert(&ClientCredentials::generate()).await.unwrap();
        let second = store.insert(&ClientCredentials::generate()).await.unwrap();

        assert_eq!(store.list_clients().await, vec![first, second]);
    }

    #[tokio::test]
    async fn test_clones_share_registry() {
        let store = MemoryCredentialStore::new();
        let other = store.clone();
        let creds = store.register().await.unwrap();
        let found = other.lookup_secret_by_public_id(&creds.public_id).await;
        assert!(found.is_ok());
    }
}
