//! SQLite-backed credential store.

use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, params};

use super::{Client, ClientCredentials, ClientId, ClientKey, CredentialStore};
use crate::error::{StoreError, StoreResult};

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS client (
        id           INTEGER PRIMARY KEY AUTOINCREMENT,
        oauth_id     TEXT    NOT NULL UNIQUE,
        oauth_secret TEXT    NOT NULL,
        created      TEXT    NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
    );
";

/// Durable client registry in a single SQLite database.
///
/// Every call is one statement on one row, so SQLite's own atomicity is all the
/// coordination needed. Statements run on tokio's blocking pool.
#[derive(Clone)]
pub struct SqliteCredentialStore {
    db: Arc<Mutex<Connection>>,
}

impl SqliteCredentialStore {
    /// Open (or create) the credential database at `path`.
    pub fn open(path: &Path) -> StoreResult<Self> {
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        Self::init(conn)
    }

    /// Open a private in-memory database.
    pub fn open_in_memory() -> StoreResult<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> StoreResult<Self> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            db: Arc::new(Mutex::new(conn)),
        })
    }

    /// List registered clients (never their secrets), oldest first.
    pub async fn list_clients(&self) -> StoreResult<Vec<Client>> {
        self.with_conn(|conn| {
            let mut stmt =
                conn.prepare_cached("SELECT id, oauth_id, created FROM client ORDER BY id")?;
            let rows = stmt.query_map([], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                ))
            })?;

            let clients = rows
                .map(|row| -> StoreResult<Client> {
                    let (id, public_id, created) = row?;
                    Ok(Client {
                        client_id: ClientId(id),
                        public_id,
                        created_at: parse_created(&created),
                    })
                })
                .collect::<StoreResult<Vec<_>>>();
            clients
        })
        .await
    }

    async fn with_conn<T, F>(&self, f: F) -> StoreResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> StoreResult<T> + Send + 'static,
    {
        let db = Arc::clone(&self.db);
        tokio::task::spawn_blocking(move || {
            let conn = db
                .lock()
                .map_err(|e| StoreError::backend(format!("lock poisoned: {e}")))?;
            f(&conn)
        })
        .await?
    }
}

#[async_trait]
impl CredentialStore for SqliteCredentialStore {
    async fn insert(&self, credentials: &ClientCredentials) -> StoreResult<Client> {
        let public_id = credentials.public_id.clone();
        let secret = credentials.secret.clone();

        self.with_conn(move |conn| {
            let (id, created): (i64, String) = conn.query_row(
                "INSERT INTO client (oauth_id, oauth_secret) VALUES (?1, ?2)
                 RETURNING id, created",
                params![public_id, secret],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )?;

            Ok(Client {
                client_id: ClientId(id),
                public_id,
                created_at: parse_created(&created),
            })
        })
        .await
    }

    async fn lookup_secret_by_public_id(&self, public_id: &str) -> StoreResult<ClientKey> {
        let public_id = public_id.to_owned();

        self.with_conn(move |conn| {
            conn.query_row(
                "SELECT id, oauth_secret FROM client WHERE oauth_id = ?1",
                params![public_id],
                |row| {
                    Ok(ClientKey {
                        client_id: ClientId(row.get(0)?),
                        secret: row.get(1)?,
                    })
                },
            )
            .map_err(StoreError::from)
        })
        .await
    }

    async fn authenticate(&self, public_id: &str, secret: &str) -> StoreResult<ClientId> {
        let public_id = public_id.to_owned();
        let secret = secret.to_owned();

        self.with_conn(move |conn| {
            conn.query_row(
                "SELECT id FROM client WHERE oauth_id = ?1 AND oauth_secret = ?2",
                params![public_id, secret],
                |row| row.get::<_, i64>(0),
            )
            .optional()?
            .map(ClientId)
            .ok_or(StoreError::NotFound)
        })
        .await
    }
}

impl std::fmt::Debug for SqliteCredentialStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteCredentialStore").finish()
    }
}

fn parse_created(raw: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|e| {
            tracing::warn!(created = raw, error = %e, "Unparseable client creation timestamp");
            DateTime::<Utc>::UNIX_EPOCH
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_register_lookup_authenticate() {
        let store = SqliteCredentialStore::open_in_memory().unwrap();
        let creds = store.register().await.unwrap();

        let key = store
            .lookup_secret_by_public_id(&creds.public_id)
            .await
            .unwrap();
        assert_eq!(key.secret, creds.secret);

        let id = store
            .authenticate(&creds.public_id, &creds.secret)
            .await
            .unwrap();
        assert_eq!(id, key.client_id);
    }

    #[tokio::test]
    async fn test_wrong_secret_is_not_found() {
        let store = SqliteCredentialStore::open_in_memory().unwrap();
        let creds = store.register().await.unwrap();

        let err = store
            .authenticate(&creds.public_id, "wrong")
            .await
            .unwrap_err();
        assert!(err.is_not_found());
        let err = store
            .lookup_secret_by_public_id("unknown")
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_duplicate_public_id_conflicts() {
        let store = SqliteCredentialStore::open_in_memory().unwrap();
        let creds = ClientCredentials::generate();
        store.insert(&creds).await.unwrap();

        let err = store.insert(&creds).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)), "got {err:?}");
    }

    #[tokio::test]
    async fn test_ids_are_sequential_and_listed() {
        let store = SqliteCredentialStore::open_in_memory().unwrap();
        let first = store.insert(&ClientCredentials::generate()).await.unwrap();
        let second = store.insert(&ClientCredentials::generate()).await.unwrap();
        assert!(second.client_id > first.client_id);
        assert!(first.created_at > DateTime::<Utc>::UNIX_EPOCH);

        let clients = store.list_clients().await.unwrap();
        assert_eq!(clients, vec![first, second]);
    }

    #[tokio::test]
    async fn test_credentials_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("archive.db");

        let creds = {
            let store = SqliteCredentialStore::open(&path).unwrap();
            store.register().await.unwrap()
        };

        let store = SqliteCredentialStore::open(&path).unwrap();
        let reopened = store.authenticate(&creds.public_id, &creds.secret).await;
        assert!(reopened.is_ok());
    }
}
