//! Durable key-value markers stored alongside the caches.

use async_trait::async_trait;
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite::OptionalExtension;

use super::connection::CacheDb;
use crate::Error;
use crate::store::KeyValueStore;

#[async_trait]
impl KeyValueStore for CacheDb {
    async fn get(&self, key: &str) -> Result<Option<String>, Error> {
        let key = key.to_string();
        self.conn
            .call(move |conn| -> Result<Option<String>, Error> {
                conn.query_row("SELECT value FROM keyval WHERE key = ?1", params![key], |row| row.get(0))
                    .optional()
                    .map_err(Error::from)
            })
            .await
            .map_err(Error::from)
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), Error> {
        let key = key.to_string();
        let value = value.to_string();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT INTO keyval (key, value, updated_at) VALUES (?1, ?2, ?3)
                     ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
                    params![key, value, chrono::Utc::now().to_rfc3339()],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    async fn delete(&self, key: &str) -> Result<(), Error> {
        let key = key.to_string();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute("DELETE FROM keyval WHERE key = ?1", params![key])?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_get_missing() {
        let db = CacheDb::open_in_memory().await.unwrap();
        assert_eq!(db.get("active-version").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_set_overwrites() {
        let db = CacheDb::open_in_memory().await.unwrap();
        db.set("active-version", "1.1.6").await.unwrap();
        db.set("active-version", "1.1.7").await.unwrap();
        assert_eq!(db.get("active-version").await.unwrap().as_deref(), Some("1.1.7"));
    }

    #[tokio::test]
    async fn test_delete() {
        let db = CacheDb::open_in_memory().await.unwrap();
        db.set("active-version", "1.1.7").await.unwrap();
        KeyValueStore::delete(&db, "active-version").await.unwrap();
        assert_eq!(db.get("active-version").await.unwrap(), None);
    }
}
