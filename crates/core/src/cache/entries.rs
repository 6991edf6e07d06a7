//! Named caches of request/response pairs.
//!
//! Implements [`CacheStore`] on top of the SQLite database. Only `GET`
//! requests are stored or matched; URLs are compared without fragments.

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite::{self, OptionalExtension};
use url::Url;

use super::connection::CacheDb;
use super::hash::compute_entry_key;
use crate::Error;
use crate::http::{Request, Response};
use crate::store::CacheStore;

/// Name and size of one cache, for inspection.
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct CacheSummary {
    pub name: String,
    pub entries: u64,
    pub created_at: String,
}

/// A row ready to be written, with the request already keyed.
struct EntryRow {
    key_hash: String,
    method: String,
    url: String,
    response_url: String,
    status: u16,
    content_type: Option<String>,
    headers_json: String,
    body: Vec<u8>,
}

impl EntryRow {
    fn new(request: &Request, response: &Response) -> Result<Self, Error> {
        if !request.is_cacheable() {
            return Err(Error::InvalidInput(format!("cannot cache {} request", request.method)));
        }

        let url = request.cache_url();
        let headers_json = serde_json::to_string(&response.headers)
            .map_err(|e| Error::InvalidInput(format!("unserializable headers: {e}")))?;

        Ok(Self {
            key_hash: compute_entry_key(&request.method, &url),
            method: request.method.clone(),
            url,
            response_url: response.url.to_string(),
            status: response.status,
            content_type: response.content_type.clone(),
            headers_json,
            body: response.body.to_vec(),
        })
    }
}

fn ensure_cache(conn: &rusqlite::Connection, name: &str) -> Result<i64, Error> {
    conn.execute(
        "INSERT OR IGNORE INTO caches (name, created_at) VALUES (?1, ?2)",
        params![name, chrono::Utc::now().to_rfc3339()],
    )?;
    let id = conn.query_row("SELECT id FROM caches WHERE name = ?1", params![name], |row| row.get(0))?;
    Ok(id)
}

fn insert_entry(conn: &rusqlite::Connection, cache_id: i64, row: &EntryRow, stored_at: &str) -> Result<(), Error> {
    conn.execute(
        "INSERT INTO cache_entries (
            cache_id, key_hash, method, url, response_url, status,
            content_type, headers_json, body, stored_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
        ON CONFLICT(cache_id, key_hash) DO UPDATE SET
            response_url = excluded.response_url,
            status = excluded.status,
            content_type = excluded.content_type,
            headers_json = excluded.headers_json,
            body = excluded.body,
            stored_at = excluded.stored_at",
        params![
            cache_id,
            &row.key_hash,
            &row.method,
            &row.url,
            &row.response_url,
            row.status,
            &row.content_type,
            &row.headers_json,
            &row.body,
            stored_at,
        ],
    )?;
    Ok(())
}

/// Raw column values of a matched entry.
type StoredResponse = (String, u16, Option<String>, String, Vec<u8>);

fn read_response(row: &rusqlite::Row<'_>) -> rusqlite::Result<StoredResponse> {
    Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?))
}

fn into_response(stored: StoredResponse) -> Result<Response, Error> {
    let (response_url, status, content_type, headers_json, body) = stored;
    let url = Url::parse(&response_url).map_err(|e| Error::InvalidUrl(format!("{response_url}: {e}")))?;
    let headers = serde_json::from_str(&headers_json)
        .map_err(|e| Error::InvalidInput(format!("stored headers for {response_url}: {e}")))?;
    Ok(Response { url, status, content_type, headers, body: Bytes::from(body) })
}

impl CacheDb {
    /// List caches with their entry counts, oldest first.
    pub async fn cache_summaries(&self) -> Result<Vec<CacheSummary>, Error> {
        self.conn
            .call(|conn| -> Result<Vec<CacheSummary>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT c.name, COUNT(e.key_hash), c.created_at
                     FROM caches c LEFT JOIN cache_entries e ON e.cache_id = c.id
                     GROUP BY c.id ORDER BY c.id",
                )?;
                let rows = stmt.query_map([], |row| {
                    Ok(CacheSummary { name: row.get(0)?, entries: row.get::<_, i64>(1)? as u64, created_at: row.get(2)? })
                })?;
                rows.collect::<Result<Vec<_>, _>>().map_err(Error::from)
            })
            .await
            .map_err(Error::from)
    }
}

#[async_trait]
impl CacheStore for CacheDb {
    async fn open(&self, name: &str) -> Result<(), Error> {
        let name = name.to_string();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                ensure_cache(conn, &name)?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    async fn keys(&self) -> Result<Vec<String>, Error> {
        self.conn
            .call(|conn| -> Result<Vec<String>, Error> {
                let mut stmt = conn.prepare("SELECT name FROM caches ORDER BY id")?;
                let names = stmt.query_map([], |row| row.get(0))?;
                names.collect::<Result<Vec<String>, _>>().map_err(Error::from)
            })
            .await
            .map_err(Error::from)
    }

    async fn delete(&self, name: &str) -> Result<bool, Error> {
        let name = name.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let deleted = conn.execute("DELETE FROM caches WHERE name = ?1", params![name])?;
                Ok(deleted > 0)
            })
            .await
            .map_err(Error::from)
    }

    async fn match_in(&self, name: &str, request: &Request) -> Result<Option<Response>, Error> {
        if !request.is_cacheable() {
            return Ok(None);
        }

        let name = name.to_string();
        let key_hash = compute_entry_key(&request.method, &request.cache_url());
        let stored = self
            .conn
            .call(move |conn| -> Result<Option<StoredResponse>, Error> {
                conn.query_row(
                    "SELECT e.response_url, e.status, e.content_type, e.headers_json, e.body
                     FROM cache_entries e JOIN caches c ON c.id = e.cache_id
                     WHERE c.name = ?1 AND e.key_hash = ?2",
                    params![name, key_hash],
                    read_response,
                )
                .optional()
                .map_err(Error::from)
            })
            .await
            .map_err(Error::from)?;

        stored.map(into_response).transpose()
    }

    async fn match_any(&self, request: &Request) -> Result<Option<Response>, Error> {
        if !request.is_cacheable() {
            return Ok(None);
        }

        let key_hash = compute_entry_key(&request.method, &request.cache_url());
        let stored = self
            .conn
            .call(move |conn| -> Result<Option<StoredResponse>, Error> {
                conn.query_row(
                    "SELECT e.response_url, e.status, e.content_type, e.headers_json, e.body
                     FROM cache_entries e JOIN caches c ON c.id = e.cache_id
                     WHERE e.key_hash = ?1
                     ORDER BY c.id LIMIT 1",
                    params![key_hash],
                    read_response,
                )
                .optional()
                .map_err(Error::from)
            })
            .await
            .map_err(Error::from)?;

        stored.map(into_response).transpose()
    }

    async fn put(&self, name: &str, request: &Request, response: &Response) -> Result<(), Error> {
        let name = name.to_string();
        let row = EntryRow::new(request, response)?;
        self.conn
            .call(move |conn| -> Result<(), Error> {
                let cache_id = ensure_cache(conn, &name)?;
                insert_entry(conn, cache_id, &row, &chrono::Utc::now().to_rfc3339())
            })
            .await
            .map_err(Error::from)
    }

    async fn put_all(&self, name: &str, entries: Vec<(Request, Response)>) -> Result<(), Error> {
        let name = name.to_string();
        let rows = entries
            .iter()
            .map(|(request, response)| EntryRow::new(request, response))
            .collect::<Result<Vec<_>, _>>()?;

        self.conn
            .call(move |conn| -> Result<(), Error> {
                let stored_at = chrono::Utc::now().to_rfc3339();
                let tx = conn.transaction()?;
                let cache_id = ensure_cache(&tx, &name)?;
                for row in &rows {
                    insert_entry(&tx, cache_id, row, &stored_at)?;
                }
                tx.commit()?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::CacheHandle;
    use std::sync::Arc;

    fn request(url: &str) -> Request {
        Request::get(Url::parse(url).unwrap())
    }

    fn response(url: &str, body: &'static str) -> Response {
        Response {
            url: Url::parse(url).unwrap(),
            status: 200,
            content_type: Some("text/plain".to_string()),
            headers: vec![("cache-control".to_string(), "max-age=60".to_string())],
            body: Bytes::from_static(body.as_bytes()),
        }
    }

    #[tokio::test]
    async fn test_put_and_match() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let url = "https://example.com/js/page.js";

        db.put("app-static-1", &request(url), &response(url, "page")).await.unwrap();

        let hit = db.match_in("app-static-1", &request(url)).await.unwrap().unwrap();
        assert_eq!(hit.body, Bytes::from_static(b"page"));
        assert_eq!(hit.header("Cache-Control"), Some("max-age=60"));
        assert!(db.match_in("app-fonts", &request(url)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_corrupt_headers_fail_match() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let url = "https://example.com/css/all.css";
        db.put("app-static-1", &request(url), &response(url, "css")).await.unwrap();
        db.conn
            .call(|conn| -> Result<usize, Error> {
                conn.execute("UPDATE cache_entries SET headers_json = 'not json'", [])
                    .map_err(Error::from)
            })
            .await
            .map_err(Error::from)
            .unwrap();

        let result = db.match_in("app-static-1", &request(url)).await;

        assert!(matches!(result, Err(Error::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_match_ignores_fragment() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let url = "https://example.com/";
        db.put("app-static-1", &request(url), &response(url, "shell")).await.unwrap();

        let hit = db.match_any(&request("https://example.com/#about")).await.unwrap();
        assert!(hit.is_some());
    }

    #[tokio::test]
    async fn test_non_get_never_matches() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let url = "https://example.com/";
        db.put("app-static-1", &request(url), &response(url, "shell")).await.unwrap();

        let post = Request::new("POST", Url::parse(url).unwrap());
        assert!(db.match_any(&post).await.unwrap().is_none());
        assert!(db.put("app-static-1", &post, &response(url, "x")).await.is_err());
    }

    #[tokio::test]
    async fn test_open_is_idempotent() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let store: Arc<dyn CacheStore> = Arc::new(db.clone());
        let url = "https://example.com/css/all.css";

        let first = CacheHandle::open(store.clone(), "app-static-1").await.unwrap();
        first.put(&request(url), &response(url, "css")).await.unwrap();

        let second = CacheHandle::open(store.clone(), "app-static-1").await.unwrap();
        let hit = second.match_request(&request(url)).await.unwrap();
        assert_eq!(hit.map(|r| r.body), Some(Bytes::from_static(b"css")));
        assert_eq!(store.keys().await.unwrap(), vec!["app-static-1"]);
    }

    #[tokio::test]
    async fn test_keys_in_creation_order() {
        let db = CacheDb::open_in_memory().await.unwrap();
        db.open("app-static-2").await.unwrap();
        db.open("app-fonts").await.unwrap();
        db.open("app-static-2").await.unwrap();

        assert_eq!(db.keys().await.unwrap(), vec!["app-static-2", "app-fonts"]);
    }

    #[tokio::test]
    async fn test_match_any_prefers_oldest_cache() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let url = "https://example.com/js/page.js";
        db.put("app-static-1", &request(url), &response(url, "old")).await.unwrap();
        db.put("app-static-2", &request(url), &response(url, "new")).await.unwrap();

        let hit = db.match_any(&request(url)).await.unwrap().unwrap();
        assert_eq!(hit.body, Bytes::from_static(b"old"));
    }

    #[tokio::test]
    async fn test_delete_cascades_entries() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let url = "https://example.com/js/page.js";
        db.put("app-static-1", &request(url), &response(url, "page")).await.unwrap();

        assert!(db.delete("app-static-1").await.unwrap());
        assert!(!db.delete("app-static-1").await.unwrap());
        assert!(db.match_any(&request(url)).await.unwrap().is_none());
        assert!(db.keys().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_put_all_writes_batch() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let urls = ["https://example.com/", "https://example.com/imgs/icon.png"];
        let entries = urls.iter().map(|u| (request(u), response(u, "x"))).collect();

        db.put_all("app-static-1", entries).await.unwrap();

        let summaries = db.cache_summaries().await.unwrap();
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].name, "app-static-1");
        assert_eq!(summaries[0].entries, 2);
    }

    #[tokio::test]
    async fn test_put_all_rejects_whole_batch() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let good = "https://example.com/";
        let entries = vec![
            (request(good), response(good, "shell")),
            (Request::new("POST", Url::parse(good).unwrap()), response(good, "x")),
        ];

        assert!(db.put_all("app-static-1", entries).await.is_err());
        assert!(db.match_any(&request(good)).await.unwrap().is_none());
    }
}
