use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use rusqlite::{Connection, OptionalExtension};
use tracing::{debug, info};

use crate::version::error::CacheError;

/// Layout of the `responses` table. A database stamped with any other
/// `user_version` is discarded and rebuilt.
const SCHEMA_VERSION: i32 = 1;

/// A response body stored for a request URL, with what is needed to
/// revalidate it later
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedResponse {
    pub status: u16,
    pub headers: BTreeMap<String, String>,
    pub body: String,
    pub etag: Option<String>,
    pub last_modified: Option<String>,
    pub stored_at_ms: i64,
    pub max_age_ms: Option<i64>,
}

impl CachedResponse {
    /// Whether the entry can be served without asking the server
    pub fn is_fresh(&self, now_ms: i64) -> bool {
        self.max_age_ms
            .is_some_and(|max_age| now_ms.saturating_sub(self.stored_at_ms) < max_age)
    }

    /// Whether the server can be asked to confirm the entry with a `304`
    pub fn can_revalidate(&self) -> bool {
        self.etag.is_some() || self.last_modified.is_some()
    }
}

/// HTTP response cache keyed by request URL
pub struct ResponseCache {
    conn: Mutex<Connection>,
}

impl ResponseCache {
    pub fn new(db_path: &Path) -> Result<Self, CacheError> {
        info!("Initializing response cache at {:?}", db_path);

        let conn = Connection::open(db_path)?;

        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;

        let cache = Self {
            conn: Mutex::new(conn),
        };

        cache.create_schema()?;
        debug!("Response cache initialized");

        Ok(cache)
    }

    /// Acquire database connection lock with proper error handling
    fn lock_conn(&self) -> Result<MutexGuard<'_, Connection>, CacheError> {
        self.conn.lock().map_err(|_| CacheError::LockPoisoned)
    }

    fn create_schema(&self) -> Result<(), CacheError> {
        let conn = self.lock_conn()?;

        let version: i32 = conn.pragma_query_value(None, "user_version", |row| row.get(0))?;
        if version != SCHEMA_VERSION {
            if version != 0 {
                info!(
                    "Discarding response cache with schema v{} (expected v{})",
                    version, SCHEMA_VERSION
                );
            }
            conn.execute("DROP TABLE IF EXISTS responses", [])?;
        }

        conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS responses (
                url TEXT PRIMARY KEY,
                status INTEGER NOT NULL,
                headers TEXT NOT NULL,
                body TEXT NOT NULL,
                etag TEXT,
                last_modified TEXT,
                stored_at INTEGER NOT NULL,
                max_age_ms INTEGER
            )
            "#,
            [],
        )?;
        conn.pragma_update(None, "user_version", SCHEMA_VERSION)?;

        debug!("Response cache schema ready");
        Ok(())
    }

    pub fn get(&self, url: &str) -> Result<Option<CachedResponse>, CacheError> {
        let conn = self.lock_conn()?;
        let row = conn
            .query_row(
                r#"
                SELECT status, headers, body, etag, last_modified, stored_at, max_age_ms
                FROM responses WHERE url = ?1
                "#,
                [url],
                |row| {
                    Ok((
                        row.get::<_, u16>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, Option<String>>(3)?,
                        row.get::<_, Option<String>>(4)?,
                        row.get::<_, i64>(5)?,
                        row.get::<_, Option<i64>>(6)?,
                    ))
                },
            )
            .optional()?;

        let Some((status, headers, body, etag, last_modified, stored_at_ms, max_age_ms)) = row
        else {
            return Ok(None);
        };

        Ok(Some(CachedResponse {
            status,
            headers: serde_json::from_str(&headers)?,
            body,
            etag,
            last_modified,
            stored_at_ms,
            max_age_ms,
        }))
    }

    /// Insert or replace the entry for `url`
    pub fn store(&self, url: &str, response: &CachedResponse) -> Result<(), CacheError> {
        let headers = serde_json::to_string(&response.headers)?;
        let conn = self.lock_conn()?;
        conn.execute(
            r#"
            INSERT INTO responses (url, status, headers, body, etag, last_modified, stored_at, max_age_ms)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            ON CONFLICT(url) DO UPDATE SET
                status = excluded.status,
                headers = excluded.headers,
                body = excluded.body,
                etag = excluded.etag,
                last_modified = excluded.last_modified,
                stored_at = excluded.stored_at,
                max_age_ms = excluded.max_age_ms
            "#,
            (
                url,
                response.status,
                headers,
                &response.body,
                &response.etag,
                &response.last_modified,
                response.stored_at_ms,
                response.max_age_ms,
            ),
        )?;

        debug!("Cached response for {}", url);
        Ok(())
    }

    /// Mark an entry as confirmed by the server, replacing its headers
    pub fn refresh(
        &self,
        url: &str,
        headers: &BTreeMap<String, String>,
        now_ms: i64,
        max_age_ms: Option<i64>,
    ) -> Result<(), CacheError> {
        let headers = serde_json::to_string(headers)?;
        let conn = self.lock_conn()?;
        conn.execute(
            "UPDATE responses SET headers = ?1, stored_at = ?2, max_age_ms = ?3 WHERE url = ?4",
            (headers, now_ms, max_age_ms, url),
        )?;
        Ok(())
    }
}
