use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Sender};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result, anyhow};
use reqwest::blocking::Client;
use reqwest::header::CONTENT_TYPE;
use rusqlite::{Connection, OptionalExtension, params};

use crate::config::app_cache_dir;
use crate::http_client::http_client;

pub const CACHE_NAME: &str = "cmk-tipping-v1";
pub const API_PREFIX: &str = "/api/";
pub const PRECACHE_ASSETS: [&str; 5] = [
    "/",
    "/index.html",
    "/css/style.css",
    "/js/app.js",
    "/manifest.json",
];
const CACHE_DB_FILE: &str = "assets.sqlite";

/// API traffic must always see live data.
pub fn bypasses_cache(path: &str) -> bool {
    path.contains(API_PREFIX)
}

pub fn default_db_path() -> Option<PathBuf> {
    app_cache_dir().map(|dir| dir.join(CACHE_DB_FILE))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetResponse {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

impl AssetResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Network side of the shim. Errors mean the request never completed.
pub trait AssetFetcher {
    fn fetch(&self, path: &str) -> Result<AssetResponse>;
}

#[derive(Debug, Clone)]
pub struct HttpAssetFetcher {
    base_url: String,
    client: &'static Client,
}

impl HttpAssetFetcher {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: http_client(timeout)?,
        })
    }
}

impl AssetFetcher for HttpAssetFetcher {
    fn fetch(&self, path: &str) -> Result<AssetResponse> {
        let url = format!("{}{}", self.base_url, path);
        let resp = self.client.get(&url).send().context("asset request failed")?;
        let status = resp.status().as_u16();
        let content_type = resp
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.to_string());
        let body = resp.bytes().context("failed reading asset body")?.to_vec();
        Ok(AssetResponse {
            status,
            content_type,
            body,
        })
    }
}

/// App name advertised by `/manifest.json`.
pub fn manifest_name(body: &[u8]) -> Option<String> {
    let manifest = serde_json::from_slice::<serde_json::Value>(body).ok()?;
    manifest
        .get("name")
        .and_then(|v| v.as_str())
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
}

/// Named caches of path -> response, persisted in SQLite.
pub struct CacheStore {
    conn: Connection,
}

impl CacheStore {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).ok();
        }
        let conn = Connection::open(path)
            .with_context(|| format!("open asset cache {}", path.display()))?;
        Self::init(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("open in-memory asset cache")?;
        Self::init(conn)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS cache_entries (
                cache_name TEXT NOT NULL,
                path TEXT NOT NULL,
                status INTEGER NOT NULL,
                content_type TEXT NULL,
                body BLOB NOT NULL,
                stored_at INTEGER NOT NULL,
                PRIMARY KEY (cache_name, path)
            );
            CREATE TABLE IF NOT EXISTS caches (
                cache_name TEXT PRIMARY KEY
            );
            "#,
        )
        .context("init asset cache schema")?;
        Ok(Self { conn })
    }

    pub fn open_cache(&self, cache_name: &str) -> Result<()> {
        self.conn
            .execute(
                "INSERT OR IGNORE INTO caches (cache_name) VALUES (?1)",
                params![cache_name],
            )
            .context("create cache")?;
        Ok(())
    }

    pub fn put(&self, cache_name: &str, path: &str, resp: &AssetResponse) -> Result<()> {
        self.open_cache(cache_name)?;
        self.conn
            .execute(
                r#"
                INSERT INTO cache_entries (cache_name, path, status, content_type, body, stored_at)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                ON CONFLICT(cache_name, path) DO UPDATE SET
                    status = excluded.status,
                    content_type = excluded.content_type,
                    body = excluded.body,
                    stored_at = excluded.stored_at
                "#,
                params![
                    cache_name,
                    path,
                    resp.status,
                    resp.content_type,
                    resp.body,
                    now_secs() as i64
                ],
            )
            .context("store asset")?;
        Ok(())
    }

    pub fn get(&self, cache_name: &str, path: &str) -> Result<Option<AssetResponse>> {
        self.conn
            .query_row(
                "SELECT status, content_type, body FROM cache_entries WHERE cache_name = ?1 AND path = ?2",
                params![cache_name, path],
                |row| {
                    Ok(AssetResponse {
                        status: row.get(0)?,
                        content_type: row.get(1)?,
                        body: row.get(2)?,
                    })
                },
            )
            .optional()
            .context("read asset")
    }

    pub fn cache_names(&self) -> Result<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT cache_name FROM caches ORDER BY cache_name")
            .context("list caches")?;
        let names = stmt
            .query_map([], |row| row.get::<_, String>(0))
            .context("list caches")?
            .collect::<rusqlite::Result<Vec<_>>>()
            .context("list caches")?;
        Ok(names)
    }

    pub fn delete_cache(&self, cache_name: &str) -> Result<usize> {
        let removed = self
            .conn
            .execute(
                "DELETE FROM cache_entries WHERE cache_name = ?1",
                params![cache_name],
            )
            .context("delete cache entries")?;
        self.conn
            .execute("DELETE FROM caches WHERE cache_name = ?1", params![cache_name])
            .context("delete cache")?;
        Ok(removed)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    New,
    /// Installed and already superseding any earlier version.
    Installed,
    /// Old caches removed; requests are now intercepted.
    Active,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Served {
    /// Not handled by the shim; the caller performs the request itself.
    PassThrough,
    Network(AssetResponse),
    Cache(AssetResponse),
}

enum WriterMsg {
    Put {
        cache_name: String,
        path: String,
        resp: AssetResponse,
    },
    Flush(Sender<()>),
}

/// Network-first cache for static assets with its own install/activate
/// lifecycle. Writes happen on a background thread.
pub struct AssetCache<F> {
    name: String,
    fetcher: F,
    store: Arc<Mutex<CacheStore>>,
    lifecycle: Lifecycle,
    writer: Option<Sender<WriterMsg>>,
    writer_handle: Option<JoinHandle<()>>,
}

impl<F: AssetFetcher> AssetCache<F> {
    pub fn new(store: CacheStore, fetcher: F) -> Self {
        Self::with_name(CACHE_NAME, store, fetcher)
    }

    pub fn with_name(name: &str, store: CacheStore, fetcher: F) -> Self {
        let store = Arc::new(Mutex::new(store));
        let (tx, rx) = mpsc::channel::<WriterMsg>();
        let writer_store = Arc::clone(&store);
        let writer_handle = thread::spawn(move || {
            while let Ok(msg) = rx.recv() {
                match msg {
                    WriterMsg::Put {
                        cache_name,
                        path,
                        resp,
                    } => {
                        let result = match writer_store.lock() {
                            Ok(store) => store.put(&cache_name, &path, &resp),
                            Err(_) => Err(anyhow!("asset cache lock poisoned")),
                        };
                        if let Err(err) = result {
                            tracing::warn!(%path, error = %err, "asset cache write failed");
                        }
                    }
                    WriterMsg::Flush(ack) => {
                        let _ = ack.send(());
                    }
                }
            }
        });
        Self {
            name: name.to_string(),
            fetcher,
            store,
            lifecycle: Lifecycle::New,
            writer: Some(tx),
            writer_handle: Some(writer_handle),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }

    /// Pre-populates the cache with `PRECACHE_ASSETS`. Nothing is stored
    /// unless every asset fetches successfully.
    pub fn install(&mut self) -> Result<usize> {
        let mut fetched = Vec::with_capacity(PRECACHE_ASSETS.len());
        for path in PRECACHE_ASSETS {
            let resp = self
                .fetcher
                .fetch(path)
                .with_context(|| format!("precache {path}"))?;
            if !resp.is_success() {
                return Err(anyhow!("precache {path}: http {}", resp.status));
            }
            fetched.push((path, resp));
        }

        let store = self.lock_store()?;
        store.open_cache(&self.name)?;
        for (path, resp) in &fetched {
            store.put(&self.name, path, resp)?;
        }
        drop(store);

        self.lifecycle = Lifecycle::Installed;
        tracing::info!(cache = %self.name, assets = fetched.len(), "asset cache installed");
        Ok(fetched.len())
    }

    /// Picks up a cache installed by an earlier run. Returns whether one was found.
    pub fn resume(&mut self) -> Result<bool> {
        let exists = self
            .lock_store()?
            .cache_names()?
            .iter()
            .any(|name| *name == self.name);
        if exists && self.lifecycle == Lifecycle::New {
            self.lifecycle = Lifecycle::Installed;
        }
        Ok(exists)
    }

    /// Deletes every cache but the current one and starts intercepting.
    pub fn activate(&mut self) -> Result<Vec<String>> {
        let store = self.lock_store()?;
        let stale = store
            .cache_names()?
            .into_iter()
            .filter(|name| *name != self.name)
            .collect::<Vec<_>>();
        for name in &stale {
            store.delete_cache(name)?;
        }
        drop(store);

        self.lifecycle = Lifecycle::Active;
        tracing::info!(cache = %self.name, removed = stale.len(), "asset cache activated");
        Ok(stale)
    }

    pub fn handle(&self, path: &str) -> Result<Served> {
        if self.lifecycle != Lifecycle::Active || bypasses_cache(path) {
            return Ok(Served::PassThrough);
        }

        match self.fetcher.fetch(path) {
            Ok(resp) => {
                if resp.is_success() {
                    self.store_in_background(path, &resp);
                }
                Ok(Served::Network(resp))
            }
            Err(err) => {
                tracing::debug!(%path, error = %err, "network failed, trying asset cache");
                let cached = self.lock_store()?.get(&self.name, path)?;
                cached
                    .map(Served::Cache)
                    .ok_or_else(|| err.context(format!("{path} not cached")))
            }
        }
    }

    pub fn cached(&self, path: &str) -> Result<Option<AssetResponse>> {
        self.lock_store()?.get(&self.name, path)
    }

    /// Blocks until every write queued so far has landed.
    pub fn flush(&self) {
        let Some(writer) = self.writer.as_ref() else {
            return;
        };
        let (ack_tx, ack_rx) = mpsc::channel();
        if writer.send(WriterMsg::Flush(ack_tx)).is_ok() {
            let _ = ack_rx.recv();
        }
    }

    fn store_in_background(&self, path: &str, resp: &AssetResponse) {
        let Some(writer) = self.writer.as_ref() else {
            return;
        };
        let msg = WriterMsg::Put {
            cache_name: self.name.clone(),
            path: path.to_string(),
            resp: resp.clone(),
        };
        if writer.send(msg).is_err() {
            tracing::warn!(%path, "asset cache writer stopped");
        }
    }

    fn lock_store(&self) -> Result<MutexGuard<'_, CacheStore>> {
        self.store
            .lock()
            .map_err(|_| anyhow!("asset cache lock poisoned"))
    }
}

impl<F> Drop for AssetCache<F> {
    fn drop(&mut self) {
        self.writer.take();
        if let Some(handle) = self.writer_handle.take() {
            let _ = handle.join();
        }
    }
}

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}
