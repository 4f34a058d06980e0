//! Where option lists come from.
//!
//! [`WilayahSource`] is the logical read API of the four reference-data
//! endpoints. [`HttpWilayahSource`] talks to the backend over HTTP and
//! [`CachedWilayahSource`] is the shared reference cache that several
//! selector instances may read through.

use async_trait::async_trait;
use reqwest::Client;
use std::{
    collections::HashMap,
    sync::{
        Arc, PoisonError, RwLock,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};
use tokio::time::Instant;

use crate::error::{Result, WilayahError};
use crate::models::wilayah::{Level, Wilayah};

#[async_trait]
pub trait WilayahSource: Send + Sync {
    /// Ordered option list for `level`. `parent` is ignored for
    /// [`Level::Provinsi`] and required for every other level.
    async fn fetch(&self, level: Level, parent: Option<&str>) -> Result<Vec<Wilayah>>;

    /// Whether the source finished its own initial load.
    fn is_ready(&self) -> bool {
        true
    }
}

#[async_trait]
impl<S: WilayahSource + ?Sized> WilayahSource for Arc<S> {
    async fn fetch(&self, level: Level, parent: Option<&str>) -> Result<Vec<Wilayah>> {
        (**self).fetch(level, parent).await
    }

    fn is_ready(&self) -> bool {
        (**self).is_ready()
    }
}

/// Returns the trimmed parent code, or `MissingParent` when a non-root
/// level is requested without one.
pub fn require_parent(level: Level, parent: Option<&str>) -> Result<Option<&str>> {
    if level == Level::Provinsi {
        return Ok(None);
    }
    match parent.map(str::trim) {
        Some(code) if !code.is_empty() => Ok(Some(code)),
        _ => Err(WilayahError::MissingParent { level }),
    }
}

#[derive(Debug, Clone)]
pub struct HttpWilayahSource {
    client: Client,
    base_url: String,
}

impl HttpWilayahSource {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(Client::new(), base_url)
    }

    pub fn with_client(client: Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { client, base_url }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn url_for(&self, level: Level, parent: Option<&str>) -> String {
        match parent {
            Some(code) if level != Level::Provinsi => format!(
                "{}/api/wilayah/{}/{}",
                self.base_url,
                level.path_segment(),
                code
            ),
            _ => format!("{}/api/wilayah/{}", self.base_url, level.path_segment()),
        }
    }
}

#[async_trait]
impl WilayahSource for HttpWilayahSource {
    async fn fetch(&self, level: Level, parent: Option<&str>) -> Result<Vec<Wilayah>> {
        let parent = require_parent(level, parent)?;
        let url = self.url_for(level, parent);
        log::debug!("GET {}", url);

        let response = self.client.get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(WilayahError::Status {
                status: status.as_u16(),
                url,
            });
        }

        let text = response.text().await?;
        let mut items: Vec<Wilayah> = serde_json::from_str(&text)?;

        if let Some(parent) = parent {
            for item in items.iter_mut().filter(|item| item.parent_code.is_none()) {
                item.parent_code = Some(parent.to_string());
            }
        }
        Ok(items)
    }
}

type CacheKey = (Level, Option<String>);

struct CacheEntry {
    stored_at: Instant,
    items: Arc<Vec<Wilayah>>,
}

/// Read-through TTL cache over another source. Failed fetches are not
/// cached.
pub struct CachedWilayahSource<S> {
    inner: S,
    ttl: Duration,
    entries: RwLock<HashMap<CacheKey, CacheEntry>>,
    ready: AtomicBool,
}

impl<S: WilayahSource> CachedWilayahSource<S> {
    pub fn new(inner: S, ttl: Duration) -> Self {
        Self {
            inner,
            ttl,
            entries: RwLock::new(HashMap::new()),
            ready: AtomicBool::new(false),
        }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Loads the provinsi list and marks the cache ready.
    pub async fn warm_up(&self) -> Result<usize> {
        let provinsi = self.fetch(Level::Provinsi, None).await?;
        self.ready.store(true, Ordering::Release);
        log::info!("Cache wilayah siap: {} provinsi", provinsi.len());
        Ok(provinsi.len())
    }

    pub fn invalidate(&self) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    fn cached(&self, key: &CacheKey) -> Option<Arc<Vec<Wilayah>>> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries
            .get(key)
            .filter(|entry| entry.stored_at.elapsed() < self.ttl)
            .map(|entry| Arc::clone(&entry.items))
    }
}

#[async_trait]
impl<S: WilayahSource> WilayahSource for CachedWilayahSource<S> {
    async fn fetch(&self, level: Level, parent: Option<&str>) -> Result<Vec<Wilayah>> {
        let parent = require_parent(level, parent)?;
        let key = (level, parent.map(str::to_string));

        if let Some(items) = self.cached(&key) {
            log::debug!("Cache hit {} {:?}", level, parent);
            return Ok(items.as_ref().clone());
        }

        let items = self.inner.fetch(level, parent).await?;
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(
                key,
                CacheEntry {
                    stored_at: Instant::now(),
                    items: Arc::new(items.clone()),
                },
            );
        Ok(items)
    }

    fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }
}
