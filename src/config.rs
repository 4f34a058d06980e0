//config.rs
use dotenv::dotenv;
use std::{env, str::FromStr, sync::Arc, time::Duration};

use crate::error::{Result, WilayahError};
use crate::selector::WilayahSelector;
use crate::selector::form::HostForm;
use crate::selector::notify::Notifier;
use crate::selector::source::{CachedWilayahSource, HttpWilayahSource, WilayahSource};

/// Lower bound for the reconcile debounce window.
pub const MIN_DEBOUNCE: Duration = Duration::from_millis(300);

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub db_max_connections: u32,
    pub bind_addr: String,
    pub port: u16,
    pub allowed_origin: String,
    pub wilayah_api_base: String,
    pub debounce: Duration,
    pub cache_ttl: Duration,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();

        let database_url = env::var("DATABASE_URL").map_err(|_| {
            log::error!("DATABASE_URL tidak ditemukan di .env");
            WilayahError::Config {
                key: "DATABASE_URL",
            }
        })?;

        let debounce_ms: u64 = parse_or("WILAYAH_DEBOUNCE_MS", 300)?;
        let cache_ttl_secs: u64 = parse_or("WILAYAH_CACHE_TTL_SECS", 3600)?;

        Ok(Self {
            database_url,
            db_max_connections: parse_or("DB_MAX_CONNECTIONS", 5)?,
            bind_addr: env::var("BIND_ADDR").unwrap_or_else(|_| "127.0.0.1".into()),
            port: parse_or("PORT", 8000)?,
            allowed_origin: env::var("ALLOWED_ORIGIN")
                .unwrap_or_else(|_| "http://localhost:3000".into()),
            wilayah_api_base: env::var("WILAYAH_API_BASE")
                .unwrap_or_else(|_| "http://127.0.0.1:8000".into()),
            debounce: clamp_debounce(Duration::from_millis(debounce_ms)),
            cache_ttl: Duration::from_secs(cache_ttl_secs),
        })
    }

    /// Shared reference cache over the HTTP API at `WILAYAH_API_BASE`.
    /// Hosts build one per process and hand it to every selector.
    pub fn reference_source(&self) -> CachedWilayahSource<HttpWilayahSource> {
        CachedWilayahSource::new(
            HttpWilayahSource::new(self.wilayah_api_base.as_str()),
            self.cache_ttl,
        )
    }

    /// Selector wired to `source` with this config's debounce.
    pub fn build_selector(
        &self,
        mode: impl Into<String>,
        source: Arc<dyn WilayahSource>,
        form: Arc<dyn HostForm>,
        notifier: Arc<dyn Notifier>,
    ) -> WilayahSelector {
        WilayahSelector::new(source, form, notifier, self.selector(mode))
    }

    pub fn selector(&self, mode: impl Into<String>) -> SelectorConfig {
        SelectorConfig {
            mode: mode.into(),
            debounce: self.debounce,
        }
    }
}

/// Settings for one selector instance.
#[derive(Debug, Clone)]
pub struct SelectorConfig {
    /// Visibility depth token, see [`crate::selector::visibility`].
    pub mode: String,
    pub debounce: Duration,
}

impl SelectorConfig {
    pub fn new(mode: impl Into<String>) -> Self {
        Self {
            mode: mode.into(),
            debounce: MIN_DEBOUNCE,
        }
    }

    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = clamp_debounce(debounce);
        self
    }
}

pub fn clamp_debounce(debounce: Duration) -> Duration {
    debounce.max(MIN_DEBOUNCE)
}

fn parse_or<T: FromStr>(key: &'static str, default: T) -> Result<T> {
    match env::var(key) {
        Ok(raw) if !raw.trim().is_empty() => raw.trim().parse().map_err(|_| {
            log::error!("Nilai {} tidak valid: {}", key, raw);
            WilayahError::Config { key }
        }),
        _ => Ok(default),
    }
}
