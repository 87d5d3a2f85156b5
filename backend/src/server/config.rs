//! Process settings loaded via OrthoConfig, and the HTTP server configuration
//! derived from them.
//!
//! Every value is optional on the command line, in `SECKILL_*` environment
//! variables, and in config files; accessors apply the defaults. Leaving both
//! `database_url` and `redis_url` unset selects the in-memory adapters.

use std::net::SocketAddr;
use std::time::Duration;

use actix_web::web;
use chrono::{DateTime, Utc};
use ortho_config::OrthoConfig;
use serde::Deserialize;

use seckill::domain::{CacheTtlPolicy, IdAllocatorConfig, OrderMaterializerConfig};
use seckill::inbound::http::state::HttpState;

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
const DEFAULT_CONSUMER_PREFIX: &str = "materializer";
const DEFAULT_CONSUMER_COUNT: usize = 2;
const DEFAULT_DB_POOL_SIZE: u32 = 10;
const DEFAULT_REDIS_POOL_SIZE: u32 = 16;

/// Errors raised while interpreting loaded settings.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SettingsError {
    #[error("invalid bind address {value}: {message}")]
    BindAddr { value: String, message: String },
    #[error("database_url and redis_url must be set together")]
    PartialStores,
    #[error("consumer_count must be at least 1")]
    NoConsumers,
    #[error("id epoch {0} is not a valid unix timestamp")]
    Epoch(i64),
}

/// Which adapters back the ports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreMode {
    /// In-process stores; state is lost on restart.
    InMemory,
    /// PostgreSQL for orders and catalogue, Redis for admission and caching.
    External {
        database_url: String,
        redis_url: String,
    },
}

/// Settings for the seckill server.
#[derive(Debug, Clone, Deserialize, OrthoConfig)]
#[ortho_config(prefix = "SECKILL")]
pub struct AppSettings {
    /// Socket address the HTTP server binds to.
    pub bind_addr: Option<String>,
    /// PostgreSQL connection string.
    pub database_url: Option<String>,
    /// Redis connection string.
    pub redis_url: Option<String>,
    /// Maximum PostgreSQL connections.
    pub db_pool_size: Option<u32>,
    /// Maximum Redis connections.
    pub redis_pool_size: Option<u32>,
    /// Machine id embedded in every order id; unique per instance.
    pub machine_id: Option<u16>,
    /// Order id epoch as unix seconds.
    pub id_epoch: Option<i64>,
    /// Consumer names are `{prefix}-{n}`.
    pub consumer_prefix: Option<String>,
    /// Materializers started in this process.
    pub consumer_count: Option<usize>,
    /// Attempts before a message is dead-lettered.
    pub max_retries: Option<u32>,
    /// Blocking read timeout on the order stream.
    pub poll_interval_ms: Option<u64>,
    /// Pause between recovery passes.
    pub reclaim_interval_ms: Option<u64>,
    /// Idle time after which a pending message may be reclaimed.
    pub reclaim_min_idle_ms: Option<u64>,
    /// Base lifetime of cached values.
    pub cache_ttl_secs: Option<u64>,
    /// Upper bound of the random TTL extension.
    pub cache_jitter_secs: Option<u64>,
    /// Lifetime of the missing-value sentinel.
    pub cache_empty_ttl_secs: Option<u64>,
}

impl AppSettings {
    /// Parsed listen address.
    pub fn bind_addr(&self) -> Result<SocketAddr, SettingsError> {
        let value = self.bind_addr.as_deref().unwrap_or(DEFAULT_BIND_ADDR);
        value
            .parse()
            .map_err(|err: std::net::AddrParseError| SettingsError::BindAddr {
                value: value.to_owned(),
                message: err.to_string(),
            })
    }

    /// External stores when both URLs are set, in-memory when neither is.
    pub fn store_mode(&self) -> Result<StoreMode, SettingsError> {
        match (&self.database_url, &self.redis_url) {
            (None, None) => Ok(StoreMode::InMemory),
            (Some(database_url), Some(redis_url)) => Ok(StoreMode::External {
                database_url: database_url.clone(),
                redis_url: redis_url.clone(),
            }),
            _ => Err(SettingsError::PartialStores),
        }
    }

    /// PostgreSQL pool size, defaulted.
    pub fn db_pool_size(&self) -> u32 {
        self.db_pool_size.unwrap_or(DEFAULT_DB_POOL_SIZE)
    }

    /// Redis pool size, defaulted.
    pub fn redis_pool_size(&self) -> u32 {
        self.redis_pool_size.unwrap_or(DEFAULT_REDIS_POOL_SIZE)
    }

    /// Prefix of generated consumer names.
    pub fn consumer_prefix(&self) -> &str {
        self.consumer_prefix
            .as_deref()
            .unwrap_or(DEFAULT_CONSUMER_PREFIX)
    }

    /// Number of materializers; zero is rejected.
    pub fn consumer_count(&self) -> Result<usize, SettingsError> {
        match self.consumer_count.unwrap_or(DEFAULT_CONSUMER_COUNT) {
            0 => Err(SettingsError::NoConsumers),
            count => Ok(count),
        }
    }

    /// Allocator epoch and machine id.
    pub fn id_allocator(&self) -> Result<IdAllocatorConfig, SettingsError> {
        let epoch = match self.id_epoch {
            Some(secs) => {
                DateTime::<Utc>::from_timestamp(secs, 0).ok_or(SettingsError::Epoch(secs))?
            }
            None => IdAllocatorConfig::default_epoch(),
        };
        Ok(IdAllocatorConfig {
            epoch,
            machine_id: self.machine_id.unwrap_or_default(),
        })
    }

    /// Materializer tuning with unset values defaulted.
    pub fn materializer(&self) -> OrderMaterializerConfig {
        let defaults = OrderMaterializerConfig::default();
        OrderMaterializerConfig {
            max_retries: self.max_retries.unwrap_or(defaults.max_retries),
            poll_interval: self
                .poll_interval_ms
                .map_or(defaults.poll_interval, Duration::from_millis),
            reclaim_interval: self
                .reclaim_interval_ms
                .map_or(defaults.reclaim_interval, Duration::from_millis),
            reclaim_min_idle: self
                .reclaim_min_idle_ms
                .map_or(defaults.reclaim_min_idle, Duration::from_millis),
            ..defaults
        }
    }

    /// Read cache TTLs with unset values defaulted.
    pub fn cache_policy(&self) -> CacheTtlPolicy {
        let defaults = CacheTtlPolicy::default();
        CacheTtlPolicy {
            value_ttl: self
                .cache_ttl_secs
                .map_or(defaults.value_ttl, Duration::from_secs),
            max_jitter: self
                .cache_jitter_secs
                .map_or(defaults.max_jitter, Duration::from_secs),
            empty_ttl: self
                .cache_empty_ttl_secs
                .map_or(defaults.empty_ttl, Duration::from_secs),
        }
    }
}

/// Builder-style configuration for creating the HTTP server.
pub struct ServerConfig {
    pub(crate) bind_addr: SocketAddr,
    pub(crate) http_state: web::Data<HttpState>,
}

impl ServerConfig {
    /// Serve `http_state` on `bind_addr`.
    #[must_use]
    pub fn new(bind_addr: SocketAddr, http_state: HttpState) -> Self {
        Self {
            bind_addr,
            http_state: web::Data::new(http_state),
        }
    }
}
