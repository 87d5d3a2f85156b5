//! Builders wiring ports to adapters and domain services.
//!
//! External mode connects Redis and PostgreSQL (applying migrations first);
//! in-memory mode shares one [`InMemoryStore`] for the cache, gate, and
//! stream so development runs need no infrastructure.

use std::sync::Arc;

use mockable::Clock;
use tracing::{info, warn};

use seckill::domain::ports::{
    AdmissionGate, CacheStore, FulfillmentQueue, ShopRepository, VoucherRepository,
};
use seckill::domain::{
    OrderMaterializer, OrderMaterializerPorts, ReadCache, SeckillService, SeckillServicePorts,
    ShopService, ShopType, SonyflakeAllocator,
};
use seckill::inbound::http::state::HttpState;
use seckill::outbound::memory::{InMemoryRelationalStore, InMemoryStore};
use seckill::outbound::persistence::{
    DbPool, DieselShopRepository, DieselVoucherRepository, MigrationError, PoolConfig, PoolError,
    run_pending_migrations,
};
use seckill::outbound::redis::{
    RedisAdmissionGate, RedisCacheStore, RedisFulfillmentQueue, RedisPool, RedisPoolConfig,
    RedisPoolError,
};

use super::config::{AppSettings, SettingsError, StoreMode};

/// Failures while wiring adapters at start-up.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error(transparent)]
    Settings(#[from] SettingsError),
    #[error(transparent)]
    Migrations(#[from] MigrationError),
    #[error("database pool: {0}")]
    Database(#[from] PoolError),
    #[error("redis pool: {0}")]
    Redis(#[from] RedisPoolError),
}

/// Adapter set backing the ports.
struct StorePorts {
    cache: Arc<dyn CacheStore>,
    gate: Arc<dyn AdmissionGate>,
    queue: Arc<dyn FulfillmentQueue>,
    vouchers: Arc<dyn VoucherRepository>,
    shops: Arc<dyn ShopRepository>,
}

/// Everything `main` needs to serve traffic and drain the stream.
pub struct Wiring {
    /// Driving ports for the HTTP handlers.
    pub http_state: HttpState,
    /// One materializer per configured consumer.
    pub materializers: Vec<Arc<OrderMaterializer>>,
}

fn development_shop_types() -> Vec<ShopType> {
    [
        ("Food", "/types/food.png"),
        ("KTV", "/types/ktv.png"),
        ("Spa", "/types/spa.png"),
    ]
    .into_iter()
    .zip(1_u64..)
    .map(|((name, icon), id)| ShopType {
        id,
        name: name.to_owned(),
        icon: icon.to_owned(),
        sort: i32::try_from(id).unwrap_or(i32::MAX),
    })
    .collect()
}

fn in_memory_ports(order_stream: &str) -> StorePorts {
    warn!("no store URLs configured; using in-memory adapters (state is not persisted)");
    let store = Arc::new(InMemoryStore::with_order_stream(order_stream));
    let relational = Arc::new(InMemoryRelationalStore::new());
    relational.seed_shop_types(development_shop_types());
    StorePorts {
        cache: store.clone(),
        gate: store.clone(),
        queue: store,
        vouchers: relational.clone(),
        shops: relational,
    }
}

async fn external_ports(
    settings: &AppSettings,
    database_url: String,
    redis_url: String,
    order_stream: &str,
) -> Result<StorePorts, StartupError> {
    run_pending_migrations(database_url.clone()).await?;
    let db_pool =
        DbPool::new(PoolConfig::new(database_url).with_max_size(settings.db_pool_size())).await?;
    let redis_pool =
        RedisPool::new(RedisPoolConfig::new(redis_url).with_max_size(settings.redis_pool_size()))
            .await?;
    info!("connected to PostgreSQL and Redis");
    Ok(StorePorts {
        cache: Arc::new(RedisCacheStore::new(redis_pool.clone())),
        gate: Arc::new(RedisAdmissionGate::new(redis_pool.clone(), order_stream)),
        queue: Arc::new(RedisFulfillmentQueue::new(redis_pool)),
        vouchers: Arc::new(DieselVoucherRepository::new(db_pool.clone())),
        shops: Arc::new(DieselShopRepository::new(db_pool)),
    })
}

/// Build HTTP state and the materializer fleet from settings.
pub async fn build_wiring(
    settings: &AppSettings,
    clock: Arc<dyn Clock>,
) -> Result<Wiring, StartupError> {
    let materializer_config = settings.materializer();
    let ports = match settings.store_mode()? {
        StoreMode::InMemory => in_memory_ports(&materializer_config.stream),
        StoreMode::External {
            database_url,
            redis_url,
        } => {
            external_ports(
                settings,
                database_url,
                redis_url,
                &materializer_config.stream,
            )
            .await?
        }
    };

    let cache = Arc::new(ReadCache::new(ports.cache, settings.cache_policy()));
    let ids = Arc::new(SonyflakeAllocator::new(
        clock.clone(),
        settings.id_allocator()?,
    ));
    let seckill = Arc::new(SeckillService::new(
        SeckillServicePorts {
            vouchers: ports.vouchers.clone(),
            gate: ports.gate,
            ids,
        },
        cache.clone(),
        clock.clone(),
    ));
    let shops = Arc::new(ShopService::new(ports.shops, cache));
    let http_state = HttpState::new(seckill.clone(), seckill, shops);

    let prefix = settings.consumer_prefix();
    let materializers = (0..settings.consumer_count()?)
        .map(|n| {
            Arc::new(OrderMaterializer::new(
                OrderMaterializerPorts::new(ports.queue.clone(), ports.vouchers.clone()),
                clock.clone(),
                materializer_config.clone(),
                format!("{prefix}-{n}"),
            ))
        })
        .collect();

    Ok(Wiring {
        http_state,
        materializers,
    })
}
