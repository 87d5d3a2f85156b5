//! Shared fixtures for the in-memory pipeline tests.

#![allow(dead_code, reason = "each test binary uses a different subset")]

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use mockable::Clock;

use seckill::domain::ports::{FulfillmentQueue, VoucherCatalogue, VoucherRepository};
use seckill::domain::{
    CacheTtlPolicy, IdAllocatorConfig, MessageDisposition, NewVoucher, OrderMaterializer,
    OrderMaterializerConfig, OrderMaterializerPorts, OrderMaterializerRuntime, ReadCache,
    SeckillService, SeckillServicePorts, SeckillTerms, ShopId, SonyflakeAllocator, VoucherId,
    VoucherKind,
};
use seckill::outbound::memory::{InMemoryRelationalStore, InMemoryStore};
use seckill::test_support::{ImmediateSleeper, MutableClock, NoJitter};

pub fn noon() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 11, 11, 12, 0, 0)
        .single()
        .expect("valid timestamp")
}

/// Admission service, materializer, and both in-memory stores wired together.
pub struct Pipeline {
    pub store: Arc<InMemoryStore>,
    pub relational: Arc<InMemoryRelationalStore>,
    pub clock: Arc<MutableClock>,
    pub service: Arc<SeckillService>,
    pub config: OrderMaterializerConfig,
}

impl Pipeline {
    pub fn new() -> Self {
        Self::with_relational(Arc::new(InMemoryRelationalStore::new()))
    }

    pub fn with_relational(relational: Arc<InMemoryRelationalStore>) -> Self {
        Self::with_vouchers(relational.clone(), relational)
    }

    /// Route materializer writes through `vouchers` while reads and
    /// assertions use `relational`.
    pub fn with_vouchers(
        relational: Arc<InMemoryRelationalStore>,
        vouchers: Arc<dyn VoucherRepository>,
    ) -> Self {
        let store = Arc::new(InMemoryStore::new());
        let clock = Arc::new(MutableClock::new(noon()));
        let cache = Arc::new(ReadCache::new(store.clone(), CacheTtlPolicy::default()));
        let ids = Arc::new(SonyflakeAllocator::with_sleeper(
            clock.clone(),
            Arc::new(ImmediateSleeper),
            IdAllocatorConfig::default(),
        ));
        let service = Arc::new(SeckillService::new(
            SeckillServicePorts {
                vouchers,
                gate: store.clone(),
                ids,
            },
            cache,
            clock.clone(),
        ));
        Self {
            store,
            relational,
            clock,
            service,
            config: OrderMaterializerConfig::default(),
        }
    }

    /// Create a seckill voucher whose sale window contains `noon()`.
    pub async fn open_sale(&self, stock: i32) -> VoucherId {
        self.service
            .create_voucher(NewVoucher {
                shop_id: ShopId::new(1),
                title: "Midnight ramen".to_owned(),
                sub_title: Some("one bowl".to_owned()),
                rules: None,
                pay_value: 100,
                actual_value: 1_500,
                kind: VoucherKind::Seckill,
                seckill: Some(SeckillTerms {
                    stock,
                    begin_time: noon() - chrono::Duration::hours(1),
                    end_time: noon() + chrono::Duration::hours(1),
                }),
            })
            .await
            .expect("voucher created")
    }

    pub fn materializer(
        &self,
        vouchers: Arc<dyn VoucherRepository>,
        name: &str,
    ) -> OrderMaterializer {
        OrderMaterializer::with_runtime(
            OrderMaterializerPorts::new(self.store.clone(), vouchers),
            self.clock.clone() as Arc<dyn Clock>,
            OrderMaterializerRuntime {
                sleeper: Arc::new(ImmediateSleeper),
                jitter: Arc::new(NoJitter),
            },
            self.config.clone(),
            name,
        )
    }

    /// Read and process until the stream has nothing new; return every
    /// disposition in delivery order.
    pub async fn drain(&self, materializer: &OrderMaterializer) -> Vec<MessageDisposition> {
        materializer.prepare().await.expect("group created");
        let mut dispositions = Vec::new();
        loop {
            let batch = self
                .store
                .read_new(
                    &self.config.stream,
                    &self.config.group,
                    materializer.consumer(),
                    64,
                    Duration::ZERO,
                )
                .await
                .expect("read");
            if batch.is_empty() {
                return dispositions;
            }
            for message in batch {
                dispositions.push(materializer.process(message).await);
            }
        }
    }
}
