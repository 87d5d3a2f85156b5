//! In-process relational store for vouchers, orders, and shops.
//!
//! Used when no database URL is configured and by the integration tests.
//! Every mutation happens under one lock, which gives the same all-or-nothing
//! behaviour as the Diesel transaction.

use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use crate::domain::ports::{
    MaterializeOutcome, ShopRepository, ShopRepositoryError, VoucherRepository,
    VoucherRepositoryError,
};
use crate::domain::{
    NewVoucher, OrderId, SeckillVoucher, Shop, ShopDraft, ShopId, ShopType, UserId, Voucher,
    VoucherId, VoucherOrder,
};

#[derive(Debug, Default)]
struct Tables {
    next_voucher_id: u64,
    next_shop_id: u64,
    vouchers: BTreeMap<VoucherId, Voucher>,
    seckill: BTreeMap<VoucherId, SeckillVoucher>,
    orders: BTreeMap<OrderId, VoucherOrder>,
    buyers: HashSet<(VoucherId, UserId)>,
    shops: BTreeMap<ShopId, Shop>,
    shop_types: Vec<ShopType>,
}

/// In-memory implementation of [`VoucherRepository`] and [`ShopRepository`].
#[derive(Debug, Default)]
pub struct InMemoryRelationalStore {
    tables: Mutex<Tables>,
    lookups: AtomicUsize,
}

impl InMemoryRelationalStore {
    /// Empty tables.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Tables> {
        self.tables.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Replace the shop-type catalogue.
    pub fn seed_shop_types(&self, types: impl IntoIterator<Item = ShopType>) {
        let mut types: Vec<ShopType> = types.into_iter().collect();
        types.sort_by_key(|shop_type| shop_type.sort);
        self.lock().shop_types = types;
    }

    /// Number of single-record reads served, for observing cache behaviour.
    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }

    /// Authoritative stock of a seckill voucher.
    pub fn stock(&self, voucher_id: VoucherId) -> Option<i32> {
        self.lock()
            .seckill
            .get(&voucher_id)
            .map(|terms| terms.stock)
    }

    /// Every materialized order, ordered by id.
    pub fn orders(&self) -> Vec<VoucherOrder> {
        self.lock().orders.values().copied().collect()
    }

    fn record_lookup(&self) {
        self.lookups.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl VoucherRepository for InMemoryRelationalStore {
    async fn reduce_stock_and_insert_order(
        &self,
        order: &VoucherOrder,
    ) -> Result<MaterializeOutcome, VoucherRepositoryError> {
        let mut tables = self.lock();
        if tables.orders.contains_key(&order.id)
            || tables.buyers.contains(&(order.voucher_id, order.user_id))
        {
            return Ok(MaterializeOutcome::AlreadyMaterialized);
        }
        let terms = tables
            .seckill
            .get_mut(&order.voucher_id)
            .filter(|terms| terms.stock > 0)
            .ok_or_else(|| VoucherRepositoryError::stock_exhausted(order.voucher_id.get()))?;
        terms.stock -= 1;
        tables.orders.insert(order.id, *order);
        tables.buyers.insert((order.voucher_id, order.user_id));
        Ok(MaterializeOutcome::Created)
    }

    async fn find_seckill_voucher(
        &self,
        voucher_id: VoucherId,
    ) -> Result<Option<SeckillVoucher>, VoucherRepositoryError> {
        self.record_lookup();
        Ok(self.lock().seckill.get(&voucher_id).cloned())
    }

    async fn create_voucher(
        &self,
        voucher: &NewVoucher,
    ) -> Result<VoucherId, VoucherRepositoryError> {
        let mut tables = self.lock();
        tables.next_voucher_id += 1;
        let id = VoucherId::new(tables.next_voucher_id);
        tables.vouchers.insert(
            id,
            Voucher {
                id,
                shop_id: voucher.shop_id,
                title: voucher.title.clone(),
                sub_title: voucher.sub_title.clone(),
                rules: voucher.rules.clone(),
                pay_value: voucher.pay_value,
                actual_value: voucher.actual_value,
                kind: voucher.kind,
            },
        );
        if let Some(terms) = &voucher.seckill {
            tables.seckill.insert(
                id,
                SeckillVoucher {
                    voucher_id: id,
                    stock: terms.stock,
                    begin_time: terms.begin_time,
                    end_time: terms.end_time,
                },
            );
        }
        Ok(id)
    }

    async fn count_orders(&self, voucher_id: VoucherId) -> Result<u64, VoucherRepositoryError> {
        let count = self
            .lock()
            .orders
            .values()
            .filter(|order| order.voucher_id == voucher_id)
            .count();
        Ok(u64::try_from(count).unwrap_or(u64::MAX))
    }
}

#[async_trait]
impl ShopRepository for InMemoryRelationalStore {
    async fn find_by_id(&self, id: ShopId) -> Result<Option<Shop>, ShopRepositoryError> {
        self.record_lookup();
        Ok(self.lock().shops.get(&id).cloned())
    }

    async fn create(&self, draft: &ShopDraft) -> Result<ShopId, ShopRepositoryError> {
        let mut tables = self.lock();
        tables.next_shop_id += 1;
        let id = ShopId::new(tables.next_shop_id);
        tables.shops.insert(id, draft.clone().into_shop(id));
        Ok(id)
    }

    async fn update(&self, shop: &Shop) -> Result<bool, ShopRepositoryError> {
        let mut tables = self.lock();
        match tables.shops.get_mut(&shop.id) {
            Some(existing) => {
                *existing = shop.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete(&self, id: ShopId) -> Result<bool, ShopRepositoryError> {
        Ok(self.lock().shops.remove(&id).is_some())
    }

    async fn list_types(&self) -> Result<Vec<ShopType>, ShopRepositoryError> {
        self.record_lookup();
        Ok(self.lock().shop_types.clone())
    }
}
