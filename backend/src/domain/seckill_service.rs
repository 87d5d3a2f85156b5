//! Seckill admission and voucher catalogue service.
//!
//! Admission never touches the relational store on the hot path. Voucher
//! metadata comes from the read cache, the sale window is checked against the
//! injected clock, and the atomic gate reserves stock, records the claim, and
//! enqueues the fulfillment message in one step.

use std::sync::Arc;

use async_trait::async_trait;
use mockable::Clock;
use tracing::{debug, error, warn};

use crate::domain::ports::{
    AdmissionGate, AdmissionGateError, AdmissionOutcome, AdmissionRequest, CacheKey,
    IdAllocatorError, OrderIdAllocator, SeckillCommand, SeckillRequest, VoucherCatalogue,
    VoucherRepository, VoucherRepositoryError,
};
use crate::domain::{
    Error, NewVoucher, OrderId, ReadCache, SaleWindow, SeckillVoucher, VoucherId, VoucherKind,
};

/// Collaborators of [`SeckillService`].
pub struct SeckillServicePorts {
    /// Relational voucher store.
    pub vouchers: Arc<dyn VoucherRepository>,
    /// Atomic admission step.
    pub gate: Arc<dyn AdmissionGate>,
    /// Order id source.
    pub ids: Arc<dyn OrderIdAllocator>,
}

/// Domain service implementing [`SeckillCommand`] and [`VoucherCatalogue`].
pub struct SeckillService {
    vouchers: Arc<dyn VoucherRepository>,
    gate: Arc<dyn AdmissionGate>,
    ids: Arc<dyn OrderIdAllocator>,
    cache: Arc<ReadCache>,
    clock: Arc<dyn Clock>,
}

impl SeckillService {
    /// Wire the service; `clock` decides whether a sale window is open.
    pub fn new(ports: SeckillServicePorts, cache: Arc<ReadCache>, clock: Arc<dyn Clock>) -> Self {
        Self {
            vouchers: ports.vouchers,
            gate: ports.gate,
            ids: ports.ids,
            cache,
            clock,
        }
    }

    async fn cached_seckill_voucher(
        &self,
        voucher_id: VoucherId,
    ) -> Result<Option<SeckillVoucher>, Error> {
        let vouchers = Arc::clone(&self.vouchers);
        self.cache
            .get_or_load(&CacheKey::seckill_voucher(voucher_id), move || async move {
                vouchers
                    .find_seckill_voucher(voucher_id)
                    .await
                    .map_err(map_repository_error)
            })
            .await
    }

    /// Prime a missing stock counter from the relational row, then admit
    /// once more. Covers vouchers whose priming failed at creation.
    async fn restock_and_admit(
        &self,
        admission: &AdmissionRequest,
    ) -> Result<AdmissionOutcome, Error> {
        let voucher_id = admission.voucher_id;
        let Some(voucher) = self
            .vouchers
            .find_seckill_voucher(voucher_id)
            .await
            .map_err(map_repository_error)?
        else {
            return Ok(AdmissionOutcome::NotStocked);
        };
        if self
            .gate
            .prime_stock(voucher_id, voucher.stock)
            .await
            .map_err(map_gate_error)?
        {
            warn!(
                %voucher_id,
                stock = voucher.stock,
                "stock counter was missing; primed from the voucher store"
            );
        }
        self.gate.admit(admission).await.map_err(map_gate_error)
    }
}

pub(crate) fn map_repository_error(error: VoucherRepositoryError) -> Error {
    match error {
        VoucherRepositoryError::Connection { message } => {
            Error::service_unavailable(format!("voucher store unavailable: {message}"))
        }
        VoucherRepositoryError::Query { message } => {
            Error::internal(format!("voucher store query failed: {message}"))
        }
        VoucherRepositoryError::StockExhausted { voucher_id } => {
            Error::out_of_stock(format!("voucher {voucher_id} is sold out"))
        }
    }
}

fn map_gate_error(error: AdmissionGateError) -> Error {
    error!(%error, "admission gate failed");
    Error::service_unavailable("admission is temporarily unavailable")
}

fn map_allocator_error(error: IdAllocatorError) -> Error {
    if error.is_retryable() {
        warn!(%error, "order id allocation saturated");
    } else {
        error!(%error, "order id allocation failed");
    }
    Error::service_unavailable("order id allocation is temporarily unavailable")
}

#[async_trait]
impl SeckillCommand for SeckillService {
    async fn claim(&self, request: SeckillRequest) -> Result<OrderId, Error> {
        let SeckillRequest {
            voucher_id,
            user_id,
        } = request;
        let voucher = self
            .cached_seckill_voucher(voucher_id)
            .await?
            .ok_or_else(|| Error::not_found(format!("seckill voucher {voucher_id} not found")))?;

        match voucher.sale_window(self.clock.utc()) {
            SaleWindow::Open => {}
            SaleWindow::NotStarted => {
                return Err(Error::invalid_request("seckill has not started yet"));
            }
            SaleWindow::Ended => return Err(Error::invalid_request("seckill has ended")),
        }

        let order_id = self.ids.next_id().await.map_err(map_allocator_error)?;
        let admission = AdmissionRequest {
            voucher_id,
            user_id,
            order_id,
        };
        let mut outcome = self.gate.admit(&admission).await.map_err(map_gate_error)?;
        if outcome == AdmissionOutcome::NotStocked {
            outcome = self.restock_and_admit(&admission).await?;
        }

        debug!(%voucher_id, %user_id, ?outcome, "admission decided");
        match outcome {
            AdmissionOutcome::Admitted => Ok(order_id),
            AdmissionOutcome::OutOfStock => Err(Error::out_of_stock("voucher is sold out")),
            AdmissionOutcome::AlreadyClaimed => Err(Error::already_claimed(
                "user has already claimed this voucher",
            )),
            AdmissionOutcome::NotStocked => Err(Error::not_found(format!(
                "no stock is loaded for voucher {voucher_id}"
            ))),
        }
    }
}

#[async_trait]
impl VoucherCatalogue for SeckillService {
    async fn create_voucher(&self, voucher: NewVoucher) -> Result<VoucherId, Error> {
        voucher
            .validate()
            .map_err(|error| Error::invalid_request(error.to_string()))?;

        let voucher_id = self
            .vouchers
            .create_voucher(&voucher)
            .await
            .map_err(map_repository_error)?;

        if let (VoucherKind::Seckill, Some(terms)) = (voucher.kind, &voucher.seckill) {
            // The row is committed; the first claim primes the counter instead.
            if let Err(error) = self.gate.prime_stock(voucher_id, terms.stock).await {
                warn!(%voucher_id, %error, "stock priming deferred to the first claim");
            }
            // A lookup issued before creation may have cached the sentinel.
            self.cache
                .invalidate(&CacheKey::seckill_voucher(voucher_id))
                .await;
        }
        Ok(voucher_id)
    }

    async fn seckill_voucher(&self, voucher_id: VoucherId) -> Result<SeckillVoucher, Error> {
        self.cached_seckill_voucher(voucher_id)
            .await?
            .ok_or_else(|| Error::not_found(format!("seckill voucher {voucher_id} not found")))
    }
}

#[cfg(test)]
mod tests;
