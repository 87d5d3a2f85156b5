//! End-to-end admission and fulfillment over the in-memory adapters.

mod support;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::future::join_all;
use rstest::rstest;

use seckill::domain::ports::{
    FulfillmentQueue, MaterializeOutcome, SeckillCommand, SeckillRequest, VoucherRepository,
    VoucherRepositoryError,
};
use seckill::domain::{
    ErrorCode, FulfillmentMessage, MessageDisposition, NewVoucher, OrderId, SeckillVoucher, UserId,
    VoucherId, VoucherOrder,
};
use seckill::outbound::memory::InMemoryRelationalStore;
use seckill::test_support::orders_per_user;
use support::Pipeline;
use tokio::sync::Barrier;

async fn claim(
    pipeline: &Pipeline,
    voucher_id: VoucherId,
    user: u64,
) -> Result<OrderId, ErrorCode> {
    pipeline
        .service
        .claim(SeckillRequest {
            voucher_id,
            user_id: UserId::new(user),
        })
        .await
        .map_err(|error| error.code())
}

#[rstest]
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn oversubscribed_sale_admits_exactly_the_stock() {
    let pipeline = Pipeline::new();
    let voucher_id = pipeline.open_sale(100).await;

    // Released together, so the burst outruns one id tick's sequence.
    let start = Arc::new(Barrier::new(300));
    let buyers: Vec<_> = (1..=300_u64)
        .map(|user| {
            let service = Arc::clone(&pipeline.service);
            let start = Arc::clone(&start);
            tokio::spawn(async move {
                start.wait().await;
                service
                    .claim(SeckillRequest {
                        voucher_id,
                        user_id: UserId::new(user),
                    })
                    .await
                    .map_err(|error| error.code())
            })
        })
        .collect();
    let results: Vec<Result<OrderId, ErrorCode>> = join_all(buyers)
        .await
        .into_iter()
        .map(|joined| joined.expect("buyer task"))
        .collect();

    let admitted = results.iter().filter(|result| result.is_ok()).count();
    let sold_out = results
        .iter()
        .filter(|result| matches!(result, Err(ErrorCode::OutOfStock)))
        .count();
    assert_eq!(admitted, 100);
    assert_eq!(sold_out, 200);
    assert_eq!(admitted + sold_out, results.len());
    assert_eq!(pipeline.store.stock(voucher_id), Some(0));

    let materializer = pipeline.materializer(pipeline.relational.clone(), "consumer-a");
    let dispositions = pipeline.drain(&materializer).await;

    assert_eq!(dispositions.len(), 100);
    assert!(
        dispositions
            .iter()
            .all(|disposition| *disposition == MessageDisposition::Materialized)
    );
    let orders = pipeline.relational.orders();
    assert_eq!(orders.len(), 100);
    assert_eq!(pipeline.relational.stock(voucher_id), Some(0));
    assert!(orders_per_user(&orders).values().all(|count| *count == 1));
    assert_eq!(
        pipeline
            .store
            .pending_count(&pipeline.config.stream, &pipeline.config.group),
        0
    );
}

#[rstest]
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn repeated_claims_by_one_user_admit_once() {
    let pipeline = Pipeline::new();
    let voucher_id = pipeline.open_sale(10).await;

    let results = join_all((0..10).map(|_| claim(&pipeline, voucher_id, 42))).await;

    assert_eq!(results.iter().filter(|result| result.is_ok()).count(), 1);
    assert_eq!(
        results
            .iter()
            .filter(|result| matches!(result, Err(ErrorCode::AlreadyClaimed)))
            .count(),
        9
    );
    assert_eq!(pipeline.store.stock(voucher_id), Some(9));
    assert_eq!(pipeline.store.claim_count(voucher_id), 1);
}

#[rstest]
#[tokio::test]
async fn order_ids_are_unique_and_increasing() {
    let pipeline = Pipeline::new();
    let voucher_id = pipeline.open_sale(20).await;

    let mut ids = Vec::new();
    for user in 1..=20 {
        ids.push(claim(&pipeline, voucher_id, user).await.expect("admitted"));
    }

    assert!(ids.windows(2).all(|pair| pair[0] < pair[1]));
}

#[rstest]
#[tokio::test]
async fn replayed_message_is_acknowledged_as_duplicate() {
    let pipeline = Pipeline::new();
    let voucher_id = pipeline.open_sale(5).await;
    let order_id = claim(&pipeline, voucher_id, 7).await.expect("admitted");

    let materializer = pipeline.materializer(pipeline.relational.clone(), "consumer-a");
    assert_eq!(
        pipeline.drain(&materializer).await,
        [MessageDisposition::Materialized]
    );

    let replay = FulfillmentMessage::admitted(order_id, voucher_id, UserId::new(7));
    pipeline
        .store
        .append(&pipeline.config.stream, &replay.to_fields())
        .await
        .expect("append replay");
    assert_eq!(
        pipeline.drain(&materializer).await,
        [MessageDisposition::Duplicate]
    );
    assert_eq!(pipeline.relational.orders().len(), 1);
    assert_eq!(pipeline.relational.stock(voucher_id), Some(4));
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn stalled_delivery_is_recovered_by_another_consumer() {
    let pipeline = Pipeline::new();
    let voucher_id = pipeline.open_sale(2).await;
    let order_id = claim(&pipeline, voucher_id, 7).await.expect("admitted");

    let crashed = pipeline.materializer(pipeline.relational.clone(), "consumer-a");
    crashed.prepare().await.expect("group created");
    let delivered = pipeline
        .store
        .read_new(
            &pipeline.config.stream,
            &pipeline.config.group,
            crashed.consumer(),
            10,
            Duration::ZERO,
        )
        .await
        .expect("read");
    assert_eq!(delivered.len(), 1);

    let survivor = pipeline.materializer(pipeline.relational.clone(), "consumer-b");
    assert_eq!(survivor.reclaim_once().await, 0);

    tokio::time::advance(pipeline.config.reclaim_min_idle + Duration::from_secs(1)).await;

    assert_eq!(survivor.reclaim_once().await, 1);
    let orders = pipeline.relational.orders();
    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0].id, order_id);
    assert_eq!(pipeline.relational.stock(voucher_id), Some(1));
    assert_eq!(
        pipeline
            .store
            .pending_count(&pipeline.config.stream, &pipeline.config.group),
        0
    );
}

/// Voucher repository whose order writes always fail.
struct FailingWrites(Arc<InMemoryRelationalStore>);

#[async_trait]
impl VoucherRepository for FailingWrites {
    async fn reduce_stock_and_insert_order(
        &self,
        _order: &VoucherOrder,
    ) -> Result<MaterializeOutcome, VoucherRepositoryError> {
        Err(VoucherRepositoryError::connection("database is down"))
    }

    async fn find_seckill_voucher(
        &self,
        voucher_id: VoucherId,
    ) -> Result<Option<SeckillVoucher>, VoucherRepositoryError> {
        self.0.find_seckill_voucher(voucher_id).await
    }

    async fn create_voucher(
        &self,
        voucher: &NewVoucher,
    ) -> Result<VoucherId, VoucherRepositoryError> {
        self.0.create_voucher(voucher).await
    }

    async fn count_orders(&self, voucher_id: VoucherId) -> Result<u64, VoucherRepositoryError> {
        self.0.count_orders(voucher_id).await
    }
}

#[rstest]
#[tokio::test]
async fn persistent_failures_end_in_the_dead_letter_stream() {
    let pipeline = Pipeline::new();
    let voucher_id = pipeline.open_sale(3).await;
    for user in 1..=3 {
        claim(&pipeline, voucher_id, user).await.expect("admitted");
    }

    let failing = Arc::new(FailingWrites(pipeline.relational.clone()));
    let materializer = pipeline.materializer(failing, "consumer-a");
    let dispositions = pipeline.drain(&materializer).await;

    let max_retries = pipeline.config.max_retries as usize;
    let requeued = dispositions
        .iter()
        .filter(|disposition| **disposition == MessageDisposition::Requeued)
        .count();
    let dead = dispositions
        .iter()
        .filter(|disposition| **disposition == MessageDisposition::DeadLettered)
        .count();
    assert_eq!(requeued, 3 * max_retries);
    assert_eq!(dead, 3);
    assert_eq!(
        pipeline
            .store
            .stream_len(&pipeline.config.dead_letter_stream),
        3
    );
    assert_eq!(
        pipeline
            .store
            .pending_count(&pipeline.config.stream, &pipeline.config.group),
        0
    );
    assert!(pipeline.relational.orders().is_empty());
    assert_eq!(pipeline.relational.stock(voucher_id), Some(3));
}

#[rstest]
#[case::before_start(-2)]
#[case::after_end(2)]
#[tokio::test]
async fn claims_outside_the_sale_window_are_rejected(#[case] hours_from_noon: i64) {
    let pipeline = Pipeline::new();
    let voucher_id = pipeline.open_sale(5).await;
    pipeline.clock.advance_seconds(hours_from_noon * 3_600);

    let result = claim(&pipeline, voucher_id, 1).await;

    assert_eq!(result, Err(ErrorCode::InvalidRequest));
    assert_eq!(pipeline.store.stock(voucher_id), Some(5));
    assert_eq!(pipeline.store.stream_len(&pipeline.config.stream), 0);
}

#[rstest]
#[tokio::test]
async fn unknown_voucher_is_not_found() {
    let pipeline = Pipeline::new();

    let result = claim(&pipeline, VoucherId::new(404), 1).await;

    assert_eq!(result, Err(ErrorCode::NotFound));
}
