//! Unit coverage for admission decisions and voucher creation.

use std::sync::atomic::{AtomicUsize, Ordering};

use chrono::{DateTime, Duration, TimeZone, Utc};
use mockall::predicate::eq;
use rstest::{fixture, rstest};

use super::*;
use crate::domain::ports::{
    MockAdmissionGate, MockCacheStore, MockOrderIdAllocator, MockVoucherRepository,
};
use crate::domain::{CacheTtlPolicy, ErrorCode, SeckillTerms, ShopId, UserId};
use crate::test_support::MutableClock;

const VOUCHER: VoucherId = VoucherId::new(10);
const USER: UserId = UserId::new(20);
const ORDER: OrderId = OrderId::new(30);

#[fixture]
fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0)
        .single()
        .expect("valid timestamp")
}

fn open_voucher(now: DateTime<Utc>) -> SeckillVoucher {
    SeckillVoucher {
        voucher_id: VOUCHER,
        stock: 100,
        begin_time: now - Duration::hours(1),
        end_time: now + Duration::hours(1),
    }
}

fn cold_cache() -> Arc<ReadCache> {
    let mut store = MockCacheStore::new();
    store.expect_get().returning(|_| Ok(None));
    store.expect_set().returning(|_, _, _| Ok(()));
    store.expect_delete().returning(|_| Ok(()));
    Arc::new(ReadCache::new(Arc::new(store), CacheTtlPolicy::default()))
}

struct Harness {
    vouchers: MockVoucherRepository,
    gate: MockAdmissionGate,
    ids: MockOrderIdAllocator,
    now: DateTime<Utc>,
}

impl Harness {
    fn new(now: DateTime<Utc>) -> Self {
        Self {
            vouchers: MockVoucherRepository::new(),
            gate: MockAdmissionGate::new(),
            ids: MockOrderIdAllocator::new(),
            now,
        }
    }

    fn with_voucher(mut self, voucher: Option<SeckillVoucher>) -> Self {
        self.vouchers
            .expect_find_seckill_voucher()
            .with(eq(VOUCHER))
            .returning(move |_| Ok(voucher.clone()));
        self
    }

    fn build(self) -> SeckillService {
        SeckillService::new(
            SeckillServicePorts {
                vouchers: Arc::new(self.vouchers),
                gate: Arc::new(self.gate),
                ids: Arc::new(self.ids),
            },
            cold_cache(),
            Arc::new(MutableClock::new(self.now)),
        )
    }
}

fn request() -> SeckillRequest {
    SeckillRequest {
        voucher_id: VOUCHER,
        user_id: USER,
    }
}

#[rstest]
#[tokio::test]
async fn admitted_claim_returns_allocated_order_id(now: DateTime<Utc>) {
    let mut harness = Harness::new(now).with_voucher(Some(open_voucher(now)));
    harness
        .ids
        .expect_next_id()
        .times(1)
        .returning(|| Ok(ORDER));
    harness
        .gate
        .expect_admit()
        .with(eq(AdmissionRequest {
            voucher_id: VOUCHER,
            user_id: USER,
            order_id: ORDER,
        }))
        .times(1)
        .returning(|_| Ok(AdmissionOutcome::Admitted));

    let order_id = harness.build().claim(request()).await.expect("admitted");

    assert_eq!(order_id, ORDER);
}

#[rstest]
#[case(AdmissionOutcome::OutOfStock, ErrorCode::OutOfStock)]
#[case(AdmissionOutcome::AlreadyClaimed, ErrorCode::AlreadyClaimed)]
#[tokio::test]
async fn rejections_map_to_error_codes(
    now: DateTime<Utc>,
    #[case] outcome: AdmissionOutcome,
    #[case] expected: ErrorCode,
) {
    let mut harness = Harness::new(now).with_voucher(Some(open_voucher(now)));
    harness.ids.expect_next_id().returning(|| Ok(ORDER));
    harness.gate.expect_admit().returning(move |_| Ok(outcome));

    let error = harness
        .build()
        .claim(request())
        .await
        .expect_err("rejected");

    assert_eq!(error.code(), expected);
}

#[rstest]
#[tokio::test]
async fn missing_stock_counter_is_primed_from_the_store(now: DateTime<Utc>) {
    let mut harness = Harness::new(now).with_voucher(Some(open_voucher(now)));
    harness.ids.expect_next_id().returning(|| Ok(ORDER));
    let attempts = AtomicUsize::new(0);
    harness.gate.expect_admit().times(2).returning(move |_| {
        Ok(match attempts.fetch_add(1, Ordering::SeqCst) {
            0 => AdmissionOutcome::NotStocked,
            _ => AdmissionOutcome::Admitted,
        })
    });
    harness
        .gate
        .expect_prime_stock()
        .with(eq(VOUCHER), eq(100))
        .times(1)
        .returning(|_, _| Ok(true));

    let order_id = harness.build().claim(request()).await.expect("admitted");

    assert_eq!(order_id, ORDER);
}

#[rstest]
#[tokio::test]
async fn unprimeable_stock_is_not_found(now: DateTime<Utc>) {
    let mut harness = Harness::new(now).with_voucher(Some(open_voucher(now)));
    harness.ids.expect_next_id().returning(|| Ok(ORDER));
    harness
        .gate
        .expect_admit()
        .times(2)
        .returning(|_| Ok(AdmissionOutcome::NotStocked));
    harness
        .gate
        .expect_prime_stock()
        .times(1)
        .returning(|_, _| Ok(false));

    let error = harness
        .build()
        .claim(request())
        .await
        .expect_err("no stock");

    assert_eq!(error.code(), ErrorCode::NotFound);
}

#[rstest]
#[tokio::test]
async fn unknown_voucher_is_not_found(now: DateTime<Utc>) {
    let mut harness = Harness::new(now).with_voucher(None);
    harness.ids.expect_next_id().never();
    harness.gate.expect_admit().never();

    let error = harness.build().claim(request()).await.expect_err("missing");

    assert_eq!(error.code(), ErrorCode::NotFound);
}

#[rstest]
#[case(Duration::hours(2))]
#[case(Duration::hours(-2))]
#[tokio::test]
async fn requests_outside_the_sale_window_are_invalid(now: DateTime<Utc>, #[case] shift: Duration) {
    let mut harness = Harness::new(now + shift).with_voucher(Some(open_voucher(now)));
    harness.ids.expect_next_id().never();
    harness.gate.expect_admit().never();

    let error = harness.build().claim(request()).await.expect_err("closed");

    assert_eq!(error.code(), ErrorCode::InvalidRequest);
}

#[rstest]
#[tokio::test]
async fn exhausted_allocator_is_service_unavailable(now: DateTime<Utc>) {
    let mut harness = Harness::new(now).with_voucher(Some(open_voucher(now)));
    harness
        .ids
        .expect_next_id()
        .returning(|| Err(IdAllocatorError::sequence_exhausted()));
    harness.gate.expect_admit().never();

    let error = harness
        .build()
        .claim(request())
        .await
        .expect_err("saturated");

    assert_eq!(error.code(), ErrorCode::ServiceUnavailable);
}

#[rstest]
#[tokio::test]
async fn gate_failure_is_service_unavailable(now: DateTime<Utc>) {
    let mut harness = Harness::new(now).with_voucher(Some(open_voucher(now)));
    harness.ids.expect_next_id().returning(|| Ok(ORDER));
    harness
        .gate
        .expect_admit()
        .returning(|_| Err(AdmissionGateError::unavailable("connection reset")));

    let error = harness.build().claim(request()).await.expect_err("outage");

    assert_eq!(error.code(), ErrorCode::ServiceUnavailable);
    assert!(!error.message().contains("connection reset"));
}

#[rstest]
#[tokio::test]
async fn voucher_store_outage_is_service_unavailable(now: DateTime<Utc>) {
    let mut harness = Harness::new(now);
    harness
        .vouchers
        .expect_find_seckill_voucher()
        .returning(|_| Err(VoucherRepositoryError::connection("pool timed out")));

    let error = harness.build().claim(request()).await.expect_err("outage");

    assert_eq!(error.code(), ErrorCode::ServiceUnavailable);
}

fn new_seckill_voucher(now: DateTime<Utc>) -> NewVoucher {
    NewVoucher {
        shop_id: ShopId::new(1),
        title: "Half price".to_owned(),
        sub_title: None,
        rules: None,
        pay_value: 50,
        actual_value: 100,
        kind: VoucherKind::Seckill,
        seckill: Some(SeckillTerms {
            stock: 100,
            begin_time: now,
            end_time: now + Duration::hours(1),
        }),
    }
}

#[rstest]
#[tokio::test]
async fn creating_a_seckill_voucher_primes_stock(now: DateTime<Utc>) {
    let mut harness = Harness::new(now);
    harness
        .vouchers
        .expect_create_voucher()
        .times(1)
        .returning(|_| Ok(VOUCHER));
    harness
        .gate
        .expect_prime_stock()
        .with(eq(VOUCHER), eq(100))
        .times(1)
        .returning(|_, _| Ok(true));

    let id = harness
        .build()
        .create_voucher(new_seckill_voucher(now))
        .await
        .expect("created");

    assert_eq!(id, VOUCHER);
}

#[rstest]
#[tokio::test]
async fn failed_priming_still_returns_the_committed_voucher(now: DateTime<Utc>) {
    let mut harness = Harness::new(now);
    harness
        .vouchers
        .expect_create_voucher()
        .times(1)
        .returning(|_| Ok(VOUCHER));
    harness
        .gate
        .expect_prime_stock()
        .times(1)
        .returning(|_, _| Err(AdmissionGateError::unavailable("connection reset")));

    let id = harness
        .build()
        .create_voucher(new_seckill_voucher(now))
        .await
        .expect("created despite priming failure");

    assert_eq!(id, VOUCHER);
}

#[rstest]
#[tokio::test]
async fn ordinary_vouchers_do_not_touch_the_gate(now: DateTime<Utc>) {
    let mut harness = Harness::new(now);
    harness
        .vouchers
        .expect_create_voucher()
        .returning(|_| Ok(VOUCHER));
    harness.gate.expect_prime_stock().never();
    let mut voucher = new_seckill_voucher(now);
    voucher.kind = VoucherKind::Ordinary;
    voucher.seckill = None;

    harness
        .build()
        .create_voucher(voucher)
        .await
        .expect("created");
}

#[rstest]
#[tokio::test]
async fn invalid_vouchers_are_rejected_before_persisting(now: DateTime<Utc>) {
    let mut harness = Harness::new(now);
    harness.vouchers.expect_create_voucher().never();
    let mut voucher = new_seckill_voucher(now);
    voucher.title = "  ".to_owned();

    let error = harness
        .build()
        .create_voucher(voucher)
        .await
        .expect_err("invalid");

    assert_eq!(error.code(), ErrorCode::InvalidRequest);
}

#[rstest]
#[tokio::test]
async fn seckill_voucher_reads_through_the_cache(now: DateTime<Utc>) {
    let harness = Harness::new(now).with_voucher(Some(open_voucher(now)));

    let voucher = harness
        .build()
        .seckill_voucher(VOUCHER)
        .await
        .expect("found");

    assert_eq!(voucher, open_voucher(now));
}
