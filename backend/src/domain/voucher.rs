//! Voucher aggregates and the seckill sale window.
//!
//! Seckill metadata is cached as JSON by the read cache, so the serde
//! representation of [`SeckillVoucher`] is part of the cache contract.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{OrderId, ShopId, UserId, VoucherId};

/// Voucher kind as stored in the relational `type` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum VoucherKind {
    /// Ordinary voucher, purchasable without admission control.
    Ordinary,
    /// Limited-stock voucher sold through the admission gate.
    Seckill,
}

/// Raised when a numeric voucher kind is neither `0` nor `1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("unknown voucher kind {0}")]
pub struct UnknownVoucherKind(pub u8);

impl TryFrom<u8> for VoucherKind {
    type Error = UnknownVoucherKind;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Ordinary),
            1 => Ok(Self::Seckill),
            other => Err(UnknownVoucherKind(other)),
        }
    }
}

impl From<VoucherKind> for u8 {
    fn from(value: VoucherKind) -> Self {
        match value {
            VoucherKind::Ordinary => 0,
            VoucherKind::Seckill => 1,
        }
    }
}

/// Position of an instant relative to a seckill sale window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaleWindow {
    /// The sale has not opened yet.
    NotStarted,
    /// The sale is open; admission may proceed.
    Open,
    /// The sale has closed.
    Ended,
}

/// Seckill terms attached to a voucher.
///
/// `stock` is the authoritative counter owned by the relational store. It is
/// never negative.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeckillVoucher {
    /// Voucher these terms belong to.
    pub voucher_id: VoucherId,
    /// Remaining stock.
    pub stock: i32,
    /// First instant claims are accepted.
    pub begin_time: DateTime<Utc>,
    /// Last instant claims are accepted.
    pub end_time: DateTime<Utc>,
}

impl SeckillVoucher {
    /// Classify `now` against the inclusive `[begin_time, end_time]` window.
    ///
    /// # Examples
    /// ```
    /// use chrono::{Duration, Utc};
    /// use seckill::domain::{SaleWindow, SeckillVoucher, VoucherId};
    ///
    /// let now = Utc::now();
    /// let voucher = SeckillVoucher {
    ///     voucher_id: VoucherId::new(1),
    ///     stock: 10,
    ///     begin_time: now - Duration::hours(1),
    ///     end_time: now + Duration::hours(1),
    /// };
    /// assert_eq!(voucher.sale_window(now), SaleWindow::Open);
    /// ```
    pub fn sale_window(&self, now: DateTime<Utc>) -> SaleWindow {
        if now < self.begin_time {
            SaleWindow::NotStarted
        } else if now > self.end_time {
            SaleWindow::Ended
        } else {
            SaleWindow::Open
        }
    }
}

/// Voucher record as stored in the relational catalogue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Voucher {
    /// Store-assigned identifier.
    pub id: VoucherId,
    /// Shop issuing the voucher.
    pub shop_id: ShopId,
    /// Headline shown to buyers.
    pub title: String,
    /// Secondary line.
    pub sub_title: Option<String>,
    /// Redemption rules as free text.
    pub rules: Option<String>,
    /// Price paid, in cents.
    pub pay_value: i64,
    /// Face value, in cents.
    pub actual_value: i64,
    /// Ordinary or seckill.
    pub kind: VoucherKind,
}

/// Seckill terms supplied when creating a seckill voucher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeckillTerms {
    /// Units on sale.
    pub stock: i32,
    /// Sale opens.
    pub begin_time: DateTime<Utc>,
    /// Sale closes.
    pub end_time: DateTime<Utc>,
}

/// Voucher creation request validated by [`NewVoucher::validate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewVoucher {
    /// Shop issuing the voucher.
    pub shop_id: ShopId,
    /// Headline shown to buyers.
    pub title: String,
    /// Secondary line.
    pub sub_title: Option<String>,
    /// Redemption rules as free text.
    pub rules: Option<String>,
    /// Price paid, in cents.
    pub pay_value: i64,
    /// Face value, in cents.
    pub actual_value: i64,
    /// Ordinary or seckill.
    pub kind: VoucherKind,
    /// Sale terms; required for seckill vouchers.
    pub seckill: Option<SeckillTerms>,
}

/// Validation failures for [`NewVoucher`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VoucherValidationError {
    #[error("voucher title must not be empty")]
    EmptyTitle,
    #[error("voucher values must not be negative")]
    NegativeValue,
    #[error("seckill vouchers require stock and a sale window")]
    MissingSeckillTerms,
    #[error("ordinary vouchers must not carry seckill terms")]
    UnexpectedSeckillTerms,
    #[error("seckill stock must not be negative")]
    NegativeStock,
    #[error("seckill begin time must precede its end time")]
    InvertedWindow,
}

impl NewVoucher {
    /// Check the structural invariants of the request.
    pub fn validate(&self) -> Result<(), VoucherValidationError> {
        if self.title.trim().is_empty() {
            return Err(VoucherValidationError::EmptyTitle);
        }
        if self.pay_value < 0 || self.actual_value < 0 {
            return Err(VoucherValidationError::NegativeValue);
        }
        match (self.kind, &self.seckill) {
            (VoucherKind::Seckill, None) => Err(VoucherValidationError::MissingSeckillTerms),
            (VoucherKind::Ordinary, Some(_)) => Err(VoucherValidationError::UnexpectedSeckillTerms),
            (VoucherKind::Seckill, Some(terms)) if terms.stock < 0 => {
                Err(VoucherValidationError::NegativeStock)
            }
            (VoucherKind::Seckill, Some(terms)) if terms.begin_time >= terms.end_time => {
                Err(VoucherValidationError::InvertedWindow)
            }
            _ => Ok(()),
        }
    }
}

/// Order created when a fulfillment message is materialized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VoucherOrder {
    /// Identifier allocated at admission.
    pub id: OrderId,
    /// Voucher the order redeems.
    pub voucher_id: VoucherId,
    /// Buyer holding the claim.
    pub user_id: UserId,
}
