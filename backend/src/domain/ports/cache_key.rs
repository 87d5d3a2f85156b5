//! Cache key type shared by the read cache and its store adapters.
use thiserror::Error;

use crate::domain::{ShopId, VoucherId};

const SHOP_PREFIX: &str = "cache:shop:";
const SECKILL_VOUCHER_PREFIX: &str = "cache:seckill:voucher:";
const SHOP_TYPE_LIST: &str = "cache:shopType:";

/// Key under which a cached payload is stored.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    /// Construct a cache key after validating that it is non-empty and trimmed.
    pub fn new(value: impl Into<String>) -> Result<Self, CacheKeyValidationError> {
        let raw = value.into();
        if raw.trim().is_empty() {
            return Err(CacheKeyValidationError::Empty);
        }
        if raw.trim() != raw {
            return Err(CacheKeyValidationError::ContainsWhitespace);
        }
        Ok(Self(raw))
    }

    /// Key for a cached shop record.
    pub fn shop(id: ShopId) -> Self {
        Self(format!("{SHOP_PREFIX}{id}"))
    }

    /// Key for cached seckill voucher metadata.
    pub fn seckill_voucher(id: VoucherId) -> Self {
        Self(format!("{SECKILL_VOUCHER_PREFIX}{id}"))
    }

    /// List key holding the shop-type catalogue.
    pub fn shop_types() -> Self {
        Self(SHOP_TYPE_LIST.to_owned())
    }

    /// Borrow the underlying key as a string slice.
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl AsRef<str> for CacheKey {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

/// Validation errors returned when constructing [`CacheKey`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CacheKeyValidationError {
    /// Key is empty after trimming whitespace.
    #[error("cache key must not be empty")]
    Empty,
    /// Key contains leading or trailing whitespace.
    #[error("cache key must not contain surrounding whitespace")]
    ContainsWhitespace,
}

#[cfg(test)]
mod tests {
    use super::{CacheKey, CacheKeyValidationError};
    use crate::domain::{ShopId, VoucherId};
    use rstest::rstest;

    #[rstest]
    #[case("")]
    #[case("   ")]
    fn cache_key_rejects_blank(#[case] value: &str) {
        let err = CacheKey::new(value).expect_err("blank keys rejected");
        assert_eq!(err, CacheKeyValidationError::Empty);
    }

    #[rstest]
    #[case(" leading")]
    #[case("trailing ")]
    fn cache_key_rejects_whitespace_padding(#[case] value: &str) {
        let err = CacheKey::new(value).expect_err("padded key rejected");
        assert_eq!(err, CacheKeyValidationError::ContainsWhitespace);
    }

    #[rstest]
    #[case(CacheKey::shop(ShopId::new(4)), "cache:shop:4")]
    #[case(
        CacheKey::seckill_voucher(VoucherId::new(8)),
        "cache:seckill:voucher:8"
    )]
    #[case(CacheKey::shop_types(), "cache:shopType:")]
    fn named_keys_use_namespaced_prefixes(#[case] key: CacheKey, #[case] expected: &str) {
        assert_eq!(key.as_str(), expected);
        assert_eq!(key.to_string(), expected);
    }
}
