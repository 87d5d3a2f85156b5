//! Strongly typed identifiers for vouchers, shops, users, and orders.
//!
//! All identifiers are unsigned 64-bit values on the wire and in the
//! in-memory store. The relational schema stores them as `BIGINT`, so the
//! persistence adapter converts through [`i64`] and rejects values above
//! [`i64::MAX`].

use std::fmt;
use std::num::ParseIntError;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(u64);

        impl $name {
            /// Wrap a raw identifier.
            pub const fn new(value: u64) -> Self {
                Self(value)
            }

            /// Return the raw identifier.
            pub const fn get(self) -> u64 {
                self.0
            }
        }

        impl From<u64> for $name {
            fn from(value: u64) -> Self {
                Self(value)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = ParseIntError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                s.trim().parse::<u64>().map(Self)
            }
        }
    };
}

define_id! {
    /// Identifier of a voucher (ordinary or seckill).
    VoucherId
}

define_id! {
    /// Identifier of a buyer.
    UserId
}

define_id! {
    /// Identifier of a voucher order, allocated before the order row exists.
    OrderId
}

define_id! {
    /// Identifier of a shop.
    ShopId
}
