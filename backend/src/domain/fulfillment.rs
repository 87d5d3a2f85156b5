//! Fulfillment stream message format.
//!
//! Every admitted order is appended to the order stream as a flat map of
//! string fields. The same layout is written by the admission script, by the
//! materializer when it requeues a failed message, and (with extra fields) to
//! the dead-letter stream.

use std::collections::BTreeMap;

use chrono::{DateTime, SecondsFormat, Utc};

use super::{OrderId, UserId, VoucherId, VoucherOrder};

/// Stream receiving admitted orders.
pub const ORDER_STREAM: &str = "stream:orders";
/// Stream receiving messages that exhausted their retries or failed to decode.
pub const DEAD_LETTER_STREAM: &str = "stream:orders:dead";
/// Consumer group shared by every materializer.
pub const ORDER_GROUP: &str = "group:orders";

/// Stream field holding the allocated order id.
pub const FIELD_ORDER_ID: &str = "order_id";
/// Stream field holding the voucher id.
pub const FIELD_VOUCHER_ID: &str = "voucher_id";
/// Stream field holding the buyer id.
pub const FIELD_USER_ID: &str = "user_id";
/// Stream field counting failed attempts; absent on the first delivery.
pub const FIELD_RETRY_COUNT: &str = "retry_count";

/// Flat field map carried by one stream entry.
pub type StreamFields = BTreeMap<String, String>;

/// Decoding failures for fulfillment stream entries.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FulfillmentMessageError {
    /// A required field is absent.
    #[error("missing field `{field}`")]
    MissingField { field: &'static str },
    /// A numeric field does not parse.
    #[error("field `{field}` is not an unsigned integer: {value:?}")]
    InvalidNumber { field: &'static str, value: String },
}

/// Immutable order request travelling through the fulfillment stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FulfillmentMessage {
    /// Identifier allocated at admission; the idempotency key.
    pub order_id: OrderId,
    /// Voucher being redeemed.
    pub voucher_id: VoucherId,
    /// Buyer holding the claim.
    pub user_id: UserId,
    /// Failed attempts so far.
    pub retry_count: u32,
}

impl FulfillmentMessage {
    /// Build the first delivery of an admitted order.
    pub fn admitted(order_id: OrderId, voucher_id: VoucherId, user_id: UserId) -> Self {
        Self {
            order_id,
            voucher_id,
            user_id,
            retry_count: 0,
        }
    }

    /// Copy of this message with the retry counter incremented.
    pub fn next_attempt(&self) -> Self {
        Self {
            retry_count: self.retry_count.saturating_add(1),
            ..*self
        }
    }

    /// The order row this message materializes into.
    pub fn order(&self) -> VoucherOrder {
        VoucherOrder {
            id: self.order_id,
            voucher_id: self.voucher_id,
            user_id: self.user_id,
        }
    }

    /// Encode as stream fields.
    pub fn to_fields(&self) -> StreamFields {
        StreamFields::from([
            (FIELD_ORDER_ID.to_owned(), self.order_id.to_string()),
            (FIELD_VOUCHER_ID.to_owned(), self.voucher_id.to_string()),
            (FIELD_USER_ID.to_owned(), self.user_id.to_string()),
            (FIELD_RETRY_COUNT.to_owned(), self.retry_count.to_string()),
        ])
    }

    /// Decode from stream fields. Unknown fields are ignored.
    ///
    /// # Examples
    /// ```
    /// use seckill::domain::{FulfillmentMessage, OrderId, UserId, VoucherId};
    ///
    /// let message = FulfillmentMessage::admitted(OrderId::new(1), VoucherId::new(2), UserId::new(3));
    /// let decoded = FulfillmentMessage::from_fields(&message.to_fields()).expect("decodes");
    /// assert_eq!(decoded, message);
    /// ```
    pub fn from_fields(fields: &StreamFields) -> Result<Self, FulfillmentMessageError> {
        Ok(Self {
            order_id: OrderId::new(parse_u64(fields, FIELD_ORDER_ID)?),
            voucher_id: VoucherId::new(parse_u64(fields, FIELD_VOUCHER_ID)?),
            user_id: UserId::new(parse_u64(fields, FIELD_USER_ID)?),
            retry_count: match fields.get(FIELD_RETRY_COUNT) {
                // Entries written before the counter existed count as first attempts.
                None => 0,
                Some(raw) => raw.trim().parse::<u32>().map_err(|_| {
                    FulfillmentMessageError::InvalidNumber {
                        field: FIELD_RETRY_COUNT,
                        value: raw.clone(),
                    }
                })?,
            },
        })
    }
}

fn parse_u64(fields: &StreamFields, field: &'static str) -> Result<u64, FulfillmentMessageError> {
    let raw = fields
        .get(field)
        .ok_or(FulfillmentMessageError::MissingField { field })?;
    raw.trim()
        .parse::<u64>()
        .map_err(|_| FulfillmentMessageError::InvalidNumber {
            field,
            value: raw.clone(),
        })
}

/// Operator-facing annotation attached to a dead-lettered message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeadLetterEntry {
    /// Stream id of the delivery that failed.
    pub original_id: String,
    /// Consumer that gave up on it.
    pub consumer: String,
    /// Last failure, as displayed.
    pub error: String,
    /// When the message was dead-lettered.
    pub failed_at: DateTime<Utc>,
}

impl DeadLetterEntry {
    /// Merge the annotation into the original message fields.
    ///
    /// Annotation fields take precedence over any same-named original field.
    pub fn into_fields(self, original: &StreamFields) -> StreamFields {
        let mut fields = original.clone();
        fields.insert("original_id".to_owned(), self.original_id);
        fields.insert("consumer".to_owned(), self.consumer);
        fields.insert("error".to_owned(), self.error);
        fields.insert(
            "failed_at".to_owned(),
            self.failed_at.to_rfc3339_opts(SecondsFormat::Millis, true),
        );
        fields
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rstest::{fixture, rstest};

    #[fixture]
    fn message() -> FulfillmentMessage {
        FulfillmentMessage::admitted(OrderId::new(11), VoucherId::new(22), UserId::new(33))
    }

    #[rstest]
    fn fields_use_snake_case_names(message: FulfillmentMessage) {
        let fields = message.to_fields();
        assert_eq!(fields.get("order_id").map(String::as_str), Some("11"));
        assert_eq!(fields.get("voucher_id").map(String::as_str), Some("22"));
        assert_eq!(fields.get("user_id").map(String::as_str), Some("33"));
        assert_eq!(fields.get("retry_count").map(String::as_str), Some("0"));
    }

    #[rstest]
    fn next_attempt_only_bumps_the_counter(message: FulfillmentMessage) {
        let next = message.next_attempt().next_attempt();
        assert_eq!(next.retry_count, 2);
        assert_eq!(next.order(), message.order());
    }

    #[rstest]
    fn missing_retry_count_defaults_to_zero(message: FulfillmentMessage) {
        let mut fields = message.to_fields();
        fields.remove(FIELD_RETRY_COUNT);
        let decoded = FulfillmentMessage::from_fields(&fields).expect("decodes");
        assert_eq!(decoded.retry_count, 0);
    }

    #[rstest]
    fn missing_identifier_is_reported(message: FulfillmentMessage) {
        let mut fields = message.to_fields();
        fields.remove(FIELD_USER_ID);
        assert_eq!(
            FulfillmentMessage::from_fields(&fields),
            Err(FulfillmentMessageError::MissingField {
                field: FIELD_USER_ID
            })
        );
    }

    #[rstest]
    #[case(FIELD_ORDER_ID, "abc")]
    #[case(FIELD_VOUCHER_ID, "-4")]
    #[case(FIELD_RETRY_COUNT, "many")]
    fn non_numeric_fields_are_rejected(
        message: FulfillmentMessage,
        #[case] field: &'static str,
        #[case] value: &str,
    ) {
        let mut fields = message.to_fields();
        fields.insert(field.to_owned(), value.to_owned());
        assert!(matches!(
            FulfillmentMessage::from_fields(&fields),
            Err(FulfillmentMessageError::InvalidNumber { field: f, .. }) if f == field
        ));
    }

    #[rstest]
    fn dead_letter_fields_keep_original_payload(message: FulfillmentMessage) {
        let failed_at = Utc
            .with_ymd_and_hms(2026, 3, 1, 12, 0, 0)
            .single()
            .expect("valid timestamp");
        let entry = DeadLetterEntry {
            original_id: "1-0".to_owned(),
            consumer: "materializer-1".to_owned(),
            error: "stock exhausted".to_owned(),
            failed_at,
        };

        let fields = entry.into_fields(&message.to_fields());

        assert_eq!(fields.get("order_id").map(String::as_str), Some("11"));
        assert_eq!(fields.get("original_id").map(String::as_str), Some("1-0"));
        assert_eq!(
            fields.get("failed_at").map(String::as_str),
            Some("2026-03-01T12:00:00.000Z")
        );
    }
}
