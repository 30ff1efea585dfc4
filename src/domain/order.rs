use crate::domain::media::MediaRef;
use crate::domain::money::Amount;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Millisecond-epoch order id, kept as a string because it keys the order
/// collection and rides through callback payloads verbatim.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct OrderId(String);

impl OrderId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderSide {
    Buy,
    Sell,
}

impl fmt::Display for OrderSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderSide::Buy => f.write_str("buy"),
            OrderSide::Sell => f.write_str("sell"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    WaitingAdmin,
    Confirmed,
    Rejected,
}

impl OrderStatus {
    /// Confirmed and rejected orders never change again.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, OrderStatus::WaitingAdmin)
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderStatus::WaitingAdmin => f.write_str("waiting_admin"),
            OrderStatus::Confirmed => f.write_str("confirmed"),
            OrderStatus::Rejected => f.write_str("rejected"),
        }
    }
}

/// An operator verdict on a pending order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Confirm,
    Reject,
}

impl Decision {
    pub fn parse(token: &str) -> Option<Self> {
        match token {
            "confirm" => Some(Decision::Confirm),
            "reject" => Some(Decision::Reject),
            _ => None,
        }
    }

    pub fn status(&self) -> OrderStatus {
        match self {
            Decision::Confirm => OrderStatus::Confirmed,
            Decision::Reject => OrderStatus::Rejected,
        }
    }
}

/// What the customer has assembled by the end of the dialog: everything an
/// order needs except the rate snapshot, the id and the receipt.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderDraft {
    pub side: OrderSide,
    pub currency: String,
    pub amount: Amount,
    pub wallet: String,
}

/// A persisted exchange order. `rate` is the snapshot taken at submission;
/// later rate edits never touch existing orders.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub user_id: i64,
    #[serde(rename = "type")]
    pub side: OrderSide,
    pub currency: String,
    pub amount: Amount,
    pub wallet: String,
    pub rate: Decimal,
    pub status: OrderStatus,
    #[serde(with = "chrono::serde::ts_seconds")]
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proof: Option<MediaRef>,
}

impl Order {
    /// Settlement total in the quote currency.
    pub fn total(&self) -> Decimal {
        self.amount.value() * self.rate
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::media::{MediaKind, MediaRef};
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    fn sample() -> Order {
        Order {
            id: OrderId::new("1756100000000"),
            user_id: 42,
            side: OrderSide::Buy,
            currency: "USDT".to_string(),
            amount: Amount::parse("30").unwrap(),
            wallet: "TAbc123".to_string(),
            rate: dec!(12600),
            status: OrderStatus::WaitingAdmin,
            created_at: Utc.timestamp_opt(1_756_100_000, 0).unwrap(),
            proof: Some(MediaRef::new(MediaKind::Photo, "file-1")),
        }
    }

    #[test]
    fn test_record_layout_uses_type_and_epoch_seconds() {
        let value = serde_json::to_value(sample()).unwrap();
        assert_eq!(value["type"], "buy");
        assert_eq!(value["status"], "waiting_admin");
        assert_eq!(value["created_at"], 1_756_100_000);
        assert_eq!(value["amount"], "30");
        assert_eq!(value["proof"]["kind"], "photo");

        let back: Order = serde_json::from_value(value).unwrap();
        assert_eq!(back, sample());
    }

    #[test]
    fn test_proof_is_optional_in_stored_records() {
        let mut order = sample();
        order.proof = None;
        let value = serde_json::to_value(&order).unwrap();
        assert!(value.get("proof").is_none());

        let back: Order = serde_json::from_value(value).unwrap();
        assert_eq!(back.proof, None);
    }

    #[test]
    fn test_terminal_statuses() {
        assert!(!OrderStatus::WaitingAdmin.is_terminal());
        assert!(OrderStatus::Confirmed.is_terminal());
        assert!(OrderStatus::Rejected.is_terminal());
    }

    #[test]
    fn test_decision_tokens_and_statuses() {
        assert_eq!(Decision::parse("confirm"), Some(Decision::Confirm));
        assert_eq!(Decision::parse("reject"), Some(Decision::Reject));
        assert_eq!(Decision::parse("approve"), None);
        assert_eq!(Decision::Confirm.status(), OrderStatus::Confirmed);
        assert_eq!(Decision::Reject.status(), OrderStatus::Rejected);
    }

    #[test]
    fn test_total_is_amount_times_rate() {
        assert_eq!(sample().total(), dec!(378000));
    }
}
