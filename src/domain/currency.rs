use crate::domain::order::OrderSide;
use crate::error::ExchangeError;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Uppercase currency code, the unique key of the currency collection.
///
/// Creation normalizes (trim + uppercase). Selection steps in dialogs do
/// *not* normalize: the customer picks from an enumerated keyboard, so the
/// match against existing codes is exact and case-sensitive.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CurrencyCode(String);

impl CurrencyCode {
    pub fn new(input: &str) -> Result<Self, ExchangeError> {
        let code = input.trim().to_uppercase();
        if code.is_empty() {
            return Err(ExchangeError::Validation(
                "currency code cannot be empty".to_string(),
            ));
        }
        Ok(Self(code))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CurrencyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One tradable currency: operator-set rates plus the settlement cards
/// shown to customers. The code lives as the collection key, not in the
/// record, matching the persisted layout.
///
/// The rate and card fields are named from the customer's point of view:
/// `buy_rate`/`buy_card` apply when the customer buys the currency,
/// `sell_rate`/`sell_card` when they sell it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Currency {
    pub name: String,
    pub buy_rate: Decimal,
    pub sell_rate: Decimal,
    pub buy_card: String,
    pub sell_card: String,
}

impl Currency {
    /// The rate applied to an order side: buy orders settle at `buy_rate`,
    /// sell orders at `sell_rate`. Snapshots and the rate boards use the
    /// same mapping so customers are charged exactly what was listed.
    pub fn rate_for(&self, side: OrderSide) -> Decimal {
        match side {
            OrderSide::Buy => self.buy_rate,
            OrderSide::Sell => self.sell_rate,
        }
    }

    /// The settlement card shown for an order side.
    pub fn card_for(&self, side: OrderSide) -> &str {
        match side {
            OrderSide::Buy => &self.buy_card,
            OrderSide::Sell => &self.sell_card,
        }
    }
}

/// The five admin-editable currency fields, labeled as the edit keyboard
/// shows them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CurrencyField {
    Name,
    BuyRate,
    SellRate,
    BuyCard,
    SellCard,
}

impl CurrencyField {
    pub const ALL: [CurrencyField; 5] = [
        CurrencyField::Name,
        CurrencyField::BuyRate,
        CurrencyField::SellRate,
        CurrencyField::BuyCard,
        CurrencyField::SellCard,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            CurrencyField::Name => "name",
            CurrencyField::BuyRate => "buy_rate",
            CurrencyField::SellRate => "sell_rate",
            CurrencyField::BuyCard => "buy_card",
            CurrencyField::SellCard => "sell_card",
        }
    }

    pub fn parse_label(input: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.label() == input.trim())
    }

    pub fn is_rate(&self) -> bool {
        matches!(self, CurrencyField::BuyRate | CurrencyField::SellRate)
    }
}

/// A validated single-field replacement produced by the edit dialog.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldChange {
    Name(String),
    BuyRate(Decimal),
    SellRate(Decimal),
    BuyCard(String),
    SellCard(String),
}

impl FieldChange {
    /// Validates raw input for a field: rates get the same positive-number
    /// validation as currency creation, text fields must be non-empty.
    pub fn parse(field: CurrencyField, input: &str) -> Result<Self, ExchangeError> {
        use crate::domain::money::Amount;

        let text = || -> Result<String, ExchangeError> {
            let value = input.trim();
            if value.is_empty() {
                Err(ExchangeError::Validation("value cannot be empty".to_string()))
            } else {
                Ok(value.to_string())
            }
        };

        Ok(match field {
            CurrencyField::Name => FieldChange::Name(text()?),
            CurrencyField::BuyRate => FieldChange::BuyRate(Amount::parse(input)?.value()),
            CurrencyField::SellRate => FieldChange::SellRate(Amount::parse(input)?.value()),
            CurrencyField::BuyCard => FieldChange::BuyCard(text()?),
            CurrencyField::SellCard => FieldChange::SellCard(text()?),
        })
    }

    pub fn field(&self) -> CurrencyField {
        match self {
            FieldChange::Name(_) => CurrencyField::Name,
            FieldChange::BuyRate(_) => CurrencyField::BuyRate,
            FieldChange::SellRate(_) => CurrencyField::SellRate,
            FieldChange::BuyCard(_) => CurrencyField::BuyCard,
            FieldChange::SellCard(_) => CurrencyField::SellCard,
        }
    }

    pub fn apply(self, currency: &mut Currency) {
        match self {
            FieldChange::Name(v) => currency.name = v,
            FieldChange::BuyRate(v) => currency.buy_rate = v,
            FieldChange::SellRate(v) => currency.sell_rate = v,
            FieldChange::BuyCard(v) => currency.buy_card = v,
            FieldChange::SellCard(v) => currency.sell_card = v,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn usdt() -> Currency {
        Currency {
            name: "Tether".to_string(),
            buy_rate: dec!(12600),
            sell_rate: dec!(12800),
            buy_card: "8600 1111".to_string(),
            sell_card: "8600 2222".to_string(),
        }
    }

    #[test]
    fn test_code_normalized_at_creation() {
        assert_eq!(CurrencyCode::new(" usdt ").unwrap().as_str(), "USDT");
        assert!(CurrencyCode::new("  ").is_err());
    }

    #[test]
    fn test_rate_and_card_follow_order_side() {
        let currency = usdt();
        assert_eq!(currency.rate_for(OrderSide::Buy), dec!(12600));
        assert_eq!(currency.rate_for(OrderSide::Sell), dec!(12800));
        assert_eq!(currency.card_for(OrderSide::Buy), "8600 1111");
        assert_eq!(currency.card_for(OrderSide::Sell), "8600 2222");
    }

    #[test]
    fn test_field_labels_round_trip() {
        for field in CurrencyField::ALL {
            assert_eq!(CurrencyField::parse_label(field.label()), Some(field));
        }
        assert_eq!(CurrencyField::parse_label("rate"), None);
    }

    #[test]
    fn test_field_change_validation() {
        assert!(matches!(
            FieldChange::parse(CurrencyField::BuyRate, "abc"),
            Err(ExchangeError::Validation(_))
        ));
        assert!(matches!(
            FieldChange::parse(CurrencyField::SellRate, "-5"),
            Err(ExchangeError::Validation(_))
        ));
        assert!(matches!(
            FieldChange::parse(CurrencyField::Name, "   "),
            Err(ExchangeError::Validation(_))
        ));

        let mut currency = usdt();
        FieldChange::parse(CurrencyField::BuyRate, "12700,5")
            .unwrap()
            .apply(&mut currency);
        assert_eq!(currency.buy_rate, dec!(12700.5));
    }
}
