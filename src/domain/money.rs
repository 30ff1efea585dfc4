use crate::error::ExchangeError;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A strictly positive quantity entered during a dialog (order amounts,
/// exchange rates).
///
/// Customers type amounts with either `.` or `,` as the fractional
/// separator, so [`Amount::parse`] normalizes before parsing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Amount(Decimal);

impl Amount {
    pub fn new(value: Decimal) -> Result<Self, ExchangeError> {
        if value > Decimal::ZERO {
            Ok(Self(value))
        } else {
            Err(ExchangeError::Validation(
                "amount must be positive".to_string(),
            ))
        }
    }

    /// Parses user input such as `"12.5"` or `"12,5"`.
    pub fn parse(input: &str) -> Result<Self, ExchangeError> {
        let value = parse_decimal(input)?;
        Self::new(value)
    }

    pub fn value(&self) -> Decimal {
        self.0
    }
}

impl TryFrom<Decimal> for Amount {
    type Error = ExchangeError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Amount> for Decimal {
    fn from(amount: Amount) -> Self {
        amount.0
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// A non-negative stock: the reserve held for one currency, or the card
/// balance. Admin updates are absolute overwrites, never deltas.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
pub struct Balance(Decimal);

impl Balance {
    pub const ZERO: Self = Self(Decimal::ZERO);

    pub fn new(value: Decimal) -> Result<Self, ExchangeError> {
        if value >= Decimal::ZERO {
            Ok(Self(value))
        } else {
            Err(ExchangeError::Validation(
                "balance cannot be negative".to_string(),
            ))
        }
    }

    /// Parses admin input; zero is allowed here, unlike [`Amount::parse`].
    pub fn parse(input: &str) -> Result<Self, ExchangeError> {
        let value = parse_decimal(input)?;
        Self::new(value)
    }

    pub fn value(&self) -> Decimal {
        self.0
    }

    pub fn covers(&self, amount: Amount) -> bool {
        self.0 >= amount.value()
    }

    /// The stock less `amount`, clamped at zero. The reserve invariant is
    /// "never negative", so an over-debit empties it instead of
    /// underflowing.
    #[must_use]
    pub fn debit_clamped(self, amount: Amount) -> Self {
        Self((self.0 - amount.value()).max(Decimal::ZERO))
    }

    #[must_use]
    pub fn credit(self, amount: Amount) -> Self {
        Self(self.0 + amount.value())
    }
}

impl fmt::Display for Balance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

fn parse_decimal(input: &str) -> Result<Decimal, ExchangeError> {
    let normalized = input.trim().replace(',', ".");
    normalized
        .parse::<Decimal>()
        .map_err(|_| ExchangeError::Validation(format!("not a number: {input}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_amount_accepts_both_separators() {
        assert_eq!(Amount::parse("12.5").unwrap().value(), dec!(12.5));
        assert_eq!(Amount::parse("12,5").unwrap().value(), dec!(12.5));
        assert_eq!(Amount::parse(" 30 ").unwrap().value(), dec!(30));
    }

    #[test]
    fn test_amount_rejects_garbage_and_non_positive() {
        assert!(matches!(
            Amount::parse("abc"),
            Err(ExchangeError::Validation(_))
        ));
        assert!(matches!(
            Amount::parse("0"),
            Err(ExchangeError::Validation(_))
        ));
        assert!(matches!(
            Amount::parse("-3"),
            Err(ExchangeError::Validation(_))
        ));
        assert!(matches!(Amount::parse(""), Err(ExchangeError::Validation(_))));
    }

    #[test]
    fn test_balance_allows_zero_but_not_negative() {
        assert_eq!(Balance::parse("0").unwrap(), Balance::ZERO);
        assert!(matches!(
            Balance::parse("-1"),
            Err(ExchangeError::Validation(_))
        ));
    }

    #[test]
    fn test_debit_clamps_at_zero() {
        let reserve = Balance::new(dec!(5)).unwrap();
        assert_eq!(
            reserve.debit_clamped(Amount::new(dec!(10)).unwrap()),
            Balance::ZERO
        );

        let reserve = Balance::new(dec!(100)).unwrap();
        assert_eq!(
            reserve.debit_clamped(Amount::new(dec!(30)).unwrap()).value(),
            dec!(70)
        );
    }

    #[test]
    fn test_covers() {
        let reserve = Balance::new(dec!(5)).unwrap();
        assert!(reserve.covers(Amount::new(dec!(5)).unwrap()));
        assert!(!reserve.covers(Amount::new(dec!(5.0001)).unwrap()));
    }

    #[test]
    fn test_credit() {
        let reserve = Balance::ZERO.credit(Amount::new(dec!(2.5)).unwrap());
        assert_eq!(reserve.value(), dec!(2.5));
    }
}
