use crate::domain::user::UserId;
use crate::error::ExchangeError;
use chrono::{DateTime, Duration, Timelike, Utc};
use std::fmt;

/// Daily service window in local wall-clock hours, half-open: orders are
/// accepted from `open:00` up to but not including `close:00`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpenHours {
    pub open: u32,
    pub close: u32,
}

impl OpenHours {
    pub fn new(open: u32, close: u32) -> Result<Self, ExchangeError> {
        if open >= close || close > 24 {
            return Err(ExchangeError::Validation(format!(
                "invalid service window {open}-{close}: expected open < close <= 24"
            )));
        }
        Ok(Self { open, close })
    }

    /// Parses the CLI form, e.g. `8-22`.
    pub fn parse(input: &str) -> Result<Self, ExchangeError> {
        let parts = input
            .split_once('-')
            .ok_or_else(|| ExchangeError::Validation(format!("invalid hours '{input}'")))?;
        let open = parts
            .0
            .trim()
            .parse()
            .map_err(|_| ExchangeError::Validation(format!("invalid hours '{input}'")))?;
        let close = parts
            .1
            .trim()
            .parse()
            .map_err(|_| ExchangeError::Validation(format!("invalid hours '{input}'")))?;
        Self::new(open, close)
    }

    pub fn contains(&self, hour: u32) -> bool {
        (self.open..self.close).contains(&hour)
    }
}

impl fmt::Display for OpenHours {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:00-{:02}:00", self.open, self.close)
    }
}

/// Runtime settings. The binary builds one from CLI flags; tests build them
/// directly.
#[derive(Debug, Clone)]
pub struct Config {
    /// The single operator account. Everything under the admin panel is
    /// gated on this id.
    pub admin: UserId,
    /// Channel confirmed orders are announced to, when set.
    pub channel: Option<String>,
    /// Service window; `None` accepts orders around the clock.
    pub hours: Option<OpenHours>,
    /// Offset applied to timestamps shown to customers, in whole hours.
    pub utc_offset_hours: i32,
    /// When set, confirming a sell order credits the currency reserve by
    /// the bought amount. Off by default: only buy orders touch reserves.
    pub credit_sell_reserve: bool,
}

impl Config {
    pub fn new(admin: UserId) -> Self {
        Self {
            admin,
            channel: None,
            hours: None,
            utc_offset_hours: 5,
            credit_sell_reserve: false,
        }
    }

    pub fn is_admin(&self, user: UserId) -> bool {
        user == self.admin
    }

    /// Whether new orders are currently accepted.
    pub fn open_now(&self) -> bool {
        self.open_at(Utc::now())
    }

    pub fn open_at(&self, at: DateTime<Utc>) -> bool {
        self.hours
            .is_none_or(|hours| hours.contains(self.to_local(at).hour()))
    }

    /// Local wall-clock time kept in a `Utc` carrier, as the customer-facing
    /// views expect it.
    pub fn to_local(&self, at: DateTime<Utc>) -> DateTime<Utc> {
        at + Duration::hours(i64::from(self.utc_offset_hours))
    }
}
