//! Message text builders. Everything user-visible that is more than a
//! one-line prompt is assembled here so the transition table stays legible
//! and tests can assert on one source of wording.

use crate::config::OpenHours;
use crate::domain::currency::Currency;
use crate::domain::money::{Amount, Balance};
use crate::domain::order::{Order, OrderSide, OrderStatus};
use crate::domain::ports::{CurrencyMap, OrderMap, ReserveMap};
use crate::domain::user::User;
use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use std::fmt::Write;

/// Groups the integer digits with thin spaces: `12600` -> `12 600`.
pub fn group_thousands(value: Decimal) -> String {
    let raw = value.normalize().to_string();
    let (int_part, frac_part) = match raw.split_once('.') {
        Some((int_part, frac_part)) => (int_part, Some(frac_part)),
        None => (raw.as_str(), None),
    };
    let (sign, digits) = match int_part.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", int_part),
    };
    let mut grouped = String::new();
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(' ');
        }
        grouped.push(ch);
    }
    match frac_part {
        Some(frac) => format!("{sign}{grouped}.{frac}"),
        None => format!("{sign}{grouped}"),
    }
}

fn local_stamp(at: DateTime<Utc>, offset_hours: i32, with_seconds: bool) -> String {
    let shifted = at + Duration::hours(i64::from(offset_hours));
    let fmt = if with_seconds {
        "%Y-%m-%d %H:%M:%S"
    } else {
        "%Y-%m-%d %H:%M"
    };
    shifted.format(fmt).to_string()
}

fn status_label(status: OrderStatus) -> &'static str {
    match status {
        OrderStatus::WaitingAdmin => "waiting for operator",
        OrderStatus::Confirmed => "confirmed",
        OrderStatus::Rejected => "rejected",
    }
}

fn side_verb(side: OrderSide) -> &'static str {
    match side {
        OrderSide::Buy => "bought",
        OrderSide::Sell => "sold",
    }
}

pub fn greeting(name: &str) -> String {
    format!("Hello, {name}!")
}

/// Rate board for one side: buy board lists buy rates, sell board sell
/// rates, so a customer sees exactly the rate an order would snapshot.
pub fn rate_board(side: OrderSide, currencies: &CurrencyMap) -> String {
    if currencies.is_empty() {
        return "No currencies available yet.".to_string();
    }
    let mut text = match side {
        OrderSide::Buy => "Buy rates (you buy from us):\n".to_string(),
        OrderSide::Sell => "Sell rates (you sell to us):\n".to_string(),
    };
    for (code, currency) in currencies {
        let _ = writeln!(
            text,
            "{code} - {}: {} UZS",
            currency.name,
            group_thousands(currency.rate_for(side))
        );
    }
    text.trim_end().to_string()
}

pub fn working_hours(hours: Option<OpenHours>) -> String {
    match hours {
        Some(window) => format!(
            "Working hours: {window} (local time).\nOrders outside this window are not accepted."
        ),
        None => "We accept orders around the clock.".to_string(),
    }
}

pub fn closed_now(hours: OpenHours) -> String {
    format!("We are closed right now. Working hours: {hours}.")
}

pub fn reserves_board(reserves: &ReserveMap, card_balance: Balance) -> String {
    let mut text = "Crypto reserves:\n".to_string();
    if reserves.is_empty() {
        text.push_str("- none yet\n");
    } else {
        for (code, balance) in reserves {
            let _ = writeln!(text, "- {code}: {}", group_thousands(balance.value()));
        }
    }
    let _ = write!(
        text,
        "\nCard balance:\n- UZS: {}",
        group_thousands(card_balance.value())
    );
    text
}

/// Admin-facing full currency listing.
pub fn currency_list(currencies: &CurrencyMap) -> String {
    if currencies.is_empty() {
        return "No currencies available yet.".to_string();
    }
    let mut text = "Currencies:\n".to_string();
    for (code, currency) in currencies {
        let _ = writeln!(
            text,
            "{code} - {}\n  buy rate: {}\n  sell rate: {}\n  buy card: {}\n  sell card: {}",
            currency.name,
            group_thousands(currency.buy_rate),
            group_thousands(currency.sell_rate),
            currency.buy_card,
            currency.sell_card,
        );
    }
    text.trim_end().to_string()
}

/// The customer's ten most recent orders, newest first. Ids whose order
/// record has gone missing are skipped silently.
pub fn order_history(user: &User, orders: &OrderMap, offset_hours: i32) -> String {
    let recent: Vec<&Order> = user
        .orders
        .iter()
        .rev()
        .filter_map(|id| orders.get(id.as_str()))
        .take(10)
        .collect();
    if recent.is_empty() {
        return "You have no orders yet.".to_string();
    }
    let mut text = "Your recent orders:\n".to_string();
    for order in recent {
        let _ = writeln!(
            text,
            "id: {}\nside: {}\ncurrency: {}\namount: {}\nstatus: {}\ncreated: {}\n----------------",
            order.id,
            order.side,
            order.currency,
            order.amount,
            status_label(order.status),
            local_stamp(order.created_at, offset_hours, true),
        );
    }
    text.trim_end().to_string()
}

/// Settlement instructions shown after the wallet step.
pub fn payment_details(code: &str, currency: &Currency, side: OrderSide, amount: Amount) -> String {
    let rate = currency.rate_for(side);
    let total = (amount.value() * rate).round_dp(2);
    format!(
        "Payment details (press '{}' once you have paid to the card):\n\
         Card: {}\n\
         Currency: {code}\n\
         Amount: {amount}\n\
         Rate: {}\n\
         Total: {} UZS",
        super::menu::SEND_RECEIPT,
        currency.card_for(side),
        group_thousands(rate),
        group_thousands(total),
    )
}

/// Caption of the operator handoff message that carries the receipt.
pub fn handoff_caption(customer_name: &str, order: &Order) -> String {
    format!(
        "New {} order\n\
         From: {customer_name}\n\
         User id: {}\n\
         Currency: {}\n\
         Amount: {}\n\
         Wallet: {}\n\
         Order id: {}",
        order.side.to_string().to_uppercase(),
        order.user_id,
        order.currency,
        order.amount,
        order.wallet,
        order.id,
    )
}

/// Public channel announcement for a confirmed order.
pub fn channel_caption(customer_name: &str, order: &Order, offset_hours: i32) -> String {
    format!(
        "{customer_name} {} {} {}\nWallet: {}\nDate: {}",
        side_verb(order.side),
        order.amount,
        order.currency,
        order.wallet,
        local_stamp(order.created_at, offset_hours, false),
    )
}

/// Caption for a relayed support message.
pub fn support_caption(customer_name: &str, customer_id: i64, text: Option<&str>) -> String {
    let mut caption = format!("Message from a customer:\nFrom: {customer_name}\nUser id: {customer_id}");
    if let Some(text) = text
        && !text.is_empty()
    {
        let _ = write!(caption, "\nText: {text}");
    }
    caption
}

pub fn new_subscriber(name: &str, id: i64) -> String {
    format!("New subscriber: {name} (id {id})")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::order::OrderId;
    use crate::domain::user::UserId;
    use chrono::TimeZone;
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
    fn test_group_thousands() {
        assert_eq!(group_thousands(dec!(12600)), "12 600");
        assert_eq!(group_thousands(dec!(1234567.50)), "1 234 567.5");
        assert_eq!(group_thousands(dec!(999)), "999");
        assert_eq!(group_thousands(dec!(-45000)), "-45 000");
    }

    #[test]
    fn test_rate_boards_use_side_rates() {
        let mut currencies = CurrencyMap::new();
        currencies.insert("USDT".to_string(), usdt());

        let buy = rate_board(OrderSide::Buy, &currencies);
        assert!(buy.contains("USDT - Tether: 12 600 UZS"));
        let sell = rate_board(OrderSide::Sell, &currencies);
        assert!(sell.contains("USDT - Tether: 12 800 UZS"));
    }

    #[test]
    fn test_payment_details_totals() {
        let text = payment_details("USDT", &usdt(), OrderSide::Buy, Amount::parse("30").unwrap());
        assert!(text.contains("Card: 8600 1111"));
        assert!(text.contains("Rate: 12 600"));
        assert!(text.contains("Total: 378 000 UZS"));
    }

    #[test]
    fn test_order_history_newest_first_capped() {
        let mut user = User::new(UserId::new(7), "Alice", None);
        let mut orders = OrderMap::new();
        for i in 0..12 {
            let id = OrderId::new(format!("id-{i}"));
            user.orders.push(id.clone());
            orders.insert(
                id.as_str().to_string(),
                Order {
                    id,
                    user_id: 7,
                    side: OrderSide::Buy,
                    currency: "USDT".to_string(),
                    amount: Amount::parse("1").unwrap(),
                    wallet: "w".to_string(),
                    rate: dec!(12600),
                    status: OrderStatus::WaitingAdmin,
                    created_at: Utc.timestamp_opt(1_756_100_000 + i, 0).unwrap(),
                    proof: None,
                },
            );
        }
        // One id with no surviving record.
        user.orders.push(OrderId::new("gone"));

        let text = order_history(&user, &orders, 0);
        assert!(text.contains("id: id-11"));
        assert!(!text.contains("id: id-0"));
        assert!(!text.contains("id: id-1\n"));
        assert!(!text.contains("gone"));
        let first = text.find("id: id-11").unwrap();
        let later = text.find("id: id-2").unwrap();
        assert!(first < later);
    }

    #[test]
    fn test_history_timestamps_are_shifted() {
        let mut user = User::new(UserId::new(7), "Alice", None);
        let id = OrderId::new("a");
        user.orders.push(id.clone());
        let mut orders = OrderMap::new();
        orders.insert(
            "a".to_string(),
            Order {
                id,
                user_id: 7,
                side: OrderSide::Sell,
                currency: "USDT".to_string(),
                amount: Amount::parse("2").unwrap(),
                wallet: "w".to_string(),
                rate: dec!(12800),
                status: OrderStatus::Confirmed,
                created_at: Utc.with_ymd_and_hms(2025, 3, 1, 20, 0, 0).unwrap(),
                proof: None,
            },
        );
        let text = order_history(&user, &orders, 5);
        assert!(text.contains("created: 2025-03-02 01:00:00"));
        assert!(text.contains("status: confirmed"));
    }
}
