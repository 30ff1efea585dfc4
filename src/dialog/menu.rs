//! Menu labels, keyboards and callback payloads. Label constants are the
//! routing keys of the idle dispatch table, so tests and the console
//! frontend share them with the transition function.

use crate::domain::order::OrderId;
use crate::domain::ports::{InlineButton, Keyboard};
use crate::domain::user::UserId;

pub const BUY: &str = "Buy";
pub const SELL: &str = "Sell";
pub const BUY_RATES: &str = "Buy rates";
pub const SELL_RATES: &str = "Sell rates";
pub const MY_ORDERS: &str = "My orders";
pub const WORKING_HOURS: &str = "Working hours";
pub const GUIDE: &str = "Guide";
pub const RESERVES: &str = "Reserves";
pub const CONTACT_ADMIN: &str = "Contact operator";
pub const ADMIN_PANEL: &str = "Admin panel";

pub const CANCEL: &str = "Cancel";
pub const SEND_RECEIPT: &str = "Send receipt";
pub const BACK: &str = "Back";

pub const ADD_CURRENCY: &str = "Add currency";
pub const EDIT_CURRENCY: &str = "Edit currency";
pub const DELETE_CURRENCY: &str = "Delete currency";
pub const LIST_CURRENCIES: &str = "List currencies";
pub const SET_RESERVE: &str = "Set reserve";
pub const SET_CARD_BALANCE: &str = "Card balance";
pub const GUIDE_SETTINGS: &str = "Guide settings";
pub const BROADCAST: &str = "Broadcast";
pub const BROADCAST_SINGLE: &str = "To one user";
pub const BROADCAST_ALL: &str = "To everyone";
/// Keyword that clears the stored guide inside the guide settings dialog.
pub const GUIDE_CLEAR: &str = "delete";

/// Callback grammar: `admin_order|<action>|<id>` for decision buttons and
/// `reply_to_user|<user id>` for the support reply button.
pub const DECISION_PREFIX: &str = "admin_order";
pub const REPLY_PREFIX: &str = "reply_to_user";

pub fn confirm_payload(id: &OrderId) -> String {
    format!("{DECISION_PREFIX}|confirm|{id}")
}

pub fn reject_payload(id: &OrderId) -> String {
    format!("{DECISION_PREFIX}|reject|{id}")
}

pub fn message_user_payload(user: UserId) -> String {
    format!("{DECISION_PREFIX}|message_user|{user}")
}

pub fn reply_payload(user: UserId) -> String {
    format!("{REPLY_PREFIX}|{user}")
}

pub fn main_menu(is_admin: bool) -> Keyboard {
    let mut rows = vec![
        vec![SELL_RATES.to_string(), BUY_RATES.to_string()],
        vec![BUY.to_string(), SELL.to_string()],
        vec![MY_ORDERS.to_string(), WORKING_HOURS.to_string()],
        vec![GUIDE.to_string(), RESERVES.to_string()],
        vec![CONTACT_ADMIN.to_string()],
    ];
    if is_admin {
        rows.push(vec![ADMIN_PANEL.to_string()]);
    }
    Keyboard::reply(rows)
}

pub fn admin_menu() -> Keyboard {
    Keyboard::reply(vec![
        vec![ADD_CURRENCY.to_string(), EDIT_CURRENCY.to_string()],
        vec![DELETE_CURRENCY.to_string(), LIST_CURRENCIES.to_string()],
        vec![SET_RESERVE.to_string(), SET_CARD_BALANCE.to_string()],
        vec![GUIDE_SETTINGS.to_string(), BROADCAST.to_string()],
        vec![BACK.to_string()],
    ])
}

pub fn cancel_only() -> Keyboard {
    Keyboard::reply(vec![vec![CANCEL.to_string()]])
}

/// Currency pick keyboard: codes three per row, cancel on its own row.
pub fn currency_rows<'a>(codes: impl Iterator<Item = &'a String>) -> Keyboard {
    let mut rows: Vec<Vec<String>> = vec![];
    for code in codes {
        match rows.last_mut() {
            Some(row) if row.len() < 3 => row.push(code.clone()),
            _ => rows.push(vec![code.clone()]),
        }
    }
    rows.push(vec![CANCEL.to_string()]);
    Keyboard::reply(rows)
}

pub fn field_rows() -> Keyboard {
    Keyboard::reply(vec![
        vec![
            "name".to_string(),
            "buy_rate".to_string(),
            "sell_rate".to_string(),
        ],
        vec!["buy_card".to_string(), "sell_card".to_string()],
        vec![CANCEL.to_string()],
    ])
}

pub fn receipt_prompt() -> Keyboard {
    Keyboard::reply(vec![
        vec![SEND_RECEIPT.to_string()],
        vec![CANCEL.to_string()],
    ])
}

pub fn broadcast_audience() -> Keyboard {
    Keyboard::reply(vec![
        vec![BROADCAST_SINGLE.to_string()],
        vec![BROADCAST_ALL.to_string()],
        vec![CANCEL.to_string()],
    ])
}

/// Inline decision surface attached to the operator handoff message.
pub fn decision_buttons(order: &OrderId, customer: UserId) -> Keyboard {
    Keyboard::inline(vec![
        InlineButton::callback("Confirm", confirm_payload(order)),
        InlineButton::callback("Reject", reject_payload(order)),
        InlineButton::callback("Message user", message_user_payload(customer)),
    ])
}

/// Inline reply button attached to relayed support messages.
pub fn reply_button(user: UserId) -> Keyboard {
    Keyboard::inline(vec![InlineButton::callback("Reply", reply_payload(user))])
}

/// Channel announcement buttons: a profile link when the customer has a
/// public username.
pub fn channel_buttons(username: Option<&str>) -> Option<Keyboard> {
    username.map(|name| {
        Keyboard::inline(vec![InlineButton::url(
            "Open profile",
            format!("https://t.me/{name}"),
        )])
    })
}
