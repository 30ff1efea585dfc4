use crate::domain::currency::Currency;
use crate::domain::media::MediaRef;
use crate::domain::money::Balance;
use crate::domain::order::{Order, OrderId};
use crate::domain::user::{User, UserId};
use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Collections as persisted: one map per record kind, keyed by string
/// (currency code, decimal user id, order id).
pub type CurrencyMap = BTreeMap<String, Currency>;
pub type UserMap = BTreeMap<String, User>;
pub type OrderMap = BTreeMap<String, Order>;
pub type ReserveMap = BTreeMap<String, Balance>;

/// The customer-facing usage guide: an optional video plus a caption.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Guide {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video: Option<MediaRef>,
    #[serde(default)]
    pub text: String,
}

impl Guide {
    pub fn is_empty(&self) -> bool {
        self.video.is_none() && self.text.is_empty()
    }
}

/// Profile data the chat platform knows about a user.
#[derive(Debug, Clone, PartialEq)]
pub struct Profile {
    pub name: String,
    pub username: Option<String>,
}

/// Where an outbound message goes.
#[derive(Debug, Clone, PartialEq)]
pub enum Recipient {
    User(UserId),
    Channel(String),
}

impl fmt::Display for Recipient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Recipient::User(id) => write!(f, "user {id}"),
            Recipient::Channel(name) => write!(f, "channel {name}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ButtonAction {
    Callback(String),
    Url(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct InlineButton {
    pub label: String,
    pub action: ButtonAction,
}

impl InlineButton {
    pub fn callback(label: impl Into<String>, payload: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            action: ButtonAction::Callback(payload.into()),
        }
    }

    pub fn url(label: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            action: ButtonAction::Url(url.into()),
        }
    }
}

/// A keyboard attached to an outbound message. Reply keyboards replace the
/// customer's input panel; inline keyboards hang off one message and fire
/// callbacks or open links.
#[derive(Debug, Clone, PartialEq)]
pub enum Keyboard {
    Reply { rows: Vec<Vec<String>> },
    Inline { buttons: Vec<InlineButton> },
}

impl Keyboard {
    pub fn reply(rows: Vec<Vec<String>>) -> Self {
        Keyboard::Reply { rows }
    }

    pub fn inline(buttons: Vec<InlineButton>) -> Self {
        Keyboard::Inline { buttons }
    }
}

/// Persistence port over the record collections.
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn currencies(&self) -> Result<CurrencyMap>;
    async fn currency(&self, code: &str) -> Result<Option<Currency>>;
    async fn put_currency(&self, code: &str, currency: Currency) -> Result<()>;
    /// Creates a currency and seeds its reserve at zero. Returns `false`
    /// without touching anything when the code is already taken.
    async fn insert_currency(&self, code: &str, currency: Currency) -> Result<bool>;
    /// Removes a currency together with its reserve in one step. Returns
    /// `false` when the code does not exist.
    async fn remove_currency(&self, code: &str) -> Result<bool>;

    async fn users(&self) -> Result<UserMap>;
    async fn user(&self, id: UserId) -> Result<Option<User>>;
    async fn put_user(&self, user: User) -> Result<()>;

    async fn orders(&self) -> Result<OrderMap>;
    async fn order(&self, id: &OrderId) -> Result<Option<Order>>;
    async fn put_order(&self, order: Order) -> Result<()>;

    async fn reserves(&self) -> Result<ReserveMap>;
    /// Reserve for a code; missing entries read as zero.
    async fn reserve(&self, code: &str) -> Result<Balance>;
    async fn set_reserve(&self, code: &str, balance: Balance) -> Result<()>;

    async fn card_balance(&self) -> Result<Balance>;
    async fn set_card_balance(&self, balance: Balance) -> Result<()>;

    async fn guide(&self) -> Result<Guide>;
    async fn set_guide(&self, guide: Guide) -> Result<()>;
}

/// Outbound messaging port.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send_text(&self, to: Recipient, text: &str, keyboard: Option<Keyboard>)
    -> Result<()>;
    async fn send_media(
        &self,
        to: Recipient,
        media: &MediaRef,
        caption: &str,
        keyboard: Option<Keyboard>,
    ) -> Result<()>;
    /// Profile lookup for first-contact registration and announcements.
    async fn profile(&self, user: UserId) -> Result<Profile>;
}

pub type RecordStoreRef = Arc<dyn RecordStore>;
pub type TransportRef = Arc<dyn Transport>;
