use crate::domain::currency::Currency;
use crate::domain::media::MediaRef;
use crate::domain::money::Balance;
use crate::domain::order::{Order, OrderId};
use crate::domain::ports::{
    CurrencyMap, Guide, Keyboard, OrderMap, Profile, Recipient, RecordStore, ReserveMap,
    Transport, UserMap,
};
use crate::domain::user::{User, UserId};
use crate::error::{ExchangeError, Result};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;

#[derive(Default)]
struct Records {
    currencies: CurrencyMap,
    users: UserMap,
    orders: OrderMap,
    reserves: ReserveMap,
    card_balance: Balance,
    guide: Guide,
}

/// A thread-safe in-memory record store.
///
/// All collections live behind one `RwLock`, so paired mutations such as
/// currency removal are atomic. Ideal for tests and ephemeral runs where
/// nothing should survive the process.
#[derive(Default, Clone)]
pub struct InMemoryStore {
    records: Arc<RwLock<Records>>,
}

impl InMemoryStore {
    /// Creates a new, empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RecordStore for InMemoryStore {
    async fn currencies(&self) -> Result<CurrencyMap> {
        Ok(self.records.read().await.currencies.clone())
    }

    async fn currency(&self, code: &str) -> Result<Option<Currency>> {
        Ok(self.records.read().await.currencies.get(code).cloned())
    }

    async fn put_currency(&self, code: &str, currency: Currency) -> Result<()> {
        let mut records = self.records.write().await;
        records.currencies.insert(code.to_string(), currency);
        Ok(())
    }

    async fn insert_currency(&self, code: &str, currency: Currency) -> Result<bool> {
        let mut records = self.records.write().await;
        if records.currencies.contains_key(code) {
            return Ok(false);
        }
        records.currencies.insert(code.to_string(), currency);
        records.reserves.insert(code.to_string(), Balance::ZERO);
        Ok(true)
    }

    async fn remove_currency(&self, code: &str) -> Result<bool> {
        let mut records = self.records.write().await;
        let known = records.currencies.remove(code).is_some();
        records.reserves.remove(code);
        Ok(known)
    }

    async fn users(&self) -> Result<UserMap> {
        Ok(self.records.read().await.users.clone())
    }

    async fn user(&self, id: UserId) -> Result<Option<User>> {
        Ok(self.records.read().await.users.get(&id.key()).cloned())
    }

    async fn put_user(&self, user: User) -> Result<()> {
        let mut records = self.records.write().await;
        records.users.insert(user.id.key(), user);
        Ok(())
    }

    async fn orders(&self) -> Result<OrderMap> {
        Ok(self.records.read().await.orders.clone())
    }

    async fn order(&self, id: &OrderId) -> Result<Option<Order>> {
        Ok(self.records.read().await.orders.get(id.as_str()).cloned())
    }

    async fn put_order(&self, order: Order) -> Result<()> {
        let mut records = self.records.write().await;
        records.orders.insert(order.id.to_string(), order);
        Ok(())
    }

    async fn reserves(&self) -> Result<ReserveMap> {
        Ok(self.records.read().await.reserves.clone())
    }

    async fn reserve(&self, code: &str) -> Result<Balance> {
        let records = self.records.read().await;
        Ok(records.reserves.get(code).copied().unwrap_or(Balance::ZERO))
    }

    async fn set_reserve(&self, code: &str, balance: Balance) -> Result<()> {
        let mut records = self.records.write().await;
        records.reserves.insert(code.to_string(), balance);
        Ok(())
    }

    async fn card_balance(&self) -> Result<Balance> {
        Ok(self.records.read().await.card_balance)
    }

    async fn set_card_balance(&self, balance: Balance) -> Result<()> {
        self.records.write().await.card_balance = balance;
        Ok(())
    }

    async fn guide(&self) -> Result<Guide> {
        Ok(self.records.read().await.guide.clone())
    }

    async fn set_guide(&self, guide: Guide) -> Result<()> {
        self.records.write().await.guide = guide;
        Ok(())
    }
}

/// One outbound message captured by [`InMemoryTransport`]. `text` holds the
/// caption when `media` is set.
#[derive(Debug, Clone)]
pub struct SentMessage {
    pub to: Recipient,
    pub text: String,
    pub media: Option<MediaRef>,
    pub keyboard: Option<Keyboard>,
}

/// A transport double that records every send instead of delivering it.
///
/// Failures can be injected per user or for the channel, which is how the
/// tests exercise the handoff-abort and best-effort notification paths.
#[derive(Default, Clone)]
pub struct InMemoryTransport {
    sent: Arc<RwLock<Vec<SentMessage>>>,
    profiles: Arc<RwLock<HashMap<i64, Profile>>>,
    failing_users: Arc<RwLock<HashSet<i64>>>,
    channel_down: Arc<AtomicBool>,
}

impl InMemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the profile returned for a user id; unknown ids get a
    /// generated placeholder name.
    pub async fn set_profile(&self, user: UserId, name: &str, username: Option<&str>) {
        self.profiles.write().await.insert(
            user.as_i64(),
            Profile {
                name: name.to_string(),
                username: username.map(str::to_string),
            },
        );
    }

    /// Every send to this user fails until [`Self::heal_user`] is called.
    pub async fn fail_user(&self, user: UserId) {
        self.failing_users.write().await.insert(user.as_i64());
    }

    pub async fn heal_user(&self, user: UserId) {
        self.failing_users.write().await.remove(&user.as_i64());
    }

    /// Every channel send fails from now on.
    pub fn fail_channel(&self) {
        self.channel_down.store(true, Ordering::SeqCst);
    }

    pub async fn sent(&self) -> Vec<SentMessage> {
        self.sent.read().await.clone()
    }

    pub async fn sent_to(&self, user: UserId) -> Vec<SentMessage> {
        self.sent
            .read()
            .await
            .iter()
            .filter(|message| message.to == Recipient::User(user))
            .cloned()
            .collect()
    }

    pub async fn clear(&self) {
        self.sent.write().await.clear();
    }

    async fn deliver(
        &self,
        to: Recipient,
        text: &str,
        media: Option<&MediaRef>,
        keyboard: Option<Keyboard>,
    ) -> Result<()> {
        let down = match &to {
            Recipient::User(id) => self.failing_users.read().await.contains(&id.as_i64()),
            Recipient::Channel(_) => self.channel_down.load(Ordering::SeqCst),
        };
        if down {
            return Err(ExchangeError::Notification(format!("delivery to {to} failed")));
        }
        self.sent.write().await.push(SentMessage {
            to,
            text: text.to_string(),
            media: media.cloned(),
            keyboard,
        });
        Ok(())
    }
}

#[async_trait]
impl Transport for InMemoryTransport {
    async fn send_text(
        &self,
        to: Recipient,
        text: &str,
        keyboard: Option<Keyboard>,
    ) -> Result<()> {
        self.deliver(to, text, None, keyboard).await
    }

    async fn send_media(
        &self,
        to: Recipient,
        media: &MediaRef,
        caption: &str,
        keyboard: Option<Keyboard>,
    ) -> Result<()> {
        self.deliver(to, caption, Some(media), keyboard).await
    }

    async fn profile(&self, user: UserId) -> Result<Profile> {
        let profiles = self.profiles.read().await;
        Ok(profiles.get(&user.as_i64()).cloned().unwrap_or(Profile {
            name: format!("User {}", user.as_i64()),
            username: None,
        }))
    }
}
