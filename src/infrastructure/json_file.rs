use crate::domain::currency::Currency;
use crate::domain::money::Balance;
use crate::domain::order::{Order, OrderId};
use crate::domain::ports::{CurrencyMap, Guide, OrderMap, RecordStore, ReserveMap, UserMap};
use crate::domain::user::{User, UserId};
use crate::error::Result;
use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;

const CURRENCIES_FILE: &str = "currencies.json";
const USERS_FILE: &str = "users.json";
const ORDERS_FILE: &str = "orders.json";
const RESERVES_FILE: &str = "reserves.json";
const CARD_BALANCE_FILE: &str = "card_balance.json";
const GUIDE_FILE: &str = "guide.json";

/// The card balance file keys the single balance by its fiat currency.
const CARD_CURRENCY: &str = "UZS";

#[derive(Default)]
struct Cache {
    currencies: CurrencyMap,
    users: UserMap,
    orders: OrderMap,
    reserves: ReserveMap,
    card_balance: Balance,
    guide: Guide,
}

/// A record store persisted as JSON files, one per collection, under a data
/// directory.
///
/// Every mutation rewrites the affected collection's file before returning,
/// so a call that came back `Ok` is on disk. Files are written to a
/// temporary name and renamed into place, which keeps a crash mid-write from
/// truncating the previous version. Reads are served from an in-process
/// cache that is loaded once at open.
#[derive(Clone)]
pub struct JsonFileStore {
    dir: PathBuf,
    cache: Arc<RwLock<Cache>>,
}

impl JsonFileStore {
    /// Opens the store at `dir`, creating the directory if needed. Missing
    /// collection files read as empty.
    pub fn open<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        let card: BTreeMap<String, Balance> = load_or_default(&dir.join(CARD_BALANCE_FILE))?;
        let cache = Cache {
            currencies: load_or_default(&dir.join(CURRENCIES_FILE))?,
            users: load_or_default(&dir.join(USERS_FILE))?,
            orders: load_or_default(&dir.join(ORDERS_FILE))?,
            reserves: load_or_default(&dir.join(RESERVES_FILE))?,
            card_balance: card.get(CARD_CURRENCY).copied().unwrap_or(Balance::ZERO),
            guide: load_or_default(&dir.join(GUIDE_FILE))?,
        };
        Ok(Self {
            dir,
            cache: Arc::new(RwLock::new(cache)),
        })
    }

    fn save<T: Serialize>(&self, name: &str, value: &T) -> Result<()> {
        let path = self.dir.join(name);
        let tmp = self.dir.join(format!("{name}.tmp"));
        fs::write(&tmp, serde_json::to_string_pretty(value)?)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }

    fn save_card_balance(&self, balance: Balance) -> Result<()> {
        let map = BTreeMap::from([(CARD_CURRENCY.to_string(), balance)]);
        self.save(CARD_BALANCE_FILE, &map)
    }
}

fn load_or_default<T: DeserializeOwned + Default>(path: &Path) -> Result<T> {
    if !path.exists() {
        return Ok(T::default());
    }
    let raw = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&raw)?)
}

#[async_trait]
impl RecordStore for JsonFileStore {
    async fn currencies(&self) -> Result<CurrencyMap> {
        Ok(self.cache.read().await.currencies.clone())
    }

    async fn currency(&self, code: &str) -> Result<Option<Currency>> {
        Ok(self.cache.read().await.currencies.get(code).cloned())
    }

    async fn put_currency(&self, code: &str, currency: Currency) -> Result<()> {
        let mut cache = self.cache.write().await;
        cache.currencies.insert(code.to_string(), currency);
        self.save(CURRENCIES_FILE, &cache.currencies)
    }

    async fn insert_currency(&self, code: &str, currency: Currency) -> Result<bool> {
        let mut cache = self.cache.write().await;
        if cache.currencies.contains_key(code) {
            return Ok(false);
        }
        cache.currencies.insert(code.to_string(), currency);
        cache.reserves.insert(code.to_string(), Balance::ZERO);
        self.save(CURRENCIES_FILE, &cache.currencies)?;
        self.save(RESERVES_FILE, &cache.reserves)?;
        Ok(true)
    }

    async fn remove_currency(&self, code: &str) -> Result<bool> {
        let mut cache = self.cache.write().await;
        let known = cache.currencies.remove(code).is_some();
        cache.reserves.remove(code);
        if known {
            self.save(CURRENCIES_FILE, &cache.currencies)?;
            self.save(RESERVES_FILE, &cache.reserves)?;
        }
        Ok(known)
    }

    async fn users(&self) -> Result<UserMap> {
        Ok(self.cache.read().await.users.clone())
    }

    async fn user(&self, id: UserId) -> Result<Option<User>> {
        Ok(self.cache.read().await.users.get(&id.key()).cloned())
    }

    async fn put_user(&self, user: User) -> Result<()> {
        let mut cache = self.cache.write().await;
        cache.users.insert(user.id.key(), user);
        self.save(USERS_FILE, &cache.users)
    }

    async fn orders(&self) -> Result<OrderMap> {
        Ok(self.cache.read().await.orders.clone())
    }

    async fn order(&self, id: &OrderId) -> Result<Option<Order>> {
        Ok(self.cache.read().await.orders.get(id.as_str()).cloned())
    }

    async fn put_order(&self, order: Order) -> Result<()> {
        let mut cache = self.cache.write().await;
        cache.orders.insert(order.id.to_string(), order);
        self.save(ORDERS_FILE, &cache.orders)
    }

    async fn reserves(&self) -> Result<ReserveMap> {
        Ok(self.cache.read().await.reserves.clone())
    }

    async fn reserve(&self, code: &str) -> Result<Balance> {
        let cache = self.cache.read().await;
        Ok(cache.reserves.get(code).copied().unwrap_or(Balance::ZERO))
    }

    async fn set_reserve(&self, code: &str, balance: Balance) -> Result<()> {
        let mut cache = self.cache.write().await;
        cache.reserves.insert(code.to_string(), balance);
        self.save(RESERVES_FILE, &cache.reserves)
    }

    async fn card_balance(&self) -> Result<Balance> {
        Ok(self.cache.read().await.card_balance)
    }

    async fn set_card_balance(&self, balance: Balance) -> Result<()> {
        let mut cache = self.cache.write().await;
        cache.card_balance = balance;
        self.save_card_balance(balance)
    }

    async fn guide(&self) -> Result<Guide> {
        Ok(self.cache.read().await.guide.clone())
    }

    async fn set_guide(&self, guide: Guide) -> Result<()> {
        let mut cache = self.cache.write().await;
        cache.guide = guide.clone();
        self.save(GUIDE_FILE, &guide)
    }
}
