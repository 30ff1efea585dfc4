use crate::domain::currency::Currency;
use crate::domain::money::Balance;
use crate::domain::order::{Order, OrderId};
use crate::domain::ports::{CurrencyMap, Guide, OrderMap, RecordStore, ReserveMap, UserMap};
use crate::domain::user::{User, UserId};
use crate::error::{ExchangeError, Result};
use async_trait::async_trait;
use rocksdb::{ColumnFamily, ColumnFamilyDescriptor, DB, IteratorMode, Options, WriteBatch};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

/// Column family per record collection.
pub const CF_CURRENCIES: &str = "currencies";
pub const CF_USERS: &str = "users";
pub const CF_ORDERS: &str = "orders";
pub const CF_RESERVES: &str = "reserves";
/// Singleton records (card balance, guide) under fixed keys.
pub const CF_META: &str = "meta";

const KEY_CARD_BALANCE: &[u8] = b"card_balance";
const KEY_GUIDE: &[u8] = b"guide";

/// A persistent record store backed by RocksDB, one column family per
/// collection. Values are stored as JSON, matching the file-store layout.
///
/// This struct is thread-safe (`Clone` shares the underlying `Arc<DB>`).
#[derive(Clone)]
pub struct RocksDbStore {
    db: Arc<DB>,
}

fn persistence(err: rocksdb::Error) -> ExchangeError {
    ExchangeError::Persistence(err.to_string())
}

impl RocksDbStore {
    /// Opens or creates a RocksDB instance at the specified path, ensuring
    /// all column families exist.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let families = [CF_CURRENCIES, CF_USERS, CF_ORDERS, CF_RESERVES, CF_META]
            .into_iter()
            .map(|name| ColumnFamilyDescriptor::new(name, Options::default()))
            .collect::<Vec<_>>();

        let db = DB::open_cf_descriptors(&opts, path, families).map_err(persistence)?;
        Ok(Self { db: Arc::new(db) })
    }

    fn cf(&self, name: &str) -> Result<&ColumnFamily> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| ExchangeError::Persistence(format!("column family {name} not found")))
    }

    fn put_json<T: Serialize>(&self, cf: &str, key: &[u8], value: &T) -> Result<()> {
        let bytes = serde_json::to_vec(value)?;
        self.db
            .put_cf(self.cf(cf)?, key, bytes)
            .map_err(persistence)
    }

    fn get_json<T: DeserializeOwned>(&self, cf: &str, key: &[u8]) -> Result<Option<T>> {
        match self.db.get_cf(self.cf(cf)?, key).map_err(persistence)? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    fn scan<T: DeserializeOwned>(&self, cf: &str) -> Result<BTreeMap<String, T>> {
        let mut map = BTreeMap::new();
        for item in self.db.iterator_cf(self.cf(cf)?, IteratorMode::Start) {
            let (key, value) = item.map_err(persistence)?;
            let record = serde_json::from_slice(&value)?;
            map.insert(String::from_utf8_lossy(&key).into_owned(), record);
        }
        Ok(map)
    }
}

#[async_trait]
impl RecordStore for RocksDbStore {
    async fn currencies(&self) -> Result<CurrencyMap> {
        self.scan(CF_CURRENCIES)
    }

    async fn currency(&self, code: &str) -> Result<Option<Currency>> {
        self.get_json(CF_CURRENCIES, code.as_bytes())
    }

    async fn put_currency(&self, code: &str, currency: Currency) -> Result<()> {
        self.put_json(CF_CURRENCIES, code.as_bytes(), &currency)
    }

    async fn insert_currency(&self, code: &str, currency: Currency) -> Result<bool> {
        if self
            .get_json::<Currency>(CF_CURRENCIES, code.as_bytes())?
            .is_some()
        {
            return Ok(false);
        }
        let mut batch = WriteBatch::default();
        batch.put_cf(
            self.cf(CF_CURRENCIES)?,
            code.as_bytes(),
            serde_json::to_vec(&currency)?,
        );
        batch.put_cf(
            self.cf(CF_RESERVES)?,
            code.as_bytes(),
            serde_json::to_vec(&Balance::ZERO)?,
        );
        self.db.write(batch).map_err(persistence)?;
        Ok(true)
    }

    async fn remove_currency(&self, code: &str) -> Result<bool> {
        if self
            .get_json::<Currency>(CF_CURRENCIES, code.as_bytes())?
            .is_none()
        {
            return Ok(false);
        }
        let mut batch = WriteBatch::default();
        batch.delete_cf(self.cf(CF_CURRENCIES)?, code.as_bytes());
        batch.delete_cf(self.cf(CF_RESERVES)?, code.as_bytes());
        self.db.write(batch).map_err(persistence)?;
        Ok(true)
    }

    async fn users(&self) -> Result<UserMap> {
        self.scan(CF_USERS)
    }

    async fn user(&self, id: UserId) -> Result<Option<User>> {
        self.get_json(CF_USERS, id.key().as_bytes())
    }

    async fn put_user(&self, user: User) -> Result<()> {
        self.put_json(CF_USERS, user.id.key().as_bytes(), &user)
    }

    async fn orders(&self) -> Result<OrderMap> {
        self.scan(CF_ORDERS)
    }

    async fn order(&self, id: &OrderId) -> Result<Option<Order>> {
        self.get_json(CF_ORDERS, id.as_str().as_bytes())
    }

    async fn put_order(&self, order: Order) -> Result<()> {
        self.put_json(CF_ORDERS, order.id.as_str().as_bytes(), &order)
    }

    async fn reserves(&self) -> Result<ReserveMap> {
        self.scan(CF_RESERVES)
    }

    async fn reserve(&self, code: &str) -> Result<Balance> {
        Ok(self
            .get_json(CF_RESERVES, code.as_bytes())?
            .unwrap_or(Balance::ZERO))
    }

    async fn set_reserve(&self, code: &str, balance: Balance) -> Result<()> {
        self.put_json(CF_RESERVES, code.as_bytes(), &balance)
    }

    async fn card_balance(&self) -> Result<Balance> {
        Ok(self
            .get_json(CF_META, KEY_CARD_BALANCE)?
            .unwrap_or(Balance::ZERO))
    }

    async fn set_card_balance(&self, balance: Balance) -> Result<()> {
        self.put_json(CF_META, KEY_CARD_BALANCE, &balance)
    }

    async fn guide(&self) -> Result<Guide> {
        Ok(self.get_json(CF_META, KEY_GUIDE)?.unwrap_or_default())
    }

    async fn set_guide(&self, guide: Guide) -> Result<()> {
        self.put_json(CF_META, KEY_GUIDE, &guide)
    }
}
