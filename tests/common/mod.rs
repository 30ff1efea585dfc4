use obmen::application::Dispatcher;
use obmen::config::Config;
use obmen::dialog::Inbound;
use obmen::domain::currency::Currency;
use obmen::domain::money::Balance;
use obmen::domain::ports::{RecordStore, RecordStoreRef, TransportRef};
use obmen::domain::user::UserId;
use obmen::infrastructure::in_memory::{InMemoryStore, InMemoryTransport};
use rust_decimal_macros::dec;
use std::sync::Arc;

pub const ADMIN: UserId = UserId::new(1);
pub const ALICE: UserId = UserId::new(7);

pub fn usdt() -> Currency {
    Currency {
        name: "Tether".to_string(),
        buy_rate: dec!(12600),
        sell_rate: dec!(12800),
        buy_card: "8600 1111 2222 3333".to_string(),
        sell_card: "8600 4444 5555 6666".to_string(),
    }
}

pub struct Exchange {
    pub store: Arc<InMemoryStore>,
    pub transport: Arc<InMemoryTransport>,
    pub dispatcher: Dispatcher,
}

/// A live desk: USDT at 12600/12800 with a reserve of 100, plus profiles
/// for the operator and one customer.
pub async fn exchange() -> Exchange {
    let store = Arc::new(InMemoryStore::new());
    let transport = Arc::new(InMemoryTransport::new());

    store.insert_currency("USDT", usdt()).await.unwrap();
    store
        .set_reserve("USDT", Balance::new(dec!(100)).unwrap())
        .await
        .unwrap();
    transport.set_profile(ADMIN, "Operator", Some("op")).await;
    transport.set_profile(ALICE, "Alice", Some("alice01")).await;

    let dispatcher = Dispatcher::new(
        store.clone() as RecordStoreRef,
        transport.clone() as TransportRef,
        Config::new(ADMIN),
    );
    Exchange {
        store,
        transport,
        dispatcher,
    }
}

/// Feeds a sequence of text messages from one user through the dispatcher.
pub async fn say(exchange: &Exchange, from: UserId, lines: &[&str]) {
    for line in lines {
        exchange
            .dispatcher
            .on_message(Inbound::text(from, *line))
            .await
            .unwrap();
    }
}
