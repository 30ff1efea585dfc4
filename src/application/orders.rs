use crate::config::Config;
use crate::dialog::{menu, views};
use crate::domain::media::MediaRef;
use crate::domain::order::{Decision, Order, OrderDraft, OrderId, OrderSide, OrderStatus};
use crate::domain::ports::{Recipient, RecordStoreRef, TransportRef};
use crate::domain::user::{User, UserId};
use crate::error::{ExchangeError, Result};
use chrono::Utc;
use tokio::sync::Mutex;
use tracing::{info, warn};

/// Result of an operator decision on an order.
#[derive(Debug)]
pub enum DecideOutcome {
    /// The decision was applied and persisted.
    Applied(Order),
    /// The order was already decided; nothing changed.
    AlreadyDecided(Order),
}

/// Order intake and decision handling.
///
/// `submit` turns a finished dialog draft into a persisted order and hands
/// it to the operator; `decide` applies the operator's verdict exactly once
/// and fans out the notifications.
pub struct OrderManager {
    store: RecordStoreRef,
    transport: TransportRef,
    config: Config,
    last_id: Mutex<i64>,
}

impl OrderManager {
    pub fn new(store: RecordStoreRef, transport: TransportRef, config: Config) -> Self {
        Self {
            store,
            transport,
            config,
            last_id: Mutex::new(0),
        }
    }

    /// Millisecond timestamp ids, bumped past the previous one so two
    /// submissions in the same millisecond stay distinct.
    async fn mint_id(&self) -> OrderId {
        let mut last = self.last_id.lock().await;
        *last = Utc::now().timestamp_millis().max(*last + 1);
        OrderId::new(last.to_string())
    }

    /// Validates and submits a finished draft.
    ///
    /// Checks run against current records, not the dialog's snapshot: the
    /// currency may have been deleted and the reserve may have shrunk since
    /// the user entered the amount. The operator handoff goes out before
    /// anything is persisted; if it fails, no order exists and the error
    /// surfaces to the caller so the user can retry the upload.
    pub async fn submit(
        &self,
        customer: &User,
        draft: OrderDraft,
        proof: MediaRef,
    ) -> Result<Order> {
        let Some(currency) = self.store.currency(&draft.currency).await? else {
            return Err(ExchangeError::CurrencyNotFound(draft.currency));
        };
        if draft.side == OrderSide::Buy {
            let available = self.store.reserve(&draft.currency).await?;
            if !available.covers(draft.amount) {
                return Err(ExchangeError::InsufficientReserve {
                    code: draft.currency,
                    available: available.value(),
                });
            }
        }

        let order = Order {
            id: self.mint_id().await,
            user_id: customer.id.as_i64(),
            side: draft.side,
            currency: draft.currency,
            amount: draft.amount,
            wallet: draft.wallet,
            rate: currency.rate_for(draft.side),
            status: OrderStatus::WaitingAdmin,
            created_at: Utc::now(),
            proof: Some(proof.clone()),
        };

        let caption = views::handoff_caption(&customer.handle(), &order);
        let buttons = menu::decision_buttons(&order.id, customer.id);
        self.transport
            .send_media(
                Recipient::User(self.config.admin),
                &proof,
                &caption,
                Some(buttons),
            )
            .await?;

        self.store.put_order(order.clone()).await?;
        let mut customer = customer.clone();
        customer.orders.push(order.id.clone());
        self.store.put_user(customer).await?;

        info!(order = %order.id, side = %order.side, currency = %order.currency, "order submitted");
        Ok(order)
    }

    /// Applies an operator decision.
    ///
    /// The status write is the commit point. A second decision on the same
    /// order reports [`DecideOutcome::AlreadyDecided`] without touching the
    /// reserve again, so a double-tapped confirm button cannot debit twice.
    /// Customer and channel notifications are best effort.
    pub async fn decide(&self, id: &OrderId, decision: Decision) -> Result<DecideOutcome> {
        let Some(mut order) = self.store.order(id).await? else {
            return Err(ExchangeError::OrderNotFound(id.to_string()));
        };
        if order.status.is_terminal() {
            return Ok(DecideOutcome::AlreadyDecided(order));
        }

        order.status = decision.status();
        self.store.put_order(order.clone()).await?;
        info!(order = %order.id, status = %order.status, "order decided");

        if order.status == OrderStatus::Confirmed {
            self.settle_reserve(&order).await?;
        }

        self.notify_customer(&order).await;
        if order.status == OrderStatus::Confirmed {
            self.announce(&order).await;
        }
        Ok(DecideOutcome::Applied(order))
    }

    /// Reserve movement on confirmation. Buy orders debit, clamped at zero;
    /// sell orders credit only when the config opts in. Currencies deleted
    /// since submission no longer have a reserve entry and are skipped.
    async fn settle_reserve(&self, order: &Order) -> Result<()> {
        let reserves = self.store.reserves().await?;
        let Some(reserve) = reserves.get(&order.currency) else {
            return Ok(());
        };
        let updated = match order.side {
            OrderSide::Buy => reserve.debit_clamped(order.amount),
            OrderSide::Sell if self.config.credit_sell_reserve => reserve.credit(order.amount),
            OrderSide::Sell => return Ok(()),
        };
        self.store.set_reserve(&order.currency, updated).await
    }

    async fn notify_customer(&self, order: &Order) {
        let text = match order.status {
            OrderStatus::Confirmed => format!("Your order {} has been confirmed.", order.id),
            OrderStatus::Rejected => format!("Your order {} has been rejected.", order.id),
            OrderStatus::WaitingAdmin => return,
        };
        let to = Recipient::User(UserId::new(order.user_id));
        if let Err(err) = self.transport.send_text(to, &text, None).await {
            warn!(order = %order.id, error = %err, "customer notification failed");
        }
    }

    /// Announces a confirmed order in the public channel, when one is
    /// configured. A failure here is reported to the operator but never
    /// fails the decision.
    async fn announce(&self, order: &Order) {
        let Some(channel) = self.config.channel.clone() else {
            return;
        };
        let customer = self
            .store
            .user(UserId::new(order.user_id))
            .await
            .ok()
            .flatten();
        let name = customer
            .as_ref()
            .map_or_else(|| format!("User {}", order.user_id), |user| user.name.clone());
        let caption = views::channel_caption(&name, order, self.config.utc_offset_hours);
        let buttons =
            menu::channel_buttons(customer.as_ref().and_then(|user| user.username.as_deref()));

        let to = Recipient::Channel(channel);
        let sent = match &order.proof {
            Some(proof) => self.transport.send_media(to, proof, &caption, buttons).await,
            None => self.transport.send_text(to, &caption, buttons).await,
        };
        if let Err(err) = sent {
            warn!(order = %order.id, error = %err, "channel announcement failed");
            let alert = format!("Failed to announce order {} in the channel.", order.id);
            if let Err(err) = self
                .transport
                .send_text(Recipient::User(self.config.admin), &alert, None)
                .await
            {
                warn!(error = %err, "operator alert failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::currency::Currency;
    use crate::domain::media::MediaKind;
    use crate::domain::money::{Amount, Balance};
    use crate::domain::ports::RecordStore;
    use crate::infrastructure::in_memory::{InMemoryStore, InMemoryTransport};
    use rust_decimal_macros::dec;
    use std::sync::Arc;

    const ADMIN: i64 = 1;
    const ALICE: i64 = 7;

    struct Fixture {
        store: Arc<InMemoryStore>,
        transport: Arc<InMemoryTransport>,
        manager: OrderManager,
    }

    async fn fixture(config: Config) -> Fixture {
        let store = Arc::new(InMemoryStore::new());
        let transport = Arc::new(InMemoryTransport::new());
        store
            .insert_currency(
                "USDT",
                Currency {
                    name: "Tether".to_string(),
                    buy_rate: dec!(12600),
                    sell_rate: dec!(12800),
                    buy_card: "8600 1111".to_string(),
                    sell_card: "8600 2222".to_string(),
                },
            )
            .await
            .unwrap();
        store
            .set_reserve("USDT", Balance::parse("100").unwrap())
            .await
            .unwrap();
        store
            .put_user(User::new(UserId::new(ALICE), "Alice", None))
            .await
            .unwrap();
        let manager = OrderManager::new(store.clone(), transport.clone(), config);
        Fixture {
            store,
            transport,
            manager,
        }
    }

    fn draft(side: OrderSide, amount: &str) -> OrderDraft {
        OrderDraft {
            side,
            currency: "USDT".to_string(),
            amount: Amount::parse(amount).unwrap(),
            wallet: "TWallet1".to_string(),
        }
    }

    fn proof() -> MediaRef {
        MediaRef::new(MediaKind::Photo, "receipt-1")
    }

    async fn alice(store: &InMemoryStore) -> User {
        store.user(UserId::new(ALICE)).await.unwrap().unwrap()
    }

    #[tokio::test]
    async fn test_submit_persists_and_hands_off() {
        let fx = fixture(Config::new(UserId::new(ADMIN))).await;
        let customer = alice(&fx.store).await;

        let order = fx
            .manager
            .submit(&customer, draft(OrderSide::Buy, "30"), proof())
            .await
            .unwrap();

        assert_eq!(order.rate, dec!(12600));
        assert_eq!(order.status, OrderStatus::WaitingAdmin);

        let stored = fx.store.order(&order.id).await.unwrap().unwrap();
        assert_eq!(stored.wallet, "TWallet1");
        assert_eq!(alice(&fx.store).await.orders, vec![order.id.clone()]);

        let handoff = fx.transport.sent_to(UserId::new(ADMIN)).await;
        assert_eq!(handoff.len(), 1);
        assert!(handoff[0].text.contains("New BUY order"));
        assert!(handoff[0].media.is_some());
        assert!(handoff[0].keyboard.is_some());
    }

    #[tokio::test]
    async fn test_submit_aborts_when_handoff_fails() {
        let fx = fixture(Config::new(UserId::new(ADMIN))).await;
        fx.transport.fail_user(UserId::new(ADMIN)).await;
        let customer = alice(&fx.store).await;

        let err = fx
            .manager
            .submit(&customer, draft(OrderSide::Buy, "30"), proof())
            .await
            .unwrap_err();

        assert!(matches!(err, ExchangeError::Notification(_)));
        assert!(fx.store.orders().await.unwrap().is_empty());
        assert!(alice(&fx.store).await.orders.is_empty());
    }

    #[tokio::test]
    async fn test_submit_rechecks_reserve() {
        let fx = fixture(Config::new(UserId::new(ADMIN))).await;
        fx.store
            .set_reserve("USDT", Balance::parse("10").unwrap())
            .await
            .unwrap();
        let customer = alice(&fx.store).await;

        let err = fx
            .manager
            .submit(&customer, draft(OrderSide::Buy, "30"), proof())
            .await
            .unwrap_err();

        match err {
            ExchangeError::InsufficientReserve { code, available } => {
                assert_eq!(code, "USDT");
                assert_eq!(available, dec!(10));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(fx.store.orders().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_submit_sell_ignores_reserve() {
        let fx = fixture(Config::new(UserId::new(ADMIN))).await;
        fx.store.set_reserve("USDT", Balance::ZERO).await.unwrap();
        let customer = alice(&fx.store).await;

        let order = fx
            .manager
            .submit(&customer, draft(OrderSide::Sell, "500"), proof())
            .await
            .unwrap();
        assert_eq!(order.rate, dec!(12800));
    }

    #[tokio::test]
    async fn test_submit_rejects_vanished_currency() {
        let fx = fixture(Config::new(UserId::new(ADMIN))).await;
        fx.store.remove_currency("USDT").await.unwrap();
        let customer = alice(&fx.store).await;

        let err = fx
            .manager
            .submit(&customer, draft(OrderSide::Buy, "30"), proof())
            .await
            .unwrap_err();
        assert!(matches!(err, ExchangeError::CurrencyNotFound(_)));
    }

    #[tokio::test]
    async fn test_order_ids_are_unique_within_a_millisecond() {
        let fx = fixture(Config::new(UserId::new(ADMIN))).await;
        let customer = alice(&fx.store).await;

        let first = fx
            .manager
            .submit(&customer, draft(OrderSide::Buy, "1"), proof())
            .await
            .unwrap();
        let customer = alice(&fx.store).await;
        let second = fx
            .manager
            .submit(&customer, draft(OrderSide::Buy, "1"), proof())
            .await
            .unwrap();

        assert_ne!(first.id, second.id);
    }

    #[tokio::test]
    async fn test_confirm_debits_reserve_and_notifies() {
        let fx = fixture(Config::new(UserId::new(ADMIN))).await;
        let customer = alice(&fx.store).await;
        let order = fx
            .manager
            .submit(&customer, draft(OrderSide::Buy, "30"), proof())
            .await
            .unwrap();
        fx.transport.clear().await;

        let outcome = fx.manager.decide(&order.id, Decision::Confirm).await.unwrap();
        assert!(matches!(outcome, DecideOutcome::Applied(_)));

        let stored = fx.store.order(&order.id).await.unwrap().unwrap();
        assert_eq!(stored.status, OrderStatus::Confirmed);
        assert_eq!(
            fx.store.reserve("USDT").await.unwrap(),
            Balance::parse("70").unwrap()
        );

        let notices = fx.transport.sent_to(UserId::new(ALICE)).await;
        assert_eq!(notices.len(), 1);
        assert!(notices[0].text.contains("confirmed"));
    }

    #[tokio::test]
    async fn test_double_confirm_debits_once() {
        let fx = fixture(Config::new(UserId::new(ADMIN))).await;
        let customer = alice(&fx.store).await;
        let order = fx
            .manager
            .submit(&customer, draft(OrderSide::Buy, "30"), proof())
            .await
            .unwrap();

        fx.manager.decide(&order.id, Decision::Confirm).await.unwrap();
        let replay = fx.manager.decide(&order.id, Decision::Confirm).await.unwrap();

        assert!(matches!(replay, DecideOutcome::AlreadyDecided(_)));
        assert_eq!(
            fx.store.reserve("USDT").await.unwrap(),
            Balance::parse("70").unwrap()
        );
    }

    #[tokio::test]
    async fn test_reject_leaves_reserve_alone() {
        let fx = fixture(Config::new(UserId::new(ADMIN))).await;
        let customer = alice(&fx.store).await;
        let order = fx
            .manager
            .submit(&customer, draft(OrderSide::Buy, "30"), proof())
            .await
            .unwrap();
        fx.transport.clear().await;

        fx.manager.decide(&order.id, Decision::Reject).await.unwrap();

        assert_eq!(
            fx.store.reserve("USDT").await.unwrap(),
            Balance::parse("100").unwrap()
        );
        let notices = fx.transport.sent_to(UserId::new(ALICE)).await;
        assert!(notices[0].text.contains("rejected"));
    }

    #[tokio::test]
    async fn test_confirm_clamps_overdrawn_reserve_at_zero() {
        let fx = fixture(Config::new(UserId::new(ADMIN))).await;
        let customer = alice(&fx.store).await;
        let order = fx
            .manager
            .submit(&customer, draft(OrderSide::Buy, "90"), proof())
            .await
            .unwrap();
        // Reserve shrank between submission and the decision.
        fx.store
            .set_reserve("USDT", Balance::parse("50").unwrap())
            .await
            .unwrap();

        fx.manager.decide(&order.id, Decision::Confirm).await.unwrap();
        assert_eq!(fx.store.reserve("USDT").await.unwrap(), Balance::ZERO);
    }

    #[tokio::test]
    async fn test_confirm_sell_credits_only_when_enabled() {
        let mut config = Config::new(UserId::new(ADMIN));
        config.credit_sell_reserve = true;
        let fx = fixture(config).await;
        let customer = alice(&fx.store).await;
        let order = fx
            .manager
            .submit(&customer, draft(OrderSide::Sell, "25"), proof())
            .await
            .unwrap();

        fx.manager.decide(&order.id, Decision::Confirm).await.unwrap();
        assert_eq!(
            fx.store.reserve("USDT").await.unwrap(),
            Balance::parse("125").unwrap()
        );

        // Default config: sell confirmation leaves the reserve alone.
        let fx = fixture(Config::new(UserId::new(ADMIN))).await;
        let customer = alice(&fx.store).await;
        let order = fx
            .manager
            .submit(&customer, draft(OrderSide::Sell, "25"), proof())
            .await
            .unwrap();
        fx.manager.decide(&order.id, Decision::Confirm).await.unwrap();
        assert_eq!(
            fx.store.reserve("USDT").await.unwrap(),
            Balance::parse("100").unwrap()
        );
    }

    #[tokio::test]
    async fn test_decide_unknown_order() {
        let fx = fixture(Config::new(UserId::new(ADMIN))).await;
        let err = fx
            .manager
            .decide(&OrderId::new("missing"), Decision::Confirm)
            .await
            .unwrap_err();
        assert!(matches!(err, ExchangeError::OrderNotFound(_)));
    }

    #[tokio::test]
    async fn test_failed_customer_notice_does_not_fail_decision() {
        let fx = fixture(Config::new(UserId::new(ADMIN))).await;
        let customer = alice(&fx.store).await;
        let order = fx
            .manager
            .submit(&customer, draft(OrderSide::Buy, "30"), proof())
            .await
            .unwrap();
        fx.transport.fail_user(UserId::new(ALICE)).await;

        let outcome = fx.manager.decide(&order.id, Decision::Confirm).await.unwrap();
        assert!(matches!(outcome, DecideOutcome::Applied(_)));
        assert_eq!(
            fx.store.reserve("USDT").await.unwrap(),
            Balance::parse("70").unwrap()
        );
    }

    #[tokio::test]
    async fn test_channel_announcement_and_failure_alert() {
        let mut config = Config::new(UserId::new(ADMIN));
        config.channel = Some("exchange_feed".to_string());
        let fx = fixture(config.clone()).await;
        let customer = alice(&fx.store).await;
        let order = fx
            .manager
            .submit(&customer, draft(OrderSide::Buy, "30"), proof())
            .await
            .unwrap();
        fx.transport.clear().await;

        fx.manager.decide(&order.id, Decision::Confirm).await.unwrap();
        let sent = fx.transport.sent().await;
        let announcement = sent
            .iter()
            .find(|m| m.to == Recipient::Channel("exchange_feed".to_string()))
            .expect("channel announcement");
        assert!(announcement.text.contains("Alice bought 30 USDT"));

        // Same decision with the channel down alerts the operator instead.
        let fx = fixture(config).await;
        let customer = alice(&fx.store).await;
        let order = fx
            .manager
            .submit(&customer, draft(OrderSide::Buy, "30"), proof())
            .await
            .unwrap();
        fx.transport.clear().await;
        fx.transport.fail_channel();

        let outcome = fx.manager.decide(&order.id, Decision::Confirm).await.unwrap();
        assert!(matches!(outcome, DecideOutcome::Applied(_)));
        let alerts = fx.transport.sent_to(UserId::new(ADMIN)).await;
        assert!(alerts.iter().any(|m| m.text.contains("Failed to announce")));
    }
}
