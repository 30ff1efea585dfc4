use crate::dialog::event::MessageBody;
use crate::dialog::state::BroadcastScope;
use crate::dialog::views;
use crate::domain::currency::{Currency, CurrencyCode, FieldChange};
use crate::domain::money::Balance;
use crate::domain::ports::{Guide, Recipient, RecordStoreRef, TransportRef};
use crate::domain::user::UserId;
use crate::error::Result;
use tracing::{info, warn};

/// Record administration: everything behind the admin panel.
///
/// Each method applies one mutation and returns the operator-facing outcome
/// line; `Err` is reserved for storage failures. Validation already done by
/// the dialog is repeated here where records can change between the prompt
/// and the answer.
pub struct AdminController {
    store: RecordStoreRef,
    transport: TransportRef,
}

impl AdminController {
    pub fn new(store: RecordStoreRef, transport: TransportRef) -> Self {
        Self { store, transport }
    }

    pub async fn create_currency(&self, code: CurrencyCode, currency: Currency) -> Result<String> {
        if self.store.insert_currency(code.as_str(), currency).await? {
            info!(code = %code, "currency added");
            Ok(format!("Currency {code} added."))
        } else {
            Ok("This currency already exists.".to_string())
        }
    }

    pub async fn update_currency(&self, code: &str, change: FieldChange) -> Result<String> {
        let Some(mut currency) = self.store.currency(code).await? else {
            return Ok("This currency is no longer available.".to_string());
        };
        let field = change.field().label();
        change.apply(&mut currency);
        self.store.put_currency(code, currency).await?;
        info!(code, field, "currency updated");
        Ok(format!("Currency {code} updated."))
    }

    pub async fn delete_currency(&self, code: &str) -> Result<String> {
        if self.store.remove_currency(code).await? {
            info!(code, "currency removed");
            Ok(format!("Currency {code} removed."))
        } else {
            Ok("No such currency.".to_string())
        }
    }

    /// Absolute overwrite; reserves never move by deltas from the panel.
    pub async fn set_reserve(&self, code: &str, balance: Balance) -> Result<String> {
        if self.store.currency(code).await?.is_none() {
            return Ok("This currency is no longer available.".to_string());
        }
        self.store.set_reserve(code, balance).await?;
        Ok(format!(
            "Reserve for {code} set to {}.",
            views::group_thousands(balance.value())
        ))
    }

    pub async fn set_card_balance(&self, balance: Balance) -> Result<String> {
        self.store.set_card_balance(balance).await?;
        Ok(format!(
            "Card balance set to {} UZS.",
            views::group_thousands(balance.value())
        ))
    }

    pub async fn set_guide(&self, guide: Guide) -> Result<String> {
        let cleared = guide.is_empty();
        self.store.set_guide(guide).await?;
        Ok(if cleared {
            "The guide has been removed.".to_string()
        } else {
            "The guide has been updated.".to_string()
        })
    }

    /// Sends a message to one user or to everyone on record. The loop keeps
    /// going past individual failures and reports aggregate counts.
    pub async fn broadcast(&self, scope: BroadcastScope, body: &MessageBody) -> Result<String> {
        match scope {
            BroadcastScope::Single(id) => {
                if self.store.user(id).await?.is_none() {
                    return Ok("No such user.".to_string());
                }
                match self.deliver(id, body).await {
                    Ok(()) => Ok("Message delivered.".to_string()),
                    Err(err) => {
                        warn!(user = %id, error = %err, "broadcast delivery failed");
                        Ok("Could not deliver the message.".to_string())
                    }
                }
            }
            BroadcastScope::All => {
                let users = self.store.users().await?;
                let mut sent = 0usize;
                let mut failed = 0usize;
                for user in users.values() {
                    match self.deliver(user.id, body).await {
                        Ok(()) => sent += 1,
                        Err(err) => {
                            warn!(user = %user.id, error = %err, "broadcast delivery failed");
                            failed += 1;
                        }
                    }
                }
                Ok(format!("Delivered to {sent} users ({failed} failed)."))
            }
        }
    }

    async fn deliver(&self, to: UserId, body: &MessageBody) -> Result<()> {
        let to = Recipient::User(to);
        match body {
            MessageBody::Text(text) => self.transport.send_text(to, text, None).await,
            MessageBody::Media { media, caption } => {
                self.transport
                    .send_media(to, media, caption.as_deref().unwrap_or(""), None)
                    .await
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::media::{MediaKind, MediaRef};
    use crate::domain::ports::RecordStore;
    use crate::domain::user::User;
    use crate::infrastructure::in_memory::{InMemoryStore, InMemoryTransport};
    use rust_decimal_macros::dec;
    use std::sync::Arc;

    fn usdt() -> Currency {
        Currency {
            name: "Tether".to_string(),
            buy_rate: dec!(12600),
            sell_rate: dec!(12800),
            buy_card: "8600 1111".to_string(),
            sell_card: "8600 2222".to_string(),
        }
    }

    fn controller() -> (Arc<InMemoryStore>, Arc<InMemoryTransport>, AdminController) {
        let store = Arc::new(InMemoryStore::new());
        let transport = Arc::new(InMemoryTransport::new());
        let controller = AdminController::new(store.clone(), transport.clone());
        (store, transport, controller)
    }

    #[tokio::test]
    async fn test_create_currency_reports_duplicates() {
        let (store, _, admin) = controller();
        let code = CurrencyCode::new("USDT").unwrap();

        let first = admin.create_currency(code.clone(), usdt()).await.unwrap();
        assert_eq!(first, "Currency USDT added.");
        assert_eq!(store.reserve("USDT").await.unwrap(), Balance::ZERO);

        let second = admin.create_currency(code, usdt()).await.unwrap();
        assert_eq!(second, "This currency already exists.");
    }

    #[tokio::test]
    async fn test_update_currency_applies_field_change() {
        let (store, _, admin) = controller();
        store.insert_currency("USDT", usdt()).await.unwrap();

        let line = admin
            .update_currency("USDT", FieldChange::BuyRate(dec!(12700)))
            .await
            .unwrap();
        assert_eq!(line, "Currency USDT updated.");
        assert_eq!(
            store.currency("USDT").await.unwrap().unwrap().buy_rate,
            dec!(12700)
        );

        let gone = admin
            .update_currency("GONE", FieldChange::Name("X".to_string()))
            .await
            .unwrap();
        assert_eq!(gone, "This currency is no longer available.");
    }

    #[tokio::test]
    async fn test_delete_currency() {
        let (store, _, admin) = controller();
        store.insert_currency("USDT", usdt()).await.unwrap();

        assert_eq!(
            admin.delete_currency("USDT").await.unwrap(),
            "Currency USDT removed."
        );
        assert_eq!(admin.delete_currency("USDT").await.unwrap(), "No such currency.");
    }

    #[tokio::test]
    async fn test_set_reserve_requires_live_currency() {
        let (store, _, admin) = controller();
        store.insert_currency("USDT", usdt()).await.unwrap();

        let line = admin
            .set_reserve("USDT", Balance::parse("150").unwrap())
            .await
            .unwrap();
        assert_eq!(line, "Reserve for USDT set to 150.");

        let gone = admin
            .set_reserve("GONE", Balance::ZERO)
            .await
            .unwrap();
        assert_eq!(gone, "This currency is no longer available.");
    }

    #[tokio::test]
    async fn test_guide_set_and_clear_lines() {
        let (store, _, admin) = controller();

        let set = admin
            .set_guide(Guide {
                video: Some(MediaRef::new(MediaKind::Video, "v-1")),
                text: "watch".to_string(),
            })
            .await
            .unwrap();
        assert_eq!(set, "The guide has been updated.");
        assert!(!store.guide().await.unwrap().is_empty());

        let cleared = admin.set_guide(Guide::default()).await.unwrap();
        assert_eq!(cleared, "The guide has been removed.");
        assert!(store.guide().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_broadcast_single_checks_user() {
        let (store, transport, admin) = controller();
        store
            .put_user(User::new(UserId::new(7), "Alice", None))
            .await
            .unwrap();

        let unknown = admin
            .broadcast(
                BroadcastScope::Single(UserId::new(999)),
                &MessageBody::Text("hi".to_string()),
            )
            .await
            .unwrap();
        assert_eq!(unknown, "No such user.");

        let known = admin
            .broadcast(
                BroadcastScope::Single(UserId::new(7)),
                &MessageBody::Text("hi".to_string()),
            )
            .await
            .unwrap();
        assert_eq!(known, "Message delivered.");
        assert_eq!(transport.sent_to(UserId::new(7)).await.len(), 1);
    }

    #[tokio::test]
    async fn test_broadcast_all_continues_past_failures() {
        let (store, transport, admin) = controller();
        for id in [7, 8, 9] {
            store
                .put_user(User::new(UserId::new(id), format!("U{id}"), None))
                .await
                .unwrap();
        }
        transport.fail_user(UserId::new(8)).await;

        let line = admin
            .broadcast(BroadcastScope::All, &MessageBody::Text("news".to_string()))
            .await
            .unwrap();
        assert_eq!(line, "Delivered to 2 users (1 failed).");
        assert_eq!(transport.sent_to(UserId::new(7)).await.len(), 1);
        assert_eq!(transport.sent_to(UserId::new(9)).await.len(), 1);
    }

    #[tokio::test]
    async fn test_broadcast_media_body() {
        let (store, transport, admin) = controller();
        store
            .put_user(User::new(UserId::new(7), "Alice", None))
            .await
            .unwrap();

        admin
            .broadcast(
                BroadcastScope::Single(UserId::new(7)),
                &MessageBody::Media {
                    media: MediaRef::new(MediaKind::Photo, "promo-1"),
                    caption: Some("new rates".to_string()),
                },
            )
            .await
            .unwrap();

        let sent = transport.sent_to(UserId::new(7)).await;
        assert_eq!(sent[0].text, "new rates");
        assert_eq!(sent[0].media.as_ref().unwrap().file_id, "promo-1");
    }
}
