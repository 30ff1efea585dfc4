use crate::application::admin::AdminController;
use crate::application::orders::{DecideOutcome, OrderManager};
use crate::config::Config;
use crate::dialog::effect::Effect;
use crate::dialog::event::{Inbound, MessageBody};
use crate::dialog::state::Session;
use crate::dialog::transition::{StepCtx, step};
use crate::dialog::{menu, views};
use crate::domain::media::MediaRef;
use crate::domain::order::{Decision, OrderDraft, OrderId};
use crate::domain::ports::{Keyboard, Profile, Recipient, RecordStoreRef, TransportRef};
use crate::domain::user::{User, UserId};
use crate::error::{ExchangeError, Result};
use std::collections::HashMap;
use tokio::sync::Mutex;
use tracing::{info, warn};

/// The main entry point of the bot core.
///
/// `Dispatcher` owns the per-user session table and wires the pure dialog
/// transition to the record store and the transport. Updates are handled one
/// at a time: the session lock is held for the whole dispatch, so every
/// handler runs to completion before the next update is interpreted, which
/// is the consistency model the record store expects.
pub struct Dispatcher {
    store: RecordStoreRef,
    transport: TransportRef,
    config: Config,
    orders: OrderManager,
    admin: AdminController,
    sessions: Mutex<HashMap<i64, Session>>,
}

impl Dispatcher {
    pub fn new(store: RecordStoreRef, transport: TransportRef, config: Config) -> Self {
        let orders = OrderManager::new(store.clone(), transport.clone(), config.clone());
        let admin = AdminController::new(store.clone(), transport.clone());
        Self {
            store,
            transport,
            config,
            orders,
            admin,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    /// Handles one inbound message: registers the sender on first contact,
    /// advances their dialog, executes the effects, and commits the next
    /// session state.
    pub async fn on_message(&self, inbound: Inbound) -> Result<()> {
        let mut sessions = self.sessions.lock().await;

        let customer = self.ensure_user(inbound.from).await?;

        let currencies = self.store.currencies().await?;
        let reserves = self.store.reserves().await?;
        let users = self.store.users().await?;
        let orders = self.store.orders().await?;
        let card_balance = self.store.card_balance().await?;
        let guide = self.store.guide().await?;

        let ctx = StepCtx {
            currencies: &currencies,
            reserves: &reserves,
            users: &users,
            orders: &orders,
            card_balance,
            guide: &guide,
            hours: self.config.hours,
            utc_offset_hours: self.config.utc_offset_hours,
            is_admin: self.config.is_admin(inbound.from),
            open_now: self.config.open_now(),
        };

        let session = sessions.get(&inbound.from.as_i64()).cloned();
        let outcome = step(session.as_ref(), &ctx, &inbound);

        // Effects can veto the transition's target state: a submit that
        // fails validation sends the user back to the offending step.
        let mut next = outcome.next;
        for effect in outcome.effects {
            if let Some(forced) = self.run_effect(&inbound, &customer, effect).await? {
                next = Some(forced);
            }
        }

        match next {
            Some(state) => {
                sessions.insert(inbound.from.as_i64(), state);
            }
            None => {
                sessions.remove(&inbound.from.as_i64());
            }
        }
        Ok(())
    }

    /// Handles an inline button press and returns the acknowledgement line
    /// shown to the operator. All button payloads are operator-only.
    pub async fn on_callback(&self, from: UserId, payload: &str) -> Result<String> {
        let mut sessions = self.sessions.lock().await;
        if !self.config.is_admin(from) {
            warn!(user = %from, payload, "callback from non-admin ignored");
            return Ok("Not allowed.".to_string());
        }
        let parts: Vec<&str> = payload.split('|').collect();
        match parts.as_slice() {
            [menu::DECISION_PREFIX, action, id] => {
                if let Some(decision) = Decision::parse(action) {
                    self.decide(&OrderId::new(*id), decision).await
                } else if *action == "message_user" {
                    self.start_reply(&mut sessions, from, id).await
                } else {
                    Ok("Unknown action.".to_string())
                }
            }
            [menu::REPLY_PREFIX, id] => self.start_reply(&mut sessions, from, id).await,
            _ => Ok("Unknown action.".to_string()),
        }
    }

    /// Loads the sender's record, creating it on first contact. New users
    /// are announced to the operator, best effort.
    async fn ensure_user(&self, id: UserId) -> Result<User> {
        if let Some(user) = self.store.user(id).await? {
            return Ok(user);
        }
        let profile = match self.transport.profile(id).await {
            Ok(profile) => profile,
            Err(err) => {
                warn!(user = %id, error = %err, "profile lookup failed");
                Profile {
                    name: format!("User {}", id.as_i64()),
                    username: None,
                }
            }
        };
        let user = User::new(id, profile.name, profile.username);
        self.store.put_user(user.clone()).await?;
        info!(user = %id, "new user registered");
        if !self.config.is_admin(id) {
            let note = views::new_subscriber(&user.name, user.id.as_i64());
            if let Err(err) = self
                .transport
                .send_text(Recipient::User(self.config.admin), &note, None)
                .await
            {
                warn!(error = %err, "new subscriber note failed");
            }
        }
        Ok(user)
    }

    /// Executes one effect. Returns a session to force when the effect's
    /// outcome overrides the transition's target.
    async fn run_effect(
        &self,
        inbound: &Inbound,
        customer: &User,
        effect: Effect,
    ) -> Result<Option<Session>> {
        let from = inbound.from;
        match effect {
            Effect::Reply { text, keyboard } => {
                self.reply(from, &text, keyboard).await;
                Ok(None)
            }
            Effect::SendGuide => {
                self.send_guide(from).await?;
                Ok(None)
            }
            Effect::SubmitOrder { draft, proof } => {
                self.submit_order(from, customer, draft, proof).await
            }
            Effect::ContactAdmin { body } => {
                self.contact_admin(from, customer, body).await;
                Ok(None)
            }
            Effect::DirectMessage { to, body } => {
                self.direct_message(from, to, body).await;
                Ok(None)
            }
            Effect::Broadcast { scope, body } => {
                let line = self.admin.broadcast(scope, &body).await?;
                self.finish_admin(from, line).await;
                Ok(None)
            }
            Effect::CreateCurrency { code, currency } => {
                let line = self.admin.create_currency(code, currency).await?;
                self.finish_admin(from, line).await;
                Ok(None)
            }
            Effect::UpdateCurrency { code, change } => {
                let line = self.admin.update_currency(&code, change).await?;
                self.finish_admin(from, line).await;
                Ok(None)
            }
            Effect::DeleteCurrency { code } => {
                let line = self.admin.delete_currency(&code).await?;
                self.finish_admin(from, line).await;
                Ok(None)
            }
            Effect::SetReserve { code, balance } => {
                let line = self.admin.set_reserve(&code, balance).await?;
                self.finish_admin(from, line).await;
                Ok(None)
            }
            Effect::SetCardBalance { balance } => {
                let line = self.admin.set_card_balance(balance).await?;
                self.finish_admin(from, line).await;
                Ok(None)
            }
            Effect::SetGuide { guide } => {
                let line = self.admin.set_guide(guide).await?;
                self.finish_admin(from, line).await;
                Ok(None)
            }
        }
    }

    /// Replies are best effort: a failed send is logged, never fatal.
    async fn reply(&self, to: UserId, text: &str, keyboard: Option<Keyboard>) {
        if let Err(err) = self
            .transport
            .send_text(Recipient::User(to), text, keyboard)
            .await
        {
            warn!(user = %to, error = %err, "reply failed");
        }
    }

    /// Outcome line after an admin workflow; the session is idle again, so
    /// the main menu comes with it.
    async fn finish_admin(&self, to: UserId, line: String) {
        self.reply(to, &line, Some(menu::main_menu(self.config.is_admin(to))))
            .await;
    }

    async fn send_guide(&self, to: UserId) -> Result<()> {
        let guide = self.store.guide().await?;
        match &guide.video {
            Some(video) => {
                let sent = self
                    .transport
                    .send_media(Recipient::User(to), video, &guide.text, None)
                    .await;
                if let Err(err) = sent {
                    warn!(user = %to, error = %err, "guide video send failed, sending text");
                    self.reply(to, &guide.text, None).await;
                }
            }
            None => self.reply(to, &guide.text, None).await,
        }
        Ok(())
    }

    async fn submit_order(
        &self,
        from: UserId,
        customer: &User,
        draft: OrderDraft,
        proof: MediaRef,
    ) -> Result<Option<Session>> {
        match self.orders.submit(customer, draft.clone(), proof).await {
            Ok(_) => {
                self.reply(
                    from,
                    "Receipt forwarded to the operator.",
                    Some(menu::main_menu(self.config.is_admin(from))),
                )
                .await;
                Ok(None)
            }
            Err(ExchangeError::InsufficientReserve { available, .. }) => {
                let text = format!(
                    "Insufficient reserve. Available: {}",
                    views::group_thousands(available)
                );
                self.reply(from, &text, Some(menu::cancel_only())).await;
                Ok(Some(Session::OrderAmount {
                    side: draft.side,
                    currency: draft.currency,
                }))
            }
            Err(ExchangeError::CurrencyNotFound(_)) => {
                self.reply(
                    from,
                    "This currency is no longer available.",
                    Some(menu::main_menu(self.config.is_admin(from))),
                )
                .await;
                Ok(None)
            }
            Err(ExchangeError::Notification(err)) => {
                warn!(user = %from, error = %err, "operator handoff failed");
                self.reply(
                    from,
                    "Could not reach the operator. Please send the receipt again.",
                    Some(menu::cancel_only()),
                )
                .await;
                Ok(Some(Session::OrderReceipt { draft }))
            }
            Err(other) if other.is_persistence() => {
                warn!(user = %from, error = %other, "order commit failed");
                self.reply(
                    from,
                    "Something went wrong saving your order. Please send the receipt again.",
                    Some(menu::cancel_only()),
                )
                .await;
                Ok(Some(Session::OrderReceipt { draft }))
            }
            Err(other) => Err(other),
        }
    }

    async fn contact_admin(&self, from: UserId, customer: &User, body: MessageBody) {
        let admin = Recipient::User(self.config.admin);
        let keyboard = Some(menu::reply_button(from));
        let sent = match &body {
            MessageBody::Text(text) => {
                let caption =
                    views::support_caption(&customer.handle(), from.as_i64(), Some(text));
                self.transport.send_text(admin, &caption, keyboard).await
            }
            MessageBody::Media { media, caption } => {
                let caption =
                    views::support_caption(&customer.handle(), from.as_i64(), caption.as_deref());
                self.transport
                    .send_media(admin, media, &caption, keyboard)
                    .await
            }
        };
        let kb = Some(menu::main_menu(self.config.is_admin(from)));
        match sent {
            Ok(()) => {
                self.reply(from, "Your message has been sent to the operator.", kb)
                    .await;
            }
            Err(err) => {
                warn!(user = %from, error = %err, "support relay failed");
                self.reply(from, "Could not reach the operator. Please try again.", kb)
                    .await;
            }
        }
    }

    async fn direct_message(&self, from: UserId, to: UserId, body: MessageBody) {
        let recipient = Recipient::User(to);
        let sent = match &body {
            MessageBody::Text(text) => {
                let text = format!("Reply from the operator:\n{text}");
                self.transport.send_text(recipient, &text, None).await
            }
            MessageBody::Media { media, caption } => {
                self.transport
                    .send_media(
                        recipient,
                        media,
                        caption.as_deref().unwrap_or("Reply from the operator."),
                        None,
                    )
                    .await
            }
        };
        let kb = Some(menu::main_menu(self.config.is_admin(from)));
        match sent {
            Ok(()) => self.reply(from, "Message delivered.", kb).await,
            Err(err) => {
                warn!(user = %to, error = %err, "operator reply failed");
                self.reply(from, "Could not deliver the message.", kb).await;
            }
        }
    }

    async fn decide(&self, id: &OrderId, decision: Decision) -> Result<String> {
        match self.orders.decide(id, decision).await {
            Ok(DecideOutcome::Applied(_)) => Ok(match decision {
                Decision::Confirm => "Confirmed.".to_string(),
                Decision::Reject => "Rejected.".to_string(),
            }),
            Ok(DecideOutcome::AlreadyDecided(_)) => Ok("Already decided.".to_string()),
            Err(ExchangeError::OrderNotFound(_)) => Ok("Order not found.".to_string()),
            Err(other) => Err(other),
        }
    }

    async fn start_reply(
        &self,
        sessions: &mut HashMap<i64, Session>,
        admin: UserId,
        raw_id: &str,
    ) -> Result<String> {
        let Ok(id) = raw_id.trim().parse::<i64>() else {
            return Ok("Unknown action.".to_string());
        };
        sessions.insert(
            admin.as_i64(),
            Session::ReplyCompose {
                to: UserId::new(id),
            },
        );
        self.reply(
            admin,
            "Type your reply (it will be forwarded):",
            Some(menu::cancel_only()),
        )
        .await;
        Ok("Reply mode.".to_string())
    }
}
