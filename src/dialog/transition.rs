//! Pure dialog transition function: `(session, world, message) -> (next
//! session, effects)`. No I/O happens here; the dispatcher executes the
//! effects and owns the session table. Given the same inputs the function
//! always produces the same outcome, which is what makes every workflow
//! walkable in plain unit tests.

use crate::config::OpenHours;
use crate::dialog::effect::Effect;
use crate::dialog::event::{Inbound, MessageBody};
use crate::dialog::menu;
use crate::dialog::state::{BroadcastScope, Session};
use crate::dialog::views;
use crate::domain::currency::{Currency, CurrencyCode, CurrencyField, FieldChange};
use crate::domain::media::MediaKind;
use crate::domain::money::{Amount, Balance};
use crate::domain::order::{OrderDraft, OrderSide};
use crate::domain::ports::{CurrencyMap, Guide, Keyboard, OrderMap, ReserveMap, UserMap};
use crate::domain::user::UserId;
use rust_decimal::Decimal;

/// Read-only world snapshot consulted during a step. The dispatcher loads
/// it from the record store before calling [`step`]; tests build it by hand.
pub struct StepCtx<'a> {
    pub currencies: &'a CurrencyMap,
    pub reserves: &'a ReserveMap,
    pub users: &'a UserMap,
    pub orders: &'a OrderMap,
    pub card_balance: Balance,
    pub guide: &'a Guide,
    pub hours: Option<OpenHours>,
    pub utc_offset_hours: i32,
    pub is_admin: bool,
    pub open_now: bool,
}

/// Result of one step: the session to keep (`None` is idle) plus the
/// effects the runtime must execute.
#[derive(Debug)]
pub struct StepOutcome {
    pub next: Option<Session>,
    pub effects: Vec<Effect>,
}

impl StepOutcome {
    pub fn idle() -> Self {
        Self {
            next: None,
            effects: vec![],
        }
    }

    pub fn goto(next: Session) -> Self {
        Self {
            next: Some(next),
            effects: vec![],
        }
    }

    pub fn with_effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }

    pub fn with_reply(self, text: impl Into<String>) -> Self {
        self.with_effect(Effect::reply(text))
    }

    pub fn with_reply_kb(self, text: impl Into<String>, keyboard: Keyboard) -> Self {
        self.with_effect(Effect::reply_with(text, keyboard))
    }
}

fn stay(session: &Session) -> StepOutcome {
    StepOutcome::goto(session.clone())
}

fn is_cancel(body: &MessageBody) -> bool {
    body.as_text()
        .map(str::trim)
        .is_some_and(|text| text == menu::CANCEL || text == "/cancel")
}

/// Advances one user's dialog by one inbound message.
///
/// Cancellation is checked before any state-specific handling, so every
/// state can be abandoned. An idle user pressing cancel just falls through
/// to the unknown-command reply.
pub fn step(session: Option<&Session>, ctx: &StepCtx<'_>, inbound: &Inbound) -> StepOutcome {
    if session.is_some() && is_cancel(&inbound.body) {
        return StepOutcome::idle().with_reply_kb("Cancelled.", menu::main_menu(ctx.is_admin));
    }
    match session {
        None => idle_step(ctx, inbound),
        Some(active) => active_step(active, ctx, inbound),
    }
}

fn unknown(ctx: &StepCtx<'_>) -> StepOutcome {
    StepOutcome::idle().with_reply_kb("Unknown command.", menu::main_menu(ctx.is_admin))
}

fn idle_step(ctx: &StepCtx<'_>, inbound: &Inbound) -> StepOutcome {
    let Some(text) = inbound.body.as_text().map(str::trim) else {
        return unknown(ctx);
    };
    match text {
        "/start" | "/help" => {
            let name = ctx
                .users
                .get(&inbound.from.key())
                .map_or("there", |user| user.name.as_str());
            StepOutcome::idle()
                .with_reply_kb(views::greeting(name), menu::main_menu(ctx.is_admin))
        }
        menu::BUY => start_order(ctx, OrderSide::Buy),
        menu::SELL => start_order(ctx, OrderSide::Sell),
        menu::BUY_RATES => StepOutcome::idle().with_reply_kb(
            views::rate_board(OrderSide::Buy, ctx.currencies),
            menu::main_menu(ctx.is_admin),
        ),
        menu::SELL_RATES => StepOutcome::idle().with_reply_kb(
            views::rate_board(OrderSide::Sell, ctx.currencies),
            menu::main_menu(ctx.is_admin),
        ),
        menu::MY_ORDERS => {
            let history = ctx.users.get(&inbound.from.key()).map_or_else(
                || "You have no orders yet.".to_string(),
                |user| views::order_history(user, ctx.orders, ctx.utc_offset_hours),
            );
            StepOutcome::idle().with_reply_kb(history, menu::main_menu(ctx.is_admin))
        }
        menu::WORKING_HOURS => {
            StepOutcome::idle().with_reply(views::working_hours(ctx.hours))
        }
        menu::RESERVES => StepOutcome::idle()
            .with_reply(views::reserves_board(ctx.reserves, ctx.card_balance)),
        menu::GUIDE => {
            if ctx.guide.is_empty() {
                StepOutcome::idle().with_reply("The guide has not been added yet.")
            } else {
                StepOutcome::idle().with_effect(Effect::SendGuide)
            }
        }
        menu::CONTACT_ADMIN => StepOutcome::goto(Session::SupportCompose)
            .with_reply_kb("Send your message (text, photo or video):", menu::cancel_only()),
        menu::ADMIN_PANEL => {
            if ctx.is_admin {
                StepOutcome::goto(Session::AdminHome)
                    .with_reply_kb("Admin panel:", menu::admin_menu())
            } else {
                StepOutcome::idle().with_reply("You do not have admin rights.")
            }
        }
        _ => unknown(ctx),
    }
}

fn start_order(ctx: &StepCtx<'_>, side: OrderSide) -> StepOutcome {
    if !ctx.open_now
        && let Some(hours) = ctx.hours
    {
        return StepOutcome::idle().with_reply(views::closed_now(hours));
    }
    // Buy listings hide currencies with nothing in stock; sell lists all.
    let codes: Vec<&String> = match side {
        OrderSide::Buy => ctx
            .currencies
            .keys()
            .filter(|code| {
                ctx.reserves
                    .get(code.as_str())
                    .is_some_and(|balance| balance.value() > Decimal::ZERO)
            })
            .collect(),
        OrderSide::Sell => ctx.currencies.keys().collect(),
    };
    if codes.is_empty() {
        let text = match side {
            OrderSide::Buy => "No currencies are in stock right now.",
            OrderSide::Sell => "No currencies available yet.",
        };
        return StepOutcome::idle().with_reply(text);
    }
    let prompt = match side {
        OrderSide::Buy => "Which currency do you want to buy?",
        OrderSide::Sell => "Which currency do you want to sell?",
    };
    StepOutcome::goto(Session::PickOrderCurrency { side })
        .with_reply_kb(prompt, menu::currency_rows(codes.into_iter()))
}

/// The dialog references a currency an admin has deleted in the meantime.
fn currency_vanished(ctx: &StepCtx<'_>) -> StepOutcome {
    StepOutcome::idle().with_reply_kb(
        "This currency is no longer available.",
        menu::main_menu(ctx.is_admin),
    )
}

fn active_step(session: &Session, ctx: &StepCtx<'_>, inbound: &Inbound) -> StepOutcome {
    match session {
        Session::PickOrderCurrency { side } => {
            let Some(text) = inbound.body.as_text().map(str::trim) else {
                return stay(session).with_reply("Pick a currency from the keyboard.");
            };
            // Exact, case-sensitive: the keyboard enumerates the codes.
            if !ctx.currencies.contains_key(text) {
                return stay(session).with_reply("No such currency.");
            }
            StepOutcome::goto(Session::OrderAmount {
                side: *side,
                currency: text.to_string(),
            })
            .with_reply_kb("Enter the amount:", menu::cancel_only())
        }

        Session::OrderAmount { side, currency } => {
            if !ctx.currencies.contains_key(currency) {
                return currency_vanished(ctx);
            }
            let amount = match inbound.body.as_text().map(Amount::parse) {
                Some(Ok(amount)) => amount,
                _ => return stay(session).with_reply("Please enter a valid amount."),
            };
            if *side == OrderSide::Buy {
                let available = ctx
                    .reserves
                    .get(currency.as_str())
                    .copied()
                    .unwrap_or(Balance::ZERO);
                if !available.covers(amount) {
                    return stay(session).with_reply(format!(
                        "Insufficient reserve. Available: {}",
                        views::group_thousands(available.value())
                    ));
                }
            }
            StepOutcome::goto(Session::OrderWallet {
                side: *side,
                currency: currency.clone(),
                amount,
            })
            .with_reply_kb("Enter your wallet or card number:", menu::cancel_only())
        }

        Session::OrderWallet {
            side,
            currency,
            amount,
        } => {
            let Some(info) = ctx.currencies.get(currency) else {
                return currency_vanished(ctx);
            };
            let wallet = match inbound.body.as_text().map(str::trim) {
                Some(wallet) if !wallet.is_empty() => wallet.to_string(),
                _ => return stay(session).with_reply("Enter your wallet or card number:"),
            };
            let details = views::payment_details(currency, info, *side, *amount);
            StepOutcome::goto(Session::OrderReview {
                draft: OrderDraft {
                    side: *side,
                    currency: currency.clone(),
                    amount: *amount,
                    wallet,
                },
            })
            .with_reply_kb(details, menu::receipt_prompt())
        }

        Session::OrderReview { draft } => {
            if inbound.body.as_text().map(str::trim) == Some(menu::SEND_RECEIPT) {
                StepOutcome::goto(Session::OrderReceipt {
                    draft: draft.clone(),
                })
                .with_reply_kb("Upload the receipt (photo or document):", menu::cancel_only())
            } else {
                stay(session).with_reply(format!("Please press '{}'.", menu::SEND_RECEIPT))
            }
        }

        Session::OrderReceipt { draft } => match &inbound.body {
            MessageBody::Media { media, .. } if media.is_receipt() => {
                // Terminal step: the order manager takes over. The session
                // ends here, so a replayed upload lands in idle and cannot
                // create a second order.
                StepOutcome::idle().with_effect(Effect::SubmitOrder {
                    draft: draft.clone(),
                    proof: media.clone(),
                })
            }
            _ => stay(session).with_reply("Please send a photo or document of the receipt."),
        },

        Session::SupportCompose => StepOutcome::idle().with_effect(Effect::ContactAdmin {
            body: inbound.body.clone(),
        }),

        Session::ReplyCompose { to } => StepOutcome::idle().with_effect(Effect::DirectMessage {
            to: *to,
            body: inbound.body.clone(),
        }),

        Session::AdminHome => admin_home(ctx, inbound),

        Session::NewCurrencyCode => {
            let code = match inbound.body.as_text().map(CurrencyCode::new) {
                Some(Ok(code)) => code,
                _ => return stay(session).with_reply("Enter the currency code (e.g. USDT):"),
            };
            if ctx.currencies.contains_key(code.as_str()) {
                return stay(session).with_reply("This currency already exists.");
            }
            let prompt = format!("Enter the full name for {code} (e.g. Tether):");
            StepOutcome::goto(Session::NewCurrencyName { code }).with_reply(prompt)
        }

        Session::NewCurrencyName { code } => {
            let name = match inbound.body.as_text().map(str::trim) {
                Some(name) if !name.is_empty() => name.to_string(),
                _ => return stay(session).with_reply("Enter a non-empty name."),
            };
            StepOutcome::goto(Session::NewCurrencyBuyRate {
                code: code.clone(),
                name,
            })
            .with_reply("At what rate do you buy? (UZS):")
        }

        Session::NewCurrencyBuyRate { code, name } => {
            match inbound.body.as_text().map(Amount::parse) {
                Some(Ok(rate)) => StepOutcome::goto(Session::NewCurrencySellRate {
                    code: code.clone(),
                    name: name.clone(),
                    buy_rate: rate.value(),
                })
                .with_reply("At what rate do you sell? (UZS):"),
                _ => stay(session).with_reply("Enter a number."),
            }
        }

        Session::NewCurrencySellRate {
            code,
            name,
            buy_rate,
        } => match inbound.body.as_text().map(Amount::parse) {
            Some(Ok(rate)) => StepOutcome::goto(Session::NewCurrencyBuyCard {
                code: code.clone(),
                name: name.clone(),
                buy_rate: *buy_rate,
                sell_rate: rate.value(),
            })
            .with_reply("Enter the card for buy orders:"),
            _ => stay(session).with_reply("Enter a number."),
        },

        Session::NewCurrencyBuyCard {
            code,
            name,
            buy_rate,
            sell_rate,
        } => {
            let card = match inbound.body.as_text().map(str::trim) {
                Some(card) if !card.is_empty() => card.to_string(),
                _ => return stay(session).with_reply("Enter the card for buy orders:"),
            };
            StepOutcome::goto(Session::NewCurrencySellCard {
                code: code.clone(),
                name: name.clone(),
                buy_rate: *buy_rate,
                sell_rate: *sell_rate,
                buy_card: card,
            })
            .with_reply("Now enter the card for sell orders:")
        }

        Session::NewCurrencySellCard {
            code,
            name,
            buy_rate,
            sell_rate,
            buy_card,
        } => {
            let card = match inbound.body.as_text().map(str::trim) {
                Some(card) if !card.is_empty() => card.to_string(),
                _ => return stay(session).with_reply("Now enter the card for sell orders:"),
            };
            StepOutcome::idle().with_effect(Effect::CreateCurrency {
                code: code.clone(),
                currency: Currency {
                    name: name.clone(),
                    buy_rate: *buy_rate,
                    sell_rate: *sell_rate,
                    buy_card: buy_card.clone(),
                    sell_card: card,
                },
            })
        }

        Session::EditPickCurrency => pick_currency(session, ctx, inbound, |code| {
            StepOutcome::goto(Session::EditPickField { code })
                .with_reply_kb("Which field do you want to edit?", menu::field_rows())
        }),

        Session::EditPickField { code } => {
            let field = match inbound.body.as_text().map(CurrencyField::parse_label) {
                Some(Some(field)) => field,
                _ => return stay(session).with_reply("Invalid choice."),
            };
            let prompt = format!("Enter the new value ({}):", field.label());
            StepOutcome::goto(Session::EditNewValue {
                code: code.clone(),
                field,
            })
            .with_reply_kb(prompt, menu::cancel_only())
        }

        Session::EditNewValue { code, field } => {
            let raw = inbound.body.as_text().unwrap_or_default();
            match FieldChange::parse(*field, raw) {
                Ok(change) => StepOutcome::idle().with_effect(Effect::UpdateCurrency {
                    code: code.clone(),
                    change,
                }),
                Err(_) if field.is_rate() => stay(session).with_reply("Enter a number."),
                Err(_) => stay(session).with_reply("Enter a non-empty value."),
            }
        }

        Session::DeletePick => pick_currency(session, ctx, inbound, |code| {
            StepOutcome::idle().with_effect(Effect::DeleteCurrency { code })
        }),

        Session::ReservePick => pick_currency(session, ctx, inbound, |code| {
            let prompt = format!("Enter the reserve amount for {code}:");
            StepOutcome::goto(Session::ReserveAmount { code })
                .with_reply_kb(prompt, menu::cancel_only())
        }),

        Session::ReserveAmount { code } => match inbound.body.as_text().map(Balance::parse) {
            Some(Ok(balance)) => StepOutcome::idle().with_effect(Effect::SetReserve {
                code: code.clone(),
                balance,
            }),
            _ => stay(session).with_reply("Please enter a valid amount."),
        },

        Session::CardBalanceAmount => match inbound.body.as_text().map(Balance::parse) {
            Some(Ok(balance)) => {
                StepOutcome::idle().with_effect(Effect::SetCardBalance { balance })
            }
            _ => stay(session).with_reply("Please enter a valid amount."),
        },

        Session::GuideVideo => match &inbound.body {
            MessageBody::Text(text) if text.trim().eq_ignore_ascii_case(menu::GUIDE_CLEAR) => {
                StepOutcome::idle().with_effect(Effect::SetGuide {
                    guide: Guide::default(),
                })
            }
            MessageBody::Media { media, .. } if media.kind == MediaKind::Video => {
                StepOutcome::goto(Session::GuideCaption {
                    video: media.clone(),
                })
                .with_reply("Now enter the caption for the video:")
            }
            _ => stay(session)
                .with_reply(format!("Send a video or type '{}'.", menu::GUIDE_CLEAR)),
        },

        Session::GuideCaption { video } => match inbound.body.as_text() {
            Some(text) => StepOutcome::idle().with_effect(Effect::SetGuide {
                guide: Guide {
                    video: Some(video.clone()),
                    text: text.trim().to_string(),
                },
            }),
            None => stay(session).with_reply("Enter a text caption:"),
        },

        Session::BroadcastAudience => match inbound.body.as_text().map(str::trim) {
            Some(menu::BROADCAST_SINGLE) => StepOutcome::goto(Session::BroadcastTarget)
                .with_reply_kb("Enter the user id:", menu::cancel_only()),
            Some(menu::BROADCAST_ALL) => StepOutcome::goto(Session::BroadcastPayload {
                scope: BroadcastScope::All,
            })
            .with_reply_kb("Send the message (text, photo or video):", menu::cancel_only()),
            _ => stay(session).with_reply("Invalid choice."),
        },

        Session::BroadcastTarget => {
            let id = match inbound.body.as_text().map(|t| t.trim().parse::<i64>()) {
                Some(Ok(id)) => id,
                _ => return stay(session).with_reply("Please enter a valid id."),
            };
            if !ctx.users.contains_key(&id.to_string()) {
                return stay(session).with_reply("No such user.");
            }
            StepOutcome::goto(Session::BroadcastPayload {
                scope: BroadcastScope::Single(UserId::new(id)),
            })
            .with_reply_kb("Send the message (text, photo or video):", menu::cancel_only())
        }

        Session::BroadcastPayload { scope } => {
            StepOutcome::idle().with_effect(Effect::Broadcast {
                scope: *scope,
                body: inbound.body.clone(),
            })
        }
    }
}

/// Shared exact-match currency selection for admin pick steps.
fn pick_currency(
    session: &Session,
    ctx: &StepCtx<'_>,
    inbound: &Inbound,
    then: impl FnOnce(String) -> StepOutcome,
) -> StepOutcome {
    match inbound.body.as_text().map(str::trim) {
        Some(code) if ctx.currencies.contains_key(code) => then(code.to_string()),
        _ => stay(session).with_reply("No such currency."),
    }
}

fn admin_home(ctx: &StepCtx<'_>, inbound: &Inbound) -> StepOutcome {
    let reprompt = || {
        StepOutcome::goto(Session::AdminHome).with_reply_kb("Admin panel:", menu::admin_menu())
    };
    let Some(text) = inbound.body.as_text().map(str::trim) else {
        return reprompt();
    };
    match text {
        menu::ADD_CURRENCY => StepOutcome::goto(Session::NewCurrencyCode)
            .with_reply_kb("Enter the currency code (e.g. USDT):", menu::cancel_only()),
        menu::EDIT_CURRENCY => {
            if ctx.currencies.is_empty() {
                StepOutcome::goto(Session::AdminHome).with_reply("No currencies available yet.")
            } else {
                StepOutcome::goto(Session::EditPickCurrency).with_reply_kb(
                    "Which currency do you want to edit?",
                    menu::currency_rows(ctx.currencies.keys()),
                )
            }
        }
        menu::DELETE_CURRENCY => {
            if ctx.currencies.is_empty() {
                StepOutcome::goto(Session::AdminHome).with_reply("No currencies available yet.")
            } else {
                StepOutcome::goto(Session::DeletePick).with_reply_kb(
                    "Which currency do you want to delete?",
                    menu::currency_rows(ctx.currencies.keys()),
                )
            }
        }
        menu::LIST_CURRENCIES => StepOutcome::goto(Session::AdminHome)
            .with_reply(views::currency_list(ctx.currencies)),
        menu::SET_RESERVE => {
            if ctx.currencies.is_empty() {
                StepOutcome::goto(Session::AdminHome).with_reply("Add a currency first.")
            } else {
                StepOutcome::goto(Session::ReservePick).with_reply_kb(
                    "Which currency's reserve do you want to set?",
                    menu::currency_rows(ctx.currencies.keys()),
                )
            }
        }
        menu::SET_CARD_BALANCE => {
            let prompt = format!(
                "Current card balance: {} UZS\nEnter the new balance:",
                views::group_thousands(ctx.card_balance.value())
            );
            StepOutcome::goto(Session::CardBalanceAmount)
                .with_reply_kb(prompt, menu::cancel_only())
        }
        menu::GUIDE_SETTINGS => StepOutcome::goto(Session::GuideVideo).with_reply_kb(
            format!(
                "Send the guide video (or type '{}' to clear it):",
                menu::GUIDE_CLEAR
            ),
            menu::cancel_only(),
        ),
        menu::BROADCAST => StepOutcome::goto(Session::BroadcastAudience)
            .with_reply_kb("Who should receive the message?", menu::broadcast_audience()),
        menu::BACK => {
            StepOutcome::idle().with_reply_kb("Main menu:", menu::main_menu(ctx.is_admin))
        }
        _ => reprompt(),
    }
}
