use crate::domain::currency::{CurrencyCode, CurrencyField};
use crate::domain::media::MediaRef;
use crate::domain::money::Amount;
use crate::domain::order::{OrderDraft, OrderSide};
use crate::domain::user::UserId;
use rust_decimal::Decimal;

/// Who a broadcast goes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BroadcastScope {
    All,
    Single(UserId),
}

/// One user's position inside a multi-step dialog. Absent (idle) users have
/// no session at all; each variant carries exactly the fields collected so
/// far, so a later step cannot read a field an earlier step never wrote.
///
/// Sessions are process-local and never persisted: a restart drops every
/// in-progress dialog, which is safe because orders are only created at the
/// final step.
#[derive(Debug, Clone, PartialEq)]
pub enum Session {
    // Customer order pipeline. Buy and sell run the same rail, told apart
    // by the side carried in the state.
    PickOrderCurrency {
        side: OrderSide,
    },
    OrderAmount {
        side: OrderSide,
        currency: String,
    },
    OrderWallet {
        side: OrderSide,
        currency: String,
        amount: Amount,
    },
    /// Payment details shown; waiting for the receipt button.
    OrderReview {
        draft: OrderDraft,
    },
    /// Waiting for a photo or document of the payment receipt.
    OrderReceipt {
        draft: OrderDraft,
    },

    /// Customer composing a message to the operator.
    SupportCompose,
    /// Operator composing a direct reply to one user.
    ReplyCompose {
        to: UserId,
    },

    // Admin panel and its sub-dialogs.
    AdminHome,
    NewCurrencyCode,
    NewCurrencyName {
        code: CurrencyCode,
    },
    NewCurrencyBuyRate {
        code: CurrencyCode,
        name: String,
    },
    NewCurrencySellRate {
        code: CurrencyCode,
        name: String,
        buy_rate: Decimal,
    },
    NewCurrencyBuyCard {
        code: CurrencyCode,
        name: String,
        buy_rate: Decimal,
        sell_rate: Decimal,
    },
    NewCurrencySellCard {
        code: CurrencyCode,
        name: String,
        buy_rate: Decimal,
        sell_rate: Decimal,
        buy_card: String,
    },
    EditPickCurrency,
    EditPickField {
        code: String,
    },
    EditNewValue {
        code: String,
        field: CurrencyField,
    },
    DeletePick,
    ReservePick,
    ReserveAmount {
        code: String,
    },
    CardBalanceAmount,
    GuideVideo,
    GuideCaption {
        video: MediaRef,
    },
    BroadcastAudience,
    BroadcastTarget,
    BroadcastPayload {
        scope: BroadcastScope,
    },
}
