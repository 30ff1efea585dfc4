use crate::dialog::event::MessageBody;
use crate::dialog::state::BroadcastScope;
use crate::domain::currency::{Currency, CurrencyCode, FieldChange};
use crate::domain::media::MediaRef;
use crate::domain::money::Balance;
use crate::domain::order::OrderDraft;
use crate::domain::ports::{Guide, Keyboard};
use crate::domain::user::UserId;

/// What the runtime must do after a transition. Replies are unconditional;
/// the record-mutating effects are executed by the order manager or admin
/// controller, which also produce the outcome reply (success, collision,
/// insufficient reserve and so on).
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Message back to the sender.
    Reply {
        text: String,
        keyboard: Option<Keyboard>,
    },
    /// Send the stored guide (video with caption, or its text) to the sender.
    SendGuide,

    /// Terminal step of the order pipeline: hand the draft and receipt to
    /// the order manager.
    SubmitOrder { draft: OrderDraft, proof: MediaRef },

    /// Relay the customer's message to the operator with a reply button.
    ContactAdmin { body: MessageBody },
    /// Operator's direct reply to one user.
    DirectMessage { to: UserId, body: MessageBody },
    Broadcast {
        scope: BroadcastScope,
        body: MessageBody,
    },

    CreateCurrency {
        code: CurrencyCode,
        currency: Currency,
    },
    UpdateCurrency {
        code: String,
        change: FieldChange,
    },
    DeleteCurrency { code: String },
    SetReserve { code: String, balance: Balance },
    SetCardBalance { balance: Balance },
    SetGuide { guide: Guide },
}

impl Effect {
    pub fn reply(text: impl Into<String>) -> Self {
        Effect::Reply {
            text: text.into(),
            keyboard: None,
        }
    }

    pub fn reply_with(text: impl Into<String>, keyboard: Keyboard) -> Self {
        Effect::Reply {
            text: text.into(),
            keyboard: Some(keyboard),
        }
    }
}
