use crate::domain::media::MediaRef;
use crate::domain::user::UserId;

/// Payload of an inbound chat message.
#[derive(Debug, Clone, PartialEq)]
pub enum MessageBody {
    Text(String),
    Media {
        media: MediaRef,
        caption: Option<String>,
    },
}

impl MessageBody {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            MessageBody::Text(text) => Some(text.as_str()),
            MessageBody::Media { .. } => None,
        }
    }
}

/// One inbound message as handed over by the transport.
#[derive(Debug, Clone, PartialEq)]
pub struct Inbound {
    pub from: UserId,
    pub body: MessageBody,
}

impl Inbound {
    pub fn text(from: UserId, text: impl Into<String>) -> Self {
        Self {
            from,
            body: MessageBody::Text(text.into()),
        }
    }

    pub fn media(from: UserId, media: MediaRef, caption: Option<String>) -> Self {
        Self {
            from,
            body: MessageBody::Media { media, caption },
        }
    }
}
