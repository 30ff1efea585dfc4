use crate::dialog::event::Inbound;
use crate::domain::media::{MediaKind, MediaRef};
use crate::domain::ports::{ButtonAction, Keyboard, Profile, Recipient, Transport};
use crate::domain::user::UserId;
use crate::error::Result;
use async_trait::async_trait;

/// A transport that prints outbound traffic to stdout, one message per
/// line, with keyboards indented under it. Lets the whole bot be driven
/// from a terminal or a scripted stdin.
#[derive(Default, Clone)]
pub struct ConsoleTransport;

impl ConsoleTransport {
    pub fn new() -> Self {
        Self
    }

    fn print_keyboard(keyboard: &Keyboard) {
        match keyboard {
            Keyboard::Reply { rows } => {
                for row in rows {
                    println!("   [{}]", row.join(" | "));
                }
            }
            Keyboard::Inline { buttons } => {
                for button in buttons {
                    match &button.action {
                        ButtonAction::Callback(payload) => {
                            println!("   ({}) -> cb {payload}", button.label);
                        }
                        ButtonAction::Url(url) => {
                            println!("   ({}) -> {url}", button.label);
                        }
                    }
                }
            }
        }
    }
}

#[async_trait]
impl Transport for ConsoleTransport {
    async fn send_text(
        &self,
        to: Recipient,
        text: &str,
        keyboard: Option<Keyboard>,
    ) -> Result<()> {
        println!(">> {to}: {text}");
        if let Some(keyboard) = &keyboard {
            Self::print_keyboard(keyboard);
        }
        Ok(())
    }

    async fn send_media(
        &self,
        to: Recipient,
        media: &MediaRef,
        caption: &str,
        keyboard: Option<Keyboard>,
    ) -> Result<()> {
        println!(">> {to}: [{} {}] {caption}", media.kind, media.file_id);
        if let Some(keyboard) = &keyboard {
            Self::print_keyboard(keyboard);
        }
        Ok(())
    }

    async fn profile(&self, user: UserId) -> Result<Profile> {
        Ok(Profile {
            name: format!("User {}", user.as_i64()),
            username: None,
        })
    }
}

/// One parsed console input line.
#[derive(Debug, Clone, PartialEq)]
pub enum ConsoleUpdate {
    Message(Inbound),
    Callback { from: UserId, payload: String },
}

/// Parses one stdin line into an update. The format is
/// `<user_id> <text>` for a text message,
/// `<user_id> photo:<file> [caption]` (also `video:`, `doc:`) for media,
/// and `<user_id> cb <payload>` for an inline button press.
/// Returns `None` for empty lines and lines without a leading user id.
pub fn parse_line(line: &str) -> Option<ConsoleUpdate> {
    let line = line.trim();
    let (id_part, rest) = line.split_once(char::is_whitespace)?;
    let from = UserId::new(id_part.parse::<i64>().ok()?);
    let rest = rest.trim();
    if rest.is_empty() {
        return None;
    }

    if let Some(payload) = rest.strip_prefix("cb ") {
        return Some(ConsoleUpdate::Callback {
            from,
            payload: payload.trim().to_string(),
        });
    }

    for (prefix, kind) in [
        ("photo:", MediaKind::Photo),
        ("video:", MediaKind::Video),
        ("doc:", MediaKind::Document),
    ] {
        if let Some(tail) = rest.strip_prefix(prefix) {
            let (file_id, caption) = match tail.split_once(char::is_whitespace) {
                Some((file, caption)) => (file, Some(caption.trim().to_string())),
                None => (tail, None),
            };
            if file_id.is_empty() {
                return None;
            }
            return Some(ConsoleUpdate::Message(Inbound::media(
                from,
                MediaRef::new(kind, file_id),
                caption.filter(|caption| !caption.is_empty()),
            )));
        }
    }

    Some(ConsoleUpdate::Message(Inbound::text(from, rest)))
}
