use crate::domain::order::OrderId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Numeric chat-platform user id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct UserId(i64);

impl UserId {
    pub const fn new(id: i64) -> Self {
        Self(id)
    }

    pub fn as_i64(&self) -> i64 {
        self.0
    }

    /// The string form used as the user-collection key.
    pub fn key(&self) -> String {
        self.0.to_string()
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// A known subscriber. Created lazily on first contact; `orders` holds the
/// ids of every order the user ever submitted, oldest first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(with = "chrono::serde::ts_seconds")]
    pub joined_at: DateTime<Utc>,
    #[serde(default)]
    pub orders: Vec<OrderId>,
}

impl User {
    pub fn new(id: UserId, name: impl Into<String>, username: Option<String>) -> Self {
        Self {
            id,
            name: name.into(),
            username,
            joined_at: Utc::now(),
            orders: Vec::new(),
        }
    }

    /// Display handle: `@username` when present, otherwise the name.
    pub fn handle(&self) -> String {
        match &self.username {
            Some(username) => format!("@{username}"),
            None => self.name.clone(),
        }
    }
}
