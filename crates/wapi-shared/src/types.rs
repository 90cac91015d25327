use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

use crate::constants::{CHATS_COLLECTION, CONVERSATION_KEY_SEPARATOR, MESSAGES_COLLECTION};
use crate::error::WapiError;

// Backend user id. The REST API hands these out as integers in some payloads
// and strings in others, so both shapes deserialize into the same value.
#[derive(Debug, Clone, Serialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct UserId(pub String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Result<Self, WapiError> {
        let id = id.into();
        let trimmed = id.trim();
        if trimmed.is_empty() || trimmed.contains(CONVERSATION_KEY_SEPARATOR) {
            return Err(WapiError::InvalidId(id));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for UserId {
    type Err = WapiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl<'de> Deserialize<'de> for UserId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Text(String),
            Number(i64),
        }

        let raw = match Raw::deserialize(deserializer)? {
            Raw::Text(s) => s,
            Raw::Number(n) => n.to_string(),
        };
        UserId::new(raw).map_err(serde::de::Error::custom)
    }
}

/// Order-independent key of a two-party conversation.
///
/// Both participant ids are sorted and joined with `_`, so either side
/// derives the same key and the thread lives at a single storage path.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct ConversationKey(String);

impl ConversationKey {
    pub fn between(a: &UserId, b: &UserId) -> Self {
        let (low, high) = if a <= b { (a, b) } else { (b, a) };
        Self(format!("{low}{CONVERSATION_KEY_SEPARATOR}{high}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Collection path of this conversation's messages in the document store.
    pub fn messages_path(&self) -> String {
        format!("{CHATS_COLLECTION}/{}/{MESSAGES_COLLECTION}", self.0)
    }

    /// Whether `user` is one of the two participants.
    pub fn includes(&self, user: &UserId) -> bool {
        self.0
            .split(CONVERSATION_KEY_SEPARATOR)
            .any(|part| part == user.as_str())
    }
}

impl std::fmt::Display for ConversationKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct MessageId(pub Uuid);

impl MessageId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for MessageId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for MessageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for MessageId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}
