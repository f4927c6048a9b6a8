//! Chat, message and round identifiers
//!
//! Chats and messages are identified by the transport's integer ids,
//! while rounds get a fresh UUID each so that a replaced round's pending
//! alarms can never be mistaken for the live round's.

use std::{fmt::Display, str::FromStr};

use serde::{Deserialize, Serialize};
use serde_with::{DeserializeFromStr, SerializeDisplay};
use uuid::Uuid;

/// Identifier of a chat, as assigned by the messaging platform
#[derive(
    Debug,
    Copy,
    Clone,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    derive_more::Display,
    derive_more::From,
)]
pub struct ChatId(i64);

impl ChatId {
    /// Returns the raw platform identifier
    pub fn get(self) -> i64 {
        self.0
    }
}

/// Identifier of a single inbound message within a chat
#[derive(
    Debug,
    Copy,
    Clone,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    derive_more::Display,
    derive_more::From,
)]
pub struct MessageId(i64);

/// The sender of an inbound message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    /// Display name used when announcing a winner
    pub first_name: String,
    /// Whether the sender is an automated account
    pub is_bot: bool,
}

impl Author {
    /// Creates a human author with the given display name
    pub fn person(first_name: impl Into<String>) -> Self {
        Self {
            first_name: first_name.into(),
            is_bot: false,
        }
    }

    /// Creates an automated author with the given display name
    pub fn bot(first_name: impl Into<String>) -> Self {
        Self {
            first_name: first_name.into(),
            is_bot: true,
        }
    }
}

/// A unique identifier for one round
#[derive(
    Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, DeserializeFromStr, SerializeDisplay,
)]
pub struct RoundId(Uuid);

impl RoundId {
    /// Creates a new random round ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RoundId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for RoundId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for RoundId {
    type Err = uuid::Error;

    /// Parses a round ID from a UUID string
    ///
    /// # Errors
    ///
    /// Returns a `uuid::Error` if the string is not a valid UUID.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::from_str(s)?))
    }
}
