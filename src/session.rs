//! Outbound messaging
//!
//! This module defines the trait through which rounds talk to a chat. The
//! transport behind it (a bot API client, a test double) is supplied by the
//! embedding application.

use serde::Serialize;
use thiserror::Error;

use crate::chat::{ChatId, MessageId};

/// How the platform should interpret the message text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Format {
    /// Unformatted text
    Plain,
    /// HTML markup
    Html,
    /// Markdown markup
    Markdown,
}

/// A message to deliver to a chat
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutgoingMessage {
    /// Destination chat
    pub chat_id: ChatId,
    /// Message body
    pub text: String,
    /// Markup used in `text`
    pub format: Format,
    /// Inbound message this one quotes, if any
    pub reply_to: Option<MessageId>,
}

impl OutgoingMessage {
    /// Creates a message that does not quote anything
    pub fn new(chat_id: ChatId, text: impl Into<String>, format: Format) -> Self {
        Self {
            chat_id,
            text: text.into(),
            format,
            reply_to: None,
        }
    }

    /// Quotes the given inbound message
    #[must_use]
    pub fn replying_to(mut self, message_id: MessageId) -> Self {
        self.reply_to = Some(message_id);
        self
    }
}

/// Errors a messenger reports when a message cannot be delivered
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DeliveryError {
    /// The bot may not write to this chat (blocked, kicked, ...)
    #[error("not permitted to message this chat")]
    Forbidden,
    /// Any other delivery failure
    #[error("delivery failed: {0}")]
    Transient(String),
}

/// Trait for sending messages to chats
///
/// Implementations might call a bot HTTP API, push onto a queue, or record
/// messages for inspection in tests.
pub trait Messenger {
    /// Delivers a message
    ///
    /// # Errors
    ///
    /// Returns [`DeliveryError::Forbidden`] when the chat cannot be written
    /// to and [`DeliveryError::Transient`] for other failures.
    fn send_message(&self, message: &OutgoingMessage) -> Result<(), DeliveryError>;
}
