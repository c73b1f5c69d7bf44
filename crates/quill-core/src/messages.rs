//! Role-tagged chat messages and the conversation log.
//!
//! A [`ConversationLog`] is an ordered, append-only sequence of messages.
//! Logs are owned values: the top-level run owns the root log, and each
//! recursive interpreter call owns a child log seeded from the triggering
//! exchange. Only a digest of a child run is written back to the parent, so
//! no two recursion levels ever alias the same message storage.

use serde::{Deserialize, Serialize};

/// The role of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Instructions and tool/engine notes.
    System,
    /// Input from the human operator.
    User,
    /// Model output, including command-batch digests.
    Assistant,
}

impl Role {
    /// The wire name of the role.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

/// One role-tagged message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Who produced the message.
    pub role: Role,
    /// The message body.
    pub content: String,
}

impl ChatMessage {
    /// Build a `system` message.
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    /// Build a `user` message.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    /// Build an `assistant` message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// An ordered, append-only conversation log.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationLog {
    messages: Vec<ChatMessage>,
}

impl ConversationLog {
    /// Create an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a log seeded with the given messages.
    ///
    /// Used at recursion boundaries: the child log starts from the exchange
    /// that triggered the recursion, nothing else.
    #[must_use]
    pub fn seeded(messages: Vec<ChatMessage>) -> Self {
        Self { messages }
    }

    /// Append one message.
    pub fn push(&mut self, message: ChatMessage) {
        self.messages.push(message);
    }

    /// Append several messages in order.
    pub fn extend(&mut self, messages: impl IntoIterator<Item = ChatMessage>) {
        self.messages.extend(messages);
    }

    /// Insert one message at the front.
    pub fn prepend(&mut self, message: ChatMessage) {
        self.messages.insert(0, message);
    }

    /// Insert several messages at the front, preserving their order.
    pub fn prepend_all(&mut self, messages: Vec<ChatMessage>) {
        let rest = std::mem::take(&mut self.messages);
        self.messages = messages;
        self.messages.extend(rest);
    }

    /// Remove and return the `n` oldest messages (fewer if the log is shorter).
    pub fn drain_front(&mut self, n: usize) -> Vec<ChatMessage> {
        let n = n.min(self.messages.len());
        self.messages.drain(..n).collect()
    }

    /// All messages, oldest first.
    #[must_use]
    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    /// Number of messages.
    #[must_use]
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Whether the log holds no messages.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Total content size in bytes, summed over all messages.
    ///
    /// Inputs to token estimation; roles and structure are not counted.
    #[must_use]
    pub fn content_bytes(&self) -> usize {
        self.messages.iter().map(|m| m.content.len()).sum()
    }
}

impl From<Vec<ChatMessage>> for ConversationLog {
    fn from(messages: Vec<ChatMessage>) -> Self {
        Self { messages }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
