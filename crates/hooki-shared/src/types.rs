use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::constants::{CONVERSATION_ID_ESCAPE, CONVERSATION_ID_SEPARATOR};

// User identity = opaque string supplied by the client
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct UserId(pub String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for UserId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Identifier of a conversation (match) between two users.
///
/// Derived from the unordered pair of participants, so both orderings of
/// the pair produce the same id. The two sorted ids are joined by `_`; a `_`
/// or `\` inside a user id is escaped with `\`, so distinct pairs never
/// share an id and [`ConversationId::participants`] can recover the pair.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct ConversationId(pub String);

impl ConversationId {
    pub fn for_pair(a: &UserId, b: &UserId) -> Self {
        let (first, second) = if a <= b { (a, b) } else { (b, a) };
        let mut id = String::with_capacity(first.0.len() + second.0.len() + 1);
        escape_into(&mut id, first.as_str());
        id.push(CONVERSATION_ID_SEPARATOR);
        escape_into(&mut id, second.as_str());
        Self(id)
    }

    /// The two participants encoded in a canonical id, in sorted order.
    /// `None` when the id is not of the form produced by [`Self::for_pair`].
    pub fn participants(&self) -> Option<(UserId, UserId)> {
        let mut parts = [String::new(), String::new()];
        let mut current = 0;
        let mut chars = self.0.chars();

        while let Some(c) = chars.next() {
            if c == CONVERSATION_ID_ESCAPE {
                match chars.next() {
                    Some(escaped @ (CONVERSATION_ID_ESCAPE | CONVERSATION_ID_SEPARATOR)) => {
                        parts[current].push(escaped)
                    }
                    _ => return None,
                }
            } else if c == CONVERSATION_ID_SEPARATOR {
                if current == 1 {
                    return None;
                }
                current = 1;
            } else {
                parts[current].push(c);
            }
        }

        let [first, second] = parts;
        if current != 1 || first.is_empty() || second.is_empty() {
            return None;
        }
        let (first, second) = (UserId(first), UserId(second));
        // Non-canonical spellings (unsorted pair) do not name a conversation.
        if Self::for_pair(&first, &second) != *self {
            return None;
        }
        Some((first, second))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ConversationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ConversationId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

fn escape_into(out: &mut String, id: &str) {
    for c in id.chars() {
        if c == CONVERSATION_ID_SEPARATOR || c == CONVERSATION_ID_ESCAPE {
            out.push(CONVERSATION_ID_ESCAPE);
        }
        out.push(c);
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct PostId(pub String);

impl PostId {
    pub fn new() -> Self {
        Self(format!("hook_{}", Uuid::new_v4().simple()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for PostId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for PostId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PostId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct ReplyId(pub String);

impl ReplyId {
    pub fn new() -> Self {
        Self(format!("reply_{}", Uuid::new_v4().simple()))
    }
}

impl Default for ReplyId {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct MessageId(pub String);

impl MessageId {
    pub fn new() -> Self {
        Self(format!("msg_{}", Uuid::new_v4().simple()))
    }
}

impl Default for MessageId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for MessageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Handle of one live realtime connection. Never persisted.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct ConnectionId(pub Uuid);

impl ConnectionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
