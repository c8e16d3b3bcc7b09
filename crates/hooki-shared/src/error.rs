use thiserror::Error;

use crate::types::{ConnectionId, ConversationId, UserId};

/// Errors raised by the messaging, matching and post fan-out operations.
#[derive(Error, Debug)]
pub enum HookiError {
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    #[error("User {user} is not a participant of conversation {conversation}")]
    Authorization {
        user: UserId,
        conversation: ConversationId,
    },

    #[error("Validation failed: {0}")]
    Validation(String),

    /// Push to a closed or closing connection. Logged and dropped, never
    /// returned to the sender.
    #[error("Delivery to connection {0} failed")]
    TransientDelivery(ConnectionId),

    /// The backing store could not complete the operation. Retryable.
    #[error("Store unavailable: {0}")]
    Store(String),
}

impl HookiError {
    pub fn not_found(kind: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            kind,
            id: id.to_string(),
        }
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Short machine-readable code used in realtime `error` events.
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "not_found",
            Self::Authorization { .. } => "forbidden",
            Self::Validation(_) => "invalid",
            Self::TransientDelivery(_) => "delivery_failed",
            Self::Store(_) => "unavailable",
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Store(_))
    }
}
