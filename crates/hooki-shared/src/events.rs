use serde::{Deserialize, Serialize};

use crate::error::HookiError;
use crate::models::{Match, Message, Post, Reply};
use crate::types::{ConversationId, PostId, UserId};

/// Frames sent by a client over its realtime connection.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientEvent {
    /// Bind this connection to a user id.
    #[serde(rename_all = "camelCase")]
    Announce { user_id: UserId },

    #[serde(rename_all = "camelCase")]
    SendMessage {
        conversation_id: ConversationId,
        sender_id: UserId,
        content: String,
        #[serde(default)]
        client_token: Option<String>,
    },

    #[serde(rename_all = "camelCase")]
    MarkRead {
        conversation_id: ConversationId,
        reader_id: UserId,
    },

    Ping,
}

/// Events pushed by the server to connected clients.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerEvent {
    #[serde(rename_all = "camelCase")]
    Announced { user_id: UserId },

    NewPost(Post),

    #[serde(rename_all = "camelCase")]
    PostLiked { post_id: PostId, user_id: UserId },

    #[serde(rename_all = "camelCase")]
    PostReplied { post_id: PostId, reply: Reply },

    NewMessage(Message),

    NewMatch(Match),

    #[serde(rename_all = "camelCase")]
    MessagesRead {
        conversation_id: ConversationId,
        reader_id: UserId,
    },

    Error { code: String, message: String },

    Pong,
}

impl ServerEvent {
    /// Event name as it appears in the `type` tag.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Announced { .. } => "announced",
            Self::NewPost(_) => "new_post",
            Self::PostLiked { .. } => "post_liked",
            Self::PostReplied { .. } => "post_replied",
            Self::NewMessage(_) => "new_message",
            Self::NewMatch(_) => "new_match",
            Self::MessagesRead { .. } => "messages_read",
            Self::Error { .. } => "error",
            Self::Pong => "pong",
        }
    }
}

impl From<&HookiError> for ServerEvent {
    fn from(err: &HookiError) -> Self {
        ServerEvent::Error {
            code: err.code().to_string(),
            message: err.to_string(),
        }
    }
}
