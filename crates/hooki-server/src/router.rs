//! Message router: persists chat messages and pushes them to the live
//! connections of both participants.
//!
//! Appends to one conversation are serialized by a per-conversation lock
//! held across persist and fan-out, so every connection sees messages in log
//! order. Different conversations never wait on each other.
//!
//! A conversation comes into existence on its first match or first message;
//! its participants are recovered from the canonical conversation id.

use std::collections::HashMap;
use std::sync::Arc;

use hooki_shared::constants::MAX_MESSAGE_LEN;
use hooki_shared::events::ServerEvent;
use hooki_shared::models::{Match, Message};
use hooki_shared::types::{ConversationId, UserId};
use hooki_shared::HookiError;
use hooki_store::Store;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, info};

use crate::registry::IdentityRegistry;

/// Map size at which idle conversation locks are dropped.
const LOCK_PRUNE_THRESHOLD: usize = 1024;

/// One mutex per conversation id, created on first use.
#[derive(Clone, Default)]
struct ConversationLocks {
    locks: Arc<Mutex<HashMap<ConversationId, Arc<Mutex<()>>>>>,
}

impl ConversationLocks {
    async fn lock(&self, id: &ConversationId) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().await;
            if locks.len() >= LOCK_PRUNE_THRESHOLD {
                // Only the map holds an idle lock: no guard, no waiter.
                locks.retain(|_, lock| Arc::strong_count(lock) > 1);
            }
            locks.entry(id.clone()).or_default().clone()
        };
        lock.lock_owned().await
    }
}

#[derive(Clone)]
pub struct MessageRouter {
    store: Arc<dyn Store>,
    registry: IdentityRegistry,
    locks: ConversationLocks,
}

impl MessageRouter {
    pub fn new(store: Arc<dyn Store>, registry: IdentityRegistry) -> Self {
        Self {
            store,
            registry,
            locks: ConversationLocks::default(),
        }
    }

    /// Pair two users. Creating an existing pair returns the stored match
    /// and emits nothing; a new match is pushed to both users as
    /// `new_match`.
    pub async fn create_match(&self, user_a: UserId, user_b: UserId) -> Result<Match, HookiError> {
        if user_a.is_blank() || user_b.is_blank() {
            return Err(HookiError::validation("both user ids are required"));
        }
        if user_a == user_b {
            return Err(HookiError::validation("a user cannot match with themselves"));
        }

        let candidate = Match::new(user_a, user_b);
        let _guard = self.locks.lock(&candidate.id).await;
        self.persist_match(&candidate).await
    }

    pub async fn matches_for(&self, user: &UserId) -> Result<Vec<Match>, HookiError> {
        Ok(self.store.matches_for_user(user)?)
    }

    /// Full history of a conversation, oldest first. Empty for a
    /// conversation nobody has written to yet.
    pub async fn history(&self, id: &ConversationId) -> Result<Vec<Message>, HookiError> {
        self.conversation(id)?;
        Ok(self.store.list_messages(id)?)
    }

    /// Accept, persist and deliver one message.
    ///
    /// The stored message goes to every connection of the recipient and is
    /// echoed to the sender's own connections. Delivery failures never undo
    /// the append: an offline recipient reads the message on next fetch.
    /// A resend carrying an already-seen `client_token` returns the original
    /// message without appending or pushing again. The first message of a
    /// conversation without a match record creates that record and emits
    /// `new_match` before the message itself.
    pub async fn route(
        &self,
        conversation_id: &ConversationId,
        sender: &UserId,
        content: &str,
        client_token: Option<String>,
    ) -> Result<Message, HookiError> {
        if content.trim().is_empty() {
            return Err(HookiError::validation("message content must not be empty"));
        }
        if content.chars().count() > MAX_MESSAGE_LEN {
            return Err(HookiError::validation(format!(
                "message exceeds {MAX_MESSAGE_LEN} characters"
            )));
        }

        let conversation = self.conversation(conversation_id)?;
        if !conversation.has_participant(sender) {
            return Err(HookiError::Authorization {
                user: sender.clone(),
                conversation: conversation_id.clone(),
            });
        }

        let _guard = self.locks.lock(conversation_id).await;
        let conversation = self.persist_match(&conversation).await?;

        if let Some(token) = client_token.as_deref() {
            if let Some(existing) = self.store.find_by_client_token(conversation_id, token)? {
                debug!(
                    conversation = %conversation_id,
                    message = %existing.id,
                    "Duplicate client token, returning stored message"
                );
                return Ok(existing);
            }
        }

        let stored = self.store.append_message(Message::new(
            conversation_id.clone(),
            sender.clone(),
            content.to_string(),
            client_token,
        ))?;

        let event = ServerEvent::NewMessage(stored.clone());
        let mut delivered = 0;
        for user in conversation.participants() {
            delivered += self.registry.send_to_user(user, &event).await;
        }

        info!(
            conversation = %conversation_id,
            sender = %sender,
            seq = stored.seq,
            delivered,
            "Message routed"
        );

        Ok(stored)
    }

    /// Mark the other participant's messages as read and tell them so.
    pub async fn mark_read(
        &self,
        conversation_id: &ConversationId,
        reader: &UserId,
    ) -> Result<usize, HookiError> {
        let conversation = self.conversation(conversation_id)?;
        let Some(other) = conversation.other(reader) else {
            return Err(HookiError::Authorization {
                user: reader.clone(),
                conversation: conversation_id.clone(),
            });
        };

        let _guard = self.locks.lock(conversation_id).await;
        let changed = self.store.mark_read(conversation_id, reader)?;

        if changed > 0 {
            let event = ServerEvent::MessagesRead {
                conversation_id: conversation_id.clone(),
                reader_id: reader.clone(),
            };
            self.registry.send_to_user(other, &event).await;
            debug!(conversation = %conversation_id, reader = %reader, changed, "Messages marked read");
        }

        Ok(changed)
    }

    /// Store `candidate` unless its conversation already has a record, and
    /// announce a newly created match to both users. Callers hold the
    /// conversation lock.
    async fn persist_match(&self, candidate: &Match) -> Result<Match, HookiError> {
        let (stored, created) = self.store.insert_match(candidate)?;

        if created {
            let event = ServerEvent::NewMatch(stored.clone());
            for user in stored.participants() {
                self.registry.send_to_user(user, &event).await;
            }
            info!(conversation = %stored.id, "Match created");
        }

        Ok(stored)
    }

    /// The stored match, or an unsaved one built from the participants
    /// encoded in `id`. Ids that name no pair of distinct users are
    /// `NotFound`.
    fn conversation(&self, id: &ConversationId) -> Result<Match, HookiError> {
        if let Some(existing) = self.store.get_match(id)? {
            return Ok(existing);
        }
        match id.participants() {
            Some((a, b)) if a != b => Ok(Match::new(a, b)),
            _ => Err(HookiError::not_found("conversation", id)),
        }
    }
}
