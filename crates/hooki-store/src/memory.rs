//! Process-local store backed by hash maps behind one `RwLock`.
//!
//! Only suitable for a single server instance: nothing survives a restart
//! and nothing is shared between processes.

use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use hooki_shared::models::{ConversationSummary, Match, Message, Post, Reply, UserProfile};
use hooki_shared::types::{ConversationId, PostId, UserId};

use crate::error::{Result, StoreError};
use crate::store::{BlockStore, ConversationStore, MatchStore, PostStore, UserStore};

#[derive(Default)]
struct ConversationLog {
    messages: Vec<Message>,
    summary: Option<ConversationSummary>,
}

impl ConversationLog {
    fn update_summary(&mut self, last: &Message) {
        self.summary = Some(ConversationSummary {
            last_message: last.content.clone(),
            last_message_at: last.created_at,
            message_count: self.messages.len() as u64,
        });
    }
}

#[derive(Default)]
struct Inner {
    users: HashMap<UserId, UserProfile>,
    posts: HashMap<PostId, Post>,
    matches: HashMap<ConversationId, Match>,
    conversations: HashMap<ConversationId, ConversationLog>,
    blocks: HashMap<UserId, Vec<UserId>>,
}

impl Inner {
    fn with_summary(&self, mut m: Match) -> Match {
        if let Some(summary) = self.conversations.get(&m.id).and_then(|log| log.summary.as_ref()) {
            m.last_message = Some(summary.last_message.clone());
            m.last_message_at = Some(summary.last_message_at);
        }
        m
    }
}

/// In-memory [`Store`](crate::Store) implementation.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Inner>> {
        self.inner.read().map_err(|_| StoreError::LockPoisoned)
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Inner>> {
        self.inner.write().map_err(|_| StoreError::LockPoisoned)
    }
}

impl UserStore for MemoryStore {
    fn put_user(&self, user: &UserProfile) -> Result<()> {
        self.write()?.users.insert(user.id.clone(), user.clone());
        Ok(())
    }

    fn get_user(&self, id: &UserId) -> Result<Option<UserProfile>> {
        Ok(self.read()?.users.get(id).cloned())
    }

    fn list_users(&self) -> Result<Vec<UserProfile>> {
        let mut users: Vec<UserProfile> = self.read()?.users.values().cloned().collect();
        users.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(users)
    }
}

impl PostStore for MemoryStore {
    fn insert_post(&self, post: &Post) -> Result<()> {
        self.write()?.posts.insert(post.id.clone(), post.clone());
        Ok(())
    }

    fn get_post(&self, id: &PostId) -> Result<Option<Post>> {
        Ok(self.read()?.posts.get(id).cloned())
    }

    fn list_posts(&self) -> Result<Vec<Post>> {
        let mut posts: Vec<Post> = self.read()?.posts.values().cloned().collect();
        posts.sort_by_key(|p| p.created_at);
        Ok(posts)
    }

    fn like_post(&self, id: &PostId, user: &UserId) -> Result<(Post, bool)> {
        let mut inner = self.write()?;
        let post = inner.posts.get_mut(id).ok_or(StoreError::NotFound)?;
        let added = post.add_like(user);
        Ok((post.clone(), added))
    }

    fn append_reply(&self, id: &PostId, reply: &Reply) -> Result<()> {
        let mut inner = self.write()?;
        let post = inner.posts.get_mut(id).ok_or(StoreError::NotFound)?;
        post.replies.push(reply.clone());
        Ok(())
    }
}

impl MatchStore for MemoryStore {
    fn insert_match(&self, m: &Match) -> Result<(Match, bool)> {
        let mut inner = self.write()?;
        if let Some(existing) = inner.matches.get(&m.id).cloned() {
            return Ok((inner.with_summary(existing), false));
        }
        inner.matches.insert(m.id.clone(), m.clone());
        Ok((m.clone(), true))
    }

    fn get_match(&self, id: &ConversationId) -> Result<Option<Match>> {
        let inner = self.read()?;
        Ok(inner.matches.get(id).cloned().map(|m| inner.with_summary(m)))
    }

    fn matches_for_user(&self, user: &UserId) -> Result<Vec<Match>> {
        let inner = self.read()?;
        let mut matches: Vec<Match> = inner
            .matches
            .values()
            .filter(|m| m.has_participant(user))
            .cloned()
            .map(|m| inner.with_summary(m))
            .collect();
        matches.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(matches)
    }
}

impl ConversationStore for MemoryStore {
    fn append_message(&self, mut message: Message) -> Result<Message> {
        let mut inner = self.write()?;
        let log = inner
            .conversations
            .entry(message.conversation_id.clone())
            .or_default();

        if let Some(last) = log.messages.last() {
            if message.created_at < last.created_at {
                message.created_at = last.created_at;
            }
        }
        message.seq = log.messages.len() as u64 + 1;
        log.messages.push(message.clone());
        log.update_summary(&message);

        Ok(message)
    }

    fn list_messages(&self, id: &ConversationId) -> Result<Vec<Message>> {
        Ok(self
            .read()?
            .conversations
            .get(id)
            .map(|log| log.messages.clone())
            .unwrap_or_default())
    }

    fn find_by_client_token(
        &self,
        id: &ConversationId,
        token: &str,
    ) -> Result<Option<Message>> {
        Ok(self.read()?.conversations.get(id).and_then(|log| {
            log.messages
                .iter()
                .find(|m| m.client_token.as_deref() == Some(token))
                .cloned()
        }))
    }

    fn summary(&self, id: &ConversationId) -> Result<Option<ConversationSummary>> {
        Ok(self
            .read()?
            .conversations
            .get(id)
            .and_then(|log| log.summary.clone()))
    }

    fn mark_read(&self, id: &ConversationId, reader: &UserId) -> Result<usize> {
        let mut inner = self.write()?;
        let Some(log) = inner.conversations.get_mut(id) else {
            return Ok(0);
        };
        let mut changed = 0;
        for message in log
            .messages
            .iter_mut()
            .filter(|m| m.sender_id != *reader && !m.read)
        {
            message.read = true;
            changed += 1;
        }
        Ok(changed)
    }
}

impl BlockStore for MemoryStore {
    fn block_user(&self, user: &UserId, blocked: &UserId) -> Result<bool> {
        let mut inner = self.write()?;
        let list = inner.blocks.entry(user.clone()).or_default();
        if list.contains(blocked) {
            return Ok(false);
        }
        list.push(blocked.clone());
        Ok(true)
    }

    fn unblock_user(&self, user: &UserId, blocked: &UserId) -> Result<bool> {
        let mut inner = self.write()?;
        let Some(list) = inner.blocks.get_mut(user) else {
            return Ok(false);
        };
        let before = list.len();
        list.retain(|u| u != blocked);
        Ok(list.len() != before)
    }

    fn blocked_users(&self, user: &UserId) -> Result<Vec<UserId>> {
        Ok(self.read()?.blocks.get(user).cloned().unwrap_or_default())
    }
}
