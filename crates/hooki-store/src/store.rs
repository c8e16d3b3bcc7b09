//! The storage interface injected into the message router and post fan-out.
//!
//! Each record family has its own trait; [`Store`] bundles them so the server
//! can hold a single `Arc<dyn Store>`.

use hooki_shared::models::{ConversationSummary, Match, Message, Post, Reply, UserProfile};
use hooki_shared::types::{ConversationId, PostId, UserId};

use crate::error::Result;

pub trait UserStore {
    /// Insert or replace a profile.
    fn put_user(&self, user: &UserProfile) -> Result<()>;

    fn get_user(&self, id: &UserId) -> Result<Option<UserProfile>>;

    fn list_users(&self) -> Result<Vec<UserProfile>>;
}

pub trait PostStore {
    fn insert_post(&self, post: &Post) -> Result<()>;

    fn get_post(&self, id: &PostId) -> Result<Option<Post>>;

    /// All posts, oldest first.
    fn list_posts(&self) -> Result<Vec<Post>>;

    /// Add `user` to the post's likes. Returns the post as stored after the
    /// call and whether the like was new. [`StoreError::NotFound`] when the
    /// post does not exist.
    ///
    /// [`StoreError::NotFound`]: crate::StoreError::NotFound
    fn like_post(&self, id: &PostId, user: &UserId) -> Result<(Post, bool)>;

    /// Append a reply. [`StoreError::NotFound`] when the post does not exist.
    ///
    /// [`StoreError::NotFound`]: crate::StoreError::NotFound
    fn append_reply(&self, id: &PostId, reply: &Reply) -> Result<()>;
}

pub trait MatchStore {
    /// Insert the match unless one with the same id exists. Returns the
    /// stored match and whether this call created it.
    fn insert_match(&self, m: &Match) -> Result<(Match, bool)>;

    /// The match with its last-message preview filled in.
    fn get_match(&self, id: &ConversationId) -> Result<Option<Match>>;

    /// Every match `user` takes part in, oldest first.
    fn matches_for_user(&self, user: &UserId) -> Result<Vec<Match>>;
}

pub trait ConversationStore {
    /// Append to the conversation log, creating it if absent.
    ///
    /// Assigns the next per-conversation sequence number (starting at 1),
    /// clamps `created_at` so timestamps never go backwards within the
    /// conversation, and refreshes the last-message preview. Returns the
    /// message as stored.
    fn append_message(&self, message: Message) -> Result<Message>;

    /// Full history, oldest first. Empty for an unknown conversation.
    fn list_messages(&self, id: &ConversationId) -> Result<Vec<Message>>;

    /// The message previously appended with this client token, if any.
    fn find_by_client_token(&self, id: &ConversationId, token: &str)
        -> Result<Option<Message>>;

    fn summary(&self, id: &ConversationId) -> Result<Option<ConversationSummary>>;

    /// Mark every message not sent by `reader` as read. Returns how many
    /// messages changed state.
    fn mark_read(&self, id: &ConversationId, reader: &UserId) -> Result<usize>;
}

pub trait BlockStore {
    /// Returns `false` when the block already existed.
    fn block_user(&self, user: &UserId, blocked: &UserId) -> Result<bool>;

    /// Returns `false` when there was nothing to remove.
    fn unblock_user(&self, user: &UserId, blocked: &UserId) -> Result<bool>;

    fn blocked_users(&self, user: &UserId) -> Result<Vec<UserId>>;
}

/// Everything the server needs from persistence.
pub trait Store: UserStore + PostStore + MatchStore + ConversationStore + BlockStore + Send + Sync {}

impl<T> Store for T where
    T: UserStore + PostStore + MatchStore + ConversationStore + BlockStore + Send + Sync
{
}
