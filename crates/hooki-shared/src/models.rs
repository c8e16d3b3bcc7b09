//! Domain models shared by the store and the server.
//!
//! Every struct serializes with camelCase field names, which is what the
//! mobile client reads and writes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::geo::{GeoPoint, Located};
use crate::types::{ConversationId, MessageId, PostId, ReplyId, UserId};

// ---------------------------------------------------------------------------
// Message
// ---------------------------------------------------------------------------

/// A chat message inside one conversation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: MessageId,
    pub conversation_id: ConversationId,
    pub sender_id: UserId,
    pub content: String,
    /// Position in the conversation log, starting at 1. Assigned by the store.
    pub seq: u64,
    pub created_at: DateTime<Utc>,
    pub read: bool,
    /// Client-generated token used to de-duplicate resends.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_token: Option<String>,
}

impl Message {
    /// A message that has not been appended yet (`seq` is 0).
    pub fn new(
        conversation_id: ConversationId,
        sender_id: UserId,
        content: String,
        client_token: Option<String>,
    ) -> Self {
        Self {
            id: MessageId::new(),
            conversation_id,
            sender_id,
            content,
            seq: 0,
            created_at: Utc::now(),
            read: false,
            client_token,
        }
    }
}

// ---------------------------------------------------------------------------
// Match (conversation header)
// ---------------------------------------------------------------------------

/// A pairing between two users; its id is the conversation id.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Match {
    pub id: ConversationId,
    pub user_id1: UserId,
    pub user_id2: UserId,
    pub created_at: DateTime<Utc>,
    pub last_message: Option<String>,
    pub last_message_at: Option<DateTime<Utc>>,
}

impl Match {
    pub fn new(user_a: UserId, user_b: UserId) -> Self {
        Self {
            id: ConversationId::for_pair(&user_a, &user_b),
            user_id1: user_a,
            user_id2: user_b,
            created_at: Utc::now(),
            last_message: None,
            last_message_at: None,
        }
    }

    pub fn participants(&self) -> [&UserId; 2] {
        [&self.user_id1, &self.user_id2]
    }

    pub fn has_participant(&self, user: &UserId) -> bool {
        self.user_id1 == *user || self.user_id2 == *user
    }

    /// The participant that is not `user`, if `user` is a participant.
    pub fn other(&self, user: &UserId) -> Option<&UserId> {
        if self.user_id1 == *user {
            Some(&self.user_id2)
        } else if self.user_id2 == *user {
            Some(&self.user_id1)
        } else {
            None
        }
    }
}

/// Last-message preview kept per conversation for list screens.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ConversationSummary {
    pub last_message: String,
    pub last_message_at: DateTime<Utc>,
    pub message_count: u64,
}

// ---------------------------------------------------------------------------
// Post ("hook")
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Reply {
    pub id: ReplyId,
    pub user_id: UserId,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl Reply {
    pub fn new(user_id: UserId, content: String) -> Self {
        Self {
            id: ReplyId::new(),
            user_id,
            content,
            created_at: Utc::now(),
        }
    }
}

/// A location-tagged post.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: PostId,
    pub user_id: UserId,
    pub content: String,
    pub location: Option<GeoPoint>,
    pub venue_name: Option<String>,
    /// Liking users in like order; each user appears at most once.
    pub likes: Vec<UserId>,
    pub replies: Vec<Reply>,
    pub created_at: DateTime<Utc>,
}

impl Post {
    pub fn new(
        user_id: UserId,
        content: String,
        location: Option<GeoPoint>,
        venue_name: Option<String>,
    ) -> Self {
        Self {
            id: PostId::new(),
            user_id,
            content,
            location,
            venue_name,
            likes: Vec::new(),
            replies: Vec::new(),
            created_at: Utc::now(),
        }
    }

    /// Add a like. Returns `false` when the user already liked the post.
    pub fn add_like(&mut self, user: &UserId) -> bool {
        if self.likes.contains(user) {
            return false;
        }
        self.likes.push(user.clone());
        true
    }
}

impl Located for Post {
    fn location(&self) -> Option<GeoPoint> {
        self.location
    }
}

// ---------------------------------------------------------------------------
// User profile
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: UserId,
    pub email: Option<String>,
    pub name: Option<String>,
    pub avatar: Option<String>,
    #[serde(default)]
    pub bio: String,
    #[serde(default)]
    pub interests: Vec<String>,
    #[serde(default)]
    pub photos: Vec<String>,
    pub location: Option<GeoPoint>,
    pub created_at: DateTime<Utc>,
}

impl UserProfile {
    pub fn new(id: UserId) -> Self {
        Self {
            id,
            email: None,
            name: None,
            avatar: None,
            bio: String::new(),
            interests: Vec::new(),
            photos: Vec::new(),
            location: None,
            created_at: Utc::now(),
        }
    }

    /// Merge a partial update; absent fields keep their current value.
    pub fn apply(&mut self, update: ProfileUpdate) {
        if let Some(email) = update.email {
            self.email = Some(email);
        }
        if let Some(name) = update.name {
            self.name = Some(name);
        }
        if let Some(avatar) = update.avatar {
            self.avatar = Some(avatar);
        }
        if let Some(bio) = update.bio {
            self.bio = bio;
        }
        if let Some(interests) = update.interests {
            self.interests = interests;
        }
        if let Some(photos) = update.photos {
            self.photos = photos;
        }
        if let Some(location) = update.location {
            self.location = Some(location);
        }
    }
}

impl Located for UserProfile {
    fn location(&self) -> Option<GeoPoint> {
        self.location
    }
}

/// Partial profile update sent by `PUT /users/:id`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    pub email: Option<String>,
    pub name: Option<String>,
    pub avatar: Option<String>,
    pub bio: Option<String>,
    pub interests: Option<Vec<String>>,
    pub photos: Option<Vec<String>>,
    pub location: Option<GeoPoint>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_like_is_idempotent() {
        let mut post = Post::new(UserId::from("author"), "hi".into(), None, None);
        let fan = UserId::from("fan");
        assert!(post.add_like(&fan));
        assert!(!post.add_like(&fan));
        assert_eq!(post.likes.len(), 1);
    }

    #[test]
    fn test_match_participants() {
        let m = Match::new(UserId::from("b"), UserId::from("a"));
        assert_eq!(m.id.as_str(), "a_b");
        assert!(m.has_participant(&UserId::from("a")));
        assert!(!m.has_participant(&UserId::from("c")));
        assert_eq!(m.other(&UserId::from("a")), Some(&UserId::from("b")));
        assert_eq!(m.other(&UserId::from("c")), None);
    }

    #[test]
    fn test_profile_merge_keeps_unset_fields() {
        let mut profile = UserProfile::new(UserId::from("u1"));
        profile.name = Some("Ana".into());
        profile.apply(ProfileUpdate {
            bio: Some("coffee".into()),
            location: Some(GeoPoint {
                latitude: 1.0,
                longitude: 2.0,
            }),
            ..Default::default()
        });
        assert_eq!(profile.name.as_deref(), Some("Ana"));
        assert_eq!(profile.bio, "coffee");
        assert!(profile.location.is_some());
    }

    #[test]
    fn test_message_serializes_camel_case() {
        let msg = Message::new(
            ConversationId::from("a_b"),
            UserId::from("a"),
            "hi".into(),
            None,
        );
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["conversationId"], "a_b");
        assert_eq!(json["senderId"], "a");
        assert!(json.get("clientToken").is_none());
    }
}
