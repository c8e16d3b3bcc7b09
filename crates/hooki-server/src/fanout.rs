//! Post ("hook") creation, likes and replies, broadcast to every open
//! connection.
//!
//! Broadcasts are not filtered by proximity; clients filter on their side or
//! on the next `GET /posts`.

use std::sync::Arc;

use hooki_shared::constants::{ANONYMOUS_NAME, MAX_POST_LEN};
use hooki_shared::events::ServerEvent;
use hooki_shared::geo::{filter_within_radius, GeoPoint};
use hooki_shared::models::{Post, Reply};
use hooki_shared::types::{PostId, UserId};
use hooki_shared::HookiError;
use hooki_store::{Store, StoreError};
use serde::Serialize;
use tracing::{debug, info};

use crate::registry::IdentityRegistry;

/// A post as listed to clients, with the author's display fields.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostView {
    #[serde(flatten)]
    pub post: Post,
    pub user_name: String,
    pub user_avatar: Option<String>,
}

#[derive(Clone)]
pub struct PostFanout {
    store: Arc<dyn Store>,
    registry: IdentityRegistry,
}

impl PostFanout {
    pub fn new(store: Arc<dyn Store>, registry: IdentityRegistry) -> Self {
        Self { store, registry }
    }

    /// Persist a new post, then announce it to every connection.
    pub async fn create_post(
        &self,
        author: UserId,
        content: String,
        location: Option<GeoPoint>,
        venue_name: Option<String>,
    ) -> Result<Post, HookiError> {
        if author.is_blank() {
            return Err(HookiError::validation("userId is required"));
        }
        check_text("post", &content)?;
        let location = location.map(GeoPoint::validated).transpose()?;

        let post = Post::new(author, content, location, venue_name);
        self.store.insert_post(&post)?;

        let delivered = self.registry.broadcast(&ServerEvent::NewPost(post.clone())).await;
        info!(post = %post.id, author = %post.user_id, delivered, "Post created");

        Ok(post)
    }

    /// Like a post. Only a new like is broadcast; repeating it changes
    /// nothing.
    pub async fn like(&self, post_id: &PostId, user: &UserId) -> Result<Post, HookiError> {
        if user.is_blank() {
            return Err(HookiError::validation("userId is required"));
        }

        let (post, added) = self
            .store
            .like_post(post_id, user)
            .map_err(|e| post_error(e, post_id))?;

        if added {
            let event = ServerEvent::PostLiked {
                post_id: post_id.clone(),
                user_id: user.clone(),
            };
            self.registry.broadcast(&event).await;
            debug!(post = %post_id, user = %user, likes = post.likes.len(), "Post liked");
        }

        Ok(post)
    }

    pub async fn reply(
        &self,
        post_id: &PostId,
        author: UserId,
        content: String,
    ) -> Result<Reply, HookiError> {
        if author.is_blank() {
            return Err(HookiError::validation("userId is required"));
        }
        check_text("reply", &content)?;

        let reply = Reply::new(author, content);
        self.store
            .append_reply(post_id, &reply)
            .map_err(|e| post_error(e, post_id))?;

        let event = ServerEvent::PostReplied {
            post_id: post_id.clone(),
            reply: reply.clone(),
        };
        self.registry.broadcast(&event).await;
        debug!(post = %post_id, reply = ?reply.id, "Post replied");

        Ok(reply)
    }

    /// Posts newest first, limited to `radius_m` around `origin` when one is
    /// given.
    pub async fn list(
        &self,
        origin: Option<GeoPoint>,
        radius_m: f64,
    ) -> Result<Vec<PostView>, HookiError> {
        let posts = self.store.list_posts()?;
        let mut posts = match origin {
            Some(origin) => {
                filter_within_radius(posts, origin.latitude, origin.longitude, radius_m)
            }
            None => posts,
        };
        posts.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let mut views = Vec::with_capacity(posts.len());
        for post in posts {
            let author = self.store.get_user(&post.user_id)?;
            let (user_name, user_avatar) = match author {
                Some(profile) => (
                    profile.name.unwrap_or_else(|| ANONYMOUS_NAME.to_string()),
                    profile.avatar,
                ),
                None => (ANONYMOUS_NAME.to_string(), None),
            };
            views.push(PostView {
                post,
                user_name,
                user_avatar,
            });
        }
        Ok(views)
    }
}

fn check_text(kind: &str, content: &str) -> Result<(), HookiError> {
    if content.trim().is_empty() {
        return Err(HookiError::validation(format!("{kind} content must not be empty")));
    }
    if content.chars().count() > MAX_POST_LEN {
        return Err(HookiError::validation(format!(
            "{kind} exceeds {MAX_POST_LEN} characters"
        )));
    }
    Ok(())
}

fn post_error(err: StoreError, post_id: &PostId) -> HookiError {
    match err {
        StoreError::NotFound => HookiError::not_found("post", post_id),
        other => other.into(),
    }
}
