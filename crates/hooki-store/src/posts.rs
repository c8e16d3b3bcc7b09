use hooki_shared::models::{Post, Reply};
use hooki_shared::types::{PostId, ReplyId, UserId};
use rusqlite::{params, Connection, OptionalExtension};

use crate::database::{parse_timestamp, SqliteStore};
use crate::error::{Result, StoreError};
use crate::store::PostStore;
use crate::users::{join_location, split_location};

impl PostStore for SqliteStore {
    fn insert_post(&self, post: &Post) -> Result<()> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        let (latitude, longitude) = split_location(post.location);

        tx.execute(
            "INSERT INTO posts (id, user_id, content, latitude, longitude, venue_name, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                post.id.as_str(),
                post.user_id.as_str(),
                post.content,
                latitude,
                longitude,
                post.venue_name,
                post.created_at.to_rfc3339(),
            ],
        )?;
        for user in &post.likes {
            tx.execute(
                "INSERT OR IGNORE INTO post_likes (post_id, user_id) VALUES (?1, ?2)",
                params![post.id.as_str(), user.as_str()],
            )?;
        }
        for reply in &post.replies {
            insert_reply(&tx, &post.id, reply)?;
        }

        tx.commit()?;
        Ok(())
    }

    fn get_post(&self, id: &PostId) -> Result<Option<Post>> {
        let conn = self.conn()?;
        load_post(&conn, id)
    }

    fn list_posts(&self) -> Result<Vec<Post>> {
        let conn = self.conn()?;
        let ids: Vec<String> = {
            let mut stmt = conn.prepare("SELECT id FROM posts ORDER BY created_at, rowid")?;
            let rows = stmt.query_map([], |row| row.get(0))?;
            rows.collect::<rusqlite::Result<_>>()?
        };

        let mut posts = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(post) = load_post(&conn, &PostId(id))? {
                posts.push(post);
            }
        }
        Ok(posts)
    }

    fn like_post(&self, id: &PostId, user: &UserId) -> Result<(Post, bool)> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        if !post_exists(&tx, id)? {
            return Err(StoreError::NotFound);
        }
        let inserted = tx.execute(
            "INSERT OR IGNORE INTO post_likes (post_id, user_id) VALUES (?1, ?2)",
            params![id.as_str(), user.as_str()],
        )?;
        let post = load_post(&tx, id)?.ok_or(StoreError::NotFound)?;

        tx.commit()?;
        Ok((post, inserted == 1))
    }

    fn append_reply(&self, id: &PostId, reply: &Reply) -> Result<()> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        if !post_exists(&tx, id)? {
            return Err(StoreError::NotFound);
        }
        insert_reply(&tx, id, reply)?;

        tx.commit()?;
        Ok(())
    }
}

fn post_exists(conn: &Connection, id: &PostId) -> Result<bool> {
    let found = conn
        .query_row(
            "SELECT 1 FROM posts WHERE id = ?1",
            params![id.as_str()],
            |_| Ok(()),
        )
        .optional()?;
    Ok(found.is_some())
}

fn insert_reply(conn: &Connection, post_id: &PostId, reply: &Reply) -> Result<()> {
    conn.execute(
        "INSERT INTO post_replies (id, post_id, user_id, content, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            reply.id.0,
            post_id.as_str(),
            reply.user_id.as_str(),
            reply.content,
            reply.created_at.to_rfc3339(),
        ],
    )?;
    Ok(())
}

fn load_post(conn: &Connection, id: &PostId) -> Result<Option<Post>> {
    let post = conn
        .query_row(
            "SELECT id, user_id, content, latitude, longitude, venue_name, created_at
             FROM posts WHERE id = ?1",
            params![id.as_str()],
            row_to_post,
        )
        .optional()?;
    let Some(mut post) = post else {
        return Ok(None);
    };

    let mut stmt =
        conn.prepare("SELECT user_id FROM post_likes WHERE post_id = ?1 ORDER BY rowid")?;
    let likes = stmt.query_map(params![id.as_str()], |row| row.get::<_, String>(0))?;
    for like in likes {
        post.likes.push(UserId(like?));
    }

    let mut stmt = conn.prepare(
        "SELECT id, user_id, content, created_at FROM post_replies
         WHERE post_id = ?1 ORDER BY rowid",
    )?;
    let replies = stmt.query_map(params![id.as_str()], row_to_reply)?;
    for reply in replies {
        post.replies.push(reply?);
    }

    Ok(Some(post))
}

fn row_to_post(row: &rusqlite::Row<'_>) -> rusqlite::Result<Post> {
    let id: String = row.get(0)?;
    let user_id: String = row.get(1)?;
    let created_at: String = row.get(6)?;

    Ok(Post {
        id: PostId(id),
        user_id: UserId(user_id),
        content: row.get(2)?,
        location: join_location(row.get(3)?, row.get(4)?),
        venue_name: row.get(5)?,
        likes: Vec::new(),
        replies: Vec::new(),
        created_at: parse_timestamp(6, &created_at)?,
    })
}

fn row_to_reply(row: &rusqlite::Row<'_>) -> rusqlite::Result<Reply> {
    let id: String = row.get(0)?;
    let user_id: String = row.get(1)?;
    let created_at: String = row.get(3)?;

    Ok(Reply {
        id: ReplyId(id),
        user_id: UserId(user_id),
        content: row.get(2)?,
        created_at: parse_timestamp(3, &created_at)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use hooki_shared::geo::GeoPoint;

    fn sample_post() -> Post {
        Post::new(
            UserId::from("author"),
            "live music tonight".into(),
            Some(GeoPoint {
                latitude: 10.0,
                longitude: 10.0,
            }),
            Some("Blue Bar".into()),
        )
    }

    #[test]
    fn post_round_trip_with_likes_and_replies() {
        let store = SqliteStore::open_in_memory().unwrap();
        let post = sample_post();
        store.insert_post(&post).unwrap();

        let (_, first) = store.like_post(&post.id, &UserId::from("fan1")).unwrap();
        let (_, dup) = store.like_post(&post.id, &UserId::from("fan1")).unwrap();
        let (liked, _) = store.like_post(&post.id, &UserId::from("fan2")).unwrap();
        assert!(first);
        assert!(!dup);
        assert_eq!(liked.likes, vec![UserId::from("fan1"), UserId::from("fan2")]);

        let reply = Reply::new(UserId::from("fan1"), "on my way".into());
        store.append_reply(&post.id, &reply).unwrap();

        let fetched = store.get_post(&post.id).unwrap().unwrap();
        assert_eq!(fetched.replies, vec![reply]);
        assert_eq!(fetched.location, post.location);
        assert_eq!(fetched.venue_name.as_deref(), Some("Blue Bar"));
        assert_eq!(store.list_posts().unwrap().len(), 1);
    }

    #[test]
    fn mutations_on_unknown_post_fail() {
        let store = SqliteStore::open_in_memory().unwrap();
        let id = PostId::from("hook_missing");
        assert!(matches!(
            store.like_post(&id, &UserId::from("u")),
            Err(StoreError::NotFound)
        ));
        let reply = Reply::new(UserId::from("u"), "hello?".into());
        assert!(matches!(store.append_reply(&id, &reply), Err(StoreError::NotFound)));
        assert!(store.get_post(&id).unwrap().is_none());
    }
}
