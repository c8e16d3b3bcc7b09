//! v001 -- Initial schema creation.
//!
//! Creates the tables for profiles, posts (with likes and replies), matches,
//! conversation messages and blocks.

use rusqlite::Connection;

/// SQL executed when upgrading from version 0 to version 1.
const UP_SQL: &str = r#"
-- ----------------------------------------------------------------
-- User profiles
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS users (
    id         TEXT PRIMARY KEY NOT NULL,
    email      TEXT,
    name       TEXT,
    avatar     TEXT,
    bio        TEXT NOT NULL DEFAULT '',
    interests  TEXT NOT NULL DEFAULT '[]',    -- JSON array of strings
    photos     TEXT NOT NULL DEFAULT '[]',    -- JSON array of strings
    latitude   REAL,
    longitude  REAL,
    created_at TEXT NOT NULL                  -- RFC-3339
);

-- ----------------------------------------------------------------
-- Posts ("hooks")
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS posts (
    id         TEXT PRIMARY KEY NOT NULL,
    user_id    TEXT NOT NULL,
    content    TEXT NOT NULL,
    latitude   REAL,
    longitude  REAL,
    venue_name TEXT,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_posts_created_at ON posts(created_at);

-- Likes keep insertion order through the implicit rowid.
CREATE TABLE IF NOT EXISTS post_likes (
    post_id TEXT NOT NULL,
    user_id TEXT NOT NULL,

    PRIMARY KEY (post_id, user_id),
    FOREIGN KEY (post_id) REFERENCES posts(id) ON DELETE CASCADE
);

CREATE TABLE IF NOT EXISTS post_replies (
    id         TEXT PRIMARY KEY NOT NULL,
    post_id    TEXT NOT NULL,
    user_id    TEXT NOT NULL,
    content    TEXT NOT NULL,
    created_at TEXT NOT NULL,

    FOREIGN KEY (post_id) REFERENCES posts(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_post_replies_post ON post_replies(post_id);

-- ----------------------------------------------------------------
-- Matches (conversation headers)
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS matches (
    id              TEXT PRIMARY KEY NOT NULL,  -- sorted pair of user ids
    user_id1        TEXT NOT NULL,
    user_id2        TEXT NOT NULL,
    created_at      TEXT NOT NULL,
    last_message    TEXT,
    last_message_at TEXT
);

CREATE INDEX IF NOT EXISTS idx_matches_user1 ON matches(user_id1);
CREATE INDEX IF NOT EXISTS idx_matches_user2 ON matches(user_id2);

-- ----------------------------------------------------------------
-- Conversation messages
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS messages (
    id              TEXT PRIMARY KEY NOT NULL,
    conversation_id TEXT NOT NULL,
    seq             INTEGER NOT NULL,
    sender_id       TEXT NOT NULL,
    content         TEXT NOT NULL,
    created_at      TEXT NOT NULL,
    read            INTEGER NOT NULL DEFAULT 0,
    client_token    TEXT,

    UNIQUE (conversation_id, seq)
);

CREATE INDEX IF NOT EXISTS idx_messages_client_token
    ON messages(conversation_id, client_token);

-- ----------------------------------------------------------------
-- Blocks
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS blocks (
    user_id    TEXT NOT NULL,
    blocked_id TEXT NOT NULL,

    PRIMARY KEY (user_id, blocked_id)
);
"#;

/// Apply the initial schema.
pub fn up(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(UP_SQL)
}
