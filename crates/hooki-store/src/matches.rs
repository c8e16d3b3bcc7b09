use hooki_shared::models::Match;
use hooki_shared::types::{ConversationId, UserId};
use rusqlite::{params, OptionalExtension};

use crate::database::{parse_timestamp, SqliteStore};
use crate::error::Result;
use crate::store::MatchStore;

const MATCH_COLUMNS: &str = "id, user_id1, user_id2, created_at, last_message, last_message_at";

impl MatchStore for SqliteStore {
    fn insert_match(&self, m: &Match) -> Result<(Match, bool)> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        let inserted = tx.execute(
            "INSERT OR IGNORE INTO matches (id, user_id1, user_id2, created_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                m.id.as_str(),
                m.user_id1.as_str(),
                m.user_id2.as_str(),
                m.created_at.to_rfc3339(),
            ],
        )?;
        let stored = tx.query_row(
            &format!("SELECT {MATCH_COLUMNS} FROM matches WHERE id = ?1"),
            params![m.id.as_str()],
            row_to_match,
        )?;

        tx.commit()?;
        Ok((stored, inserted == 1))
    }

    fn get_match(&self, id: &ConversationId) -> Result<Option<Match>> {
        let m = self
            .conn()?
            .query_row(
                &format!("SELECT {MATCH_COLUMNS} FROM matches WHERE id = ?1"),
                params![id.as_str()],
                row_to_match,
            )
            .optional()?;
        Ok(m)
    }

    fn matches_for_user(&self, user: &UserId) -> Result<Vec<Match>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {MATCH_COLUMNS} FROM matches
             WHERE user_id1 = ?1 OR user_id2 = ?1
             ORDER BY created_at, id"
        ))?;
        let rows = stmt.query_map(params![user.as_str()], row_to_match)?;

        let mut matches = Vec::new();
        for row in rows {
            matches.push(row?);
        }
        Ok(matches)
    }
}

fn row_to_match(row: &rusqlite::Row<'_>) -> rusqlite::Result<Match> {
    let id: String = row.get(0)?;
    let user_id1: String = row.get(1)?;
    let user_id2: String = row.get(2)?;
    let created_at: String = row.get(3)?;
    let last_message_at: Option<String> = row.get(5)?;

    Ok(Match {
        id: ConversationId(id),
        user_id1: UserId(user_id1),
        user_id2: UserId(user_id2),
        created_at: parse_timestamp(3, &created_at)?,
        last_message: row.get(4)?,
        last_message_at: last_message_at
            .map(|raw| parse_timestamp(5, &raw))
            .transpose()?,
    })
}
