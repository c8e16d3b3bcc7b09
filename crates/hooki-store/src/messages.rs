use chrono::{DateTime, Utc};
use hooki_shared::models::{ConversationSummary, Message};
use hooki_shared::types::{ConversationId, MessageId, UserId};
use rusqlite::{params, Connection, OptionalExtension};

use crate::database::{parse_timestamp, SqliteStore};
use crate::error::Result;
use crate::store::ConversationStore;

const MESSAGE_COLUMNS: &str =
    "id, conversation_id, seq, sender_id, content, created_at, read, client_token";

impl ConversationStore for SqliteStore {
    fn append_message(&self, mut message: Message) -> Result<Message> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        let last: Option<(i64, String)> = tx
            .query_row(
                "SELECT seq, created_at FROM messages
                 WHERE conversation_id = ?1 ORDER BY seq DESC LIMIT 1",
                params![message.conversation_id.as_str()],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        let mut next_seq = 1;
        if let Some((seq, raw_ts)) = last {
            next_seq = seq + 1;
            let last_at = parse_timestamp(1, &raw_ts)?;
            if message.created_at < last_at {
                message.created_at = last_at;
            }
        }
        message.seq = next_seq as u64;

        tx.execute(
            "INSERT INTO messages (id, conversation_id, seq, sender_id, content, created_at, read, client_token)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                message.id.0,
                message.conversation_id.as_str(),
                next_seq,
                message.sender_id.as_str(),
                message.content,
                message.created_at.to_rfc3339(),
                message.read,
                message.client_token,
            ],
        )?;
        update_summary(&tx, &message.conversation_id, &message.content, message.created_at)?;

        tx.commit()?;
        Ok(message)
    }

    fn list_messages(&self, id: &ConversationId) -> Result<Vec<Message>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {MESSAGE_COLUMNS} FROM messages WHERE conversation_id = ?1 ORDER BY seq ASC"
        ))?;
        let rows = stmt.query_map(params![id.as_str()], row_to_message)?;

        let mut messages = Vec::new();
        for row in rows {
            messages.push(row?);
        }
        Ok(messages)
    }

    fn find_by_client_token(
        &self,
        id: &ConversationId,
        token: &str,
    ) -> Result<Option<Message>> {
        let message = self
            .conn()?
            .query_row(
                &format!(
                    "SELECT {MESSAGE_COLUMNS} FROM messages
                     WHERE conversation_id = ?1 AND client_token = ?2
                     ORDER BY seq ASC LIMIT 1"
                ),
                params![id.as_str(), token],
                row_to_message,
            )
            .optional()?;
        Ok(message)
    }

    fn summary(&self, id: &ConversationId) -> Result<Option<ConversationSummary>> {
        let conn = self.conn()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM messages WHERE conversation_id = ?1",
            params![id.as_str()],
            |row| row.get(0),
        )?;
        let last: Option<(String, String)> = conn
            .query_row(
                "SELECT content, created_at FROM messages
                 WHERE conversation_id = ?1 ORDER BY seq DESC LIMIT 1",
                params![id.as_str()],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        match last {
            Some((last_message, raw_ts)) => Ok(Some(ConversationSummary {
                last_message,
                last_message_at: parse_timestamp(1, &raw_ts)?,
                message_count: count as u64,
            })),
            None => Ok(None),
        }
    }

    fn mark_read(&self, id: &ConversationId, reader: &UserId) -> Result<usize> {
        let changed = self.conn()?.execute(
            "UPDATE messages SET read = 1
             WHERE conversation_id = ?1 AND sender_id != ?2 AND read = 0",
            params![id.as_str(), reader.as_str()],
        )?;
        Ok(changed)
    }
}

/// Refresh the last-message preview on the match row, if there is one.
fn update_summary(
    conn: &Connection,
    id: &ConversationId,
    last_message: &str,
    last_message_at: DateTime<Utc>,
) -> Result<()> {
    conn.execute(
        "UPDATE matches SET last_message = ?2, last_message_at = ?3 WHERE id = ?1",
        params![id.as_str(), last_message, last_message_at.to_rfc3339()],
    )?;
    Ok(())
}

fn row_to_message(row: &rusqlite::Row<'_>) -> rusqlite::Result<Message> {
    let id: String = row.get(0)?;
    let conversation_id: String = row.get(1)?;
    let seq: i64 = row.get(2)?;
    let sender_id: String = row.get(3)?;
    let created_at: String = row.get(5)?;

    Ok(Message {
        id: MessageId(id),
        conversation_id: ConversationId(conversation_id),
        seq: seq as u64,
        sender_id: UserId(sender_id),
        content: row.get(4)?,
        created_at: parse_timestamp(5, &created_at)?,
        read: row.get(6)?,
        client_token: row.get(7)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MatchStore;
    use hooki_shared::models::Match;

    #[test]
    fn append_orders_by_sequence_and_updates_preview() {
        let store = SqliteStore::open_in_memory().unwrap();
        let m = Match::new(UserId::from("a"), UserId::from("b"));
        store.insert_match(&m).unwrap();

        for text in ["hi", "how are you", "see you at 8"] {
            store
                .append_message(Message::new(m.id.clone(), UserId::from("a"), text.into(), None))
                .unwrap();
        }

        let listed = store.list_messages(&m.id).unwrap();
        let seqs: Vec<u64> = listed.iter().map(|m| m.seq).collect();
        assert_eq!(seqs, vec![1, 2, 3]);
        assert_eq!(listed[2].content, "see you at 8");

        let summary = store.summary(&m.id).unwrap().unwrap();
        assert_eq!(summary.message_count, 3);
        assert_eq!(summary.last_message, "see you at 8");

        let header = store.get_match(&m.id).unwrap().unwrap();
        assert_eq!(header.last_message.as_deref(), Some("see you at 8"));
    }

    #[test]
    fn client_token_lookup_and_mark_read() {
        let store = SqliteStore::open_in_memory().unwrap();
        let conv = ConversationId::from("a_b");
        let sent = store
            .append_message(Message::new(
                conv.clone(),
                UserId::from("a"),
                "hello".into(),
                Some("tok-1".into()),
            ))
            .unwrap();

        let found = store.find_by_client_token(&conv, "tok-1").unwrap().unwrap();
        assert_eq!(found.id, sent.id);
        assert!(store.find_by_client_token(&conv, "tok-2").unwrap().is_none());

        assert_eq!(store.mark_read(&conv, &UserId::from("a")).unwrap(), 0);
        assert_eq!(store.mark_read(&conv, &UserId::from("b")).unwrap(), 1);
        assert_eq!(store.mark_read(&conv, &UserId::from("b")).unwrap(), 0);
        assert!(store.list_messages(&conv).unwrap()[0].read);
    }

    #[test]
    fn history_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hooki.db");
        let conv = ConversationId::from("a_b");

        {
            let store = SqliteStore::open_at(&path).unwrap();
            store
                .append_message(Message::new(conv.clone(), UserId::from("a"), "kept".into(), None))
                .unwrap();
        }

        let store = SqliteStore::open_at(&path).unwrap();
        let listed = store.list_messages(&conv).unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].content, "kept");
    }
}
