use hooki_shared::types::UserId;
use rusqlite::params;

use crate::database::SqliteStore;
use crate::error::Result;
use crate::store::BlockStore;

impl BlockStore for SqliteStore {
    fn block_user(&self, user: &UserId, blocked: &UserId) -> Result<bool> {
        let inserted = self.conn()?.execute(
            "INSERT OR IGNORE INTO blocks (user_id, blocked_id) VALUES (?1, ?2)",
            params![user.as_str(), blocked.as_str()],
        )?;
        Ok(inserted == 1)
    }

    fn unblock_user(&self, user: &UserId, blocked: &UserId) -> Result<bool> {
        let removed = self.conn()?.execute(
            "DELETE FROM blocks WHERE user_id = ?1 AND blocked_id = ?2",
            params![user.as_str(), blocked.as_str()],
        )?;
        Ok(removed > 0)
    }

    fn blocked_users(&self, user: &UserId) -> Result<Vec<UserId>> {
        let conn = self.conn()?;
        let mut stmt =
            conn.prepare("SELECT blocked_id FROM blocks WHERE user_id = ?1 ORDER BY rowid")?;
        let rows = stmt.query_map(params![user.as_str()], |row| row.get::<_, String>(0))?;

        let mut blocked = Vec::new();
        for row in rows {
            blocked.push(UserId(row?));
        }
        Ok(blocked)
    }
}
