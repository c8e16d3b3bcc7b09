use hooki_shared::geo::GeoPoint;
use hooki_shared::models::UserProfile;
use hooki_shared::types::UserId;
use rusqlite::{params, OptionalExtension};

use crate::database::{parse_timestamp, SqliteStore};
use crate::error::Result;
use crate::store::UserStore;

const USER_COLUMNS: &str =
    "id, email, name, avatar, bio, interests, photos, latitude, longitude, created_at";

impl UserStore for SqliteStore {
    fn put_user(&self, user: &UserProfile) -> Result<()> {
        let interests = serde_json::to_string(&user.interests)?;
        let photos = serde_json::to_string(&user.photos)?;
        let (latitude, longitude) = split_location(user.location);

        self.conn()?.execute(
            "INSERT INTO users (id, email, name, avatar, bio, interests, photos, latitude, longitude, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
             ON CONFLICT(id) DO UPDATE SET
                email = excluded.email,
                name = excluded.name,
                avatar = excluded.avatar,
                bio = excluded.bio,
                interests = excluded.interests,
                photos = excluded.photos,
                latitude = excluded.latitude,
                longitude = excluded.longitude",
            params![
                user.id.as_str(),
                user.email,
                user.name,
                user.avatar,
                user.bio,
                interests,
                photos,
                latitude,
                longitude,
                user.created_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    fn get_user(&self, id: &UserId) -> Result<Option<UserProfile>> {
        let user = self
            .conn()?
            .query_row(
                &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"),
                params![id.as_str()],
                row_to_user,
            )
            .optional()?;
        Ok(user)
    }

    fn list_users(&self) -> Result<Vec<UserProfile>> {
        let conn = self.conn()?;
        let mut stmt =
            conn.prepare(&format!("SELECT {USER_COLUMNS} FROM users ORDER BY created_at, id"))?;
        let rows = stmt.query_map([], row_to_user)?;

        let mut users = Vec::new();
        for row in rows {
            users.push(row?);
        }
        Ok(users)
    }
}

pub(crate) fn split_location(location: Option<GeoPoint>) -> (Option<f64>, Option<f64>) {
    match location {
        Some(point) => (Some(point.latitude), Some(point.longitude)),
        None => (None, None),
    }
}

pub(crate) fn join_location(latitude: Option<f64>, longitude: Option<f64>) -> Option<GeoPoint> {
    match (latitude, longitude) {
        (Some(latitude), Some(longitude)) => Some(GeoPoint {
            latitude,
            longitude,
        }),
        _ => None,
    }
}

fn json_list(idx: usize, raw: &str) -> rusqlite::Result<Vec<String>> {
    serde_json::from_str(raw).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}

fn row_to_user(row: &rusqlite::Row<'_>) -> rusqlite::Result<UserProfile> {
    let id: String = row.get(0)?;
    let interests: String = row.get(5)?;
    let photos: String = row.get(6)?;
    let created_at: String = row.get(9)?;

    Ok(UserProfile {
        id: UserId(id),
        email: row.get(1)?,
        name: row.get(2)?,
        avatar: row.get(3)?,
        bio: row.get(4)?,
        interests: json_list(5, &interests)?,
        photos: json_list(6, &photos)?,
        location: join_location(row.get(7)?, row.get(8)?),
        created_at: parse_timestamp(9, &created_at)?,
    })
}
