use anyhow::Result;
use rusqlite::Connection;

use crate::Database;
use crate::error::StoreError;
use crate::models::{UserRow, UserSummaryRow};

const USER_COLUMNS: &str =
    "id, username, email, phone, name, password, avatar, bio, website, location, created_at";

impl Database {
    pub fn create_user(
        &self,
        id: &str,
        username: &str,
        email: &str,
        phone: &str,
        name: &str,
        password_hash: &str,
    ) -> Result<(), StoreError> {
        self.with_tx(|tx| {
            tx.execute(
                "INSERT INTO users (id, username, email, phone, name, password)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                (id, username, email, phone, name, password_hash),
            )
            .map_err(|e| {
                if StoreError::is_unique_violation(&e) {
                    StoreError::DuplicateUser
                } else {
                    e.into()
                }
            })?;
            Ok(())
        })
    }

    pub fn get_user_by_email(&self, email: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "email", email))
    }

    pub fn get_user_by_id(&self, id: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "id", id))
    }

    pub fn update_profile(
        &self,
        id: &str,
        username: &str,
        phone: &str,
        name: &str,
        avatar: Option<&str>,
        bio: Option<&str>,
        website: Option<&str>,
        location: Option<&str>,
    ) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE users
                 SET username = ?2, phone = ?3, name = ?4, avatar = ?5,
                     bio = ?6, website = ?7, location = ?8
                 WHERE id = ?1",
                rusqlite::params![id, username, phone, name, avatar, bio, website, location],
            )?;
            Ok(())
        })
    }

    pub fn list_users(&self) -> Result<Vec<UserRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn
                .prepare(&format!("SELECT {USER_COLUMNS} FROM users ORDER BY created_at"))?;
            let rows = stmt
                .query_map([], user_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    // -- Relationship id lists (for the full profile view) --

    pub fn follower_ids(&self, user_id: &str) -> Result<Vec<String>> {
        self.id_list(
            "SELECT follower_id FROM follows WHERE followed_id = ?1",
            user_id,
        )
    }

    pub fn following_ids(&self, user_id: &str) -> Result<Vec<String>> {
        self.id_list(
            "SELECT followed_id FROM follows WHERE follower_id = ?1",
            user_id,
        )
    }

    pub fn friend_ids(&self, user_id: &str) -> Result<Vec<String>> {
        self.id_list("SELECT friend_id FROM friends WHERE user_id = ?1", user_id)
    }

    pub fn friend_request_ids(&self, user_id: &str) -> Result<Vec<String>> {
        self.id_list(
            "SELECT requester_id FROM friend_requests WHERE recipient_id = ?1",
            user_id,
        )
    }

    fn id_list(&self, sql: &str, user_id: &str) -> Result<Vec<String>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(sql)?;
            let ids = stmt
                .query_map([user_id], |row| row.get(0))?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(ids)
        })
    }

    // -- Relationship listings (public profile summaries) --

    pub fn followers_of(&self, user_id: &str) -> Result<Vec<UserSummaryRow>> {
        self.summaries(
            "SELECT u.id, u.username, u.name, u.avatar, u.bio
             FROM follows f JOIN users u ON f.follower_id = u.id
             WHERE f.followed_id = ?1",
            user_id,
        )
    }

    pub fn following_of(&self, user_id: &str) -> Result<Vec<UserSummaryRow>> {
        self.summaries(
            "SELECT u.id, u.username, u.name, u.avatar, u.bio
             FROM follows f JOIN users u ON f.followed_id = u.id
             WHERE f.follower_id = ?1",
            user_id,
        )
    }

    pub fn friends_of(&self, user_id: &str) -> Result<Vec<UserSummaryRow>> {
        self.summaries(
            "SELECT u.id, u.username, u.name, u.avatar, u.bio
             FROM friends f JOIN users u ON f.friend_id = u.id
             WHERE f.user_id = ?1",
            user_id,
        )
    }

    pub fn friend_requests_of(&self, user_id: &str) -> Result<Vec<UserSummaryRow>> {
        self.summaries(
            "SELECT u.id, u.username, u.name, u.avatar, u.bio
             FROM friend_requests r JOIN users u ON r.requester_id = u.id
             WHERE r.recipient_id = ?1",
            user_id,
        )
    }

    fn summaries(&self, sql: &str, user_id: &str) -> Result<Vec<UserSummaryRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(sql)?;
            let rows = stmt
                .query_map([user_id], |row| {
                    Ok(UserSummaryRow {
                        id: row.get(0)?,
                        username: row.get(1)?,
                        name: row.get(2)?,
                        avatar: row.get(3)?,
                        bio: row.get(4)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }
}

fn query_user(conn: &Connection, column: &str, value: &str) -> Result<Option<UserRow>> {
    let mut stmt =
        conn.prepare(&format!("SELECT {USER_COLUMNS} FROM users WHERE {column} = ?1"))?;

    let row = stmt.query_row([value], user_from_row).optional()?;
    Ok(row)
}

fn user_from_row(row: &rusqlite::Row) -> std::result::Result<UserRow, rusqlite::Error> {
    Ok(UserRow {
        id: row.get(0)?,
        username: row.get(1)?,
        email: row.get(2)?,
        phone: row.get(3)?,
        name: row.get(4)?,
        password: row.get(5)?,
        avatar: row.get(6)?,
        bio: row.get(7)?,
        website: row.get(8)?,
        location: row.get(9)?,
        created_at: row.get(10)?,
    })
}

/// Extension trait for optional query results
pub(crate) trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}
