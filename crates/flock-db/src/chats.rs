use anyhow::Result;

use crate::Database;
use crate::error::StoreError;
use crate::models::{MessageRow, UserSummaryRow};
use crate::users::OptionalExt;

impl Database {
    /// Find the chat whose participant pair is exactly {a, b}, if one
    /// exists. Chats always have two participants, so checking that both
    /// are members is sufficient.
    pub fn find_chat_between(&self, a: &str, b: &str) -> Result<Option<String>> {
        self.with_conn(|conn| {
            let id = conn
                .query_row(
                    "SELECT c.id FROM chats c
                     WHERE EXISTS (SELECT 1 FROM chat_participants
                                   WHERE chat_id = c.id AND user_id = ?1)
                       AND EXISTS (SELECT 1 FROM chat_participants
                                   WHERE chat_id = c.id AND user_id = ?2)",
                    (a, b),
                    |row| row.get(0),
                )
                .optional()?;
            Ok(id)
        })
    }

    pub fn create_chat(&self, id: &str, a: &str, b: &str) -> Result<(), StoreError> {
        self.with_tx(|tx| {
            tx.execute("INSERT INTO chats (id) VALUES (?1)", [id])?;
            tx.execute(
                "INSERT INTO chat_participants (chat_id, user_id) VALUES (?1, ?2)",
                (id, a),
            )?;
            tx.execute(
                "INSERT INTO chat_participants (chat_id, user_id) VALUES (?1, ?2)",
                (id, b),
            )?;
            Ok(())
        })
    }

    pub fn chat_ids_for_user(&self, user_id: &str) -> Result<Vec<String>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT c.id FROM chats c
                 JOIN chat_participants p ON p.chat_id = c.id
                 WHERE p.user_id = ?1
                 ORDER BY c.created_at",
            )?;
            let ids = stmt
                .query_map([user_id], |row| row.get(0))?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(ids)
        })
    }

    pub fn chat_participants(&self, chat_id: &str) -> Result<Vec<UserSummaryRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT u.id, u.username, u.name, u.avatar, u.bio
                 FROM chat_participants p JOIN users u ON p.user_id = u.id
                 WHERE p.chat_id = ?1",
            )?;
            let rows = stmt
                .query_map([chat_id], |row| {
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

    pub fn is_chat_participant(&self, chat_id: &str, user_id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let found = conn
                .query_row(
                    "SELECT 1 FROM chat_participants WHERE chat_id = ?1 AND user_id = ?2",
                    (chat_id, user_id),
                    |_| Ok(()),
                )
                .optional()?;
            Ok(found.is_some())
        })
    }

    /// Insert a message. `chat_id` is `None` for messages delivered over
    /// the WebSocket, which are not linked to a chat.
    pub fn insert_message(
        &self,
        id: &str,
        chat_id: Option<&str>,
        sender_id: &str,
        content: &str,
        created_at: &str,
    ) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO messages (id, chat_id, sender_id, content, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                rusqlite::params![id, chat_id, sender_id, content, created_at],
            )?;
            Ok(())
        })
    }

    pub fn messages_for_chat(&self, chat_id: &str) -> Result<Vec<MessageRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, chat_id, sender_id, content, created_at
                 FROM messages
                 WHERE chat_id = ?1
                 ORDER BY created_at",
            )?;
            let rows = stmt
                .query_map([chat_id], |row| {
                    Ok(MessageRow {
                        id: row.get(0)?,
                        chat_id: row.get(1)?,
                        sender_id: row.get(2)?,
                        content: row.get(3)?,
                        created_at: row.get(4)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::Database;

    fn db_with_users(ids: &[&str]) -> Database {
        let db = Database::open_in_memory().unwrap();
        for id in ids {
            db.create_user(
                id,
                &format!("user-{id}"),
                &format!("{id}@x.com"),
                "5550000",
                "Test User",
                "hash",
            )
            .unwrap();
        }
        db
    }

    #[test]
    fn chat_between_pair_is_found_regardless_of_order() {
        let db = db_with_users(&["a", "b"]);
        db.create_chat("c1", "a", "b").unwrap();

        assert_eq!(db.find_chat_between("a", "b").unwrap().as_deref(), Some("c1"));
        assert_eq!(db.find_chat_between("b", "a").unwrap().as_deref(), Some("c1"));
    }

    #[test]
    fn no_chat_between_strangers() {
        let db = db_with_users(&["a", "b", "c"]);
        db.create_chat("c1", "a", "b").unwrap();
        assert!(db.find_chat_between("a", "c").unwrap().is_none());
    }

    #[test]
    fn messages_are_scoped_to_their_chat() {
        let db = db_with_users(&["a", "b"]);
        db.create_chat("c1", "a", "b").unwrap();

        db.insert_message("m1", Some("c1"), "a", "hello", "2026-01-01T00:00:00Z")
            .unwrap();
        db.insert_message("m2", None, "b", "socket message", "2026-01-01T00:00:01Z")
            .unwrap();

        let messages = db.messages_for_chat("c1").unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].content, "hello");
    }

    #[test]
    fn participant_check() {
        let db = db_with_users(&["a", "b", "c"]);
        db.create_chat("c1", "a", "b").unwrap();

        assert!(db.is_chat_participant("c1", "a").unwrap());
        assert!(!db.is_chat_participant("c1", "c").unwrap());
    }
}
