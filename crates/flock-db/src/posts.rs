use anyhow::Result;
use rusqlite::Connection;

use crate::Database;
use crate::models::{CommentRef, LikeRow, PostRow};

impl Database {
    pub fn create_post(
        &self,
        id: &str,
        author_id: &str,
        content: &str,
        created_at: &str,
    ) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO posts (id, author_id, content, created_at)
                 VALUES (?1, ?2, ?3, ?4)",
                (id, author_id, content, created_at),
            )?;
            Ok(())
        })
    }

    /// Posts by one author, optionally filtered by a case-insensitive
    /// content substring.
    pub fn posts_by_author(&self, author_id: &str, search: Option<&str>) -> Result<Vec<PostRow>> {
        self.with_conn(|conn| {
            let pattern = like_pattern(search);
            let mut stmt = conn.prepare(
                "SELECT p.id, p.content, p.author_id, u.username, u.name, u.avatar, p.created_at
                 FROM posts p JOIN users u ON p.author_id = u.id
                 WHERE p.author_id = ?1 AND (?2 IS NULL OR p.content LIKE ?2)
                 ORDER BY p.created_at",
            )?;
            collect_posts(&mut stmt.query(rusqlite::params![author_id, pattern])?)
        })
    }

    /// All posts, newest first.
    pub fn timeline(&self, search: Option<&str>) -> Result<Vec<PostRow>> {
        self.with_conn(|conn| {
            let pattern = like_pattern(search);
            let mut stmt = conn.prepare(
                "SELECT p.id, p.content, p.author_id, u.username, u.name, u.avatar, p.created_at
                 FROM posts p JOIN users u ON p.author_id = u.id
                 WHERE ?1 IS NULL OR p.content LIKE ?1
                 ORDER BY p.created_at DESC",
            )?;
            collect_posts(&mut stmt.query(rusqlite::params![pattern])?)
        })
    }

    pub fn get_post(&self, id: &str) -> Result<Option<PostRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT p.id, p.content, p.author_id, u.username, u.name, u.avatar, p.created_at
                 FROM posts p JOIN users u ON p.author_id = u.id
                 WHERE p.id = ?1",
            )?;
            let mut rows = collect_posts(&mut stmt.query([id])?)?;
            Ok(rows.pop())
        })
    }

    /// Returns false when no post with this id exists.
    pub fn update_post(&self, id: &str, content: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute("UPDATE posts SET content = ?2 WHERE id = ?1", (id, content))?;
            Ok(changed > 0)
        })
    }

    /// Returns false when no post with this id exists.
    pub fn delete_post(&self, id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            conn.execute("DELETE FROM post_likes WHERE post_id = ?1", [id])?;
            conn.execute("DELETE FROM post_comments WHERE post_id = ?1", [id])?;
            let removed = conn.execute("DELETE FROM posts WHERE id = ?1", [id])?;
            Ok(removed > 0)
        })
    }

    /// Batch-fetch like rows for a set of post ids.
    pub fn likes_for_posts(&self, post_ids: &[String]) -> Result<Vec<LikeRow>> {
        if post_ids.is_empty() {
            return Ok(vec![]);
        }

        self.with_conn(|conn| {
            let (sql, params) = in_query(
                "SELECT post_id, user_id FROM post_likes WHERE post_id IN",
                post_ids,
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(params.as_slice(), |row| {
                    Ok(LikeRow {
                        post_id: row.get(0)?,
                        user_id: row.get(1)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Batch-fetch comment references for a set of post ids.
    pub fn comments_for_posts(&self, post_ids: &[String]) -> Result<Vec<CommentRef>> {
        if post_ids.is_empty() {
            return Ok(vec![]);
        }

        self.with_conn(|conn| {
            let (sql, params) = in_query(
                "SELECT post_id, id FROM post_comments WHERE post_id IN",
                post_ids,
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(params.as_slice(), |row| {
                    Ok(CommentRef {
                        post_id: row.get(0)?,
                        comment_id: row.get(1)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }
}

// SQLite LIKE is case-insensitive for ASCII, matching the original
// case-insensitive substring search.
fn like_pattern(search: Option<&str>) -> Option<String> {
    search.map(|s| format!("%{s}%"))
}

fn in_query<'a>(
    prefix: &str,
    ids: &'a [String],
) -> (String, Vec<&'a dyn rusqlite::types::ToSql>) {
    let placeholders: Vec<String> = (1..=ids.len()).map(|i| format!("?{}", i)).collect();
    let sql = format!("{} ({})", prefix, placeholders.join(", "));
    let params: Vec<&dyn rusqlite::types::ToSql> =
        ids.iter().map(|id| id as &dyn rusqlite::types::ToSql).collect();
    (sql, params)
}

fn collect_posts(rows: &mut rusqlite::Rows) -> Result<Vec<PostRow>> {
    let mut out = Vec::new();
    while let Some(row) = rows.next()? {
        out.push(PostRow {
            id: row.get(0)?,
            content: row.get(1)?,
            author_id: row.get(2)?,
            author_username: row.get(3)?,
            author_name: row.get(4)?,
            author_avatar: row.get(5)?,
            created_at: row.get(6)?,
        });
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use crate::Database;

    fn db_with_author() -> Database {
        let db = Database::open_in_memory().unwrap();
        db.create_user("a", "alice", "alice@x.com", "5550000", "Alice", "hash")
            .unwrap();
        db.create_user("b", "bob", "bob@x.com", "5550001", "Bob", "hash")
            .unwrap();
        db
    }

    #[test]
    fn search_filters_by_substring() {
        let db = db_with_author();
        db.create_post("p1", "a", "hello world", "2026-01-01T00:00:00Z")
            .unwrap();
        db.create_post("p2", "a", "goodbye", "2026-01-01T00:00:01Z")
            .unwrap();

        let hits = db.posts_by_author("a", Some("world")).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, "p1");

        let all = db.posts_by_author("a", None).unwrap();
        assert_eq!(all.len(), 2);
    }

    #[test]
    fn timeline_is_newest_first_and_cross_author() {
        let db = db_with_author();
        db.create_post("p1", "a", "first", "2026-01-01T00:00:00Z")
            .unwrap();
        db.create_post("p2", "b", "second", "2026-01-02T00:00:00Z")
            .unwrap();

        let posts = db.timeline(None).unwrap();
        assert_eq!(posts.len(), 2);
        assert_eq!(posts[0].id, "p2");
        assert_eq!(posts[0].author_username, "bob");
    }

    #[test]
    fn update_and_delete_report_missing_posts() {
        let db = db_with_author();
        db.create_post("p1", "a", "original", "2026-01-01T00:00:00Z")
            .unwrap();

        assert!(db.update_post("p1", "edited").unwrap());
        assert_eq!(db.get_post("p1").unwrap().unwrap().content, "edited");
        assert!(!db.update_post("nope", "x").unwrap());

        assert!(db.delete_post("p1").unwrap());
        assert!(!db.delete_post("p1").unwrap());
    }
}
