use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS users (
            id          TEXT PRIMARY KEY,
            username    TEXT NOT NULL UNIQUE,
            email       TEXT NOT NULL UNIQUE,
            phone       TEXT,
            name        TEXT NOT NULL,
            password    TEXT NOT NULL,
            avatar      TEXT,
            bio         TEXT,
            website     TEXT,
            location    TEXT,
            created_at  TEXT NOT NULL DEFAULT (datetime('now'))
        );

        -- A row (follower_id, followed_id) means follower_id follows
        -- followed_id. The one-row representation keeps the two sides of a
        -- follow consistent by construction.
        CREATE TABLE IF NOT EXISTS follows (
            follower_id TEXT NOT NULL REFERENCES users(id),
            followed_id TEXT NOT NULL REFERENCES users(id),
            created_at  TEXT NOT NULL DEFAULT (datetime('now')),
            UNIQUE(follower_id, followed_id)
        );

        CREATE INDEX IF NOT EXISTS idx_follows_followed
            ON follows(followed_id);

        CREATE TABLE IF NOT EXISTS friend_requests (
            recipient_id TEXT NOT NULL REFERENCES users(id),
            requester_id TEXT NOT NULL REFERENCES users(id),
            created_at   TEXT NOT NULL DEFAULT (datetime('now')),
            UNIQUE(recipient_id, requester_id)
        );

        -- Friendships are stored symmetrically: accepting a request inserts
        -- both (a, b) and (b, a).
        CREATE TABLE IF NOT EXISTS friends (
            user_id    TEXT NOT NULL REFERENCES users(id),
            friend_id  TEXT NOT NULL REFERENCES users(id),
            created_at TEXT NOT NULL DEFAULT (datetime('now')),
            UNIQUE(user_id, friend_id)
        );

        CREATE TABLE IF NOT EXISTS chats (
            id          TEXT PRIMARY KEY,
            created_at  TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS chat_participants (
            chat_id  TEXT NOT NULL REFERENCES chats(id),
            user_id  TEXT NOT NULL REFERENCES users(id),
            UNIQUE(chat_id, user_id)
        );

        CREATE INDEX IF NOT EXISTS idx_chat_participants_user
            ON chat_participants(user_id);

        -- chat_id is nullable: messages delivered over the WebSocket are
        -- persisted without a parent chat (the two message paths are not
        -- unified).
        CREATE TABLE IF NOT EXISTS messages (
            id          TEXT PRIMARY KEY,
            chat_id     TEXT REFERENCES chats(id),
            sender_id   TEXT NOT NULL REFERENCES users(id),
            content     TEXT NOT NULL,
            created_at  TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE INDEX IF NOT EXISTS idx_messages_chat
            ON messages(chat_id, created_at);

        CREATE TABLE IF NOT EXISTS posts (
            id          TEXT PRIMARY KEY,
            author_id   TEXT NOT NULL REFERENCES users(id),
            content     TEXT NOT NULL,
            created_at  TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE INDEX IF NOT EXISTS idx_posts_author
            ON posts(author_id, created_at);

        CREATE TABLE IF NOT EXISTS post_likes (
            post_id  TEXT NOT NULL REFERENCES posts(id),
            user_id  TEXT NOT NULL REFERENCES users(id),
            UNIQUE(post_id, user_id)
        );

        CREATE TABLE IF NOT EXISTS post_comments (
            id          TEXT PRIMARY KEY,
            post_id     TEXT NOT NULL REFERENCES posts(id),
            author_id   TEXT NOT NULL REFERENCES users(id),
            content     TEXT NOT NULL,
            created_at  TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE INDEX IF NOT EXISTS idx_post_comments_post
            ON post_comments(post_id);
        ",
    )?;

    info!("Database migrations complete");
    Ok(())
}
