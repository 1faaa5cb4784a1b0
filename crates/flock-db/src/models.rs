/// Database row types — these map directly to SQLite rows.
/// Distinct from the flock-types API models to keep the DB layer independent.

pub struct UserRow {
    pub id: String,
    pub username: String,
    pub email: String,
    pub phone: Option<String>,
    pub name: String,
    pub password: String,
    pub avatar: Option<String>,
    pub bio: Option<String>,
    pub website: Option<String>,
    pub location: Option<String>,
    pub created_at: String,
}

/// The public subset of a user row, used for follower/friend/participant
/// listings.
pub struct UserSummaryRow {
    pub id: String,
    pub username: String,
    pub name: String,
    pub avatar: Option<String>,
    pub bio: Option<String>,
}

pub struct ChatRow {
    pub id: String,
    pub created_at: String,
}

pub struct MessageRow {
    pub id: String,
    pub chat_id: Option<String>,
    pub sender_id: String,
    pub content: String,
    pub created_at: String,
}

pub struct PostRow {
    pub id: String,
    pub content: String,
    pub author_id: String,
    pub author_username: String,
    pub author_name: String,
    pub author_avatar: Option<String>,
    pub created_at: String,
}

pub struct LikeRow {
    pub post_id: String,
    pub user_id: String,
}

pub struct CommentRef {
    pub post_id: String,
    pub comment_id: String,
}
