use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// -- JWT Claims --

/// JWT claims shared between flock-api (REST middleware) and flock-gateway
/// (WebSocket identify handshake). The token carries only the user id —
/// no expiry is set, so a token stays valid until the signing secret changes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
}

// -- Auth --

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub phone: String,
    pub name: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub token: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub message: String,
}

// -- Users --

/// Public view of a user, safe to embed in follower/friend lists.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserSummary {
    pub id: Uuid,
    pub username: String,
    pub name: String,
    pub avatar: Option<String>,
    pub bio: Option<String>,
}

/// Full profile (everything except the password hash), including the
/// relationship id lists.
#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub phone: Option<String>,
    pub name: String,
    pub avatar: Option<String>,
    pub bio: Option<String>,
    pub website: Option<String>,
    pub location: Option<String>,
    pub followers: Vec<Uuid>,
    pub following: Vec<Uuid>,
    pub friends: Vec<Uuid>,
    pub friend_requests: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
}

/// A user record as exposed by the admin listing: everything except the
/// password hash and the relationship lists.
#[derive(Debug, Serialize)]
pub struct UserRecord {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub phone: Option<String>,
    pub name: String,
    pub avatar: Option<String>,
    pub bio: Option<String>,
    pub website: Option<String>,
    pub location: Option<String>,
    pub created_at: DateTime<Utc>,
}

// -- Posts --

#[derive(Debug, Deserialize)]
pub struct CreatePostRequest {
    pub content: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdatePostRequest {
    pub content: String,
}

#[derive(Debug, Serialize)]
pub struct PostAuthor {
    pub id: Uuid,
    pub username: String,
    pub name: String,
    pub avatar: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct PostResponse {
    pub id: Uuid,
    pub content: String,
    pub author: PostAuthor,
    pub likes: Vec<Uuid>,
    pub comments: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct PostQuery {
    pub search: Option<String>,
}

// -- Chats --

#[derive(Debug, Deserialize)]
pub struct CreateChatRequest {
    pub recipient: Option<Uuid>,
}

#[derive(Debug, Serialize)]
pub struct ChatSummary {
    pub id: Uuid,
    pub participants: Vec<UserSummary>,
}

#[derive(Debug, Serialize)]
pub struct ChatMessages {
    pub id: Uuid,
    pub messages: Vec<MessageResponse>,
}

#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    pub content: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub id: Uuid,
    pub chat_id: Option<Uuid>,
    pub sender_id: Uuid,
    pub content: String,
    pub created_at: DateTime<Utc>,
}
