use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Commands sent by the client over the WebSocket.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum GatewayCommand {
    /// First frame after the upgrade: authenticate with a JWT.
    Identify { token: String },

    /// Send a chat message (raw text content).
    Message { content: String },
}

/// Events emitted by the server over the WebSocket.
///
/// The message payload keeps the `_id` field names the existing web client
/// expects.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum GatewayEvent {
    /// Server confirms successful authentication.
    Ready { user_id: Uuid, username: String },

    /// A message was received and persisted; delivered to every other
    /// connected client.
    Message {
        #[serde(rename = "_id")]
        id: Uuid,
        content: String,
        sender: MessageSender,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageSender {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub username: String,
    pub avatar: Option<String>,
}
