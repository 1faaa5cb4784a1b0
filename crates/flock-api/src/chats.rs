use axum::extract::{Extension, Path, State};
use axum::Json;
use uuid::Uuid;

use flock_db::Database;
use flock_types::api::{
    ChatMessages, ChatSummary, Claims, CreateChatRequest, MessageResponse, SendMessageRequest,
    UserSummary,
};

use crate::auth::AppState;
use crate::error::{ApiError, FieldError};
use crate::{parse_timestamp, parse_uuid};

/// GET /api/chat — every chat the caller participates in.
pub async fn list_chats(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Vec<ChatSummary>>, ApiError> {
    let chat_ids = state
        .db
        .chat_ids_for_user(&claims.sub.to_string())
        .map_err(ApiError::Internal)?;

    let mut chats = Vec::with_capacity(chat_ids.len());
    for chat_id in chat_ids {
        chats.push(chat_summary(&state.db, &chat_id)?);
    }
    Ok(Json(chats))
}

/// GET /api/chat/{id} — messages of one chat; only visible to participants.
pub async fn get_chat(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<Json<ChatMessages>, ApiError> {
    let chat_id = id.to_string();
    if !state
        .db
        .is_chat_participant(&chat_id, &claims.sub.to_string())
        .map_err(ApiError::Internal)?
    {
        return Err(ApiError::NotFound("Chat not found"));
    }

    let messages = state
        .db
        .messages_for_chat(&chat_id)
        .map_err(ApiError::Internal)?
        .into_iter()
        .map(|row| MessageResponse {
            id: parse_uuid(&row.id),
            chat_id: row.chat_id.as_deref().map(parse_uuid),
            sender_id: parse_uuid(&row.sender_id),
            content: row.content,
            created_at: parse_timestamp(&row.created_at),
        })
        .collect();

    Ok(Json(ChatMessages { id, messages }))
}

/// POST /api/chat — create a chat with a recipient. A second request for
/// the same participant pair returns the existing chat instead of
/// duplicating it.
pub async fn create_chat(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CreateChatRequest>,
) -> Result<Json<ChatSummary>, ApiError> {
    let Some(recipient) = req.recipient else {
        return Err(ApiError::Validation(vec![FieldError::new(
            "recipient",
            "Recipient is required",
        )]));
    };

    if state
        .db
        .get_user_by_id(&recipient.to_string())
        .map_err(ApiError::Internal)?
        .is_none()
    {
        return Err(ApiError::NotFound("Recipient not found"));
    }

    let me = claims.sub.to_string();
    if let Some(existing) = state
        .db
        .find_chat_between(&me, &recipient.to_string())
        .map_err(ApiError::Internal)?
    {
        return Ok(Json(chat_summary(&state.db, &existing)?));
    }

    let chat_id = Uuid::new_v4().to_string();
    state
        .db
        .create_chat(&chat_id, &me, &recipient.to_string())?;

    Ok(Json(chat_summary(&state.db, &chat_id)?))
}

/// POST /api/chat/{id}/message — append a message to a chat. This REST
/// path does not touch the WebSocket fan-out; the two paths are separate.
pub async fn send_message(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
    Json(req): Json<SendMessageRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    let content = match req.content {
        Some(content) if !content.trim().is_empty() => content,
        _ => {
            return Err(ApiError::Validation(vec![FieldError::new(
                "content",
                "Content is required",
            )]));
        }
    };

    let chat_id = id.to_string();
    if !state
        .db
        .is_chat_participant(&chat_id, &claims.sub.to_string())
        .map_err(ApiError::Internal)?
    {
        return Err(ApiError::NotFound("Chat not found"));
    }

    let message_id = Uuid::new_v4();
    let created_at = chrono::Utc::now();
    state
        .db
        .insert_message(
            &message_id.to_string(),
            Some(&chat_id),
            &claims.sub.to_string(),
            &content,
            &created_at.to_rfc3339(),
        )
        .map_err(ApiError::Internal)?;

    Ok(Json(MessageResponse {
        id: message_id,
        chat_id: Some(id),
        sender_id: claims.sub,
        content,
        created_at,
    }))
}

fn chat_summary(db: &Database, chat_id: &str) -> Result<ChatSummary, ApiError> {
    let participants = db
        .chat_participants(chat_id)
        .map_err(ApiError::Internal)?
        .into_iter()
        .map(|row| UserSummary {
            id: parse_uuid(&row.id),
            username: row.username,
            name: row.name,
            avatar: row.avatar,
            bio: row.bio,
        })
        .collect();

    Ok(ChatSummary {
        id: parse_uuid(chat_id),
        participants,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::test_support::{register_user, test_state};

    #[tokio::test]
    async fn creating_the_same_chat_twice_returns_the_existing_one() {
        let state = test_state();
        let alice = register_user(&state, "alice", "alice@x.com").await;
        let bob = register_user(&state, "bob", "bob@x.com").await;

        let first = create_chat(
            State(state.clone()),
            Extension(Claims { sub: alice }),
            Json(CreateChatRequest {
                recipient: Some(bob),
            }),
        )
        .await
        .unwrap();

        // Same pair, opposite direction.
        let second = create_chat(
            State(state.clone()),
            Extension(Claims { sub: bob }),
            Json(CreateChatRequest {
                recipient: Some(alice),
            }),
        )
        .await
        .unwrap();

        assert_eq!(first.0.id, second.0.id);
        assert_eq!(
            state.db.chat_ids_for_user(&alice.to_string()).unwrap().len(),
            1
        );
    }

    #[tokio::test]
    async fn chat_with_unknown_recipient_is_404() {
        let state = test_state();
        let alice = register_user(&state, "alice", "alice@x.com").await;

        let err = create_chat(
            State(state),
            Extension(Claims { sub: alice }),
            Json(CreateChatRequest {
                recipient: Some(Uuid::new_v4()),
            }),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ApiError::NotFound("Recipient not found")));
    }

    #[tokio::test]
    async fn messages_flow_between_participants_only() {
        let state = test_state();
        let alice = register_user(&state, "alice", "alice@x.com").await;
        let bob = register_user(&state, "bob", "bob@x.com").await;
        let carol = register_user(&state, "carol", "carol@x.com").await;

        let chat = create_chat(
            State(state.clone()),
            Extension(Claims { sub: alice }),
            Json(CreateChatRequest {
                recipient: Some(bob),
            }),
        )
        .await
        .unwrap();

        send_message(
            State(state.clone()),
            Extension(Claims { sub: alice }),
            Path(chat.0.id),
            Json(SendMessageRequest {
                content: Some("hi bob".into()),
            }),
        )
        .await
        .unwrap();

        let seen = get_chat(
            State(state.clone()),
            Extension(Claims { sub: bob }),
            Path(chat.0.id),
        )
        .await
        .unwrap();
        assert_eq!(seen.0.messages.len(), 1);
        assert_eq!(seen.0.messages[0].content, "hi bob");
        assert_eq!(seen.0.messages[0].sender_id, alice);

        let err = get_chat(
            State(state),
            Extension(Claims { sub: carol }),
            Path(chat.0.id),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ApiError::NotFound("Chat not found")));
    }

    #[tokio::test]
    async fn empty_message_content_is_rejected() {
        let state = test_state();
        let alice = register_user(&state, "alice", "alice@x.com").await;
        let bob = register_user(&state, "bob", "bob@x.com").await;

        let chat = create_chat(
            State(state.clone()),
            Extension(Claims { sub: alice }),
            Json(CreateChatRequest {
                recipient: Some(bob),
            }),
        )
        .await
        .unwrap();

        let err = send_message(
            State(state),
            Extension(Claims { sub: alice }),
            Path(chat.0.id),
            Json(SendMessageRequest { content: None }),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }
}
