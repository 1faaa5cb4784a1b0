use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket};
use futures_util::{SinkExt, StreamExt};
use tracing::{debug, info, warn};
use uuid::Uuid;

use flock_db::Database;
use flock_types::api::Claims;
use flock_types::events::{GatewayCommand, GatewayEvent, MessageSender};

use crate::dispatcher::Dispatcher;

/// How long a freshly upgraded socket has to send its Identify frame.
const IDENTIFY_TIMEOUT: Duration = Duration::from_secs(10);

/// Handle a single WebSocket connection. The upgrade itself is
/// unauthenticated; the client must identify with a JWT as its first frame.
pub async fn handle_connection(
    socket: WebSocket,
    dispatcher: Dispatcher,
    db: Arc<Database>,
    jwt_secret: String,
) {
    let (mut sender, mut receiver) = socket.split();

    let user_id = match wait_for_identify(&mut receiver, &jwt_secret).await {
        Some(id) => id,
        None => {
            warn!("WebSocket client failed to identify, closing");
            return;
        }
    };

    // The token only carries the user id; resolve the username for Ready.
    let user = {
        let db = db.clone();
        let uid = user_id.to_string();
        match tokio::task::spawn_blocking(move || db.get_user_by_id(&uid)).await {
            Ok(Ok(Some(user))) => user,
            _ => {
                warn!("Identified user {} has no account, closing", user_id);
                return;
            }
        }
    };

    info!("{} ({}) connected to gateway", user.username, user_id);

    let ready = GatewayEvent::Ready {
        user_id,
        username: user.username.clone(),
    };
    if sender
        .send(Message::Text(serde_json::to_string(&ready).unwrap().into()))
        .await
        .is_err()
    {
        return;
    }

    let (conn_id, mut events_rx) = dispatcher.register().await;

    // Forward fan-out events to this client
    let mut send_task = tokio::spawn(async move {
        while let Some(event) = events_rx.recv().await {
            let text = serde_json::to_string(&event).unwrap();
            if sender.send(Message::Text(text.into())).await.is_err() {
                break;
            }
        }
    });

    // Read commands from the client
    let dispatcher_recv = dispatcher.clone();
    let db_recv = db.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            match msg {
                Message::Text(text) => match serde_json::from_str::<GatewayCommand>(&text) {
                    Ok(GatewayCommand::Identify { .. }) => {} // already identified
                    Ok(GatewayCommand::Message { content }) => {
                        handle_message(&dispatcher_recv, &db_recv, conn_id, user_id, content)
                            .await;
                    }
                    Err(e) => {
                        warn!(
                            "{} bad command: {} -- raw: {}",
                            user_id,
                            e,
                            &text[..text.len().min(200)]
                        );
                    }
                },
                Message::Close(_) => break,
                _ => {}
            }
        }
    });

    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }

    dispatcher.unregister(conn_id).await;
    info!("{} disconnected from gateway", user_id);
}

/// Persist an inbound message and fan it out to every other connection.
/// A sender with no account is dropped without a reply.
async fn handle_message(
    dispatcher: &Dispatcher,
    db: &Arc<Database>,
    conn_id: Uuid,
    user_id: Uuid,
    content: String,
) {
    let sender = {
        let db = db.clone();
        let uid = user_id.to_string();
        match tokio::task::spawn_blocking(move || db.get_user_by_id(&uid)).await {
            Ok(Ok(Some(user))) => user,
            Ok(Ok(None)) => {
                debug!("Dropping message from unknown user {}", user_id);
                return;
            }
            Ok(Err(e)) => {
                warn!("User lookup failed for {}: {}", user_id, e);
                return;
            }
            Err(e) => {
                warn!("spawn_blocking join error: {}", e);
                return;
            }
        }
    };

    let message_id = Uuid::new_v4();
    let created_at = chrono::Utc::now().to_rfc3339();
    let insert = {
        let db = db.clone();
        let mid = message_id.to_string();
        let uid = user_id.to_string();
        let body = content.clone();
        tokio::task::spawn_blocking(move || db.insert_message(&mid, None, &uid, &body, &created_at))
            .await
    };
    match insert {
        Ok(Ok(())) => {}
        Ok(Err(e)) => {
            warn!("Failed to persist message from {}: {}", user_id, e);
            return;
        }
        Err(e) => {
            warn!("spawn_blocking join error: {}", e);
            return;
        }
    }

    dispatcher
        .broadcast_except(
            conn_id,
            GatewayEvent::Message {
                id: message_id,
                content,
                sender: MessageSender {
                    id: user_id,
                    username: sender.username,
                    avatar: sender.avatar,
                },
            },
        )
        .await;
}

async fn wait_for_identify(
    receiver: &mut futures_util::stream::SplitStream<WebSocket>,
    jwt_secret: &str,
) -> Option<Uuid> {
    use jsonwebtoken::{DecodingKey, Validation, decode};

    let timeout = tokio::time::timeout(IDENTIFY_TIMEOUT, async {
        while let Some(Ok(msg)) = receiver.next().await {
            if let Message::Text(text) = msg {
                if let Ok(GatewayCommand::Identify { token }) =
                    serde_json::from_str::<GatewayCommand>(&text)
                {
                    // Tokens carry no expiry claim.
                    let mut validation = Validation::default();
                    validation.validate_exp = false;
                    validation.required_spec_claims.clear();

                    let token_data = decode::<Claims>(
                        &token,
                        &DecodingKey::from_secret(jwt_secret.as_bytes()),
                        &validation,
                    )
                    .ok()?;

                    return Some(token_data.claims.sub);
                }
            }
        }
        None
    });

    timeout.await.ok().flatten()
}
