use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{RwLock, mpsc};
use uuid::Uuid;

use flock_types::events::GatewayEvent;

/// Manages all connected clients and fans out chat messages.
///
/// Events are delivered to every connection except the sender's — messages
/// are not scoped to a chat or recipient. Disconnecting simply removes the
/// connection from the set; there are no acks, retries, or resume.
#[derive(Clone)]
pub struct Dispatcher {
    inner: Arc<DispatcherInner>,
}

struct DispatcherInner {
    /// conn_id -> sender half of the per-connection event queue
    clients: RwLock<HashMap<Uuid, mpsc::UnboundedSender<GatewayEvent>>>,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(DispatcherInner {
                clients: RwLock::new(HashMap::new()),
            }),
        }
    }

    /// Register a new connection. Returns (conn_id, receiver).
    pub async fn register(&self) -> (Uuid, mpsc::UnboundedReceiver<GatewayEvent>) {
        let conn_id = Uuid::new_v4();
        let (tx, rx) = mpsc::unbounded_channel();
        self.inner.clients.write().await.insert(conn_id, tx);
        (conn_id, rx)
    }

    pub async fn unregister(&self, conn_id: Uuid) {
        self.inner.clients.write().await.remove(&conn_id);
    }

    /// Deliver an event to every connected client except `sender_conn_id`.
    pub async fn broadcast_except(&self, sender_conn_id: Uuid, event: GatewayEvent) {
        let clients = self.inner.clients.read().await;
        for (&conn_id, tx) in clients.iter() {
            if conn_id != sender_conn_id {
                let _ = tx.send(event.clone());
            }
        }
    }

    pub async fn connection_count(&self) -> usize {
        self.inner.clients.read().await.len()
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flock_types::events::MessageSender;

    fn message_event(content: &str) -> GatewayEvent {
        GatewayEvent::Message {
            id: Uuid::new_v4(),
            content: content.into(),
            sender: MessageSender {
                id: Uuid::new_v4(),
                username: "alice".into(),
                avatar: None,
            },
        }
    }

    #[tokio::test]
    async fn broadcast_skips_the_sender() {
        let dispatcher = Dispatcher::new();
        let (sender_conn, mut sender_rx) = dispatcher.register().await;
        let (_other_conn, mut other_rx) = dispatcher.register().await;

        dispatcher
            .broadcast_except(sender_conn, message_event("hi"))
            .await;

        assert!(matches!(other_rx.try_recv(), Ok(GatewayEvent::Message { .. })));
        assert!(sender_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn unregister_removes_the_connection() {
        let dispatcher = Dispatcher::new();
        let (conn, mut rx) = dispatcher.register().await;
        assert_eq!(dispatcher.connection_count().await, 1);

        dispatcher.unregister(conn).await;
        assert_eq!(dispatcher.connection_count().await, 0);

        dispatcher
            .broadcast_except(Uuid::new_v4(), message_event("hi"))
            .await;
        assert!(rx.try_recv().is_err());
    }
}
