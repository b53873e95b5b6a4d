use chrono::{DateTime, Utc};
use game_types::{Role, ServerMessage, SessionId};
use std::collections::HashMap;
use std::fmt;
use std::time::{Duration, Instant};
use tokio::sync::{RwLock, mpsc};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SendError {
    #[error("Connection not found")]
    NotFound,
    #[error("Connection closed")]
    Closed,
}

/// A live client; session and role are fixed for its lifetime.
#[derive(Debug)]
pub struct Connection {
    pub id: ConnectionId,
    pub session_id: SessionId,
    pub role: Role,
    pub connected_at: DateTime<Utc>,
    pub last_activity: Instant,
    sender: mpsc::UnboundedSender<ServerMessage>,
}

impl Connection {
    pub fn new(
        id: ConnectionId,
        session_id: SessionId,
        role: Role,
    ) -> (Self, mpsc::UnboundedReceiver<ServerMessage>) {
        let (sender, receiver) = mpsc::unbounded_channel();

        let connection = Self {
            id,
            session_id,
            role,
            connected_at: Utc::now(),
            last_activity: Instant::now(),
            sender,
        };

        (connection, receiver)
    }

    pub fn update_activity(&mut self) {
        self.last_activity = Instant::now();
    }

    pub fn send_message(&self, message: ServerMessage) -> Result<(), SendError> {
        self.sender.send(message).map_err(|_| SendError::Closed)
    }

    pub fn is_inactive(&self, timeout: Duration) -> bool {
        self.last_activity.elapsed() > timeout
    }
}

/// Every live connection, keyed by a fresh id per transport.
///
/// Dropping an entry drops its sender, which ends the connection's
/// outbound loop and closes the socket.
pub struct ConnectionRegistry {
    connections: RwLock<HashMap<ConnectionId, Connection>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self {
            connections: RwLock::new(HashMap::new()),
        }
    }

    pub async fn register(
        &self,
        session_id: &str,
        role: Role,
    ) -> (ConnectionId, mpsc::UnboundedReceiver<ServerMessage>) {
        let id = ConnectionId::new();
        let (connection, receiver) = Connection::new(id, session_id.to_string(), role);

        {
            let mut connections = self.connections.write().await;
            connections.insert(id, connection);
        }

        tracing::info!("Registered {} as {} in session {}", id, role, session_id);
        (id, receiver)
    }

    pub async fn unregister(&self, id: ConnectionId) -> bool {
        let removed = {
            let mut connections = self.connections.write().await;
            connections.remove(&id)
        };

        match removed {
            Some(connection) => {
                let seconds = (Utc::now() - connection.connected_at).num_seconds();
                tracing::info!(
                    "Unregistered {} ({} in session {}) after {}s",
                    id,
                    connection.role,
                    connection.session_id,
                    seconds
                );
                true
            }
            None => false,
        }
    }

    pub async fn update_activity(&self, id: ConnectionId) {
        let mut connections = self.connections.write().await;
        if let Some(connection) = connections.get_mut(&id) {
            connection.update_activity();
        }
    }

    /// Whether any live connection of the session still holds `role`.
    pub async fn has_role(&self, session_id: &str, role: Role) -> bool {
        let connections = self.connections.read().await;
        connections
            .values()
            .any(|conn| conn.session_id == session_id && conn.role == role)
    }

    pub async fn send_to_connection(
        &self,
        id: ConnectionId,
        message: ServerMessage,
    ) -> Result<(), SendError> {
        let result = {
            let connections = self.connections.read().await;
            match connections.get(&id) {
                Some(connection) => connection.send_message(message),
                None => Err(SendError::NotFound),
            }
        };

        if result == Err(SendError::Closed) {
            self.unregister(id).await;
        }
        result
    }

    /// Delivers to every connection of the session. A failed send drops
    /// that connection and delivery to the rest carries on. Returns how
    /// many connections got the message.
    pub async fn broadcast(&self, session_id: &str, message: ServerMessage) -> usize {
        self.fan_out(session_id, None, message).await
    }

    pub async fn send_to_session_except(
        &self,
        session_id: &str,
        except_connection: ConnectionId,
        message: ServerMessage,
    ) -> usize {
        self.fan_out(session_id, Some(except_connection), message)
            .await
    }

    async fn fan_out(
        &self,
        session_id: &str,
        except_connection: Option<ConnectionId>,
        message: ServerMessage,
    ) -> usize {
        let (delivered, failed) = {
            let connections = self.connections.read().await;
            let mut delivered = 0;
            let mut failed = Vec::new();
            for connection in connections.values() {
                if connection.session_id != session_id || Some(connection.id) == except_connection {
                    continue;
                }
                match connection.send_message(message.clone()) {
                    Ok(()) => delivered += 1,
                    Err(_) => failed.push(connection.id),
                }
            }
            (delivered, failed)
        };

        if !failed.is_empty() {
            let mut connections = self.connections.write().await;
            for id in failed {
                tracing::warn!("Dropping stale connection {} in session {}", id, session_id);
                connections.remove(&id);
            }
        }

        delivered
    }

    /// Drops connections without inbound traffic for longer than `timeout`.
    pub async fn cleanup_inactive_connections(&self, timeout: Duration) -> usize {
        let mut connections = self.connections.write().await;
        let before = connections.len();
        connections.retain(|id, conn| {
            let keep = !conn.is_inactive(timeout);
            if !keep {
                tracing::info!("Removing inactive connection: {}", id);
            }
            keep
        });
        before - connections.len()
    }

    pub async fn connection_count(&self) -> usize {
        let connections = self.connections.read().await;
        connections.len()
    }

    pub async fn session_connection_count(&self, session_id: &str) -> usize {
        let connections = self.connections.read().await;
        connections
            .values()
            .filter(|conn| conn.session_id == session_id)
            .count()
    }
}

impl Default for ConnectionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn test_message() -> ServerMessage {
        ServerMessage::error("test")
    }

    #[tokio::test]
    async fn test_register_and_unregister() {
        let registry = ConnectionRegistry::new();

        let (id, _receiver) = registry.register("lucky-otter-42", Role::Controller).await;
        assert_eq!(registry.connection_count().await, 1);
        assert!(registry.has_role("lucky-otter-42", Role::Controller).await);
        assert!(!registry.has_role("lucky-otter-42", Role::Overlay).await);
        assert!(!registry.has_role("other-session-01", Role::Controller).await);

        assert!(registry.unregister(id).await);
        assert!(!registry.unregister(id).await);
        assert_eq!(registry.connection_count().await, 0);
    }

    #[tokio::test]
    async fn test_ids_are_fresh_for_duplicate_roles() {
        let registry = ConnectionRegistry::new();

        let (first, _r1) = registry.register("lucky-otter-42", Role::WordGuesser).await;
        let (second, _r2) = registry.register("lucky-otter-42", Role::WordGuesser).await;
        assert_ne!(first, second);
        assert_eq!(registry.session_connection_count("lucky-otter-42").await, 2);

        registry.unregister(first).await;
        assert!(registry.has_role("lucky-otter-42", Role::WordGuesser).await);
    }

    #[tokio::test]
    async fn test_broadcast_is_scoped_to_session() {
        let registry = ConnectionRegistry::new();

        let (_a, mut receiver_a) = registry.register("lucky-otter-42", Role::Controller).await;
        let (_b, mut receiver_b) = registry.register("lucky-otter-42", Role::Overlay).await;
        let (_c, mut receiver_c) = registry.register("swift-comet-11", Role::Controller).await;

        let delivered = registry.broadcast("lucky-otter-42", ServerMessage::Pong).await;
        assert_eq!(delivered, 2);
        assert_eq!(receiver_a.try_recv().unwrap(), ServerMessage::Pong);
        assert_eq!(receiver_b.try_recv().unwrap(), ServerMessage::Pong);
        assert!(receiver_c.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_failed_send_drops_connection_without_aborting_broadcast() {
        let registry = ConnectionRegistry::new();

        let (_stale, stale_receiver) = registry.register("lucky-otter-42", Role::WordGiver1).await;
        let (_live, mut live_receiver) = registry.register("lucky-otter-42", Role::WordGiver2).await;
        drop(stale_receiver);

        let delivered = registry.broadcast("lucky-otter-42", test_message()).await;
        assert_eq!(delivered, 1);
        assert!(live_receiver.try_recv().is_ok());
        assert_eq!(registry.connection_count().await, 1);
        assert!(!registry.has_role("lucky-otter-42", Role::WordGiver1).await);
    }

    #[tokio::test]
    async fn test_send_to_session_except() {
        let registry = ConnectionRegistry::new();

        let (newcomer, mut newcomer_receiver) =
            registry.register("lucky-otter-42", Role::WordGuesser).await;
        let (_other, mut other_receiver) = registry.register("lucky-otter-42", Role::Controller).await;

        let delivered = registry
            .send_to_session_except("lucky-otter-42", newcomer, ServerMessage::Pong)
            .await;
        assert_eq!(delivered, 1);
        assert!(newcomer_receiver.try_recv().is_err());
        assert!(other_receiver.try_recv().is_ok());
    }

    #[tokio::test]
    async fn test_message_sending_to_nonexistent_connection() {
        let registry = ConnectionRegistry::new();

        let result = registry
            .send_to_connection(ConnectionId::new(), test_message())
            .await;
        assert_eq!(result, Err(SendError::NotFound));
    }

    #[tokio::test]
    async fn test_message_sending_after_connection_close() {
        let registry = ConnectionRegistry::new();

        let (id, receiver) = registry.register("lucky-otter-42", Role::Overlay).await;
        drop(receiver);

        let result = registry.send_to_connection(id, test_message()).await;
        assert_eq!(result, Err(SendError::Closed));
        assert_eq!(registry.connection_count().await, 0);
    }

    #[tokio::test]
    async fn test_activity_tracking_and_timeout() {
        let registry = ConnectionRegistry::new();
        let (id, _receiver) = registry.register("lucky-otter-42", Role::Controller).await;

        let short_timeout = Duration::from_millis(10);
        assert_eq!(registry.cleanup_inactive_connections(short_timeout).await, 0);

        tokio::time::sleep(Duration::from_millis(20)).await;
        registry.update_activity(id).await;
        assert_eq!(registry.cleanup_inactive_connections(short_timeout).await, 0);

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(registry.cleanup_inactive_connections(short_timeout).await, 1);
        assert_eq!(registry.connection_count().await, 0);
    }

    #[tokio::test]
    async fn test_reaping_closes_the_channel() {
        let registry = ConnectionRegistry::new();
        let (_id, mut receiver) = registry.register("lucky-otter-42", Role::Controller).await;

        tokio::time::sleep(Duration::from_millis(5)).await;
        registry
            .cleanup_inactive_connections(Duration::from_millis(1))
            .await;
        assert!(receiver.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_concurrent_connection_operations() {
        let registry = Arc::new(ConnectionRegistry::new());
        let mut handles = Vec::new();

        for i in 0..50 {
            let registry = registry.clone();
            handles.push(tokio::spawn(async move {
                let session = format!("session-{}", i % 5);
                let (id, _receiver) = registry.register(&session, Role::Overlay).await;
                tokio::time::sleep(Duration::from_millis(1)).await;
                registry.broadcast(&session, ServerMessage::Pong).await;
                registry.unregister(id).await;
            }));
        }

        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(registry.connection_count().await, 0);
    }
}
