use std::collections::{HashMap, HashSet};

use tokio::sync::{mpsc, RwLock};
use uuid::Uuid;

use super::events::ServerEvent;

struct ClientConnection {
    tx: mpsc::UnboundedSender<ServerEvent>,
    all_matches: bool,
    matches: HashSet<String>,
}

impl ClientConnection {
    fn wants(&self, match_topic: &Option<String>) -> bool {
        match match_topic {
            Some(match_id) => self.all_matches || self.matches.contains(match_id),
            None => self.all_matches,
        }
    }
}

/// Subscription registry and fan-out for live match updates.
///
/// Constructed once at startup and shared by handle; publishing is always
/// best-effort: with no clients attached (or a dead socket) it logs and
/// moves on, so callers never see a delivery failure.
pub struct MatchBroadcaster {
    connections: RwLock<HashMap<Uuid, ClientConnection>>,
}

impl MatchBroadcaster {
    pub fn new() -> Self {
        Self {
            connections: RwLock::new(HashMap::new()),
        }
    }

    /// Register a connection; it starts with no topic memberships.
    pub async fn register(&self, tx: mpsc::UnboundedSender<ServerEvent>) -> Uuid {
        let id = Uuid::new_v4();
        self.connections.write().await.insert(
            id,
            ClientConnection {
                tx,
                all_matches: false,
                matches: HashSet::new(),
            },
        );
        tracing::info!("New client connected: {}", id);
        id
    }

    /// Drop a connection and every topic membership it held.
    pub async fn disconnect(&self, id: Uuid) {
        if self.connections.write().await.remove(&id).is_some() {
            tracing::info!("Client disconnected: {}", id);
        }
    }

    pub async fn subscribe_all(&self, id: Uuid) {
        if let Some(conn) = self.connections.write().await.get_mut(&id) {
            conn.all_matches = true;
            tracing::info!("Client {} subscribed to ALL matches", id);
        }
    }

    pub async fn subscribe_match(&self, id: Uuid, match_id: &str) {
        if let Some(conn) = self.connections.write().await.get_mut(&id) {
            if conn.matches.insert(match_id.to_string()) {
                tracing::info!("Client {} subscribed to match {}", id, match_id);
            }
        }
    }

    pub async fn unsubscribe_match(&self, id: Uuid, match_id: &str) {
        if let Some(conn) = self.connections.write().await.get_mut(&id) {
            if conn.matches.remove(match_id) {
                tracing::info!("Client {} unsubscribed from match {}", id, match_id);
            }
        }
    }

    pub async fn connection_count(&self) -> usize {
        self.connections.read().await.len()
    }

    /// Deliver to the union of the event's per-match topic and the global
    /// topic; one delivery per connection, even for dual members.
    pub async fn publish(&self, event: ServerEvent) {
        let connections = self.connections.read().await;
        if connections.is_empty() {
            tracing::debug!("No clients connected, skipping '{}' broadcast", event.name());
            return;
        }

        let match_topic = event.match_topic();
        let mut delivered = 0usize;
        let mut dead: Vec<Uuid> = Vec::new();

        for (id, conn) in connections.iter() {
            if !conn.wants(&match_topic) {
                continue;
            }
            if conn.tx.send(event.clone()).is_ok() {
                delivered += 1;
            } else {
                dead.push(*id);
            }
        }
        drop(connections);

        if !dead.is_empty() {
            let mut connections = self.connections.write().await;
            for id in dead {
                connections.remove(&id);
                tracing::warn!("Dropping dead connection {}", id);
            }
        }

        tracing::debug!("Emitted '{}' to {} subscriber(s)", event.name(), delivered);
    }
}

impl Default for MatchBroadcaster {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::matches::{Match, MatchStatus};
    use bson::oid::ObjectId;
    use bson::DateTime as BsonDateTime;
    use tokio::sync::mpsc::error::TryRecvError;

    fn live_match(id: ObjectId) -> Match {
        Match {
            id: Some(id),
            api_id: None,
            home_team: "Milan".to_string(),
            away_team: "Inter".to_string(),
            home_score: 2,
            away_score: 1,
            status: MatchStatus::Live,
            league: "Serie A".to_string(),
            start_time: BsonDateTime::from_millis(0),
            events: Vec::new(),
            venue: String::new(),
            referee: String::new(),
            created_at: None,
            updated_at: None,
        }
    }

    async fn connect(
        broadcaster: &MatchBroadcaster,
    ) -> (Uuid, mpsc::UnboundedReceiver<ServerEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let id = broadcaster.register(tx).await;
        (id, rx)
    }

    #[tokio::test]
    async fn global_subscriber_receives_every_entity_event() {
        let broadcaster = MatchBroadcaster::new();
        let (conn, mut rx) = connect(&broadcaster).await;
        broadcaster.subscribe_all(conn).await;

        let match_id = ObjectId::new();
        broadcaster
            .publish(ServerEvent::ScoreUpdated(live_match(match_id)))
            .await;
        broadcaster
            .publish(ServerEvent::MatchDeleted {
                match_id: ObjectId::new().to_hex(),
            })
            .await;
        broadcaster
            .publish(ServerEvent::MatchCreated(live_match(ObjectId::new())))
            .await;

        assert_eq!(rx.try_recv().unwrap().name(), "score:updated");
        assert_eq!(rx.try_recv().unwrap().name(), "match:deleted");
        assert_eq!(rx.try_recv().unwrap().name(), "match:created");
        assert_eq!(rx.try_recv().unwrap_err(), TryRecvError::Empty);
    }

    #[tokio::test]
    async fn match_subscriber_never_sees_other_matches() {
        let broadcaster = MatchBroadcaster::new();
        let (conn, mut rx) = connect(&broadcaster).await;

        let mine = ObjectId::new();
        let other = ObjectId::new();
        broadcaster.subscribe_match(conn, &mine.to_hex()).await;

        broadcaster
            .publish(ServerEvent::ScoreUpdated(live_match(other)))
            .await;
        assert_eq!(rx.try_recv().unwrap_err(), TryRecvError::Empty);

        broadcaster
            .publish(ServerEvent::ScoreUpdated(live_match(mine)))
            .await;
        assert_eq!(rx.try_recv().unwrap().name(), "score:updated");
    }

    #[tokio::test]
    async fn dual_topic_member_gets_one_delivery() {
        let broadcaster = MatchBroadcaster::new();
        let (conn, mut rx) = connect(&broadcaster).await;

        let match_id = ObjectId::new();
        broadcaster.subscribe_all(conn).await;
        broadcaster.subscribe_match(conn, &match_id.to_hex()).await;

        broadcaster
            .publish(ServerEvent::ScoreUpdated(live_match(match_id)))
            .await;

        assert!(rx.try_recv().is_ok());
        assert_eq!(rx.try_recv().unwrap_err(), TryRecvError::Empty);
    }

    #[tokio::test]
    async fn created_is_global_only() {
        let broadcaster = MatchBroadcaster::new();
        let (conn, mut rx) = connect(&broadcaster).await;

        let match_id = ObjectId::new();
        broadcaster.subscribe_match(conn, &match_id.to_hex()).await;

        broadcaster
            .publish(ServerEvent::MatchCreated(live_match(match_id)))
            .await;
        assert_eq!(rx.try_recv().unwrap_err(), TryRecvError::Empty);
    }

    #[tokio::test]
    async fn subscribe_and_unsubscribe_are_idempotent() {
        let broadcaster = MatchBroadcaster::new();
        let (conn, mut rx) = connect(&broadcaster).await;

        let match_id = ObjectId::new();
        let topic = match_id.to_hex();

        // double subscribe still yields a single delivery
        broadcaster.subscribe_match(conn, &topic).await;
        broadcaster.subscribe_match(conn, &topic).await;
        broadcaster
            .publish(ServerEvent::ScoreUpdated(live_match(match_id)))
            .await;
        assert!(rx.try_recv().is_ok());
        assert_eq!(rx.try_recv().unwrap_err(), TryRecvError::Empty);

        // unsubscribing twice (second time as a non-member) is a no-op
        broadcaster.unsubscribe_match(conn, &topic).await;
        broadcaster.unsubscribe_match(conn, &topic).await;
        broadcaster
            .publish(ServerEvent::ScoreUpdated(live_match(match_id)))
            .await;
        assert_eq!(rx.try_recv().unwrap_err(), TryRecvError::Empty);
    }

    #[tokio::test]
    async fn disconnect_drops_all_memberships() {
        let broadcaster = MatchBroadcaster::new();
        let (conn, mut rx) = connect(&broadcaster).await;
        broadcaster.subscribe_all(conn).await;

        broadcaster.disconnect(conn).await;
        assert_eq!(broadcaster.connection_count().await, 0);

        broadcaster
            .publish(ServerEvent::ScoreUpdated(live_match(ObjectId::new())))
            .await;
        assert_eq!(rx.try_recv().unwrap_err(), TryRecvError::Disconnected);
    }

    #[tokio::test]
    async fn publish_without_clients_is_a_noop() {
        let broadcaster = MatchBroadcaster::new();
        broadcaster
            .publish(ServerEvent::ScoreUpdated(live_match(ObjectId::new())))
            .await;
        assert_eq!(broadcaster.connection_count().await, 0);
    }

    #[tokio::test]
    async fn dead_connections_are_pruned_on_publish() {
        let broadcaster = MatchBroadcaster::new();
        let (conn, rx) = connect(&broadcaster).await;
        broadcaster.subscribe_all(conn).await;
        drop(rx);

        broadcaster
            .publish(ServerEvent::ScoreUpdated(live_match(ObjectId::new())))
            .await;
        assert_eq!(broadcaster.connection_count().await, 0);
    }
}
