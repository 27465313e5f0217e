use serde::{Deserialize, Serialize};

use crate::models::event::MatchEvent;
use crate::models::matches::{Match, MatchStatus};

/// Server → client messages. All event kinds share one delivery channel;
/// the wire shape is `{"event": <kind>, "data": <payload>}`.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", content = "data")]
pub enum ServerEvent {
    #[serde(rename = "match:created")]
    MatchCreated(Match),

    #[serde(rename = "match:updated")]
    MatchUpdated(Match),

    #[serde(rename = "score:updated")]
    ScoreUpdated(Match),

    #[serde(rename = "status:changed")]
    StatusChanged {
        #[serde(rename = "matchId")]
        match_id: String,
        status: MatchStatus,
    },

    #[serde(rename = "match:event")]
    EventAdded {
        #[serde(rename = "matchId")]
        match_id: String,
        event: MatchEvent,
    },

    #[serde(rename = "match:deleted")]
    MatchDeleted {
        #[serde(rename = "matchId")]
        match_id: String,
    },
}

impl ServerEvent {
    pub fn name(&self) -> &'static str {
        match self {
            ServerEvent::MatchCreated(_) => "match:created",
            ServerEvent::MatchUpdated(_) => "match:updated",
            ServerEvent::ScoreUpdated(_) => "score:updated",
            ServerEvent::StatusChanged { .. } => "status:changed",
            ServerEvent::EventAdded { .. } => "match:event",
            ServerEvent::MatchDeleted { .. } => "match:deleted",
        }
    }

    /// The per-match topic this event belongs to, if any. Every event also
    /// reaches the global topic; creation is global-only, since no client
    /// can hold a subscription to an id that did not exist yet.
    pub fn match_topic(&self) -> Option<String> {
        match self {
            ServerEvent::MatchCreated(_) => None,
            ServerEvent::MatchUpdated(m) | ServerEvent::ScoreUpdated(m) => {
                m.id.map(|id| id.to_hex())
            }
            ServerEvent::StatusChanged { match_id, .. }
            | ServerEvent::EventAdded { match_id, .. }
            | ServerEvent::MatchDeleted { match_id } => Some(match_id.clone()),
        }
    }
}

/// Client → server subscription messages.
#[derive(Debug, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum ClientMessage {
    #[serde(rename = "subscribe:all")]
    SubscribeAll,

    #[serde(rename = "subscribe:match")]
    SubscribeMatch {
        #[serde(rename = "matchId")]
        match_id: String,
    },

    #[serde(rename = "unsubscribe:match")]
    UnsubscribeMatch {
        #[serde(rename = "matchId")]
        match_id: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::oid::ObjectId;
    use bson::DateTime as BsonDateTime;

    fn sample_match(id: ObjectId) -> Match {
        Match {
            id: Some(id),
            api_id: Some(1001),
            home_team: "Arsenal".to_string(),
            away_team: "Chelsea".to_string(),
            home_score: 1,
            away_score: 0,
            status: MatchStatus::Live,
            league: "Premier League".to_string(),
            start_time: BsonDateTime::from_millis(0),
            events: Vec::new(),
            venue: "Emirates Stadium".to_string(),
            referee: String::new(),
            created_at: None,
            updated_at: None,
        }
    }

    #[test]
    fn status_changed_wire_shape() {
        let event = ServerEvent::StatusChanged {
            match_id: "abc123".to_string(),
            status: MatchStatus::Live,
        };
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["event"], "status:changed");
        assert_eq!(value["data"]["matchId"], "abc123");
        assert_eq!(value["data"]["status"], "live");
    }

    #[test]
    fn score_updated_carries_the_match_snapshot() {
        let event = ServerEvent::ScoreUpdated(sample_match(ObjectId::new()));
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["event"], "score:updated");
        assert_eq!(value["data"]["homeTeam"], "Arsenal");
        assert_eq!(value["data"]["homeScore"], 1);
    }

    #[test]
    fn created_events_have_no_match_topic() {
        let id = ObjectId::new();
        let created = ServerEvent::MatchCreated(sample_match(id));
        assert_eq!(created.match_topic(), None);

        let deleted = ServerEvent::MatchDeleted {
            match_id: id.to_hex(),
        };
        assert_eq!(deleted.match_topic(), Some(id.to_hex()));

        let updated = ServerEvent::MatchUpdated(sample_match(id));
        assert_eq!(updated.match_topic(), Some(id.to_hex()));
    }

    #[test]
    fn client_messages_parse() {
        assert_eq!(
            serde_json::from_str::<ClientMessage>(r#"{"type":"subscribe:all"}"#).unwrap(),
            ClientMessage::SubscribeAll
        );
        assert_eq!(
            serde_json::from_str::<ClientMessage>(
                r#"{"type":"subscribe:match","matchId":"abc"}"#
            )
            .unwrap(),
            ClientMessage::SubscribeMatch {
                match_id: "abc".to_string()
            }
        );
        assert_eq!(
            serde_json::from_str::<ClientMessage>(
                r#"{"type":"unsubscribe:match","matchId":"abc"}"#
            )
            .unwrap(),
            ClientMessage::UnsubscribeMatch {
                match_id: "abc".to_string()
            }
        );
        assert!(serde_json::from_str::<ClientMessage>(r#"{"type":"shout"}"#).is_err());
    }
}
