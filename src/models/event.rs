use bson::oid::ObjectId;
use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    Goal,
    YellowCard,
    RedCard,
    Substitution,
    Penalty,
    OwnGoal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TeamSide {
    Home,
    Away,
}

// Event document - mirrors the `events` collection exactly.
// Events are owned by exactly one match and die with it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchEvent {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,

    #[serde(rename = "type")]
    pub kind: EventType,

    /// Clock minute, capped at 120 on input.
    pub minute: i32,

    pub player: String,
    pub team: TeamSide,

    #[serde(default)]
    pub description: String,
}

// For adding an event to a match
#[derive(Debug, Deserialize, Validate)]
pub struct CreateEvent {
    #[serde(rename = "type")]
    pub kind: EventType,

    #[validate(range(min = 0, max = 120, message = "Minute must be between 0 and 120"))]
    pub minute: i32,

    #[validate(length(
        min = 2,
        max = 100,
        message = "Player name must be between 2 and 100 characters long"
    ))]
    pub player: String,

    pub team: TeamSide,

    #[validate(length(max = 200, message = "Description must be max 200 characters long"))]
    pub description: Option<String>,
}

impl CreateEvent {
    pub fn into_event(self) -> MatchEvent {
        MatchEvent {
            id: None,
            kind: self.kind,
            minute: self.minute,
            player: self.player,
            team: self.team,
            description: self.description.unwrap_or_default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn goal_at(minute: i32) -> CreateEvent {
        CreateEvent {
            kind: EventType::Goal,
            minute,
            player: "Saka".to_string(),
            team: TeamSide::Home,
            description: None,
        }
    }

    #[test]
    fn event_type_uses_snake_case_wire_names() {
        assert_eq!(
            serde_json::to_string(&EventType::YellowCard).unwrap(),
            "\"yellow_card\""
        );
        assert_eq!(serde_json::to_string(&TeamSide::Away).unwrap(), "\"away\"");
    }

    #[test]
    fn minute_is_capped_at_120() {
        assert!(goal_at(120).validate().is_ok());
        assert!(goal_at(121).validate().is_err());
        assert!(goal_at(-1).validate().is_err());
    }

    #[test]
    fn create_event_parses_wire_payload() {
        let payload = r#"{"type":"goal","minute":45,"player":"Saka","team":"home"}"#;
        let event: CreateEvent = serde_json::from_str(payload).unwrap();
        assert_eq!(event.kind, EventType::Goal);
        assert_eq!(event.team, TeamSide::Home);
        assert_eq!(event.into_event().description, "");
    }
}
