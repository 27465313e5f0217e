use bson::{oid::ObjectId, DateTime as BsonDateTime};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::event::MatchEvent;

/// Match lifecycle states. Wire/BSON representation is the lowercase name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchStatus {
    Scheduled,
    Live,
    Finished,
    Postponed,
}

impl MatchStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchStatus::Scheduled => "scheduled",
            MatchStatus::Live => "live",
            MatchStatus::Finished => "finished",
            MatchStatus::Postponed => "postponed",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "scheduled" => Some(MatchStatus::Scheduled),
            "live" => Some(MatchStatus::Live),
            "finished" => Some(MatchStatus::Finished),
            "postponed" => Some(MatchStatus::Postponed),
            _ => None,
        }
    }
}

impl std::fmt::Display for MatchStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// Match document - mirrors the `matches` collection exactly
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Match {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,

    /// Upstream id; unique (sparse index) when present.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_id: Option<i64>,

    pub home_team: String,
    pub away_team: String,

    #[serde(default)]
    pub home_score: i32,
    #[serde(default)]
    pub away_score: i32,

    pub status: MatchStatus,
    pub league: String,
    pub start_time: BsonDateTime,

    /// Owned event references, in insertion order.
    #[serde(default)]
    pub events: Vec<ObjectId>,

    #[serde(default)]
    pub venue: String,
    #[serde(default)]
    pub referee: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<BsonDateTime>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<BsonDateTime>,
}

impl Match {
    pub fn from_sync(snapshot: &SyncedMatch) -> Self {
        Match {
            id: None,
            api_id: Some(snapshot.api_id),
            home_team: snapshot.home_team.clone(),
            away_team: snapshot.away_team.clone(),
            home_score: snapshot.home_score,
            away_score: snapshot.away_score,
            status: snapshot.status,
            league: snapshot.league.clone(),
            start_time: BsonDateTime::from_chrono(snapshot.start_time),
            events: Vec::new(),
            venue: snapshot.venue.clone(),
            referee: String::new(),
            created_at: None,
            updated_at: None,
        }
    }
}

/// One upstream record mapped to the internal shape, before persistence.
#[derive(Debug, Clone)]
pub struct SyncedMatch {
    pub api_id: i64,
    pub home_team: String,
    pub away_team: String,
    pub home_score: i32,
    pub away_score: i32,
    pub league: String,
    pub status: MatchStatus,
    pub start_time: DateTime<Utc>,
    pub venue: String,
}

// API response with events populated and minute-sorted
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchResponse {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_id: Option<i64>,
    pub home_team: String,
    pub away_team: String,
    pub home_score: i32,
    pub away_score: i32,
    pub status: MatchStatus,
    pub league: String,
    pub start_time: BsonDateTime,
    pub events: Vec<MatchEvent>,
    pub venue: String,
    pub referee: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<BsonDateTime>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<BsonDateTime>,
}

impl MatchResponse {
    pub fn new(m: Match, mut events: Vec<MatchEvent>) -> Self {
        // display order is chronological; computed at read time, not stored
        events.sort_by_key(|e| e.minute);
        MatchResponse {
            id: m.id,
            api_id: m.api_id,
            home_team: m.home_team,
            away_team: m.away_team,
            home_score: m.home_score,
            away_score: m.away_score,
            status: m.status,
            league: m.league,
            start_time: m.start_time,
            events,
            venue: m.venue,
            referee: m.referee,
            created_at: m.created_at,
            updated_at: m.updated_at,
        }
    }
}

// For creating new matches
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateMatch {
    #[validate(length(
        min = 2,
        max = 50,
        message = "Home team name must be between 2 and 50 characters long"
    ))]
    pub home_team: String,

    #[validate(length(
        min = 2,
        max = 50,
        message = "Away team name must be between 2 and 50 characters long"
    ))]
    pub away_team: String,

    #[validate(length(
        min = 2,
        max = 100,
        message = "League name must be between 2 and 100 characters long"
    ))]
    pub league: String,

    pub start_time: DateTime<Utc>,

    pub status: Option<MatchStatus>,

    #[validate(range(min = 0, message = "Home score must be a non-negative integer"))]
    pub home_score: Option<i32>,

    #[validate(range(min = 0, message = "Away score must be a non-negative integer"))]
    pub away_score: Option<i32>,

    #[validate(length(max = 100, message = "Venue must be max 100 characters long"))]
    pub venue: Option<String>,

    #[validate(length(max = 100, message = "Referee must be max 100 characters long"))]
    pub referee: Option<String>,
}

impl CreateMatch {
    pub fn into_match(self) -> Match {
        Match {
            id: None,
            api_id: None,
            home_team: self.home_team,
            away_team: self.away_team,
            home_score: self.home_score.unwrap_or(0),
            away_score: self.away_score.unwrap_or(0),
            status: self.status.unwrap_or(MatchStatus::Scheduled),
            league: self.league,
            start_time: BsonDateTime::from_chrono(self.start_time),
            events: Vec::new(),
            venue: self.venue.unwrap_or_default(),
            referee: self.referee.unwrap_or_default(),
            created_at: None,
            updated_at: None,
        }
    }
}

// For partial field edits
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateMatch {
    #[validate(length(
        min = 2,
        max = 50,
        message = "Home team name must be between 2 and 50 characters long"
    ))]
    pub home_team: Option<String>,

    #[validate(length(
        min = 2,
        max = 50,
        message = "Away team name must be between 2 and 50 characters long"
    ))]
    pub away_team: Option<String>,

    #[validate(length(
        min = 2,
        max = 100,
        message = "League name must be between 2 and 100 characters long"
    ))]
    pub league: Option<String>,

    pub start_time: Option<DateTime<Utc>>,

    #[validate(length(max = 100, message = "Venue must be max 100 characters long"))]
    pub venue: Option<String>,

    #[validate(length(max = 100, message = "Referee must be max 100 characters long"))]
    pub referee: Option<String>,
}

// For score patches
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateScore {
    #[validate(range(min = 0, message = "Home score must be a non-negative integer"))]
    pub home_score: i32,

    #[validate(range(min = 0, message = "Away score must be a non-negative integer"))]
    pub away_score: i32,
}

// For status patches
#[derive(Debug, Deserialize)]
pub struct UpdateStatus {
    pub status: MatchStatus,
}

// Query parameters for the match list
#[derive(Debug, Deserialize, Validate)]
pub struct MatchQuery {
    pub status: Option<String>,

    #[validate(length(
        min = 2,
        max = 100,
        message = "League must be between 2 and 100 characters long"
    ))]
    pub league: Option<String>,

    #[validate(range(min = 1, max = 100, message = "Limit must be between 1 and 100"))]
    pub limit: Option<i64>,
}
