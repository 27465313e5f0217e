// src/services/football_api.rs

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::header::{HeaderMap, HeaderValue};
use serde::Deserialize;
use std::time::Duration;

use crate::config::AppConfig;
use crate::errors::{AppError, Result};
use crate::models::matches::{MatchStatus, SyncedMatch};

/// Competitions tracked by the sync job, keyed by football-data.org codes.
pub const LEAGUES: &[(&str, i64)] = &[
    ("Premier League", 2021),
    ("La Liga", 2014),
    ("Bundesliga", 2002),
    ("Serie A", 2019),
    ("Ligue 1", 2015),
];

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Deserialize)]
struct MatchesPage {
    #[serde(default)]
    matches: Vec<ApiMatch>,
}

/// One match entry as the upstream returns it, pre-mapping.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiMatch {
    pub id: i64,
    pub utc_date: DateTime<Utc>,
    pub status: String,
    #[serde(default)]
    pub venue: Option<String>,
    pub competition: ApiCompetition,
    pub home_team: ApiTeam,
    pub away_team: ApiTeam,
    pub score: ApiScore,
}

#[derive(Debug, Deserialize)]
pub struct ApiCompetition {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct ApiTeam {
    pub name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiScore {
    pub full_time: ApiFullTime,
}

#[derive(Debug, Deserialize)]
pub struct ApiFullTime {
    pub home: Option<i32>,
    pub away: Option<i32>,
}

/// Map upstream status codes onto the internal enum. Anything
/// unrecognized falls back to `scheduled`.
pub fn map_status(api_status: &str) -> MatchStatus {
    match api_status {
        "SCHEDULED" | "TIMED" => MatchStatus::Scheduled,
        "IN_PLAY" | "PAUSED" => MatchStatus::Live,
        "FINISHED" | "AWARDED" | "CANCELLED" => MatchStatus::Finished,
        "POSTPONED" | "SUSPENDED" => MatchStatus::Postponed,
        _ => MatchStatus::Scheduled,
    }
}

impl ApiMatch {
    pub fn into_synced(self) -> SyncedMatch {
        SyncedMatch {
            api_id: self.id,
            home_team: self.home_team.name,
            away_team: self.away_team.name,
            home_score: self.score.full_time.home.unwrap_or(0),
            away_score: self.score.full_time.away.unwrap_or(0),
            league: self.competition.name,
            status: map_status(&self.status),
            start_time: self.utc_date,
            venue: self.venue.unwrap_or_else(|| "Unknown".to_string()),
        }
    }
}

/// Upstream snapshot source; the sync engine only sees this trait, so
/// tests can swap in a stub.
#[async_trait]
pub trait MatchDataSource: Send + Sync {
    async fn competition_matches(
        &self,
        competition_id: i64,
        date_from: &str,
        date_to: &str,
    ) -> Result<Vec<ApiMatch>>;
}

pub struct FootballApiClient {
    client: reqwest::Client,
    base_url: String,
}

impl FootballApiClient {
    pub fn new(config: &AppConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        let token = HeaderValue::from_str(&config.football_api_key).map_err(|_| {
            AppError::ExternalApi("FOOTBALL_API_KEY contains invalid header characters".to_string())
        })?;
        headers.insert("X-Auth-Token", token);

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            client,
            base_url: config.football_api_url.clone(),
        })
    }
}

#[async_trait]
impl MatchDataSource for FootballApiClient {
    async fn competition_matches(
        &self,
        competition_id: i64,
        date_from: &str,
        date_to: &str,
    ) -> Result<Vec<ApiMatch>> {
        let url = format!("{}/competitions/{}/matches", self.base_url, competition_id);
        let page: MatchesPage = self
            .client
            .get(&url)
            .query(&[("dateFrom", date_from), ("dateTo", date_to)])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(page.matches)
    }
}
