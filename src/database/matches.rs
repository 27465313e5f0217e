use std::collections::HashMap;

use bson::{doc, oid::ObjectId, DateTime as BsonDateTime};
use futures_util::TryStreamExt;
use mongodb::{
    options::{IndexOptions, ReturnDocument},
    Collection, Database, IndexModel,
};

use crate::errors::Result;
use crate::models::event::MatchEvent;
use crate::models::matches::{Match, MatchResponse, MatchStatus, SyncedMatch, UpdateMatch};

pub const DEFAULT_LIST_LIMIT: i64 = 20;

/// Filter for the match list; `limit` of `None` means unbounded
/// (the status shortcut endpoints return everything).
#[derive(Debug, Default)]
pub struct MatchListFilter {
    pub status: Option<MatchStatus>,
    pub league: Option<String>,
    pub limit: Option<i64>,
    pub oldest_first: bool,
}

/// Persistence-backed store for matches and their owned events.
/// Read-modify-write safety relies on Mongo's atomic findOneAndUpdate;
/// concurrent writers to the same match are last-write-wins.
#[derive(Clone)]
pub struct MatchStore {
    matches: Collection<Match>,
    events: Collection<MatchEvent>,
}

impl MatchStore {
    pub fn new(db: &Database) -> Self {
        Self {
            matches: db.collection("matches"),
            events: db.collection("events"),
        }
    }

    pub async fn ensure_indexes(&self) -> Result<()> {
        let api_id = IndexModel::builder()
            .keys(doc! { "apiId": 1 })
            .options(IndexOptions::builder().unique(true).sparse(true).build())
            .build();
        let status_start = IndexModel::builder()
            .keys(doc! { "status": 1, "startTime": -1 })
            .build();
        let league = IndexModel::builder().keys(doc! { "league": 1 }).build();

        self.matches
            .create_indexes([api_id, status_start, league])
            .await?;
        Ok(())
    }

    pub async fn list(&self, filter: MatchListFilter) -> Result<Vec<Match>> {
        let mut query = doc! {};
        if let Some(status) = filter.status {
            query.insert("status", status.as_str());
        }
        if let Some(league) = &filter.league {
            query.insert("league", league.as_str());
        }

        let sort = if filter.oldest_first {
            doc! { "startTime": 1 }
        } else {
            doc! { "startTime": -1 }
        };

        let mut find = self.matches.find(query).sort(sort);
        if let Some(limit) = filter.limit {
            find = find.limit(limit.clamp(1, 100));
        }

        Ok(find.await?.try_collect().await?)
    }

    pub async fn find_by_id(&self, id: ObjectId) -> Result<Option<Match>> {
        Ok(self.matches.find_one(doc! { "_id": id }).await?)
    }

    pub async fn find_by_api_id(&self, api_id: i64) -> Result<Option<Match>> {
        Ok(self.matches.find_one(doc! { "apiId": api_id }).await?)
    }

    pub async fn insert(&self, mut m: Match) -> Result<Match> {
        let now = BsonDateTime::now();
        m.id = Some(ObjectId::new());
        m.created_at = Some(now);
        m.updated_at = Some(now);
        self.matches.insert_one(&m).await?;
        Ok(m)
    }

    pub async fn insert_from_sync(&self, snapshot: &SyncedMatch) -> Result<Match> {
        self.insert(Match::from_sync(snapshot)).await
    }

    pub async fn update_fields(&self, id: ObjectId, update: &UpdateMatch) -> Result<Option<Match>> {
        let mut set = doc! {};
        if let Some(v) = &update.home_team {
            set.insert("homeTeam", v.as_str());
        }
        if let Some(v) = &update.away_team {
            set.insert("awayTeam", v.as_str());
        }
        if let Some(v) = &update.league {
            set.insert("league", v.as_str());
        }
        if let Some(v) = update.start_time {
            set.insert("startTime", BsonDateTime::from_chrono(v));
        }
        if let Some(v) = &update.venue {
            set.insert("venue", v.as_str());
        }
        if let Some(v) = &update.referee {
            set.insert("referee", v.as_str());
        }

        if set.is_empty() {
            return self.find_by_id(id).await;
        }
        set.insert("updatedAt", BsonDateTime::now());

        Ok(self
            .matches
            .find_one_and_update(doc! { "_id": id }, doc! { "$set": set })
            .return_document(ReturnDocument::After)
            .await?)
    }

    pub async fn update_score(
        &self,
        id: ObjectId,
        home_score: i32,
        away_score: i32,
    ) -> Result<Option<Match>> {
        let update = doc! {
            "$set": {
                "homeScore": home_score,
                "awayScore": away_score,
                "updatedAt": BsonDateTime::now(),
            }
        };
        Ok(self
            .matches
            .find_one_and_update(doc! { "_id": id }, update)
            .return_document(ReturnDocument::After)
            .await?)
    }

    pub async fn update_status(&self, id: ObjectId, status: MatchStatus) -> Result<Option<Match>> {
        let update = doc! {
            "$set": {
                "status": status.as_str(),
                "updatedAt": BsonDateTime::now(),
            }
        };
        Ok(self
            .matches
            .find_one_and_update(doc! { "_id": id }, update)
            .return_document(ReturnDocument::After)
            .await?)
    }

    /// Reconciliation overwrite: apply the full mapped upstream snapshot.
    pub async fn apply_snapshot(
        &self,
        id: ObjectId,
        snapshot: &SyncedMatch,
    ) -> Result<Option<Match>> {
        let update = doc! {
            "$set": {
                "apiId": snapshot.api_id,
                "homeTeam": snapshot.home_team.as_str(),
                "awayTeam": snapshot.away_team.as_str(),
                "homeScore": snapshot.home_score,
                "awayScore": snapshot.away_score,
                "league": snapshot.league.as_str(),
                "status": snapshot.status.as_str(),
                "startTime": BsonDateTime::from_chrono(snapshot.start_time),
                "venue": snapshot.venue.as_str(),
                "updatedAt": BsonDateTime::now(),
            }
        };
        Ok(self
            .matches
            .find_one_and_update(doc! { "_id": id }, update)
            .return_document(ReturnDocument::After)
            .await?)
    }

    /// Create the event, then push its id onto the owning match.
    /// Returns `None` (and keeps no orphan) when the match does not exist.
    pub async fn add_event(
        &self,
        match_id: ObjectId,
        mut event: MatchEvent,
    ) -> Result<Option<(MatchEvent, Match)>> {
        if self.find_by_id(match_id).await?.is_none() {
            return Ok(None);
        }

        let event_id = ObjectId::new();
        event.id = Some(event_id);
        self.events.insert_one(&event).await?;

        let update = doc! {
            "$push": { "events": event_id },
            "$set": { "updatedAt": BsonDateTime::now() },
        };
        let updated = self
            .matches
            .find_one_and_update(doc! { "_id": match_id }, update)
            .return_document(ReturnDocument::After)
            .await?;

        match updated {
            Some(m) => Ok(Some((event, m))),
            None => {
                // match deleted between the existence check and the push
                self.events.delete_one(doc! { "_id": event_id }).await?;
                Ok(None)
            }
        }
    }

    /// Delete a match and cascade-delete its owned events.
    pub async fn delete(&self, id: ObjectId) -> Result<bool> {
        let Some(m) = self.find_by_id(id).await? else {
            return Ok(false);
        };

        if !m.events.is_empty() {
            self.events
                .delete_many(doc! { "_id": { "$in": m.events.clone() } })
                .await?;
        }

        let result = self.matches.delete_one(doc! { "_id": id }).await?;
        Ok(result.deleted_count > 0)
    }

    pub async fn events_for(&self, m: &Match) -> Result<Vec<MatchEvent>> {
        if m.events.is_empty() {
            return Ok(Vec::new());
        }
        let events = self
            .events
            .find(doc! { "_id": { "$in": m.events.clone() } })
            .await?
            .try_collect()
            .await?;
        Ok(events)
    }

    pub async fn populate_one(&self, m: Match) -> Result<MatchResponse> {
        let events = self.events_for(&m).await?;
        Ok(MatchResponse::new(m, events))
    }

    /// Batched populate: one $in query for every referenced event.
    pub async fn populate(&self, matches: Vec<Match>) -> Result<Vec<MatchResponse>> {
        let ids: Vec<ObjectId> = matches
            .iter()
            .flat_map(|m| m.events.iter().copied())
            .collect();

        let mut by_id: HashMap<ObjectId, MatchEvent> = HashMap::new();
        if !ids.is_empty() {
            let events: Vec<MatchEvent> = self
                .events
                .find(doc! { "_id": { "$in": ids } })
                .await?
                .try_collect()
                .await?;
            for event in events {
                if let Some(id) = event.id {
                    by_id.insert(id, event);
                }
            }
        }

        let mut populated = Vec::with_capacity(matches.len());
        for m in matches {
            let events = m.events.iter().filter_map(|id| by_id.remove(id)).collect();
            populated.push(MatchResponse::new(m, events));
        }
        Ok(populated)
    }
}
