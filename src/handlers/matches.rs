use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use bson::oid::ObjectId;
use serde_json::{json, Value};
use validator::Validate;

use crate::database::matches::{MatchListFilter, DEFAULT_LIST_LIMIT};
use crate::errors::{AppError, Result};
use crate::models::event::CreateEvent;
use crate::models::matches::{
    CreateMatch, MatchQuery, MatchStatus, UpdateMatch, UpdateScore, UpdateStatus,
};
use crate::realtime::events::ServerEvent;
use crate::state::AppState;

// GET /api/v1/matches
pub async fn get_matches(
    State(state): State<AppState>,
    Query(query): Query<MatchQuery>,
) -> Result<Json<Value>> {
    query.validate()?;

    let status = match &query.status {
        Some(raw) => Some(
            MatchStatus::parse(raw)
                .ok_or_else(|| AppError::validation("status", "Invalid status value"))?,
        ),
        None => None,
    };

    let matches = state
        .store
        .list(MatchListFilter {
            status,
            league: query.league,
            limit: Some(query.limit.unwrap_or(DEFAULT_LIST_LIMIT)),
            oldest_first: false,
        })
        .await?;
    let matches = state.store.populate(matches).await?;

    Ok(Json(json!({
        "success": true,
        "message": "Matches retrieved successfully",
        "count": matches.len(),
        "matches": matches,
    })))
}

// GET /api/v1/matches/live
pub async fn get_live_matches(State(state): State<AppState>) -> Result<Json<Value>> {
    let matches = state
        .store
        .list(MatchListFilter {
            status: Some(MatchStatus::Live),
            ..MatchListFilter::default()
        })
        .await?;
    let matches = state.store.populate(matches).await?;

    Ok(Json(json!({
        "success": true,
        "message": "Live matches retrieved successfully",
        "count": matches.len(),
        "liveMatches": matches,
    })))
}

// GET /api/v1/matches/scheduled
pub async fn get_scheduled_matches(State(state): State<AppState>) -> Result<Json<Value>> {
    let matches = state
        .store
        .list(MatchListFilter {
            status: Some(MatchStatus::Scheduled),
            oldest_first: true, // next kickoff first
            ..MatchListFilter::default()
        })
        .await?;
    let matches = state.store.populate(matches).await?;

    Ok(Json(json!({
        "success": true,
        "message": "Scheduled matches retrieved successfully",
        "count": matches.len(),
        "scheduledMatches": matches,
    })))
}

// GET /api/v1/matches/finished
pub async fn get_finished_matches(State(state): State<AppState>) -> Result<Json<Value>> {
    let matches = state
        .store
        .list(MatchListFilter {
            status: Some(MatchStatus::Finished),
            ..MatchListFilter::default()
        })
        .await?;
    let matches = state.store.populate(matches).await?;

    Ok(Json(json!({
        "success": true,
        "message": "Finished matches retrieved successfully",
        "count": matches.len(),
        "finishedMatches": matches,
    })))
}

// GET /api/v1/matches/:match_id
pub async fn get_match(
    State(state): State<AppState>,
    Path(match_id): Path<String>,
) -> Result<Json<Value>> {
    let id = ObjectId::parse_str(&match_id)?;
    let m = state
        .store
        .find_by_id(id)
        .await?
        .ok_or(AppError::MatchNotFound)?;
    let m = state.store.populate_one(m).await?;

    Ok(Json(json!({
        "success": true,
        "message": "Match retrieved successfully",
        "match": m,
    })))
}

// POST /api/v1/matches
pub async fn create_match(
    State(state): State<AppState>,
    Json(payload): Json<CreateMatch>,
) -> Result<(StatusCode, Json<Value>)> {
    payload.validate()?;

    let new_match = state.store.insert(payload.into_match()).await?;
    state
        .broadcaster
        .publish(ServerEvent::MatchCreated(new_match.clone()))
        .await;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "message": "Match created successfully",
            "newMatch": new_match,
        })),
    ))
}

// PATCH /api/v1/matches/:match_id
pub async fn update_match(
    State(state): State<AppState>,
    Path(match_id): Path<String>,
    Json(payload): Json<UpdateMatch>,
) -> Result<Json<Value>> {
    payload.validate()?;
    let id = ObjectId::parse_str(&match_id)?;

    let updated = state
        .store
        .update_fields(id, &payload)
        .await?
        .ok_or(AppError::MatchNotFound)?;

    state
        .broadcaster
        .publish(ServerEvent::MatchUpdated(updated.clone()))
        .await;

    let updated = state.store.populate_one(updated).await?;
    Ok(Json(json!({
        "success": true,
        "message": "Match updated successfully",
        "updatedMatch": updated,
    })))
}

// DELETE /api/v1/matches/:match_id
pub async fn delete_match(
    State(state): State<AppState>,
    Path(match_id): Path<String>,
) -> Result<Json<Value>> {
    let id = ObjectId::parse_str(&match_id)?;

    if !state.store.delete(id).await? {
        return Err(AppError::MatchNotFound);
    }

    state
        .broadcaster
        .publish(ServerEvent::MatchDeleted {
            match_id: id.to_hex(),
        })
        .await;

    Ok(Json(json!({
        "success": true,
        "message": "Match deleted successfully",
    })))
}

// PATCH /api/v1/matches/:match_id/status
pub async fn update_match_status(
    State(state): State<AppState>,
    Path(match_id): Path<String>,
    Json(payload): Json<UpdateStatus>,
) -> Result<Json<Value>> {
    let id = ObjectId::parse_str(&match_id)?;

    let updated = state
        .store
        .update_status(id, payload.status)
        .await?
        .ok_or(AppError::MatchNotFound)?;

    state
        .broadcaster
        .publish(ServerEvent::StatusChanged {
            match_id: id.to_hex(),
            status: updated.status,
        })
        .await;

    let updated = state.store.populate_one(updated).await?;
    Ok(Json(json!({
        "success": true,
        "message": "Match status updated successfully",
        "updatedMatch": updated,
    })))
}

// PATCH /api/v1/matches/:match_id/score
pub async fn update_match_score(
    State(state): State<AppState>,
    Path(match_id): Path<String>,
    Json(payload): Json<UpdateScore>,
) -> Result<Json<Value>> {
    payload.validate()?;
    let id = ObjectId::parse_str(&match_id)?;

    let updated = state
        .store
        .update_score(id, payload.home_score, payload.away_score)
        .await?
        .ok_or(AppError::MatchNotFound)?;

    state
        .broadcaster
        .publish(ServerEvent::ScoreUpdated(updated.clone()))
        .await;

    let updated = state.store.populate_one(updated).await?;
    Ok(Json(json!({
        "success": true,
        "message": "Match score updated successfully",
        "updatedMatch": updated,
    })))
}

// POST /api/v1/matches/:match_id/events
pub async fn add_match_event(
    State(state): State<AppState>,
    Path(match_id): Path<String>,
    Json(payload): Json<CreateEvent>,
) -> Result<Json<Value>> {
    payload.validate()?;
    let id = ObjectId::parse_str(&match_id)?;

    let Some((event, updated)) = state.store.add_event(id, payload.into_event()).await? else {
        return Err(AppError::MatchNotFound);
    };

    state
        .broadcaster
        .publish(ServerEvent::EventAdded {
            match_id: id.to_hex(),
            event: event.clone(),
        })
        .await;

    let updated = state.store.populate_one(updated).await?;
    Ok(Json(json!({
        "success": true,
        "message": "Event added to match successfully",
        "event": event,
        "updatedMatch": updated,
    })))
}
