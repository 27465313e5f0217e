use axum::{
    routing::{delete, get, patch, post},
    Router,
};

use crate::handlers::matches;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(matches::get_matches))
        .route("/", post(matches::create_match))
        .route("/live", get(matches::get_live_matches))
        .route("/scheduled", get(matches::get_scheduled_matches))
        .route("/finished", get(matches::get_finished_matches))
        .route("/:match_id", get(matches::get_match))
        .route("/:match_id", patch(matches::update_match))
        .route("/:match_id", delete(matches::delete_match))
        .route("/:match_id/status", patch(matches::update_match_status))
        .route("/:match_id/score", patch(matches::update_match_score))
        .route("/:match_id/events", post(matches::add_match_event))
}
