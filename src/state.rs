use mongodb::Database;
use std::sync::Arc;

use crate::database::matches::MatchStore;
use crate::realtime::broadcaster::MatchBroadcaster;

#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub store: MatchStore,
    pub broadcaster: Arc<MatchBroadcaster>,
}

impl AppState {
    pub fn new(db: Database, broadcaster: Arc<MatchBroadcaster>) -> Self {
        let store = MatchStore::new(&db);
        AppState {
            db,
            store,
            broadcaster,
        }
    }
}
