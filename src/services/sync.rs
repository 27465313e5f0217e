// src/services/sync.rs

use std::sync::Arc;
use std::time::Duration;

use chrono::{Days, Utc};
use tokio_util::sync::CancellationToken;

use super::football_api::{MatchDataSource, LEAGUES};
use crate::database::matches::MatchStore;
use crate::errors::Result;
use crate::models::matches::{Match, SyncedMatch};
use crate::realtime::broadcaster::MatchBroadcaster;
use crate::realtime::events::ServerEvent;

/// How often a full reconciliation pass runs.
pub const SYNC_INTERVAL: Duration = Duration::from_secs(5 * 60);

/// Pause between competition fetches. The upstream free tier rate-limits
/// aggressively; this delay is part of the contract with it.
const LEAGUE_FETCH_DELAY: Duration = Duration::from_secs(6);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ChangeSet {
    pub is_new: bool,
    pub score_changed: bool,
    pub status_changed: bool,
}

/// Compare a stored match against the mapped upstream record.
/// Pure: creation itself is the notable event for unseen records,
/// so no change flags fire alongside `is_new`.
pub fn detect_changes(existing: Option<&Match>, incoming: &SyncedMatch) -> ChangeSet {
    let Some(existing) = existing else {
        return ChangeSet {
            is_new: true,
            ..ChangeSet::default()
        };
    };

    ChangeSet {
        is_new: false,
        score_changed: existing.home_score != incoming.home_score
            || existing.away_score != incoming.away_score,
        status_changed: existing.status != incoming.status,
    }
}

/// Reconcile one competition's upstream snapshot against the store.
/// Persist first, broadcast after; unchanged records are left untouched.
pub async fn sync_league(
    store: &MatchStore,
    source: &dyn MatchDataSource,
    broadcaster: &MatchBroadcaster,
    competition_id: i64,
    date_from: &str,
    date_to: &str,
) -> Result<u64> {
    tracing::info!("Syncing league {}...", competition_id);

    let records = source
        .competition_matches(competition_id, date_from, date_to)
        .await?;

    if records.is_empty() {
        tracing::info!("No matches found");
        return Ok(0);
    }

    let mut synced = 0u64;
    for record in records {
        let incoming = record.into_synced();
        let existing = store.find_by_api_id(incoming.api_id).await?;
        let changes = detect_changes(existing.as_ref(), &incoming);

        match existing {
            None => {
                store.insert_from_sync(&incoming).await?;
            }
            Some(current) if changes.score_changed || changes.status_changed => {
                if let Some(id) = current.id {
                    if let Some(updated) = store.apply_snapshot(id, &incoming).await? {
                        // score first, status second - detection order
                        if changes.score_changed {
                            broadcaster
                                .publish(ServerEvent::ScoreUpdated(updated.clone()))
                                .await;
                            tracing::info!(
                                "⚽ Score updated: {} {}-{} {}",
                                updated.home_team,
                                updated.home_score,
                                updated.away_score,
                                updated.away_team
                            );
                        }
                        if changes.status_changed {
                            broadcaster
                                .publish(ServerEvent::StatusChanged {
                                    match_id: id.to_hex(),
                                    status: updated.status,
                                })
                                .await;
                            tracing::info!(
                                "Status changed: {} vs {} → {}",
                                updated.home_team,
                                updated.away_team,
                                updated.status
                            );
                        }
                    }
                }
            }
            Some(_) => {} // unchanged: no write, no broadcast
        }

        synced += 1;
    }

    tracing::info!("Synced {} matches", synced);
    Ok(synced)
}

/// One reconciliation sweep across the given competitions.
/// A failing competition is logged and skipped; the sweep always finishes.
pub async fn sync_all_leagues(
    store: &MatchStore,
    source: &dyn MatchDataSource,
    broadcaster: &MatchBroadcaster,
    competitions: &[(&str, i64)],
    date_from: &str,
    date_to: &str,
) -> u64 {
    tracing::info!("Syncing all leagues...");

    let mut total = 0u64;
    for (name, competition_id) in competitions {
        tracing::info!("{}...", name);
        match sync_league(
            store,
            source,
            broadcaster,
            *competition_id,
            date_from,
            date_to,
        )
        .await
        {
            Ok(count) => total += count,
            Err(e) => tracing::error!("❌ Sync failed for {} ({}): {}", name, competition_id, e),
        }

        tokio::time::sleep(LEAGUE_FETCH_DELAY).await;
    }

    tracing::info!("Total: {} matches", total);
    total
}

pub fn today_date_range() -> (String, String) {
    let today = Utc::now().date_naive();
    let tomorrow = today + Days::new(1);
    (
        today.format("%Y-%m-%d").to_string(),
        tomorrow.format("%Y-%m-%d").to_string(),
    )
}

/// One full pass over the tracked leagues for today's date window.
pub async fn run_pass(
    store: &MatchStore,
    source: &dyn MatchDataSource,
    broadcaster: &MatchBroadcaster,
) -> u64 {
    let started = std::time::Instant::now();
    tracing::info!("[live sync] Starting...");

    let (date_from, date_to) = today_date_range();
    let count = sync_all_leagues(store, source, broadcaster, LEAGUES, &date_from, &date_to).await;

    tracing::info!(
        "[live sync] Done in {:.1}s - Synced {} matches",
        started.elapsed().as_secs_f64(),
        count
    );
    count
}

/// The periodic reconciliation job. Passes run sequentially inside one
/// task, so a pass that overruns the interval delays the next tick
/// instead of overlapping it.
pub struct SyncJob {
    cancel: CancellationToken,
    handle: tokio::task::JoinHandle<()>,
}

impl SyncJob {
    /// Runs a pass immediately, then on every interval tick until stopped.
    pub fn start(
        store: MatchStore,
        source: Arc<dyn MatchDataSource>,
        broadcaster: Arc<MatchBroadcaster>,
    ) -> Self {
        tracing::info!(
            "Starting live sync job every {} minutes...",
            SYNC_INTERVAL.as_secs() / 60
        );

        let cancel = CancellationToken::new();
        let job_cancel = cancel.clone();
        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(SYNC_INTERVAL);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = job_cancel.cancelled() => break,
                    _ = interval.tick() => {
                        let _ = run_pass(&store, source.as_ref(), &broadcaster).await;
                    }
                }
            }
        });

        Self { cancel, handle }
    }

    /// Signal the job to stop and wait for any in-flight pass to finish.
    pub async fn stop(self) {
        self.cancel.cancel();
        let _ = self.handle.await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::AppError;
    use crate::models::matches::MatchStatus;
    use crate::services::football_api::{
        ApiCompetition, ApiFullTime, ApiMatch, ApiScore, ApiTeam,
    };
    use async_trait::async_trait;
    use bson::oid::ObjectId;
    use bson::DateTime as BsonDateTime;
    use std::sync::Mutex;

    fn stored_match(home_score: i32, away_score: i32, status: MatchStatus) -> Match {
        Match {
            id: Some(ObjectId::new()),
            api_id: Some(7),
            home_team: "A".to_string(),
            away_team: "B".to_string(),
            home_score,
            away_score,
            status,
            league: "Premier League".to_string(),
            start_time: BsonDateTime::from_millis(0),
            events: Vec::new(),
            venue: String::new(),
            referee: String::new(),
            created_at: None,
            updated_at: None,
        }
    }

    fn incoming(home_score: i32, away_score: i32, status: MatchStatus) -> SyncedMatch {
        SyncedMatch {
            api_id: 7,
            home_team: "A".to_string(),
            away_team: "B".to_string(),
            home_score,
            away_score,
            league: "Premier League".to_string(),
            status,
            start_time: Utc::now(),
            venue: "Unknown".to_string(),
        }
    }

    #[test]
    fn unseen_record_is_new_with_no_change_flags() {
        let changes = detect_changes(None, &incoming(3, 1, MatchStatus::Live));
        assert!(changes.is_new);
        assert!(!changes.score_changed);
        assert!(!changes.status_changed);
    }

    #[test]
    fn identical_records_report_no_changes() {
        let existing = stored_match(1, 1, MatchStatus::Live);
        let changes = detect_changes(Some(&existing), &incoming(1, 1, MatchStatus::Live));
        assert_eq!(changes, ChangeSet::default());
    }

    #[test]
    fn either_score_side_triggers_score_changed() {
        let existing = stored_match(0, 0, MatchStatus::Live);

        let changes = detect_changes(Some(&existing), &incoming(1, 0, MatchStatus::Live));
        assert!(changes.score_changed);
        assert!(!changes.status_changed);

        let changes = detect_changes(Some(&existing), &incoming(0, 2, MatchStatus::Live));
        assert!(changes.score_changed);
    }

    #[test]
    fn status_transition_triggers_status_changed() {
        let existing = stored_match(0, 0, MatchStatus::Scheduled);
        let changes = detect_changes(Some(&existing), &incoming(0, 0, MatchStatus::Finished));
        assert!(!changes.score_changed);
        assert!(changes.status_changed);
    }

    #[test]
    fn kickoff_goal_flips_both_flags() {
        // 0:0 scheduled vs upstream 1:0 IN_PLAY
        let existing = stored_match(0, 0, MatchStatus::Scheduled);
        let upstream = ApiMatch {
            id: 7,
            utc_date: Utc::now(),
            status: "IN_PLAY".to_string(),
            venue: None,
            competition: ApiCompetition {
                name: "Premier League".to_string(),
            },
            home_team: ApiTeam {
                name: "A".to_string(),
            },
            away_team: ApiTeam {
                name: "B".to_string(),
            },
            score: ApiScore {
                full_time: ApiFullTime {
                    home: Some(1),
                    away: Some(0),
                },
            },
        };

        let mapped = upstream.into_synced();
        assert_eq!(mapped.status, MatchStatus::Live);

        let changes = detect_changes(Some(&existing), &mapped);
        assert!(changes.score_changed);
        assert!(changes.status_changed);
        assert!(!changes.is_new);
    }

    struct FlakySource {
        fail_on: i64,
        calls: Mutex<Vec<i64>>,
    }

    #[async_trait]
    impl MatchDataSource for FlakySource {
        async fn competition_matches(
            &self,
            competition_id: i64,
            _date_from: &str,
            _date_to: &str,
        ) -> crate::errors::Result<Vec<ApiMatch>> {
            self.calls.lock().unwrap().push(competition_id);
            if competition_id == self.fail_on {
                Err(AppError::ExternalApi("upstream 503".to_string()))
            } else {
                Ok(Vec::new())
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn sweep_continues_past_a_failing_competition() {
        // lazy client: no connection is made while every league is empty
        let client = mongodb::Client::with_uri_str("mongodb://localhost:27017")
            .await
            .unwrap();
        let store = MatchStore::new(&client.database("livescore_test"));
        let broadcaster = MatchBroadcaster::new();
        let source = FlakySource {
            fail_on: 2014,
            calls: Mutex::new(Vec::new()),
        };

        let total = sync_all_leagues(
            &store,
            &source,
            &broadcaster,
            LEAGUES,
            "2026-08-05",
            "2026-08-06",
        )
        .await;

        assert_eq!(total, 0);
        let calls = source.calls.lock().unwrap();
        assert_eq!(calls.as_slice(), &[2021, 2014, 2002, 2019, 2015]);
    }

    #[test]
    fn date_range_spans_one_day() {
        let (date_from, date_to) = today_date_range();
        assert_eq!(date_from.len(), 10);
        assert_eq!(date_to.len(), 10);
        assert!(date_from < date_to);
    }
}
