//! Telemetry ingestion path.
//!
//! Two write operations feed the match log: server advertisement
//! (insert-or-replace) and match submission. A match is accepted at most
//! once per `(endpoint, timestamp)`; accepting it writes the match row,
//! its scoreboard, and the incremental per-player rollup update in one
//! transaction, so readers never observe a match without its scoreboard
//! or with a half-applied rollup.

use chrono::{DateTime, Utc};

use crate::models::{search_name, MatchResult, PlayerRollup, ScoreboardEntry, ServerInfo};
use crate::storage::{Storage, StorageError};

/// Fold one scoreboard line into a player's rollup, creating the rollup
/// for a first appearance. The display name is refreshed to the casing
/// used in this match.
pub fn merge_rollup(existing: Option<PlayerRollup>, entry: &ScoreboardEntry) -> PlayerRollup {
    match existing {
        Some(rollup) => PlayerRollup {
            name: entry.name.clone(),
            frags: rollup.frags + entry.frags,
            kills: rollup.kills + entry.kills,
            deaths: rollup.deaths + entry.deaths,
            match_count: rollup.match_count + 1,
        },
        None => PlayerRollup {
            name: entry.name.clone(),
            frags: entry.frags,
            kills: entry.kills,
            deaths: entry.deaths,
            match_count: 1,
        },
    }
}

/// Write side of the service: upserts servers and appends matches.
#[derive(Clone)]
pub struct Ingestor {
    storage: Storage,
}

impl Ingestor {
    pub fn new(storage: Storage) -> Self {
        Self { storage }
    }

    /// Register or replace a server descriptor. Dependent cached reports
    /// may stay stale until their TTL runs out; that window is accepted.
    pub async fn upsert_server(&self, endpoint: &str, info: &ServerInfo) -> Result<(), StorageError> {
        let mut tx = self.storage.begin().await?;
        Storage::upsert_server(&mut tx, endpoint, info).await?;
        tx.commit().await?;
        tracing::debug!(endpoint, "server advertised");
        Ok(())
    }

    /// Insert a match if its `(endpoint, timestamp)` key is new.
    ///
    /// Returns `Ok(false)` without writing when the endpoint is not a
    /// registered server. Returns `Ok(true)` without writing when the
    /// match already exists (idempotent replay). Otherwise inserts the
    /// match, its scoreboard, and every player's rollup increment inside
    /// the same transaction, then returns `Ok(true)`.
    pub async fn insert_match_if_new(
        &self,
        endpoint: &str,
        timestamp: DateTime<Utc>,
        results: &MatchResult,
    ) -> Result<bool, StorageError> {
        let mut tx = self.storage.begin().await?;

        if !Storage::server_exists(&mut tx, endpoint).await? {
            tracing::debug!(endpoint, "match rejected: unknown server");
            return Ok(false);
        }

        if Storage::match_exists(&mut tx, endpoint, timestamp).await? {
            return Ok(true);
        }

        let match_id = Storage::insert_match_row(&mut tx, endpoint, timestamp, results).await?;
        Storage::insert_scoreboard(&mut tx, match_id, &results.scoreboard).await?;

        for entry in &results.scoreboard {
            let key = search_name(&entry.name);
            let existing = Storage::get_rollup(&mut tx, &key).await?;
            let merged = merge_rollup(existing, entry);
            Storage::upsert_rollup(&mut tx, &key, &merged).await?;
        }

        tx.commit().await?;
        tracing::debug!(endpoint, %timestamp, players = results.scoreboard.len(), "match recorded");
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn entry(name: &str, frags: i64, kills: i64, deaths: i64) -> ScoreboardEntry {
        ScoreboardEntry {
            name: name.to_string(),
            frags,
            kills,
            deaths,
        }
    }

    fn results(scoreboard: Vec<ScoreboardEntry>) -> MatchResult {
        MatchResult {
            map: "DM-HelloWorld".to_string(),
            game_mode: "DM".to_string(),
            frag_limit: 20,
            time_limit: 20,
            time_elapsed: 12.345678,
            scoreboard,
        }
    }

    fn info() -> ServerInfo {
        ServerInfo {
            name: "srv".to_string(),
            game_modes: vec!["DM".to_string()],
        }
    }

    async fn test_ingestor() -> (Ingestor, Storage, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.sqlite");
        let storage = Storage::connect(path.to_str().unwrap()).await.unwrap();
        storage.init_schema().await.unwrap();
        (Ingestor::new(storage.clone()), storage, dir)
    }

    #[test]
    fn test_merge_rollup_first_appearance() {
        let merged = merge_rollup(None, &entry("Player1", 5, 6, 7));
        assert_eq!(merged.name, "Player1");
        assert_eq!(merged.frags, 5);
        assert_eq!(merged.kills, 6);
        assert_eq!(merged.deaths, 7);
        assert_eq!(merged.match_count, 1);
    }

    #[test]
    fn test_merge_rollup_accumulates_and_refreshes_name() {
        let existing = PlayerRollup {
            name: "player1".to_string(),
            frags: 10,
            kills: 12,
            deaths: 4,
            match_count: 3,
        };

        let merged = merge_rollup(Some(existing), &entry("PLAYER1", 5, 6, 7));
        assert_eq!(merged.name, "PLAYER1");
        assert_eq!(merged.frags, 15);
        assert_eq!(merged.kills, 18);
        assert_eq!(merged.deaths, 11);
        assert_eq!(merged.match_count, 4);
    }

    #[tokio::test]
    async fn test_unknown_server_rejected_without_writes() {
        let (ingestor, storage, _dir) = test_ingestor().await;
        let ts = Utc.with_ymd_and_hms(2017, 1, 22, 15, 17, 0).unwrap();

        let accepted = ingestor
            .insert_match_if_new("ghost-1", ts, &results(vec![entry("P1", 1, 1, 1)]))
            .await
            .unwrap();

        assert!(!accepted);
        assert!(storage.get_match_result("ghost-1", ts).await.unwrap().is_none());
        assert!(storage.last_match_timestamp().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_insert_is_idempotent() {
        let (ingestor, storage, _dir) = test_ingestor().await;
        let ts = Utc.with_ymd_and_hms(2017, 1, 22, 15, 17, 0).unwrap();
        let match_results = results(vec![entry("P1", 1, 1, 1), entry("P2", 0, 0, 2)]);

        ingestor.upsert_server("example-1234", &info()).await.unwrap();
        assert!(ingestor
            .insert_match_if_new("example-1234", ts, &match_results)
            .await
            .unwrap());
        // Replay with the same key reports accepted but writes nothing.
        assert!(ingestor
            .insert_match_if_new("example-1234", ts, &match_results)
            .await
            .unwrap());

        let stored = storage
            .get_match_result("example-1234", ts)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.scoreboard.len(), 2);

        let rows = storage.player_match_rows("p1").await.unwrap();
        assert_eq!(rows.len(), 1);

        let mut tx = storage.begin().await.unwrap();
        let rollup = Storage::get_rollup(&mut tx, "p1").await.unwrap().unwrap();
        assert_eq!(rollup.match_count, 1);
    }

    #[tokio::test]
    async fn test_rollup_accumulates_across_matches_case_insensitively() {
        let (ingestor, storage, _dir) = test_ingestor().await;
        ingestor.upsert_server("example-1234", &info()).await.unwrap();

        let ts1 = Utc.with_ymd_and_hms(2017, 1, 22, 15, 17, 0).unwrap();
        let ts2 = Utc.with_ymd_and_hms(2017, 1, 22, 16, 17, 0).unwrap();
        ingestor
            .insert_match_if_new("example-1234", ts1, &results(vec![entry("Player1", 5, 6, 2)]))
            .await
            .unwrap();
        ingestor
            .insert_match_if_new("example-1234", ts2, &results(vec![entry("PLAYER1", 3, 4, 1)]))
            .await
            .unwrap();

        let mut tx = storage.begin().await.unwrap();
        let rollup = Storage::get_rollup(&mut tx, "player1").await.unwrap().unwrap();
        assert_eq!(rollup.name, "PLAYER1");
        assert_eq!(rollup.frags, 8);
        assert_eq!(rollup.kills, 10);
        assert_eq!(rollup.deaths, 3);
        assert_eq!(rollup.match_count, 2);
    }

    #[tokio::test]
    async fn test_same_timestamp_on_other_server_is_distinct() {
        let (ingestor, storage, _dir) = test_ingestor().await;
        let ts = Utc.with_ymd_and_hms(2017, 1, 22, 15, 17, 0).unwrap();

        ingestor.upsert_server("a-1", &info()).await.unwrap();
        ingestor.upsert_server("b-1", &info()).await.unwrap();

        assert!(ingestor
            .insert_match_if_new("a-1", ts, &results(vec![entry("P1", 1, 1, 1)]))
            .await
            .unwrap());
        assert!(ingestor
            .insert_match_if_new("b-1", ts, &results(vec![entry("P1", 1, 1, 1)]))
            .await
            .unwrap());

        assert_eq!(storage.recent_matches(10).await.unwrap().len(), 2);
    }
}
