//! SQLite storage gateway.
//!
//! The only component that touches durable storage. Every public read
//! runs as one query against the pool; the write helpers take an open
//! transaction so the ingestion path can commit a match, its scoreboard,
//! and the rollup update atomically. No operation spans more than one
//! externally visible transaction.

mod schema;

use chrono::{DateTime, Utc};
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{Row, Sqlite, SqlitePool, Transaction};
use thiserror::Error;

use crate::calculate::{MatchStatRow, PlayerMatchRow, ServerMatchSummary};
use crate::models::{
    GameMatch, MatchResult, PlayerRollup, ScoreboardEntry, ServerEntry, ServerInfo,
};

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("JSON column error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Handle on the SQLite database. Cheap to clone; the pool is shared.
#[derive(Clone)]
pub struct Storage {
    pool: SqlitePool,
}

impl Storage {
    /// Open (or create) the database at `path` and prepare the pool.
    pub async fn connect(path: &str) -> Result<Self, StorageError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(8)
            .connect(&format!("sqlite:{path}?mode=rwc"))
            .await?;

        // WAL keeps readers unblocked while ingestion commits.
        sqlx::query("PRAGMA journal_mode = WAL").execute(&pool).await?;
        sqlx::query("PRAGMA synchronous = NORMAL").execute(&pool).await?;

        Ok(Self { pool })
    }

    /// Create tables and indexes if they do not exist yet.
    pub async fn init_schema(&self) -> Result<(), StorageError> {
        let mut tx = self.pool.begin().await?;
        for statement in [
            schema::CREATE_SERVERS_TABLE,
            schema::CREATE_MATCHES_TABLE,
            schema::CREATE_SCOREBOARD_TABLE,
            schema::CREATE_ROLLUP_TABLE,
        ]
        .into_iter()
        .chain(schema::CREATE_INDEXES.iter().copied())
        {
            sqlx::query(statement).execute(&mut *tx).await?;
        }
        tx.commit().await?;
        Ok(())
    }

    /// Open a transaction for a composed write.
    pub async fn begin(&self) -> Result<Transaction<'_, Sqlite>, StorageError> {
        Ok(self.pool.begin().await?)
    }

    // ── Writes (transaction-scoped) ──────────────────────────────

    /// Insert-or-replace a server row. Last write wins.
    pub async fn upsert_server(
        tx: &mut Transaction<'_, Sqlite>,
        endpoint: &str,
        info: &ServerInfo,
    ) -> Result<(), StorageError> {
        sqlx::query("INSERT OR REPLACE INTO servers (endpoint, name, game_modes) VALUES (?, ?, ?)")
            .bind(endpoint)
            .bind(&info.name)
            .bind(serde_json::to_string(&info.game_modes)?)
            .execute(&mut **tx)
            .await?;
        Ok(())
    }

    pub async fn server_exists(
        tx: &mut Transaction<'_, Sqlite>,
        endpoint: &str,
    ) -> Result<bool, StorageError> {
        let row = sqlx::query("SELECT 1 FROM servers WHERE endpoint = ? LIMIT 1")
            .bind(endpoint)
            .fetch_optional(&mut **tx)
            .await?;
        Ok(row.is_some())
    }

    pub async fn match_exists(
        tx: &mut Transaction<'_, Sqlite>,
        endpoint: &str,
        timestamp: DateTime<Utc>,
    ) -> Result<bool, StorageError> {
        let row = sqlx::query("SELECT 1 FROM matches WHERE endpoint = ? AND timestamp = ? LIMIT 1")
            .bind(endpoint)
            .bind(timestamp)
            .fetch_optional(&mut **tx)
            .await?;
        Ok(row.is_some())
    }

    /// Insert the match row and return its generated id.
    pub async fn insert_match_row(
        tx: &mut Transaction<'_, Sqlite>,
        endpoint: &str,
        timestamp: DateTime<Utc>,
        results: &MatchResult,
    ) -> Result<i64, StorageError> {
        let done = sqlx::query(
            "INSERT INTO matches (endpoint, timestamp, map, game_mode, frag_limit, time_limit, time_elapsed)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(endpoint)
        .bind(timestamp)
        .bind(&results.map)
        .bind(&results.game_mode)
        .bind(results.frag_limit)
        .bind(results.time_limit)
        .bind(results.time_elapsed)
        .execute(&mut **tx)
        .await?;
        Ok(done.last_insert_rowid())
    }

    /// Insert all scoreboard rows of one match, tagged with 1-based rank
    /// in input order.
    pub async fn insert_scoreboard(
        tx: &mut Transaction<'_, Sqlite>,
        match_id: i64,
        scoreboard: &[ScoreboardEntry],
    ) -> Result<(), StorageError> {
        for (index, entry) in scoreboard.iter().enumerate() {
            sqlx::query(
                "INSERT INTO scoreboard (match_id, place, name, search_name, frags, kills, deaths)
                 VALUES (?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(match_id)
            .bind(index as i64 + 1)
            .bind(&entry.name)
            .bind(crate::models::search_name(&entry.name))
            .bind(entry.frags)
            .bind(entry.kills)
            .bind(entry.deaths)
            .execute(&mut **tx)
            .await?;
        }
        Ok(())
    }

    pub async fn get_rollup(
        tx: &mut Transaction<'_, Sqlite>,
        search_name: &str,
    ) -> Result<Option<PlayerRollup>, StorageError> {
        let row = sqlx::query(
            "SELECT name, frags, kills, deaths, match_count FROM player_rollup WHERE search_name = ?",
        )
        .bind(search_name)
        .fetch_optional(&mut **tx)
        .await?;

        row.map(|r| {
            Ok(PlayerRollup {
                name: r.try_get("name")?,
                frags: r.try_get("frags")?,
                kills: r.try_get("kills")?,
                deaths: r.try_get("deaths")?,
                match_count: r.try_get("match_count")?,
            })
        })
        .transpose()
        .map_err(StorageError::Database)
    }

    pub async fn upsert_rollup(
        tx: &mut Transaction<'_, Sqlite>,
        search_name: &str,
        rollup: &PlayerRollup,
    ) -> Result<(), StorageError> {
        sqlx::query(
            "INSERT OR REPLACE INTO player_rollup (search_name, name, frags, kills, deaths, match_count)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(search_name)
        .bind(&rollup.name)
        .bind(rollup.frags)
        .bind(rollup.kills)
        .bind(rollup.deaths)
        .bind(rollup.match_count)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }

    // ── Reads ────────────────────────────────────────────────────

    pub async fn get_server_info(&self, endpoint: &str) -> Result<Option<ServerInfo>, StorageError> {
        let row = sqlx::query("SELECT name, game_modes FROM servers WHERE endpoint = ? LIMIT 1")
            .bind(endpoint)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(r) => {
                let game_modes: String = r.try_get("game_modes")?;
                Ok(Some(ServerInfo {
                    name: r.try_get("name")?,
                    game_modes: serde_json::from_str(&game_modes)?,
                }))
            }
            None => Ok(None),
        }
    }

    pub async fn get_all_servers(&self) -> Result<Vec<ServerEntry>, StorageError> {
        let rows = sqlx::query("SELECT endpoint, name, game_modes FROM servers")
            .fetch_all(&self.pool)
            .await?;

        let mut servers = Vec::with_capacity(rows.len());
        for r in rows {
            let game_modes: String = r.try_get("game_modes")?;
            servers.push(ServerEntry {
                endpoint: r.try_get("endpoint")?,
                info: ServerInfo {
                    name: r.try_get("name")?,
                    game_modes: serde_json::from_str(&game_modes)?,
                },
            });
        }
        Ok(servers)
    }

    pub async fn get_match_result(
        &self,
        endpoint: &str,
        timestamp: DateTime<Utc>,
    ) -> Result<Option<MatchResult>, StorageError> {
        let row = sqlx::query(
            "SELECT id, map, game_mode, frag_limit, time_limit, time_elapsed
             FROM matches WHERE endpoint = ? AND timestamp = ? LIMIT 1",
        )
        .bind(endpoint)
        .bind(timestamp)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(r) => {
                let match_id: i64 = r.try_get("id")?;
                Ok(Some(MatchResult {
                    map: r.try_get("map")?,
                    game_mode: r.try_get("game_mode")?,
                    frag_limit: r.try_get("frag_limit")?,
                    time_limit: r.try_get("time_limit")?,
                    time_elapsed: r.try_get("time_elapsed")?,
                    scoreboard: self.scoreboard_for_match(match_id).await?,
                }))
            }
            None => Ok(None),
        }
    }

    async fn scoreboard_for_match(&self, match_id: i64) -> Result<Vec<ScoreboardEntry>, StorageError> {
        let rows = sqlx::query(
            "SELECT name, frags, kills, deaths FROM scoreboard WHERE match_id = ? ORDER BY place",
        )
        .bind(match_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|r| {
                Ok(ScoreboardEntry {
                    name: r.try_get("name")?,
                    frags: r.try_get("frags")?,
                    kills: r.try_get("kills")?,
                    deaths: r.try_get("deaths")?,
                })
            })
            .collect::<Result<_, sqlx::Error>>()
            .map_err(StorageError::Database)
    }

    /// All matches of one server with per-match population, for the
    /// server-stat aggregation.
    pub async fn server_stat_rows(&self, endpoint: &str) -> Result<Vec<MatchStatRow>, StorageError> {
        let rows = sqlx::query(
            "SELECT m.timestamp, m.game_mode, m.map,
                    (SELECT COUNT(*) FROM scoreboard sb WHERE sb.match_id = m.id) AS population
             FROM matches m WHERE m.endpoint = ?",
        )
        .bind(endpoint)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|r| {
                Ok(MatchStatRow {
                    timestamp: r.try_get("timestamp")?,
                    population: r.try_get("population")?,
                    game_mode: r.try_get("game_mode")?,
                    map: r.try_get("map")?,
                })
            })
            .collect::<Result<_, sqlx::Error>>()
            .map_err(StorageError::Database)
    }

    /// All scoreboard rows of one case-folded player joined with their
    /// match, for the player-stat aggregation.
    pub async fn player_match_rows(
        &self,
        search_name: &str,
    ) -> Result<Vec<PlayerMatchRow>, StorageError> {
        let rows = sqlx::query(
            "SELECT m.endpoint, m.timestamp, m.game_mode, s.place, s.kills, s.deaths,
                    (SELECT COUNT(*) FROM scoreboard sb WHERE sb.match_id = m.id) AS population
             FROM scoreboard s
             JOIN matches m ON m.id = s.match_id
             WHERE s.search_name = ?",
        )
        .bind(search_name)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|r| {
                Ok(PlayerMatchRow {
                    endpoint: r.try_get("endpoint")?,
                    timestamp: r.try_get("timestamp")?,
                    game_mode: r.try_get("game_mode")?,
                    place: r.try_get("place")?,
                    population: r.try_get("population")?,
                    kills: r.try_get("kills")?,
                    deaths: r.try_get("deaths")?,
                })
            })
            .collect::<Result<_, sqlx::Error>>()
            .map_err(StorageError::Database)
    }

    /// Timestamp of the most recent match across all servers.
    pub async fn last_match_timestamp(&self) -> Result<Option<DateTime<Utc>>, StorageError> {
        let row = sqlx::query("SELECT timestamp FROM matches ORDER BY timestamp DESC LIMIT 1")
            .fetch_optional(&self.pool)
            .await?;
        row.map(|r| r.try_get("timestamp"))
            .transpose()
            .map_err(StorageError::Database)
    }

    /// The `cap` newest matches with their full scoreboards, newest
    /// first.
    pub async fn recent_matches(&self, cap: usize) -> Result<Vec<GameMatch>, StorageError> {
        let rows = sqlx::query(
            "SELECT id, endpoint, timestamp, map, game_mode, frag_limit, time_limit, time_elapsed
             FROM matches ORDER BY timestamp DESC LIMIT ?",
        )
        .bind(cap as i64)
        .fetch_all(&self.pool)
        .await?;

        let mut matches = Vec::with_capacity(rows.len());
        for r in rows {
            let match_id: i64 = r.try_get("id")?;
            matches.push(GameMatch {
                server: r.try_get("endpoint")?,
                timestamp: r.try_get("timestamp")?,
                results: MatchResult {
                    map: r.try_get("map")?,
                    game_mode: r.try_get("game_mode")?,
                    frag_limit: r.try_get("frag_limit")?,
                    time_limit: r.try_get("time_limit")?,
                    time_elapsed: r.try_get("time_elapsed")?,
                    scoreboard: self.scoreboard_for_match(match_id).await?,
                },
            });
        }
        Ok(matches)
    }

    /// Per-server match totals (servers without matches are absent), for
    /// the popular-servers ranking.
    pub async fn server_match_summaries(&self) -> Result<Vec<ServerMatchSummary>, StorageError> {
        let rows = sqlx::query(
            "SELECT m.endpoint, COALESCE(sv.name, '') AS name,
                    COUNT(*) AS total_matches, MIN(m.timestamp) AS first_match
             FROM matches m
             LEFT JOIN servers sv ON sv.endpoint = m.endpoint
             GROUP BY m.endpoint",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|r| {
                Ok(ServerMatchSummary {
                    endpoint: r.try_get("endpoint")?,
                    name: r.try_get("name")?,
                    total_matches: r.try_get("total_matches")?,
                    first_match: r.try_get("first_match")?,
                })
            })
            .collect::<Result<_, sqlx::Error>>()
            .map_err(StorageError::Database)
    }

    /// Rollup rows of leaderboard-eligible players.
    pub async fn eligible_rollups(&self) -> Result<Vec<PlayerRollup>, StorageError> {
        let rows = sqlx::query(
            "SELECT name, frags, kills, deaths, match_count
             FROM player_rollup WHERE deaths > 0 AND match_count >= 10",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|r| {
                Ok(PlayerRollup {
                    name: r.try_get("name")?,
                    frags: r.try_get("frags")?,
                    kills: r.try_get("kills")?,
                    deaths: r.try_get("deaths")?,
                    match_count: r.try_get("match_count")?,
                })
            })
            .collect::<Result<_, sqlx::Error>>()
            .map_err(StorageError::Database)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    async fn test_storage() -> (Storage, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.sqlite");
        let storage = Storage::connect(path.to_str().unwrap()).await.unwrap();
        storage.init_schema().await.unwrap();
        (storage, dir)
    }

    fn info(name: &str) -> ServerInfo {
        ServerInfo {
            name: name.to_string(),
            game_modes: vec!["DM".to_string(), "TDM".to_string()],
        }
    }

    #[tokio::test]
    async fn test_init_schema_is_idempotent() {
        let (storage, _dir) = test_storage().await;
        storage.init_schema().await.unwrap();
    }

    #[tokio::test]
    async fn test_server_upsert_replaces() {
        let (storage, _dir) = test_storage().await;

        let mut tx = storage.begin().await.unwrap();
        Storage::upsert_server(&mut tx, "example-1234", &info("old")).await.unwrap();
        tx.commit().await.unwrap();

        let mut tx = storage.begin().await.unwrap();
        Storage::upsert_server(&mut tx, "example-1234", &info("new")).await.unwrap();
        tx.commit().await.unwrap();

        let stored = storage.get_server_info("example-1234").await.unwrap().unwrap();
        assert_eq!(stored.name, "new");
        assert_eq!(storage.get_all_servers().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_missing_server_and_match_read_as_none() {
        let (storage, _dir) = test_storage().await;

        assert!(storage.get_server_info("nope-1").await.unwrap().is_none());
        let ts = Utc.with_ymd_and_hms(2017, 1, 22, 15, 17, 0).unwrap();
        assert!(storage.get_match_result("nope-1", ts).await.unwrap().is_none());
        assert!(storage.last_match_timestamp().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_match_round_trip_with_scoreboard_order() {
        let (storage, _dir) = test_storage().await;
        let ts = Utc.with_ymd_and_hms(2017, 1, 22, 15, 17, 0).unwrap();
        let results = MatchResult {
            map: "DM-HelloWorld".to_string(),
            game_mode: "DM".to_string(),
            frag_limit: 20,
            time_limit: 20,
            time_elapsed: 12.345678,
            scoreboard: vec![
                ScoreboardEntry { name: "Winner".to_string(), frags: 20, kills: 21, deaths: 3 },
                ScoreboardEntry { name: "Loser".to_string(), frags: 2, kills: 2, deaths: 21 },
            ],
        };

        let mut tx = storage.begin().await.unwrap();
        Storage::upsert_server(&mut tx, "example-1234", &info("srv")).await.unwrap();
        let match_id = Storage::insert_match_row(&mut tx, "example-1234", ts, &results)
            .await
            .unwrap();
        Storage::insert_scoreboard(&mut tx, match_id, &results.scoreboard).await.unwrap();
        tx.commit().await.unwrap();

        let stored = storage.get_match_result("example-1234", ts).await.unwrap().unwrap();
        assert_eq!(stored, results);
        assert_eq!(storage.last_match_timestamp().await.unwrap(), Some(ts));

        let rows = storage.server_stat_rows("example-1234").await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].population, 2);

        let player_rows = storage.player_match_rows("winner").await.unwrap();
        assert_eq!(player_rows.len(), 1);
        assert_eq!(player_rows[0].place, 1);
        assert_eq!(player_rows[0].population, 2);
    }
}
