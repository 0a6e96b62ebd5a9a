//! Dispatcher-facing service facade.
//!
//! Composes the storage gateway, the ingestion path, the pure stat
//! aggregation, and the two cache layers into the operation set the HTTP
//! layer exposes. Reads go through a cache; on a hit storage is not
//! touched at all.

use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::cache::{ReportCache, StatCache};
use crate::calculate;
use crate::config::CacheConfig;
use crate::ingest::Ingestor;
use crate::models::{
    search_name, BestPlayer, GameMatch, MatchResult, PlayerStat, PopularServer, ServerEntry,
    ServerInfo, ServerStat,
};
use crate::storage::{Storage, StorageError};

pub struct StatsService {
    storage: Storage,
    ingestor: Ingestor,
    server_stats: StatCache<ServerStat>,
    player_stats: StatCache<PlayerStat>,
    recent_matches: ReportCache<GameMatch>,
    best_players: ReportCache<BestPlayer>,
    popular_servers: ReportCache<PopularServer>,
}

impl StatsService {
    pub fn new(storage: Storage, cache: &CacheConfig) -> Self {
        let ttl = Duration::from_secs(cache.ttl_seconds);
        Self {
            ingestor: Ingestor::new(storage.clone()),
            storage,
            server_stats: StatCache::new(ttl),
            player_stats: StatCache::new(ttl),
            recent_matches: ReportCache::new(ttl, cache.max_report_items),
            best_players: ReportCache::new(ttl, cache.max_report_items),
            popular_servers: ReportCache::new(ttl, cache.max_report_items),
        }
    }

    // ── Ingestion ────────────────────────────────────────────────

    pub async fn upsert_server(&self, endpoint: &str, info: &ServerInfo) -> Result<(), StorageError> {
        self.ingestor.upsert_server(endpoint, info).await
    }

    /// Returns whether the match was accepted (`false` means the
    /// endpoint is not a registered server).
    pub async fn insert_match(
        &self,
        endpoint: &str,
        timestamp: DateTime<Utc>,
        results: &MatchResult,
    ) -> Result<bool, StorageError> {
        self.ingestor.insert_match_if_new(endpoint, timestamp, results).await
    }

    // ── Entity reads (uncached) ──────────────────────────────────

    pub async fn get_server_info(&self, endpoint: &str) -> Result<Option<ServerInfo>, StorageError> {
        self.storage.get_server_info(endpoint).await
    }

    pub async fn get_all_servers(&self) -> Result<Vec<ServerEntry>, StorageError> {
        self.storage.get_all_servers().await
    }

    pub async fn get_match_result(
        &self,
        endpoint: &str,
        timestamp: DateTime<Utc>,
    ) -> Result<Option<MatchResult>, StorageError> {
        self.storage.get_match_result(endpoint, timestamp).await
    }

    // ── Cached aggregates ────────────────────────────────────────

    pub async fn get_server_stat(&self, endpoint: &str) -> Result<ServerStat, StorageError> {
        self.server_stats
            .get_or_compute(endpoint, || async move {
                let rows = self.storage.server_stat_rows(endpoint).await?;
                Ok(calculate::server_stat(endpoint, &rows))
            })
            .await
    }

    /// Player stats are looked up case-insensitively.
    pub async fn get_player_stat(&self, name: &str) -> Result<PlayerStat, StorageError> {
        let folded = search_name(name);
        let key: &str = &folded;
        self.player_stats
            .get_or_compute(key, || async move {
                let rows = self.storage.player_match_rows(key).await?;
                Ok(calculate::player_stat(key, &rows))
            })
            .await
    }

    // ── Cached reports ───────────────────────────────────────────

    pub async fn get_recent_matches(&self, count: usize) -> Result<Vec<GameMatch>, StorageError> {
        let cap = self.recent_matches.max_items();
        self.recent_matches
            .get_or_compute(count, || async move { self.storage.recent_matches(cap).await })
            .await
    }

    pub async fn get_best_players(&self, count: usize) -> Result<Vec<BestPlayer>, StorageError> {
        self.best_players
            .get_or_compute(count, || async move {
                let rollups = self.storage.eligible_rollups().await?;
                Ok(calculate::rank_best_players(&rollups))
            })
            .await
    }

    pub async fn get_popular_servers(&self, count: usize) -> Result<Vec<PopularServer>, StorageError> {
        self.popular_servers
            .get_or_compute(count, || async move {
                match self.storage.last_match_timestamp().await? {
                    Some(last_match) => {
                        let summaries = self.storage.server_match_summaries().await?;
                        Ok(calculate::rank_popular_servers(summaries, last_match))
                    }
                    None => Ok(Vec::new()),
                }
            })
            .await
    }
}
