//! # GameStats
//!
//! A statistics server for multiplayer game servers. Game servers
//! advertise themselves and submit finished matches over a REST API;
//! the service derives per-server and per-player aggregates plus three
//! ranked reports, backed by SQLite with TTL-based caching.
//!
//! ## Architecture
//!
//! - **models**: Core data structures (servers, matches, stats, reports)
//! - **storage**: SQLite gateway (schema, transactions, read queries)
//! - **ingest**: Write path (server advertisement, match submission)
//! - **calculate**: Pure aggregate and ranking computation
//! - **cache**: Stat and report caches with TTL expiry
//! - **service**: Facade composing storage, ingestion, and caches
//! - **api**: REST API endpoints
//! - **config**: Configuration loading and validation

pub mod api;
pub mod cache;
pub mod calculate;
pub mod config;
pub mod ingest;
pub mod models;
pub mod service;
pub mod storage;

pub use models::*;
