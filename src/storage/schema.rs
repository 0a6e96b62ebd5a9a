//! SQLite schema for persisted telemetry.
//!
//! Four tables: registered servers, the append-only match log, per-match
//! scoreboards, and the incremental per-player rollup. `search_name`
//! columns hold the case-folded player name used for lookups; `name`
//! keeps display casing.

pub const CREATE_SERVERS_TABLE: &str = "
CREATE TABLE IF NOT EXISTS servers (
    endpoint    TEXT PRIMARY KEY,
    name        TEXT NOT NULL,
    game_modes  TEXT NOT NULL
) WITHOUT ROWID";

pub const CREATE_MATCHES_TABLE: &str = "
CREATE TABLE IF NOT EXISTS matches (
    id            INTEGER PRIMARY KEY AUTOINCREMENT,
    endpoint      TEXT NOT NULL,
    timestamp     TEXT NOT NULL,
    map           TEXT NOT NULL,
    game_mode     TEXT NOT NULL,
    frag_limit    INTEGER NOT NULL,
    time_limit    INTEGER NOT NULL,
    time_elapsed  REAL NOT NULL,
    UNIQUE (endpoint, timestamp)
)";

pub const CREATE_SCOREBOARD_TABLE: &str = "
CREATE TABLE IF NOT EXISTS scoreboard (
    match_id     INTEGER NOT NULL,
    place        INTEGER NOT NULL,
    name         TEXT NOT NULL,
    search_name  TEXT NOT NULL,
    frags        INTEGER NOT NULL,
    kills        INTEGER NOT NULL,
    deaths       INTEGER NOT NULL
)";

pub const CREATE_ROLLUP_TABLE: &str = "
CREATE TABLE IF NOT EXISTS player_rollup (
    search_name  TEXT PRIMARY KEY,
    name         TEXT NOT NULL,
    frags        INTEGER NOT NULL,
    kills        INTEGER NOT NULL,
    deaths       INTEGER NOT NULL,
    match_count  INTEGER NOT NULL
) WITHOUT ROWID";

pub const CREATE_INDEXES: &[&str] = &[
    "CREATE INDEX IF NOT EXISTS matches_endpoint ON matches (endpoint ASC)",
    "CREATE INDEX IF NOT EXISTS matches_timestamp ON matches (timestamp DESC)",
    "CREATE INDEX IF NOT EXISTS scoreboard_match_id ON scoreboard (match_id ASC)",
    "CREATE INDEX IF NOT EXISTS scoreboard_search_name ON scoreboard (search_name ASC)",
];
