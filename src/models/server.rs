//! Registered game servers.

use serde::{Deserialize, Serialize};

/// Descriptor advertised by a game server: display name plus the game
/// modes it supports, in the order the server reported them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerInfo {
    pub name: String,
    pub game_modes: Vec<String>,
}

/// A server as listed by `GET /servers/info`: its unique `host-port`
/// endpoint together with the most recently advertised descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerEntry {
    pub endpoint: String,
    pub info: ServerInfo,
}
