use crate::game::geometry::{Cell, Direction};
use serde::{Deserialize, Serialize};

/// Inbound events, tagged with `"e"`: `{"e": "connect", "username": ...}`.
/// Undecodable frames are dropped by the caller.
#[derive(Debug, Deserialize)]
#[serde(tag = "e")]
pub enum ClientEvent {
  #[serde(rename = "connect")]
  Connect { username: String, color: String },
  #[serde(rename = "join")]
  Join,
  #[serde(rename = "sync_request")]
  SyncRequest,
  #[serde(rename = "keypress")]
  Keypress { key: u8 },
  #[serde(rename = "pong")]
  Pong,
}

/// Result codes for a connect negotiation. The full table is part of the
/// client contract; the server itself only ever sends codes 2 through 5.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectStatus {
  NotConnected,
  AwaitingResponse,
  UserColorOk,
  ReservedColor,
  ReservedUsername,
  ServerFull,
}

impl ConnectStatus {
  pub fn code(self) -> u8 {
    match self {
      ConnectStatus::NotConnected => 0,
      ConnectStatus::AwaitingResponse => 1,
      ConnectStatus::UserColorOk => 2,
      ConnectStatus::ReservedColor => 3,
      ConnectStatus::ReservedUsername => 4,
      ConnectStatus::ServerFull => 5,
    }
  }
}

/// One entry of the per-tick delta packet: an active player's head.
#[derive(Debug, Clone, Serialize)]
pub struct RefreshEntry {
  pub n: String,
  pub x: i32,
  pub y: i32,
  pub wd: Direction,
  pub g: bool,
}

/// Full member record carried by the `ws` packet.
#[derive(Debug, Clone, Serialize)]
pub struct PlayerRecord {
  pub username: String,
  pub worm_color: String,
  pub state: u8,
  pub worm_xy: Vec<Cell>,
  pub worm_direction: Direction,
  pub growing: bool,
  pub score: i64,
  pub kills: u32,
  pub deaths: u32,
  pub suicides: u32,
  pub latency_ms: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct GameOverReport {
  pub username: String,
  pub pixel_length: i32,
  pub session_kills: u32,
  pub session_score: i64,
  pub total_score: i64,
  pub total_kills: u32,
  pub total_deaths: u32,
  pub total_suicides: u32,
}

/// Outbound events, tagged with `"e"` like the inbound ones.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "e")]
pub enum ServerEvent {
  #[serde(rename = "connect_response")]
  ConnectResponse { code: u8 },
  /// World refresh: the lightweight delta sent on ordinary ticks.
  #[serde(rename = "wr")]
  Refresh { p: Vec<RefreshEntry> },
  /// World synchronize: the full snapshot sent on membership or apple
  /// changes and on explicit sync requests.
  #[serde(rename = "ws")]
  Synchronize {
    players: Vec<PlayerRecord>,
    spectators: Vec<PlayerRecord>,
    apples_xy: Vec<Cell>,
  },
  #[serde(rename = "go")]
  GameOver(GameOverReport),
  #[serde(rename = "msg")]
  Msg { text: String },
  #[serde(rename = "ping")]
  Ping,
}

impl ServerEvent {
  /// Serialized wire frame. These shapes contain nothing serde_json can
  /// reject, so a failure collapses to an empty frame the client ignores.
  pub fn payload(&self) -> String {
    serde_json::to_string(self).unwrap_or_default()
  }
}
