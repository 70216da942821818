use super::constants::{
  BLOCK_SIZE, COLOR_RGB_THRESHOLD, GROWTH_TICKS, SCORE_LOSS_PER_DEATH, SCORE_LOSS_PER_SUICIDE,
  SCORE_PER_APPLE,
};
use super::geometry::{Cell, Direction};
use crate::protocol::{GameOverReport, PlayerRecord};
use std::time::Instant;
use tokio::sync::mpsc::UnboundedSender;

/// Lifecycle of a connected member. The numeric values are the wire codes
/// shared with the browser client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
  Spectator,
  Active,
  GameOver,
}

impl Lifecycle {
  pub fn code(self) -> u8 {
    match self {
      Lifecycle::Spectator => 2,
      Lifecycle::Active => 3,
      Lifecycle::GameOver => 4,
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb {
  pub r: u8,
  pub g: u8,
  pub b: u8,
}

impl Rgb {
  /// Parses `RRGGBB` with an optional leading `#`.
  pub fn parse(hex: &str) -> Option<Rgb> {
    let hex = hex.strip_prefix('#').unwrap_or(hex);
    if hex.len() != 6 || !hex.is_ascii() {
      return None;
    }
    let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
    let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
    let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
    Some(Rgb { r, g, b })
  }

  /// A candidate color is too close when any single channel is within the
  /// threshold of the other color's channel; all three must differ by at
  /// least `COLOR_RGB_THRESHOLD` to be accepted. A diff of exactly the
  /// threshold passes.
  pub fn too_close(self, other: Rgb) -> bool {
    self.r.abs_diff(other.r) < COLOR_RGB_THRESHOLD
      || self.g.abs_diff(other.g) < COLOR_RGB_THRESHOLD
      || self.b.abs_diff(other.b) < COLOR_RGB_THRESHOLD
  }
}

/// One connected member: a spectator or an in-game player. Created on a
/// successful connect negotiation, destroyed only on disconnect, so the
/// lifetime stats survive join/game-over cycles.
#[derive(Debug)]
pub struct Player {
  pub username: String,
  pub color: String,
  pub rgb: Rgb,
  pub state: Lifecycle,
  /// Worm body, tail first, head always last.
  pub worm: Vec<Cell>,
  pub direction: Direction,
  /// Remaining ticks of the growth window. The tail is kept while this is
  /// non-zero; decremented once per committed move.
  pub growth_ticks: u32,
  pub score: i64,
  pub kills: u32,
  pub deaths: u32,
  pub suicides: u32,
  pub score_session_start: i64,
  pub kills_session_start: u32,
  pub latency_ms: u64,
  pub ping_sent: Option<Instant>,
  /// Outbound-only transport handle. The transport layer owns the socket;
  /// this is just an address for packets to this member.
  pub sender: UnboundedSender<String>,
}

impl Player {
  pub fn new(username: String, color: String, rgb: Rgb, sender: UnboundedSender<String>) -> Self {
    Self {
      username,
      color,
      rgb,
      state: Lifecycle::Spectator,
      worm: Vec::new(),
      direction: Direction::Right,
      growth_ticks: 0,
      score: 0,
      kills: 0,
      deaths: 0,
      suicides: 0,
      score_session_start: 0,
      kills_session_start: 0,
      latency_ms: 0,
      ping_sent: None,
      sender,
    }
  }

  /// Gives the member a fresh worm and snapshots the lifetime stats so the
  /// next game-over report can show session deltas.
  pub fn reset(&mut self, worm: Vec<Cell>) {
    self.direction = Direction::Right;
    self.worm = worm;
    self.growth_ticks = 0;
    self.score_session_start = self.score;
    self.kills_session_start = self.kills;
    self.state = Lifecycle::Spectator;
  }

  pub fn is_growing(&self) -> bool {
    self.growth_ticks > 0
  }

  pub fn head(&self) -> Option<Cell> {
    self.worm.last().copied()
  }

  pub fn occupies(&self, cell: Cell) -> bool {
    self.worm.contains(&cell)
  }

  /// Credits this player with a kill. `victim_length` is the victim's
  /// pre-tick worm length.
  pub fn credit_kill(&mut self, victim_length: usize) {
    self.kills += 1;
    self.score += 2 * victim_length as i64;
  }

  pub fn die(&mut self) {
    self.deaths += 1;
    self.state = Lifecycle::GameOver;
    self.score = (self.score - SCORE_LOSS_PER_DEATH).max(0);
  }

  pub fn suicide(&mut self) {
    self.suicides += 1;
    self.state = Lifecycle::GameOver;
    self.score = (self.score - SCORE_LOSS_PER_SUICIDE).max(0);
  }

  pub fn eat(&mut self) {
    self.score += SCORE_PER_APPLE;
    self.growth_ticks = GROWTH_TICKS;
  }

  pub fn record(&self) -> PlayerRecord {
    PlayerRecord {
      username: self.username.clone(),
      worm_color: self.color.clone(),
      state: self.state.code(),
      worm_xy: self.worm.clone(),
      worm_direction: self.direction,
      growing: self.is_growing(),
      score: self.score,
      kills: self.kills,
      deaths: self.deaths,
      suicides: self.suicides,
      latency_ms: self.latency_ms,
    }
  }

  pub fn game_over_report(&self) -> GameOverReport {
    GameOverReport {
      username: self.username.clone(),
      pixel_length: self.worm.len() as i32 * BLOCK_SIZE,
      session_kills: self.kills - self.kills_session_start,
      session_score: self.score - self.score_session_start,
      total_score: self.score,
      total_kills: self.kills,
      total_deaths: self.deaths,
      total_suicides: self.suicides,
    }
  }
}
