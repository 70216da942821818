use super::constants::{MAX_PLAYERS, PING_INTERVAL_TICKS, TICK_MS};
use super::geometry::{next_cell, Cell, Direction};
use super::player::{Lifecycle, Player, Rgb};
use super::spawn::{find_apple_spawn, find_worm_spawn};
use crate::protocol::{ClientEvent, ConnectStatus, RefreshEntry, ServerEvent};
use crate::shared::names::valid_username;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc::UnboundedSender;
use tokio::sync::Mutex;
use uuid::Uuid;

/// One arena world. All session commands and the tick loop serialize
/// through the state mutex, so nothing ever observes a half-applied tick.
#[derive(Debug)]
pub struct Arena {
  state: Mutex<ArenaState>,
  running: AtomicBool,
}

#[derive(Debug)]
struct SessionEntry {
  sender: UnboundedSender<String>,
  /// Set once the connect negotiation succeeds.
  username: Option<String>,
}

#[derive(Debug)]
struct ArenaState {
  sessions: HashMap<String, SessionEntry>,
  /// In-game members, in directory order; stable-sorted by score after
  /// every full synchronization.
  players: Vec<Player>,
  spectators: Vec<Player>,
  apples: Vec<Cell>,
  ticks: u64,
}

/// Pre-tick view of one active worm. Collisions are resolved against these
/// snapshots so the outcome does not depend on iteration order. The worm is
/// the full pre-tick body, head included: even when a worm turns away its
/// old head cell stays occupied as the neck segment.
#[derive(Debug)]
struct MoveSnapshot {
  username: String,
  worm: Vec<Cell>,
  candidate: Cell,
}

impl Arena {
  pub fn new() -> Self {
    Self {
      state: Mutex::new(ArenaState::new()),
      running: AtomicBool::new(false),
    }
  }

  pub async fn add_session(self: &Arc<Self>, sender: UnboundedSender<String>) -> String {
    let session_id = Uuid::new_v4().to_string();
    {
      let mut state = self.state.lock().await;
      state.sessions.insert(
        session_id.clone(),
        SessionEntry {
          sender,
          username: None,
        },
      );
    }
    self.ensure_loop();
    session_id
  }

  pub async fn remove_session(&self, session_id: &str) {
    let mut state = self.state.lock().await;
    state.disconnect_session(session_id);
  }

  pub async fn handle_text_message(&self, session_id: &str, text: &str) {
    let Ok(event) = serde_json::from_str::<ClientEvent>(text) else { return };
    let mut state = self.state.lock().await;
    match event {
      ClientEvent::Connect { username, color } => {
        state.handle_connect(session_id, username, color);
      }
      ClientEvent::Join => state.handle_join(session_id),
      ClientEvent::SyncRequest => state.handle_sync_request(session_id),
      ClientEvent::Keypress { key } => state.handle_keypress(session_id, key),
      ClientEvent::Pong => state.handle_pong(session_id),
    }
  }

  fn ensure_loop(self: &Arc<Self>) {
    if self
      .running
      .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
      .is_err()
    {
      return;
    }

    let arena = Arc::clone(self);
    tokio::spawn(async move {
      let mut interval = tokio::time::interval(Duration::from_millis(TICK_MS));
      loop {
        interval.tick().await;
        let mut state = arena.state.lock().await;
        if state.sessions.is_empty() {
          arena.running.store(false, Ordering::SeqCst);
          break;
        }
        state.tick();
      }
    });
  }
}

fn connect_response(status: ConnectStatus) -> String {
  ServerEvent::ConnectResponse { code: status.code() }.payload()
}

impl ArenaState {
  fn new() -> Self {
    Self {
      sessions: HashMap::new(),
      players: Vec::new(),
      spectators: Vec::new(),
      apples: Vec::new(),
      ticks: 0,
    }
  }

  fn session_username(&self, session_id: &str) -> Option<String> {
    self
      .sessions
      .get(session_id)
      .and_then(|entry| entry.username.clone())
  }

  fn player_mut(&mut self, username: &str) -> Option<&mut Player> {
    self.players.iter_mut().find(|player| player.username == username)
  }

  fn is_active(&self, username: &str) -> bool {
    self
      .players
      .iter()
      .any(|player| player.username == username && player.state == Lifecycle::Active)
  }

  fn handle_connect(&mut self, session_id: &str, username: String, color: String) {
    let Some(entry) = self.sessions.get(session_id) else { return };
    if entry.username.is_some() {
      return;
    }
    let sender = entry.sender.clone();

    if self.players.len() + self.spectators.len() >= MAX_PLAYERS {
      tracing::info!(username, "rejecting connect, server full");
      let _ = sender.send(connect_response(ConnectStatus::ServerFull));
      return;
    }

    if !valid_username(&username) {
      tracing::info!(username, "rejecting connect, invalid username");
      let _ = sender.send(connect_response(ConnectStatus::ReservedUsername));
      return;
    }

    let Some(rgb) = Rgb::parse(&color) else {
      tracing::info!(username, color, "rejecting connect, unparsable color");
      let _ = sender.send(connect_response(ConnectStatus::ReservedColor));
      return;
    };

    for member in self.players.iter().chain(self.spectators.iter()) {
      if member.username == username {
        tracing::info!(username, "rejecting connect, username reserved");
        let _ = sender.send(connect_response(ConnectStatus::ReservedUsername));
        return;
      }
      if rgb.too_close(member.rgb) {
        tracing::info!(
          username,
          color,
          taken = member.color,
          "rejecting connect, color too close"
        );
        let _ = sender.send(connect_response(ConnectStatus::ReservedColor));
        return;
      }
    }

    tracing::info!(username, color, "username and color accepted");
    self
      .spectators
      .push(Player::new(username.clone(), color, rgb, sender.clone()));
    if let Some(entry) = self.sessions.get_mut(session_id) {
      entry.username = Some(username.clone());
    }
    let _ = sender.send(connect_response(ConnectStatus::UserColorOk));
    self.publish(&format!("{username} connects to the server"));
    self.synchronize_all();
  }

  fn handle_join(&mut self, session_id: &str) {
    let Some(username) = self.session_username(session_id) else { return };
    let Some(index) = self
      .spectators
      .iter()
      .position(|member| member.username == username)
    else {
      return;
    };

    match find_worm_spawn(&self.players) {
      Ok(worm) => {
        let mut member = self.spectators.remove(index);
        member.reset(worm);
        member.state = Lifecycle::Active;
        self.players.push(member);
        self.publish(&format!("{username} enters the fight!"));
        self.synchronize_all();
      }
      Err(err) => {
        tracing::error!(username, %err, "cannot activate player without a worm");
      }
    }
  }

  fn disconnect_session(&mut self, session_id: &str) {
    let Some(entry) = self.sessions.remove(session_id) else { return };
    let Some(username) = entry.username else { return };

    if let Some(index) = self.players.iter().position(|p| p.username == username) {
      self.players.remove(index);
      self.publish(&format!("{username} flees the fight by closing the browser"));
      self.synchronize_all();
    } else if let Some(index) = self.spectators.iter().position(|s| s.username == username) {
      self.spectators.remove(index);
      self.publish(&format!("{username} gets bored of watching and disconnects"));
      self.synchronize_all();
    }
  }

  fn handle_sync_request(&mut self, session_id: &str) {
    let Some(username) = self.session_username(session_id) else { return };
    let payload = self.build_sync_payload();
    // Stale packets from members not currently in the game are dropped.
    if let Some(player) = self.player_mut(&username) {
      let _ = player.sender.send(payload);
    }
  }

  fn handle_keypress(&mut self, session_id: &str, key: u8) {
    let Some(username) = self.session_username(session_id) else { return };
    let Ok(direction) = Direction::try_from(key) else { return };
    if let Some(player) = self.player_mut(&username) {
      player.direction = direction;
    }
  }

  fn handle_pong(&mut self, session_id: &str) {
    let Some(username) = self.session_username(session_id) else { return };
    let Some(player) = self.player_mut(&username) else { return };
    if let Some(sent) = player.ping_sent.take() {
      player.latency_ms = (sent.elapsed().as_millis() / 2) as u64;
      tracing::debug!(username, latency_ms = player.latency_ms, "latency estimated");
    }
  }

  fn tick(&mut self) {
    self.ticks = self.ticks.wrapping_add(1);

    let mut full_sync = self.ensure_apples();
    full_sync |= self.perform_movement();

    if full_sync {
      self.players.sort_by(|a, b| b.score.cmp(&a.score));
      self.spectators.sort_by(|a, b| b.score.cmp(&a.score));
      self.synchronize_all();
    } else {
      self.dispatch_refresh();
    }

    if self.ticks % PING_INTERVAL_TICKS == 0 {
      self.ping_players();
    }
  }

  /// Keeps the world stocked with one apple. Covers the world-start apple
  /// and retries any replacement spawn that failed on a crowded board.
  /// Returns true when an apple was placed, so the tick resyncs clients.
  fn ensure_apples(&mut self) -> bool {
    if !self.apples.is_empty() {
      return false;
    }
    match find_apple_spawn(&self.players, &self.apples) {
      Ok(cell) => {
        tracing::debug!(x = cell.x, y = cell.y, "spawned apple");
        self.apples.push(cell);
        true
      }
      Err(err) => {
        tracing::error!(%err, "no free cell for apple");
        false
      }
    }
  }

  /// Advances every active worm one tick. Returns true when anything
  /// happened that the delta protocol cannot carry (apple eaten, death).
  fn perform_movement(&mut self) -> bool {
    let snapshots: Vec<MoveSnapshot> = self
      .players
      .iter()
      .filter(|player| player.state == Lifecycle::Active)
      .filter_map(|player| {
        let head = player.head()?;
        Some(MoveSnapshot {
          username: player.username.clone(),
          worm: player.worm.clone(),
          candidate: next_cell(head, player.direction),
        })
      })
      .collect();

    self.resolve_collisions(&snapshots);
    let mut full_sync = self.commit_moves(&snapshots);
    full_sync |= self.demote_game_overs();
    full_sync
  }

  fn resolve_collisions(&mut self, snapshots: &[MoveSnapshot]) {
    for snap in snapshots {
      if !self.is_active(&snap.username) {
        continue;
      }

      if snap.worm.contains(&snap.candidate) {
        if let Some(player) = self.player_mut(&snap.username) {
          player.suicide();
        }
        self.publish(&format!("Shame, {} is suicidal", snap.username));
        continue;
      }

      for other in snapshots.iter().filter(|other| other.username != snap.username) {
        if other.worm.contains(&snap.candidate) {
          self.resolve_kill(&other.username, &snap.username, snap.worm.len());
          break;
        }
        if other.candidate == snap.candidate {
          if snap.worm.len() > other.worm.len() {
            self.resolve_kill(&snap.username, &other.username, other.worm.len());
          } else if other.worm.len() > snap.worm.len() {
            self.resolve_kill(&other.username, &snap.username, snap.worm.len());
          } else {
            if let Some(player) = self.player_mut(&snap.username) {
              player.state = Lifecycle::GameOver;
            }
            if let Some(player) = self.player_mut(&other.username) {
              player.state = Lifecycle::GameOver;
            }
            self.publish(&format!(
              "{} and {} are equally strong and both perish",
              snap.username, other.username
            ));
          }
          break;
        }
      }
    }
  }

  fn resolve_kill(&mut self, killer: &str, victim: &str, victim_length: usize) {
    if let Some(player) = self.player_mut(killer) {
      player.credit_kill(victim_length);
    }
    if let Some(player) = self.player_mut(victim) {
      player.die();
    }
    self.publish(&format!("The bulky frame of {killer} destroys {victim}"));
  }

  /// Commits the move for every worm that survived collision resolution
  /// and handles apple pickups at the new head.
  fn commit_moves(&mut self, snapshots: &[MoveSnapshot]) -> bool {
    let mut full_sync = false;

    for snap in snapshots {
      if !self.is_active(&snap.username) {
        continue;
      }

      if let Some(player) = self.player_mut(&snap.username) {
        player.worm.push(snap.candidate);
        if player.is_growing() {
          player.growth_ticks -= 1;
        } else {
          player.worm.remove(0);
        }
      }

      let Some(apple) = self.apples.iter().position(|cell| *cell == snap.candidate) else {
        continue;
      };
      self.apples.remove(apple);
      if let Some(player) = self.player_mut(&snap.username) {
        player.eat();
      }
      self.publish(&format!("{} obtains an apple!", snap.username));
      match find_apple_spawn(&self.players, &self.apples) {
        Ok(cell) => self.apples.push(cell),
        Err(err) => tracing::error!(%err, "no free cell for replacement apple"),
      }
      full_sync = true;
    }

    full_sync
  }

  /// Moves every game-over player to the spectator set after sending its
  /// session report. Returns true when anyone was demoted.
  fn demote_game_overs(&mut self) -> bool {
    let mut demoted = false;
    let mut index = 0;
    while index < self.players.len() {
      if self.players[index].state != Lifecycle::GameOver {
        index += 1;
        continue;
      }
      let mut member = self.players.remove(index);
      let report = member.game_over_report();
      member.state = Lifecycle::Spectator;
      let _ = member.sender.send(ServerEvent::GameOver(report).payload());
      self.spectators.push(member);
      demoted = true;
    }
    demoted
  }

  fn build_sync_payload(&self) -> String {
    ServerEvent::Synchronize {
      players: self.players.iter().map(Player::record).collect(),
      spectators: self.spectators.iter().map(Player::record).collect(),
      apples_xy: self.apples.clone(),
    }
    .payload()
  }

  fn synchronize_all(&self) {
    let payload = self.build_sync_payload();
    for member in self.players.iter().chain(self.spectators.iter()) {
      let _ = member.sender.send(payload.clone());
    }
  }

  /// Sends the per-tick delta. Players get it staggered by their estimated
  /// one-way latency so fast and slow clients see movement near the same
  /// wall-clock moment; spectators get it immediately.
  fn dispatch_refresh(&self) {
    let entries: Vec<RefreshEntry> = self
      .players
      .iter()
      .filter(|player| player.state == Lifecycle::Active)
      .filter_map(|player| {
        let head = player.head()?;
        Some(RefreshEntry {
          n: player.username.clone(),
          x: head.x,
          y: head.y,
          wd: player.direction,
          g: player.is_growing(),
        })
      })
      .collect();
    let payload = ServerEvent::Refresh { p: entries }.payload();

    for player in &self.players {
      let delay = TICK_MS.saturating_sub(player.latency_ms);
      if delay == 0 {
        let _ = player.sender.send(payload.clone());
        continue;
      }
      let sender = player.sender.clone();
      let payload = payload.clone();
      tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(delay)).await;
        let _ = sender.send(payload);
      });
    }

    for spectator in &self.spectators {
      let _ = spectator.sender.send(payload.clone());
    }
  }

  /// At most one outstanding ping per player; a new ping simply replaces
  /// the previous timestamp.
  fn ping_players(&mut self) {
    let payload = ServerEvent::Ping.payload();
    for player in &mut self.players {
      player.ping_sent = Some(Instant::now());
      let _ = player.sender.send(payload.clone());
    }
  }

  fn publish(&self, text: &str) {
    tracing::info!("{text}");
    let payload = ServerEvent::Msg { text: text.to_string() }.payload();
    for session in self.sessions.values() {
      let _ = session.sender.send(payload.clone());
    }
  }
}
