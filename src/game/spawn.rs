use super::constants::{
  APPLE_SPAWN_ATTEMPTS, ARENA_HEIGHT, ARENA_WIDTH, BLOCK_SIZE, SPAWN_BACK_BLOCKS,
  SPAWN_FRONT_BLOCKS, SPAWN_MAX_MULTIPLIER, SPAWN_SCAN_INSET_BLOCKS, SPAWN_VERTICAL_BLOCKS,
  SPAWN_WORM_LENGTH, X_MAX, X_MIN, Y_MAX, Y_MIN,
};
use super::geometry::Cell;
use super::player::Player;
use rand::Rng;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SpawnError {
  #[error("no clearance for a new worm at any search window size")]
  NoWormClearance,
  #[error("no free cell for an apple after {0} attempts")]
  NoFreeAppleCell(usize),
}

/// Searches the playfield for a spot where a new worm fits, scanning rows
/// top-to-bottom and columns left-to-right on a 2-block raster. The
/// clearance window shrinks with the multiplier, so the first pass demands
/// generous room and the last pass takes whatever still fits.
///
/// Returns the worm cells tail first, head last, facing right.
pub fn find_worm_spawn(players: &[Player]) -> Result<Vec<Cell>, SpawnError> {
  let worm_span = (SPAWN_WORM_LENGTH as i32 - 1) * BLOCK_SIZE;
  for multiplier in (1..=SPAWN_MAX_MULTIPLIER).rev() {
    let front = multiplier * SPAWN_FRONT_BLOCKS * BLOCK_SIZE;
    let back = multiplier * SPAWN_BACK_BLOCKS * BLOCK_SIZE;
    let vertical = multiplier * SPAWN_VERTICAL_BLOCKS * BLOCK_SIZE;

    let mut y = SPAWN_SCAN_INSET_BLOCKS * BLOCK_SIZE;
    while y < ARENA_HEIGHT {
      let mut x = SPAWN_SCAN_INSET_BLOCKS * BLOCK_SIZE;
      while x < ARENA_WIDTH {
        if clearance_is_free(players, x, y, worm_span, front, back, vertical) {
          let worm = (0..SPAWN_WORM_LENGTH as i32)
            .map(|index| Cell::new(x + index * BLOCK_SIZE, y))
            .collect();
          return Ok(worm);
        }
        x += 2 * BLOCK_SIZE;
      }
      y += 2 * BLOCK_SIZE;
    }
  }

  Err(SpawnError::NoWormClearance)
}

/// True when no active worm occupies the rectangle spanning `back` behind
/// the tail cell through `front` past the head cell, `vertical` above and
/// below the spawn row.
fn clearance_is_free(
  players: &[Player],
  x: i32,
  y: i32,
  worm_span: i32,
  front: i32,
  back: i32,
  vertical: i32,
) -> bool {
  let mut cx = x - back;
  while cx <= x + worm_span + front {
    let mut cy = y - vertical;
    while cy <= y + vertical {
      let cell = Cell::new(cx, cy);
      if players.iter().any(|player| player.occupies(cell)) {
        return false;
      }
      cy += BLOCK_SIZE;
    }
    cx += BLOCK_SIZE;
  }
  true
}

/// Picks a uniformly random interior cell that holds neither a worm segment
/// nor an apple. Rejection sampling with a bounded budget: a near-full board
/// gives up loudly instead of spinning forever.
pub fn find_apple_spawn(players: &[Player], apples: &[Cell]) -> Result<Cell, SpawnError> {
  let mut rng = rand::thread_rng();
  for _ in 0..APPLE_SPAWN_ATTEMPTS {
    let x = rng.gen_range(X_MIN / BLOCK_SIZE..=X_MAX / BLOCK_SIZE) * BLOCK_SIZE;
    let y = rng.gen_range(Y_MIN / BLOCK_SIZE..=Y_MAX / BLOCK_SIZE) * BLOCK_SIZE;
    let cell = Cell::new(x, y);
    if players.iter().any(|player| player.occupies(cell)) {
      continue;
    }
    if apples.contains(&cell) {
      continue;
    }
    return Ok(cell);
  }
  Err(SpawnError::NoFreeAppleCell(APPLE_SPAWN_ATTEMPTS))
}
