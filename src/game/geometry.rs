use super::constants::{BLOCK_SIZE, X_MAX, X_MIN, Y_MAX, Y_MIN};
use serde::{Deserialize, Serialize};

/// One grid cell. Both coordinates are always multiples of `BLOCK_SIZE`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Cell {
  pub x: i32,
  pub y: i32,
}

impl Cell {
  pub fn new(x: i32, y: i32) -> Self {
    Self { x, y }
  }

  pub fn is_block_aligned(&self) -> bool {
    self.x % BLOCK_SIZE == 0 && self.y % BLOCK_SIZE == 0
  }
}

/// Worm heading. The wire representation is the browser key code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Direction {
  Left,
  Up,
  Right,
  Down,
}

impl From<Direction> for u8 {
  fn from(direction: Direction) -> u8 {
    match direction {
      Direction::Left => 37,
      Direction::Up => 38,
      Direction::Right => 39,
      Direction::Down => 40,
    }
  }
}

impl TryFrom<u8> for Direction {
  type Error = String;

  fn try_from(code: u8) -> Result<Self, Self::Error> {
    match code {
      37 => Ok(Direction::Left),
      38 => Ok(Direction::Up),
      39 => Ok(Direction::Right),
      40 => Ok(Direction::Down),
      other => Err(format!("unknown direction code {other}")),
    }
  }
}

/// One-block step from `head`. The walkable rectangle is a torus: stepping
/// past an edge re-enters from the opposite one.
pub fn next_cell(head: Cell, direction: Direction) -> Cell {
  match direction {
    Direction::Left => {
      if head.x == X_MIN {
        Cell::new(X_MAX, head.y)
      } else {
        Cell::new(head.x - BLOCK_SIZE, head.y)
      }
    }
    Direction::Up => {
      if head.y == Y_MIN {
        Cell::new(head.x, Y_MAX)
      } else {
        Cell::new(head.x, head.y - BLOCK_SIZE)
      }
    }
    Direction::Right => {
      if head.x == X_MAX {
        Cell::new(X_MIN, head.y)
      } else {
        Cell::new(head.x + BLOCK_SIZE, head.y)
      }
    }
    Direction::Down => {
      if head.y == Y_MAX {
        Cell::new(head.x, Y_MIN)
      } else {
        Cell::new(head.x, head.y + BLOCK_SIZE)
      }
    }
  }
}
