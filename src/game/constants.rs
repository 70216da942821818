pub const BLOCK_SIZE: i32 = 10;
pub const ARENA_WIDTH: i32 = 1000;
pub const ARENA_HEIGHT: i32 = 600;

// Walkable range, one block inset from the outer border.
pub const X_MIN: i32 = BLOCK_SIZE;
pub const X_MAX: i32 = ARENA_WIDTH - BLOCK_SIZE * 2;
pub const Y_MIN: i32 = BLOCK_SIZE;
pub const Y_MAX: i32 = ARENA_HEIGHT - BLOCK_SIZE * 2;

pub const TICK_MS: u64 = 45;
pub const WORM_GROWTH_TIME_MS: u64 = 500;
pub const GROWTH_TICKS: u32 = (WORM_GROWTH_TIME_MS / TICK_MS) as u32;
pub const PING_INTERVAL_MS: u64 = 5000;
pub const PING_INTERVAL_TICKS: u64 = PING_INTERVAL_MS / TICK_MS;

pub const MAX_PLAYERS: usize = 8;
pub const COLOR_RGB_THRESHOLD: u8 = 5;

pub const SCORE_PER_APPLE: i64 = 20;
pub const SCORE_LOSS_PER_DEATH: i64 = 20;
pub const SCORE_LOSS_PER_SUICIDE: i64 = 50;

pub const SPAWN_WORM_LENGTH: usize = 6;
pub const SPAWN_SCAN_INSET_BLOCKS: i32 = 6;
pub const SPAWN_FRONT_BLOCKS: i32 = 6;
pub const SPAWN_BACK_BLOCKS: i32 = 2;
pub const SPAWN_VERTICAL_BLOCKS: i32 = 1;
pub const SPAWN_MAX_MULTIPLIER: i32 = 3;
pub const APPLE_SPAWN_ATTEMPTS: usize = 10_000;
