pub mod arena;
pub mod constants;
pub mod geometry;
pub mod player;
pub mod spawn;
