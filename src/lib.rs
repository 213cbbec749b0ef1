pub mod audio;
pub mod autopilot;
pub mod constants;
pub mod engine;
pub mod error;
pub mod grid;
pub mod interp;
pub mod level;
pub mod modes;
pub mod movement;
pub mod pathfinding;
pub mod server_protocol;
pub mod server_utils;
pub mod targeting;
pub mod types;
