use std::path::PathBuf;

use thiserror::Error;

use crate::types::{Direction, GhostKind, Tile};

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("{kind:?} has no legal direction at {tile} (came from {last:?})")]
    NoLegalDirection {
        kind: GhostKind,
        tile: Tile,
        last: Direction,
    },
    #[error("invalid ghost mode: {0:?}")]
    InvalidMode(String),
    #[error("engine halted: {0}")]
    Halted(String),
}

#[derive(Debug, Error)]
pub enum LevelError {
    #[error("failed to read level {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed level document: {0}")]
    Json(#[from] serde_json::Error),
    #[error("unknown cell {symbol:?} at row {row}, col {col}")]
    UnknownCell { symbol: String, row: usize, col: usize },
    #[error("row {row} has {found} cells, expected {expected}")]
    RaggedRows {
        row: usize,
        expected: usize,
        found: usize,
    },
    #[error("level has no cells")]
    Empty,
    #[error("level defines both layout and matrix, or neither")]
    AmbiguousCells,
    #[error("{what} tile {tile} is outside the {rows}x{cols} grid")]
    TileOutOfGrid {
        what: String,
        tile: Tile,
        rows: usize,
        cols: usize,
    },
    #[error("scatter schedule is empty")]
    EmptySchedule,
    #[error("tunnel row {0} is outside the grid or not open at both edges")]
    InvalidTunnelRow(i32),
}
