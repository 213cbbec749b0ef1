use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::EngineError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
    None,
}

impl Direction {
    /// Evaluation order for direction selection; earlier entries win ties.
    pub const PRIORITY: [Direction; 4] = [
        Direction::Up,
        Direction::Left,
        Direction::Down,
        Direction::Right,
    ];

    pub fn reverse(self) -> Self {
        match self {
            Self::Up => Self::Down,
            Self::Down => Self::Up,
            Self::Left => Self::Right,
            Self::Right => Self::Left,
            Self::None => Self::None,
        }
    }

    /// Row/column delta of one step.
    pub fn delta(self) -> (i32, i32) {
        match self {
            Self::Up => (-1, 0),
            Self::Down => (1, 0),
            Self::Left => (0, -1),
            Self::Right => (0, 1),
            Self::None => (0, 0),
        }
    }

    pub fn between(from: Tile, to: Tile) -> Self {
        match (to.row - from.row, to.col - from.col) {
            (-1, 0) => Self::Up,
            (1, 0) => Self::Down,
            (0, -1) => Self::Left,
            (0, 1) => Self::Right,
            _ => Self::None,
        }
    }
}

/// Coarse grid coordinate. Deserializes from a `[row, col]` pair.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "(i32, i32)")]
pub struct Tile {
    pub row: i32,
    pub col: i32,
}

impl Tile {
    pub const fn new(row: i32, col: i32) -> Self {
        Self { row, col }
    }

    pub fn step(self, dir: Direction) -> Self {
        self.offset(dir, 1)
    }

    pub fn offset(self, dir: Direction, amount: i32) -> Self {
        let (dr, dc) = dir.delta();
        Self {
            row: self.row + dr * amount,
            col: self.col + dc * amount,
        }
    }

    pub fn manhattan(self, other: Tile) -> i32 {
        (self.row - other.row).abs() + (self.col - other.col).abs()
    }

    pub fn euclidean(self, other: Tile) -> f32 {
        let dr = (self.row - other.row) as f32;
        let dc = (self.col - other.col) as f32;
        (dr * dr + dc * dc).sqrt()
    }
}

impl From<(i32, i32)> for Tile {
    fn from((row, col): (i32, i32)) -> Self {
        Self { row, col }
    }
}

impl fmt::Display for Tile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.row, self.col)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct PixelPos {
    pub x: f32,
    pub y: f32,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct PixelRect {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl PixelRect {
    pub fn intersects(&self, other: &PixelRect) -> bool {
        self.x < other.x + other.w
            && other.x < self.x + self.w
            && self.y < other.y + other.h
            && other.y < self.y + self.h
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GhostKind {
    Blinky,
    Pinky,
    Inky,
    Clyde,
}

impl GhostKind {
    /// Creation and update order.
    pub const ALL: [GhostKind; 4] = [
        GhostKind::Blinky,
        GhostKind::Pinky,
        GhostKind::Inky,
        GhostKind::Clyde,
    ];

    pub fn index(self) -> usize {
        match self {
            Self::Blinky => 0,
            Self::Pinky => 1,
            Self::Inky => 2,
            Self::Clyde => 3,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Blinky => "blinky",
            Self::Pinky => "pinky",
            Self::Inky => "inky",
            Self::Clyde => "clyde",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GhostMode {
    Scatter,
    Chase,
    Scared,
}

impl GhostMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Scatter => "scatter",
            Self::Chase => "chase",
            Self::Scared => "scared",
        }
    }
}

impl FromStr for GhostMode {
    type Err = EngineError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "scatter" => Ok(Self::Scatter),
            "chase" => Ok(Self::Chase),
            "scared" => Ok(Self::Scared),
            other => Err(EngineError::InvalidMode(other.to_string())),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Lifecycle {
    Caged,
    Released,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SoundCue {
    Dot,
    Power,
    EatGhost,
    Death,
}

impl SoundCue {
    pub fn name(self) -> &'static str {
        match self {
            Self::Dot => "dot",
            Self::Power => "power",
            Self::EatGhost => "eat_ghost",
            Self::Death => "death",
        }
    }
}

/// Player state supplied by the input collaborator each frame.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct PlayerInput {
    pub rect: PixelRect,
    pub facing: Direction,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PauseReason {
    PlayerDeath,
    LevelComplete,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum EngineStatus {
    Running,
    Paused {
        #[serde(rename = "untilMs")]
        until_ms: u64,
        reason: PauseReason,
    },
    LevelComplete,
    Halted,
}

#[derive(Clone, Debug, Serialize)]
pub struct GhostView {
    pub kind: GhostKind,
    pub x: f32,
    pub y: f32,
    pub tile: Tile,
    pub dir: Direction,
    pub lifecycle: Lifecycle,
    pub scared: bool,
    pub target: Option<Tile>,
}

#[derive(Clone, Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RuntimeEvent {
    DotEaten {
        tile: Tile,
    },
    PowerEaten {
        tile: Tile,
    },
    ModeChanged {
        mode: GhostMode,
    },
    PowerEnded,
    GhostReleased {
        kind: GhostKind,
    },
    GhostFrightened {
        kind: GhostKind,
    },
    GhostEaten {
        kind: GhostKind,
        points: i32,
    },
    PlayerDeath {
        by: GhostKind,
    },
    LevelComplete,
    GhostsReset,
}

#[derive(Clone, Debug, Serialize)]
pub struct Snapshot {
    pub tick: u64,
    #[serde(rename = "nowMs")]
    pub now_ms: u64,
    pub mode: GhostMode,
    #[serde(rename = "powerActive")]
    pub power_active: bool,
    pub status: EngineStatus,
    pub score: i32,
    #[serde(rename = "collectiblesLeft")]
    pub collectibles_left: usize,
    #[serde(rename = "playerDead")]
    pub player_dead: bool,
    #[serde(rename = "levelComplete")]
    pub level_complete: bool,
    pub ghosts: Vec<GhostView>,
    pub events: Vec<RuntimeEvent>,
}

/// Per-step outputs for the scoring collaborator.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct TickReport {
    #[serde(rename = "scoreDelta")]
    pub score_delta: i32,
    #[serde(rename = "playerDied")]
    pub player_died: bool,
    #[serde(rename = "levelComplete")]
    pub level_complete: bool,
    #[serde(rename = "ghostsEaten")]
    pub ghosts_eaten: u32,
}

#[derive(Clone, Debug, Serialize)]
pub struct LevelView {
    pub name: String,
    pub rows: i32,
    pub cols: i32,
    #[serde(rename = "cellSize")]
    pub cell_size: f32,
    pub tiles: Vec<String>,
    #[serde(rename = "tunnelRow")]
    pub tunnel_row: Option<i32>,
    #[serde(rename = "denExit")]
    pub den_exit: Tile,
}
