use std::collections::{HashSet, VecDeque};

use crate::constants::{CELL_SIZE, FOOTPRINT};
use crate::engine::sprite_rect_at;
use crate::grid::Grid;
use crate::pathfinding::find_path;
use crate::types::{Direction, PixelPos, PlayerInput, Tile};

/// Scripted player: walks the fine grid toward the nearest remaining collectible.
#[derive(Clone, Debug)]
pub struct Autopilot {
    start: Tile,
    fine_row: i32,
    fine_col: i32,
    facing: Direction,
    path: VecDeque<Tile>,
    target: Option<Tile>,
    given_up: HashSet<Tile>,
}

impl Autopilot {
    pub fn new(grid: &Grid, start: Tile) -> Self {
        Self {
            start,
            fine_row: start.row * grid.subdiv(),
            fine_col: start.col * grid.subdiv(),
            facing: Direction::None,
            path: VecDeque::new(),
            target: None,
            given_up: HashSet::new(),
        }
    }

    /// Back to the start tile, e.g. after a death.
    pub fn reset(&mut self, grid: &Grid) {
        let given_up = std::mem::take(&mut self.given_up);
        *self = Self::new(grid, self.start);
        self.given_up = given_up;
    }

    pub fn target(&self) -> Option<Tile> {
        self.target
    }

    pub fn pixel(&self, grid: &Grid) -> PixelPos {
        let step = CELL_SIZE / grid.subdiv() as f32;
        PixelPos {
            x: self.fine_col as f32 * step,
            y: self.fine_row as f32 * step,
        }
    }

    /// Coarse tile when the player sits exactly on one.
    pub fn anchor(&self, grid: &Grid) -> Option<Tile> {
        let sub = grid.subdiv();
        if self.fine_row % sub != 0 || self.fine_col % sub != 0 {
            return None;
        }
        Some(Tile::new(self.fine_row / sub, self.fine_col / sub))
    }

    pub fn input(&self, grid: &Grid) -> PlayerInput {
        PlayerInput {
            rect: sprite_rect_at(grid, self.pixel(grid)),
            facing: self.facing,
        }
    }

    pub fn tick(&mut self, grid: &Grid) -> PlayerInput {
        if let Some(tile) = self.anchor(grid) {
            self.steer(grid, tile);
        }
        if self.facing != Direction::None {
            let (dr, dc) = self.facing.delta();
            let span = FOOTPRINT * grid.subdiv();
            if grid.fine_block_is_free(self.fine_row + dr, self.fine_col + dc, span) {
                self.fine_row += dr;
                self.fine_col += dc;
            } else {
                self.path.clear();
            }
        }
        self.input(grid)
    }

    fn steer(&mut self, grid: &Grid, tile: Tile) {
        while self.path.front() == Some(&tile) {
            self.path.pop_front();
        }
        let target_gone = self
            .target
            .map_or(true, |target| grid.cell(target).map_or(true, |cell| !cell.is_collectible()));
        if self.path.is_empty() || target_gone {
            self.replan(grid, tile);
        }
        self.facing = match self.path.front() {
            Some(next) => Direction::between(tile, *next),
            None => self.facing,
        };
        if self.path.is_empty() {
            self.facing = Direction::None;
        }
    }

    fn replan(&mut self, grid: &Grid, tile: Tile) {
        self.path.clear();
        self.target = None;
        loop {
            let Some(target) = self.nearest_collectible(grid, tile) else {
                return;
            };
            let path = find_path(grid, tile, target, FOOTPRINT);
            if path.last() == Some(&target) {
                self.target = Some(target);
                self.path = path.into_iter().skip(1).collect();
                return;
            }
            self.given_up.insert(target);
        }
    }

    fn nearest_collectible(&self, grid: &Grid, from: Tile) -> Option<Tile> {
        grid.tiles()
            .filter(|tile| grid.cell(*tile).is_some_and(|cell| cell.is_collectible()))
            .filter(|tile| !self.given_up.contains(tile))
            .min_by_key(|tile| (tile.manhattan(from), tile.row, tile.col))
    }
}
