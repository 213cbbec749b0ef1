use crate::constants::{CELL_SIZE, FOOTPRINT, PLAYER_SPEED, SPRITE_SIZE};
use crate::error::LevelError;
use crate::types::{PixelPos, Tile};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CellKind {
    Empty,
    Wall,
    Dot,
    Power,
    SpecialPoint,
    ElectricFence,
}

impl CellKind {
    pub fn from_symbol(symbol: char) -> Option<Self> {
        match symbol {
            '#' => Some(Self::Wall),
            '.' => Some(Self::Dot),
            'o' => Some(Self::Power),
            '*' => Some(Self::SpecialPoint),
            '-' => Some(Self::ElectricFence),
            ' ' => Some(Self::Empty),
            _ => None,
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "wall" => Some(Self::Wall),
            "dot" => Some(Self::Dot),
            "power" => Some(Self::Power),
            "spoint" => Some(Self::SpecialPoint),
            "elec" => Some(Self::ElectricFence),
            "void" | "null" => Some(Self::Empty),
            _ => None,
        }
    }

    pub fn symbol(self) -> char {
        match self {
            Self::Empty => ' ',
            Self::Wall => '#',
            Self::Dot => '.',
            Self::Power => 'o',
            Self::SpecialPoint => '*',
            Self::ElectricFence => '-',
        }
    }

    pub fn is_collectible(self) -> bool {
        matches!(self, Self::Dot | Self::Power)
    }

    pub fn blocks_ghost(self) -> bool {
        matches!(self, Self::Wall | Self::ElectricFence)
    }
}

/// Coarse cell matrix plus the derived fine matrix used for obstruction checks.
#[derive(Clone, Debug)]
pub struct Grid {
    rows: i32,
    cols: i32,
    cells: Vec<CellKind>,
    subdiv: i32,
    fine_walls: Vec<bool>,
    tunnel_row: Option<i32>,
    collectibles: usize,
}

impl Grid {
    pub fn new(cells: Vec<Vec<CellKind>>, tunnel_row: Option<i32>) -> Result<Self, LevelError> {
        Self::with_subdivision(cells, tunnel_row, (CELL_SIZE / PLAYER_SPEED) as i32)
    }

    pub fn with_subdivision(
        cells: Vec<Vec<CellKind>>,
        tunnel_row: Option<i32>,
        subdiv: i32,
    ) -> Result<Self, LevelError> {
        let rows = cells.len();
        let cols = cells.first().map(|row| row.len()).unwrap_or(0);
        if rows == 0 || cols == 0 {
            return Err(LevelError::Empty);
        }
        for (idx, row) in cells.iter().enumerate() {
            if row.len() != cols {
                return Err(LevelError::RaggedRows {
                    row: idx,
                    expected: cols,
                    found: row.len(),
                });
            }
        }
        if let Some(row) = tunnel_row {
            if row < 0 || row >= rows as i32 {
                return Err(LevelError::InvalidTunnelRow(row));
            }
        }

        let flat: Vec<CellKind> = cells.into_iter().flatten().collect();
        let collectibles = flat.iter().filter(|cell| cell.is_collectible()).count();
        let subdiv = subdiv.max(1);
        let fine_cols = cols as i32 * subdiv;
        let fine_rows = rows as i32 * subdiv;
        let mut fine_walls = vec![false; (fine_rows * fine_cols) as usize];
        for fr in 0..fine_rows {
            for fc in 0..fine_cols {
                let coarse = flat[((fr / subdiv) * cols as i32 + fc / subdiv) as usize];
                fine_walls[(fr * fine_cols + fc) as usize] = coarse == CellKind::Wall;
            }
        }

        Ok(Self {
            rows: rows as i32,
            cols: cols as i32,
            cells: flat,
            subdiv,
            fine_walls,
            tunnel_row,
            collectibles,
        })
    }

    /// Builds a grid from layout rows, mostly for tests and embedded levels.
    pub fn from_layout(rows: &[&str], tunnel_row: Option<i32>) -> Result<Self, LevelError> {
        let mut cells = Vec::with_capacity(rows.len());
        for (r, line) in rows.iter().enumerate() {
            let mut row = Vec::with_capacity(line.len());
            for (c, symbol) in line.chars().enumerate() {
                let cell = CellKind::from_symbol(symbol).ok_or_else(|| LevelError::UnknownCell {
                    symbol: symbol.to_string(),
                    row: r,
                    col: c,
                })?;
                row.push(cell);
            }
            cells.push(row);
        }
        Self::new(cells, tunnel_row)
    }

    pub fn rows(&self) -> i32 {
        self.rows
    }

    pub fn cols(&self) -> i32 {
        self.cols
    }

    pub fn subdiv(&self) -> i32 {
        self.subdiv
    }

    pub fn fine_rows(&self) -> i32 {
        self.rows * self.subdiv
    }

    pub fn fine_cols(&self) -> i32 {
        self.cols * self.subdiv
    }

    pub fn tunnel_row(&self) -> Option<i32> {
        self.tunnel_row
    }

    pub fn collectibles_left(&self) -> usize {
        self.collectibles
    }

    pub fn in_bounds(&self, tile: Tile) -> bool {
        tile.row >= 0 && tile.col >= 0 && tile.row < self.rows && tile.col < self.cols
    }

    pub fn cell(&self, tile: Tile) -> Option<CellKind> {
        if !self.in_bounds(tile) {
            return None;
        }
        Some(self.cells[(tile.row * self.cols + tile.col) as usize])
    }

    /// Collects the dot or power item at `tile`, if any. The only cell mutation.
    pub fn consume(&mut self, tile: Tile) -> Option<CellKind> {
        if !self.in_bounds(tile) {
            return None;
        }
        let idx = (tile.row * self.cols + tile.col) as usize;
        let cell = self.cells[idx];
        if !cell.is_collectible() {
            return None;
        }
        self.cells[idx] = CellKind::Empty;
        self.collectibles -= 1;
        Some(cell)
    }

    pub fn is_fine_wall(&self, fine_row: i32, fine_col: i32) -> bool {
        if fine_row < 0 || fine_col < 0 || fine_row >= self.fine_rows() || fine_col >= self.fine_cols() {
            return true;
        }
        self.fine_walls[(fine_row * self.fine_cols() + fine_col) as usize]
    }

    /// True when every fine cell of the `span × span` block at the given origin
    /// is inside the grid and not a wall.
    pub fn fine_block_is_free(&self, fine_row: i32, fine_col: i32, span: i32) -> bool {
        for dr in 0..span {
            for dc in 0..span {
                if self.is_fine_wall(fine_row + dr, fine_col + dc) {
                    return false;
                }
            }
        }
        true
    }

    /// Wraps the column on the tunnel row; other tiles are returned unchanged.
    pub fn wrap(&self, tile: Tile) -> Tile {
        if Some(tile.row) == self.tunnel_row {
            return Tile::new(tile.row, tile.col.rem_euclid(self.cols));
        }
        tile
    }

    pub fn tile_to_pixel(&self, tile: Tile) -> PixelPos {
        PixelPos {
            x: tile.col as f32 * CELL_SIZE,
            y: tile.row as f32 * CELL_SIZE,
        }
    }

    pub fn pixel_to_tile(&self, x: f32, y: f32) -> Tile {
        Tile::new((y / CELL_SIZE).floor() as i32, (x / CELL_SIZE).floor() as i32)
    }

    /// Offset of a sprite centred in the footprint of an entity.
    pub fn sprite_inset(&self) -> f32 {
        ((FOOTPRINT as f32 * CELL_SIZE - SPRITE_SIZE) / 2.0).floor()
    }

    pub fn tiles(&self) -> impl Iterator<Item = Tile> + '_ {
        (0..self.rows).flat_map(move |row| (0..self.cols).map(move |col| Tile::new(row, col)))
    }

    pub fn render_rows(&self) -> Vec<String> {
        (0..self.rows)
            .map(|row| {
                (0..self.cols)
                    .map(|col| self.cells[(row * self.cols + col) as usize].symbol())
                    .collect()
            })
            .collect()
    }
}
