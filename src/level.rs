use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::constants::{default_release_delay_ms, DEFAULT_POWER_UP_MS};
use crate::error::LevelError;
use crate::grid::{CellKind, Grid};
use crate::types::{GhostKind, LevelView, Tile};

const BUILTIN_LEVEL: &str = include_str!("../levels/level1.json");

#[derive(Clone, Debug, Deserialize)]
struct LevelDocument {
    #[serde(default = "default_level_name")]
    name: String,
    #[serde(default)]
    layout: Option<Vec<String>>,
    #[serde(default)]
    matrix: Option<Vec<Vec<String>>>,
    #[serde(rename = "playerStart", alias = "pacman_start")]
    player_start: Tile,
    #[serde(rename = "ghostDen", alias = "ghost_den")]
    ghost_den: Tile,
    /// Falls back to the den tile when absent.
    #[serde(rename = "denExit", alias = "den_exit", default)]
    den_exit: Option<Tile>,
    #[serde(rename = "tunnelRow", alias = "tunnel_row", default)]
    tunnel_row: Option<i32>,
    #[serde(rename = "scatterTimes", alias = "scatter_times")]
    scatter_times: Vec<f32>,
    #[serde(rename = "powerUpMs", alias = "power_up_time", default = "default_power_up_ms")]
    power_up_ms: u64,
    #[serde(rename = "scatterTargets", default)]
    scatter_targets: BTreeMap<GhostKind, Tile>,
    #[serde(rename = "releaseDelaysMs", default)]
    release_delays_ms: BTreeMap<GhostKind, u64>,
}

fn default_level_name() -> String {
    "untitled".to_string()
}

fn default_power_up_ms() -> u64 {
    DEFAULT_POWER_UP_MS
}

/// Everything a level load hands to the engine.
#[derive(Clone, Debug)]
pub struct LevelConfig {
    pub name: String,
    pub cells: Vec<Vec<CellKind>>,
    pub player_start: Tile,
    pub ghost_den: Tile,
    pub den_exit: Tile,
    pub tunnel_row: Option<i32>,
    /// Alternating scatter/chase durations in milliseconds, scatter first.
    pub schedule_ms: Vec<u64>,
    pub power_up_ms: u64,
    pub scatter_targets: [Tile; 4],
    pub release_delays_ms: [u64; 4],
}

impl LevelConfig {
    pub fn rows(&self) -> usize {
        self.cells.len()
    }

    pub fn cols(&self) -> usize {
        self.cells.first().map(|row| row.len()).unwrap_or(0)
    }

    pub fn build_grid(&self) -> Result<Grid, LevelError> {
        Grid::new(self.cells.clone(), self.tunnel_row)
    }

    pub fn spawn_tile(&self, kind: GhostKind) -> Tile {
        Tile::new(self.ghost_den.row, self.ghost_den.col + kind.index() as i32)
    }

    pub fn scatter_target(&self, kind: GhostKind) -> Tile {
        self.scatter_targets[kind.index()]
    }

    pub fn release_delay_ms(&self, kind: GhostKind) -> u64 {
        self.release_delays_ms[kind.index()]
    }

    pub fn validate(&self) -> Result<(), LevelError> {
        let rows = self.rows();
        let cols = self.cols();
        if rows == 0 || cols == 0 {
            return Err(LevelError::Empty);
        }
        for (idx, row) in self.cells.iter().enumerate() {
            if row.len() != cols {
                return Err(LevelError::RaggedRows {
                    row: idx,
                    expected: cols,
                    found: row.len(),
                });
            }
        }
        if self.schedule_ms.is_empty() {
            return Err(LevelError::EmptySchedule);
        }

        let in_grid = |tile: Tile| {
            tile.row >= 0 && tile.col >= 0 && (tile.row as usize) < rows && (tile.col as usize) < cols
        };
        let mut named = vec![
            ("playerStart".to_string(), self.player_start),
            ("denExit".to_string(), self.den_exit),
        ];
        for kind in GhostKind::ALL {
            named.push((format!("{} spawn", kind.name()), self.spawn_tile(kind)));
        }
        for (what, tile) in named {
            if !in_grid(tile) {
                return Err(LevelError::TileOutOfGrid {
                    what,
                    tile,
                    rows,
                    cols,
                });
            }
        }

        if let Some(row) = self.tunnel_row {
            if row < 0 || row as usize >= rows {
                return Err(LevelError::InvalidTunnelRow(row));
            }
            let line = &self.cells[row as usize];
            if line[0].blocks_ghost() || line[cols - 1].blocks_ghost() {
                return Err(LevelError::InvalidTunnelRow(row));
            }
        }
        Ok(())
    }

    pub fn view(&self) -> LevelView {
        LevelView {
            name: self.name.clone(),
            rows: self.rows() as i32,
            cols: self.cols() as i32,
            cell_size: crate::constants::CELL_SIZE,
            tiles: self
                .cells
                .iter()
                .map(|row| row.iter().map(|cell| cell.symbol()).collect())
                .collect(),
            tunnel_row: self.tunnel_row,
            den_exit: self.den_exit,
        }
    }
}

pub fn builtin_level() -> Result<LevelConfig, LevelError> {
    parse_level(BUILTIN_LEVEL)
}

pub fn load_level(path: impl AsRef<Path>) -> Result<LevelConfig, LevelError> {
    let path = path.as_ref();
    let raw = fs::read_to_string(path).map_err(|source| LevelError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_level(&raw)
}

pub fn parse_level(raw: &str) -> Result<LevelConfig, LevelError> {
    let doc: LevelDocument = serde_json::from_str(raw)?;
    let cells = match (&doc.layout, &doc.matrix) {
        (Some(layout), None) => parse_layout(layout)?,
        (None, Some(matrix)) => parse_matrix(matrix)?,
        _ => return Err(LevelError::AmbiguousCells),
    };

    let rows = cells.len() as i32;
    let cols = cells.first().map(|row| row.len()).unwrap_or(0) as i32;
    let corners = [
        Tile::new(0, cols - 1),
        Tile::new(0, 0),
        Tile::new(rows - 1, 0),
        Tile::new(rows - 1, cols - 1),
    ];
    let mut scatter_targets = corners;
    let mut release_delays_ms = GhostKind::ALL.map(default_release_delay_ms);
    for kind in GhostKind::ALL {
        if let Some(tile) = doc.scatter_targets.get(&kind) {
            scatter_targets[kind.index()] = *tile;
        }
        if let Some(delay) = doc.release_delays_ms.get(&kind) {
            release_delays_ms[kind.index()] = *delay;
        }
    }

    let level = LevelConfig {
        name: doc.name,
        cells,
        player_start: doc.player_start,
        ghost_den: doc.ghost_den,
        den_exit: doc.den_exit.unwrap_or(doc.ghost_den),
        tunnel_row: doc.tunnel_row,
        schedule_ms: doc
            .scatter_times
            .iter()
            .map(|secs| (secs.max(0.0) * 1000.0).round() as u64)
            .collect(),
        power_up_ms: doc.power_up_ms,
        scatter_targets,
        release_delays_ms,
    };
    level.validate()?;
    Ok(level)
}

fn parse_layout(layout: &[String]) -> Result<Vec<Vec<CellKind>>, LevelError> {
    let mut out = Vec::with_capacity(layout.len());
    for (row, line) in layout.iter().enumerate() {
        let mut cells = Vec::with_capacity(line.len());
        for (col, symbol) in line.chars().enumerate() {
            let cell = CellKind::from_symbol(symbol).ok_or_else(|| LevelError::UnknownCell {
                symbol: symbol.to_string(),
                row,
                col,
            })?;
            cells.push(cell);
        }
        out.push(cells);
    }
    Ok(out)
}

fn parse_matrix(matrix: &[Vec<String>]) -> Result<Vec<Vec<CellKind>>, LevelError> {
    let mut out = Vec::with_capacity(matrix.len());
    for (row, names) in matrix.iter().enumerate() {
        let mut cells = Vec::with_capacity(names.len());
        for (col, name) in names.iter().enumerate() {
            let cell = CellKind::from_name(name).ok_or_else(|| LevelError::UnknownCell {
                symbol: name.clone(),
                row,
                col,
            })?;
            cells.push(cell);
        }
        out.push(cells);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc_with(cells: &str, extra: &str) -> String {
        format!(
            r#"{{"name":"t",{cells},"playerStart":[1,1],"ghostDen":[1,0],"denExit":[0,0],"scatterTimes":[7,20]{extra}}}"#
        )
    }

    #[test]
    fn builtin_level_loads_and_validates() {
        let level = builtin_level().expect("builtin level");
        assert_eq!(level.rows(), 34);
        assert_eq!(level.cols(), 28);
        assert_eq!(level.tunnel_row, Some(18));
        assert_eq!(level.schedule_ms, vec![7_000, 20_000, 7_000, 20_000, 5_000]);
        assert_eq!(level.release_delay_ms(GhostKind::Clyde), 16_000);
        assert_eq!(level.scatter_target(GhostKind::Blinky), Tile::new(0, 27));
        assert_eq!(level.scatter_target(GhostKind::Pinky), Tile::new(0, 0));
        assert_eq!(level.scatter_target(GhostKind::Inky), Tile::new(33, 0));
        assert_eq!(level.scatter_target(GhostKind::Clyde), Tile::new(33, 27));
        let grid = level.build_grid().expect("grid");
        assert!(grid.collectibles_left() > 200);
    }

    #[test]
    fn matrix_and_layout_forms_agree() {
        let from_layout = parse_level(&doc_with(r##""layout":["#.  ","o-  "]"##, "")).expect("layout");
        let from_matrix = parse_level(&doc_with(
            r#""matrix":[["wall","dot","void","null"],["power","elec","void","void"]]"#,
            "",
        ))
        .expect("matrix");
        assert_eq!(from_layout.cells, from_matrix.cells);
    }

    #[test]
    fn overrides_replace_defaults() {
        let level = parse_level(&doc_with(
            r#""layout":["    ","    "]"#,
            r#","scatterTargets":{"pinky":[1,2]},"releaseDelaysMs":{"blinky":0},"powerUpMs":900"#,
        ))
        .expect("level");
        assert_eq!(level.scatter_target(GhostKind::Pinky), Tile::new(1, 2));
        assert_eq!(level.scatter_target(GhostKind::Blinky), Tile::new(0, 3));
        assert_eq!(level.scatter_target(GhostKind::Inky), Tile::new(1, 0));
        assert_eq!(level.scatter_target(GhostKind::Clyde), Tile::new(1, 3));
        assert_eq!(level.release_delay_ms(GhostKind::Blinky), 0);
        assert_eq!(level.release_delay_ms(GhostKind::Pinky), 8_000);
        assert_eq!(level.power_up_ms, 900);
    }

    #[test]
    fn snake_case_matrix_documents_load() {
        let doc = serde_json::json!({
            "num_rows": 2,
            "num_cols": 4,
            "matrix": [["wall", "dot", "void", "null"], ["power", "void", "void", "void"]],
            "pacman_start": [1, 2],
            "ghost_den": [1, 0],
            "elec": [[0, 3]],
            "scatter_times": [7, 20],
            "power_up_time": 6000
        });
        let level = parse_level(&doc.to_string()).expect("level");
        assert_eq!(level.name, "untitled");
        assert_eq!(level.player_start, Tile::new(1, 2));
        assert_eq!(level.ghost_den, Tile::new(1, 0));
        assert_eq!(level.den_exit, Tile::new(1, 0));
        assert_eq!(level.tunnel_row, None);
        assert_eq!(level.schedule_ms, vec![7_000, 20_000]);
        assert_eq!(level.power_up_ms, 6_000);
    }

    #[test]
    fn invalid_documents_are_rejected() {
        let unknown = parse_level(&doc_with(r##""layout":["#x  ","    "]"##, "")).unwrap_err();
        assert!(matches!(unknown, LevelError::UnknownCell { row: 0, col: 1, .. }));

        let ragged = parse_level(&doc_with(r#""layout":["    ","  "]"#, "")).unwrap_err();
        assert!(matches!(ragged, LevelError::RaggedRows { .. }));

        let outside = parse_level(&doc_with(r#""layout":["  ","  "]"#, "")).unwrap_err();
        assert!(matches!(outside, LevelError::TileOutOfGrid { .. }));

        let schedule = parse_level(
            r#"{"name":"t","layout":["    ","    "],"playerStart":[1,1],"ghostDen":[1,0],"denExit":[0,0],"scatterTimes":[]}"#,
        )
        .unwrap_err();
        assert!(matches!(schedule, LevelError::EmptySchedule));

        let tunnel = parse_level(&doc_with(r##""layout":["    ","#   "]"##, r#","tunnelRow":1"#)).unwrap_err();
        assert!(matches!(tunnel, LevelError::InvalidTunnelRow(1)));

        let neither = parse_level(&doc_with(r#""other":1"#, "")).unwrap_err();
        assert!(matches!(neither, LevelError::AmbiguousCells));

        assert!(matches!(parse_level("{").unwrap_err(), LevelError::Json(_)));
    }

    #[test]
    fn missing_file_reports_path() {
        let err = load_level("/definitely/not/here.json").unwrap_err();
        assert!(err.to_string().contains("/definitely/not/here.json"));
    }
}
