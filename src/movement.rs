use std::collections::{HashSet, VecDeque};

use crate::constants::FOOTPRINT;
use crate::error::EngineError;
use crate::grid::Grid;
use crate::types::{Direction, GhostKind, Tile};

/// Whether an entity anchored at `tile` can advance one coarse tile in `dir`.
///
/// The whole destination footprint is checked: any fine wall cell or coarse
/// electric fence blocks the move. Columns that fall off the grid are passable
/// only on the tunnel row.
pub fn is_move_valid(grid: &Grid, tile: Tile, dir: Direction) -> bool {
    if dir == Direction::None {
        return false;
    }
    let dest = tile.step(dir);
    let on_tunnel = grid.tunnel_row() == Some(dest.row);
    let sub = grid.subdiv();
    for dr in 0..FOOTPRINT {
        let row = dest.row + dr;
        if row < 0 || row >= grid.rows() {
            return false;
        }
        for dc in 0..FOOTPRINT {
            let col = dest.col + dc;
            if col < 0 || col >= grid.cols() {
                if on_tunnel {
                    continue;
                }
                return false;
            }
            let cell = Tile::new(row, col);
            if grid.cell(cell).is_some_and(|kind| kind.blocks_ghost()) {
                return false;
            }
            if !grid.fine_block_is_free(row * sub, col * sub, sub) {
                return false;
            }
        }
    }
    true
}

pub fn valid_directions(grid: &Grid, tile: Tile, last: Direction) -> Vec<Direction> {
    let banned = last.reverse();
    Direction::PRIORITY
        .into_iter()
        .filter(|dir| *dir != banned || banned == Direction::None)
        .filter(|dir| is_move_valid(grid, tile, *dir))
        .collect()
}

pub fn is_intersection(grid: &Grid, tile: Tile, last: Direction) -> bool {
    valid_directions(grid, tile, last).len() > 1
}

/// Greedy one-step lookahead toward `target`. Ties keep the earlier direction
/// in [`Direction::PRIORITY`].
pub fn choose_direction(
    grid: &Grid,
    kind: GhostKind,
    from: Tile,
    target: Tile,
    last: Direction,
) -> Result<Direction, EngineError> {
    let mut best: Option<(f32, Direction)> = None;
    for dir in valid_directions(grid, from, last) {
        let distance = from.step(dir).euclidean(target);
        match best {
            Some((current, _)) if distance >= current => {}
            _ => best = Some((distance, dir)),
        }
    }
    best.map(|(_, dir)| dir)
        .ok_or(EngineError::NoLegalDirection {
            kind,
            tile: from,
            last,
        })
}

/// Anchor tiles an entity can reach from `start` under [`is_move_valid`].
pub fn reachable_tiles(grid: &Grid, start: Tile) -> Vec<Tile> {
    let mut seen = HashSet::new();
    let mut queue = VecDeque::new();
    let mut out = Vec::new();
    seen.insert(start);
    queue.push_back(start);

    while let Some(tile) = queue.pop_front() {
        out.push(tile);
        for dir in Direction::PRIORITY {
            if !is_move_valid(grid, tile, dir) {
                continue;
            }
            let next = grid.wrap(tile.step(dir));
            if seen.insert(next) {
                queue.push_back(next);
            }
        }
    }

    out.sort();
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn corridor_grid() -> Grid {
        Grid::from_layout(
            &[
                "######",
                "#    #",
                "#    #",
                "######",
            ],
            None,
        )
        .expect("grid")
    }

    #[test]
    fn walls_and_fences_block_the_footprint() {
        let grid = Grid::from_layout(
            &[
                "#######",
                "#     #",
                "#  -  #",
                "#     #",
                "#     #",
                "#######",
            ],
            None,
        )
        .expect("grid");
        assert!(is_move_valid(&grid, Tile::new(1, 1), Direction::Down));
        assert!(!is_move_valid(&grid, Tile::new(1, 1), Direction::Up));
        assert!(!is_move_valid(&grid, Tile::new(1, 1), Direction::Left));
        // fence at (2,3) sits inside the footprint one step right
        assert!(!is_move_valid(&grid, Tile::new(1, 1), Direction::Right));
        assert!(!is_move_valid(&grid, Tile::new(3, 4), Direction::Down));
        assert!(!is_move_valid(&grid, Tile::new(1, 1), Direction::None));
    }

    #[test]
    fn off_grid_columns_pass_on_tunnel_row_only() {
        let rows = ["      ", "      ", "######"];
        let tunnel = Grid::from_layout(&rows, Some(0)).expect("grid");
        let closed = Grid::from_layout(&rows, None).expect("grid");
        assert!(is_move_valid(&tunnel, Tile::new(0, 0), Direction::Left));
        assert!(is_move_valid(&tunnel, Tile::new(0, 4), Direction::Right));
        assert!(!is_move_valid(&closed, Tile::new(0, 0), Direction::Left));
        assert!(!is_move_valid(&tunnel, Tile::new(0, 0), Direction::Up));
    }

    #[test]
    fn intersection_matches_valid_non_reverse_count() {
        let grid = Grid::from_layout(
            &[
                "########",
                "#      #",
                "#      #",
                "#  ##  #",
                "#  ##  #",
                "#      #",
                "#      #",
                "########",
            ],
            None,
        )
        .expect("grid");
        for tile in reachable_tiles(&grid, Tile::new(1, 1)) {
            for last in Direction::PRIORITY.into_iter().chain([Direction::None]) {
                let count = Direction::PRIORITY
                    .into_iter()
                    .filter(|dir| last == Direction::None || *dir != last.reverse())
                    .filter(|dir| is_move_valid(&grid, tile, *dir))
                    .count();
                assert_eq!(is_intersection(&grid, tile, last), count > 1, "{tile} {last:?}");
            }
        }
    }

    #[test]
    fn selection_never_reverses_and_breaks_ties_by_priority() {
        let grid = Grid::from_layout(
            &[
                "#######",
                "#     #",
                "#     #",
                "#     #",
                "#     #",
                "#######",
            ],
            None,
        )
        .expect("grid");
        let center = Tile::new(2, 2);
        // target equidistant from the up and left neighbours
        let dir = choose_direction(&grid, GhostKind::Blinky, center, Tile::new(1, 1), Direction::None)
            .expect("direction");
        assert_eq!(dir, Direction::Up);
        let dir = choose_direction(&grid, GhostKind::Blinky, center, Tile::new(0, 2), Direction::Down)
            .expect("direction");
        assert_ne!(dir, Direction::Up);
        assert_eq!(dir, Direction::Left);
    }

    #[test]
    fn sole_exit_corridor_is_fatal() {
        let grid = corridor_grid();
        // at the east end of the corridor only the way back is open
        let err = choose_direction(&grid, GhostKind::Clyde, Tile::new(1, 3), Tile::new(1, 0), Direction::Right)
            .unwrap_err();
        assert!(matches!(
            err,
            EngineError::NoLegalDirection {
                kind: GhostKind::Clyde,
                tile,
                last: Direction::Right,
            } if tile == Tile::new(1, 3)
        ));
    }

    #[test]
    fn reachability_wraps_through_the_tunnel() {
        let grid = Grid::from_layout(
            &[
                "######",
                "      ",
                "      ",
                "######",
            ],
            Some(1),
        )
        .expect("grid");
        let tiles = reachable_tiles(&grid, Tile::new(1, 2));
        assert_eq!(tiles.len(), 6);
        assert!(tiles.contains(&Tile::new(1, 0)));
        assert!(tiles.contains(&Tile::new(1, 5)));
    }
}
