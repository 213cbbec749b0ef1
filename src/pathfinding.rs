use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};

use crate::grid::Grid;
use crate::types::{Direction, Tile};

/// Whether a `block × block` footprint anchored at `tile` fits on free cells.
/// Electric fences do not block the planner.
pub fn footprint_fits(grid: &Grid, tile: Tile, block: i32) -> bool {
    if tile.row < 0 || tile.col < 0 || tile.row + block > grid.rows() || tile.col + block > grid.cols() {
        return false;
    }
    let sub = grid.subdiv();
    grid.fine_block_is_free(tile.row * sub, tile.col * sub, block * sub)
}

/// A* over coarse tiles with unit cost and a Manhattan heuristic.
///
/// Always returns a path that starts at `start`. When `target` cannot be
/// reached the path leads to the closest tile (by heuristic) that was seen.
pub fn find_path(grid: &Grid, start: Tile, target: Tile, block: i32) -> Vec<Tile> {
    let block = block.max(1);
    let mut open = BinaryHeap::new();
    let mut came_from: HashMap<Tile, Tile> = HashMap::new();
    let mut g_score: HashMap<Tile, i32> = HashMap::new();

    g_score.insert(start, 0);
    open.push(Reverse((start.manhattan(target), start.row, start.col)));
    let mut closest = start;
    let mut closest_distance = start.manhattan(target);

    while let Some(Reverse((f, row, col))) = open.pop() {
        let current = Tile::new(row, col);
        let current_g = g_score.get(&current).copied().unwrap_or(i32::MAX);
        if f > current_g.saturating_add(current.manhattan(target)) {
            continue;
        }
        if current == target {
            return rebuild(&came_from, start, current);
        }

        for dir in [Direction::Up, Direction::Down, Direction::Left, Direction::Right] {
            let neighbor = current.step(dir);
            if !footprint_fits(grid, neighbor, block) {
                continue;
            }
            let tentative = current_g + 1;
            if g_score.get(&neighbor).map_or(true, |known| tentative < *known) {
                came_from.insert(neighbor, current);
                g_score.insert(neighbor, tentative);
                open.push(Reverse((
                    tentative + neighbor.manhattan(target),
                    neighbor.row,
                    neighbor.col,
                )));
            }
            let distance = neighbor.manhattan(target);
            if distance < closest_distance {
                closest = neighbor;
                closest_distance = distance;
            }
        }
    }

    rebuild(&came_from, start, closest)
}

fn rebuild(came_from: &HashMap<Tile, Tile>, start: Tile, end: Tile) -> Vec<Tile> {
    let mut path = vec![end];
    let mut current = end;
    while current != start {
        match came_from.get(&current) {
            Some(prev) => {
                current = *prev;
                path.push(current);
            }
            None => break,
        }
    }
    path.reverse();
    if path.first() != Some(&start) {
        path.insert(0, start);
    }
    path
}

#[cfg(test)]
mod tests {
    use super::*;

    fn maze() -> Grid {
        Grid::from_layout(
            &[
                "##########",
                "#        #",
                "#        #",
                "#  ####  #",
                "#  ####  #",
                "#        #",
                "#        #",
                "##########",
            ],
            None,
        )
        .expect("grid")
    }

    fn assert_contiguous(path: &[Tile]) {
        for pair in path.windows(2) {
            assert_eq!(pair[0].manhattan(pair[1]), 1, "{} -> {}", pair[0], pair[1]);
        }
    }

    #[test]
    fn reachable_target_gives_shortest_contiguous_path() {
        let grid = maze();
        let start = Tile::new(1, 1);
        let target = Tile::new(5, 7);
        let path = find_path(&grid, start, target, 2);
        assert_eq!(path.first(), Some(&start));
        assert_eq!(path.last(), Some(&target));
        assert_eq!(path[1].manhattan(start), 1);
        assert_eq!(path.len() as i32 - 1, start.manhattan(target));
        assert_contiguous(&path);
        assert!(path.iter().all(|tile| footprint_fits(&grid, *tile, 2)));
    }

    #[test]
    fn unreachable_target_ends_at_closest_expanded_tile() {
        let grid = Grid::from_layout(
            &[
                "########",
                "#    # #",
                "#    # #",
                "#    # #",
                "########",
            ],
            None,
        )
        .expect("grid");
        let start = Tile::new(1, 1);
        let path = find_path(&grid, start, Tile::new(1, 6), 2);
        assert_eq!(path.first(), Some(&start));
        // (1,3) and (2,3) are both 3 away; (1,3) is seen first
        assert_eq!(path.last(), Some(&Tile::new(1, 3)));
        assert_contiguous(&path);
    }

    #[test]
    fn start_equal_to_target_is_a_single_tile() {
        let grid = maze();
        assert_eq!(find_path(&grid, Tile::new(1, 1), Tile::new(1, 1), 2), vec![Tile::new(1, 1)]);
    }

    #[test]
    fn fences_do_not_block_the_planner() {
        let grid = Grid::from_layout(
            &[
                "######",
                "#    #",
                "#    #",
                "#----#",
                "#    #",
                "#    #",
                "######",
            ],
            None,
        )
        .expect("grid");
        let path = find_path(&grid, Tile::new(1, 1), Tile::new(4, 1), 2);
        assert_eq!(path.last(), Some(&Tile::new(4, 1)));
    }
}
