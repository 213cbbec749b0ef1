use crate::constants::FOOTPRINT;
use crate::grid::Grid;
use crate::types::Tile;

/// Parses a `row,col` query value.
pub fn parse_tile_query(raw: Option<&str>) -> Option<Tile> {
    let (row, col) = raw?.split_once(',')?;
    let row = row.trim().parse::<i32>().ok()?;
    let col = col.trim().parse::<i32>().ok()?;
    Some(Tile::new(row, col))
}

pub fn normalize_block(raw: Option<&str>) -> i32 {
    raw.and_then(|value| value.trim().parse::<i32>().ok())
        .unwrap_or(FOOTPRINT)
        .clamp(1, 4)
}

pub fn tile_in_grid(grid: &Grid, tile: Option<Tile>) -> Option<Tile> {
    tile.filter(|tile| grid.in_bounds(*tile))
}

pub fn parse_port(raw: Option<&str>) -> u16 {
    raw.and_then(|value| value.parse::<u16>().ok())
        .unwrap_or(8080)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tile_query_parsing_is_strict_about_shape() {
        assert_eq!(parse_tile_query(Some("3,4")), Some(Tile::new(3, 4)));
        assert_eq!(parse_tile_query(Some(" 12 , 0 ")), Some(Tile::new(12, 0)));
        assert_eq!(parse_tile_query(Some("3;4")), None);
        assert_eq!(parse_tile_query(Some("a,4")), None);
        assert_eq!(parse_tile_query(Some("3,4,5")), None);
        assert_eq!(parse_tile_query(None), None);
    }

    #[test]
    fn block_defaults_to_footprint_and_clamps() {
        assert_eq!(normalize_block(None), FOOTPRINT);
        assert_eq!(normalize_block(Some("1")), 1);
        assert_eq!(normalize_block(Some("0")), 1);
        assert_eq!(normalize_block(Some("99")), 4);
        assert_eq!(normalize_block(Some("big")), FOOTPRINT);
    }

    #[test]
    fn tiles_outside_the_grid_are_dropped() {
        let grid = Grid::from_layout(&["   ", "   "], None).expect("grid");
        assert_eq!(tile_in_grid(&grid, Some(Tile::new(1, 2))), Some(Tile::new(1, 2)));
        assert_eq!(tile_in_grid(&grid, Some(Tile::new(2, 0))), None);
        assert_eq!(tile_in_grid(&grid, None), None);
    }

    #[test]
    fn port_falls_back_to_default() {
        assert_eq!(parse_port(Some("9000")), 9000);
        assert_eq!(parse_port(Some("-1")), 8080);
        assert_eq!(parse_port(None), 8080);
    }
}
