use crate::constants::SPRITE_SIZE;
use crate::grid::Grid;
use crate::types::{PixelPos, PixelRect, PlayerInput, Tile};

/// Half-size box at the player's rect origin.
pub(super) fn player_box(player: &PlayerInput) -> PixelRect {
    PixelRect {
        x: player.rect.x,
        y: player.rect.y,
        w: (player.rect.w / 2.0).floor(),
        h: (player.rect.h / 2.0).floor(),
    }
}

/// Half-sprite box at the sprite origin, centred in the ghost's footprint.
pub(super) fn ghost_box(grid: &Grid, pixel: PixelPos) -> PixelRect {
    let inset = grid.sprite_inset();
    let half = (SPRITE_SIZE / 2.0).floor();
    PixelRect {
        x: pixel.x + inset,
        y: pixel.y + inset,
        w: half,
        h: half,
    }
}

pub(super) fn player_tile(grid: &Grid, player: &PlayerInput) -> Tile {
    grid.pixel_to_tile(player.rect.x, player.rect.y)
}

/// Sprite rect for an entity whose footprint starts at `pixel`.
pub fn sprite_rect_at(grid: &Grid, pixel: PixelPos) -> PixelRect {
    let inset = grid.sprite_inset();
    PixelRect {
        x: pixel.x + inset,
        y: pixel.y + inset,
        w: SPRITE_SIZE,
        h: SPRITE_SIZE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Direction;

    #[test]
    fn boxes_line_up_for_aligned_entities() {
        let grid = Grid::from_layout(&["    ", "    "], None).expect("grid");
        let pixel = grid.tile_to_pixel(Tile::new(0, 1));
        let player = PlayerInput {
            rect: sprite_rect_at(&grid, pixel),
            facing: Direction::Right,
        };
        assert_eq!(player_box(&player), ghost_box(&grid, pixel));
        assert_eq!(player_tile(&grid, &player), Tile::new(0, 1));
        assert_eq!(ghost_box(&grid, pixel).x, 24.0);
        assert_eq!(ghost_box(&grid, pixel).w, 16.0);
    }
}
