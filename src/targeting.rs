use rand::Rng;

use crate::constants::{AMBUSH_LOOK_AHEAD, DISTANCE_GATE, FLANK_LOOK_AHEAD};
use crate::grid::Grid;
use crate::types::{Direction, GhostKind, GhostMode, Tile};

/// What a ghost can see when it picks a target.
pub struct TargetContext<'a> {
    pub grid: &'a Grid,
    pub player_tile: Tile,
    pub player_facing: Direction,
    /// Last tile the ghost itself occupied, if it has moved yet.
    pub own_tile: Option<Tile>,
    /// Blinky's tile after its own update this frame.
    pub blinky_tile: Tile,
    pub reachable: &'a [Tile],
    pub scatter_anchor: Tile,
}

pub trait TargetStrategy: Send + Sync {
    fn kind(&self) -> GhostKind;

    fn chase_target(&self, ctx: &TargetContext<'_>, rng: &mut dyn rand::RngCore) -> Tile;

    fn determine_target(
        &self,
        mode: GhostMode,
        ctx: &TargetContext<'_>,
        rng: &mut dyn rand::RngCore,
    ) -> Tile {
        match mode {
            GhostMode::Scatter => ctx.scatter_anchor,
            GhostMode::Chase => self.chase_target(ctx, rng),
            GhostMode::Scared => random_grid_tile(ctx.grid, rng),
        }
    }
}

pub fn random_grid_tile(grid: &Grid, rng: &mut dyn rand::RngCore) -> Tile {
    Tile::new(
        rng.random_range(0..grid.rows()),
        rng.random_range(0..grid.cols()),
    )
}

/// Tile `look_ahead` steps along the player's facing. The horizontal axis wraps.
pub fn ahead_of_player(ctx: &TargetContext<'_>, look_ahead: i32) -> Tile {
    let ahead = ctx.player_tile.offset(ctx.player_facing, look_ahead);
    match ctx.player_facing {
        Direction::Left | Direction::Right => {
            Tile::new(ahead.row, ahead.col.rem_euclid(ctx.grid.cols()))
        }
        _ => ahead,
    }
}

pub struct Direct;
pub struct Ambush;
pub struct Flank;
pub struct DistanceGated;

impl TargetStrategy for Direct {
    fn kind(&self) -> GhostKind {
        GhostKind::Blinky
    }

    fn chase_target(&self, ctx: &TargetContext<'_>, _rng: &mut dyn rand::RngCore) -> Tile {
        ctx.player_tile
    }
}

impl TargetStrategy for Ambush {
    fn kind(&self) -> GhostKind {
        GhostKind::Pinky
    }

    fn chase_target(&self, ctx: &TargetContext<'_>, _rng: &mut dyn rand::RngCore) -> Tile {
        ahead_of_player(ctx, AMBUSH_LOOK_AHEAD)
    }
}

impl TargetStrategy for Flank {
    fn kind(&self) -> GhostKind {
        GhostKind::Inky
    }

    fn chase_target(&self, ctx: &TargetContext<'_>, _rng: &mut dyn rand::RngCore) -> Tile {
        let pivot = ahead_of_player(ctx, FLANK_LOOK_AHEAD);
        let blinky = ctx.blinky_tile;
        Tile::new(
            blinky.row + 2 * (pivot.row - blinky.row),
            blinky.col + 2 * (pivot.col - blinky.col),
        )
    }
}

impl TargetStrategy for DistanceGated {
    fn kind(&self) -> GhostKind {
        GhostKind::Clyde
    }

    fn chase_target(&self, ctx: &TargetContext<'_>, rng: &mut dyn rand::RngCore) -> Tile {
        let Some(own) = ctx.own_tile else {
            return ctx.player_tile;
        };
        if own.manhattan(ctx.player_tile) <= DISTANCE_GATE || ctx.reachable.is_empty() {
            return ctx.player_tile;
        }
        ctx.reachable[rng.random_range(0..ctx.reachable.len())]
    }
}

pub fn strategy_for(kind: GhostKind) -> Box<dyn TargetStrategy> {
    match kind {
        GhostKind::Blinky => Box::new(Direct),
        GhostKind::Pinky => Box::new(Ambush),
        GhostKind::Inky => Box::new(Flank),
        GhostKind::Clyde => Box::new(DistanceGated),
    }
}
