use rand::RngCore;

use crate::error::EngineError;
use crate::grid::Grid;
use crate::interp::TileInterpolator;
use crate::movement::{choose_direction, is_intersection, is_move_valid};
use crate::targeting::{random_grid_tile, strategy_for, TargetContext, TargetStrategy};
use crate::types::{Direction, GhostKind, GhostMode, GhostView, Lifecycle, PixelPos, Tile};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(super) enum GhostLifecycle {
    Caged { release_at_ms: u64 },
    Released { released_at_ms: u64 },
}

/// Read-only view of the world a ghost moves through this frame.
pub(super) struct Surroundings<'a> {
    pub grid: &'a Grid,
    pub mode: GhostMode,
    pub player_tile: Tile,
    pub player_facing: Direction,
    pub blinky_tile: Tile,
    pub reachable: &'a [Tile],
}

pub(super) struct Ghost {
    pub kind: GhostKind,
    pub spawn: Tile,
    pub scatter_anchor: Tile,
    pub lifecycle: GhostLifecycle,
    pub respawn_delay_ms: u64,
    pub tile: Tile,
    pub next_tile: Option<Tile>,
    pub direction: Direction,
    pub target: Option<Tile>,
    pub scared: bool,
    pub retarget_pending: bool,
    pub pixel: PixelPos,
    /// Tile under the current pixel position.
    pub seen_tile: Option<Tile>,
    interp: TileInterpolator,
    strategy: Box<dyn TargetStrategy>,
}

impl Ghost {
    #[allow(clippy::too_many_arguments)]
    pub(super) fn new(
        kind: GhostKind,
        grid: &Grid,
        spawn: Tile,
        scatter_anchor: Tile,
        cage_delay_ms: u64,
        respawn_delay_ms: u64,
        lerp_step: f32,
        now_ms: u64,
    ) -> Self {
        Self {
            kind,
            spawn,
            scatter_anchor,
            lifecycle: GhostLifecycle::Caged {
                release_at_ms: now_ms.saturating_add(cage_delay_ms),
            },
            respawn_delay_ms,
            tile: spawn,
            next_tile: None,
            direction: Direction::None,
            target: None,
            scared: false,
            retarget_pending: false,
            pixel: grid.tile_to_pixel(spawn),
            seen_tile: None,
            interp: TileInterpolator::new(lerp_step),
            strategy: strategy_for(kind),
        }
    }

    pub(super) fn is_released(&self) -> bool {
        matches!(self.lifecycle, GhostLifecycle::Released { .. })
    }

    pub(super) fn released_at_ms(&self) -> Option<u64> {
        match self.lifecycle {
            GhostLifecycle::Released { released_at_ms } => Some(released_at_ms),
            GhostLifecycle::Caged { .. } => None,
        }
    }

    /// Leaves the cage once the deadline passes. Returns true on the frame it happens.
    pub(super) fn try_release(&mut self, grid: &Grid, den_exit: Tile, now_ms: u64) -> bool {
        let GhostLifecycle::Caged { release_at_ms } = self.lifecycle else {
            return false;
        };
        if now_ms < release_at_ms {
            return false;
        }
        self.lifecycle = GhostLifecycle::Released {
            released_at_ms: now_ms,
        };
        self.tile = den_exit;
        self.pixel = grid.tile_to_pixel(den_exit);
        self.next_tile = None;
        self.direction = Direction::None;
        self.target = None;
        self.interp.clear();
        true
    }

    /// Turns around mid-tile and picks a random target.
    pub(super) fn frighten(&mut self, grid: &Grid, rng: &mut dyn RngCore) {
        self.scared = true;
        self.direction = self.direction.reverse();
        if let Some(next) = self.next_tile {
            self.next_tile = Some(self.tile);
            self.tile = next;
            self.interp.reverse();
        }
        self.target = Some(random_grid_tile(grid, rng));
    }

    pub(super) fn calm(&mut self) {
        self.scared = false;
        self.retarget_pending = true;
    }

    /// Back to the cage at the spawn tile with the respawn delay.
    pub(super) fn send_home(&mut self, grid: &Grid, now_ms: u64) {
        self.lifecycle = GhostLifecycle::Caged {
            release_at_ms: now_ms.saturating_add(self.respawn_delay_ms),
        };
        self.tile = self.spawn;
        self.pixel = grid.tile_to_pixel(self.spawn);
        self.next_tile = None;
        self.direction = Direction::None;
        self.target = None;
        self.scared = false;
        self.retarget_pending = false;
        self.seen_tile = None;
        self.interp.clear();
    }

    pub(super) fn advance(
        &mut self,
        world: &Surroundings<'_>,
        rng: &mut dyn RngCore,
    ) -> Result<(), EngineError> {
        if !self.is_released() {
            return Ok(());
        }
        if self.next_tile.is_none() {
            self.plan(world, rng)?;
        }

        self.pixel = self.interp.advance();
        self.seen_tile = Some(world.grid.pixel_to_tile(self.pixel.x, self.pixel.y));

        if !self.interp.arrived() {
            return Ok(());
        }
        if let Some(next) = self.next_tile {
            self.tile = next;
        }
        self.pixel = world.grid.tile_to_pixel(self.tile);

        let straight_open = is_move_valid(world.grid, self.tile, self.direction);
        if self.scared
            || self.retarget_pending
            || !straight_open
            || is_intersection(world.grid, self.tile, self.direction)
        {
            self.plan(world, rng)
        } else {
            self.commit(world.grid, self.direction);
            Ok(())
        }
    }

    fn plan(&mut self, world: &Surroundings<'_>, rng: &mut dyn RngCore) -> Result<(), EngineError> {
        let mode = if self.scared {
            GhostMode::Scared
        } else {
            world.mode
        };
        let ctx = TargetContext {
            grid: world.grid,
            player_tile: world.player_tile,
            player_facing: world.player_facing,
            own_tile: self.seen_tile,
            blinky_tile: world.blinky_tile,
            reachable: world.reachable,
            scatter_anchor: self.scatter_anchor,
        };
        let target = self.strategy.determine_target(mode, &ctx, rng);
        self.target = Some(target);
        self.retarget_pending = false;

        let dir = choose_direction(world.grid, self.kind, self.tile, target, self.direction)?;
        self.commit(world.grid, dir);
        Ok(())
    }

    fn commit(&mut self, grid: &Grid, dir: Direction) {
        let raw = self.tile.step(dir);
        let next = grid.wrap(raw);
        // crossing the tunnel starts from the virtual tile just off the far edge
        let from = if next != raw {
            grid.tile_to_pixel(next.step(dir.reverse()))
        } else {
            grid.tile_to_pixel(self.tile)
        };
        self.direction = dir;
        self.next_tile = Some(next);
        self.interp.begin(from, grid.tile_to_pixel(next));
    }

    pub(super) fn view(&self) -> GhostView {
        GhostView {
            kind: self.kind,
            x: self.pixel.x,
            y: self.pixel.y,
            tile: self.tile,
            dir: self.direction,
            lifecycle: if self.is_released() {
                Lifecycle::Released
            } else {
                Lifecycle::Caged
            },
            scared: self.scared,
            target: self.target,
        }
    }
}
