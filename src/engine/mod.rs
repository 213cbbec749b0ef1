use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{debug, info, warn};

use crate::audio::AudioSink;
use crate::constants::{
    DEATH_PAUSE_MS, DOT_POINT, GHOST_LERP_STEP, GHOST_POINT, LEVEL_COMPLETE_PAUSE_MS,
    LEVEL_COMPLETE_POINT, POWER_POINT, RESPAWN_CAGE_MS,
};
use crate::error::{EngineError, LevelError};
use crate::grid::{CellKind, Grid};
use crate::level::LevelConfig;
use crate::modes::{ModeChange, ModeController};
use crate::movement::reachable_tiles;
use crate::types::{
    EngineStatus, GhostKind, GhostMode, GhostView, PauseReason, PlayerInput, RuntimeEvent,
    Snapshot, SoundCue, Tile, TickReport,
};

pub mod audit;
mod collision;
mod ghost;
mod utils;

use self::ghost::{Ghost, Surroundings};
use self::utils::{ghost_box, player_box, player_tile};

pub use self::utils::sprite_rect_at;

#[derive(Clone, Debug)]
pub struct EngineConfig {
    pub seed: u64,
    pub lerp_step: f32,
    pub death_pause_ms: u64,
    pub level_complete_pause_ms: u64,
    pub respawn_delay_ms: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            seed: 0,
            lerp_step: GHOST_LERP_STEP,
            death_pause_ms: DEATH_PAUSE_MS,
            level_complete_pause_ms: LEVEL_COMPLETE_PAUSE_MS,
            respawn_delay_ms: RESPAWN_CAGE_MS,
        }
    }
}

pub struct GameEngine {
    pub config: EngineConfig,
    pub level: LevelConfig,

    grid: Grid,
    rng: StdRng,
    modes: ModeController,
    ghosts: Vec<Ghost>,
    reachable: Vec<Tile>,
    blinky_tile: Tile,
    events: Vec<RuntimeEvent>,

    status: EngineStatus,
    halt_reason: Option<String>,
    score: i32,
    player_dead: bool,
    level_complete: bool,
    elapsed_ms: u64,
    tick_counter: u64,
}

impl GameEngine {
    pub fn new(level: LevelConfig, config: EngineConfig) -> Result<Self, LevelError> {
        level.validate()?;
        let grid = level.build_grid()?;
        let reachable = reachable_tiles(&grid, level.den_exit);
        let modes = ModeController::new(level.schedule_ms.clone(), 0);
        let mut engine = Self {
            rng: StdRng::seed_from_u64(config.seed),
            blinky_tile: level.den_exit,
            config,
            level,
            grid,
            modes,
            ghosts: Vec::new(),
            reachable,
            events: Vec::new(),
            status: EngineStatus::Running,
            halt_reason: None,
            score: 0,
            player_dead: false,
            level_complete: false,
            elapsed_ms: 0,
            tick_counter: 0,
        };
        engine.rebuild_ghosts(0);
        info!(
            level = %engine.level.name,
            rows = engine.grid.rows(),
            cols = engine.grid.cols(),
            collectibles = engine.grid.collectibles_left(),
            reachable = engine.reachable.len(),
            "engine ready"
        );
        Ok(engine)
    }

    /// Starts the level over: fresh grid, ghosts, timers and score.
    pub fn restart(&mut self) -> Result<(), LevelError> {
        self.grid = self.level.build_grid()?;
        self.modes = ModeController::new(self.level.schedule_ms.clone(), 0);
        self.blinky_tile = self.level.den_exit;
        self.status = EngineStatus::Running;
        self.halt_reason = None;
        self.score = 0;
        self.player_dead = false;
        self.level_complete = false;
        self.elapsed_ms = 0;
        self.tick_counter = 0;
        self.events.clear();
        self.rebuild_ghosts(0);
        info!(level = %self.level.name, "engine restarted");
        Ok(())
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn status(&self) -> EngineStatus {
        self.status
    }

    pub fn is_paused(&self) -> bool {
        matches!(self.status, EngineStatus::Paused { .. })
    }

    pub fn is_finished(&self) -> bool {
        matches!(self.status, EngineStatus::LevelComplete | EngineStatus::Halted)
    }

    pub fn score(&self) -> i32 {
        self.score
    }

    pub fn now_ms(&self) -> u64 {
        self.elapsed_ms
    }

    pub fn mode(&self) -> GhostMode {
        self.modes.current()
    }

    pub fn ghost_views(&self) -> Vec<GhostView> {
        self.ghosts.iter().map(|ghost| ghost.view()).collect()
    }

    /// Applies a mode request from outside the schedule. `scared` starts a power-up.
    pub fn force_mode(&mut self, mode: GhostMode) {
        match mode {
            GhostMode::Scared => {
                self.modes.trigger_power(self.elapsed_ms, self.level.power_up_ms);
                self.events.push(RuntimeEvent::ModeChanged { mode });
            }
            GhostMode::Scatter | GhostMode::Chase => {
                if let Some(change) = self.modes.pin(mode) {
                    self.apply_mode_change(change);
                }
            }
        }
    }

    pub fn step(
        &mut self,
        dt_ms: u64,
        player: &PlayerInput,
        audio: &mut dyn AudioSink,
    ) -> Result<TickReport, EngineError> {
        if let Some(reason) = &self.halt_reason {
            return Err(EngineError::Halted(reason.clone()));
        }
        let mut report = TickReport::default();
        if self.status == EngineStatus::LevelComplete {
            return Ok(report);
        }

        self.tick_counter += 1;
        self.elapsed_ms = self.elapsed_ms.saturating_add(dt_ms);
        let now_ms = self.elapsed_ms;

        for change in self.modes.advance(now_ms) {
            self.apply_mode_change(change);
        }

        if let EngineStatus::Paused { until_ms, reason } = self.status {
            if now_ms < until_ms {
                return Ok(report);
            }
            self.rebuild_ghosts(now_ms);
            self.events.push(RuntimeEvent::GhostsReset);
            match reason {
                PauseReason::PlayerDeath => {
                    self.player_dead = false;
                    self.status = EngineStatus::Running;
                }
                PauseReason::LevelComplete => {
                    self.status = EngineStatus::LevelComplete;
                    return Ok(report);
                }
            }
        }

        if self.consume_under_player(player, now_ms, audio, &mut report)
            && self.grid.collectibles_left() == 0
        {
            self.complete_level(now_ms, &mut report);
            return Ok(report);
        }

        if let Err(err) = self.update_ghosts(player, now_ms, audio, &mut report) {
            warn!(error = %err, tick = self.tick_counter, "engine halted");
            self.halt_reason = Some(err.to_string());
            self.status = EngineStatus::Halted;
            return Err(err);
        }
        Ok(report)
    }

    pub fn build_snapshot(&mut self, include_events: bool) -> Snapshot {
        let snapshot = Snapshot {
            tick: self.tick_counter,
            now_ms: self.elapsed_ms,
            mode: self.modes.current(),
            power_active: self.modes.is_powered(),
            status: self.status,
            score: self.score,
            collectibles_left: self.grid.collectibles_left(),
            player_dead: self.player_dead,
            level_complete: self.level_complete,
            ghosts: self.ghost_views(),
            events: if include_events {
                self.events.clone()
            } else {
                Vec::new()
            },
        };
        if include_events {
            self.events.clear();
        }
        snapshot
    }

    fn rebuild_ghosts(&mut self, now_ms: u64) {
        self.ghosts = GhostKind::ALL
            .into_iter()
            .map(|kind| {
                Ghost::new(
                    kind,
                    &self.grid,
                    self.level.spawn_tile(kind),
                    self.level.scatter_target(kind),
                    self.level.release_delay_ms(kind),
                    self.config.respawn_delay_ms,
                    self.config.lerp_step,
                    now_ms,
                )
            })
            .collect();
        self.blinky_tile = self.level.den_exit;
    }

    fn apply_mode_change(&mut self, change: ModeChange) {
        match change {
            ModeChange::Base(mode) => {
                for ghost in &mut self.ghosts {
                    if ghost.is_released() {
                        ghost.retarget_pending = true;
                    }
                }
                self.events.push(RuntimeEvent::ModeChanged { mode });
                debug!(mode = mode.as_str(), now_ms = self.elapsed_ms, "mode switched");
            }
            ModeChange::PowerEnded => {
                self.events.push(RuntimeEvent::PowerEnded);
                debug!(now_ms = self.elapsed_ms, "power-up ended");
            }
        }
    }

    /// Returns true when something was collected this frame.
    fn consume_under_player(
        &mut self,
        player: &PlayerInput,
        now_ms: u64,
        audio: &mut dyn AudioSink,
        report: &mut TickReport,
    ) -> bool {
        let tile = player_tile(&self.grid, player);
        match self.grid.consume(tile) {
            Some(CellKind::Dot) => {
                self.score += DOT_POINT;
                report.score_delta += DOT_POINT;
                audio.play(SoundCue::Dot, now_ms);
                self.events.push(RuntimeEvent::DotEaten { tile });
                true
            }
            Some(CellKind::Power) => {
                self.score += POWER_POINT;
                report.score_delta += POWER_POINT;
                audio.play(SoundCue::Power, now_ms);
                self.modes.trigger_power(now_ms, self.level.power_up_ms);
                self.events.push(RuntimeEvent::PowerEaten { tile });
                debug!(%tile, until_ms = now_ms + self.level.power_up_ms, "power-up started");
                true
            }
            _ => false,
        }
    }

    fn complete_level(&mut self, now_ms: u64, report: &mut TickReport) {
        self.score += LEVEL_COMPLETE_POINT;
        report.score_delta += LEVEL_COMPLETE_POINT;
        report.level_complete = true;
        self.level_complete = true;
        self.status = EngineStatus::Paused {
            until_ms: now_ms.saturating_add(self.config.level_complete_pause_ms),
            reason: PauseReason::LevelComplete,
        };
        self.events.push(RuntimeEvent::LevelComplete);
        info!(level = %self.level.name, score = self.score, tick = self.tick_counter, "level complete");
    }

    fn update_ghosts(
        &mut self,
        player: &PlayerInput,
        now_ms: u64,
        audio: &mut dyn AudioSink,
        report: &mut TickReport,
    ) -> Result<(), EngineError> {
        let base_mode = self.modes.base();
        let power = self.modes.power();
        let target_tile = player_tile(&self.grid, player);
        let mut player_caught = false;

        for idx in 0..self.ghosts.len() {
            let kind = self.ghosts[idx].kind;
            if self.ghosts[idx].try_release(&self.grid, self.level.den_exit, now_ms) {
                self.events.push(RuntimeEvent::GhostReleased { kind });
                info!(ghost = kind.name(), now_ms, "ghost released");
            }
            if !self.ghosts[idx].is_released() {
                continue;
            }

            match power {
                Some(window) => {
                    let exposed = self.ghosts[idx]
                        .released_at_ms()
                        .is_some_and(|released| released <= window.started_at_ms);
                    if exposed && !self.ghosts[idx].scared {
                        self.ghosts[idx].frighten(&self.grid, &mut self.rng);
                        self.events.push(RuntimeEvent::GhostFrightened { kind });
                        debug!(ghost = kind.name(), "ghost frightened");
                    }
                }
                None => {
                    if self.ghosts[idx].scared {
                        self.ghosts[idx].calm();
                    }
                }
            }

            let surroundings = Surroundings {
                grid: &self.grid,
                mode: base_mode,
                player_tile: target_tile,
                player_facing: player.facing,
                blinky_tile: self.blinky_tile,
                reachable: &self.reachable,
            };
            self.ghosts[idx].advance(&surroundings, &mut self.rng)?;
            if kind == GhostKind::Blinky {
                self.blinky_tile = self.ghosts[idx].seen_tile.unwrap_or(self.ghosts[idx].tile);
            }

            // every ghost still moves on the frame the player is caught, only the first one kills
            if !player_caught {
                player_caught = self.resolve_collision(idx, player, now_ms, audio, report);
            }
        }
        Ok(())
    }
}
