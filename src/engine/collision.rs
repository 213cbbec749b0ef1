use super::*;

impl GameEngine {
    /// Checks one ghost against the player. Returns true when the player died.
    pub(super) fn resolve_collision(
        &mut self,
        ghost_idx: usize,
        player: &PlayerInput,
        now_ms: u64,
        audio: &mut dyn AudioSink,
        report: &mut TickReport,
    ) -> bool {
        if !self.ghosts[ghost_idx].is_released() {
            return false;
        }
        let ghost_rect = ghost_box(&self.grid, self.ghosts[ghost_idx].pixel);
        if !ghost_rect.intersects(&player_box(player)) {
            return false;
        }

        let kind = self.ghosts[ghost_idx].kind;
        if self.ghosts[ghost_idx].scared {
            self.ghosts[ghost_idx].send_home(&self.grid, now_ms);
            self.score += GHOST_POINT;
            report.score_delta += GHOST_POINT;
            report.ghosts_eaten += 1;
            audio.play(SoundCue::EatGhost, now_ms);
            self.events.push(RuntimeEvent::GhostEaten {
                kind,
                points: GHOST_POINT,
            });
            info!(ghost = kind.name(), score = self.score, "ghost eaten");
            return false;
        }

        self.player_dead = true;
        report.player_died = true;
        audio.play(SoundCue::Death, now_ms);
        self.status = EngineStatus::Paused {
            until_ms: now_ms.saturating_add(self.config.death_pause_ms),
            reason: PauseReason::PlayerDeath,
        };
        self.events.push(RuntimeEvent::PlayerDeath { by: kind });
        info!(ghost = kind.name(), tick = self.tick_counter, "player caught");
        true
    }
}
