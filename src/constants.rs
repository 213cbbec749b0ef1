use crate::types::GhostKind;

pub const TICK_RATE: u64 = 60;
pub const TICK_MS: u64 = 1000 / TICK_RATE;

pub const CELL_SIZE: f32 = 20.0;
pub const PLAYER_SPEED: f32 = 4.0;
pub const SPRITE_SIZE: f32 = 32.0;
/// Coarse cells covered by a moving entity along each axis.
pub const FOOTPRINT: i32 = 2;
pub const GHOST_LERP_STEP: f32 = 0.2;

pub const DOT_POINT: i32 = 10;
pub const POWER_POINT: i32 = 15;
pub const GHOST_POINT: i32 = 25;
pub const LEVEL_COMPLETE_POINT: i32 = 80;

pub const DEATH_PAUSE_MS: u64 = 1_000;
pub const LEVEL_COMPLETE_PAUSE_MS: u64 = 2_000;
pub const RESPAWN_CAGE_MS: u64 = 1_500;
pub const DEFAULT_POWER_UP_MS: u64 = 6_000;

pub const AMBUSH_LOOK_AHEAD: i32 = 4;
pub const FLANK_LOOK_AHEAD: i32 = 2;
pub const DISTANCE_GATE: i32 = 8;

pub fn default_release_delay_ms(kind: GhostKind) -> u64 {
    match kind {
        GhostKind::Blinky => 4_000,
        GhostKind::Pinky => 8_000,
        GhostKind::Inky => 12_000,
        GhostKind::Clyde => 16_000,
    }
}

pub fn cue_min_interval_ms(cue: crate::types::SoundCue) -> u64 {
    use crate::types::SoundCue;
    match cue {
        SoundCue::Dot => 200,
        SoundCue::Power => 200,
        SoundCue::EatGhost => 100,
        SoundCue::Death => 500,
    }
}
