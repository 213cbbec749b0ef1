use crate::types::GhostMode;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ModeChange {
    /// Scatter/chase flipped on the schedule (or was pinned).
    Base(GhostMode),
    PowerEnded,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PowerWindow {
    pub started_at_ms: u64,
    pub until_ms: u64,
}

/// Process-wide scatter/chase schedule with the power-up override on top.
#[derive(Clone, Debug)]
pub struct ModeController {
    schedule_ms: Vec<u64>,
    index: usize,
    phase_deadline_ms: u64,
    base: GhostMode,
    pinned: bool,
    power: Option<PowerWindow>,
}

impl ModeController {
    pub fn new(schedule_ms: Vec<u64>, now_ms: u64) -> Self {
        let first = schedule_ms.first().copied().unwrap_or(u64::MAX);
        Self {
            schedule_ms,
            index: 0,
            phase_deadline_ms: now_ms.saturating_add(first),
            base: GhostMode::Scatter,
            pinned: false,
            power: None,
        }
    }

    pub fn base(&self) -> GhostMode {
        self.base
    }

    /// Effective mode: scared while a power-up runs, otherwise the base mode.
    pub fn current(&self) -> GhostMode {
        if self.power.is_some() {
            GhostMode::Scared
        } else {
            self.base
        }
    }

    pub fn power(&self) -> Option<PowerWindow> {
        self.power
    }

    pub fn is_powered(&self) -> bool {
        self.power.is_some()
    }

    /// Starts (or restarts) the power-up window.
    pub fn trigger_power(&mut self, now_ms: u64, duration_ms: u64) {
        self.power = Some(PowerWindow {
            started_at_ms: now_ms,
            until_ms: now_ms.saturating_add(duration_ms),
        });
    }

    /// Fixes the base mode and stops the schedule.
    pub fn pin(&mut self, mode: GhostMode) -> Option<ModeChange> {
        if mode == GhostMode::Scared {
            return None;
        }
        self.pinned = true;
        if self.base == mode {
            return None;
        }
        self.base = mode;
        Some(ModeChange::Base(mode))
    }

    pub fn advance(&mut self, now_ms: u64) -> Vec<ModeChange> {
        let mut changes = Vec::new();
        if let Some(window) = self.power {
            if now_ms >= window.until_ms {
                self.power = None;
                changes.push(ModeChange::PowerEnded);
            }
        }
        if self.pinned || self.schedule_ms.is_empty() {
            return changes;
        }
        while now_ms >= self.phase_deadline_ms {
            self.index += 1;
            self.base = match self.base {
                GhostMode::Scatter => GhostMode::Chase,
                _ => GhostMode::Scatter,
            };
            let duration = self.phase_duration(self.index).max(1);
            self.phase_deadline_ms = self.phase_deadline_ms.saturating_add(duration);
            changes.push(ModeChange::Base(self.base));
        }
        changes
    }

    fn phase_duration(&self, index: usize) -> u64 {
        let last = self.schedule_ms.len().saturating_sub(1);
        self.schedule_ms[index.min(last)]
    }
}
