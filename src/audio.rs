use std::collections::HashMap;

use crate::constants::cue_min_interval_ms;
use crate::types::SoundCue;

/// Receives sound cues from the engine. Playback is the caller's business.
pub trait AudioSink {
    fn play(&mut self, cue: SoundCue, now_ms: u64);
}

#[derive(Clone, Copy, Debug, Default)]
pub struct NullAudio;

impl AudioSink for NullAudio {
    fn play(&mut self, _cue: SoundCue, _now_ms: u64) {}
}

/// Records every cue it receives.
#[derive(Clone, Debug, Default)]
pub struct CueLog {
    pub cues: Vec<(u64, SoundCue)>,
}

impl CueLog {
    pub fn count(&self, cue: SoundCue) -> usize {
        self.cues.iter().filter(|(_, played)| *played == cue).count()
    }
}

impl AudioSink for CueLog {
    fn play(&mut self, cue: SoundCue, now_ms: u64) {
        self.cues.push((now_ms, cue));
    }
}

/// Drops repeats of a cue that arrive before its minimum replay interval.
#[derive(Debug)]
pub struct CueThrottle<S> {
    inner: S,
    last_played: HashMap<SoundCue, u64>,
    dropped: u64,
}

impl<S: AudioSink> CueThrottle<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            last_played: HashMap::new(),
            dropped: 0,
        }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    pub fn inner_mut(&mut self) -> &mut S {
        &mut self.inner
    }

    pub fn dropped(&self) -> u64 {
        self.dropped
    }
}

impl<S: AudioSink> AudioSink for CueThrottle<S> {
    fn play(&mut self, cue: SoundCue, now_ms: u64) {
        if let Some(last) = self.last_played.get(&cue) {
            if now_ms.saturating_sub(*last) < cue_min_interval_ms(cue) {
                self.dropped += 1;
                return;
            }
        }
        self.last_played.insert(cue, now_ms);
        self.inner.play(cue, now_ms);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn throttle_limits_each_cue_independently() {
        let mut sink = CueThrottle::new(CueLog::default());
        sink.play(SoundCue::Dot, 0);
        sink.play(SoundCue::Dot, 16);
        sink.play(SoundCue::EatGhost, 16);
        sink.play(SoundCue::EatGhost, 100);
        sink.play(SoundCue::Dot, 200);
        sink.play(SoundCue::Death, 200);
        sink.play(SoundCue::Death, 699);

        assert_eq!(sink.inner().count(SoundCue::Dot), 2);
        assert_eq!(sink.inner().count(SoundCue::EatGhost), 1);
        assert_eq!(sink.inner().count(SoundCue::Death), 1);
        assert_eq!(sink.dropped(), 3);
    }
}
