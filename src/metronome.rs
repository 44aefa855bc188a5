//! Play/stop session driver
//!
//! This is what a front end holds on to.  It owns the long lived
//! [`BeatDisplay`] and whichever [`PulseEngine`] is current.  An engine only
//! plays once, so every stop swaps in a fresh idle engine for the next play.
use std::sync::Arc;

use log::{debug, info, warn};

use crate::{
    display::beat_display::BeatDisplay,
    pulse::{
        pulse_engine::{PulseEngine, PulseState, DEFAULT_BPM},
        pulse_error::PulseError,
    },
};

/// Tempos offered for quick selection
pub const BPM_CHOICES: [u32; 16] = [50, 55, 60, 65, 70, 75, 80, 85, 90, 95, 100, 105, 110, 120, 140, 160];

pub struct Metronome {
    display: Arc<BeatDisplay>,
    pulse: PulseEngine,
    selected_bpm: u32,
    playing: bool,
}

impl Metronome {
    pub fn new(display: Arc<BeatDisplay>) -> Metronome {
        Metronome {
            pulse: PulseEngine::new(display.clone()),
            display,
            selected_bpm: DEFAULT_BPM,
            playing: false,
        }
    }

    pub fn with_bpm(display: Arc<BeatDisplay>, bpm: i64) -> Result<Metronome, PulseError> {
        let mut met = Metronome::new(display);
        met.select_bpm(bpm)?;
        Ok(met)
    }

    /// True while a session is on and its pulse is still going.  A pulse that
    /// stopped on its own (observer failure) does not count.
    pub fn is_playing(&self) -> bool {
        self.playing && self.pulse.state() == PulseState::Running
    }

    pub fn selected_bpm(&self) -> u32 {
        self.selected_bpm
    }

    pub fn display(&self) -> &Arc<BeatDisplay> {
        &self.display
    }

    /// The engine for the current (or next) session
    pub fn pulse(&self) -> &PulseEngine {
        &self.pulse
    }

    /// Pick a tempo.  Takes effect on the next beat if playing.
    pub fn select_bpm(&mut self, bpm: i64) -> Result<(), PulseError> {
        if let Err(e) = self.pulse.set_rate(bpm) {
            warn!("tempo not changed: {}", e);
            return Err(e);
        }
        self.selected_bpm = bpm as u32;
        info!("tempo {} bpm", self.selected_bpm);
        Ok(())
    }

    /// Next faster entry in [`BPM_CHOICES`], stays put at the top
    pub fn tempo_up(&mut self) -> Result<u32, PulseError> {
        let next = BPM_CHOICES
            .iter()
            .copied()
            .find(|b| *b > self.selected_bpm)
            .unwrap_or(self.selected_bpm.max(BPM_CHOICES[BPM_CHOICES.len() - 1]));
        self.select_bpm(next as i64)?;
        Ok(next)
    }

    /// Next slower entry in [`BPM_CHOICES`], stays put at the bottom
    pub fn tempo_down(&mut self) -> Result<u32, PulseError> {
        let next = BPM_CHOICES
            .iter()
            .rev()
            .copied()
            .find(|b| *b < self.selected_bpm)
            .unwrap_or(self.selected_bpm.min(BPM_CHOICES[0]));
        self.select_bpm(next as i64)?;
        Ok(next)
    }

    pub fn play(&mut self) -> Result<(), PulseError> {
        if self.is_playing() {
            return Ok(());
        }
        if self.pulse.state() != PulseState::Idle {
            // a previous session ended on its own (observer failure), start clean
            self.new_session();
        }
        self.pulse.set_rate(self.selected_bpm as i64)?;
        self.pulse.start()?;
        self.playing = true;
        Ok(())
    }

    pub fn stop(&mut self) {
        if !self.playing {
            return;
        }
        self.pulse.stop();
        self.new_session();
        self.playing = false;
    }

    /// The play/stop button.  Returns whether we are now playing.
    pub fn toggle(&mut self) -> Result<bool, PulseError> {
        if self.is_playing() {
            self.stop();
        } else {
            self.play()?;
        }
        Ok(self.is_playing())
    }

    /// Put the indicator back on the first beat of the measure
    pub fn reset_indicator(&self) {
        self.display.reset();
    }

    fn new_session(&mut self) {
        // wait out the old thread so beats from two sessions never interleave
        self.pulse.join();
        let old = std::mem::replace(&mut self.pulse, PulseEngine::new(self.display.clone()));
        debug!("pulse session ended after {} beats", old.beats_emitted());
    }
}

impl Drop for Metronome {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod test_metronome {
    use super::*;
    use crate::{
        common::box_error::BoxError,
        sound::{
            alert::TerminalBell,
            click_tone::ClickTone,
            tone::ToneSpec,
            tone_emitter::{AudioFormat, SilentToneEmitter, ToneDeviceUnavailableError, ToneEmitter},
        },
    };
    use std::{thread, time::Duration};

    fn display() -> Arc<BeatDisplay> {
        let click = ClickTone::new(
            ToneSpec::default(),
            Box::new(SilentToneEmitter::new()),
            Box::new(TerminalBell),
        );
        Arc::new(BeatDisplay::new(4, click).unwrap())
    }

    #[test]
    fn starts_stopped_at_60() {
        let met = Metronome::new(display());
        assert!(!met.is_playing());
        assert_eq!(met.selected_bpm(), 60);
        assert_eq!(met.pulse().state(), PulseState::Idle);
    }

    #[test]
    fn toggle_builds_a_fresh_engine_per_session() {
        let mut met = Metronome::with_bpm(display(), 999).unwrap();
        assert!(met.toggle().unwrap());
        assert_eq!(met.pulse().state(), PulseState::Running);
        thread::sleep(Duration::from_millis(20));
        assert!(met.pulse().beats_emitted() >= 1);

        assert!(!met.toggle().unwrap());
        assert_eq!(met.pulse().state(), PulseState::Idle);
        assert_eq!(met.pulse().beats_emitted(), 0);
        assert_eq!(met.pulse().rate(), 60); // fresh engine, selection is applied on play

        assert!(met.toggle().unwrap());
        assert_eq!(met.pulse().rate(), 999);
        thread::sleep(Duration::from_millis(20));
        met.stop();
        assert!(!met.is_playing());
    }

    #[test]
    fn indicator_carries_over_between_sessions() {
        let mut met = Metronome::with_bpm(display(), 120).unwrap();
        met.play().unwrap();
        thread::sleep(Duration::from_millis(50)); // one beat at 120
        met.stop();
        assert_eq!(met.display().indicator().current_index(), 1);

        met.play().unwrap();
        thread::sleep(Duration::from_millis(50));
        met.stop();
        assert_eq!(met.display().indicator().active_positions(), vec![1]);

        met.reset_indicator();
        assert_eq!(met.display().indicator().current_index(), 0);
    }

    #[test]
    fn live_tempo_change() {
        let mut met = Metronome::new(display());
        met.play().unwrap();
        met.select_bpm(140).unwrap();
        assert_eq!(met.pulse().rate(), 140);
        assert!(met.select_bpm(0).is_err());
        assert_eq!(met.selected_bpm(), 140);
        assert_eq!(met.pulse().rate(), 140);
    }

    #[test]
    fn tempo_steps_through_choices() {
        let mut met = Metronome::new(display());
        assert_eq!(met.tempo_up().unwrap(), 65);
        assert_eq!(met.tempo_down().unwrap(), 60);
        met.select_bpm(112).unwrap();
        assert_eq!(met.tempo_up().unwrap(), 120);
        met.select_bpm(112).unwrap();
        assert_eq!(met.tempo_down().unwrap(), 110);
        met.select_bpm(160).unwrap();
        assert_eq!(met.tempo_up().unwrap(), 160);
        met.select_bpm(50).unwrap();
        assert_eq!(met.tempo_down().unwrap(), 50);
        met.select_bpm(300).unwrap();
        assert_eq!(met.tempo_up().unwrap(), 300);
        assert_eq!(met.tempo_down().unwrap(), 160);
    }

    /// Blows up the first time it is opened, plays silently after that
    struct FlakyEmitter {
        failed: bool,
    }

    impl ToneEmitter for FlakyEmitter {
        fn open(&mut self, _format: &AudioFormat) -> Result<(), ToneDeviceUnavailableError> {
            if !self.failed {
                self.failed = true;
                panic!("tone device exploded");
            }
            Ok(())
        }
        fn write(&mut self, buffer: &[u8]) -> Result<usize, BoxError> {
            Ok(buffer.len())
        }
        fn drain(&mut self) -> Result<(), BoxError> {
            Ok(())
        }
        fn close(&mut self) {}
    }

    fn display_that_fails_once() -> Arc<BeatDisplay> {
        let click = ClickTone::new(
            ToneSpec::default(),
            Box::new(FlakyEmitter { failed: false }),
            Box::new(TerminalBell),
        );
        Arc::new(BeatDisplay::new(4, click).unwrap())
    }

    #[test]
    fn failed_pulse_is_not_playing_and_toggle_restarts_it() {
        let mut met = Metronome::with_bpm(display_that_fails_once(), 999).unwrap();
        met.play().unwrap();
        thread::sleep(Duration::from_millis(200));
        assert_eq!(met.pulse().state(), PulseState::Stopped);
        assert!(!met.is_playing());

        // first press after the failure plays again instead of acting as stop
        assert!(met.toggle().unwrap());
        assert_eq!(met.pulse().state(), PulseState::Running);
        thread::sleep(Duration::from_millis(100));
        assert!(met.pulse().beats_emitted() >= 1);
        assert!(met.is_playing());

        assert!(!met.toggle().unwrap());
        assert!(!met.is_playing());
    }

    #[test]
    fn play_after_failure_starts_a_new_session() {
        let mut met = Metronome::with_bpm(display_that_fails_once(), 999).unwrap();
        met.play().unwrap();
        thread::sleep(Duration::from_millis(200));
        met.play().unwrap();
        assert!(met.is_playing());
        assert_eq!(met.pulse().state(), PulseState::Running);
        met.stop();
        assert_eq!(met.pulse().state(), PulseState::Idle);
    }
}
