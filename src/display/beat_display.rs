//! The observer a metronome actually runs with.
//!
//! Each beat moves the indicator light and plays the click, in that order, inside
//! one `on_beat` call.  There is no waiting between the two, so whoever watches
//! the lights sees them change as the beep starts.
//!
//! A display outlives the engines that drive it.  The light position carries
//! over from one play session to the next unless [`BeatDisplay::reset`] is
//! called.
use std::sync::{mpsc, Mutex, MutexGuard, PoisonError};

use log::{trace, warn};

use crate::{
    common::box_error::BoxError,
    pulse::beat_observer::BeatObserver,
    sound::click_tone::{ClickTone, ToneOutcome},
};

use super::beat_indicator::{BeatIndicatorState, BeatMessage};

struct DisplayState {
    indicator: BeatIndicatorState,
    click: ClickTone,
    last_outcome: Option<ToneOutcome>,
}

pub struct BeatDisplay {
    state: Mutex<DisplayState>,
    lights_tx: Option<mpsc::Sender<BeatMessage>>,
}

impl BeatDisplay {
    pub fn new(beat_count: usize, click: ClickTone) -> Result<BeatDisplay, BoxError> {
        Ok(BeatDisplay {
            state: Mutex::new(DisplayState {
                indicator: BeatIndicatorState::new(beat_count)?,
                click,
                last_outcome: None,
            }),
            lights_tx: None,
        })
    }

    /// Also publish every light change on `lights_tx`
    pub fn with_lights(mut self, lights_tx: mpsc::Sender<BeatMessage>) -> BeatDisplay {
        self.lights_tx = Some(lights_tx);
        self
    }

    fn lock(&self) -> MutexGuard<'_, DisplayState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Copy of the light state as of the last beat
    pub fn indicator(&self) -> BeatIndicatorState {
        self.lock().indicator.clone()
    }

    pub fn last_outcome(&self) -> Option<ToneOutcome> {
        self.lock().last_outcome
    }

    /// Start the measure over from the first light
    pub fn reset(&self) {
        self.lock().indicator.reset();
    }
}

impl BeatObserver for BeatDisplay {
    fn on_beat(&self) {
        let mut state = self.lock();

        let msg = state.indicator.advance();
        if let Some(tx) = &self.lights_tx {
            if tx.send(msg).is_err() {
                warn!("lights: disconnected channel");
            }
        }
        trace!("beat light {} of {}", msg.lit + 1, msg.beat_count);

        let outcome = state.click.play();
        state.last_outcome = Some(outcome);
    }
}

#[cfg(test)]
mod test_beat_display {
    use super::*;
    use crate::sound::{
        alert::MockAlertSound,
        tone::ToneSpec,
        tone_emitter::{MockToneEmitter, SilentToneEmitter, ToneDeviceUnavailableError},
    };
    use std::sync::{Arc, Mutex as StdMutex};

    fn silent_click() -> ClickTone {
        let mut alert = MockAlertSound::new();
        alert.expect_beep().never();
        ClickTone::new(ToneSpec::default(), Box::new(SilentToneEmitter::new()), Box::new(alert))
    }

    #[test]
    fn rejects_single_beat_measure() {
        assert!(BeatDisplay::new(1, silent_click()).is_err());
    }

    #[test]
    fn each_beat_moves_the_light_and_plays_once() {
        let (tx, rx) = mpsc::channel();
        let display = BeatDisplay::new(4, silent_click()).unwrap().with_lights(tx);
        for _ in 0..6 {
            display.on_beat();
            assert_eq!(display.indicator().active_positions().len(), 1);
        }
        let lit: Vec<usize> = rx.try_iter().map(|m| m.lit).collect();
        assert_eq!(lit, vec![0, 1, 2, 3, 0, 1]);
        assert_eq!(display.last_outcome(), Some(ToneOutcome::Played));
    }

    #[test]
    fn light_is_published_before_the_tone_plays() {
        // the emitter records how many light messages existed when it was opened
        let (tx, rx) = mpsc::channel();
        let rx = Arc::new(StdMutex::new(rx));
        let seen_at_open = Arc::new(StdMutex::new(vec![]));

        let mut em = MockToneEmitter::new();
        let rx_in = rx.clone();
        let seen = seen_at_open.clone();
        em.expect_open().returning(move |_| {
            let n = rx_in.lock().unwrap().try_iter().count();
            seen.lock().unwrap().push(n);
            Ok(())
        });
        em.expect_write().returning(|buf| Ok(buf.len()));
        em.expect_drain().returning(|| Ok(()));
        em.expect_close().return_const(());
        let mut alert = MockAlertSound::new();
        alert.expect_beep().never();

        let click = ClickTone::new(ToneSpec::default(), Box::new(em), Box::new(alert));
        let display = BeatDisplay::new(4, click).unwrap().with_lights(tx);
        display.on_beat();
        display.on_beat();
        assert_eq!(*seen_at_open.lock().unwrap(), vec![1, 1]);
    }

    #[test]
    fn broken_device_still_beeps_and_lights() {
        let mut em = MockToneEmitter::new();
        em.expect_open().times(3).returning(|_| {
            Err(ToneDeviceUnavailableError {
                device: "default".to_string(),
                reason: "gone".to_string(),
            })
        });
        let mut alert = MockAlertSound::new();
        alert.expect_beep().times(3).return_const(());

        let click = ClickTone::new(ToneSpec::default(), Box::new(em), Box::new(alert));
        let display = BeatDisplay::new(3, click).unwrap();
        for _ in 0..3 {
            display.on_beat();
        }
        assert_eq!(display.last_outcome(), Some(ToneOutcome::Alerted));
        assert_eq!(display.indicator().active_positions(), vec![2]);
    }

    #[test]
    fn dropped_receiver_does_not_stop_the_beat() {
        let (tx, rx) = mpsc::channel();
        drop(rx);
        let display = BeatDisplay::new(2, silent_click()).unwrap().with_lights(tx);
        display.on_beat();
        assert_eq!(display.indicator().active_positions(), vec![0]);
    }

    #[test]
    fn reset_starts_measure_over() {
        let display = BeatDisplay::new(4, silent_click()).unwrap();
        display.on_beat();
        display.on_beat();
        display.reset();
        assert!(display.indicator().active_positions().is_empty());
        display.on_beat();
        assert_eq!(display.indicator().active_positions(), vec![0]);
    }
}
