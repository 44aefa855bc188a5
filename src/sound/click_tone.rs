//!
//! The beep that goes with every beat
//!
use log::{trace, warn};

use super::{alert::AlertSound, tone::ToneSpec, tone_emitter::ToneEmitter};

/// How a beat ended up sounding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToneOutcome {
    Played,
    Alerted,
}

/// Pre-rendered tone plus the device to play it on.
///
/// [`play`](ClickTone::play) does the whole open/write/drain/close cycle and only
/// returns once the tone is done, so two beeps can never overlap.  If anything
/// goes wrong with the device the alert sound is used instead, a beat always
/// makes some noise.
pub struct ClickTone {
    spec: ToneSpec,
    samples: Vec<u8>,
    emitter: Box<dyn ToneEmitter>,
    alert: Box<dyn AlertSound>,
}

impl ClickTone {
    pub fn new(spec: ToneSpec, emitter: Box<dyn ToneEmitter>, alert: Box<dyn AlertSound>) -> ClickTone {
        let samples = spec.synthesize();
        ClickTone {
            spec,
            samples,
            emitter,
            alert,
        }
    }

    pub fn spec(&self) -> &ToneSpec {
        &self.spec
    }

    pub fn samples(&self) -> &[u8] {
        &self.samples
    }

    pub fn play(&mut self) -> ToneOutcome {
        let format = self.spec.format();
        if let Err(e) = self.emitter.open(&format) {
            warn!("{}, using alert sound", e);
            self.alert.beep();
            return ToneOutcome::Alerted;
        }

        let res = self
            .emitter
            .write(&self.samples)
            .and_then(|frames| {
                trace!("wrote {} of {} frames", frames, self.samples.len());
                self.emitter.drain()
            });
        self.emitter.close();

        match res {
            Ok(()) => ToneOutcome::Played,
            Err(e) => {
                warn!("tone playback failed: {}, using alert sound", e);
                self.alert.beep();
                ToneOutcome::Alerted
            }
        }
    }
}

#[cfg(test)]
mod test_click_tone {
    use super::*;
    use crate::sound::{
        alert::MockAlertSound,
        tone_emitter::{AudioFormat, MockToneEmitter, ToneDeviceUnavailableError},
    };
    use mockall::{predicate::eq, Sequence};

    fn no_beep() -> Box<MockAlertSound> {
        let mut alert = MockAlertSound::new();
        alert.expect_beep().never();
        Box::new(alert)
    }

    fn one_beep() -> Box<MockAlertSound> {
        let mut alert = MockAlertSound::new();
        alert.expect_beep().times(1).return_const(());
        Box::new(alert)
    }

    #[test]
    fn plays_open_write_drain_close_in_order() {
        let mut seq = Sequence::new();
        let mut em = MockToneEmitter::new();
        em.expect_open()
            .with(eq(AudioFormat::u8_mono(8000)))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(()));
        em.expect_write()
            .withf(|buf| buf.len() == 400 && buf[0] == 128)
            .times(1)
            .in_sequence(&mut seq)
            .returning(|buf| Ok(buf.len()));
        em.expect_drain().times(1).in_sequence(&mut seq).returning(|| Ok(()));
        em.expect_close().times(1).in_sequence(&mut seq).return_const(());

        let mut click = ClickTone::new(ToneSpec::default(), Box::new(em), no_beep());
        assert_eq!(click.play(), ToneOutcome::Played);
    }

    #[test]
    fn unavailable_device_falls_back_to_alert() {
        let mut em = MockToneEmitter::new();
        em.expect_open().times(1).returning(|_| {
            Err(ToneDeviceUnavailableError {
                device: "default".to_string(),
                reason: "busy".to_string(),
            })
        });
        em.expect_write().never();
        em.expect_drain().never();
        em.expect_close().never();

        let mut click = ClickTone::new(ToneSpec::default(), Box::new(em), one_beep());
        assert_eq!(click.play(), ToneOutcome::Alerted);
    }

    #[test]
    fn write_failure_still_closes_and_alerts() {
        let mut em = MockToneEmitter::new();
        em.expect_open().returning(|_| Ok(()));
        em.expect_write().returning(|_| Err("xrun".into()));
        em.expect_drain().never();
        em.expect_close().times(1).return_const(());

        let mut click = ClickTone::new(ToneSpec::default(), Box::new(em), one_beep());
        assert_eq!(click.play(), ToneOutcome::Alerted);
    }

    #[test]
    fn samples_are_rendered_once() {
        let click = ClickTone::new(
            ToneSpec::default(),
            Box::new(crate::sound::tone_emitter::SilentToneEmitter::new()),
            no_beep(),
        );
        assert_eq!(click.samples(), ToneSpec::default().synthesize().as_slice());
        assert_eq!(click.spec().num_samples(), click.samples().len());
    }
}
