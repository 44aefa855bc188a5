//! Short sine beep rendered as 8 bit unsigned mono PCM
use std::{f64::consts::PI, time::Duration};

use simple_error::bail;

use crate::{common::box_error::BoxError, pulse::pulse_engine::beat_delay};

use super::tone_emitter::AudioFormat;

pub const DEFAULT_FREQUENCY: f64 = 800.0;
pub const DEFAULT_DURATION_MS: u64 = 50;
pub const DEFAULT_SAMPLE_RATE: u32 = 8_000;

#[derive(Debug, Clone, PartialEq)]
pub struct ToneSpec {
    pub frequency: f64,
    pub duration: Duration,
    pub sample_rate: u32,
}

impl Default for ToneSpec {
    fn default() -> Self {
        ToneSpec {
            frequency: DEFAULT_FREQUENCY,
            duration: Duration::from_millis(DEFAULT_DURATION_MS),
            sample_rate: DEFAULT_SAMPLE_RATE,
        }
    }
}

impl ToneSpec {
    pub fn new(frequency: f64, duration: Duration, sample_rate: u32) -> Result<ToneSpec, BoxError> {
        if sample_rate == 0 {
            bail!("sample rate must be positive");
        }
        if !(frequency > 0.0 && frequency < sample_rate as f64 / 2.0) {
            bail!(
                "tone frequency {} Hz must be above 0 and below half the sample rate ({} Hz)",
                frequency,
                sample_rate
            );
        }
        if duration.is_zero() {
            bail!("tone duration must be positive");
        }
        Ok(ToneSpec {
            frequency,
            duration,
            sample_rate,
        })
    }

    /// Device format the samples are meant for
    pub fn format(&self) -> AudioFormat {
        AudioFormat::u8_mono(self.sample_rate)
    }

    /// duration * rate, truncated
    pub fn num_samples(&self) -> usize {
        (self.duration.as_secs_f64() * self.sample_rate as f64) as usize
    }

    /// `round(sin(2 pi i f / rate) * 127 + 128)` for each sample
    pub fn synthesize(&self) -> Vec<u8> {
        let step = 2.0 * PI * self.frequency / self.sample_rate as f64;
        (0..self.num_samples())
            .map(|i| ((i as f64 * step).sin() * 127.0 + 128.0).round() as u8)
            .collect()
    }

    /// One whole beat at `bpm`: the tone followed by silence (128) up to the beat delay
    pub fn render_beat(&self, bpm: u32) -> Vec<u8> {
        let mut buf = self.synthesize();
        let beat_len = (beat_delay(bpm).as_secs_f64() * self.sample_rate as f64) as usize;
        if beat_len > buf.len() {
            buf.resize(beat_len, 128);
        }
        buf
    }
}
