//! The output side of a beep: something that can take a pcm buffer and play it
use std::{error::Error, fmt};

use log::trace;

#[cfg(test)]
use mockall::automock;

use crate::common::box_error::BoxError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AudioFormat {
    pub sample_rate: u32,
    pub bits: u8,
    pub channels: u8,
    pub signed: bool,
}

impl AudioFormat {
    pub fn u8_mono(sample_rate: u32) -> AudioFormat {
        AudioFormat {
            sample_rate,
            bits: 8,
            channels: 1,
            signed: false,
        }
    }

    pub fn bytes_per_frame(&self) -> usize {
        (self.bits as usize / 8).max(1) * self.channels as usize
    }
}

impl fmt::Display for AudioFormat {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{} Hz {}-bit {} {}",
            self.sample_rate,
            self.bits,
            if self.signed { "signed" } else { "unsigned" },
            if self.channels == 1 { "mono".to_string() } else { format!("{} channels", self.channels) }
        )
    }
}

/// The sound device could not be opened for the requested format
#[derive(Debug)]
pub struct ToneDeviceUnavailableError {
    pub device: String,
    pub reason: String,
}

impl fmt::Display for ToneDeviceUnavailableError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Tone device '{}' unavailable: {}", self.device, self.reason)
    }
}

impl Error for ToneDeviceUnavailableError {}

/// A device that plays one buffer at a time.
///
/// Used as `open`, `write`, `drain`, `close`.  `drain` blocks until everything
/// written has actually been played.
#[cfg_attr(test, automock)]
pub trait ToneEmitter: Send {
    fn open(&mut self, format: &AudioFormat) -> Result<(), ToneDeviceUnavailableError>;
    /// Returns the number of frames accepted
    fn write(&mut self, buffer: &[u8]) -> Result<usize, BoxError>;
    fn drain(&mut self) -> Result<(), BoxError>;
    fn close(&mut self);
}

/// Emitter that accepts everything and plays nothing, for running muted
#[derive(Debug, Default)]
pub struct SilentToneEmitter {
    format: Option<AudioFormat>,
    written: usize,
}

impl SilentToneEmitter {
    pub fn new() -> SilentToneEmitter {
        SilentToneEmitter::default()
    }

    /// Frames swallowed since the last open
    pub fn written(&self) -> usize {
        self.written
    }
}

impl ToneEmitter for SilentToneEmitter {
    fn open(&mut self, format: &AudioFormat) -> Result<(), ToneDeviceUnavailableError> {
        self.format = Some(*format);
        self.written = 0;
        Ok(())
    }

    fn write(&mut self, buffer: &[u8]) -> Result<usize, BoxError> {
        let format = match self.format {
            Some(f) => f,
            None => return Err("silent emitter is not open".into()),
        };
        let frames = buffer.len() / format.bytes_per_frame();
        self.written += frames;
        Ok(frames)
    }

    fn drain(&mut self) -> Result<(), BoxError> {
        trace!("silent drain of {} frames", self.written);
        Ok(())
    }

    fn close(&mut self) {
        self.format = None;
    }
}

#[cfg(test)]
mod test_tone_emitter {
    use super::*;

    #[test]
    fn format_display() {
        assert_eq!(AudioFormat::u8_mono(8000).to_string(), "8000 Hz 8-bit unsigned mono");
        let stereo = AudioFormat { sample_rate: 48_000, bits: 16, channels: 2, signed: true };
        assert_eq!(stereo.to_string(), "48000 Hz 16-bit signed 2 channels");
        assert_eq!(stereo.bytes_per_frame(), 4);
    }

    #[test]
    fn device_error_message() {
        let e = ToneDeviceUnavailableError { device: "hw:9".to_string(), reason: "No such device".to_string() };
        assert_eq!(e.to_string(), "Tone device 'hw:9' unavailable: No such device");
    }

    #[test]
    fn silent_emitter_counts_frames() {
        let mut em = SilentToneEmitter::new();
        assert!(em.write(&[1, 2, 3]).is_err());
        em.open(&AudioFormat::u8_mono(8000)).unwrap();
        assert_eq!(em.write(&[128; 400]).unwrap(), 400);
        em.drain().unwrap();
        assert_eq!(em.written(), 400);
        em.close();
        assert!(em.write(&[1]).is_err());
    }
}
