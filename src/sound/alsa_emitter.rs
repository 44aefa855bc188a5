//! Plays tone buffers on an ALSA playback device.
//!
//! The pcm is opened fresh for every tone and closed again after the drain, the
//! same open/write/drain/close cycle a beep goes through on any other backend.
//! Opening per beat keeps the device free between beats and means a device that
//! disappears mid session just turns into an unavailable error on the next beat.
use alsa::pcm::*;
use alsa::{Direction, ValueOr};
use log::{debug, info, warn};

use crate::common::box_error::BoxError;

use super::tone_emitter::{AudioFormat, ToneDeviceUnavailableError, ToneEmitter};

pub const DEFAULT_DEVICE: &str = "default";

// The pcm only ever lives on one thread at a time (the pulse thread while a beat plays)
struct ThreadSafePCM(PCM);
unsafe impl Send for ThreadSafePCM {}

pub struct AlsaToneEmitter {
    device: String,
    pcm: Option<ThreadSafePCM>,
}

impl AlsaToneEmitter {
    pub fn new(device: &str) -> AlsaToneEmitter {
        AlsaToneEmitter {
            device: device.to_string(),
            pcm: None,
        }
    }

    pub fn device(&self) -> &str {
        &self.device
    }

    fn unavailable(&self, reason: impl ToString) -> ToneDeviceUnavailableError {
        ToneDeviceUnavailableError {
            device: self.device.clone(),
            reason: reason.to_string(),
        }
    }

    fn pcm(&self) -> Result<&PCM, BoxError> {
        match &self.pcm {
            Some(p) => Ok(&p.0),
            None => Err(format!("alsa device {} is not open", self.device).into()),
        }
    }
}

fn sample_format(format: &AudioFormat) -> Option<Format> {
    match (format.bits, format.signed) {
        (8, false) => Some(Format::U8),
        (8, true) => Some(Format::S8),
        (16, true) => Some(Format::s16()),
        _ => None,
    }
}

fn open_playback_dev(device: &str, format: &AudioFormat) -> Result<PCM, BoxError> {
    let smp_format = match sample_format(format) {
        Some(f) => f,
        None => return Err(format!("unsupported sample format {}", format).into()),
    };
    let p = PCM::new(device, Direction::Playback, false)?;
    {
        let hwp = HwParams::any(&p)?;
        hwp.set_channels(format.channels as u32)?;
        hwp.set_rate(format.sample_rate, ValueOr::Nearest)?;
        hwp.set_format(smp_format)?;
        hwp.set_access(Access::RWInterleaved)?;
        p.hw_params(&hwp)?;
    } // hwp borrows p, drop it before p is moved out
    let rate = p.hw_params_current()?.get_rate()?;
    if rate != format.sample_rate {
        warn!("alsa device {} wanted {} Hz, got {} Hz", device, format.sample_rate, rate);
    }
    info!("Opened tone output {:?} with {}", device, format);
    Ok(p)
}

impl ToneEmitter for AlsaToneEmitter {
    fn open(&mut self, format: &AudioFormat) -> Result<(), ToneDeviceUnavailableError> {
        self.close();
        match open_playback_dev(&self.device, format) {
            Ok(p) => {
                self.pcm = Some(ThreadSafePCM(p));
                Ok(())
            }
            Err(e) => Err(self.unavailable(e)),
        }
    }

    fn write(&mut self, buffer: &[u8]) -> Result<usize, BoxError> {
        let p = self.pcm()?;
        let io = p.io_bytes();
        let frame_bytes = (p.frames_to_bytes(1) as usize).max(1);
        let total_frames = buffer.len() / frame_bytes;
        let mut done = 0;
        while done < total_frames {
            match io.writei(&buffer[done * frame_bytes..total_frames * frame_bytes]) {
                Ok(n) => done += n,
                Err(e) => {
                    debug!("Recovering from {}", e);
                    p.recover(e.errno() as std::os::raw::c_int, true)?;
                }
            }
        }
        // a buffer shorter than the start threshold leaves the stream prepared
        if matches!(p.state(), State::Prepared) {
            p.start()?;
        }
        Ok(done)
    }

    fn drain(&mut self) -> Result<(), BoxError> {
        self.pcm()?.drain()?;
        Ok(())
    }

    fn close(&mut self) {
        // dropping the PCM closes the handle
        if self.pcm.take().is_some() {
            debug!("Closed tone output {:?}", self.device);
        }
    }
}

#[cfg(test)]
mod test_alsa_emitter {
    use super::*;

    #[test]
    fn maps_formats() {
        assert_eq!(sample_format(&AudioFormat::u8_mono(8000)), Some(Format::U8));
        let s8 = AudioFormat { signed: true, ..AudioFormat::u8_mono(8000) };
        assert_eq!(sample_format(&s8), Some(Format::S8));
        let u16 = AudioFormat { bits: 16, ..AudioFormat::u8_mono(8000) };
        assert_eq!(sample_format(&u16), None);
    }

    #[test]
    fn bogus_device_is_unavailable() {
        let mut em = AlsaToneEmitter::new("no_such_pcm_device_for_tests");
        let err = em.open(&AudioFormat::u8_mono(8000)).unwrap_err();
        assert_eq!(err.device, "no_such_pcm_device_for_tests");
        assert!(em.write(&[128; 10]).is_err());
        assert!(em.drain().is_err());
        em.close();
    }
}
