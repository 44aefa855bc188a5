//! Typed view of the metronome's config keys
use std::time::Duration;

use log::info;
use simple_error::bail;

use crate::{
    common::{box_error::BoxError, config::Config},
    display::beat_indicator::DEFAULT_BEAT_COUNT,
    pulse::pulse_engine::{DEFAULT_BPM, MAX_BPM, MIN_BPM},
    sound::{
        alsa_emitter::DEFAULT_DEVICE,
        tone::{ToneSpec, DEFAULT_DURATION_MS, DEFAULT_FREQUENCY, DEFAULT_SAMPLE_RATE},
    },
};

pub const DEFAULT_CONFIG_FILE: &str = "settings.json";

#[derive(Debug, Clone, PartialEq)]
pub struct MetronomeSettings {
    pub bpm: u32,
    pub beat_count: usize,
    pub tone: ToneSpec,
    pub audio_device: String,
    pub mute: bool,
}

impl MetronomeSettings {
    pub fn default_params() -> json::JsonValue {
        json::object! {
            "bpm": DEFAULT_BPM,
            "beat_count": DEFAULT_BEAT_COUNT,
            "tone_frequency": DEFAULT_FREQUENCY,
            "tone_duration_ms": DEFAULT_DURATION_MS,
            "sample_rate": DEFAULT_SAMPLE_RATE,
            "audio_device": DEFAULT_DEVICE,
            "mute": false
        }
    }

    /// Load `filename` (or settings.json) on top of the defaults
    pub fn load(filename: Option<&str>) -> Result<Config, BoxError> {
        let filename = filename.unwrap_or(DEFAULT_CONFIG_FILE);
        info!("Using config file: {}", filename);
        Ok(Config::build(String::from(filename), Self::default_params())?)
    }

    pub fn from_config(config: &Config) -> Result<MetronomeSettings, BoxError> {
        let bpm = config.get_u32_value("bpm", None)?;
        if !(MIN_BPM..=MAX_BPM).contains(&(bpm as i64)) {
            bail!("bpm {} out of range {}..={}", bpm, MIN_BPM, MAX_BPM);
        }
        let beat_count = config.get_u32_value("beat_count", None)? as usize;
        if beat_count < 2 {
            bail!("beat_count must be at least 2, got {}", beat_count);
        }
        let tone = ToneSpec::new(
            config.get_f64_value("tone_frequency", None)?,
            Duration::from_millis(config.get_u32_value("tone_duration_ms", None)? as u64),
            config.get_u32_value("sample_rate", None)?,
        )?;

        let settings = MetronomeSettings {
            bpm,
            beat_count,
            tone,
            audio_device: config.get_str_value("audio_device", None)?,
            mute: config.get_bool_value("mute", None)?,
        };
        info!("Settings: {:?}", settings);
        Ok(settings)
    }
}
