//! Everything that makes the beep: synthesis, output devices and the fallback alert

pub mod alert;
pub mod alsa_emitter;
pub mod click_tone;
pub mod tone;
pub mod tone_emitter;
