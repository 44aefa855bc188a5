//! The visual half of a beat, and the observer that ties it to the sound
pub mod beat_display;
pub mod beat_indicator;
