//! The beat loop and the capability it drives.
pub mod beat_observer;
pub mod pulse_engine;
pub mod pulse_error;
