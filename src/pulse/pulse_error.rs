use std::{error::Error, fmt};

use super::pulse_engine::{PulseState, MAX_BPM, MIN_BPM};

/// Errors handed back to whoever drives a [`PulseEngine`](super::pulse_engine::PulseEngine).
///
/// All of these come back synchronously from the call that caused them.  The
/// pulse thread itself never reports errors to the driver; it just stops.
#[derive(Debug)]
pub enum PulseError {
    /// bpm was zero, negative or above [`MAX_BPM`]. The committed rate did not change.
    InvalidRate { bpm: i64 },
    /// `start()` on an engine that already ran. Build a new engine instead.
    AlreadyStarted { state: PulseState },
    /// The OS would not give us a thread. The engine is dead after this.
    ThreadSpawn(String),
}

impl fmt::Display for PulseError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            PulseError::InvalidRate { bpm } => {
                write!(f, "Invalid rate {} bpm, must be between {} and {}", bpm, MIN_BPM, MAX_BPM)
            }
            PulseError::AlreadyStarted { state } => {
                write!(f, "Pulse already started (state: {}), a new engine is needed", state)
            }
            PulseError::ThreadSpawn(reason) => write!(f, "Could not spawn pulse thread: {}", reason),
        }
    }
}

impl Error for PulseError {}
