//! pulse_metronome - a threaded metronome library
//!
//! A [`pulse::pulse_engine::PulseEngine`] runs the beat loop on its own thread and
//! notifies a [`pulse::beat_observer::BeatObserver`] once per beat.  The
//! [`display::beat_display::BeatDisplay`] observer advances the rotating beat
//! indicator and plays the click tone inside that same call, so the light and the
//! sound of a beat always go together.  [`metronome::Metronome`] is the play/stop
//! session driver a front end talks to.
pub mod common;
pub mod display;
pub mod metronome;
pub mod pulse;
pub mod settings;
pub mod sound;
