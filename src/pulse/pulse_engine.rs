//! The pulse thread: notifies a [`BeatObserver`] at the current tempo
//!
//! A `PulseEngine` is good for exactly one play session.  It goes
//! `Idle -> Running -> StopRequested -> Stopped` and never comes back.  To play
//! again after a stop, build a new engine around the same observer.
//!
//! The loop is notify-then-sleep, so the first beat goes out as soon as the
//! thread is up.  The sleep between beats is a condition variable wait on the
//! state lock, which means `stop()` wakes it right away instead of waiting out
//! the rest of the beat.  The lock is also held while the observer runs, so once
//! `stop()` has returned no further beat can begin.
//!
//! The rate is a plain atomic.  `set_rate()` never touches the lock, and the loop
//! reads the rate once per beat to compute that beat's delay.  A rate change
//! therefore shows up starting with the next delay; the one already in progress
//! is left alone.
use std::{
    fmt,
    panic::{self, AssertUnwindSafe},
    sync::{
        atomic::{AtomicU32, AtomicU64, Ordering},
        Arc, Condvar, Mutex, MutexGuard, PoisonError,
    },
    thread::{self, JoinHandle},
    time::{Duration, Instant},
};

use log::{debug, error, info, trace};
use thread_priority::{ThreadBuilder, ThreadPriority};

use crate::common::stream_time_stat::StreamTimeStat;

use super::{beat_observer::BeatObserver, pulse_error::PulseError};

pub const MIN_BPM: i64 = 1;
pub const MAX_BPM: i64 = 999;
pub const DEFAULT_BPM: u32 = 60;

const LATENESS_WINDOW: u64 = 16;
const LATENESS_PEAK_DECAY_MS: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PulseState {
    Idle,
    Running,
    StopRequested,
    Stopped,
}

impl fmt::Display for PulseState {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Time between beats at a given tempo.
///
/// `60000 / bpm` milliseconds, truncated toward zero to a whole millisecond.
pub fn beat_delay(bpm: u32) -> Duration {
    let bpm = bpm.max(1);
    Duration::from_millis((60_000.0 / bpm as f64) as u64)
}

/// Everything the pulse thread and the driver both touch
struct PulseShared {
    rate_bpm: AtomicU32,
    state: Mutex<PulseState>,
    wake: Condvar,
    beats: AtomicU64,
    lateness: Mutex<StreamTimeStat>,
}

fn lock_state(state: &Mutex<PulseState>) -> MutexGuard<'_, PulseState> {
    // A poisoned lock still holds a valid state, and stop() has to keep working
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

pub struct PulseEngine {
    shared: Arc<PulseShared>,
    observer: Arc<dyn BeatObserver>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl fmt::Debug for PulseEngine {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("PulseEngine")
            .field("rate_bpm", &self.rate())
            .field("beats", &self.beats_emitted())
            .finish()
    }
}

impl PulseEngine {
    /// New idle engine at [`DEFAULT_BPM`]
    pub fn new(observer: Arc<dyn BeatObserver>) -> PulseEngine {
        PulseEngine {
            shared: Arc::new(PulseShared {
                rate_bpm: AtomicU32::new(DEFAULT_BPM),
                state: Mutex::new(PulseState::Idle),
                wake: Condvar::new(),
                beats: AtomicU64::new(0),
                lateness: Mutex::new(StreamTimeStat::build(LATENESS_WINDOW, LATENESS_PEAK_DECAY_MS)),
            }),
            observer,
            handle: Mutex::new(None),
        }
    }

    pub fn with_rate(observer: Arc<dyn BeatObserver>, bpm: i64) -> Result<PulseEngine, PulseError> {
        let engine = PulseEngine::new(observer);
        engine.set_rate(bpm)?;
        Ok(engine)
    }

    /// Commit a new tempo.
    ///
    /// Safe to call from any thread at any time, including while the pulse is
    /// running.  Out of range values are rejected and the old rate is kept.
    pub fn set_rate(&self, bpm: i64) -> Result<(), PulseError> {
        if !(MIN_BPM..=MAX_BPM).contains(&bpm) {
            return Err(PulseError::InvalidRate { bpm });
        }
        let old = self.shared.rate_bpm.swap(bpm as u32, Ordering::AcqRel);
        if old != bpm as u32 {
            debug!("pulse rate {} -> {} bpm", old, bpm);
        }
        Ok(())
    }

    pub fn rate(&self) -> u32 {
        self.shared.rate_bpm.load(Ordering::Acquire)
    }

    /// Current lifecycle state.  Blocks while a beat is being delivered.
    pub fn state(&self) -> PulseState {
        *lock_state(&self.shared.state)
    }

    /// How many times the observer has been called so far
    pub fn beats_emitted(&self) -> u64 {
        self.shared.beats.load(Ordering::Acquire)
    }

    /// How much longer than asked each wait between beats took, in ms.
    ///
    /// Only waits that ran to their timeout count, the time the observer spends
    /// on a beat is not part of it.
    pub fn lateness(&self) -> StreamTimeStat {
        self.shared.lateness.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Spawn the pulse thread.  Only an `Idle` engine can be started.
    pub fn start(&self) -> Result<(), PulseError> {
        let mut state = lock_state(&self.shared.state);
        if *state != PulseState::Idle {
            return Err(PulseError::AlreadyStarted { state: *state });
        }
        *state = PulseState::Running;

        let shared = Arc::clone(&self.shared);
        let observer = Arc::clone(&self.observer);
        let builder = ThreadBuilder::default()
            .name("Pulse Thread".to_string())
            .priority(ThreadPriority::Max);

        // The new thread blocks on the state lock until we return
        match builder.spawn(move |priority| {
            if let Err(e) = priority {
                debug!("pulse thread running at normal priority: {:?}", e);
            }
            run_pulse(shared, observer);
        }) {
            Ok(handle) => {
                *self.handle.lock().unwrap_or_else(PoisonError::into_inner) = Some(handle);
                info!("pulse started at {} bpm", self.rate());
                Ok(())
            }
            Err(e) => {
                *state = PulseState::Stopped;
                error!("pulse thread spawn failed: {}", e);
                Err(PulseError::ThreadSpawn(e.to_string()))
            }
        }
    }

    /// Ask the pulse to stop and cut the current wait short.
    ///
    /// Returns true if this call is the one that stopped a running pulse.  Calling
    /// it again, or on an engine that was never started, does nothing.  Waits for
    /// a beat that is already being delivered to finish; no beat starts after
    /// this returns.
    pub fn stop(&self) -> bool {
        let mut state = lock_state(&self.shared.state);
        match *state {
            PulseState::Running => {
                *state = PulseState::StopRequested;
                self.shared.wake.notify_all();
                info!("pulse stop requested after {} beats", self.beats_emitted());
                true
            }
            other => {
                trace!("pulse stop ignored in state {}", other);
                false
            }
        }
    }

    /// Wait for the pulse thread to finish.  Returns false if there was nothing to wait for.
    pub fn join(&self) -> bool {
        let mut slot = self.handle.lock().unwrap_or_else(PoisonError::into_inner);
        let handle = match slot.take() {
            Some(handle) => handle,
            None => return false,
        };
        if handle.thread().id() == thread::current().id() {
            // can't join ourselves, leave it for whoever drops the engine
            *slot = Some(handle);
            return false;
        }
        drop(slot);
        if handle.join().is_err() {
            error!("pulse thread panicked");
        }
        true
    }
}

impl Drop for PulseEngine {
    fn drop(&mut self) {
        self.stop();
        self.join();
    }
}

fn run_pulse(shared: Arc<PulseShared>, observer: Arc<dyn BeatObserver>) {
    let mut state = lock_state(&shared.state);
    while *state == PulseState::Running {
        let delay = beat_delay(shared.rate_bpm.load(Ordering::Acquire));

        let beat = shared.beats.load(Ordering::Acquire);
        trace!("beat {} delay {:?}", beat, delay);
        if panic::catch_unwind(AssertUnwindSafe(|| observer.on_beat())).is_err() {
            error!("beat observer panicked on beat {}, stopping pulse", beat);
            break;
        }
        shared.beats.fetch_add(1, Ordering::AcqRel);

        // Sleep, unless somebody changes the state first
        let wait_start = Instant::now();
        state = match shared
            .wake
            .wait_timeout_while(state, delay, |s| *s == PulseState::Running)
        {
            Ok((guard, timeout)) => {
                if timeout.timed_out() {
                    record_lateness(&shared, wait_start.elapsed().saturating_sub(delay));
                }
                guard
            }
            Err(poisoned) => poisoned.into_inner().0,
        };
    }
    *state = PulseState::Stopped;
    drop(state);

    info!("pulse stopped after {} beats", shared.beats.load(Ordering::Acquire));
    debug!(
        "beat lateness (ms): {}",
        *shared.lateness.lock().unwrap_or_else(PoisonError::into_inner)
    );
}

fn record_lateness(shared: &PulseShared, late: Duration) {
    shared
        .lateness
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .add_sample(late.as_secs_f64() * 1000.0);
}
