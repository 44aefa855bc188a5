//! Capability the pulse loop calls on every beat.

/// Anything that wants to hear the beat.
///
/// `on_beat` is called synchronously from the pulse thread, and the next beat's
/// delay does not start until it returns.  Whatever the observer wants to happen
/// "on the beat" (light, sound) should be done before returning, with no waiting
/// in between.
///
/// The pulse thread holds the engine's state lock while this runs, so an
/// observer must not call back into the engine that is driving it.  It also
/// means `stop()` and `state()` on the engine wait for the beat in progress:
/// keep `on_beat` bounded (one short tone plus a device drain), never block on
/// anything that can stall indefinitely.
pub trait BeatObserver: Send + Sync {
    fn on_beat(&self);
}
