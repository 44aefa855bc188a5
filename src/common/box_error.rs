//! Boxed error type used at every fallible seam that is not a typed driver error.
//!
//! The `Send + Sync` bounds let errors cross from the pulse thread and the
//! demo's render thread back into `main`.
pub type BoxError = std::boxed::Box<
    dyn std::error::Error // must implement Error to satisfy ?
        + std::marker::Send // needed for threads
        + std::marker::Sync, // needed for threads
>;
