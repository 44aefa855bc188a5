//! Pieces shared by the pulse engine, the display and the demo programs.
pub mod box_error;
pub mod config;
pub mod stream_time_stat;
