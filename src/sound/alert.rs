//! Fallback "beep" for when no tone device can be opened
use std::io::{self, Write};

use log::debug;

#[cfg(test)]
use mockall::automock;

#[cfg_attr(test, automock)]
pub trait AlertSound: Send {
    fn beep(&mut self);
}

/// Rings the terminal bell by writing BEL to stderr
#[derive(Debug, Default)]
pub struct TerminalBell;

impl AlertSound for TerminalBell {
    fn beep(&mut self) {
        let mut err = io::stderr().lock();
        if let Err(e) = err.write_all(b"\x07").and_then(|_| err.flush()) {
            debug!("terminal bell failed: {}", e);
        }
    }
}
