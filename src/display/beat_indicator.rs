//! Rotating "which beat of the measure is lit" state
//!
//! One light per position in the measure.  Every beat turns the previous
//! position off and the current one on, then moves the current index forward,
//! wrapping from the last position to the first.
use std::fmt;

use serde::{Deserialize, Serialize};
use simple_error::bail;

use crate::common::box_error::BoxError;

pub const DEFAULT_BEAT_COUNT: usize = 4;

/// What changed on one beat, ready to hand to whatever draws the lights.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct BeatMessage {
    pub lit: usize,
    pub previous: usize,
    pub beat_count: usize,
}

#[derive(Debug, Clone)]
pub struct BeatIndicatorState {
    beat_count: usize,
    current_index: usize,
    lights: Vec<bool>,
}

impl BeatIndicatorState {
    pub fn new(beat_count: usize) -> Result<BeatIndicatorState, BoxError> {
        if beat_count < 2 {
            bail!("beat count must be at least 2, got {}", beat_count);
        }
        Ok(BeatIndicatorState {
            beat_count,
            current_index: 0,
            lights: vec![false; beat_count],
        })
    }

    pub fn beat_count(&self) -> usize {
        self.beat_count
    }

    /// The position the next beat will light
    pub fn current_index(&self) -> usize {
        self.current_index
    }

    pub fn is_active(&self, position: usize) -> bool {
        self.lights.get(position).copied().unwrap_or(false)
    }

    pub fn active_positions(&self) -> Vec<usize> {
        self.lights
            .iter()
            .enumerate()
            .filter_map(|(i, lit)| if *lit { Some(i) } else { None })
            .collect()
    }

    /// Move the light one position.  Returns what changed.
    pub fn advance(&mut self) -> BeatMessage {
        let previous = if self.current_index == 0 {
            self.beat_count - 1
        } else {
            self.current_index - 1
        };
        let lit = self.current_index;
        self.lights[previous] = false;
        self.lights[lit] = true;
        self.current_index = (self.current_index + 1) % self.beat_count;
        BeatMessage {
            lit,
            previous,
            beat_count: self.beat_count,
        }
    }

    /// Back to the first position with every light off
    pub fn reset(&mut self) {
        self.current_index = 0;
        self.lights.iter_mut().for_each(|l| *l = false);
    }
}

impl fmt::Display for BeatIndicatorState {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for lit in &self.lights {
            write!(f, "{}", if *lit { "[#]" } else { "[ ]" })?;
        }
        Ok(())
    }
}
