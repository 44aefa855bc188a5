//! Running statistic over a stream of timing samples
//!
//! The pulse loop feeds it the lateness of every beat (how much longer the
//! previous wait took than the delay that was asked for) so a jittery
//! scheduler shows up in the logs.  The window acts like an exponential
//! moving average, and the peak decays slowly once samples fall below it.
use std::fmt;

use serde::Deserialize;
use serde::Serialize;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StreamTimeStat {
    peak: f64,
    mean: f64,
    sigma: f64,
    window: u64,
    peak_decay: f64,
    count: u64,
}

impl StreamTimeStat {
    pub fn build(window_size: u64, peak_decay: f64) -> StreamTimeStat {
        StreamTimeStat {
            peak: 0.0,
            mean: 0.0,
            sigma: 0.0,
            window: window_size.max(1),
            peak_decay,
            count: 0,
        }
    }
    pub fn clear(&mut self) -> () {
        self.peak = 0.0;
        self.mean = 0.0;
        self.sigma = 0.0;
        self.count = 0;
    }
    pub fn get_peak(&self) -> f64 {
        self.peak
    }
    pub fn get_mean(&self) -> f64 {
        self.mean
    }
    pub fn get_sigma(&self) -> f64 {
        self.sigma
    }
    pub fn get_window(&self) -> u64 {
        self.window
    }
    pub fn get_count(&self) -> u64 {
        self.count
    }

    pub fn add_sample(&mut self, sample: f64) -> () {
        if sample > self.peak {
            self.peak = sample;
        } else {
            self.peak = (self.peak - self.peak_decay).max(sample);
        }
        let scale: f64 = (self.window as f64 - 1.0) / self.window as f64;
        self.mean = scale * self.mean + sample / self.window as f64;
        self.sigma = scale * self.sigma + (self.mean - sample).abs() / self.window as f64;
        self.count += 1;
    }
}

impl fmt::Display for StreamTimeStat {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{{ samples: {}, peak: {:.3}, mean: {:.3}, sigma: {:.3} window: {} }}",
            self.count, self.peak, self.mean, self.sigma, self.window
        )
    }
}
