// src/timing.rs

use std::time::{Duration, Instant};

/// A simple RAII timer for the `--timing` report.
/// When created, it records the start time. When it goes out of scope (is dropped),
/// it prints the elapsed time, but only if timing was requested.
#[derive(Debug)]
pub struct BlockTimer {
    name: String,
    start: Instant,
    enabled: bool,
}

impl BlockTimer {
    /// Creates a new timer and starts it immediately.
    pub fn new(name: impl Into<String>, enabled: bool) -> Self {
        Self {
            name: name.into(),
            start: Instant::now(),
            enabled,
        }
    }

    /// Time since the timer started.
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// Renames the report, e.g. once it is known whether a call failed.
    pub fn rename(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }
}

impl Drop for BlockTimer {
    fn drop(&mut self) {
        if self.enabled {
            println!("timing {}: {} µs", self.name, self.elapsed().as_micros());
        }
    }
}
