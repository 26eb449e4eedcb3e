//! Collapse bursts of suspend requests into one suspended window.
//!
//! A terminal resize (or a window drag in a GUI front end) fires many
//! notifications in quick succession. Each [`SuspendDebouncer::trigger`]
//! suspends the sink and schedules a resume; only the resume scheduled by
//! the most recent trigger actually fires, once `quiet` has passed without
//! another trigger.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use super::sink::EventSink;

/// Debounced suspend/resume driver for an [`EventSink`].
#[derive(Clone)]
pub struct SuspendDebouncer {
    sink: EventSink,
    quiet: Duration,
    generation: Arc<Mutex<u64>>,
}

impl SuspendDebouncer {
    pub fn new(sink: EventSink, quiet: Duration) -> Self {
        Self {
            sink,
            quiet,
            generation: Arc::new(Mutex::new(0)),
        }
    }

    pub const fn quiet(&self) -> Duration {
        self.quiet
    }

    /// Suspend now and (re)arm the delayed resume.
    ///
    /// Must be called from within a tokio runtime.
    pub fn trigger(&self) {
        let armed = {
            let mut generation = self.generation.lock().unwrap_or_else(PoisonError::into_inner);
            *generation += 1;
            self.sink.suspend();
            *generation
        };

        let sink = self.sink.clone();
        let generation = Arc::clone(&self.generation);
        let quiet = self.quiet;
        tokio::spawn(async move {
            tokio::time::sleep(quiet).await;
            let current = generation.lock().unwrap_or_else(PoisonError::into_inner);
            if *current == armed {
                sink.resume();
            }
        });
    }

    /// Cancel any pending resume and resume immediately.
    pub fn flush(&self) {
        let mut generation = self.generation.lock().unwrap_or_else(PoisonError::into_inner);
        *generation += 1;
        self.sink.resume();
    }
}
