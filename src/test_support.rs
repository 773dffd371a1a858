//! In-crate test harness: a manual clock and a recording sink, the direct
//! analogue of the teacher's integration-test fixtures but reimplemented
//! against this crate's [`TimerService`]/[`EventSink`] traits instead of a
//! real uinput device (spec.md §1 excludes the real synthetic-device test
//! harness from scope).

use std::collections::HashMap;

use crate::sink::{EventSink, SinkEvent};
use crate::timer::{TimerHandle, TimerService};

/// A [`TimerService`] driven entirely by test code: `advance` moves the
/// clock forward and returns the handles whose deadline has passed, in the
/// order they were scheduled.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: u64,
    next_id: u64,
    deadlines: HashMap<TimerHandle, u64>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advances the clock by `millis` and returns every handle whose
    /// deadline is now due, ordered by deadline then insertion.
    pub fn advance(&mut self, millis: u64) -> Vec<TimerHandle> {
        self.now += millis;
        let mut due: Vec<(u64, TimerHandle)> = self
            .deadlines
            .iter()
            .filter(|(_, &deadline)| deadline <= self.now)
            .map(|(&handle, &deadline)| (deadline, handle))
            .collect();
        due.sort_by_key(|&(deadline, handle)| (deadline, handle.0));
        for (_, handle) in &due {
            self.deadlines.remove(handle);
        }
        due.into_iter().map(|(_, handle)| handle).collect()
    }
}

impl TimerService for ManualClock {
    fn now(&self) -> u64 {
        self.now
    }

    fn schedule(&mut self, millis: u64) -> TimerHandle {
        self.next_id += 1;
        let handle = TimerHandle(self.next_id);
        self.deadlines.insert(handle, self.now + millis);
        handle
    }

    fn cancel(&mut self, handle: TimerHandle) {
        self.deadlines.remove(&handle);
    }
}

/// An [`EventSink`] that just records every event in emission order, for
/// test assertions.
#[derive(Debug, Default)]
pub struct RecordingSink {
    pub events: Vec<SinkEvent>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }
}

impl EventSink for RecordingSink {
    fn handle(&mut self, event: SinkEvent) {
        self.events.push(event);
    }
}
