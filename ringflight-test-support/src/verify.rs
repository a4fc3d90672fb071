//! Ordering checks over a recorded event trace.
//!
//! A correct ring run satisfies, for capacity N:
//! - every submit is eventually awaited (balanced)
//! - each handle alternates submit, wait, submit, wait
//! - waits happen in submission order (k-th wait joins the k-th submit)
//! - at most N requests are outstanding, and at most N-1 right after a wait

use std::collections::HashMap;

use crate::recording::{ Event, EventKind };

/// Checks a trace recorded by [`RecordingUnit`](crate::RecordingUnit)s.
///
/// Every check returns a description of the first violation found.
pub struct RingChecker<'a> {
    events: &'a [Event],
    capacity: usize,
}

impl<'a> RingChecker<'a> {
    pub fn new(events: &'a [Event], capacity: usize) -> Self {
        Self { events, capacity }
    }

    /// Run every check
    pub fn check_all(&self) -> Result<(), String> {
        self.check_balanced()?;
        self.check_alternation()?;
        self.check_fifo()?;
        self.check_outstanding()
    }

    pub fn submits(&self) -> usize {
        self.events
            .iter()
            .filter(|e| e.is_submit())
            .count()
    }

    pub fn waits(&self) -> usize {
        self.events
            .iter()
            .filter(|e| e.is_wait())
            .count()
    }

    pub fn check_balanced(&self) -> Result<(), String> {
        let (submits, waits) = (self.submits(), self.waits());
        if submits != waits {
            return Err(format!("{submits} submits but {waits} waits"));
        }
        Ok(())
    }

    pub fn check_alternation(&self) -> Result<(), String> {
        let mut pending: HashMap<usize, bool> = HashMap::new();
        for (i, event) in self.events.iter().enumerate() {
            let outstanding = pending.entry(event.handle).or_insert(false);
            match event.kind {
                EventKind::Submit if *outstanding => {
                    return Err(format!("event {i}: handle {} submitted twice", event.handle));
                }
                EventKind::Wait(_) if !*outstanding => {
                    return Err(format!("event {i}: handle {} awaited with nothing pending", event.handle));
                }
                EventKind::Submit => {
                    *outstanding = true;
                }
                EventKind::Wait(_) => {
                    *outstanding = false;
                }
            }
        }
        Ok(())
    }

    /// The k-th wait must join the handle of the k-th submit
    pub fn check_fifo(&self) -> Result<(), String> {
        let submitted: Vec<usize> = self.events
            .iter()
            .filter(|e| e.is_submit())
            .map(|e| e.handle)
            .collect();
        let awaited = self.events.iter().filter(|e| e.is_wait());
        for (k, wait) in awaited.enumerate() {
            match submitted.get(k) {
                Some(&handle) if handle == wait.handle => {}
                Some(&handle) => {
                    return Err(format!("wait {k} joined handle {} but submit {k} was handle {handle}", wait.handle));
                }
                None => {
                    return Err(format!("wait {k} has no matching submit"));
                }
            }
        }
        Ok(())
    }

    pub fn check_outstanding(&self) -> Result<(), String> {
        let mut outstanding = 0usize;
        for (i, event) in self.events.iter().enumerate() {
            match event.kind {
                EventKind::Submit => {
                    outstanding += 1;
                    if outstanding > self.capacity {
                        return Err(format!("event {i}: {outstanding} outstanding exceeds capacity {}", self.capacity));
                    }
                }
                EventKind::Wait(_) => {
                    outstanding = outstanding.saturating_sub(1);
                    if outstanding >= self.capacity {
                        return Err(format!("event {i}: {outstanding} still outstanding after a wait"));
                    }
                }
            }
        }
        Ok(())
    }

    /// Highest number of simultaneously outstanding requests
    pub fn max_outstanding(&self) -> usize {
        let mut outstanding = 0usize;
        let mut max = 0;
        for event in self.events {
            if event.is_submit() {
                outstanding += 1;
                max = max.max(outstanding);
            } else {
                outstanding = outstanding.saturating_sub(1);
            }
        }
        max
    }

    /// Submits per handle id
    pub fn submits_per_handle(&self) -> HashMap<usize, usize> {
        let mut counts = HashMap::new();
        for event in self.events.iter().filter(|e| e.is_submit()) {
            *counts.entry(event.handle).or_insert(0) += 1;
        }
        counts
    }

    /// First failed wait, if any
    pub fn first_failure(&self) -> Option<(usize, &'a Event)> {
        self.events
            .iter()
            .enumerate()
            .find(|(_, e)| matches!(e.kind, EventKind::Wait(status) if !status.is_ok()))
    }
}
