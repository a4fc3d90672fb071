//! Work slot: one reusable in-flight request.
//!
//! A slot owns exactly one execution handle and shares (read-only) the
//! executable unit it was created from. It may hold at most one outstanding
//! submission; the state machine below rejects anything else.
//!
//! ```text
//! Idle --submit--> Submitted --await(ok)--> Completed --submit--> Submitted
//!                      |
//!                      +--await(failed)--> Idle
//! ```

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use tracing::{ debug, warn };

use crate::error::{ Result, RingflightError };
use crate::input::InputSource;
use crate::insights;
use crate::metrics::Metrics;
use crate::runtime::{ ExecutableUnit, ExecutionHandle, OutputBuffer };

/// Lifecycle of a slot's handle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotState {
    /// Never submitted, or the last wait failed
    Idle,
    /// Issued and not yet awaited
    Submitted,
    /// Last submission finished successfully; outputs are readable
    Completed,
}

impl fmt::Display for SlotState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SlotState::Idle => f.write_str("idle"),
            SlotState::Submitted => f.write_str("submitted"),
            SlotState::Completed => f.write_str("completed"),
        }
    }
}

pub struct WorkSlot<U: ExecutableUnit> {
    index: usize,
    unit_index: usize,
    unit: Arc<U>,
    handle: U::Handle,
    input_name: String,
    source: Box<dyn InputSource>,
    state: SlotState,
    submitted_at: Option<Instant>,
    submissions: u64,
    completions: u64,
    metrics: Arc<Metrics>,
}

impl<U: ExecutableUnit> WorkSlot<U> {
    /// Create the slot's handle on `unit`, bound to `input_name`.
    pub fn new(
        index: usize,
        unit_index: usize,
        unit: Arc<U>,
        input_name: impl Into<String>,
        source: Box<dyn InputSource>,
        metrics: Arc<Metrics>
    ) -> Result<Self> {
        let input_name = input_name.into();
        let handle = unit.create_handle(&input_name)?;
        Ok(Self {
            index,
            unit_index,
            unit,
            handle,
            input_name,
            source,
            state: SlotState::Idle,
            submitted_at: None,
            submissions: 0,
            completions: 0,
            metrics,
        })
    }

    /// Bind a fresh synthetic input and issue it without blocking.
    pub fn submit(&mut self) -> Result<()> {
        if self.state == SlotState::Submitted {
            return Err(RingflightError::SlotState {
                slot: self.index,
                expected: SlotState::Completed,
                actual: self.state,
            });
        }
        let _span = insights::submit_span(self.index);

        let blob = self.source.next_input()?;
        self.handle
            .bind_input(&self.input_name, blob)
            .map_err(|e| RingflightError::submit(self.index, e))?;
        self.handle.issue_async().map_err(|e| RingflightError::submit(self.index, e))?;

        self.state = SlotState::Submitted;
        self.submitted_at = Some(Instant::now());
        self.submissions += 1;
        self.metrics.record_submit();
        Ok(())
    }

    /// Block until the outstanding submission finishes.
    ///
    /// A non-success status is returned as `WaitFailed` and leaves the slot
    /// idle with no readable result.
    pub fn await_completion(&mut self) -> Result<()> {
        if self.state != SlotState::Submitted {
            return Err(RingflightError::SlotState {
                slot: self.index,
                expected: SlotState::Submitted,
                actual: self.state,
            });
        }
        let _span = insights::await_span(self.index);

        let status = self.handle.block_until_done();
        let latency = self.submitted_at.take().map(|t| t.elapsed()).unwrap_or_default();
        if !status.is_ok() {
            self.state = SlotState::Idle;
            self.metrics.record_failure();
            warn!(slot = self.index, %status, "request failed");
            return Err(RingflightError::WaitFailed { slot: self.index, status });
        }

        self.state = SlotState::Completed;
        self.completions += 1;
        self.metrics.record_completion(latency);
        Ok(())
    }

    /// Join an outstanding submission and discard its outcome. No metrics
    /// are recorded; the slot ends up Idle.
    pub(crate) fn abandon(&mut self) {
        if self.state != SlotState::Submitted {
            return;
        }
        let status = self.handle.block_until_done();
        debug!(slot = self.index, %status, "abandoned request joined");
        self.state = SlotState::Idle;
        self.submitted_at = None;
    }

    /// Synchronous submit-then-await
    pub fn infer(&mut self) -> Result<()> {
        self.submit()?;
        self.await_completion()
    }

    /// Named output of the last completed submission.
    pub fn fetch_result(&self, name: &str) -> Result<OutputBuffer> {
        if self.state != SlotState::Completed {
            debug!(slot = self.index, state = %self.state, "result requested before completion");
            return Err(RingflightError::NoResult { slot: self.index });
        }
        self.handle.fetch_output(name)
    }

    #[inline]
    pub fn index(&self) -> usize {
        self.index
    }

    /// Position of the shared unit this slot executes on
    #[inline]
    pub fn unit_index(&self) -> usize {
        self.unit_index
    }

    pub fn unit(&self) -> &Arc<U> {
        &self.unit
    }

    #[inline]
    pub fn state(&self) -> SlotState {
        self.state
    }

    pub fn submissions(&self) -> u64 {
        self.submissions
    }

    pub fn completions(&self) -> u64 {
        self.completions
    }
}

impl<U: ExecutableUnit> fmt::Debug for WorkSlot<U> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkSlot")
            .field("index", &self.index)
            .field("unit_index", &self.unit_index)
            .field("state", &self.state)
            .field("submissions", &self.submissions)
            .field("completions", &self.completions)
            .finish()
    }
}
