//! Slot ring scheduler.
//!
//! Drives a fixed ring of N work slots so that N-1 requests stay in flight
//! while the controller alternates between issuing the next request and
//! joining the oldest one.
//!
//! ```text
//!            submit ──►                       ◄── await (oldest)
//! ┌────┬────┬────┬────┐
//! │ s0 │ s1 │ s2 │ s3 │   N = 4, pending = 3 between cycles
//! └────┴────┴────┴────┘
//! ```
//!
//! Phases: `Priming` (slot 0 submit + await), `Steady` (until the deadline,
//! checked only between cycles), `Draining` (join exactly the pending
//! submissions, oldest first). Any slot error aborts the run.

use std::fmt;
use std::sync::Arc;
use std::time::{ Duration, Instant };

use tracing::{ debug, error, info };

use crate::constants::{ INPUT_CHANNELS, INPUT_HEIGHT, INPUT_WIDTH };
use crate::error::{ Result, RingflightError };
use crate::input::{ InputSource, RandomInput };
use crate::metrics::{ LatencySummary, Metrics };
use crate::runtime::ExecutableUnit;
use crate::slot::{ SlotState, WorkSlot };

/// When the steady phase stops issuing new work
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Deadline {
    /// Wall-clock time since the steady phase started (after priming)
    After(Duration),
    /// Number of steady-state cycles
    Cycles(u64),
}

impl Deadline {
    #[inline]
    fn reached(&self, started: Instant, cycles: u64) -> bool {
        match *self {
            Deadline::After(limit) => started.elapsed() >= limit,
            Deadline::Cycles(limit) => cycles >= limit,
        }
    }
}

/// Scheduler state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Ready,
    Priming,
    Steady,
    Draining,
    Finished,
    Aborted,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Ready => "ready",
            Phase::Priming => "priming",
            Phase::Steady => "steady",
            Phase::Draining => "draining",
            Phase::Finished => "finished",
            Phase::Aborted => "aborted",
        };
        f.write_str(name)
    }
}

/// Submit position, oldest pending position and how many are pending.
///
/// Invariant: `submit == (wait + pending) % capacity`, `pending < capacity`
/// between cycles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cursor {
    capacity: usize,
    submit: usize,
    wait: usize,
    pending: usize,
}

impl Cursor {
    fn new(capacity: usize) -> Self {
        Self { capacity, submit: 0, wait: 0, pending: 0 }
    }

    #[inline]
    pub fn submit_index(&self) -> usize {
        self.submit
    }

    #[inline]
    pub fn wait_index(&self) -> usize {
        self.wait
    }

    /// Submitted but not yet awaited
    #[inline]
    pub fn pending(&self) -> usize {
        self.pending
    }

    #[inline]
    fn is_full(&self) -> bool {
        self.pending == self.capacity
    }

    #[inline]
    fn advance_submit(&mut self) {
        debug_assert!(self.pending < self.capacity);
        self.submit = (self.submit + 1) % self.capacity;
        self.pending += 1;
    }

    #[inline]
    fn advance_wait(&mut self) {
        debug_assert!(self.pending > 0);
        self.wait = (self.wait + 1) % self.capacity;
        self.pending -= 1;
    }
}

/// Construction parameters for a [`SlotRing`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RingConfig {
    /// Ring capacity N
    pub in_flight: usize,
    /// Input every slot binds its synthetic data to
    pub input_name: String,
    /// Frame geometry (width, height, channels)
    pub frame: (usize, usize, usize),
    /// Base seed; slot i uses `seed + i`
    pub seed: Option<u64>,
}

impl RingConfig {
    pub fn new(in_flight: usize, input_name: impl Into<String>) -> Self {
        Self {
            in_flight,
            input_name: input_name.into(),
            frame: (INPUT_WIDTH, INPUT_HEIGHT, INPUT_CHANNELS),
            seed: None,
        }
    }

    pub fn with_frame(mut self, width: usize, height: usize, channels: usize) -> Self {
        self.frame = (width, height, channels);
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
}

/// Outcome of one [`SlotRing::run`]
#[derive(Debug, Clone)]
pub struct RunReport {
    pub in_flight: usize,
    pub units: usize,
    pub submitted: u64,
    pub completed: u64,
    pub steady_cycles: u64,
    pub elapsed: Duration,
    /// Completions per slot, by ring position
    pub per_slot: Vec<u64>,
    pub latency: LatencySummary,
}

impl RunReport {
    /// Completed requests per second
    pub fn throughput(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            (self.completed as f64) / secs
        } else {
            0.0
        }
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "in-flight requests: {}", self.in_flight)?;
        writeln!(f, "executable units:   {}", self.units)?;
        writeln!(f, "submitted:          {}", self.submitted)?;
        writeln!(f, "completed:          {}", self.completed)?;
        writeln!(f, "steady cycles:      {}", self.steady_cycles)?;
        writeln!(f, "elapsed:            {:.3}s", self.elapsed.as_secs_f64())?;
        writeln!(f, "throughput:         {:.2} req/s", self.throughput())?;
        write!(f, "latency:            {}", self.latency)
    }
}

pub struct SlotRing<U: ExecutableUnit> {
    slots: Vec<WorkSlot<U>>,
    units: usize,
    cursor: Cursor,
    phase: Phase,
    steady_cycles: u64,
    metrics: Arc<Metrics>,
}

impl<U: ExecutableUnit> SlotRing<U> {
    /// Build N slots over `units`, each generating random frames.
    pub fn new(units: &[Arc<U>], config: &RingConfig) -> Result<Self> {
        let (width, height, channels) = config.frame;
        Self::with_sources(units, config, |index| {
            let source = match config.seed {
                Some(seed) => RandomInput::with_seed(width, height, channels, seed.wrapping_add(index as u64))?,
                None => RandomInput::new(width, height, channels)?,
            };
            Ok(Box::new(source) as Box<dyn InputSource>)
        })
    }

    /// Build N slots; slot `i` executes on `units[i % units.len()]` and pulls
    /// inputs from `make_source(i)`.
    pub fn with_sources<F>(units: &[Arc<U>], config: &RingConfig, mut make_source: F) -> Result<Self>
        where F: FnMut(usize) -> Result<Box<dyn InputSource>>
    {
        if config.in_flight == 0 {
            return Err(RingflightError::config("In-flight request count must be at least 1"));
        }
        if units.is_empty() {
            return Err(RingflightError::config("At least one executable unit is required"));
        }
        if config.input_name.is_empty() {
            return Err(RingflightError::config("Input name must not be empty"));
        }

        let metrics = Arc::new(Metrics::new()?);
        let mut slots = Vec::with_capacity(config.in_flight);
        for index in 0..config.in_flight {
            let unit_index = index % units.len();
            slots.push(
                WorkSlot::new(
                    index,
                    unit_index,
                    units[unit_index].clone(),
                    config.input_name.clone(),
                    make_source(index)?,
                    metrics.clone()
                )?
            );
        }
        debug!(slots = slots.len(), units = units.len(), input = %config.input_name, "slot ring built");

        Ok(Self {
            slots,
            units: units.len(),
            cursor: Cursor::new(config.in_flight),
            phase: Phase::Ready,
            steady_cycles: 0,
            metrics,
        })
    }

    /// Prime, run until `deadline`, then drain.
    ///
    /// On error the ring is left `Aborted` and cannot be run again.
    pub fn run(&mut self, deadline: Deadline) -> Result<RunReport> {
        if self.phase == Phase::Aborted {
            return Err(RingflightError::runtime("slot ring was aborted by an earlier failure"));
        }
        let started = Instant::now();
        match self.drive(deadline) {
            Ok(()) => {
                self.phase = Phase::Finished;
                let report = self.report(started.elapsed());
                info!(
                    completed = report.completed,
                    cycles = report.steady_cycles,
                    throughput = %format!("{:.2}", report.throughput()),
                    "run finished"
                );
                Ok(report)
            }
            Err(e) => {
                error!(phase = %self.phase, slot = ?e.slot(), error = %e, "run aborted");
                self.abandon();
                self.phase = Phase::Aborted;
                Err(e)
            }
        }
    }

    fn drive(&mut self, deadline: Deadline) -> Result<()> {
        self.enter(Phase::Priming);
        self.prime()?;

        // The steady window starts after the warm-up round trip
        self.enter(Phase::Steady);
        let steady_started = Instant::now();
        while !deadline.reached(steady_started, self.steady_cycles) {
            self.cycle()?;
        }

        self.enter(Phase::Draining);
        self.drain()
    }

    fn enter(&mut self, phase: Phase) {
        debug!(from = %self.phase, to = %phase, pending = self.cursor.pending, "phase change");
        self.phase = phase;
    }

    /// Slot 0 round trip; validates the execution path before pipelining.
    fn prime(&mut self) -> Result<()> {
        let slot = &mut self.slots[self.cursor.submit];
        slot.submit()?;
        slot.await_completion()
    }

    /// Issue the next slot, then join the oldest once N are outstanding.
    fn cycle(&mut self) -> Result<()> {
        let next = self.cursor.submit;
        debug_assert_ne!(self.slots[next].state(), SlotState::Submitted);
        self.slots[next].submit()?;
        self.cursor.advance_submit();

        if self.cursor.is_full() {
            self.slots[self.cursor.wait].await_completion()?;
            self.cursor.advance_wait();
        }
        self.steady_cycles += 1;
        Ok(())
    }

    /// Join every pending submission, oldest first.
    fn drain(&mut self) -> Result<()> {
        while self.cursor.pending > 0 {
            self.slots[self.cursor.wait].await_completion()?;
            self.cursor.advance_wait();
        }
        Ok(())
    }

    /// Join every still-outstanding slot after a failure without issuing
    /// anything new. Outcomes are discarded.
    fn abandon(&mut self) {
        let capacity = self.slots.len();
        for offset in 0..self.cursor.pending {
            self.slots[(self.cursor.wait + offset) % capacity].abandon();
        }
        self.cursor = Cursor::new(capacity);
    }

    fn report(&self, elapsed: Duration) -> RunReport {
        let snapshot = self.metrics.snapshot();
        RunReport {
            in_flight: self.slots.len(),
            units: self.units,
            submitted: snapshot.submitted,
            completed: snapshot.completed,
            steady_cycles: self.steady_cycles,
            elapsed,
            per_slot: self.slots
                .iter()
                .map(|s| s.completions())
                .collect(),
            latency: self.metrics.latency(),
        }
    }

    pub fn slots(&self) -> &[WorkSlot<U>] {
        &self.slots
    }

    pub fn slot(&self, index: usize) -> Option<&WorkSlot<U>> {
        self.slots.get(index)
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn cursor(&self) -> Cursor {
        self.cursor
    }

    pub fn metrics(&self) -> &Arc<Metrics> {
        &self.metrics
    }
}
