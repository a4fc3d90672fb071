//! Recording runtime: logs every issue and wait, executes nothing.
//!
//! Handles are numbered in creation order, and `SlotRing` creates its slots
//! in ring order, so handle id `i` is slot `i` of the most recent ring
//! built on a fresh log.

use std::path::{ Path, PathBuf };
use std::sync::atomic::{ AtomicUsize, Ordering };
use std::sync::Arc;

use parking_lot::Mutex;
use ringflight::{
    ExecutableUnit,
    ExecutionHandle,
    InputBlob,
    OutputBuffer,
    Result,
    RingflightError,
    StatusCode,
    UnitLoader,
};

use crate::fault::FaultPlan;

pub const INPUT_NAME: &str = "data";
pub const OUTPUT_NAME: &str = "prob";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Submit,
    Wait(StatusCode),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Event {
    pub kind: EventKind,
    pub handle: usize,
    pub unit: usize,
}

impl Event {
    pub fn is_submit(&self) -> bool {
        self.kind == EventKind::Submit
    }

    pub fn is_wait(&self) -> bool {
        matches!(self.kind, EventKind::Wait(_))
    }
}

#[derive(Default)]
struct LogInner {
    events: Vec<Event>,
    handles: usize,
    issues: u64,
    waits: u64,
}

/// Shared, ordered record of everything the runtime was asked to do
#[derive(Default)]
pub struct EventLog {
    inner: Mutex<LogInner>,
}

impl EventLog {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn register_handle(&self) -> usize {
        let mut inner = self.inner.lock();
        let id = inner.handles;
        inner.handles += 1;
        id
    }

    /// Returns the 1-based issue number
    fn next_issue(&self) -> u64 {
        let mut inner = self.inner.lock();
        inner.issues += 1;
        inner.issues
    }

    fn record_submit(&self, handle: usize, unit: usize) {
        self.inner.lock().events.push(Event { kind: EventKind::Submit, handle, unit });
    }

    /// Records the wait and returns the status the fault plan assigns it
    fn record_wait(&self, handle: usize, unit: usize, plan: &FaultPlan) -> StatusCode {
        let mut inner = self.inner.lock();
        inner.waits += 1;
        let status = plan.wait_status(inner.waits);
        inner.events.push(Event { kind: EventKind::Wait(status), handle, unit });
        status
    }

    pub fn events(&self) -> Vec<Event> {
        self.inner.lock().events.clone()
    }

    pub fn submits(&self) -> usize {
        self.inner.lock().events.iter().filter(|e| e.is_submit()).count()
    }

    pub fn waits(&self) -> usize {
        self.inner.lock().events.iter().filter(|e| e.is_wait()).count()
    }

    pub fn handles(&self) -> usize {
        self.inner.lock().handles
    }
}

/// Executable unit whose handles record instead of execute
pub struct RecordingUnit {
    id: usize,
    log: Arc<EventLog>,
    faults: FaultPlan,
}

impl RecordingUnit {
    pub fn new(id: usize, log: Arc<EventLog>) -> Self {
        Self { id, log, faults: FaultPlan::none() }
    }

    pub fn with_faults(mut self, faults: FaultPlan) -> Self {
        self.faults = faults;
        self
    }

    pub fn id(&self) -> usize {
        self.id
    }

    /// `count` units sharing one log and fault plan, ready for a ring
    pub fn many(count: usize, log: &Arc<EventLog>, faults: FaultPlan) -> Vec<Arc<Self>> {
        (0..count)
            .map(|id| Arc::new(Self::new(id, log.clone()).with_faults(faults)))
            .collect()
    }
}

impl ExecutableUnit for RecordingUnit {
    type Handle = RecordingHandle;

    fn create_handle(&self, input_name: &str) -> Result<RecordingHandle> {
        if input_name != INPUT_NAME {
            return Err(RingflightError::runtime(format!("no input named {input_name}")));
        }
        Ok(RecordingHandle {
            id: self.log.register_handle(),
            unit: self.id,
            log: self.log.clone(),
            faults: self.faults,
            bound: false,
            pending: false,
            generation: 0,
        })
    }

    fn input_names(&self) -> Vec<&str> {
        vec![INPUT_NAME]
    }

    fn output_names(&self) -> Vec<&str> {
        vec![OUTPUT_NAME]
    }
}

pub struct RecordingHandle {
    id: usize,
    unit: usize,
    log: Arc<EventLog>,
    faults: FaultPlan,
    bound: bool,
    pending: bool,
    generation: u64,
}

impl RecordingHandle {
    pub fn id(&self) -> usize {
        self.id
    }
}

impl ExecutionHandle for RecordingHandle {
    fn bind_input(&mut self, name: &str, _blob: InputBlob) -> Result<()> {
        if name != INPUT_NAME {
            return Err(RingflightError::runtime(format!("no input named {name}")));
        }
        if self.pending {
            return Err(RingflightError::runtime("bind while request is pending"));
        }
        self.bound = true;
        Ok(())
    }

    fn issue_async(&mut self) -> Result<()> {
        if !self.bound {
            return Err(RingflightError::runtime("issue without bound input"));
        }
        if self.pending {
            return Err(RingflightError::runtime("issue while request is pending"));
        }
        if self.faults.issue_fails(self.log.next_issue()) {
            return Err(RingflightError::runtime("injected issue failure"));
        }
        self.log.record_submit(self.id, self.unit);
        self.pending = true;
        Ok(())
    }

    fn block_until_done(&mut self) -> StatusCode {
        if !self.pending {
            return StatusCode::InferNotStarted;
        }
        self.pending = false;
        let status = self.log.record_wait(self.id, self.unit, &self.faults);
        if status.is_ok() {
            self.generation += 1;
        }
        status
    }

    fn fetch_output(&self, name: &str) -> Result<OutputBuffer> {
        if name != OUTPUT_NAME {
            return Err(RingflightError::runtime(format!("no output named {name}")));
        }
        Ok(OutputBuffer::new(vec![1, 2], vec![self.id as f32, self.generation as f32]))
    }
}

/// Loader that hands out recording units, failing on one chosen path
pub struct RecordingLoader {
    log: Arc<EventLog>,
    faults: FaultPlan,
    loaded: AtomicUsize,
    reject: Option<PathBuf>,
}

impl RecordingLoader {
    pub fn new(log: Arc<EventLog>) -> Self {
        Self { log, faults: FaultPlan::none(), loaded: AtomicUsize::new(0), reject: None }
    }

    pub fn with_faults(mut self, faults: FaultPlan) -> Self {
        self.faults = faults;
        self
    }

    pub fn rejecting(mut self, path: impl Into<PathBuf>) -> Self {
        self.reject = Some(path.into());
        self
    }

    pub fn loaded(&self) -> usize {
        self.loaded.load(Ordering::Relaxed)
    }
}

impl UnitLoader for RecordingLoader {
    type Unit = RecordingUnit;

    fn load_executable_unit(&self, path: &Path) -> Result<RecordingUnit> {
        if self.reject.as_deref() == Some(path) {
            return Err(RingflightError::load(path, "rejected by test loader"));
        }
        let id = self.loaded.fetch_add(1, Ordering::Relaxed);
        Ok(RecordingUnit::new(id, self.log.clone()).with_faults(self.faults))
    }
}
