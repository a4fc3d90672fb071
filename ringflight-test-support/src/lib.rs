//! # ringflight-test-support
//!
//! Testing infrastructure for ringflight.
//!
//! ## Components
//!
//! - **RecordingUnit / RecordingHandle** - deterministic runtime that logs
//!   every issue and wait instead of executing anything
//! - **FaultPlan** - fail the k-th issue or the k-th wait of a run
//! - **RecordingLoader** - `UnitLoader` handing out recording units
//! - **RingChecker** - ordering and balance checks over an event log

pub mod fault;
pub mod recording;
pub mod verify;

pub use fault::FaultPlan;
pub use recording::{ Event, EventKind, EventLog, RecordingHandle, RecordingLoader, RecordingUnit };
pub use verify::RingChecker;
