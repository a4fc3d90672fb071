//! # ringflight
//!
//! Bounded in-flight request pipeline for asynchronous inference runtimes.
//!
//! A [`SlotRing`] owns N reusable [`WorkSlot`]s. After a priming round trip
//! it keeps N-1 requests outstanding, issuing the next slot and joining the
//! oldest one each cycle until a deadline, then drains whatever is still in
//! flight. Nothing is retried: the first failure aborts the run.
//!
//! - `runtime` - traits the ring drives, plus a simulated runtime
//! - `input` - synthetic dense frames with random ROI crops
//! - `slot` - one reusable request with an Idle/Submitted/Completed state
//! - `scheduler` - the ring state machine (Priming, Steady, Draining)
//! - `pipeline` - load units, build the ring, run, report

pub mod config;
pub mod constants;
pub mod error;
pub mod input;
pub mod insights;
pub mod metrics;
pub mod pipeline;
pub mod runtime;
pub mod scheduler;
pub mod slot;

pub use config::PipelineConfig;
pub use error::{ Result, RingflightError };
pub use input::{ InputBlob, InputSource, RandomInput };
pub use insights::init_logging;
pub use metrics::{ LatencySummary, Metrics, MetricsSnapshot };
pub use pipeline::{ run_pipeline, run_with_loader };
pub use runtime::{ ExecutableUnit, ExecutionHandle, OutputBuffer, StatusCode, UnitLoader };
pub use scheduler::{ Deadline, Phase, RingConfig, RunReport, SlotRing };
pub use slot::{ SlotState, WorkSlot };
