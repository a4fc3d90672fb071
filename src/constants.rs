//! Ringflight defaults
//!
//! Core constants shared by the scheduler, the input generator and the CLI.

use std::time::Duration;

/// Default number of in-flight requests (ring capacity)
pub const DEFAULT_IN_FLIGHT: usize = 4;

/// Default wall-clock run length
pub const DEFAULT_RUN_DURATION: Duration = Duration::from_secs(30);

/// Synthetic frame geometry
pub const INPUT_WIDTH: usize = 224;
pub const INPUT_HEIGHT: usize = 224;
pub const INPUT_CHANNELS: usize = 3;

/// Range the ROI crop ratios are drawn from (per axis)
pub const ROI_RATIO_MIN: f64 = 0.05;
pub const ROI_RATIO_MAX: f64 = 0.5;

/// Device the simulated runtime accepts
pub const DEFAULT_DEVICE: &str = "CPU";

/// Latency histogram bounds (microseconds, 3 significant figures)
pub const LATENCY_MAX_US: u64 = 60 * 1_000_000;
pub const LATENCY_SIGFIGS: u8 = 3;
