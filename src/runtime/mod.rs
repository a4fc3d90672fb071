//! Runtime boundary.
//!
//! The scheduler only needs four primitives from an inference runtime:
//! bind an input, issue a request without blocking, block until it is
//! done, and read an output back. They are expressed here as traits so the
//! ring can drive the bundled simulated runtime ([`sim`]) or any other
//! implementation.
//!
//! - `UnitLoader` - turns a model path into an `ExecutableUnit`
//! - `ExecutableUnit` - compiled model, shared read-only between slots
//! - `ExecutionHandle` - one stateful request, owned by exactly one slot

pub mod sim;

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use crate::error::Result;
use crate::input::InputBlob;

/// Completion status reported by `ExecutionHandle::block_until_done`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusCode {
    Ok,
    GeneralError,
    NotImplemented,
    ParameterMismatch,
    NotFound,
    ResultNotReady,
    RequestBusy,
    InferNotStarted,
}

impl StatusCode {
    #[inline]
    pub fn is_ok(self) -> bool {
        self == StatusCode::Ok
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StatusCode::Ok => "OK",
            StatusCode::GeneralError => "GENERAL_ERROR",
            StatusCode::NotImplemented => "NOT_IMPLEMENTED",
            StatusCode::ParameterMismatch => "PARAMETER_MISMATCH",
            StatusCode::NotFound => "NOT_FOUND",
            StatusCode::ResultNotReady => "RESULT_NOT_READY",
            StatusCode::RequestBusy => "REQUEST_BUSY",
            StatusCode::InferNotStarted => "INFER_NOT_STARTED",
        };
        f.write_str(name)
    }
}

/// Element precision of a tensor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Precision {
    U8,
    Fp32,
}

/// Memory layout of a 4D tensor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layout {
    Nchw,
    Nhwc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResizeAlgorithm {
    None,
    Bilinear,
    Area,
}

/// Channel order of the pixels fed to the network
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorFormat {
    Raw,
    Rgb,
    Bgr,
}

/// Input pre-processing applied by the runtime before execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PreProcess {
    pub resize: ResizeAlgorithm,
    pub color: ColorFormat,
    pub layout: Layout,
    pub input_precision: Precision,
    pub output_precision: Precision,
}

impl Default for PreProcess {
    fn default() -> Self {
        Self {
            resize: ResizeAlgorithm::Bilinear,
            color: ColorFormat::Bgr,
            layout: Layout::Nchw,
            input_precision: Precision::U8,
            output_precision: Precision::Fp32,
        }
    }
}

/// Output tensor produced by a completed request
#[derive(Debug, Clone, PartialEq)]
pub struct OutputBuffer {
    pub dims: Vec<usize>,
    pub data: Arc<[f32]>,
}

impl OutputBuffer {
    pub fn new(dims: Vec<usize>, data: Vec<f32>) -> Self {
        Self { dims, data: data.into() }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    /// Index of the highest score (top-1 class)
    pub fn argmax(&self) -> Option<usize> {
        self.data
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(i, _)| i)
    }
}

/// One independent, stateful execution context.
///
/// At most one request may be outstanding per handle. Implementations must
/// not block in `issue_async`. Dropping a handle with an outstanding request
/// must join that request before the handle's resources are released; the
/// ring joins its own outstanding slots when a run aborts, but handles owned
/// elsewhere rely on `Drop`.
pub trait ExecutionHandle: Send {
    /// Attach `blob` as the named input of the next request
    fn bind_input(&mut self, name: &str, blob: InputBlob) -> Result<()>;

    /// Start the bound request and return immediately
    fn issue_async(&mut self) -> Result<()>;

    /// Block until the outstanding request finishes
    fn block_until_done(&mut self) -> StatusCode;

    /// Read a named output of the last finished request
    fn fetch_output(&self, name: &str) -> Result<OutputBuffer>;
}

/// A compiled unit of work that hands out independent execution handles.
///
/// Units are shared between slots through `Arc`, so concurrent use from
/// independent handles must be safe.
pub trait ExecutableUnit: Send + Sync {
    type Handle: ExecutionHandle;

    /// Create one execution context bound to the named input
    fn create_handle(&self, input_name: &str) -> Result<Self::Handle>;

    fn input_names(&self) -> Vec<&str>;

    fn output_names(&self) -> Vec<&str>;
}

/// Loads executable units from model files.
pub trait UnitLoader {
    type Unit: ExecutableUnit;

    fn load_executable_unit(&self, path: &Path) -> Result<Self::Unit>;
}
