//! Simulated inference runtime.
//!
//! Models are JSON descriptors; execution happens on a shared pool of worker
//! threads fed through a crossbeam channel. Each request signals completion
//! through its own mutex/condvar pair, so `block_until_done` parks the caller
//! instead of spinning.
//!
//! ```json
//! {
//!   "name": "squeezenet1.1",
//!   "inputs":  [{ "name": "data", "dims": [1, 3, 224, 224] }],
//!   "outputs": [{ "name": "prob", "dims": [1, 1000] }],
//!   "latency_us": 2000
//! }
//! ```
//!
//! `fail_every: k` makes every k-th execution of the model report
//! `GENERAL_ERROR`, which is how fault drills are staged.

use std::collections::HashMap;
use std::fs;
use std::path::{ Path, PathBuf };
use std::sync::atomic::{ AtomicU64, Ordering };
use std::sync::Arc;
use std::thread::{ self, JoinHandle };
use std::time::Duration;

use crossbeam::channel::{ self, Sender };
use parking_lot::{ Condvar, Mutex };
use serde::{ Deserialize, Serialize };
use tracing::{ debug, info };

use crate::constants::{ DEFAULT_DEVICE, INPUT_CHANNELS };
use crate::error::{ Result, RingflightError };
use crate::input::InputBlob;
use crate::runtime::{
    ColorFormat,
    ExecutableUnit,
    ExecutionHandle,
    OutputBuffer,
    Precision,
    PreProcess,
    ResizeAlgorithm,
    StatusCode,
    UnitLoader,
};

/// Named tensor port of a model
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortDescriptor {
    pub name: String,
    pub dims: Vec<usize>,
}

impl PortDescriptor {
    pub fn new(name: impl Into<String>, dims: Vec<usize>) -> Self {
        Self { name: name.into(), dims }
    }

    /// Number of elements
    pub fn len(&self) -> usize {
        self.dims.iter().product()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// On-disk model description
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelDescriptor {
    pub name: String,
    pub inputs: Vec<PortDescriptor>,
    pub outputs: Vec<PortDescriptor>,
    /// Simulated execution time per request
    #[serde(default)]
    pub latency_us: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fail_every: Option<u64>,
}

impl ModelDescriptor {
    /// Single-input image classifier: `data` [1,3,H,W] -> `prob` [1,classes]
    pub fn classifier(name: impl Into<String>, width: usize, height: usize, classes: usize) -> Self {
        Self {
            name: name.into(),
            inputs: vec![PortDescriptor::new("data", vec![1, INPUT_CHANNELS, height, width])],
            outputs: vec![PortDescriptor::new("prob", vec![1, classes])],
            latency_us: 0,
            fail_every: None,
        }
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency_us = u64::try_from(latency.as_micros()).unwrap_or(u64::MAX);
        self
    }

    fn validate(&self) -> std::result::Result<(), String> {
        if self.inputs.is_empty() {
            return Err("model declares no inputs".into());
        }
        if self.outputs.is_empty() {
            return Err("model declares no outputs".into());
        }
        for port in self.inputs.iter().chain(&self.outputs) {
            if port.name.is_empty() {
                return Err("port with empty name".into());
            }
            if port.is_empty() {
                return Err(format!("port {} has no elements", port.name));
            }
        }
        if self.fail_every == Some(0) {
            return Err("fail_every must be at least 1".into());
        }
        Ok(())
    }
}

type Job = Box<dyn FnOnce() + Send + 'static>;

/// Fixed set of worker threads draining one job queue.
struct WorkerPool {
    sender: Option<Sender<Job>>,
    workers: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    fn new(size: usize) -> Result<Self> {
        let (sender, receiver) = channel::unbounded::<Job>();
        let mut workers = Vec::with_capacity(size);
        for i in 0..size {
            let receiver = receiver.clone();
            let handle = thread::Builder::new()
                .name(format!("ringflight-worker-{i}"))
                .spawn(move || {
                    for job in receiver.iter() {
                        job();
                    }
                })?;
            workers.push(handle);
        }
        Ok(Self { sender: Some(sender), workers })
    }

    fn execute(&self, job: Job) -> Result<()> {
        let sender = self.sender
            .as_ref()
            .ok_or_else(|| RingflightError::runtime("worker pool shut down"))?;
        sender.send(job).map_err(|_| RingflightError::runtime("worker pool shut down"))
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        // Closing the channel ends every worker loop once the queue is empty
        self.sender.take();
        for worker in self.workers.drain(..) {
            let _ = worker.join();
        }
    }
}

/// Loads descriptors and places them on the shared worker pool.
pub struct SimRuntime {
    device: String,
    preprocess: PreProcess,
    pool: Arc<WorkerPool>,
}

impl SimRuntime {
    pub fn new(workers: usize) -> Result<Self> {
        if workers == 0 {
            return Err(RingflightError::config("Runtime needs at least one worker thread"));
        }
        Ok(Self {
            device: DEFAULT_DEVICE.to_string(),
            preprocess: PreProcess::default(),
            pool: Arc::new(WorkerPool::new(workers)?),
        })
    }

    pub fn with_device(mut self, device: impl Into<String>) -> Self {
        self.device = device.into();
        self
    }

    pub fn with_preprocess(mut self, preprocess: PreProcess) -> Self {
        self.preprocess = preprocess;
        self
    }

    /// Parse and validate a descriptor file.
    pub fn read_network(&self, path: &Path) -> Result<ModelDescriptor> {
        let text = fs::read_to_string(path).map_err(|e| RingflightError::load(path, e.to_string()))?;
        let desc: ModelDescriptor = serde_json::from_str(&text)
            .map_err(|e| RingflightError::load(path, format!("malformed descriptor: {e}")))?;
        desc.validate().map_err(|reason| RingflightError::load(path, reason))?;
        Ok(desc)
    }

    /// Compile an in-memory descriptor for this runtime's device.
    pub fn load_network(&self, desc: ModelDescriptor) -> Result<SimModel> {
        let origin = PathBuf::from(&desc.name);
        self.compile(desc, &origin)
    }

    fn compile(&self, desc: ModelDescriptor, origin: &Path) -> Result<SimModel> {
        if !self.device.eq_ignore_ascii_case(DEFAULT_DEVICE) {
            return Err(RingflightError::load(origin, format!("unsupported device {}", self.device)));
        }
        desc.validate().map_err(|reason| RingflightError::load(origin, reason))?;
        if self.preprocess.output_precision != Precision::Fp32 {
            return Err(
                RingflightError::load(
                    origin,
                    format!("unsupported output precision {:?}", self.preprocess.output_precision)
                )
            );
        }
        debug!(model = %desc.name, device = %self.device, latency_us = desc.latency_us, "model compiled");
        Ok(SimModel {
            inner: Arc::new(ModelInner {
                desc,
                preprocess: self.preprocess,
                executions: AtomicU64::new(0),
            }),
            pool: self.pool.clone(),
        })
    }
}

impl UnitLoader for SimRuntime {
    type Unit = SimModel;

    fn load_executable_unit(&self, path: &Path) -> Result<SimModel> {
        let desc = self.read_network(path)?;
        info!(model = %desc.name, path = %path.display(), "network read");
        self.compile(desc, path)
    }
}

struct ModelInner {
    desc: ModelDescriptor,
    preprocess: PreProcess,
    executions: AtomicU64,
}

impl ModelInner {
    fn execute(&self, input: &str, blob: &InputBlob) -> (StatusCode, HashMap<String, OutputBuffer>) {
        if self.desc.latency_us > 0 {
            thread::sleep(Duration::from_micros(self.desc.latency_us));
        }
        let n = self.executions.fetch_add(1, Ordering::Relaxed) + 1;
        if let Some(every) = self.desc.fail_every {
            if n % every == 0 {
                return (StatusCode::GeneralError, HashMap::new());
            }
        }

        let (height, width) = self.input_size(input).unwrap_or((blob.roi.height, blob.roi.width));
        let features = roi_means(blob, height, width, &self.preprocess);
        let outputs = self.desc.outputs
            .iter()
            .map(|port| {
                let scores = classify(&features, port.len());
                (port.name.clone(), OutputBuffer::new(port.dims.clone(), scores))
            })
            .collect();
        (StatusCode::Ok, outputs)
    }

    /// (H, W) of a 4D input port
    fn input_size(&self, input: &str) -> Option<(usize, usize)> {
        self.desc.inputs
            .iter()
            .find(|p| p.name == input)
            .filter(|p| p.dims.len() == 4)
            .map(|p| (p.dims[2], p.dims[3]))
    }
}

/// Per-channel mean of the ROI resampled to `height` x `width`, scaled to [0, 1].
fn roi_means(blob: &InputBlob, height: usize, width: usize, preprocess: &PreProcess) -> Vec<f32> {
    let channels = blob.desc.channels();
    let roi = blob.roi;
    let mut sums = vec![0f64; channels];
    let samples = match preprocess.resize {
        ResizeAlgorithm::Bilinear if height > 0 && width > 0 => {
            let scale_y = (roi.height as f32) / (height as f32);
            let scale_x = (roi.width as f32) / (width as f32);
            for i in 0..height {
                let fy = (roi.y as f32) + ((i as f32) + 0.5) * scale_y - 0.5;
                for j in 0..width {
                    let fx = (roi.x as f32) + ((j as f32) + 0.5) * scale_x - 0.5;
                    for (ch, sum) in sums.iter_mut().enumerate() {
                        *sum += f64::from(bilinear(blob, fx, fy, ch));
                    }
                }
            }
            height * width
        }
        // Area averaging and an exact-size ROI both reduce to the plain mean
        _ => {
            for y in roi.y..roi.y + roi.height {
                for x in roi.x..roi.x + roi.width {
                    for (ch, sum) in sums.iter_mut().enumerate() {
                        *sum += f64::from(blob.pixel(x, y, ch));
                    }
                }
            }
            roi.width * roi.height
        }
    };
    let count = samples.max(1) as f64;
    let mut means: Vec<f32> = sums
        .iter()
        .map(|s| (*s / count / 255.0) as f32)
        .collect();
    // Generated frames are BGR
    if preprocess.color == ColorFormat::Rgb {
        means.reverse();
    }
    means
}

/// Bilinear sample at fractional (x, y), clamped to the ROI.
fn bilinear(blob: &InputBlob, fx: f32, fy: f32, channel: usize) -> f32 {
    let roi = blob.roi;
    let max_x = (roi.x + roi.width - 1) as f32;
    let max_y = (roi.y + roi.height - 1) as f32;
    let fx = fx.clamp(roi.x as f32, max_x);
    let fy = fy.clamp(roi.y as f32, max_y);
    let (x0, y0) = (fx.floor() as usize, fy.floor() as usize);
    let x1 = (x0 + 1).min(roi.x + roi.width - 1);
    let y1 = (y0 + 1).min(roi.y + roi.height - 1);
    let (dx, dy) = (fx - (x0 as f32), fy - (y0 as f32));
    let p = |x: usize, y: usize| f32::from(blob.pixel(x, y, channel));
    let top = p(x0, y0) * (1.0 - dx) + p(x1, y0) * dx;
    let bottom = p(x0, y1) * (1.0 - dx) + p(x1, y1) * dx;
    top * (1.0 - dy) + bottom * dy
}

/// Softmax over a deterministic projection of the features.
fn classify(features: &[f32], classes: usize) -> Vec<f32> {
    if classes == 0 {
        return Vec::new();
    }
    let logits: Vec<f32> = (0..classes)
        .map(|i| {
            let f = if features.is_empty() { 0.0 } else { features[i % features.len()] };
            f * (((i % 7) as f32) + 1.0)
        })
        .collect();
    let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exp: Vec<f32> = logits
        .iter()
        .map(|l| (l - max).exp())
        .collect();
    let sum: f32 = exp.iter().sum();
    exp.into_iter()
        .map(|e| e / sum)
        .collect()
}

/// Compiled model shared by any number of requests.
#[derive(Clone)]
pub struct SimModel {
    inner: Arc<ModelInner>,
    pool: Arc<WorkerPool>,
}

impl SimModel {
    pub fn descriptor(&self) -> &ModelDescriptor {
        &self.inner.desc
    }

    /// Executions started on this model across all requests
    pub fn executions(&self) -> u64 {
        self.inner.executions.load(Ordering::Relaxed)
    }
}

impl ExecutableUnit for SimModel {
    type Handle = SimRequest;

    fn create_handle(&self, input_name: &str) -> Result<SimRequest> {
        if !self.inner.desc.inputs.iter().any(|p| p.name == input_name) {
            return Err(
                RingflightError::runtime(
                    format!("model {} has no input named {input_name}", self.inner.desc.name)
                )
            );
        }
        Ok(SimRequest {
            inner: self.inner.clone(),
            pool: self.pool.clone(),
            input_name: input_name.to_string(),
            input: None,
            shared: Arc::new(RequestShared {
                progress: Mutex::new(Progress::default()),
                done: Condvar::new(),
            }),
        })
    }

    fn input_names(&self) -> Vec<&str> {
        self.inner.desc.inputs
            .iter()
            .map(|p| p.name.as_str())
            .collect()
    }

    fn output_names(&self) -> Vec<&str> {
        self.inner.desc.outputs
            .iter()
            .map(|p| p.name.as_str())
            .collect()
    }
}

#[derive(Default)]
struct Progress {
    running: bool,
    status: Option<StatusCode>,
    outputs: HashMap<String, OutputBuffer>,
}

struct RequestShared {
    progress: Mutex<Progress>,
    done: Condvar,
}

/// One execution context on a [`SimModel`].
pub struct SimRequest {
    inner: Arc<ModelInner>,
    pool: Arc<WorkerPool>,
    input_name: String,
    input: Option<InputBlob>,
    shared: Arc<RequestShared>,
}

impl SimRequest {
    fn busy(&self) -> RingflightError {
        RingflightError::runtime(format!("request on {} is busy ({})", self.inner.desc.name, StatusCode::RequestBusy))
    }
}

impl ExecutionHandle for SimRequest {
    fn bind_input(&mut self, name: &str, blob: InputBlob) -> Result<()> {
        if name != self.input_name {
            return Err(
                RingflightError::runtime(
                    format!("request is bound to input {}, got {name}", self.input_name)
                )
            );
        }
        if self.shared.progress.lock().running {
            return Err(self.busy());
        }
        if let Some(port) = self.inner.desc.inputs.iter().find(|p| p.name == name) {
            if port.dims.len() == 4 && port.dims[1] != blob.desc.channels() {
                return Err(
                    RingflightError::runtime(
                        format!(
                            "input {name} expects {} channels, blob has {} ({})",
                            port.dims[1],
                            blob.desc.channels(),
                            StatusCode::ParameterMismatch
                        )
                    )
                );
            }
            if self.inner.preprocess.resize == ResizeAlgorithm::None && port.dims.len() == 4 {
                let (height, width) = (port.dims[2], port.dims[3]);
                if blob.roi.height != height || blob.roi.width != width {
                    return Err(
                        RingflightError::runtime(
                            format!(
                                "input {name} is {width}x{height} and resizing is off, ROI is {}x{} ({})",
                                blob.roi.width,
                                blob.roi.height,
                                StatusCode::ParameterMismatch
                            )
                        )
                    );
                }
            }
        }
        let pre = self.inner.preprocess;
        if blob.desc.precision != pre.input_precision {
            return Err(
                RingflightError::runtime(
                    format!(
                        "input {name} expects {:?}, blob is {:?} ({})",
                        pre.input_precision,
                        blob.desc.precision,
                        StatusCode::ParameterMismatch
                    )
                )
            );
        }
        self.input = Some(blob.to_layout(pre.layout));
        Ok(())
    }

    fn issue_async(&mut self) -> Result<()> {
        let blob = self.input
            .clone()
            .ok_or_else(|| RingflightError::runtime(format!("input {} not bound", self.input_name)))?;
        {
            let mut progress = self.shared.progress.lock();
            if progress.running {
                return Err(self.busy());
            }
            progress.running = true;
            progress.status = None;
            progress.outputs.clear();
        }

        let inner = self.inner.clone();
        let shared = self.shared.clone();
        let input_name = self.input_name.clone();
        let job: Job = Box::new(move || {
            let (status, outputs) = inner.execute(&input_name, &blob);
            let mut progress = shared.progress.lock();
            progress.running = false;
            progress.status = Some(status);
            progress.outputs = outputs;
            shared.done.notify_all();
        });
        if let Err(e) = self.pool.execute(job) {
            self.shared.progress.lock().running = false;
            return Err(e);
        }
        Ok(())
    }

    fn block_until_done(&mut self) -> StatusCode {
        let mut progress = self.shared.progress.lock();
        while progress.running {
            self.shared.done.wait(&mut progress);
        }
        progress.status.unwrap_or(StatusCode::InferNotStarted)
    }

    fn fetch_output(&self, name: &str) -> Result<OutputBuffer> {
        let progress = self.shared.progress.lock();
        if progress.running {
            return Err(RingflightError::runtime(format!("output {name}: {}", StatusCode::ResultNotReady)));
        }
        progress.outputs
            .get(name)
            .cloned()
            .ok_or_else(|| RingflightError::runtime(format!("no output named {name}")))
    }
}

impl Drop for SimRequest {
    fn drop(&mut self) {
        // In-flight work must be joined before the handle goes away
        let mut progress = self.shared.progress.lock();
        while progress.running {
            self.shared.done.wait(&mut progress);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::{ Frame, InputSource, RandomInput, Roi };
    use crate::runtime::Layout;
    use std::io::Write;

    fn write_descriptor(body: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(body.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_load_descriptor_from_file() {
        let desc = ModelDescriptor::classifier("squeeze", 224, 224, 1000);
        let file = write_descriptor(&serde_json::to_string(&desc).unwrap());
        let runtime = SimRuntime::new(2).unwrap();
        let model = runtime.load_executable_unit(file.path()).unwrap();
        assert_eq!(model.input_names(), vec!["data"]);
        assert_eq!(model.output_names(), vec!["prob"]);
        assert_eq!(model.descriptor().name, "squeeze");
    }

    #[test]
    fn test_malformed_descriptor() {
        let file = write_descriptor("{ not json");
        let runtime = SimRuntime::new(1).unwrap();
        assert!(matches!(runtime.load_executable_unit(file.path()), Err(RingflightError::Load { .. })));
    }

    #[test]
    fn test_missing_descriptor() {
        let runtime = SimRuntime::new(1).unwrap();
        let result = runtime.load_executable_unit(Path::new("/nonexistent/model.json"));
        assert!(matches!(result, Err(RingflightError::Load { .. })));
    }

    #[test]
    fn test_descriptor_without_outputs() {
        let file = write_descriptor(r#"{"name":"x","inputs":[{"name":"data","dims":[1,3,8,8]}],"outputs":[]}"#);
        let runtime = SimRuntime::new(1).unwrap();
        assert!(matches!(runtime.load_executable_unit(file.path()), Err(RingflightError::Load { .. })));
    }

    #[test]
    fn test_unsupported_device() {
        let runtime = SimRuntime::new(1).unwrap().with_device("GPU");
        let desc = ModelDescriptor::classifier("m", 8, 8, 4);
        assert!(matches!(runtime.load_network(desc), Err(RingflightError::Load { .. })));
    }

    #[test]
    fn test_zero_workers_rejected() {
        assert!(matches!(SimRuntime::new(0), Err(RingflightError::InvalidConfig { .. })));
    }

    #[test]
    fn test_request_round_trip() {
        let runtime = SimRuntime::new(2).unwrap();
        let model = runtime.load_network(ModelDescriptor::classifier("m", 16, 16, 5)).unwrap();
        let mut request = model.create_handle("data").unwrap();
        let mut input = RandomInput::with_seed(16, 16, 3, 11).unwrap();

        assert_eq!(request.block_until_done(), StatusCode::InferNotStarted);
        assert!(request.issue_async().is_err());

        request.bind_input("data", input.next_input().unwrap()).unwrap();
        request.issue_async().unwrap();
        assert_eq!(request.block_until_done(), StatusCode::Ok);
        let prob = request.fetch_output("prob").unwrap();
        assert_eq!(prob.dims, vec![1, 5]);
        assert!(prob.argmax().is_some());
        assert_eq!(model.executions(), 1);
    }

    #[test]
    fn test_wrong_input_name() {
        let runtime = SimRuntime::new(1).unwrap();
        let model = runtime.load_network(ModelDescriptor::classifier("m", 8, 8, 4)).unwrap();
        assert!(model.create_handle("pixels").is_err());
        let mut request = model.create_handle("data").unwrap();
        let blob = RandomInput::with_seed(8, 8, 3, 1).unwrap().next_input().unwrap();
        assert!(request.bind_input("pixels", blob).is_err());
    }

    #[test]
    fn test_channel_mismatch() {
        let runtime = SimRuntime::new(1).unwrap();
        let model = runtime.load_network(ModelDescriptor::classifier("m", 8, 8, 4)).unwrap();
        let mut request = model.create_handle("data").unwrap();
        let blob = RandomInput::with_seed(8, 8, 1, 1).unwrap().next_input().unwrap();
        assert!(request.bind_input("data", blob).is_err());
    }

    #[test]
    fn test_fail_every() {
        let runtime = SimRuntime::new(1).unwrap();
        let mut desc = ModelDescriptor::classifier("m", 8, 8, 4);
        desc.fail_every = Some(3);
        let model = runtime.load_network(desc).unwrap();
        let mut request = model.create_handle("data").unwrap();
        let mut input = RandomInput::with_seed(8, 8, 3, 2).unwrap();
        let mut statuses = Vec::new();
        for _ in 0..6 {
            request.bind_input("data", input.next_input().unwrap()).unwrap();
            request.issue_async().unwrap();
            statuses.push(request.block_until_done());
        }
        let failures: Vec<usize> = statuses
            .iter()
            .enumerate()
            .filter(|(_, s)| !s.is_ok())
            .map(|(i, _)| i)
            .collect();
        assert_eq!(failures, vec![2, 5]);
    }

    #[test]
    fn test_drop_joins_in_flight_request() {
        let runtime = SimRuntime::new(1).unwrap();
        let desc = ModelDescriptor::classifier("slow", 8, 8, 4).with_latency(Duration::from_millis(20));
        let model = runtime.load_network(desc).unwrap();
        let mut request = model.create_handle("data").unwrap();
        let blob = RandomInput::with_seed(8, 8, 3, 3).unwrap().next_input().unwrap();
        request.bind_input("data", blob).unwrap();
        request.issue_async().unwrap();
        drop(request);
        assert_eq!(model.executions(), 1);
    }

    fn run_once(runtime: &SimRuntime, blob: InputBlob) -> Result<OutputBuffer> {
        let model = runtime.load_network(ModelDescriptor::classifier("m", 8, 8, 6))?;
        let mut request = model.create_handle("data")?;
        request.bind_input("data", blob)?;
        request.issue_async()?;
        assert!(request.block_until_done().is_ok());
        request.fetch_output("prob")
    }

    fn uniform_blob(size: usize, value: u8, roi: Roi) -> InputBlob {
        let frame = Frame {
            width: size,
            height: size,
            channels: 3,
            row_stride: size * 3,
            pixel_stride: 3,
            data: vec![value; size * size * 3],
        };
        frame.into_blob(roi).unwrap()
    }

    #[test]
    fn test_layout_does_not_change_outputs() {
        let blob = RandomInput::with_seed(12, 12, 3, 4).unwrap().next_input().unwrap();
        let nchw = SimRuntime::new(1).unwrap();
        let nhwc = SimRuntime::new(1)
            .unwrap()
            .with_preprocess(PreProcess { layout: Layout::Nhwc, ..PreProcess::default() });
        let a = run_once(&nchw, blob.clone()).unwrap();
        let b = run_once(&nhwc, blob).unwrap();
        assert_eq!(a.as_slice(), b.as_slice());
    }

    #[test]
    fn test_resize_algorithms_agree_on_flat_frame() {
        let roi = Roi { x: 2, y: 3, width: 10, height: 9 };
        let area = SimRuntime::new(1)
            .unwrap()
            .with_preprocess(PreProcess { resize: ResizeAlgorithm::Area, ..PreProcess::default() });
        let bilinear = SimRuntime::new(1).unwrap();
        let a = run_once(&area, uniform_blob(16, 200, roi)).unwrap();
        let b = run_once(&bilinear, uniform_blob(16, 200, roi)).unwrap();
        for (x, y) in a.as_slice().iter().zip(b.as_slice()) {
            assert!((x - y).abs() < 1e-5);
        }
    }

    #[test]
    fn test_resize_off_requires_exact_roi() {
        let runtime = SimRuntime::new(1)
            .unwrap()
            .with_preprocess(PreProcess { resize: ResizeAlgorithm::None, ..PreProcess::default() });
        let cropped = uniform_blob(16, 10, Roi { x: 1, y: 1, width: 10, height: 10 });
        assert!(run_once(&runtime, cropped).is_err());
        let exact = uniform_blob(16, 10, Roi { x: 4, y: 4, width: 8, height: 8 });
        assert_eq!(run_once(&runtime, exact).unwrap().len(), 6);
    }

    #[test]
    fn test_precision_checks() {
        let runtime = SimRuntime::new(1)
            .unwrap()
            .with_preprocess(PreProcess { input_precision: Precision::Fp32, ..PreProcess::default() });
        let blob = RandomInput::with_seed(8, 8, 3, 5).unwrap().next_input().unwrap();
        assert!(run_once(&runtime, blob).is_err());

        let runtime = SimRuntime::new(1)
            .unwrap()
            .with_preprocess(PreProcess { output_precision: Precision::U8, ..PreProcess::default() });
        let desc = ModelDescriptor::classifier("m", 8, 8, 4);
        assert!(matches!(runtime.load_network(desc), Err(RingflightError::Load { .. })));
    }

    #[test]
    fn test_classify_is_a_distribution() {
        let scores = classify(&[0.2, 0.5, 0.9], 1000);
        assert_eq!(scores.len(), 1000);
        let sum: f32 = scores.iter().sum();
        assert!((sum - 1.0).abs() < 1e-3);
        assert!(classify(&[0.1], 0).is_empty());
    }
}
