//! Pipeline configuration.

use std::path::{ Path, PathBuf };
use std::time::Duration;

use crate::constants::{ DEFAULT_DEVICE, DEFAULT_IN_FLIGHT, DEFAULT_RUN_DURATION };
use crate::error::{ Result, RingflightError };
use crate::runtime::PreProcess;
use crate::scheduler::Deadline;

/// Everything a benchmark run needs, validated before any model is loaded.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    /// Model descriptor to load
    pub model_path: PathBuf,
    /// Distinct executable units loaded from `model_path` (M)
    pub model_instances: usize,
    /// Ring capacity (N)
    pub in_flight: usize,
    /// Wall-clock length of the steady phase
    pub duration: Duration,
    pub device: String,
    /// Runtime worker threads
    pub workers: usize,
    pub seed: Option<u64>,
    pub preprocess: PreProcess,
}

impl PipelineConfig {
    pub fn new(model_path: impl Into<PathBuf>) -> Self {
        Self {
            model_path: model_path.into(),
            model_instances: 1,
            in_flight: DEFAULT_IN_FLIGHT,
            duration: DEFAULT_RUN_DURATION,
            device: DEFAULT_DEVICE.to_string(),
            workers: num_cpus::get().max(1),
            seed: None,
            preprocess: PreProcess::default(),
        }
    }

    pub fn with_model_instances(mut self, n: usize) -> Self {
        self.model_instances = n;
        self
    }

    pub fn with_in_flight(mut self, n: usize) -> Self {
        self.in_flight = n;
        self
    }

    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }

    pub fn with_device(mut self, device: impl Into<String>) -> Self {
        self.device = device.into();
        self
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_preprocess(mut self, preprocess: PreProcess) -> Self {
        self.preprocess = preprocess;
        self
    }

    pub fn model_path(&self) -> &Path {
        &self.model_path
    }

    pub fn deadline(&self) -> Deadline {
        Deadline::After(self.duration)
    }

    pub fn validate(&self) -> Result<()> {
        if self.model_path.as_os_str().is_empty() {
            return Err(RingflightError::config("Model path must not be empty"));
        }
        if self.model_instances == 0 {
            return Err(RingflightError::config("Number of models must be greater than 0"));
        }
        if self.in_flight == 0 {
            return Err(RingflightError::config("Number of in-flight requests must be greater than 0"));
        }
        if self.workers == 0 {
            return Err(RingflightError::config("Number of workers must be greater than 0"));
        }
        if self.device.is_empty() {
            return Err(RingflightError::config("Device must not be empty"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pipeline_config_defaults() {
        let config = PipelineConfig::new("model.json");
        assert_eq!(config.model_instances, 1);
        assert_eq!(config.in_flight, DEFAULT_IN_FLIGHT);
        assert_eq!(config.duration, Duration::from_secs(30));
        assert_eq!(config.device, "CPU");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_pipeline_config_builder() {
        let config = PipelineConfig::new("model.json")
            .with_model_instances(2)
            .with_in_flight(8)
            .with_duration(Duration::from_secs(2))
            .with_seed(3);
        assert_eq!(config.model_instances, 2);
        assert_eq!(config.in_flight, 8);
        assert_eq!(config.deadline(), Deadline::After(Duration::from_secs(2)));
        assert_eq!(config.seed, Some(3));
    }

    #[test]
    fn test_pipeline_config_invalid() {
        assert!(PipelineConfig::new("m").with_in_flight(0).validate().is_err());
        assert!(PipelineConfig::new("m").with_model_instances(0).validate().is_err());
        assert!(PipelineConfig::new("m").with_workers(0).validate().is_err());
        assert!(PipelineConfig::new("").validate().is_err());
    }
}
