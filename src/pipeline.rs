//! End-to-end benchmark flow: load M units, build N slots, run, report.

use std::sync::Arc;

use tracing::info;

use crate::config::PipelineConfig;
use crate::error::{ Result, RingflightError };
use crate::runtime::sim::SimRuntime;
use crate::runtime::{ ExecutableUnit, UnitLoader };
use crate::scheduler::{ Deadline, RingConfig, RunReport, SlotRing };

/// Load `config.model_instances` units with `loader`.
pub fn load_units<L: UnitLoader>(loader: &L, config: &PipelineConfig) -> Result<Vec<Arc<L::Unit>>> {
    (0..config.model_instances)
        .map(|_| loader.load_executable_unit(config.model_path()).map(Arc::new))
        .collect()
}

/// Input the ring binds to: the first input of the first unit.
pub fn primary_input<U: ExecutableUnit>(units: &[Arc<U>]) -> Result<String> {
    units
        .first()
        .and_then(|u| u.input_names().first().map(|name| name.to_string()))
        .ok_or_else(|| RingflightError::runtime("model has no inputs"))
}

/// Run the ring over units produced by `loader` until `deadline`.
pub fn run_with_loader<L: UnitLoader>(
    loader: &L,
    config: &PipelineConfig,
    deadline: Deadline
) -> Result<RunReport> {
    config.validate()?;

    info!(model = %config.model_path.display(), instances = config.model_instances, "reading networks");
    let units = load_units(loader, config)?;
    let input_name = primary_input(&units)?;

    info!(in_flight = config.in_flight, input = %input_name, "initializing requests");
    let mut ring_config = RingConfig::new(config.in_flight, input_name);
    if let Some(seed) = config.seed {
        ring_config = ring_config.with_seed(seed);
    }
    let mut ring = SlotRing::new(&units, &ring_config)?;

    info!(deadline = ?deadline, "start inference");
    ring.run(deadline)
}

/// Run the configured benchmark on the simulated runtime.
pub fn run_pipeline(config: &PipelineConfig) -> Result<RunReport> {
    config.validate()?;
    let runtime = SimRuntime::new(config.workers)?
        .with_device(config.device.clone())
        .with_preprocess(config.preprocess);
    run_with_loader(&runtime, config, config.deadline())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::sim::ModelDescriptor;
    use std::io::Write;
    use std::time::Duration;

    fn descriptor_file(desc: &ModelDescriptor) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(serde_json::to_string(desc).unwrap().as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_run_pipeline_short() {
        let file = descriptor_file(&ModelDescriptor::classifier("m", 224, 224, 10));
        let config = PipelineConfig::new(file.path())
            .with_model_instances(2)
            .with_in_flight(3)
            .with_workers(2)
            .with_duration(Duration::from_millis(30))
            .with_seed(9);
        let report = run_pipeline(&config).unwrap();
        assert_eq!(report.in_flight, 3);
        assert_eq!(report.units, 2);
        assert_eq!(report.submitted, report.completed);
        assert!(report.completed >= 1);
    }

    #[test]
    fn test_load_units_counts() {
        let file = descriptor_file(&ModelDescriptor::classifier("m", 8, 8, 2));
        let runtime = SimRuntime::new(1).unwrap();
        let config = PipelineConfig::new(file.path()).with_model_instances(3);
        let units = load_units(&runtime, &config).unwrap();
        assert_eq!(units.len(), 3);
        assert_eq!(primary_input(&units).unwrap(), "data");
    }

    #[test]
    fn test_missing_model_fails_fast() {
        let config = PipelineConfig::new("/nonexistent/model.json").with_workers(1);
        assert!(matches!(run_pipeline(&config), Err(RingflightError::Load { .. })));
    }
}
