//! Ringflight benchmark driver.
//!
//! Usage: ringflight <MODEL> <MODEL_COUNT> [IN_FLIGHT] [--duration-secs N]

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{ Context, Result };
use clap::Parser;
use tracing::error;

use ringflight::constants::{ DEFAULT_DEVICE, DEFAULT_IN_FLIGHT };
use ringflight::{ init_logging, run_pipeline, PipelineConfig };

#[derive(Parser, Debug)]
#[command(name = "ringflight")]
#[command(about = "Keep N inference requests in flight for a fixed duration")]
struct Cli {
    /// Path to the model descriptor
    model: PathBuf,

    /// Number of model instances to load
    model_count: usize,

    /// Number of in-flight requests
    #[arg(default_value_t = DEFAULT_IN_FLIGHT)]
    in_flight: usize,

    /// Wall-clock duration of the run
    #[arg(long, env = "RINGFLIGHT_DURATION_SECS", default_value_t = 30)]
    duration_secs: u64,

    /// Device to load the models on
    #[arg(long, default_value = DEFAULT_DEVICE)]
    device: String,

    /// Runtime worker threads (defaults to logical CPUs)
    #[arg(long)]
    workers: Option<usize>,

    /// Seed for reproducible synthetic inputs
    #[arg(long)]
    seed: Option<u64>,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

impl Cli {
    fn into_config(self) -> PipelineConfig {
        let mut config = PipelineConfig::new(self.model)
            .with_model_instances(self.model_count)
            .with_in_flight(self.in_flight)
            .with_duration(Duration::from_secs(self.duration_secs))
            .with_device(self.device);
        if let Some(workers) = self.workers {
            config = config.with_workers(workers);
        }
        if let Some(seed) = self.seed {
            config = config.with_seed(seed);
        }
        config
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose)?;

    let config = cli.into_config();
    let report = run_pipeline(&config)
        .inspect_err(|e| error!(error = %e, "benchmark failed"))
        .with_context(|| format!("benchmark of {} failed", config.model_path.display()))?;

    println!("{report}");
    Ok(())
}
