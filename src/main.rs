use std::process::ExitCode;

use lagcast::{
    init_logging, log_run_start, logging_config_from_env, run, PipelineConfig,
};
use tracing::error;

fn main() -> ExitCode {
    let logging = logging_config_from_env();
    if let Err(err) = init_logging(&logging) {
        eprintln!("failed to initialize logging: {err}");
        return ExitCode::FAILURE;
    }

    let config = match PipelineConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            error!(component = "main", event = "run.config_invalid", error = %err);
            eprintln!("configuration error: {err}");
            return ExitCode::FAILURE;
        }
    };

    log_run_start(&config);

    match run(&config) {
        Ok(summary) => {
            println!(
                "forecast written: series={} train={} test={} mae={:.4} rmse={:.4}",
                summary.series_len,
                summary.train_size,
                summary.test_size,
                summary.metrics.mae,
                summary.metrics.rmse
            );
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!(component = "main", event = "run.failed", error = %err);
            eprintln!("pipeline error: {err}");
            ExitCode::FAILURE
        }
    }
}
