use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use tracing::{Level, error, warn};
use tracing_subscriber::EnvFilter;

use module_publisher::{PublishContext, Publisher};

/// Publish a static build into the host application's versioned module tree.
#[derive(Debug, Parser)]
#[command(name = "module-publish", version, about)]
struct Cli {
  /// Directory containing the install configuration.
  #[arg(long, value_name = "DIR", default_value = ".")]
  project_dir: PathBuf,

  /// Build output directory, relative to the project directory.
  #[arg(long, value_name = "DIR", default_value = module_publisher::project::DEFAULT_BUILD_DIR)]
  build_dir: PathBuf,

  /// Configuration file to use instead of `.install.json` / `.cs.json`.
  #[arg(long, value_name = "FILE")]
  config: Option<PathBuf>,

  /// Log level (trace, debug, info, warn, error).
  #[arg(long, value_name = "LEVEL", default_value = "info")]
  log_level: String,
}

/// Exit status when configuration problems stop the run before anything is written.
const CONFIGURATION_FAILURE: u8 = 1;

fn main() -> Result<ExitCode> {
  let cli = Cli::parse();
  initialize_logging(&cli.log_level)?;
  Ok(ExitCode::from(run(&cli)))
}

/// Publish according to `cli`, returning the process exit status.
///
/// Configuration and version errors are logged and give [`CONFIGURATION_FAILURE`]. Failures
/// of the best-effort publish steps are logged as warnings and still give `0`.
fn run(cli: &Cli) -> u8 {
  let mut context = PublishContext::new(&cli.project_dir).with_build_dir(&cli.build_dir);
  if let Some(config) = &cli.config {
    context = context.with_config_path(config);
  }

  let paths = match context.resolve_paths() {
    Ok(paths) => paths,
    Err(err) => {
      error!("Skipping install -- {err}");
      return CONFIGURATION_FAILURE;
    }
  };

  let report = Publisher::new(paths).publish();
  if !report.is_complete() {
    warn!("Publish finished with warnings");
  }
  0
}

fn initialize_logging(log_level: &str) -> Result<()> {
  let level = match log_level.to_lowercase().as_str() {
    "trace" => Level::TRACE,
    "debug" => Level::DEBUG,
    "warn" => Level::WARN,
    "error" => Level::ERROR,
    _ => Level::INFO,
  };

  let filter = EnvFilter::from_default_env().add_directive(level.into());

  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_target(false)
    .without_time()
    .try_init()
    .map_err(|err| anyhow::anyhow!("failed to initialise logging: {err}"))
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::fs;
  use tempfile::tempdir;

  fn cli_for(project_dir: &std::path::Path) -> Cli {
    Cli::try_parse_from([
      "module-publish",
      "--project-dir",
      project_dir.to_str().unwrap(),
    ])
    .unwrap()
  }

  #[test]
  fn missing_configuration_exits_with_failure_status() {
    let temp = tempdir().unwrap();
    assert_eq!(run(&cli_for(temp.path())), CONFIGURATION_FAILURE);
  }

  #[test]
  fn incomplete_configuration_exits_with_failure_status() {
    let temp = tempdir().unwrap();
    fs::write(temp.path().join(".install.json"), r#"{"module": "widget"}"#).unwrap();
    assert_eq!(run(&cli_for(temp.path())), CONFIGURATION_FAILURE);
  }

  #[test]
  fn failed_publish_steps_still_exit_successfully() {
    let temp = tempdir().unwrap();
    let base = temp.path().join("host");
    fs::write(
      temp.path().join(".install.json"),
      format!(
        r#"{{"base": {}, "module": "widget", "version": "1.0.0"}}"#,
        serde_json::to_string(base.to_str().unwrap()).unwrap()
      ),
    )
    .unwrap();

    assert_eq!(run(&cli_for(temp.path())), 0);
    assert!(!base.join("module/widget_1_0_0/html/index.html").exists());
  }
}
