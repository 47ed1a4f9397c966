//! Explicit description of the project being published.

use std::path::{Path, PathBuf};

use tracing::info;

use crate::config::{InstallConfig, ModuleDescriptor};
use crate::error::PublishError;
use crate::paths::PublishPaths;

/// Default build output directory, relative to the project directory.
pub const DEFAULT_BUILD_DIR: &str = "build";

/// Locations supplied by the caller instead of being read from the process environment.
#[derive(Debug, Clone)]
pub struct PublishContext {
  /// Directory holding the install configuration.
  pub project_dir: PathBuf,
  /// Directory containing the finished static bundle.
  pub build_dir: PathBuf,
  /// Configuration file used instead of the default candidates.
  pub config_path: Option<PathBuf>,
}

impl PublishContext {
  /// Context using the default build directory beneath `project_dir`.
  pub fn new(project_dir: impl Into<PathBuf>) -> Self {
    let project_dir = project_dir.into();
    Self {
      build_dir: project_dir.join(DEFAULT_BUILD_DIR),
      project_dir,
      config_path: None,
    }
  }

  /// Override the build directory. Relative paths resolve against the project directory.
  pub fn with_build_dir(mut self, build_dir: impl AsRef<Path>) -> Self {
    self.build_dir = self.project_dir.join(build_dir);
    self
  }

  /// Read configuration from `path` rather than the default candidates.
  pub fn with_config_path(mut self, path: impl AsRef<Path>) -> Self {
    self.config_path = Some(self.project_dir.join(path));
    self
  }

  /// Locate, parse, and validate the install configuration.
  pub fn load_descriptor(&self) -> Result<ModuleDescriptor, PublishError> {
    let (path, config) = match &self.config_path {
      Some(path) => (path.clone(), InstallConfig::from_path(path)?),
      None => InstallConfig::discover(&self.project_dir)?,
    };
    info!("Using install configuration {}", path.display());
    config.validate()
  }

  /// Resolve the publish locations for this project.
  pub fn resolve_paths(&self) -> Result<PublishPaths, PublishError> {
    self.load_descriptor()?.paths(&self.build_dir)
  }
}
