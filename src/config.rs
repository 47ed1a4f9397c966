//! Install configuration loader describing where a build is published.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::error::{ConfigurationError, PublishError};
use crate::paths::{DEFAULT_MAIN_HTML, PublishPaths, derive_paths};
use crate::version::VersionSpec;

/// Configuration files checked, in order, relative to the project directory.
pub const CONFIG_CANDIDATES: [&str; 2] = [".install.json", ".cs.json"];

/// Raw install configuration as written on disk.
///
/// Every field is optional at this stage so that [`InstallConfig::validate`] can report all
/// missing fields at once.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct InstallConfig {
  /// Root directory of the host application's module tree.
  pub base: Option<String>,
  /// Module identifier.
  pub module: Option<String>,
  /// Version as a 3-element array or a dotted string.
  pub version: Option<Value>,
  /// File name given to the published main HTML document.
  pub target_main: Option<String>,
}

/// Validated module descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleDescriptor {
  /// Root directory of the host application's module tree.
  pub base: PathBuf,
  /// Module identifier.
  pub module: String,
  /// Module version.
  pub version: VersionSpec,
  /// Optional override for the published main HTML file name.
  pub target_main: Option<String>,
}

impl InstallConfig {
  /// Load the first configuration candidate that exists within `project_dir`.
  pub fn discover(project_dir: &Path) -> Result<(PathBuf, Self), ConfigurationError> {
    let candidates: Vec<PathBuf> = CONFIG_CANDIDATES
      .iter()
      .map(|name| project_dir.join(name))
      .collect();

    match candidates.iter().find(|candidate| candidate.is_file()) {
      Some(path) => Ok((path.clone(), Self::from_path(path)?)),
      None => Err(ConfigurationError::NotFound { candidates }),
    }
  }

  /// Read configuration from a specific JSON file.
  pub fn from_path(path: &Path) -> Result<Self, ConfigurationError> {
    let content = fs::read_to_string(path).map_err(|source| ConfigurationError::Read {
      path: path.to_path_buf(),
      source,
    })?;
    debug!(path = %path.display(), "loaded install configuration");
    serde_json::from_str(&content).map_err(|source| ConfigurationError::Parse {
      path: path.to_path_buf(),
      source,
    })
  }

  /// Check the required fields and convert the configuration into a [`ModuleDescriptor`].
  pub fn validate(&self) -> Result<ModuleDescriptor, PublishError> {
    let mut missing = Vec::new();
    if is_blank_str(self.base.as_deref()) {
      missing.push("base");
    }
    if is_blank_str(self.module.as_deref()) {
      missing.push("module");
    }
    if self.version.as_ref().is_none_or(is_blank_value) {
      missing.push("version");
    }

    let (Some(base), Some(module), Some(version), true) = (
      self.base.as_deref(),
      self.module.as_deref(),
      self.version.as_ref(),
      missing.is_empty(),
    ) else {
      return Err(ConfigurationError::MissingFields(missing).into());
    };

    Ok(ModuleDescriptor {
      base: PathBuf::from(base),
      module: module.to_string(),
      version: VersionSpec::try_from(version)?,
      target_main: self.target_main.clone().filter(|name| !name.is_empty()),
    })
  }
}

impl ModuleDescriptor {
  /// Derive the publish locations for a build directory.
  pub fn paths(&self, build_dir: &Path) -> Result<PublishPaths, PublishError> {
    derive_paths(
      build_dir,
      &self.base,
      &self.module,
      &self.version,
      self.target_main.as_deref().unwrap_or(DEFAULT_MAIN_HTML),
    )
  }
}

fn is_blank_str(value: Option<&str>) -> bool {
  value.is_none_or(str::is_empty)
}

fn is_blank_value(value: &Value) -> bool {
  match value {
    Value::Null => true,
    Value::Bool(flag) => !flag,
    Value::String(text) => text.is_empty(),
    Value::Number(number) => number.as_f64() == Some(0.0),
    Value::Array(_) | Value::Object(_) => false,
  }
}
