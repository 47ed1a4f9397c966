//! Error types surfaced by configuration loading and path derivation.

use std::path::PathBuf;

use thiserror::Error;

/// Shapes accepted for the `version` field, quoted in [`PublishError::InvalidVersion`].
pub const EXPECTED_VERSION_SHAPES: &str =
  "a 3-element array such as [1, 2, 3] or a dotted string such as \"1.2.3\"";

/// Errors raised while locating or validating the install configuration.
#[derive(Debug, Error)]
pub enum ConfigurationError {
  /// None of the candidate configuration files exist.
  #[error("no install configuration found (looked for {})", display_paths(.candidates))]
  NotFound {
    /// Candidate paths checked, in order.
    candidates: Vec<PathBuf>,
  },
  /// The configuration file exists but could not be read.
  #[error("failed to read {}: {source}", .path.display())]
  Read {
    /// Path that caused the error.
    path: PathBuf,
    /// Source I/O error.
    source: std::io::Error,
  },
  /// The configuration file is not valid JSON of the expected shape.
  #[error("failed to parse {}: {source}", .path.display())]
  Parse {
    /// Path that caused the error.
    path: PathBuf,
    /// Source parse error.
    source: serde_json::Error,
  },
  /// One or more required fields are absent or empty.
  #[error("missing required field(s): {}", .0.join(", "))]
  MissingFields(Vec<&'static str>),
}

/// Fatal errors that stop a publish run before any files are written.
#[derive(Debug, Error)]
pub enum PublishError {
  /// The install configuration is unusable.
  #[error(transparent)]
  Configuration(#[from] ConfigurationError),
  /// The `version` value has a shape that cannot be normalised.
  #[error("invalid version {found}: expected {}", EXPECTED_VERSION_SHAPES)]
  InvalidVersion {
    /// Rendering of the rejected value.
    found: String,
  },
  /// The module identifier has no usable directory name.
  #[error("invalid module {module:?}: expected a directory name")]
  InvalidModule {
    /// The rejected identifier.
    module: String,
  },
}

fn display_paths(paths: &[PathBuf]) -> String {
  paths
    .iter()
    .map(|path| path.display().to_string())
    .collect::<Vec<_>>()
    .join(", ")
}
