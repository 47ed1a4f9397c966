#![doc = include_str!("../README.md")]
#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod paths;
pub mod project;
pub mod publish;
pub mod version;

pub use config::{InstallConfig, ModuleDescriptor};
pub use error::{ConfigurationError, PublishError};
pub use paths::{PublishPaths, derive_paths};
pub use project::PublishContext;
pub use publish::{PublishReport, Publisher, StepOutcome};
pub use version::VersionSpec;
