//! Publish a build into the host module tree.
//!
//! Publishing runs two independent, best-effort steps: the main HTML document is rewritten
//! into the module's `html` directory, then the rest of the build is copied into both
//! support trees. Neither step returns an error; their outcomes are collected in a
//! [`PublishReport`].

pub mod assets;
pub mod html;

use std::path::PathBuf;

use tracing::info;

use crate::paths::PublishPaths;
use assets::{CopyObserver, LoggingObserver};

pub use assets::{copy_tree, publish_assets};
pub use html::{publish_main_html, rewrite_asset_bytes, rewrite_asset_references};

/// Result of a best-effort publish step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
  /// The step finished.
  Completed,
  /// The step failed with the logged message.
  Failed(String),
}

impl StepOutcome {
  /// Returns `true` for [`StepOutcome::Failed`].
  pub fn is_failed(&self) -> bool {
    matches!(self, Self::Failed(_))
  }
}

/// Outcome of copying the build into one support directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DestinationOutcome {
  /// Support directory that was targeted.
  pub destination: PathBuf,
  /// What happened.
  pub outcome: StepOutcome,
}

/// Outcomes of every step of a publish run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishReport {
  /// HTML rewrite step.
  pub main_html: StepOutcome,
  /// Asset distribution, one entry per support directory.
  pub destinations: Vec<DestinationOutcome>,
}

impl PublishReport {
  /// Returns `true` when every step completed.
  pub fn is_complete(&self) -> bool {
    !self.main_html.is_failed() && !self.destinations.iter().any(|dest| dest.outcome.is_failed())
  }
}

/// Runs both publish steps for a set of derived paths.
pub struct Publisher<O = LoggingObserver> {
  paths: PublishPaths,
  observer: O,
}

impl Publisher {
  /// Publisher reporting copied entries through `tracing`.
  pub fn new(paths: PublishPaths) -> Self {
    Self {
      paths,
      observer: LoggingObserver,
    }
  }
}

impl<O: CopyObserver + Sync> Publisher<O> {
  /// Replace the observer notified for every copied entry.
  pub fn with_observer<P: CopyObserver + Sync>(self, observer: P) -> Publisher<P> {
    Publisher {
      paths: self.paths,
      observer,
    }
  }

  /// Locations this publisher writes to.
  pub fn paths(&self) -> &PublishPaths {
    &self.paths
  }

  /// Rewrite the main HTML file, then distribute the remaining assets.
  pub fn publish(self) -> PublishReport {
    let main_html = publish_main_html(&self.paths);
    let destinations = publish_assets(&self.paths, &self.observer);

    let report = PublishReport {
      main_html,
      destinations,
    };
    if report.is_complete() {
      info!("Published {}", self.paths.build_dir.display());
    }
    report
  }
}
