//! Main HTML rewriting for the versioned module layout.

use std::fs;
use std::path::Path;
use std::sync::OnceLock;

use anyhow::{Context, Result};
use regex::bytes::Regex;
use tracing::{info, warn};

use super::StepOutcome;
use crate::paths::PublishPaths;

/// Placeholder expanded by the host application into the module's support URL.
pub const MODULE_IMAGE_PLACEHOLDER: &str = "`modImg`";

fn stylesheet_href_pattern() -> &'static Regex {
  static PATTERN: OnceLock<Regex> = OnceLock::new();
  PATTERN.get_or_init(|| {
    Regex::new(r#"\s*href=(['"])/?static/css/"#).expect("invalid stylesheet href regex")
  })
}

fn script_src_pattern() -> &'static Regex {
  static PATTERN: OnceLock<Regex> = OnceLock::new();
  PATTERN.get_or_init(|| {
    Regex::new(r#"\s*src=(['"])/?static/js/"#).expect("invalid script src regex")
  })
}

/// Point every `static/css/` href and `static/js/` src at the module placeholder.
///
/// The whitespace run before the attribute collapses to a single space and the original
/// quote character is kept. Already rewritten references are left alone. Bytes outside
/// the matched references are kept exactly, whatever their encoding.
pub fn rewrite_asset_bytes(html: &[u8]) -> Vec<u8> {
  let href_replacement = format!(" href=${{1}}{MODULE_IMAGE_PLACEHOLDER}static/css/");
  let src_replacement = format!(" src=${{1}}{MODULE_IMAGE_PLACEHOLDER}static/js/");

  let text = stylesheet_href_pattern().replace_all(html, href_replacement.as_bytes());
  script_src_pattern()
    .replace_all(&text, src_replacement.as_bytes())
    .into_owned()
}

/// [`rewrite_asset_bytes`] for text already held as a string.
pub fn rewrite_asset_references(html: &str) -> String {
  String::from_utf8_lossy(&rewrite_asset_bytes(html.as_bytes())).into_owned()
}

/// Rewrite the build's `index.html` into the module's html directory.
///
/// Failures are logged and reported through the returned outcome.
pub fn publish_main_html(paths: &PublishPaths) -> StepOutcome {
  match write_main_html(paths) {
    Ok(()) => StepOutcome::Completed,
    Err(err) => {
      warn!("Warning: {err:#}");
      StepOutcome::Failed(format!("{err:#}"))
    }
  }
}

fn write_main_html(paths: &PublishPaths) -> Result<()> {
  let source = &paths.source_main_html;
  let target = &paths.target_main_html;

  let html =
    fs::read(source).with_context(|| format!("failed to read {}", source.display()))?;
  let html = rewrite_asset_bytes(&html);

  info!("Copying {} to {}", source.display(), target.display());

  if let Some(parent) = target.parent().filter(|parent| !parent.as_os_str().is_empty()) {
    create_parent(parent)?;
  }
  fs::write(target, html).with_context(|| format!("failed to write {}", target.display()))
}

fn create_parent(dir: &Path) -> Result<()> {
  fs::create_dir_all(dir).with_context(|| format!("failed to create {}", dir.display()))
}
