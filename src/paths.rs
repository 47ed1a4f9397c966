//! Derivation of every filesystem location touched by a publish run.

use std::path::{Component, Path, PathBuf};

use crate::error::PublishError;
use crate::version::VersionSpec;

/// File name of the main HTML document produced by the build.
pub const DEFAULT_MAIN_HTML: &str = "index.html";

const MODULE_DIR: &str = "module";
const SUPPORT_DIR: &str = "support";
const HTML_DIR: &str = "html";

/// Target locations for one publish run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishPaths {
  /// `base/module/<module>_<version>/support`
  pub module_support_dir: PathBuf,
  /// `base/module/<module>_<version>/html`
  pub module_html_dir: PathBuf,
  /// `base/support/<module>`
  pub global_support_dir: PathBuf,
  /// Main HTML file inside the build directory.
  pub source_main_html: PathBuf,
  /// Destination of the rewritten main HTML file.
  pub target_main_html: PathBuf,
  /// Build output directory being published.
  pub build_dir: PathBuf,
}

impl PublishPaths {
  /// Support trees receiving a copy of the build directory.
  pub fn support_destinations(&self) -> [&Path; 2] {
    [self.module_support_dir.as_path(), self.global_support_dir.as_path()]
  }
}

/// Versioned directory name of a module, e.g. `widget_2_0_1`.
pub fn full_module_name(module: &str, version: &VersionSpec) -> Result<String, PublishError> {
  Ok(format!("{module}_{}", version.normalize()?))
}

/// Keep only the plain name components of `value`.
///
/// Roots, drive prefixes, `.` and `..` are dropped so the result always joins beneath its
/// parent.
fn relative_segment(value: &str) -> PathBuf {
  Path::new(value)
    .components()
    .filter_map(|component| match component {
      Component::Normal(name) => Some(name),
      _ => None,
    })
    .collect()
}

/// Compute the publish locations for `module` at `version` beneath `base`.
///
/// Only joins paths; nothing is read from or written to disk. `module` and
/// `main_html_name` are reduced to their plain name components, so every module path
/// stays under `base`. A `main_html_name` with no such component falls back to
/// [`DEFAULT_MAIN_HTML`].
pub fn derive_paths(
  build_dir: &Path,
  base: &Path,
  module: &str,
  version: &VersionSpec,
  main_html_name: &str,
) -> Result<PublishPaths, PublishError> {
  let module_segment = relative_segment(module);
  if module_segment.as_os_str().is_empty() {
    return Err(PublishError::InvalidModule {
      module: module.to_string(),
    });
  }

  let full_name = relative_segment(&full_module_name(module, version)?);
  let module_root = base.join(MODULE_DIR).join(full_name);
  let module_html_dir = module_root.join(HTML_DIR);
  let mut main_html = relative_segment(main_html_name);
  if main_html.as_os_str().is_empty() {
    main_html = PathBuf::from(DEFAULT_MAIN_HTML);
  }

  Ok(PublishPaths {
    module_support_dir: module_root.join(SUPPORT_DIR),
    target_main_html: module_html_dir.join(main_html),
    module_html_dir,
    global_support_dir: base.join(SUPPORT_DIR).join(module_segment),
    source_main_html: build_dir.join(DEFAULT_MAIN_HTML),
    build_dir: build_dir.to_path_buf(),
  })
}
