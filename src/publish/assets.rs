//! Filtered recursive copy of the build directory into the support trees.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::thread;

use anyhow::{Context, Result, anyhow, bail};
use same_file::is_same_file;
use tracing::{debug, info, warn};

use super::{DestinationOutcome, StepOutcome};
use crate::paths::PublishPaths;

/// Top-level directories whose contents are logged per directory rather than per file.
const DIRECTORY_LOGGED_PREFIXES: [&str; 2] = ["css", "fonts"];

/// Decides whether an entry of the source tree is copied.
pub trait CopyFilter {
  /// Returns `true` when `path` (and, for directories, its subtree) should be copied.
  fn includes(&self, path: &Path) -> bool;
}

impl<F> CopyFilter for F
where
  F: Fn(&Path) -> bool,
{
  fn includes(&self, path: &Path) -> bool {
    self(path)
  }
}

/// Filter dropping the build's main HTML file, which is published separately.
#[derive(Debug, Clone)]
pub struct ExcludeMainHtml {
  main_html: PathBuf,
}

impl ExcludeMainHtml {
  /// Exclude exactly `build_dir/index.html`.
  pub fn new(paths: &PublishPaths) -> Self {
    Self {
      main_html: paths.source_main_html.clone(),
    }
  }
}

impl CopyFilter for ExcludeMainHtml {
  fn includes(&self, path: &Path) -> bool {
    path != self.main_html
  }
}

/// Kind of filesystem entry visited during a copy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
  /// A directory.
  Directory,
  /// A regular file.
  File,
  /// A symbolic link, copied as a link.
  Symlink,
}

/// An entry accepted by the filter and about to be copied.
#[derive(Debug, Clone, Copy)]
pub struct CopiedEntry<'a> {
  /// Absolute or caller-relative source path.
  pub source: &'a Path,
  /// Path relative to the copied root; empty for the root itself.
  pub relative: &'a Path,
  /// Root of the destination tree.
  pub destination_root: &'a Path,
  /// Entry kind.
  pub kind: EntryKind,
}

/// Callback invoked for every entry the filter includes.
pub trait CopyObserver {
  /// Called before `entry` is copied.
  fn entry_included(&self, entry: &CopiedEntry<'_>);
}

/// Observer writing progress lines through `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingObserver;

impl CopyObserver for LoggingObserver {
  fn entry_included(&self, entry: &CopiedEntry<'_>) {
    if should_log_entry(entry.relative, entry.kind) {
      info!(
        "Copying {} to {}",
        entry.relative.display(),
        entry.destination_root.display()
      );
    }
  }
}

/// Observer ignoring every entry.
#[derive(Debug, Clone, Copy, Default)]
pub struct SilentObserver;

impl CopyObserver for SilentObserver {
  fn entry_included(&self, _entry: &CopiedEntry<'_>) {}
}

/// Whether an included entry deserves a progress line.
///
/// Entries under `css*` or `fonts*` are reported once per directory; everything else is
/// reported per file.
pub fn should_log_entry(relative: &Path, kind: EntryKind) -> bool {
  let relative = relative.to_string_lossy();
  let grouped = DIRECTORY_LOGGED_PREFIXES
    .iter()
    .any(|prefix| relative.starts_with(prefix));

  if grouped {
    kind == EntryKind::Directory
  } else {
    kind == EntryKind::File
  }
}

/// Summary of one completed tree copy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CopyStats {
  /// Directories created or reused in the destination.
  pub directories: usize,
  /// Files (and links) written.
  pub files: usize,
  /// Entries rejected by the filter.
  pub skipped: usize,
}

/// Recursively copy `source_root` into `destination_root`.
///
/// The filter sees every entry including the root; a rejected directory is skipped along
/// with its subtree. Existing destination files are overwritten.
pub fn copy_tree<F, O>(
  source_root: &Path,
  destination_root: &Path,
  filter: &F,
  observer: &O,
) -> Result<CopyStats>
where
  F: CopyFilter + ?Sized,
  O: CopyObserver + ?Sized,
{
  let metadata = fs::symlink_metadata(source_root)
    .with_context(|| format!("failed to read {}", source_root.display()))?;
  if !metadata.is_dir() {
    bail!("{} is not a directory", source_root.display());
  }
  ensure_not_nested(source_root, destination_root)?;

  let mut stats = CopyStats::default();
  copy_entry(
    source_root,
    Path::new(""),
    destination_root,
    EntryKind::Directory,
    filter,
    observer,
    &mut stats,
  )?;
  Ok(stats)
}

fn copy_entry<F, O>(
  source: &Path,
  relative: &Path,
  destination_root: &Path,
  kind: EntryKind,
  filter: &F,
  observer: &O,
  stats: &mut CopyStats,
) -> Result<()>
where
  F: CopyFilter + ?Sized,
  O: CopyObserver + ?Sized,
{
  if !filter.includes(source) {
    debug!(path = %source.display(), "skipping filtered entry");
    stats.skipped += 1;
    return Ok(());
  }

  observer.entry_included(&CopiedEntry {
    source,
    relative,
    destination_root,
    kind,
  });

  let destination = if relative.as_os_str().is_empty() {
    destination_root.to_path_buf()
  } else {
    destination_root.join(relative)
  };

  match kind {
    EntryKind::Directory => {
      fs::create_dir_all(&destination)
        .with_context(|| format!("failed to create {}", destination.display()))?;
      stats.directories += 1;

      let entries =
        fs::read_dir(source).with_context(|| format!("failed to read {}", source.display()))?;
      for entry in entries {
        let entry = entry.with_context(|| format!("failed to read {}", source.display()))?;
        let file_type = entry.file_type()?;
        let child_kind = if file_type.is_symlink() {
          EntryKind::Symlink
        } else if file_type.is_dir() {
          EntryKind::Directory
        } else {
          EntryKind::File
        };
        let child_relative = relative.join(entry.file_name());
        copy_entry(
          &entry.path(),
          &child_relative,
          destination_root,
          child_kind,
          filter,
          observer,
          stats,
        )?;
      }
    }
    EntryKind::File => {
      copy_file(source, &destination)?;
      stats.files += 1;
    }
    EntryKind::Symlink => {
      copy_symlink(source, &destination)?;
      stats.files += 1;
    }
  }

  Ok(())
}

fn copy_file(source: &Path, destination: &Path) -> Result<()> {
  if destination.exists() && is_same_file(source, destination)? {
    return Ok(());
  }

  fs::copy(source, destination)
    .map(|_| ())
    .with_context(|| format!("failed to copy {} to {}", source.display(), destination.display()))
}

#[cfg(unix)]
fn copy_symlink(source: &Path, destination: &Path) -> Result<()> {
  let link_target =
    fs::read_link(source).with_context(|| format!("failed to read link {}", source.display()))?;
  match fs::remove_file(destination) {
    Ok(()) => {}
    Err(err) if err.kind() == ErrorKind::NotFound => {}
    Err(err) => {
      return Err(err).with_context(|| format!("failed to replace {}", destination.display()));
    }
  }
  std::os::unix::fs::symlink(&link_target, destination)
    .with_context(|| format!("failed to link {}", destination.display()))
}

#[cfg(not(unix))]
fn copy_symlink(source: &Path, destination: &Path) -> Result<()> {
  copy_file(source, destination)
}

fn ensure_not_nested(source_root: &Path, destination_root: &Path) -> Result<()> {
  let source = fs::canonicalize(source_root)
    .with_context(|| format!("failed to resolve {}", source_root.display()))?;
  let destination = match fs::canonicalize(destination_root) {
    Ok(path) => path,
    Err(err) if err.kind() == ErrorKind::NotFound => absolute_fallback(destination_root)?,
    Err(err) => {
      return Err(err).with_context(|| format!("failed to resolve {}", destination_root.display()));
    }
  };

  if destination.starts_with(&source) {
    return Err(anyhow!(
      "cannot copy {} into its own subdirectory {}",
      source_root.display(),
      destination_root.display()
    ));
  }
  Ok(())
}

/// Resolve a not-yet-created destination through its closest existing ancestor.
fn absolute_fallback(path: &Path) -> Result<PathBuf> {
  let absolute = std::path::absolute(path)
    .with_context(|| format!("failed to resolve {}", path.display()))?;
  let mut existing = absolute.as_path();
  let mut missing = Vec::new();
  while let Some(parent) = existing.parent() {
    if let Some(name) = existing.file_name() {
      missing.push(name.to_os_string());
    }
    existing = parent;
    if let Ok(resolved) = fs::canonicalize(existing) {
      return Ok(missing.iter().rev().fold(resolved, |acc, name| acc.join(name)));
    }
  }
  Ok(absolute)
}

/// Copy the build directory, minus its main HTML file, into both support trees.
///
/// The two copies run on separate threads and are both awaited. A failure in one
/// destination is logged and does not affect the other.
pub fn publish_assets<O>(paths: &PublishPaths, observer: &O) -> Vec<DestinationOutcome>
where
  O: CopyObserver + Sync + ?Sized,
{
  let destinations = paths.support_destinations();
  info!(
    "Copying files to support directories: {}",
    destinations
      .iter()
      .map(|path| path.display().to_string())
      .collect::<Vec<_>>()
      .join(", ")
  );

  let filter = ExcludeMainHtml::new(paths);
  let build_dir = paths.build_dir.as_path();

  thread::scope(|scope| {
    let workers: Vec<_> = destinations
      .iter()
      .map(|&destination| {
        let filter = &filter;
        let handle =
          scope.spawn(move || copy_tree(build_dir, destination, filter, observer));
        (destination, handle)
      })
      .collect();

    workers
      .into_iter()
      .map(|(destination, handle)| {
        let result = handle
          .join()
          .unwrap_or_else(|_| Err(anyhow!("copy into {} panicked", destination.display())));
        let outcome = match result {
          Ok(stats) => {
            debug!(
              destination = %destination.display(),
              files = stats.files,
              directories = stats.directories,
              "support copy finished"
            );
            StepOutcome::Completed
          }
          Err(err) => {
            warn!("Warning: {err:#}");
            StepOutcome::Failed(format!("{err:#}"))
          }
        };
        DestinationOutcome {
          destination: destination.to_path_buf(),
          outcome,
        }
      })
      .collect()
  })
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::paths::derive_paths;
  use crate::version::VersionSpec;
  use std::sync::Mutex;
  use tempfile::tempdir;

  #[derive(Default)]
  struct RecordingObserver {
    entries: Mutex<Vec<(PathBuf, EntryKind)>>,
  }

  impl CopyObserver for RecordingObserver {
    fn entry_included(&self, entry: &CopiedEntry<'_>) {
      self
        .entries
        .lock()
        .unwrap()
        .push((entry.relative.to_path_buf(), entry.kind));
    }
  }

  fn write(path: &Path, contents: &str) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, contents).unwrap();
  }

  fn build_fixture(root: &Path) -> PublishPaths {
    let build = root.join("build");
    write(&build.join("index.html"), "<html></html>");
    write(&build.join("asset-manifest.json"), "{}");
    write(&build.join("static/js/app.js"), "console.log(1);");
    write(&build.join("static/css/main.css"), "body{}");
    write(&build.join("css/theme.css"), "a{}");
    write(&build.join("fonts/icons.woff"), "woff");
    write(&build.join("nested/index.html"), "<p>nested</p>");

    derive_paths(&build, &root.join("host"), "widget", &VersionSpec::from("1.2.3"), "")
      .unwrap()
  }

  #[test]
  fn copies_nested_files_into_both_destinations() {
    let temp = tempdir().unwrap();
    let paths = build_fixture(temp.path());

    let outcomes = publish_assets(&paths, &SilentObserver);
    assert_eq!(outcomes.len(), 2);
    assert!(outcomes.iter().all(|result| result.outcome == StepOutcome::Completed));

    for destination in paths.support_destinations() {
      assert_eq!(
        fs::read_to_string(destination.join("static/js/app.js")).unwrap(),
        "console.log(1);"
      );
      assert!(destination.join("static/css/main.css").is_file());
      assert!(destination.join("fonts/icons.woff").is_file());
    }
  }

  #[test]
  fn never_copies_top_level_main_html() {
    let temp = tempdir().unwrap();
    let paths = build_fixture(temp.path());

    publish_assets(&paths, &SilentObserver);

    for destination in paths.support_destinations() {
      assert!(!destination.join("index.html").exists());
      assert!(destination.join("nested/index.html").is_file());
      assert!(destination.join("asset-manifest.json").is_file());
    }
  }

  #[test]
  fn exclude_main_html_matches_exact_path_only() {
    let temp = tempdir().unwrap();
    let paths = build_fixture(temp.path());
    let filter = ExcludeMainHtml::new(&paths);

    assert!(!filter.includes(&paths.build_dir.join("index.html")));
    assert!(filter.includes(&paths.build_dir.join("nested/index.html")));
    assert!(filter.includes(&paths.build_dir.join("index.html.map")));
    assert!(filter.includes(&paths.build_dir));
  }

  #[test]
  fn observer_sees_every_included_entry() {
    let temp = tempdir().unwrap();
    let paths = build_fixture(temp.path());
    let observer = RecordingObserver::default();
    let destination = temp.path().join("out");

    let stats = copy_tree(
      &paths.build_dir,
      &destination,
      &ExcludeMainHtml::new(&paths),
      &observer,
    )
    .unwrap();

    let entries = observer.entries.into_inner().unwrap();
    assert!(entries.contains(&(PathBuf::new(), EntryKind::Directory)));
    assert!(entries.contains(&(PathBuf::from("static/js/app.js"), EntryKind::File)));
    assert!(!entries.iter().any(|(path, _)| path == Path::new("index.html")));
    assert_eq!(stats.skipped, 1);
    assert_eq!(stats.files, 6);
  }

  #[test]
  fn closure_filters_prune_whole_directories() {
    let temp = tempdir().unwrap();
    let paths = build_fixture(temp.path());
    let destination = temp.path().join("out");
    let skip_static = |path: &Path| !path.ends_with("static");

    copy_tree(&paths.build_dir, &destination, &skip_static, &SilentObserver).unwrap();

    assert!(!destination.join("static").exists());
    assert!(destination.join("css/theme.css").is_file());
  }

  #[test]
  fn logs_css_and_font_directories_and_other_files() {
    assert!(should_log_entry(Path::new("css"), EntryKind::Directory));
    assert!(!should_log_entry(Path::new("css/theme.css"), EntryKind::File));
    assert!(should_log_entry(Path::new("fonts/sub"), EntryKind::Directory));
    assert!(!should_log_entry(Path::new("fonts/icons.woff"), EntryKind::File));

    assert!(should_log_entry(Path::new("static/js/app.js"), EntryKind::File));
    assert!(!should_log_entry(Path::new("static"), EntryKind::Directory));
    assert!(!should_log_entry(Path::new(""), EntryKind::Directory));
  }

  #[test]
  fn missing_build_dir_is_reported_per_destination() {
    let temp = tempdir().unwrap();
    let paths = derive_paths(
      &temp.path().join("no-build"),
      &temp.path().join("host"),
      "widget",
      &VersionSpec::from("1.0.0"),
      "",
    )
    .unwrap();

    let outcomes = publish_assets(&paths, &SilentObserver);
    assert_eq!(outcomes.len(), 2);
    assert!(outcomes.iter().all(|result| result.outcome.is_failed()));
    assert!(!paths.global_support_dir.exists());
  }

  #[test]
  fn failed_destination_does_not_block_the_other() {
    let temp = tempdir().unwrap();
    let paths = build_fixture(temp.path());
    write(&paths.global_support_dir, "not a directory");

    let outcomes = publish_assets(&paths, &SilentObserver);

    assert_eq!(outcomes.len(), 2);
    assert_eq!(outcomes[0].destination, paths.module_support_dir);
    assert_eq!(outcomes[0].outcome, StepOutcome::Completed);
    assert_eq!(outcomes[1].destination, paths.global_support_dir);
    assert!(outcomes[1].outcome.is_failed());
    assert_eq!(
      fs::read_to_string(paths.module_support_dir.join("static/js/app.js")).unwrap(),
      "console.log(1);"
    );
    assert_eq!(
      fs::read_to_string(&paths.global_support_dir).unwrap(),
      "not a directory"
    );
  }

  #[test]
  fn refuses_to_copy_into_own_subdirectory() {
    let temp = tempdir().unwrap();
    let paths = build_fixture(temp.path());
    let inside = paths.build_dir.join("support");

    let err = copy_tree(&paths.build_dir, &inside, &ExcludeMainHtml::new(&paths), &SilentObserver)
      .unwrap_err();
    assert!(err.to_string().contains("own subdirectory"));
    assert!(!inside.exists());
  }

  #[test]
  fn overwrites_existing_destination_files() {
    let temp = tempdir().unwrap();
    let paths = build_fixture(temp.path());
    let destination = temp.path().join("out");
    write(&destination.join("static/js/app.js"), "stale");

    copy_tree(&paths.build_dir, &destination, &ExcludeMainHtml::new(&paths), &SilentObserver)
      .unwrap();

    assert_eq!(
      fs::read_to_string(destination.join("static/js/app.js")).unwrap(),
      "console.log(1);"
    );
  }

  #[cfg(unix)]
  #[test]
  fn recreates_symlinks_as_links() {
    let temp = tempdir().unwrap();
    let paths = build_fixture(temp.path());
    std::os::unix::fs::symlink("static/js/app.js", paths.build_dir.join("latest.js")).unwrap();
    let destination = temp.path().join("out");

    copy_tree(&paths.build_dir, &destination, &ExcludeMainHtml::new(&paths), &SilentObserver)
      .unwrap();

    let link = destination.join("latest.js");
    assert!(fs::symlink_metadata(&link).unwrap().file_type().is_symlink());
    assert_eq!(fs::read_to_string(&link).unwrap(), "console.log(1);");
  }
}
