//! Asset discovery: glob expansion, include/exclude filtering, and image filtering.

use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use std::borrow::Cow;
use std::collections::BTreeSet;
use std::path::{Component, Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

use crate::config::SelectionConfig;
use crate::error::SelectionError;

use super::backup::is_backup;
use super::processor::OptimizeOptions;

/// Extensions (lowercase) of the image types the optimizer handles.
pub const SUPPORTED_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg"];

/// Pattern used when a project declares no asset bundle patterns.
pub const DEFAULT_PATTERN: &str = "**/*";

/// The files a run knows about.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssetSelection {
    /// Every bundlable image in the project, regardless of include/exclude
    pub all_files: BTreeSet<PathBuf>,
    /// The subset narrowed by include/exclude for this run
    pub selected_files: BTreeSet<PathBuf>,
    /// Entries the walk could not read (permissions, symlink loops)
    pub unreadable: BTreeSet<PathBuf>,
}

/// Expands asset patterns into absolute image paths under a project root.
pub struct AssetSelector {
    config: SelectionConfig,
}

impl AssetSelector {
    /// Create a new selector with the given selection settings.
    pub fn new(config: SelectionConfig) -> Self {
        Self { config }
    }

    /// Compute the full asset set and the selected subset for a run.
    ///
    /// `bundle_patterns` come from the project configuration; an empty list
    /// means "everything". An explicit `include` replaces the selected set
    /// outright (it is not intersected with `all_files`), and `exclude` only
    /// applies when present. Absolute patterns must lie under `project_root`.
    pub fn select(
        &self,
        project_root: &Path,
        bundle_patterns: &[String],
        options: &OptimizeOptions,
    ) -> Result<AssetSelection, SelectionError> {
        if !project_root.is_dir() {
            return Err(SelectionError::RootNotFound(project_root.to_path_buf()));
        }

        let bundle = if bundle_patterns.is_empty() {
            compile_set(project_root, &[DEFAULT_PATTERN])?
        } else {
            compile_set(project_root, bundle_patterns)?
        };
        let include = options
            .include
            .as_deref()
            .map(|pattern| compile_set(project_root, &[pattern]))
            .transpose()?;
        let exclude = options
            .exclude
            .as_deref()
            .map(|pattern| compile_set(project_root, &[pattern]))
            .transpose()?;

        let (entries, unreadable) = self.walk(project_root);

        let mut all_files = BTreeSet::new();
        let mut selected = BTreeSet::new();
        for relative in entries {
            let bundled = bundle.is_match(&relative);
            let chosen = match &include {
                Some(include) => include.is_match(&relative),
                None => bundled,
            };
            let excluded = exclude.as_ref().is_some_and(|set| set.is_match(&relative));

            if chosen && !excluded {
                selected.insert(relative.clone());
            }
            if bundled {
                all_files.insert(relative);
            }
        }

        let selection = AssetSelection {
            all_files: Self::finalize(project_root, all_files),
            selected_files: Self::finalize(project_root, selected),
            unreadable,
        };
        tracing::debug!(
            "Selected {} of {} assets under {:?}",
            selection.selected_files.len(),
            selection.all_files.len(),
            project_root
        );
        Ok(selection)
    }

    /// Walk the project once, returning root-relative entries and the paths
    /// that could not be read. Ignored and hidden entries are pruned.
    fn walk(&self, project_root: &Path) -> (Vec<PathBuf>, BTreeSet<PathBuf>) {
        let walker = WalkDir::new(project_root)
            .follow_links(true)
            .min_depth(1)
            .into_iter()
            .filter_entry(|entry| !self.is_pruned(entry));

        let mut entries = Vec::new();
        let mut unreadable = BTreeSet::new();
        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    let path = e.path().unwrap_or(project_root).to_path_buf();
                    tracing::warn!("Skipping {:?} during asset discovery: {}", path, e);
                    unreadable.insert(path);
                    continue;
                }
            };
            if let Ok(relative) = entry.path().strip_prefix(project_root) {
                entries.push(relative.to_path_buf());
            }
        }

        (entries, unreadable)
    }

    /// Entries the walk never descends into or reports.
    fn is_pruned(&self, entry: &DirEntry) -> bool {
        let Some(name) = entry.file_name().to_str() else {
            return false;
        };
        if name.starts_with('.') {
            return true;
        }
        entry.file_type().is_dir() && self.config.ignored_dirs.iter().any(|d| d == name)
    }

    /// Normalize against the root and keep only supported image types.
    ///
    /// `.orig` backups written by earlier runs are never assets themselves.
    fn finalize(project_root: &Path, paths: BTreeSet<PathBuf>) -> BTreeSet<PathBuf> {
        paths
            .into_iter()
            .map(|p| normalize(project_root, &p))
            .filter(|p| is_supported(p) && !is_backup(p))
            .collect()
    }
}

/// Compile patterns into one set where `*` and `?` stay within a path segment.
fn compile_set<S: AsRef<str>>(
    project_root: &Path,
    patterns: &[S],
) -> Result<GlobSet, SelectionError> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let pattern = pattern.as_ref();
        let relative = relative_pattern(project_root, pattern)?;
        let glob = GlobBuilder::new(&relative)
            .literal_separator(true)
            .build()
            .map_err(|e| SelectionError::Pattern {
                pattern: pattern.to_string(),
                message: e.to_string(),
            })?;
        builder.add(glob);
    }
    builder.build().map_err(|e| SelectionError::Pattern {
        pattern: patterns
            .iter()
            .map(|p| p.as_ref())
            .collect::<Vec<&str>>()
            .join(", "),
        message: e.to_string(),
    })
}

/// Rewrite a pattern relative to the project root.
///
/// Absolute patterns (typically from shell completion) have the root stripped;
/// one pointing outside the root can never match and is rejected.
fn relative_pattern<'a>(
    project_root: &Path,
    pattern: &'a str,
) -> Result<Cow<'a, str>, SelectionError> {
    let path = Path::new(pattern);
    if !path.is_absolute() {
        return Ok(Cow::Borrowed(pattern.trim_start_matches("./")));
    }
    match path.strip_prefix(project_root) {
        Ok(relative) if !relative.as_os_str().is_empty() => {
            Ok(Cow::Owned(relative.to_string_lossy().into_owned()))
        }
        _ => Err(SelectionError::Pattern {
            pattern: pattern.to_string(),
            message: format!(
                "absolute pattern does not point inside the project root {}",
                project_root.display()
            ),
        }),
    }
}

/// Resolve a path to `root + relative`, collapsing redundant separators and `.` segments.
pub fn normalize(project_root: &Path, path: &Path) -> PathBuf {
    let relative = path.strip_prefix(project_root).unwrap_or(path);
    let mut normalized = project_root.to_path_buf();
    for component in relative.components() {
        match component {
            Component::CurDir | Component::RootDir | Component::Prefix(_) => {}
            other => normalized.push(other.as_os_str()),
        }
    }
    normalized
}

/// Check if a path has a supported image extension (case-insensitive).
pub fn is_supported(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            let ext_lower = ext.to_lowercase();
            SUPPORTED_EXTENSIONS.iter().any(|s| *s == ext_lower)
        })
        .unwrap_or(false)
}
