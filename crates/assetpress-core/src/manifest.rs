//! The optimization manifest: a project-local record of optimized content digests.
//!
//! The manifest lives at `<project>/.expo-shared/assets.json` and is meant to be
//! committed, so every machine sharing the repository skips assets that were
//! already optimized elsewhere. It is a flat JSON object mapping hex digests to
//! `true`. This module never removes entries.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::ManifestError;

/// Directory (relative to the project root) holding shared project state.
pub const MANIFEST_DIR: &str = ".expo-shared";

/// File name of the manifest inside [`MANIFEST_DIR`].
pub const MANIFEST_FILE: &str = "assets.json";

const README_FILE: &str = "README.md";

const README_CONTENTS: &str = "\
> Why do I have a folder named \".expo-shared\" in my project?

The \".expo-shared\" folder is created when running commands that produce state that is intended to be shared with all developers on the project. For example, \"assetpress optimize\".

> What does the \"assets.json\" file contain?

The \"assets.json\" file describes the assets that have been optimized through \"assetpress optimize\" and do not need to be processed again.

> Should I commit the \".expo-shared\" folder?

Yes, you should share the \".expo-shared\" folder with your collaborators.
";

/// Content digest → "has been optimized". Keys are serialized in sorted order.
pub type OptimizationRecord = BTreeMap<String, bool>;

/// Notices emitted by the store. The store never logs these itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ManifestEvent {
    /// A new, empty manifest was written; it should be committed
    Created { path: PathBuf },
}

/// Handle to a project's manifest document.
#[derive(Debug, Clone)]
pub struct ManifestStore {
    path: PathBuf,
}

impl ManifestStore {
    /// Location of the manifest for a project.
    pub fn path_for(project_root: &Path) -> PathBuf {
        project_root.join(MANIFEST_DIR).join(MANIFEST_FILE)
    }

    /// Whether the project has a manifest yet.
    pub fn exists(project_root: &Path) -> bool {
        Self::path_for(project_root).is_file()
    }

    /// Load the manifest, creating the directory and an empty document if needed.
    ///
    /// `on_event` receives [`ManifestEvent::Created`] when the document did not
    /// exist; later loads find the file and emit nothing. A document that
    /// exists but does not parse is an error, never an empty record.
    pub fn load<F>(
        project_root: &Path,
        mut on_event: F,
    ) -> Result<(Self, OptimizationRecord), ManifestError>
    where
        F: FnMut(ManifestEvent),
    {
        let dir = project_root.join(MANIFEST_DIR);
        std::fs::create_dir_all(&dir).map_err(|source| ManifestError::CreateDir {
            path: dir.clone(),
            source,
        })?;

        let store = Self {
            path: dir.join(MANIFEST_FILE),
        };

        if !store.path.exists() {
            let record = OptimizationRecord::new();
            store.save(&record)?;
            store.write_readme(&dir)?;
            tracing::debug!("Created manifest at {:?}", store.path);
            on_event(ManifestEvent::Created {
                path: store.path.clone(),
            });
            return Ok((store, record));
        }

        let record = Self::parse(&store.path)?;
        Ok((store, record))
    }

    /// Read the manifest without creating anything.
    ///
    /// Returns `Ok(None)` when the project has no manifest yet.
    pub fn read(project_root: &Path) -> Result<Option<OptimizationRecord>, ManifestError> {
        let path = Self::path_for(project_root);
        if !path.exists() {
            return Ok(None);
        }
        Self::parse(&path).map(Some)
    }

    /// Persist the record, replacing the document atomically.
    ///
    /// The JSON is written to a temporary file in the manifest directory and
    /// renamed over the target, so readers see either the old or the new file.
    pub fn save(&self, record: &OptimizationRecord) -> Result<(), ManifestError> {
        let write_err = |source| ManifestError::Write {
            path: self.path.clone(),
            source,
        };

        let dir = self.path.parent().unwrap_or_else(|| Path::new("."));
        let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(write_err)?;

        let json = serde_json::to_string_pretty(record).map_err(|e| write_err(e.into()))?;
        tmp.write_all(json.as_bytes()).map_err(write_err)?;
        tmp.write_all(b"\n").map_err(write_err)?;
        tmp.as_file().sync_all().map_err(write_err)?;

        tmp.persist(&self.path).map_err(|e| write_err(e.error))?;
        tracing::debug!("Saved {} manifest entries to {:?}", record.len(), self.path);
        Ok(())
    }

    /// Path of the manifest document.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn parse(path: &Path) -> Result<OptimizationRecord, ManifestError> {
        let content = std::fs::read_to_string(path).map_err(|source| ManifestError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&content).map_err(|source| ManifestError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    fn write_readme(&self, dir: &Path) -> Result<(), ManifestError> {
        let readme = dir.join(README_FILE);
        if readme.exists() {
            return Ok(());
        }
        std::fs::write(&readme, README_CONTENTS).map_err(|source| ManifestError::Write {
            path: readme,
            source,
        })
    }
}
