//! Optimization orchestration: select, hash, look up, recompress, record, persist.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Semaphore;

use crate::config::{Config, OptimizeConfig};
use crate::error::{AssetError, AssetPhase, Result};
use crate::manifest::{ManifestEvent, ManifestStore, OptimizationRecord};
use crate::project::ProjectConfig;

use super::backup::backup_path;
use super::discovery::{AssetSelection, AssetSelector};
use super::hash::Hasher;
use super::recompress::{ImageRecompressor, Recompressor};

/// Options for a single optimization run.
#[derive(Debug, Clone)]
pub struct OptimizeOptions {
    /// Recompression quality (1-100)
    pub quality: u8,
    /// Glob that replaces the project's asset set for this run
    pub include: Option<String>,
    /// Glob whose matches are removed from the selection
    pub exclude: Option<String>,
    /// Persist the manifest at the end of the run
    pub save: bool,
    /// Keep `.orig` backups of replaced assets
    pub keep_originals: bool,
}

impl Default for OptimizeOptions {
    fn default() -> Self {
        Self::from_config(&OptimizeConfig::default())
    }
}

impl OptimizeOptions {
    /// Options seeded from the optimize section of the tool config.
    pub fn from_config(config: &OptimizeConfig) -> Self {
        Self {
            quality: config.quality,
            include: None,
            exclude: None,
            save: true,
            keep_originals: config.keep_originals,
        }
    }
}

/// An asset that was replaced by a smaller recompressed version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptimizedAsset {
    /// Path of the asset (now holding the recompressed bytes)
    pub path: PathBuf,
    /// Size before recompression in bytes
    pub original_size: u64,
    /// Size after recompression in bytes
    pub optimized_size: u64,
    /// Where the original bytes were kept, if they were
    pub backup: Option<PathBuf>,
}

impl OptimizedAsset {
    /// Bytes saved by the replacement.
    pub fn bytes_saved(&self) -> u64 {
        self.original_size.saturating_sub(self.optimized_size)
    }
}

/// Progress notifications emitted during a run.
///
/// After `Selected`, every selected asset produces exactly one of
/// `Skipped`, `Optimized`, `KeptOriginal`, or `Failed`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OptimizeEvent {
    /// A fresh manifest was created and should be committed
    ManifestCreated { path: PathBuf },
    /// Selection finished
    Selected { selected: usize, total: usize },
    /// The asset's digest is already recorded
    Skipped { path: PathBuf },
    /// The asset was replaced by its recompressed version
    Optimized(OptimizedAsset),
    /// Recompression did not shrink the asset, so it was left as is
    KeptOriginal { path: PathBuf },
    /// The asset could not be processed
    Failed {
        path: PathBuf,
        phase: AssetPhase,
        message: String,
    },
}

/// Summary of an optimization run.
#[derive(Debug, Default)]
pub struct OptimizationReport {
    /// Size of the full asset set
    pub total_assets: usize,
    /// Number of assets selected for this run
    pub selected: usize,
    /// Assets whose digest was already recorded
    pub skipped: usize,
    /// Assets replaced by a smaller version
    pub optimized: Vec<OptimizedAsset>,
    /// Assets recorded as optimized without replacement
    pub kept_original: Vec<PathBuf>,
    /// Per-asset failures; these never abort the run
    pub failures: Vec<AssetError>,
    /// Whether the manifest was written at the end of the run
    pub manifest_saved: bool,
}

impl OptimizationReport {
    /// Total bytes saved across all replaced assets.
    pub fn bytes_saved(&self) -> u64 {
        self.optimized.iter().map(OptimizedAsset::bytes_saved).sum()
    }

    /// Whether any asset failed.
    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }
}

/// What happened to one asset that needed work.
enum FileOutcome {
    Optimized {
        asset: OptimizedAsset,
        digest: String,
    },
    KeptOriginal {
        path: PathBuf,
        digest: String,
    },
}

/// The optimization engine.
///
/// Hashing and recompression run concurrently (bounded by `parallel_workers`),
/// while the in-memory record is only touched by the orchestrating task.
pub struct AssetOptimizer {
    selector: AssetSelector,
    recompressor: Arc<dyn Recompressor>,
    parallel: usize,
}

impl AssetOptimizer {
    /// Create an optimizer using the default `image`-based recompressor.
    pub fn new(config: &Config) -> Self {
        Self::with_recompressor(config, Arc::new(ImageRecompressor::new()))
    }

    /// Create an optimizer with a custom recompressor.
    pub fn with_recompressor(config: &Config, recompressor: Arc<dyn Recompressor>) -> Self {
        Self {
            selector: AssetSelector::new(config.selection.clone()),
            recompressor,
            parallel: config.optimize.parallel_workers.max(1),
        }
    }

    /// Override the concurrency limit.
    pub fn with_parallelism(mut self, parallel: usize) -> Self {
        self.parallel = parallel.max(1);
        self
    }

    /// Resolve the asset set for a project.
    pub fn select(&self, project_root: &Path, options: &OptimizeOptions) -> Result<AssetSelection> {
        let project = ProjectConfig::load(project_root)?;
        Ok(self
            .selector
            .select(project_root, &project.asset_bundle_patterns, options)?)
    }

    /// Whether any selected asset lacks a manifest record.
    ///
    /// A project without a manifest always needs work. Nothing is created or
    /// modified; unreadable assets are logged and ignored.
    pub async fn has_unoptimized_assets(
        &self,
        project_root: &Path,
        options: &OptimizeOptions,
    ) -> Result<bool> {
        let Some(record) = ManifestStore::read(project_root)? else {
            tracing::debug!("No manifest in {:?}", project_root);
            return Ok(true);
        };

        let selection = self.select(project_root, options)?;
        for path in selection.selected_files {
            match Hasher::content_hash_async(path.clone()).await {
                Ok(digest) if is_recorded(&record, &digest) => {}
                Ok(_) => {
                    tracing::debug!("Unoptimized asset: {:?}", path);
                    return Ok(true);
                }
                Err(e) => tracing::warn!("Cannot hash {:?}: {}", path, e),
            }
        }

        Ok(false)
    }

    /// Optimize every selected asset that has no manifest record.
    pub async fn optimize_assets(
        &self,
        project_root: &Path,
        options: &OptimizeOptions,
    ) -> Result<OptimizationReport> {
        self.optimize_assets_with(project_root, options, |_| {}).await
    }

    /// Optimize assets, reporting progress through `on_event`.
    ///
    /// Per-asset failures are collected in the report and the remaining assets
    /// are still processed. The manifest is written once, after every asset is
    /// done, and only if `options.save` is set and something was recorded.
    pub async fn optimize_assets_with<F>(
        &self,
        project_root: &Path,
        options: &OptimizeOptions,
        mut on_event: F,
    ) -> Result<OptimizationReport>
    where
        F: FnMut(OptimizeEvent),
    {
        let (store, mut record) = ManifestStore::load(project_root, |event| match event {
            ManifestEvent::Created { path } => on_event(OptimizeEvent::ManifestCreated { path }),
        })?;

        let selection = self.select(project_root, options)?;
        let mut report = OptimizationReport {
            total_assets: selection.all_files.len(),
            selected: selection.selected_files.len(),
            ..OptimizationReport::default()
        };
        on_event(OptimizeEvent::Selected {
            selected: report.selected,
            total: report.total_assets,
        });

        // Hash everything first, then recompress only the misses
        let mut pending = Vec::new();
        for (path, digest) in self.hash_all(selection.selected_files).await {
            match digest {
                Ok(digest) if is_recorded(&record, &digest) => {
                    report.skipped += 1;
                    on_event(OptimizeEvent::Skipped { path });
                }
                Ok(digest) => pending.push((path, digest)),
                Err(error) => record_failure(&mut report, &mut on_event, error),
            }
        }

        tracing::debug!(
            "{} assets already optimized, {} to process",
            report.skipped,
            pending.len()
        );

        let mut changed = false;
        for (path, outcome) in self.optimize_all(pending, options).await {
            match outcome {
                Ok(FileOutcome::Optimized { asset, digest }) => {
                    tracing::info!(
                        "Optimized {:?}: {} -> {} bytes",
                        asset.path,
                        asset.original_size,
                        asset.optimized_size
                    );
                    record.insert(digest, true);
                    changed = true;
                    on_event(OptimizeEvent::Optimized(asset.clone()));
                    report.optimized.push(asset);
                }
                Ok(FileOutcome::KeptOriginal { path, digest }) => {
                    tracing::info!(
                        "Compressed version of {:?} was not smaller, keeping original",
                        path
                    );
                    record.insert(digest, true);
                    changed = true;
                    on_event(OptimizeEvent::KeptOriginal { path: path.clone() });
                    report.kept_original.push(path);
                }
                Err(error) => {
                    debug_assert_eq!(error.path(), &path);
                    record_failure(&mut report, &mut on_event, error);
                }
            }
        }

        if changed && options.save {
            store.save(&record)?;
            report.manifest_saved = true;
        } else if changed {
            tracing::debug!("Not saving manifest ({} entries pending)", record.len());
        }

        Ok(report)
    }

    /// Hash files concurrently, preserving input order in the result.
    async fn hash_all(
        &self,
        files: impl IntoIterator<Item = PathBuf>,
    ) -> Vec<(PathBuf, std::result::Result<String, AssetError>)> {
        let semaphore = Arc::new(Semaphore::new(self.parallel));
        let mut handles = Vec::new();

        for path in files {
            let semaphore = semaphore.clone();
            let task_path = path.clone();
            let handle = tokio::spawn(async move {
                let _permit = semaphore.acquire_owned().await.ok();
                Hasher::content_hash_async(task_path).await
            });
            handles.push((path, handle));
        }

        let mut results = Vec::with_capacity(handles.len());
        for (path, handle) in handles {
            let digest = match handle.await {
                Ok(result) => result,
                Err(e) => Err(std::io::Error::other(format!("Hash task failed: {e}"))),
            }
            .map_err(|source| AssetError::Io {
                path: path.clone(),
                phase: AssetPhase::Hash,
                source,
            });
            results.push((path, digest));
        }
        results
    }

    /// Recompress and replace files concurrently, preserving input order in the result.
    async fn optimize_all(
        &self,
        pending: Vec<(PathBuf, String)>,
        options: &OptimizeOptions,
    ) -> Vec<(PathBuf, std::result::Result<FileOutcome, AssetError>)> {
        let semaphore = Arc::new(Semaphore::new(self.parallel));
        let mut handles = Vec::with_capacity(pending.len());

        for (path, digest) in pending {
            let semaphore = semaphore.clone();
            let recompressor = self.recompressor.clone();
            let task_path = path.clone();
            let quality = options.quality;
            let keep_originals = options.keep_originals;
            let handle = tokio::spawn(async move {
                let _permit = semaphore.acquire_owned().await.ok();
                optimize_file(recompressor.as_ref(), task_path, digest, quality, keep_originals)
                    .await
            });
            handles.push((path, handle));
        }

        let mut results = Vec::with_capacity(handles.len());
        for (path, handle) in handles {
            let outcome = match handle.await {
                Ok(outcome) => outcome,
                Err(e) => {
                    tracing::error!("Optimization task panicked for {:?}: {e}", path);
                    Err(AssetError::Recompress {
                        path: path.clone(),
                        message: format!("Task join error: {e}"),
                    })
                }
            };
            results.push((path, outcome));
        }
        results
    }
}

fn is_recorded(record: &OptimizationRecord, digest: &str) -> bool {
    record.get(digest).copied().unwrap_or(false)
}

fn record_failure<F>(report: &mut OptimizationReport, on_event: &mut F, error: AssetError)
where
    F: FnMut(OptimizeEvent),
{
    tracing::error!("Failed: {}", error);
    on_event(OptimizeEvent::Failed {
        path: error.path().clone(),
        phase: error.phase(),
        message: error.to_string(),
    });
    report.failures.push(error);
}

/// Recompress one asset and swap the result into place if it is smaller.
async fn optimize_file(
    recompressor: &dyn Recompressor,
    path: PathBuf,
    digest: String,
    quality: u8,
    keep_originals: bool,
) -> std::result::Result<FileOutcome, AssetError> {
    let io_err = |phase: AssetPhase| {
        let path = path.clone();
        move |source: std::io::Error| AssetError::Io {
            path,
            phase,
            source,
        }
    };

    let original_size = tokio::fs::metadata(&path)
        .await
        .map_err(io_err(AssetPhase::Recompress))?
        .len();

    // Staged next to the asset so the final rename never crosses filesystems
    let parent = path.parent().unwrap_or_else(|| Path::new("."));
    let staging = tempfile::Builder::new()
        .prefix(".assetpress-")
        .tempdir_in(parent)
        .map_err(io_err(AssetPhase::Recompress))?;

    tracing::debug!("Recompressing {:?} with {}", path, recompressor.name());
    let output = recompressor
        .recompress(&path, staging.path(), quality)
        .await?;
    let optimized_size = tokio::fs::metadata(&output)
        .await
        .map_err(io_err(AssetPhase::Recompress))?
        .len();

    if optimized_size >= original_size {
        return Ok(FileOutcome::KeptOriginal { path, digest });
    }

    // The original is parked in the staging dir so a failed swap can be rolled
    // back, and so it is dropped with the staging dir unless a backup is kept
    let displaced = staging.path().join("original");
    tokio::fs::rename(&path, &displaced)
        .await
        .map_err(io_err(AssetPhase::Replace))?;
    if let Err(e) = tokio::fs::rename(&output, &path).await {
        if let Err(restore) = tokio::fs::rename(&displaced, &path).await {
            tracing::error!(
                "Could not restore {:?} from {:?}: {}",
                path,
                displaced,
                restore
            );
        }
        return Err(io_err(AssetPhase::Replace)(e));
    }

    let backup = if keep_originals {
        keep_backup(&path, &displaced).await
    } else {
        None
    };

    let new_digest = Hasher::content_hash_async(path.clone())
        .await
        .map_err(io_err(AssetPhase::Hash))?;

    Ok(FileOutcome::Optimized {
        asset: OptimizedAsset {
            path,
            original_size,
            optimized_size,
            backup,
        },
        digest: new_digest,
    })
}

/// Move the displaced original to its `.orig` sibling.
///
/// An existing backup is never overwritten. It holds older bytes than the
/// asset just replaced, so the newer original is dropped with the staging dir.
async fn keep_backup(path: &Path, displaced: &Path) -> Option<PathBuf> {
    let backup = backup_path(path);
    if tokio::fs::try_exists(&backup).await.unwrap_or(false) {
        tracing::warn!(
            "Backup {:?} already exists, replacing {:?} without a new backup",
            backup,
            path
        );
        return None;
    }
    match tokio::fs::rename(displaced, &backup).await {
        Ok(()) => Some(backup),
        Err(e) => {
            tracing::warn!("Could not keep backup {:?}: {}", backup, e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;

    /// Recompressor that writes a fixed fraction of the input, or fails on request.
    struct MockRecompressor {
        calls: Arc<AtomicU32>,
        fail_on: HashSet<String>,
        grow: bool,
        dir_output: bool,
        seen_quality: Arc<Mutex<Vec<u8>>>,
    }

    impl MockRecompressor {
        fn shrinking() -> Self {
            Self {
                calls: Arc::new(AtomicU32::new(0)),
                fail_on: HashSet::new(),
                grow: false,
                dir_output: false,
                seen_quality: Arc::new(Mutex::new(Vec::new())),
            }
        }

        fn growing() -> Self {
            Self {
                grow: true,
                ..Self::shrinking()
            }
        }

        /// Produces a directory instead of a file, so hashing the swapped-in
        /// output fails.
        fn directory_output() -> Self {
            Self {
                dir_output: true,
                ..Self::shrinking()
            }
        }

        fn failing_on(names: &[&str]) -> Self {
            Self {
                fail_on: names.iter().map(|n| n.to_string()).collect(),
                ..Self::shrinking()
            }
        }
    }

    #[async_trait]
    impl Recompressor for MockRecompressor {
        fn name(&self) -> &str {
            "mock"
        }

        async fn recompress(
            &self,
            input: &Path,
            output_dir: &Path,
            quality: u8,
        ) -> std::result::Result<PathBuf, AssetError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.seen_quality.lock().unwrap().push(quality);
            let name = input.file_name().unwrap().to_string_lossy().to_string();
            if self.fail_on.contains(&name) {
                return Err(AssetError::Recompress {
                    path: input.to_path_buf(),
                    message: "encoder exploded".to_string(),
                });
            }
            let output = output_dir.join(&name);
            if self.dir_output {
                std::fs::create_dir(&output).unwrap();
                return Ok(output);
            }
            let bytes = std::fs::read(input).unwrap();
            let out = if self.grow {
                [bytes.as_slice(), b"padding"].concat()
            } else {
                bytes[..bytes.len() / 2].to_vec()
            };
            std::fs::write(&output, out).unwrap();
            Ok(output)
        }
    }

    fn write(root: &Path, relative: &str, contents: &[u8]) -> PathBuf {
        let path = root.join(relative);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, contents).unwrap();
        path
    }

    fn optimizer(mock: MockRecompressor) -> AssetOptimizer {
        AssetOptimizer::with_recompressor(&Config::default(), Arc::new(mock))
    }

    #[test]
    fn test_options_default() {
        let options = OptimizeOptions::default();
        assert_eq!(options.quality, 80);
        assert!(options.save);
        assert!(!options.keep_originals);
        assert!(options.include.is_none());
        assert!(options.exclude.is_none());
    }

    fn with_backups() -> OptimizeOptions {
        OptimizeOptions {
            keep_originals: true,
            ..OptimizeOptions::default()
        }
    }

    fn staging_leftovers(dir: &Path) -> usize {
        std::fs::read_dir(dir)
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().starts_with(".assetpress-"))
            .count()
    }

    #[tokio::test]
    async fn test_optimize_replaces_and_backs_up() {
        let dir = tempfile::tempdir().unwrap();
        let asset = write(dir.path(), "assets/icon.png", b"0123456789abcdef");

        let report = optimizer(MockRecompressor::shrinking())
            .optimize_assets(dir.path(), &with_backups())
            .await
            .unwrap();

        assert_eq!(report.optimized.len(), 1);
        assert_eq!(report.bytes_saved(), 8);
        assert!(report.manifest_saved);
        assert_eq!(std::fs::read(&asset).unwrap(), b"01234567");
        let backup = dir.path().join("assets/icon.orig.png");
        assert_eq!(report.optimized[0].backup.as_ref(), Some(&backup));
        assert_eq!(std::fs::read(&backup).unwrap(), b"0123456789abcdef");

        // The manifest records the digest of the new bytes
        let record = ManifestStore::read(dir.path()).unwrap().unwrap();
        assert_eq!(record.len(), 1);
        assert!(record.contains_key(&Hasher::content_hash_from_bytes(b"01234567")));

        // No staging directories left behind
        assert_eq!(staging_leftovers(&dir.path().join("assets")), 0);
    }

    #[tokio::test]
    async fn test_second_run_recompresses_nothing() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "a.png", b"aaaaaaaaaaaaaaaa");
        write(dir.path(), "b.jpg", b"bbbbbbbbbbbbbbbb");

        let mock = MockRecompressor::shrinking();
        let calls = mock.calls.clone();
        let optimizer = optimizer(mock);

        let first = optimizer
            .optimize_assets(dir.path(), &OptimizeOptions::default())
            .await
            .unwrap();
        assert_eq!(first.optimized.len(), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 2);

        let second = optimizer
            .optimize_assets(dir.path(), &OptimizeOptions::default())
            .await
            .unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(second.skipped, 2);
        assert!(second.optimized.is_empty());
        assert!(!second.manifest_saved);
    }

    #[tokio::test]
    async fn test_larger_output_keeps_original() {
        let dir = tempfile::tempdir().unwrap();
        let asset = write(dir.path(), "logo.png", b"tiny");

        let mock = MockRecompressor::growing();
        let calls = mock.calls.clone();
        let optimizer = optimizer(mock);

        let report = optimizer
            .optimize_assets(dir.path(), &OptimizeOptions::default())
            .await
            .unwrap();
        assert_eq!(report.kept_original, vec![asset.clone()]);
        assert_eq!(std::fs::read(&asset).unwrap(), b"tiny");
        assert!(!dir.path().join("logo.orig.png").exists());

        // Recorded, so the next run does not retry it
        optimizer
            .optimize_assets(dir.path(), &OptimizeOptions::default())
            .await
            .unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failures_do_not_stop_the_batch() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "good.png", b"good good good good");
        let bad = write(dir.path(), "bad.png", b"bad bad bad bad bad");

        let report = optimizer(MockRecompressor::failing_on(&["bad.png"]))
            .optimize_assets(dir.path(), &OptimizeOptions::default())
            .await
            .unwrap();

        assert_eq!(report.optimized.len(), 1);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].path(), &bad);
        assert_eq!(report.failures[0].phase(), AssetPhase::Recompress);
        assert!(report.manifest_saved);

        // Failed asset untouched and unrecorded
        assert_eq!(std::fs::read(&bad).unwrap(), b"bad bad bad bad bad");
        let record = ManifestStore::read(dir.path()).unwrap().unwrap();
        assert_eq!(record.len(), 1);
    }

    #[tokio::test]
    async fn test_unreadable_asset_fails_at_hash_phase() {
        let dir = tempfile::tempdir().unwrap();
        // A directory with an image extension is selected but cannot be read
        let folder = dir.path().join("folder.png");
        std::fs::create_dir(&folder).unwrap();
        let good = write(dir.path(), "good.png", b"good good good good");

        let mock = MockRecompressor::shrinking();
        let calls = mock.calls.clone();
        let report = optimizer(mock)
            .optimize_assets(dir.path(), &OptimizeOptions::default())
            .await
            .unwrap();

        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].path(), &folder);
        assert_eq!(report.failures[0].phase(), AssetPhase::Hash);
        assert_eq!(report.optimized.len(), 1);
        assert_eq!(report.optimized[0].path, good);
        assert!(report.manifest_saved);
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        let record = ManifestStore::read(dir.path()).unwrap().unwrap();
        assert_eq!(record.len(), 1);
    }

    #[tokio::test]
    async fn test_no_save_leaves_manifest_empty() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "a.png", b"aaaaaaaaaaaaaaaa");

        let options = OptimizeOptions {
            save: false,
            ..OptimizeOptions::default()
        };
        let report = optimizer(MockRecompressor::shrinking())
            .optimize_assets(dir.path(), &options)
            .await
            .unwrap();

        assert_eq!(report.optimized.len(), 1);
        assert!(!report.manifest_saved);
        let record = ManifestStore::read(dir.path()).unwrap().unwrap();
        assert!(record.is_empty());
    }

    #[tokio::test]
    async fn test_default_run_leaves_no_backup() {
        let dir = tempfile::tempdir().unwrap();
        let asset = write(dir.path(), "a.png", b"aaaaaaaaaaaaaaaa");

        let report = optimizer(MockRecompressor::shrinking())
            .optimize_assets(dir.path(), &OptimizeOptions::default())
            .await
            .unwrap();

        assert_eq!(report.optimized[0].backup, None);
        assert_eq!(std::fs::read(&asset).unwrap(), b"aaaaaaaa");
        assert!(!dir.path().join("a.orig.png").exists());
        assert_eq!(staging_leftovers(dir.path()), 0);
    }

    #[tokio::test]
    async fn test_existing_backup_is_never_overwritten() {
        let dir = tempfile::tempdir().unwrap();
        let asset = write(dir.path(), "a.png", b"edited edited edited");
        let backup = write(dir.path(), "a.orig.png", b"first original");

        let report = optimizer(MockRecompressor::shrinking())
            .optimize_assets(dir.path(), &with_backups())
            .await
            .unwrap();

        assert!(report.failures.is_empty());
        assert_eq!(report.optimized.len(), 1);
        assert_eq!(report.optimized[0].backup, None);
        assert_eq!(std::fs::read(&asset).unwrap(), b"edited edi");
        assert_eq!(std::fs::read(&backup).unwrap(), b"first original");
    }

    #[tokio::test]
    async fn test_editing_an_optimized_asset_with_backups() {
        let dir = tempfile::tempdir().unwrap();
        let asset = write(dir.path(), "a.png", b"first version bytes!");
        let optimizer = optimizer(MockRecompressor::shrinking());

        let first = optimizer
            .optimize_assets(dir.path(), &with_backups())
            .await
            .unwrap();
        let backup = dir.path().join("a.orig.png");
        assert_eq!(first.optimized[0].backup.as_ref(), Some(&backup));

        std::fs::write(&asset, b"second version bytes").unwrap();
        let second = optimizer
            .optimize_assets(dir.path(), &with_backups())
            .await
            .unwrap();

        assert!(second.failures.is_empty());
        assert_eq!(second.optimized.len(), 1);
        assert_eq!(std::fs::read(&asset).unwrap(), b"second ver");
        assert_eq!(std::fs::read(&backup).unwrap(), b"first version bytes!");
        assert!(!optimizer
            .has_unoptimized_assets(dir.path(), &with_backups())
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_failed_rehash_leaves_no_backup() {
        let dir = tempfile::tempdir().unwrap();
        // Large enough that the directory output still counts as smaller
        write(dir.path(), "a.png", &vec![7u8; 256 * 1024]);

        let report = optimizer(MockRecompressor::directory_output())
            .optimize_assets(dir.path(), &OptimizeOptions::default())
            .await
            .unwrap();

        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].phase(), AssetPhase::Hash);
        assert!(!dir.path().join("a.orig.png").exists());
        assert_eq!(staging_leftovers(dir.path()), 0);
        assert!(!report.manifest_saved);
    }

    #[tokio::test]
    async fn test_failed_rehash_keeps_requested_backup() {
        let dir = tempfile::tempdir().unwrap();
        let original = vec![7u8; 256 * 1024];
        write(dir.path(), "a.png", &original);

        let report = optimizer(MockRecompressor::directory_output())
            .optimize_assets(dir.path(), &with_backups())
            .await
            .unwrap();

        assert_eq!(report.failures[0].phase(), AssetPhase::Hash);
        assert_eq!(
            std::fs::read(dir.path().join("a.orig.png")).unwrap(),
            original
        );
    }

    #[tokio::test]
    async fn test_quality_is_forwarded() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "a.jpg", b"aaaaaaaaaaaaaaaa");

        let mock = MockRecompressor::shrinking();
        let seen = mock.seen_quality.clone();
        let options = OptimizeOptions {
            quality: 42,
            ..OptimizeOptions::default()
        };
        optimizer(mock)
            .optimize_assets(dir.path(), &options)
            .await
            .unwrap();
        assert_eq!(*seen.lock().unwrap(), vec![42]);
    }

    #[tokio::test]
    async fn test_events_cover_every_selected_asset() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "a.png", b"aaaaaaaaaaaaaaaa");
        write(dir.path(), "b.png", b"bbbbbbbbbbbbbbbb");
        write(dir.path(), "c.png", b"cccccccccccccccc");

        let mut events = Vec::new();
        optimizer(MockRecompressor::failing_on(&["c.png"]))
            .optimize_assets_with(dir.path(), &OptimizeOptions::default(), |e| {
                events.push(e)
            })
            .await
            .unwrap();

        assert!(matches!(events[0], OptimizeEvent::ManifestCreated { .. }));
        assert_eq!(
            events[1],
            OptimizeEvent::Selected {
                selected: 3,
                total: 3
            }
        );
        let terminal = events[2..]
            .iter()
            .filter(|e| {
                matches!(
                    e,
                    OptimizeEvent::Optimized(_)
                        | OptimizeEvent::Failed { .. }
                        | OptimizeEvent::Skipped { .. }
                        | OptimizeEvent::KeptOriginal { .. }
                )
            })
            .count();
        assert_eq!(terminal, 3);
    }

    #[tokio::test]
    async fn test_dirty_check_without_manifest() {
        let dir = tempfile::tempdir().unwrap();
        // Zero images, but no manifest either
        let dirty = optimizer(MockRecompressor::shrinking())
            .has_unoptimized_assets(dir.path(), &OptimizeOptions::default())
            .await
            .unwrap();
        assert!(dirty);
        assert!(!ManifestStore::exists(dir.path()));
    }

    #[tokio::test]
    async fn test_dirty_check_after_optimizing() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "a.png", b"aaaaaaaaaaaaaaaa");
        let optimizer = optimizer(MockRecompressor::shrinking());

        optimizer
            .optimize_assets(dir.path(), &OptimizeOptions::default())
            .await
            .unwrap();
        assert!(!optimizer
            .has_unoptimized_assets(dir.path(), &OptimizeOptions::default())
            .await
            .unwrap());

        write(dir.path(), "new.png", b"new new new new");
        assert!(optimizer
            .has_unoptimized_assets(dir.path(), &OptimizeOptions::default())
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_corrupt_manifest_aborts_run() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "a.png", b"aaaaaaaaaaaaaaaa");
        write(dir.path(), ".expo-shared/assets.json", b"not json");

        let mock = MockRecompressor::shrinking();
        let calls = mock.calls.clone();
        let optimizer = optimizer(mock);

        let err = optimizer
            .optimize_assets(dir.path(), &OptimizeOptions::default())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("corrupt"));
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        assert!(optimizer
            .has_unoptimized_assets(dir.path(), &OptimizeOptions::default())
            .await
            .is_err());
    }
}
