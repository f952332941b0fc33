//! `.orig` backup naming for replaced assets.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

const BACKUP_MARKER: &str = "orig";

/// Sibling path that holds the original bytes of a replaced asset.
///
/// `.orig` is inserted before the final extension:
/// `/a/b/photo.png` becomes `/a/b/photo.orig.png`, and an extensionless
/// `photo` becomes `photo.orig`.
pub fn backup_path(path: &Path) -> PathBuf {
    let stem = path.file_stem().unwrap_or_default();
    let mut name = OsString::from(stem);
    name.push(".");
    name.push(BACKUP_MARKER);
    if let Some(ext) = path.extension() {
        name.push(".");
        name.push(ext);
    }
    path.with_file_name(name)
}

/// Whether a path follows the backup naming convention.
pub fn is_backup(path: &Path) -> bool {
    path.file_stem()
        .map(Path::new)
        .and_then(|stem| stem.extension())
        .is_some_and(|ext| ext == BACKUP_MARKER)
}
