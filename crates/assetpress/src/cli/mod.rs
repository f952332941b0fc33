//! Command handlers for the assetpress CLI.

pub mod check;
pub mod config;
pub mod optimize;

use clap::Args;
use std::path::PathBuf;

/// Project location and selection flags shared by `optimize` and `check`.
#[derive(Args, Debug)]
pub struct ProjectArgs {
    /// Project root (defaults to the current directory)
    #[arg(default_value = ".")]
    pub project_root: PathBuf,

    /// Only process assets matching this glob (relative to the project root)
    #[arg(long)]
    pub include: Option<String>,

    /// Skip assets matching this glob (relative to the project root)
    #[arg(long)]
    pub exclude: Option<String>,
}

impl ProjectArgs {
    /// Expand `~` and resolve the project root to an absolute path.
    pub fn resolve_root(&self) -> anyhow::Result<PathBuf> {
        let raw = self.project_root.to_string_lossy();
        let expanded = PathBuf::from(shellexpand::tilde(&raw).into_owned());
        match expanded.canonicalize() {
            Ok(root) if root.is_dir() => Ok(root),
            _ => anyhow::bail!(
                "Project root does not exist or is not a directory: {:?}\n\n  \
                 Hint: Run from your project directory or pass its path.",
                self.project_root
            ),
        }
    }
}
