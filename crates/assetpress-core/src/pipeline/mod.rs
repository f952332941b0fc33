//! Asset optimization pipeline components.
//!
//! This module contains all the stages of an optimization run:
//! - **discovery**: Expand asset patterns into image paths
//! - **hash**: Content digests used as manifest keys
//! - **recompress**: The re-encoding operation and its default implementation
//! - **backup**: `.orig` naming for replaced assets
//! - **processor**: Orchestrates the full run and the dirty check

pub mod backup;
pub mod discovery;
pub mod hash;
pub mod processor;
pub mod recompress;

// Re-exports for convenient access
pub use backup::backup_path;
pub use discovery::{AssetSelection, AssetSelector};
pub use hash::Hasher;
pub use processor::{
    AssetOptimizer, OptimizationReport, OptimizeEvent, OptimizeOptions, OptimizedAsset,
};
pub use recompress::{ImageRecompressor, Recompressor};
