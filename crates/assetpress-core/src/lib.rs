//! assetpress Core - Content-addressed image asset optimization.
//!
//! assetpress finds the image assets of an app project, recompresses the ones
//! it has not seen before, and records the content digest of every optimized
//! file in a manifest that is committed with the project. Later runs, on any
//! machine, skip files whose digest is already recorded.
//!
//! # Architecture
//!
//! ```text
//! app.json patterns → Select → Hash → Manifest lookup → Recompress misses → Manifest save
//! ```
//!
//! # Usage
//!
//! ```rust,ignore
//! use assetpress_core::{AssetOptimizer, Config, OptimizeOptions};
//!
//! #[tokio::main]
//! async fn main() -> assetpress_core::Result<()> {
//!     let config = Config::load()?;
//!     let optimizer = AssetOptimizer::new(&config);
//!     let options = OptimizeOptions::from_config(&config.optimize);
//!
//!     let report = optimizer.optimize_assets("./my-app".as_ref(), &options).await?;
//!     println!("Saved {} bytes", report.bytes_saved());
//!     Ok(())
//! }
//! ```

// Module declarations
pub mod config;
pub mod error;
pub mod manifest;
pub mod pipeline;
pub mod project;

// Re-exports for convenient access
pub use config::Config;
pub use error::{
    AssetError, AssetPhase, AssetPressError, ConfigError, ManifestError, Result, SelectionError,
};
pub use manifest::{ManifestEvent, ManifestStore, OptimizationRecord};
pub use pipeline::{
    backup_path, AssetOptimizer, AssetSelection, AssetSelector, Hasher, ImageRecompressor,
    OptimizationReport, OptimizeEvent, OptimizeOptions, OptimizedAsset, Recompressor,
};
pub use project::ProjectConfig;

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
