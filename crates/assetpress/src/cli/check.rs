//! The `assetpress check` command: a read-only "is anything left to optimize" query.

use assetpress_core::{AssetOptimizer, Config, OptimizeOptions};
use clap::Args;

use super::ProjectArgs;

/// Arguments for the `check` command.
#[derive(Args, Debug)]
pub struct CheckArgs {
    #[command(flatten)]
    pub project: ProjectArgs,
}

/// Execute the check command.
///
/// Exits with status 1 when optimization is pending so scripts can branch on it.
pub async fn execute(args: CheckArgs, config: Config) -> anyhow::Result<()> {
    let root = args.project.resolve_root()?;

    let mut options = OptimizeOptions::from_config(&config.optimize);
    options.include = args.project.include.clone();
    options.exclude = args.project.exclude.clone();

    let optimizer = AssetOptimizer::new(&config);
    if optimizer.has_unoptimized_assets(&root, &options).await? {
        println!(
            "Assets in {} need optimizing. Run `assetpress optimize` to compress them.",
            root.display()
        );
        std::process::exit(1);
    }

    println!("All assets in {} are optimized.", root.display());
    Ok(())
}
