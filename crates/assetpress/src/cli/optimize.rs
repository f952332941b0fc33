//! The `assetpress optimize` command.

use assetpress_core::{AssetOptimizer, Config, OptimizationReport, OptimizeEvent, OptimizeOptions};
use clap::Args;
use console::style;
use indicatif::{HumanBytes, ProgressBar, ProgressStyle};

use super::ProjectArgs;

/// Arguments for the `optimize` command.
#[derive(Args, Debug)]
pub struct OptimizeArgs {
    #[command(flatten)]
    pub project: ProjectArgs,

    /// Recompression quality, 1-100 (defaults to optimize.quality in the config)
    #[arg(short, long, value_parser = clap::value_parser!(u8).range(1..=100))]
    pub quality: Option<u8>,

    /// Do not write the manifest after optimizing
    #[arg(long)]
    pub no_save: bool,

    /// Keep the original bytes of replaced assets as `.orig` siblings
    #[arg(long)]
    pub backup: bool,

    /// Number of assets processed concurrently
    #[arg(short, long, value_parser = clap::value_parser!(u16).range(1..))]
    pub parallel: Option<u16>,
}

impl OptimizeArgs {
    /// Merge CLI flags over the configured defaults.
    fn options(&self, config: &Config) -> OptimizeOptions {
        let mut options = OptimizeOptions::from_config(&config.optimize);
        if let Some(quality) = self.quality {
            options.quality = quality;
        }
        options.include = self.project.include.clone();
        options.exclude = self.project.exclude.clone();
        options.save = !self.no_save;
        if self.backup {
            options.keep_originals = true;
        }
        options
    }
}

/// Execute the optimize command.
pub async fn execute(args: OptimizeArgs, config: Config) -> anyhow::Result<()> {
    let root = args.project.resolve_root()?;
    let options = args.options(&config);

    let mut optimizer = AssetOptimizer::new(&config);
    if let Some(parallel) = args.parallel {
        optimizer = optimizer.with_parallelism(usize::from(parallel));
    }

    tracing::info!("Optimizing assets in {:?} (quality {})", root, options.quality);
    let start_time = std::time::Instant::now();
    let progress = create_progress_bar();

    let report = optimizer
        .optimize_assets_with(&root, &options, |event| handle_event(&progress, event))
        .await?;

    progress.finish_and_clear();
    print_summary(&report, start_time.elapsed());

    if report.has_failures() {
        anyhow::bail!(
            "{} asset(s) could not be optimized; see the errors above",
            report.failures.len()
        );
    }
    Ok(())
}

/// Update the progress bar for one engine event.
fn handle_event(progress: &ProgressBar, event: OptimizeEvent) {
    match event {
        OptimizeEvent::ManifestCreated { path } => {
            progress.suspend(|| {
                tracing::info!(
                    "Created {}. This file is generated by assetpress and should be committed.",
                    path.display()
                )
            });
        }
        OptimizeEvent::Selected { selected, .. } => {
            progress.set_length(selected as u64);
            progress.set_message("hashing...");
        }
        OptimizeEvent::Optimized(asset) => {
            progress.set_message(format!("saved {}", HumanBytes(asset.bytes_saved())));
            progress.inc(1);
        }
        OptimizeEvent::Skipped { .. } | OptimizeEvent::KeptOriginal { .. } => {
            progress.inc(1);
        }
        OptimizeEvent::Failed { .. } => {
            progress.inc(1);
        }
    }
}

/// Create a progress bar for the optimization run.
fn create_progress_bar() -> ProgressBar {
    let pb = ProgressBar::new(0);
    if let Ok(bar_style) = ProgressStyle::default_bar().template(
        "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) {msg}",
    ) {
        pb.set_style(bar_style.progress_chars("##-"));
    }
    pb.set_message("selecting...");
    pb
}

/// Print a formatted summary table after the run.
fn print_summary(report: &OptimizationReport, elapsed: std::time::Duration) {
    eprintln!();
    eprintln!("  ====================================");
    eprintln!("               Summary");
    eprintln!("  ====================================");
    eprintln!("    Optimized:    {:>8}", style(report.optimized.len()).green());
    if !report.kept_original.is_empty() {
        eprintln!("    Unchanged:    {:>8}", report.kept_original.len());
    }
    eprintln!("    Up to date:   {:>8}", report.skipped);
    if report.has_failures() {
        eprintln!("    Failed:       {:>8}", style(report.failures.len()).red());
    }
    eprintln!("  ------------------------------------");
    eprintln!("    Selected:     {:>8}", report.selected);
    eprintln!("    Tracked:      {:>8}", report.total_assets);
    eprintln!(
        "    Saved:        {:>8}",
        HumanBytes(report.bytes_saved()).to_string()
    );
    eprintln!("    Duration:     {:>7.1}s", elapsed.as_secs_f64());
    eprintln!("  ====================================");

    if report.optimized.is_empty() && report.kept_original.is_empty() {
        eprintln!("  No images to optimize.");
    } else if !report.manifest_saved {
        eprintln!(
            "  {}",
            style("Manifest not saved (--no-save); these assets will be processed again.")
                .yellow()
        );
    }
}
