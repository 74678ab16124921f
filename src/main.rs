// src/main.rs
mod analysis;
use std::fs;
use std::path::{Path, PathBuf};
use anyhow::{Context, Result};
use clap::Parser;
use analysis::{
    load_fold_change, render_fold_change_png, render_trace_overlay_png, CohortConfig,
    CohortPipeline, CohortResult, DirectorySource, ExperimentConfig, FailurePolicy, PlotStyle,
};
#[derive(Parser)]
#[command(name = "amph-photometry")]
#[command(about = "Isosbestic-corrected photometry and microdialysis figures for the amphetamine/vehicle cohorts")]
#[command(version)]
struct Cli {
    /// Directory holding the `fiber photometry` and `microdialysis` folders
    #[arg(long, short = 'd', default_value = "data")]
    data_dir: PathBuf,
    /// JSON file overriding windows, cohorts and injection indices
    #[arg(long, short = 'c')]
    config: Option<PathBuf>,
    /// Where the rendered figures are written
    #[arg(long, short = 'o', default_value = "figures")]
    output_dir: PathBuf,
    /// Skip subjects that cannot be aligned instead of aborting
    #[arg(long)]
    skip_invalid: bool,
}
fn run_cohort(photometry_dir: &Path, cohort: &CohortConfig, config: &ExperimentConfig) -> Result<CohortResult> {
    let source = DirectorySource::discover(photometry_dir, &cohort.marker)
        .with_context(|| format!("failed to list {} recordings", cohort.name))?;
    log::info!("{}: {} photometry files", cohort.name, source.len());
    let result = CohortPipeline::new(source, cohort.clone(), config.windows, config.failure_policy)
        .run()
        .with_context(|| format!("failed to process {} cohort", cohort.name))?;
    for skipped in &result.skipped {
        log::warn!(
            "{}: subject {} ({}) left out: {}",
            result.name,
            skipped.ordinal,
            skipped.id.as_deref().unwrap_or("unreadable"),
            skipped.reason
        );
    }
    Ok(result)
}
fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    let mut config = match &cli.config {
        Some(path) => ExperimentConfig::from_json_file(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => ExperimentConfig::default(),
    };
    if cli.skip_invalid {
        config.failure_policy = FailurePolicy::Skip;
    }
    let photometry_dir = cli.data_dir.join(&config.photometry_dir);
    let vehicle = run_cohort(&photometry_dir, &config.vehicle, &config)?;
    let treatment = run_cohort(&photometry_dir, &config.treatment, &config)?;
    if vehicle.matrix.num_subjects() != treatment.matrix.num_subjects() {
        log::warn!(
            "cohort sizes differ: {} {} vs {} {}",
            vehicle.matrix.num_subjects(),
            vehicle.name,
            treatment.matrix.num_subjects(),
            treatment.name
        );
    }
    let microdialysis_dir = cli.data_dir.join(&config.microdialysis_dir);
    let vehicle_fc = load_fold_change(
        &microdialysis_dir.join(&config.vehicle.microdialysis_file),
        &config.vehicle.name,
        &config.microdialysis,
    )?;
    let treatment_fc = load_fold_change(
        &microdialysis_dir.join(&config.treatment.microdialysis_file),
        &config.treatment.name,
        &config.microdialysis,
    )?;
    fs::create_dir_all(&cli.output_dir)
        .with_context(|| format!("failed to create {}", cli.output_dir.display()))?;
    let style = PlotStyle::default();
    let traces_path = cli.output_dir.join("zf_traces.png");
    fs::write(&traces_path, render_trace_overlay_png(&vehicle.matrix, &treatment.matrix, &style)?)
        .with_context(|| format!("failed to write {}", traces_path.display()))?;
    let fold_path = cli.output_dir.join("microdialysis_fold_change.png");
    fs::write(&fold_path, render_fold_change_png(&vehicle_fc, &treatment_fc, &style)?)
        .with_context(|| format!("failed to write {}", fold_path.display()))?;
    log::info!(
        "wrote {} and {}",
        traces_path.display(),
        fold_path.display()
    );
    Ok(())
}
