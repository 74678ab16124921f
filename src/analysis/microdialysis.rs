use std::path::Path;
use ndarray::{s, Array1, Array2, Axis};
use crate::analysis::config::MicrodialysisConfig;
use crate::analysis::matrix::read_table;
use crate::analysis::AnalysisError;
/// Microdialysis table (time bins x subjects) expressed as fold change from baseline.
#[derive(Clone, Debug)]
pub struct FoldChange {
    pub name: String,
    pub time_minutes: Array1<f64>,
    /// Scalar baseline: mean over every subject in the leading bins.
    pub baseline: f64,
    pub normalized: Array2<f64>,
    /// Per-bin mean across subjects, ignoring NaN.
    pub mean: Array1<f64>,
}
impl FoldChange {
    pub fn num_bins(&self) -> usize {
        self.normalized.nrows()
    }
    pub fn num_subjects(&self) -> usize {
        self.normalized.ncols()
    }
}
pub fn load_fold_change(
    path: &Path,
    name: &str,
    config: &MicrodialysisConfig,
) -> Result<FoldChange, AnalysisError> {
    let table = read_table(path)?;
    log::info!(
        "{name}: microdialysis table {} bins x {} subjects",
        table.nrows(),
        table.ncols()
    );
    fold_change(name, path, &table, config)
}
/// `path` only labels errors about the table's shape.
pub fn fold_change(
    name: &str,
    path: &Path,
    table: &Array2<f64>,
    config: &MicrodialysisConfig,
) -> Result<FoldChange, AnalysisError> {
    let malformed = |reason: String| AnalysisError::MalformedData {
        path: path.to_path_buf(),
        line: 0,
        reason,
    };
    if table.ncols() == 0 {
        return Err(malformed("table has no subject columns".into()));
    }
    if table.nrows() < config.baseline_bins {
        return Err(malformed(format!(
            "needs at least {} time bins for the baseline, found {}",
            config.baseline_bins,
            table.nrows()
        )));
    }
    let leading = table.slice(s![..config.baseline_bins, ..]);
    // NaN in the baseline bins propagates to every value.
    let baseline = leading.sum() / leading.len() as f64;
    if baseline.is_nan() {
        log::warn!("{name}: baseline bins contain missing values");
    }
    let normalized = table.mapv(|v| v / baseline);
    let mean = normalized.map_axis(Axis(1), |row| nan_mean(row.iter().copied()));
    Ok(FoldChange {
        name: name.to_string(),
        time_minutes: Array1::linspace(config.start_minutes, config.end_minutes, table.nrows()),
        baseline,
        normalized,
        mean,
    })
}
fn nan_mean(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, count) = values
        .filter(|v| !v.is_nan())
        .fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
    if count == 0 {
        f64::NAN
    } else {
        sum / count as f64
    }
}
