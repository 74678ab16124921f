//! Isosbestic correction and z-scoring of a photometry signal channel.
//!
//! - Fit `signal ~ slope * isosbestic + intercept` by least squares over `[0, baseline_end)`.
//!   The fit always starts at sample 0, independent of `baseline_start`.
//! - Relative change: `(signal - fitted) / fitted` over the full recording.
//! - z-score the relative change with the mean and population standard deviation
//!   of `[baseline_start, baseline_end)`.
//!
//! Non-finite values (a zero in the fitted isosbestic, NaN samples) propagate as IEEE
//! arithmetic produces them.
use ndarray::{s, Array1, ArrayView1};
use crate::analysis::AnalysisError;
/// First-degree polynomial coefficients of signal against isosbestic.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LinearFit {
    pub slope: f64,
    pub intercept: f64,
}
impl LinearFit {
    pub fn apply(&self, x: ArrayView1<f64>) -> Array1<f64> {
        x.mapv(|v| self.slope * v + self.intercept)
    }
}
/// Full-length z-scored trace plus the statistics that produced it.
#[derive(Clone, Debug)]
pub struct ConvertedTrace {
    pub fit: LinearFit,
    pub baseline_mean: f64,
    pub baseline_std: f64,
    pub values: Array1<f64>,
}
/// Least-squares line of `signal` against `isosbestic` over `[0, fit_end)`.
///
/// A constant isosbestic window has no unique solution; the minimum-norm solution
/// of the column-scaled Vandermonde system is returned, which still maps the
/// isosbestic value onto the mean signal.
pub fn fit_isosbestic(
    signal: ArrayView1<f64>,
    isosbestic: ArrayView1<f64>,
    fit_end: usize,
) -> Result<LinearFit, AnalysisError> {
    check_lengths(signal, isosbestic)?;
    if fit_end == 0 || fit_end > signal.len() {
        return Err(AnalysisError::InvalidWindow {
            start: 0,
            end: fit_end,
            len: signal.len(),
        });
    }
    let x = isosbestic.slice(s![..fit_end]);
    let y = signal.slice(s![..fit_end]);
    let n = fit_end as f64;
    let x_mean = x.sum() / n;
    let y_mean = y.sum() / n;
    let x_min = x.iter().copied().fold(f64::INFINITY, f64::min);
    let x_max = x.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if x_min == x_max {
        let c = x_min;
        let fit = if c == 0.0 {
            LinearFit {
                slope: 0.0,
                intercept: y_mean,
            }
        } else {
            LinearFit {
                slope: y_mean / (2.0 * c),
                intercept: y_mean / 2.0,
            }
        };
        return Ok(fit);
    }
    let mut sxx = 0.0;
    let mut sxy = 0.0;
    for (&xi, &yi) in x.iter().zip(y.iter()) {
        let dx = xi - x_mean;
        sxx += dx * dx;
        sxy += dx * (yi - y_mean);
    }
    let slope = sxy / sxx;
    Ok(LinearFit {
        slope,
        intercept: y_mean - slope * x_mean,
    })
}
/// Isosbestic-corrected, baseline z-scored trace with the same length as the input.
pub fn convert_signal(
    signal: ArrayView1<f64>,
    isosbestic: ArrayView1<f64>,
    baseline_start: usize,
    baseline_end: usize,
) -> Result<ConvertedTrace, AnalysisError> {
    check_lengths(signal, isosbestic)?;
    if baseline_start >= baseline_end || baseline_end > signal.len() {
        return Err(AnalysisError::InvalidWindow {
            start: baseline_start,
            end: baseline_end,
            len: signal.len(),
        });
    }
    let fit = fit_isosbestic(signal, isosbestic, baseline_end)?;
    log::debug!(
        "isosbestic fit: slope={:.6} intercept={:.6}",
        fit.slope,
        fit.intercept
    );
    let fitted = fit.apply(isosbestic);
    let relative = (&signal - &fitted) / &fitted;
    let baseline = relative.slice(s![baseline_start..baseline_end]);
    let (mean, std) = mean_and_std(baseline);
    let values = if std == 0.0 {
        log::warn!(
            "baseline {}..{} has zero deviation; returning mean-centred trace",
            baseline_start,
            baseline_end
        );
        relative.mapv(|v| v - mean)
    } else {
        relative.mapv(|v| (v - mean) / std)
    };
    Ok(ConvertedTrace {
        fit,
        baseline_mean: mean,
        baseline_std: std,
        values,
    })
}
fn check_lengths(signal: ArrayView1<f64>, isosbestic: ArrayView1<f64>) -> Result<(), AnalysisError> {
    if signal.len() != isosbestic.len() {
        return Err(AnalysisError::ChannelLengthMismatch {
            signal: signal.len(),
            isosbestic: isosbestic.len(),
        });
    }
    Ok(())
}
/// Mean and population standard deviation (ddof = 0).
fn mean_and_std(data: ArrayView1<f64>) -> (f64, f64) {
    let n = data.len() as f64;
    let mean = data.sum() / n;
    let variance = data
        .iter()
        .map(|v| {
            let delta = v - mean;
            delta * delta
        })
        .sum::<f64>()
        / n;
    (mean, variance.sqrt())
}
#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    fn noisy_pair(len: usize, seed: u64) -> (Array1<f64>, Array1<f64>) {
        let mut rng = StdRng::seed_from_u64(seed);
        let iso = Array1::from_iter((0..len).map(|i| 200.0 - 0.01 * i as f64 + rng.gen_range(-0.5..0.5)));
        let sig = iso.mapv(|v| 1.5 * v + 40.0) + Array1::from_iter((0..len).map(|_| rng.gen_range(-1.0..1.0)));
        (sig, iso)
    }
    #[test]
    fn constant_ratio_converts_to_zero() {
        let iso = Array1::from_elem(500, 3.0);
        let sig = Array1::from_elem(500, 6.0);
        let trace = convert_signal(sig.view(), iso.view(), 100, 400).unwrap();
        assert_eq!(trace.values.len(), 500);
        for &v in trace.values.iter() {
            assert_abs_diff_eq!(v, 0.0, epsilon = 1e-12);
        }
    }
    #[test]
    fn fit_recovers_known_line() {
        let iso = Array1::from_iter((0..1000).map(|i| 100.0 + 0.5 * i as f64));
        let sig = iso.mapv(|v| 1.7 * v + 12.0);
        let fit = fit_isosbestic(sig.view(), iso.view(), 600).unwrap();
        assert_abs_diff_eq!(fit.slope, 1.7, epsilon = 1e-9);
        assert_abs_diff_eq!(fit.intercept, 12.0, epsilon = 1e-6);
    }
    #[test]
    fn constant_isosbestic_fit_passes_through_mean() {
        let iso = Array1::from_elem(10, 4.0);
        let sig = array![1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0, 10.0];
        let fit = fit_isosbestic(sig.view(), iso.view(), 10).unwrap();
        assert_abs_diff_eq!(fit.slope * 4.0 + fit.intercept, 5.5, epsilon = 1e-12);
    }
    #[test]
    fn output_is_full_length() {
        let (sig, iso) = noisy_pair(3000, 7);
        let trace = convert_signal(sig.view(), iso.view(), 1000, 2000).unwrap();
        assert_eq!(trace.values.len(), 3000);
    }
    #[test]
    fn baseline_window_is_standardized() {
        let (sig, iso) = noisy_pair(3000, 11);
        let trace = convert_signal(sig.view(), iso.view(), 1000, 2000).unwrap();
        let (mean, std) = mean_and_std(trace.values.slice(s![1000..2000]));
        assert_abs_diff_eq!(mean, 0.0, epsilon = 1e-9);
        assert_abs_diff_eq!(std, 1.0, epsilon = 1e-9);
    }
    #[test]
    fn fit_window_starts_at_zero() {
        // Before sample 500 the signal follows a different line than after it.
        let iso = Array1::from_iter((0..1500).map(|i| 50.0 + (i % 97) as f64));
        let sig = Array1::from_iter(
            iso.iter()
                .enumerate()
                .map(|(i, &v)| if i < 500 { 3.0 * v } else { 1.0 * v + 10.0 }),
        );
        let trace = convert_signal(sig.view(), iso.view(), 500, 1000).unwrap();
        let from_zero = fit_isosbestic(sig.view(), iso.view(), 1000).unwrap();
        assert_eq!(trace.fit, from_zero);
        // A fit over 500..1000 alone would give slope 1.
        assert!((trace.fit.slope - 1.0).abs() > 0.1);
    }
    #[test]
    fn nan_samples_propagate() {
        let (mut sig, iso) = noisy_pair(300, 3);
        sig[250] = f64::NAN;
        let trace = convert_signal(sig.view(), iso.view(), 0, 200).unwrap();
        assert!(trace.values[250].is_nan());
        assert!(trace.values[249].is_finite());
    }
    #[test]
    fn zero_crossing_fit_gives_non_finite_sample() {
        // The isosbestic passes through zero at sample 50 and the fit is the identity.
        let iso = Array1::from_iter((0..100).map(|i| i as f64 - 50.0));
        let mut sig = iso.clone();
        sig[50] = 3.0;
        let trace = convert_signal(sig.view(), iso.view(), 0, 40).unwrap();
        assert_eq!(trace.fit, LinearFit { slope: 1.0, intercept: 0.0 });
        assert!(!trace.values[50].is_finite());
        assert!(trace.values[49].is_finite());
        assert!(trace.values[51].is_finite());
        assert_eq!(trace.values.len(), 100);
    }
    #[test]
    fn invalid_windows_are_rejected() {
        let (sig, iso) = noisy_pair(100, 1);
        assert!(matches!(
            convert_signal(sig.view(), iso.view(), 50, 50),
            Err(AnalysisError::InvalidWindow { .. })
        ));
        assert!(matches!(
            convert_signal(sig.view(), iso.view(), 10, 101),
            Err(AnalysisError::InvalidWindow { .. })
        ));
    }
    #[test]
    fn mismatched_channels_are_rejected() {
        let sig = Array1::zeros(10);
        let iso = Array1::zeros(9);
        assert!(matches!(
            convert_signal(sig.view(), iso.view(), 0, 5),
            Err(AnalysisError::ChannelLengthMismatch { .. })
        ));
    }
}
