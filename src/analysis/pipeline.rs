use ndarray::{s, Array1, Array2};
use crate::analysis::config::{CohortConfig, FailurePolicy, WindowConfig};
use crate::analysis::convert::{convert_signal, LinearFit};
use crate::analysis::source::{RecordingSource, SubjectRecording};
use crate::analysis::AnalysisError;
/// Per-subject bookkeeping kept next to the aligned traces.
#[derive(Clone, Debug)]
pub struct SubjectSummary {
    pub id: String,
    pub injection_index: usize,
    pub fit: LinearFit,
}
/// Subjects x samples matrix on a shared minutes-from-injection axis.
#[derive(Clone, Debug)]
pub struct AlignedMatrix {
    pub time_minutes: Array1<f64>,
    pub traces: Array2<f64>,
    pub subjects: Vec<SubjectSummary>,
}
impl AlignedMatrix {
    pub fn num_subjects(&self) -> usize {
        self.traces.nrows()
    }
    pub fn window_len(&self) -> usize {
        self.traces.ncols()
    }
}
#[derive(Clone, Debug)]
pub struct SkippedSubject {
    pub ordinal: usize,
    pub id: Option<String>,
    pub reason: String,
}
#[derive(Clone, Debug)]
pub struct CohortResult {
    pub name: String,
    pub matrix: AlignedMatrix,
    pub skipped: Vec<SkippedSubject>,
}
/// Converts every recording of one cohort and aligns it on its injection index.
pub struct CohortPipeline<S: RecordingSource> {
    source: S,
    cohort: CohortConfig,
    windows: WindowConfig,
    policy: FailurePolicy,
}
impl<S: RecordingSource> CohortPipeline<S> {
    pub fn new(source: S, cohort: CohortConfig, windows: WindowConfig, policy: FailurePolicy) -> Self {
        Self {
            source,
            cohort,
            windows,
            policy,
        }
    }
    pub fn run(mut self) -> Result<CohortResult, AnalysisError> {
        let mut rows: Vec<Array1<f64>> = Vec::new();
        let mut subjects = Vec::new();
        let mut skipped = Vec::new();
        let mut ordinal = 0usize;
        loop {
            let outcome = match self.source.next_recording() {
                Ok(None) => break,
                Ok(Some(recording)) => {
                    let injection_index = self.cohort.injection_index_for(ordinal, &recording.id);
                    align_subject(&recording, injection_index, &self.windows)
                        .map(|(row, fit)| {
                            (
                                row,
                                SubjectSummary {
                                    id: recording.id.clone(),
                                    injection_index,
                                    fit,
                                },
                            )
                        })
                        .map_err(|err| (Some(recording.id.clone()), err))
                }
                Err(err) => Err((None, err)),
            };
            match outcome {
                Ok((row, summary)) => {
                    log::info!(
                        "{}: subject {} '{}' aligned at injection sample {}",
                        self.cohort.name,
                        ordinal,
                        summary.id,
                        summary.injection_index
                    );
                    rows.push(row);
                    subjects.push(summary);
                }
                Err((id, err)) => match self.policy {
                    FailurePolicy::Abort => return Err(err),
                    FailurePolicy::Skip => {
                        log::warn!("{}: skipping subject {}: {}", self.cohort.name, ordinal, err);
                        skipped.push(SkippedSubject {
                            ordinal,
                            id,
                            reason: err.to_string(),
                        });
                    }
                },
            }
            ordinal += 1;
        }
        if rows.is_empty() {
            return Err(AnalysisError::EmptyCohort(self.cohort.name));
        }
        let window_len = self.windows.window_len();
        let mut traces = Array2::zeros((rows.len(), window_len));
        for (mut dst, row) in traces.outer_iter_mut().zip(&rows) {
            dst.assign(row);
        }
        Ok(CohortResult {
            name: self.cohort.name,
            matrix: AlignedMatrix {
                time_minutes: relative_time_axis(&self.windows),
                traces,
                subjects,
            },
            skipped,
        })
    }
}
/// Convert one recording with a baseline ending at `injection_index` and cut the
/// pre/post window around it.
pub fn align_subject(
    recording: &SubjectRecording,
    injection_index: usize,
    windows: &WindowConfig,
) -> Result<(Array1<f64>, LinearFit), AnalysisError> {
    let lead = windows.baseline_samples().max(windows.pre_samples());
    if injection_index < lead {
        return Err(AnalysisError::InsufficientLength {
            subject: recording.id.clone(),
            required: lead,
            available: injection_index,
        });
    }
    let end = injection_index + windows.post_samples();
    if end > recording.len() {
        return Err(AnalysisError::InsufficientLength {
            subject: recording.id.clone(),
            required: end,
            available: recording.len(),
        });
    }
    let trace = convert_signal(
        recording.signal.view(),
        recording.isosbestic.view(),
        injection_index - windows.baseline_samples(),
        injection_index,
    )?;
    let start = injection_index - windows.pre_samples();
    Ok((trace.values.slice(s![start..end]).to_owned(), trace.fit))
}
/// Minutes from injection for each aligned sample.
pub fn relative_time_axis(windows: &WindowConfig) -> Array1<f64> {
    Array1::linspace(
        -(windows.pre_minutes as f64),
        windows.post_minutes as f64,
        windows.window_len(),
    )
}
