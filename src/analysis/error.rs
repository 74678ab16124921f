use std::path::PathBuf;
use thiserror::Error;
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("input file not found: {0}")]
    FileNotFound(PathBuf),
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed data in {path} (line {line}): {reason}")]
    MalformedData {
        path: PathBuf,
        line: usize,
        reason: String,
    },
    #[error("recording '{subject}' is too short: needs {required} samples, has {available}")]
    InsufficientLength {
        subject: String,
        required: usize,
        available: usize,
    },
    #[error("channel length mismatch: signal has {signal} samples, isosbestic has {isosbestic}")]
    ChannelLengthMismatch { signal: usize, isosbestic: usize },
    #[error("invalid baseline window {start}..{end} for {len} samples")]
    InvalidWindow { start: usize, end: usize, len: usize },
    #[error("cohort '{0}' has no recordings")]
    EmptyCohort(String),
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error("failed to render plot: {0}")]
    Plot(String),
}
impl<E: std::error::Error + Send + Sync + 'static> From<plotters::drawing::DrawingAreaErrorKind<E>>
    for AnalysisError
{
    fn from(value: plotters::drawing::DrawingAreaErrorKind<E>) -> Self {
        AnalysisError::Plot(format!("{value:?}"))
    }
}
impl From<image::ImageError> for AnalysisError {
    fn from(value: image::ImageError) -> Self {
        AnalysisError::Plot(value.to_string())
    }
}
impl From<serde_json::Error> for AnalysisError {
    fn from(value: serde_json::Error) -> Self {
        AnalysisError::Config(value.to_string())
    }
}
