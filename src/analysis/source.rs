use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use ndarray::{Array1, Array2};
use walkdir::WalkDir;
use crate::analysis::matrix::read_matrix;
use crate::analysis::AnalysisError;
/// Isosbestic and signal channels of one subject, same length.
#[derive(Clone, Debug)]
pub struct SubjectRecording {
    pub id: String,
    pub isosbestic: Array1<f64>,
    pub signal: Array1<f64>,
}
impl SubjectRecording {
    pub fn new(
        id: impl Into<String>,
        isosbestic: Array1<f64>,
        signal: Array1<f64>,
    ) -> Result<Self, AnalysisError> {
        if isosbestic.len() != signal.len() {
            return Err(AnalysisError::ChannelLengthMismatch {
                signal: signal.len(),
                isosbestic: isosbestic.len(),
            });
        }
        Ok(Self {
            id: id.into(),
            isosbestic,
            signal,
        })
    }
    /// Build from a photometry matrix: row 0 isosbestic, row 1 signal.
    pub fn from_matrix(
        id: impl Into<String>,
        matrix: &Array2<f64>,
        path: &Path,
    ) -> Result<Self, AnalysisError> {
        if matrix.nrows() != 2 {
            return Err(AnalysisError::MalformedData {
                path: path.to_path_buf(),
                line: 0,
                reason: format!(
                    "photometry file needs 2 rows (isosbestic, signal), found {}",
                    matrix.nrows()
                ),
            });
        }
        Self::new(id, matrix.row(0).to_owned(), matrix.row(1).to_owned())
    }
    pub fn len(&self) -> usize {
        self.signal.len()
    }
    pub fn is_empty(&self) -> bool {
        self.signal.is_empty()
    }
}
/// Something that yields subject recordings in cohort order.
pub trait RecordingSource {
    fn next_recording(&mut self) -> Result<Option<SubjectRecording>, AnalysisError>;
}
/// Photometry files in one directory whose name contains a marker, sorted by name.
pub struct DirectorySource {
    queue: VecDeque<PathBuf>,
}
impl DirectorySource {
    pub fn discover(dir: &Path, marker: &str) -> Result<Self, AnalysisError> {
        if !dir.is_dir() {
            return Err(AnalysisError::FileNotFound(dir.to_path_buf()));
        }
        let mut paths = Vec::new();
        for entry in WalkDir::new(dir).min_depth(1).max_depth(1).follow_links(true) {
            // An unreadable entry would silently shrink the cohort, so it is an error.
            let entry = entry.map_err(|err| AnalysisError::Io {
                path: err.path().unwrap_or(dir).to_path_buf(),
                source: err.into(),
            })?;
            let matches_marker = entry
                .file_name()
                .to_str()
                .map(|name| name.contains(marker))
                .unwrap_or(false);
            if entry.file_type().is_file() && matches_marker {
                paths.push(entry.into_path());
            }
        }
        paths.sort();
        log::debug!(
            "found {} '{}' recordings in {}",
            paths.len(),
            marker,
            dir.display()
        );
        Ok(Self {
            queue: paths.into(),
        })
    }
    pub fn len(&self) -> usize {
        self.queue.len()
    }
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}
impl RecordingSource for DirectorySource {
    fn next_recording(&mut self) -> Result<Option<SubjectRecording>, AnalysisError> {
        let Some(path) = self.queue.pop_front() else {
            return Ok(None);
        };
        let id = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_string();
        let matrix = read_matrix(&path)?;
        SubjectRecording::from_matrix(id, &matrix, &path).map(Some)
    }
}
/// In-memory source for tests and synthetic cohorts.
pub struct ManualSource {
    queue: VecDeque<SubjectRecording>,
}
impl ManualSource {
    pub fn new(recordings: impl IntoIterator<Item = SubjectRecording>) -> Self {
        Self {
            queue: recordings.into_iter().collect(),
        }
    }
}
impl RecordingSource for ManualSource {
    fn next_recording(&mut self) -> Result<Option<SubjectRecording>, AnalysisError> {
        Ok(self.queue.pop_front())
    }
}
