use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use serde::{Deserialize, Serialize};
use crate::analysis::AnalysisError;
/// Sampling rate and the three windows that drive alignment.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    pub sample_rate_hz: usize,
    /// Baseline used for z-score statistics, ending at injection.
    pub baseline_minutes: usize,
    /// Kept before injection in the aligned trace.
    pub pre_minutes: usize,
    /// Kept after injection in the aligned trace.
    pub post_minutes: usize,
}
impl WindowConfig {
    pub fn samples_per_minute(&self) -> usize {
        self.sample_rate_hz * 60
    }
    pub fn baseline_samples(&self) -> usize {
        self.samples_per_minute() * self.baseline_minutes
    }
    pub fn pre_samples(&self) -> usize {
        self.samples_per_minute() * self.pre_minutes
    }
    pub fn post_samples(&self) -> usize {
        self.samples_per_minute() * self.post_minutes
    }
    pub fn window_len(&self) -> usize {
        self.pre_samples() + self.post_samples()
    }
}
impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            sample_rate_hz: 20,
            baseline_minutes: 20,
            pre_minutes: 45,
            post_minutes: 100,
        }
    }
}
/// Identifies subjects inside a cohort by position in the sorted file list,
/// by id (file stem), or every position from `from_ordinal` on.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SubjectKey {
    Ordinal(usize),
    Id(String),
    FromOrdinal { from_ordinal: usize },
}
impl SubjectKey {
    fn matches(&self, ordinal: usize, subject_id: &str) -> bool {
        match self {
            SubjectKey::Ordinal(idx) => *idx == ordinal,
            SubjectKey::Id(id) => id == subject_id,
            SubjectKey::FromOrdinal { from_ordinal } => ordinal >= *from_ordinal,
        }
    }
}
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct InjectionOverride {
    pub subject: SubjectKey,
    pub injection_index: usize,
}
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CohortConfig {
    pub name: String,
    /// Substring that selects this cohort's photometry files.
    pub marker: String,
    pub injection_index: usize,
    #[serde(default)]
    pub overrides: Vec<InjectionOverride>,
    /// Microdialysis table for the cohort, relative to the microdialysis directory.
    pub microdialysis_file: String,
}
impl CohortConfig {
    pub fn vehicle() -> Self {
        Self {
            name: "vehicle".into(),
            marker: "ctrl".into(),
            injection_index: 80_000,
            overrides: Vec::new(),
            microdialysis_file: "mice_ctrl.txt".into(),
        }
    }
    /// From subject 5 on the recording was interrupted and restarted, which
    /// moved the injection earlier in the file.
    pub fn treatment() -> Self {
        Self {
            name: "amphetamine".into(),
            marker: "amph".into(),
            injection_index: 80_000,
            overrides: vec![InjectionOverride {
                subject: SubjectKey::FromOrdinal { from_ordinal: 5 },
                injection_index: 55_000,
            }],
            microdialysis_file: "mice_amph.txt".into(),
        }
    }
    pub fn injection_index_for(&self, ordinal: usize, subject_id: &str) -> usize {
        self.overrides
            .iter()
            .find(|o| o.subject.matches(ordinal, subject_id))
            .map(|o| o.injection_index)
            .unwrap_or(self.injection_index)
    }
}
/// What to do with a subject whose recording cannot be aligned.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    #[default]
    Abort,
    Skip,
}
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MicrodialysisConfig {
    /// Leading time bins averaged into the baseline.
    pub baseline_bins: usize,
    pub start_minutes: f64,
    pub end_minutes: f64,
}
impl Default for MicrodialysisConfig {
    fn default() -> Self {
        Self {
            baseline_bins: 4,
            start_minutes: -60.0,
            end_minutes: 120.0,
        }
    }
}
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExperimentConfig {
    pub photometry_dir: String,
    pub microdialysis_dir: String,
    pub windows: WindowConfig,
    pub vehicle: CohortConfig,
    pub treatment: CohortConfig,
    pub failure_policy: FailurePolicy,
    pub microdialysis: MicrodialysisConfig,
}
impl Default for ExperimentConfig {
    fn default() -> Self {
        Self {
            photometry_dir: "fiber photometry".into(),
            microdialysis_dir: "microdialysis".into(),
            windows: WindowConfig::default(),
            vehicle: CohortConfig::vehicle(),
            treatment: CohortConfig::treatment(),
            failure_policy: FailurePolicy::default(),
            microdialysis: MicrodialysisConfig::default(),
        }
    }
}
impl ExperimentConfig {
    pub fn from_json_str(text: &str) -> Result<Self, AnalysisError> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }
    pub fn from_json_file(path: &Path) -> Result<Self, AnalysisError> {
        let text = fs::read_to_string(path).map_err(|source| match source.kind() {
            ErrorKind::NotFound => AnalysisError::FileNotFound(path.to_path_buf()),
            _ => AnalysisError::Io {
                path: path.to_path_buf(),
                source,
            },
        })?;
        Self::from_json_str(&text)
    }
    pub fn cohorts(&self) -> [&CohortConfig; 2] {
        [&self.vehicle, &self.treatment]
    }
    pub fn validate(&self) -> Result<(), AnalysisError> {
        let w = &self.windows;
        if w.sample_rate_hz == 0 {
            return Err(AnalysisError::Config(
                "sample rate must be greater than zero".into(),
            ));
        }
        if w.baseline_minutes == 0 {
            return Err(AnalysisError::Config(
                "baseline window must be at least one minute".into(),
            ));
        }
        if w.window_len() == 0 {
            return Err(AnalysisError::Config("aligned window is empty".into()));
        }
        for cohort in self.cohorts() {
            if cohort.marker.is_empty() {
                return Err(AnalysisError::Config(format!(
                    "cohort '{}' has an empty file marker",
                    cohort.name
                )));
            }
        }
        let md = &self.microdialysis;
        if md.baseline_bins == 0 {
            return Err(AnalysisError::Config(
                "microdialysis baseline needs at least one bin".into(),
            ));
        }
        if md.end_minutes <= md.start_minutes {
            return Err(AnalysisError::Config(format!(
                "microdialysis time axis {}..{} is empty",
                md.start_minutes, md.end_minutes
            )));
        }
        Ok(())
    }
}
#[cfg(test)]
mod tests {
    use super::*;
    #[test]
    fn default_windows_match_experiment_constants() {
        let w = WindowConfig::default();
        assert_eq!(w.baseline_samples(), 20 * 60 * 20);
        assert_eq!(w.pre_samples(), 20 * 60 * 45);
        assert_eq!(w.post_samples(), 20 * 60 * 100);
        assert_eq!(w.window_len(), 174_000);
    }
    #[test]
    fn treatment_overrides_resolve_by_ordinal() {
        let cohort = CohortConfig::treatment();
        assert_eq!(cohort.injection_index_for(0, "m0_amph"), 80_000);
        assert_eq!(cohort.injection_index_for(4, "m4_amph"), 80_000);
        assert_eq!(cohort.injection_index_for(5, "m5_amph"), 55_000);
        assert_eq!(cohort.injection_index_for(6, "m6_amph"), 55_000);
        assert_eq!(cohort.injection_index_for(7, "m7_amph"), 55_000);
        assert_eq!(cohort.injection_index_for(10, "m10_amph"), 55_000);
        assert_eq!(CohortConfig::vehicle().injection_index_for(5, "m5_ctrl"), 80_000);
    }
    #[test]
    fn partial_json_keeps_defaults_and_accepts_id_keys() {
        let text = r#"{
            "failure_policy": "skip",
            "treatment": {
                "name": "amphetamine",
                "marker": "amph",
                "injection_index": 70000,
                "overrides": [{ "subject": "mouse3_amph", "injection_index": 60000 }],
                "microdialysis_file": "mice_amph.txt"
            }
        }"#;
        let config = ExperimentConfig::from_json_str(text).unwrap();
        assert_eq!(config.failure_policy, FailurePolicy::Skip);
        assert_eq!(config.windows, WindowConfig::default());
        assert_eq!(config.vehicle, CohortConfig::vehicle());
        assert_eq!(config.treatment.injection_index_for(3, "mouse3_amph"), 60_000);
        assert_eq!(config.treatment.injection_index_for(5, "mouse5_amph"), 70_000);
    }
    #[test]
    fn from_ordinal_key_parses_from_json() {
        let text = r#"{
            "vehicle": {
                "name": "vehicle",
                "marker": "ctrl",
                "injection_index": 80000,
                "overrides": [{ "subject": { "from_ordinal": 3 }, "injection_index": 50000 }],
                "microdialysis_file": "mice_ctrl.txt"
            }
        }"#;
        let config = ExperimentConfig::from_json_str(text).unwrap();
        assert_eq!(
            config.vehicle.overrides[0].subject,
            SubjectKey::FromOrdinal { from_ordinal: 3 }
        );
        assert_eq!(config.vehicle.injection_index_for(2, "m2_ctrl"), 80_000);
        assert_eq!(config.vehicle.injection_index_for(3, "m3_ctrl"), 50_000);
        assert_eq!(config.vehicle.injection_index_for(9, "m9_ctrl"), 50_000);
    }
    #[test]
    fn zero_sample_rate_is_rejected() {
        let text = r#"{ "windows": { "sample_rate_hz": 0 } }"#;
        assert!(matches!(
            ExperimentConfig::from_json_str(text),
            Err(AnalysisError::Config(_))
        ));
    }
    #[test]
    fn missing_config_file_is_reported() {
        let err = ExperimentConfig::from_json_file(Path::new("no/such/config.json")).unwrap_err();
        assert!(matches!(err, AnalysisError::FileNotFound(_)));
    }
}
