// src/analysis/mod.rs
pub mod config;
pub mod convert;
pub mod error;
pub mod matrix;
pub mod microdialysis;
pub mod pipeline;
pub mod plot;
pub mod source;
pub use config::{CohortConfig, ExperimentConfig, FailurePolicy};
pub use error::AnalysisError;
pub use microdialysis::load_fold_change;
pub use pipeline::{CohortPipeline, CohortResult};
pub use plot::{render_fold_change_png, render_trace_overlay_png, PlotStyle};
pub use source::DirectorySource;
