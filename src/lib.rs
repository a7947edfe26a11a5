pub mod analyze;
pub mod cache;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod render;
pub mod splice;
pub mod transcribe;

pub use config::Config;
pub use error::{Result, Stage, TrimError};
pub use pipeline::{
    default_ads_path, default_output_path, print_summary, Pipeline, PipelineConfig,
    PipelineOutcome, PipelineResult, PipelineStats,
};
pub use splice::{ExtractMode, Interval};
