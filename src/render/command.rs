//! Render command description.

use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::render::filter::{build_filter_graph, FilterGraph};
use crate::splice::Interval;

/// Everything a backend needs to produce one output file: source,
/// destination, and the trim+concat graph between them.
#[derive(Debug, Clone)]
pub struct RenderCommand {
    input: PathBuf,
    output: PathBuf,
    graph: FilterGraph,
    log_level: String,
}

impl RenderCommand {
    /// Fails with `NothingToRender` for an empty segment list.
    pub fn new(
        input: impl AsRef<Path>,
        output: impl AsRef<Path>,
        segments: &[Interval],
    ) -> Result<Self> {
        Ok(Self {
            input: input.as_ref().to_path_buf(),
            output: output.as_ref().to_path_buf(),
            graph: build_filter_graph(segments)?,
            log_level: "error".to_string(),
        })
    }

    pub fn log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = level.into();
        self
    }

    pub fn input(&self) -> &Path {
        &self.input
    }

    pub fn output(&self) -> &Path {
        &self.output
    }

    pub fn graph(&self) -> &FilterGraph {
        &self.graph
    }

    /// ffmpeg argument list (without the program name).
    pub fn build_args(&self) -> Vec<String> {
        vec![
            // Overwrite output
            "-y".to_string(),
            "-v".to_string(),
            self.log_level.clone(),
            "-i".to_string(),
            self.input.to_string_lossy().to_string(),
            "-filter_complex".to_string(),
            self.graph.expression().to_string(),
            "-map".to_string(),
            self.graph.output_map(),
            self.output.to_string_lossy().to_string(),
        ]
    }
}
