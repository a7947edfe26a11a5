use crate::analyze::AdClassifier;
use crate::error::{Result, Stage, TrimError};
use crate::render::{RenderCommand, RenderEngine};
use crate::splice::{
    extraction_segments, keep_segments, sanitize_ads, total_duration, ExtractMode, Interval,
};
use crate::transcribe::Transcriber;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Per-run settings for the ad removal pipeline.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Where the ad-free audio is written.
    pub output: PathBuf,
    /// When set, the ads themselves are also rendered to this path.
    pub ads_output: Option<PathBuf>,
    /// Layout of the ads-only render.
    pub extract_mode: ExtractMode,
    /// Show spinners for long-running stages.
    pub show_progress: bool,
}

impl PipelineConfig {
    pub fn new(output: impl Into<PathBuf>) -> Self {
        Self {
            output: output.into(),
            ads_output: None,
            extract_mode: ExtractMode::default(),
            show_progress: true,
        }
    }
}

/// Timing for each stage that ran.
#[derive(Debug, Clone, Default)]
pub struct PipelineStats {
    pub total_time: Duration,
    pub transcription_time: Duration,
    pub analysis_time: Duration,
    pub render_time: Duration,
    /// Ads-only debug render, when requested.
    pub extraction_time: Duration,
    pub transcript_segments: usize,
}

/// A completed ad removal.
#[derive(Debug, Clone)]
pub struct PipelineResult {
    pub output_path: PathBuf,
    /// Sanitized ads, in classifier order.
    pub ads: Vec<Interval>,
    /// Kept ranges, chronological and non-overlapping.
    pub keep: Vec<Interval>,
    pub source_duration: f64,
    pub ads_output: Option<PathBuf>,
    /// Set when the ads-only render was requested but failed.
    pub ads_error: Option<String>,
    pub stats: PipelineStats,
}

impl PipelineResult {
    pub fn kept_duration(&self) -> f64 {
        total_duration(&self.keep)
    }

    pub fn removed_duration(&self) -> f64 {
        self.source_duration - self.kept_duration()
    }
}

/// Terminal states of a run that did not fail.
#[derive(Debug, Clone)]
pub enum PipelineOutcome {
    /// The classifier found nothing; no file was rendered.
    NoAds { stats: PipelineStats },
    Trimmed(PipelineResult),
}

/// Transcribe, classify, splice, render. Each stage runs once, in order;
/// the first failure stops the run and is reported with its stage.
pub struct Pipeline {
    transcriber: Box<dyn Transcriber>,
    classifier: Box<dyn AdClassifier>,
    engine: Box<dyn RenderEngine>,
    cancelled: Arc<AtomicBool>,
}

impl Pipeline {
    pub fn new(
        transcriber: Box<dyn Transcriber>,
        classifier: Box<dyn AdClassifier>,
        engine: Box<dyn RenderEngine>,
    ) -> Self {
        Self {
            transcriber,
            classifier,
            engine,
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Share a cancellation flag (e.g. set from a Ctrl+C handler).
    pub fn with_cancel(mut self, cancelled: Arc<AtomicBool>) -> Self {
        self.cancelled = cancelled;
        self
    }

    fn check_cancelled(&self, next: Stage) -> Result<()> {
        if self.cancelled.load(Ordering::Relaxed) {
            return Err(TrimError::Cancelled.at(next));
        }
        Ok(())
    }

    pub async fn run(&self, input: &Path, config: &PipelineConfig) -> Result<PipelineOutcome> {
        let start_time = Instant::now();
        let mut stats = PipelineStats::default();

        if !input.exists() {
            return Err(TrimError::FileNotFound(input.display().to_string()));
        }

        info!("Processing {}", input.display());

        // ═══════════════════════════════════════════════════════════════════════
        // Stage 1: Transcription
        // ═══════════════════════════════════════════════════════════════════════
        self.check_cancelled(Stage::Transcribing)?;
        info!("Stage 1/4: Transcribing with {}", self.transcriber.name());
        let stage_start = Instant::now();
        let pb = start_spinner(config.show_progress, "Transcribing audio...");

        let transcript = self
            .transcriber
            .transcribe(input)
            .await
            .map_err(|e| {
                abandon(&pb, "✗ Transcription failed");
                e.at(Stage::Transcribing)
            })?;

        stats.transcription_time = stage_start.elapsed();
        stats.transcript_segments = transcript.segments.len();
        finish(
            pb,
            format!("✓ Transcribed {} segments", transcript.segments.len()),
        );

        // ═══════════════════════════════════════════════════════════════════════
        // Stage 2: Ad analysis
        // ═══════════════════════════════════════════════════════════════════════
        self.check_cancelled(Stage::Analyzing)?;
        info!(
            "Stage 2/4: Analyzing transcript for ads using {}",
            self.classifier.model_id()
        );
        let stage_start = Instant::now();
        let pb = start_spinner(config.show_progress, "Looking for ads...");

        let classification = self
            .classifier
            .classify(&transcript)
            .await
            .map_err(|e| {
                abandon(&pb, "✗ Ad analysis failed");
                e.at(Stage::Analyzing)
            })?;

        stats.analysis_time = stage_start.elapsed();
        finish(
            pb,
            format!("✓ Classifier reported {} ads", classification.ads.len()),
        );

        if classification.degraded {
            warn!("Classifier output could not be decoded; continuing as if no ads were found");
        }

        if classification.ads.is_empty() {
            info!("No ads detected.");
            stats.total_time = start_time.elapsed();
            return Ok(PipelineOutcome::NoAds { stats });
        }

        // ═══════════════════════════════════════════════════════════════════════
        // Stage 3: Splicing
        // ═══════════════════════════════════════════════════════════════════════
        self.check_cancelled(Stage::Splicing)?;
        info!("Stage 3/4: Computing segments to keep");

        let source_duration = self
            .engine
            .probe_duration(input)
            .await
            .map_err(|e| e.at(Stage::Splicing))?;

        let ads = sanitize_ads(&classification.ads, source_duration)
            .map_err(|e| e.at(Stage::Splicing))?;

        if ads.is_empty() {
            info!("No usable ad intervals after validation.");
            stats.total_time = start_time.elapsed();
            return Ok(PipelineOutcome::NoAds { stats });
        }

        for ad in &ads {
            info!("  - {:.2}s to {:.2}s", ad.start, ad.end);
        }

        let keep = keep_segments(source_duration, &ads);
        debug!("Keep segments: {:?}", keep);

        // An empty keep list would render a zero-length file
        let command = RenderCommand::new(input, &config.output, &keep)
            .map_err(|e| e.at(Stage::Splicing))?;

        // ═══════════════════════════════════════════════════════════════════════
        // Stage 4: Rendering
        // ═══════════════════════════════════════════════════════════════════════
        self.check_cancelled(Stage::Rendering)?;
        info!("Stage 4/4: Rendering {} segments", keep.len());
        let stage_start = Instant::now();
        let pb = start_spinner(config.show_progress, "Splicing audio...");

        self.engine
            .render(&command)
            .await
            .map_err(|e| {
                abandon(&pb, "✗ Rendering failed");
                e.at(Stage::Rendering)
            })?;

        stats.render_time = stage_start.elapsed();
        finish(
            pb,
            format!("✓ Created {}", config.output.display()),
        );

        let stage_start = Instant::now();

        let (ads_output, ads_error) = match &config.ads_output {
            Some(path) => match self.extract_ads(input, path, &ads, config.extract_mode).await {
                Ok(()) => (Some(path.clone()), None),
                Err(e) => {
                    warn!("Error extracting ads: {}", e);
                    (None, Some(e.to_string()))
                }
            },
            None => (None, None),
        };

        if config.ads_output.is_some() {
            stats.extraction_time = stage_start.elapsed();
        }
        stats.total_time = start_time.elapsed();

        Ok(PipelineOutcome::Trimmed(PipelineResult {
            output_path: config.output.clone(),
            ads,
            keep,
            source_duration,
            ads_output,
            ads_error,
            stats,
        }))
    }

    /// Best-effort ads-only render used for checking classifier output.
    async fn extract_ads(
        &self,
        input: &Path,
        output: &Path,
        ads: &[Interval],
        mode: ExtractMode,
    ) -> Result<()> {
        info!("Extracting ads to {} ({:?})", output.display(), mode);
        let segments = extraction_segments(ads, mode);
        let command = RenderCommand::new(input, output, &segments)?;
        self.engine.render(&command).await
    }
}

fn start_spinner(enabled: bool, message: &'static str) -> Option<ProgressBar> {
    if !enabled {
        return None;
    }

    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(message);
    pb.enable_steady_tick(Duration::from_millis(100));
    Some(pb)
}

fn finish(pb: Option<ProgressBar>, message: String) {
    if let Some(pb) = pb {
        pb.finish_with_message(message);
    }
}

/// Stop a spinner on the error path, leaving a failure line in place of the
/// running message.
fn abandon(pb: &Option<ProgressBar>, message: &'static str) {
    if let Some(pb) = pb {
        pb.abandon_with_message(message);
    }
}

/// `<dir>/<stem>_cleaned.mp3`
pub fn default_output_path(input: &Path) -> PathBuf {
    let stem = input.file_stem().unwrap_or_default();
    input.with_file_name(format!("{}_cleaned.mp3", stem.to_string_lossy()))
}

/// `<dir>/<stem>_ads.<ext>`, keeping the input's extension.
pub fn default_ads_path(input: &Path) -> PathBuf {
    let stem = input.file_stem().unwrap_or_default().to_string_lossy();
    let name = match input.extension() {
        Some(ext) => format!("{}_ads.{}", stem, ext.to_string_lossy()),
        None => format!("{}_ads", stem),
    };
    input.with_file_name(name)
}

/// Print a summary of the pipeline results.
pub fn print_summary(result: &PipelineResult) {
    println!();
    println!("═══════════════════════════════════════════════════════════════");
    println!("                        Ad Removal Complete                     ");
    println!("═══════════════════════════════════════════════════════════════");
    println!();
    println!("  Output:     {}", result.output_path.display());
    println!("  Ads:        {}", result.ads.len());
    for ad in &result.ads {
        println!("                - {:.2}s to {:.2}s", ad.start, ad.end);
    }
    println!(
        "  Duration:   {:.1}s -> {:.1}s ({:.1}s removed)",
        result.source_duration,
        result.kept_duration(),
        result.removed_duration()
    );
    if let Some(ref path) = result.ads_output {
        println!("  Ads file:   {}", path.display());
    }
    if let Some(ref err) = result.ads_error {
        println!("  Ads file:   failed ({})", err);
    }
    println!();
    println!("  Timing:");
    println!(
        "    Transcribe:  {:.2}s ({} segments)",
        result.stats.transcription_time.as_secs_f64(),
        result.stats.transcript_segments
    );
    println!(
        "    Analyze:     {:.2}s",
        result.stats.analysis_time.as_secs_f64()
    );
    println!(
        "    Render:      {:.2}s",
        result.stats.render_time.as_secs_f64()
    );
    if result.ads_output.is_some() || result.ads_error.is_some() {
        println!(
            "    Extract ads: {:.2}s",
            result.stats.extraction_time.as_secs_f64()
        );
    }
    println!(
        "    Total:       {:.2}s",
        result.stats.total_time.as_secs_f64()
    );
    println!();
    println!("═══════════════════════════════════════════════════════════════");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_output_path() {
        assert_eq!(
            default_output_path(Path::new("/pods/episode.m4a")),
            PathBuf::from("/pods/episode_cleaned.mp3")
        );
    }

    #[test]
    fn test_default_ads_path_keeps_extension() {
        assert_eq!(
            default_ads_path(Path::new("/pods/episode.m4a")),
            PathBuf::from("/pods/episode_ads.m4a")
        );
        assert_eq!(
            default_ads_path(Path::new("episode")),
            PathBuf::from("episode_ads")
        );
    }

    #[test]
    fn test_pipeline_config_defaults() {
        let config = PipelineConfig::new("out.mp3");
        assert!(config.ads_output.is_none());
        assert_eq!(config.extract_mode, ExtractMode::Raw);
        assert!(config.show_progress);
    }

    #[test]
    fn test_abandon_stops_spinner() {
        let pb = ProgressBar::hidden();
        let spinner = Some(pb.clone());
        abandon(&spinner, "✗ Transcription failed");
        assert!(pb.is_finished());
        assert_eq!(pb.message(), "✗ Transcription failed");
    }

    #[test]
    fn test_result_durations() {
        let result = PipelineResult {
            output_path: PathBuf::from("out.mp3"),
            ads: vec![Interval { start: 10.0, end: 30.0 }],
            keep: vec![
                Interval { start: 0.0, end: 10.0 },
                Interval { start: 30.0, end: 40.0 },
            ],
            source_duration: 40.0,
            ads_output: None,
            ads_error: None,
            stats: PipelineStats::default(),
        };
        assert!((result.kept_duration() - 20.0).abs() < 1e-9);
        assert!((result.removed_duration() - 20.0).abs() < 1e-9);
    }
}
