use anyhow::{Context, Result};
use clap::Parser;
use console::style;
use podtrim::analyze::{AdClassifier, CachedClassifier, GeminiClassifier};
use podtrim::cache::ResultCache;
use podtrim::config::Config;
use podtrim::render::FfmpegEngine;
use podtrim::transcribe::{CachedTranscriber, Transcriber, WhisperClient};
use podtrim::{
    default_ads_path, default_output_path, print_summary, ExtractMode, Pipeline, PipelineConfig,
    PipelineOutcome,
};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser)]
#[command(name = "podtrim")]
#[command(version, about = "AI-powered podcast ad remover")]
#[command(
    long_about = "Transcribe a podcast with Whisper, find the ad reads with Gemini, and write a copy with the ads cut out."
)]
struct Cli {
    /// Input podcast audio file
    input: PathBuf,

    /// Output file (defaults to <input>_cleaned.mp3)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Gemini API key (overrides GEMINI_API_KEY)
    #[arg(long = "api_key")]
    api_key: Option<String>,

    /// Transcription model
    #[arg(long)]
    model: Option<String>,

    /// Gemini model used to classify ads
    #[arg(long = "gemini_model")]
    gemini_model: Option<String>,

    /// Disable transcript and ad analysis caching
    #[arg(long = "no-cache")]
    no_cache: bool,

    /// Directory for cache files (default: .cache)
    #[arg(long = "cache_dir")]
    cache_dir: Option<PathBuf>,

    /// Also write the detected ads to <input>_ads.<ext>
    #[arg(long)]
    debug: bool,

    /// Merge overlapping ads before writing the debug ads file
    #[arg(long = "merge-extracted", requires = "debug")]
    merge_extracted: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn init_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::INFO };

    FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .init();
}

/// CLI flags win over the config file and environment.
fn resolve_config(cli: &Cli) -> Result<Config> {
    let mut config = Config::load().context("Failed to load configuration")?;

    if let Some(ref key) = cli.api_key {
        config.gemini_api_key = Some(key.clone());
    }
    if let Some(ref model) = cli.model {
        config.whisper_model = model.clone();
    }
    if let Some(ref model) = cli.gemini_model {
        config.gemini_model = model.clone();
    }
    if let Some(ref dir) = cli.cache_dir {
        config.cache_dir = dir.clone();
    }
    if cli.no_cache {
        config.use_cache = false;
    }

    config.validate().context("Configuration validation failed")?;
    Ok(config)
}

fn build_pipeline(config: &Config, cancelled: Arc<AtomicBool>) -> Pipeline {
    // validate() has already checked both keys are present
    let openai_key = config.openai_api_key.clone().unwrap_or_default();
    let gemini_key = config.gemini_api_key.clone().unwrap_or_default();

    let whisper = WhisperClient::new(openai_key, config.whisper_model.clone());
    let gemini = GeminiClassifier::new(gemini_key, config.gemini_model.clone());

    let (transcriber, classifier): (Box<dyn Transcriber>, Box<dyn AdClassifier>) =
        if config.use_cache {
            let cache = ResultCache::new(&config.cache_dir);
            info!("Using cache directory {}", cache.dir().display());
            (
                Box::new(CachedTranscriber::new(Box::new(whisper), cache.clone())),
                Box::new(CachedClassifier::new(Box::new(gemini), cache)),
            )
        } else {
            (Box::new(whisper), Box::new(gemini))
        };

    Pipeline::new(transcriber, classifier, Box::new(FfmpegEngine::new())).with_cancel(cancelled)
}

async fn run(cli: Cli) -> Result<()> {
    // Validate input file exists before touching any backend
    if !cli.input.exists() {
        anyhow::bail!("Input file not found: {}", cli.input.display());
    }

    let config = resolve_config(&cli)?;

    FfmpegEngine::new()
        .check_available()
        .await
        .context("FFmpeg is required for rendering")?;

    let output = cli
        .output
        .clone()
        .unwrap_or_else(|| default_output_path(&cli.input));

    let pipeline_config = PipelineConfig {
        output,
        ads_output: cli.debug.then(|| default_ads_path(&cli.input)),
        extract_mode: if cli.merge_extracted {
            ExtractMode::Merged
        } else {
            ExtractMode::Raw
        },
        show_progress: !cli.verbose,
    };

    let cancelled = Arc::new(AtomicBool::new(false));
    let handler_flag = cancelled.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        // Second Ctrl+C aborts immediately
        if handler_flag.swap(true, Ordering::Relaxed) {
            std::process::exit(130);
        }
        eprintln!("Cancelling after the current stage (press Ctrl+C again to abort)");
    }) {
        warn!("Could not install Ctrl+C handler: {}", e);
    }

    let pipeline = build_pipeline(&config, cancelled);

    match pipeline.run(&cli.input, &pipeline_config).await? {
        PipelineOutcome::NoAds { .. } => {
            println!("No ads detected.");
        }
        PipelineOutcome::Trimmed(result) => {
            print_summary(&result);
            println!("Successfully created {}", result.output_path.display());
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    if let Err(e) = run(cli).await {
        println!("{} {:#}", style("Error:").red().bold(), e);
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_cli_flags() {
        let cli = Cli::try_parse_from([
            "podtrim",
            "episode.mp3",
            "-o",
            "clean.mp3",
            "--api_key",
            "k",
            "--model",
            "whisper-1",
            "--gemini_model",
            "models/gemini-flash-latest",
            "--no-cache",
            "--cache_dir",
            "/tmp/c",
            "--debug",
            "--merge-extracted",
        ])
        .unwrap();

        assert_eq!(cli.input, PathBuf::from("episode.mp3"));
        assert_eq!(cli.output, Some(PathBuf::from("clean.mp3")));
        assert_eq!(cli.api_key.as_deref(), Some("k"));
        assert_eq!(cli.gemini_model.as_deref(), Some("models/gemini-flash-latest"));
        assert!(cli.no_cache);
        assert_eq!(cli.cache_dir, Some(PathBuf::from("/tmp/c")));
        assert!(cli.debug);
        assert!(cli.merge_extracted);
    }

    #[test]
    fn test_merge_extracted_requires_debug() {
        assert!(Cli::try_parse_from(["podtrim", "episode.mp3", "--merge-extracted"]).is_err());
    }
}
