use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::error::{Result, TrimError};
use crate::render::RenderCommand;

/// Media backend capable of measuring and rendering audio.
#[async_trait]
pub trait RenderEngine: Send + Sync {
    /// Total duration of a media file in seconds.
    async fn probe_duration(&self, input: &Path) -> Result<f64>;

    /// Execute a render command. On failure no output file is left behind.
    async fn render(&self, command: &RenderCommand) -> Result<()>;
}

/// ffmpeg/ffprobe subprocess backend.
#[derive(Debug, Clone)]
pub struct FfmpegEngine {
    ffmpeg: PathBuf,
    ffprobe: PathBuf,
}

impl Default for FfmpegEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl FfmpegEngine {
    /// Use `ffmpeg` and `ffprobe` from `PATH`.
    pub fn new() -> Self {
        Self {
            ffmpeg: PathBuf::from("ffmpeg"),
            ffprobe: PathBuf::from("ffprobe"),
        }
    }

    pub fn with_binaries(ffmpeg: impl Into<PathBuf>, ffprobe: impl Into<PathBuf>) -> Self {
        Self {
            ffmpeg: ffmpeg.into(),
            ffprobe: ffprobe.into(),
        }
    }

    /// Check that both binaries are installed and runnable.
    pub async fn check_available(&self) -> Result<()> {
        for binary in [&self.ffmpeg, &self.ffprobe] {
            let status = Command::new(binary)
                .arg("-version")
                .stdout(Stdio::null())
                .stderr(Stdio::null())
                .status()
                .await
                .map_err(|e| {
                    TrimError::Render(format!(
                        "{} not found. Install it with: brew install ffmpeg (macOS) or apt install ffmpeg (Linux). Error: {e}",
                        binary.display()
                    ))
                })?;

            if !status.success() {
                return Err(TrimError::Render(format!(
                    "{} check failed",
                    binary.display()
                )));
            }
        }

        debug!("FFmpeg and FFprobe are available");
        Ok(())
    }
}

#[async_trait]
impl RenderEngine for FfmpegEngine {
    async fn probe_duration(&self, input: &Path) -> Result<f64> {
        if !input.exists() {
            return Err(TrimError::FileNotFound(input.display().to_string()));
        }

        let output = Command::new(&self.ffprobe)
            .args([
                "-v",
                "error",
                "-show_entries",
                "format=duration",
                "-of",
                "default=noprint_wrappers=1:nokey=1",
            ])
            .arg(input)
            .output()
            .await
            .map_err(|e| TrimError::Render(format!("Failed to run FFprobe: {e}")))?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let duration: f64 = stdout.trim().parse().map_err(|_| {
            TrimError::Render(format!(
                "Could not determine duration of {}. Error: {}",
                input.display(),
                String::from_utf8_lossy(&output.stderr).trim()
            ))
        })?;

        if !duration.is_finite() || duration <= 0.0 {
            return Err(TrimError::Render(format!(
                "Invalid duration {} for {}",
                duration,
                input.display()
            )));
        }

        debug!("Probed duration of {}: {:.2}s", input.display(), duration);
        Ok(duration)
    }

    async fn render(&self, command: &RenderCommand) -> Result<()> {
        let args = command.build_args();
        debug!("Running {} {:?}", self.ffmpeg.display(), args);
        info!(
            "Rendering {} segments ({:.1}s) to {}",
            command.graph().segments().len(),
            command.graph().duration(),
            command.output().display()
        );

        let output = Command::new(&self.ffmpeg)
            .args(&args)
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| TrimError::Render(format!("Failed to run FFmpeg: {e}")))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            if command.output().exists() {
                if let Err(e) = tokio::fs::remove_file(command.output()).await {
                    warn!(
                        "Failed to remove partial output {}: {}",
                        command.output().display(),
                        e
                    );
                }
            }
            return Err(TrimError::Render(format!(
                "FFmpeg exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        if !command.output().exists() {
            return Err(TrimError::Render(
                "Output file was not created".to_string(),
            ));
        }

        info!("Created {}", command.output().display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_probe_missing_file() {
        let engine = FfmpegEngine::new();
        let result = engine.probe_duration(Path::new("/nonexistent/episode.mp3")).await;
        assert!(matches!(result, Err(TrimError::FileNotFound(_))));
    }

    #[tokio::test]
    async fn test_missing_binary_is_render_error() {
        let engine = FfmpegEngine::with_binaries(
            "/nonexistent/bin/ffmpeg-podtrim",
            "/nonexistent/bin/ffprobe-podtrim",
        );
        assert!(matches!(
            engine.check_available().await,
            Err(TrimError::Render(_))
        ));
    }
}
