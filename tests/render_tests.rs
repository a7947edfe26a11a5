//! Render tests against a real ffmpeg install
//!
//! Each test skips itself when ffmpeg/ffprobe are not on PATH.

use podtrim::render::{FfmpegEngine, RenderCommand, RenderEngine};
use podtrim::splice::{extraction_segments, keep_segments, ExtractMode, Interval};
use podtrim::TrimError;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

const SAMPLE_RATE: u32 = 8000;

fn ffmpeg_available() -> bool {
    ["ffmpeg", "ffprobe"].iter().all(|bin| {
        Command::new(bin)
            .arg("-version")
            .output()
            .map(|o| o.status.success())
            .unwrap_or(false)
    })
}

/// Quiet mono sawtooth of the given length.
fn write_wav(path: &Path, seconds: u32) {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: SAMPLE_RATE,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec).unwrap();
    for i in 0..SAMPLE_RATE * seconds {
        writer.write_sample(((i % 200) as i16 - 100) * 10).unwrap();
    }
    writer.finalize().unwrap();
}

fn fixture(dir: &TempDir, seconds: u32) -> PathBuf {
    let path = dir.path().join("episode.wav");
    write_wav(&path, seconds);
    path
}

fn iv(start: f64, end: f64) -> Interval {
    Interval { start, end }
}

#[tokio::test]
async fn test_probe_duration() {
    if !ffmpeg_available() {
        eprintln!("Skipping test: FFmpeg not available");
        return;
    }

    let dir = TempDir::new().unwrap();
    let input = fixture(&dir, 40);
    let duration = FfmpegEngine::new().probe_duration(&input).await.unwrap();
    assert!((duration - 40.0).abs() < 0.1, "duration {}", duration);
}

#[tokio::test]
async fn test_no_ads_renders_whole_file() {
    if !ffmpeg_available() {
        eprintln!("Skipping test: FFmpeg not available");
        return;
    }

    let dir = TempDir::new().unwrap();
    let input = fixture(&dir, 40);
    let output = dir.path().join("episode_cleaned.wav");
    let engine = FfmpegEngine::new();

    let keep = keep_segments(40.0, &[]);
    assert_eq!(keep, vec![iv(0.0, 40.0)]);

    let command = RenderCommand::new(&input, &output, &keep).unwrap();
    engine.render(&command).await.unwrap();

    let duration = engine.probe_duration(&output).await.unwrap();
    assert!((duration - 40.0).abs() < 0.1, "duration {}", duration);
}

#[tokio::test]
async fn test_single_mid_file_ad_removed() {
    if !ffmpeg_available() {
        eprintln!("Skipping test: FFmpeg not available");
        return;
    }

    let dir = TempDir::new().unwrap();
    let input = fixture(&dir, 40);
    let output = dir.path().join("episode_cleaned.wav");
    let engine = FfmpegEngine::new();

    let keep = keep_segments(40.0, &[iv(10.0, 30.0)]);
    let command = RenderCommand::new(&input, &output, &keep).unwrap();
    engine.render(&command).await.unwrap();

    let duration = engine.probe_duration(&output).await.unwrap();
    assert!((duration - 20.0).abs() < 0.1, "duration {}", duration);
}

#[tokio::test]
async fn test_raw_and_merged_extraction_lengths() {
    if !ffmpeg_available() {
        eprintln!("Skipping test: FFmpeg not available");
        return;
    }

    let dir = TempDir::new().unwrap();
    let input = fixture(&dir, 30);
    let engine = FfmpegEngine::new();
    let ads = [iv(10.0, 20.0), iv(5.0, 15.0)];

    let raw_out = dir.path().join("ads_raw.wav");
    let raw = extraction_segments(&ads, ExtractMode::Raw);
    engine
        .render(&RenderCommand::new(&input, &raw_out, &raw).unwrap())
        .await
        .unwrap();
    let raw_duration = engine.probe_duration(&raw_out).await.unwrap();
    assert!((raw_duration - 20.0).abs() < 0.1, "raw {}", raw_duration);

    let merged_out = dir.path().join("ads_merged.wav");
    let merged = extraction_segments(&ads, ExtractMode::Merged);
    engine
        .render(&RenderCommand::new(&input, &merged_out, &merged).unwrap())
        .await
        .unwrap();
    let merged_duration = engine.probe_duration(&merged_out).await.unwrap();
    assert!((merged_duration - 15.0).abs() < 0.1, "merged {}", merged_duration);
}

#[tokio::test]
async fn test_failed_render_leaves_no_output() {
    if !ffmpeg_available() {
        eprintln!("Skipping test: FFmpeg not available");
        return;
    }

    let dir = TempDir::new().unwrap();
    // Not audio: ffmpeg cannot open it as an input
    let input = dir.path().join("episode.wav");
    std::fs::write(&input, b"definitely not a wav file").unwrap();
    let output = dir.path().join("episode_cleaned.wav");

    let command = RenderCommand::new(&input, &output, &[iv(0.0, 5.0)]).unwrap();
    let result = FfmpegEngine::new().render(&command).await;

    assert!(matches!(result, Err(TrimError::Render(_))));
    assert!(!output.exists());
}
