//! Turning interval lists into audio files.
//!
//! [`filter`] builds the trim/concat filter graph, [`command`] pairs it with
//! source and destination paths, and [`engine`] hands the result to a media
//! backend (ffmpeg in production).

pub mod command;
pub mod engine;
pub mod filter;

pub use command::RenderCommand;
pub use engine::{FfmpegEngine, RenderEngine};
pub use filter::{build_filter_graph, FilterGraph};
