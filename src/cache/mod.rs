//! Content-addressed result cache shared by transcription and ad analysis.

pub mod hash;
pub mod store;

pub use hash::{hash_file, hash_text};
pub use store::ResultCache;
