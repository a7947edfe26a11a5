use std::fs::File;
use std::io::Read;
use std::path::Path;

use sha2::{Digest, Sha256};

use crate::error::{Result, TrimError};

const CHUNK_SIZE: usize = 8192;

/// SHA-256 of a file's bytes, lowercase hex. Reads in fixed-size chunks.
pub fn hash_file(path: &Path) -> Result<String> {
    let mut file = File::open(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => TrimError::FileNotFound(path.display().to_string()),
        _ => TrimError::Io(e),
    })?;
    hash_reader(&mut file)
}

pub fn hash_reader<R: Read>(reader: &mut R) -> Result<String> {
    let mut hasher = Sha256::new();
    let mut buffer = [0u8; CHUNK_SIZE];

    loop {
        let read = reader.read(&mut buffer)?;
        if read == 0 {
            break;
        }
        hasher.update(&buffer[..read]);
    }

    Ok(format!("{:x}", hasher.finalize()))
}

/// SHA-256 of UTF-8 text, lowercase hex.
pub fn hash_text(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, Write};
    use tempfile::NamedTempFile;

    #[test]
    fn test_hash_text_known_value() {
        assert_eq!(
            hash_text("abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_hash_text_is_stable() {
        assert_eq!(hash_text("episode"), hash_text("episode"));
        assert_ne!(hash_text("episode"), hash_text("episode "));
        assert_eq!(hash_text("").len(), 64);
    }

    #[test]
    fn test_hash_file_matches_text_hash() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"abc").unwrap();
        assert_eq!(hash_file(file.path()).unwrap(), hash_text("abc"));
    }

    #[test]
    fn test_hash_reader_spans_chunks() {
        let data = vec![7u8; CHUNK_SIZE * 3 + 17];
        let chunked = hash_reader(&mut Cursor::new(&data)).unwrap();

        let mut hasher = Sha256::new();
        hasher.update(&data);
        assert_eq!(chunked, format!("{:x}", hasher.finalize()));
    }

    #[test]
    fn test_hash_file_missing() {
        let result = hash_file(Path::new("/nonexistent/episode.mp3"));
        assert!(matches!(result, Err(TrimError::FileNotFound(_))));
    }
}
