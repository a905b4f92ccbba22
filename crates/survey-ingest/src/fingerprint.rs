//! SHA-256 fingerprints of input files.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use sha2::{Digest, Sha256};
use survey_model::InputFingerprint;

use crate::error::{IngestError, Result};

const BUFFER_SIZE: usize = 65536;

/// Hashes a file, returning the lowercase hex digest and its size in bytes.
pub fn sha256_file(path: &Path) -> Result<(String, u64)> {
    let file = File::open(path).map_err(|e| IngestError::file_read(path, e))?;
    let mut reader = BufReader::with_capacity(BUFFER_SIZE, file);
    let mut hasher = Sha256::new();
    let mut buffer = vec![0u8; BUFFER_SIZE];
    let mut total = 0u64;

    loop {
        let bytes_read = reader
            .read(&mut buffer)
            .map_err(|e| IngestError::file_read(path, e))?;
        if bytes_read == 0 {
            break;
        }
        total += bytes_read as u64;
        hasher.update(&buffer[..bytes_read]);
    }

    Ok((hex::encode(hasher.finalize()), total))
}

pub fn fingerprint(module: &str, path: &Path) -> Result<InputFingerprint> {
    let (sha256, bytes) = sha256_file(path)?;
    tracing::debug!(module, path = %path.display(), %sha256, "fingerprinted input");
    Ok(InputFingerprint {
        module: module.to_string(),
        path: path.display().to_string(),
        sha256,
        bytes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_sha256_known_value() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"hello world").unwrap();
        file.flush().unwrap();

        let (hash, bytes) = sha256_file(file.path()).unwrap();
        assert_eq!(
            hash,
            "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9"
        );
        assert_eq!(bytes, 11);
    }

    #[test]
    fn test_fingerprint_records_module() {
        let file = NamedTempFile::new().unwrap();
        let fp = fingerprint("DEMO", file.path()).unwrap();
        assert_eq!(fp.module, "DEMO");
        assert_eq!(fp.bytes, 0);
        assert_eq!(
            fp.sha256,
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }
}
