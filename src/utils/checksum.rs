use anyhow::{Context, Result};
use sha2::{Digest, Sha256, Sha512};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use tracing::{debug, info};

use crate::config::validation::{ChecksumAlgorithm, ChecksumInfo};
use crate::core::error::BuildError;

pub struct ChecksumVerifier;

impl ChecksumVerifier {
    pub fn new() -> Self {
        Self
    }

    pub fn verify_file(&self, file_path: &Path, expected: &ChecksumInfo) -> Result<()> {
        info!("Verifying checksum for: {}", file_path.display());
        debug!("Algorithm: {}, Expected: {}", expected.algorithm, expected.value);

        let calculated = self.calculate_checksum(file_path, expected.algorithm)?;

        if calculated.eq_ignore_ascii_case(&expected.value) {
            info!("✓ Checksum verification passed");
            Ok(())
        } else {
            Err(BuildError::environment(format!(
                "Checksum mismatch for {}\nExpected: {}\nCalculated: {}",
                file_path.display(),
                expected.value,
                calculated
            ))
            .into())
        }
    }

    pub fn calculate_checksum(&self, file_path: &Path, algorithm: ChecksumAlgorithm) -> Result<String> {
        let file = File::open(file_path)
            .with_context(|| format!("Failed to open file: {}", file_path.display()))?;
        let reader = BufReader::new(file);

        match algorithm {
            ChecksumAlgorithm::Sha256 => digest_reader::<Sha256>(reader),
            ChecksumAlgorithm::Sha512 => digest_reader::<Sha512>(reader),
        }
    }
}

impl Default for ChecksumVerifier {
    fn default() -> Self {
        Self::new()
    }
}

fn digest_reader<D: Digest>(mut reader: impl Read) -> Result<String> {
    let mut hasher = D::new();
    let mut buffer = vec![0; 8192];
    loop {
        let bytes_read = reader
            .read(&mut buffer)
            .context("Failed to read file data")?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(&buffer[..bytes_read]);
    }
    Ok(hex::encode(hasher.finalize()))
}
