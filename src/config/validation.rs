use anyhow::Result;
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;
use tracing::info;

use crate::core::error::BuildError;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Invalid checksum format '{0}'. Expected 'algorithm:value'")]
    ChecksumFormat(String),

    #[error("Unsupported checksum algorithm: {0}")]
    UnsupportedAlgorithm(String),

    #[error("Checksum value is not {expected} hex digits: {value}")]
    ChecksumValue { expected: usize, value: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChecksumAlgorithm {
    Sha256,
    Sha512,
}

impl ChecksumAlgorithm {
    fn hex_len(self) -> usize {
        match self {
            Self::Sha256 => 64,
            Self::Sha512 => 128,
        }
    }
}

impl fmt::Display for ChecksumAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sha256 => write!(f, "sha256"),
            Self::Sha512 => write!(f, "sha512"),
        }
    }
}

/// Expected digest of the source ISO, written as `algorithm:value`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChecksumInfo {
    pub algorithm: ChecksumAlgorithm,
    pub value: String,
}

impl FromStr for ChecksumInfo {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (algorithm, value) = s
            .split_once(':')
            .ok_or_else(|| ValidationError::ChecksumFormat(s.to_string()))?;

        let algorithm = match algorithm.trim().to_lowercase().as_str() {
            "sha256" => ChecksumAlgorithm::Sha256,
            "sha512" => ChecksumAlgorithm::Sha512,
            other => return Err(ValidationError::UnsupportedAlgorithm(other.to_string())),
        };

        let value = value.trim();
        if value.len() != algorithm.hex_len() || !value.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(ValidationError::ChecksumValue {
                expected: algorithm.hex_len(),
                value: value.to_string(),
            });
        }

        Ok(Self {
            algorithm,
            value: value.to_string(),
        })
    }
}

pub fn validate_source_iso(path: &Path) -> Result<()> {
    if path.is_file() {
        info!("Source ISO file exists: {}", path.display());
        Ok(())
    } else {
        Err(BuildError::environment(format!(
            "Source ISO file does not exist: {}",
            path.display()
        ))
        .into())
    }
}

pub fn validate_answer_file(path: &Path) -> Result<()> {
    if path.is_file() {
        info!("Kickstart answer file exists: {}", path.display());
        Ok(())
    } else {
        Err(BuildError::environment(format!(
            "Kickstart answer file does not exist: {}",
            path.display()
        ))
        .into())
    }
}
