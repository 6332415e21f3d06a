use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use console::Term;
use std::io::BufRead;
use std::path::PathBuf;

use crate::config::{load_config_file, BuildConfig, ChecksumInfo};
use crate::core::error::BuildError;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(name = "kickstart-iso")]
pub struct Cli {
    /// Path to the source ISO file (prompted for when omitted)
    pub source_iso: Option<PathBuf>,

    /// Log verbosity
    #[arg(short, long, value_enum, default_value_t = LogLevel::Warn)]
    pub log_level: LogLevel,

    /// JSON file overriding the default paths and names
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Expected digest of the source ISO, e.g. sha256:<hex>
    #[arg(long)]
    pub checksum: Option<ChecksumInfo>,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn as_filter(self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warn => "warn",
            Self::Info => "info",
            Self::Debug => "debug",
            Self::Trace => "trace",
        }
    }
}

impl Cli {
    /// Resolves the source path, prompting for it if it was not given.
    /// Without a terminal the answer is read as one line from stdin.
    pub fn source_iso(&self) -> Result<PathBuf> {
        if let Some(path) = &self.source_iso {
            return Ok(path.clone());
        }

        let term = Term::stdout();
        term.write_str("Please provide the path to the source ISO file: ")
            .context("Failed to write prompt")?;
        let answer = if term.is_term() {
            term.read_line().context("Failed to read source ISO path")?
        } else {
            read_answer(std::io::stdin().lock())?
        };
        source_path_from_answer(&answer)
    }

    pub fn build_config(&self) -> Result<BuildConfig> {
        let mut config = BuildConfig::new(self.source_iso()?);
        if let Some(path) = &self.config {
            config = config.apply(load_config_file(path)?);
        }
        config.source_checksum = self.checksum.clone();
        Ok(config)
    }
}

fn read_answer(mut reader: impl BufRead) -> Result<String> {
    let mut answer = String::new();
    reader
        .read_line(&mut answer)
        .context("Failed to read source ISO path")?;
    Ok(answer)
}

fn source_path_from_answer(answer: &str) -> Result<PathBuf> {
    let answer = answer.trim();
    if answer.is_empty() {
        return Err(BuildError::environment("No source ISO file provided").into());
    }
    Ok(PathBuf::from(answer))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::validation::ChecksumAlgorithm;
    use std::ffi::OsString;
    use std::io::Cursor;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let cli = Cli::try_parse_from(["kickstart-iso", "Rocky-9.0-x86_64-dvd.iso"]).unwrap();
        assert_eq!(cli.source_iso, Some(PathBuf::from("Rocky-9.0-x86_64-dvd.iso")));
        assert_eq!(cli.log_level, LogLevel::Warn);
        assert!(cli.config.is_none());
        assert!(cli.checksum.is_none());
    }

    #[test]
    fn test_log_level_flag() {
        let cli = Cli::try_parse_from(["kickstart-iso", "-l", "debug", "a.iso"]).unwrap();
        assert_eq!(cli.log_level.as_filter(), "debug");

        assert!(Cli::try_parse_from(["kickstart-iso", "--log-level", "loud", "a.iso"]).is_err());
    }

    #[test]
    fn test_checksum_flag() {
        let digest = "0".repeat(64);
        let cli = Cli::try_parse_from([
            "kickstart-iso",
            "--checksum",
            &format!("sha256:{}", digest),
            "a.iso",
        ])
        .unwrap();
        let checksum = cli.checksum.unwrap();
        assert_eq!(checksum.algorithm, ChecksumAlgorithm::Sha256);

        assert!(Cli::try_parse_from(["kickstart-iso", "--checksum", "md5:00", "a.iso"]).is_err());
    }

    #[test]
    fn test_build_config_with_overrides() {
        let tmp = TempDir::new().unwrap();
        let file = tmp.path().join("kickstart.json");
        std::fs::write(&file, r#"{ "output_prefix": "KS-" }"#).unwrap();

        let args: Vec<OsString> = vec![
            "kickstart-iso".into(),
            "--config".into(),
            file.into_os_string(),
            "/isos/Alma.iso".into(),
        ];
        let cli = Cli::try_parse_from(args).unwrap();
        let config = cli.build_config().unwrap();

        assert_eq!(config.output_iso().unwrap(), PathBuf::from("./KS-Alma.iso"));
    }

    #[test]
    fn test_piped_answer_takes_first_line() {
        let answer = read_answer(Cursor::new("/isos/Rocky-9.0.iso\nignored\n")).unwrap();
        assert_eq!(
            source_path_from_answer(&answer).unwrap(),
            PathBuf::from("/isos/Rocky-9.0.iso")
        );
    }

    #[test]
    fn test_empty_answer_is_rejected() {
        for input in ["", "\n", "   \n"] {
            let answer = read_answer(Cursor::new(input)).unwrap();
            let err = source_path_from_answer(&answer).unwrap_err();
            assert!(matches!(
                err.downcast_ref::<BuildError>(),
                Some(BuildError::Environment(_))
            ));
        }
    }
}
