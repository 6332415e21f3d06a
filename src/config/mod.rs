use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::core::error::BuildError;

pub mod validation;

pub use validation::ChecksumInfo;

pub const DEFAULT_MOUNT_DIR: &str = "mount";
pub const DEFAULT_EXTRACT_DIR: &str = "extract";
pub const DEFAULT_ANSWER_FILE: &str = "ks.cfg";
pub const DEFAULT_OUTPUT_PREFIX: &str = "Kickstart-";
pub const DEFAULT_MENU_TITLE: &str = "Kickstart Install Rocky Linux 9.0";
pub const DEFAULT_MASTERING_TOOL: &str = "mkisofs";
pub const DEFAULT_OS_RELEASE: &str = "/etc/os-release";

/// Legacy (BIOS) boot configuration, relative to the extraction tree.
pub const LEGACY_BOOT_CONFIG: &str = "isolinux/isolinux.cfg";
/// UEFI boot configuration, relative to the extraction tree.
pub const UEFI_BOOT_CONFIG: &str = "EFI/BOOT/grub.cfg";

/// Resolved paths and names for one build. Read-only once constructed.
#[derive(Debug, Clone)]
pub struct BuildConfig {
    pub source_iso: PathBuf,
    pub working_dir: PathBuf,
    pub mount_dir: PathBuf,
    pub extract_dir: PathBuf,
    pub answer_file: PathBuf,
    pub output_prefix: String,
    pub menu_title: String,
    pub mastering_tool: String,
    pub os_release: PathBuf,
    pub source_checksum: Option<ChecksumInfo>,
}

/// Optional JSON overrides for the fixed defaults.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    pub working_dir: Option<PathBuf>,
    pub answer_file: Option<PathBuf>,
    pub output_prefix: Option<String>,
    pub menu_title: Option<String>,
    pub mastering_tool: Option<String>,
}

impl BuildConfig {
    /// Defaults rooted at the current working directory.
    pub fn new(source_iso: PathBuf) -> Self {
        Self::with_working_dir(source_iso, PathBuf::from("."))
    }

    pub fn with_working_dir(source_iso: PathBuf, working_dir: PathBuf) -> Self {
        Self {
            source_iso,
            mount_dir: working_dir.join(DEFAULT_MOUNT_DIR),
            extract_dir: working_dir.join(DEFAULT_EXTRACT_DIR),
            answer_file: working_dir.join(DEFAULT_ANSWER_FILE),
            working_dir,
            output_prefix: DEFAULT_OUTPUT_PREFIX.to_string(),
            menu_title: DEFAULT_MENU_TITLE.to_string(),
            mastering_tool: DEFAULT_MASTERING_TOOL.to_string(),
            os_release: PathBuf::from(DEFAULT_OS_RELEASE),
            source_checksum: None,
        }
    }

    /// Applies overrides; relative paths resolve against the (possibly overridden) working dir.
    pub fn apply(mut self, overrides: ConfigFile) -> Self {
        if let Some(working_dir) = overrides.working_dir {
            let answer_name = self.answer_file_name();
            self.mount_dir = working_dir.join(DEFAULT_MOUNT_DIR);
            self.extract_dir = working_dir.join(DEFAULT_EXTRACT_DIR);
            self.answer_file = working_dir.join(answer_name);
            self.working_dir = working_dir;
        }
        if let Some(answer_file) = overrides.answer_file {
            self.answer_file = self.working_dir.join(answer_file);
        }
        if let Some(prefix) = overrides.output_prefix {
            self.output_prefix = prefix;
        }
        if let Some(title) = overrides.menu_title {
            self.menu_title = title;
        }
        if let Some(tool) = overrides.mastering_tool {
            self.mastering_tool = tool;
        }
        self
    }

    /// `<working_dir>/<prefix><source file name>`
    pub fn output_iso(&self) -> Result<PathBuf> {
        let name = self.source_iso.file_name().ok_or_else(|| {
            BuildError::environment(format!(
                "Source ISO path has no file name: {}",
                self.source_iso.display()
            ))
        })?;
        Ok(self
            .working_dir
            .join(format!("{}{}", self.output_prefix, name.to_string_lossy())))
    }

    /// File name the answer file gets at the root of the install media.
    pub fn answer_file_name(&self) -> String {
        self.answer_file
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| DEFAULT_ANSWER_FILE.to_string())
    }

    pub fn legacy_boot_config(&self) -> PathBuf {
        self.extract_dir.join(LEGACY_BOOT_CONFIG)
    }

    pub fn uefi_boot_config(&self) -> PathBuf {
        self.extract_dir.join(UEFI_BOOT_CONFIG)
    }
}

/// Load configuration overrides from a JSON file
pub fn load_config_file<P: AsRef<Path>>(path: P) -> Result<ConfigFile> {
    let path = path.as_ref();
    info!("Loading configuration from {}", path.display());

    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: ConfigFile = serde_json::from_str(&contents)
        .with_context(|| format!("Failed to parse JSON in config file: {}", path.display()))?;

    debug!("Successfully loaded config: {:#?}", config);
    Ok(config)
}
