use anyhow::{Context, Result};
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::config::BuildConfig;
use crate::core::error::BuildError;

/// Which boot loader configuration a patch targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootConfigFile {
    /// isolinux.cfg
    Legacy,
    /// EFI/BOOT/grub.cfg
    Uefi,
}

/// One literal find-and-replace against a boot configuration file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootPatch {
    pub file: BootConfigFile,
    pub find: String,
    pub replace: String,
    /// Set when the find text carries the volume label.
    pub label_bearing: bool,
}

impl BootPatch {
    fn new(file: BootConfigFile, find: impl Into<String>, replace: impl Into<String>) -> Self {
        Self {
            file,
            find: find.into(),
            replace: replace.into(),
            label_bearing: false,
        }
    }

    fn on_label(mut self) -> Self {
        self.label_bearing = true;
        self
    }

    /// Applies the patch to `content`, returning the result and the number of matches.
    pub fn apply_to(&self, content: &str) -> (String, usize) {
        let matches = content.matches(self.find.as_str()).count();
        (content.replace(self.find.as_str(), &self.replace), matches)
    }
}

/// Matches `LABEL=<token>` in a boot configuration.
pub struct LabelScanner {
    pattern: Regex,
}

impl LabelScanner {
    pub fn new() -> Result<Self> {
        let pattern = Regex::new(r"LABEL=+(\S+)").context("Invalid label pattern")?;
        Ok(Self { pattern })
    }

    /// Returns the first label value in `content`.
    pub fn find(&self, content: &str) -> Option<String> {
        self.pattern
            .captures(content)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_string())
    }
}

/// Reads the volume label from the extracted legacy boot configuration.
pub fn discover_label(legacy_config: &Path) -> Result<String> {
    let content = fs::read_to_string(legacy_config).with_context(|| {
        format!(
            "Failed to read boot configuration: {}",
            legacy_config.display()
        )
    })?;

    let label = LabelScanner::new()?
        .find(&content)
        .ok_or_else(|| BuildError::Label(legacy_config.to_path_buf()))?;
    info!("The current ISO label is {}", label);
    Ok(label)
}

/// The ordered substitutions that turn a stock installer menu into an
/// unattended one. Later entries see the output of earlier ones.
pub fn boot_patches(label: &str, answer_file: &str, menu_title: &str) -> Vec<BootPatch> {
    use BootConfigFile::{Legacy, Uefi};

    let ks = format!("inst.ks=cdrom:/{}", answer_file);
    let stage2 = format!("inst.stage2=hd:LABEL={}", label);

    vec![
        BootPatch::new(
            Legacy,
            format!("append initrd=initrd.img {} quiet", stage2),
            format!("append initrd=initrd.img inst.text {} {}", ks, stage2),
        )
        .on_label(),
        BootPatch::new(
            Legacy,
            format!("append initrd=initrd.img {} rd.live.check quiet", stage2),
            format!("append initrd=initrd.img inst.text {} {} rd.live.check", ks, stage2),
        )
        .on_label(),
        BootPatch::new(Uefi, "Install", "Kickstart Install"),
        BootPatch::new(Uefi, "1", "0"),
        BootPatch::new(Uefi, "install", menu_title),
        BootPatch::new(
            Uefi,
            format!("{} quiet", stage2),
            format!("{} {}", ks, stage2),
        )
        .on_label(),
        BootPatch::new(
            Uefi,
            format!("{} rd.live.check quiet", stage2),
            format!("{} {} rd.live.check", ks, stage2),
        )
        .on_label(),
    ]
}

pub struct BootConfigPatcher {
    legacy_config: PathBuf,
    uefi_config: PathBuf,
}

impl BootConfigPatcher {
    pub fn new(legacy_config: PathBuf, uefi_config: PathBuf) -> Self {
        Self {
            legacy_config,
            uefi_config,
        }
    }

    pub fn from_config(config: &BuildConfig) -> Self {
        Self::new(config.legacy_boot_config(), config.uefi_boot_config())
    }

    fn path_for(&self, file: BootConfigFile) -> &Path {
        match file {
            BootConfigFile::Legacy => &self.legacy_config,
            BootConfigFile::Uefi => &self.uefi_config,
        }
    }

    /// Applies `patches` in order. Each one rewrites its file before the next runs.
    /// Returns the label-bearing patches that matched nothing.
    pub fn apply<'p>(&self, patches: &'p [BootPatch]) -> Result<Vec<&'p BootPatch>> {
        let mut unmatched = Vec::new();
        for patch in patches {
            let path = self.path_for(patch.file);
            let content = fs::read_to_string(path).with_context(|| {
                format!("Failed to read boot configuration: {}", path.display())
            })?;

            let (patched, matches) = patch.apply_to(&content);
            debug!(
                "{}: '{}' -> '{}' ({} matches)",
                path.display(),
                patch.find,
                patch.replace,
                matches
            );
            if matches == 0 && patch.label_bearing {
                warn!(
                    "No boot entry in {} matched '{}'; it will not load the kickstart file",
                    path.display(),
                    patch.find
                );
                unmatched.push(patch);
            }

            fs::write(path, patched).map_err(|e| BuildError::resource(path, e))?;
            info!("Modifying boot parameters");
        }
        Ok(unmatched)
    }
}
