use anyhow::Result;
use std::path::Path;
use tracing::info;

use crate::core::error::BuildError;
use crate::utils::command::{run, CommandRunner, SystemCommand};

pub struct IsoPackager<'a> {
    runner: &'a dyn CommandRunner,
    mastering_tool: String,
}

impl<'a> IsoPackager<'a> {
    pub fn new(runner: &'a dyn CommandRunner, mastering_tool: impl Into<String>) -> Self {
        Self {
            runner,
            mastering_tool: mastering_tool.into(),
        }
    }

    /// Masters `iso_fs` into `output_path`, replacing any previous artifact.
    pub fn create_kickstart_iso(&self, iso_fs: &Path, output_path: &Path, volume_label: &str) -> Result<()> {
        remove_stale_artifact(output_path)?;

        info!("Creating Kickstart ISO: {}", output_path.display());
        let command = self.mastering_command(iso_fs, output_path, volume_label);
        run(self.runner, &command, "Created Kickstart ISO")
    }

    /// ISO 9660 + Rock Ridge + Joliet with a BIOS and an EFI El Torito entry.
    pub fn mastering_command(&self, iso_fs: &Path, output_path: &Path, volume_label: &str) -> SystemCommand {
        SystemCommand::new(self.mastering_tool.as_str())
            .args(["-relaxed-filenames", "-J", "-R", "-o"])
            .arg(output_path)
            .args([
                "-b",
                "isolinux/isolinux.bin",
                "-c",
                "isolinux/boot.cat",
                "-no-emul-boot",
                "-V",
            ])
            .arg(volume_label)
            .args([
                "-boot-load-size",
                "4",
                "-boot-info-table",
                "-eltorito-alt-boot",
                "-eltorito-platform",
                "efi",
                "-b",
                "images/efiboot.img",
                "-no-emul-boot",
            ])
            .arg(iso_fs)
    }

    pub fn hybridize(&self, iso_path: &Path) -> Result<()> {
        let command = SystemCommand::new("isohybrid").arg("--uefi").arg(iso_path);
        run(self.runner, &command, "Hybridized ISO")
    }

    pub fn implant_checksum(&self, iso_path: &Path) -> Result<()> {
        let command = SystemCommand::new("implantisomd5").arg(iso_path);
        run(self.runner, &command, "Embedded MD5 checksum")
    }
}

fn remove_stale_artifact(output_path: &Path) -> Result<()> {
    if output_path.exists() {
        info!("Removing existing {}", output_path.display());
        std::fs::remove_file(output_path).map_err(|e| BuildError::resource(output_path, e))?;
    }
    Ok(())
}
