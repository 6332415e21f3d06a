use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::{error, info};

use crate::utils::command::{run, CommandRunner, SystemCommand};

/// A mounted source image. Unmounts on drop unless [`MountGuard::release`] ran.
pub struct MountGuard<'a> {
    runner: &'a dyn CommandRunner,
    mount_point: PathBuf,
    mounted: bool,
}

impl<'a> MountGuard<'a> {
    pub fn mount(runner: &'a dyn CommandRunner, iso_path: &Path, mount_point: &Path) -> Result<Self> {
        let command = SystemCommand::new("mount")
            .args(["-o", "loop,ro"])
            .arg(iso_path)
            .arg(mount_point);
        run(runner, &command, "Mounted source ISO")?;

        Ok(Self {
            runner,
            mount_point: mount_point.to_path_buf(),
            mounted: true,
        })
    }

    pub fn release(mut self) -> Result<()> {
        self.mounted = false;
        run(self.runner, &self.unmount_command(), "Un-mounted source ISO")
    }

    fn unmount_command(&self) -> SystemCommand {
        SystemCommand::new("umount").arg(&self.mount_point)
    }
}

impl Drop for MountGuard<'_> {
    fn drop(&mut self) {
        if !self.mounted {
            return;
        }
        if let Err(e) = run(self.runner, &self.unmount_command(), "Un-mounted source ISO") {
            error!(
                "Failed to unmount {}: {:#}",
                self.mount_point.display(),
                e
            );
        }
    }
}

pub struct IsoExtractor<'a> {
    runner: &'a dyn CommandRunner,
}

impl<'a> IsoExtractor<'a> {
    pub fn new(runner: &'a dyn CommandRunner) -> Self {
        Self { runner }
    }

    /// Mounts `iso_path`, copies its tree into `extract_path`, and unmounts.
    pub fn extract_iso(&self, iso_path: &Path, mount_point: &Path, extract_path: &Path) -> Result<()> {
        info!(
            "Extracting ISO: {} to {}",
            iso_path.display(),
            extract_path.display()
        );

        let mount = MountGuard::mount(self.runner, iso_path, mount_point)?;

        let copy = SystemCommand::new("rsync")
            .args(["-a", "--info=progress2", "--human-readable"])
            .arg_dir_contents(mount_point)
            .arg_dir_contents(extract_path);
        // `mount` drops on error here, which unmounts.
        run(self.runner, &copy, "Extracted source ISO")?;

        mount.release()?;

        info!("Successfully extracted ISO to: {}", extract_path.display());
        Ok(())
    }

    pub fn inject_answer_file(&self, answer_file: &Path, extract_path: &Path, name: &str) -> Result<()> {
        let target = extract_path.join(name);
        std::fs::copy(answer_file, &target).with_context(|| {
            format!(
                "Failed to copy kickstart config {} to {}",
                answer_file.display(),
                target.display()
            )
        })?;

        info!("Copied kickstart config to extracted ISO");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::command::tests::exit_code;
    use crate::utils::command::MockCommandRunner;
    use tempfile::TempDir;

    fn program_is(name: &'static str) -> impl Fn(&SystemCommand) -> bool {
        move |cmd| cmd.program() == name
    }

    #[test]
    fn test_extract_unmounts_after_copy() {
        let mut runner = MockCommandRunner::new();
        runner
            .expect_execute()
            .withf(program_is("mount"))
            .times(1)
            .returning(|_| Ok(exit_code(0)));
        runner
            .expect_execute()
            .withf(|cmd| {
                cmd.program() == "rsync" && cmd.to_string().ends_with("/mnt/ /out/")
            })
            .times(1)
            .returning(|_| Ok(exit_code(0)));
        runner
            .expect_execute()
            .withf(|cmd| cmd.to_string() == "umount /mnt")
            .times(1)
            .returning(|_| Ok(exit_code(0)));

        IsoExtractor::new(&runner)
            .extract_iso(Path::new("src.iso"), Path::new("/mnt"), Path::new("/out"))
            .unwrap();
    }

    #[test]
    fn test_copy_failure_still_unmounts() {
        let mut runner = MockCommandRunner::new();
        runner
            .expect_execute()
            .withf(program_is("mount"))
            .times(1)
            .returning(|_| Ok(exit_code(0)));
        runner
            .expect_execute()
            .withf(program_is("rsync"))
            .times(1)
            .returning(|_| Ok(exit_code(23)));
        runner
            .expect_execute()
            .withf(program_is("umount"))
            .times(1)
            .returning(|_| Ok(exit_code(0)));

        let result =
            IsoExtractor::new(&runner).extract_iso(Path::new("src.iso"), Path::new("/mnt"), Path::new("/out"));
        assert!(result.is_err());
    }

    #[test]
    fn test_mount_failure_never_unmounts() {
        let mut runner = MockCommandRunner::new();
        runner
            .expect_execute()
            .withf(program_is("mount"))
            .times(1)
            .returning(|_| Ok(exit_code(32)));
        runner.expect_execute().withf(program_is("rsync")).never();
        runner.expect_execute().withf(program_is("umount")).never();

        let result =
            IsoExtractor::new(&runner).extract_iso(Path::new("src.iso"), Path::new("/mnt"), Path::new("/out"));
        assert!(result.is_err());
    }

    #[test]
    fn test_unmount_failure_is_reported() {
        let mut runner = MockCommandRunner::new();
        runner
            .expect_execute()
            .withf(|cmd| cmd.program() != "umount")
            .times(2)
            .returning(|_| Ok(exit_code(0)));
        runner
            .expect_execute()
            .withf(program_is("umount"))
            .times(1)
            .returning(|_| Ok(exit_code(32)));

        let result =
            IsoExtractor::new(&runner).extract_iso(Path::new("src.iso"), Path::new("/mnt"), Path::new("/out"));
        assert!(result.is_err());
    }

    #[test]
    fn test_inject_answer_file() {
        let tmp = TempDir::new().unwrap();
        let ks = tmp.path().join("ks.cfg");
        let extract = tmp.path().join("extract");
        std::fs::create_dir(&extract).unwrap();
        std::fs::write(&ks, "text\nreboot\n").unwrap();

        let runner = MockCommandRunner::new();
        IsoExtractor::new(&runner)
            .inject_answer_file(&ks, &extract, "ks.cfg")
            .unwrap();

        assert_eq!(
            std::fs::read_to_string(extract.join("ks.cfg")).unwrap(),
            "text\nreboot\n"
        );
    }

    #[test]
    fn test_inject_missing_answer_file() {
        let tmp = TempDir::new().unwrap();
        let runner = MockCommandRunner::new();
        let result = IsoExtractor::new(&runner).inject_answer_file(
            &tmp.path().join("missing.cfg"),
            tmp.path(),
            "ks.cfg",
        );
        assert!(result.is_err());
    }
}
