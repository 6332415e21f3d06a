use anyhow::{Context, Result};
use tracing::{error, info};

use crate::config::validation::{validate_answer_file, validate_source_iso};
use crate::config::BuildConfig;
use crate::core::preflight;
use crate::iso::boot::{boot_patches, discover_label};
use crate::iso::{BootConfigPatcher, IsoExtractor, IsoPackager};
use crate::utils::{ChecksumVerifier, CommandRunner, SystemRunner, Workspace};

pub struct Builder {
    config: BuildConfig,
    runner: Box<dyn CommandRunner>,
    workspace: Workspace,
}

impl Builder {
    pub fn new(config: BuildConfig) -> Self {
        Self::with_runner(config, Box::new(SystemRunner::new()))
    }

    pub fn with_runner(config: BuildConfig, runner: Box<dyn CommandRunner>) -> Self {
        let workspace = Workspace::new(config.mount_dir.clone(), config.extract_dir.clone());
        Self {
            config,
            runner,
            workspace,
        }
    }

    /// Runs preflight, then the pipeline. The workspace is torn down on every
    /// outcome once it has been created.
    pub fn build(&self) -> Result<()> {
        info!("Starting the Kickstart ISO creation process");

        self.preflight()?;
        self.run_pipeline()?;

        info!(
            "Kickstart ISO complete: {}",
            self.config.output_iso()?.display()
        );
        Ok(())
    }

    pub fn preflight(&self) -> Result<()> {
        step("Preflight checks", || {
            preflight::ensure_root()?;
            let distro = preflight::detect_distribution(&self.config.os_release)?;

            validate_source_iso(&self.config.source_iso)?;
            validate_answer_file(&self.config.answer_file)?;
            if let Some(expected) = &self.config.source_checksum {
                ChecksumVerifier::new().verify_file(&self.config.source_iso, expected)?;
            }

            let tools = preflight::required_tools(&self.config.mastering_tool);
            preflight::ensure_tools(self.runner.as_ref(), distro, &tools, preflight::command_exists)
        })
    }

    /// Workspace stages through post-processing, followed by teardown.
    pub fn run_pipeline(&self) -> Result<()> {
        let result = self.run_stages();

        match (&result, self.cleanup()) {
            (Ok(()), Err(e)) => return Err(e),
            (Err(_), Err(e)) => error!("Error cleaning up directories: {:#}", e),
            _ => {}
        }

        if result.is_err() {
            error!("An error occurred. Cleaning up and exiting.");
        }
        result
    }

    fn run_stages(&self) -> Result<()> {
        let config = &self.config;
        let runner = self.runner.as_ref();
        let extractor = IsoExtractor::new(runner);
        let packager = IsoPackager::new(runner, config.mastering_tool.as_str());
        let output_iso = config.output_iso()?;

        step("Check and create directories", || self.workspace.reset())?;

        step("Extract source ISO", || {
            extractor.extract_iso(
                &config.source_iso,
                self.workspace.mount_dir(),
                self.workspace.extract_dir(),
            )
        })?;

        step("Copy kickstart config", || {
            extractor.inject_answer_file(
                &config.answer_file,
                self.workspace.extract_dir(),
                &config.answer_file_name(),
            )
        })?;

        let label = step("Get ISO label", || discover_label(&config.legacy_boot_config()))?;

        step("Modify boot parameters", || {
            let patches = boot_patches(&label, &config.answer_file_name(), &config.menu_title);
            BootConfigPatcher::from_config(config).apply(&patches)?;
            Ok(())
        })?;

        step("Create Kickstart ISO", || {
            packager.create_kickstart_iso(self.workspace.extract_dir(), &output_iso, &label)
        })?;

        step("Hybridize and embed checksum", || {
            packager.hybridize(&output_iso)?;
            packager.implant_checksum(&output_iso)
        })?;

        Ok(())
    }

    fn cleanup(&self) -> Result<()> {
        info!("Cleaning up working directories");
        self.workspace
            .teardown()
            .context("Failed to remove scratch directories")
    }
}

fn step<T>(name: &str, f: impl FnOnce() -> Result<T>) -> Result<T> {
    info!("Starting step: {}", name);
    let value = f().with_context(|| format!("Step '{}' failed", name))?;
    info!("Completed step: {}", name);
    Ok(value)
}
