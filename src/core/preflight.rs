//! Host checks that run before the build touches anything.
//!
//! Order: effective privilege, host distribution, required tools. Missing
//! tools get exactly one install attempt through the distribution's package
//! manager.

use anyhow::Result;
use std::fmt;
use std::path::Path;
use tracing::{info, warn};

use crate::core::error::BuildError;
use crate::utils::command::{run, CommandRunner, SystemCommand};

/// Host distributions the build is known to work on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Distribution {
    Rocky,
    AlmaLinux,
    CentOS,
    Fedora,
    Rhel,
    Debian,
    Kali,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackageManager {
    Dnf,
    Yum,
    Apt,
}

impl Distribution {
    /// Maps an os-release `ID` to a supported distribution.
    pub fn from_id(id: &str) -> Option<Self> {
        match id.to_ascii_lowercase().as_str() {
            "rocky" => Some(Self::Rocky),
            "almalinux" => Some(Self::AlmaLinux),
            "centos" => Some(Self::CentOS),
            "fedora" => Some(Self::Fedora),
            "rhel" => Some(Self::Rhel),
            "debian" => Some(Self::Debian),
            "kali" => Some(Self::Kali),
            _ => None,
        }
    }

    /// Reads the `ID=` field from os-release content. `ID_LIKE` is ignored.
    pub fn from_os_release(content: &str) -> Result<Self> {
        let id = content
            .lines()
            .filter_map(|line| line.trim().strip_prefix("ID="))
            .map(|value| value.trim().trim_matches('"').trim_matches('\''))
            .next()
            .ok_or_else(|| BuildError::environment("os-release has no ID field"))?;

        Self::from_id(id).ok_or_else(|| {
            BuildError::environment(format!("This OS is not supported: {}", id)).into()
        })
    }

    pub fn package_manager(self) -> PackageManager {
        match self {
            Self::Rocky | Self::AlmaLinux | Self::Fedora | Self::Rhel => PackageManager::Dnf,
            Self::CentOS => PackageManager::Yum,
            Self::Debian | Self::Kali => PackageManager::Apt,
        }
    }
}

impl fmt::Display for Distribution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Rocky => "Rocky Linux",
            Self::AlmaLinux => "AlmaLinux",
            Self::CentOS => "CentOS",
            Self::Fedora => "Fedora",
            Self::Rhel => "Red Hat Enterprise Linux",
            Self::Debian => "Debian",
            Self::Kali => "Kali",
        };
        f.write_str(name)
    }
}

impl PackageManager {
    /// Package providing `tool` in this family, if known.
    ///
    /// dnf hosts (EL 9 and later) no longer ship genisoimage; `mkisofs` there
    /// comes from xorriso.
    pub fn package_for(self, tool: &str) -> Option<&'static str> {
        let rpm = !matches!(self, Self::Apt);
        let package = match tool {
            "mount" | "umount" if rpm => "util-linux",
            "mount" | "umount" => "mount",
            "rsync" => "rsync",
            "mkisofs" if self == Self::Dnf => "xorriso",
            "mkisofs" | "genisoimage" => "genisoimage",
            "xorrisofs" => "xorriso",
            "isohybrid" if rpm => "syslinux",
            "isohybrid" => "syslinux-utils",
            "implantisomd5" => "isomd5sum",
            _ => return None,
        };
        Some(package)
    }

    pub fn install_command(self, packages: &[&str]) -> SystemCommand {
        let program = match self {
            Self::Dnf => "dnf",
            Self::Yum => "yum",
            Self::Apt => "apt-get",
        };
        SystemCommand::new(program).args(["install", "-y"]).args(packages)
    }
}

/// Tools the pipeline shells out to, mastering tool included.
pub fn required_tools(mastering_tool: &str) -> Vec<&str> {
    vec!["mount", "umount", "rsync", mastering_tool, "isohybrid", "implantisomd5"]
}

pub fn command_exists(cmd: &str) -> bool {
    which::which(cmd).is_ok()
}

#[cfg(unix)]
pub fn ensure_root() -> Result<()> {
    if nix::unistd::geteuid().is_root() {
        Ok(())
    } else {
        Err(BuildError::environment("This program must be run as root.").into())
    }
}

#[cfg(not(unix))]
pub fn ensure_root() -> Result<()> {
    Err(BuildError::environment("Kickstart ISO builds are only supported on Linux.").into())
}

pub fn detect_distribution(os_release: &Path) -> Result<Distribution> {
    let content = std::fs::read_to_string(os_release).map_err(|e| {
        BuildError::environment(format!("Cannot read {}: {}", os_release.display(), e))
    })?;
    let distro = Distribution::from_os_release(&content)?;
    info!("Current Linux Distro: {}", distro);
    Ok(distro)
}

pub fn find_missing_tools<'t>(tools: &[&'t str], exists: impl Fn(&str) -> bool) -> Vec<&'t str> {
    tools.iter().copied().filter(|tool| !exists(tool)).collect()
}

/// Installs missing tools once; anything still missing afterwards is fatal.
pub fn ensure_tools(
    runner: &dyn CommandRunner,
    distro: Distribution,
    tools: &[&str],
    exists: impl Fn(&str) -> bool,
) -> Result<()> {
    let missing = find_missing_tools(tools, &exists);
    if missing.is_empty() {
        return Ok(());
    }

    warn!("Required commands not found: {}", missing.join(", "));

    let manager = distro.package_manager();
    let mut packages: Vec<&str> = Vec::new();
    for tool in &missing {
        let package = manager.package_for(tool).ok_or_else(|| {
            BuildError::environment(format!("Required command not found: {}", tool))
        })?;
        if !packages.contains(&package) {
            packages.push(package);
        }
    }

    run(
        runner,
        &manager.install_command(&packages),
        &format!("Installed {}", packages.join(", ")),
    )?;

    let still_missing = find_missing_tools(tools, &exists);
    if !still_missing.is_empty() {
        return Err(BuildError::environment(format!(
            "Required commands not found after install: {}",
            still_missing.join(", ")
        ))
        .into());
    }

    Ok(())
}
