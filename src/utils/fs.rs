use anyhow::Result;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::core::error::BuildError;

/// Removes `path` if it exists, then recreates it empty.
pub fn reset_directory(path: &Path) -> Result<()> {
    remove_directory(path)?;

    info!("Creating {} directory", path.display());
    std::fs::create_dir_all(path).map_err(|e| BuildError::resource(path, e))?;

    Ok(())
}

/// Removes `path` recursively. A missing path is not an error.
pub fn remove_directory(path: &Path) -> Result<()> {
    if path.exists() {
        info!("Removing existing {} directory", path.display());
        std::fs::remove_dir_all(path).map_err(|e| BuildError::resource(path, e))?;
    } else {
        debug!("Nothing to remove at {}", path.display());
    }

    Ok(())
}

/// The two scratch directories a build works in.
pub struct Workspace {
    mount_dir: PathBuf,
    extract_dir: PathBuf,
}

impl Workspace {
    pub fn new(mount_dir: PathBuf, extract_dir: PathBuf) -> Self {
        Self {
            mount_dir,
            extract_dir,
        }
    }

    pub fn mount_dir(&self) -> &Path {
        &self.mount_dir
    }

    pub fn extract_dir(&self) -> &Path {
        &self.extract_dir
    }

    pub fn reset(&self) -> Result<()> {
        reset_directory(&self.mount_dir)?;
        reset_directory(&self.extract_dir)
    }

    /// Removes both directories, attempting the second even if the first fails.
    pub fn teardown(&self) -> Result<()> {
        let mount = remove_directory(&self.mount_dir);
        let extract = remove_directory(&self.extract_dir);
        mount.and(extract)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn is_empty_dir(path: &Path) -> bool {
        path.is_dir() && std::fs::read_dir(path).unwrap().next().is_none()
    }

    #[test]
    fn test_reset_directory_is_idempotent() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("extract");

        reset_directory(&dir).unwrap();
        assert!(is_empty_dir(&dir));

        reset_directory(&dir).unwrap();
        assert!(is_empty_dir(&dir));
    }

    #[test]
    fn test_reset_directory_clears_contents() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("extract");
        std::fs::create_dir_all(dir.join("isolinux")).unwrap();
        std::fs::write(dir.join("isolinux/isolinux.cfg"), "stale").unwrap();

        reset_directory(&dir).unwrap();
        assert!(is_empty_dir(&dir));
    }

    #[test]
    fn test_remove_directory_missing_is_noop() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("never-created");

        remove_directory(&dir).unwrap();
        remove_directory(&dir).unwrap();
        assert!(!dir.exists());
    }

    #[test]
    fn test_workspace_lifecycle() {
        let tmp = TempDir::new().unwrap();
        let workspace = Workspace::new(tmp.path().join("mount"), tmp.path().join("extract"));

        workspace.reset().unwrap();
        assert!(is_empty_dir(workspace.mount_dir()));
        assert!(is_empty_dir(workspace.extract_dir()));

        std::fs::write(workspace.extract_dir().join("ks.cfg"), "text").unwrap();
        workspace.teardown().unwrap();
        assert!(!workspace.mount_dir().exists());
        assert!(!workspace.extract_dir().exists());

        workspace.teardown().unwrap();
    }
}
