use std::path::PathBuf;
use std::process::ExitStatus;
use thiserror::Error;

/// Failure categories of a kickstart build.
#[derive(Debug, Error)]
pub enum BuildError {
    /// Host is not fit to run the build (privilege, OS, inputs, tools).
    #[error("{0}")]
    Environment(String),

    #[error("Filesystem operation failed on {path}: {source}")]
    Resource {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Command failed: {command} ({status})")]
    Command { command: String, status: ExitStatus },

    #[error("No volume label found in {0}")]
    Label(PathBuf),
}

impl BuildError {
    pub fn environment(message: impl Into<String>) -> Self {
        Self::Environment(message.into())
    }

    pub fn resource(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Resource {
            path: path.into(),
            source,
        }
    }
}
