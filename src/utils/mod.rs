pub mod checksum;
pub mod command;
pub mod fs;

pub use checksum::ChecksumVerifier;
pub use command::{run, CommandRunner, SystemCommand, SystemRunner};
pub use fs::Workspace;
