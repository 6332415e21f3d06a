pub mod builder;
pub mod error;
pub mod preflight;

pub use builder::Builder;
pub use error::BuildError;
