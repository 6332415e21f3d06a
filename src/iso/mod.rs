pub mod boot;
pub mod extractor;
pub mod packager;

pub use boot::BootConfigPatcher;
pub use extractor::IsoExtractor;
pub use packager::IsoPackager;
