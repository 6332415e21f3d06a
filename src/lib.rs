//! Builds unattended-install ("kickstart") installer ISOs from vendor media.
//!
//! The source image is copied out of a loop mount, the answer file is added
//! and the isolinux/GRUB menus are patched to boot it; the tree is then
//! remastered into a hybrid image with an embedded checksum.
//!
//! Only one build may run per working directory: the scratch directories and
//! the output path are not guarded against concurrent builds.

pub mod cli;
pub mod config;
pub mod core;
pub mod iso;
pub mod utils;
