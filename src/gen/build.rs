//! Build environment constants, name and version of the crate,
//! compiler, platform and feature information.

// @generated

pub const COMPILATION_DATE: &str = "Aug 01 2026";
pub const COMPILATION_TIME: &str = "09:32:36";
pub const NAME: &str = "dotmatrix";
pub const VERSION: &str = "0.3.2";
pub const COMPILER: &str = "rustc";
pub const COMPILER_VERSION: &str = "1.95.0";
pub const HOST: &str = "x86_64-unknown-linux-gnu";
pub const TARGET: &str = "x86_64-unknown-linux-gnu";
pub const PROFILE: &str = "debug";
pub const OPT_LEVEL: &str = "0";
pub const FEATURES_SEQ: [&str; 1] = ["dmg"];
pub const PLATFORM_CPU_BITS: &str = "64";
pub const PLATFORM_CPU_BITS_INT: usize = 64;
