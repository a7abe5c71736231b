//! Mocked build constants, used when the generated files are not
//! available (eg: read only file systems like the docs.rs one).

pub const COMPILATION_DATE: &str = "-";
pub const COMPILATION_TIME: &str = "-";
pub const NAME: &str = "dotmatrix";
pub const VERSION: &str = "x.x.x";
pub const COMPILER: &str = "rustc";
pub const COMPILER_VERSION: &str = "x.x.x";
pub const HOST: &str = "-";
pub const TARGET: &str = "-";
pub const PROFILE: &str = "-";
pub const OPT_LEVEL: &str = "-";
pub const FEATURES_SEQ: [&str; 1] = ["dmg"];
pub const PLATFORM_CPU_BITS: &str = "64";
pub const PLATFORM_CPU_BITS_INT: usize = 64;

pub static FEATURES: [&str; 1] = ["DEFAULT"];
pub static FEATURES_STR: &str = "DEFAULT";
pub static DEPENDENCIES: [(&str, &str); 1] = [("dotmatrix-common", "x.x.x")];
pub static DEPENDENCIES_STR: &str = "dotmatrix-common x.x.x";
