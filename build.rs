//! Build script that snapshots the build environment into source form.
//!
//! The `info` module exposes name, version, compiler and platform
//! details at runtime, but those values only exist while the build is
//! running. This script writes them out as plain constants to
//! `src/gen/build.rs` and delegates to the `built` crate for the
//! dependency and feature listing that lands in `src/gen/_build.rs`.
//! Both files are checked in and regenerated on every build.

use std::{env, fmt::Display, fs::File, io::Write, path::Path, process::Command};

use built::{write_built_file_with_opts, Options};
use chrono::Utc;
use regex::Regex;

const GEN_DIR: &str = "./src/gen";

fn main() {
    // the docs.rs sandbox mounts the checkout read only, the
    // checked in snapshots are used there as they are
    if env::var("DOCS_RS").is_ok() {
        return;
    }

    let dest_path = Path::new(GEN_DIR).join("build.rs");
    let mut file = File::create(&dest_path)
        .unwrap_or_else(|_| panic!("Can't create '{}'", dest_path.display()));

    writeln!(
        file,
        "//! Build environment constants, name and version of the crate,\n//! compiler, platform and feature information.\n"
    )
    .unwrap();
    writeln!(file, "// @generated\n").unwrap();

    let now = Utc::now();
    let string_constants = [
        ("COMPILATION_DATE", now.format("%b %d %Y").to_string()),
        ("COMPILATION_TIME", now.format("%H:%M:%S").to_string()),
        ("NAME", cargo_env("CARGO_PKG_NAME")),
        ("VERSION", cargo_env("CARGO_PKG_VERSION")),
        ("COMPILER", String::from("rustc")),
        ("COMPILER_VERSION", compiler_version()),
        ("HOST", cargo_env("HOST")),
        ("TARGET", cargo_env("TARGET")),
        ("PROFILE", cargo_env("PROFILE")),
        ("OPT_LEVEL", cargo_env("OPT_LEVEL")),
    ];
    for (key, value) in string_constants {
        write_constant(&mut file, key, "&str", format!("{:?}", value));
    }

    let mut features = vec!["dmg"];
    if cfg!(feature = "debug") {
        features.push("debug");
    }
    if cfg!(feature = "silent") {
        features.push("silent");
    }
    if cfg!(feature = "cpulog") {
        features.push("cpulog");
    }
    write_constant(
        &mut file,
        "FEATURES_SEQ",
        format!("[&str; {}]", features.len()),
        format!("{:?}", features),
    );

    let cpu_bits = usize::BITS as usize;
    write_constant(
        &mut file,
        "PLATFORM_CPU_BITS",
        "&str",
        format!("{:?}", cpu_bits.to_string()),
    );
    write_constant(&mut file, "PLATFORM_CPU_BITS_INT", "usize", cpu_bits);

    // the dependency and feature tables are handled by `built`,
    // with the noisy sections (cfg, CI, environment) disabled
    let mut options = Options::default();
    options.set_cfg(false);
    options.set_ci(false);
    options.set_compiler(false);
    options.set_env(false);
    options.set_dependencies(true);
    options.set_features(true);

    let manifest_dir = env::var("CARGO_MANIFEST_DIR").unwrap();
    let built_path = Path::new(GEN_DIR).join("_build.rs");
    write_built_file_with_opts(&options, manifest_dir.as_ref(), &built_path).unwrap();
}

/// Reads one of the cargo provided environment variables, build
/// scripts receive these at run time rather than at compile time.
fn cargo_env(key: &str) -> String {
    env::var(key).unwrap_or_else(|_| String::from("UNKNOWN"))
}

/// Obtains the version of the compiler in use by parsing the
/// output of `rustc --version`.
fn compiler_version() -> String {
    let output = Command::new("rustc")
        .arg("--version")
        .output()
        .ok()
        .and_then(|output| String::from_utf8(output.stdout).ok())
        .unwrap_or_default();
    Regex::new(r"rustc (\d+\.\d+\.\d+)")
        .unwrap()
        .captures(&output)
        .and_then(|captures| captures.get(1))
        .map(|version| String::from(version.as_str()))
        .unwrap_or_else(|| String::from("UNKNOWN"))
}

fn write_constant(file: &mut File, key: &str, type_name: impl Display, value: impl Display) {
    writeln!(file, "pub const {}: {} = {};", key, type_name, value)
        .unwrap_or_else(|_| panic!("Failed to write constant '{}'", key));
}
