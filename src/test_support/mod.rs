//! Test utilities for clang-build unit tests.
//!
//! Provides helpers to lay out projects on disk and a [`FakeToolchain`]
//! that builds with shell one-liners instead of LLVM, so targets can be
//! configured, compiled and linked in tests.
//!
//! # Example
//!
//! ```rust,ignore
//! use clang_build::test_support::{write_file, FakeToolchain};
//!
//! #[test]
//! fn test_example() {
//!     let tmp = tempfile::TempDir::new().unwrap();
//!     write_file(tmp.path(), "src/main.cpp", "int main() {}");
//!     let toolchain = FakeToolchain::default();
//!     // Configure and build targets with it...
//! }
//! ```

pub mod fixtures;

use std::path::Path;

use crate::builder::toolchain::{
    ArchiveInput, CommandSpec, CompileInput, DependencyInput, LinkInput, Toolchain,
};
use crate::core::build_type::BuildType;
use crate::core::platform::Platform;

pub use fixtures::*;

/// Write `contents` to `root/relative`, creating parent folders.
pub fn write_file(root: &Path, relative: &str, contents: &str) {
    let path = root.join(relative);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(path, contents).unwrap();
}

/// A toolchain whose commands only create their outputs.
///
/// Sources whose name contains `broken` fail to compile. Links write their
/// inputs into the output, one per line, and archives append them the way
/// `llvm-ar rc` does. All commands run through `sh`, so building with it
/// only works on unix.
#[derive(Debug, Clone)]
pub struct FakeToolchain {
    pub platform: Platform,
}

impl Default for FakeToolchain {
    fn default() -> Self {
        FakeToolchain {
            platform: Platform::Linux,
        }
    }
}

fn script(body: &str) -> CommandSpec {
    CommandSpec::new("sh").arg("-c").arg(body)
}

fn path(p: &Path) -> String {
    p.display().to_string()
}

fn is_broken(source: &Path) -> bool {
    source
        .file_name()
        .is_some_and(|name| name.to_string_lossy().contains("broken"))
}

impl Toolchain for FakeToolchain {
    fn platform(&self) -> Platform {
        self.platform
    }

    fn default_compile_flags(&self, build_type: BuildType) -> Vec<String> {
        let flags: &[&str] = match build_type {
            BuildType::Default => &["-Wall"],
            BuildType::Release => &["-O3"],
            BuildType::RelWithDebInfo => &["-O3", "-g"],
            BuildType::Debug => &["-g"],
            BuildType::Coverage => &["-g", "--coverage"],
        };
        flags.iter().map(|f| f.to_string()).collect()
    }

    fn default_link_flags(&self, build_type: BuildType) -> Vec<String> {
        match build_type {
            BuildType::Coverage => vec!["--coverage".to_string()],
            _ => Vec::new(),
        }
    }

    fn max_cpp_standard(&self) -> &str {
        "-std=c++17"
    }

    // $0 is the source, $1 the depfile and $2 the precompiled module
    fn dependency_command(&self, input: &DependencyInput) -> CommandSpec {
        let body = if input.module_file.is_some() {
            r#"printf 'dep: %s\n' "$0" > "$1" && touch "$2""#
        } else {
            r#"printf 'dep: %s\n' "$0" > "$1""#
        };
        script(body)
            .arg(path(&input.source))
            .arg(path(&input.depfile))
            .args(input.module_file.iter().map(|m| path(m)))
            .args(input.flags.iter().cloned())
    }

    // $0 is the object, $1 the source
    fn compile_command(&self, input: &CompileInput) -> CommandSpec {
        let body = if is_broken(&input.source) {
            r#"echo "$1: error: does not compile" >&2; exit 1"#
        } else {
            r#"touch "$0""#
        };
        script(body)
            .arg(path(&input.output))
            .arg(path(&input.source))
            .args(input.flags.iter().cloned())
            .args(
                input
                    .include_dirs
                    .iter()
                    .flat_map(|d| ["-I".to_string(), path(d)]),
            )
    }

    fn link_command(&self, input: &LinkInput) -> CommandSpec {
        script(r#"printf '%s\n' "$@" > "$0""#)
            .arg(path(&input.output))
            .args(input.objects.iter().map(|o| path(o)))
            .args(input.flags.iter().cloned())
            .args(input.lib_dirs.iter().map(|d| format!("-L{}", d.display())))
            .args(input.libs.iter().map(|l| format!("-l{}", l)))
    }

    fn archive_command(&self, input: &ArchiveInput) -> CommandSpec {
        script(r#"printf '%s\n' "$@" >> "$0""#)
            .arg(path(&input.output))
            .args(input.objects.iter().map(|o| path(o)))
    }
}
