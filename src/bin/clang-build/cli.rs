//! CLI definitions using clap.

use std::path::PathBuf;

use clap::{ArgAction, Parser};

use clang_build::core::build_type::BuildType;

/// clang-build - a build system for C and C++ projects driving LLVM
#[derive(Parser)]
#[command(name = "clang-build")]
#[command(author, version, about, long_about = None, disable_version_flag = true)]
pub struct Cli {
    /// Print version
    #[arg(long, action = ArgAction::Version)]
    pub version: Option<bool>,

    /// Activate verbose output
    #[arg(short = 'V', long)]
    pub verbose: bool,

    /// Activate progress bars
    #[arg(short, long)]
    pub progress: bool,

    /// Set the root source directory
    #[arg(short, long)]
    pub directory: Option<PathBuf>,

    /// Set the build type (default, release, relwithdebinfo, debug or coverage)
    #[arg(short, long, default_value = "default")]
    pub build_type: BuildType,

    /// Build every target in the project tree
    #[arg(short, long)]
    pub all: bool,

    /// Only these targets and their dependencies will be built
    #[arg(short, long, num_args = 1.., conflicts_with = "all")]
    pub targets: Vec<String>,

    /// Clean and rebuild all sources
    #[arg(short, long)]
    pub force_build: bool,

    /// Maximum number of compile jobs running in parallel
    #[arg(short, long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..))]
    pub jobs: u32,

    /// Activate debug logging on the console
    #[arg(long)]
    pub debug: bool,

    /// Do not write the dependency graph to the build folder
    #[arg(long)]
    pub no_graph: bool,

    /// Do not clone git submodules of external sources
    #[arg(long)]
    pub no_recursive_clone: bool,

    /// Copy shared library dependencies next to the binaries using them
    #[arg(long)]
    pub bundle: bool,

    /// Create redistributable folders (implies --bundle)
    #[arg(long)]
    pub redistributable: bool,

    /// Toolchain file overriding the detected LLVM tools
    #[arg(long, env = "CLANG_BUILD_TOOLCHAIN")]
    pub toolchain: Option<PathBuf>,
}
