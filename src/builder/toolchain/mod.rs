//! Toolchain abstraction.
//!
//! A toolchain turns compile, link and archive requests into commands.
//! It does not run them; targets do, so failures end up in their reports.

use std::path::PathBuf;

use crate::core::build_type::BuildType;
use crate::core::platform::{Platform, PlatformDefaults};
use crate::util::process::ProcessBuilder;

mod llvm;

pub use llvm::{parse_max_cpp_standard, LlvmToolchain};

/// A command to execute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: PathBuf,
    pub args: Vec<String>,
}

impl CommandSpec {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        CommandSpec {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args(mut self, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.args.extend(args.into_iter().map(|a| a.into()));
        self
    }

    /// A runnable process for this command.
    pub fn to_process(&self) -> ProcessBuilder {
        ProcessBuilder::new(&self.program).args(&self.args)
    }

    /// The command line as a single string, as written to compile_commands.json.
    pub fn display(&self) -> String {
        self.to_process().display_command()
    }
}

/// Input for dependency file generation and module precompilation.
#[derive(Debug, Clone)]
pub struct DependencyInput {
    pub source: PathBuf,
    pub depfile: PathBuf,
    /// Output `.pcm` for C++ module sources
    pub module_file: Option<PathBuf>,
    pub include_dirs: Vec<PathBuf>,
    pub module_dirs: Vec<PathBuf>,
    pub flags: Vec<String>,
    pub is_c: bool,
}

/// Input for a compile step.
#[derive(Debug, Clone)]
pub struct CompileInput {
    /// Source file, or the precompiled module for module sources
    pub source: PathBuf,
    pub output: PathBuf,
    pub include_dirs: Vec<PathBuf>,
    /// Ignored for module sources, which are already precompiled
    pub module_dirs: Vec<PathBuf>,
    pub flags: Vec<String>,
    pub is_c: bool,
    pub is_module: bool,
}

/// Input for a link step.
#[derive(Debug, Clone)]
pub struct LinkInput {
    pub objects: Vec<PathBuf>,
    pub output: PathBuf,
    pub flags: Vec<String>,
    pub lib_dirs: Vec<PathBuf>,
    /// Libraries to link, without `-l`
    pub libs: Vec<String>,
    pub shared: bool,
    pub is_c: bool,
}

/// Input for an archive step (creating a static library).
#[derive(Debug, Clone)]
pub struct ArchiveInput {
    pub objects: Vec<PathBuf>,
    pub output: PathBuf,
}

/// Trait for toolchain implementations.
pub trait Toolchain: Send + Sync {
    /// The platform binaries are produced for.
    fn platform(&self) -> Platform;

    fn platform_defaults(&self) -> &'static PlatformDefaults {
        self.platform().defaults()
    }

    /// Compile flags every compiled target starts with.
    fn default_compile_flags(&self, build_type: BuildType) -> Vec<String>;

    /// Link flags every linked target starts with.
    fn default_link_flags(&self, build_type: BuildType) -> Vec<String>;

    /// Language flag selecting the newest supported C++ standard, e.g. `-std=c++20`.
    fn max_cpp_standard(&self) -> &str;

    fn dependency_command(&self, input: &DependencyInput) -> CommandSpec;

    fn compile_command(&self, input: &CompileInput) -> CommandSpec;

    fn link_command(&self, input: &LinkInput) -> CommandSpec;

    fn archive_command(&self, input: &ArchiveInput) -> CommandSpec;
}
