//! The LLVM toolchain: clang, clang++ and llvm-ar.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use regex::Regex;

use crate::core::build_type::BuildType;
use crate::core::platform::Platform;
use crate::util::config::ToolchainConfig;
use crate::util::process::{find_executable, ProcessBuilder};

use super::{ArchiveInput, CommandSpec, CompileInput, DependencyInput, LinkInput, Toolchain};

const DEFAULT_FLAGS: &[&str] = &["-Wall", "-Wextra", "-Wpedantic", "-Wshadow", "-Werror"];
const RELEASE_FLAGS: &[&str] = &["-O3", "-DNDEBUG"];
const RELWITHDEBINFO_FLAGS: &[&str] = &["-O3", "-g3", "-DNDEBUG"];
const DEBUG_FLAGS: &[&str] = &[
    "-Og",
    "-g3",
    "-DDEBUG",
    "-fno-optimize-sibling-calls",
    "-fno-omit-frame-pointer",
    "-fsanitize=address",
    "-fsanitize=undefined",
];
const SANITIZER_LINK_FLAGS: &[&str] = &["-fsanitize=address", "-fsanitize=undefined"];
const COVERAGE_FLAGS: &[&str] = &["--coverage", "-fno-inline"];

/// clang/clang++ and llvm-ar, found on `PATH` or set in a toolchain file.
#[derive(Debug, Clone)]
pub struct LlvmToolchain {
    pub c_compiler: PathBuf,
    pub cpp_compiler: PathBuf,
    pub archiver: PathBuf,
    pub max_cpp_standard: String,
    pub platform: Platform,
    /// Appended to the default compile flags
    pub extra_compile_flags: Vec<String>,
    /// Appended to the default link flags
    pub extra_link_flags: Vec<String>,
}

impl LlvmToolchain {
    /// Locate the tools and probe the compiler.
    pub fn detect(config: &ToolchainConfig) -> Result<Self> {
        let settings = &config.toolchain;

        let c_compiler = find_tool(settings.c_compiler.as_deref(), "clang")?;
        let cpp_compiler = find_tool(settings.cpp_compiler.as_deref(), "clang++")?;
        let archiver = find_tool(settings.archiver.as_deref(), "llvm-ar")?;

        let max_cpp_standard = match &settings.max_cpp_standard {
            Some(standard) => standard.clone(),
            None => probe_max_cpp_standard(&cpp_compiler)?,
        };

        let platform = Platform::host();
        tracing::info!("Platform: {}", platform);
        if let Some(root) = cpp_compiler.parent() {
            tracing::info!("llvm root directory: {}", root.display());
        }
        tracing::info!("clang executable:    {}", c_compiler.display());
        tracing::info!("clang++ executable:  {}", cpp_compiler.display());
        tracing::info!("llvm-ar executable:  {}", archiver.display());
        tracing::info!("Newest supported C++ dialect: {}", max_cpp_standard);

        Ok(LlvmToolchain {
            c_compiler,
            cpp_compiler,
            archiver,
            max_cpp_standard,
            platform,
            extra_compile_flags: settings.compile_flags.clone(),
            extra_link_flags: settings.link_flags.clone(),
        })
    }

    fn compiler(&self, is_c: bool) -> &Path {
        if is_c {
            &self.c_compiler
        } else {
            &self.cpp_compiler
        }
    }
}

fn find_tool(configured: Option<&Path>, name: &str) -> Result<PathBuf> {
    let wanted = configured.map(|p| p.to_string_lossy().into_owned());
    let wanted = wanted.as_deref().unwrap_or(name);
    match find_executable(wanted) {
        Some(path) => Ok(path),
        None => bail!("Couldn't find {} executable", wanted),
    }
}

/// Ask clang++ for the standards it knows by passing an invalid one.
fn probe_max_cpp_standard(cpp_compiler: &Path) -> Result<String> {
    let report = ProcessBuilder::new(cpp_compiler)
        .args(["-std=dummy", "-x", "c++", "-E", "-"])
        .exec_with_report()?;

    parse_max_cpp_standard(&report.output)
        .context("Could not find a supported C++ standard.")
}

/// Pick the newest `c++NN` standard from clang's list of valid values.
///
/// Draft and GNU dialects are skipped. Returns the `-std=` flag.
pub fn parse_max_cpp_standard(report: &str) -> Option<String> {
    let pattern = Regex::new(r"'(c\+\+..)'").ok()?;
    report
        .lines()
        .rev()
        .filter(|line| !line.contains("draft") && !line.contains("gnu"))
        .find_map(|line| pattern.captures(line))
        .map(|captures| format!("-std={}", &captures[1]))
}

fn strings(flags: &[&str]) -> Vec<String> {
    flags.iter().map(|f| f.to_string()).collect()
}

fn include_args(include_dirs: &[PathBuf]) -> Vec<String> {
    include_dirs
        .iter()
        .flat_map(|dir| ["-I".to_string(), dir.display().to_string()])
        .collect()
}

fn module_args(module_dirs: &[PathBuf]) -> Vec<String> {
    module_dirs
        .iter()
        .map(|dir| format!("-fprebuilt-module-path={}", dir.display()))
        .collect()
}

impl Toolchain for LlvmToolchain {
    fn platform(&self) -> Platform {
        self.platform
    }

    fn default_compile_flags(&self, build_type: BuildType) -> Vec<String> {
        let mut flags = match build_type {
            BuildType::Default => strings(DEFAULT_FLAGS),
            BuildType::Release => strings(RELEASE_FLAGS),
            BuildType::RelWithDebInfo => strings(RELWITHDEBINFO_FLAGS),
            BuildType::Debug => strings(DEBUG_FLAGS),
            BuildType::Coverage => strings(&[DEBUG_FLAGS, COVERAGE_FLAGS].concat()),
        };
        flags.extend(self.extra_compile_flags.iter().cloned());
        flags
    }

    fn default_link_flags(&self, build_type: BuildType) -> Vec<String> {
        let mut flags = match build_type {
            BuildType::Debug => strings(SANITIZER_LINK_FLAGS),
            BuildType::Coverage => strings(&[SANITIZER_LINK_FLAGS, COVERAGE_FLAGS].concat()),
            _ => Vec::new(),
        };
        flags.extend(self.extra_link_flags.iter().cloned());
        flags
    }

    fn max_cpp_standard(&self) -> &str {
        &self.max_cpp_standard
    }

    fn dependency_command(&self, input: &DependencyInput) -> CommandSpec {
        let mut cmd = CommandSpec::new(self.compiler(input.is_c));

        cmd = match &input.module_file {
            Some(module_file) => cmd
                .arg("-o")
                .arg(module_file.display().to_string())
                .arg("-MF")
                .arg(input.depfile.display().to_string())
                .arg("-c")
                .arg(input.source.display().to_string())
                .args(["--precompile", "--write-user-dependencies"]),
            // -MM only preprocesses and writes the depfile
            None => cmd
                .arg("-MM")
                .arg("-MF")
                .arg(input.depfile.display().to_string())
                .arg(input.source.display().to_string()),
        };

        cmd.args(input.flags.iter().cloned())
            .args(include_args(&input.include_dirs))
            .args(module_args(&input.module_dirs))
    }

    fn compile_command(&self, input: &CompileInput) -> CommandSpec {
        let cmd = CommandSpec::new(self.compiler(input.is_c))
            .arg("-o")
            .arg(input.output.display().to_string())
            .arg("-c")
            .arg(input.source.display().to_string())
            .args(input.flags.iter().cloned())
            .args(include_args(&input.include_dirs));

        if input.is_module {
            cmd
        } else {
            cmd.args(module_args(&input.module_dirs))
        }
    }

    fn link_command(&self, input: &LinkInput) -> CommandSpec {
        let mut cmd = CommandSpec::new(self.compiler(input.is_c));
        if input.shared {
            cmd = cmd.arg("-shared");
        }

        cmd.arg("-o")
            .arg(input.output.display().to_string())
            .args(input.objects.iter().map(|o| o.display().to_string()))
            .args(input.flags.iter().cloned())
            .args(input.lib_dirs.iter().map(|d| format!("-L{}", d.display())))
            .args(input.libs.iter().map(|l| format!("-l{}", l)))
    }

    fn archive_command(&self, input: &ArchiveInput) -> CommandSpec {
        CommandSpec::new(&self.archiver)
            .arg("rc")
            .arg(input.output.display().to_string())
            .args(input.objects.iter().map(|o| o.display().to_string()))
    }
}
