//! Toolchain configuration files.
//!
//! A toolchain file overrides the LLVM tools clang-build would otherwise
//! look up on `PATH`. It is read from, in order of precedence:
//! - the file passed with `--toolchain`
//! - the global file `~/.clang-build/toolchain.toml`

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Toolchain configuration for compiler overrides.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolchainConfig {
    pub toolchain: ToolchainSettings,
}

/// Toolchain settings for C/C++ compilation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolchainSettings {
    /// Path to the C compiler (e.g., /usr/bin/clang)
    pub c_compiler: Option<PathBuf>,

    /// Path to the C++ compiler (e.g., /usr/bin/clang++)
    pub cpp_compiler: Option<PathBuf>,

    /// Path to the archiver (e.g., /usr/bin/llvm-ar)
    pub archiver: Option<PathBuf>,

    /// Language flag to use instead of probing the compiler, e.g. `-std=c++17`
    pub max_cpp_standard: Option<String>,

    /// Extra flags appended to every compile command
    pub compile_flags: Vec<String>,

    /// Extra flags appended to every link command
    pub link_flags: Vec<String>,
}

impl ToolchainConfig {
    /// Load toolchain configuration from a file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read toolchain config: {}", path.display()))?;

        toml::from_str(&contents)
            .with_context(|| format!("failed to parse toolchain config: {}", path.display()))
    }

    /// Load toolchain configuration with fallback to defaults if file doesn't exist.
    pub fn load_or_default(path: &Path) -> Self {
        if path.exists() {
            Self::load(path).unwrap_or_else(|e| {
                tracing::warn!(
                    "Failed to load toolchain config from {}: {:#}",
                    path.display(),
                    e
                );
                Self::default()
            })
        } else {
            Self::default()
        }
    }

    /// Merge another config into this one (other takes precedence).
    pub fn merge(&mut self, other: ToolchainConfig) {
        let tc = other.toolchain;
        if tc.c_compiler.is_some() {
            self.toolchain.c_compiler = tc.c_compiler;
        }
        if tc.cpp_compiler.is_some() {
            self.toolchain.cpp_compiler = tc.cpp_compiler;
        }
        if tc.archiver.is_some() {
            self.toolchain.archiver = tc.archiver;
        }
        if tc.max_cpp_standard.is_some() {
            self.toolchain.max_cpp_standard = tc.max_cpp_standard;
        }
        if !tc.compile_flags.is_empty() {
            self.toolchain.compile_flags = tc.compile_flags;
        }
        if !tc.link_flags.is_empty() {
            self.toolchain.link_flags = tc.link_flags;
        }
    }
}

/// Resolve the toolchain configuration for a run.
///
/// An explicitly requested file must exist and parse; the global file is
/// optional and only produces a warning when broken.
pub fn load_toolchain_config(explicit: Option<&Path>) -> Result<ToolchainConfig> {
    let mut config = ToolchainConfig::default();

    if let Some(global) = global_toolchain_config_path() {
        config.merge(ToolchainConfig::load_or_default(&global));
    }

    if let Some(path) = explicit {
        config.merge(ToolchainConfig::load(path)?);
    }

    Ok(config)
}

/// Get the global clang-build config directory (~/.clang-build).
pub fn global_config_dir() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|b| b.home_dir().join(".clang-build"))
}

/// Get the global toolchain config path (~/.clang-build/toolchain.toml).
pub fn global_toolchain_config_path() -> Option<PathBuf> {
    global_config_dir().map(|dir| dir.join("toolchain.toml"))
}
