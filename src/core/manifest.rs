//! clang-build.toml parsing and schema.
//!
//! Top-level keys describe the project itself (`name`, `url`, `version`,
//! `directory`, `subprojects`); every other table is a target named after
//! its key.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::core::build_type::BuildType;
use crate::core::platform::Platform;

/// Canonical project file name.
pub const MANIFEST_NAME: &str = "clang-build.toml";

/// Scripted project file of the Python implementation. Not supported.
pub const SCRIPT_MANIFEST_NAME: &str = "clang-build.py";

/// A parsed clang-build.toml.
#[derive(Debug, Clone, Default)]
pub struct Manifest {
    pub name: Option<String>,
    /// Git repository holding the project's sources
    pub url: Option<String>,
    pub version: Option<String>,
    /// Sub-folder of the checkout that holds the sources
    pub directory: Option<PathBuf>,
    /// `None` when the key is absent, which matters for naming rules
    pub subprojects: Option<Vec<PathBuf>>,
    /// Targets, sorted by name
    pub targets: Vec<(String, TargetConfig)>,
}

/// Configuration of a single target.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TargetConfig {
    pub target_type: Option<String>,
    pub output_name: Option<String>,
    pub output_prefix: Option<String>,
    pub output_suffix: Option<String>,
    pub directory: Option<PathBuf>,
    pub url: Option<String>,
    pub version: Option<String>,
    pub dependencies: Vec<String>,
    pub public_dependencies: Vec<String>,

    #[serde(flatten)]
    pub options: TargetOptions,

    pub linux: TargetOptions,
    pub osx: TargetOptions,
    pub windows: TargetOptions,
}

/// Options that may appear globally or inside a platform section.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct TargetOptions {
    pub include_directories: Vec<PathBuf>,
    pub public_include_directories: Vec<PathBuf>,
    pub headers_exclude: Vec<String>,
    pub sources: Vec<String>,
    pub sources_exclude: Vec<String>,
    pub flags: FlagsConfig,
    pub interface_flags: FlagsConfig,
    pub public_flags: FlagsConfig,
}

/// A `flags`, `interface_flags` or `public_flags` table.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct FlagsConfig {
    pub compile: Vec<String>,
    pub link: Vec<String>,
    pub compile_release: Vec<String>,
    pub compile_relwithdebinfo: Vec<String>,
    pub compile_debug: Vec<String>,
    pub compile_coverage: Vec<String>,
}

impl Manifest {
    /// Load a manifest from a file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read project file: {}", path.display()))?;

        Self::parse(&contents)
            .with_context(|| format!("failed to parse project file: {}", path.display()))
    }

    /// Parse manifest contents.
    pub fn parse(contents: &str) -> Result<Self> {
        let table: toml::Table = toml::from_str(contents)?;
        Self::from_table(table)
    }

    /// Configuration used for a folder without a project file.
    pub fn default_project() -> Self {
        Manifest {
            targets: vec![(
                "target".to_string(),
                TargetConfig {
                    output_name: Some("main".to_string()),
                    ..Default::default()
                },
            )],
            ..Default::default()
        }
    }

    fn from_table(mut table: toml::Table) -> Result<Self> {
        let mut manifest = Manifest {
            name: take_string(&mut table, "name")?,
            url: take_string(&mut table, "url")?,
            version: take_string(&mut table, "version")?,
            directory: take_string(&mut table, "directory")?.map(PathBuf::from),
            ..Default::default()
        };

        if let Some(value) = table.remove("subprojects") {
            let subprojects: Vec<PathBuf> = value
                .try_into()
                .context("`subprojects` must be an array of directories")?;
            manifest.subprojects = Some(subprojects);
        }

        for (key, value) in table {
            if !value.is_table() {
                tracing::debug!("Ignoring non-table key `{}` in project file", key);
                continue;
            }
            let config: TargetConfig = value
                .try_into()
                .with_context(|| format!("invalid configuration for target `{}`", key))?;
            manifest.targets.push((key, config));
        }

        Ok(manifest)
    }
}

fn take_string(table: &mut toml::Table, key: &str) -> Result<Option<String>> {
    match table.remove(key) {
        None => Ok(None),
        Some(toml::Value::String(s)) => Ok(Some(s)),
        // Names such as `name = 2` are accepted and stringified
        Some(toml::Value::Integer(i)) => Ok(Some(i.to_string())),
        Some(other) => anyhow::bail!("`{}` must be a string, found {}", key, other.type_str()),
    }
}

impl TargetConfig {
    /// Options for the given platform only.
    pub fn platform_options(&self, platform: Platform) -> &TargetOptions {
        match platform {
            Platform::Linux => &self.linux,
            Platform::Osx => &self.osx,
            Platform::Windows => &self.windows,
        }
    }

    /// Global options extended by the platform section.
    pub fn options_for(&self, platform: Platform) -> TargetOptions {
        self.options.merged(self.platform_options(platform))
    }
}

impl TargetOptions {
    /// Concatenate two option sets, `self` first.
    pub fn merged(&self, other: &TargetOptions) -> TargetOptions {
        fn cat<T: Clone>(a: &[T], b: &[T]) -> Vec<T> {
            a.iter().chain(b).cloned().collect()
        }

        TargetOptions {
            include_directories: cat(&self.include_directories, &other.include_directories),
            public_include_directories: cat(
                &self.public_include_directories,
                &other.public_include_directories,
            ),
            headers_exclude: cat(&self.headers_exclude, &other.headers_exclude),
            sources: cat(&self.sources, &other.sources),
            sources_exclude: cat(&self.sources_exclude, &other.sources_exclude),
            flags: self.flags.merged(&other.flags),
            interface_flags: self.interface_flags.merged(&other.interface_flags),
            public_flags: self.public_flags.merged(&other.public_flags),
        }
    }
}

impl FlagsConfig {
    /// Compile flags that only apply to the given build type.
    pub fn compile_for(&self, build_type: BuildType) -> &[String] {
        match build_type {
            BuildType::Default => &[],
            BuildType::Release => &self.compile_release,
            BuildType::RelWithDebInfo => &self.compile_relwithdebinfo,
            BuildType::Debug => &self.compile_debug,
            BuildType::Coverage => &self.compile_coverage,
        }
    }

    fn merged(&self, other: &FlagsConfig) -> FlagsConfig {
        let cat = |a: &[String], b: &[String]| a.iter().chain(b).cloned().collect::<Vec<_>>();
        FlagsConfig {
            compile: cat(&self.compile, &other.compile),
            link: cat(&self.link, &other.link),
            compile_release: cat(&self.compile_release, &other.compile_release),
            compile_relwithdebinfo: cat(&self.compile_relwithdebinfo, &other.compile_relwithdebinfo),
            compile_debug: cat(&self.compile_debug, &other.compile_debug),
            compile_coverage: cat(&self.compile_coverage, &other.compile_coverage),
        }
    }
}
