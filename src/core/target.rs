//! Target descriptions.
//!
//! A [`TargetDescription`] is what the project file says about a target,
//! placed in the project tree. It is turned into a configured
//! [`crate::builder::Target`] once its dependencies are configured.

use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::{bail, Result};

use crate::core::build_type::BuildType;
use crate::core::discovery::{discover_files, TargetFiles};
use crate::core::manifest::TargetConfig;
use crate::core::platform::Platform;
use crate::sources::git;

/// What a target produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TargetKind {
    Executable,
    SharedLibrary,
    StaticLibrary,
    HeaderOnly,
    Module,
}

impl TargetKind {
    pub const ALL: [TargetKind; 5] = [
        TargetKind::Executable,
        TargetKind::Module,
        TargetKind::SharedLibrary,
        TargetKind::StaticLibrary,
        TargetKind::HeaderOnly,
    ];

    /// Spelling used for `target_type` in project files.
    pub fn as_str(&self) -> &'static str {
        match self {
            TargetKind::Executable => "executable",
            TargetKind::SharedLibrary => "shared library",
            TargetKind::StaticLibrary => "static library",
            TargetKind::HeaderOnly => "header only",
            TargetKind::Module => "module",
        }
    }

    /// Case-insensitive lookup of a `target_type` value.
    pub fn from_target_type(value: &str) -> Option<TargetKind> {
        let lower = value.to_lowercase();
        TargetKind::ALL.into_iter().find(|kind| kind.as_str() == lower)
    }

    /// Decide the kind of a target from its configuration and discovered sources.
    ///
    /// Without an explicit `target_type` a target with sources is an
    /// executable and one without is header-only.
    pub fn resolve(target_type: Option<&str>, has_sources: bool) -> Result<TargetKind> {
        match target_type {
            Some(value) => match TargetKind::from_target_type(value) {
                Some(kind) => Ok(kind),
                None => bail!("Unsupported target type: \"{}\"", value.to_lowercase()),
            },
            None if has_sources => Ok(TargetKind::Executable),
            None => Ok(TargetKind::HeaderOnly),
        }
    }

    /// Whether sources are compiled into objects for this kind.
    pub fn is_compiled(&self) -> bool {
        !matches!(self, TargetKind::HeaderOnly)
    }
}

impl fmt::Display for TargetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TargetKind::Executable => "Executable",
            TargetKind::SharedLibrary => "SharedLibrary",
            TargetKind::StaticLibrary => "StaticLibrary",
            TargetKind::HeaderOnly => "HeaderOnly",
            TargetKind::Module => "Module",
        };
        f.write_str(name)
    }
}

/// The location of a target's owning project, as far as the target cares.
#[derive(Debug, Clone, Copy)]
pub struct ProjectLocation<'a> {
    pub identifier: &'a str,
    pub directory: &'a Path,
    pub build_directory: &'a Path,
}

/// An unconfigured target.
#[derive(Debug, Clone)]
pub struct TargetDescription {
    pub name: String,
    /// `<project identifier>.<name>`
    pub identifier: String,
    /// Index of the owning project in the project tree
    pub project: usize,
    pub config: TargetConfig,
    /// Folder the target's sources are searched in
    pub root_directory: PathBuf,
    /// Folder all of the target's build output goes to
    pub build_directory: PathBuf,
    /// Where the target's own external sources are checked out, if it has a `url`
    pub download_directory: Option<PathBuf>,
}

impl TargetDescription {
    /// Describe a target of a project.
    ///
    /// `only_target` is set when the target is the single target of a project
    /// without subprojects, which flattens its build folder.
    pub fn new(
        name: &str,
        mut config: TargetConfig,
        project: ProjectLocation<'_>,
        project_index: usize,
        only_target: bool,
        build_type: BuildType,
    ) -> Result<Self> {
        if name.contains('.') {
            bail!(
                "[[{}]]: Name contains illegal character '.': {}",
                project.identifier,
                name
            );
        }

        let name = if name.is_empty() {
            if config.output_name.is_none() {
                config.output_name = Some("main".to_string());
            }
            "target".to_string()
        } else {
            name.to_string()
        };

        let build_directory = if only_target {
            project.build_directory.join(build_type.as_str())
        } else {
            project.build_directory.join(&name).join(build_type.as_str())
        };

        // Not flattened, so it cannot clash with the project's own checkout
        let download_directory = config
            .url
            .as_ref()
            .map(|_| project.build_directory.join(&name).join("external_sources"));

        let base = download_directory.as_deref().unwrap_or(project.directory);
        let root_directory = match &config.directory {
            Some(relative) => base.join(relative),
            None => base.to_path_buf(),
        };

        Ok(TargetDescription {
            identifier: format!("{}.{}", project.identifier, name),
            name,
            project: project_index,
            config,
            root_directory,
            build_directory,
            download_directory,
        })
    }

    /// Name of the produced binary, without prefix and suffix.
    pub fn output_name(&self) -> &str {
        self.config.output_name.as_deref().unwrap_or(&self.name)
    }

    /// Check out the target's external sources, if it has any.
    pub fn download_sources(&self, clone_recursive: bool) -> Result<()> {
        if let (Some(url), Some(directory)) = (&self.config.url, &self.download_directory) {
            tracing::info!("{}: fetching external sources from {}", self, url);
            git::download_sources(url, directory, self.config.version.as_deref(), clone_recursive)?;
        }
        Ok(())
    }

    /// Find the target's sources and headers on disk.
    pub fn discover_files(&self, platform: Platform) -> Result<TargetFiles> {
        discover_files(&self.name, platform, &self.config, &self.root_directory)
    }

    /// Decide the target kind for the given discovered files.
    pub fn resolve_kind(&self, files: &TargetFiles) -> Result<TargetKind> {
        let kind = TargetKind::resolve(self.config.target_type.as_deref(), !files.sources.is_empty())
            .map_err(|e| anyhow::anyhow!("{}: {}", self, e))?;

        if self.config.target_type.is_none() {
            match kind {
                TargetKind::HeaderOnly => {
                    tracing::info!("{}: no source files found. Creating header-only target.", self)
                }
                _ => tracing::info!("{}: source files found. Creating executable target.", self),
            }
        } else if kind == TargetKind::HeaderOnly && !files.sources.is_empty() {
            tracing::info!(
                "{}: {} source file(s) found for header-only target. You may want to check your build configuration.",
                self,
                files.sources.len()
            );
        }

        Ok(kind)
    }
}

impl fmt::Display for TargetDescription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.identifier)
    }
}
