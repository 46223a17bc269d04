//! Global settings of a clang-build run.

use std::path::PathBuf;

use crate::core::build_type::BuildType;
use crate::core::platform::Platform;

/// Default folder, relative to the working directory, all build output goes to.
pub const DEFAULT_BUILD_DIRECTORY: &str = "build";

/// Settings shared by every project and target of a run.
#[derive(Debug, Clone)]
pub struct Environment {
    pub build_type: BuildType,
    pub force_build: bool,
    pub build_directory: PathBuf,
    /// Write `<build>/dependencies.dot`
    pub create_dependency_dotfile: bool,
    /// Clone git submodules of external sources
    pub clone_recursive: bool,
    pub bundle: bool,
    pub redistributable: bool,
    pub platform: Platform,
}

impl Default for Environment {
    fn default() -> Self {
        Environment {
            build_type: BuildType::Default,
            force_build: false,
            build_directory: PathBuf::from(DEFAULT_BUILD_DIRECTORY),
            create_dependency_dotfile: true,
            clone_recursive: true,
            bundle: false,
            redistributable: false,
            platform: Platform::host(),
        }
    }
}

impl Environment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn build_type(mut self, build_type: BuildType) -> Self {
        self.build_type = build_type;
        self
    }

    pub fn force_build(mut self, force: bool) -> Self {
        self.force_build = force;
        self
    }

    pub fn build_directory(mut self, directory: impl Into<PathBuf>) -> Self {
        self.build_directory = directory.into();
        self
    }

    pub fn dependency_dotfile(mut self, create: bool) -> Self {
        self.create_dependency_dotfile = create;
        self
    }

    pub fn clone_recursive(mut self, recursive: bool) -> Self {
        self.clone_recursive = recursive;
        self
    }

    pub fn bundle(mut self, bundle: bool) -> Self {
        self.bundle = bundle;
        self
    }

    /// A redistributable build always bundles.
    pub fn redistributable(mut self, redistributable: bool) -> Self {
        self.redistributable = redistributable;
        if redistributable {
            self.bundle = true;
        }
        self
    }

    pub fn platform(mut self, platform: Platform) -> Self {
        self.platform = platform;
        self
    }

    /// Report the active settings.
    pub fn log_settings(&self) {
        tracing::info!("Build type: {}", self.build_type.name());
        if self.force_build {
            tracing::info!("Forcing rebuild...");
        }
        if self.bundle {
            tracing::info!("Bundling of binary dependencies is activated");
        }
        if self.redistributable {
            tracing::info!("Redistributable bundling of binary dependencies is activated");
        }
    }
}
