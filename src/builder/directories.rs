//! Include and module directories of a target.

use std::path::{Path, PathBuf};

use crate::util::fs::{normalize_path, unique};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Directories {
    pub include_private: Vec<PathBuf>,
    pub include_public: Vec<PathBuf>,
    pub module_private: Vec<PathBuf>,
    pub module_public: Vec<PathBuf>,
}

impl Directories {
    pub fn new(include_private: &[PathBuf], include_public: &[PathBuf]) -> Self {
        Directories {
            include_private: canonical(include_private),
            include_public: canonical(include_public),
            ..Default::default()
        }
    }

    /// Take over the public directories of a dependency.
    ///
    /// `output_folder` is where a compiled dependency puts its binaries and
    /// precompiled modules.
    pub fn add_dependency(
        &mut self,
        dependency: &Directories,
        output_folder: Option<&Path>,
        public: bool,
    ) {
        let modules: Vec<PathBuf> = dependency
            .module_public
            .iter()
            .cloned()
            .chain(output_folder.map(Path::to_path_buf))
            .collect();

        self.include_private
            .extend(canonical(&dependency.include_public));
        self.module_private.extend(canonical(&modules));

        if public {
            self.include_public
                .extend(canonical(&dependency.include_public));
            self.module_public.extend(canonical(&modules));
        }

        self.include_private = unique(std::mem::take(&mut self.include_private));
        self.include_public = unique(std::mem::take(&mut self.include_public));
        self.module_private = unique(std::mem::take(&mut self.module_private));
        self.module_public = unique(std::mem::take(&mut self.module_public));
    }

    /// Used by header-only targets.
    pub fn make_private_directories_public(&mut self) {
        let include = std::mem::take(&mut self.include_private);
        let modules = std::mem::take(&mut self.module_private);
        self.include_public = unique(include.into_iter().chain(self.include_public.drain(..)));
        self.module_public = unique(modules.into_iter().chain(self.module_public.drain(..)));
    }

    pub fn final_include_directories(&self) -> Vec<PathBuf> {
        unique(self.include_private.iter().chain(&self.include_public).cloned())
    }

    pub fn final_module_directories(&self) -> Vec<PathBuf> {
        unique(self.module_private.iter().chain(&self.module_public).cloned())
    }
}

fn canonical(paths: &[PathBuf]) -> Vec<PathBuf> {
    unique(paths.iter().map(|p| normalize_path(p)))
}
