//! Compile and link flag composition along the dependency graph.

use crate::core::build_type::BuildType;
use crate::core::manifest::{FlagsConfig, TargetConfig};
use crate::core::platform::Platform;
use crate::util::fs::unique;

/// A compile and a link flag list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlagSet {
    pub compile: Vec<String>,
    pub link: Vec<String>,
}

impl FlagSet {
    fn extend(&mut self, other: &FlagSet) {
        self.compile.extend(other.compile.iter().cloned());
        self.link.extend(other.link.iter().cloned());
    }

    fn extend_from_config(&mut self, config: &FlagsConfig, build_type: BuildType) {
        self.compile.extend(config.compile.iter().cloned());
        self.compile.extend(config.compile_for(build_type).iter().cloned());
        self.link.extend(config.link.iter().cloned());
    }
}

/// Flags of a single target.
///
/// Private flags apply to the target itself. Interface flags apply only to
/// dependents, public flags to both.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildFlags {
    pub build_type: BuildType,
    /// `-std=...` for C++ targets, empty for C and header-only targets
    pub language_flags: Vec<String>,
    pub default: FlagSet,
    pub private: FlagSet,
    pub interface: FlagSet,
    pub public: FlagSet,
}

impl BuildFlags {
    pub fn new(build_type: BuildType) -> Self {
        BuildFlags {
            build_type,
            ..Default::default()
        }
    }

    pub fn language_flag(&mut self, flag: &str) {
        self.language_flags = vec![flag.to_string()];
    }

    pub fn set_default_compile_flags(&mut self, flags: Vec<String>) {
        self.default.compile = flags;
    }

    pub fn set_default_link_flags(&mut self, flags: Vec<String>) {
        self.default.link = flags;
    }

    /// Add the target's own `flags`, `interface_flags` and `public_flags`,
    /// global options first, then the platform section.
    pub fn add_target_flags(&mut self, platform: Platform, config: &TargetConfig) {
        for options in [&config.options, config.platform_options(platform)] {
            self.private.extend_from_config(&options.flags, self.build_type);
            self.interface
                .extend_from_config(&options.interface_flags, self.build_type);
            self.public
                .extend_from_config(&options.public_flags, self.build_type);
        }
    }

    /// Used by header-only targets, whose flags only matter to dependents.
    pub fn make_private_flags_public(&mut self) {
        let private = std::mem::take(&mut self.private);
        self.public.extend(&private);
    }

    /// Apply a dependency's public flags to this target.
    pub fn apply_public_flags(&mut self, dependency: &BuildFlags) {
        self.private.extend(&dependency.public);
    }

    /// Pass a dependency's public flags on to this target's dependents.
    pub fn forward_public_flags(&mut self, dependency: &BuildFlags) {
        self.public.extend(&dependency.public);
    }

    pub fn apply_interface_flags(&mut self, dependency: &BuildFlags) {
        self.private.extend(&dependency.interface);
    }

    pub fn forward_interface_flags(&mut self, dependency: &BuildFlags) {
        self.interface.extend(&dependency.interface);
    }

    /// Flags that let an executable find shared libraries next to itself.
    pub fn add_bundling_flags(&mut self, flags: &[&str]) {
        self.private.link.extend(flags.iter().map(|f| f.to_string()));
    }

    pub fn final_compile_flags_list(&self) -> Vec<String> {
        let mut flags = self.language_flags.clone();
        flags.extend(self.default.compile.iter().cloned());
        flags.extend(unique(
            self.private.compile.iter().chain(&self.public.compile).cloned(),
        ));
        flags
    }

    pub fn final_link_flags_list(&self) -> Vec<String> {
        let mut flags = self.default.link.clone();
        flags.extend(unique(
            self.private.link.iter().chain(&self.public.link).cloned(),
        ));
        flags
    }
}
