//! Host platform and its output conventions.

use std::fmt;

use crate::core::target::TargetKind;

/// Platforms clang-build knows output conventions for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Platform {
    Linux,
    Osx,
    Windows,
}

/// Naming and placement of one kind of binary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputLayout {
    pub prefix: &'static str,
    pub suffix: &'static str,
    /// Folder below the target build directory
    pub output_dir: &'static str,
    /// Extra compile flags for every source of this kind
    pub extra_flags: &'static [&'static str],
}

/// Per-platform defaults for all kinds of output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlatformDefaults {
    pub executable: OutputLayout,
    pub shared_library: OutputLayout,
    pub static_library: OutputLayout,
    pub module: OutputLayout,
    /// Linker flags that let an executable find shared libraries next to itself
    pub bundling_linker_flags: &'static [&'static str],
}

const WINDOWS_EXTRA_FLAGS: &[&str] = &["-Xclang", "-flto-visibility-public-std"];

const LINUX: PlatformDefaults = PlatformDefaults {
    executable: OutputLayout {
        prefix: "",
        suffix: "",
        output_dir: "bin",
        extra_flags: &[],
    },
    shared_library: OutputLayout {
        prefix: "lib",
        suffix: ".so",
        output_dir: "lib",
        extra_flags: &["-fpic"],
    },
    static_library: OutputLayout {
        prefix: "lib",
        suffix: ".a",
        output_dir: "lib",
        extra_flags: &[],
    },
    module: OutputLayout {
        prefix: "lib",
        suffix: "",
        output_dir: "mod",
        extra_flags: &[],
    },
    bundling_linker_flags: &["-Wl,-rpath,$ORIGIN"],
};

const OSX: PlatformDefaults = PlatformDefaults {
    executable: OutputLayout {
        prefix: "",
        suffix: "",
        output_dir: "bin",
        extra_flags: &[],
    },
    shared_library: OutputLayout {
        prefix: "lib",
        suffix: ".dylib",
        output_dir: "lib",
        extra_flags: &[],
    },
    static_library: OutputLayout {
        prefix: "lib",
        suffix: ".a",
        output_dir: "lib",
        extra_flags: &[],
    },
    module: OutputLayout {
        prefix: "lib",
        suffix: "",
        output_dir: "mod",
        extra_flags: &[],
    },
    bundling_linker_flags: &["-Wl,-rpath,@executable_path"],
};

const WINDOWS: PlatformDefaults = PlatformDefaults {
    executable: OutputLayout {
        prefix: "",
        suffix: ".exe",
        output_dir: "bin",
        extra_flags: WINDOWS_EXTRA_FLAGS,
    },
    shared_library: OutputLayout {
        prefix: "",
        suffix: ".dll",
        output_dir: "bin",
        extra_flags: WINDOWS_EXTRA_FLAGS,
    },
    static_library: OutputLayout {
        prefix: "",
        suffix: ".lib",
        output_dir: "lib",
        extra_flags: WINDOWS_EXTRA_FLAGS,
    },
    module: OutputLayout {
        prefix: "",
        suffix: ".pcm",
        output_dir: "mod",
        extra_flags: &[],
    },
    bundling_linker_flags: &[],
};

impl Platform {
    /// The platform clang-build was compiled for. Unknown unixes behave like Linux.
    pub fn host() -> Platform {
        if cfg!(target_os = "windows") {
            Platform::Windows
        } else if cfg!(target_os = "macos") {
            Platform::Osx
        } else {
            Platform::Linux
        }
    }

    /// Name of the platform section in project files.
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Linux => "linux",
            Platform::Osx => "osx",
            Platform::Windows => "windows",
        }
    }

    pub fn defaults(&self) -> &'static PlatformDefaults {
        match self {
            Platform::Linux => &LINUX,
            Platform::Osx => &OSX,
            Platform::Windows => &WINDOWS,
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl PlatformDefaults {
    /// Output layout for a compiled target kind. Header-only targets produce no binary.
    pub fn layout(&self, kind: TargetKind) -> Option<&OutputLayout> {
        match kind {
            TargetKind::Executable => Some(&self.executable),
            TargetKind::SharedLibrary => Some(&self.shared_library),
            TargetKind::StaticLibrary => Some(&self.static_library),
            TargetKind::Module => Some(&self.module),
            TargetKind::HeaderOnly => None,
        }
    }
}
