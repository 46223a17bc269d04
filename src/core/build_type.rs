//! Build types.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// The flavour of a build. Selects default flags and the build folder name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BuildType {
    #[default]
    Default,
    Release,
    RelWithDebInfo,
    Debug,
    Coverage,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown build type '{value}' (expected one of: default, release, relwithdebinfo, debug, coverage)")]
pub struct ParseBuildTypeError {
    value: String,
}

impl BuildType {
    pub const ALL: [BuildType; 5] = [
        BuildType::Default,
        BuildType::Release,
        BuildType::RelWithDebInfo,
        BuildType::Debug,
        BuildType::Coverage,
    ];

    /// Lowercase value, used for folder names and `compile_<type>` keys.
    pub fn as_str(&self) -> &'static str {
        match self {
            BuildType::Default => "default",
            BuildType::Release => "release",
            BuildType::RelWithDebInfo => "relwithdebinfo",
            BuildType::Debug => "debug",
            BuildType::Coverage => "coverage",
        }
    }

    /// Human-readable name.
    pub fn name(&self) -> &'static str {
        match self {
            BuildType::Default => "Default",
            BuildType::Release => "Release",
            BuildType::RelWithDebInfo => "RelWithDebInfo",
            BuildType::Debug => "Debug",
            BuildType::Coverage => "Coverage",
        }
    }
}

impl fmt::Display for BuildType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BuildType {
    type Err = ParseBuildTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.to_lowercase();
        BuildType::ALL
            .into_iter()
            .find(|bt| bt.as_str() == lower)
            .ok_or(ParseBuildTypeError {
                value: s.to_string(),
            })
    }
}
