//! Core data structures for clang-build.
//!
//! This module contains the types describing what is to be built:
//! - Project files and their schema
//! - The project tree with targets and dependencies
//! - Source discovery, build types and platform conventions

pub mod build_type;
pub mod discovery;
pub mod environment;
pub mod manifest;
pub mod platform;
pub mod project;
pub mod target;

pub use build_type::BuildType;
pub use environment::Environment;
pub use manifest::{Manifest, TargetConfig, MANIFEST_NAME};
pub use platform::Platform;
pub use project::{EdgeKind, ProjectTree};
pub use target::{TargetDescription, TargetKind};
