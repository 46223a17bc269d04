//! High-level operations.
//!
//! This module contains the implementation of the clang-build command.

pub mod clang_build;

pub use clang_build::{build, build_with_toolchain, Artifact, BuildOptions, BuildResult};
