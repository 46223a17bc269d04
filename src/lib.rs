//! clang-build - a build system for C and C++ projects driving LLVM
//!
//! This crate provides the library functionality behind the `clang-build`
//! binary: project tree loading, source discovery, flag composition and
//! build execution.

pub mod builder;
pub mod core;
pub mod ops;
pub mod sources;
pub mod util;

/// Test utilities for clang-build unit tests.
///
/// This module is only available when running tests. It provides a fake
/// toolchain and helpers to lay out projects on disk.
#[cfg(test)]
pub mod test_support;

pub use builder::{BuildError, Target, Toolchain};
pub use core::{BuildType, Environment, Manifest, ProjectTree, TargetKind};
pub use ops::{build, BuildOptions};
