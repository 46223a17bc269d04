//! The build command

use std::path::PathBuf;

use anyhow::Result;

use crate::cli::Cli;
use clang_build::core::environment::Environment;
use clang_build::ops::clang_build::{build, BuildOptions};

pub fn execute(cli: Cli) -> Result<()> {
    let env = Environment::new()
        .build_type(cli.build_type)
        .force_build(cli.force_build)
        .dependency_dotfile(!cli.no_graph)
        .clone_recursive(!cli.no_recursive_clone)
        .bundle(cli.bundle)
        .redistributable(cli.redistributable);

    let opts = BuildOptions {
        all: cli.all,
        targets: cli.targets,
        jobs: cli.jobs as usize,
        progress: cli.progress,
        toolchain: cli.toolchain,
    };

    let directory = cli.directory.unwrap_or_else(|| PathBuf::from("."));
    let result = build(&directory, &env, &opts)?;

    for artifact in &result.artifacts {
        tracing::info!("[{}]: {}", artifact.identifier, artifact.path.display());
    }
    Ok(())
}
