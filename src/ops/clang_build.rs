//! Implementation of a clang-build run.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::builder::compile_db::{CompileDatabase, COMPILE_COMMANDS_FILE};
use crate::builder::errors::{BuildError, Reports};
use crate::builder::progress::CategoryProgress;
use crate::builder::target::Target;
use crate::builder::toolchain::{LlvmToolchain, Toolchain};
use crate::core::discovery::TargetFiles;
use crate::core::environment::Environment;
use crate::core::project::{EdgeKind, ProjectTree};
use crate::core::target::TargetKind;
use crate::util::config::load_toolchain_config;

/// Options for a build.
#[derive(Debug, Clone)]
pub struct BuildOptions {
    /// Build every target of the project tree
    pub all: bool,

    /// Specific targets to build (empty = the root project's targets)
    pub targets: Vec<String>,

    /// Number of parallel compile jobs
    pub jobs: usize,

    /// Show a progress bar
    pub progress: bool,

    /// Toolchain file overriding the detected LLVM tools
    pub toolchain: Option<PathBuf>,
}

impl Default for BuildOptions {
    fn default() -> Self {
        BuildOptions {
            all: false,
            targets: Vec::new(),
            jobs: 1,
            progress: false,
            toolchain: None,
        }
    }
}

/// A binary produced by the build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub identifier: String,
    pub kind: TargetKind,
    pub path: PathBuf,
}

#[derive(Debug, Default)]
pub struct BuildResult {
    /// Targets in build order
    pub targets: Vec<String>,
    pub artifacts: Vec<Artifact>,
    /// Bundled files per target identifier, when bundling
    pub bundles: BTreeMap<String, Vec<PathBuf>>,
}

/// Build the project in `directory` with the LLVM toolchain.
pub fn build(directory: &Path, env: &Environment, opts: &BuildOptions) -> Result<BuildResult> {
    let config = load_toolchain_config(opts.toolchain.as_deref())?;
    let toolchain = LlvmToolchain::detect(&config)?;
    build_with_toolchain(directory, env, opts, &toolchain)
}

/// Build the project in `directory` with the given toolchain.
pub fn build_with_toolchain(
    directory: &Path,
    env: &Environment,
    opts: &BuildOptions,
    toolchain: &dyn Toolchain,
) -> Result<BuildResult> {
    let directory = absolute(directory)?;
    let env = env
        .clone()
        .build_directory(absolute(&env.build_directory)?)
        .platform(toolchain.platform());
    env.log_settings();

    let mut progress = CategoryProgress::for_build(env.bundle, env.redistributable, opts.progress);

    let tree = ProjectTree::load(&directory, &env)?;
    let order = tree.select_targets(opts.all, &opts.targets)?;

    if order.is_empty() {
        tracing::info!("No targets to be built");
        return Ok(BuildResult::default());
    }

    let projects: BTreeSet<usize> = order.iter().map(|&t| tree.target(t).project).collect();
    for project in projects {
        tree.project(project).download_sources(env.clone_recursive)?;
    }

    // Sources have to be known before kinds can be checked against each other
    let mut discovered: HashMap<usize, (TargetFiles, TargetKind)> = HashMap::new();
    for &index in &order {
        let description = tree.target(index);
        progress.describe(&description.identifier);
        description.download_sources(env.clone_recursive)?;
        let files = description.discover_files(env.platform)?;
        let kind = description.resolve_kind(&files)?;
        discovered.insert(index, (files, kind));
    }
    tree.check_linkable_dependencies(&order, |index| discovered.get(&index).map(|(_, k)| *k))?;

    tracing::info!(
        "Building {}",
        order
            .iter()
            .map(|&t| tree.target(t).to_string())
            .collect::<Vec<_>>()
            .join(", ")
    );

    let mut configured: Vec<Option<Target>> = (0..tree.targets().len()).map(|_| None).collect();
    for &index in &order {
        let Some((files, kind)) = discovered.remove(&index) else {
            continue;
        };
        let target = {
            let dependencies = configured_dependencies(&tree, &configured, index);
            Target::configure(tree.target(index), files, kind, &dependencies, &env, toolchain)?
        };
        configured[index] = Some(target);
    }
    let targets: Vec<&Target> = order
        .iter()
        .filter_map(|&index| configured[index].as_ref())
        .collect();
    progress.next_category();

    compile(&targets, &env, opts, &progress)?;
    progress.next_category();

    let mut errors = Reports::new();
    for (&index, target) in order.iter().zip(&targets) {
        progress.describe(&target.identifier);
        let dependencies: Vec<&Target> = configured_dependencies(&tree, &configured, index)
            .into_iter()
            .map(|(dependency, _)| dependency)
            .collect();
        if let Some(report) = target.link(&dependencies, toolchain)? {
            errors.insert(target.identifier.clone(), vec![report]);
        }
    }
    if !errors.is_empty() {
        return Err(BuildError::Link(errors).into());
    }
    progress.next_category();

    let mut result = BuildResult {
        targets: targets.iter().map(|t| t.identifier.clone()).collect(),
        ..Default::default()
    };

    if env.bundle {
        tracing::info!("Generating bundles...");
        let mut bundles: HashMap<usize, Vec<PathBuf>> = HashMap::new();
        for (&index, target) in order.iter().zip(&targets) {
            progress.describe(&target.identifier);
            let dependency_bundles: Vec<PathBuf> = tree
                .dependencies(index)
                .iter()
                .filter_map(|(dependency, _)| bundles.get(dependency))
                .flatten()
                .cloned()
                .collect();
            match target.bundle(&dependency_bundles) {
                Ok(bundle) => {
                    bundles.insert(index, bundle);
                }
                Err(e) => {
                    errors.insert(target.identifier.clone(), vec![format!("{:#}", e)]);
                }
            }
        }
        if !errors.is_empty() {
            return Err(BuildError::Bundle(errors).into());
        }
        progress.next_category();

        if env.redistributable {
            tracing::info!("Generating redistributable bundles...");
            for (&index, target) in order.iter().zip(&targets) {
                progress.describe(&target.identifier);
                let bundle = bundles.get(&index).map(Vec::as_slice).unwrap_or(&[]);
                if let Err(e) = target.redistributable(bundle) {
                    errors.insert(target.identifier.clone(), vec![format!("{:#}", e)]);
                }
            }
            if !errors.is_empty() {
                return Err(BuildError::Redistributable(errors).into());
            }
            progress.next_category();
        }

        for (&index, target) in order.iter().zip(&targets) {
            if let Some(bundle) = bundles.remove(&index) {
                result.bundles.insert(target.identifier.clone(), bundle);
            }
        }
    }

    result.artifacts = targets
        .iter()
        .filter(|t| {
            matches!(
                t.kind,
                TargetKind::Executable | TargetKind::SharedLibrary | TargetKind::StaticLibrary
            )
        })
        .filter_map(|t| {
            t.outfile().map(|path| Artifact {
                identifier: t.identifier.clone(),
                kind: t.kind,
                path: path.to_path_buf(),
            })
        })
        .collect();

    Ok(result)
}

fn compile(
    targets: &[&Target],
    env: &Environment,
    opts: &BuildOptions,
    progress: &CategoryProgress,
) -> Result<()> {
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(opts.jobs.max(1))
        .build()
        .context("failed to create the compile thread pool")?;

    let database_path = env.build_directory.join(COMPILE_COMMANDS_FILE);
    let mut database = CompileDatabase::load(&database_path);
    let mut errors = Reports::new();

    for target in targets {
        progress.describe(&target.identifier);
        database.extend(target.compile_commands());
        let reports = pool.install(|| target.compile(env.force_build))?;
        if !reports.is_empty() {
            errors.insert(target.identifier.clone(), reports);
        }
    }

    if !database.is_empty() {
        database.save(&database_path)?;
    }

    if !errors.is_empty() {
        return Err(BuildError::Compile(errors).into());
    }
    Ok(())
}

fn configured_dependencies<'a>(
    tree: &ProjectTree,
    configured: &'a [Option<Target>],
    index: usize,
) -> Vec<(&'a Target, EdgeKind)> {
    tree.dependencies(index)
        .into_iter()
        .filter_map(|(dependency, edge)| configured[dependency].as_ref().map(|t| (t, edge)))
        .collect()
}

fn absolute(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        Ok(std::env::current_dir()
            .context("failed to determine the working directory")?
            .join(path))
    }
}
