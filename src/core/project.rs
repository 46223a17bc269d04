//! The project tree.
//!
//! Projects and targets are nodes of one directed graph. Projects point to
//! their subprojects, targets point to their dependencies. The graph is
//! built once from the project files and is read-only afterwards.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use petgraph::algo::tarjan_scc;
use petgraph::dot::{Config, Dot};
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::{Dfs, EdgeRef, Topo};

use crate::core::environment::Environment;
use crate::core::manifest::{Manifest, MANIFEST_NAME, SCRIPT_MANIFEST_NAME};
use crate::core::target::{ProjectLocation, TargetDescription, TargetKind};
use crate::sources::git;
use crate::util::fs::write_string;

/// Name of an unnamed top-level project.
pub const DEFAULT_PROJECT_NAME: &str = "project";

/// A node of the project tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Node {
    Project(usize),
    Target(usize),
}

/// Kind of an edge of the project tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeKind {
    Subproject,
    Private,
    Public,
}

impl fmt::Display for EdgeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EdgeKind::Subproject => "subproject",
            EdgeKind::Private => "private",
            EdgeKind::Public => "public",
        };
        f.write_str(name)
    }
}

/// A project: a folder with a project file or a default layout.
#[derive(Debug, Clone)]
pub struct Project {
    pub name: String,
    pub identifier: String,
    /// Folder the project's targets are searched in
    pub directory: PathBuf,
    /// Folder holding the project file
    pub config_directory: PathBuf,
    pub build_directory: PathBuf,
    pub parent: Option<usize>,
    pub url: Option<String>,
    pub version: Option<String>,
    pub subprojects: Vec<usize>,
    pub targets: Vec<usize>,
}

impl Project {
    /// Check out the project's external sources, if it has any.
    pub fn download_sources(&self, clone_recursive: bool) -> Result<()> {
        if let Some(url) = &self.url {
            tracing::info!("{}: fetching external sources from {}", self, url);
            git::download_sources(
                url,
                &self.build_directory.join("external_sources"),
                self.version.as_deref(),
                clone_recursive,
            )?;
        }
        Ok(())
    }
}

impl fmt::Display for Project {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[[{}]]", self.identifier)
    }
}

/// All projects and targets reachable from a root folder.
#[derive(Debug)]
pub struct ProjectTree {
    graph: DiGraph<Node, EdgeKind>,
    projects: Vec<Project>,
    targets: Vec<TargetDescription>,
    project_nodes: Vec<NodeIndex>,
    target_nodes: Vec<NodeIndex>,
    by_identifier: HashMap<String, usize>,
}

impl ProjectTree {
    /// Load the project in `directory` and all of its subprojects.
    ///
    /// Dependencies are resolved, the dependency graph is written when
    /// requested and checked for cycles.
    pub fn load(directory: &Path, env: &Environment) -> Result<Self> {
        let mut tree = ProjectTree {
            graph: DiGraph::new(),
            projects: Vec::new(),
            targets: Vec::new(),
            project_nodes: Vec::new(),
            target_nodes: Vec::new(),
            by_identifier: HashMap::new(),
        };

        tree.add_from_directory(directory, None, env)?;
        tree.resolve_dependencies()?;

        if env.create_dependency_dotfile {
            tree.write_dotfile(&env.build_directory.join("dependencies.dot"))?;
        }

        tree.check_for_circular_dependencies()?;
        Ok(tree)
    }

    pub fn root(&self) -> &Project {
        &self.projects[0]
    }

    pub fn projects(&self) -> &[Project] {
        &self.projects
    }

    pub fn project(&self, index: usize) -> &Project {
        &self.projects[index]
    }

    pub fn targets(&self) -> &[TargetDescription] {
        &self.targets
    }

    pub fn target(&self, index: usize) -> &TargetDescription {
        &self.targets[index]
    }

    /// Look up a target by its full identifier.
    pub fn find_target(&self, identifier: &str) -> Option<usize> {
        self.by_identifier.get(identifier).copied()
    }

    /// Direct dependencies of a target, public ones marked as such.
    /// Sorted by target index.
    pub fn dependencies(&self, target: usize) -> Vec<(usize, EdgeKind)> {
        let mut dependencies: Vec<_> = self
            .graph
            .edges(self.target_nodes[target])
            .filter_map(|edge| match self.graph[edge.target()] {
                Node::Target(dependency) => Some((dependency, *edge.weight())),
                Node::Project(_) => None,
            })
            .collect();
        dependencies.sort_by_key(|(index, _)| *index);
        dependencies
    }

    fn add_from_directory(
        &mut self,
        directory: &Path,
        parent: Option<usize>,
        env: &Environment,
    ) -> Result<usize> {
        let toml_file = directory.join(MANIFEST_NAME);
        let script_file = directory.join(SCRIPT_MANIFEST_NAME);
        let suffix = if parent.is_some() { " for subproject" } else { "" };

        let manifest = if toml_file.is_file() {
            tracing::info!("Found config file '{}'{}.", toml_file.display(), suffix);
            Manifest::load(&toml_file)?
        } else {
            if script_file.is_file() {
                tracing::warn!(
                    "Ignoring '{}': scripted project files are not supported",
                    script_file.display()
                );
            }
            match parent {
                Some(parent) => bail!(
                    "{}: the config defines a subproject in folder {}, which does not have a \
                     project file. It is not allowed to add a subproject that does not have a \
                     project file.",
                    self.projects[parent],
                    directory.display()
                ),
                None => Manifest::default_project(),
            }
        };

        self.add_project(manifest, directory, parent, env)
    }

    fn add_project(
        &mut self,
        manifest: Manifest,
        directory: &Path,
        parent: Option<usize>,
        env: &Environment,
    ) -> Result<usize> {
        if !directory.exists() {
            bail!("specified non-existent directory '{}'", directory.display());
        }

        let name = match manifest.name.clone().unwrap_or_default() {
            name if !name.is_empty() => name,
            _ => {
                if let Some(parent) = parent {
                    bail!(
                        "{}: the config defines a subproject in folder {}, that does not \
                         specify a name. It is not allowed to add a subproject that does not \
                         have a name.",
                        self.projects[parent],
                        directory.display()
                    );
                }
                if manifest.subprojects.is_some() {
                    bail!(
                        "[[{}]]: defining a top-level project with subprojects but without a \
                         name is illegal.",
                        DEFAULT_PROJECT_NAME
                    );
                }
                DEFAULT_PROJECT_NAME.to_string()
            }
        };

        if name.contains('.') {
            bail!("Name contains illegal character '.': {}", name);
        }

        let (identifier, build_directory) = match parent {
            Some(parent) => {
                let parent = &self.projects[parent];
                (
                    format!("{}.{}", parent.identifier, name),
                    parent.build_directory.join(&name),
                )
            }
            None => (name.clone(), env.build_directory.clone()),
        };

        let project_directory = match (&manifest.url, &manifest.directory) {
            (Some(_), Some(sub)) => build_directory.join("external_sources").join(sub),
            (Some(_), None) => build_directory.join("external_sources"),
            (None, _) => directory.to_path_buf(),
        };

        let index = self.projects.len();
        self.projects.push(Project {
            name,
            identifier,
            directory: project_directory,
            config_directory: directory.to_path_buf(),
            build_directory,
            parent,
            url: manifest.url.clone(),
            version: manifest.version.clone(),
            subprojects: Vec::new(),
            targets: Vec::new(),
        });
        let node = self.graph.add_node(Node::Project(index));
        self.project_nodes.push(node);

        if let Some(parent) = parent {
            self.projects[parent].subprojects.push(index);
            self.graph
                .add_edge(self.project_nodes[parent], node, EdgeKind::Subproject);
        }

        for subdirectory in manifest.subprojects.iter().flatten() {
            let subproject_dir = directory.join(subdirectory);
            self.add_from_directory(&subproject_dir, Some(index), env)?;
        }

        let only_target = manifest.targets.len() == 1
            && manifest.subprojects.as_ref().map_or(true, |s| s.is_empty());

        for (target_name, config) in manifest.targets {
            let project = &self.projects[index];
            let location = ProjectLocation {
                identifier: &project.identifier,
                directory: &project.directory,
                build_directory: &project.build_directory,
            };
            let description = TargetDescription::new(
                &target_name,
                config,
                location,
                index,
                only_target,
                env.build_type,
            )?;

            let target_index = self.targets.len();
            self.by_identifier
                .insert(description.identifier.clone(), target_index);
            self.targets.push(description);
            self.target_nodes
                .push(self.graph.add_node(Node::Target(target_index)));
            self.projects[index].targets.push(target_index);
        }

        Ok(index)
    }

    /// Add dependency edges. Names are relative to the declaring project.
    fn resolve_dependencies(&mut self) -> Result<()> {
        let mut edges = Vec::new();

        for (index, target) in self.targets.iter().enumerate() {
            let project = &self.projects[target.project];
            let lists = [
                (&target.config.dependencies, EdgeKind::Private),
                (&target.config.public_dependencies, EdgeKind::Public),
            ];
            for (names, kind) in lists {
                for name in names {
                    let full_name = format!("{}.{}", project.identifier, name);
                    let Some(&dependency) = self.by_identifier.get(&full_name) else {
                        bail!(
                            "{}: the dependency [{}] (expanded to [{}]) does not point to a valid target.",
                            target,
                            name,
                            full_name
                        );
                    };
                    edges.push((index, dependency, kind));
                }
            }
        }

        // Public wins when a dependency is listed twice
        for (from, to, kind) in edges {
            self.graph
                .update_edge(self.target_nodes[from], self.target_nodes[to], kind);
        }
        Ok(())
    }

    fn label(&self, node: NodeIndex) -> String {
        match self.graph[node] {
            Node::Project(index) => self.projects[index].to_string(),
            Node::Target(index) => self.targets[index].to_string(),
        }
    }

    /// Write the graph in Graphviz format. Public dependency edges are dashed.
    pub fn write_dotfile(&self, path: &Path) -> Result<()> {
        let labelled = self.graph.map(|index, _| self.label(index), |_, kind| *kind);
        let dot = Dot::with_attr_getters(
            &labelled,
            &[Config::EdgeNoLabel],
            &|_, edge| match edge.weight() {
                EdgeKind::Public => "style=dashed".to_string(),
                EdgeKind::Subproject => "style=dotted".to_string(),
                EdgeKind::Private => String::new(),
            },
            &|_, _| String::new(),
        );

        write_string(path, &format!("{}", dot))
            .with_context(|| format!("could not write dependency graph to {}", path.display()))?;
        tracing::debug!("Wrote dependency graph to {}", path.display());
        Ok(())
    }

    fn check_for_circular_dependencies(&self) -> Result<()> {
        let mut cycles = Vec::new();

        for component in tarjan_scc(&self.graph) {
            let cyclic = component.len() > 1
                || self.graph.contains_edge(component[0], component[0]);
            if !cyclic {
                continue;
            }

            for cycle in self.elementary_cycles(&component) {
                cycles.push(
                    cycle
                        .iter()
                        .map(|node| self.label(*node))
                        .collect::<Vec<_>>()
                        .join(" -> "),
                );
            }
        }

        if cycles.is_empty() {
            return Ok(());
        }

        cycles.sort();
        let listing = cycles
            .iter()
            .map(|cycle| format!("   - {}", cycle))
            .collect::<Vec<_>>()
            .join("\n");
        bail!(
            "{}: Found the following circular dependencies:\n{}",
            self.root(),
            listing
        )
    }

    /// Every elementary cycle of a strongly connected component.
    ///
    /// Each cycle starts and ends at its smallest member, so rotations of
    /// the same cycle are found once.
    fn elementary_cycles(&self, component: &[NodeIndex]) -> Vec<Vec<NodeIndex>> {
        let mut members = component.to_vec();
        members.sort_by_key(|node| self.label(*node));
        let rank: HashMap<NodeIndex, usize> = members
            .iter()
            .enumerate()
            .map(|(rank, node)| (*node, rank))
            .collect();

        let mut cycles = Vec::new();
        for (start_rank, &start) in members.iter().enumerate() {
            let mut path = vec![start];
            self.extend_cycles(start_rank, &rank, &mut path, &mut cycles);
        }
        cycles
    }

    fn extend_cycles(
        &self,
        start_rank: usize,
        rank: &HashMap<NodeIndex, usize>,
        path: &mut Vec<NodeIndex>,
        cycles: &mut Vec<Vec<NodeIndex>>,
    ) {
        let (Some(&start), Some(&last)) = (path.first(), path.last()) else {
            return;
        };
        for next in self.graph.neighbors(last) {
            match rank.get(&next) {
                Some(_) if next == start => {
                    let mut cycle = path.clone();
                    cycle.push(start);
                    cycles.push(cycle);
                }
                Some(&r) if r > start_rank && !path.contains(&next) => {
                    path.push(next);
                    self.extend_cycles(start_rank, rank, path, cycles);
                    path.pop();
                }
                _ => {}
            }
        }
    }

    /// Select the targets to build, ordered so dependencies come first.
    ///
    /// `names` may be full identifiers or names relative to the root
    /// project. Without `all` or `names` the root project's own targets are
    /// selected. Dependencies of selected targets are always included.
    pub fn select_targets(&self, all: bool, names: &[String]) -> Result<Vec<usize>> {
        let roots: Vec<NodeIndex> = if all {
            if !names.is_empty() {
                bail!(
                    "Cannot build [all] targets and only [{}]!",
                    names.join(", ")
                );
            }
            tracing::info!("Building all targets...");
            self.target_nodes.clone()
        } else if !names.is_empty() {
            names
                .iter()
                .map(|name| self.resolve_target_name(name).map(|t| self.target_nodes[t]))
                .collect::<Result<_>>()?
        } else {
            self.root()
                .targets
                .iter()
                .map(|&t| self.target_nodes[t])
                .collect()
        };

        let mut selected = HashSet::new();
        for root in roots {
            let mut dfs = Dfs::new(&self.graph, root);
            while let Some(node) = dfs.next(&self.graph) {
                selected.insert(node);
            }
        }

        let mut order = Vec::new();
        let mut topo = Topo::new(&self.graph);
        while let Some(node) = topo.next(&self.graph) {
            if let (true, Node::Target(index)) = (selected.contains(&node), self.graph[node]) {
                order.push(index);
            }
        }
        order.reverse();
        Ok(order)
    }

    fn resolve_target_name(&self, name: &str) -> Result<usize> {
        if let Some(index) = self.find_target(name) {
            return Ok(index);
        }
        let relative = format!("{}.{}", self.root().identifier, name);
        if let Some(index) = self.find_target(&relative) {
            return Ok(index);
        }

        let mut available: Vec<String> = self.targets.iter().map(|t| t.to_string()).collect();
        available.sort();
        bail!(
            "the target [{}] does not exist. Available targets: {}",
            name,
            available.join(", ")
        )
    }

    /// Fail if any target links against an executable.
    ///
    /// `kind_of` returns the kind of every target the check should look at.
    pub fn check_linkable_dependencies<F>(&self, targets: &[usize], kind_of: F) -> Result<()>
    where
        F: Fn(usize) -> Option<TargetKind>,
    {
        for &target in targets {
            let executables: Vec<String> = self
                .dependencies(target)
                .into_iter()
                .filter(|(dependency, _)| kind_of(*dependency) == Some(TargetKind::Executable))
                .map(|(dependency, _)| format!("[{}]", self.targets[dependency].name))
                .collect();

            if !executables.is_empty() {
                bail!(
                    "{}: The following targets are linking dependencies but were identified as executables:\n    {}",
                    self.targets[target],
                    executables.join(", ")
                );
            }
        }
        Ok(())
    }
}
