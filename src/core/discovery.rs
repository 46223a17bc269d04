//! Source and header discovery for a single target.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use anyhow::Result;

use crate::core::manifest::TargetConfig;
use crate::core::platform::Platform;
use crate::util::fs::{glob_files, normalize_path};

pub const HEADER_EXTENSIONS: &[&str] = &["*.hpp", "*.hxx", "*.h"];
pub const SOURCE_EXTENSIONS: &[&str] = &["*.cpp", "*.cxx", "*.c", "*.cc", "*.cppm"];

/// Files and folders found for a target. All lists are sorted and unique.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TargetFiles {
    /// The folder paths are resolved against; `<root>/<target name>` if it exists
    pub root_directory: PathBuf,
    pub headers: Vec<PathBuf>,
    pub include_directories: Vec<PathBuf>,
    pub public_include_directories: Vec<PathBuf>,
    pub sources: Vec<PathBuf>,
}

impl TargetFiles {
    /// Whether the target keeps its sources in a `src/` folder.
    pub fn has_src_folder(&self) -> bool {
        self.root_directory.join("src").is_dir()
    }
}

/// Discover headers, sources and include directories of a target.
///
/// `root` is the project directory joined with the target's `directory`
/// option. A folder named after the target below it takes precedence;
/// otherwise the search runs "in project root" and is not recursive.
pub fn discover_files(
    target_name: &str,
    platform: Platform,
    config: &TargetConfig,
    root: &Path,
) -> Result<TargetFiles> {
    let dedicated = root.join(target_name);
    let in_project_root = !dedicated.is_dir();
    let target_root = normalize_path(if in_project_root { root } else { &dedicated });

    let options = config.options_for(platform);

    // Private include directories and their headers
    let custom_includes = existing_directories(&options.include_directories, &target_root);
    let (include_directories, recursive) = if !custom_includes.is_empty() {
        (custom_includes, true)
    } else if target_root.join("include").exists() {
        (vec![normalize_path(&target_root.join("include"))], true)
    } else {
        (vec![target_root.clone()], !in_project_root)
    };

    let mut headers = files_in_folders(
        &include_directories,
        HEADER_EXTENSIONS,
        &target_root,
        &options.headers_exclude,
        recursive,
    )?;

    // Public include directories have no default
    let public_include_directories =
        existing_directories(&options.public_include_directories, &target_root);
    if !public_include_directories.is_empty() {
        headers.extend(files_in_folders(
            &public_include_directories,
            HEADER_EXTENSIONS,
            &target_root,
            &options.headers_exclude,
            true,
        )?);
    }

    let sources = if !options.sources.is_empty() {
        let roots = [target_root.clone()];
        let found = glob_files(&roots, &options.sources)?;
        let excluded = glob_files(&roots, &options.sources_exclude)?;
        found.difference(&excluded).cloned().collect()
    } else {
        let src = target_root.join("src");
        let (folders, recursive) = if src.exists() {
            (vec![normalize_path(&src)], true)
        } else {
            (vec![target_root.clone()], !in_project_root)
        };
        files_in_folders(
            &folders,
            SOURCE_EXTENSIONS,
            &target_root,
            &options.sources_exclude,
            recursive,
        )?
    };

    tracing::debug!(
        "[{}]: found {} header(s) and {} source(s) in {}",
        target_name,
        headers.len(),
        sources.len(),
        target_root.display()
    );

    Ok(TargetFiles {
        root_directory: target_root,
        headers: headers.into_iter().collect(),
        include_directories,
        public_include_directories,
        sources: sources.into_iter().collect(),
    })
}

/// Glob files by extension in the given folders, minus the exclude patterns
/// evaluated relative to the target root.
fn files_in_folders(
    folders: &[PathBuf],
    extensions: &[&str],
    target_root: &Path,
    exclude_patterns: &[String],
    recursive: bool,
) -> Result<BTreeSet<PathBuf>> {
    let prefix = if recursive { "**/" } else { "" };
    let patterns: Vec<String> = extensions
        .iter()
        .map(|ext| format!("{}{}", prefix, ext))
        .collect();

    let found = glob_files(folders, &patterns)?;
    let excluded = glob_files(&[target_root.to_path_buf()], exclude_patterns)?;

    Ok(found.difference(&excluded).cloned().collect())
}

/// Configured folders that exist, resolved against the target root.
fn existing_directories(folders: &[PathBuf], target_root: &Path) -> Vec<PathBuf> {
    folders
        .iter()
        .map(|folder| target_root.join(folder))
        .filter(|path| path.is_dir())
        .map(|path| normalize_path(&path))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}
