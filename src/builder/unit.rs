//! A single source file and the commands that turn it into an object.

use std::path::{Component, Path, PathBuf};
use std::time::SystemTime;

use anyhow::Result;

use crate::builder::compile_db::CompileCommand;
use crate::builder::fingerprint::{command_fingerprint, FingerprintCache};
use crate::builder::toolchain::{CommandSpec, CompileInput, DependencyInput, Toolchain};
use crate::util::fs::ensure_dir;
use crate::util::process::ToolReport;

/// Build folders of a target, as seen by its compile units.
#[derive(Debug, Clone)]
pub struct UnitLayout<'a> {
    pub target_root: &'a Path,
    /// Strip a leading `src` from relative source folders
    pub has_src_folder: bool,
    pub object_directory: &'a Path,
    pub depfile_directory: &'a Path,
    pub module_directory: &'a Path,
}

/// Everything the compiler needs besides the source itself.
#[derive(Debug, Clone)]
pub struct UnitSettings<'a> {
    pub flags: &'a [String],
    pub include_directories: &'a [PathBuf],
    pub module_directories: &'a [PathBuf],
    pub is_c: bool,
}

#[derive(Debug, Clone)]
pub struct CompileUnit {
    pub source: PathBuf,
    pub object: PathBuf,
    pub depfile: PathBuf,
    /// Precompiled module, for `.cppm` sources
    pub module_file: Option<PathBuf>,
    pub dependency_command: CommandSpec,
    pub compile_command: CommandSpec,
    pub fingerprint: String,
}

impl CompileUnit {
    pub fn new(
        source: &Path,
        layout: &UnitLayout<'_>,
        settings: &UnitSettings<'_>,
        toolchain: &dyn Toolchain,
    ) -> Self {
        let relative = relative_source_folder(source, layout);
        let stem = source
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();

        let object = layout
            .object_directory
            .join(&relative)
            .join(format!("{}.o", stem));
        let depfile = layout
            .depfile_directory
            .join(&relative)
            .join(format!("{}.d", stem));
        let is_module = source.extension().is_some_and(|e| e == "cppm");
        let module_file = is_module.then(|| {
            layout
                .module_directory
                .join(&relative)
                .join(format!("{}.pcm", stem))
        });

        let dependency_command = toolchain.dependency_command(&DependencyInput {
            source: source.to_path_buf(),
            depfile: depfile.clone(),
            module_file: module_file.clone(),
            include_dirs: settings.include_directories.to_vec(),
            module_dirs: settings.module_directories.to_vec(),
            flags: settings.flags.to_vec(),
            is_c: settings.is_c,
        });

        let compile_command = toolchain.compile_command(&CompileInput {
            source: module_file.clone().unwrap_or_else(|| source.to_path_buf()),
            output: object.clone(),
            include_dirs: settings.include_directories.to_vec(),
            module_dirs: settings.module_directories.to_vec(),
            flags: settings.flags.to_vec(),
            is_c: settings.is_c,
            is_module,
        });

        let fingerprint = command_fingerprint(&compile_command);

        CompileUnit {
            source: source.to_path_buf(),
            object,
            depfile,
            module_file,
            dependency_command,
            compile_command,
            fingerprint,
        }
    }

    pub fn is_module(&self) -> bool {
        self.module_file.is_some()
    }

    /// Whether the object is out of date.
    pub fn needs_rebuild(&self, fingerprints: &FingerprintCache) -> bool {
        if fingerprints.needs_compile(&self.object, &self.fingerprint) {
            return true;
        }

        let Ok(contents) = std::fs::read_to_string(&self.depfile) else {
            return true;
        };
        let Some(object_time) = modified(&self.object) else {
            return true;
        };

        let newer = |path: &Path| modified(path).map_or(true, |time| time > object_time);

        newer(self.source.as_path())
            || parse_depfile(&contents)
                .iter()
                .any(|dep| newer(dep.as_path()))
    }

    /// Write the depfile. Module sources are precompiled in the same step.
    pub fn generate_dependencies(&self) -> Result<ToolReport> {
        for file in [Some(&self.depfile), self.module_file.as_ref()].into_iter().flatten() {
            if let Some(parent) = file.parent() {
                ensure_dir(parent)?;
            }
        }
        self.dependency_command.to_process().exec_with_report()
    }

    pub fn compile(&self) -> Result<ToolReport> {
        if let Some(parent) = self.object.parent() {
            ensure_dir(parent)?;
        }
        self.compile_command.to_process().exec_with_report()
    }

    /// Entry of `compile_commands.json`.
    pub fn compile_command_entry(&self) -> CompileCommand {
        CompileCommand {
            command: self.compile_command.display(),
            directory: self
                .source
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_default(),
            file: self.source.clone(),
            output: self.object.clone(),
        }
    }
}

/// Folder of `source` relative to the target root, minus a leading `src`.
fn relative_source_folder(source: &Path, layout: &UnitLayout<'_>) -> PathBuf {
    let folder = source.parent().unwrap_or(Path::new(""));
    let relative = folder
        .strip_prefix(layout.target_root)
        .map(Path::to_path_buf)
        .unwrap_or_else(|_| crate::util::fs::relative_path(layout.target_root, folder));

    // Sources outside the target root must not escape the build folders
    let relative: PathBuf = relative
        .components()
        .filter(|c| matches!(c, Component::Normal(_)))
        .collect();

    if layout.has_src_folder {
        if let Ok(stripped) = relative.strip_prefix("src") {
            return stripped.to_path_buf();
        }
    }
    relative
}

fn modified(path: &Path) -> Option<SystemTime> {
    std::fs::metadata(path).and_then(|m| m.modified()).ok()
}

/// Parse the dependencies out of a Makefile-style depfile.
///
/// Only the part after the first `": "` is read. Line continuations are
/// joined and `\ ` stands for a space inside a path.
pub fn parse_depfile(contents: &str) -> Vec<PathBuf> {
    let Some((_, dependencies)) = contents.split_once(": ") else {
        return Vec::new();
    };

    let mut paths = Vec::new();
    let mut current = String::new();
    let mut chars = dependencies.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '\\' if chars.peek() == Some(&' ') => {
                chars.next();
                current.push(' ');
            }
            '\\' if matches!(chars.peek(), Some('\n') | Some('\r')) => {
                if chars.next() == Some('\r') && chars.peek() == Some(&'\n') {
                    chars.next();
                }
                if !current.is_empty() {
                    paths.push(PathBuf::from(std::mem::take(&mut current)));
                }
            }
            c if c.is_whitespace() => {
                if !current.is_empty() {
                    paths.push(PathBuf::from(std::mem::take(&mut current)));
                }
            }
            c => current.push(c),
        }
    }
    if !current.is_empty() {
        paths.push(PathBuf::from(current));
    }

    paths
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::FakeToolchain;
    use std::time::Duration;
    use tempfile::TempDir;

    #[test]
    fn test_parse_depfile() {
        let contents = "obj/main.o: /src/main.cpp /inc/a.hpp \\\n  /inc/with\\ space.hpp\n";
        assert_eq!(
            parse_depfile(contents),
            vec![
                PathBuf::from("/src/main.cpp"),
                PathBuf::from("/inc/a.hpp"),
                PathBuf::from("/inc/with space.hpp"),
            ]
        );
        assert!(parse_depfile("garbage").is_empty());
    }

    struct Fixture {
        _tmp: TempDir,
        root: PathBuf,
        build: PathBuf,
    }

    fn fixture() -> Fixture {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path().join("project");
        std::fs::create_dir_all(root.join("src/detail")).unwrap();
        let build = tmp.path().join("build");
        Fixture {
            root,
            build,
            _tmp: tmp,
        }
    }

    fn unit(fixture: &Fixture, source: &Path, has_src_folder: bool) -> CompileUnit {
        let layout = UnitLayout {
            target_root: &fixture.root,
            has_src_folder,
            object_directory: &fixture.build.join("obj"),
            depfile_directory: &fixture.build.join("dep"),
            module_directory: &fixture.build.join("mod"),
        };
        let settings = UnitSettings {
            flags: &[],
            include_directories: &[],
            module_directories: &[],
            is_c: false,
        };
        CompileUnit::new(source, &layout, &settings, &FakeToolchain::default())
    }

    #[test]
    fn test_output_paths_strip_src() {
        let fixture = fixture();
        let source = fixture.root.join("src/detail/util.cpp");

        let stripped = unit(&fixture, &source, true);
        assert_eq!(stripped.object, fixture.build.join("obj/detail/util.o"));
        assert_eq!(stripped.depfile, fixture.build.join("dep/detail/util.d"));
        assert!(stripped.module_file.is_none());

        let kept = unit(&fixture, &source, false);
        assert_eq!(kept.object, fixture.build.join("obj/src/detail/util.o"));
    }

    #[test]
    fn test_module_sources() {
        let fixture = fixture();
        let unit = unit(&fixture, &fixture.root.join("src/math.cppm"), true);
        assert!(unit.is_module());
        assert_eq!(unit.module_file, Some(fixture.build.join("mod/math.pcm")));
    }

    #[test]
    fn test_needs_rebuild() {
        let fixture = fixture();
        let source = fixture.root.join("src/main.cpp");
        let header = fixture.root.join("src/main.hpp");
        std::fs::write(&source, "int main() {}").unwrap();
        std::fs::write(&header, "").unwrap();

        let unit = unit(&fixture, &source, true);
        let mut cache = FingerprintCache::default();

        // Nothing built yet
        assert!(unit.needs_rebuild(&cache));

        cache.update_compile(unit.object.clone(), unit.fingerprint.clone());
        std::thread::sleep(Duration::from_millis(20));
        std::fs::create_dir_all(unit.object.parent().unwrap()).unwrap();
        std::fs::create_dir_all(unit.depfile.parent().unwrap()).unwrap();
        std::fs::write(
            &unit.depfile,
            format!("{}: {} {}\n", unit.object.display(), source.display(), header.display()),
        )
        .unwrap();
        std::fs::write(&unit.object, "").unwrap();
        assert!(!unit.needs_rebuild(&cache));

        // Changed command
        let mut stale = FingerprintCache::default();
        stale.update_compile(unit.object.clone(), "other".to_string());
        assert!(unit.needs_rebuild(&stale));

        // Touched header
        std::thread::sleep(Duration::from_millis(20));
        std::fs::write(&header, "// changed").unwrap();
        assert!(unit.needs_rebuild(&cache));
    }

    #[test]
    fn test_missing_dependency_forces_rebuild() {
        let fixture = fixture();
        let source = fixture.root.join("src/main.cpp");
        std::fs::write(&source, "").unwrap();
        let unit = unit(&fixture, &source, true);

        let mut cache = FingerprintCache::default();
        cache.update_compile(unit.object.clone(), unit.fingerprint.clone());
        std::thread::sleep(Duration::from_millis(20));
        std::fs::create_dir_all(unit.object.parent().unwrap()).unwrap();
        std::fs::create_dir_all(unit.depfile.parent().unwrap()).unwrap();
        std::fs::write(&unit.object, "").unwrap();
        std::fs::write(&unit.depfile, "main.o: /does/not/exist.hpp\n").unwrap();

        assert!(unit.needs_rebuild(&cache));
    }
}
