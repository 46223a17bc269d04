//! Configured targets.
//!
//! A [`Target`] is a [`TargetDescription`] whose files were found, whose
//! kind is known and whose flags and directories were composed from its
//! dependencies. Configured targets compile, link and bundle themselves.

use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::{bail, Result};
use rayon::prelude::*;
use walkdir::WalkDir;

use crate::builder::compile_db::CompileCommand;
use crate::builder::directories::Directories;
use crate::builder::fingerprint::{FingerprintCache, FINGERPRINTS_FILE};
use crate::builder::flags::BuildFlags;
use crate::builder::toolchain::{ArchiveInput, LinkInput, Toolchain};
use crate::builder::unit::{CompileUnit, UnitLayout, UnitSettings};
use crate::core::discovery::TargetFiles;
use crate::core::environment::Environment;
use crate::core::platform::Platform;
use crate::core::project::EdgeKind;
use crate::core::target::{TargetDescription, TargetKind};
use crate::util::fs::{copy_into, ensure_dir, unique, write_string};

/// Build output of a compiled target.
#[derive(Debug, Clone)]
pub struct TargetOutput {
    pub output_name: String,
    /// Folder the binary goes to
    pub output_folder: PathBuf,
    pub outfile: PathBuf,
    pub object_directory: PathBuf,
    pub depfile_directory: PathBuf,
    pub module_directory: PathBuf,
    pub units: Vec<CompileUnit>,
    /// Language flags followed by the final link flags
    pub link_flags: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct Target {
    pub identifier: String,
    pub name: String,
    pub kind: TargetKind,
    pub platform: Platform,
    pub root_directory: PathBuf,
    pub build_directory: PathBuf,
    pub redistributable_directory: PathBuf,
    pub files: TargetFiles,
    pub flags: BuildFlags,
    pub directories: Directories,
    /// All sources are C
    pub is_c: bool,
    /// `None` for header-only targets
    pub output: Option<TargetOutput>,
}

impl Target {
    /// Configure a target from its description and its configured dependencies.
    pub fn configure(
        description: &TargetDescription,
        files: TargetFiles,
        kind: TargetKind,
        dependencies: &[(&Target, EdgeKind)],
        env: &Environment,
        toolchain: &dyn Toolchain,
    ) -> Result<Target> {
        if kind.is_compiled() && files.sources.is_empty() {
            bail!(
                "{}: Target was defined as a {} but no source files were found",
                description,
                kind
            );
        }

        let platform = toolchain.platform();
        let is_c = !files.sources.is_empty()
            && files
                .sources
                .iter()
                .all(|source| source.extension().is_some_and(|e| e == "c"));

        let flags = compose_flags(description, kind, is_c, dependencies, env, toolchain);

        let mut directories =
            Directories::new(&files.include_directories, &files.public_include_directories);
        for (dependency, edge) in dependencies {
            directories.add_dependency(
                &dependency.directories,
                dependency.output_folder(),
                *edge == EdgeKind::Public,
            );
        }
        if kind == TargetKind::HeaderOnly {
            directories.make_private_directories_public();
        }

        let build_directory = description.build_directory.clone();
        let mut target = Target {
            identifier: description.identifier.clone(),
            name: description.name.clone(),
            kind,
            platform,
            root_directory: files.root_directory.clone(),
            redistributable_directory: build_directory.join("redistributable"),
            build_directory,
            files,
            flags,
            directories,
            is_c,
            output: None,
        };

        if let Some(layout) = toolchain.platform_defaults().layout(kind) {
            let config = &description.config;
            let output_name = description.output_name().to_string();
            let prefix = config.output_prefix.as_deref().unwrap_or(layout.prefix);
            let suffix = config.output_suffix.as_deref().unwrap_or(layout.suffix);
            let output_folder = target.build_directory.join(layout.output_dir);
            let outfile = output_folder.join(format!("{}{}{}", prefix, output_name, suffix));

            let object_directory = target.build_directory.join("obj");
            let depfile_directory = target.build_directory.join("dep");
            let module_directory = target.build_directory.join("mod");

            let mut compile_flags = target.flags.final_compile_flags_list();
            compile_flags.extend(layout.extra_flags.iter().map(|f| f.to_string()));

            let include_directories = target.directories.final_include_directories();
            let mut module_directories = vec![module_directory.clone()];
            module_directories.extend(target.directories.final_module_directories());
            let module_directories = unique(module_directories);

            let unit_layout = UnitLayout {
                target_root: &target.root_directory,
                has_src_folder: target.files.has_src_folder(),
                object_directory: &object_directory,
                depfile_directory: &depfile_directory,
                module_directory: &module_directory,
            };
            let settings = UnitSettings {
                flags: &compile_flags,
                include_directories: &include_directories,
                module_directories: &module_directories,
                is_c,
            };
            let units = target
                .files
                .sources
                .iter()
                .map(|source| CompileUnit::new(source, &unit_layout, &settings, toolchain))
                .collect();

            let mut link_flags = target.flags.language_flags.clone();
            link_flags.extend(target.flags.final_link_flags_list());

            target.output = Some(TargetOutput {
                output_name,
                output_folder,
                outfile,
                object_directory,
                depfile_directory,
                module_directory,
                units,
                link_flags,
            });
        }

        tracing::debug!("{}: configured as {}", target, target.kind);
        Ok(target)
    }

    pub fn output_folder(&self) -> Option<&Path> {
        self.output.as_ref().map(|o| o.output_folder.as_path())
    }

    pub fn outfile(&self) -> Option<&Path> {
        self.output.as_ref().map(|o| o.outfile.as_path())
    }

    pub fn units(&self) -> &[CompileUnit] {
        self.output.as_ref().map_or(&[], |o| o.units.as_slice())
    }

    pub fn objects(&self) -> Vec<PathBuf> {
        self.units().iter().map(|u| u.object.clone()).collect()
    }

    pub fn compile_commands(&self) -> Vec<CompileCommand> {
        self.units()
            .iter()
            .map(CompileUnit::compile_command_entry)
            .collect()
    }

    /// Compile changed sources in parallel on the current rayon pool.
    ///
    /// Returns the reports of failed sources; an empty list means success.
    pub fn compile(&self, force_build: bool) -> Result<Vec<String>> {
        let Some(output) = &self.output else {
            return Ok(Vec::new());
        };

        let cache_path = output.depfile_directory.join(FINGERPRINTS_FILE);
        let mut fingerprints = FingerprintCache::load(&cache_path);

        let needed: Vec<&CompileUnit> = output
            .units
            .iter()
            .filter(|unit| force_build || unit.needs_rebuild(&fingerprints))
            .collect();

        if needed.is_empty() {
            tracing::info!("{}: target is already compiled", self);
            return Ok(Vec::new());
        }

        tracing::info!(
            "{}: target needs to build sources {}",
            self,
            needed
                .iter()
                .filter_map(|u| u.source.file_name())
                .map(|n| n.to_string_lossy())
                .collect::<Vec<_>>()
                .join(", ")
        );

        // Modules are precompiled before the sources importing them are scanned
        tracing::info!("{}: generate dependency and prebuilt module files", self);
        let (modules, plain): (Vec<&CompileUnit>, Vec<&CompileUnit>) =
            needed.iter().copied().partition(|unit| unit.is_module());

        let mut reports = Vec::new();
        for batch in [modules, plain] {
            let results: Vec<Result<_>> = batch
                .par_iter()
                .map(|unit| unit.generate_dependencies())
                .collect();
            for result in results {
                let report = result?;
                if !report.success {
                    reports.push(report.output);
                }
            }
        }

        if !reports.is_empty() {
            return Ok(reports);
        }

        tracing::info!("{}: compile object files", self);
        let results: Vec<Result<_>> = needed
            .par_iter()
            .map(|unit| unit.compile().map(|report| (*unit, report)))
            .collect();

        for result in results {
            let (unit, report) = result?;
            if report.success {
                fingerprints.update_compile(unit.object.clone(), unit.fingerprint.clone());
            } else {
                fingerprints.remove(&unit.object);
                reports.push(report.output);
            }
        }

        fingerprints.save(&cache_path)?;
        Ok(reports)
    }

    /// Link or archive the target.
    ///
    /// Returns the tool's report if it failed.
    pub fn link(&self, dependencies: &[&Target], toolchain: &dyn Toolchain) -> Result<Option<String>> {
        let Some(output) = &self.output else {
            tracing::info!("{}: header-only target does not require linking.", self);
            return Ok(None);
        };

        let command = match self.kind {
            TargetKind::HeaderOnly | TargetKind::Module => {
                tracing::info!("{}: {} target does not require linking.", self, self.kind.as_str());
                return Ok(None);
            }
            TargetKind::StaticLibrary => {
                let mut objects = self.objects();
                for dependency in dependencies {
                    if dependency.kind != TargetKind::HeaderOnly {
                        objects.extend(dependency.objects());
                    }
                }
                // llvm-ar appends to existing archives
                if output.outfile.exists() {
                    std::fs::remove_file(&output.outfile)?;
                }
                toolchain.archive_command(&ArchiveInput {
                    objects,
                    output: output.outfile.clone(),
                })
            }
            TargetKind::Executable | TargetKind::SharedLibrary => {
                let mut objects = self.objects();
                if self.kind == TargetKind::Executable {
                    for dependency in dependencies {
                        if dependency.kind == TargetKind::Module {
                            objects.extend(dependency.objects());
                        }
                    }
                }

                let linked: Vec<&&Target> = dependencies
                    .iter()
                    .filter(|d| !matches!(d.kind, TargetKind::HeaderOnly | TargetKind::Module))
                    .collect();

                toolchain.link_command(&LinkInput {
                    objects,
                    output: output.outfile.clone(),
                    flags: output.link_flags.clone(),
                    lib_dirs: unique(
                        linked
                            .iter()
                            .filter_map(|d| d.output_folder().map(Path::to_path_buf)),
                    ),
                    libs: linked
                        .iter()
                        .filter_map(|d| d.output.as_ref().map(|o| o.output_name.clone()))
                        .collect(),
                    shared: self.kind == TargetKind::SharedLibrary,
                    is_c: self.is_c,
                })
            }
        };

        tracing::info!("{}: link -> {}", self, output.outfile.display());
        ensure_dir(&output.output_folder)?;
        let report = command.to_process().exec_with_report()?;

        if report.success {
            Ok(None)
        } else {
            Ok(Some(report.output))
        }
    }

    /// Collect the shared libraries this target needs at runtime.
    ///
    /// Executables and shared libraries get copies of their dependencies'
    /// bundles in their output folder. The returned list holds the target's
    /// own binary, if it is part of the bundle, followed by its dependencies'.
    pub fn bundle(&self, dependency_bundles: &[PathBuf]) -> Result<Vec<PathBuf>> {
        let dependency_bundles = unique(dependency_bundles.iter().cloned());

        match (self.kind, &self.output) {
            (TargetKind::Module, _) => bail!("bundling a module is not yet implemented"),
            (TargetKind::SharedLibrary, Some(output)) => {
                self.copy_bundle(&dependency_bundles, &output.output_folder)?;
                let mut bundle = vec![output.outfile.clone()];
                if self.platform == Platform::Windows {
                    bundle.extend(windows_import_files(&output.outfile));
                }
                bundle.extend(dependency_bundles);
                Ok(bundle)
            }
            (TargetKind::Executable, Some(output)) => {
                self.copy_bundle(&dependency_bundles, &output.output_folder)?;
                let mut bundle = vec![output.outfile.clone()];
                bundle.extend(dependency_bundles);
                Ok(bundle)
            }
            _ => Ok(dependency_bundles),
        }
    }

    fn copy_bundle(&self, files: &[PathBuf], folder: &Path) -> Result<()> {
        for file in files {
            tracing::debug!("{}: bundling {}", self, file.display());
            copy_into(file, folder)?;
        }
        Ok(())
    }

    /// Create a folder suitable for installation from the target's bundle.
    pub fn redistributable(&self, bundle: &[PathBuf]) -> Result<()> {
        let folder = &self.redistributable_directory;

        if self.platform == Platform::Osx && self.kind == TargetKind::Executable {
            if let Some(output) = &self.output {
                let app = folder.join(format!("{}.app", output.output_name));
                let binaries = app.join("Contents").join("MacOS");
                ensure_dir(&binaries)?;
                write_string(&app.join("Contents").join("Info.plist"), &info_plist(&output.output_name))?;
                for file in bundle {
                    copy_into(file, &binaries)?;
                }
            }
            return Ok(());
        }

        ensure_dir(folder)?;
        let bin = folder.join("bin");
        let lib = folder.join("lib");

        match self.kind {
            TargetKind::Module => bail!("bundling a module is not yet implemented"),
            TargetKind::Executable => {
                for file in bundle {
                    copy_into(file, &bin)?;
                }
            }
            TargetKind::SharedLibrary | TargetKind::StaticLibrary | TargetKind::HeaderOnly => {
                if let Some(outfile) = self.outfile() {
                    let destination = if self.kind == TargetKind::SharedLibrary
                        && self.platform == Platform::Windows
                    {
                        &bin
                    } else {
                        &lib
                    };
                    copy_into(outfile, destination)?;
                }
                for file in bundle {
                    if Some(file.as_path()) != self.outfile() {
                        let destination = if self.platform == Platform::Windows { &bin } else { &lib };
                        copy_into(file, destination)?;
                    }
                }
                self.copy_public_headers(&folder.join("include"))?;
            }
        }

        Ok(())
    }

    /// Copy headers of the public include directories, keeping their layout.
    fn copy_public_headers(&self, destination: &Path) -> Result<()> {
        for directory in &self.directories.include_public {
            for entry in WalkDir::new(directory).into_iter().filter_map(|e| e.ok()) {
                let path = entry.path();
                let is_header = path
                    .extension()
                    .and_then(|e| e.to_str())
                    .is_some_and(|e| matches!(e, "h" | "hpp" | "hxx"));
                if !entry.file_type().is_file() || !is_header {
                    continue;
                }
                let Ok(relative) = path.strip_prefix(directory) else {
                    continue;
                };
                let target_folder = match relative.parent() {
                    Some(parent) => destination.join(parent),
                    None => destination.to_path_buf(),
                };
                copy_into(path, &target_folder)?;
            }
        }
        Ok(())
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.identifier)
    }
}

fn compose_flags(
    description: &TargetDescription,
    kind: TargetKind,
    is_c: bool,
    dependencies: &[(&Target, EdgeKind)],
    env: &Environment,
    toolchain: &dyn Toolchain,
) -> BuildFlags {
    let mut flags = BuildFlags::new(env.build_type);

    if kind.is_compiled() {
        if !is_c {
            flags.language_flag(toolchain.max_cpp_standard());
        }
        flags.set_default_compile_flags(toolchain.default_compile_flags(env.build_type));
    }
    if matches!(
        kind,
        TargetKind::Executable | TargetKind::SharedLibrary | TargetKind::Module
    ) {
        flags.set_default_link_flags(toolchain.default_link_flags(env.build_type));
    }

    flags.add_target_flags(toolchain.platform(), &description.config);

    for (dependency, _) in dependencies {
        let dependency = &dependency.flags;
        match kind {
            TargetKind::Executable | TargetKind::SharedLibrary | TargetKind::Module => {
                flags.apply_public_flags(dependency);
                flags.forward_public_flags(dependency);
                flags.apply_interface_flags(dependency);
            }
            TargetKind::StaticLibrary => {
                flags.apply_public_flags(dependency);
                flags.forward_public_flags(dependency);
                flags.forward_interface_flags(dependency);
            }
            TargetKind::HeaderOnly => {
                flags.forward_public_flags(dependency);
                flags.forward_interface_flags(dependency);
            }
        }
    }

    if kind == TargetKind::Executable && env.bundle {
        flags.add_bundling_flags(toolchain.platform_defaults().bundling_linker_flags);
    }
    if kind == TargetKind::HeaderOnly {
        flags.make_private_flags_public();
    }

    flags
}

/// `.exp` and `.lib` files produced next to a Windows DLL.
fn windows_import_files(dll: &Path) -> Vec<PathBuf> {
    ["exp", "lib"]
        .iter()
        .map(|extension| dll.with_extension(extension))
        .filter(|path| path.exists())
        .collect()
}

fn info_plist(name: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE plist PUBLIC "-//Apple Computer//DTD PLIST 1.0//EN" "http://www.apple.com/DTDs/PropertyList-1.0.dtd">
<plist version="1.0">
<dict>
  <key>CFBundleGetInfoString</key>
  <string>{name}</string>
  <key>CFBundleExecutable</key>
  <string>{name}</string>
  <key>CFBundleIdentifier</key>
  <string>com.your-company-name.www</string>
  <key>CFBundleName</key>
  <string>{name}</string>
  <key>CFBundleShortVersionString</key>
  <string>0.0</string>
  <key>CFBundleInfoDictionaryVersion</key>
  <string>6.0</string>
  <key>CFBundlePackageType</key>
  <string>APPL</string>
  <key>IFMajorVersion</key>
  <integer>0</integer>
  <key>IFMinorVersion</key>
  <integer>0</integer>
</dict>
</plist>
"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::build_type::BuildType;
    use crate::core::project::ProjectTree;
    use crate::test_support::{write_file, FakeToolchain};
    use tempfile::TempDir;

    struct Fixture {
        tmp: TempDir,
        tree: ProjectTree,
        env: Environment,
    }

    fn load(files: &[(&str, &str)], env: Environment) -> Fixture {
        let tmp = TempDir::new().unwrap();
        for (path, contents) in files {
            write_file(tmp.path(), path, contents);
        }
        let env = env
            .build_directory(tmp.path().join("build"))
            .dependency_dotfile(false);
        let tree = ProjectTree::load(tmp.path(), &env).unwrap();
        Fixture { tmp, tree, env }
    }

    /// Configure every target of the tree in dependency order.
    fn configure_all(fixture: &Fixture) -> Vec<Target> {
        configure_with(fixture, &FakeToolchain::default())
    }

    fn configure_with(fixture: &Fixture, toolchain: &FakeToolchain) -> Vec<Target> {
        let order = fixture.tree.select_targets(true, &[]).unwrap();
        let mut configured: Vec<Option<Target>> = vec![None; fixture.tree.targets().len()];

        for index in order {
            let description = fixture.tree.target(index);
            let files = description.discover_files(toolchain.platform).unwrap();
            let kind = description.resolve_kind(&files).unwrap();
            let dependencies: Vec<(&Target, EdgeKind)> = fixture
                .tree
                .dependencies(index)
                .into_iter()
                .map(|(d, edge)| (configured[d].as_ref().unwrap(), edge))
                .collect();
            let target =
                Target::configure(description, files, kind, &dependencies, &fixture.env, toolchain)
                    .unwrap();
            configured[index] = Some(target);
        }
        configured.into_iter().map(Option::unwrap).collect()
    }

    fn find<'a>(targets: &'a [Target], identifier: &str) -> &'a Target {
        targets.iter().find(|t| t.identifier == identifier).unwrap()
    }

    const LIBRARY_PROJECT: &str = r#"
name = "mwe"

[mylib]
target_type = "shared library"
public_include_directories = ["include"]
[mylib.public_flags]
compile = ["-DUSE_MYLIB"]
[mylib.interface_flags]
compile = ["-DMYLIB_INTERFACE"]
[mylib.flags]
compile = ["-DBUILDING_MYLIB"]

[myexe]
dependencies = ["mylib"]
"#;

    #[test]
    fn test_configure_executable_with_shared_dependency() {
        let fixture = load(
            &[
                ("clang-build.toml", LIBRARY_PROJECT),
                ("mylib/include/mylib.hpp", ""),
                ("mylib/src/mylib.cpp", ""),
                ("myexe/src/main.cpp", ""),
            ],
            Environment::new().bundle(true),
        );
        let targets = configure_all(&fixture);
        let lib = find(&targets, "mwe.mylib");
        let exe = find(&targets, "mwe.myexe");

        assert_eq!(lib.kind, TargetKind::SharedLibrary);
        assert_eq!(exe.kind, TargetKind::Executable);

        let lib_out = lib.output.as_ref().unwrap();
        assert_eq!(
            lib_out.outfile,
            fixture.tmp.path().join("build/mylib/default/lib/libmylib.so")
        );

        let compile = &exe.output.as_ref().unwrap().units[0].compile_command.args;
        assert!(compile.contains(&"-std=c++17".to_string()));
        assert!(compile.contains(&"-DUSE_MYLIB".to_string()));
        assert!(compile.contains(&"-DMYLIB_INTERFACE".to_string()));
        assert!(!compile.contains(&"-DBUILDING_MYLIB".to_string()));
        assert!(exe.directories.include_private.iter().any(|d| d.ends_with("mylib/include")));

        let lib_compile = &lib_out.units[0].compile_command.args;
        assert!(lib_compile.contains(&"-fpic".to_string()));
        assert!(lib_compile.contains(&"-DBUILDING_MYLIB".to_string()));
        assert!(!lib_compile.contains(&"-DMYLIB_INTERFACE".to_string()));

        // Bundling makes executables look for libraries next to themselves
        assert!(exe
            .output
            .as_ref()
            .unwrap()
            .link_flags
            .contains(&"-Wl,-rpath,$ORIGIN".to_string()));
    }

    #[test]
    fn test_header_only_flags_become_public() {
        let fixture = load(
            &[
                (
                    "clang-build.toml",
                    r#"
name = "mwe"

[headers]
target_type = "header only"
[headers.flags]
compile = ["-DHEADERS"]

[app]
dependencies = ["headers"]
"#,
                ),
                ("headers/include/h.hpp", ""),
                ("app/main.c", ""),
            ],
            Environment::new().build_type(BuildType::Release),
        );
        let targets = configure_all(&fixture);
        let headers = find(&targets, "mwe.headers");
        let app = find(&targets, "mwe.app");

        assert!(headers.output.is_none());
        assert!(headers.flags.private.compile.is_empty());
        assert!(headers.directories.include_private.is_empty());

        assert!(app.is_c);
        let args = &app.output.as_ref().unwrap().units[0].compile_command.args;
        assert!(args.contains(&"-DHEADERS".to_string()));
        assert!(args.contains(&"-O3".to_string()));
        assert!(!args.iter().any(|a| a.starts_with("-std=")));
    }

    #[test]
    fn test_compiled_target_without_sources_is_an_error() {
        let tmp = TempDir::new().unwrap();
        write_file(
            tmp.path(),
            "clang-build.toml",
            "name = \"mwe\"\n[lib]\ntarget_type = \"static library\"\n",
        );
        let env = Environment::new()
            .build_directory(tmp.path().join("build"))
            .dependency_dotfile(false);
        let tree = ProjectTree::load(tmp.path(), &env).unwrap();
        let description = tree.target(0);
        let files = description.discover_files(Platform::Linux).unwrap();

        let err = Target::configure(
            description,
            files,
            TargetKind::StaticLibrary,
            &[],
            &env,
            &FakeToolchain::default(),
        )
        .unwrap_err();
        assert_eq!(
            err.to_string(),
            "[mwe.lib]: Target was defined as a StaticLibrary but no source files were found"
        );
    }

    #[test]
    fn test_bundle() {
        let fixture = load(
            &[
                ("clang-build.toml", LIBRARY_PROJECT),
                ("mylib/include/mylib.hpp", ""),
                ("mylib/src/mylib.cpp", ""),
                ("myexe/src/main.cpp", ""),
            ],
            Environment::new().bundle(true),
        );
        let targets = configure_all(&fixture);
        let lib = find(&targets, "mwe.mylib");
        let exe = find(&targets, "mwe.myexe");

        // Pretend the library was linked
        let lib_file = lib.outfile().unwrap().to_path_buf();
        std::fs::create_dir_all(lib_file.parent().unwrap()).unwrap();
        std::fs::write(&lib_file, "so").unwrap();

        let lib_bundle = lib.bundle(&[]).unwrap();
        assert_eq!(lib_bundle, vec![lib_file.clone()]);

        let exe_bundle = exe.bundle(&lib_bundle).unwrap();
        assert_eq!(exe_bundle, vec![exe.outfile().unwrap().to_path_buf(), lib_file]);
        assert!(exe.output_folder().unwrap().join("libmylib.so").exists());
    }

    #[test]
    fn test_redistributable_library_layout() {
        let fixture = load(
            &[
                ("clang-build.toml", LIBRARY_PROJECT),
                ("mylib/include/nested/mylib.hpp", ""),
                ("mylib/src/mylib.cpp", ""),
                ("myexe/src/main.cpp", ""),
            ],
            Environment::new().redistributable(true),
        );
        let targets = configure_all(&fixture);
        let lib = find(&targets, "mwe.mylib");

        let lib_file = lib.outfile().unwrap().to_path_buf();
        std::fs::create_dir_all(lib_file.parent().unwrap()).unwrap();
        std::fs::write(&lib_file, "so").unwrap();

        let bundle = lib.bundle(&[]).unwrap();
        lib.redistributable(&bundle).unwrap();

        let folder = &lib.redistributable_directory;
        assert!(folder.join("lib/libmylib.so").exists());
        assert!(folder.join("include/nested/mylib.hpp").exists());
    }

    /// Pretend `target` was linked.
    fn touch_outfile(target: &Target) -> PathBuf {
        let outfile = target.outfile().unwrap().to_path_buf();
        std::fs::create_dir_all(outfile.parent().unwrap()).unwrap();
        std::fs::write(&outfile, "binary").unwrap();
        outfile
    }

    fn lines(path: &Path) -> Vec<String> {
        std::fs::read_to_string(path)
            .unwrap()
            .lines()
            .map(str::to_string)
            .collect()
    }

    #[test]
    #[cfg(unix)]
    fn test_static_library_archives_dependency_objects() {
        let fixture = load(
            &[
                (
                    "clang-build.toml",
                    r#"
name = "mwe"

[core]
target_type = "static library"
[headers]
target_type = "header only"
[util]
target_type = "static library"
dependencies = ["core", "headers"]
"#,
                ),
                ("core/src/core.cpp", ""),
                ("headers/include/headers.hpp", ""),
                ("util/src/util.cpp", ""),
            ],
            Environment::new(),
        );
        let targets = configure_all(&fixture);
        let core = find(&targets, "mwe.core");
        let headers = find(&targets, "mwe.headers");
        let util = find(&targets, "mwe.util");

        // Left over from an earlier build, with a since deleted source
        let archive = util.outfile().unwrap().to_path_buf();
        std::fs::create_dir_all(archive.parent().unwrap()).unwrap();
        std::fs::write(&archive, "stale.o\n").unwrap();

        let report = util.link(&[core, headers], &FakeToolchain::default()).unwrap();
        assert!(report.is_none());

        let mut expected: Vec<String> = util
            .objects()
            .iter()
            .map(|o| o.display().to_string())
            .collect();
        expected.extend(core.objects().iter().map(|o| o.display().to_string()));
        assert_eq!(lines(&archive), expected);
    }

    #[test]
    #[cfg(unix)]
    fn test_executable_links_module_objects() {
        let fixture = load(
            &[
                (
                    "clang-build.toml",
                    r#"
name = "mwe"

[math]
target_type = "module"
[mylib]
target_type = "shared library"
[app]
dependencies = ["math", "mylib"]
"#,
                ),
                ("math/src/math.cppm", ""),
                ("mylib/src/mylib.cpp", ""),
                ("app/src/main.cpp", ""),
            ],
            Environment::new(),
        );
        let targets = configure_all(&fixture);
        let math = find(&targets, "mwe.math");
        let mylib = find(&targets, "mwe.mylib");
        let app = find(&targets, "mwe.app");
        assert_eq!(math.kind, TargetKind::Module);

        let toolchain = FakeToolchain::default();
        assert!(math.link(&[], &toolchain).unwrap().is_none());
        assert!(!math.outfile().unwrap().exists());

        assert!(app.link(&[math, mylib], &toolchain).unwrap().is_none());
        let args = lines(app.outfile().unwrap());

        let module_object = math.objects()[0].display().to_string();
        assert!(args.contains(&module_object));
        assert!(args.contains(&"-lmylib".to_string()));
        assert!(!args.contains(&"-lmath".to_string()));
        let lib_dir = format!("-L{}", mylib.output_folder().unwrap().display());
        assert!(args.contains(&lib_dir));
        assert!(!args
            .iter()
            .any(|a| a == &format!("-L{}", math.output_folder().unwrap().display())));
    }

    #[test]
    fn test_bundling_a_module_fails() {
        let fixture = load(
            &[
                ("clang-build.toml", "name = \"mwe\"\n[math]\ntarget_type = \"module\"\n"),
                ("math/src/math.cppm", ""),
            ],
            Environment::new().bundle(true),
        );
        let targets = configure_all(&fixture);
        let math = find(&targets, "mwe.math");

        let err = math.bundle(&[]).unwrap_err();
        assert!(err.to_string().contains("bundling a module"));
        assert!(math.redistributable(&[]).is_err());
    }

    #[test]
    fn test_redistributable_executable_layout() {
        let fixture = load(
            &[
                ("clang-build.toml", LIBRARY_PROJECT),
                ("mylib/include/mylib.hpp", ""),
                ("mylib/src/mylib.cpp", ""),
                ("myexe/src/main.cpp", ""),
            ],
            Environment::new().redistributable(true),
        );
        let targets = configure_all(&fixture);
        let lib = find(&targets, "mwe.mylib");
        let exe = find(&targets, "mwe.myexe");
        touch_outfile(lib);
        touch_outfile(exe);

        let lib_bundle = lib.bundle(&[]).unwrap();
        let exe_bundle = exe.bundle(&lib_bundle).unwrap();
        exe.redistributable(&exe_bundle).unwrap();

        let folder = &exe.redistributable_directory;
        assert!(folder.join("bin/myexe").exists());
        assert!(folder.join("bin/libmylib.so").exists());
        assert!(!folder.join("lib").exists());
        assert!(!folder.join("include").exists());
    }

    #[test]
    fn test_windows_bundle_includes_import_files() {
        let fixture = load(
            &[
                ("clang-build.toml", LIBRARY_PROJECT),
                ("mylib/include/mylib.hpp", ""),
                ("mylib/src/mylib.cpp", ""),
                ("myexe/src/main.cpp", ""),
            ],
            Environment::new().bundle(true),
        );
        let toolchain = FakeToolchain {
            platform: Platform::Windows,
        };
        let targets = configure_with(&fixture, &toolchain);
        let lib = find(&targets, "mwe.mylib");
        let exe = find(&targets, "mwe.myexe");

        let dll = touch_outfile(lib);
        assert_eq!(dll, fixture.tmp.path().join("build/mylib/default/bin/mylib.dll"));
        assert_eq!(lib.bundle(&[]).unwrap(), vec![dll.clone()]);

        std::fs::write(dll.with_extension("exp"), "").unwrap();
        std::fs::write(dll.with_extension("lib"), "").unwrap();
        let bundle = lib.bundle(&[]).unwrap();
        assert_eq!(
            bundle,
            vec![
                dll.clone(),
                dll.with_extension("exp"),
                dll.with_extension("lib")
            ]
        );

        let exe_bundle = exe.bundle(&bundle).unwrap();
        assert_eq!(exe.outfile().unwrap().extension().unwrap(), "exe");
        let bin = exe.output_folder().unwrap();
        assert!(bin.join("mylib.dll").exists());
        assert!(bin.join("mylib.exp").exists());
        assert!(bin.join("mylib.lib").exists());
        assert_eq!(exe_bundle.len(), 4);
    }

    #[test]
    fn test_info_plist_names_the_executable() {
        let plist = info_plist("viewer");
        assert!(plist.contains("<key>CFBundleExecutable</key>\n  <string>viewer</string>"));
        assert!(plist.contains("<string>APPL</string>"));
    }
}
