//! Project layouts shared by tests.

use std::path::Path;

use super::write_file;

/// Files of a project, relative to its root.
#[derive(Debug, Clone, Default)]
pub struct ProjectFixture {
    pub files: Vec<(String, String)>,
}

impl ProjectFixture {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn file(mut self, path: &str, contents: &str) -> Self {
        self.files.push((path.to_string(), contents.to_string()));
        self
    }

    /// A folder with a single source and no project file.
    pub fn hello_world() -> Self {
        Self::new().file(
            "hello.cpp",
            "#include <cstdio>\nint main() { std::puts(\"Hello\"); }\n",
        )
    }

    /// A shared library with public headers and an executable using it.
    pub fn library_and_executable() -> Self {
        Self::new()
            .file(
                "clang-build.toml",
                r#"
name = "mwe"

[mylib]
target_type = "shared library"
public_include_directories = ["include"]

[myexe]
dependencies = ["mylib"]
"#,
            )
            .file("mylib/include/mylib/api.hpp", "int answer();\n")
            .file(
                "mylib/src/api.cpp",
                "#include <mylib/api.hpp>\nint answer() { return 42; }\n",
            )
            .file(
                "myexe/src/main.cpp",
                "#include <mylib/api.hpp>\nint main() { return answer() == 42 ? 0 : 1; }\n",
            )
    }

    pub fn write(&self, root: &Path) {
        for (path, contents) in &self.files {
            write_file(root, path, contents);
        }
    }
}
