//! `compile_commands.json` for editors and language servers.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::util::fs::write_string;

pub const COMPILE_COMMANDS_FILE: &str = "compile_commands.json";

/// One entry. Fields are declared in sorted order, which is the order they are written in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompileCommand {
    pub command: String,
    pub directory: PathBuf,
    pub file: PathBuf,
    pub output: PathBuf,
}

/// The compile command database of a build folder.
///
/// Entries of earlier builds are kept; an entry with the same file and
/// output is replaced.
#[derive(Debug, Default)]
pub struct CompileDatabase {
    entries: BTreeMap<(PathBuf, PathBuf), CompileCommand>,
}

impl CompileDatabase {
    /// Load the database, starting empty if it is missing or unreadable.
    pub fn load(path: &Path) -> Self {
        let entries: Vec<CompileCommand> = std::fs::read_to_string(path)
            .ok()
            .and_then(|content| serde_json::from_str(&content).ok())
            .unwrap_or_default();

        let mut database = CompileDatabase::default();
        database.extend(entries);
        database
    }

    pub fn extend(&mut self, entries: impl IntoIterator<Item = CompileCommand>) {
        for entry in entries {
            self.entries
                .insert((entry.file.clone(), entry.output.clone()), entry);
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let entries: Vec<&CompileCommand> = self.entries.values().collect();
        let content = serde_json::to_string_pretty(&entries)?;
        write_string(path, &content)
            .with_context(|| format!("failed to write {}", path.display()))
    }
}
