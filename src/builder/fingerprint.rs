//! Command fingerprints for incremental builds.
//!
//! Timestamps catch changed sources and headers. The fingerprint of the
//! compile command catches changed flags, include directories and compilers.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::builder::toolchain::CommandSpec;
use crate::util::fs::write_string;
use crate::util::hash::Fingerprint;

/// File name of the cache, inside a target's depfile folder.
pub const FINGERPRINTS_FILE: &str = "fingerprints.json";

/// Hash of everything that makes up a command.
pub fn command_fingerprint(command: &CommandSpec) -> String {
    let mut fp = Fingerprint::new();
    fp.update_str(&command.program.to_string_lossy());
    fp.update_strs(command.args.iter().map(String::as_str));
    fp.finish_short()
}

/// Fingerprint cache of one target.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct FingerprintCache {
    /// Compile command fingerprints by object file
    pub compile: BTreeMap<PathBuf, String>,
}

impl FingerprintCache {
    /// Load the cache. A missing or unreadable cache is empty, so everything rebuilds.
    pub fn load(path: &Path) -> Self {
        if !path.exists() {
            return FingerprintCache::default();
        }

        match std::fs::read_to_string(path)
            .map_err(anyhow::Error::from)
            .and_then(|content| serde_json::from_str(&content).map_err(anyhow::Error::from))
        {
            Ok(cache) => cache,
            Err(e) => {
                tracing::debug!("Discarding fingerprint cache {}: {}", path.display(), e);
                FingerprintCache::default()
            }
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        write_string(path, &content)
            .with_context(|| format!("failed to save fingerprints to {}", path.display()))
    }

    /// Check if an object was built with a different command.
    pub fn needs_compile(&self, object: &Path, fingerprint: &str) -> bool {
        self.compile.get(object).map_or(true, |cached| cached != fingerprint)
    }

    pub fn update_compile(&mut self, object: PathBuf, fingerprint: String) {
        self.compile.insert(object, fingerprint);
    }

    pub fn remove(&mut self, object: &Path) {
        self.compile.remove(object);
    }
}
