//! Errors raised by build steps.

use std::collections::BTreeMap;
use std::fmt::Write;

use thiserror::Error;

/// Tool reports of every failed target, keyed by target identifier.
pub type Reports = BTreeMap<String, Vec<String>>;

/// A build step failed for one or more targets.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("Compilation was unsuccessful:{}", render(.0, "target did not compile"))]
    Compile(Reports),

    #[error("Linking was unsuccessful:{}", render(.0, "target did not link"))]
    Link(Reports),

    #[error("Bundling was unsuccessful:{}", render(.0, "target could not be bundled"))]
    Bundle(Reports),

    #[error(
        "Redistributable bundling was unsuccessful:{}",
        render(.0, "target could not be bundled into a redistributable")
    )]
    Redistributable(Reports),
}

impl BuildError {
    pub fn reports(&self) -> &Reports {
        match self {
            BuildError::Compile(r)
            | BuildError::Link(r)
            | BuildError::Bundle(r)
            | BuildError::Redistributable(r) => r,
        }
    }
}

fn render(reports: &Reports, what: &str) -> String {
    let mut out = String::new();
    for (target, errors) in reports {
        let _ = write!(out, "\n[{}]: {}. Errors:\n{}", target, what, errors.join(" "));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let mut reports = Reports::new();
        reports.insert(
            "mwe.app".to_string(),
            vec!["main.cpp:1: error: expected ';'".to_string()],
        );
        reports.insert("mwe.lib".to_string(), vec!["a".to_string(), "b".to_string()]);

        let message = BuildError::Compile(reports).to_string();
        assert_eq!(
            message,
            "Compilation was unsuccessful:\n\
             [mwe.app]: target did not compile. Errors:\nmain.cpp:1: error: expected ';'\n\
             [mwe.lib]: target did not compile. Errors:\na b"
        );
    }

    #[test]
    fn test_link_error_display() {
        let mut reports = Reports::new();
        reports.insert("app".to_string(), vec!["undefined reference to `foo'".to_string()]);

        let message = BuildError::Link(reports).to_string();
        assert!(message.starts_with("Linking was unsuccessful:\n[app]: target did not link."));
    }
}
