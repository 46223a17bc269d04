//! Progress display for the build phases.

use indicatif::{ProgressBar, ProgressStyle};

pub const CONFIGURE: &str = "Configure";
pub const COMPILE: &str = "Compile";
pub const LINK: &str = "Link";
pub const BUNDLE: &str = "Generate bundle";
pub const REDISTRIBUTABLE: &str = "Generate redistributable";

const MAX_DESCRIPTION: usize = 16;

/// One bar stepping through build phases. Hidden unless enabled.
pub struct CategoryProgress {
    bar: ProgressBar,
    categories: Vec<&'static str>,
    current: usize,
}

impl CategoryProgress {
    pub fn new(categories: Vec<&'static str>, enabled: bool) -> Self {
        let bar = if enabled {
            let bar = ProgressBar::new(categories.len() as u64);
            bar.set_style(
                ProgressStyle::default_bar()
                    .template("{prefix:>16} [{bar:30.cyan/blue}] {pos}/{len} {msg}")
                    .map(|style| style.progress_chars("#>-"))
                    .unwrap_or_else(|_| ProgressStyle::default_bar()),
            );
            bar
        } else {
            ProgressBar::hidden()
        };

        if let Some(first) = categories.first() {
            bar.set_prefix(*first);
        }

        CategoryProgress {
            bar,
            categories,
            current: 0,
        }
    }

    /// The phases of a build with the given options.
    pub fn for_build(bundle: bool, redistributable: bool, enabled: bool) -> Self {
        let mut categories = vec![CONFIGURE, COMPILE, LINK];
        if bundle {
            categories.push(BUNDLE);
        }
        if redistributable {
            categories.push(REDISTRIBUTABLE);
        }
        Self::new(categories, enabled)
    }

    pub fn category(&self) -> Option<&'static str> {
        self.categories.get(self.current).copied()
    }

    /// Describe what is currently being worked on, e.g. a target name.
    pub fn describe(&self, description: &str) {
        self.bar.set_message(format_lengthy(description));
    }

    /// Mark the current phase as done and move to the next one.
    pub fn next_category(&mut self) {
        self.bar.inc(1);
        self.current += 1;
        match self.category() {
            Some(category) => self.bar.set_prefix(category),
            None => self.bar.finish_with_message("finished."),
        }
    }

    pub fn is_finished(&self) -> bool {
        self.current >= self.categories.len()
    }
}

/// Shorten long descriptions to their tail.
pub fn format_lengthy(text: &str) -> String {
    let count = text.chars().count();
    if count > MAX_DESCRIPTION {
        let tail: String = text.chars().skip(count - (MAX_DESCRIPTION - 2)).collect();
        format!("..{}", tail)
    } else {
        text.to_string()
    }
}
