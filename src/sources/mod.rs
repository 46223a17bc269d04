//! External sources.
//!
//! Projects and targets with a `url` have their sources checked out from
//! git into their build folder before they are configured.

pub mod git;

pub use git::download_sources;
