//! Build execution.
//!
//! Configured targets hold compile units whose commands come from a
//! [`Toolchain`]. Compilation runs in parallel on a rayon pool; linking,
//! bundling and redistributables run target by target.

pub mod compile_db;
pub mod directories;
pub mod errors;
pub mod fingerprint;
pub mod flags;
pub mod progress;
pub mod target;
pub mod toolchain;
pub mod unit;

pub use compile_db::{CompileCommand, CompileDatabase};
pub use errors::BuildError;
pub use flags::BuildFlags;
pub use progress::CategoryProgress;
pub use target::Target;
pub use toolchain::{LlvmToolchain, Toolchain};
