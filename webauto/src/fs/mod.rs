//! File system operations for site uploads.

pub mod walker;

pub use walker::{walk_directory, LocalFile, LocalFiles, WalkOptions};
