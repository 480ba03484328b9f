//! Change detection for incremental uploads.

pub mod fingerprint;

pub use fingerprint::{Fingerprint, DEFAULT_CHUNK_SIZE};
