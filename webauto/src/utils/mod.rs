//! Utility modules for webauto.

pub mod errors;
pub mod logger;

pub use errors::{Result, WebautoError};
