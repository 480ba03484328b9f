//! webauto Library
//!
//! Static site deploys to S3: incremental content sync keyed on S3 ETags,
//! plus bucket, DNS, certificate and CloudFront provisioning.

pub mod config;
pub mod context;
pub mod executor;
pub mod fs;
pub mod provision;
pub mod sync;
pub mod transfer;
pub mod utils;

// Re-export commonly used types
pub use config::Config;
pub use context::AwsContext;
pub use executor::manifest::Manifest;
pub use executor::{Action, PlannedAction, SyncOptions, SyncReport, Syncer};
pub use sync::fingerprint::Fingerprint;
pub use utils::errors::{Result, WebautoError};
